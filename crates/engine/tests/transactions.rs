use sea_orm::Database;
use uuid::Uuid;

use engine::{
    Currency, Engine, EngineError, FeeInstruction, FeeKind, FeeSpec, KindTag, TransactionDraft,
    TransactionKind, TransactionListFilter, TransactionPatch,
};
use migration::MigratorTrait;

async fn engine_with_db() -> Engine {
    let db = Database::connect("sqlite::memory:").await.unwrap();
    migration::Migrator::up(&db, None).await.unwrap();
    Engine::builder().database(db).build().await.unwrap()
}

fn inflow(account_id: Uuid, currency: Currency, amount: f64) -> TransactionDraft {
    TransactionDraft::new(
        account_id,
        TransactionKind::Inflow,
        currency,
        amount,
        "inflow",
        "alice",
    )
}

fn outflow(account_id: Uuid, currency: Currency, amount: f64) -> TransactionDraft {
    TransactionDraft::new(
        account_id,
        TransactionKind::Outflow,
        currency,
        amount,
        "outflow",
        "alice",
    )
}

#[tokio::test]
async fn inflow_create_and_delete_round_trips() {
    let engine = engine_with_db().await;
    let account_id = engine
        .new_account("Main", &[(Currency::Dolar, 1000.0)])
        .await
        .unwrap();

    let tx = engine
        .create_transaction(inflow(account_id, Currency::Dolar, 500.0))
        .await
        .unwrap();
    assert_eq!(engine.balance(account_id, Currency::Dolar).await.unwrap(), 1500.0);

    engine.delete_transaction(tx.id).await.unwrap();
    assert_eq!(engine.balance(account_id, Currency::Dolar).await.unwrap(), 1000.0);
    assert_eq!(
        engine.transaction(tx.id).await,
        Err(EngineError::KeyNotFound("transaction not exists".to_string()))
    );
}

#[tokio::test]
async fn exchange_scenario_applies_and_reverses() {
    let engine = engine_with_db().await;
    let account_id = engine
        .new_account("A1", &[(Currency::Dolar, 1000.0)])
        .await
        .unwrap();

    engine
        .create_transaction(inflow(account_id, Currency::Dolar, 500.0))
        .await
        .unwrap();
    assert_eq!(engine.balance(account_id, Currency::Dolar).await.unwrap(), 1500.0);

    let swap = engine
        .create_transaction(TransactionDraft::new(
            account_id,
            TransactionKind::CurrencyExchange {
                target_currency: Currency::Pesos,
                exchange_rate: 1000.0,
            },
            Currency::Dolar,
            100.0,
            "dolar to pesos",
            "alice",
        ))
        .await
        .unwrap();
    assert_eq!(engine.balance(account_id, Currency::Dolar).await.unwrap(), 1400.0);
    assert_eq!(
        engine.balance(account_id, Currency::Pesos).await.unwrap(),
        100_000.0
    );

    engine.delete_transaction(swap.id).await.unwrap();
    assert_eq!(engine.balance(account_id, Currency::Dolar).await.unwrap(), 1500.0);
    assert_eq!(engine.balance(account_id, Currency::Pesos).await.unwrap(), 0.0);
}

#[tokio::test]
async fn inverted_pair_divides_on_apply() {
    let engine = engine_with_db().await;
    let account_id = engine
        .new_account("Main", &[(Currency::Pesos, 200_000.0)])
        .await
        .unwrap();

    engine
        .create_transaction(TransactionDraft::new(
            account_id,
            TransactionKind::CurrencyExchange {
                target_currency: Currency::Dolar,
                exchange_rate: 1000.0,
            },
            Currency::Pesos,
            100_000.0,
            "pesos to dolar",
            "alice",
        ))
        .await
        .unwrap();

    assert_eq!(
        engine.balance(account_id, Currency::Pesos).await.unwrap(),
        100_000.0
    );
    assert_eq!(engine.balance(account_id, Currency::Dolar).await.unwrap(), 100.0);
}

#[tokio::test]
async fn internal_transfer_is_double_entry() {
    let engine = engine_with_db().await;
    let from = engine
        .new_account("From", &[(Currency::Cable, 400.0)])
        .await
        .unwrap();
    let to = engine.new_account("To", &[]).await.unwrap();

    let tx = engine
        .create_transaction(TransactionDraft::new(
            from,
            TransactionKind::InternalTransfer {
                target_account_id: to,
            },
            Currency::Cable,
            150.0,
            "move cable",
            "alice",
        ))
        .await
        .unwrap();

    assert_eq!(engine.balance(from, Currency::Cable).await.unwrap(), 250.0);
    assert_eq!(engine.balance(to, Currency::Cable).await.unwrap(), 150.0);

    engine.delete_transaction(tx.id).await.unwrap();
    assert_eq!(engine.balance(from, Currency::Cable).await.unwrap(), 400.0);
    assert_eq!(engine.balance(to, Currency::Cable).await.unwrap(), 0.0);
}

#[tokio::test]
async fn business_rules_reject_before_any_mutation() {
    let engine = engine_with_db().await;
    let account_id = engine
        .new_account("Main", &[(Currency::Dolar, 100.0)])
        .await
        .unwrap();

    let same_currency = engine
        .create_transaction(TransactionDraft::new(
            account_id,
            TransactionKind::CurrencyExchange {
                target_currency: Currency::Dolar,
                exchange_rate: 2.0,
            },
            Currency::Dolar,
            10.0,
            "bad swap",
            "alice",
        ))
        .await;
    assert_eq!(
        same_currency,
        Err(EngineError::SameCurrencySwap("DÓLAR".to_string()))
    );

    let same_account = engine
        .create_transaction(TransactionDraft::new(
            account_id,
            TransactionKind::InternalTransfer {
                target_account_id: account_id,
            },
            Currency::Dolar,
            10.0,
            "bad transfer",
            "alice",
        ))
        .await;
    assert!(matches!(
        same_account,
        Err(EngineError::SameAccountTransfer(_))
    ));

    let zero_rate = engine
        .create_transaction(TransactionDraft::new(
            account_id,
            TransactionKind::CurrencyExchange {
                target_currency: Currency::Pesos,
                exchange_rate: 0.0,
            },
            Currency::Dolar,
            10.0,
            "bad rate",
            "alice",
        ))
        .await;
    assert!(matches!(zero_rate, Err(EngineError::InvalidRate(_))));

    assert_eq!(engine.balance(account_id, Currency::Dolar).await.unwrap(), 100.0);
    let list = engine
        .list_transactions(TransactionListFilter::new())
        .await
        .unwrap();
    assert!(list.is_empty());
}

#[tokio::test]
async fn cheque_overdraft_is_rejected_without_mutation() {
    let engine = engine_with_db().await;
    let account_id = engine
        .new_account("Main", &[(Currency::Cheque, 100.0)])
        .await
        .unwrap();

    let result = engine
        .create_transaction(outflow(account_id, Currency::Cheque, 150.0))
        .await;
    assert!(matches!(result, Err(EngineError::InsufficientBalance(_))));
    assert_eq!(engine.balance(account_id, Currency::Cheque).await.unwrap(), 100.0);
}

#[tokio::test]
async fn non_cheque_currencies_may_go_negative() {
    let engine = engine_with_db().await;
    let account_id = engine.new_account("Main", &[]).await.unwrap();

    engine
        .create_transaction(outflow(account_id, Currency::Dolar, 75.0))
        .await
        .unwrap();
    assert_eq!(engine.balance(account_id, Currency::Dolar).await.unwrap(), -75.0);
}

#[tokio::test]
async fn deleting_a_cheque_inflow_may_drive_the_balance_negative() {
    // Reversals are never blocked by the overdraft rule, so history
    // corrections stay possible.
    let engine = engine_with_db().await;
    let account_id = engine.new_account("Main", &[]).await.unwrap();

    let deposit = engine
        .create_transaction(inflow(account_id, Currency::Cheque, 100.0))
        .await
        .unwrap();
    engine
        .create_transaction(outflow(account_id, Currency::Cheque, 80.0))
        .await
        .unwrap();

    engine.delete_transaction(deposit.id).await.unwrap();
    assert_eq!(engine.balance(account_id, Currency::Cheque).await.unwrap(), -80.0);
}

#[tokio::test]
async fn configured_fee_prefills_inflow() {
    let engine = engine_with_db().await;
    let account_id = engine.new_account("Main", &[]).await.unwrap();
    engine
        .set_fee(
            Currency::Dolar,
            KindTag::Inflow,
            FeeSpec {
                kind: FeeKind::Percentage,
                value: 10.0,
            },
            Some("deposit commission"),
        )
        .await
        .unwrap();

    let tx = engine
        .create_transaction(inflow(account_id, Currency::Dolar, 200.0))
        .await
        .unwrap();
    assert_eq!(tx.amount, 180.0);
    assert_eq!(tx.original_amount, Some(200.0));
    assert_eq!(
        tx.fee,
        Some(FeeSpec {
            kind: FeeKind::Percentage,
            value: 10.0
        })
    );
    assert_eq!(engine.balance(account_id, Currency::Dolar).await.unwrap(), 180.0);

    // The stored record round-trips its fee metadata.
    let stored = engine.transaction(tx.id).await.unwrap();
    assert_eq!(stored.amount, tx.amount);
    assert_eq!(stored.original_amount, tx.original_amount);
    assert_eq!(stored.fee, tx.fee);
}

#[tokio::test]
async fn waived_fee_ignores_configuration() {
    let engine = engine_with_db().await;
    let account_id = engine.new_account("Main", &[]).await.unwrap();
    engine
        .set_fee(
            Currency::Dolar,
            KindTag::Inflow,
            FeeSpec {
                kind: FeeKind::Fixed,
                value: 25.0,
            },
            None,
        )
        .await
        .unwrap();

    let tx = engine
        .create_transaction(inflow(account_id, Currency::Dolar, 200.0).fee(FeeInstruction::Waived))
        .await
        .unwrap();
    assert_eq!(tx.amount, 200.0);
    assert_eq!(tx.original_amount, None);
    assert_eq!(tx.fee, None);
}

#[tokio::test]
async fn deactivated_fee_is_not_applied() {
    let engine = engine_with_db().await;
    let account_id = engine.new_account("Main", &[]).await.unwrap();
    engine
        .set_fee(
            Currency::Dolar,
            KindTag::Inflow,
            FeeSpec {
                kind: FeeKind::Fixed,
                value: 25.0,
            },
            None,
        )
        .await
        .unwrap();
    engine
        .deactivate_fee(Currency::Dolar, KindTag::Inflow)
        .await
        .unwrap();

    let tx = engine
        .create_transaction(inflow(account_id, Currency::Dolar, 200.0))
        .await
        .unwrap();
    assert_eq!(tx.amount, 200.0);
    assert_eq!(tx.fee, None);
}

#[tokio::test]
async fn outflow_fee_is_added_on_top() {
    let engine = engine_with_db().await;
    let account_id = engine
        .new_account("Main", &[(Currency::Dolar, 500.0)])
        .await
        .unwrap();

    let tx = engine
        .create_transaction(
            outflow(account_id, Currency::Dolar, 100.0).fee(FeeInstruction::Explicit(FeeSpec {
                kind: FeeKind::Percentage,
                value: 5.0,
            })),
        )
        .await
        .unwrap();
    // The payer pays the fee on top: 100 + 5% leaves the account.
    assert_eq!(tx.amount, 105.0);
    assert_eq!(tx.original_amount, Some(100.0));
    assert_eq!(engine.balance(account_id, Currency::Dolar).await.unwrap(), 395.0);
}

#[tokio::test]
async fn fee_transfer_preserves_the_pair_total() {
    let engine = engine_with_db().await;
    let from = engine
        .new_account("From", &[(Currency::Dolar, 100.0)])
        .await
        .unwrap();
    let to = engine.new_account("To", &[]).await.unwrap();

    let tx = engine
        .create_transaction(
            TransactionDraft::new(
                from,
                TransactionKind::InternalTransfer {
                    target_account_id: to,
                },
                Currency::Dolar,
                100.0,
                "transfer with fee",
                "alice",
            )
            .fee(FeeInstruction::Explicit(FeeSpec {
                kind: FeeKind::Percentage,
                value: 10.0,
            })),
        )
        .await
        .unwrap();

    assert_eq!(tx.amount, 90.0);
    assert_eq!(tx.original_amount, Some(100.0));

    // The post-fee amount moves on both sides; nothing is destroyed.
    let from_balance = engine.balance(from, Currency::Dolar).await.unwrap();
    let to_balance = engine.balance(to, Currency::Dolar).await.unwrap();
    assert_eq!(from_balance, 10.0);
    assert_eq!(to_balance, 90.0);
    assert_eq!(from_balance + to_balance, 100.0);

    engine.delete_transaction(tx.id).await.unwrap();
    assert_eq!(engine.balance(from, Currency::Dolar).await.unwrap(), 100.0);
    assert_eq!(engine.balance(to, Currency::Dolar).await.unwrap(), 0.0);
}

#[tokio::test]
async fn fee_exchange_debits_entered_amount_and_converts_the_rest() {
    let engine = engine_with_db().await;
    let account_id = engine
        .new_account("Main", &[(Currency::Dolar, 500.0)])
        .await
        .unwrap();

    let tx = engine
        .create_transaction(
            TransactionDraft::new(
                account_id,
                TransactionKind::CurrencyExchange {
                    target_currency: Currency::Pesos,
                    exchange_rate: 1000.0,
                },
                Currency::Dolar,
                100.0,
                "swap with fee",
                "alice",
            )
            .fee(FeeInstruction::Explicit(FeeSpec {
                kind: FeeKind::Percentage,
                value: 10.0,
            })),
        )
        .await
        .unwrap();

    assert_eq!(tx.amount, 90.0);
    assert_eq!(tx.original_amount, Some(100.0));
    // The entered 100 leaves the dollar balance, the post-fee 90 converts.
    assert_eq!(engine.balance(account_id, Currency::Dolar).await.unwrap(), 400.0);
    assert_eq!(
        engine.balance(account_id, Currency::Pesos).await.unwrap(),
        90_000.0
    );

    engine.delete_transaction(tx.id).await.unwrap();
    assert_eq!(engine.balance(account_id, Currency::Dolar).await.unwrap(), 500.0);
    assert_eq!(engine.balance(account_id, Currency::Pesos).await.unwrap(), 0.0);
}

#[tokio::test]
async fn update_is_equivalent_to_delete_then_recreate() {
    let engine = engine_with_db().await;
    let account_id = engine.new_account("Main", &[]).await.unwrap();

    let tx = engine
        .create_transaction(inflow(account_id, Currency::Dolar, 500.0))
        .await
        .unwrap();

    let updated = engine
        .update_transaction(tx.id, TransactionPatch::new().amount(300.0))
        .await
        .unwrap();
    assert_eq!(updated.amount, 300.0);
    assert_eq!(engine.balance(account_id, Currency::Dolar).await.unwrap(), 300.0);

    // Recreate the same history from scratch on a second account.
    let other = engine.new_account("Other", &[]).await.unwrap();
    let fresh = engine
        .create_transaction(inflow(other, Currency::Dolar, 500.0))
        .await
        .unwrap();
    engine.delete_transaction(fresh.id).await.unwrap();
    engine
        .create_transaction(inflow(other, Currency::Dolar, 300.0))
        .await
        .unwrap();
    assert_eq!(
        engine.balance(account_id, Currency::Dolar).await.unwrap(),
        engine.balance(other, Currency::Dolar).await.unwrap()
    );
}

#[tokio::test]
async fn update_can_switch_kind_without_stale_fields() {
    let engine = engine_with_db().await;
    let account_id = engine
        .new_account("Main", &[(Currency::Dolar, 1000.0)])
        .await
        .unwrap();

    let tx = engine
        .create_transaction(TransactionDraft::new(
            account_id,
            TransactionKind::CurrencyExchange {
                target_currency: Currency::Pesos,
                exchange_rate: 1000.0,
            },
            Currency::Dolar,
            100.0,
            "swap",
            "alice",
        ))
        .await
        .unwrap();
    assert_eq!(
        engine.balance(account_id, Currency::Pesos).await.unwrap(),
        100_000.0
    );

    // Turn the exchange into a plain outflow; the pesos credit is undone.
    let updated = engine
        .update_transaction(tx.id, TransactionPatch::new().kind(TransactionKind::Outflow))
        .await
        .unwrap();
    assert_eq!(updated.kind, TransactionKind::Outflow);
    assert_eq!(engine.balance(account_id, Currency::Pesos).await.unwrap(), 0.0);
    assert_eq!(engine.balance(account_id, Currency::Dolar).await.unwrap(), 900.0);

    let stored = engine.transaction(tx.id).await.unwrap();
    assert_eq!(stored.kind, TransactionKind::Outflow);
}

#[tokio::test]
async fn update_reapplies_the_stored_fee_to_a_new_base() {
    let engine = engine_with_db().await;
    let account_id = engine.new_account("Main", &[]).await.unwrap();

    let tx = engine
        .create_transaction(
            inflow(account_id, Currency::Dolar, 200.0).fee(FeeInstruction::Explicit(FeeSpec {
                kind: FeeKind::Percentage,
                value: 10.0,
            })),
        )
        .await
        .unwrap();
    assert_eq!(engine.balance(account_id, Currency::Dolar).await.unwrap(), 180.0);

    let updated = engine
        .update_transaction(tx.id, TransactionPatch::new().amount(400.0))
        .await
        .unwrap();
    assert_eq!(updated.amount, 360.0);
    assert_eq!(updated.original_amount, Some(400.0));
    assert_eq!(engine.balance(account_id, Currency::Dolar).await.unwrap(), 360.0);
}

#[tokio::test]
async fn update_enforces_the_cheque_rule_and_rolls_back() {
    let engine = engine_with_db().await;
    let account_id = engine
        .new_account("Main", &[(Currency::Cheque, 100.0)])
        .await
        .unwrap();

    let tx = engine
        .create_transaction(outflow(account_id, Currency::Cheque, 50.0))
        .await
        .unwrap();
    assert_eq!(engine.balance(account_id, Currency::Cheque).await.unwrap(), 50.0);

    let result = engine
        .update_transaction(tx.id, TransactionPatch::new().amount(200.0))
        .await;
    assert!(matches!(result, Err(EngineError::InsufficientBalance(_))));

    // The reversal half must have been rolled back together.
    assert_eq!(engine.balance(account_id, Currency::Cheque).await.unwrap(), 50.0);
    assert_eq!(engine.transaction(tx.id).await.unwrap().amount, 50.0);
}

#[tokio::test]
async fn unknown_account_and_transaction_are_not_found() {
    let engine = engine_with_db().await;

    let result = engine
        .create_transaction(inflow(Uuid::new_v4(), Currency::Dolar, 10.0))
        .await;
    assert_eq!(
        result,
        Err(EngineError::KeyNotFound("account not exists".to_string()))
    );

    assert_eq!(
        engine.delete_transaction(Uuid::new_v4()).await,
        Err(EngineError::KeyNotFound("transaction not exists".to_string()))
    );
    assert!(
        engine
            .update_transaction(Uuid::new_v4(), TransactionPatch::new().amount(1.0))
            .await
            .is_err()
    );
}

#[tokio::test]
async fn list_transactions_honours_filters() {
    let engine = engine_with_db().await;
    let first = engine
        .new_account("First", &[(Currency::Dolar, 1000.0)])
        .await
        .unwrap();
    let second = engine.new_account("Second", &[]).await.unwrap();

    engine
        .create_transaction(inflow(first, Currency::Dolar, 100.0))
        .await
        .unwrap();
    engine
        .create_transaction(outflow(first, Currency::Pesos, 30.0))
        .await
        .unwrap();
    engine
        .create_transaction(TransactionDraft::new(
            first,
            TransactionKind::InternalTransfer {
                target_account_id: second,
            },
            Currency::Dolar,
            50.0,
            "to second",
            "alice",
        ))
        .await
        .unwrap();

    let all = engine
        .list_transactions(TransactionListFilter::new())
        .await
        .unwrap();
    assert_eq!(all.len(), 3);

    let dolar_only = engine
        .list_transactions(TransactionListFilter::new().currency(Currency::Dolar))
        .await
        .unwrap();
    assert_eq!(dolar_only.len(), 2);

    let inflows = engine
        .list_transactions(TransactionListFilter::new().kind(KindTag::Inflow))
        .await
        .unwrap();
    assert_eq!(inflows.len(), 1);

    // Second account only shows the transfer when incoming ones are included.
    let own = engine
        .list_transactions(TransactionListFilter::new().account_id(second))
        .await
        .unwrap();
    assert!(own.is_empty());

    let with_incoming = engine
        .list_transactions(
            TransactionListFilter::new()
                .account_id(second)
                .include_incoming_transfers(),
        )
        .await
        .unwrap();
    assert_eq!(with_incoming.len(), 1);
    assert_eq!(
        with_incoming[0].kind,
        TransactionKind::InternalTransfer {
            target_account_id: second
        }
    );
}

#[tokio::test]
async fn corrupt_fee_row_fails_the_transaction_instead_of_skipping_the_fee() {
    use sea_orm::{ActiveModelTrait, ActiveValue};

    let db = Database::connect("sqlite::memory:").await.unwrap();
    migration::Migrator::up(&db, None).await.unwrap();

    let row = engine::fees::ActiveModel {
        id: ActiveValue::Set(Uuid::new_v4().to_string()),
        currency: ActiveValue::Set("DÓLAR".to_string()),
        transaction_kind: ActiveValue::Set("inflow".to_string()),
        fee_kind: ActiveValue::Set("tiered".to_string()),
        fee_value: ActiveValue::Set(1.0),
        active: ActiveValue::Set(true),
        description: ActiveValue::Set(None),
    };
    row.insert(&db).await.unwrap();

    let engine = Engine::builder().database(db).build().await.unwrap();
    let account_id = engine.new_account("Main", &[]).await.unwrap();

    let result = engine
        .create_transaction(inflow(account_id, Currency::Dolar, 100.0))
        .await;
    assert!(matches!(result, Err(EngineError::InvalidAmount(_))));
    assert_eq!(engine.balance(account_id, Currency::Dolar).await.unwrap(), 0.0);
}

#[tokio::test]
async fn duplicate_opening_balance_currency_is_rejected() {
    let engine = engine_with_db().await;

    let result = engine
        .new_account("Main", &[(Currency::Dolar, 10.0), (Currency::Dolar, 20.0)])
        .await;
    assert!(matches!(result, Err(EngineError::ExistingKey(_))));
    assert!(engine.account_by_name("Main").await.is_err());
}

#[tokio::test]
async fn accounts_have_lazy_zero_balances_and_unique_names() {
    let engine = engine_with_db().await;
    let account_id = engine.new_account("Main", &[]).await.unwrap();

    assert_eq!(engine.balance(account_id, Currency::Cable).await.unwrap(), 0.0);
    let view = engine.account(account_id).await.unwrap();
    assert!(view.balances.is_empty());
    assert_eq!(view.balance(Currency::Cable), 0.0);

    assert_eq!(
        engine.new_account("Main", &[]).await,
        Err(EngineError::ExistingKey("Main".to_string()))
    );

    engine
        .create_transaction(inflow(account_id, Currency::Cable, 10.0))
        .await
        .unwrap();
    let view = engine.account_by_name("Main").await.unwrap();
    assert_eq!(view.balances, vec![(Currency::Cable, 10.0)]);
}
