//! Initial schema migration - creates all tables from scratch.
//!
//! It creates the complete schema for the ledger:
//!
//! - `accounts`: named account containers
//! - `balances`: one row per (account, currency) pair the ledger touched
//! - `transactions`: the ordered transaction log with its effect metadata
//! - `fees`: default fee configuration per (currency, transaction kind)

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

// ─────────────────────────────────────────────────────────────────────────────
// Table identifiers
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Iden)]
enum Accounts {
    Table,
    Id,
    Name,
}

#[derive(Iden)]
enum Balances {
    Table,
    AccountId,
    Currency,
    Amount,
}

#[derive(Iden)]
enum Transactions {
    Table,
    Id,
    AccountId,
    Kind,
    Description,
    Currency,
    Amount,
    OriginalAmount,
    TargetCurrency,
    ExchangeRate,
    TargetAccountId,
    FeeKind,
    FeeValue,
    Reference,
    Notes,
    CreatedBy,
    CreatedAt,
    UpdatedAt,
}

#[derive(Iden)]
enum Fees {
    Table,
    Id,
    Currency,
    TransactionKind,
    FeeKind,
    FeeValue,
    Active,
    Description,
}

// ─────────────────────────────────────────────────────────────────────────────
// Migration implementation
// ─────────────────────────────────────────────────────────────────────────────

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        // ───────────────────────────────────────────────────────────────────
        // 1. Accounts
        // ───────────────────────────────────────────────────────────────────
        manager
            .create_table(
                Table::create()
                    .table(Accounts::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Accounts::Id)
                            .string()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Accounts::Name).string().not_null())
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx-accounts-name-unique")
                    .table(Accounts::Table)
                    .col(Accounts::Name)
                    .unique()
                    .to_owned(),
            )
            .await?;

        // ───────────────────────────────────────────────────────────────────
        // 2. Balances
        // ───────────────────────────────────────────────────────────────────
        manager
            .create_table(
                Table::create()
                    .table(Balances::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(Balances::AccountId).string().not_null())
                    .col(ColumnDef::new(Balances::Currency).string().not_null())
                    .col(ColumnDef::new(Balances::Amount).double().not_null())
                    .primary_key(
                        Index::create()
                            .col(Balances::AccountId)
                            .col(Balances::Currency),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk-balances-account_id")
                            .from(Balances::Table, Balances::AccountId)
                            .to(Accounts::Table, Accounts::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        // ───────────────────────────────────────────────────────────────────
        // 3. Transactions
        // ───────────────────────────────────────────────────────────────────
        manager
            .create_table(
                Table::create()
                    .table(Transactions::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Transactions::Id)
                            .string()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Transactions::AccountId).string().not_null())
                    .col(ColumnDef::new(Transactions::Kind).string().not_null())
                    .col(
                        ColumnDef::new(Transactions::Description)
                            .string()
                            .not_null(),
                    )
                    .col(ColumnDef::new(Transactions::Currency).string().not_null())
                    .col(ColumnDef::new(Transactions::Amount).double().not_null())
                    .col(ColumnDef::new(Transactions::OriginalAmount).double())
                    .col(ColumnDef::new(Transactions::TargetCurrency).string())
                    .col(ColumnDef::new(Transactions::ExchangeRate).double())
                    .col(ColumnDef::new(Transactions::TargetAccountId).string())
                    .col(ColumnDef::new(Transactions::FeeKind).string())
                    .col(ColumnDef::new(Transactions::FeeValue).double())
                    .col(ColumnDef::new(Transactions::Reference).string())
                    .col(ColumnDef::new(Transactions::Notes).string())
                    .col(ColumnDef::new(Transactions::CreatedBy).string().not_null())
                    .col(
                        ColumnDef::new(Transactions::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(Transactions::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk-transactions-account_id")
                            .from(Transactions::Table, Transactions::AccountId)
                            .to(Accounts::Table, Accounts::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx-transactions-account_id-created_at")
                    .table(Transactions::Table)
                    .col(Transactions::AccountId)
                    .col(Transactions::CreatedAt)
                    .to_owned(),
            )
            .await?;

        // ───────────────────────────────────────────────────────────────────
        // 4. Fees
        // ───────────────────────────────────────────────────────────────────
        manager
            .create_table(
                Table::create()
                    .table(Fees::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(Fees::Id).string().not_null().primary_key())
                    .col(ColumnDef::new(Fees::Currency).string().not_null())
                    .col(ColumnDef::new(Fees::TransactionKind).string().not_null())
                    .col(ColumnDef::new(Fees::FeeKind).string().not_null())
                    .col(ColumnDef::new(Fees::FeeValue).double().not_null())
                    .col(ColumnDef::new(Fees::Active).boolean().not_null())
                    .col(ColumnDef::new(Fees::Description).string())
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx-fees-currency-kind-unique")
                    .table(Fees::Table)
                    .col(Fees::Currency)
                    .col(Fees::TransactionKind)
                    .unique()
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Fees::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Transactions::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Balances::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Accounts::Table).to_owned())
            .await?;
        Ok(())
    }
}
