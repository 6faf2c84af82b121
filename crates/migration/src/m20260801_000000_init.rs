//! Initial schema migration - creates all tables from scratch.
//!
//! The complete schema for Folio:
//!
//! - `accounts`: top-level containers owned by users
//! - `holdings`: named instruments tracked within an account
//! - `transactions`: dated buy/sell events against a holding
//! - `transfers`: dividends and other cash movements against a holding
//!
//! No foreign keys: deletion cascades are an explicit sweep in the store,
//! holding removal intentionally leaves orphaned transactions behind, and
//! replication may deliver child rows before their account.

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
    OwnerId,
    Name,
    Notes,
}

#[derive(Iden)]
enum Holdings {
    Table,
    Id,
    Name,
    OwnerId,
    AccountId,
    Notes,
}

#[derive(Iden)]
enum Transactions {
    Table,
    Id,
    Date,
    Price,
    Amount,
    Total,
    Notes,
    HoldingId,
    AccountId,
    OwnerId,
}

#[derive(Iden)]
enum Transfers {
    Table,
    Id,
    Date,
    Amount,
    Notes,
    HoldingId,
    AccountId,
    OwnerId,
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
                    .col(ColumnDef::new(Accounts::OwnerId).string().not_null())
                    .col(ColumnDef::new(Accounts::Name).string().not_null())
                    .col(ColumnDef::new(Accounts::Notes).string())
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx-accounts-owner_id")
                    .table(Accounts::Table)
                    .col(Accounts::OwnerId)
                    .to_owned(),
            )
            .await?;

        // ───────────────────────────────────────────────────────────────────
        // 2. Holdings
        // ───────────────────────────────────────────────────────────────────
        manager
            .create_table(
                Table::create()
                    .table(Holdings::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Holdings::Id)
                            .string()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Holdings::Name).string().not_null())
                    .col(ColumnDef::new(Holdings::OwnerId).string().not_null())
                    .col(ColumnDef::new(Holdings::AccountId).string().not_null())
                    .col(ColumnDef::new(Holdings::Notes).string())
                    .to_owned(),
            )
            .await?;

        // No unique index on (account_id, name). Duplicate names are a
        // tolerated state; resolution picks the first in insertion order.
        manager
            .create_index(
                Index::create()
                    .name("idx-holdings-owner_id")
                    .table(Holdings::Table)
                    .col(Holdings::OwnerId)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx-holdings-account_id")
                    .table(Holdings::Table)
                    .col(Holdings::AccountId)
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
                    .col(ColumnDef::new(Transactions::Date).timestamp().not_null())
                    .col(ColumnDef::new(Transactions::Price).double())
                    .col(ColumnDef::new(Transactions::Amount).double())
                    .col(ColumnDef::new(Transactions::Total).double())
                    .col(ColumnDef::new(Transactions::Notes).string())
                    .col(ColumnDef::new(Transactions::HoldingId).string().not_null())
                    .col(ColumnDef::new(Transactions::AccountId).string().not_null())
                    .col(ColumnDef::new(Transactions::OwnerId).string().not_null())
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx-transactions-owner_id")
                    .table(Transactions::Table)
                    .col(Transactions::OwnerId)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx-transactions-account_id")
                    .table(Transactions::Table)
                    .col(Transactions::AccountId)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx-transactions-holding_id")
                    .table(Transactions::Table)
                    .col(Transactions::HoldingId)
                    .to_owned(),
            )
            .await?;

        // ───────────────────────────────────────────────────────────────────
        // 4. Transfers
        // ───────────────────────────────────────────────────────────────────
        manager
            .create_table(
                Table::create()
                    .table(Transfers::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Transfers::Id)
                            .string()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Transfers::Date).timestamp().not_null())
                    .col(ColumnDef::new(Transfers::Amount).double())
                    .col(ColumnDef::new(Transfers::Notes).string())
                    .col(ColumnDef::new(Transfers::HoldingId).string().not_null())
                    .col(ColumnDef::new(Transfers::AccountId).string().not_null())
                    .col(ColumnDef::new(Transfers::OwnerId).string().not_null())
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx-transfers-owner_id")
                    .table(Transfers::Table)
                    .col(Transfers::OwnerId)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx-transfers-account_id")
                    .table(Transfers::Table)
                    .col(Transfers::AccountId)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx-transfers-holding_id")
                    .table(Transfers::Table)
                    .col(Transfers::HoldingId)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Transfers::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Transactions::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Holdings::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Accounts::Table).to_owned())
            .await?;

        Ok(())
    }
}
