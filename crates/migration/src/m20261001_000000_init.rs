//! Initial schema.
//!
//! - `accounts`: balance holders, addressed by id or phone
//! - `payment_methods`: external rails for top-ups, with amount bounds and fee
//! - `transactions`: the append-only movement journal

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
    FullName,
    Phone,
    Email,
    PinHash,
    BalanceMinor,
    IsActive,
    CreatedAt,
    UpdatedAt,
}

#[derive(Iden)]
enum PaymentMethods {
    Table,
    Id,
    Name,
    MinAmountMinor,
    MaxAmountMinor,
    FeeBps,
    IsActive,
    CreatedAt,
}

#[derive(Iden)]
enum Transactions {
    Table,
    Id,
    SenderId,
    ReceiverId,
    InitiatedBy,
    Kind,
    AmountMinor,
    FeeMinor,
    Description,
    ReferenceNumber,
    Status,
    CreatedAt,
    CompletedAt,
    PaymentMethodId,
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
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Accounts::FullName).string().not_null())
                    .col(
                        ColumnDef::new(Accounts::Phone)
                            .string()
                            .not_null()
                            .unique_key(),
                    )
                    .col(ColumnDef::new(Accounts::Email).string())
                    .col(ColumnDef::new(Accounts::PinHash).string().not_null())
                    .col(
                        ColumnDef::new(Accounts::BalanceMinor)
                            .big_integer()
                            .not_null()
                            .default(0)
                            .check(Expr::col(Accounts::BalanceMinor).gte(0)),
                    )
                    .col(
                        ColumnDef::new(Accounts::IsActive)
                            .boolean()
                            .not_null()
                            .default(true),
                    )
                    .col(ColumnDef::new(Accounts::CreatedAt).timestamp().not_null())
                    .col(ColumnDef::new(Accounts::UpdatedAt).timestamp().not_null())
                    .to_owned(),
            )
            .await?;

        // ───────────────────────────────────────────────────────────────────
        // 2. Payment methods
        // ───────────────────────────────────────────────────────────────────
        manager
            .create_table(
                Table::create()
                    .table(PaymentMethods::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(PaymentMethods::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(PaymentMethods::Name).string().not_null())
                    .col(
                        ColumnDef::new(PaymentMethods::MinAmountMinor)
                            .big_integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(PaymentMethods::MaxAmountMinor)
                            .big_integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(PaymentMethods::FeeBps)
                            .big_integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(PaymentMethods::IsActive)
                            .boolean()
                            .not_null()
                            .default(true),
                    )
                    .col(
                        ColumnDef::new(PaymentMethods::CreatedAt)
                            .timestamp()
                            .not_null(),
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
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Transactions::SenderId).big_integer())
                    .col(ColumnDef::new(Transactions::ReceiverId).big_integer())
                    .col(
                        ColumnDef::new(Transactions::InitiatedBy)
                            .big_integer()
                            .not_null(),
                    )
                    .col(ColumnDef::new(Transactions::Kind).string().not_null())
                    .col(
                        ColumnDef::new(Transactions::AmountMinor)
                            .big_integer()
                            .not_null()
                            .check(Expr::col(Transactions::AmountMinor).gt(0)),
                    )
                    .col(
                        ColumnDef::new(Transactions::FeeMinor)
                            .big_integer()
                            .not_null()
                            .default(0)
                            .check(Expr::col(Transactions::FeeMinor).gte(0)),
                    )
                    .col(ColumnDef::new(Transactions::Description).string())
                    .col(
                        ColumnDef::new(Transactions::ReferenceNumber)
                            .string()
                            .not_null(),
                    )
                    .col(ColumnDef::new(Transactions::Status).string().not_null())
                    .col(
                        ColumnDef::new(Transactions::CreatedAt)
                            .timestamp()
                            .not_null(),
                    )
                    .col(ColumnDef::new(Transactions::CompletedAt).timestamp())
                    .col(ColumnDef::new(Transactions::PaymentMethodId).big_integer())
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk-transactions-sender_id")
                            .from(Transactions::Table, Transactions::SenderId)
                            .to(Accounts::Table, Accounts::Id),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk-transactions-receiver_id")
                            .from(Transactions::Table, Transactions::ReceiverId)
                            .to(Accounts::Table, Accounts::Id),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk-transactions-payment_method_id")
                            .from(Transactions::Table, Transactions::PaymentMethodId)
                            .to(PaymentMethods::Table, PaymentMethods::Id),
                    )
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Transactions::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(PaymentMethods::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Accounts::Table).to_owned())
            .await?;
        Ok(())
    }
}
