use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[derive(Iden)]
enum Transactions {
    Table,
    SenderId,
    ReceiverId,
    ReferenceNumber,
    CreatedAt,
}

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_index(
                Index::create()
                    .name("uidx-transactions-reference_number")
                    .table(Transactions::Table)
                    .col(Transactions::ReferenceNumber)
                    .unique()
                    .to_owned(),
            )
            .await?;

        // History is read per participant, newest first.
        manager
            .create_index(
                Index::create()
                    .name("idx-transactions-sender_id-created_at")
                    .table(Transactions::Table)
                    .col(Transactions::SenderId)
                    .col(Transactions::CreatedAt)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx-transactions-receiver_id-created_at")
                    .table(Transactions::Table)
                    .col(Transactions::ReceiverId)
                    .col(Transactions::CreatedAt)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        for name in [
            "idx-transactions-receiver_id-created_at",
            "idx-transactions-sender_id-created_at",
            "uidx-transactions-reference_number",
        ] {
            manager
                .drop_index(
                    Index::drop()
                        .name(name)
                        .table(Transactions::Table)
                        .to_owned(),
                )
                .await?;
        }
        Ok(())
    }
}
