use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        // Append-only observation table, one row per (run timestamp, currency, source)
        manager
            .create_table(
                Table::create()
                    .table(ExchangeRates::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(ExchangeRates::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(ExchangeRates::Timestamp)
                            .timestamp()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(ExchangeRates::Currency)
                            .string_len(16)
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(ExchangeRates::BuyRate)
                            .double()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(ExchangeRates::SellRate)
                            .double()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(ExchangeRates::SourceName)
                            .string_len(100)
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(ExchangeRates::CreatedAt)
                            .timestamp()
                            .null()
                            .default(SimpleExpr::Keyword(Keyword::CurrentTimestamp)),
                    )
                    .to_owned(),
            )
            .await?;

        // Report loads the whole history newest first
        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_exchange_rates_timestamp_currency")
                    .table(ExchangeRates::Table)
                    .col((ExchangeRates::Timestamp, IndexOrder::Desc))
                    .col(ExchangeRates::Currency)
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(ExchangeRates::Table).to_owned())
            .await
    }
}

#[derive(Iden)]
enum ExchangeRates {
    Table,
    Id,
    Timestamp,
    Currency,
    BuyRate,
    SellRate,
    SourceName,
    CreatedAt,
}
