use sea_orm_migration::prelude::*;
use sea_orm_migration::sea_orm::ConnectionTrait;

/// Key of the schema-version marker row
pub const SCHEMA_VERSION_KEY: &str = "db_version";

/// Schema version written on first initialization
pub const SCHEMA_VERSION: &str = "1.0";

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Metadata::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Metadata::Key)
                            .string_len(64)
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Metadata::Value).text().null())
                    .to_owned(),
            )
            .await?;

        let insert = Query::insert()
            .into_table(Metadata::Table)
            .columns([Metadata::Key, Metadata::Value])
            .values_panic([SCHEMA_VERSION_KEY.into(), SCHEMA_VERSION.into()])
            .on_conflict(OnConflict::column(Metadata::Key).do_nothing().to_owned())
            .to_owned();

        let db = manager.get_connection();
        db.execute(db.get_database_backend().build(&insert)).await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Metadata::Table).to_owned())
            .await
    }
}

#[derive(Iden)]
enum Metadata {
    Table,
    Key,
    Value,
}
