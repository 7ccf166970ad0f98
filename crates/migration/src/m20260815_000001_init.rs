use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[derive(Iden)]
enum Accounts {
    Table,
    Id,
    OwnerId,
    Name,
    Currency,
    OpeningMinor,
    BalanceMinor,
}

#[derive(Iden)]
enum Categories {
    Table,
    Id,
    OwnerId,
    Name,
    Kind,
}

#[derive(Iden)]
enum Transactions {
    Table,
    Id,
    OwnerId,
    AccountId,
    CategoryId,
    Kind,
    AmountMinor,
    Currency,
    Date,
    Note,
}

#[derive(Iden)]
enum Budgets {
    Table,
    Id,
    OwnerId,
    CategoryId,
    Month,
    LimitMinor,
    SpentMinor,
    Currency,
    Mode,
    Percent,
}

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
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
                    .col(ColumnDef::new(Accounts::Currency).string().not_null())
                    .col(
                        ColumnDef::new(Accounts::OpeningMinor)
                            .big_integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(Accounts::BalanceMinor)
                            .big_integer()
                            .not_null()
                            .default(0),
                    )
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

        manager
            .create_table(
                Table::create()
                    .table(Categories::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Categories::Id)
                            .string()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Categories::OwnerId).string().not_null())
                    .col(ColumnDef::new(Categories::Name).string().not_null())
                    .col(ColumnDef::new(Categories::Kind).string().not_null())
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx-categories-owner_id")
                    .table(Categories::Table)
                    .col(Categories::OwnerId)
                    .to_owned(),
            )
            .await?;

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
                    .col(ColumnDef::new(Transactions::OwnerId).string().not_null())
                    .col(ColumnDef::new(Transactions::AccountId).string().not_null())
                    .col(ColumnDef::new(Transactions::CategoryId).string())
                    .col(ColumnDef::new(Transactions::Kind).string().not_null())
                    .col(
                        ColumnDef::new(Transactions::AmountMinor)
                            .big_integer()
                            .not_null(),
                    )
                    .col(ColumnDef::new(Transactions::Currency).string().not_null())
                    .col(ColumnDef::new(Transactions::Date).date().not_null())
                    .col(
                        ColumnDef::new(Transactions::Note)
                            .string()
                            .not_null()
                            .default(""),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk-transactions-account_id")
                            .from(Transactions::Table, Transactions::AccountId)
                            .to(Accounts::Table, Accounts::Id),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx-transactions-owner_id-date")
                    .table(Transactions::Table)
                    .col(Transactions::OwnerId)
                    .col(Transactions::Date)
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
            .create_table(
                Table::create()
                    .table(Budgets::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Budgets::Id)
                            .string()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Budgets::OwnerId).string().not_null())
                    .col(ColumnDef::new(Budgets::CategoryId).string().not_null())
                    .col(ColumnDef::new(Budgets::Month).string().not_null())
                    .col(
                        ColumnDef::new(Budgets::LimitMinor)
                            .big_integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(Budgets::SpentMinor)
                            .big_integer()
                            .not_null()
                            .default(0),
                    )
                    .col(ColumnDef::new(Budgets::Currency).string().not_null())
                    .col(
                        ColumnDef::new(Budgets::Mode)
                            .string()
                            .not_null()
                            .default("fixed"),
                    )
                    .col(ColumnDef::new(Budgets::Percent).integer())
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk-budgets-category_id")
                            .from(Budgets::Table, Budgets::CategoryId)
                            .to(Categories::Table, Categories::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        // One budget row per (owner, category, month).
        manager
            .create_index(
                Index::create()
                    .name("idx-budgets-owner_id-category_id-month-unique")
                    .table(Budgets::Table)
                    .col(Budgets::OwnerId)
                    .col(Budgets::CategoryId)
                    .col(Budgets::Month)
                    .unique()
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Budgets::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Transactions::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Categories::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Accounts::Table).to_owned())
            .await?;
        Ok(())
    }
}
