use async_trait::async_trait;
use sea_orm_migration::prelude::*;

#[must_use]
#[derive(DeriveIden)]
enum Question {
    Table,
    Id,
    QuestionText,
    PubDate,
}

#[must_use]
#[derive(DeriveIden)]
enum Choice {
    Table,
    Id,
    QuestionId,
    ChoiceText,
    Votes,
}

#[must_use]
#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Question::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Question::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(Question::QuestionText)
                            .string_len(200)
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(Question::PubDate)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx-question-pub_date")
                    .table(Question::Table)
                    .col(Question::PubDate)
                    .if_not_exists()
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(Choice::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Choice::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Choice::QuestionId).integer().not_null())
                    .col(ColumnDef::new(Choice::ChoiceText).string_len(200).not_null())
                    .col(
                        ColumnDef::new(Choice::Votes)
                            .integer()
                            .not_null()
                            .default(0),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk-choice-question_id")
                            .from(Choice::Table, Choice::QuestionId)
                            .to(Question::Table, Question::Id)
                            .on_delete(ForeignKeyAction::Cascade)
                            .on_update(ForeignKeyAction::NoAction),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx-choice-question_id")
                    .table(Choice::Table)
                    .col(Choice::QuestionId)
                    .if_not_exists()
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Choice::Table).if_exists().to_owned())
            .await?;

        manager
            .drop_table(Table::drop().table(Question::Table).if_exists().to_owned())
            .await?;

        Ok(())
    }
}
