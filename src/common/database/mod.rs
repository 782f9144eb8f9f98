mod entity;
mod migration;

use std::ops::Range;

use chrono::{DateTime, Utc};
use sea_orm::{
    sea_query::{Expr, LikeExpr, Query},
    ActiveModelTrait, ColumnTrait, Condition, ConnectOptions, Database, DatabaseConnection,
    EntityTrait, Order, QueryFilter, QueryOrder, QuerySelect, TransactionTrait,
};
use tracing::{debug, info};

use crate::{Error, Timing};
use entity::{Choice, Question};
use migration::{Migrator, MigratorTrait};

pub(crate) use entity::{choice, question};

#[must_use]
#[derive(Debug, Clone)]
pub(crate) struct PollDB {
    db: DatabaseConnection,
}

/// Admin list query over every question, visible or not
#[must_use]
#[derive(Debug, Default)]
pub(crate) struct QuestionQuery {
    /// Every term must occur in the question text
    pub(crate) terms: Vec<String>,
    pub(crate) pub_date: Option<Range<DateTime<Utc>>>,
    pub(crate) order_by: QuestionOrder,
    pub(crate) descending: bool,
}

#[must_use]
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub(crate) enum QuestionOrder {
    #[default]
    Id,
    QuestionText,
    PubDate,
}

/// One inline choice row of an admin form
#[must_use]
#[derive(Debug, PartialEq, Eq)]
pub(crate) enum ChoiceChange {
    Insert { text: String, votes: i32 },
    Update { id: i32, text: String, votes: i32 },
    Delete { id: i32 },
}

impl PollDB {
    pub(crate) async fn connect(url: &str, sqlx_logging: bool) -> Result<Self, Error> {
        let mut timing = Timing::new();

        let mut options = ConnectOptions::new(url.to_string());
        options.sqlx_logging(sqlx_logging);

        // every connection to an in-memory database gets its own empty database
        if url.contains(":memory:") || url.contains("mode=memory") {
            options.max_connections(1).min_connections(1);
        }

        let db = Database::connect(options).await?;
        Migrator::up(&db, None).await?;

        info!("Database initialization takes `{}`", timing.elapsed());

        Ok(Self { db })
    }

    #[cfg(test)]
    pub(crate) async fn drop(&self) -> Result<(), Error> {
        Ok(Migrator::down(&self.db, None).await?)
    }

    fn visible(now: DateTime<Utc>) -> Condition {
        Condition::all()
            .add(question::Column::PubDate.lte(now))
            .add(
                question::Column::Id.in_subquery(
                    Query::select()
                        .column(choice::Column::QuestionId)
                        .from(Choice)
                        .to_owned(),
                ),
            )
    }

    pub(crate) async fn find_visible_questions(
        &self,
        now: DateTime<Utc>,
        limit: Option<u64>,
    ) -> Result<Vec<question::Model>, Error> {
        Ok(Question::find()
            .filter(PollDB::visible(now))
            .order_by_desc(question::Column::PubDate)
            .order_by_desc(question::Column::Id)
            .limit(limit)
            .all(&self.db)
            .await?)
    }

    pub(crate) async fn find_visible_question(
        &self,
        id: i32,
        now: DateTime<Utc>,
    ) -> Result<Option<question::Model>, Error> {
        Ok(Question::find_by_id(id)
            .filter(PollDB::visible(now))
            .one(&self.db)
            .await?)
    }

    pub(crate) async fn find_question(&self, id: i32) -> Result<Option<question::Model>, Error> {
        Ok(Question::find_by_id(id).one(&self.db).await?)
    }

    pub(crate) async fn find_questions(
        &self,
        query: &QuestionQuery,
    ) -> Result<Vec<question::Model>, Error> {
        let mut condition = Condition::all();

        for term in &query.terms {
            condition = condition.add(
                Expr::col(question::Column::QuestionText)
                    .like(LikeExpr::new(format!("%{}%", escape_like(term))).escape('\\')),
            );
        }

        if let Some(range) = &query.pub_date {
            condition = condition
                .add(question::Column::PubDate.gte(range.start))
                .add(question::Column::PubDate.lt(range.end));
        }

        let order = if query.descending {
            Order::Desc
        } else {
            Order::Asc
        };

        let mut select = Question::find().filter(condition);
        select = match query.order_by {
            QuestionOrder::Id => select,
            QuestionOrder::QuestionText => {
                select.order_by(question::Column::QuestionText, order.clone())
            }
            QuestionOrder::PubDate => select.order_by(question::Column::PubDate, order.clone()),
        };

        Ok(select
            .order_by(question::Column::Id, order)
            .all(&self.db)
            .await?)
    }

    pub(crate) async fn insert_question<T>(
        &self,
        text: T,
        pub_date: DateTime<Utc>,
    ) -> Result<question::Model, Error>
    where
        T: AsRef<str>,
    {
        let model = question::ActiveModel {
            question_text: sea_orm::Set(text.as_ref().to_string()),
            pub_date: sea_orm::Set(pub_date),
            ..Default::default()
        };
        let model = model.insert(&self.db).await?;

        debug!("Question `{}` inserted", model.id);

        Ok(model)
    }

    pub(crate) async fn update_question<T>(
        &self,
        id: i32,
        text: T,
        pub_date: DateTime<Utc>,
    ) -> Result<question::Model, Error>
    where
        T: AsRef<str>,
    {
        let mut model: question::ActiveModel = Question::find_by_id(id)
            .one(&self.db)
            .await?
            .ok_or_else(|| Error::question_not_found(id))?
            .into();

        model.question_text = sea_orm::Set(text.as_ref().to_string());
        model.pub_date = sea_orm::Set(pub_date);

        Ok(model.update(&self.db).await?)
    }

    pub(crate) async fn delete_question(&self, id: i32) -> Result<u64, Error> {
        let txn = self.db.begin().await?;

        let choices = Choice::delete_many()
            .filter(choice::Column::QuestionId.eq(id))
            .exec(&txn)
            .await?
            .rows_affected;

        let result = Question::delete_by_id(id).exec(&txn).await?;
        if result.rows_affected == 0 {
            return Err(Error::question_not_found(id));
        }

        txn.commit().await?;

        debug!("Question `{id}` deleted with `{choices}` choices");

        Ok(choices)
    }

    pub(crate) async fn find_choices(&self, question_id: i32) -> Result<Vec<choice::Model>, Error> {
        Ok(Choice::find()
            .filter(choice::Column::QuestionId.eq(question_id))
            .order_by_asc(choice::Column::Id)
            .all(&self.db)
            .await?)
    }

    pub(crate) async fn find_choice(&self, id: i32) -> Result<Option<choice::Model>, Error> {
        Ok(Choice::find_by_id(id).one(&self.db).await?)
    }

    pub(crate) async fn insert_choice<T>(
        &self,
        question_id: i32,
        text: T,
    ) -> Result<choice::Model, Error>
    where
        T: AsRef<str>,
    {
        if self.find_question(question_id).await?.is_none() {
            return Err(Error::question_not_found(question_id));
        }

        let model = choice::ActiveModel {
            question_id: sea_orm::Set(question_id),
            choice_text: sea_orm::Set(text.as_ref().to_string()),
            votes: sea_orm::Set(0),
            ..Default::default()
        };
        let model = model.insert(&self.db).await?;

        debug!("Choice `{}` inserted for question `{question_id}`", model.id);

        Ok(model)
    }

    pub(crate) async fn delete_choice(&self, id: i32) -> Result<(), Error> {
        let result = Choice::delete_by_id(id).exec(&self.db).await?;

        if result.rows_affected == 0 {
            Err(Error::choice_not_found(id))
        } else {
            Ok(())
        }
    }

    /// Add one vote in a single statement, `None` when the choice is not
    /// owned by the question
    pub(crate) async fn increment_votes(
        &self,
        question_id: i32,
        choice_id: i32,
    ) -> Result<Option<choice::Model>, Error> {
        let result = Choice::update_many()
            .col_expr(
                choice::Column::Votes,
                Expr::col(choice::Column::Votes).add(1),
            )
            .filter(choice::Column::Id.eq(choice_id))
            .filter(choice::Column::QuestionId.eq(question_id))
            .exec(&self.db)
            .await?;

        if result.rows_affected == 0 {
            return Ok(None);
        }

        self.find_choice(choice_id).await
    }

    /// Insert or update a question and apply its inline choice rows in one transaction
    pub(crate) async fn save_question<T>(
        &self,
        id: Option<i32>,
        text: T,
        pub_date: DateTime<Utc>,
        changes: Vec<ChoiceChange>,
    ) -> Result<question::Model, Error>
    where
        T: AsRef<str>,
    {
        let txn = self.db.begin().await?;

        let model = match id {
            Some(id) => {
                let mut model: question::ActiveModel = Question::find_by_id(id)
                    .one(&txn)
                    .await?
                    .ok_or_else(|| Error::question_not_found(id))?
                    .into();

                model.question_text = sea_orm::Set(text.as_ref().to_string());
                model.pub_date = sea_orm::Set(pub_date);
                model.update(&txn).await?
            }
            None => {
                question::ActiveModel {
                    question_text: sea_orm::Set(text.as_ref().to_string()),
                    pub_date: sea_orm::Set(pub_date),
                    ..Default::default()
                }
                .insert(&txn)
                .await?
            }
        };

        for change in changes {
            match change {
                ChoiceChange::Insert { text, votes } => {
                    choice::ActiveModel {
                        question_id: sea_orm::Set(model.id),
                        choice_text: sea_orm::Set(text),
                        votes: sea_orm::Set(votes),
                        ..Default::default()
                    }
                    .insert(&txn)
                    .await?;
                }
                ChoiceChange::Update { id, text, votes } => {
                    let result = Choice::update_many()
                        .col_expr(choice::Column::ChoiceText, Expr::value(text))
                        .col_expr(choice::Column::Votes, Expr::value(votes))
                        .filter(choice::Column::Id.eq(id))
                        .filter(choice::Column::QuestionId.eq(model.id))
                        .exec(&txn)
                        .await?;

                    if result.rows_affected == 0 {
                        return Err(Error::choice_not_found(id));
                    }
                }
                ChoiceChange::Delete { id } => {
                    let result = Choice::delete_many()
                        .filter(choice::Column::Id.eq(id))
                        .filter(choice::Column::QuestionId.eq(model.id))
                        .exec(&txn)
                        .await?;

                    if result.rows_affected == 0 {
                        return Err(Error::choice_not_found(id));
                    }
                }
            }
        }

        txn.commit().await?;

        info!("Question `{}` saved", model.id);

        Ok(model)
    }
}

/// Match `%`, `_` and `\` literally in a `LIKE` pattern escaped with `\`
fn escape_like(term: &str) -> String {
    let mut escaped = String::with_capacity(term.len());

    for c in term.chars() {
        if matches!(c, '\\' | '%' | '_') {
            escaped.push('\\');
        }
        escaped.push(c);
    }

    escaped
}
