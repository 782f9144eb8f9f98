use std::fmt;

use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use tokio::fs;
use tracing::info;

use crate::{check_length, choice, question, Config, Error, PollDB};

/// Maximum length of question and choice texts, in characters
pub const MAX_TEXT_LENGTH: usize = 200;

/// A poll prompt
#[must_use]
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Question {
    /// Question id
    pub id: i32,
    /// Question text
    pub text: String,
    /// Publication time, may lie in the future
    pub publish_time: DateTime<Utc>,
}

impl Question {
    /// Whether the question was published within the last day, measured
    /// against the current clock
    #[must_use]
    pub fn was_published_recently(&self) -> bool {
        is_recently_published(self, Utc::now())
    }
}

impl fmt::Display for Question {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.text)
    }
}

impl From<question::Model> for Question {
    fn from(model: question::Model) -> Self {
        Self {
            id: model.id,
            text: model.question_text,
            publish_time: model.pub_date,
        }
    }
}

/// One selectable option of a question
#[must_use]
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Choice {
    /// Choice id
    pub id: i32,
    /// Id of the owning question
    pub question_id: i32,
    /// Choice text
    pub text: String,
    /// Number of votes
    pub votes: u32,
}

impl fmt::Display for Choice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.text)
    }
}

impl TryFrom<choice::Model> for Choice {
    type Error = Error;

    fn try_from(model: choice::Model) -> Result<Self, Self::Error> {
        Ok(Self {
            id: model.id,
            question_id: model.question_id,
            text: model.choice_text,
            votes: u32::try_from(model.votes)?,
        })
    }
}

/// A visible question together with its choices
#[must_use]
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct QuestionDetail {
    pub question: Question,
    pub choices: Vec<Choice>,
}

/// Vote counts of a visible question
#[must_use]
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct QuestionResults {
    pub question: Question,
    pub choices: Vec<Choice>,
    pub total_votes: u64,
}

/// Returns true iff `now - 1 day <= question.publish_time <= now`
#[must_use]
#[inline]
pub fn is_recently_published(question: &Question, now: DateTime<Utc>) -> bool {
    now - Duration::days(1) <= question.publish_time && question.publish_time <= now
}

/// Handle to the question and choice store
#[must_use]
#[derive(Debug, Clone)]
pub struct Catalog {
    db: PollDB,
    latest_limit: u64,
}

impl Catalog {
    /// Open the configured database, creating the default database file when needed
    pub async fn open(config: &Config) -> Result<Self, Error> {
        let url = match &config.database_url {
            Some(url) => url.clone(),
            None => {
                let db_path = Config::default_database_path()?;
                if let Some(dir) = db_path.parent() {
                    fs::create_dir_all(dir).await?;
                }

                if db_path.exists() {
                    info!("The database file is located at `{}`", db_path.display());
                } else {
                    info!(
                        "The database file will be created at `{}`",
                        db_path.display()
                    );
                }

                format!("sqlite:{}?mode=rwc", db_path.display())
            }
        };

        Ok(Self {
            db: PollDB::connect(&url, config.sqlx_logging).await?,
            latest_limit: config.latest_limit,
        })
    }

    /// Connect to a database URL with the default settings
    pub async fn connect<T>(url: T) -> Result<Self, Error>
    where
        T: AsRef<str>,
    {
        Catalog::open(&Config {
            database_url: Some(url.as_ref().to_string()),
            ..Default::default()
        })
        .await
    }

    pub(crate) fn db(&self) -> &PollDB {
        &self.db
    }

    /// All published questions that own at least one choice, newest first
    pub async fn list_visible_questions(
        &self,
        now: DateTime<Utc>,
    ) -> Result<Vec<Question>, Error> {
        Ok(self
            .db
            .find_visible_questions(now, None)
            .await?
            .into_iter()
            .map(Question::from)
            .collect())
    }

    /// The first `limit` visible questions
    pub async fn latest_questions(
        &self,
        now: DateTime<Utc>,
        limit: u64,
    ) -> Result<Vec<Question>, Error> {
        Ok(self
            .db
            .find_visible_questions(now, Some(limit))
            .await?
            .into_iter()
            .map(Question::from)
            .collect())
    }

    /// The visible questions shown on the index, as many as configured
    pub async fn index(&self, now: DateTime<Utc>) -> Result<Vec<Question>, Error> {
        self.latest_questions(now, self.latest_limit).await
    }

    /// A visible question with its choices, `Error::NotFound` when the
    /// question is missing, unpublished or has no choices
    pub async fn get_question_for_detail(
        &self,
        id: i32,
        now: DateTime<Utc>,
    ) -> Result<QuestionDetail, Error> {
        let question = self
            .db
            .find_visible_question(id, now)
            .await?
            .ok_or_else(|| Error::question_not_found(id))?;

        Ok(QuestionDetail {
            question: question.into(),
            choices: self.choices(id).await?,
        })
    }

    /// Vote counts of a visible question
    pub async fn results(&self, id: i32, now: DateTime<Utc>) -> Result<QuestionResults, Error> {
        let QuestionDetail { question, choices } = self.get_question_for_detail(id, now).await?;
        let total_votes = choices.iter().map(|choice| u64::from(choice.votes)).sum();

        Ok(QuestionResults {
            question,
            choices,
            total_votes,
        })
    }

    /// Add one vote to a choice of a visible question and return the updated choice
    pub async fn vote(
        &self,
        question_id: i32,
        choice_id: i32,
        now: DateTime<Utc>,
    ) -> Result<Choice, Error> {
        if self
            .db
            .find_visible_question(question_id, now)
            .await?
            .is_none()
        {
            return Err(Error::question_not_found(question_id));
        }

        let choice = self
            .db
            .increment_votes(question_id, choice_id)
            .await?
            .ok_or_else(|| Error::choice_not_found(choice_id))?;

        info!(
            "Vote recorded for choice `{choice_id}` of question `{question_id}`, now `{}`",
            choice.votes
        );

        Choice::try_from(choice)
    }

    /// Create a question
    pub async fn create_question<T>(
        &self,
        text: T,
        publish_time: DateTime<Utc>,
    ) -> Result<Question, Error>
    where
        T: AsRef<str>,
    {
        check_length("question_text", text.as_ref(), MAX_TEXT_LENGTH)?;

        let question = self.db.insert_question(text, publish_time).await?;
        info!("Question `{}` created", question.id);

        Ok(question.into())
    }

    /// Create a choice with no votes under an existing question
    pub async fn create_choice<T>(&self, question_id: i32, text: T) -> Result<Choice, Error>
    where
        T: AsRef<str>,
    {
        check_length("choice_text", text.as_ref(), MAX_TEXT_LENGTH)?;

        Choice::try_from(self.db.insert_choice(question_id, text).await?)
    }

    /// Change the text and publication time of a question
    pub async fn update_question<T>(
        &self,
        id: i32,
        text: T,
        publish_time: DateTime<Utc>,
    ) -> Result<Question, Error>
    where
        T: AsRef<str>,
    {
        check_length("question_text", text.as_ref(), MAX_TEXT_LENGTH)?;

        Ok(self.db.update_question(id, text, publish_time).await?.into())
    }

    /// Delete a question and every choice it owns
    pub async fn delete_question(&self, id: i32) -> Result<(), Error> {
        let choices = self.db.delete_question(id).await?;
        info!("Question `{id}` deleted along with `{choices}` choices");

        Ok(())
    }

    /// Delete a single choice
    pub async fn delete_choice(&self, id: i32) -> Result<(), Error> {
        self.db.delete_choice(id).await
    }

    /// Any question by id, regardless of visibility
    pub async fn question(&self, id: i32) -> Result<Question, Error> {
        self.db
            .find_question(id)
            .await?
            .map(Question::from)
            .ok_or_else(|| Error::question_not_found(id))
    }

    /// Choices of a question in creation order
    pub async fn choices(&self, question_id: i32) -> Result<Vec<Choice>, Error> {
        self.db
            .find_choices(question_id)
            .await?
            .into_iter()
            .map(Choice::try_from)
            .collect()
    }
}
