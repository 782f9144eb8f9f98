use std::fmt;

use ahash::AHashMap;
use chrono::{DateTime, Utc};
use tracing::{info, warn};

use super::{DateFilter, ListColumn, ModelAdmin, QuestionField};
use crate::{
    check_length, is_recently_published, Catalog, ChoiceChange, Error, Question, QuestionOrder,
    QuestionQuery, MAX_TEXT_LENGTH,
};

/// Explicit registry of model admins, built once at startup and handed to the
/// serving layer
#[must_use]
#[derive(Debug, Default)]
pub struct AdminSite {
    registry: AHashMap<String, ModelAdmin>,
}

/// Query parameters of a change list
#[must_use]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChangeListQuery {
    /// Whitespace separated terms, each must match a search field
    pub search: Option<String>,
    pub date_filter: DateFilter,
    /// Sort column, `None` sorts by id
    pub order_by: Option<ListColumn>,
    pub descending: bool,
}

impl Default for ChangeListQuery {
    fn default() -> Self {
        Self {
            search: None,
            date_filter: DateFilter::AnyDate,
            order_by: None,
            descending: true,
        }
    }
}

/// Rendered value of one change list cell
#[must_use]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Cell {
    Text(String),
    DateTime(DateTime<Utc>),
    Boolean(bool),
}

impl fmt::Display for Cell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Cell::Text(text) => f.write_str(text),
            Cell::DateTime(time) => write!(f, "{}", time.format("%Y-%m-%d %H:%M:%S")),
            Cell::Boolean(true) => f.write_str("yes"),
            Cell::Boolean(false) => f.write_str("no"),
        }
    }
}

#[must_use]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChangeListRow {
    pub question: Question,
    /// One cell per `list_display` column
    pub cells: Vec<Cell>,
}

#[must_use]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChangeList {
    pub headers: Vec<String>,
    pub rows: Vec<ChangeListRow>,
}

/// Question change form with its inline choices
#[must_use]
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct QuestionForm {
    pub question_text: String,
    pub pub_date: Option<DateTime<Utc>>,
    pub choices: Vec<ChoiceForm>,
}

/// Inline choice row, rows without an id are new
#[must_use]
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ChoiceForm {
    pub id: Option<i32>,
    pub choice_text: String,
    pub votes: u32,
    /// Delete the stored choice on save
    pub delete: bool,
}

impl ChoiceForm {
    /// A filled row for a new choice
    pub fn new<T>(choice_text: T) -> Self
    where
        T: AsRef<str>,
    {
        Self {
            choice_text: choice_text.as_ref().to_string(),
            ..Default::default()
        }
    }

    #[must_use]
    fn is_blank(&self) -> bool {
        self.id.is_none() && self.choice_text.trim().is_empty()
    }
}

impl AdminSite {
    /// An empty site
    pub fn new() -> Self {
        Self::default()
    }

    /// The site with the question admin registered
    pub fn polls() -> Result<Self, Error> {
        let mut site = Self::new();
        site.register("question", ModelAdmin::question())?;

        Ok(site)
    }

    /// Register a model admin, each model at most once
    pub fn register<T>(&mut self, model: T, admin: ModelAdmin) -> Result<(), Error>
    where
        T: AsRef<str>,
    {
        let model = model.as_ref();

        if self.registry.contains_key(model) {
            return Err(Error::AlreadyRegistered(model.to_string()));
        }

        info!("Admin registered for `{model}`");
        self.registry.insert(model.to_string(), admin);

        Ok(())
    }

    /// Registered model names in alphabetical order
    #[must_use]
    pub fn models(&self) -> Vec<&str> {
        let mut models: Vec<_> = self.registry.keys().map(String::as_str).collect();
        models.sort_unstable();
        models
    }

    pub fn model_admin(&self, model: &str) -> Result<&ModelAdmin, Error> {
        self.registry
            .get(model)
            .ok_or_else(|| Error::NotRegistered(model.to_string()))
    }

    /// List every question matching the search and filter, published or not
    pub async fn change_list(
        &self,
        catalog: &Catalog,
        model: &str,
        query: &ChangeListQuery,
        now: DateTime<Utc>,
    ) -> Result<ChangeList, Error> {
        let admin = self.model_admin(model)?;

        let terms = match &query.search {
            Some(search) if admin.search_fields.contains(&QuestionField::QuestionText) => search
                .split_whitespace()
                .map(str::to_string)
                .collect(),
            Some(_) => {
                warn!("`{model}` has no searchable text field, ignoring the search");
                Vec::new()
            }
            None => Vec::new(),
        };

        let pub_date = if admin.list_filter.contains(&QuestionField::PubDate) {
            query.date_filter.range(now)?
        } else {
            if query.date_filter != DateFilter::AnyDate {
                warn!("`{model}` has no `pub_date` filter, ignoring `{}`", query.date_filter);
            }
            None
        };

        let order_by = match query.order_by {
            Some(column) if admin.list_display.contains(&column) => column.order_field().order(),
            Some(column) => {
                return Err(Error::PollCatalog(format!(
                    "Cannot order by `{}`, it is not displayed",
                    column.header()
                )))
            }
            None => QuestionOrder::Id,
        };

        let questions = catalog
            .db()
            .find_questions(&QuestionQuery {
                terms,
                pub_date,
                order_by,
                descending: query.descending,
            })
            .await?;

        let rows = questions
            .into_iter()
            .map(|question| {
                let question = Question::from(question);
                let cells = admin
                    .list_display
                    .iter()
                    .map(|column| match column {
                        ListColumn::Field(QuestionField::QuestionText) => {
                            Cell::Text(question.text.clone())
                        }
                        ListColumn::Field(QuestionField::PubDate) => {
                            Cell::DateTime(question.publish_time)
                        }
                        ListColumn::WasPublishedRecently => {
                            Cell::Boolean(is_recently_published(&question, now))
                        }
                    })
                    .collect();

                ChangeListRow { question, cells }
            })
            .collect();

        Ok(ChangeList {
            headers: admin.headers(),
            rows,
        })
    }

    /// Blank form for a new question
    pub fn add_form(&self, model: &str) -> Result<QuestionForm, Error> {
        let admin = self.model_admin(model)?;

        Ok(QuestionForm {
            choices: vec![ChoiceForm::default(); admin.extra()],
            ..Default::default()
        })
    }

    /// Form prefilled with a stored question and its choices
    pub async fn change_form(
        &self,
        catalog: &Catalog,
        model: &str,
        id: i32,
    ) -> Result<QuestionForm, Error> {
        let admin = self.model_admin(model)?;
        let question = catalog.question(id).await?;

        let mut choices = Vec::new();
        if admin.inline.is_some() {
            for choice in catalog.choices(id).await? {
                choices.push(ChoiceForm {
                    id: Some(choice.id),
                    choice_text: choice.text,
                    votes: choice.votes,
                    delete: false,
                });
            }
            choices.resize(choices.len() + admin.extra(), ChoiceForm::default());
        }

        Ok(QuestionForm {
            question_text: question.text,
            pub_date: Some(question.publish_time),
            choices,
        })
    }

    /// Validate a form and store it, `id` is `None` for a new question
    pub async fn save_form(
        &self,
        catalog: &Catalog,
        model: &str,
        id: Option<i32>,
        form: &QuestionForm,
    ) -> Result<Question, Error> {
        let admin = self.model_admin(model)?;

        // fields outside every fieldset keep their stored value
        let stored = match id {
            Some(id)
                if !admin.is_editable(QuestionField::QuestionText)
                    || !admin.is_editable(QuestionField::PubDate) =>
            {
                Some(catalog.question(id).await?)
            }
            _ => None,
        };

        let question_text = match &stored {
            Some(question) if !admin.is_editable(QuestionField::QuestionText) => &question.text,
            _ => &form.question_text,
        };
        if question_text.trim().is_empty() {
            return Err(Error::Blank {
                field: "question_text",
            });
        }
        check_length("question_text", question_text, MAX_TEXT_LENGTH)?;

        let pub_date = match &stored {
            Some(question) if !admin.is_editable(QuestionField::PubDate) => question.publish_time,
            _ => form.pub_date.ok_or(Error::Blank { field: "pub_date" })?,
        };

        let mut changes = Vec::new();
        if admin.inline.is_some() {
            for row in &form.choices {
                if row.is_blank() {
                    continue;
                }

                match (row.id, row.delete) {
                    (Some(id), true) => changes.push(ChoiceChange::Delete { id }),
                    (None, true) => continue,
                    (id, false) => {
                        if row.choice_text.trim().is_empty() {
                            return Err(Error::Blank {
                                field: "choice_text",
                            });
                        }
                        check_length("choice_text", &row.choice_text, MAX_TEXT_LENGTH)?;

                        let text = row.choice_text.clone();
                        let votes = i32::try_from(row.votes)?;

                        changes.push(match id {
                            Some(id) => ChoiceChange::Update { id, text, votes },
                            None => ChoiceChange::Insert { text, votes },
                        });
                    }
                }
            }
        } else if !form.choices.is_empty() {
            warn!("`{model}` has no inline choices, ignoring the choice rows");
        }

        let question = catalog
            .db()
            .save_question(id, question_text, pub_date, changes)
            .await?;

        Ok(question.into())
    }
}
