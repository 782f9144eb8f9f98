use std::{fmt, ops::Range, str::FromStr};

use chrono::{DateTime, Datelike, Duration, NaiveDate, TimeZone, Utc};

use crate::{Error, QuestionOrder};

/// Question field the admin can show, edit, filter or search
#[must_use]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum QuestionField {
    QuestionText,
    PubDate,
}

impl QuestionField {
    /// Human readable name, used for headers and form labels
    #[must_use]
    pub fn verbose_name(&self) -> &'static str {
        match self {
            QuestionField::QuestionText => "question text",
            QuestionField::PubDate => "date published",
        }
    }

    pub(crate) fn order(&self) -> QuestionOrder {
        match self {
            QuestionField::QuestionText => QuestionOrder::QuestionText,
            QuestionField::PubDate => QuestionOrder::PubDate,
        }
    }
}

/// Column of the change list
#[must_use]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ListColumn {
    /// A stored field, rendered as-is
    Field(QuestionField),
    /// Computed from `pub_date`, rendered as a boolean
    WasPublishedRecently,
}

impl ListColumn {
    /// Column header
    #[must_use]
    pub fn header(&self) -> String {
        match self {
            ListColumn::Field(field) => capitalize(field.verbose_name()),
            ListColumn::WasPublishedRecently => "Published recently?".to_string(),
        }
    }

    /// Field the column sorts by
    pub fn order_field(&self) -> QuestionField {
        match self {
            ListColumn::Field(field) => *field,
            ListColumn::WasPublishedRecently => QuestionField::PubDate,
        }
    }
}

impl FromStr for ListColumn {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "question_text" => Ok(ListColumn::Field(QuestionField::QuestionText)),
            "pub_date" => Ok(ListColumn::Field(QuestionField::PubDate)),
            "was_published_recently" => Ok(ListColumn::WasPublishedRecently),
            _ => Err(Error::PollCatalog(format!("Unknown list column: `{s}`"))),
        }
    }
}

fn capitalize(text: &str) -> String {
    let mut chars = text.chars();

    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// Group of fields on the change form
#[must_use]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Fieldset {
    /// Legend, the first fieldset usually has none
    pub name: Option<&'static str>,
    pub fields: Vec<QuestionField>,
}

/// Choices edited on the question form
#[must_use]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChoiceInline {
    /// Number of blank rows offered for new choices
    pub extra: usize,
}

/// How the admin lists and edits questions
#[must_use]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelAdmin {
    pub fieldsets: Vec<Fieldset>,
    pub inline: Option<ChoiceInline>,
    pub list_display: Vec<ListColumn>,
    pub list_filter: Vec<QuestionField>,
    pub search_fields: Vec<QuestionField>,
}

impl Default for ModelAdmin {
    fn default() -> Self {
        Self {
            fieldsets: vec![Fieldset {
                name: None,
                fields: vec![QuestionField::QuestionText, QuestionField::PubDate],
            }],
            inline: None,
            list_display: vec![ListColumn::Field(QuestionField::QuestionText)],
            list_filter: Vec::new(),
            search_fields: Vec::new(),
        }
    }
}

impl ModelAdmin {
    /// The question admin of the polls site
    pub fn question() -> Self {
        Self {
            fieldsets: vec![
                Fieldset {
                    name: None,
                    fields: vec![QuestionField::QuestionText],
                },
                Fieldset {
                    name: Some("Date information"),
                    fields: vec![QuestionField::PubDate],
                },
            ],
            inline: Some(ChoiceInline { extra: 3 }),
            list_display: vec![
                ListColumn::Field(QuestionField::QuestionText),
                ListColumn::Field(QuestionField::PubDate),
                ListColumn::WasPublishedRecently,
            ],
            list_filter: vec![QuestionField::PubDate],
            search_fields: vec![QuestionField::QuestionText],
        }
    }

    /// Change list headers in display order
    #[must_use]
    pub fn headers(&self) -> Vec<String> {
        self.list_display.iter().map(ListColumn::header).collect()
    }

    /// Whether a fieldset puts `field` on the change form
    #[must_use]
    pub fn is_editable(&self, field: QuestionField) -> bool {
        self.fieldsets
            .iter()
            .any(|fieldset| fieldset.fields.contains(&field))
    }

    /// Blank inline rows on the change form
    #[must_use]
    pub fn extra(&self) -> usize {
        self.inline.as_ref().map_or(0, |inline| inline.extra)
    }
}

/// Choices of the `pub_date` list filter
#[must_use]
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub enum DateFilter {
    #[default]
    AnyDate,
    Today,
    PastSevenDays,
    ThisMonth,
    ThisYear,
}

impl DateFilter {
    pub const ALL: [DateFilter; 5] = [
        DateFilter::AnyDate,
        DateFilter::Today,
        DateFilter::PastSevenDays,
        DateFilter::ThisMonth,
        DateFilter::ThisYear,
    ];

    /// Label shown in the filter sidebar
    #[must_use]
    pub fn title(&self) -> &'static str {
        match self {
            DateFilter::AnyDate => "Any date",
            DateFilter::Today => "Today",
            DateFilter::PastSevenDays => "Past 7 days",
            DateFilter::ThisMonth => "This month",
            DateFilter::ThisYear => "This year",
        }
    }

    /// Half-open range of matching publication times, `None` for any date
    pub fn range(&self, now: DateTime<Utc>) -> Result<Option<Range<DateTime<Utc>>>, Error> {
        let today = now.date_naive();
        let tomorrow = midnight(today)? + Duration::days(1);

        let range = match self {
            DateFilter::AnyDate => return Ok(None),
            DateFilter::Today => midnight(today)?..tomorrow,
            DateFilter::PastSevenDays => midnight(today)? - Duration::days(7)..tomorrow,
            DateFilter::ThisMonth => {
                let (year, month) = if today.month() == 12 {
                    (today.year() + 1, 1)
                } else {
                    (today.year(), today.month() + 1)
                };

                first_day(today.year(), today.month())?..first_day(year, month)?
            }
            DateFilter::ThisYear => first_day(today.year(), 1)?..first_day(today.year() + 1, 1)?,
        };

        Ok(Some(range))
    }
}

impl fmt::Display for DateFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.title())
    }
}

impl FromStr for DateFilter {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "any" => Ok(DateFilter::AnyDate),
            "today" => Ok(DateFilter::Today),
            "past-7-days" => Ok(DateFilter::PastSevenDays),
            "this-month" => Ok(DateFilter::ThisMonth),
            "this-year" => Ok(DateFilter::ThisYear),
            _ => Err(Error::PollCatalog(format!("Unknown date filter: `{s}`"))),
        }
    }
}

fn midnight(date: NaiveDate) -> Result<DateTime<Utc>, Error> {
    let time = date
        .and_hms_opt(0, 0, 0)
        .ok_or_else(|| Error::PollCatalog(format!("No midnight on `{date}`")))?;

    Ok(Utc.from_utc_datetime(&time))
}

fn first_day(year: i32, month: u32) -> Result<DateTime<Utc>, Error> {
    let date = NaiveDate::from_ymd_opt(year, month, 1)
        .ok_or_else(|| Error::PollCatalog(format!("Invalid month: `{year}-{month}`")))?;

    midnight(date)
}
