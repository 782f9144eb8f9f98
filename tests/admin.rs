use anyhow::Result;
use chrono::{Duration, Utc};
use pretty_assertions::assert_eq;

use poll_catalog::{
    admin::{
        AdminSite, Cell, ChangeListQuery, ChoiceForm, DateFilter, ListColumn, ModelAdmin,
        QuestionField, QuestionForm,
    },
    Catalog, Error,
};

const MODEL: &str = "question";

async fn setup() -> Result<(Catalog, AdminSite)> {
    Ok((
        Catalog::connect("sqlite::memory:").await?,
        AdminSite::polls()?,
    ))
}

#[test]
fn registry() -> Result<()> {
    let mut site = AdminSite::polls()?;
    assert_eq!(site.models(), vec!["question"]);
    assert_eq!(site.model_admin(MODEL)?, &ModelAdmin::question());

    assert!(matches!(
        site.register(MODEL, ModelAdmin::default()),
        Err(Error::AlreadyRegistered(_))
    ));
    assert!(matches!(
        site.model_admin("choice"),
        Err(Error::NotRegistered(_))
    ));

    site.register("draft", ModelAdmin::default())?;
    assert_eq!(site.models(), vec!["draft", "question"]);

    Ok(())
}

#[tokio::test]
async fn change_list_shows_every_question() -> Result<()> {
    let (catalog, site) = setup().await?;
    let now = Utc::now();

    let recent = catalog
        .create_question("Recent question.", now - Duration::hours(1))
        .await?;
    let future = catalog
        .create_question("Future question.", now + Duration::days(30))
        .await?;

    let change_list = site
        .change_list(&catalog, MODEL, &ChangeListQuery::default(), now)
        .await?;

    assert_eq!(
        change_list.headers,
        vec!["Question text", "Date published", "Published recently?"]
    );
    assert_eq!(change_list.rows.len(), 2);

    // newest id first
    assert_eq!(change_list.rows[0].question, future);
    assert_eq!(
        change_list.rows[0].cells,
        vec![
            Cell::Text("Future question.".to_string()),
            Cell::DateTime(future.publish_time),
            Cell::Boolean(false),
        ]
    );
    assert_eq!(change_list.rows[1].question, recent);
    assert_eq!(change_list.rows[1].cells[2], Cell::Boolean(true));
    assert_eq!(change_list.rows[1].cells[2].to_string(), "yes");

    Ok(())
}

#[tokio::test]
async fn change_list_search() -> Result<()> {
    let (catalog, site) = setup().await?;
    let now = Utc::now();

    let _question = catalog.create_question("What's up?", now).await?;
    let _question = catalog.create_question("What is your favourite colour?", now).await?;
    let _question = catalog.create_question("Favourite food?", now).await?;
    let _question = catalog.create_question("snake_case or camelCase?", now).await?;

    let search = |text: &str| ChangeListQuery {
        search: Some(text.to_string()),
        order_by: Some(ListColumn::Field(QuestionField::QuestionText)),
        descending: false,
        ..Default::default()
    };

    let texts = |rows: Vec<poll_catalog::admin::ChangeListRow>| {
        rows.into_iter()
            .map(|row| row.question.text)
            .collect::<Vec<_>>()
    };

    let change_list = site
        .change_list(&catalog, MODEL, &search("FAVOURITE"), now)
        .await?;
    assert_eq!(
        texts(change_list.rows),
        vec!["Favourite food?", "What is your favourite colour?"]
    );

    let change_list = site
        .change_list(&catalog, MODEL, &search("what favourite"), now)
        .await?;
    assert_eq!(texts(change_list.rows), vec!["What is your favourite colour?"]);

    let change_list = site
        .change_list(&catalog, MODEL, &search("nothing"), now)
        .await?;
    assert!(change_list.rows.is_empty());

    // wildcards match literally
    let change_list = site
        .change_list(&catalog, MODEL, &search("_"), now)
        .await?;
    assert_eq!(texts(change_list.rows), vec!["snake_case or camelCase?"]);

    let change_list = site
        .change_list(&catalog, MODEL, &search("%"), now)
        .await?;
    assert!(change_list.rows.is_empty());

    Ok(())
}

#[tokio::test]
async fn change_list_date_filter() -> Result<()> {
    let (catalog, site) = setup().await?;
    let now = Utc::now();

    let _question = catalog.create_question("Ancient", now - Duration::days(800)).await?;
    let week = catalog.create_question("Last week", now - Duration::days(3)).await?;
    let today = catalog.create_question("Today", now).await?;

    let filtered = |date_filter| ChangeListQuery {
        date_filter,
        ..Default::default()
    };

    let change_list = site
        .change_list(&catalog, MODEL, &filtered(DateFilter::Today), now)
        .await?;
    assert_eq!(
        change_list
            .rows
            .iter()
            .map(|row| row.question.id)
            .collect::<Vec<_>>(),
        vec![today.id]
    );

    let change_list = site
        .change_list(&catalog, MODEL, &filtered(DateFilter::PastSevenDays), now)
        .await?;
    assert_eq!(
        change_list
            .rows
            .iter()
            .map(|row| row.question.id)
            .collect::<Vec<_>>(),
        vec![today.id, week.id]
    );

    let change_list = site
        .change_list(&catalog, MODEL, &filtered(DateFilter::AnyDate), now)
        .await?;
    assert_eq!(change_list.rows.len(), 3);

    Ok(())
}

#[tokio::test]
async fn change_list_ordering() -> Result<()> {
    let (catalog, site) = setup().await?;
    let now = Utc::now();

    let newer = catalog.create_question("Newer", now - Duration::days(1)).await?;
    let older = catalog.create_question("Older", now - Duration::days(9)).await?;
    let future = catalog.create_question("Future", now + Duration::days(2)).await?;

    let change_list = site
        .change_list(
            &catalog,
            MODEL,
            &ChangeListQuery {
                order_by: Some(ListColumn::WasPublishedRecently),
                descending: false,
                ..Default::default()
            },
            now,
        )
        .await?;
    assert_eq!(
        change_list
            .rows
            .iter()
            .map(|row| row.question.id)
            .collect::<Vec<_>>(),
        vec![older.id, newer.id, future.id]
    );

    let mut narrow = ModelAdmin::question();
    narrow.list_display = vec![ListColumn::Field(QuestionField::QuestionText)];
    let mut site = AdminSite::new();
    site.register(MODEL, narrow)?;

    let result = site
        .change_list(
            &catalog,
            MODEL,
            &ChangeListQuery {
                order_by: Some(ListColumn::Field(QuestionField::PubDate)),
                ..Default::default()
            },
            now,
        )
        .await;
    assert!(matches!(result, Err(Error::PollCatalog(_))));

    Ok(())
}

#[tokio::test]
async fn add_form_saves_filled_rows() -> Result<()> {
    let (catalog, site) = setup().await?;
    let now = Utc::now();

    let mut form = site.add_form(MODEL)?;
    assert_eq!(form.choices.len(), 3);
    assert!(form.pub_date.is_none());

    form.question_text = "What's new?".to_string();
    form.pub_date = Some(now - Duration::days(1));
    form.choices[0] = ChoiceForm::new("Not much");
    form.choices[2] = ChoiceForm::new("The sky");

    let question = site.save_form(&catalog, MODEL, None, &form).await?;

    let choices = catalog.choices(question.id).await?;
    assert_eq!(
        choices
            .iter()
            .map(|choice| choice.text.as_str())
            .collect::<Vec<_>>(),
        vec!["Not much", "The sky"]
    );
    assert_eq!(
        catalog.list_visible_questions(now).await?,
        vec![question]
    );

    Ok(())
}

#[tokio::test]
async fn change_form_edits_inline_choices() -> Result<()> {
    let (catalog, site) = setup().await?;
    let now = Utc::now();

    let question = catalog.create_question("Favourite colour?", now).await?;
    let red = catalog.create_choice(question.id, "Red").await?;
    let blue = catalog.create_choice(question.id, "Blue").await?;

    let mut form = site.change_form(&catalog, MODEL, question.id).await?;
    assert_eq!(form.question_text, "Favourite colour?");
    assert_eq!(form.pub_date, Some(question.publish_time));
    assert_eq!(form.choices.len(), 5);
    assert_eq!(form.choices[0].id, Some(red.id));
    assert_eq!(form.choices[1].choice_text, "Blue");
    assert_eq!(form.choices[4], ChoiceForm::default());

    form.question_text = "Favourite color?".to_string();
    form.choices[0].votes = 7;
    form.choices[1].delete = true;
    form.choices[2] = ChoiceForm::new("Green");
    form.choices[3].delete = true;

    let saved = site
        .save_form(&catalog, MODEL, Some(question.id), &form)
        .await?;
    assert_eq!(saved.id, question.id);
    assert_eq!(saved.text, "Favourite color?");

    let choices = catalog.choices(question.id).await?;
    assert_eq!(
        choices
            .iter()
            .map(|choice| (choice.text.as_str(), choice.votes))
            .collect::<Vec<_>>(),
        vec![("Red", 7), ("Green", 0)]
    );
    assert!(choices.iter().all(|choice| choice.id != blue.id));

    Ok(())
}

#[tokio::test]
async fn save_form_keeps_fields_outside_fieldsets() -> Result<()> {
    let (catalog, _) = setup().await?;
    let now = Utc::now();

    let mut text_only = ModelAdmin::question();
    text_only.fieldsets.truncate(1);
    let mut site = AdminSite::new();
    site.register(MODEL, text_only)?;

    let question = catalog
        .create_question("Favourite colour?", now - Duration::days(3))
        .await?;

    let mut form = site.change_form(&catalog, MODEL, question.id).await?;
    form.question_text = "Favourite color?".to_string();
    form.pub_date = None;

    let saved = site
        .save_form(&catalog, MODEL, Some(question.id), &form)
        .await?;
    assert_eq!(saved.text, "Favourite color?");
    assert_eq!(saved.publish_time, question.publish_time);

    Ok(())
}

#[tokio::test]
async fn save_form_validation() -> Result<()> {
    let (catalog, site) = setup().await?;
    let now = Utc::now();

    let form = QuestionForm {
        question_text: "   ".to_string(),
        pub_date: Some(now),
        choices: Vec::new(),
    };
    assert!(matches!(
        site.save_form(&catalog, MODEL, None, &form).await,
        Err(Error::Blank {
            field: "question_text"
        })
    ));

    let form = QuestionForm {
        question_text: "When?".to_string(),
        pub_date: None,
        choices: Vec::new(),
    };
    assert!(matches!(
        site.save_form(&catalog, MODEL, None, &form).await,
        Err(Error::Blank { field: "pub_date" })
    ));

    let form = QuestionForm {
        question_text: "Too long?".to_string(),
        pub_date: Some(now),
        choices: vec![ChoiceForm::new("y".repeat(201))],
    };
    assert!(matches!(
        site.save_form(&catalog, MODEL, None, &form).await,
        Err(Error::TextTooLong {
            field: "choice_text",
            ..
        })
    ));

    let form = QuestionForm {
        question_text: "Missing".to_string(),
        pub_date: Some(now),
        choices: Vec::new(),
    };
    assert!(site
        .save_form(&catalog, MODEL, Some(99), &form)
        .await
        .unwrap_err()
        .is_not_found());

    let change_list = site
        .change_list(&catalog, MODEL, &ChangeListQuery::default(), now)
        .await?;
    assert!(change_list.rows.is_empty());

    Ok(())
}
