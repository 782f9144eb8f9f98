use std::path::PathBuf;

use chrono::{Duration, Utc};
use clap::{Parser, Subcommand};
use poll_catalog::{
    admin::{AdminSite, ChangeListQuery, ChoiceForm, DateFilter, ListColumn},
    Catalog, Config, Error,
};

const MODEL: &str = "question";

#[derive(Parser)]
#[command(name = "polls")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Questions, choices and votes", long_about = None)]
pub struct Cli {
    /// Path to config file (default: config.toml in the platform config directory)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Database URL, overrides the config file
    #[arg(long, global = true)]
    pub database: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// List the latest published questions
    List {
        /// Maximum number of questions (default: `latest_limit` from the config)
        #[arg(long)]
        limit: Option<u64>,
    },

    /// Show a published question and its choices
    Detail { id: i32 },

    /// Show the vote counts of a published question
    Results { id: i32 },

    /// Vote for a choice
    Vote { question_id: i32, choice_id: i32 },

    /// Create a question through the admin form
    AddQuestion {
        text: String,

        /// Publication offset from now in days, negative for the past
        #[arg(long, default_value_t = 0, allow_hyphen_values = true)]
        days: i64,

        /// Choice text, may be repeated
        #[arg(long = "choice")]
        choices: Vec<String>,
    },

    /// Edit a question through the admin form
    Edit {
        id: i32,

        #[arg(long)]
        text: Option<String>,

        /// New publication offset from now in days
        #[arg(long, allow_hyphen_values = true)]
        days: Option<i64>,
    },

    /// Add a choice to a question
    AddChoice { question_id: i32, text: String },

    /// Delete a question and its choices
    Delete { question_id: i32 },

    /// Delete a single choice
    DeleteChoice { choice_id: i32 },

    /// Admin change list of every question
    Admin {
        /// Search terms, all must match the question text
        #[arg(long)]
        search: Option<String>,

        /// any, today, past-7-days, this-month or this-year
        #[arg(long, default_value = "any")]
        date: DateFilter,

        /// question_text, pub_date or was_published_recently
        #[arg(long)]
        order: Option<ListColumn>,

        /// Sort ascending instead of descending
        #[arg(long)]
        asc: bool,
    },

    /// Print the effective configuration
    Config,
}

pub async fn execute(cli: Cli) -> Result<(), Error> {
    let mut config = match &cli.config {
        Some(path) => Config::load_from(path).await?,
        None => Config::load().await?,
    };
    if let Some(url) = cli.database {
        config.database_url = Some(url);
    }

    if let Commands::Config = cli.command {
        print!("{}", config.to_toml()?);
        return Ok(());
    }

    let catalog = Catalog::open(&config).await?;
    let site = AdminSite::polls()?;
    let now = Utc::now();

    match cli.command {
        Commands::List { limit } => {
            let questions = match limit {
                Some(limit) => catalog.latest_questions(now, limit).await?,
                None => catalog.index(now).await?,
            };

            if questions.is_empty() {
                println!("No polls are available.");
            }
            for question in questions {
                println!("{:>4}  {question}", question.id);
            }
        }
        Commands::Detail { id } => {
            let detail = catalog.get_question_for_detail(id, now).await?;

            println!("{}", detail.question);
            for choice in detail.choices {
                println!("{:>4}  {choice}", choice.id);
            }
        }
        Commands::Results { id } => {
            let results = catalog.results(id, now).await?;

            println!("{}", results.question);
            for choice in &results.choices {
                println!("  {choice} -- {} vote{}", choice.votes, plural(choice.votes));
            }
            println!("  total: {}", results.total_votes);
        }
        Commands::Vote {
            question_id,
            choice_id,
        } => {
            let choice = catalog.vote(question_id, choice_id, now).await?;
            println!("{choice} -- {} vote{}", choice.votes, plural(choice.votes));
        }
        Commands::AddQuestion {
            text,
            days,
            choices,
        } => {
            let mut form = site.add_form(MODEL)?;
            form.question_text = text;
            form.pub_date = Some(now + Duration::days(days));

            if choices.len() > form.choices.len() {
                form.choices.resize(choices.len(), ChoiceForm::default());
            }
            for (row, text) in form.choices.iter_mut().zip(choices) {
                *row = ChoiceForm::new(text);
            }

            let question = site.save_form(&catalog, MODEL, None, &form).await?;
            println!("Created question {}", question.id);
        }
        Commands::Edit { id, text, days } => {
            let mut form = site.change_form(&catalog, MODEL, id).await?;
            if let Some(text) = text {
                form.question_text = text;
            }
            if let Some(days) = days {
                form.pub_date = Some(now + Duration::days(days));
            }

            let question = site.save_form(&catalog, MODEL, Some(id), &form).await?;
            println!("Saved question {}", question.id);
        }
        Commands::AddChoice { question_id, text } => {
            let choice = catalog.create_choice(question_id, text).await?;
            println!("Created choice {}", choice.id);
        }
        Commands::Delete { question_id } => {
            catalog.delete_question(question_id).await?;
            println!("Deleted question {question_id}");
        }
        Commands::DeleteChoice { choice_id } => {
            catalog.delete_choice(choice_id).await?;
            println!("Deleted choice {choice_id}");
        }
        Commands::Admin {
            search,
            date,
            order,
            asc,
        } => {
            let query = ChangeListQuery {
                search,
                date_filter: date,
                order_by: order,
                descending: !asc,
            };
            let change_list = site.change_list(&catalog, MODEL, &query, now).await?;

            println!("{:>4}  {}", "id", change_list.headers.join(" | "));
            for row in change_list.rows {
                let cells: Vec<_> = row.cells.iter().map(ToString::to_string).collect();
                println!("{:>4}  {}", row.question.id, cells.join(" | "));
            }
        }
        // printed before the database is opened
        Commands::Config => {}
    }

    Ok(())
}

fn plural(count: u32) -> &'static str {
    if count == 1 {
        ""
    } else {
        "s"
    }
}
