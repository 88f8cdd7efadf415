use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use kachingko_core::capture::{InvalidImageInput, ReceiptImage};
use kachingko_core::config::Settings;
use kachingko_core::domain::ExpenseRecord;
use kachingko_core::extract::{ExtractionOutcome, ReceiptExtractor};
use kachingko_core::insights::{self, BudgetStatus, GoalProgress, GoalUpdate, RewardSummary};
use kachingko_core::llm::gemini::GeminiClient;
use kachingko_core::storage::{
    self, ExpenseStore, GoalStore, ItemDeletion, JsonFileStore, JsonGoalFile,
};

mod render;

#[derive(Debug, Parser)]
#[command(name = "kachingko", about = "Scan receipts and track spending")]
struct Args {
    /// Print machine-readable JSON instead of text.
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Extract line items from a receipt photo and save them.
    Scan {
        path: PathBuf,

        /// Date to file the expense under (YYYY-MM-DD). Defaults to today locally.
        #[arg(long)]
        date: Option<String>,

        /// Extract and print without saving.
        #[arg(long)]
        dry_run: bool,
    },
    /// List saved receipts, newest first.
    History,
    /// Monthly spend against the budget limit, broken down by category.
    Budget {
        /// Restrict the category breakdown to one date (YYYY-MM-DD).
        #[arg(long)]
        date: Option<String>,
    },
    /// Reward points and achievements.
    Rewards,
    /// Show the savings goal, or edit it when any option is given.
    Goal {
        #[arg(long)]
        description: Option<String>,

        /// Amount to reach.
        #[arg(long)]
        target: Option<f64>,

        /// Amount saved so far.
        #[arg(long)]
        current: Option<f64>,
    },
    /// Delete a saved receipt, or one item of it.
    Delete {
        id: uuid::Uuid,

        /// Zero-based index of the item to delete.
        #[arg(long)]
        item: Option<usize>,
    },
    /// Delete all saved receipts.
    Clear,
}

#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
    dotenvy::dotenv().ok();

    let settings = Settings::from_env()?;
    let _sentry_guard = init_sentry(&settings);

    tracing_subscriber::registry()
        .with(EnvFilter::from_default_env())
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(sentry_tracing::layer())
        .init();

    let args = Args::parse();
    let store = JsonFileStore::new(&settings.store_path);

    match args.command {
        Command::Scan {
            path,
            date,
            dry_run,
        } => scan(&settings, &store, &path, date.as_deref(), dry_run, args.json).await,
        Command::History => {
            let records = insights::newest_first(store.list().await?);
            if args.json {
                println!("{}", serde_json::to_string_pretty(&records)?);
            } else {
                render::history(&records, &settings.currency);
            }
            Ok(ExitCode::SUCCESS)
        }
        Command::Budget { date } => {
            let records = store.list().await?;
            let offset = settings.utc_offset()?;
            let day = date
                .as_deref()
                .map(|d| kachingko_core::time::resolve_record_date(Some(d), chrono::Utc::now(), offset))
                .transpose()?;
            let (year, month) = match day {
                Some(d) => {
                    use chrono::Datelike;
                    (d.year(), d.month())
                }
                None => kachingko_core::time::current_month(chrono::Utc::now(), offset),
            };

            let spent = insights::monthly_total(&records, year, month);
            let status = BudgetStatus::new(settings.budget_limit, spent);
            let categories = insights::spend_by_category(&records, day);
            if args.json {
                let out = serde_json::json!({
                    "year": year,
                    "month": month,
                    "status": status,
                    "categories": categories,
                    "daily": insights::spend_by_date(&records),
                });
                println!("{}", serde_json::to_string_pretty(&out)?);
            } else {
                render::budget(year, month, &status, &categories, &settings.currency);
            }
            Ok(ExitCode::SUCCESS)
        }
        Command::Rewards => {
            let summary = RewardSummary::from_records(&store.list().await?);
            if args.json {
                println!("{}", serde_json::to_string_pretty(&summary)?);
            } else {
                render::rewards(&summary);
            }
            Ok(ExitCode::SUCCESS)
        }
        Command::Goal {
            description,
            target,
            current,
        } => {
            let update = GoalUpdate {
                description,
                target,
                current,
            };
            goal(&settings, update, args.json).await
        }
        Command::Delete { id, item } => {
            let found = match item {
                Some(index) => match storage::delete_item(&store, id, index).await? {
                    ItemDeletion::NotFound => false,
                    ItemDeletion::Removed(item) | ItemDeletion::RemovedWithRecord(item) => {
                        println!("deleted {} from {id}", item.name);
                        true
                    }
                },
                None => storage::delete_record(&store, id).await?,
            };
            if !found {
                eprintln!("no such receipt or item");
                return Ok(ExitCode::FAILURE);
            }
            Ok(ExitCode::SUCCESS)
        }
        Command::Clear => {
            store.replace(Vec::new()).await?;
            tracing::info!(path = %store.path().display(), "all expense data cleared");
            println!("All expense data has been cleared.");
            Ok(ExitCode::SUCCESS)
        }
    }
}

async fn scan(
    settings: &Settings,
    store: &JsonFileStore,
    path: &std::path::Path,
    date: Option<&str>,
    dry_run: bool,
    json: bool,
) -> anyhow::Result<ExitCode> {
    let now = chrono::Utc::now();
    let record_date =
        kachingko_core::time::resolve_record_date(date, now, settings.utc_offset()?)?;

    let image = match ReceiptImage::from_path(path).await {
        Ok(image) => image,
        Err(err) => {
            if let Some(invalid) = err.downcast_ref::<InvalidImageInput>() {
                tracing::warn!(path = %path.display(), error = %invalid, "rejected receipt image");
                eprintln!("{}", invalid.user_message());
                return Ok(ExitCode::FAILURE);
            }
            return Err(err);
        }
    };

    let client = GeminiClient::from_settings(settings)?;
    let timeout = client.timeout();
    let extractor =
        ReceiptExtractor::new(Arc::new(client), settings.currency.clone()).with_timeout(timeout);

    let result = match extractor.extract(&image).await {
        Ok(ExtractionOutcome::Items(result)) => result,
        Ok(ExtractionOutcome::Empty { reason, .. }) => {
            tracing::info!(?reason, "nothing to save");
            eprintln!("No items detected. Try scanning again.");
            return Ok(ExitCode::SUCCESS);
        }
        Err(failed) => {
            let err = anyhow::Error::new(failed.clone());
            sentry_anyhow::capture_anyhow(&err);
            eprintln!("{}", failed.user_message());
            return Ok(ExitCode::FAILURE);
        }
    };

    let record = ExpenseRecord::from_extraction(result, record_date, now);
    if json {
        println!("{}", serde_json::to_string_pretty(&record)?);
    } else {
        render::record(&record, &settings.currency);
    }

    if dry_run {
        tracing::info!(%record_date, dry_run = true, items = record.items.len(), "scan not saved");
        return Ok(ExitCode::SUCCESS);
    }

    let id = record.id;
    store.append(record).await?;
    tracing::info!(%id, %record_date, path = %store.path().display(), "saved receipt");
    Ok(ExitCode::SUCCESS)
}

async fn goal(settings: &Settings, update: GoalUpdate, json: bool) -> anyhow::Result<ExitCode> {
    let goals = JsonGoalFile::new(&settings.goal_path);
    let mut goal = goals.load_goal().await?;

    if !update.is_empty() {
        goal = match update.apply(&goal) {
            Ok(updated) => updated,
            Err(invalid) => {
                eprintln!("{invalid}");
                return Ok(ExitCode::FAILURE);
            }
        };
        goals.save_goal(&goal).await?;
        tracing::info!(path = %goals.path().display(), "financial goal updated");
    }

    let progress = GoalProgress::from(goal);
    if json {
        println!("{}", serde_json::to_string_pretty(&progress)?);
    } else {
        render::goal(&progress, &settings.currency);
    }
    Ok(ExitCode::SUCCESS)
}

fn init_sentry(settings: &Settings) -> Option<sentry::ClientInitGuard> {
    let dsn = settings.sentry_dsn.as_deref()?;
    Some(sentry::init((
        dsn,
        sentry::ClientOptions {
            release: sentry::release_name!(),
            ..Default::default()
        },
    )))
}
