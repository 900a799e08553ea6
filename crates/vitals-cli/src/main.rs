//! `vitals` command line tool.
//!
//! Seeds synthetic history into SQLite, prints summaries and insights, and
//! talks to the remote collaborators configured through the environment.
//! `--offline` swaps the remote collaborators for local stand-ins.

use std::sync::Arc;

use clap::{Parser, Subcommand};
use metric_store::{Database, ProfileField, SqliteStore};
use mock_services::{CannedServices, EchoCompletion};
use telemetry_synth::{SubjectProfile, MAX_HISTORY_DAYS};
use tracing::info;
use vitals_core::{MealType, MetricQuery, MetricType, NutritionRequest, RecipeFilters};
use wellness_client::WellnessApiClient;
use wellness_service::{Collaborators, SeedOutcome, ServiceConfig, WellnessService};

#[derive(Debug, Parser)]
#[command(name = "vitals")]
#[command(about = "Wellness dashboard service layer from the command line")]
struct Args {
    /// SQLite URL. Falls back to VITALS_DATABASE_URL.
    #[arg(long, global = true)]
    database_url: Option<String>,

    /// Use local stand-ins instead of the remote API
    #[arg(long, global = true)]
    offline: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Write synthetic history for a user
    Seed {
        #[arg(long)]
        user: String,

        /// Days of history (overrides VITALS_HISTORY_DAYS)
        #[arg(long, value_parser = clap::value_parser!(u32).range(1..=i64::from(MAX_HISTORY_DAYS)))]
        days: Option<u32>,

        /// Seed even if the user already has records
        #[arg(long)]
        force: bool,
    },

    /// Print per-metric aggregates
    Summary {
        #[arg(long)]
        user: String,

        #[arg(long)]
        json: bool,
    },

    /// Print templated insights
    Insights {
        #[arg(long)]
        user: String,
    },

    /// Print recent records of one metric
    Metrics {
        #[arg(long)]
        user: String,

        /// heart_rate, steps, sleep, glucose or hrv
        #[arg(long)]
        metric: MetricType,

        #[arg(long, default_value_t = 10)]
        limit: u32,
    },

    /// Send a chat message and print the reply
    Chat {
        #[arg(long)]
        user: String,

        /// Existing session to continue
        #[arg(long)]
        session: Option<String>,

        message: String,
    },

    /// Analyze a food
    Nutrition {
        #[arg(long)]
        user: String,

        food: String,

        #[arg(long, default_value = "100g")]
        quantity: String,

        /// breakfast, lunch, dinner or snack
        #[arg(long)]
        meal: Option<MealType>,
    },

    /// Search recipes
    Recipes {
        query: String,

        #[arg(long)]
        max_calories: Option<u32>,

        #[arg(long)]
        low_glycemic: bool,
    },

    /// Show or update a user profile
    Profile {
        #[arg(long)]
        user: String,

        /// Field to update: display_name, timezone or fitness_level
        #[arg(long, requires = "value")]
        set: Option<String>,

        #[arg(long)]
        value: Option<String>,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load .env file if present
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();

    let mut config = ServiceConfig::from_env()?;
    if let Some(url) = args.database_url.clone() {
        config.database_url = url;
    }
    if let Command::Seed { days: Some(days), .. } = &args.command {
        config.history_days = *days;
    }

    let db = Database::connect(&config.database_url).await?;
    db.migrate().await?;
    let store = Arc::new(SqliteStore::new(db));

    let service = build_service(config, store.clone(), args.offline)?;

    match args.command {
        Command::Seed { user, force, .. } => {
            register_profile(&service, &store, &user).await?;
            if force {
                let report = service.seed_history(&user).await;
                println!(
                    "Wrote {}/{} records in {} chunks ({} failed)",
                    report.persisted, report.attempted, report.chunks, report.failed_chunks
                );
            } else {
                match service.ensure_seeded(&user).await? {
                    SeedOutcome::AlreadySeeded(count) => {
                        println!("{} already has {} records; use --force to add more", user, count)
                    }
                    SeedOutcome::Seeded(report) => println!(
                        "Wrote {}/{} records in {} chunks ({} failed)",
                        report.persisted, report.attempted, report.chunks, report.failed_chunks
                    ),
                }
            }
        }
        Command::Summary { user, json } => {
            register_profile(&service, &store, &user).await?;
            let summary = service.metrics_summary(&user).await?;
            if json {
                println!("{}", serde_json::to_string_pretty(&summary)?);
            } else if summary.is_empty() {
                println!("No data for {}", user);
            } else {
                for stats in summary.metrics.values() {
                    println!(
                        "{:<10} n={:<4} avg={:<8} min={:<8} max={:<8} latest={} {}",
                        stats.metric_type.as_str(),
                        stats.count,
                        stats.average,
                        stats.min,
                        stats.max,
                        stats.latest,
                        stats.unit
                    );
                }
            }
        }
        Command::Insights { user } => {
            register_profile(&service, &store, &user).await?;
            for insight in service.insights(&user).await? {
                println!("[{:?}] {}: {}", insight.level, insight.title, insight.message);
            }
        }
        Command::Metrics {
            user,
            metric,
            limit,
        } => {
            register_profile(&service, &store, &user).await?;
            let query = MetricQuery::for_user(&user).metric(metric).limit(limit);
            let response = service.get_metrics(&query).await?;
            info!(source = ?response.source, records = response.records.len(), "Fetched metrics");
            for record in response.records {
                println!(
                    "{}  {} {}",
                    record.timestamp.format("%Y-%m-%d %H:%M"),
                    record.value,
                    record.unit
                );
            }
        }
        Command::Chat {
            user,
            session,
            message,
        } => {
            let exchange = service
                .send_chat_message(&user, &message, session.as_deref())
                .await?;
            println!("{}", exchange.response);
            info!(
                session_id = %exchange.session.id,
                cached = exchange.cached,
                persisted = exchange.persisted,
                "Chat exchange complete"
            );
        }
        Command::Nutrition {
            user,
            food,
            quantity,
            meal,
        } => {
            let mut request = NutritionRequest::new(food, quantity, user);
            if let Some(meal) = meal {
                request = request.meal(meal);
            }
            let analysis = service.analyze_nutrition(&request).await?;
            println!("{}", serde_json::to_string_pretty(&analysis)?);
        }
        Command::Recipes {
            query,
            max_calories,
            low_glycemic,
        } => {
            let filters = RecipeFilters {
                max_calories,
                low_glycemic,
                ..RecipeFilters::default()
            };
            let results = service.search_recipes(&query, &filters).await?;
            for recipe in results.recipes {
                match recipe.calories {
                    Some(calories) => println!("{} ({:.0} kcal)", recipe.title, calories),
                    None => println!("{}", recipe.title),
                }
            }
        }
        Command::Profile { user, set, value } => {
            if let Some(field) = set {
                let field = ProfileField::parse(&field)
                    .ok_or_else(|| format!("Unknown profile field: {}", field))?;
                store.set_profile_field(&user, field, value.as_deref()).await?;
                info!(user_id = %user, field = field.name(), "Updated profile");
            }
            match store.profile(&user).await? {
                Some(profile) => println!("{}", serde_json::to_string_pretty(&profile)?),
                None => println!("No profile for {}", user),
            }
        }
    }

    service.timer().summary().await.iter().for_each(|stats| {
        info!(
            operation = %stats.name,
            count = stats.count,
            avg_ms = stats.average().as_millis() as u64,
            error_rate = stats.error_rate(),
            "Operation stats"
        )
    });

    store.database().close().await;
    Ok(())
}

fn build_service(
    config: ServiceConfig,
    store: Arc<SqliteStore>,
    offline: bool,
) -> Result<WellnessService, Box<dyn std::error::Error>> {
    let collaborators = if offline {
        let canned = Arc::new(CannedServices::new());
        Collaborators {
            metrics: store.clone(),
            chats: store,
            completion: Arc::new(EchoCompletion::with_prefix("(offline) ")),
            nutrition: canned.clone(),
            recipes: canned.clone(),
            speech: canned,
            notifier: None,
        }
    } else {
        let client = Arc::new(WellnessApiClient::from_env()?);
        Collaborators {
            metrics: store.clone(),
            chats: store,
            completion: client.clone(),
            nutrition: client.clone(),
            recipes: client.clone(),
            speech: client,
            notifier: None,
        }
    };
    Ok(WellnessService::new(config, collaborators))
}

/// Use the stored fitness level when synthesizing for this user.
async fn register_profile(
    service: &WellnessService,
    store: &SqliteStore,
    user_id: &str,
) -> Result<(), Box<dyn std::error::Error>> {
    if let Some(level) = store.fitness_level(user_id).await? {
        service.register_profile(user_id, SubjectProfile::from_fitness_level(&level));
    }
    Ok(())
}
