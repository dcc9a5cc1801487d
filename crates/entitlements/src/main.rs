use anyhow::{anyhow, Context as _};
use entitlements::{db, env, policy::RoomConfig, AppState, Config, Result};
use db::Database;
use serde::Serialize;
use std::{env::args, path::Path};
use tracing_log::LogTracer;
use tracing_subscriber::{filter::EnvFilter, fmt::format::JsonFields, Layer};
use util::ResultExt;

const VERSION: &str = env!("CARGO_PKG_VERSION");
const USAGE: &str = "usage: entitlements <version | migrate | resolve <club-id> | check <club-id> <players> <rounds> [round-type...] | consume <club-id> | grant <club-id> <amount>>";

#[tokio::main]
async fn main() -> Result<()> {
    if let Err(error) = env::load_dotenv() {
        eprintln!(
            "error loading .env.toml (this is expected in production): {}",
            error
        );
    }

    let args = args().skip(1).collect::<Vec<_>>();
    let args = args.iter().map(String::as_str).collect::<Vec<_>>();

    let config = envy::from_env::<Config>().context("error loading config")?;
    init_tracing(&config);

    match args.as_slice() {
        ["version"] => {
            println!("entitlements v{VERSION}");
        }
        ["migrate"] => {
            let database_url = config
                .database_url
                .clone()
                .ok_or_else(|| anyhow!("DATABASE_URL is required to run migrations"))?;
            let mut db_options = db::ConnectOptions::new(database_url);
            db_options.max_connections(config.max_connections());
            let db = Database::new(db_options).await?;

            let migrations_path = config
                .migrations_path
                .as_deref()
                .unwrap_or_else(|| Path::new(concat!(env!("CARGO_MANIFEST_DIR"), "/migrations")));

            let migrations = db.migrate(migrations_path, false).await?;
            for (migration, duration) in migrations {
                println!(
                    "Ran {} {} {:?}",
                    migration.version, migration.description, duration
                );
            }
        }
        ["resolve", club_id] => {
            let state = AppState::new(config).await?;
            print_json(&state.entitlements.resolve(Some(*club_id)).await)?;
        }
        ["check", club_id, players, rounds, round_types @ ..] => {
            let room = RoomConfig {
                players: players
                    .parse()
                    .with_context(|| format!("invalid player count {players:?}"))?,
                rounds: rounds
                    .parse()
                    .with_context(|| format!("invalid round count {rounds:?}"))?,
                round_types: round_types.iter().map(|s| s.to_string()).collect(),
                extras: None,
            };
            let state = AppState::new(config).await?;
            print_json(&state.entitlements.check_room(Some(*club_id), &room).await)?;
        }
        ["consume", club_id] => {
            let state = AppState::new(config).await?;
            let consumed = state.entitlements.consume_credit(club_id).await;
            tracing::info!(club_id, consumed, "consumed credit");
            print_json(&serde_json::json!({ "consumed": consumed }))?;
        }
        ["grant", club_id, amount] => {
            let amount: i32 = amount
                .parse()
                .with_context(|| format!("invalid credit amount {amount:?}"))?;
            let state = AppState::new(config).await?;
            let granted = state.entitlements.grant_credits(club_id, amount).await;
            tracing::info!(club_id, amount, granted, "granted credits");
            print_json(&serde_json::json!({ "granted": granted }))?;
        }
        _ => {
            Err(anyhow!(USAGE))?;
        }
    }
    Ok(())
}

fn print_json(value: &impl Serialize) -> Result<()> {
    // Going through a `Value` folds override extensions onto the fields they shadow.
    let value = serde_json::to_value(value)?;
    println!("{}", serde_json::to_string_pretty(&value)?);
    Ok(())
}

pub fn init_tracing(config: &Config) -> Option<()> {
    use std::str::FromStr;
    use tracing_subscriber::layer::SubscriberExt;
    let rust_log = config.rust_log.clone()?;

    LogTracer::init().log_err()?;

    let subscriber = tracing_subscriber::Registry::default()
        .with(if config.log_json.unwrap_or(false) {
            Box::new(
                tracing_subscriber::fmt::layer()
                    .with_writer(std::io::stderr)
                    .fmt_fields(JsonFields::default())
                    .event_format(
                        tracing_subscriber::fmt::format()
                            .json()
                            .flatten_event(true)
                            .with_span_list(true),
                    ),
            ) as Box<dyn Layer<_> + Send + Sync>
        } else {
            Box::new(
                tracing_subscriber::fmt::layer()
                    .with_writer(std::io::stderr)
                    .event_format(tracing_subscriber::fmt::format().pretty()),
            )
        })
        .with(EnvFilter::from_str(rust_log.as_str()).log_err()?);

    tracing::subscriber::set_global_default(subscriber).log_err()?;

    None
}
