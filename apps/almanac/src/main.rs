mod commands;

use anyhow::Context;
use clap::{Args as ClapArgs, Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;
use urania::{
    AspectEngine, AspectKind, Body, DetectionPool, EventQuery, JsonFileStore, OrbLimits, Quarter,
    Severity, SwissEphemerisOracle,
};
use urania_config::UraniaSettings;

#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Args {
    /// Config file (otherwise URANIA_CONFIG, then configs/urania.toml).
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Event store file; overrides [store] path.
    #[arg(long, global = true)]
    store: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Detect aspects for a quarter and upsert them into the store.
    Generate(GenerateArgs),
    /// Print stored aspects for a quarter as JSON.
    List(ListArgs),
    /// Print the bounds of a quarter.
    Window {
        /// Quarter tag like 2025-Q3 (default: current quarter).
        #[arg(long)]
        quarter: Option<Quarter>,
    },
}

#[derive(ClapArgs, Debug)]
struct GenerateArgs {
    /// Quarter tag like 2025-Q3.
    #[arg(long)]
    quarter: Quarter,

    /// Recompute even when the store already holds events for the quarter.
    #[arg(long)]
    force: bool,

    /// Conjunction orb limit in degrees.
    #[arg(long)]
    conjunction: Option<f64>,

    /// Square orb limit in degrees.
    #[arg(long)]
    square: Option<f64>,

    /// Opposition orb limit in degrees.
    #[arg(long)]
    opposition: Option<f64>,

    /// Moon latitude threshold for eclipse flags, in degrees.
    #[arg(long)]
    eclipse_latitude: Option<f64>,
}

impl GenerateArgs {
    fn limits(&self, base: OrbLimits) -> OrbLimits {
        OrbLimits {
            conjunction: self.conjunction.unwrap_or(base.conjunction),
            square: self.square.unwrap_or(base.square),
            opposition: self.opposition.unwrap_or(base.opposition),
            eclipse_latitude: self.eclipse_latitude.unwrap_or(base.eclipse_latitude),
        }
    }
}

#[derive(ClapArgs, Debug)]
struct ListArgs {
    #[arg(long)]
    quarter: Quarter,

    #[arg(long)]
    body1: Option<Body>,

    #[arg(long)]
    body2: Option<Body>,

    /// Matches either body of the pair.
    #[arg(long)]
    body: Option<Body>,

    #[arg(long)]
    kind: Option<AspectKind>,

    #[arg(long)]
    severity: Option<Severity>,

    /// Only eclipse-flagged events.
    #[arg(long)]
    eclipse: bool,

    #[arg(long)]
    limit: Option<usize>,
}

impl ListArgs {
    fn query(&self) -> EventQuery {
        EventQuery {
            window_id: None,
            body1: self.body1,
            body2: self.body2,
            body: self.body,
            kind: self.kind,
            severity: self.severity,
            is_eclipse: self.eclipse.then_some(true),
            limit: self.limit,
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .target(env_logger::Target::Stderr)
        .init();

    let args = Args::parse();

    match &args.command {
        Command::Window { quarter } => {
            let quarter = match quarter {
                Some(q) => *q,
                None => Quarter::current()?,
            };
            let info = commands::window_info(&quarter, chrono::Utc::now());
            println!("{}", serde_json::to_string_pretty(&info)?);
        }
        Command::Generate(generate) => {
            let settings = load(&args)?;
            let store = open_store(&settings).await?;
            let limits = generate.limits(settings.orb_limits);

            let oracle = SwissEphemerisOracle::new(settings.ephemeris_path.clone())
                .context("Failed to initialise the Swiss Ephemeris")?;
            let engine = Arc::new(AspectEngine::new(oracle, settings.scan));
            let pool = DetectionPool::new(engine, settings.max_concurrent_jobs)?;

            let report =
                commands::generate(&pool, &store, &generate.quarter, limits, generate.force).await?;
            println!("{}", serde_json::to_string_pretty(&report)?);
        }
        Command::List(list) => {
            let settings = load(&args)?;
            let store = open_store(&settings).await?;
            let report = commands::list(&store, &list.quarter, list.query()).await?;
            println!("{}", serde_json::to_string_pretty(&report)?);
        }
    }

    Ok(())
}

fn load(args: &Args) -> anyhow::Result<UraniaSettings> {
    let mut settings = urania_config::load_settings(args.config.as_deref())?;
    if let Some(store) = &args.store {
        settings.store_path = store.clone();
    }
    Ok(settings)
}

async fn open_store(settings: &UraniaSettings) -> anyhow::Result<JsonFileStore> {
    JsonFileStore::open(&settings.store_path)
        .await
        .with_context(|| format!("Failed to open event store {}", settings.store_path.display()))
}
