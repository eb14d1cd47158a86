use std::path::{Path, PathBuf};

use anyhow::Result;
use clap::{Parser, Subcommand};
use rand::rngs::StdRng;
use rand::SeedableRng;
use tracing_subscriber::EnvFilter;

use uptimeguard::config::{Config, LoggingConfig};
use uptimeguard::detect::rules::first_match;
use uptimeguard::predict::{predict_risk, UpdateRiskRequest, UpdateType};
use uptimeguard::simulator::{Clock, ManualClock, MetricsSimulator};

#[derive(Parser)]
#[command(
    name = "uptimeguard",
    about = "Uptime monitoring dashboard backend with simulated metrics and incident detection",
    version,
    long_about = None
)]
struct Cli {
    /// Path to a TOML config file (default: $UPTIMEGUARD_CONFIG, then /etc/uptimeguard)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the API server (and the background poller if configured)
    Serve {
        /// Bind address
        #[arg(long)]
        bind: Option<String>,

        /// SQLite database path
        #[arg(long)]
        db: Option<String>,
    },

    /// Print simulated readings without touching storage
    Simulate {
        /// Number of samples
        #[arg(long, default_value = "20")]
        count: usize,

        /// RNG seed for reproducible output
        #[arg(long)]
        seed: Option<u64>,

        /// Simulated seconds between samples
        #[arg(long, default_value = "5")]
        interval: i64,

        /// Sample as if maintenance mode were enabled
        #[arg(long)]
        maintenance: bool,

        /// JSON output for machine parsing
        #[arg(long)]
        json: bool,
    },

    /// Score the risk of a planned deployment
    Predict {
        /// Update type: minor, major or hotfix
        #[arg(long = "type", default_value = "minor")]
        update_type: UpdateType,

        /// Expected deployment duration in minutes
        #[arg(long)]
        minutes: u32,

        /// Affected service (repeatable)
        #[arg(long = "service")]
        services: Vec<String>,

        /// The update includes a database migration
        #[arg(long)]
        db_migration: bool,

        /// Free-form description
        #[arg(long, default_value = "")]
        description: String,

        /// Update title
        #[arg(long, default_value = "untitled update")]
        title: String,

        /// JSON output for machine parsing
        #[arg(long)]
        json: bool,
    },

    /// Inspect or toggle maintenance mode
    Maintenance {
        #[command(subcommand)]
        action: MaintenanceAction,

        /// SQLite database path
        #[arg(long, global = true)]
        db: Option<String>,
    },

    /// Inspect recorded incidents
    Incidents {
        #[command(subcommand)]
        action: IncidentAction,

        /// SQLite database path
        #[arg(long, global = true)]
        db: Option<String>,
    },
}

#[derive(Subcommand)]
enum MaintenanceAction {
    /// Show the current maintenance state
    Status,

    /// Enable maintenance mode
    Enable {
        /// Expected duration in minutes
        #[arg(long, default_value = "30")]
        eta: i64,
    },

    /// Disable maintenance mode
    Disable,
}

#[derive(Subcommand)]
enum IncidentAction {
    /// List the most recent incidents
    List {
        #[arg(long, default_value = "50")]
        limit: usize,
    },
}

/// Resolve configuration under a temporary stderr subscriber, so lookup
/// warnings are visible before the configured one is installed.
fn resolve_config(explicit: Option<&Path>) -> Result<Config> {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .finish();
    tracing::subscriber::with_default(subscriber, || Config::resolve(explicit))
}

fn init_tracing(logging: &LoggingConfig) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(logging.level.clone()));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);
    if logging.json {
        builder.json().init();
    } else {
        builder.init();
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let mut config = resolve_config(cli.config.as_deref())?;
    init_tracing(&config.logging);

    match cli.command {
        Commands::Serve { bind, db } => {
            if let Some(bind) = bind {
                config.server.bind = bind;
            }
            if let Some(db) = db {
                config.storage.db_path = db;
            }
            tracing::info!(bind = %config.server.bind, "Starting UptimeGuard");
            uptimeguard::serve(config).await?;
        }
        Commands::Simulate {
            count,
            seed,
            interval,
            maintenance,
            json,
        } => {
            let clock = ManualClock::new(chrono::Utc::now());
            let rng = match seed.or(config.simulator.seed) {
                Some(seed) => StdRng::seed_from_u64(seed),
                None => StdRng::from_entropy(),
            };
            let mut sim = MetricsSimulator::new(clock.clone(), rng);

            let mut rows = Vec::with_capacity(count);
            for _ in 0..count {
                let reading = sim.sample(maintenance);
                let tier = first_match(&reading).map(|rule| rule.severity);
                rows.push((reading, tier));
                clock.advance(chrono::Duration::seconds(interval));
            }

            if json {
                let out: Vec<_> = rows
                    .iter()
                    .map(|(reading, tier)| {
                        serde_json::json!({ "reading": reading, "would_raise": tier })
                    })
                    .collect();
                println!("{}", serde_json::to_string_pretty(&out)?);
            } else {
                println!(
                    "{:<27} | {:<11} | {:>6} | {:>6} | {:>8} | {:>6} | {:>7} | Incident",
                    "Timestamp", "Status", "CPU", "RAM", "Resp ms", "Err %", "DB ms"
                );
                println!(
                    "{:-<27}-|-{:-<11}-|-{:-<6}-|-{:-<6}-|-{:-<8}-|-{:-<6}-|-{:-<7}-|-{:-<8}",
                    "", "", "", "", "", "", "", ""
                );
                for (r, tier) in &rows {
                    println!(
                        "{:<27} | {:<11} | {:>6.2} | {:>6.2} | {:>8.2} | {:>6.2} | {:>7.2} | {}",
                        r.timestamp.to_rfc3339(),
                        r.status.to_string(),
                        r.cpu,
                        r.ram,
                        r.response_time,
                        r.error_rate,
                        r.db_latency,
                        tier.map(|s| s.to_string()).unwrap_or_else(|| "-".to_string())
                    );
                }
                println!("(simulated clock ended at {})", clock.now().to_rfc3339());
            }
        }
        Commands::Predict {
            update_type,
            minutes,
            services,
            db_migration,
            description,
            title,
            json,
        } => {
            let req = UpdateRiskRequest {
                update_title: title,
                update_type,
                services_affected: services,
                db_migration,
                expected_minutes: minutes,
                description,
            };
            let resp = predict_risk(&req);
            if json {
                println!("{}", serde_json::to_string_pretty(&resp)?);
            } else {
                println!("\n=== Deployment Risk: {} ===", req.update_title);
                println!("Score:    {}/100", resp.risk_score);
                println!("Level:    {}", resp.risk_level);
                println!(
                    "Downtime: {}-{} minutes",
                    resp.predicted_downtime_min, resp.predicted_downtime_max
                );
                println!("\nReasons:");
                for reason in &resp.reasons {
                    println!(" - {}", reason);
                }
                println!("\nRecommendations:");
                for rec in &resp.recommendations {
                    println!(" - {}", rec);
                }
                println!();
            }
        }
        Commands::Maintenance { action, db } => {
            let db_path = db.unwrap_or(config.storage.db_path);
            let pool = uptimeguard::storage::open_pool(&db_path)?;
            let store = uptimeguard::maintenance::MaintenanceStore::new(pool);
            let state = match action {
                MaintenanceAction::Status => store.get()?,
                MaintenanceAction::Enable { eta } => store.enable(eta)?,
                MaintenanceAction::Disable => store.disable()?,
            };
            println!("{}", serde_json::to_string_pretty(&state)?);
        }
        Commands::Incidents { action, db } => {
            let db_path = db.unwrap_or(config.storage.db_path);
            let pool = uptimeguard::storage::open_pool(&db_path)?;
            let manager = uptimeguard::detect::IncidentManager::new(pool);
            match action {
                IncidentAction::List { limit } => {
                    let list = manager.list_recent(limit)?;
                    if list.is_empty() {
                        println!("No incidents recorded.");
                    } else {
                        println!(
                            "{:<6} | {:<27} | {:<8} | {:<8} | Message",
                            "ID", "Timestamp", "Severity", "Status"
                        );
                        println!("{:-<6}-|-{:-<27}-|-{:-<8}-|-{:-<8}-|-{:-<30}", "", "", "", "", "");
                        for i in list {
                            println!(
                                "{:<6} | {:<27} | {:<8} | {:<8} | {}",
                                i.id,
                                i.timestamp.to_rfc3339(),
                                i.severity,
                                i.status.as_str(),
                                i.message
                            );
                        }
                    }
                }
            }
        }
    }

    Ok(())
}
