use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::Context;
use clap::{Parser, Subcommand};
use dotenvy::dotenv;

use permissions_manager::config::{AppConfig, PermissionsConfig};
use permissions_manager::store::SqliteStore;
use permissions_manager::translator::{LangDictionary, Translator};
use permissions_manager::{db, PermissionSyncer};

#[derive(Parser, Debug)]
#[command(author, version, about = "permission catalog tool", long_about = None)]
struct Cli {
    /// Permissions definition file; overrides PERMISSIONS_CONFIG
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Compile the definitions and sync them into the database
    Sync {
        /// Comma-separated guard names; defaults to the config's default_guard
        #[arg(long)]
        guards: Option<String>,
    },
    /// Print the compiled catalog grouped by resource
    List,
    /// Print compiled roles
    Roles {
        /// Fail when a role references something missing from the catalog
        #[arg(long)]
        strict: bool,
    },
    /// Print labels for permission names
    Translate {
        names: Vec<String>,
        #[arg(long)]
        locale: Option<String>,
    },
    /// Apply pending migrations
    MigrateRun,
}

#[tokio::main]
async fn main() -> ExitCode {
    // Try to load env from CWD, then fall back to the crate-local `.env`.
    if dotenv().is_err() {
        let crate_env = Path::new(env!("CARGO_MANIFEST_DIR")).join(".env");
        let _ = dotenvy::from_path(crate_env);
    }
    init_tracing();

    let cli = Cli::parse();
    match run(cli).await {
        Ok(code) => code,
        Err(err) => {
            eprintln!("error: {err:#}");
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> anyhow::Result<ExitCode> {
    let settings = AppConfig::from_env()?;
    let config_path = cli.config.clone().unwrap_or_else(|| settings.permissions_path.clone());

    match cli.command {
        Commands::Sync { guards } => {
            let config = load_config(&config_path)?;
            let guards = parse_guards(guards.as_deref().unwrap_or(&config.default_guard))?;
            let pool = db::init(settings.require_database_url()?).await?;
            let store = SqliteStore::new(pool);
            let manager = config.manager();
            let syncer = PermissionSyncer::new(&store, config.super_admin_role.clone());

            let mut failed = false;
            for guard in guards {
                match syncer.execute(&manager, &guard).await {
                    Ok(report) => {
                        println!(
                            "Permissions synced for guard [{}]: {} permissions.",
                            report.guard, report.permissions_count
                        );
                        for (role, outcome) in &report.roles_processed {
                            println!("  {:<24} {}", role, outcome);
                        }
                    }
                    Err(err) => {
                        failed = true;
                        tracing::error!(guard = %guard, error = %err, "sync failed");
                        eprintln!("Sync failed for guard [{guard}]: {err}");
                    }
                }
            }

            Ok(if failed { ExitCode::FAILURE } else { ExitCode::SUCCESS })
        }
        Commands::List => {
            let config = load_config(&config_path)?;
            let catalog = config.manager().catalog();
            for (resource, permissions) in catalog.by_resource() {
                println!("{resource}");
                for permission in permissions {
                    println!("  {permission}");
                }
            }
            println!("{} permissions", catalog.len());
            Ok(ExitCode::SUCCESS)
        }
        Commands::Roles { strict } => {
            let config = load_config(&config_path)?;
            let compiled = config.manager().compile_roles();
            for (role, permissions) in compiled.iter() {
                println!("{role} ({})", permissions.len());
                for permission in permissions {
                    println!("  {permission}");
                }
            }

            if strict && compiled.has_dropped() {
                for dropped in compiled.dropped() {
                    eprintln!("unknown reference in role [{}]: {}", dropped.role, dropped.reference);
                }
                return Ok(ExitCode::FAILURE);
            }
            Ok(ExitCode::SUCCESS)
        }
        Commands::Translate { names, locale } => {
            let dictionary = LangDictionary::load_dir(&settings.lang_dir)?;
            let locale = locale.unwrap_or_else(|| settings.locale.clone());
            let translator = Translator::new(&dictionary, locale).with_fallback(settings.fallback_locale.clone());
            for (name, label) in translator.translate_many(&names) {
                println!("{name}\t{label}");
            }
            Ok(ExitCode::SUCCESS)
        }
        Commands::MigrateRun => {
            db::init(settings.require_database_url()?).await?;
            println!("Migrations applied");
            Ok(ExitCode::SUCCESS)
        }
    }
}

fn load_config(path: &Path) -> anyhow::Result<PermissionsConfig> {
    PermissionsConfig::load(path).with_context(|| format!("failed to load {}", path.display()))
}

fn parse_guards(raw: &str) -> anyhow::Result<Vec<String>> {
    let guards: Vec<String> = raw
        .split(',')
        .map(str::trim)
        .filter(|guard| !guard.is_empty())
        .map(str::to_string)
        .collect();
    if guards.is_empty() {
        anyhow::bail!("no guard names given in `{raw}`");
    }
    Ok(guards)
}

fn init_tracing() {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("permissions_manager=warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}
