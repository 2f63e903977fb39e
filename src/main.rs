use std::net::SocketAddr;

use anyhow::Context;

use permissions_manager::config::{AppConfig, PermissionsConfig};
use permissions_manager::translator::LangDictionary;
use permissions_manager::{create_app, db, AppState};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    load_env();
    init_tracing();

    let settings = AppConfig::from_env()?;
    let pool = db::init(settings.require_database_url()?).await?;

    let config = PermissionsConfig::load(&settings.permissions_path)
        .with_context(|| format!("failed to load {}", settings.permissions_path.display()))?;
    let dictionary = LangDictionary::load_dir(&settings.lang_dir)?;

    config.manager().compile_roles().warn_dropped();

    let state = AppState::new(pool, config, dictionary)
        .with_locale(settings.locale.clone(), settings.fallback_locale.clone());
    let app = create_app(state);

    let addr = SocketAddr::from(([0, 0, 0, 0], settings.port));
    tracing::info!(%addr, "permissions manager listening");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app.into_make_service()).await?;

    Ok(())
}

fn load_env() {
    if dotenvy::dotenv().is_ok() {
        return;
    }

    let crate_env = std::path::Path::new(env!("CARGO_MANIFEST_DIR")).join(".env");
    let _ = dotenvy::from_path(crate_env);
}

fn init_tracing() {
    use tracing_subscriber::layer::SubscriberExt;
    use tracing_subscriber::util::SubscriberInitExt;

    let fmt_layer = tracing_subscriber::fmt::layer()
        .with_target(false)
        .with_thread_ids(false)
        .with_thread_names(false);

    let filter_layer = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("permissions_manager=info,tower_http=info"));

    tracing_subscriber::registry()
        .with(filter_layer)
        .with(fmt_layer)
        .init();
}
