// Barbershop entry point.
//
// Startup sequence:
// 1. Initialize tracing (log to file, not terminal)
// 2. Load config
// 3. Restore the last signed-in session
// 4. Open the configured backend (SQLite or hosted)
// 5. Create mpsc channels
// 6. Spawn app logic task
// 7. Run the TUI until the user quits
// 8. Cleanup on exit

use std::path::Path;
use std::sync::Arc;

use anyhow::Context;
use barbershop_app::app::{self, AppState, Backend};
use barbershop_core::config::{self, BackendKind, Config};
use barbershop_core::db::Database;
use barbershop_core::hosted::HostedBackend;
use barbershop_core::seed;
use barbershop_core::session::{Session, SessionStore};
use barbershop_tui::tui;
use tokio::sync::mpsc;
use tracing::{error, info, warn};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // 1. Initialize tracing (log to file, not terminal)
    init_tracing()?;
    info!("Barbershop starting up");

    // 2. Load config
    let config = config::load_config().context("failed to load configuration")?;
    info!(
        backend = ?config.backend,
        length = ?config.editor.length,
        full_list = ?config.editor.full_list,
        "Config loaded"
    );

    // 3. Restore the last signed-in session
    let sessions = match SessionStore::platform_default() {
        Ok(store) => Some(store),
        Err(e) => {
            warn!("Session persistence disabled: {}", e);
            None
        }
    };
    let session = restore_session(sessions.as_ref());

    // 4. Open the configured backend
    let backend = open_backend(&config, session.as_ref())?;

    // 5. Create mpsc channels
    let (cmd_tx, cmd_rx) = mpsc::channel(64);
    let (ui_tx, ui_rx) = mpsc::channel(256);

    // 6. Spawn app logic task
    let app_state = AppState::new(backend, config.editor, config.search, session, sessions);
    let app_handle = tokio::spawn(async move {
        if let Err(e) = app::run(cmd_rx, ui_tx, app_state).await {
            error!("Application loop error: {}", e);
        }
    });

    // 7. Run the TUI event loop (blocking until user quits)
    info!("Application ready");
    if let Err(e) = tui::run(ui_rx, cmd_tx).await {
        error!("TUI error: {}", e);
    }

    // 8. Cleanup: wait for app task to finish (with timeout)
    let _ = tokio::time::timeout(std::time::Duration::from_secs(5), async {
        let _ = app_handle.await;
    })
    .await;

    info!("Barbershop shut down cleanly");
    Ok(())
}

fn restore_session(sessions: Option<&SessionStore>) -> Option<Session> {
    let store = sessions?;
    match store.load() {
        Ok(Some(session)) => {
            info!(email = %session.email, "Restored session");
            Some(session)
        }
        Ok(None) => None,
        Err(e) => {
            warn!("Ignoring unreadable session file {}: {}", store.path().display(), e);
            None
        }
    }
}

fn open_backend(config: &Config, session: Option<&Session>) -> anyhow::Result<Backend> {
    match config.backend {
        BackendKind::Sqlite => {
            let db = Database::open(&config.db_path).context("failed to open database")?;
            info!("Database opened at {}", config.db_path);
            if let Some(csv) = &config.seed_csv {
                let imported = seed::seed_if_empty(&db, Path::new(csv))
                    .context("failed to seed player catalog")?;
                if imported > 0 {
                    info!("Imported {} players from {}", imported, csv);
                }
            }
            Ok(Backend::shared(Arc::new(db)))
        }
        BackendKind::Hosted => {
            let hosted = HostedBackend::from_config(config)
                .context("hosted backend selected but url or api_key is missing")?
                .with_access_token(session.and_then(|s| s.access_token.clone()));
            info!("Using hosted backend");
            Ok(Backend::shared(Arc::new(hosted)))
        }
    }
}

/// Initialize tracing to log to a file (not the terminal, which is used by the TUI).
fn init_tracing() -> anyhow::Result<()> {
    use tracing_subscriber::fmt;
    use tracing_subscriber::EnvFilter;

    let log_dir = std::env::current_dir()?.join("logs");
    std::fs::create_dir_all(&log_dir)?;

    let log_file = std::fs::File::create(log_dir.join("barbershop.log"))?;

    let subscriber = fmt::Subscriber::builder()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("barbershop=info,warn")),
        )
        .with_writer(log_file)
        .with_ansi(false)
        .with_target(true)
        .with_thread_ids(true)
        .with_line_number(true)
        .finish();

    tracing::subscriber::set_global_default(subscriber)
        .context("failed to set tracing subscriber")?;

    Ok(())
}
