/**
 * Board Watch
 *
 * Connects to the server, enters one board and logs every change to its
 * apps until interrupted.
 *
 * Usage: board_watch <board-id>
 */

#[cfg(feature = "cli")]
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    use boardsync::client::{Config, SessionState, Workspace};

    dotenv::dotenv().ok();

    let env_filter = std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string());
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::new(&env_filter))
        .init();

    let board_id = std::env::args()
        .nth(1)
        .ok_or("usage: board_watch <board-id>")?;

    let config = Config::from_env()?;
    let workspace = Workspace::connect(&config);
    workspace.transport().wait_open().await?;

    let outcome = workspace.session().enter_board(&board_id).await?;
    tracing::info!("[Watch] {:?}", outcome);

    let mut apps = workspace.apps().watch();
    let mut session = workspace.session().watch_state();
    loop {
        tokio::select! {
            changed = apps.changed() => {
                if changed.is_err() {
                    break;
                }
                let collection = apps.borrow_and_update().clone();
                tracing::info!("[Watch] {} apps on {}", collection.len(), board_id);
                for app in collection.iter() {
                    tracing::debug!(
                        "[Watch]   {} {} {:?} at ({}, {})",
                        app.id,
                        app.data.app_type,
                        app.data.title,
                        app.data.position.x,
                        app.data.position.y
                    );
                }
            }
            changed = session.changed() => {
                if changed.is_err() {
                    break;
                }
                if *session.borrow_and_update() == SessionState::Idle {
                    tracing::warn!("[Watch] Session went idle");
                    break;
                }
            }
            _ = tokio::signal::ctrl_c() => {
                tracing::info!("[Watch] Interrupted");
                break;
            }
        }
    }

    workspace.shutdown().await;
    Ok(())
}

#[cfg(not(feature = "cli"))]
fn main() {
    eprintln!("board_watch requires the 'cli' feature to be enabled.");
    eprintln!("Run with: cargo run --bin board_watch --features cli -- <board-id>");
    std::process::exit(1);
}
