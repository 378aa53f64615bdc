//! Inventory admin server.
//!
//! Run from repo root: `cargo run -p admin-server`

use inventory_admin::{app, AppState, Settings};
use tokio::net::TcpListener;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();
    let settings = Settings::from_env()?;

    let mut filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("inventory_admin=info,admin_server=info,tower_http=info"));
    for directive in settings.log_directives() {
        filter = filter.add_directive(directive.parse()?);
    }
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let bind_addr = settings.bind_addr;
    let admin_name = settings.admin_name();
    let state = AppState::init(settings).await?;
    let app = app(state);

    let listener = TcpListener::bind(bind_addr).await?;
    tracing::info!("{} listening on http://{}", admin_name, listener.local_addr()?);
    axum::serve(listener, app).await?;
    Ok(())
}
