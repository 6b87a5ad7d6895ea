/// Clinic Backend - psychology practice API
///
/// Accounts for psychologists and patients, appointment scheduling, medical
/// records and per-psychologist analytics over a SQLite store.

mod account;
mod analytics;
mod api;
mod appointment;
mod auth;
mod config;
mod context;
mod crypto;
mod db;
mod error;
mod guards;
mod medical_record;
mod rate_limit;
mod server;

use config::ServerConfig;
use context::AppContext;
use error::ClinicResult;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> ClinicResult<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "clinic_backend=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    print_banner();

    let config = ServerConfig::from_env()?;

    let ctx = AppContext::new(config).await?;

    server::serve(ctx).await?;

    Ok(())
}

fn print_banner() {
    println!(
        r#"
   _____ _ _       _
  / ____| (_)     (_)
 | |    | |_ _ __  _  ___
 | |    | | | '_ \| |/ __|
 | |____| | | | | | | (__
  \_____|_|_|_| |_|_|\___|

        Clinic Backend v{}
        "#,
        env!("CARGO_PKG_VERSION")
    );
}
