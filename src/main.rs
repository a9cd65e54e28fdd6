//! daog probe - runs one statement inside a transaction context.
//!
//! Useful to check that a datasource configuration connects, begins the
//! requested transaction style and finalizes cleanly.

use clap::Parser;
use daog::config::Config;
use daog::db::new_trace_id;
use daog::{DaoError, Datasource, TransContext, auto_trans_with_result};
use tracing::{error, info};
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

/// Initialize the tracing subscriber for logging.
fn init_tracing(config: &Config) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log_level));

    let subscriber = tracing_subscriber::registry().with(filter);

    if config.json_logs {
        subscriber.with(fmt::layer().json()).init();
    } else {
        subscriber
            .with(fmt::layer().with_target(true).with_thread_ids(true))
            .init();
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = Config::parse();

    init_tracing(&config);

    info!(
        style = %config.style,
        "Starting daog probe v{}",
        env!("CARGO_PKG_VERSION")
    );

    let datasource = Datasource::new(&config.datasource)?;
    let trace_id = config.trace_id.clone().unwrap_or_else(new_trace_id);
    let sql = config.sql.clone();

    let result = auto_trans_with_result(
        || TransContext::new(&datasource, config.style, trace_id),
        |tc| {
            Box::pin(async move {
                let value = tc.fetch_optional_i64(&sql, &[]).await?;
                Ok::<_, DaoError>(value)
            })
        },
    )
    .await;

    datasource.shutdown().await;

    match result {
        Ok(value) => {
            info!(result = ?value, "Probe succeeded");
            Ok(())
        }
        Err(e) => {
            error!(error = %e, suggestion = ?e.suggestion(), "Probe failed");
            Err(e.into())
        }
    }
}
