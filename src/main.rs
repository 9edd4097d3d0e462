use std::process::ExitCode;
use std::sync::Arc;

use jobvisor::{Config, Harness, LogWriter, Subscribe};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_target(false)
        .init();

    let cfg = match Config::from_env() {
        Ok(cfg) => cfg,
        Err(e) => {
            tracing::error!(label = e.as_label(), "{e}");
            return ExitCode::from(e.exit_code());
        }
    };

    let subs: Vec<Arc<dyn Subscribe>> = vec![Arc::new(LogWriter::new())];
    let harness = Harness::builder(cfg).with_subscribers(subs).build();

    match harness.run().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => ExitCode::from(e.exit_code()),
    }
}
