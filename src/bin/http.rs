#[cfg(feature = "http_api")]
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    use std::net::SocketAddr;
    use std::path::PathBuf;

    use taskflow_scheduler::{SchedulingInput, SolveConfig, http_api, load_input_from_json};
    use tracing_subscriber::EnvFilter;

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let addr: SocketAddr = std::env::var("TASKFLOW_HTTP_ADDR")
        .unwrap_or_else(|_| "0.0.0.0:3000".to_string())
        .parse()?;

    // Optional settings document to start from
    let mut input = match std::env::var_os("TASKFLOW_INPUT").map(PathBuf::from) {
        Some(path) => load_input_from_json(path)?,
        None => SchedulingInput::new(chrono::Local::now().naive_local()),
    };
    if let Some(path) = std::env::var_os("TASKFLOW_CONFIG") {
        input.config = SolveConfig::from_json_file(PathBuf::from(path))?;
    }
    input.config = input.config.with_env_overrides()?;

    let state = http_api::AppState::new(input);
    #[cfg(feature = "sqlite")]
    let state = match std::env::var_os("TASKFLOW_DB") {
        Some(path) => {
            let store = taskflow_scheduler::SqliteReportStore::new(PathBuf::from(path))?;
            state.with_store(std::sync::Arc::new(store))
        }
        None => state,
    };

    tracing::info!(%addr, "taskflow HTTP API listening");
    http_api::serve(addr, state).await?;
    Ok(())
}

#[cfg(not(feature = "http_api"))]
fn main() {
    eprintln!("Rebuild with the `http_api` feature to enable the HTTP server.");
}
