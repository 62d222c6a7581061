use anyhow::{Context, Result};
use gleaner::{AcquisitionPipeline, WhatlangClassifier, config::Config};
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

/// Environment variable naming the URI list file, one URI per line.
const ENV_URI_LIST: &str = "GLEANER_URI_LIST";

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let config = Config::from_env()?;

    let list_path = std::env::var(ENV_URI_LIST)
        .with_context(|| format!("{ENV_URI_LIST} must name the URI list file"))?;
    let uris: Vec<String> = std::fs::read_to_string(&list_path)
        .with_context(|| format!("cannot read URI list {list_path}"))?
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty() && !l.starts_with('#'))
        .map(str::to_string)
        .collect();
    info!("processing {} URIs into corpus '{}'", uris.len(), config.corpus_name);

    let cancel = CancellationToken::new();
    {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            if let Err(e) = tokio::signal::ctrl_c().await {
                error!("failed to listen for shutdown signal: {e}");
                return;
            }
            info!("received shutdown signal, stopping after the current document");
            cancel.cancel();
        });
    }

    let pipeline = AcquisitionPipeline::new(config, Box::new(WhatlangClassifier))
        .with_cancellation(cancel);
    let records = pipeline.run(&uris).await?;

    // Machine-readable run summary on stdout; logs carry the tally.
    println!("{}", serde_json::to_string_pretty(&records)?);
    Ok(())
}
