use clap::Parser;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use catalog_worker::{Command, Dependencies, LogFormat, Settings, WorkerError};

#[tokio::main]
async fn main() {
    dotenv::dotenv().ok();
    let settings = Settings::parse();
    init_tracing(settings.log_format);

    let result = tokio::select! {
        result = run(&settings) => result,
        _ = tokio::signal::ctrl_c() => {
            info!("Received shutdown signal");
            Ok(())
        }
    };

    if let Err(e) = result {
        error!(error = %e, "Catalog worker stopped");
        std::process::exit(1);
    }
}

fn init_tracing(format: LogFormat) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let subscriber = tracing_subscriber::fmt().with_env_filter(filter);
    match format {
        LogFormat::Json => subscriber.json().init(),
        LogFormat::Text => subscriber.init(),
    }
}

async fn run(settings: &Settings) -> Result<(), WorkerError> {
    let dependencies = Dependencies::connect(settings).await?;

    match settings.command {
        Command::Ingest => {
            let report = dependencies.ingester(settings)?.run().await?;
            info!(
                feeds = report.feeds.len(),
                completed = report.completed(),
                skipped = report.skipped(),
                failed = report.failed(),
                ingested = report.ingested(),
                record_failures = report.record_failures(),
                "Ingestion finished"
            );
            for feed in report.feeds.iter().filter(|f| f.is_failed()) {
                warn!(feed = %feed.feed, outcome = ?feed.outcome, "Feed did not complete");
            }
            Ok(())
        }
        Command::Index => {
            let mut indexer = dependencies.indexer(settings).await?;
            indexer.run().await?;
            Ok(())
        }
    }
}
