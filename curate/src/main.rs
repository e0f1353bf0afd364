use anyhow::{Context, Result};
use curate::Args;
use std::{env, sync::Arc};
use structopt::StructOpt;
use tracing::{trace_span, Instrument};
use tracing_subscriber::{filter::LevelFilter, prelude::*, EnvFilter};
use wake_vision::Config;

#[tokio::main]
pub async fn main() -> Result<()> {
    // setup tracing
    let fmt_layer = tracing_subscriber::fmt::layer().with_target(true).compact();
    let filter_layer = {
        let filter = EnvFilter::from_default_env();
        if env::var("RUST_LOG").is_err() {
            filter.add_directive(LevelFilter::INFO.into())
        } else {
            filter
        }
    };

    tracing_subscriber::registry()
        .with(filter_layer)
        .with(fmt_layer)
        .init();

    // parse arguments
    let args = Args::from_args();
    let mut config = Config::open(&args.config_file).with_context(|| {
        format!(
            "failed to load config file '{}'",
            args.config_file.display()
        )
    })?;
    if let Some(label_type) = args.label_type {
        config.labeling.label_type = label_type;
    }

    // start curation
    curate::start(Arc::new(config), args.train_steps)
        .instrument(trace_span!("curate"))
        .await?;

    Ok(())
}
