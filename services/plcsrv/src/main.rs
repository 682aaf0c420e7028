//! plcsrv - PLC polling service

use anyhow::Context;
use clap::Parser;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use plcsrv::bootstrap::{self, Args};
use plcsrv::sink::stdout_sink;
use plcsrv::{AppConfig, Poller, Session};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let config = AppConfig::load(&args.config)
        .with_context(|| format!("Loading {}", args.config.display()))?;
    common::init_with_config(bootstrap::log_config(&args, &config.service))?;
    info!(
        "Starting {} v{} ({})",
        config.service.name,
        env!("CARGO_PKG_VERSION"),
        args.config.display()
    );

    let target = config.plc.init().context("Invalid plc configuration")?;
    info!(
        "Target {} with {} fields across {} metric blocks",
        target.url,
        target.fields.len(),
        config.plc.metric.len()
    );

    if args.validate {
        info!("Validation completed successfully");
        return Ok(());
    }

    let manager = bootstrap::driver_manager(target.schema, args.simulate);
    if !manager.is_registered(target.schema.as_str()) {
        warn!(
            "No driver registered for '{}' (available: {}); use --simulate to run without hardware",
            target.schema,
            manager.protocol_codes().join(", ")
        );
    }

    let session = Session::new(manager, target);
    let mut poller = Poller::new(
        session,
        stdout_sink(config.service.output),
        config.service.interval,
    );
    poller.start().await.context("Startup failed")?;

    if args.once {
        let result = poller.poll_once().await;
        poller.shutdown().await;
        let count = result?;
        info!("Single cycle emitted {} metrics", count);
        return Ok(());
    }

    let cancel = CancellationToken::new();
    let signal_task = common::cancel_on_shutdown(cancel.clone());

    let outcome = poller.run(cancel.clone()).await;
    cancel.cancel();
    let _ = signal_task.await;

    outcome?;
    info!("{} stopped", config.service.name);
    Ok(())
}
