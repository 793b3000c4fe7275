//! Implementations of the `ethapp` subcommands.

use crate::app::{append_login_name, apply_fake, apply_nodial, login_name};
use crate::args::{ExportArgs, RunArgs};
use crate::export::BlockSegmentExporter;
use crate::import::{BlockSegment, BlockSegmentImporter};
use crate::lifecycle::AppLifecycle;
use crate::services::{default_catalog, find_spec, ACCOUNTS, CHAIN, DB};
use crate::shutdown::spawn_signal_listener;
use anyhow::{Context, Result};
use ethapp_config::AppConfig;
use std::path::Path;
use tokio::io::BufWriter;
use tracing::{error, info, warn};

/// Starts every active service and runs until a termination signal.
pub async fn run(mut config: AppConfig, args: &RunArgs) -> Result<()> {
    if args.nodial {
        apply_nodial(&mut config)?;
    }
    if args.fake {
        apply_fake(&mut config)?;
    }
    if args.dev {
        if !append_login_name(&mut config, login_name().as_deref())? {
            warn!(target: "app", "can't get and add login name to client_version");
        }
        install_fatal_panic_hook();
    }
    info!(target: "config", "resolved configuration:\n{}", config.dump()?);

    let mut app = AppLifecycle::new(config);
    app.register_services(&default_catalog())?;
    let _signals =
        spawn_signal_listener(app.shutdown_token()).context("failed to install signal handlers")?;

    if let Err(err) = app.start_all().await {
        error!(target: "app", error = %err, "node failed to start");
        app.stop_all().await;
        return Err(err.into());
    }
    info!(
        target: "app",
        services = ?app.registry().active_names(),
        "node running; press Ctrl+C to stop"
    );

    app.wait_for_shutdown().await;
    info!(target: "app", "shutdown complete");
    Ok(())
}

/// Prints the configuration as TOML on stdout.
pub fn show_config(config: &AppConfig) -> Result<()> {
    print!("{}", config.dump()?);
    Ok(())
}

/// Imports block test `name` from `file` into an in-memory chain, then keeps
/// the node running until a termination signal.
pub async fn blocktest(mut config: AppConfig, file: &Path, name: &str) -> Result<()> {
    config.set("db.implementation", "memory")?;

    let mut app = AppLifecycle::new(config);
    app.register_services(&default_catalog())?;
    let importer = BlockSegmentImporter::new(app.registry())?;
    let segment = BlockSegment::load(file, name)?;
    info!(target: "import", test = name, blocks = segment.len(), "block test loaded");

    let _signals =
        spawn_signal_listener(app.shutdown_token()).context("failed to install signal handlers")?;
    if let Err(err) = app.start_all().await {
        error!(target: "app", error = %err, "node failed to start");
        app.stop_all().await;
        return Err(err.into());
    }

    if let Err(err) = importer.import(&mut app, &segment).await {
        error!(target: "import", error = %err, "block test failed");
        app.stop_all().await;
        return Err(err.into());
    }

    app.wait_for_shutdown().await;
    Ok(())
}

/// Writes the raw records of the requested range to a file.
///
/// The range is checked before the output file is created.
pub async fn export(config: AppConfig, args: &ExportArgs) -> Result<()> {
    let catalog = default_catalog();
    let mut app = AppLifecycle::new(config);
    for name in [DB, ACCOUNTS, CHAIN] {
        let spec = find_spec(&catalog, name)
            .with_context(|| format!("service '{name}' is missing from the catalog"))?;
        app.register(&spec)?;
    }

    let exporter = BlockSegmentExporter::new(app.registry())?;
    let range = match exporter.resolve_range(args.from, args.to) {
        Ok(range) => range,
        Err(err) => {
            error!(target: "export", error = %err, "invalid block range");
            return Err(err.into());
        }
    };

    let file = tokio::fs::File::create(&args.file)
        .await
        .with_context(|| format!("failed to create {}", args.file.display()))?;
    let mut out = BufWriter::new(file);
    let summary = exporter.export(range, &mut out).await?;

    info!(
        target: "export",
        file = %args.file.display(),
        blocks = summary.blocks,
        bytes = summary.bytes,
        "blocks exported"
    );
    app.stop_all().await;
    Ok(())
}

/// Makes a panic in any task terminate the process.
fn install_fatal_panic_hook() {
    let default_hook = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |info| {
        default_hook(info);
        std::process::exit(101);
    }));
}
