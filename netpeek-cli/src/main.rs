//! ## netpeek
//! Command-line front end for the capture engine: list interfaces, or capture on
//! one and print decoded packets until a count, a duration or Ctrl-C.

use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Context};
use clap::Parser;
use tokio::time::{sleep_until, Instant};
use tracing::{debug, info};

use netpeek_capture::{registry, CaptureDriver, DeviceFilter, DriverError, PcapDriver};
use netpeek_config::NetpeekConfig;
use netpeek_engine::config::{capture_options, default_device};
use netpeek_engine::{CaptureSession, SessionOptions};
use netpeek_telemetry::{logging, LogFormat, MetricsRecorder};

mod commands;
mod output;

use commands::{CaptureArgs, Cli, Commands, InterfacesArgs};

// How often the capture loop checks that the stream is still alive.
const LIVENESS_INTERVAL: Duration = Duration::from_millis(500);

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => NetpeekConfig::load_from_path(path),
        None => NetpeekConfig::load(),
    }
    .context("loading configuration")?;

    let format: LogFormat = config.telemetry.log_format.parse()?;
    logging::init(&config.telemetry.log_level, format)?;
    debug!(?config, "Configuration loaded");

    match cli.command {
        Commands::Interfaces(args) => interfaces(args, &config),
        Commands::Capture(args) => capture(args, &config).await,
    }
}

fn interfaces(args: InterfacesArgs, config: &NetpeekConfig) -> anyhow::Result<()> {
    let driver = PcapDriver::new(capture_options(config));
    let interfaces = registry::list_interfaces(&driver)?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&interfaces)?);
    } else {
        print!("{}", output::interface_table(&interfaces));
    }
    Ok(())
}

/// `all` passes through; anything else must name a listed interface, by name or description.
fn resolve_device<D: CaptureDriver + ?Sized>(
    driver: &D,
    requested: &str,
) -> Result<DeviceFilter, DriverError> {
    match DeviceFilter::from(requested) {
        DeviceFilter::All => Ok(DeviceFilter::All),
        DeviceFilter::Named(name) => {
            registry::find_interface(driver, &name).map(|interface| DeviceFilter::Named(interface.name))
        }
    }
}

async fn until(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => sleep_until(deadline).await,
        None => std::future::pending().await,
    }
}

async fn capture(args: CaptureArgs, config: &NetpeekConfig) -> anyhow::Result<()> {
    let metrics = Arc::new(MetricsRecorder::new()?);
    let driver = Arc::new(PcapDriver::new(capture_options(config)));
    let device = match &args.interface {
        Some(name) => resolve_device(driver.as_ref(), name)?,
        None => default_device(config),
    };
    let session = CaptureSession::new(driver, SessionOptions::from(config), metrics.clone())?;

    let subscription = session.subscribe();
    session
        .start(device.clone())
        .await
        .with_context(|| format!("starting capture on {}", device))?;

    let deadline = args.seconds.map(|s| Instant::now() + Duration::from_secs(s));
    let stop_at = until(deadline);
    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(stop_at, ctrl_c);
    let mut liveness = tokio::time::interval(LIVENESS_INTERVAL);

    let mut printed = 0u64;
    let mut failure = None;
    loop {
        tokio::select! {
            _ = &mut ctrl_c => {
                info!("Interrupted");
                break;
            }
            _ = &mut stop_at => break,
            _ = liveness.tick() => {
                if !session.state().await.is_running() {
                    failure = session.last_error().await;
                    break;
                }
            }
            received = subscription.recv() => {
                let Some(summary) = received else { break };
                if args.json {
                    println!("{}", serde_json::to_string(summary.as_ref())?);
                } else {
                    println!("{}", output::summary_line(&summary));
                    if args.hexdump {
                        println!("{}", summary.readable_data);
                    }
                }
                printed += 1;
                if args.count.is_some_and(|count| printed >= count) {
                    break;
                }
            }
        }
    }

    session.shutdown().await?;

    eprintln!(
        "{} packets printed, {} captured, {} retained, {} dropped by slow readers",
        printed,
        metrics.frames_captured.get(),
        session.history().len(),
        metrics.summaries_dropped.get()
    );
    debug!("{}", metrics.gather_metrics()?);

    if let Some(err) = failure {
        bail!("capture on {} stopped: {}", device, err);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use netpeek_capture::{Interface, ScriptedDriver};
    use netpeek_core::events::LinkType;

    fn driver() -> ScriptedDriver {
        ScriptedDriver::new(LinkType::Ethernet)
            .with_interface(Interface::new("lo").with_description("Loopback"))
            .with_interface(Interface::new("eth0"))
    }

    #[test]
    fn resolves_by_name_or_description() {
        let driver = driver();
        assert_eq!(resolve_device(&driver, "eth0"), Ok(DeviceFilter::Named("eth0".into())));
        assert_eq!(resolve_device(&driver, "Loopback"), Ok(DeviceFilter::Named("lo".into())));
        assert_eq!(resolve_device(&driver, "all"), Ok(DeviceFilter::All));
    }

    #[test]
    fn unknown_interface_is_rejected() {
        assert_eq!(
            resolve_device(&driver(), "wlan9"),
            Err(DriverError::UnknownDevice("wlan9".into()))
        );
    }
}
