//! # FPGA Joystick
//!
//! Poll I2C analog joysticks and publish them through uinput.
//!
//! # Control Flow
//!
//! 1. **Initialization**
//!    - Load the TOML configuration (first argument, or `config/default.toml`)
//!    - Set up logging to stdout and, if configured, a daily log file
//!    - Probe every configured device; a device that fails to probe is
//!      skipped, but at least one must start
//!
//! 2. **Main Loop**
//!    - Each device polls on its own task
//!    - Management requests are read from stdin, one per line:
//!      `<device> <attribute>` reads, `<device> <attribute> <value>` writes
//!    - Handle Ctrl+C for graceful shutdown
//!
//! 3. **Graceful Shutdown**
//!    - Cancel every poll task and wait for in-flight ticks
//!    - Release the bus handles and virtual devices
//!
//! # Examples
//!
//! ```bash
//! cargo run --release -- config/default.toml
//! ```
//!
//! ```text
//! left-stick side r
//! left-stick inject_event 2047 4095 1
//! left-stick status
//! ```

use anyhow::{bail, Context, Result};
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{error, info, warn};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use fpga_joystick::config::{Config, LoggingConfig};
use fpga_joystick::management::{Access, Attribute, Request};
use fpga_joystick::service::JoystickService;

/// Configuration file used when none is given on the command line
const DEFAULT_CONFIG_PATH: &str = "config/default.toml";

/// File name prefix for the daily rolling log
const LOG_FILE_PREFIX: &str = "fpga-joystick.log";

#[tokio::main]
async fn main() -> Result<()> {
    let path = config_path(std::env::args().skip(1));
    let config = Config::load(&path).with_context(|| format!("Failed to load configuration from {}", path))?;

    // Keep the guard alive so buffered file logs are flushed on exit
    let _guard = init_logging(&config.logging)?;

    info!("FPGA Joystick v{} starting...", env!("CARGO_PKG_VERSION"));
    info!("Loaded configuration from {}", path);

    let mut service = JoystickService::new();
    for device in config.device_configs() {
        if let Err(e) = service.probe_hardware(&device) {
            error!("Failed to probe {}: {}", device.name, e);
        }
    }

    if service.is_empty() {
        bail!("No joystick could be started");
    }

    info!("Polling {} joystick(s): {}", service.len(), service.device_names().join(", "));
    info!("Press Ctrl+C to exit");

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut stdin_open = true;
    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);

    loop {
        tokio::select! {
            line = lines.next_line(), if stdin_open => match line {
                Ok(Some(line)) => handle_line(&service, &line).await,
                Ok(None) => {
                    info!("stdin closed, management requests disabled");
                    stdin_open = false;
                }
                Err(e) => {
                    warn!("Failed to read stdin: {}", e);
                    stdin_open = false;
                }
            },

            // Handle Ctrl+C for graceful shutdown
            _ = &mut ctrl_c => {
                info!("Received Ctrl+C, shutting down...");
                break;
            }
        }
    }

    service.shutdown().await;
    info!("Shutdown complete");
    Ok(())
}

/// First positional argument, or the default path
fn config_path(mut args: impl Iterator<Item = String>) -> String {
    args.next().unwrap_or_else(|| DEFAULT_CONFIG_PATH.to_string())
}

fn init_logging(logging: &LoggingConfig) -> Result<Option<WorkerGuard>> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&logging.level));
    let registry = tracing_subscriber::registry().with(filter).with(fmt::layer());

    if logging.log_dir.is_empty() {
        registry.try_init()?;
        return Ok(None);
    }

    let appender = tracing_appender::rolling::daily(&logging.log_dir, LOG_FILE_PREFIX);
    let (writer, guard) = tracing_appender::non_blocking(appender);
    registry
        .with(fmt::layer().with_writer(writer).with_ansi(false))
        .try_init()?;

    Ok(Some(guard))
}

async fn handle_line(service: &JoystickService, line: &str) {
    let line = line.trim();
    if line.is_empty() {
        return;
    }

    if line == "help" {
        print!("{}", help_text(service));
        return;
    }

    let result = match line.parse::<Request>() {
        Ok(request) => service.dispatch(&request).await,
        Err(e) => Err(e),
    };

    match result {
        Ok(response) => print!("{}", response),
        Err(e) => warn!("{}: {}", line, e),
    }
}

fn help_text(service: &JoystickService) -> String {
    let mut text = format!("devices: {}\n", service.device_names().join(" "));
    for attribute in Attribute::ALL {
        let access = match attribute.access() {
            Access::ReadOnly => "r",
            Access::WriteOnly => "w",
            Access::ReadWrite => "rw",
        };
        text.push_str(&format!("  {:<13} {}\n", attribute.name(), access));
    }
    text
}
