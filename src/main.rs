use anyhow::Context;
use grblbridge::{init_logging, list_ports, Config, DeviceSession, JoggerSession};
use std::path::Path;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_logging()?;

    tracing::info!(
        "grblbridge {} (built {})",
        grblbridge::VERSION,
        grblbridge::BUILD_DATE
    );

    let config_path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "grblbridge.toml".to_string());
    let config = Config::load_or_default(Path::new(&config_path))
        .with_context(|| format!("loading {}", config_path))?;

    let device = match DeviceSession::open(&config.device_params(), config.device_options()) {
        Ok(device) => device,
        Err(e) => {
            if let Ok(ports) = list_ports() {
                for port in ports {
                    tracing::info!("Available port: {} ({})", port.port_name, port.description);
                }
            }
            return Err(e).with_context(|| format!("opening device port {}", config.device.port));
        }
    };

    // Front ends (the web transport lives outside this daemon) attach the
    // same way: subscribe, then drive the session operations.
    let _log_subscription = device.connect(|event| {
        tracing::debug!("{}", event.description());
    })?;

    let jogger = if config.jogger.enabled {
        Some(
            JoggerSession::open(&config.jogger_params(), device.clone())
                .with_context(|| format!("opening jogger port {}", config.jogger.port))?,
        )
    } else {
        None
    };

    tokio::signal::ctrl_c().await?;
    tracing::info!("Shutting down");

    if let Some(jogger) = jogger {
        jogger.shutdown();
    }
    device.shutdown();

    Ok(())
}
