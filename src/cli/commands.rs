use futures::channel::mpsc::{channel, Receiver};
use futures::StreamExt;
use log::{debug, info, warn};
use tokio::time::Duration;
use tokio_util::sync::CancellationToken;

use crate::config::io::ConfigStore;
use crate::config::types::Config;
use crate::device::constants::EVENT_CHANNEL_CAPACITY;
use crate::device::scanner::{default_adapter, scan};
use crate::device::session::PrinterSession;
use crate::device::types::DeviceEvent;
use crate::error::{AppRunError, DeviceError};
use crate::print::job::run_job;
use crate::print::segments::TEST_RECEIPT;

pub async fn run_scan(config: &Config, window_secs: Option<u64>) -> Result<(), AppRunError> {
    let window = scan_window(config, window_secs);
    let adapter = default_adapter().await?;

    let (mut tx, rx) = channel(EVENT_CHANNEL_CAPACITY);
    let renderer = tokio::spawn(render_events(rx));
    let cancel = CancellationToken::new();
    let devices = scan(&adapter, window, &cancel, &mut tx).await?;
    drop(tx);
    renderer.await.expect("Failed to join event renderer");

    if devices.is_empty() {
        println!("No devices found.");
    } else {
        println!("{} device(s) found. Print a test receipt with:", devices.len());
        println!("  bleprint print --device <id-or-name>");
    }
    Ok(())
}

pub async fn run_print(
    store: &mut ConfigStore,
    config: &Config,
    device: Option<String>,
    window_secs: Option<u64>,
    delay_ms: Option<u64>,
) -> Result<(), AppRunError> {
    let wanted = device
        .or_else(|| config.last_printer.clone())
        .ok_or(DeviceError::NoTargetDevice)?;
    let window = scan_window(config, window_secs);
    let delay = Duration::from_millis(delay_ms.unwrap_or(config.segment_delay));

    let adapter = default_adapter().await?;

    // Scan until the wanted device shows up or the window closes
    let (mut tx, rx) = channel(EVENT_CHANNEL_CAPACITY);
    let cancel = CancellationToken::new();
    let watcher = tokio::spawn(watch_for_target(rx, wanted.clone(), cancel.clone()));
    let devices = scan(&adapter, window, &cancel, &mut tx).await?;
    drop(tx);
    watcher.await.expect("Failed to join scan watcher");

    let device = devices
        .iter()
        .find(|device| device.info.matches(&wanted))
        .cloned()
        .ok_or_else(|| DeviceError::DeviceNotFound { wanted: wanted.clone() })?;

    let (mut tx, rx) = channel(EVENT_CHANNEL_CAPACITY);
    let renderer = tokio::spawn(render_events(rx));
    let session = PrinterSession::connect(&device, &mut tx).await?;

    // Remember the printer so the next `print` can omit --device
    if config.last_printer.as_deref() != Some(device.info.id.as_str()) {
        let mut updated = config.clone();
        updated.last_printer = Some(device.info.id.clone());
        if let Err(err) = store.save(&updated).await {
            warn!("Failed to save config: {:?}", err);
        }
    }

    let result = run_job(&session, TEST_RECEIPT, delay, &mut tx).await;
    if let Err(err) = session.disconnect().await {
        warn!("Failed to disconnect cleanly: {:?}", err);
    }
    drop(tx);
    renderer.await.expect("Failed to join event renderer");
    result?;

    println!("Receipt sent to {}.", device.info.label());
    Ok(())
}

fn scan_window(config: &Config, window_secs: Option<u64>) -> Duration {
    Duration::from_millis(window_secs.map(|secs| secs * 1000).unwrap_or(config.scan_window))
}

async fn render_events(mut events: Receiver<DeviceEvent>) {
    while let Some(event) = events.next().await {
        match event {
            DeviceEvent::Discovered(info) => println!("  found {}", info.label()),
            DeviceEvent::StateChange(state) => debug!("Device state: {:?}", state),
        }
    }
}

/// Renders scan events and stops the scan as soon as the wanted device is seen.
async fn watch_for_target(mut events: Receiver<DeviceEvent>, wanted: String, cancel: CancellationToken) {
    while let Some(event) = events.next().await {
        match event {
            DeviceEvent::Discovered(info) => {
                println!("  found {}", info.label());
                if info.matches(&wanted) {
                    info!("Matched {}; stopping scan early", info.label());
                    cancel.cancel();
                }
            }
            DeviceEvent::StateChange(state) => debug!("Device state: {:?}", state),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::device::types::PrinterInfo;
    use futures::SinkExt;

    fn discovered(id: &str, name: &str) -> DeviceEvent {
        DeviceEvent::Discovered(PrinterInfo {
            id: id.to_string(),
            name: Some(name.to_string()),
        })
    }

    #[tokio::test]
    async fn watcher_cancels_once_the_target_is_seen() {
        let (mut tx, rx) = channel(16);
        let cancel = CancellationToken::new();
        let watcher = tokio::spawn(watch_for_target(rx, "printer".to_string(), cancel.clone()));

        tx.send(discovered("1", "Headphones")).await.unwrap();
        tx.send(discovered("2", "Thermal Printer")).await.unwrap();
        drop(tx);
        watcher.await.unwrap();

        assert!(cancel.is_cancelled());
    }

    #[tokio::test]
    async fn watcher_leaves_the_scan_running_without_a_match() {
        let (mut tx, rx) = channel(16);
        let cancel = CancellationToken::new();
        let watcher = tokio::spawn(watch_for_target(rx, "printer".to_string(), cancel.clone()));

        tx.send(discovered("1", "Headphones")).await.unwrap();
        drop(tx);
        watcher.await.unwrap();

        assert!(!cancel.is_cancelled());
    }

    #[test]
    fn cli_window_overrides_config() {
        let config = Config::default();
        assert_eq!(scan_window(&config, Some(3)), Duration::from_secs(3));
        assert_eq!(scan_window(&config, None), Duration::from_millis(config.scan_window));
    }
}
