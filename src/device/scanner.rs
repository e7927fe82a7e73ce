use btleplug::api::{Central, CentralEvent, Manager as _, Peripheral as _, ScanFilter};
use btleplug::platform::{Adapter, Manager, Peripheral, PeripheralId};
use futures::channel::mpsc::Sender;
use futures::{SinkExt, Stream, StreamExt};
use log::{debug, info, warn};
use tokio::time::{sleep, Duration};
use tokio_util::sync::CancellationToken;

use crate::device::types::{send_state, DeviceEvent, DeviceRegistry, DiscoveredPrinter, PrinterInfo, SessionState};
use crate::error::DeviceError;

pub async fn default_adapter() -> Result<Adapter, DeviceError> {
    let manager = Manager::new().await?;
    let adapters = manager.adapters().await?;
    adapters.into_iter().next().ok_or(DeviceError::NoAdapter)
}

/// Discovers peripherals with no service filter until the window elapses or
/// `cancel` fires. Each device that has not been seen before is reported on
/// `events` as it shows up; the full set is returned in first-seen order.
pub async fn scan(
    adapter: &Adapter,
    window: Duration,
    cancel: &CancellationToken,
    events: &mut Sender<DeviceEvent>,
) -> Result<Vec<DiscoveredPrinter>, DeviceError> {
    info!("Scanning for BLE devices ({}ms window)...", window.as_millis());
    send_state(events, SessionState::Scanning).await;

    adapter.start_scan(ScanFilter::default()).await?;
    let central_events = adapter.events().await?;

    let candidates = central_events.filter_map(|event| {
        let adapter = adapter.clone();
        async move {
            match event {
                CentralEvent::DeviceDiscovered(id) => resolve_candidate(&adapter, id).await,
                _ => None,
            }
        }
    });
    tokio::pin!(candidates);

    let found = collect_window(candidates, window, cancel, events).await;
    adapter.stop_scan().await?;
    info!("Scan stopped; {} device(s) discovered", found.len());

    let found = found
        .into_iter()
        .map(|(info, peripheral)| DiscoveredPrinter { info, peripheral })
        .collect();
    Ok(found)
}

/// Looks up the discovered peripheral and its advertised name. Returns None
/// when the peripheral vanished between the event and the lookup.
async fn resolve_candidate(
    adapter: &Adapter,
    id: PeripheralId,
) -> Option<(PrinterInfo, Peripheral)> {
    let peripheral = match adapter.peripheral(&id).await {
        Ok(peripheral) => peripheral,
        Err(err) => {
            warn!("Failed to look up discovered peripheral: {:?}", err);
            return None;
        }
    };

    let name = match peripheral.properties().await {
        Ok(Some(properties)) => properties.local_name,
        Ok(None) => {
            warn!("Peripheral has no properties");
            None
        }
        Err(err) => {
            warn!("Could not query peripheral for properties: {:?}", err);
            None
        }
    };

    Some((PrinterInfo { id: id.to_string(), name }, peripheral))
}

/// Drains the candidate stream into a deduplicated registry until the scan
/// window elapses, the cancellation token fires, or the stream ends.
async fn collect_window<H, S>(
    mut candidates: S,
    window: Duration,
    cancel: &CancellationToken,
    events: &mut Sender<DeviceEvent>,
) -> Vec<(PrinterInfo, H)>
where
    S: Stream<Item = (PrinterInfo, H)> + Unpin,
{
    let mut registry = DeviceRegistry::new();
    let deadline = sleep(window);
    tokio::pin!(deadline);

    loop {
        tokio::select! {
            _ = &mut deadline => {
                debug!("Scan window elapsed");
                break;
            }
            _ = cancel.cancelled() => {
                debug!("Scan cancelled");
                break;
            }
            candidate = candidates.next() => match candidate {
                Some((info, handle)) => {
                    if registry.insert(info.id.clone(), (info.clone(), handle)) {
                        debug!("Discovered {}", info.label());
                        if events.send(DeviceEvent::Discovered(info)).await.is_err() {
                            warn!("No listener for discovery event");
                        }
                    }
                }
                None => {
                    warn!("Discovery stream ended before the scan window elapsed");
                    break;
                }
            }
        }
    }

    registry.into_values()
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::channel::mpsc::channel;
    use futures::stream;
    use pretty_assertions::assert_eq;

    fn info(id: &str, name: &str) -> PrinterInfo {
        PrinterInfo {
            id: id.to_string(),
            name: Some(name.to_string()),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn stops_when_the_window_elapses() {
        let (mut tx, _rx) = channel(16);
        let cancel = CancellationToken::new();
        let candidates = stream::pending::<(PrinterInfo, ())>();
        tokio::pin!(candidates);

        let found = collect_window(candidates, Duration::from_secs(10), &cancel, &mut tx).await;
        assert!(found.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn duplicate_discoveries_collapse_to_one_entry() {
        let (mut tx, mut rx) = channel(16);
        let cancel = CancellationToken::new();
        let candidates = stream::iter(vec![
            (info("1", "A"), ()),
            (info("2", "B"), ()),
            (info("1", "A"), ()),
        ])
        .chain(stream::pending());
        tokio::pin!(candidates);

        let found = collect_window(candidates, Duration::from_secs(10), &cancel, &mut tx).await;
        let ids: Vec<String> = found.into_iter().map(|(info, _)| info.id).collect();
        assert_eq!(ids, vec!["1".to_string(), "2".to_string()]);

        // Only the two unique devices were reported incrementally
        let mut reported = Vec::new();
        while let Ok(Some(event)) = rx.try_next() {
            if let DeviceEvent::Discovered(info) = event {
                reported.push(info.id);
            }
        }
        assert_eq!(reported, vec!["1".to_string(), "2".to_string()]);
    }

    #[tokio::test(start_paused = true)]
    async fn cancellation_stops_the_scan_early() {
        let (mut tx, _rx) = channel(16);
        let cancel = CancellationToken::new();
        cancel.cancel();
        let candidates = stream::pending::<(PrinterInfo, ())>();
        tokio::pin!(candidates);

        let started = tokio::time::Instant::now();
        let found = collect_window(candidates, Duration::from_secs(3600), &cancel, &mut tx).await;
        assert!(found.is_empty());
        assert!(started.elapsed() < Duration::from_secs(3600));
    }

    #[tokio::test(start_paused = true)]
    async fn ended_stream_terminates_the_scan() {
        let (mut tx, _rx) = channel(16);
        let cancel = CancellationToken::new();
        let candidates = stream::iter(vec![(info("1", "A"), ())]);
        tokio::pin!(candidates);

        let found = collect_window(candidates, Duration::from_secs(3600), &cancel, &mut tx).await;
        assert_eq!(found.len(), 1);
    }
}
