use btleplug::platform::Peripheral;
use futures::channel::mpsc::Sender;
use futures::SinkExt;
use indexmap::IndexMap;
use log::warn;

/// Identity of a discovered peripheral, detached from its platform handle so
/// it can travel through event channels and show up in CLI output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PrinterInfo {
    /// Platform-specific peripheral identifier (address on Linux, UUID on macOS).
    pub id: String,
    /// Advertised local name, if the device broadcasts one.
    pub name: Option<String>,
}

impl PrinterInfo {
    pub fn label(&self) -> String {
        match &self.name {
            Some(name) => format!("{} ({})", name, self.id),
            None => format!("<unnamed> ({})", self.id),
        }
    }

    /// Matches an exact identifier or a case-insensitive name fragment.
    pub fn matches(&self, wanted: &str) -> bool {
        if self.id.eq_ignore_ascii_case(wanted) {
            return true;
        }
        match &self.name {
            Some(name) => name.to_lowercase().contains(&wanted.to_lowercase()),
            None => false,
        }
    }
}

/// A peripheral observed during a scan, with its live handle.
#[derive(Debug, Clone)]
pub struct DiscoveredPrinter {
    pub info: PrinterInfo,
    pub peripheral: Peripheral,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionState {
    Idle,
    Scanning,
    Connecting,
    Connected,
    Printing,
}

#[derive(Debug, Clone)]
pub enum DeviceEvent {
    StateChange(SessionState),
    Discovered(PrinterInfo),
}

pub async fn send_state(events: &mut Sender<DeviceEvent>, state: SessionState) {
    if events.send(DeviceEvent::StateChange(state)).await.is_err() {
        warn!("No listener for device state change");
    }
}

/// Devices observed during one scan, keyed by identifier. Duplicate discovery
/// events for the same identifier are suppressed and first-seen order is kept.
#[derive(Debug, Default)]
pub struct DeviceRegistry<T> {
    devices: IndexMap<String, T>,
}

impl<T> DeviceRegistry<T> {
    pub fn new() -> Self {
        DeviceRegistry { devices: IndexMap::new() }
    }

    /// Returns true if the device was new, false if the identifier was
    /// already registered (the existing entry is kept).
    pub fn insert(&mut self, id: String, device: T) -> bool {
        if self.devices.contains_key(&id) {
            return false;
        }
        self.devices.insert(id, device);
        true
    }

    pub fn clear(&mut self) {
        self.devices.clear();
    }

    pub fn len(&self) -> usize {
        self.devices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.devices.is_empty()
    }

    pub fn into_values(self) -> Vec<T> {
        self.devices.into_values().collect()
    }
}
