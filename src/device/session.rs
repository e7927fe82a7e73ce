use btleplug::api::{CharPropFlags, Characteristic, Peripheral as _, WriteType};
use btleplug::platform::Peripheral;
use futures::channel::mpsc::Sender;
use log::{info, warn};
use tokio::time::{sleep, Duration};

use crate::device::constants::WRITE_DEADLINE;
use crate::device::types::{send_state, DeviceEvent, DiscoveredPrinter, SessionState};
use crate::error::DeviceError;
use crate::print::job::SegmentSink;

/// An established connection to one printer: the peripheral plus the
/// characteristic print data is written to. Constructing a session is the
/// only way to reach the Connected state, so a failed connect can never
/// leave a half-bound device behind.
pub struct PrinterSession {
    peripheral: Peripheral,
    write_char: Characteristic,
}

impl PrinterSession {
    /// Connects the peripheral, discovers its services and selects the first
    /// characteristic flagged writable-without-response. On any failure after
    /// the link came up the peripheral is disconnected again.
    pub async fn connect(
        device: &DiscoveredPrinter,
        events: &mut Sender<DeviceEvent>,
    ) -> Result<PrinterSession, DeviceError> {
        send_state(events, SessionState::Connecting).await;
        info!("Connecting to {}...", device.info.label());
        device.peripheral.connect().await?;

        match discover_write_characteristic(&device.peripheral).await {
            Ok(write_char) => {
                info!("Using characteristic {} on {}", write_char.uuid, device.info.label());
                send_state(events, SessionState::Connected).await;
                Ok(PrinterSession {
                    peripheral: device.peripheral.clone(),
                    write_char,
                })
            }
            Err(err) => {
                if let Err(disconnect_err) = device.peripheral.disconnect().await {
                    warn!("Failed to disconnect after error: {:?}", disconnect_err);
                }
                Err(err)
            }
        }
    }

    pub fn characteristic(&self) -> &Characteristic {
        &self.write_char
    }

    pub async fn disconnect(&self) -> Result<(), DeviceError> {
        info!("Disconnecting");
        self.peripheral.disconnect().await?;
        Ok(())
    }
}

impl SegmentSink for PrinterSession {
    async fn write_segment(&self, payload: &[u8]) -> Result<(), DeviceError> {
        let fut = self
            .peripheral
            .write(&self.write_char, payload, WriteType::WithoutResponse);

        tokio::select! {
            _ = sleep(Duration::from_millis(WRITE_DEADLINE)) => {
                Err(DeviceError::WriteTimeout {
                    uuid: self.write_char.uuid,
                    deadline_ms: WRITE_DEADLINE,
                })
            }
            result = fut => {
                result?;
                Ok(())
            }
        }
    }
}

async fn discover_write_characteristic(peripheral: &Peripheral) -> Result<Characteristic, DeviceError> {
    info!("Connected; discovering services...");
    peripheral.discover_services().await?;

    let characteristics = peripheral
        .services()
        .into_iter()
        .flat_map(|service| service.characteristics.into_iter());

    select_write_characteristic(characteristics).ok_or(DeviceError::MissingCharacteristic)
}

/// First characteristic flagged writable-without-response, in service and
/// characteristic discovery order.
pub fn select_write_characteristic<I>(characteristics: I) -> Option<Characteristic>
where
    I: IntoIterator<Item = Characteristic>,
{
    characteristics
        .into_iter()
        .find(|characteristic| characteristic.properties.contains(CharPropFlags::WRITE_WITHOUT_RESPONSE))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeSet;
    use uuid::Uuid;

    fn characteristic(uuid: u128, properties: CharPropFlags) -> Characteristic {
        Characteristic {
            uuid: Uuid::from_u128(uuid),
            service_uuid: Uuid::from_u128(0xFF00),
            properties,
            descriptors: BTreeSet::new(),
        }
    }

    #[test]
    fn selects_the_first_writable_without_response() {
        let chars = vec![
            characteristic(1, CharPropFlags::READ | CharPropFlags::NOTIFY),
            characteristic(2, CharPropFlags::WRITE),
            characteristic(3, CharPropFlags::WRITE_WITHOUT_RESPONSE),
            characteristic(4, CharPropFlags::WRITE_WITHOUT_RESPONSE | CharPropFlags::WRITE),
        ];

        let selected = select_write_characteristic(chars).unwrap();
        assert_eq!(selected.uuid, Uuid::from_u128(3));
    }

    #[test]
    fn no_writable_characteristic_yields_none() {
        let chars = vec![
            characteristic(1, CharPropFlags::READ),
            characteristic(2, CharPropFlags::WRITE),
            characteristic(3, CharPropFlags::NOTIFY),
        ];

        assert!(select_write_characteristic(chars).is_none());
    }

    #[test]
    fn empty_characteristic_set_yields_none() {
        assert!(select_write_characteristic(Vec::new()).is_none());
    }
}
