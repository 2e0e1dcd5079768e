// ── Bus connection ──
//
// Owns the shared `Link` and the units discovered on it. Discovery probes
// every address with a shortened reply wait, restores the normal wait,
// then builds a fully populated `UnitController` per unit that answered.

use std::fmt;

use tracing::{debug, info};
use xapbus_api::{Link, SerialTransport, Transport, UnitAddress};

use crate::config::BusConfig;
use crate::error::CoreError;
use crate::model::UnitSnapshot;
use crate::unit::UnitController;

/// A connection to one serial bus and the units on it.
#[derive(Debug)]
pub struct BusConnection {
    config: BusConfig,
    link: Link,
    units: Vec<UnitController>,
}

impl BusConnection {
    /// Open the serial port named in `config` and scan it.
    pub async fn connect(config: BusConfig) -> Result<Self, CoreError> {
        config.validate()?;
        info!(
            port = %config.serial_path,
            baud = config.baud_rate,
            model = %config.device_type,
            "opening bus"
        );
        let transport = SerialTransport::open(
            &config.serial_path,
            config.baud_rate,
            config.device_type.bus_code(),
            config.response_timeout,
        )?;
        Self::with_transport(config, transport).await
    }

    /// Scan over a caller-supplied transport.
    pub async fn with_transport(
        config: BusConfig,
        transport: impl Transport + 'static,
    ) -> Result<Self, CoreError> {
        config.validate()?;
        let link = Link::new(transport);
        link.set_response_timeout(config.response_timeout).await;

        let mut connection = Self {
            config,
            link,
            units: Vec::new(),
        };
        connection.scan_devices().await?;
        Ok(connection)
    }

    /// Probe every address and rebuild `units` from whoever answered.
    ///
    /// On failure the previous units are kept.
    pub async fn scan_devices(&mut self) -> Result<&[UnitController], CoreError> {
        let saved = self.link.response_timeout().await;
        self.link
            .set_response_timeout(self.config.probe_timeout)
            .await;
        let probed = self.probe_addresses().await;
        self.link.set_response_timeout(saved).await;
        let present = probed?;

        let mut units = Vec::with_capacity(present.len());
        for (address, unique_id) in present {
            let unit =
                UnitController::discover(self.link.clone(), address, self.config.device_type)
                    .await?;
            info!(
                %address,
                model = %unit.model(),
                unique_id = %unique_id,
                firmware = unit.identity().firmware_version.as_deref().unwrap_or("-"),
                "found unit"
            );
            units.push(unit);
        }

        info!(count = units.len(), "scan complete");
        self.units = units;
        Ok(&self.units)
    }

    async fn probe_addresses(&self) -> Result<Vec<(UnitAddress, String)>, CoreError> {
        let mut present = Vec::new();
        for address in UnitAddress::all() {
            match self.link.probe_unique_id(address).await? {
                Some(id) if !id.trim().is_empty() => {
                    debug!(%address, unique_id = %id, "unit answered");
                    present.push((address, id));
                }
                _ => debug!(%address, "no unit"),
            }
        }
        Ok(present)
    }

    // ── Accessors ────────────────────────────────────────────────────

    pub fn config(&self) -> &BusConfig {
        &self.config
    }

    pub fn link(&self) -> &Link {
        &self.link
    }

    /// Discovered units, by ascending address.
    pub fn units(&self) -> &[UnitController] {
        &self.units
    }

    pub fn unit(&self, address: UnitAddress) -> Result<&UnitController, CoreError> {
        self.units
            .iter()
            .find(|u| u.address() == address)
            .ok_or(CoreError::UnitNotFound {
                address: address.get(),
            })
    }

    pub fn unit_mut(&mut self, address: UnitAddress) -> Result<&mut UnitController, CoreError> {
        self.units
            .iter_mut()
            .find(|u| u.address() == address)
            .ok_or(CoreError::UnitNotFound {
                address: address.get(),
            })
    }

    pub fn snapshot(&self) -> Vec<UnitSnapshot> {
        self.units.iter().map(UnitController::snapshot).collect()
    }
}

impl fmt::Display for BusConnection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Bus {} ({} units)",
            self.config.serial_path,
            self.units.len()
        )
    }
}
