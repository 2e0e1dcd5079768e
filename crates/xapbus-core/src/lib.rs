// xapbus-core: Discovery and device-authoritative mirrors over xapbus-api.

pub mod channel;
pub mod config;
pub mod connection;
pub mod error;
pub mod expansion;
pub mod model;
pub mod unit;

// ── Primary re-exports ──────────────────────────────────────────────
pub use channel::{ChannelMirror, GainMode, InputChannel, OutputChannel};
pub use config::BusConfig;
pub use connection::BusConnection;
pub use error::CoreError;
pub use expansion::{ExpansionBusAllocator, ExpansionBusChannel};
pub use unit::UnitController;

pub use model::{
    AgcSettings, ChannelSnapshot, ChannelState, DeviceModel, ExpansionLabels, ExpansionSnapshot,
    InputClass, Topology, UnitIdentity, UnitSettings, UnitSnapshot,
};

// Wire-level types consumers need to address units and channels.
pub use xapbus_api::{BusLetter, ChannelGroup, SimUnit, SimulatedBus, UnitAddress};
