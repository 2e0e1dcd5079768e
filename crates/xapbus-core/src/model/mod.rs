// Domain model types for mirrored mixer state.

pub mod device;
pub mod state;

pub use device::{DeviceModel, InputClass, Topology};
pub use state::{
    AgcSettings, ChannelSnapshot, ChannelState, ExpansionLabels, ExpansionSnapshot, UnitIdentity,
    UnitSettings, UnitSnapshot,
};
