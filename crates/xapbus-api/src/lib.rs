// xapbus-api: Transport boundary for XAP mixers sharing one serial bus

pub mod error;
pub mod protocol;
pub mod serial;
pub mod sim;
pub mod transport;

pub use error::Error;
pub use protocol::{
    Action, BusDirection, BusLetter, ChannelGroup, Parameter, Request, Target, UnitAddress, Value,
    WireValue,
};
pub use serial::SerialTransport;
pub use sim::{SimUnit, SimulatedBus};
pub use transport::{Link, Transport};
