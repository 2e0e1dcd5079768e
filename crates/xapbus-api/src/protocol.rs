// ── Bus vocabulary ──
//
// Addresses, channel groups, expansion-bus letters, parameters and the
// request/value shapes every transport speaks. Nothing here performs I/O.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

// ── UnitAddress ──────────────────────────────────────────────────

/// Address of one unit on the shared bus (0 through 7).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub struct UnitAddress(u8);

impl UnitAddress {
    pub const MIN: Self = Self(0);
    pub const MAX: Self = Self(7);

    pub fn new(raw: u8) -> Option<Self> {
        (raw <= Self::MAX.0).then_some(Self(raw))
    }

    pub fn get(self) -> u8 {
        self.0
    }

    /// Every address of the bus, ascending.
    pub fn all() -> impl Iterator<Item = Self> {
        (Self::MIN.0..=Self::MAX.0).map(Self)
    }

    /// Single ASCII digit used in the command header.
    pub fn wire_digit(self) -> char {
        char::from(b'0' + self.0)
    }
}

impl TryFrom<u8> for UnitAddress {
    type Error = String;

    fn try_from(raw: u8) -> Result<Self, Self::Error> {
        Self::new(raw).ok_or_else(|| format!("unit address must be 0-7, got {raw}"))
    }
}

impl From<UnitAddress> for u8 {
    fn from(addr: UnitAddress) -> Self {
        addr.0
    }
}

impl FromStr for UnitAddress {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let raw: u8 = s
            .trim()
            .parse()
            .map_err(|_| format!("unit address must be 0-7, got '{s}'"))?;
        Self::try_from(raw)
    }
}

impl fmt::Display for UnitAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ── ChannelGroup ─────────────────────────────────────────────────

/// Channel type code carried in every channel-scoped command.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ChannelGroup {
    Input,
    Output,
    Expansion,
    Unit,
}

impl ChannelGroup {
    pub fn code(self) -> char {
        match self {
            Self::Input => 'I',
            Self::Output => 'O',
            Self::Expansion => 'E',
            Self::Unit => 'U',
        }
    }

    pub fn from_code(code: char) -> Option<Self> {
        match code.to_ascii_uppercase() {
            'I' => Some(Self::Input),
            'O' => Some(Self::Output),
            'E' => Some(Self::Expansion),
            'U' => Some(Self::Unit),
            _ => None,
        }
    }
}

impl fmt::Display for ChannelGroup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Input => "input",
            Self::Output => "output",
            Self::Expansion => "expansion",
            Self::Unit => "unit",
        };
        f.write_str(name)
    }
}

// ── BusLetter ────────────────────────────────────────────────────

/// Letter code of one expansion-bus channel, `O` through `Z`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "char", into = "char")]
pub struct BusLetter(char);

impl BusLetter {
    /// The fixed 12-letter expansion-bus code space.
    pub const ALL: [Self; 12] = [
        Self('O'),
        Self('P'),
        Self('Q'),
        Self('R'),
        Self('S'),
        Self('T'),
        Self('U'),
        Self('V'),
        Self('W'),
        Self('X'),
        Self('Y'),
        Self('Z'),
    ];

    pub fn new(letter: char) -> Option<Self> {
        let upper = letter.to_ascii_uppercase();
        ('O'..='Z').contains(&upper).then_some(Self(upper))
    }

    pub fn as_char(self) -> char {
        self.0
    }
}

impl TryFrom<char> for BusLetter {
    type Error = String;

    fn try_from(letter: char) -> Result<Self, Self::Error> {
        Self::new(letter).ok_or_else(|| format!("expansion bus letter must be O-Z, got '{letter}'"))
    }
}

impl From<BusLetter> for char {
    fn from(letter: BusLetter) -> Self {
        letter.0
    }
}

impl FromStr for BusLetter {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut chars = s.trim().chars();
        match (chars.next(), chars.next()) {
            (Some(c), None) => Self::try_from(c),
            _ => Err(format!("expansion bus letter must be a single letter O-Z, got '{s}'")),
        }
    }
}

impl fmt::Display for BusLetter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Which side of an expansion-bus slot a label belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BusDirection {
    /// Signal entering the unit from the bus.
    In,
    /// Signal leaving the unit onto the bus.
    Out,
}

impl BusDirection {
    pub fn flag(self) -> u8 {
        match self {
            Self::In => 1,
            Self::Out => 0,
        }
    }
}

// ── Parameter ────────────────────────────────────────────────────

/// Every attribute the mirror layer reads or writes.
///
/// `Display` yields the wire mnemonic.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    strum::Display,
    strum::EnumString,
    strum::IntoStaticStr,
    strum::EnumIter,
)]
pub enum Parameter {
    #[strum(serialize = "UID")]
    UniqueId,
    #[strum(serialize = "VER")]
    Version,
    #[strum(serialize = "DSPVER")]
    DspVersion,
    #[strum(serialize = "TYPE")]
    UnitType,
    #[strum(serialize = "LABEL")]
    Label,
    #[strum(serialize = "MAX")]
    MaxGain,
    #[strum(serialize = "MIN")]
    MinGain,
    #[strum(serialize = "MUTE")]
    Mute,
    #[strum(serialize = "PGAIN")]
    ProportionalGain,
    #[strum(serialize = "GAIN")]
    Gain,
    #[strum(serialize = "MODEM")]
    ModemMode,
    #[strum(serialize = "MPASS")]
    ModemPassword,
    #[strum(serialize = "MINIT")]
    ModemInit,
    #[strum(serialize = "SFTYMUTE")]
    SafetyMute,
    #[strum(serialize = "TOUT")]
    PanelTimeout,
    #[strum(serialize = "FPLOCK")]
    PanelLock,
}

impl Parameter {
    pub fn mnemonic(self) -> &'static str {
        self.into()
    }

    /// Shape of the value this parameter carries on the wire.
    pub fn kind(self) -> ValueKind {
        match self {
            Self::UniqueId
            | Self::Version
            | Self::DspVersion
            | Self::UnitType
            | Self::Label
            | Self::ModemPassword
            | Self::ModemInit => ValueKind::Text,
            Self::MaxGain | Self::MinGain | Self::ProportionalGain | Self::Gain => {
                ValueKind::Number
            }
            Self::Mute | Self::ModemMode | Self::SafetyMute | Self::PanelLock => ValueKind::Flag,
            Self::PanelTimeout => ValueKind::Integer,
        }
    }

    /// Decimal places used when a number for this parameter is sent.
    pub fn wire_decimals(self) -> usize {
        match self {
            Self::ProportionalGain => 4,
            _ => 2,
        }
    }
}

// ── Target / Action / Request ────────────────────────────────────

/// What a request addresses inside one unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Target {
    /// Unit-wide attribute.
    Unit,
    /// One input or output channel.
    Channel { number: u8, group: ChannelGroup },
    /// One side of an expansion-bus slot.
    Expansion {
        bus: BusLetter,
        direction: BusDirection,
    },
}

impl Target {
    pub fn input(number: u8) -> Self {
        Self::Channel {
            number,
            group: ChannelGroup::Input,
        }
    }

    pub fn output(number: u8) -> Self {
        Self::Channel {
            number,
            group: ChannelGroup::Output,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Action {
    Get,
    /// Write an absolute value.
    Set(Value),
    /// Offset the current value; the device performs the arithmetic.
    Adjust(f64),
}

/// One question put to one unit.
#[derive(Debug, Clone, PartialEq)]
pub struct Request {
    pub parameter: Parameter,
    pub target: Target,
    pub action: Action,
}

impl Request {
    pub fn get(parameter: Parameter, target: Target) -> Self {
        Self {
            parameter,
            target,
            action: Action::Get,
        }
    }

    pub fn set(parameter: Parameter, target: Target, value: Value) -> Self {
        Self {
            parameter,
            target,
            action: Action::Set(value),
        }
    }

    pub fn adjust(parameter: Parameter, target: Target, delta: f64) -> Self {
        Self {
            parameter,
            target,
            action: Action::Adjust(delta),
        }
    }
}

// ── Value ────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueKind {
    Text,
    Number,
    Flag,
    Integer,
}

impl ValueKind {
    pub fn name(self) -> &'static str {
        match self {
            Self::Text => "text",
            Self::Number => "number",
            Self::Flag => "flag",
            Self::Integer => "integer",
        }
    }
}

/// A value as carried by a request or returned by a unit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Value {
    Flag(bool),
    Integer(u32),
    Number(f64),
    Text(String),
}

impl Value {
    pub fn kind(&self) -> ValueKind {
        match self {
            Self::Text(_) => ValueKind::Text,
            Self::Number(_) => ValueKind::Number,
            Self::Flag(_) => ValueKind::Flag,
            Self::Integer(_) => ValueKind::Integer,
        }
    }

    /// Parse the value portion of a reply line.
    pub fn parse(kind: ValueKind, raw: &str) -> Option<Self> {
        let raw = raw.trim();
        match kind {
            ValueKind::Text => Some(Self::Text(
                raw.strip_prefix('"')
                    .and_then(|s| s.strip_suffix('"'))
                    .unwrap_or(raw)
                    .to_owned(),
            )),
            ValueKind::Number => first_token(raw)?.parse().ok().map(Self::Number),
            ValueKind::Flag => match first_token(raw)? {
                "1" => Some(Self::Flag(true)),
                "0" => Some(Self::Flag(false)),
                _ => None,
            },
            ValueKind::Integer => first_token(raw)?.parse().ok().map(Self::Integer),
        }
    }

    /// Encode for a request line, numbers at `decimals` places.
    pub fn to_wire_with(&self, decimals: usize) -> String {
        match self {
            Self::Text(s) => s.clone(),
            Self::Number(n) => format!("{n:.decimals$}"),
            Self::Flag(b) => (if *b { "1" } else { "0" }).to_owned(),
            Self::Integer(i) => i.to_string(),
        }
    }
}

fn first_token(raw: &str) -> Option<&str> {
    raw.split_whitespace().next()
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Text(s) => f.write_str(s),
            Self::Number(n) => write!(f, "{n}"),
            Self::Flag(b) => write!(f, "{b}"),
            Self::Integer(i) => write!(f, "{i}"),
        }
    }
}

/// Rust types that travel as a [`Value`].
pub trait WireValue: Sized {
    const KIND: ValueKind;

    /// Extract `Self`, handing back the original value on a kind mismatch.
    fn from_value(value: Value) -> Result<Self, Value>;

    fn into_value(self) -> Value;
}

impl WireValue for String {
    const KIND: ValueKind = ValueKind::Text;

    fn from_value(value: Value) -> Result<Self, Value> {
        match value {
            Value::Text(s) => Ok(s),
            other => Err(other),
        }
    }

    fn into_value(self) -> Value {
        Value::Text(self)
    }
}

impl WireValue for f64 {
    const KIND: ValueKind = ValueKind::Number;

    fn from_value(value: Value) -> Result<Self, Value> {
        match value {
            Value::Number(n) => Ok(n),
            Value::Integer(i) => Ok(f64::from(i)),
            other => Err(other),
        }
    }

    fn into_value(self) -> Value {
        Value::Number(self)
    }
}

impl WireValue for bool {
    const KIND: ValueKind = ValueKind::Flag;

    fn from_value(value: Value) -> Result<Self, Value> {
        match value {
            Value::Flag(b) => Ok(b),
            other => Err(other),
        }
    }

    fn into_value(self) -> Value {
        Value::Flag(self)
    }
}

impl WireValue for u32 {
    const KIND: ValueKind = ValueKind::Integer;

    fn from_value(value: Value) -> Result<Self, Value> {
        match value {
            Value::Integer(i) => Ok(i),
            other => Err(other),
        }
    }

    fn into_value(self) -> Value {
        Value::Integer(self)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn unit_address_bounds() {
        assert!(UnitAddress::new(7).is_some());
        assert!(UnitAddress::new(8).is_none());
        assert_eq!(UnitAddress::all().count(), 8);
        assert_eq!(UnitAddress::new(5).unwrap().wire_digit(), '5');
    }

    #[test]
    fn unit_address_from_str() {
        let addr: UnitAddress = " 3 ".parse().unwrap();
        assert_eq!(addr.get(), 3);
        assert!("9".parse::<UnitAddress>().is_err());
        assert!("x".parse::<UnitAddress>().is_err());
    }

    #[test]
    fn bus_letters_cover_o_through_z() {
        let letters: String = BusLetter::ALL.iter().map(|l| l.as_char()).collect();
        assert_eq!(letters, "OPQRSTUVWXYZ");
        assert_eq!(BusLetter::new('q'), Some(BusLetter('Q')));
        assert!(BusLetter::new('A').is_none());
        assert!("OP".parse::<BusLetter>().is_err());
    }

    #[test]
    fn parameter_mnemonics() {
        assert_eq!(Parameter::SafetyMute.to_string(), "SFTYMUTE");
        assert_eq!(Parameter::Gain.mnemonic(), "GAIN");
        assert_eq!("PGAIN".parse::<Parameter>().unwrap(), Parameter::ProportionalGain);
    }

    #[test]
    fn value_parse_by_kind() {
        assert_eq!(
            Value::parse(ValueKind::Text, "\"Zone A\""),
            Some(Value::Text("Zone A".into()))
        );
        assert_eq!(
            Value::parse(ValueKind::Number, "-12.50 A"),
            Some(Value::Number(-12.5))
        );
        assert_eq!(Value::parse(ValueKind::Flag, "1"), Some(Value::Flag(true)));
        assert_eq!(Value::parse(ValueKind::Flag, "maybe"), None);
        assert_eq!(Value::parse(ValueKind::Integer, "15"), Some(Value::Integer(15)));
    }

    #[test]
    fn proportional_gain_keeps_four_decimals() {
        let fraction = Value::Number(0.125);
        assert_eq!(
            fraction.to_wire_with(Parameter::ProportionalGain.wire_decimals()),
            "0.1250"
        );
        assert_eq!(
            Value::Number(-6.0).to_wire_with(Parameter::Gain.wire_decimals()),
            "-6.00"
        );
    }

    #[test]
    fn wire_value_kind_mismatch_hands_value_back() {
        let err = bool::from_value(Value::Text("yes".into())).unwrap_err();
        assert_eq!(err, Value::Text("yes".into()));
        assert_eq!(f64::from_value(Value::Integer(4)).unwrap(), 4.0);
    }
}
