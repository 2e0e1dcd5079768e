// In-memory stand-in for a populated bus.
//
// Behaves like a set of units that answer every query from their own
// state: labels are truncated to the unit's limit, gain is clamped to the
// channel's bounds, proportional gain is derived from gain. Clones share
// state so a test can keep a handle after moving one into a `Link`.

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use async_trait::async_trait;

use crate::error::Error;
use crate::protocol::{Action, BusDirection, Parameter, Request, Target, UnitAddress, Value};
use crate::transport::Transport;

const DEFAULT_LABEL_LIMIT: usize = 20;
const DEFAULT_GAIN_MAX: f64 = 12.0;
const DEFAULT_GAIN_MIN: f64 = -65.0;
const DEFAULT_PANEL_TIMEOUT: u32 = 5;

/// One simulated unit.
#[derive(Debug, Clone)]
pub struct SimUnit {
    model: String,
    unique_id: String,
    version: String,
    dsp_version: String,
    reports_type: bool,
    label_limit: usize,
    values: HashMap<(Parameter, Target), Value>,
}

impl SimUnit {
    pub fn new(model: &str, unique_id: &str) -> Self {
        Self {
            model: model.to_owned(),
            unique_id: unique_id.to_owned(),
            version: "4.2.0".into(),
            dsp_version: "2.1".into(),
            reports_type: true,
            label_limit: DEFAULT_LABEL_LIMIT,
            values: HashMap::new(),
        }
    }

    pub fn with_version(mut self, version: &str) -> Self {
        version.clone_into(&mut self.version);
        self
    }

    pub fn with_dsp_version(mut self, dsp_version: &str) -> Self {
        dsp_version.clone_into(&mut self.dsp_version);
        self
    }

    /// Leave the unit-type query unanswered.
    pub fn without_unit_type(mut self) -> Self {
        self.reports_type = false;
        self
    }

    pub fn with_label_limit(mut self, limit: usize) -> Self {
        self.label_limit = limit;
        self
    }

    pub fn with_value(mut self, parameter: Parameter, target: Target, value: Value) -> Self {
        self.values.insert((parameter, target), value);
        self
    }

    fn stored(&self, parameter: Parameter, target: Target) -> Value {
        self.values
            .get(&(parameter, target))
            .cloned()
            .unwrap_or_else(|| self.default_value(parameter, target))
    }

    fn number(&self, parameter: Parameter, target: Target) -> f64 {
        match self.stored(parameter, target) {
            Value::Number(n) => n,
            _ => 0.0,
        }
    }

    fn default_value(&self, parameter: Parameter, target: Target) -> Value {
        match parameter {
            Parameter::Label => Value::Text(default_label(&self.model, target)),
            Parameter::MaxGain => Value::Number(DEFAULT_GAIN_MAX),
            Parameter::MinGain => Value::Number(DEFAULT_GAIN_MIN),
            Parameter::Gain => Value::Number(0.0),
            Parameter::ModemInit => Value::Text("ATZ".into()),
            Parameter::ModemPassword => Value::Text(String::new()),
            Parameter::PanelTimeout => Value::Integer(DEFAULT_PANEL_TIMEOUT),
            _ => Value::Flag(false),
        }
    }

    fn proportional_gain(&self, target: Target) -> f64 {
        let min = self.number(Parameter::MinGain, target);
        let max = self.number(Parameter::MaxGain, target);
        if max <= min {
            return 0.0;
        }
        ((self.number(Parameter::Gain, target) - min) / (max - min)).clamp(0.0, 1.0)
    }

    fn clamp_gain(&self, target: Target, gain: f64) -> f64 {
        let min = self.number(Parameter::MinGain, target);
        let max = self.number(Parameter::MaxGain, target);
        gain.clamp(min.min(max), max.max(min))
    }

    fn answer(&mut self, unit: UnitAddress, request: &Request) -> Result<Option<Value>, Error> {
        let Request {
            parameter,
            target,
            action,
        } = request;
        let (parameter, target) = (*parameter, *target);

        let read_only = match parameter {
            Parameter::UniqueId => Some(Some(Value::Text(self.unique_id.clone()))),
            Parameter::Version => Some(Some(Value::Text(self.version.clone()))),
            Parameter::DspVersion => Some(Some(Value::Text(self.dsp_version.clone()))),
            Parameter::UnitType => Some(
                self.reports_type
                    .then(|| Value::Text(self.model.clone())),
            ),
            _ => None,
        };
        if let Some(answer) = read_only {
            return match action {
                Action::Get => Ok(answer),
                _ => Err(rejected(unit, parameter, "read-only")),
            };
        }

        match action {
            Action::Get if parameter == Parameter::ProportionalGain => {
                Ok(Some(Value::Number(self.proportional_gain(target))))
            }
            Action::Get => Ok(Some(self.stored(parameter, target))),
            Action::Adjust(delta) if parameter == Parameter::Gain => {
                let gain = self.clamp_gain(target, self.number(Parameter::Gain, target) + delta);
                self.values
                    .insert((Parameter::Gain, target), Value::Number(gain));
                Ok(Some(Value::Number(gain)))
            }
            Action::Adjust(_) => Err(rejected(unit, parameter, "not adjustable")),
            Action::Set(value) => {
                if value.kind() != parameter.kind() {
                    return Err(rejected(unit, parameter, "wrong value kind"));
                }
                self.apply(parameter, target, value.clone()).map(Some)
            }
        }
    }

    fn apply(&mut self, parameter: Parameter, target: Target, value: Value) -> Result<Value, Error> {
        let confirmed = match (parameter, value) {
            (Parameter::Label, Value::Text(text)) => {
                Value::Text(text.chars().take(self.label_limit).collect())
            }
            (Parameter::Gain, Value::Number(gain)) => Value::Number(self.clamp_gain(target, gain)),
            (Parameter::ProportionalGain, Value::Number(fraction)) => {
                let min = self.number(Parameter::MinGain, target);
                let max = self.number(Parameter::MaxGain, target);
                let gain = min + fraction.clamp(0.0, 1.0) * (max - min);
                self.values
                    .insert((Parameter::Gain, target), Value::Number(gain));
                return Ok(Value::Number(self.proportional_gain(target)));
            }
            (_, other) => other,
        };
        self.values.insert((parameter, target), confirmed.clone());
        Ok(confirmed)
    }
}

fn default_label(model: &str, target: Target) -> String {
    match target {
        Target::Unit => model.to_owned(),
        Target::Channel { number, group } => format!("{group} {number}"),
        Target::Expansion { bus, direction } => match direction {
            BusDirection::In => format!("Bus {bus} in"),
            BusDirection::Out => format!("Bus {bus} out"),
        },
    }
}

fn rejected(unit: UnitAddress, parameter: Parameter, why: &str) -> Error {
    Error::Rejected {
        unit,
        message: format!("{parameter}: {why}"),
    }
}

// ── SimulatedBus ─────────────────────────────────────────────────

#[derive(Debug)]
struct SimState {
    units: BTreeMap<UnitAddress, SimUnit>,
    timeout: Duration,
    probe_timeouts: Vec<Duration>,
    exchanges: BTreeMap<UnitAddress, usize>,
    failing: BTreeSet<UnitAddress>,
}

/// A bus of simulated units. Unpopulated addresses never answer.
#[derive(Debug, Clone)]
pub struct SimulatedBus {
    state: Arc<Mutex<SimState>>,
}

impl Default for SimulatedBus {
    fn default() -> Self {
        Self::new()
    }
}

impl SimulatedBus {
    pub fn new() -> Self {
        Self {
            state: Arc::new(Mutex::new(SimState {
                units: BTreeMap::new(),
                timeout: Duration::from_millis(500),
                probe_timeouts: Vec::new(),
                exchanges: BTreeMap::new(),
                failing: BTreeSet::new(),
            })),
        }
    }

    /// Two XAP800 units at addresses 2 and 5.
    pub fn demo() -> Self {
        let bus = Self::new();
        if let (Some(a), Some(b)) = (UnitAddress::new(2), UnitAddress::new(5)) {
            bus.insert_unit(a, SimUnit::new("XAP800", "0x0A2B3C4D"));
            bus.insert_unit(b, SimUnit::new("XAP800", "0x0A2B3C5E"));
        }
        bus
    }

    pub fn with_unit(self, address: UnitAddress, unit: SimUnit) -> Self {
        self.insert_unit(address, unit);
        self
    }

    pub fn insert_unit(&self, address: UnitAddress, unit: SimUnit) {
        self.lock().units.insert(address, unit);
    }

    pub fn remove_unit(&self, address: UnitAddress) {
        self.lock().units.remove(&address);
    }

    /// Make every exchange with `address` fail at the transport level.
    pub fn fail_unit(&self, address: UnitAddress) {
        self.lock().failing.insert(address);
    }

    pub fn heal_unit(&self, address: UnitAddress) {
        self.lock().failing.remove(&address);
    }

    /// Response timeout in force at each unique-id probe, in order.
    pub fn probe_timeouts(&self) -> Vec<Duration> {
        self.lock().probe_timeouts.clone()
    }

    pub fn current_timeout(&self) -> Duration {
        self.lock().timeout
    }

    /// Exchanges answered by `address` so far.
    pub fn exchange_count(&self, address: UnitAddress) -> usize {
        self.lock().exchanges.get(&address).copied().unwrap_or(0)
    }

    /// What the device itself holds, bypassing any mirror.
    pub fn device_value(
        &self,
        address: UnitAddress,
        parameter: Parameter,
        target: Target,
    ) -> Option<Value> {
        let state = self.lock();
        let unit = state.units.get(&address)?;
        Some(match parameter {
            Parameter::ProportionalGain => Value::Number(unit.proportional_gain(target)),
            _ => unit.stored(parameter, target),
        })
    }

    /// Change device state behind the mirror's back, like a front-panel edit.
    pub fn set_device_value(
        &self,
        address: UnitAddress,
        parameter: Parameter,
        target: Target,
        value: Value,
    ) {
        if let Some(unit) = self.lock().units.get_mut(&address) {
            unit.values.insert((parameter, target), value);
        }
    }

    fn lock(&self) -> MutexGuard<'_, SimState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[async_trait]
impl Transport for SimulatedBus {
    async fn exchange(
        &mut self,
        unit: UnitAddress,
        request: &Request,
    ) -> Result<Option<Value>, Error> {
        let mut state = self.lock();
        if request.parameter == Parameter::UniqueId {
            let timeout = state.timeout;
            state.probe_timeouts.push(timeout);
        }
        if state.failing.contains(&unit) {
            return Err(std::io::Error::other(format!("simulated failure on unit {unit}")).into());
        }
        if !state.units.contains_key(&unit) {
            return Ok(None);
        }
        *state.exchanges.entry(unit).or_insert(0) += 1;
        match state.units.get_mut(&unit) {
            Some(sim) => sim.answer(unit, request),
            None => Ok(None),
        }
    }

    fn response_timeout(&self) -> Duration {
        self.lock().timeout
    }

    fn set_response_timeout(&mut self, timeout: Duration) {
        self.lock().timeout = timeout;
    }
}
