//! Controller status: state, per-circuit on/off, alert code.
//!
//! Layout of the get-status response:
//!   state u32, 12 bytes of environment (freeze, remotes, delays, air temp),
//!   body count u32 + 24 bytes per body,
//!   circuit count u32 + (id u32, on u32, 4 colour/delay bytes) per circuit,
//!   pH, ORP, saturation, salt ppm, pH tank, ORP tank, alert (i32 each).

use std::fmt;

use serde::{Serialize, Serializer};

use crate::message::Message;
use crate::wire::Reader;
use crate::Result;

const CONTEXT: &str = "decode controller status";

/// Freeze mode, remotes, pool/spa/cleaner delay, 3 unknown, air temperature.
const ENVIRONMENT_SIZE: usize = 5 + 3 + 4;

/// Body type u32 plus last temp, heat status, heat set point, cool set point, heat mode.
const BODY_SIZE: usize = 4 + 5 * 4;

const MAX_PREALLOC: usize = 256;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ControllerState {
    #[default]
    Unknown,
    Ready,
    Sync,
    Service,
}

impl From<u32> for ControllerState {
    fn from(v: u32) -> Self {
        match v {
            1 => ControllerState::Ready,
            2 => ControllerState::Sync,
            3 => ControllerState::Service,
            _ => ControllerState::Unknown,
        }
    }
}

impl fmt::Display for ControllerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ControllerState::Unknown => "Unknown",
            ControllerState::Ready => "Ready",
            ControllerState::Sync => "Sync",
            ControllerState::Service => "Service",
        })
    }
}

impl Serialize for ControllerState {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CircuitStatus {
    pub id: u32,
    pub on: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ControllerStatus {
    pub state: ControllerState,
    pub circuits: Vec<CircuitStatus>,
    pub alert: i32,
}

impl ControllerStatus {
    /// On/off state of circuit `id`, or `None` if the status does not list it.
    pub fn status_for_id(&self, id: u32) -> Option<bool> {
        self.circuits.iter().find(|c| c.id == id).map(|c| c.on)
    }
}

/// Decode a get-status response payload.
pub fn decode_controller_status(m: &Message) -> Result<ControllerStatus> {
    let mut r = Reader::new(m.payload());

    let state = ControllerState::from(r.u32());
    r.skip(ENVIRONMENT_SIZE);

    let bodies = r.u32() as usize;
    for _ in 0..bodies {
        r.skip(BODY_SIZE);
        if !r.is_ok() {
            break;
        }
    }
    r.check(CONTEXT)?;

    let count = r.u32() as usize;
    let mut circuits = Vec::with_capacity(count.min(MAX_PREALLOC));
    for _ in 0..count {
        let [id, on] = r.u32s::<2>();
        r.skip(4); // colour set, position, stagger, delay
        if !r.is_ok() {
            break;
        }
        circuits.push(CircuitStatus { id, on: on != 0 });
    }

    let [_ph, _orp, _saturation, _salt_ppm, _ph_tank, _orp_tank, alert] = r.i32s::<7>();
    r.finish(CONTEXT)?;

    Ok(ControllerStatus {
        state,
        circuits,
        alert,
    })
}
