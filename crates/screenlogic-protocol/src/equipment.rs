//! Controller configuration: model, equipment flags, circuits, pumps.
//!
//! The get-config response is one variable-length record. Layout:
//!   id u32, setpoints [4], units u8, controller u8, hardware u8, [1],
//!   equipment u32, circuit-name string,
//!   circuit count u32, circuits...,
//!   colour count u32, colours...,
//!   8 pump bytes, flags2 u32, alarms u32
//! Trailing bytes are rejected so protocol drift fails loudly.

use std::collections::HashSet;
use std::fmt;

use serde::{Serialize, Serializer};

use crate::message::Message;
use crate::wire::Reader;
use crate::{ProtocolError, Result};

const CONTEXT: &str = "decode controller config";

/// Number of pump slots reported in every config.
pub const PUMP_SLOTS: usize = 8;

/// Cap on up-front allocation driven by wire counts.
const MAX_PREALLOC: usize = 256;

bitflags::bitflags! {
    /// Installed equipment. Bits 4..=11 mark the eight IntelliFlo pump slots.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize)]
    #[serde(transparent)]
    pub struct EquipmentFlags: u32 {
        const SOLAR = 1 << 0;
        const SOLAR_HEAT_PUMP = 1 << 1;
        const CHLORINATOR = 1 << 2;
        const INTELLIBRIGHT = 1 << 3;
        const INTELLIFLO_0 = 1 << 4;
        const INTELLIFLO_1 = 1 << 5;
        const INTELLIFLO_2 = 1 << 6;
        const INTELLIFLO_3 = 1 << 7;
        const INTELLIFLO_4 = 1 << 8;
        const INTELLIFLO_5 = 1 << 9;
        const INTELLIFLO_6 = 1 << 10;
        const INTELLIFLO_7 = 1 << 11;
        const NO_SPECIAL_LIGHTS = 1 << 12;
        const COOLING = 1 << 13;
        const MAGIC_STREAM = 1 << 14;
        const INTELLICHEM = 1 << 15;
        const HYBRID_HEATER = 1 << 16;
    }
}

impl EquipmentFlags {
    /// Whether pump slot `slot` (0..8) is installed.
    pub fn has_intelliflo(self, slot: usize) -> bool {
        slot < PUMP_SLOTS && self.bits() & (1 << (slot + 4)) != 0
    }

    /// Number of installed pump slots.
    pub fn intelliflo_count(self) -> usize {
        (0..PUMP_SLOTS).filter(|&s| self.has_intelliflo(s)).count()
    }
}

/// What a circuit controls.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CircuitFunction {
    Generic,
    Spa,
    Pool,
    SecondSpa,
    SecondPool,
    MasterCleaner,
    Cleaner,
    Light,
    Dimmer,
    SamLight,
    SalLight,
    PhotoNextGen,
    ColorWheel,
    Valve,
    Spillway,
    FloorCleaner,
    IntelliBrite,
    MagicStream,
    Dimmer25,
    Other(u8),
}

impl CircuitFunction {
    const NAMED: [CircuitFunction; 19] = [
        CircuitFunction::Generic,
        CircuitFunction::Spa,
        CircuitFunction::Pool,
        CircuitFunction::SecondSpa,
        CircuitFunction::SecondPool,
        CircuitFunction::MasterCleaner,
        CircuitFunction::Cleaner,
        CircuitFunction::Light,
        CircuitFunction::Dimmer,
        CircuitFunction::SamLight,
        CircuitFunction::SalLight,
        CircuitFunction::PhotoNextGen,
        CircuitFunction::ColorWheel,
        CircuitFunction::Valve,
        CircuitFunction::Spillway,
        CircuitFunction::FloorCleaner,
        CircuitFunction::IntelliBrite,
        CircuitFunction::MagicStream,
        CircuitFunction::Dimmer25,
    ];

    pub fn as_u8(self) -> u8 {
        match self {
            CircuitFunction::Other(v) => v,
            named => Self::NAMED.iter().position(|f| *f == named).unwrap_or(0) as u8,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            CircuitFunction::Generic => "Generic",
            CircuitFunction::Spa => "Spa",
            CircuitFunction::Pool => "Pool",
            CircuitFunction::SecondSpa => "Second Spa",
            CircuitFunction::SecondPool => "Second Pool",
            CircuitFunction::MasterCleaner => "Master Cleaner",
            CircuitFunction::Cleaner => "Cleaner",
            CircuitFunction::Light => "Light",
            CircuitFunction::Dimmer => "Dimmer",
            CircuitFunction::SamLight => "SAM Light",
            CircuitFunction::SalLight => "SAL Light",
            CircuitFunction::PhotoNextGen => "Photo Next Gen",
            CircuitFunction::ColorWheel => "Color Wheel",
            CircuitFunction::Valve => "Valve",
            CircuitFunction::Spillway => "Spillway",
            CircuitFunction::FloorCleaner => "Floor Cleaner",
            CircuitFunction::IntelliBrite => "IntelliBrite",
            CircuitFunction::MagicStream => "Magic Stream",
            CircuitFunction::Dimmer25 => "Dimmer 25",
            CircuitFunction::Other(_) => "",
        }
    }
}

impl From<u8> for CircuitFunction {
    fn from(v: u8) -> Self {
        Self::NAMED
            .get(v as usize)
            .copied()
            .unwrap_or(CircuitFunction::Other(v))
    }
}

impl fmt::Display for CircuitFunction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CircuitFunction::Other(v) => write!(f, "function {v}"),
            named => f.write_str(named.name()),
        }
    }
}

impl Serialize for CircuitFunction {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// Which panel a circuit is shown on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CircuitInterface {
    Pool,
    Spa,
    Features,
    SyncSwim,
    Lights,
    DontShow,
    Invalid,
    Other(u8),
}

impl CircuitInterface {
    pub fn as_u8(self) -> u8 {
        match self {
            CircuitInterface::Pool => 0,
            CircuitInterface::Spa => 1,
            CircuitInterface::Features => 2,
            CircuitInterface::SyncSwim => 3,
            CircuitInterface::Lights => 4,
            CircuitInterface::DontShow => 5,
            CircuitInterface::Invalid => 6,
            CircuitInterface::Other(v) => v,
        }
    }
}

impl From<u8> for CircuitInterface {
    fn from(v: u8) -> Self {
        match v {
            0 => CircuitInterface::Pool,
            1 => CircuitInterface::Spa,
            2 => CircuitInterface::Features,
            3 => CircuitInterface::SyncSwim,
            4 => CircuitInterface::Lights,
            5 => CircuitInterface::DontShow,
            6 => CircuitInterface::Invalid,
            other => CircuitInterface::Other(other),
        }
    }
}

impl fmt::Display for CircuitInterface {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            CircuitInterface::Pool => "Pool",
            CircuitInterface::Spa => "Spa",
            CircuitInterface::Features => "Features",
            CircuitInterface::SyncSwim => "Sync Swim",
            CircuitInterface::Lights => "Lights",
            CircuitInterface::DontShow => "Don't Show",
            CircuitInterface::Invalid => "Invalid",
            CircuitInterface::Other(v) => return write!(f, "interface {v}"),
        };
        f.write_str(name)
    }
}

impl Serialize for CircuitInterface {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// Controller model names indexed by controller type, keyed by hardware type.
/// Empty rows are types no known controller reports.
static CONTROLLER_MODELS: [&[(u8, &str)]; 15] = [
    &[(0, "IntelliTouch i5+3S")],
    &[(0, "IntelliTouch i7+3")],
    &[(0, "IntelliTouch i9+3")],
    &[(0, "IntelliTouch i5+3S")],
    &[(0, "IntelliTouch i9+3S")],
    &[(0, "IntelliTouch i10+3D"), (1, "IntelliTouch i10X")],
    &[(0, "IntelliTouch i10X")],
    &[],
    &[],
    &[],
    &[(0, "SunTouch")],
    &[(0, "Suntouch/Intellicom")],
    &[],
    &[
        (0, "EasyTouch2 8"),
        (1, "EasyTouch2 8P"),
        (2, "EasyTouch2 4"),
        (3, "EasyTouch2 4P"),
        (5, "EasyTouch2 PL4"),
        (6, "EasyTouch2 PSL4"),
    ],
    &[
        (0, "EasyTouch1 8"),
        (1, "EasyTouch1 8P"),
        (2, "EasyTouch1 4"),
        (3, "EasyTouch1 4P"),
    ],
];

/// Resolve the controller/hardware byte pair to a model name.
pub fn decode_controller_hardware(controller: u8, hardware: u8) -> Result<&'static str> {
    let models = CONTROLLER_MODELS
        .get(controller as usize)
        .filter(|row| !row.is_empty())
        .ok_or(ProtocolError::UnknownController(controller))?;
    models
        .iter()
        .find(|(hw, _)| *hw == hardware)
        .map(|(_, name)| *name)
        .ok_or(ProtocolError::UnknownHardware {
            controller,
            hardware,
        })
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Circuit {
    pub id: u32,
    pub name: String,
    pub function: CircuitFunction,
    pub interface: CircuitInterface,
    pub index: u8,
    pub device_id: u8,
    pub flags: u8,
    pub color_set: u8,
    pub color_position: u8,
    pub color_stagger: u8,
    /// Default runtime in minutes.
    pub default_runtime: u16,
}

/// Reading for one installed IntelliFlo pump slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct IntelliFlo {
    pub slot: u8,
    pub value: u8,
}

/// One entry of the controller's light colour table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ColorEntry {
    pub name: String,
    pub rgb: [u32; 3],
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ControllerConfig {
    pub model: String,
    pub id: u32,
    pub celsius: bool,
    pub equipment: EquipmentFlags,
    pub circuits: Vec<Circuit>,
    pub colors: Vec<ColorEntry>,
    pub intelliflo: Vec<IntelliFlo>,
    pub flags2: u32,
    pub alarms: u32,
}

impl ControllerConfig {
    pub fn circuit_by_id(&self, id: u32) -> Option<&Circuit> {
        self.circuits.iter().find(|c| c.id == id)
    }

    pub fn circuit_by_name(&self, name: &str) -> Option<&Circuit> {
        self.circuits.iter().find(|c| c.name == name)
    }

    pub fn circuit_name(&self, id: u32) -> Option<&str> {
        self.circuit_by_id(id).map(|c| c.name.as_str())
    }
}

/// Decode a get-config response payload.
pub fn decode_controller_config(m: &Message) -> Result<ControllerConfig> {
    let mut r = Reader::new(m.payload());

    let id = r.u32();
    r.skip(4); // setpoint data
    let celsius = r.u8() != 0;
    let [controller, hardware] = r.u8s::<2>();
    r.check(CONTEXT)?;
    let model = decode_controller_hardware(controller, hardware)?.to_string();
    r.skip(1); // controller data
    let equipment = EquipmentFlags::from_bits_retain(r.u32());
    let _circuit_name = r.string();

    let count = r.u32() as usize;
    let mut circuits = Vec::with_capacity(count.min(MAX_PREALLOC));
    let mut seen = HashSet::new();
    for _ in 0..count {
        let id = r.u32();
        let name = r.string();
        let index = r.u8();
        let [function, interface, flags, color_set, color_position, color_stagger] = r.u8s::<6>();
        let device_id = r.u8();
        let default_runtime = r.u16();
        r.skip(2);
        if !r.is_ok() {
            break;
        }
        if !seen.insert(id) {
            return Err(ProtocolError::InvalidResponse(format!(
                "{CONTEXT}: duplicate circuit id {id}"
            )));
        }
        circuits.push(Circuit {
            id,
            name,
            function: function.into(),
            interface: interface.into(),
            index,
            device_id,
            flags,
            color_set,
            color_position,
            color_stagger,
            default_runtime,
        });
    }
    r.check(CONTEXT)?;

    let count = r.u32() as usize;
    let mut colors = Vec::with_capacity(count.min(MAX_PREALLOC));
    for _ in 0..count {
        let name = r.string();
        let rgb = r.u32s::<3>();
        if !r.is_ok() {
            break;
        }
        colors.push(ColorEntry { name, rgb });
    }
    r.check(CONTEXT)?;

    let mut intelliflo = Vec::new();
    for slot in 0..PUMP_SLOTS {
        let value = r.u8();
        if equipment.has_intelliflo(slot) {
            intelliflo.push(IntelliFlo {
                slot: slot as u8,
                value,
            });
        }
    }
    r.check(CONTEXT)?;

    let [flags2, alarms] = r.u32s::<2>();
    r.finish(CONTEXT)?;

    Ok(ControllerConfig {
        model,
        id,
        celsius,
        equipment,
        circuits,
        colors,
        intelliflo,
        flags2,
        alarms,
    })
}
