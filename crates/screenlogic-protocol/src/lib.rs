//! ScreenLogic Protocol -- wire types, message codec, record decoders.
//!
//! Plain TCP to the controller. Every message is an 8-byte little-endian
//! header (id u16, code u16, payload size u32) followed by the payload.
//! Nothing in this crate performs I/O.

pub mod codec;
pub mod codes;
pub mod equipment;
pub mod message;
pub mod requests;
pub mod status;
pub mod system;
pub mod wire;

pub use codec::MessageCodec;
pub use codes::MsgCode;
pub use equipment::{
    decode_controller_config, decode_controller_hardware, Circuit, CircuitFunction,
    CircuitInterface, ColorEntry, ControllerConfig, EquipmentFlags, IntelliFlo,
};
pub use message::{is_response, validate_response, Message, HEADER_SIZE};
pub use status::{decode_controller_status, CircuitStatus, ControllerState, ControllerStatus};
pub use system::{decode_date_time, decode_version};

/// Raw preamble written before the login message to open a session.
pub const CONNECT_PREAMBLE: &[u8] = b"CONNECTSERVERHOST\r\n\r\n";

/// Client name carried in the login message.
pub const LOGIN_CLIENT: &str = "automation";

/// Password carried in the login message (at most 16 bytes, never checked).
pub const LOGIN_PASSWORD: &str = "0000000000000000";

/// Default attempt bound for sends and response reads.
pub const DEFAULT_MAX_RETRIES: usize = 3;

#[derive(Debug, thiserror::Error)]
pub enum ProtocolError {
    #[error("bad login")]
    BadLogin,
    #[error("invalid request")]
    InvalidRequest,
    #[error("bad parameter")]
    BadParameter,
    #[error("unexpected response id: expected {expected}, got {got}")]
    UnexpectedResponseId { expected: u16, got: u16 },
    #[error("unexpected response code: expected {expected}, got {got}")]
    UnexpectedResponseCode { expected: u16, got: u16 },
    #[error("invalid response: {0}")]
    InvalidResponse(String),
    #[error("no valid response received")]
    NoValidResponse,
    #[error("unknown controller type {0}")]
    UnknownController(u8),
    #[error("unknown hardware type {hardware} for controller type {controller}")]
    UnknownHardware { controller: u8, hardware: u8 },
    #[error("message too large: {size} bytes (max {max})")]
    MessageTooLarge { size: usize, max: usize },
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl ProtocolError {
    /// Whether this error was reported by the controller itself.
    pub fn is_controller_error(&self) -> bool {
        matches!(
            self,
            ProtocolError::BadLogin | ProtocolError::InvalidRequest | ProtocolError::BadParameter
        )
    }
}

pub type Result<T> = std::result::Result<T, ProtocolError>;
