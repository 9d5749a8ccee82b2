//! Message codes and the mapping from controller error codes to errors.
//!
//! A response always carries `request code + 1`. The three error codes
//! (bad login, invalid request, bad parameter) can arrive in place of any
//! response and are never retried.

use std::fmt;

use crate::ProtocolError;

/// Known message codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u16)]
pub enum MsgCode {
    BadLogin = 13,
    LocalLogin = 27,
    InvalidRequest = 30,
    BadParameter = 31,
    GetDateTime = 8110,
    GetVersion = 8120,
    GetStatus = 12526,
    ButtonPress = 12530,
    GetConfig = 12532,
}

impl MsgCode {
    pub const ALL: [MsgCode; 9] = [
        MsgCode::BadLogin,
        MsgCode::LocalLogin,
        MsgCode::InvalidRequest,
        MsgCode::BadParameter,
        MsgCode::GetDateTime,
        MsgCode::GetVersion,
        MsgCode::GetStatus,
        MsgCode::ButtonPress,
        MsgCode::GetConfig,
    ];

    pub const fn as_u16(self) -> u16 {
        self as u16
    }

    /// The code a successful response to this request carries.
    pub const fn response_code(self) -> u16 {
        self as u16 + 1
    }

    pub fn from_u16(code: u16) -> Option<MsgCode> {
        Self::ALL.into_iter().find(|c| c.as_u16() == code)
    }

    pub fn name(self) -> &'static str {
        match self {
            MsgCode::BadLogin => "bad-login",
            MsgCode::LocalLogin => "login",
            MsgCode::InvalidRequest => "invalid-request",
            MsgCode::BadParameter => "bad-parameter",
            MsgCode::GetDateTime => "get-date-time",
            MsgCode::GetVersion => "get-version",
            MsgCode::GetStatus => "get-status",
            MsgCode::ButtonPress => "button-press",
            MsgCode::GetConfig => "get-config",
        }
    }

    /// Controller error carried by this code, if it is one of the error codes.
    pub fn error(self) -> Option<ProtocolError> {
        match self {
            MsgCode::BadLogin => Some(ProtocolError::BadLogin),
            MsgCode::InvalidRequest => Some(ProtocolError::InvalidRequest),
            MsgCode::BadParameter => Some(ProtocolError::BadParameter),
            MsgCode::LocalLogin
            | MsgCode::GetDateTime
            | MsgCode::GetVersion
            | MsgCode::GetStatus
            | MsgCode::ButtonPress
            | MsgCode::GetConfig => None,
        }
    }
}

impl fmt::Display for MsgCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}({})", self.name(), self.as_u16())
    }
}

/// Map a raw wire code to the controller error it denotes.
pub fn error_for_code(code: u16) -> Option<ProtocolError> {
    MsgCode::from_u16(code).and_then(MsgCode::error)
}
