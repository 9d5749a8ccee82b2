//! Request builders. Reserved fields are always zero.

use bytes::BufMut;

use crate::codes::MsgCode;
use crate::message::Message;
use crate::wire::{put_string, string_size};
use crate::{LOGIN_CLIENT, LOGIN_PASSWORD};

/// Login: two reserved words, client name, password, reserved word.
pub fn login(id: u16) -> Message {
    let size = string_size(LOGIN_CLIENT) + string_size(LOGIN_PASSWORD) + 12;
    let mut m = Message::empty(id, MsgCode::LocalLogin.as_u16(), size as u32);
    let mut pl = m.payload_mut();
    pl.put_u32_le(0);
    pl.put_u32_le(0);
    put_string(&mut pl, LOGIN_CLIENT);
    put_string(&mut pl, LOGIN_PASSWORD);
    pl.put_u32_le(0);
    m
}

pub fn get_date_time(id: u16) -> Message {
    Message::empty(id, MsgCode::GetDateTime.as_u16(), 0)
}

pub fn get_version(id: u16) -> Message {
    Message::empty(id, MsgCode::GetVersion.as_u16(), 0)
}

/// Get-config carries two reserved zero words.
pub fn get_config(id: u16) -> Message {
    Message::empty(id, MsgCode::GetConfig.as_u16(), 8)
}

/// Get-status carries one reserved zero word.
pub fn get_status(id: u16) -> Message {
    Message::empty(id, MsgCode::GetStatus.as_u16(), 4)
}

/// Button press: reserved word, circuit id, 1 for on / 0 for off.
pub fn set_circuit_state(id: u16, circuit_id: u32, on: bool) -> Message {
    let mut m = Message::empty(id, MsgCode::ButtonPress.as_u16(), 12);
    let mut pl = m.payload_mut();
    pl.put_u32_le(0);
    pl.put_u32_le(circuit_id);
    pl.put_u32_le(u32::from(on));
    m
}
