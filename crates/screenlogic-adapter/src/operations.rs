//! Protocol operations: one request/response exchange each.

use chrono::NaiveDateTime;
use screenlogic_protocol::{
    decode_controller_config, decode_controller_status, decode_date_time, decode_version,
    requests, validate_response, ControllerConfig, ControllerStatus, MsgCode, ProtocolError,
    CONNECT_PREAMBLE,
};

use crate::error::Result;
use crate::session::Session;

/// Open the session: raw preamble, then the login message, then exactly one
/// response read.
pub async fn login(s: &mut Session) -> Result<()> {
    let id = s.next_id();
    let max = s.max_retries();
    s.send_with_retry(CONNECT_PREAMBLE, max).await?;
    s.send_with_retry(requests::login(id).as_bytes(), max).await?;

    let rm = s.read_message().await?;
    if rm.code() == MsgCode::BadLogin.as_u16() {
        return Err(ProtocolError::BadLogin.into());
    }
    if !s.accepts(&rm, id, MsgCode::LocalLogin)? {
        validate_response(&rm, id, MsgCode::LocalLogin)?;
        // Right code, wrong id.
        return Err(ProtocolError::UnexpectedResponseId {
            expected: id,
            got: rm.id(),
        }
        .into());
    }
    tracing::debug!(id, "login accepted");
    Ok(())
}

pub async fn get_time_and_date(s: &mut Session) -> Result<NaiveDateTime> {
    let id = s.next_id();
    let rm = s
        .send_and_validate(&requests::get_date_time(id), id, MsgCode::GetDateTime)
        .await?;
    Ok(decode_date_time(&rm)?)
}

pub async fn get_version(s: &mut Session) -> Result<String> {
    let id = s.next_id();
    let rm = s
        .send_and_validate(&requests::get_version(id), id, MsgCode::GetVersion)
        .await?;
    Ok(decode_version(&rm)?)
}

pub async fn get_controller_config(s: &mut Session) -> Result<ControllerConfig> {
    let id = s.next_id();
    let rm = s
        .send_and_validate(&requests::get_config(id), id, MsgCode::GetConfig)
        .await?;
    Ok(decode_controller_config(&rm)?)
}

pub async fn get_controller_status(s: &mut Session) -> Result<ControllerStatus> {
    let id = s.next_id();
    let rm = s
        .send_and_validate(&requests::get_status(id), id, MsgCode::GetStatus)
        .await?;
    Ok(decode_controller_status(&rm)?)
}

/// Turn a circuit on or off. The acknowledgement carries no payload.
pub async fn set_circuit_state(s: &mut Session, circuit_id: u32, on: bool) -> Result<()> {
    let id = s.next_id();
    let rm = s
        .send_and_validate(
            &requests::set_circuit_state(id, circuit_id, on),
            id,
            MsgCode::ButtonPress,
        )
        .await?;
    if !rm.payload().is_empty() {
        return Err(ProtocolError::InvalidResponse(format!(
            "set circuit state: unexpected {} byte payload",
            rm.payload().len()
        ))
        .into());
    }
    tracing::info!(circuit_id, on, "circuit state set");
    Ok(())
}
