//! Date/time and version responses.

use chrono::{NaiveDate, NaiveDateTime};

use crate::message::Message;
use crate::wire::Reader;
use crate::{ProtocolError, Result};

/// Decode a get-date-time payload: year, month, (unused), day, hour, minute,
/// second, millisecond, auto-DST, each a u16. The auto-DST flag is ignored.
/// Returns the controller's wall-clock time.
pub fn decode_date_time(m: &Message) -> Result<NaiveDateTime> {
    let mut r = Reader::new(m.payload());
    let [year, month, _unused, day, hour, minute, second, millisecond, _auto_dst] =
        r.u16s::<9>();
    r.check("decode date time")?;

    NaiveDate::from_ymd_opt(i32::from(year), u32::from(month), u32::from(day))
        .and_then(|d| {
            d.and_hms_milli_opt(
                u32::from(hour),
                u32::from(minute),
                u32::from(second),
                u32::from(millisecond),
            )
        })
        .ok_or_else(|| {
            ProtocolError::InvalidResponse(format!(
                "decode date time: not a valid date: \
                 {year}-{month}-{day} {hour}:{minute}:{second}.{millisecond}"
            ))
        })
}

/// Decode a get-version payload: a single string.
pub fn decode_version(m: &Message) -> Result<String> {
    let mut r = Reader::new(m.payload());
    let version = r.string();
    r.check("decode version")?;
    Ok(version)
}
