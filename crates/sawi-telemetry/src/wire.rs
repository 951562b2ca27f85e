//! Wire shapes shared by the bulk snapshot and the push feed.
//!
//! Both sources deliver `{type, value, createdAt}` records. The push feed
//! wraps them in named events:
//!
//! | event                  | data             |
//! |------------------------|------------------|
//! | `sensorKelembapan`     | one soil record  |
//! | `sensorSuhu`           | one air record   |
//! | `listSensorKelembapan` | soil record list |
//! | `listSensorSuhu`       | air record list  |
//!
//! Accepted frame layouts: `{"event": .., "data": ..}`, the socket.io array
//! form `["event", data]` (optionally behind its numeric packet prefix, e.g.
//! `42[...]`), or a bare record routed by its `type`.

use std::fmt;

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::{Channel, Reading};

// ---------------------------------------------------------------------------
// Record
// ---------------------------------------------------------------------------

/// One `{type, value, createdAt}` record.
///
/// `value` and `createdAt` stay untyped until `type` is known: records on
/// channels this build does not display are skipped whatever they carry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WireReading {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub value: Value,
    #[serde(rename = "createdAt", default)]
    pub created_at: Value,
}

impl WireReading {
    /// `Ok(None)` when `type` names a channel this build does not display.
    pub fn decode(&self) -> Result<Option<Reading>, WireError> {
        let Some(channel) = Channel::from_wire_tag(&self.kind) else {
            return Ok(None);
        };
        self.decode_as(channel).map(Some)
    }

    fn decode_as(&self, channel: Channel) -> Result<Reading, WireError> {
        let value = match self.value.as_f64() {
            Some(v) if v.is_finite() => v,
            _ => {
                return Err(WireError::Shape(format!(
                    "non-numeric value for {}: {}",
                    channel.wire_tag(),
                    self.value
                )))
            }
        };
        let Some(raw_ts) = self.created_at.as_str() else {
            return Err(WireError::Shape(format!(
                "createdAt for {} is not a string: {}",
                channel.wire_tag(),
                self.created_at
            )));
        };
        let observed_at = parse_timestamp(raw_ts)?;
        Ok(Reading::new(channel, value, observed_at))
    }
}

/// Parse `createdAt`. RFC 3339 first; a naive date-time without offset is
/// read as UTC.
pub fn parse_timestamp(raw: &str) -> Result<DateTime<Utc>, WireError> {
    let s = raw.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Ok(dt.with_timezone(&Utc));
    }
    NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S%.f")
        .or_else(|_| NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S%.f"))
        .map(|naive| naive.and_utc())
        .map_err(|_| WireError::Timestamp {
            raw: raw.to_string(),
        })
}

// ---------------------------------------------------------------------------
// Error type
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WireError {
    /// Frame text is not JSON.
    Json(String),
    /// JSON is valid but not a record / envelope of the expected shape.
    Shape(String),
    /// `createdAt` could not be parsed.
    Timestamp { raw: String },
}

impl fmt::Display for WireError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WireError::Json(msg) => write!(f, "invalid json: {msg}"),
            WireError::Shape(msg) => write!(f, "unexpected frame shape: {msg}"),
            WireError::Timestamp { raw } => write!(f, "unparseable createdAt: '{raw}'"),
        }
    }
}

impl std::error::Error for WireError {}

// ---------------------------------------------------------------------------
// Push frames
// ---------------------------------------------------------------------------

/// One decoded unit from the push feed.
#[derive(Debug, Clone, PartialEq)]
pub enum PushFrame {
    /// A single live reading.
    Reading(Reading),
    /// The server's recent list for one channel.
    Batch(Channel, Vec<Reading>),
}

impl PushFrame {
    pub fn channel(&self) -> Channel {
        match self {
            PushFrame::Reading(r) => r.channel,
            PushFrame::Batch(ch, _) => *ch,
        }
    }
}

enum EventKind {
    Single(Channel),
    List(Channel),
}

fn event_kind(name: &str) -> Option<EventKind> {
    match name {
        "sensorKelembapan" => Some(EventKind::Single(Channel::SoilMoisture)),
        "sensorSuhu" => Some(EventKind::Single(Channel::AirTemperature)),
        "listSensorKelembapan" => Some(EventKind::List(Channel::SoilMoisture)),
        "listSensorSuhu" => Some(EventKind::List(Channel::AirTemperature)),
        _ => None,
    }
}

/// Decode one text frame.
///
/// `Ok(None)` means the frame is well-formed but carries nothing this build
/// displays (unknown event name or channel tag).
pub fn decode_push_frame(text: &str) -> Result<Option<PushFrame>, WireError> {
    // socket.io packets prefix the JSON payload with a numeric packet type.
    let body = text.trim().trim_start_matches(|c: char| c.is_ascii_digit());
    let v: Value = serde_json::from_str(body).map_err(|e| WireError::Json(e.to_string()))?;

    match v {
        Value::Array(mut items) => {
            if items.len() < 2 {
                return Err(WireError::Shape("event array needs [name, data]".to_string()));
            }
            let data = items.swap_remove(1);
            let name = items[0]
                .as_str()
                .ok_or_else(|| WireError::Shape("event name is not a string".to_string()))?
                .to_string();
            decode_event(&name, data)
        }
        Value::Object(mut map) => match map.remove("event") {
            Some(Value::String(name)) => {
                let data = map.remove("data").unwrap_or(Value::Null);
                decode_event(&name, data)
            }
            Some(_) => Err(WireError::Shape("event name is not a string".to_string())),
            None => {
                let rec: WireReading = serde_json::from_value(Value::Object(map))
                    .map_err(|e| WireError::Shape(e.to_string()))?;
                Ok(rec.decode()?.map(PushFrame::Reading))
            }
        },
        other => Err(WireError::Shape(format!("unexpected json value: {other}"))),
    }
}

fn decode_event(name: &str, data: Value) -> Result<Option<PushFrame>, WireError> {
    let Some(kind) = event_kind(name) else {
        return Ok(None);
    };
    match kind {
        // The event name decides the channel, as the dashboard always did.
        EventKind::Single(ch) => {
            let rec: WireReading =
                serde_json::from_value(data).map_err(|e| WireError::Shape(e.to_string()))?;
            Ok(Some(PushFrame::Reading(rec.decode_as(ch)?)))
        }
        EventKind::List(ch) => {
            let recs: Vec<WireReading> =
                serde_json::from_value(data).map_err(|e| WireError::Shape(e.to_string()))?;
            let readings = recs
                .iter()
                .map(|r| r.decode_as(ch))
                .collect::<Result<Vec<_>, _>>()?;
            Ok(Some(PushFrame::Batch(ch, readings)))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn parse_timestamp_accepts_rfc3339_and_naive() {
        let want = Utc.with_ymd_and_hms(2025, 3, 1, 8, 0, 0).unwrap();
        assert_eq!(parse_timestamp("2025-03-01T08:00:00.000Z").unwrap(), want);
        assert_eq!(parse_timestamp("2025-03-01T15:00:00+07:00").unwrap(), want);
        assert_eq!(parse_timestamp("2025-03-01T08:00:00").unwrap(), want);
        assert_eq!(parse_timestamp("2025-03-01 08:00:00").unwrap(), want);
        assert!(matches!(
            parse_timestamp("yesterday"),
            Err(WireError::Timestamp { .. })
        ));
    }

    #[test]
    fn record_with_unknown_type_decodes_to_none() {
        let rec = WireReading {
            kind: "CAHAYA".to_string(),
            value: Value::from(1.0),
            created_at: Value::from("2025-03-01T08:00:00Z"),
        };
        assert_eq!(rec.decode().unwrap(), None);
    }

    #[test]
    fn unknown_type_with_foreign_shape_is_skipped() {
        // a pump status record: string value, no timestamp
        let text = r#"{"type":"STATUS_POMPA","value":"ON"}"#;
        assert_eq!(decode_push_frame(text).unwrap(), None);
    }

    #[test]
    fn known_type_requires_number_and_timestamp() {
        let text = r#"{"type":"SUHU_UDARA","value":"hot","createdAt":"2025-03-01T08:00:00Z"}"#;
        assert!(matches!(decode_push_frame(text), Err(WireError::Shape(_))));
        let text = r#"{"type":"SUHU_UDARA","value":30}"#;
        assert!(matches!(decode_push_frame(text), Err(WireError::Shape(_))));
    }

    #[test]
    fn envelope_single_event() {
        let text = r#"{"event":"sensorSuhu","data":{"type":"SUHU_UDARA","value":29.5,"createdAt":"2025-03-01T08:00:00Z"}}"#;
        let frame = decode_push_frame(text).unwrap().unwrap();
        match frame {
            PushFrame::Reading(r) => {
                assert_eq!(r.channel, Channel::AirTemperature);
                assert_eq!(r.value, 29.5);
            }
            other => panic!("unexpected frame {other:?}"),
        }
    }

    #[test]
    fn socketio_array_with_packet_prefix() {
        let text = r#"42["sensorKelembapan",{"type":"KELEMBAPAN_TANAH","value":61,"createdAt":"2025-03-01T08:00:00Z"}]"#;
        let frame = decode_push_frame(text).unwrap().unwrap();
        assert_eq!(frame.channel(), Channel::SoilMoisture);
    }

    #[test]
    fn list_event_decodes_to_batch() {
        let text = r#"["listSensorSuhu",[
            {"type":"SUHU_UDARA","value":28,"createdAt":"2025-03-01T08:00:00Z"},
            {"type":"SUHU_UDARA","value":29,"createdAt":"2025-03-01T08:01:00Z"}
        ]]"#;
        match decode_push_frame(text).unwrap().unwrap() {
            PushFrame::Batch(ch, rs) => {
                assert_eq!(ch, Channel::AirTemperature);
                assert_eq!(rs.len(), 2);
            }
            other => panic!("unexpected frame {other:?}"),
        }
    }

    #[test]
    fn bare_record_routes_by_type() {
        let text = r#"{"type":"KELEMBAPAN_TANAH","value":55.5,"createdAt":"2025-03-01T08:00:00Z"}"#;
        let frame = decode_push_frame(text).unwrap().unwrap();
        assert_eq!(frame.channel(), Channel::SoilMoisture);
    }

    #[test]
    fn unknown_event_is_skipped_not_error() {
        let text = r#"{"event":"sensorCahaya","data":{}}"#;
        assert_eq!(decode_push_frame(text).unwrap(), None);
    }

    #[test]
    fn malformed_frames_are_errors() {
        assert!(matches!(decode_push_frame("not json"), Err(WireError::Json(_))));
        assert!(matches!(decode_push_frame("[\"sensorSuhu\"]"), Err(WireError::Shape(_))));
        assert!(matches!(decode_push_frame("17"), Err(WireError::Json(_)) | Err(WireError::Shape(_))));
        let bad_ts = r#"{"event":"sensorSuhu","data":{"type":"SUHU_UDARA","value":1,"createdAt":"?"}}"#;
        assert!(matches!(decode_push_frame(bad_ts), Err(WireError::Timestamp { .. })));
    }
}
