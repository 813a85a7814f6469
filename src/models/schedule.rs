//! Schedule model: the typed form of the persisted `schedule_type` column
//! plus `schedule_data` JSON pair.
//!
//! The database stores a denormalized pair (enum column + JSON blob mirroring
//! the frontend form). Internally that pair is decoded into a proper tagged
//! union, validated once at the boundary; everything past this module works
//! with `Schedule` and never touches raw JSON.

use std::str::FromStr;

use chrono::NaiveTime;
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::db::DatabaseError;

use super::enums::{ScheduleType, TimeFrame};

/// When the doses of a day happen: at literal clock times, or in coarse
/// time-of-day frames.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum DoseTimes {
    Specific(Vec<NaiveTime>),
    Frames(Vec<TimeFrame>),
}

impl DoseTimes {
    /// Number of dose slots per occurrence day.
    pub fn slot_count(&self) -> usize {
        match self {
            DoseTimes::Specific(times) => times.len(),
            DoseTimes::Frames(frames) => frames.len(),
        }
    }
}

/// Occurrence pattern of a dose configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Schedule {
    Everyday {
        times: DoseTimes,
    },
    /// Weekdays use the frontend convention: 0 = Sunday .. 6 = Saturday.
    SpecificDays {
        days: Vec<u8>,
        times: DoseTimes,
    },
    /// Repeating on/off window anchored at the configuration's start date.
    Cyclical {
        days_on: u32,
        days_off: u32,
        times: DoseTimes,
    },
    AsNeeded,
}

impl Schedule {
    pub fn schedule_type(&self) -> ScheduleType {
        match self {
            Schedule::Everyday { .. } => ScheduleType::Everyday,
            Schedule::SpecificDays { .. } => ScheduleType::SpecificDays,
            Schedule::Cyclical { .. } => ScheduleType::Cyclical,
            Schedule::AsNeeded => ScheduleType::AsNeeded,
        }
    }

    pub fn times(&self) -> Option<&DoseTimes> {
        match self {
            Schedule::Everyday { times }
            | Schedule::SpecificDays { times, .. }
            | Schedule::Cyclical { times, .. } => Some(times),
            Schedule::AsNeeded => None,
        }
    }

    /// Decode the persisted (`schedule_type`, `schedule_data`) pair.
    ///
    /// All integrity rules live here: the JSON tag must agree with the typed
    /// column, specific-day lists must be non-empty weekdays 0..=6, cyclical
    /// windows must be at least one day each, and the selected time mode must
    /// carry at least one entry. As-needed schedules ignore the blob.
    pub fn from_row(schedule_type: &str, schedule_data: Option<&str>) -> Result<Self, DatabaseError> {
        let kind = ScheduleType::from_str(schedule_type)?;

        if kind == ScheduleType::AsNeeded {
            return Ok(Schedule::AsNeeded);
        }

        let data = schedule_data.ok_or_else(|| {
            DatabaseError::ConstraintViolation(format!(
                "schedule_data is required for schedule_type '{schedule_type}'"
            ))
        })?;

        let raw: RawScheduleData = serde_json::from_str(data).map_err(|e| {
            DatabaseError::ConstraintViolation(format!("malformed schedule_data: {e}"))
        })?;

        if raw.schedule_type != schedule_type {
            return Err(DatabaseError::ConstraintViolation(format!(
                "schedule_data tag '{}' does not match schedule_type '{}'",
                raw.schedule_type, schedule_type
            )));
        }

        let times = raw.decode_times()?;

        match kind {
            ScheduleType::Everyday => Ok(Schedule::Everyday { times }),
            ScheduleType::SpecificDays => {
                let days = normalize_days(&raw.specific_days)?;
                Ok(Schedule::SpecificDays { days, times })
            }
            ScheduleType::Cyclical => {
                let days_on = raw.cycle_on_days.unwrap_or(0);
                let days_off = raw.cycle_off_days.unwrap_or(0);
                if days_on < 1 || days_off < 1 {
                    return Err(DatabaseError::ConstraintViolation(format!(
                        "cyclical schedule requires on/off windows of at least 1 day, got {days_on}/{days_off}"
                    )));
                }
                Ok(Schedule::Cyclical {
                    days_on,
                    days_off,
                    times,
                })
            }
            ScheduleType::AsNeeded => unreachable!("handled above"),
        }
    }

    /// Encode back into the persisted JSON shape (camelCase, frontend form).
    pub fn to_data_json(&self) -> Option<String> {
        let value = match self {
            Schedule::Everyday { times } => {
                let (mode, times_value) = encode_times(times);
                json!({
                    "type": "everyday",
                    "timeMode": mode,
                    (times_key(times)): times_value,
                })
            }
            Schedule::SpecificDays { days, times } => {
                let (mode, times_value) = encode_times(times);
                json!({
                    "type": "specific_days",
                    "specificDays": days,
                    "timeMode": mode,
                    (times_key(times)): times_value,
                })
            }
            Schedule::Cyclical {
                days_on,
                days_off,
                times,
            } => {
                let (mode, times_value) = encode_times(times);
                json!({
                    "type": "cyclical",
                    "cycleOnDays": days_on,
                    "cycleOffDays": days_off,
                    "timeMode": mode,
                    (times_key(times)): times_value,
                })
            }
            Schedule::AsNeeded => return None,
        };
        Some(value.to_string())
    }
}

fn times_key(times: &DoseTimes) -> &'static str {
    match times {
        DoseTimes::Specific(_) => "specificTimes",
        DoseTimes::Frames(_) => "timeFrames",
    }
}

fn encode_times(times: &DoseTimes) -> (&'static str, serde_json::Value) {
    match times {
        DoseTimes::Specific(list) => (
            "specific",
            json!(list
                .iter()
                .map(|t| t.format("%H:%M").to_string())
                .collect::<Vec<_>>()),
        ),
        DoseTimes::Frames(frames) => (
            "timeframe",
            json!(frames.iter().map(|f| f.as_str()).collect::<Vec<_>>()),
        ),
    }
}

/// Sort, deduplicate, and bounds-check a weekday list.
fn normalize_days(days: &[u8]) -> Result<Vec<u8>, DatabaseError> {
    if days.is_empty() {
        return Err(DatabaseError::ConstraintViolation(
            "specific_days schedule requires at least one weekday".into(),
        ));
    }
    if let Some(bad) = days.iter().find(|d| **d > 6) {
        return Err(DatabaseError::ConstraintViolation(format!(
            "weekday {bad} is out of range 0..=6"
        )));
    }
    let mut days = days.to_vec();
    days.sort_unstable();
    days.dedup();
    Ok(days)
}

// ---------------------------------------------------------------------------
// Raw wire shape
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawScheduleData {
    #[serde(rename = "type")]
    schedule_type: String,
    #[serde(default)]
    specific_days: Vec<u8>,
    cycle_on_days: Option<u32>,
    cycle_off_days: Option<u32>,
    time_mode: Option<String>,
    #[serde(default)]
    specific_times: Vec<String>,
    #[serde(default)]
    time_frames: Vec<RawTimeFrame>,
}

/// Frames appear either as bare names or as the frontend's entry objects
/// (`{id, type, ...}`); both decode to the same vocabulary.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum RawTimeFrame {
    Name(String),
    Entry {
        #[serde(rename = "type")]
        kind: String,
    },
}

impl RawTimeFrame {
    fn kind(&self) -> &str {
        match self {
            RawTimeFrame::Name(name) => name,
            RawTimeFrame::Entry { kind } => kind,
        }
    }
}

impl RawScheduleData {
    fn decode_times(&self) -> Result<DoseTimes, DatabaseError> {
        let mode = self.time_mode.as_deref().ok_or_else(|| {
            DatabaseError::ConstraintViolation("schedule_data is missing timeMode".into())
        })?;

        match mode {
            "specific" => {
                if self.specific_times.is_empty() {
                    return Err(DatabaseError::ConstraintViolation(
                        "specific time mode requires at least one time".into(),
                    ));
                }
                let times = self
                    .specific_times
                    .iter()
                    .map(|s| {
                        NaiveTime::parse_from_str(s, "%H:%M").map_err(|_| {
                            DatabaseError::ConstraintViolation(format!(
                                "invalid HH:MM time '{s}' in schedule_data"
                            ))
                        })
                    })
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(DoseTimes::Specific(times))
            }
            "timeframe" => {
                if self.time_frames.is_empty() {
                    return Err(DatabaseError::ConstraintViolation(
                        "timeframe mode requires at least one time frame".into(),
                    ));
                }
                let frames = self
                    .time_frames
                    .iter()
                    .map(|f| TimeFrame::from_str(f.kind()))
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(DoseTimes::Frames(frames))
            }
            other => Err(DatabaseError::InvalidEnum {
                field: "timeMode".into(),
                value: other.into(),
            }),
        }
    }
}
