use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::enums::{IntakeStatus, TimeFrame};

/// Filter criteria, AND-combined. `None` means no constraint.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct HistoryFilter {
    pub date: Option<NaiveDate>,
    /// Group names, exact match.
    pub medications: Option<Vec<String>>,
    pub time_frames: Option<Vec<TimeFrame>>,
}

impl HistoryFilter {
    pub fn is_empty(&self) -> bool {
        self.date.is_none() && self.medications.is_none() && self.time_frames.is_none()
    }
}

/// One logged intake, resolved for display.
#[derive(Debug, Clone, Serialize)]
pub struct HistoryEntry {
    pub log_id: Uuid,
    pub group_name: String,
    pub strength_label: String,
    pub status: IntakeStatus,
    pub taken_at: NaiveDateTime,
    /// Frame the log's time of day falls into.
    pub frame: TimeFrame,
}

/// Entries of one calendar day, newest first.
#[derive(Debug, Clone, Serialize)]
pub struct DayGroup {
    pub date: NaiveDate,
    pub entries: Vec<HistoryEntry>,
}

#[derive(Debug, Clone, Serialize)]
pub struct HistoryStats {
    /// Taken over scheduled dose slots across the trailing 7 days, percent.
    pub weekly_adherence: u32,
    /// Trailing all-taken logged days.
    pub current_streak: u32,
    pub total_logged: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct HistoryData {
    pub days: Vec<DayGroup>,
    pub stats: HistoryStats,
}
