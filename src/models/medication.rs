use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::enums::{IntakeStatus, SelectionRule, TimeFrame};
use super::schedule::Schedule;

/// One strength variant of a medication, with its visual identity.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Medication {
    pub id: Uuid,
    pub name: String,
    pub form: String,
    pub custom_form_name: Option<String>,
    pub strength: String,
    pub strength_unit: String,
    pub shape: Option<String>,
    pub shape_line: bool,
    pub color_left: Option<String>,
    pub color_right: Option<String>,
    pub color_background: Option<String>,
}

impl Medication {
    /// Combined strength label, e.g. "500" + "mg" -> "500mg".
    pub fn strength_label(&self) -> String {
        format!("{}{}", self.strength, self.strength_unit)
    }

    /// Form shown to the user: the custom name wins when the form is "Other".
    pub fn display_form(&self) -> &str {
        match (self.form.as_str(), &self.custom_form_name) {
            ("Other", Some(custom)) if !custom.trim().is_empty() => custom,
            _ => &self.form,
        }
    }
}

/// A set of interchangeable strength variants sharing one schedule and a
/// selection rule for which variant is taken at log time.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MedicationGroup {
    pub id: Uuid,
    pub name: String,
    pub selection_rule: SelectionRule,
    pub reminder_time: Option<NaiveTime>,
    pub time_frame: Option<TimeFrame>,
}

/// Binds one medication variant (within a group) to a schedule and quantity.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DoseConfiguration {
    pub id: Uuid,
    pub group_id: Uuid,
    pub medication_id: Uuid,
    pub schedule: Schedule,
    pub quantity: u32,
    pub is_flexible: bool,
    pub start_date: NaiveDate,
    pub end_date: Option<NaiveDate>,
    pub display_name: Option<String>,
}

impl DoseConfiguration {
    /// Whether `date` falls inside the configuration's active range.
    pub fn is_active_on(&self, date: NaiveDate) -> bool {
        date >= self.start_date && self.end_date.map_or(true, |end| date <= end)
    }
}

/// One logging event. Immutable once created.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IntakeLog {
    pub id: Uuid,
    pub dose_configuration_id: Uuid,
    pub status: IntakeStatus,
    pub taken_at: NaiveDateTime,
}

/// One replenishment batch. `quantity` is the remaining amount; it is
/// decremented as doses are logged, never deleted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StockSource {
    pub id: Uuid,
    pub medication_id: Uuid,
    pub quantity: i64,
    pub expiry_date: Option<NaiveDate>,
    pub added_at: NaiveDateTime,
}
