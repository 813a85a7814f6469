//! Transient form state backing the add-medication wizard.
//!
//! Lives only while the wizard is open. Nothing here touches the database;
//! the controller converts the form into rows exactly once on save.

use chrono::{NaiveDate, NaiveTime};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::enums::{DosingType, ScheduleType, TimeFrame, TimeMode};

/// Product-fixed medication forms. "Other" unlocks a free-text name.
pub const MEDICATION_FORMS: [&str; 16] = [
    "Tablet",
    "Capsule",
    "Liquid",
    "Injection",
    "Drops",
    "Inhaler",
    "Powder",
    "Patch",
    "Cream",
    "Ointment",
    "Gel",
    "Spray",
    "Suppository",
    "Granules",
    "Lozenge",
    "Other",
];

pub const STRENGTH_UNITS: [&str; 6] = ["mg", "g", "mcg", "mL", "IU", "%"];

pub const PILL_COLORS: [&str; 8] = [
    "white", "yellow", "orange", "red", "pink", "purple", "blue", "green",
];

/// Card background palette, name plus hex as rendered by the frontend.
pub const BACKGROUND_COLORS: [(&str, &str); 6] = [
    ("light-blue", "#D8E7F5"),
    ("light-green", "#DCEFDF"),
    ("light-yellow", "#F8F0D4"),
    ("light-pink", "#F7DEE6"),
    ("light-purple", "#E6DEF5"),
    ("light-orange", "#F8E3D1"),
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PillShape {
    pub name: &'static str,
    /// Two-tone shapes render a left and a right half in separate colors.
    pub two_tone: bool,
    /// Whether the shape can carry a score line.
    pub has_line: bool,
}

pub const PILL_SHAPES: [PillShape; 8] = [
    PillShape { name: "round", two_tone: false, has_line: true },
    PillShape { name: "oval", two_tone: false, has_line: true },
    PillShape { name: "oblong", two_tone: true, has_line: true },
    PillShape { name: "capsule", two_tone: true, has_line: false },
    PillShape { name: "square", two_tone: false, has_line: true },
    PillShape { name: "diamond", two_tone: false, has_line: false },
    PillShape { name: "triangle", two_tone: false, has_line: false },
    PillShape { name: "pentagon", two_tone: false, has_line: false },
];

pub fn pill_shape(name: &str) -> Option<&'static PillShape> {
    PILL_SHAPES.iter().find(|s| s.name == name)
}

/// One strength variant row in the Strength step.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StrengthEntry {
    pub id: Uuid,
    pub value: String,
    pub unit: String,
}

impl StrengthEntry {
    pub fn new(value: &str, unit: &str) -> Self {
        Self {
            id: Uuid::new_v4(),
            value: value.to_string(),
            unit: unit.to_string(),
        }
    }

    pub fn is_blank(&self) -> bool {
        self.value.trim().is_empty()
    }
}

/// A time-frame row in the Schedule step. Custom frames carry explicit
/// start/end times and collapse to a named frame at save.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeFrameEntry {
    pub id: Uuid,
    pub kind: TimeFrameKind,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum TimeFrameKind {
    Named(TimeFrame),
    Custom {
        start_time: NaiveTime,
        end_time: NaiveTime,
    },
}

impl TimeFrameEntry {
    pub fn named(frame: TimeFrame) -> Self {
        Self {
            id: Uuid::new_v4(),
            kind: TimeFrameKind::Named(frame),
        }
    }

    pub fn custom(start_time: NaiveTime, end_time: NaiveTime) -> Self {
        Self {
            id: Uuid::new_v4(),
            kind: TimeFrameKind::Custom {
                start_time,
                end_time,
            },
        }
    }
}

/// Schedule fields of the form, kept loose until save. Whatever pattern the
/// user last configured survives switching the type back and forth.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScheduleDraft {
    pub schedule_type: ScheduleType,
    pub specific_days: Vec<u8>,
    pub cycle_on_days: u32,
    pub cycle_off_days: u32,
    pub time_mode: TimeMode,
    pub specific_times: Vec<NaiveTime>,
    pub time_frames: Vec<TimeFrameEntry>,
    pub start_date: NaiveDate,
    pub end_date: Option<NaiveDate>,
}

impl ScheduleDraft {
    pub fn with_defaults(today: NaiveDate) -> Self {
        Self {
            schedule_type: ScheduleType::Everyday,
            specific_days: Vec::new(),
            cycle_on_days: 21,
            cycle_off_days: 7,
            time_mode: TimeMode::Specific,
            specific_times: vec![NaiveTime::from_hms_opt(8, 0, 0).unwrap_or_default()],
            time_frames: Vec::new(),
            start_date: today,
            end_date: None,
        }
    }

    pub fn has_dose_times(&self) -> bool {
        match self.time_mode {
            TimeMode::Specific => !self.specific_times.is_empty(),
            TimeMode::Timeframe => !self.time_frames.is_empty(),
        }
    }
}

/// Everything the wizard collects across its steps.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MedicationFormData {
    pub name: String,
    pub strengths: Vec<StrengthEntry>,
    pub dosing_type: DosingType,
    /// Strength entry ids picked on the dosing step.
    pub selected_strengths: Vec<Uuid>,
    pub fixed_quantity: u32,
    pub schedule: ScheduleDraft,
    pub form: String,
    pub custom_form: String,
    pub shape: Option<String>,
    pub show_line: bool,
    pub color_left: Option<String>,
    pub color_right: Option<String>,
    pub color_background: Option<String>,
}

impl MedicationFormData {
    pub fn with_defaults(today: NaiveDate) -> Self {
        Self {
            name: String::new(),
            strengths: vec![StrengthEntry::new("", "mg")],
            dosing_type: DosingType::Fixed,
            selected_strengths: Vec::new(),
            fixed_quantity: 1,
            schedule: ScheduleDraft::with_defaults(today),
            form: String::new(),
            custom_form: String::new(),
            shape: None,
            show_line: false,
            color_left: None,
            color_right: None,
            color_background: None,
        }
    }

    /// Strength entries with a non-blank value; the ones that become rows.
    pub fn valid_strengths(&self) -> Vec<&StrengthEntry> {
        self.strengths.iter().filter(|s| !s.is_blank()).collect()
    }

    /// Set the pill shape, keeping the two-tone color pair coherent: picking
    /// a two-tone shape with no right color assigns the neutral default,
    /// picking a single-tone shape clears it.
    pub fn set_shape(&mut self, shape_name: &str) {
        let two_tone = pill_shape(shape_name).map_or(false, |s| s.two_tone);
        self.shape = Some(shape_name.to_string());
        if two_tone {
            if self.color_right.is_none() {
                self.color_right = Some("white".to_string());
            }
        } else {
            self.color_right = None;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 5, 12).unwrap()
    }

    #[test]
    fn defaults_start_with_one_blank_strength() {
        let form = MedicationFormData::with_defaults(today());
        assert_eq!(form.strengths.len(), 1);
        assert!(form.strengths[0].is_blank());
        assert_eq!(form.strengths[0].unit, "mg");
        assert_eq!(form.dosing_type, DosingType::Fixed);
        assert_eq!(form.fixed_quantity, 1);
        assert_eq!(form.schedule.schedule_type, ScheduleType::Everyday);
        assert_eq!(
            form.schedule.specific_times,
            vec![NaiveTime::from_hms_opt(8, 0, 0).unwrap()]
        );
        assert_eq!(form.schedule.start_date, today());
        assert!(form.valid_strengths().is_empty());
    }

    #[test]
    fn valid_strengths_skips_blank_values() {
        let mut form = MedicationFormData::with_defaults(today());
        form.strengths = vec![
            StrengthEntry::new("500", "mg"),
            StrengthEntry::new("   ", "mg"),
            StrengthEntry::new("1000", "mg"),
        ];
        let kept: Vec<&str> = form
            .valid_strengths()
            .iter()
            .map(|s| s.value.as_str())
            .collect();
        assert_eq!(kept, vec!["500", "1000"]);
    }

    #[test]
    fn two_tone_shape_fills_missing_right_color() {
        let mut form = MedicationFormData::with_defaults(today());
        form.set_shape("capsule");
        assert_eq!(form.color_right.as_deref(), Some("white"));

        // an explicit choice survives re-selecting a two-tone shape
        form.color_right = Some("red".to_string());
        form.set_shape("oblong");
        assert_eq!(form.color_right.as_deref(), Some("red"));
    }

    #[test]
    fn single_tone_shape_clears_right_color() {
        let mut form = MedicationFormData::with_defaults(today());
        form.color_right = Some("blue".to_string());
        form.set_shape("round");
        assert_eq!(form.color_right, None);
    }

    #[test]
    fn vocabulary_lists() {
        assert_eq!(MEDICATION_FORMS.len(), 16);
        assert_eq!(MEDICATION_FORMS[15], "Other");
        assert!(STRENGTH_UNITS.contains(&"mg"));
        assert_eq!(PILL_COLORS.len(), 8);
        assert!(BACKGROUND_COLORS.iter().all(|(_, hex)| hex.starts_with('#')));
    }

    #[test]
    fn shape_lookup_flags() {
        assert!(pill_shape("capsule").unwrap().two_tone);
        assert!(!pill_shape("capsule").unwrap().has_line);
        assert!(!pill_shape("round").unwrap().two_tone);
        assert!(pill_shape("round").unwrap().has_line);
        assert!(pill_shape("hexagon").is_none());
    }

    #[test]
    fn draft_dose_times_follow_mode() {
        let mut draft = ScheduleDraft::with_defaults(today());
        assert!(draft.has_dose_times());

        draft.time_mode = TimeMode::Timeframe;
        assert!(!draft.has_dose_times());

        draft.time_frames.push(TimeFrameEntry::named(TimeFrame::Morning));
        assert!(draft.has_dose_times());
    }
}
