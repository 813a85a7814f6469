//! Step descriptors for the add-medication wizard.
//!
//! Each step owns its proceed predicate, skippability, and title, so flows
//! are plain step lists and the controller never switches on indices.

use crate::models::enums::{ScheduleType, TimeMode};

use super::form::MedicationFormData;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    Name,
    Strength,
    DosingType,
    Schedule,
    Form,
    Shape,
    Color,
    Review,
}

impl Step {
    /// Whether Next is enabled on this step for the given form state.
    pub fn can_proceed(&self, form: &MedicationFormData) -> bool {
        match self {
            Step::Name => !form.name.trim().is_empty(),
            Step::Strength => true,
            // a selection is required only once there is something to select
            Step::DosingType => {
                !form.selected_strengths.is_empty() || form.valid_strengths().is_empty()
            }
            Step::Schedule => match form.schedule.schedule_type {
                ScheduleType::AsNeeded => true,
                _ => match form.schedule.time_mode {
                    TimeMode::Specific => !form.schedule.specific_times.is_empty(),
                    TimeMode::Timeframe => !form.schedule.time_frames.is_empty(),
                },
            },
            Step::Form => {
                if form.form == "Other" {
                    !form.custom_form.trim().is_empty()
                } else {
                    !form.form.is_empty()
                }
            }
            Step::Shape | Step::Color | Step::Review => true,
        }
    }

    pub fn is_skippable(&self) -> bool {
        matches!(
            self,
            Step::Strength | Step::DosingType | Step::Schedule | Step::Shape | Step::Color
        )
    }

    pub fn title(&self) -> &'static str {
        match self {
            Step::Name => "Medication name",
            Step::Strength => "Strength",
            Step::DosingType => "Dosing",
            Step::Schedule => "Schedule",
            Step::Form => "Form",
            Step::Shape => "Shape",
            Step::Color => "Color",
            Step::Review => "Review",
        }
    }
}

/// Which sequence of steps the wizard walks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    /// Quick entry without dosing, schedule, or shape.
    Basic,
    Extended,
}

impl Flow {
    pub fn steps(&self) -> &'static [Step] {
        match self {
            Flow::Basic => &[
                Step::Name,
                Step::Form,
                Step::Strength,
                Step::Color,
                Step::Review,
            ],
            Flow::Extended => &[
                Step::Name,
                Step::Strength,
                Step::DosingType,
                Step::Schedule,
                Step::Form,
                Step::Shape,
                Step::Color,
                Step::Review,
            ],
        }
    }
}
