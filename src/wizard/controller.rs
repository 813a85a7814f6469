//! Wizard controller: walks a flow's steps over one `MedicationFormData`
//! and converts it into rows on save.

use chrono::NaiveDate;
use rusqlite::{params, Connection};
use uuid::Uuid;

use crate::db::DatabaseError;
use crate::models::enums::{DosingType, SelectionRule, TimeMode};
use crate::models::schedule::{DoseTimes, Schedule};
use crate::schedule::bucket_for_time;

use super::form::{MedicationFormData, ScheduleDraft, TimeFrameKind};
use super::steps::{Flow, Step};

/// Result of a `next()` request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepOutcome {
    Advanced,
    /// Already on the last step; the caller should offer Save.
    ReachedEnd,
    /// The current step's proceed predicate failed.
    Blocked,
}

#[derive(Debug)]
pub struct AddMedicationWizard {
    flow: Flow,
    index: usize,
    today: NaiveDate,
    pub form: MedicationFormData,
}

impl AddMedicationWizard {
    pub fn new(flow: Flow, today: NaiveDate) -> Self {
        Self {
            flow,
            index: 0,
            today,
            form: MedicationFormData::with_defaults(today),
        }
    }

    pub fn flow(&self) -> Flow {
        self.flow
    }

    pub fn current_step(&self) -> Step {
        self.flow.steps()[self.index]
    }

    pub fn step_index(&self) -> usize {
        self.index
    }

    pub fn step_count(&self) -> usize {
        self.flow.steps().len()
    }

    /// Advance if the current step validates.
    pub fn next(&mut self) -> StepOutcome {
        if !self.current_step().can_proceed(&self.form) {
            return StepOutcome::Blocked;
        }
        if self.index + 1 < self.step_count() {
            self.index += 1;
            StepOutcome::Advanced
        } else {
            StepOutcome::ReachedEnd
        }
    }

    /// Advance past a skippable step without validating.
    pub fn skip(&mut self) -> bool {
        if self.current_step().is_skippable() && self.index + 1 < self.step_count() {
            self.index += 1;
            true
        } else {
            false
        }
    }

    /// Go back one step. Never validates.
    pub fn back(&mut self) -> bool {
        if self.index > 0 {
            self.index -= 1;
            true
        } else {
            false
        }
    }

    /// Abandon the wizard: back to the first step with a fresh form.
    pub fn cancel(&mut self) {
        self.index = 0;
        self.form = MedicationFormData::with_defaults(self.today);
    }

    /// Persist the form as a group with its variants and dose configurations.
    ///
    /// Only available from the review step. On success the wizard resets as
    /// if cancelled; on error it stays on review with the form intact so the
    /// user can retry or go back.
    pub fn save(&mut self, conn: &mut Connection) -> Result<Uuid, DatabaseError> {
        if self.current_step() != Step::Review {
            return Err(DatabaseError::ConstraintViolation(
                "save is only available from the review step".into(),
            ));
        }
        let group_id = persist_form(conn, &self.form)?;
        self.cancel();
        Ok(group_id)
    }
}

/// Run the save transform on a finished form and persist it. Used by the
/// wizard and directly by the save command.
pub fn persist_form(
    conn: &mut Connection,
    form: &MedicationFormData,
) -> Result<Uuid, DatabaseError> {
    SavePlan::from_form(form)?.persist(conn)
}

/// The save transform's output: form state resolved into the rows to write.
struct SavePlan {
    name: String,
    selection_rule: SelectionRule,
    schedule: Schedule,
    quantity: u32,
    is_flexible: bool,
    start_date: NaiveDate,
    end_date: Option<NaiveDate>,
    form: String,
    custom_form_name: Option<String>,
    shape: Option<String>,
    show_line: bool,
    color_left: Option<String>,
    color_right: Option<String>,
    color_background: Option<String>,
    variants: Vec<VariantPlan>,
}

struct VariantPlan {
    strength: String,
    strength_unit: String,
    /// Selected variants get a dose configuration row.
    selected: bool,
}

impl SavePlan {
    fn from_form(form: &MedicationFormData) -> Result<Self, DatabaseError> {
        let kept = form.valid_strengths();

        // A group always carries at least one variant; with no strengths
        // entered the first entry becomes a blank-strength variant.
        let entries: Vec<_> = if kept.is_empty() {
            form.strengths.iter().take(1).collect()
        } else {
            kept
        };

        let selected_ids: Vec<Uuid> = {
            let chosen: Vec<Uuid> = entries
                .iter()
                .filter(|e| form.selected_strengths.contains(&e.id))
                .map(|e| e.id)
                .collect();
            let fallback = || entries.first().map(|e| e.id).into_iter().collect();
            match form.dosing_type {
                // fixed dosing takes exactly one variant
                DosingType::Fixed => chosen.first().map_or_else(fallback, |id| vec![*id]),
                DosingType::Flexible => {
                    if chosen.is_empty() {
                        fallback()
                    } else {
                        chosen
                    }
                }
            }
        };

        let variants = entries
            .iter()
            .map(|e| VariantPlan {
                strength: e.value.trim().to_string(),
                strength_unit: e.unit.clone(),
                selected: selected_ids.contains(&e.id),
            })
            .collect();

        let (selection_rule, quantity, is_flexible) = match form.dosing_type {
            DosingType::Fixed => (SelectionRule::ExactlyOne, form.fixed_quantity, false),
            DosingType::Flexible => (SelectionRule::Any, 1, true),
        };

        let custom_form_name = if form.form == "Other" && !form.custom_form.trim().is_empty() {
            Some(form.custom_form.trim().to_string())
        } else {
            None
        };

        Ok(Self {
            name: form.name.trim().to_string(),
            selection_rule,
            schedule: build_schedule(&form.schedule)?,
            quantity,
            is_flexible,
            start_date: form.schedule.start_date,
            end_date: form.schedule.end_date,
            form: form.form.clone(),
            custom_form_name,
            shape: form.shape.clone(),
            show_line: form.show_line,
            color_left: form.color_left.clone(),
            color_right: form.color_right.clone(),
            color_background: form.color_background.clone(),
            variants,
        })
    }

    /// Write the group, its variants, and one configuration per selected
    /// variant in a single transaction. Stock starts at zero.
    fn persist(&self, conn: &mut Connection) -> Result<Uuid, DatabaseError> {
        let tx = conn.transaction()?;
        let group_id = Uuid::new_v4();

        tx.execute(
            "INSERT INTO medication_groups (id, name, selection_rule)
             VALUES (?1, ?2, ?3)",
            params![
                group_id.to_string(),
                self.name,
                self.selection_rule.as_str()
            ],
        )?;

        let schedule_type = self.schedule.schedule_type();
        let schedule_data = self.schedule.to_data_json();

        for variant in &self.variants {
            let medication_id = Uuid::new_v4();
            tx.execute(
                "INSERT INTO medications
                    (id, name, form, custom_form_name, strength, strength_unit,
                     shape, shape_line, color_left, color_right, color_background)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)",
                params![
                    medication_id.to_string(),
                    self.name,
                    self.form,
                    self.custom_form_name,
                    variant.strength,
                    variant.strength_unit,
                    self.shape,
                    self.show_line as i64,
                    self.color_left,
                    self.color_right,
                    self.color_background,
                ],
            )?;

            if variant.selected {
                tx.execute(
                    "INSERT INTO dose_configurations
                        (id, group_id, medication_id, schedule_type, schedule_data,
                         quantity, is_flexible, start_date, end_date)
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
                    params![
                        Uuid::new_v4().to_string(),
                        group_id.to_string(),
                        medication_id.to_string(),
                        schedule_type.as_str(),
                        schedule_data,
                        self.quantity as i64,
                        self.is_flexible as i64,
                        self.start_date.format("%Y-%m-%d").to_string(),
                        self.end_date.map(|d| d.format("%Y-%m-%d").to_string()),
                    ],
                )?;
            }
        }

        tx.commit()?;
        Ok(group_id)
    }
}

/// Resolve the draft into a typed schedule. The result is round-tripped
/// through the row codec so save can only ever write decodable rows.
fn build_schedule(draft: &ScheduleDraft) -> Result<Schedule, DatabaseError> {
    use crate::models::enums::ScheduleType;

    let times = || match draft.time_mode {
        TimeMode::Specific => DoseTimes::Specific(draft.specific_times.clone()),
        TimeMode::Timeframe => DoseTimes::Frames(
            draft
                .time_frames
                .iter()
                .map(|entry| match entry.kind {
                    TimeFrameKind::Named(frame) => frame,
                    TimeFrameKind::Custom { start_time, .. } => bucket_for_time(start_time),
                })
                .collect(),
        ),
    };

    let schedule = match draft.schedule_type {
        ScheduleType::Everyday => Schedule::Everyday { times: times() },
        ScheduleType::SpecificDays => Schedule::SpecificDays {
            days: draft.specific_days.clone(),
            times: times(),
        },
        ScheduleType::Cyclical => Schedule::Cyclical {
            days_on: draft.cycle_on_days,
            days_off: draft.cycle_off_days,
            times: times(),
        },
        ScheduleType::AsNeeded => Schedule::AsNeeded,
    };

    Schedule::from_row(
        schedule.schedule_type().as_str(),
        schedule.to_data_json().as_deref(),
    )
}
