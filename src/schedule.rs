//! Pure schedule evaluation.
//!
//! Answers "does this configuration occur on this date" and "at which slots"
//! without touching the database. The Today screen, history aggregates, and
//! adherence math all lean on these functions.

use chrono::{Datelike, NaiveDate, NaiveTime, Timelike};

use crate::models::enums::TimeFrame;
use crate::models::schedule::{DoseTimes, Schedule};

/// One expected dose on an occurrence day. `time` is set only for schedules
/// with literal clock times; frame-based schedules carry the frame alone.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DoseSlot {
    pub frame: TimeFrame,
    pub time: Option<NaiveTime>,
}

/// Whether the schedule produces doses on `date`, given the configuration's
/// active range. As-needed schedules never occur; they are logged on demand.
pub fn occurs_on(
    schedule: &Schedule,
    start_date: NaiveDate,
    end_date: Option<NaiveDate>,
    date: NaiveDate,
) -> bool {
    if date < start_date || end_date.is_some_and(|end| date > end) {
        return false;
    }

    match schedule {
        Schedule::Everyday { .. } => true,
        Schedule::SpecificDays { days, .. } => days.contains(&weekday_index(date)),
        Schedule::Cyclical {
            days_on, days_off, ..
        } => {
            let elapsed = (date - start_date).num_days();
            let cycle = i64::from(days_on + days_off);
            elapsed >= 0 && elapsed % cycle < i64::from(*days_on)
        }
        Schedule::AsNeeded => false,
    }
}

/// Weekday as the frontend counts them: 0 = Sunday .. 6 = Saturday.
pub fn weekday_index(date: NaiveDate) -> u8 {
    date.weekday().num_days_from_sunday() as u8
}

/// Map a clock time to its time-of-day frame.
///
/// Morning [05:00, 12:00), Afternoon [12:00, 17:00), Evening [17:00, 21:00),
/// Night covers the rest and wraps midnight.
pub fn bucket_for_time(time: NaiveTime) -> TimeFrame {
    let hour = time.hour();
    match hour {
        5..=11 => TimeFrame::Morning,
        12..=16 => TimeFrame::Afternoon,
        17..=20 => TimeFrame::Evening,
        _ => TimeFrame::Night,
    }
}

/// The dose slots of one occurrence day, each tagged with its frame.
pub fn dose_slots(schedule: &Schedule) -> Vec<DoseSlot> {
    match schedule.times() {
        Some(DoseTimes::Specific(times)) => times
            .iter()
            .map(|t| DoseSlot {
                frame: bucket_for_time(*t),
                time: Some(*t),
            })
            .collect(),
        Some(DoseTimes::Frames(frames)) => frames
            .iter()
            .map(|f| DoseSlot {
                frame: *f,
                time: None,
            })
            .collect(),
        None => Vec::new(),
    }
}

/// Distinct frames touched by the schedule, in display order.
pub fn frames_for(schedule: &Schedule) -> Vec<TimeFrame> {
    let slots = dose_slots(schedule);
    TimeFrame::ORDERED
        .into_iter()
        .filter(|frame| slots.iter().any(|slot| slot.frame == *frame))
        .collect()
}

const DAY_ABBREVIATIONS: [&str; 7] = ["Sun", "Mon", "Tue", "Wed", "Thu", "Fri", "Sat"];

/// Human-readable summary of the pattern, shown on detail and pill box cards.
pub fn describe(schedule: &Schedule) -> String {
    match schedule {
        Schedule::Everyday { .. } => "Every day".to_string(),
        Schedule::SpecificDays { days, .. } => days
            .iter()
            .filter_map(|d| DAY_ABBREVIATIONS.get(*d as usize))
            .copied()
            .collect::<Vec<_>>()
            .join(", "),
        Schedule::Cyclical {
            days_on, days_off, ..
        } => format!(
            "{} {} on, {} {} off",
            days_on,
            plural_days(*days_on),
            days_off,
            plural_days(*days_off)
        ),
        Schedule::AsNeeded => "As needed".to_string(),
    }
}

fn plural_days(n: u32) -> &'static str {
    if n == 1 {
        "day"
    } else {
        "days"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn time(h: u32, m: u32) -> NaiveTime {
        NaiveTime::from_hms_opt(h, m, 0).unwrap()
    }

    fn frames(list: &[TimeFrame]) -> DoseTimes {
        DoseTimes::Frames(list.to_vec())
    }

    #[test]
    fn everyday_occurs_inside_range_only() {
        let schedule = Schedule::Everyday {
            times: frames(&[TimeFrame::Morning]),
        };
        let start = date(2025, 3, 1);
        let end = Some(date(2025, 3, 10));

        assert!(!occurs_on(&schedule, start, end, date(2025, 2, 28)));
        assert!(occurs_on(&schedule, start, end, date(2025, 3, 1)));
        assert!(occurs_on(&schedule, start, end, date(2025, 3, 10)));
        assert!(!occurs_on(&schedule, start, end, date(2025, 3, 11)));

        // open-ended ranges run indefinitely
        assert!(occurs_on(&schedule, start, None, date(2099, 12, 31)));
    }

    #[test]
    fn specific_days_match_sunday_zero_convention() {
        let schedule = Schedule::SpecificDays {
            days: vec![0, 3], // Sunday and Wednesday
            times: frames(&[TimeFrame::Evening]),
        };
        let start = date(2025, 1, 1);

        // 2025-01-05 is a Sunday, 2025-01-08 a Wednesday
        assert!(occurs_on(&schedule, start, None, date(2025, 1, 5)));
        assert!(occurs_on(&schedule, start, None, date(2025, 1, 8)));
        // 2025-01-06 is a Monday
        assert!(!occurs_on(&schedule, start, None, date(2025, 1, 6)));
    }

    #[test]
    fn cyclical_five_on_two_off() {
        let schedule = Schedule::Cyclical {
            days_on: 5,
            days_off: 2,
            times: frames(&[TimeFrame::Morning]),
        };
        let start = date(2025, 6, 2);

        // days 0..=4 on, 5..=6 off, then the cycle repeats
        for offset in 0..5 {
            assert!(
                occurs_on(&schedule, start, None, start + chrono::Days::new(offset)),
                "day {offset} should be on"
            );
        }
        assert!(!occurs_on(&schedule, start, None, start + chrono::Days::new(5)));
        assert!(!occurs_on(&schedule, start, None, start + chrono::Days::new(6)));
        assert!(occurs_on(&schedule, start, None, start + chrono::Days::new(7)));
        assert!(occurs_on(&schedule, start, None, start + chrono::Days::new(11)));
        assert!(!occurs_on(&schedule, start, None, start + chrono::Days::new(12)));
    }

    #[test]
    fn as_needed_never_occurs() {
        let start = date(2025, 1, 1);
        assert!(!occurs_on(&Schedule::AsNeeded, start, None, start));
        assert!(!occurs_on(&Schedule::AsNeeded, start, None, date(2025, 7, 4)));
    }

    #[test]
    fn bucket_boundaries() {
        assert_eq!(bucket_for_time(time(5, 0)), TimeFrame::Morning);
        assert_eq!(bucket_for_time(time(11, 59)), TimeFrame::Morning);
        assert_eq!(bucket_for_time(time(12, 0)), TimeFrame::Afternoon);
        assert_eq!(bucket_for_time(time(16, 59)), TimeFrame::Afternoon);
        assert_eq!(bucket_for_time(time(17, 0)), TimeFrame::Evening);
        assert_eq!(bucket_for_time(time(20, 59)), TimeFrame::Evening);
        assert_eq!(bucket_for_time(time(21, 0)), TimeFrame::Night);
        assert_eq!(bucket_for_time(time(23, 30)), TimeFrame::Night);
        // night wraps past midnight
        assert_eq!(bucket_for_time(time(0, 0)), TimeFrame::Night);
        assert_eq!(bucket_for_time(time(4, 59)), TimeFrame::Night);
    }

    #[test]
    fn slots_from_specific_times_carry_clock_times() {
        let schedule = Schedule::Everyday {
            times: DoseTimes::Specific(vec![time(8, 0), time(21, 30)]),
        };
        let slots = dose_slots(&schedule);
        assert_eq!(slots.len(), 2);
        assert_eq!(slots[0].frame, TimeFrame::Morning);
        assert_eq!(slots[0].time, Some(time(8, 0)));
        assert_eq!(slots[1].frame, TimeFrame::Night);
        assert_eq!(slots[1].time, Some(time(21, 30)));
    }

    #[test]
    fn slots_from_frames_have_no_clock_times() {
        let schedule = Schedule::Everyday {
            times: frames(&[TimeFrame::Morning, TimeFrame::Evening]),
        };
        let slots = dose_slots(&schedule);
        assert_eq!(slots.len(), 2);
        assert!(slots.iter().all(|s| s.time.is_none()));
    }

    #[test]
    fn frames_for_deduplicates_in_display_order() {
        let schedule = Schedule::Everyday {
            times: DoseTimes::Specific(vec![time(22, 0), time(8, 0), time(9, 0)]),
        };
        assert_eq!(
            frames_for(&schedule),
            vec![TimeFrame::Morning, TimeFrame::Night]
        );
    }

    #[test]
    fn as_needed_has_no_slots() {
        assert!(dose_slots(&Schedule::AsNeeded).is_empty());
        assert!(frames_for(&Schedule::AsNeeded).is_empty());
    }

    #[test]
    fn describe_patterns() {
        assert_eq!(
            describe(&Schedule::Everyday {
                times: frames(&[TimeFrame::Morning])
            }),
            "Every day"
        );
        assert_eq!(
            describe(&Schedule::SpecificDays {
                days: vec![1, 3, 5],
                times: frames(&[TimeFrame::Morning])
            }),
            "Mon, Wed, Fri"
        );
        assert_eq!(
            describe(&Schedule::Cyclical {
                days_on: 5,
                days_off: 2,
                times: frames(&[TimeFrame::Morning])
            }),
            "5 days on, 2 days off"
        );
        assert_eq!(
            describe(&Schedule::Cyclical {
                days_on: 1,
                days_off: 1,
                times: frames(&[TimeFrame::Morning])
            }),
            "1 day on, 1 day off"
        );
        assert_eq!(describe(&Schedule::AsNeeded), "As needed");
    }
}
