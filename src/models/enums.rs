use crate::db::DatabaseError;
use serde::{Deserialize, Serialize};

/// Macro to generate enum with as_str + std::str::FromStr pattern
macro_rules! str_enum {
    ($name:ident { $($variant:ident => $s:literal),+ $(,)? }) => {
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        #[serde(rename_all = "snake_case")]
        pub enum $name {
            $($variant),+
        }

        impl $name {
            pub fn as_str(&self) -> &'static str {
                match self {
                    $(Self::$variant => $s),+
                }
            }
        }

        impl std::str::FromStr for $name {
            type Err = DatabaseError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $($s => Ok(Self::$variant)),+,
                    _ => Err(DatabaseError::InvalidEnum {
                        field: stringify!($name).into(),
                        value: s.into(),
                    }),
                }
            }
        }
    };
}

str_enum!(IntakeStatus {
    Taken => "taken",
    Skipped => "skipped",
    Missed => "missed",
});

str_enum!(ScheduleType {
    Everyday => "everyday",
    SpecificDays => "specific_days",
    Cyclical => "cyclical",
    AsNeeded => "as_needed",
});

str_enum!(SelectionRule {
    ExactlyOne => "exactly_one",
    Any => "any",
});

str_enum!(TimeFrame {
    Morning => "morning",
    Afternoon => "afternoon",
    Evening => "evening",
    Night => "night",
});

str_enum!(DosingType {
    Fixed => "fixed",
    Flexible => "flexible",
});

str_enum!(TimeMode {
    Specific => "specific",
    Timeframe => "timeframe",
});

impl TimeFrame {
    /// Display order on the Today and History screens.
    pub const ORDERED: [TimeFrame; 4] = [
        TimeFrame::Morning,
        TimeFrame::Afternoon,
        TimeFrame::Evening,
        TimeFrame::Night,
    ];

    /// Section heading label.
    pub fn label(&self) -> &'static str {
        match self {
            TimeFrame::Morning => "Morning",
            TimeFrame::Afternoon => "Afternoon",
            TimeFrame::Evening => "Evening",
            TimeFrame::Night => "Night",
        }
    }
}
