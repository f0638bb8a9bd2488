use chrono::{Datelike, NaiveDate, Weekday};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use super::domain::TimeSlot;

/// What a cleaner offers on a single weekday
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DayAvailability {
    /// A two-endpoint working window was given for the day
    AllDay,
    Slots {
        morning: bool,
        afternoon: bool,
        evening: bool,
    },
}

impl Default for DayAvailability {
    fn default() -> Self {
        DayAvailability::Slots {
            morning: false,
            afternoon: false,
            evening: false,
        }
    }
}

impl DayAvailability {
    /// Whether the day covers the requested slot.
    ///
    /// `None` means the booking did not pin a slot, so any open slot will do.
    pub fn covers(&self, slot: Option<TimeSlot>) -> bool {
        match (self, slot) {
            (DayAvailability::AllDay, _) => true,
            (DayAvailability::Slots { morning, afternoon, evening }, None) => {
                *morning || *afternoon || *evening
            }
            (DayAvailability::Slots { morning, .. }, Some(TimeSlot::Morning)) => *morning,
            (DayAvailability::Slots { afternoon, .. }, Some(TimeSlot::Afternoon)) => *afternoon,
            (DayAvailability::Slots { evening, .. }, Some(TimeSlot::Evening)) => *evening,
        }
    }
}

/// Weekly availability of a cleaner.
///
/// The upstream store has two shapes for this (a per-day slot map, or a
/// `[start, end]` window meaning "all day"). Both are normalised here once,
/// at deserialization, so the filters never look at the raw shape.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(try_from = "RawAvailability", into = "RawAvailability")]
pub struct Availability {
    days: [DayAvailability; 7],
}

impl Availability {
    /// Available every slot of every day
    pub fn all_day() -> Self {
        Self {
            days: [DayAvailability::AllDay; 7],
        }
    }

    pub fn with_day(mut self, weekday: Weekday, day: DayAvailability) -> Self {
        self.days[weekday.num_days_from_monday() as usize] = day;
        self
    }

    pub fn day(&self, weekday: Weekday) -> DayAvailability {
        self.days[weekday.num_days_from_monday() as usize]
    }

    #[inline]
    pub fn is_available(&self, date: NaiveDate, slot: Option<TimeSlot>) -> bool {
        self.day(date.weekday()).covers(slot)
    }
}

/// Wire shapes accepted for availability
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
enum RawAvailability {
    Marker(String),
    Window(Vec<String>),
    Days(BTreeMap<String, RawDay>),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
enum RawDay {
    Window(Vec<String>),
    Slots(RawSlots),
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct RawSlots {
    #[serde(default)]
    morning: bool,
    #[serde(default)]
    afternoon: bool,
    #[serde(default)]
    evening: bool,
}

const ALL_DAY_MARKER: &str = "all_day";

const WEEK: [Weekday; 7] = [
    Weekday::Mon,
    Weekday::Tue,
    Weekday::Wed,
    Weekday::Thu,
    Weekday::Fri,
    Weekday::Sat,
    Weekday::Sun,
];

fn check_window(window: &[String]) -> Result<(), String> {
    if window.len() == 2 {
        Ok(())
    } else {
        Err(format!(
            "availability window must have exactly two endpoints, got {}",
            window.len()
        ))
    }
}

impl TryFrom<RawAvailability> for Availability {
    type Error = String;

    fn try_from(raw: RawAvailability) -> Result<Self, Self::Error> {
        match raw {
            RawAvailability::Marker(marker) if marker.eq_ignore_ascii_case(ALL_DAY_MARKER) => {
                Ok(Availability::all_day())
            }
            RawAvailability::Marker(marker) => {
                Err(format!("unknown availability marker: {}", marker))
            }
            RawAvailability::Window(window) => {
                check_window(&window)?;
                Ok(Availability::all_day())
            }
            RawAvailability::Days(days) => {
                let mut availability = Availability::default();
                for (name, raw_day) in days {
                    let weekday: Weekday = name
                        .parse()
                        .map_err(|_| format!("unknown weekday in availability: {}", name))?;
                    let day = match raw_day {
                        RawDay::Window(window) => {
                            check_window(&window)?;
                            DayAvailability::AllDay
                        }
                        RawDay::Slots(slots) => DayAvailability::Slots {
                            morning: slots.morning,
                            afternoon: slots.afternoon,
                            evening: slots.evening,
                        },
                    };
                    availability = availability.with_day(weekday, day);
                }
                Ok(availability)
            }
        }
    }
}

fn weekday_name(weekday: Weekday) -> &'static str {
    match weekday {
        Weekday::Mon => "monday",
        Weekday::Tue => "tuesday",
        Weekday::Wed => "wednesday",
        Weekday::Thu => "thursday",
        Weekday::Fri => "friday",
        Weekday::Sat => "saturday",
        Weekday::Sun => "sunday",
    }
}

impl From<Availability> for RawAvailability {
    fn from(availability: Availability) -> Self {
        if availability.days.iter().all(|d| *d == DayAvailability::AllDay) {
            return RawAvailability::Marker(ALL_DAY_MARKER.to_string());
        }

        let mut days = BTreeMap::new();
        for weekday in WEEK {
            let raw_day = match availability.day(weekday) {
                DayAvailability::AllDay => {
                    RawDay::Window(vec!["00:00".to_string(), "23:59".to_string()])
                }
                DayAvailability::Slots { morning, afternoon, evening } => RawDay::Slots(RawSlots {
                    morning,
                    afternoon,
                    evening,
                }),
            };
            days.insert(weekday_name(weekday).to_string(), raw_day);
        }
        RawAvailability::Days(days)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sunday() -> NaiveDate {
        // 2025-06-01 is a Sunday
        NaiveDate::from_ymd_opt(2025, 6, 1).unwrap()
    }

    #[test]
    fn test_slot_map_shape() {
        let availability: Availability = serde_json::from_value(serde_json::json!({
            "sunday": { "morning": true, "afternoon": false }
        }))
        .unwrap();

        assert!(availability.is_available(sunday(), Some(TimeSlot::Morning)));
        assert!(!availability.is_available(sunday(), Some(TimeSlot::Afternoon)));
        assert!(!availability.is_available(sunday(), Some(TimeSlot::Evening)));
        // Days not mentioned are closed
        assert!(!availability.day(Weekday::Mon).covers(None));
    }

    #[test]
    fn test_two_endpoint_day_means_all_day() {
        let availability: Availability = serde_json::from_value(serde_json::json!({
            "Sunday": ["08:00", "18:00"]
        }))
        .unwrap();

        assert_eq!(availability.day(Weekday::Sun), DayAvailability::AllDay);
        assert!(availability.is_available(sunday(), Some(TimeSlot::Evening)));
    }

    #[test]
    fn test_top_level_window_and_marker() {
        let window: Availability = serde_json::from_value(serde_json::json!(["06:00", "22:00"])).unwrap();
        let marker: Availability = serde_json::from_value(serde_json::json!("all_day")).unwrap();

        assert_eq!(window, Availability::all_day());
        assert_eq!(marker, Availability::all_day());
    }

    #[test]
    fn test_malformed_shapes_rejected() {
        assert!(serde_json::from_value::<Availability>(serde_json::json!(["06:00"])).is_err());
        assert!(serde_json::from_value::<Availability>(serde_json::json!({ "funday": {} })).is_err());
        assert!(serde_json::from_value::<Availability>(serde_json::json!("sometimes")).is_err());
    }

    #[test]
    fn test_unpinned_slot_needs_any_open_slot() {
        let closed = DayAvailability::default();
        let evenings = DayAvailability::Slots {
            morning: false,
            afternoon: false,
            evening: true,
        };

        assert!(!closed.covers(None));
        assert!(evenings.covers(None));
    }
}
