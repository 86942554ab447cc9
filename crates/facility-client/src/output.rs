//! Terminal rendering of replies and pushed updates.

use std::fmt::Write;

use chrono::Weekday;

use facility_core::{CATALOGUE, weekday};
use facility_protocol::{DayAvailability, FacilityUpdate, Response};

/// Full English name for a schedule day, or `day N` when out of range.
pub fn day_name(day: i32) -> String {
    let Ok(day) = u8::try_from(day) else {
        return format!("day {}", day);
    };
    match weekday(day) {
        Ok(weekday) => weekday_name(weekday).to_string(),
        Err(_) => format!("day {}", day),
    }
}

fn weekday_name(weekday: Weekday) -> &'static str {
    match weekday {
        Weekday::Sun => "Sunday",
        Weekday::Mon => "Monday",
        Weekday::Tue => "Tuesday",
        Weekday::Wed => "Wednesday",
        Weekday::Thu => "Thursday",
        Weekday::Fri => "Friday",
        Weekday::Sat => "Saturday",
    }
}

fn write_availability(out: &mut String, days: &[DayAvailability]) {
    for day in days {
        let _ = writeln!(out, "{} ({}):", day_name(day.day), day.day);
        if day.slots.is_empty() {
            let _ = writeln!(out, "  fully booked");
        }
        for slot in &day.slots {
            let _ = writeln!(out, "  {}", slot);
        }
    }
}

/// Renders a successful reply.
pub fn render_response(response: &Response) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "{}", response.message);
    if let Some(ref id) = response.confirmation_id {
        let _ = writeln!(out, "Confirmation ID: {}", id);
    }
    if let Some(ref availability) = response.availability {
        write_availability(&mut out, availability);
    }
    out
}

/// Renders an update pushed to an observer.
pub fn render_update(update: &FacilityUpdate) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "{}", update.message);
    write_availability(&mut out, &update.availability);
    out
}

/// Lists the bookable facilities.
pub fn render_facilities() -> String {
    let mut out = String::new();
    for entry in CATALOGUE {
        let _ = writeln!(out, "{:<8} {}", entry.name, entry.kind.label());
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use facility_core::TimeSpan;

    #[test]
    fn day_names() {
        assert_eq!(day_name(0), "Sunday");
        assert_eq!(day_name(6), "Saturday");
        assert_eq!(day_name(7), "day 7");
        assert_eq!(day_name(-1), "day -1");
    }

    #[test]
    fn booking_reply() {
        let response = Response::ok(3, "Booking confirmed").with_confirmation("abc-123");
        insta::assert_snapshot!(render_response(&response), @r"
        Booking confirmed
        Confirmation ID: abc-123
        ");
    }

    #[test]
    fn availability_reply() {
        let monday = DayAvailability::from_spans(
            1,
            &[
                TimeSpan::new(0, 9 * 60).unwrap(),
                TimeSpan::new(10 * 60, 24 * 60).unwrap(),
            ],
        );
        let saturday = DayAvailability::from_spans(6, &[]);
        let response =
            Response::ok(1, "Facility availability").with_availability(vec![monday, saturday]);
        insta::assert_snapshot!(render_response(&response), @r"
        Facility availability
        Monday (1):
          1/00/00 - 1/09/00
          1/10/00 - 1/24/00
        Saturday (6):
          fully booked
        ");
    }

    #[test]
    fn update_header() {
        let update = FacilityUpdate::new("LT1", Vec::new());
        assert_eq!(render_update(&update), "Update from: LT1\n");
    }

    #[test]
    fn facility_list() {
        let listing = render_facilities();
        assert!(listing.lines().any(|line| line.starts_with("LT1")));
        assert_eq!(listing.lines().count(), CATALOGUE.len());
    }
}
