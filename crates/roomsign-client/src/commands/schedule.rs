//! Weekly open hours.

use chrono::Utc;
use roomsign_core::ScheduleRanges;
use roomsign_server::RoomSignService;

use super::print_json;
use crate::error::ClientResult;

/// Print the open hours of the next seven days.
pub async fn run(service: &RoomSignService, json: bool) -> ClientResult<()> {
    let days = service.schedule_ranges_at(Utc::now()).await?;
    if json {
        print_json(&days)
    } else {
        println!("{}", render(&days));
        Ok(())
    }
}

/// One line per day: short date, then its ranges.
pub fn render(days: &[ScheduleRanges]) -> String {
    days.iter()
        .map(|day| {
            format!(
                "{:<12}{}",
                day.day.format("%a %b %-d").to_string(),
                day.ranges.join(", ")
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn day(d: u32, ranges: &[&str]) -> ScheduleRanges {
        ScheduleRanges {
            day: NaiveDate::from_ymd_opt(2025, 2, d).unwrap(),
            ranges: ranges.iter().map(|r| r.to_string()).collect(),
        }
    }

    #[test]
    fn render_days() {
        let days = vec![
            day(5, &["2:00 PM - 5:00 PM"]),
            day(6, &["Closed"]),
            day(7, &["9:00 AM - 12:00 PM", "1:00 PM - 5:00 PM"]),
        ];
        insta::assert_snapshot!(render(&days), @r"
        Wed Feb 5   2:00 PM - 5:00 PM
        Thu Feb 6   Closed
        Fri Feb 7   9:00 AM - 12:00 PM, 1:00 PM - 5:00 PM
        ");
    }
}
