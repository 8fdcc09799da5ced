//! Event instances of the coming days.

use chrono::Utc;
use roomsign_feeds::InstanceRecord;
use roomsign_server::RoomSignService;

use super::print_json;
use crate::error::ClientResult;

/// Print every event instance of the `days` days starting today.
pub async fn run(service: &RoomSignService, days: u32, json: bool) -> ClientResult<()> {
    let records = service.events_at(Utc::now(), days).await?;
    if json {
        print_json(&records)
    } else {
        println!("{}", render(&records));
        Ok(())
    }
}

pub fn render(records: &[InstanceRecord]) -> String {
    if records.is_empty() {
        return "No events".to_string();
    }
    records
        .iter()
        .map(|r| {
            let all_day = if r.all_day { " (all day)" } else { "" };
            format!("{} - {}  {}{}", r.start, r.end, r.title, all_day)
        })
        .collect::<Vec<_>>()
        .join("\n")
}
