//! Current open/closed status.

use chrono::Utc;
use roomsign_core::RoomStatus;
use roomsign_server::RoomSignService;

use super::print_json;
use crate::error::ClientResult;

/// Print whether the room is open right now.
pub async fn run(service: &RoomSignService, json: bool) -> ClientResult<()> {
    let status = service.status_at(Utc::now()).await?;
    if json {
        print_json(&status)
    } else {
        println!("{}", render(&status));
        Ok(())
    }
}

/// One-line rendering, e.g. `Open until 5:00 PM`.
pub fn render(status: &RoomStatus) -> String {
    let state = if status.open { "Open" } else { "Closed" };
    if status.until.is_empty() {
        state.to_string()
    } else {
        format!("{} {}", state, status.until)
    }
}
