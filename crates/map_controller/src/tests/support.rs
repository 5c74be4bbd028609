use chrono::{TimeZone, Utc};
use shared::domain::{Coordinates, Location, Memo, MemoId, UserId};

pub fn memo(id: &str, owner: &str, position: Option<(f64, f64)>) -> Memo {
    let at = Utc.with_ymd_and_hms(2024, 5, 1, 10, 0, 0).unwrap();
    Memo {
        memo_id: MemoId::from(id),
        user_id: UserId::from(owner),
        user_name: format!("Ranger {owner}"),
        user_color: None,
        title: None,
        audio_url: None,
        text: format!("memo {id}"),
        duration_seconds: 1.0,
        location: position.map(|(lat, lng)| Location::from(Coordinates::new(lat, lng))),
        park_name: None,
        created_at: at,
        updated_at: at,
    }
}
