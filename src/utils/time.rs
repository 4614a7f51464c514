use chrono::{DateTime, Utc};

pub fn now() -> DateTime<Utc> {
    Utc::now()
}

pub fn to_rfc3339(dt: DateTime<Utc>) -> String {
    dt.to_rfc3339()
}

pub fn days_until(deadline: DateTime<Utc>, from: DateTime<Utc>) -> i64 {
    (deadline - from).num_days()
}
