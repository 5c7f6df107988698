//! Exchange session clock.
//!
//! Regular cash sessions only, weekdays, bounds inclusive at minute
//! granularity: US 09:30-16:00 America/New_York, IN 09:15-15:30
//! Asia/Kolkata.

use chrono::{DateTime, Datelike, Timelike, Utc};
use chrono_tz::Tz;
use paperdesk_core::Market;
use serde::Serialize;

struct ExchangeHours {
    tz: Tz,
    open: (u32, u32),
    close: (u32, u32),
    open_label: &'static str,
    close_label: &'static str,
}

fn hours(market: Market) -> ExchangeHours {
    match market {
        Market::Us => ExchangeHours {
            tz: chrono_tz::America::New_York,
            open: (9, 30),
            close: (16, 0),
            open_label: "9:30 AM EST",
            close_label: "4:00 PM EST",
        },
        Market::In => ExchangeHours {
            tz: chrono_tz::Asia::Kolkata,
            open: (9, 15),
            close: (15, 30),
            open_label: "9:15 AM IST",
            close_label: "3:30 PM IST",
        },
    }
}

/// Session state for one exchange.
#[derive(Debug, Clone, Serialize)]
pub struct SessionStatus {
    pub is_open: bool,
    pub local_time: String,
    pub next_open: Option<String>,
    pub next_close: Option<String>,
}

/// Session state for a market right now.
pub fn session_status(market: Market) -> SessionStatus {
    session_status_at(market, Utc::now())
}

/// Session state for a market at an arbitrary instant.
pub fn session_status_at(market: Market, now: DateTime<Utc>) -> SessionStatus {
    let exchange = hours(market);
    let local = now.with_timezone(&exchange.tz);
    let is_weekday = local.weekday().num_days_from_monday() < 5;
    let hm = (local.hour(), local.minute());
    let is_open = is_weekday && exchange.open <= hm && hm <= exchange.close;

    SessionStatus {
        is_open,
        local_time: local.format("%I:%M %p %Z").to_string(),
        next_open: if is_open {
            None
        } else {
            Some(exchange.open_label.to_string())
        },
        next_close: if is_open {
            Some(exchange.close_label.to_string())
        } else {
            None
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    // 2024-08-20 is a Tuesday; New York is on EDT (UTC-4) that day.
    fn tuesday(hour: u32, minute: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 8, 20, hour, minute, 0).unwrap()
    }

    #[test]
    fn test_us_open_midday() {
        let status = session_status_at(Market::Us, tuesday(15, 0));
        assert!(status.is_open);
        assert!(status.next_close.is_some());
        assert!(status.next_open.is_none());
    }

    #[test]
    fn test_us_open_boundary_inclusive() {
        // 13:30 UTC = 09:30 EDT
        assert!(session_status_at(Market::Us, tuesday(13, 30)).is_open);
        assert!(!session_status_at(Market::Us, tuesday(13, 29)).is_open);
        // 20:00 UTC = 16:00 EDT
        assert!(session_status_at(Market::Us, tuesday(20, 0)).is_open);
        assert!(!session_status_at(Market::Us, tuesday(20, 1)).is_open);
    }

    #[test]
    fn test_us_closed_on_weekend() {
        let saturday = Utc.with_ymd_and_hms(2024, 8, 17, 15, 0, 0).unwrap();
        let status = session_status_at(Market::Us, saturday);
        assert!(!status.is_open);
        assert_eq!(status.next_open.as_deref(), Some("9:30 AM EST"));
    }

    #[test]
    fn test_india_session() {
        // 05:00 UTC = 10:30 IST
        assert!(session_status_at(Market::In, tuesday(5, 0)).is_open);
        // 10:00 UTC = 15:30 IST, inclusive close
        assert!(session_status_at(Market::In, tuesday(10, 0)).is_open);
        // 11:00 UTC = 16:30 IST
        assert!(!session_status_at(Market::In, tuesday(11, 0)).is_open);
    }

    #[test]
    fn test_local_time_formatting() {
        let status = session_status_at(Market::In, tuesday(5, 0));
        assert!(status.local_time.contains("10:30"));
        assert!(status.local_time.contains("IST"));
    }
}
