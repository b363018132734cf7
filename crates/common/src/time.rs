//! Expiry countdown formatting

use chrono::{DateTime, Utc};

/// Format the time remaining until `expires_at` as `"MMmSSs"`.
///
/// Returns `"Expired"` once the deadline has passed and the empty string
/// when no deadline is known. Minutes are not capped at two digits; a
/// token good for another 90 minutes renders as `"90m00s"`.
#[must_use]
pub fn format_countdown(expires_at: Option<DateTime<Utc>>, now: DateTime<Utc>) -> String {
    let Some(expires_at) = expires_at else {
        return String::new();
    };

    let remaining = (expires_at - now).num_seconds();
    if remaining <= 0 {
        return "Expired".to_string();
    }

    format!("{:02}m{:02}s", remaining / 60, remaining % 60)
}

#[cfg(test)]
mod tests {
    use chrono::Duration;

    use super::*;

    #[test]
    fn test_unknown_expiry_is_empty() {
        assert_eq!(format_countdown(None, Utc::now()), "");
    }

    #[test]
    fn test_past_expiry_reads_expired() {
        let now = Utc::now();
        assert_eq!(format_countdown(Some(now - Duration::seconds(1)), now), "Expired");
        assert_eq!(format_countdown(Some(now), now), "Expired");
    }

    #[test]
    fn test_minutes_and_seconds_zero_padded() {
        let now = Utc::now();
        assert_eq!(format_countdown(Some(now + Duration::seconds(65)), now), "01m05s");
        assert_eq!(format_countdown(Some(now + Duration::seconds(600)), now), "10m00s");
        assert_eq!(format_countdown(Some(now + Duration::seconds(9)), now), "00m09s");
    }

    #[test]
    fn test_minutes_not_capped() {
        let now = Utc::now();
        assert_eq!(format_countdown(Some(now + Duration::seconds(5400)), now), "90m00s");
    }
}
