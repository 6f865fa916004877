use std::time::Duration;

use chrono::{DateTime, Utc};

/// `Day, DD Mon YYYY HH:MM:SS GMT` with English three-letter abbreviations.
pub fn http_date(when: DateTime<Utc>) -> String {
    when.format("%a, %d %b %Y %H:%M:%S GMT").to_string()
}

/// Absolute HTTP-date `delta` from now.
pub fn http_date_in(delta: Duration) -> String {
    let delta = chrono::Duration::from_std(delta).unwrap_or_else(|_| chrono::Duration::zero());
    http_date(Utc::now() + delta)
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;
    use chrono::Utc;

    use super::http_date;

    #[test]
    fn formats_rfc_style_dates() {
        let when = Utc.with_ymd_and_hms(2015, 10, 21, 7, 28, 0).unwrap();
        assert_eq!(http_date(when), "Wed, 21 Oct 2015 07:28:00 GMT");
    }

    #[test]
    fn pads_single_digit_days() {
        let when = Utc.with_ymd_and_hms(2024, 3, 5, 23, 59, 59).unwrap();
        assert_eq!(http_date(when), "Tue, 05 Mar 2024 23:59:59 GMT");
    }
}
