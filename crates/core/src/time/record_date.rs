use anyhow::Context;
use chrono::{DateTime, Datelike, FixedOffset, NaiveDate, Utc};

/// Calendar date a scan is filed under: the explicit `YYYY-MM-DD` argument if
/// given, otherwise today's date in the deployment's UTC offset.
pub fn resolve_record_date(
    date_arg: Option<&str>,
    now_utc: DateTime<Utc>,
    offset: FixedOffset,
) -> anyhow::Result<NaiveDate> {
    if let Some(s) = date_arg {
        return NaiveDate::parse_from_str(s.trim(), "%Y-%m-%d")
            .with_context(|| format!("invalid date {s:?}, expected YYYY-MM-DD"));
    }
    Ok(now_utc.with_timezone(&offset).date_naive())
}

/// (year, month) of `now_utc` in the deployment's UTC offset.
pub fn current_month(now_utc: DateTime<Utc>, offset: FixedOffset) -> (i32, u32) {
    let local = now_utc.with_timezone(&offset);
    (local.year(), local.month())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn manila() -> FixedOffset {
        FixedOffset::east_opt(8 * 3600).unwrap()
    }

    #[test]
    fn late_utc_evening_is_next_day_locally() {
        // 2026-01-31 17:30 UTC = 2026-02-01 01:30 +08:00
        let now = Utc.with_ymd_and_hms(2026, 1, 31, 17, 30, 0).unwrap();
        let d = resolve_record_date(None, now, manila()).unwrap();
        assert_eq!(d, NaiveDate::from_ymd_opt(2026, 2, 1).unwrap());
        assert_eq!(current_month(now, manila()), (2026, 2));
    }

    #[test]
    fn same_day_before_local_midnight() {
        // 2026-01-31 15:59 UTC = 23:59 +08:00
        let now = Utc.with_ymd_and_hms(2026, 1, 31, 15, 59, 0).unwrap();
        let d = resolve_record_date(None, now, manila()).unwrap();
        assert_eq!(d, NaiveDate::from_ymd_opt(2026, 1, 31).unwrap());
    }

    #[test]
    fn explicit_date_wins_and_is_validated() {
        let now = Utc.with_ymd_and_hms(2026, 1, 31, 15, 59, 0).unwrap();
        let d = resolve_record_date(Some("2025-12-24"), now, manila()).unwrap();
        assert_eq!(d, NaiveDate::from_ymd_opt(2025, 12, 24).unwrap());
        assert!(resolve_record_date(Some("24/12/2025"), now, manila()).is_err());
    }
}
