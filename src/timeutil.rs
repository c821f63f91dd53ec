use chrono::{DateTime, Datelike, Duration, Local, NaiveDate};

pub fn day_key(date: NaiveDate) -> String {
    date.format("%Y-%m-%d").to_string()
}

pub fn parse_day_key(raw: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(raw, "%Y-%m-%d").ok()
}

pub fn date_key(instant: DateTime<Local>) -> String {
    day_key(instant.date_naive())
}

pub fn week_key(instant: DateTime<Local>) -> String {
    day_key(week_start(instant.date_naive()))
}

pub fn month_key(instant: DateTime<Local>) -> String {
    instant.format("%Y-%m").to_string()
}

/// Weeks run Sunday through Saturday.
pub fn week_start(date: NaiveDate) -> NaiveDate {
    date - Duration::days(date.weekday().num_days_from_sunday() as i64)
}

pub fn month_start(date: NaiveDate) -> NaiveDate {
    NaiveDate::from_ymd_opt(date.year(), date.month(), 1).expect("first of month must be valid")
}

pub fn days_in_month(date: NaiveDate) -> u32 {
    let first = month_start(date);
    let next = if first.month() == 12 {
        NaiveDate::from_ymd_opt(first.year() + 1, 1, 1)
    } else {
        NaiveDate::from_ymd_opt(first.year(), first.month() + 1, 1)
    }
    .expect("first of month must be valid");
    next.signed_duration_since(first).num_days() as u32
}

pub fn parse_clock(raw: &str) -> Result<(u32, u32), String> {
    let (hour_text, minute_text) = raw
        .trim()
        .split_once(':')
        .ok_or_else(|| format!("invalid time '{raw}', expected HH:MM"))?;

    let hour = hour_text.parse::<u32>();
    let minute = minute_text.parse::<u32>();
    match (hour, minute) {
        (Ok(hour), Ok(minute)) if hour < 24 && minute < 60 => Ok((hour, minute)),
        _ => Err(format!("invalid time '{raw}', expected HH:MM")),
    }
}

pub fn format_duration(total_seconds: i64) -> String {
    let total_seconds = total_seconds.max(0);
    let hours = total_seconds / 3600;
    let minutes = (total_seconds % 3600) / 60;
    if hours == 0 {
        format!("{minutes}m")
    } else {
        format!("{hours}h {minutes}m")
    }
}

pub fn format_clock(total_seconds: i64) -> String {
    let total_seconds = total_seconds.max(0);
    let hours = total_seconds / 3600;
    let minutes = (total_seconds % 3600) / 60;
    let seconds = total_seconds % 60;
    format!("{hours:02}:{minutes:02}:{seconds:02}")
}

#[cfg(test)]
mod tests {
    use chrono::{Local, NaiveDate, TimeZone};

    use super::{
        date_key, day_key, days_in_month, format_clock, format_duration, month_key, parse_clock,
        parse_day_key, week_key, week_start,
    };

    fn local(year: i32, month: u32, day: u32, hour: u32) -> chrono::DateTime<Local> {
        Local
            .with_ymd_and_hms(year, month, day, hour, 30, 0)
            .unwrap()
    }

    #[test]
    fn date_key_is_zero_padded_and_reparses() {
        let instant = local(2026, 3, 5, 9);
        let key = date_key(instant);
        assert_eq!(key, "2026-03-05");
        let reparsed = parse_day_key(&key).expect("key should parse");
        assert_eq!(day_key(reparsed), key);
    }

    #[test]
    fn week_key_is_the_sunday_and_is_idempotent() {
        // 2026-03-05 is a Thursday; the week starts on Sunday 2026-03-01.
        let key = week_key(local(2026, 3, 5, 9));
        assert_eq!(key, "2026-03-01");

        let reparsed = parse_day_key(&key).expect("key should parse");
        assert_eq!(day_key(week_start(reparsed)), key);
    }

    #[test]
    fn week_start_of_a_sunday_is_itself() {
        let sunday = NaiveDate::from_ymd_opt(2026, 3, 1).unwrap();
        assert_eq!(week_start(sunday), sunday);
    }

    #[test]
    fn month_key_format() {
        assert_eq!(month_key(local(2026, 3, 5, 9)), "2026-03");
        assert_eq!(month_key(local(2026, 11, 30, 23)), "2026-11");
    }

    #[test]
    fn days_in_month_handles_leap_years_and_december() {
        assert_eq!(days_in_month(NaiveDate::from_ymd_opt(2026, 2, 10).unwrap()), 28);
        assert_eq!(days_in_month(NaiveDate::from_ymd_opt(2028, 2, 1).unwrap()), 29);
        assert_eq!(days_in_month(NaiveDate::from_ymd_opt(2026, 12, 31).unwrap()), 31);
    }

    #[test]
    fn format_duration_drops_seconds() {
        assert_eq!(format_duration(0), "0m");
        assert_eq!(format_duration(59), "0m");
        assert_eq!(format_duration(3661), "1h 1m");
        assert_eq!(format_duration(-5), "0m");
    }

    #[test]
    fn format_clock_has_unbounded_hours() {
        assert_eq!(format_clock(0), "00:00:00");
        assert_eq!(format_clock(3 * 3600 + 5 * 60 + 9), "03:05:09");
        assert_eq!(format_clock(25 * 3600), "25:00:00");
    }

    #[test]
    fn parse_clock_rejects_malformed_input() {
        assert_eq!(parse_clock("09:30"), Ok((9, 30)));
        assert_eq!(parse_clock(" 23:59 "), Ok((23, 59)));
        assert!(parse_clock("24:00").is_err());
        assert!(parse_clock("0930").is_err());
        assert!(parse_clock("nine:thirty").is_err());
    }
}
