use std::collections::HashMap;

use chrono::{Datelike, Duration, Months, NaiveDate, Timelike};

use crate::domain::{BREAK_TASK_ID, TimeEntry};
use crate::timeutil::{day_key, days_in_month, month_start, parse_day_key, week_start};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PeriodKind {
    Day,
    Week,
    Month,
}

impl PeriodKind {
    pub fn parse(input: &str) -> Result<Self, String> {
        match input.trim().to_ascii_lowercase().as_str() {
            "day" => Ok(Self::Day),
            "week" => Ok(Self::Week),
            "month" => Ok(Self::Month),
            other => Err(format!("unknown period '{other}', expected day, week or month")),
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::Day => "day",
            Self::Week => "week",
            Self::Month => "month",
        }
    }

    pub fn next(&self) -> Self {
        match self {
            Self::Day => Self::Week,
            Self::Week => Self::Month,
            Self::Month => Self::Day,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct Stats {
    pub task_time: HashMap<String, i64>,
    pub total_work: i64,
    pub total_break: i64,
    pub total: i64,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct HourSlot {
    pub work: i64,
    pub breaks: i64,
}

#[derive(Debug, Clone)]
pub struct DayBucket {
    pub date: NaiveDate,
    pub work: i64,
    pub breaks: i64,
    pub by_task: HashMap<String, i64>,
}

/// True when `day` falls in the period of `kind` anchored at `selected`.
pub fn period_contains(selected: NaiveDate, kind: PeriodKind, day: NaiveDate) -> bool {
    match kind {
        PeriodKind::Day => day == selected,
        PeriodKind::Week => week_start(day) == week_start(selected),
        PeriodKind::Month => (day.year(), day.month()) == (selected.year(), selected.month()),
    }
}

/// Filters on the stored `date` key re-parsed as a calendar date; entries
/// with an unparseable key are simply skipped.
pub fn entries_for_period<'a>(
    entries: &'a [TimeEntry],
    selected: NaiveDate,
    kind: PeriodKind,
) -> Vec<&'a TimeEntry> {
    entries
        .iter()
        .filter(|entry| {
            parse_day_key(&entry.date)
                .map(|entry_day| period_contains(selected, kind, entry_day))
                .unwrap_or(false)
        })
        .collect()
}

pub fn compute_stats(period_entries: &[&TimeEntry]) -> Stats {
    let mut stats = Stats::default();
    for entry in period_entries {
        if entry.is_break {
            stats.total_break += entry.duration;
            *stats.task_time.entry(BREAK_TASK_ID.to_string()).or_insert(0) += entry.duration;
        } else {
            stats.total_work += entry.duration;
            *stats.task_time.entry(entry.task_id.clone()).or_insert(0) += entry.duration;
        }
    }
    stats.total = stats.total_work + stats.total_break;
    stats
}

pub fn previous_period_date(selected: NaiveDate, kind: PeriodKind) -> NaiveDate {
    match kind {
        PeriodKind::Day => selected - Duration::days(1),
        PeriodKind::Week => selected - Duration::days(7),
        PeriodKind::Month => selected
            .checked_sub_months(Months::new(1))
            .unwrap_or(selected),
    }
}

pub fn next_period_date(selected: NaiveDate, kind: PeriodKind) -> NaiveDate {
    match kind {
        PeriodKind::Day => selected + Duration::days(1),
        PeriodKind::Week => selected + Duration::days(7),
        PeriodKind::Month => selected
            .checked_add_months(Months::new(1))
            .unwrap_or(selected),
    }
}

/// Always runs against the full entry set, not the current period's slice.
pub fn previous_period_stats(entries: &[TimeEntry], selected: NaiveDate, kind: PeriodKind) -> Stats {
    let previous = previous_period_date(selected, kind);
    compute_stats(&entries_for_period(entries, previous, kind))
}

/// Percent change versus the previous period. A zero previous value yields
/// 0.0; display layers treat that case as "no trend" rather than 0%.
pub fn trend(current: i64, previous: i64) -> f64 {
    if previous <= 0 {
        return 0.0;
    }
    (current - previous) as f64 / previous as f64 * 100.0
}

/// Each entry's full duration lands in the hour its start time falls in,
/// even when the entry spans hour boundaries.
pub fn hourly_distribution(period_entries: &[&TimeEntry]) -> [HourSlot; 24] {
    let mut slots = [HourSlot::default(); 24];
    for entry in period_entries {
        let slot = &mut slots[entry.start_time.hour() as usize];
        if entry.is_break {
            slot.breaks += entry.duration;
        } else {
            slot.work += entry.duration;
        }
    }
    slots
}

/// One bucket per calendar day of the period (1, 7, or days-in-month),
/// keyed by the entries' stored `date` field. `by_task` counts work
/// entries only; breaks are kept in their own column.
pub fn daily_breakdown(
    period_entries: &[&TimeEntry],
    selected: NaiveDate,
    kind: PeriodKind,
) -> Vec<DayBucket> {
    let (first_day, day_count) = match kind {
        PeriodKind::Day => (selected, 1usize),
        PeriodKind::Week => (week_start(selected), 7),
        PeriodKind::Month => (month_start(selected), days_in_month(selected) as usize),
    };

    let mut buckets = (0..day_count)
        .map(|offset| DayBucket {
            date: first_day + Duration::days(offset as i64),
            work: 0,
            breaks: 0,
            by_task: HashMap::new(),
        })
        .collect::<Vec<_>>();
    let index_by_key = buckets
        .iter()
        .enumerate()
        .map(|(index, bucket)| (day_key(bucket.date), index))
        .collect::<HashMap<_, _>>();

    for entry in period_entries {
        let Some(&index) = index_by_key.get(&entry.date) else {
            continue;
        };
        let bucket = &mut buckets[index];
        if entry.is_break {
            bucket.breaks += entry.duration;
        } else {
            bucket.work += entry.duration;
            *bucket.by_task.entry(entry.task_id.clone()).or_insert(0) += entry.duration;
        }
    }

    buckets
}

pub fn period_label(selected: NaiveDate, kind: PeriodKind) -> String {
    match kind {
        PeriodKind::Day => selected.format("%A, %b %-d").to_string(),
        PeriodKind::Week => {
            let start = week_start(selected);
            let end = start + Duration::days(6);
            format!("{} - {}", start.format("%b %-d"), end.format("%b %-d"))
        }
        PeriodKind::Month => selected.format("%B %Y").to_string(),
    }
}

/// Work share of the total time, rounded to a whole percent.
pub fn productivity(stats: &Stats) -> i64 {
    if stats.total == 0 {
        return 0;
    }
    ((stats.total_work as f64 / stats.total as f64) * 100.0).round() as i64
}

#[cfg(test)]
mod tests {
    use chrono::{DateTime, Duration, Local, NaiveDate, TimeZone};

    use crate::domain::{BREAK_TASK_ID, TimeEntry, generate_id};
    use crate::timeutil::date_key;

    use super::{
        PeriodKind, compute_stats, daily_breakdown, entries_for_period, hourly_distribution,
        next_period_date, previous_period_date, previous_period_stats, productivity, trend,
    };

    fn instant(year: i32, month: u32, day: u32, hour: u32, minute: u32) -> DateTime<Local> {
        Local
            .with_ymd_and_hms(year, month, day, hour, minute, 0)
            .unwrap()
    }

    fn entry(task_id: &str, start: DateTime<Local>, duration: i64) -> TimeEntry {
        TimeEntry {
            id: generate_id(),
            task_id: task_id.to_string(),
            is_break: task_id == BREAK_TASK_ID,
            start_time: start,
            end_time: start + Duration::seconds(duration),
            duration,
            date: date_key(start),
        }
    }

    #[test]
    fn stats_total_is_work_plus_break() {
        let entries = vec![
            entry("alpha", instant(2026, 3, 2, 9, 0), 1500),
            entry(BREAK_TASK_ID, instant(2026, 3, 2, 9, 25), 300),
            entry("beta", instant(2026, 3, 2, 9, 30), 3600),
        ];
        let refs = entries.iter().collect::<Vec<_>>();
        let stats = compute_stats(&refs);

        assert_eq!(stats.total_work, 5100);
        assert_eq!(stats.total_break, 300);
        assert_eq!(stats.total, stats.total_work + stats.total_break);
        assert_eq!(stats.task_time.get("alpha"), Some(&1500));
        assert_eq!(stats.task_time.get(BREAK_TASK_ID), Some(&300));
    }

    #[test]
    fn period_filter_matches_day_week_and_month_keys() {
        let entries = vec![
            entry("alpha", instant(2026, 3, 2, 9, 0), 600),   // Monday
            entry("alpha", instant(2026, 3, 7, 9, 0), 600),   // Saturday, same week
            entry("alpha", instant(2026, 3, 8, 9, 0), 600),   // Sunday, next week
            entry("alpha", instant(2026, 4, 1, 9, 0), 600),   // next month
        ];
        let monday = NaiveDate::from_ymd_opt(2026, 3, 2).unwrap();

        assert_eq!(entries_for_period(&entries, monday, PeriodKind::Day).len(), 1);
        assert_eq!(entries_for_period(&entries, monday, PeriodKind::Week).len(), 2);
        assert_eq!(entries_for_period(&entries, monday, PeriodKind::Month).len(), 3);
    }

    #[test]
    fn trend_values_from_the_reference_cases() {
        assert_eq!(trend(120, 100), 20.0);
        assert_eq!(trend(80, 100), -20.0);
        assert_eq!(trend(500, 0), 0.0);
    }

    #[test]
    fn previous_period_shifts_by_one_unit() {
        let date = NaiveDate::from_ymd_opt(2026, 3, 31).unwrap();
        assert_eq!(
            previous_period_date(date, PeriodKind::Day),
            NaiveDate::from_ymd_opt(2026, 3, 30).unwrap()
        );
        assert_eq!(
            previous_period_date(date, PeriodKind::Week),
            NaiveDate::from_ymd_opt(2026, 3, 24).unwrap()
        );
        // Short previous month clamps to its last day.
        assert_eq!(
            previous_period_date(date, PeriodKind::Month),
            NaiveDate::from_ymd_opt(2026, 2, 28).unwrap()
        );
        assert_eq!(
            next_period_date(NaiveDate::from_ymd_opt(2026, 1, 31).unwrap(), PeriodKind::Month),
            NaiveDate::from_ymd_opt(2026, 2, 28).unwrap()
        );
    }

    #[test]
    fn previous_period_stats_run_against_the_full_entry_set() {
        let entries = vec![
            entry("alpha", instant(2026, 3, 2, 9, 0), 100),
            entry("alpha", instant(2026, 3, 1, 9, 0), 250),
        ];
        let monday = NaiveDate::from_ymd_opt(2026, 3, 2).unwrap();
        let previous = previous_period_stats(&entries, monday, PeriodKind::Day);
        assert_eq!(previous.total_work, 250);
    }

    #[test]
    fn hourly_distribution_attributes_whole_entries_to_their_start_hour() {
        let entries = vec![
            // Spans 9:30 to 11:30 but counts entirely in hour 9.
            entry("alpha", instant(2026, 3, 2, 9, 30), 7200),
            entry(BREAK_TASK_ID, instant(2026, 3, 2, 12, 0), 900),
        ];
        let refs = entries.iter().collect::<Vec<_>>();
        let slots = hourly_distribution(&refs);

        assert_eq!(slots[9].work, 7200);
        assert_eq!(slots[10].work, 0);
        assert_eq!(slots[11].work, 0);
        assert_eq!(slots[12].breaks, 900);
    }

    #[test]
    fn daily_breakdown_builds_one_bucket_per_day() {
        let entries = vec![
            entry("alpha", instant(2026, 3, 2, 9, 0), 600),
            entry(BREAK_TASK_ID, instant(2026, 3, 4, 9, 0), 300),
        ];
        let refs = entries.iter().collect::<Vec<_>>();
        let monday = NaiveDate::from_ymd_opt(2026, 3, 2).unwrap();

        let week = daily_breakdown(&refs, monday, PeriodKind::Week);
        assert_eq!(week.len(), 7);
        assert_eq!(week[0].date, NaiveDate::from_ymd_opt(2026, 3, 1).unwrap());
        assert_eq!(week[1].work, 600);
        assert_eq!(week[1].by_task.get("alpha"), Some(&600));
        assert_eq!(week[3].breaks, 300);
        assert!(week[3].by_task.is_empty());

        let month = daily_breakdown(&refs, monday, PeriodKind::Month);
        assert_eq!(month.len(), 31);
        assert_eq!(month[1].work, 600);
    }

    #[test]
    fn productivity_is_the_work_share() {
        let entries = vec![
            entry("alpha", instant(2026, 3, 2, 9, 0), 900),
            entry(BREAK_TASK_ID, instant(2026, 3, 2, 10, 0), 100),
        ];
        let refs = entries.iter().collect::<Vec<_>>();
        assert_eq!(productivity(&compute_stats(&refs)), 90);
        assert_eq!(productivity(&compute_stats(&[])), 0);
    }
}
