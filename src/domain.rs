use chrono::{DateTime, Local, LocalResult, NaiveDate, TimeZone};
use rand::{Rng, distributions::Alphanumeric, thread_rng};
use serde::{Deserialize, Serialize};

use crate::timeutil::{date_key, day_key};

const ID_LEN: usize = 8;

/// Pseudo task id used for break entries and break sessions.
pub const BREAK_TASK_ID: &str = "break";

pub const TASK_COLORS: [&str; 16] = [
    "blue",
    "cyan",
    "green",
    "yellow",
    "red",
    "magenta",
    "light_blue",
    "light_cyan",
    "light_green",
    "light_yellow",
    "light_red",
    "light_magenta",
    "white",
    "gray",
    "dark_gray",
    "black",
];
pub const BREAK_COLOR: &str = "dark_gray";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Task {
    pub id: String,
    pub name: String,
    pub color: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TimeEntry {
    pub id: String,
    pub task_id: String,
    pub is_break: bool,
    pub start_time: DateTime<Local>,
    pub end_time: DateTime<Local>,
    pub duration: i64,
    pub date: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActiveSession {
    #[serde(rename = "task")]
    pub task_id: String,
    pub is_break: bool,
    #[serde(rename = "startTime")]
    pub session_start: DateTime<Local>,
    #[serde(rename = "workStartTime")]
    pub work_start: Option<DateTime<Local>>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionState {
    Idle,
    Working { task_id: String },
    OnBreak,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Snapshot {
    #[serde(default)]
    pub tasks: Vec<Task>,
    #[serde(default)]
    pub entries: Vec<TimeEntry>,
    #[serde(default)]
    pub active_session: Option<ActiveSession>,
}

#[derive(Debug, Clone)]
pub struct Tracker {
    pub tasks: Vec<Task>,
    pub entries: Vec<TimeEntry>,
    pub active: Option<ActiveSession>,
}

impl Tracker {
    pub fn seeded() -> Self {
        let tasks = [
            ("Development", TASK_COLORS[0]),
            ("Meetings", TASK_COLORS[1]),
            ("Admin", TASK_COLORS[2]),
        ]
        .into_iter()
        .map(|(name, color)| Task {
            id: generate_id(),
            name: name.to_string(),
            color: color.to_string(),
        })
        .collect();

        Self {
            tasks,
            entries: Vec::new(),
            active: None,
        }
    }

    pub fn from_snapshot(snapshot: Snapshot) -> Self {
        Self {
            tasks: snapshot.tasks,
            entries: snapshot.entries,
            active: snapshot.active_session,
        }
    }

    pub fn snapshot(&self) -> Snapshot {
        Snapshot {
            tasks: self.tasks.clone(),
            entries: self.entries.clone(),
            active_session: self.active.clone(),
        }
    }

    pub fn task(&self, id: &str) -> Option<&Task> {
        self.tasks.iter().find(|task| task.id == id)
    }

    /// Display name for a task id; dangling ids stay renderable.
    pub fn task_label(&self, task_id: &str) -> String {
        if task_id == BREAK_TASK_ID {
            return "Break".to_string();
        }
        self.task(task_id)
            .map(|task| task.name.clone())
            .unwrap_or_else(|| "Unknown task".to_string())
    }

    pub fn add_task(&mut self, name: &str, color: &str) -> Result<String, String> {
        let name = name.trim();
        if name.is_empty() {
            return Err("task name cannot be empty".to_string());
        }

        let id = generate_id();
        self.tasks.push(Task {
            id: id.clone(),
            name: name.to_string(),
            color: color.to_string(),
        });
        Ok(id)
    }

    /// Entries referencing the deleted task keep their (now dangling) id.
    pub fn delete_task(&mut self, task_id: &str) {
        self.tasks.retain(|task| task.id != task_id);
    }

    pub fn session_state(&self) -> SessionState {
        match &self.active {
            None => SessionState::Idle,
            Some(session) if session.is_break => SessionState::OnBreak,
            Some(session) => SessionState::Working {
                task_id: session.task_id.clone(),
            },
        }
    }

    pub fn elapsed(&self, now: DateTime<Local>) -> i64 {
        self.active
            .as_ref()
            .map(|session| (now - session.session_start).num_seconds().max(0))
            .unwrap_or(0)
    }

    pub fn work_start(&self) -> Option<DateTime<Local>> {
        self.active.as_ref().and_then(|session| session.work_start)
    }

    /// Opens a work session. Never closes the current one: callers that
    /// want the open interval recorded go through `start_break` or
    /// `finish_work` first.
    pub fn start_work(&mut self, task_id: &str, now: DateTime<Local>) {
        let work_start = self.work_start().unwrap_or(now);
        self.active = Some(ActiveSession {
            task_id: task_id.to_string(),
            is_break: false,
            session_start: now,
            work_start: Some(work_start),
        });
    }

    pub fn start_break(&mut self, now: DateTime<Local>) {
        let closing = match &self.active {
            Some(session) if !session.is_break => Some(entry_from_session(session, now)),
            _ => None,
        };
        if let Some(entry) = closing {
            self.append_entry(entry);
        }

        let work_start = self.work_start();
        self.active = Some(ActiveSession {
            task_id: BREAK_TASK_ID.to_string(),
            is_break: true,
            session_start: now,
            work_start,
        });
    }

    pub fn end_break(&mut self, task_id: &str, now: DateTime<Local>) {
        let closing = match &self.active {
            Some(session) if session.is_break => Some(entry_from_session(session, now)),
            _ => None,
        };
        if let Some(entry) = closing {
            self.append_entry(entry);
        }
        self.start_work(task_id, now);
    }

    pub fn finish_work(&mut self, now: DateTime<Local>) {
        if let Some(session) = self.active.take() {
            self.append_entry(entry_from_session(&session, now));
        }
    }

    pub fn append_entry(&mut self, entry: TimeEntry) {
        self.entries.push(entry);
    }

    /// Replaces the hour/minute of both clocks on the entry's existing
    /// calendar dates and retargets the task. The `date` bucket is left
    /// untouched even if the new start would fall on another day.
    pub fn edit_entry(
        &mut self,
        entry_id: &str,
        start_clock: (u32, u32),
        end_clock: (u32, u32),
        task_id: &str,
    ) {
        let Some(entry) = self.entries.iter_mut().find(|entry| entry.id == entry_id) else {
            return;
        };

        if let (Some(start), Some(end)) = (
            with_clock(entry.start_time, start_clock),
            with_clock(entry.end_time, end_clock),
        ) {
            entry.start_time = start;
            entry.end_time = end;
            entry.duration = (end - start).num_seconds().max(0);
        }
        entry.task_id = task_id.to_string();
        entry.is_break = task_id == BREAK_TASK_ID;
    }

    pub fn delete_entry(&mut self, entry_id: &str) {
        self.entries.retain(|entry| entry.id != entry_id);
    }

    pub fn entries_for_day(&self, date: NaiveDate) -> Vec<&TimeEntry> {
        let key = day_key(date);
        let mut rows = self
            .entries
            .iter()
            .filter(|entry| entry.date == key)
            .collect::<Vec<_>>();
        rows.sort_by(|left, right| left.start_time.cmp(&right.start_time));
        rows
    }
}

fn entry_from_session(session: &ActiveSession, now: DateTime<Local>) -> TimeEntry {
    TimeEntry {
        id: generate_id(),
        task_id: session.task_id.clone(),
        is_break: session.is_break,
        start_time: session.session_start,
        end_time: now,
        duration: (now - session.session_start).num_seconds().max(0),
        date: date_key(session.session_start),
    }
}

fn with_clock(instant: DateTime<Local>, clock: (u32, u32)) -> Option<DateTime<Local>> {
    let (hour, minute) = clock;
    let naive = instant.date_naive().and_hms_opt(hour, minute, 0)?;
    match Local.from_local_datetime(&naive) {
        LocalResult::Single(value) => Some(value),
        LocalResult::Ambiguous(first, second) => Some(first.min(second)),
        LocalResult::None => None,
    }
}

pub fn generate_id() -> String {
    thread_rng()
        .sample_iter(&Alphanumeric)
        .take(ID_LEN)
        .map(char::from)
        .collect()
}

#[cfg(test)]
mod tests {
    use chrono::{DateTime, Duration, Local, TimeZone};

    use super::{BREAK_TASK_ID, SessionState, Tracker};

    fn at(hour: u32, minute: u32) -> DateTime<Local> {
        Local.with_ymd_and_hms(2026, 3, 2, hour, minute, 0).unwrap()
    }

    #[test]
    fn full_day_scenario_emits_three_entries() {
        let mut tracker = Tracker::seeded();
        let task_id = tracker.tasks[0].id.clone();
        let start = at(9, 0);

        tracker.start_work(&task_id, start);
        assert_eq!(tracker.work_start(), Some(start));

        tracker.start_break(start + Duration::seconds(1500));
        assert_eq!(tracker.session_state(), SessionState::OnBreak);
        assert_eq!(tracker.work_start(), Some(start));

        tracker.end_break(&task_id, start + Duration::seconds(1800));
        assert_eq!(
            tracker.session_state(),
            SessionState::Working {
                task_id: task_id.clone()
            }
        );
        assert_eq!(tracker.work_start(), Some(start));

        tracker.finish_work(start + Duration::seconds(5400));
        assert_eq!(tracker.session_state(), SessionState::Idle);
        assert_eq!(tracker.work_start(), None);

        let durations = tracker
            .entries
            .iter()
            .map(|entry| (entry.is_break, entry.duration))
            .collect::<Vec<_>>();
        assert_eq!(durations, vec![(false, 1500), (true, 300), (false, 3600)]);
        assert!(
            tracker
                .entries
                .iter()
                .filter(|entry| !entry.is_break)
                .all(|entry| entry.task_id == task_id)
        );
        assert!(
            tracker
                .entries
                .iter()
                .filter(|entry| entry.is_break)
                .all(|entry| entry.task_id == BREAK_TASK_ID)
        );

        let total: i64 = tracker.entries.iter().map(|entry| entry.duration).sum();
        assert_eq!(total, 5400);
    }

    #[test]
    fn transitions_from_idle_are_permissive() {
        let mut tracker = Tracker::seeded();
        let task_id = tracker.tasks[0].id.clone();

        // Nothing open, so the closing halves are no-ops.
        tracker.finish_work(at(9, 0));
        assert!(tracker.entries.is_empty());

        tracker.end_break(&task_id, at(9, 5));
        assert!(tracker.entries.is_empty());
        assert_eq!(tracker.session_state(), SessionState::Working { task_id });
        assert_eq!(tracker.work_start(), Some(at(9, 5)));
    }

    #[test]
    fn break_from_idle_opens_a_break_session_without_work_start() {
        let mut tracker = Tracker::seeded();
        tracker.start_break(at(12, 0));
        assert_eq!(tracker.session_state(), SessionState::OnBreak);
        assert_eq!(tracker.work_start(), None);
    }

    #[test]
    fn finishing_while_on_break_emits_a_break_entry() {
        let mut tracker = Tracker::seeded();
        let task_id = tracker.tasks[0].id.clone();
        tracker.start_work(&task_id, at(9, 0));
        tracker.start_break(at(10, 0));
        tracker.finish_work(at(10, 10));

        assert_eq!(tracker.entries.len(), 2);
        let last = tracker.entries.last().unwrap();
        assert!(last.is_break);
        assert_eq!(last.duration, 600);
    }

    #[test]
    fn edit_clamps_negative_durations_to_zero() {
        let mut tracker = Tracker::seeded();
        let task_id = tracker.tasks[0].id.clone();
        tracker.start_work(&task_id, at(9, 0));
        tracker.finish_work(at(10, 0));

        let entry_id = tracker.entries[0].id.clone();
        tracker.edit_entry(&entry_id, (11, 0), (10, 30), &task_id);

        let entry = &tracker.entries[0];
        assert_eq!(entry.duration, 0);
        assert!(entry.end_time < entry.start_time);
    }

    #[test]
    fn edit_keeps_the_original_date_bucket() {
        let mut tracker = Tracker::seeded();
        let task_id = tracker.tasks[0].id.clone();
        tracker.start_work(&task_id, at(23, 0));
        tracker.finish_work(at(23, 30));
        let original_date = tracker.entries[0].date.clone();

        // Moving the clocks around (even to times that read as the small
        // hours of the next day) must not move the entry's day bucket.
        let entry_id = tracker.entries[0].id.clone();
        tracker.edit_entry(&entry_id, (0, 15), (1, 0), &task_id);
        assert_eq!(tracker.entries[0].date, original_date);
        assert_eq!(tracker.entries[0].duration, 2700);
    }

    #[test]
    fn edit_retargets_break_flag_from_task_id() {
        let mut tracker = Tracker::seeded();
        let task_id = tracker.tasks[0].id.clone();
        tracker.start_work(&task_id, at(9, 0));
        tracker.finish_work(at(9, 30));

        let entry_id = tracker.entries[0].id.clone();
        tracker.edit_entry(&entry_id, (9, 0), (9, 30), BREAK_TASK_ID);
        assert!(tracker.entries[0].is_break);

        tracker.edit_entry(&entry_id, (9, 0), (9, 30), &task_id);
        assert!(!tracker.entries[0].is_break);
    }

    #[test]
    fn deleting_unknown_ids_is_a_no_op() {
        let mut tracker = Tracker::seeded();
        let task_id = tracker.tasks[0].id.clone();
        tracker.start_work(&task_id, at(9, 0));
        tracker.finish_work(at(10, 0));

        tracker.delete_entry("no-such-entry");
        assert_eq!(tracker.entries.len(), 1);

        tracker.edit_entry("no-such-entry", (1, 0), (2, 0), &task_id);
        assert_eq!(tracker.entries[0].duration, 3600);
    }

    #[test]
    fn deleting_a_task_leaves_entries_dangling() {
        let mut tracker = Tracker::seeded();
        let task_id = tracker.tasks[0].id.clone();
        tracker.start_work(&task_id, at(9, 0));
        tracker.finish_work(at(10, 0));

        tracker.delete_task(&task_id);
        assert!(tracker.task(&task_id).is_none());
        assert_eq!(tracker.entries[0].task_id, task_id);
        assert_eq!(tracker.task_label(&task_id), "Unknown task");
    }

    #[test]
    fn add_task_rejects_blank_names() {
        let mut tracker = Tracker::seeded();
        assert!(tracker.add_task("   ", "blue").is_err());
        let id = tracker.add_task("  Writing  ", "red").unwrap();
        assert_eq!(tracker.task(&id).unwrap().name, "Writing");
    }

    #[test]
    fn entries_for_day_sorts_by_start_time() {
        let mut tracker = Tracker::seeded();
        let task_id = tracker.tasks[0].id.clone();
        tracker.start_work(&task_id, at(14, 0));
        tracker.finish_work(at(15, 0));
        tracker.start_work(&task_id, at(9, 0));
        tracker.finish_work(at(10, 0));

        let rows = tracker.entries_for_day(at(9, 0).date_naive());
        assert_eq!(rows.len(), 2);
        assert!(rows[0].start_time < rows[1].start_time);
    }
}
