mod domain;
mod stats;
mod storage;
mod timeutil;
mod ui;

use std::error::Error;
use std::path::PathBuf;

use chrono::{Local, NaiveDate};
use clap::{Parser, Subcommand};

use crate::domain::{BREAK_TASK_ID, SessionState, TASK_COLORS, Tracker};
use crate::stats::{
	PeriodKind, compute_stats, daily_breakdown, entries_for_period, hourly_distribution,
	period_label, previous_period_stats, productivity, trend,
};
use crate::storage::{JsonFileStore, SnapshotStore, resolve_store_path};
use crate::timeutil::{format_clock, format_duration, parse_clock};
use crate::ui::run_dashboard;

#[derive(Debug, Parser)]
#[command(name = "timeflow", about = "Terminal-first personal time tracker")]
struct Cli {
	#[arg(long)]
	store: Option<PathBuf>,
	#[command(subcommand)]
	command: Option<Command>,
}

#[derive(Debug, Subcommand)]
enum Command {
	Init,
	Dashboard,
	Start {
		#[arg(long)]
		task: String,
	},
	Break,
	Resume {
		#[arg(long)]
		task: String,
	},
	Finish,
	Status,
	AddTask {
		#[arg(long)]
		name: String,
		#[arg(long)]
		color: Option<String>,
	},
	DeleteTask {
		#[arg(long)]
		task: String,
	},
	Tasks,
	Entries {
		#[arg(long)]
		day: Option<String>,
	},
	EditEntry {
		#[arg(long)]
		entry: String,
		#[arg(long)]
		start: String,
		#[arg(long)]
		end: String,
		#[arg(long)]
		task: String,
	},
	DeleteEntry {
		#[arg(long)]
		entry: String,
	},
	Stats {
		#[arg(long, default_value = "day")]
		period: String,
		#[arg(long)]
		date: Option<String>,
	},
}

fn main() {
	if let Err(err) = run() {
		eprintln!("error: {err}");
		std::process::exit(1);
	}
}

fn run() -> Result<(), Box<dyn Error>> {
	let cli = Cli::parse();

	let store = JsonFileStore::new(resolve_store_path(cli.store));
	let mut tracker = load_tracker(&store);

	match cli.command.unwrap_or(Command::Dashboard) {
		Command::Init => {
			persist(&store, &tracker);
			println!("initialized store at {}", store.path().display());
		}
		Command::Dashboard => {
			run_dashboard(&mut tracker, &store)?;
		}
		Command::Start { task } => {
			let task_id = resolve_task(&tracker, &task)?;
			tracker.start_work(&task_id, Local::now());
			persist(&store, &tracker);
			println!("started {}", tracker.task_label(&task_id));
		}
		Command::Break => {
			tracker.start_break(Local::now());
			persist(&store, &tracker);
			println!("break started");
		}
		Command::Resume { task } => {
			let task_id = resolve_task(&tracker, &task)?;
			tracker.end_break(&task_id, Local::now());
			persist(&store, &tracker);
			println!("resumed {}", tracker.task_label(&task_id));
		}
		Command::Finish => {
			tracker.finish_work(Local::now());
			persist(&store, &tracker);
			println!("day finished");
		}
		Command::Status => {
			print_status(&tracker);
		}
		Command::AddTask { name, color } => {
			let color = match color {
				Some(color) => parse_color(&color)?,
				None => TASK_COLORS[0].to_string(),
			};
			let task_id = tracker.add_task(&name, &color)?;
			persist(&store, &tracker);
			println!("created task {task_id}");
		}
		Command::DeleteTask { task } => {
			let task_id = resolve_task(&tracker, &task)?;
			tracker.delete_task(&task_id);
			persist(&store, &tracker);
			println!("deleted task {task_id}");
		}
		Command::Tasks => {
			print_tasks(&tracker);
		}
		Command::Entries { day } => {
			let day = parse_day(day.as_deref())?;
			print_entries(&tracker, day);
		}
		Command::EditEntry {
			entry,
			start,
			end,
			task,
		} => {
			let start_clock = parse_clock(&start)?;
			let end_clock = parse_clock(&end)?;
			let task_id = if task == BREAK_TASK_ID {
				BREAK_TASK_ID.to_string()
			} else {
				resolve_task(&tracker, &task)?
			};
			tracker.edit_entry(&entry, start_clock, end_clock, &task_id);
			persist(&store, &tracker);
			println!("updated entry {entry}");
		}
		Command::DeleteEntry { entry } => {
			tracker.delete_entry(&entry);
			persist(&store, &tracker);
			println!("deleted entry {entry}");
		}
		Command::Stats { period, date } => {
			let kind = PeriodKind::parse(&period)?;
			let selected = parse_day(date.as_deref())?;
			print_stats(&tracker, selected, kind);
		}
	}

	Ok(())
}

fn load_tracker(store: &JsonFileStore) -> Tracker {
	match store.load() {
		Ok(Some(snapshot)) => Tracker::from_snapshot(snapshot),
		Ok(None) => Tracker::seeded(),
		Err(err) => {
			eprintln!("warning: failed to load snapshot, starting fresh: {err}");
			Tracker::seeded()
		}
	}
}

// Saves are best-effort: a failed write is reported and in-memory state
// stays authoritative.
fn persist(store: &JsonFileStore, tracker: &Tracker) {
	if let Err(err) = store.save(&tracker.snapshot()) {
		eprintln!("warning: failed to save snapshot: {err}");
	}
}

fn resolve_task(tracker: &Tracker, input: &str) -> Result<String, String> {
	if let Some(task) = tracker.task(input) {
		return Ok(task.id.clone());
	}
	if let Some(task) = tracker
		.tasks
		.iter()
		.find(|task| task.name.eq_ignore_ascii_case(input))
	{
		return Ok(task.id.clone());
	}
	Err(format!("task not found: {input}"))
}

fn parse_color(input: &str) -> Result<String, String> {
	let wanted = input.trim().to_ascii_lowercase();
	if TASK_COLORS.contains(&wanted.as_str()) {
		Ok(wanted)
	} else {
		Err(format!(
			"unknown color '{input}', expected one of: {}",
			TASK_COLORS.join(", ")
		))
	}
}

fn parse_day(input: Option<&str>) -> Result<NaiveDate, Box<dyn Error>> {
	if let Some(raw) = input {
		Ok(NaiveDate::parse_from_str(raw, "%Y-%m-%d")?)
	} else {
		Ok(Local::now().date_naive())
	}
}

fn print_status(tracker: &Tracker) {
	let now = Local::now();
	match tracker.session_state() {
		SessionState::Idle => println!("idle"),
		SessionState::Working { task_id } => {
			println!(
				"working on {} for {}",
				tracker.task_label(&task_id),
				format_clock(tracker.elapsed(now))
			);
		}
		SessionState::OnBreak => {
			println!("on break for {}", format_clock(tracker.elapsed(now)));
		}
	}

	if let Some(work_start) = tracker.work_start() {
		println!("working since {}", work_start.format("%H:%M"));
	}
}

fn print_tasks(tracker: &Tracker) {
	if tracker.tasks.is_empty() {
		println!("no tasks yet");
		return;
	}

	for task in &tracker.tasks {
		println!("{} | {:<13} | {}", task.id, task.color, task.name);
	}
}

fn print_entries(tracker: &Tracker, day: NaiveDate) {
	let rows = tracker.entries_for_day(day);
	println!(
		"{} | {} entries | {} total",
		day.format("%Y-%m-%d"),
		rows.len(),
		format_duration(rows.iter().map(|entry| entry.duration).sum())
	);

	for entry in rows {
		println!(
			"{} | {} -> {} | {:>7} | {}",
			entry.id,
			entry.start_time.format("%H:%M"),
			entry.end_time.format("%H:%M"),
			format_duration(entry.duration),
			tracker.task_label(&entry.task_id)
		);
	}
}

fn print_stats(tracker: &Tracker, selected: NaiveDate, kind: PeriodKind) {
	let period_entries = entries_for_period(&tracker.entries, selected, kind);
	let current = compute_stats(&period_entries);
	let previous = previous_period_stats(&tracker.entries, selected, kind);

	println!("{} ({})", period_label(selected, kind), kind.name());
	println!(
		"work:  {}{}",
		format_duration(current.total_work),
		format_trend(current.total_work, previous.total_work)
	);
	println!(
		"break: {}{}",
		format_duration(current.total_break),
		format_trend(current.total_break, previous.total_break)
	);
	println!("productivity: {}%", productivity(&current));

	if current.total == 0 {
		println!("\nno entries for this period");
		return;
	}

	println!("\nby task:");
	let mut task_rows = current
		.task_time
		.iter()
		.map(|(task_id, seconds)| (tracker.task_label(task_id), *seconds))
		.collect::<Vec<_>>();
	task_rows.sort_by(|left, right| right.1.cmp(&left.1).then_with(|| left.0.cmp(&right.0)));
	for (label, seconds) in task_rows {
		let share = (seconds as f64 / current.total as f64 * 100.0).round() as i64;
		println!("{:>8} | {share:>3}% | {label}", format_duration(seconds));
	}

	println!("\nby hour:");
	let hourly = hourly_distribution(&period_entries);
	let max_hour = hourly
		.iter()
		.map(|slot| slot.work + slot.breaks)
		.max()
		.unwrap_or(0)
		.max(1);
	for (hour, slot) in hourly.iter().enumerate() {
		let total = slot.work + slot.breaks;
		if total == 0 {
			continue;
		}
		let width = ((total as f64 / max_hour as f64) * 24.0).round() as usize;
		println!(
			"{hour:02} | {:>8} | {}",
			format_duration(total),
			"=".repeat(width.max(1))
		);
	}

	if kind != PeriodKind::Day {
		println!("\nby day:");
		let buckets = daily_breakdown(&period_entries, selected, kind);
		let max_day = buckets
			.iter()
			.map(|bucket| bucket.work + bucket.breaks)
			.max()
			.unwrap_or(0)
			.max(1);
		for bucket in &buckets {
			let total = bucket.work + bucket.breaks;
			let width = ((total as f64 / max_day as f64) * 24.0).round() as usize;
			println!(
				"{} | {:>8} | {}",
				bucket.date.format("%a %d"),
				format_duration(total),
				if total == 0 {
					String::new()
				} else {
					"=".repeat(width.max(1))
				}
			);
		}
	}
}

// A zero previous period reads as "no trend", not 0%.
fn format_trend(current: i64, previous: i64) -> String {
	if previous <= 0 {
		return String::new();
	}
	let value = trend(current, previous);
	format!(" ({}{:.0}% vs previous)", if value > 0.0 { "+" } else { "" }, value)
}
