use std::collections::HashSet;
use std::error::Error;
use std::io;
use std::time::Duration as StdDuration;

use chrono::{DateTime, Datelike, Local, NaiveDate};
use crossterm::event::{self, Event as CEvent, KeyCode, KeyEventKind};
use crossterm::terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen};
use crossterm::{execute, ExecutableCommand};
use ratatui::backend::CrosstermBackend;
use ratatui::layout::{Constraint, Direction, Layout, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Clear, List, ListItem, ListState, Paragraph};
use ratatui::{Frame, Terminal};

use crate::domain::{BREAK_COLOR, BREAK_TASK_ID, SessionState, Tracker, TASK_COLORS};
use crate::stats::{
	HourSlot, PeriodKind, compute_stats, daily_breakdown, entries_for_period, hourly_distribution,
	next_period_date, period_contains, period_label, previous_period_date, previous_period_stats,
	productivity, trend,
};
use crate::storage::{JsonFileStore, SnapshotStore};
use crate::timeutil::{
	days_in_month, format_clock, format_duration, month_start, parse_clock, parse_day_key,
};

const FOCUSED_PANEL_BORDER_COLOR: Color = Color::Yellow;
const INACTIVE_PANEL_BORDER_COLOR: Color = Color::DarkGray;
const HIGHLIGHT_BACKGROUND_COLOR: Color = Color::Rgb(42, 45, 52);

pub fn run_dashboard(tracker: &mut Tracker, store: &JsonFileStore) -> Result<(), Box<dyn Error>> {
	enable_raw_mode()?;
	let mut stdout = io::stdout();
	stdout.execute(EnterAlternateScreen)?;
	let backend = CrosstermBackend::new(stdout);
	let mut terminal = Terminal::new(backend)?;

	let result = run_event_loop(&mut terminal, tracker, store);

	disable_raw_mode()?;
	execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
	terminal.show_cursor()?;

	result
}

fn run_event_loop(
	terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
	tracker: &mut Tracker,
	store: &JsonFileStore,
) -> Result<(), Box<dyn Error>> {
	let mut app = App::default();

	// The 250ms poll timeout doubles as the display tick: the elapsed
	// clock is recomputed from `now` on every draw and the timer dies
	// with this loop.
	loop {
		let now = Local::now();
		let view = build_view(&app, tracker, now);
		app.clamp_selection(&view);
		terminal.draw(|frame| draw_dashboard(frame, &app, &view))?;

		if event::poll(StdDuration::from_millis(250))? {
			if let CEvent::Key(key) = event::read()? {
				if key.kind != KeyEventKind::Press {
					continue;
				}

				let should_quit = if matches!(app.mode, InputMode::Prompt(_)) {
					handle_prompt_key(&mut app, key.code, tracker)
				} else if matches!(app.mode, InputMode::Select(_)) {
					handle_select_key(&mut app, key.code, tracker, store)
				} else {
					handle_normal_key(&mut app, key.code, tracker, store, &view)
				};

				if should_quit {
					break;
				}
			}
		}
	}

	Ok(())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FocusPane {
	Calendar,
	Tasks,
	Day,
}

impl FocusPane {
	fn next(&self) -> Self {
		match self {
			FocusPane::Calendar => FocusPane::Tasks,
			FocusPane::Tasks => FocusPane::Day,
			FocusPane::Day => FocusPane::Calendar,
		}
	}

	fn prev(&self) -> Self {
		match self {
			FocusPane::Calendar => FocusPane::Day,
			FocusPane::Tasks => FocusPane::Calendar,
			FocusPane::Day => FocusPane::Tasks,
		}
	}
}

enum InputMode {
	Normal,
	Prompt(PromptState),
	Select(SelectState),
}

#[derive(Clone)]
struct PromptState {
	title: String,
	input: String,
	kind: PromptKind,
}

impl PromptState {
	fn new(title: impl Into<String>, kind: PromptKind) -> Self {
		Self {
			title: title.into(),
			input: String::new(),
			kind,
		}
	}

	fn with_input(title: impl Into<String>, kind: PromptKind, input: String) -> Self {
		Self {
			title: title.into(),
			input,
			kind,
		}
	}
}

#[derive(Clone)]
enum PromptKind {
	AddTaskName,
	EditEntryStart { entry_id: String },
	EditEntryEnd { entry_id: String, start: (u32, u32) },
}

#[derive(Clone)]
struct SelectState {
	title: String,
	kind: SelectKind,
	options: Vec<SelectOption>,
	selected: usize,
}

impl SelectState {
	fn new(title: impl Into<String>, kind: SelectKind, options: Vec<SelectOption>) -> Self {
		Self {
			title: title.into(),
			kind,
			options,
			selected: 0,
		}
	}

	fn move_selection(&mut self, delta: i64) {
		if self.options.is_empty() {
			return;
		}
		let last = self.options.len() as i64 - 1;
		let next = (self.selected as i64 + delta).clamp(0, last);
		self.selected = next as usize;
	}

	fn selected_option(&self) -> Option<&SelectOption> {
		self.options.get(self.selected)
	}
}

#[derive(Clone)]
struct SelectOption {
	label: String,
	value: String,
	style: Style,
}

impl SelectOption {
	fn new(label: impl Into<String>, value: impl Into<String>, style: Style) -> Self {
		Self {
			label: label.into(),
			value: value.into(),
			style,
		}
	}
}

#[derive(Clone)]
enum SelectKind {
	TaskColor { name: String },
	ResumeTask,
	EditEntryTask { entry_id: String, start: (u32, u32), end: (u32, u32) },
	DeleteEntryConfirm { entry_id: String },
	DeleteTaskConfirm { task_id: String },
}

struct App {
	focus: FocusPane,
	mode: InputMode,
	status: String,
	selected_day: NaiveDate,
	calendar_month: NaiveDate,
	task_index: usize,
	day_index: usize,
	period: PeriodKind,
}

impl Default for App {
	fn default() -> Self {
		let today = Local::now().date_naive();
		Self {
			focus: FocusPane::Tasks,
			mode: InputMode::Normal,
			status: "Welcome back".to_string(),
			selected_day: today,
			calendar_month: month_start(today),
			task_index: 0,
			day_index: 0,
			period: PeriodKind::Day,
		}
	}
}

impl App {
	fn clamp_selection(&mut self, view: &ViewModel) {
		if !view.task_rows.is_empty() {
			self.task_index = self.task_index.min(view.task_rows.len() - 1);
		} else {
			self.task_index = 0;
		}
		if !view.day_rows.is_empty() {
			self.day_index = self.day_index.min(view.day_rows.len() - 1);
		} else {
			self.day_index = 0;
		}
	}

	fn shift_selected_day(&mut self, days: i64) {
		self.selected_day = self.selected_day + chrono::Duration::days(days);
		self.calendar_month = month_start(self.selected_day);
	}

	fn shift_selected_period(&mut self, direction: i64) {
		self.selected_day = if direction < 0 {
			previous_period_date(self.selected_day, self.period)
		} else {
			next_period_date(self.selected_day, self.period)
		};
		self.calendar_month = month_start(self.selected_day);
	}

	fn shift_calendar_month(&mut self, direction: i64) {
		let shifted = if direction < 0 {
			previous_period_date(self.calendar_month, PeriodKind::Month)
		} else {
			next_period_date(self.calendar_month, PeriodKind::Month)
		};
		self.calendar_month = month_start(shifted);
	}

	fn move_task_selection(&mut self, delta: i64, view: &ViewModel) {
		move_index(&mut self.task_index, delta, view.task_rows.len());
	}

	fn move_day_selection(&mut self, delta: i64, view: &ViewModel) {
		move_index(&mut self.day_index, delta, view.day_rows.len());
	}
}

fn move_index(index: &mut usize, delta: i64, len: usize) {
	if len == 0 {
		return;
	}
	let last = len as i64 - 1;
	*index = ((*index as i64 + delta).clamp(0, last)) as usize;
}

struct ViewModel {
	active_days: HashSet<NaiveDate>,
	task_rows: Vec<TaskRow>,
	day_rows: Vec<DayEntryRow>,
	day_total: i64,
	session: SessionView,
	stats: StatsView,
}

struct TaskRow {
	task_id: String,
	name: String,
	style: Style,
}

struct DayEntryRow {
	entry_id: String,
	label: String,
	style: Style,
	start_text: String,
	end_text: String,
	duration: i64,
}

struct SessionView {
	clock: String,
	badge: Line<'static>,
	working_since: Option<String>,
}

struct StatsView {
	heading: String,
	total_work: i64,
	total_break: i64,
	prev_work: i64,
	prev_break: i64,
	work_trend: f64,
	break_trend: f64,
	productivity: i64,
	total: i64,
	shares: Vec<ShareRow>,
	hourly: [HourSlot; 24],
	daily: Vec<DailyRow>,
}

struct ShareRow {
	label: String,
	style: Style,
	seconds: i64,
	share: i64,
}

struct DailyRow {
	label: String,
	total: i64,
}

fn build_view(app: &App, tracker: &Tracker, now: DateTime<Local>) -> ViewModel {
	let active_days = tracker
		.entries
		.iter()
		.filter_map(|entry| parse_day_key(&entry.date))
		.collect::<HashSet<_>>();

	let task_rows = tracker
		.tasks
		.iter()
		.map(|task| TaskRow {
			task_id: task.id.clone(),
			name: task.name.clone(),
			style: color_style(&task.color),
		})
		.collect::<Vec<_>>();

	let day_entries = tracker.entries_for_day(app.selected_day);
	let day_total = day_entries.iter().map(|entry| entry.duration).sum();
	let day_rows = day_entries
		.iter()
		.map(|entry| DayEntryRow {
			entry_id: entry.id.clone(),
			label: tracker.task_label(&entry.task_id),
			style: entry_style(tracker, &entry.task_id, entry.is_break),
			start_text: entry.start_time.format("%H:%M").to_string(),
			end_text: entry.end_time.format("%H:%M").to_string(),
			duration: entry.duration,
		})
		.collect::<Vec<_>>();

	ViewModel {
		active_days,
		task_rows,
		day_rows,
		day_total,
		session: build_session_view(tracker, now),
		stats: build_stats_view(app, tracker, now),
	}
}

fn build_session_view(tracker: &Tracker, now: DateTime<Local>) -> SessionView {
	let badge = match tracker.session_state() {
		SessionState::Idle => Line::from(Span::styled(
			"Idle - pick a task and press Enter",
			Style::default().fg(Color::DarkGray),
		)),
		SessionState::Working { task_id } => {
			let style = tracker
				.task(&task_id)
				.map(|task| color_style(&task.color))
				.unwrap_or_default()
				.add_modifier(Modifier::BOLD);
			Line::from(vec![
				Span::raw("Working: "),
				Span::styled(tracker.task_label(&task_id), style),
			])
		}
		SessionState::OnBreak => Line::from(Span::styled(
			"On break",
			Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD),
		)),
	};

	SessionView {
		clock: format_clock(tracker.elapsed(now)),
		badge,
		working_since: tracker
			.work_start()
			.map(|start| format!("working since {}", start.format("%H:%M"))),
	}
}

fn build_stats_view(app: &App, tracker: &Tracker, now: DateTime<Local>) -> StatsView {
	let period_entries = entries_for_period(&tracker.entries, app.selected_day, app.period);
	let mut stats = compute_stats(&period_entries);

	// Fold the open session into the displayed totals, the same way the
	// entry totals fold it in once it closes.
	if let Some(session) = &tracker.active {
		let session_day = session.session_start.date_naive();
		if period_contains(app.selected_day, app.period, session_day) {
			let elapsed = tracker.elapsed(now);
			if session.is_break {
				stats.total_break += elapsed;
			} else {
				stats.total_work += elapsed;
			}
			stats.total += elapsed;
			*stats.task_time.entry(session.task_id.clone()).or_insert(0) += elapsed;
		}
	}

	let previous = previous_period_stats(&tracker.entries, app.selected_day, app.period);

	let mut shares = Vec::new();
	let mut accounted = 0i64;
	for task in &tracker.tasks {
		let seconds = stats.task_time.get(&task.id).copied().unwrap_or(0);
		accounted += seconds;
		if seconds > 0 {
			shares.push(ShareRow {
				label: task.name.clone(),
				style: color_style(&task.color),
				seconds,
				share: share_of(seconds, stats.total),
			});
		}
	}
	let break_seconds = stats.task_time.get(BREAK_TASK_ID).copied().unwrap_or(0);
	let unknown = stats.total - accounted - break_seconds;
	if unknown > 0 {
		shares.push(ShareRow {
			label: "Unknown task".to_string(),
			style: Style::default().fg(Color::DarkGray),
			seconds: unknown,
			share: share_of(unknown, stats.total),
		});
	}
	if break_seconds > 0 {
		shares.push(ShareRow {
			label: "Breaks".to_string(),
			style: color_style(BREAK_COLOR),
			seconds: break_seconds,
			share: share_of(break_seconds, stats.total),
		});
	}

	let daily = if app.period == PeriodKind::Day {
		Vec::new()
	} else {
		daily_breakdown(&period_entries, app.selected_day, app.period)
			.iter()
			.map(|bucket| DailyRow {
				label: match app.period {
					PeriodKind::Week => bucket.date.format("%a").to_string(),
					_ => bucket.date.format("%d").to_string(),
				},
				total: bucket.work + bucket.breaks,
			})
			.collect()
	};

	StatsView {
		heading: format!("{} [{}]", period_label(app.selected_day, app.period), app.period.name()),
		total_work: stats.total_work,
		total_break: stats.total_break,
		prev_work: previous.total_work,
		prev_break: previous.total_break,
		work_trend: trend(stats.total_work, previous.total_work),
		break_trend: trend(stats.total_break, previous.total_break),
		productivity: productivity(&stats),
		total: stats.total,
		shares,
		hourly: hourly_distribution(&period_entries),
		daily,
	}
}

fn share_of(seconds: i64, total: i64) -> i64 {
	if total == 0 {
		return 0;
	}
	(seconds as f64 / total as f64 * 100.0).round() as i64
}

fn entry_style(tracker: &Tracker, task_id: &str, is_break: bool) -> Style {
	if is_break {
		return color_style(BREAK_COLOR);
	}
	tracker
		.task(task_id)
		.map(|task| color_style(&task.color))
		.unwrap_or_else(|| Style::default().fg(Color::DarkGray))
}

fn draw_dashboard(frame: &mut Frame, app: &App, view: &ViewModel) {
	let layout = Layout::default()
		.direction(Direction::Vertical)
		.constraints([Constraint::Length(5), Constraint::Min(12), Constraint::Length(4)])
		.split(frame.area());

	render_session_panel(frame, layout[0], view);

	let body = Layout::default()
		.direction(Direction::Horizontal)
		.constraints([
			Constraint::Percentage(26),
			Constraint::Percentage(40),
			Constraint::Percentage(34),
		])
		.split(layout[1]);

	let left = Layout::default()
		.direction(Direction::Vertical)
		.constraints([Constraint::Length(10), Constraint::Min(6)])
		.split(body[0]);

	render_calendar_panel(frame, left[0], app, &view.active_days);
	render_tasks_panel(frame, left[1], app, view);
	render_day_panel(frame, body[1], app, view);
	render_stats_panel(frame, body[2], view);
	render_footer(frame, layout[2], app);

	if let InputMode::Select(select) = &app.mode {
		render_select_popup(frame, select);
	}
}

fn render_session_panel(frame: &mut Frame, area: Rect, view: &ViewModel) {
	let mut lines = vec![
		Line::from(vec![
			Span::styled("TimeFlow  ", Style::default().add_modifier(Modifier::BOLD)),
			Span::styled(
				view.session.clock.clone(),
				Style::default().fg(Color::White).add_modifier(Modifier::BOLD),
			),
		]),
		view.session.badge.clone(),
	];
	if let Some(since) = &view.session.working_since {
		lines.push(Line::from(Span::styled(
			since.clone(),
			Style::default().fg(Color::Green),
		)));
	}

	let panel = Paragraph::new(lines).block(Block::default().borders(Borders::ALL).title("Session"));
	frame.render_widget(panel, area);
}

fn render_calendar_panel(
	frame: &mut Frame,
	area: Rect,
	app: &App,
	active_days: &HashSet<NaiveDate>,
) {
	let month = app.calendar_month;
	let today = Local::now().date_naive();
	let mut lines = Vec::new();
	lines.push(Line::from(format!("{} {}", month.format("%B"), month.year())));
	lines.push(Line::from("Su Mo Tu We Th Fr Sa"));

	let first_weekday = month.weekday().num_days_from_sunday() as usize;
	let month_days = days_in_month(month);
	let mut day_counter = 1u32;
	for week in 0..6 {
		let mut spans = Vec::new();
		for weekday_index in 0..7 {
			let before_first = week == 0 && weekday_index < first_weekday;
			let after_last = day_counter > month_days;
			if before_first || after_last {
				spans.push(Span::raw("   "));
				continue;
			}

			let date = NaiveDate::from_ymd_opt(month.year(), month.month(), day_counter)
				.expect("calendar day must be valid");
			let mut style = Style::default();
			if date == app.selected_day {
				style = style.fg(Color::Black).bg(Color::Yellow).add_modifier(Modifier::BOLD);
			} else if date == today {
				style = style.fg(Color::Cyan).add_modifier(Modifier::BOLD);
			} else if active_days.contains(&date) {
				style = style.fg(Color::LightYellow).add_modifier(Modifier::BOLD);
			}

			spans.push(Span::styled(format!("{day_counter:>2} "), style));
			day_counter += 1;
		}
		lines.push(Line::from(spans));
	}

	let block = Block::default()
		.borders(Borders::ALL)
		.title("Calendar")
		.border_style(border_style(app.focus == FocusPane::Calendar));
	frame.render_widget(Paragraph::new(lines).block(block), area);
}

fn render_tasks_panel(frame: &mut Frame, area: Rect, app: &App, view: &ViewModel) {
	let items = view
		.task_rows
		.iter()
		.map(|row| {
			ListItem::new(Line::from(vec![
				Span::styled("■ ", row.style),
				Span::raw(row.name.clone()),
			]))
		})
		.collect::<Vec<_>>();

	let mut state = ListState::default();
	if !view.task_rows.is_empty() {
		state.select(Some(app.task_index.min(view.task_rows.len() - 1)));
	}

	let block = Block::default()
		.borders(Borders::ALL)
		.title("Tasks")
		.border_style(border_style(app.focus == FocusPane::Tasks));
	let list = List::new(if items.is_empty() {
		vec![ListItem::new("(no tasks - press 'a')")]
	} else {
		items
	})
	.block(block)
	.highlight_style(Style::default().bg(HIGHLIGHT_BACKGROUND_COLOR).add_modifier(Modifier::BOLD));

	frame.render_stateful_widget(list, area, &mut state);
}

fn render_day_panel(frame: &mut Frame, area: Rect, app: &App, view: &ViewModel) {
	let mut items = view
		.day_rows
		.iter()
		.map(|row| {
			ListItem::new(Line::from(vec![
				Span::styled("▌ ", row.style),
				Span::raw(format!("{} -> {} ", row.start_text, row.end_text)),
				Span::styled(
					format!("{:>7} ", format_duration(row.duration)),
					Style::default().add_modifier(Modifier::BOLD),
				),
				Span::styled(row.label.clone(), row.style),
			]))
		})
		.collect::<Vec<_>>();

	if items.is_empty() {
		items.push(ListItem::new("(no entries for selected day)"));
	}

	let mut state = ListState::default();
	if !view.day_rows.is_empty() {
		state.select(Some(app.day_index.min(view.day_rows.len() - 1)));
	}

	let title = format!(
		"{} | {} entries | {}",
		app.selected_day.format("%A, %d %B %Y"),
		view.day_rows.len(),
		format_duration(view.day_total)
	);
	let list = List::new(items)
		.block(
			Block::default()
				.borders(Borders::ALL)
				.title(title)
				.border_style(border_style(app.focus == FocusPane::Day)),
		)
		.highlight_style(Style::default().bg(HIGHLIGHT_BACKGROUND_COLOR).add_modifier(Modifier::BOLD));

	frame.render_stateful_widget(list, area, &mut state);
}

fn render_stats_panel(frame: &mut Frame, area: Rect, view: &ViewModel) {
	let stats = &view.stats;
	let mut lines = Vec::new();
	lines.push(Line::from(stats.heading.clone()));
	lines.push(trend_line("Work:  ", stats.total_work, stats.prev_work, stats.work_trend));
	lines.push(trend_line("Break: ", stats.total_break, stats.prev_break, stats.break_trend));
	lines.push(Line::from(format!("Productivity: {}%", stats.productivity)));

	if stats.total == 0 {
		lines.push(Line::from(""));
		lines.push(Line::from("(no data for this period)"));
	} else {
		lines.push(Line::from(""));
		lines.push(Line::from("By task"));
		for row in &stats.shares {
			lines.push(Line::from(vec![
				Span::styled("■ ", row.style),
				Span::raw(format!(
					"{:<16} {:>3}% {:>8}",
					row.label,
					row.share,
					format_duration(row.seconds)
				)),
			]));
		}

		lines.push(Line::from(""));
		lines.push(Line::from("Hourly activity"));
		let max_hour = stats
			.hourly
			.iter()
			.map(|slot| slot.work + slot.breaks)
			.max()
			.unwrap_or(0)
			.max(1);
		for (hour, slot) in stats.hourly.iter().enumerate() {
			let total = slot.work + slot.breaks;
			if total == 0 {
				continue;
			}
			let width = ((total as f64 / max_hour as f64) * 16.0).round() as usize;
			lines.push(Line::from(format!(
				"{hour:02} {:>8} {}",
				format_duration(total),
				"=".repeat(width.max(1))
			)));
		}

		if !stats.daily.is_empty() {
			lines.push(Line::from(""));
			lines.push(Line::from("Daily breakdown"));
			let max_day = stats
				.daily
				.iter()
				.map(|row| row.total)
				.max()
				.unwrap_or(0)
				.max(1);
			for row in &stats.daily {
				if row.total == 0 {
					continue;
				}
				let width = ((row.total as f64 / max_day as f64) * 16.0).round() as usize;
				lines.push(Line::from(format!(
					"{:<3} {:>8} {}",
					row.label,
					format_duration(row.total),
					"=".repeat(width.max(1))
				)));
			}
		}
	}

	let panel = Paragraph::new(lines).block(Block::default().borders(Borders::ALL).title("Analytics"));
	frame.render_widget(panel, area);
}

fn trend_line(label: &str, current: i64, previous: i64, trend_value: f64) -> Line<'static> {
	let mut spans = vec![
		Span::raw(label.to_string()),
		Span::styled(
			format!("{:>8}", format_duration(current)),
			Style::default().add_modifier(Modifier::BOLD),
		),
	];

	// No previous data means no trend, not a 0% trend.
	if previous > 0 {
		let style = if trend_value > 0.0 {
			Style::default().fg(Color::Green)
		} else if trend_value < 0.0 {
			Style::default().fg(Color::Red)
		} else {
			Style::default().fg(Color::DarkGray)
		};
		spans.push(Span::styled(
			format!(
				"  {}{:.0}% vs prev",
				if trend_value > 0.0 { "+" } else { "" },
				trend_value
			),
			style,
		));
	}

	Line::from(spans)
}

fn render_footer(frame: &mut Frame, area: Rect, app: &App) {
	let footer_lines = match &app.mode {
		InputMode::Normal => vec![
			Line::from(
				"Tab pane | arrows/hjkl navigate | Enter/space start or resume | b break | f finish day",
			),
			Line::from(
				"a add task | D delete task | e/d edit/delete entry | p period | [/] shift period | n/N month | t today | q quit",
			),
			Line::from(app.status.clone()),
		],
		InputMode::Prompt(prompt) => vec![
			Line::from(prompt.title.clone()),
			Line::from(format!("> {}", prompt.input)),
			Line::from("Enter submit | Esc cancel"),
		],
		InputMode::Select(select) => vec![
			Line::from(select.title.clone()),
			Line::from(format!(
				"Selected: {}",
				select
					.selected_option()
					.map(|option| option.label.as_str())
					.unwrap_or("(none)")
			)),
			Line::from("j/k or arrows move | Enter choose | Esc cancel"),
		],
	};

	let footer = Paragraph::new(footer_lines).block(Block::default().borders(Borders::ALL).title("Shortcuts"));
	frame.render_widget(footer, area);
}

fn render_select_popup(frame: &mut Frame, select: &SelectState) {
	let area = centered_rect(62, 55, frame.area());
	frame.render_widget(Clear, area);

	let items = if select.options.is_empty() {
		vec![ListItem::new("(no choices)")]
	} else {
		select
			.options
			.iter()
			.map(|option| ListItem::new(option.label.clone()).style(option.style))
			.collect::<Vec<_>>()
	};

	let current = if select.options.is_empty() {
		0
	} else {
		select.selected.saturating_add(1)
	};
	let total = select.options.len();
	let list = List::new(items)
		.block(
			Block::default()
				.borders(Borders::ALL)
				.title(format!("{} ({current}/{total})", select.title)),
		)
		.highlight_symbol(">> ")
		.highlight_style(Style::default().bg(HIGHLIGHT_BACKGROUND_COLOR));

	let mut state = ListState::default();
	if !select.options.is_empty() {
		state.select(Some(select.selected.min(select.options.len().saturating_sub(1))));
	}
	frame.render_stateful_widget(list, area, &mut state);
}

fn centered_rect(percent_x: u16, percent_y: u16, area: Rect) -> Rect {
	let popup_layout = Layout::default()
		.direction(Direction::Vertical)
		.constraints([
			Constraint::Percentage((100 - percent_y) / 2),
			Constraint::Percentage(percent_y),
			Constraint::Percentage((100 - percent_y) / 2),
		])
		.split(area);
	Layout::default()
		.direction(Direction::Horizontal)
		.constraints([
			Constraint::Percentage((100 - percent_x) / 2),
			Constraint::Percentage(percent_x),
			Constraint::Percentage((100 - percent_x) / 2),
		])
		.split(popup_layout[1])[1]
}

fn handle_normal_key(
	app: &mut App,
	code: KeyCode,
	tracker: &mut Tracker,
	store: &JsonFileStore,
	view: &ViewModel,
) -> bool {
	match code {
		KeyCode::Char('q') | KeyCode::Esc => true,
		KeyCode::Tab => {
			app.focus = app.focus.next();
			false
		}
		KeyCode::BackTab => {
			app.focus = app.focus.prev();
			false
		}
		KeyCode::Up | KeyCode::Char('k') => {
			match app.focus {
				FocusPane::Calendar => app.shift_selected_day(-7),
				FocusPane::Tasks => app.move_task_selection(-1, view),
				FocusPane::Day => app.move_day_selection(-1, view),
			}
			false
		}
		KeyCode::Down | KeyCode::Char('j') => {
			match app.focus {
				FocusPane::Calendar => app.shift_selected_day(7),
				FocusPane::Tasks => app.move_task_selection(1, view),
				FocusPane::Day => app.move_day_selection(1, view),
			}
			false
		}
		KeyCode::Left | KeyCode::Char('h') => {
			if app.focus == FocusPane::Calendar {
				app.shift_selected_day(-1);
			}
			false
		}
		KeyCode::Right | KeyCode::Char('l') => {
			if app.focus == FocusPane::Calendar {
				app.shift_selected_day(1);
			}
			false
		}
		KeyCode::Char('n') => {
			app.shift_calendar_month(1);
			false
		}
		KeyCode::Char('N') => {
			app.shift_calendar_month(-1);
			false
		}
		KeyCode::Char('t') => {
			let today = Local::now().date_naive();
			app.selected_day = today;
			app.calendar_month = month_start(today);
			false
		}
		KeyCode::Char('p') => {
			app.period = app.period.next();
			app.status = format!("period: {}", app.period.name());
			false
		}
		KeyCode::Char('[') => {
			app.shift_selected_period(-1);
			false
		}
		KeyCode::Char(']') => {
			app.shift_selected_period(1);
			false
		}
		KeyCode::Enter | KeyCode::Char(' ') => {
			if app.focus == FocusPane::Tasks {
				start_selected_task(app, tracker, store, view);
			}
			false
		}
		KeyCode::Char('b') => {
			match tracker.session_state() {
				SessionState::Working { .. } => {
					tracker.start_break(Local::now());
					app.status = persist_status(store, tracker, "break started".to_string());
				}
				SessionState::OnBreak => app.status = "already on break".to_string(),
				SessionState::Idle => app.status = "not tracking".to_string(),
			}
			false
		}
		KeyCode::Char('f') => {
			if tracker.session_state() == SessionState::Idle {
				app.status = "nothing to finish".to_string();
			} else {
				tracker.finish_work(Local::now());
				app.status = persist_status(store, tracker, "day finished".to_string());
			}
			false
		}
		KeyCode::Char('r') => {
			if tracker.session_state() != SessionState::OnBreak {
				app.status = "not on break".to_string();
			} else {
				match build_resume_select(tracker) {
					Ok(select) => app.mode = InputMode::Select(select),
					Err(err) => app.status = err,
				}
			}
			false
		}
		KeyCode::Char('a') => {
			app.mode = InputMode::Prompt(PromptState::new("Task name", PromptKind::AddTaskName));
			false
		}
		KeyCode::Char('D') => {
			if app.focus != FocusPane::Tasks {
				app.status = "Focus the Tasks pane to delete a task".to_string();
				return false;
			}
			let Some(row) = view.task_rows.get(app.task_index) else {
				app.status = "No selected task to delete".to_string();
				return false;
			};
			app.mode = InputMode::Select(build_delete_task_select(row));
			false
		}
		KeyCode::Char('e') => {
			if app.focus != FocusPane::Day {
				app.status = "Focus the Day view to edit an entry".to_string();
				return false;
			}
			let Some(row) = view.day_rows.get(app.day_index) else {
				app.status = "No selected entry to edit".to_string();
				return false;
			};
			app.mode = InputMode::Prompt(PromptState::with_input(
				"Start time (HH:MM)",
				PromptKind::EditEntryStart {
					entry_id: row.entry_id.clone(),
				},
				row.start_text.clone(),
			));
			false
		}
		KeyCode::Char('d') => {
			if app.focus != FocusPane::Day {
				app.status = "Focus the Day view to delete an entry".to_string();
				return false;
			}
			let Some(row) = view.day_rows.get(app.day_index) else {
				app.status = "No selected entry to delete".to_string();
				return false;
			};
			app.mode = InputMode::Select(build_delete_entry_select(row));
			false
		}
		_ => false,
	}
}

fn start_selected_task(app: &mut App, tracker: &mut Tracker, store: &JsonFileStore, view: &ViewModel) {
	let Some(row) = view.task_rows.get(app.task_index) else {
		app.status = "No task selected".to_string();
		return;
	};

	match tracker.session_state() {
		SessionState::OnBreak => {
			tracker.end_break(&row.task_id, Local::now());
			app.status = persist_status(store, tracker, format!("resumed {}", row.name));
		}
		SessionState::Working { task_id } if task_id == row.task_id => {
			app.status = format!("already working on {}", row.name);
		}
		SessionState::Working { .. } => {
			app.status = "take a break (b) or finish the day (f) before switching".to_string();
		}
		SessionState::Idle => {
			tracker.start_work(&row.task_id, Local::now());
			app.status = persist_status(store, tracker, format!("started {}", row.name));
		}
	}
}

fn handle_prompt_key(app: &mut App, code: KeyCode, tracker: &Tracker) -> bool {
	match code {
		KeyCode::Esc => {
			app.mode = InputMode::Normal;
			app.status = "Input cancelled".to_string();
		}
		KeyCode::Backspace => {
			if let InputMode::Prompt(prompt) = &mut app.mode {
				prompt.input.pop();
			}
		}
		KeyCode::Char(value) => {
			if let InputMode::Prompt(prompt) = &mut app.mode {
				prompt.input.push(value);
			}
		}
		KeyCode::Enter => {
			let prompt = match std::mem::replace(&mut app.mode, InputMode::Normal) {
				InputMode::Prompt(prompt) => prompt,
				InputMode::Normal | InputMode::Select(_) => return false,
			};

			match submit_prompt(prompt.clone(), tracker) {
				Ok(PromptOutcome::NextPrompt(next_prompt)) => app.mode = InputMode::Prompt(next_prompt),
				Ok(PromptOutcome::Select(select)) => app.mode = InputMode::Select(select),
				Err(err) => {
					app.mode = InputMode::Prompt(prompt);
					app.status = format!("error: {err}");
				}
			}
		}
		_ => {}
	}

	false
}

fn handle_select_key(
	app: &mut App,
	code: KeyCode,
	tracker: &mut Tracker,
	store: &JsonFileStore,
) -> bool {
	match code {
		KeyCode::Esc => {
			app.mode = InputMode::Normal;
			app.status = "Selection cancelled".to_string();
		}
		KeyCode::Up | KeyCode::Char('k') => {
			if let InputMode::Select(select) = &mut app.mode {
				select.move_selection(-1);
			}
		}
		KeyCode::Down | KeyCode::Char('j') => {
			if let InputMode::Select(select) = &mut app.mode {
				select.move_selection(1);
			}
		}
		KeyCode::Enter => {
			let select = match std::mem::replace(&mut app.mode, InputMode::Normal) {
				InputMode::Select(select) => select,
				_ => return false,
			};

			match submit_select(select.clone(), tracker, store) {
				Ok(message) => {
					app.mode = InputMode::Normal;
					app.status = message;
				}
				Err(err) => {
					app.mode = InputMode::Select(select);
					app.status = format!("error: {err}");
				}
			}
		}
		_ => {}
	}

	false
}

enum PromptOutcome {
	NextPrompt(PromptState),
	Select(SelectState),
}

fn submit_prompt(prompt: PromptState, tracker: &Tracker) -> Result<PromptOutcome, String> {
	match prompt.kind {
		PromptKind::AddTaskName => {
			let name = required_text(&prompt.input, "task name")?;
			Ok(PromptOutcome::Select(build_task_color_select(name)))
		}
		PromptKind::EditEntryStart { entry_id } => {
			let start = parse_clock(&prompt.input)?;
			let end_text = tracker
				.entries
				.iter()
				.find(|entry| entry.id == entry_id)
				.map(|entry| entry.end_time.format("%H:%M").to_string())
				.ok_or_else(|| "entry no longer exists".to_string())?;
			Ok(PromptOutcome::NextPrompt(PromptState::with_input(
				"End time (HH:MM)",
				PromptKind::EditEntryEnd { entry_id, start },
				end_text,
			)))
		}
		PromptKind::EditEntryEnd { entry_id, start } => {
			let end = parse_clock(&prompt.input)?;
			Ok(PromptOutcome::Select(build_edit_task_select(
				tracker, entry_id, start, end,
			)))
		}
	}
}

fn submit_select(
	select: SelectState,
	tracker: &mut Tracker,
	store: &JsonFileStore,
) -> Result<String, String> {
	let selected_value = select
		.selected_option()
		.map(|option| option.value.clone())
		.ok_or_else(|| "no option selected".to_string())?;

	match select.kind {
		SelectKind::TaskColor { name } => {
			let task_id = tracker.add_task(&name, &selected_value)?;
			let created = tracker.task_label(&task_id);
			Ok(persist_status(store, tracker, format!("created task: {created}")))
		}
		SelectKind::ResumeTask => {
			tracker.end_break(&selected_value, Local::now());
			let resumed = tracker.task_label(&selected_value);
			Ok(persist_status(store, tracker, format!("resumed {resumed}")))
		}
		SelectKind::EditEntryTask { entry_id, start, end } => {
			tracker.edit_entry(&entry_id, start, end, &selected_value);
			Ok(persist_status(store, tracker, "entry updated".to_string()))
		}
		SelectKind::DeleteEntryConfirm { entry_id } => {
			if selected_value == "delete" {
				tracker.delete_entry(&entry_id);
				Ok(persist_status(store, tracker, "entry deleted".to_string()))
			} else {
				Ok("Delete cancelled".to_string())
			}
		}
		SelectKind::DeleteTaskConfirm { task_id } => {
			if selected_value == "delete" {
				let name = tracker.task_label(&task_id);
				tracker.delete_task(&task_id);
				Ok(persist_status(store, tracker, format!("deleted task: {name}")))
			} else {
				Ok("Delete cancelled".to_string())
			}
		}
	}
}

// A failed save never rolls the in-memory mutation back; it only shows up
// in the status line.
fn persist_status(store: &JsonFileStore, tracker: &Tracker, message: String) -> String {
	match store.save(&tracker.snapshot()) {
		Ok(()) => message,
		Err(err) => format!("{message} (warning: save failed: {err})"),
	}
}

fn build_task_color_select(name: String) -> SelectState {
	let options = TASK_COLORS
		.iter()
		.map(|color| {
			SelectOption::new(
				"████████████████".to_string(),
				color.to_string(),
				color_style(color),
			)
		})
		.collect::<Vec<_>>();

	SelectState::new("Select task color", SelectKind::TaskColor { name }, options)
}

fn build_resume_select(tracker: &Tracker) -> Result<SelectState, String> {
	if tracker.tasks.is_empty() {
		return Err("no tasks found. Press 'a' to create one first".to_string());
	}

	let options = tracker
		.tasks
		.iter()
		.map(|task| SelectOption::new(task.name.clone(), task.id.clone(), color_style(&task.color)))
		.collect::<Vec<_>>();

	Ok(SelectState::new("Resume work on", SelectKind::ResumeTask, options))
}

fn build_edit_task_select(
	tracker: &Tracker,
	entry_id: String,
	start: (u32, u32),
	end: (u32, u32),
) -> SelectState {
	let mut options = vec![SelectOption::new(
		"Break",
		BREAK_TASK_ID.to_string(),
		color_style(BREAK_COLOR),
	)];
	for task in &tracker.tasks {
		options.push(SelectOption::new(
			task.name.clone(),
			task.id.clone(),
			color_style(&task.color),
		));
	}

	SelectState::new(
		"Select entry task",
		SelectKind::EditEntryTask { entry_id, start, end },
		options,
	)
}

fn build_delete_entry_select(row: &DayEntryRow) -> SelectState {
	let title = format!(
		"Delete entry? {} {}-{}",
		row.label, row.start_text, row.end_text
	);
	let options = vec![
		SelectOption::new(
			"Delete",
			"delete".to_string(),
			Style::default().fg(Color::LightRed).add_modifier(Modifier::BOLD),
		),
		SelectOption::new("Cancel", "cancel".to_string(), Style::default()),
	];

	let mut select = SelectState::new(
		title,
		SelectKind::DeleteEntryConfirm {
			entry_id: row.entry_id.clone(),
		},
		options,
	);
	// Default to cancel to prevent accidental deletions.
	select.selected = 1;
	select
}

fn build_delete_task_select(row: &TaskRow) -> SelectState {
	let options = vec![
		SelectOption::new(
			"Delete",
			"delete".to_string(),
			Style::default().fg(Color::LightRed).add_modifier(Modifier::BOLD),
		),
		SelectOption::new("Cancel", "cancel".to_string(), Style::default()),
	];

	let mut select = SelectState::new(
		format!("Delete task? {} (entries keep their history)", row.name),
		SelectKind::DeleteTaskConfirm {
			task_id: row.task_id.clone(),
		},
		options,
	);
	select.selected = 1;
	select
}

fn required_text(input: &str, label: &str) -> Result<String, String> {
	let trimmed = input.trim();
	if trimmed.is_empty() {
		return Err(format!("{label} cannot be empty"));
	}
	Ok(trimmed.to_string())
}

fn border_style(focused: bool) -> Style {
	if focused {
		Style::default().fg(FOCUSED_PANEL_BORDER_COLOR)
	} else {
		Style::default().fg(INACTIVE_PANEL_BORDER_COLOR)
	}
}

fn color_style(token: &str) -> Style {
	let color = match token {
		"black" => Color::Black,
		"red" => Color::Red,
		"green" => Color::Green,
		"yellow" => Color::Yellow,
		"blue" => Color::Blue,
		"magenta" => Color::Magenta,
		"cyan" => Color::Cyan,
		"gray" => Color::Gray,
		"dark_gray" => Color::DarkGray,
		"light_red" => Color::LightRed,
		"light_green" => Color::LightGreen,
		"light_yellow" => Color::LightYellow,
		"light_blue" => Color::LightBlue,
		"light_magenta" => Color::LightMagenta,
		"light_cyan" => Color::LightCyan,
		"white" => Color::White,
		_ => return Style::default(),
	};
	Style::default().fg(color)
}
