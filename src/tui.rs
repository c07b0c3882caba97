use anyhow::Result;
use crossterm::{
    event::{self, Event, KeyCode, KeyEventKind},
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
    ExecutableCommand,
};
use ratatui::{
    prelude::*,
    widgets::{Block, Borders, List, ListItem, ListState, Paragraph, Wrap},
};
use std::io::stdout;

use crate::api::ApiClient;
use crate::app::App;
use crate::models::Job;
use crate::notify::{Notice, Recorder};
use crate::pipeline::{Board, JobStatus};

/// Job ids in board order: grouped by status in pipeline order.
fn board_order(jobs: &[Job]) -> Vec<String> {
    Board::from_jobs(jobs)
        .iter()
        .flat_map(|(_, bucket)| bucket.iter().map(|job| job.id.clone()).collect::<Vec<_>>())
        .collect()
}

struct BoardState {
    ids: Vec<String>,
    selected: usize,
    scroll_offset: u16,
}

impl BoardState {
    fn new(jobs: &[Job]) -> Self {
        Self {
            ids: board_order(jobs),
            selected: 0,
            scroll_offset: 0,
        }
    }

    fn current_id(&self) -> Option<&str> {
        self.ids.get(self.selected).map(String::as_str)
    }

    /// Re-sorts after the cache changed, keeping the cursor on the same job
    /// when it is still there.
    fn rebuild(&mut self, jobs: &[Job]) {
        let keep = self.current_id().map(str::to_string);
        self.ids = board_order(jobs);
        self.selected = keep
            .and_then(|id| self.ids.iter().position(|i| *i == id))
            .unwrap_or(0)
            .min(self.ids.len().saturating_sub(1));
    }

    fn next(&mut self) {
        if !self.ids.is_empty() && self.selected < self.ids.len() - 1 {
            self.selected += 1;
            self.scroll_offset = 0;
        }
    }

    fn prev(&mut self) {
        if self.selected > 0 {
            self.selected -= 1;
            self.scroll_offset = 0;
        }
    }

    fn scroll_down(&mut self) {
        self.scroll_offset = self.scroll_offset.saturating_add(3);
    }

    fn scroll_up(&mut self) {
        self.scroll_offset = self.scroll_offset.saturating_sub(3);
    }
}

fn status_color(status: JobStatus) -> Color {
    match status {
        JobStatus::Applied => Color::Cyan,
        JobStatus::Interview => Color::Yellow,
        JobStatus::Offered => Color::Green,
        JobStatus::Rejected => Color::Red,
    }
}

fn move_key(code: KeyCode) -> Option<JobStatus> {
    match code {
        KeyCode::Char('a') => Some(JobStatus::Applied),
        KeyCode::Char('i') => Some(JobStatus::Interview),
        KeyCode::Char('o') => Some(JobStatus::Offered),
        KeyCode::Char('x') => Some(JobStatus::Rejected),
        _ => None,
    }
}

/// Interactive pipeline board. `app` must have been built with `recorder` as
/// its notifier so confirmations land in the footer instead of stdout.
pub fn run_board(app: &mut App<'_, ApiClient>, recorder: &Recorder) -> Result<()> {
    if app.jobs().list().is_empty() {
        println!("No jobs found.");
        return Ok(());
    }

    let mut state = BoardState::new(app.jobs().list());

    enable_raw_mode()?;
    stdout().execute(EnterAlternateScreen)?;
    let mut terminal = Terminal::new(CrosstermBackend::new(stdout()))?;

    let result = run_loop(&mut terminal, &mut state, app, recorder);

    disable_raw_mode()?;
    stdout().execute(LeaveAlternateScreen)?;

    result
}

fn run_loop(
    terminal: &mut Terminal<CrosstermBackend<std::io::Stdout>>,
    state: &mut BoardState,
    app: &mut App<'_, ApiClient>,
    recorder: &Recorder,
) -> Result<()> {
    let mut list_state = ListState::default();
    list_state.select(Some(0));

    loop {
        terminal.draw(|frame| draw(frame, state, app.jobs().list(), recorder.last(), &mut list_state))?;

        if let Event::Key(key) = event::read()? {
            if key.kind != KeyEventKind::Press {
                continue;
            }
            match key.code {
                KeyCode::Char('q') | KeyCode::Esc => break,
                KeyCode::Down | KeyCode::Char('j') => state.next(),
                KeyCode::Up | KeyCode::Char('k') => state.prev(),
                KeyCode::Char('J') | KeyCode::PageDown => state.scroll_down(),
                KeyCode::Char('K') | KeyCode::PageUp => state.scroll_up(),
                KeyCode::Char('r') => {
                    if let Err(e) = app.load_jobs() {
                        if e.is_auth() {
                            return Err(e.into());
                        }
                    }
                    state.rebuild(app.jobs().list());
                }
                code => {
                    let (Some(status), Some(id)) = (move_key(code), state.current_id()) else {
                        continue;
                    };
                    let id = id.to_string();
                    // The cache only changes once the backend confirms.
                    if let Err(e) = app.move_job(&id, status) {
                        if e.is_auth() {
                            return Err(e.into());
                        }
                    }
                    state.rebuild(app.jobs().list());
                }
            }
            list_state.select(Some(state.selected));
        }
    }
    Ok(())
}

fn draw(
    frame: &mut Frame,
    state: &BoardState,
    jobs: &[Job],
    notice: Option<Notice>,
    list_state: &mut ListState,
) {
    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Min(0), Constraint::Length(1), Constraint::Length(1)])
        .split(frame.area());

    let chunks = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(40), Constraint::Percentage(60)])
        .split(rows[0]);

    let board = Board::from_jobs(jobs);
    let counts: Vec<String> = JobStatus::ALL
        .iter()
        .map(|status| format!("{} {}", status.label(), board.count(*status)))
        .collect();

    let items: Vec<ListItem> = state
        .ids
        .iter()
        .filter_map(|id| jobs.iter().find(|job| job.id == *id))
        .map(|job| {
            ListItem::new(Line::from(vec![
                Span::styled(
                    format!("{:<10}", job.status.label()),
                    Style::default().fg(status_color(job.status)),
                ),
                Span::raw(format!(
                    "{} | {}",
                    crate::truncate(&job.company, 18),
                    crate::truncate(&job.role, 22)
                )),
            ]))
        })
        .collect();

    let list = List::new(items)
        .block(
            Block::default()
                .borders(Borders::ALL)
                .title(format!(" {} jobs: {} ", board.total(), counts.join("  "))),
        )
        .highlight_style(Style::default().bg(Color::DarkGray).add_modifier(Modifier::BOLD))
        .highlight_symbol("> ");

    frame.render_stateful_widget(list, chunks[0], list_state);

    let current = state
        .current_id()
        .and_then(|id| jobs.iter().find(|job| job.id == id));
    let detail_widget = Paragraph::new(build_detail(current))
        .block(Block::default().borders(Borders::ALL).title(" Detail "))
        .wrap(Wrap { trim: false })
        .scroll((state.scroll_offset, 0));

    frame.render_widget(detail_widget, chunks[1]);

    let message = match notice {
        Some(Notice::Success(text)) => Paragraph::new(format!(" {}", text)).style(Style::default().fg(Color::Green)),
        Some(Notice::Failure(text)) => Paragraph::new(format!(" {}", text)).style(Style::default().fg(Color::Red)),
        None => Paragraph::new(""),
    };
    frame.render_widget(message, rows[1]);

    let help = Paragraph::new(
        " j/k:navigate  J/K:scroll  a:applied i:interview o:offered x:rejected  r:reload  q:quit",
    )
    .style(Style::default().fg(Color::DarkGray));
    frame.render_widget(help, rows[2]);
}

fn build_detail(job: Option<&Job>) -> Text<'_> {
    let Some(job) = job else {
        return Text::raw("No job selected");
    };

    let mut lines: Vec<Line> = Vec::new();

    lines.push(Line::from(Span::styled(
        &job.role,
        Style::default().add_modifier(Modifier::BOLD),
    )));
    lines.push(Line::from(format!("at {}", job.company)));
    lines.push(Line::from(Span::styled(
        format!("Status: {}", job.status.label()),
        Style::default().fg(status_color(job.status)),
    )));
    lines.push(Line::from(""));

    if !job.pay.is_empty() {
        lines.push(Line::from(format!("Pay: {}", job.pay)));
    }
    lines.push(Line::from(format!("Applied: {}", job.date_applied)));
    if let Some(date) = job.interview_date {
        lines.push(Line::from(format!("Interview: {}", date)));
    }
    if let Some(job_type) = job.job_type {
        lines.push(Line::from(format!("Type: {}", job_type.as_str())));
    }
    lines.push(Line::from(format!("Mode: {}", job.mode.as_str())));

    if !job.notes.is_empty() {
        lines.push(Line::from(""));
        lines.push(Line::from(Span::styled(
            "Notes",
            Style::default().add_modifier(Modifier::BOLD),
        )));
        for line in textwrap::fill(&job.notes, 60).lines() {
            lines.push(Line::from(format!("  {}", line)));
        }
    }

    Text::from(lines)
}
