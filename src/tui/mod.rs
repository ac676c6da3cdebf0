//! TUI module - Exercise list and timer screen with ratatui

use std::io::{Stdout, stdout};
use std::sync::mpsc::{self, Receiver};
use std::time::Duration;

use anyhow::Result;
use chrono::{DateTime, Utc};
use crossterm::{
    ExecutableCommand,
    event::{self, Event, KeyCode, KeyEventKind},
    terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode},
};
use ratatui::{
    prelude::*,
    widgets::{Block, Borders, Cell, Gauge, Paragraph, Row, Table, TableState, Wrap},
};
use tracing::{error, info};

use crate::db::{Database, Progress};
use crate::exercises::Exercise;
use crate::settings::Settings;
use crate::timer::{Lifecycle, Phase, SystemClock, TimerEngine, TimerEvent, TimerSnapshot};

type Tui = Terminal<CrosstermBackend<Stdout>>;

/// Exercise screen: owns the engine for one attempt
struct TimerScreen {
    exercise: Exercise,
    engine: TimerEngine<SystemClock>,
    events: Receiver<TimerEvent>,
    started_at: Option<DateTime<Utc>>,
    log: Vec<String>,
}

impl TimerScreen {
    fn new(exercise: Exercise, settings: &Settings) -> Result<Self> {
        let config = exercise.timer_config(settings)?;
        let (tx, events) = mpsc::channel();
        Ok(Self {
            exercise,
            engine: TimerEngine::new(config, SystemClock, tx),
            events,
            started_at: None,
            log: Vec::new(),
        })
    }

    fn toggle(&mut self) {
        match self.engine.lifecycle() {
            Lifecycle::Inactive => {
                self.started_at = Some(Utc::now());
                self.log.clear();
                self.engine.start();
            }
            Lifecycle::Running => self.engine.pause(),
            Lifecycle::Paused => self.engine.resume(),
            Lifecycle::Completed => {}
        }
    }
}

enum Screen {
    List,
    Timer(Box<TimerScreen>),
}

/// App state for TUI
pub struct App {
    db: Database,
    settings: Settings,
    exercises: Vec<Exercise>,
    table: TableState,
    screen: Screen,
    status: Option<String>,
    should_quit: bool,
}

impl App {
    pub fn new(db: Database) -> Result<Self> {
        let exercises = db.get_exercises(None)?;
        let settings = db.load_settings()?;
        let mut table = TableState::default();
        if !exercises.is_empty() {
            table.select(Some(0));
        }
        Ok(Self {
            db,
            settings,
            exercises,
            table,
            screen: Screen::List,
            status: None,
            should_quit: false,
        })
    }

    /// Run the TUI application
    pub fn run(&mut self) -> Result<()> {
        let mut terminal = init_terminal()?;
        let result = self.event_loop(&mut terminal);
        restore_terminal()?;
        result
    }

    fn event_loop(&mut self, terminal: &mut Tui) -> Result<()> {
        while !self.should_quit {
            // The loop is the timer's only tick source
            if let Screen::Timer(timer) = &mut self.screen {
                timer.engine.tick();
            }
            self.drain_timer_events();

            terminal.draw(|frame| self.render(frame))?;
            self.handle_events()?;
        }
        Ok(())
    }

    fn drain_timer_events(&mut self) {
        let Screen::Timer(timer) = &mut self.screen else {
            return;
        };

        let mut completed = false;
        while let Ok(event) = timer.events.try_recv() {
            let line = match event {
                TimerEvent::SetComplete { set } => format!("set {} done", set),
                TimerEvent::SideChange { side } => format!("switch to {} side", side.label()),
                TimerEvent::Complete => {
                    completed = true;
                    "exercise complete".to_string()
                }
            };
            timer.log.push(line);
        }

        if completed {
            let Some(exercise_id) = timer.exercise.id else {
                return;
            };
            let duration_secs = timer
                .started_at
                .map(|t| (Utc::now() - t).num_seconds() as i32);
            let progress = Progress {
                id: None,
                exercise_id,
                completed_sets: timer.engine.snapshot().completed_sets as i32,
                completed_at: Utc::now(),
                duration_secs,
            };
            match self.db.add_progress(&progress) {
                Ok(_) => {
                    info!(exercise = %timer.exercise.name, "progress recorded");
                    self.status = Some(format!("Logged: {}", timer.exercise.name));
                }
                Err(e) => {
                    error!("Failed to record progress: {}", e);
                    self.status = Some(format!("Failed to record progress: {}", e));
                }
            }
        }
    }

    fn render(&mut self, frame: &mut Frame) {
        let area = frame.area();

        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(3),
                Constraint::Min(10),
                Constraint::Length(3),
            ])
            .split(area);

        // Header
        let header = Paragraph::new("physio - Rehab Exercise Tracker")
            .style(Style::default().fg(Color::Cyan).bold())
            .block(Block::default().borders(Borders::ALL));
        frame.render_widget(header, chunks[0]);

        let footer_text = if let Screen::Timer(timer) = &self.screen {
            render_timer(frame, chunks[1], timer);
            "space: start/pause | s: skip | n: next set | r: reset | esc: back"
        } else {
            render_list(frame, chunks[1], &self.exercises, &mut self.table);
            "q: quit | enter: start | j/k: move | r: refresh"
        };

        // Footer
        let footer = match &self.status {
            Some(status) => format!("{} | {}", status, footer_text),
            None => footer_text.to_string(),
        };
        let footer = Paragraph::new(footer)
            .style(Style::default().fg(Color::DarkGray))
            .block(Block::default().borders(Borders::ALL));
        frame.render_widget(footer, chunks[2]);
    }

    fn handle_events(&mut self) -> Result<()> {
        if event::poll(Duration::from_millis(100))?
            && let Event::Key(key) = event::read()?
            && key.kind == KeyEventKind::Press
        {
            let Screen::Timer(timer) = &mut self.screen else {
                return self.handle_list_key(key.code);
            };
            match key.code {
                KeyCode::Char(' ') => timer.toggle(),
                KeyCode::Char('s') => timer.engine.skip(),
                KeyCode::Char('n') => timer.engine.advance_set(),
                KeyCode::Char('r') => timer.engine.reset(),
                // Leaving the screen drops the engine and its clock
                KeyCode::Esc | KeyCode::Char('q') => self.screen = Screen::List,
                _ => {}
            }
        }
        Ok(())
    }

    fn handle_list_key(&mut self, code: KeyCode) -> Result<()> {
        match code {
            KeyCode::Char('q') => self.should_quit = true,
            KeyCode::Char('r') => {
                self.exercises = self.db.get_exercises(None)?;
                self.settings = self.db.load_settings()?;
            }
            KeyCode::Down | KeyCode::Char('j') => self.move_selection(1),
            KeyCode::Up | KeyCode::Char('k') => self.move_selection(-1),
            KeyCode::Enter => {
                let Some(exercise) = self.table.selected().and_then(|i| self.exercises.get(i))
                else {
                    return Ok(());
                };
                match TimerScreen::new(exercise.clone(), &self.settings) {
                    Ok(timer) => {
                        self.status = None;
                        self.screen = Screen::Timer(Box::new(timer));
                    }
                    Err(e) => self.status = Some(format!("Cannot time {}: {}", exercise.name, e)),
                }
            }
            _ => {}
        }
        Ok(())
    }

    fn move_selection(&mut self, delta: i64) {
        if self.exercises.is_empty() {
            return;
        }
        let len = self.exercises.len() as i64;
        let current = self.table.selected().unwrap_or(0) as i64;
        let next = (current + delta).rem_euclid(len);
        self.table.select(Some(next as usize));
    }
}

fn render_list(frame: &mut Frame, area: Rect, exercises: &[Exercise], state: &mut TableState) {
    let rows: Vec<Row> = exercises
        .iter()
        .map(|e| {
            Row::new(vec![
                Cell::from(e.name.clone()),
                Cell::from(e.prescription()),
                Cell::from(e.notes.clone().unwrap_or_default()),
            ])
        })
        .collect();

    let table = Table::new(
        rows,
        [
            Constraint::Length(26),
            Constraint::Length(22),
            Constraint::Min(20),
        ],
    )
    .header(Row::new(vec!["Exercise", "Prescription", "Notes"]).style(Style::default().bold()))
    .row_highlight_style(Style::default().fg(Color::Black).bg(Color::Cyan))
    .block(Block::default().borders(Borders::ALL).title("Exercises"));

    frame.render_stateful_widget(table, area, state);
}

fn render_timer(frame: &mut Frame, area: Rect, timer: &TimerScreen) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(5),
            Constraint::Length(3),
            Constraint::Min(3),
        ])
        .split(area);

    let snap = timer.engine.snapshot();
    let config = timer.engine.config();

    let info = Paragraph::new(vec![
        Line::from(timer.exercise.name.clone().bold()),
        Line::from(status_line(&snap, config.total_sets())),
        Line::from(timer.exercise.notes.clone().unwrap_or_default()),
    ])
    .wrap(Wrap { trim: true })
    .block(Block::default().borders(Borders::ALL).title(timer.exercise.prescription()));
    frame.render_widget(info, chunks[0]);

    let color = match snap.phase {
        Phase::Exercise => Color::Green,
        Phase::Rest => Color::Yellow,
    };
    let gauge = Gauge::default()
        .block(Block::default().borders(Borders::ALL))
        .gauge_style(Style::default().fg(color))
        .percent(snap.percent_remaining.clamp(0.0, 100.0).round() as u16)
        .label(format_clock(snap.seconds_remaining));
    frame.render_widget(gauge, chunks[1]);

    let log: Vec<Line> = timer.log.iter().rev().map(|l| Line::from(l.as_str())).collect();
    let log = Paragraph::new(log).block(Block::default().borders(Borders::ALL).title("Log"));
    frame.render_widget(log, chunks[2]);
}

/// "Set 2/3 · right · rest · paused"
fn status_line(snap: &TimerSnapshot, total_sets: u32) -> String {
    let mut parts = vec![format!("Set {}/{}", snap.current_set, total_sets)];
    if let Some(side) = snap.current_side {
        parts.push(side.label().to_string());
    }
    parts.push(
        match snap.phase {
            Phase::Exercise => "exercise",
            Phase::Rest => "rest",
        }
        .to_string(),
    );
    let state = match snap.lifecycle {
        Lifecycle::Inactive => Some("press space to start"),
        Lifecycle::Running => None,
        Lifecycle::Paused => Some("paused"),
        Lifecycle::Completed => Some("done"),
    };
    if let Some(state) = state {
        parts.push(state.to_string());
    }
    parts.join(" · ")
}

pub fn format_clock(secs: u32) -> String {
    format!("{:02}:{:02}", secs / 60, secs % 60)
}

fn init_terminal() -> Result<Tui> {
    enable_raw_mode()?;
    stdout().execute(EnterAlternateScreen)?;
    let terminal = Terminal::new(CrosstermBackend::new(stdout()))?;
    Ok(terminal)
}

fn restore_terminal() -> Result<()> {
    disable_raw_mode()?;
    stdout().execute(LeaveAlternateScreen)?;
    Ok(())
}
