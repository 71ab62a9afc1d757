// Application state and the event/refresh loop for the terminal dashboard.
//
// One single-threaded loop: draw, poll input with a bounded timeout, and
// when the refresh tick elapses (auto-refresh on) invalidate the memoized
// query and re-run the whole pipeline synchronously. A cycle never
// overlaps another; an in-flight fetch is not preempted.
use std::collections::BTreeSet;
use std::io;
use std::time::{Duration, Instant};

use chrono_tz::Tz;
use crossterm::{
    event::{self, Event, KeyCode, KeyEventKind},
    execute,
    terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode},
};
use ratatui::{Terminal, backend::CrosstermBackend};

use crate::application::cell_log_repository::CellLogQuery;
use crate::application::dashboard_service::{DashboardRequest, DashboardService};
use crate::domain::cell_log::PackStatus;
use crate::domain::view::ViewState;
use crate::infrastructure::config::AppConfig;

use super::ui;

pub const MIN_DAYS: u32 = 1;
pub const MAX_DAYS: u32 = 30;
pub const MIN_LIMIT: u32 = 500;
pub const MAX_LIMIT: u32 = 20000;
pub const LIMIT_STEP: u32 = 500;
pub const MIN_INTERVAL_SECS: u64 = 5;
pub const MAX_INTERVAL_SECS: u64 = 120;
pub const INTERVAL_STEP_SECS: u64 = 5;

/// Input mode for the dashboard.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum InputMode {
    /// Normal key handling (quit, toggles, steppers).
    Normal,
    /// Editing the device id text field.
    EditDevice,
    /// Editing the timezone text field.
    EditTimezone,
}

/// Operator-facing query and display controls. Ranges are enforced
/// here and nowhere else downstream.
#[derive(Debug, Clone)]
pub struct Controls {
    pub device_id: String,
    pub lookback_days: u32,
    pub limit: u32,
    pub auto_refresh: bool,
    pub interval_secs: u64,
    pub timezone: String,
    pub status_filter: BTreeSet<PackStatus>,
}

impl Controls {
    fn from_config(config: &AppConfig) -> Self {
        Self {
            device_id: config.device_id.clone(),
            lookback_days: 7,
            limit: 5000,
            auto_refresh: true,
            interval_secs: 15,
            timezone: config.local_tz.clone(),
            status_filter: BTreeSet::new(),
        }
    }

    pub fn to_request(&self) -> DashboardRequest {
        DashboardRequest {
            query: CellLogQuery::new(self.device_id.clone(), self.lookback_days, self.limit),
            timezone: self.timezone.clone(),
            status_filter: self.status_filter.clone(),
        }
    }

    pub fn step_days(&mut self, up: bool) {
        self.lookback_days = if up {
            (self.lookback_days + 1).min(MAX_DAYS)
        } else {
            self.lookback_days.saturating_sub(1).max(MIN_DAYS)
        };
    }

    pub fn step_limit(&mut self, up: bool) {
        self.limit = if up {
            (self.limit + LIMIT_STEP).min(MAX_LIMIT)
        } else {
            self.limit.saturating_sub(LIMIT_STEP).max(MIN_LIMIT)
        };
    }

    pub fn step_interval(&mut self, up: bool) {
        self.interval_secs = if up {
            (self.interval_secs + INTERVAL_STEP_SECS).min(MAX_INTERVAL_SECS)
        } else {
            self.interval_secs
                .saturating_sub(INTERVAL_STEP_SECS)
                .max(MIN_INTERVAL_SECS)
        };
    }

    pub fn toggle_status(&mut self, status: PackStatus) {
        if !self.status_filter.remove(&status) {
            self.status_filter.insert(status);
        }
    }

    fn display_tz(&self) -> Tz {
        self.timezone.parse().unwrap_or(Tz::UTC)
    }
}

/// All state for the dashboard loop.
pub struct App {
    service: DashboardService,
    pub controls: Controls,
    pub view: ViewState,
    /// Loud per-cycle error (bad timezone), distinct from the contained
    /// fetch error inside `view`.
    pub pipeline_error: Option<String>,
    pub config_warnings: Vec<String>,
    has_credentials: bool,
    pub input_mode: InputMode,
    pub input_buffer: String,
    pub should_quit: bool,
    pub last_refresh: Option<Instant>,
    next_refresh_at: Option<Instant>,
    dirty: bool,
    force_invalidate: bool,
}

impl App {
    pub fn new(service: DashboardService, config: &AppConfig) -> Self {
        let controls = Controls::from_config(config);
        let view = ViewState::empty(controls.display_tz());
        Self {
            service,
            controls,
            view,
            pipeline_error: None,
            config_warnings: config.warnings(),
            has_credentials: config.has_credentials(),
            input_mode: InputMode::Normal,
            input_buffer: String::new(),
            should_quit: false,
            last_refresh: None,
            next_refresh_at: None,
            dirty: false,
            force_invalidate: false,
        }
    }

    /// Run the pipeline once and schedule the next tick.
    async fn refresh(&mut self, invalidate: bool) {
        let request = self.controls.to_request();
        if invalidate {
            self.service.invalidate(&request);
        }

        if self.has_credentials {
            match self.service.build_view(&request).await {
                Ok(view) => {
                    self.view = view;
                    self.pipeline_error = None;
                }
                Err(err) => {
                    self.pipeline_error = Some(err.to_string());
                    self.view = ViewState::empty(Tz::UTC);
                }
            }
        } else {
            // No endpoint to query; the informational empty state stands.
            self.view = ViewState::empty(self.controls.display_tz());
        }

        self.last_refresh = Some(Instant::now());
        self.schedule_next();
    }

    fn schedule_next(&mut self) {
        self.next_refresh_at = if self.controls.auto_refresh {
            Some(Instant::now() + Duration::from_secs(self.controls.interval_secs))
        } else {
            None
        };
    }

    fn tick_due(&self) -> bool {
        self.next_refresh_at
            .is_some_and(|at| at <= Instant::now())
    }

    /// Seconds until the next scheduled refresh, for the status bar.
    pub fn seconds_until_refresh(&self) -> Option<u64> {
        let at = self.next_refresh_at?;
        Some(at.saturating_duration_since(Instant::now()).as_secs())
    }

    fn poll_timeout(&self) -> Duration {
        let cap = Duration::from_millis(250);
        match self.next_refresh_at {
            Some(at) => at.saturating_duration_since(Instant::now()).min(cap),
            None => cap,
        }
    }

    fn take_refresh_request(&mut self) -> Option<bool> {
        if !self.dirty {
            return None;
        }
        self.dirty = false;
        let invalidate = self.force_invalidate;
        self.force_invalidate = false;
        Some(invalidate)
    }

    pub fn handle_key(&mut self, key: KeyCode) {
        match self.input_mode {
            InputMode::EditDevice | InputMode::EditTimezone => self.handle_edit_key(key),
            InputMode::Normal => self.handle_normal_key(key),
        }
    }

    fn handle_normal_key(&mut self, key: KeyCode) {
        match key {
            KeyCode::Char('q') => self.should_quit = true,
            KeyCode::Char('r') => {
                self.dirty = true;
                self.force_invalidate = true;
            }
            KeyCode::Char('a') => {
                self.controls.auto_refresh = !self.controls.auto_refresh;
                self.schedule_next();
            }
            KeyCode::Char('d') => {
                self.input_mode = InputMode::EditDevice;
                self.input_buffer = self.controls.device_id.clone();
            }
            KeyCode::Char('t') => {
                self.input_mode = InputMode::EditTimezone;
                self.input_buffer = self.controls.timezone.clone();
            }
            KeyCode::Char(']') => {
                self.controls.step_days(true);
                self.dirty = true;
            }
            KeyCode::Char('[') => {
                self.controls.step_days(false);
                self.dirty = true;
            }
            KeyCode::Char('}') => {
                self.controls.step_limit(true);
                self.dirty = true;
            }
            KeyCode::Char('{') => {
                self.controls.step_limit(false);
                self.dirty = true;
            }
            KeyCode::Char('+') | KeyCode::Char('=') => {
                self.controls.step_interval(true);
                self.schedule_next();
            }
            KeyCode::Char('-') => {
                self.controls.step_interval(false);
                self.schedule_next();
            }
            KeyCode::Char('1') => {
                self.controls.toggle_status(PackStatus::Green);
                self.dirty = true;
            }
            KeyCode::Char('2') => {
                self.controls.toggle_status(PackStatus::Yellow);
                self.dirty = true;
            }
            KeyCode::Char('3') => {
                self.controls.toggle_status(PackStatus::Red);
                self.dirty = true;
            }
            _ => {}
        }
    }

    fn handle_edit_key(&mut self, key: KeyCode) {
        match key {
            KeyCode::Enter => {
                let value = self.input_buffer.trim().to_string();
                if !value.is_empty() {
                    match self.input_mode {
                        InputMode::EditDevice => self.controls.device_id = value,
                        InputMode::EditTimezone => self.controls.timezone = value,
                        InputMode::Normal => {}
                    }
                    self.dirty = true;
                }
                self.input_mode = InputMode::Normal;
                self.input_buffer.clear();
            }
            KeyCode::Esc => {
                self.input_mode = InputMode::Normal;
                self.input_buffer.clear();
            }
            KeyCode::Backspace => {
                self.input_buffer.pop();
            }
            KeyCode::Char(c) => self.input_buffer.push(c),
            _ => {}
        }
    }
}

/// Main entry point for the dashboard loop.
///
/// Sets up the terminal, runs one unconditional pipeline cycle, then
/// draws and polls until the operator quits. The timer only re-runs the
/// pipeline while auto-refresh stays enabled.
pub async fn run(mut app: App) -> anyhow::Result<()> {
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    app.refresh(false).await;

    loop {
        terminal.draw(|f| ui::draw(f, &app))?;

        if event::poll(app.poll_timeout())? {
            if let Event::Key(key) = event::read()? {
                if key.kind == KeyEventKind::Press {
                    app.handle_key(key.code);
                }
            }
        }

        if app.should_quit {
            break;
        }

        if let Some(invalidate) = app.take_refresh_request() {
            app.refresh(invalidate).await;
        } else if app.tick_due() {
            // Tick: drop the memo for the current parameters and re-run.
            app.refresh(true).await;
        }
    }

    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    Ok(())
}
