use std::collections::VecDeque;
use std::io;
use std::path::PathBuf;
use std::time::Instant;

use chrono::{Local, NaiveDateTime};
use crossterm::event::{
    self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers, MouseButton, MouseEvent,
    MouseEventKind,
};
use ratatui::{backend::Backend, layout::Rect, Terminal};
use tracing::{info, warn};

use crate::board::{Board, DropOutcome};
use crate::config::Config;
use crate::error::Error;
use crate::form::{FormAction, TaskForm};
use crate::interchange;
use crate::reminder::{self, ReminderTimer};
use crate::store::{TaskFilter, TaskStore};
use crate::task::{Priority, Status};
use crate::ui;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CsvAction {
    Import,
    Export,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Mode {
    Normal,
    Search,
    Adding(TaskForm),
    Editing { task_id: i64, form: TaskForm },
    ConfirmDelete { task_id: i64, title: String },
    PathPrompt { action: CsvAction, input: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeKind {
    Info,
    Warning,
    Error,
    Reminder,
}

/// Modal message; the front of the queue is shown until a key dismisses it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub kind: NoticeKind,
    pub title: String,
    pub body: String,
}

pub struct App {
    pub store: TaskStore,
    pub config: Config,
    pub board: Board,
    pub filter: TaskFilter,
    pub mode: Mode,
    pub notices: VecDeque<Notice>,
    pub should_quit: bool,
    /// Screen area of the four columns as last drawn; used to resolve mouse drags.
    pub board_area: Rect,
    timer: ReminderTimer,
}

fn now() -> NaiveDateTime {
    Local::now().naive_local()
}

impl App {
    pub fn new(store: TaskStore, config: Config) -> Self {
        let timer = ReminderTimer::new(config.reminder_interval(), Instant::now());
        let mut app = Self {
            store,
            config,
            board: Board::new(),
            filter: TaskFilter::default(),
            mode: Mode::Normal,
            notices: VecDeque::new(),
            should_quit: false,
            board_area: Rect::default(),
            timer,
        };
        app.reload();
        app
    }

    /// Re-runs the list query with the current filter and rebuilds the columns.
    pub fn reload(&mut self) {
        match self.store.list(&self.filter) {
            Ok(tasks) => self.board.reload(&tasks),
            Err(err) => self.fail("Could not load tasks", err),
        }
    }

    fn notify(&mut self, kind: NoticeKind, title: &str, body: impl Into<String>) {
        self.notices.push_back(Notice {
            kind,
            title: title.to_string(),
            body: body.into(),
        });
    }

    fn fail(&mut self, context: &str, err: Error) {
        warn!(error = %err, "{context}");
        self.notify(NoticeKind::Error, "Error", format!("{context}.\n{err}"));
    }

    pub fn handle_event(&mut self, event: Event) {
        match event {
            Event::Key(key) if key.kind == KeyEventKind::Press => self.handle_key(key),
            Event::Mouse(mouse) if self.accepts_mouse() => self.handle_mouse(mouse),
            _ => {}
        }
    }

    /// Dialogs and notices are modal; the board only takes the mouse without them.
    fn accepts_mouse(&self) -> bool {
        self.notices.is_empty() && matches!(self.mode, Mode::Normal | Mode::Search)
    }

    pub fn handle_key(&mut self, key: KeyEvent) {
        if self.notices.pop_front().is_some() {
            return;
        }
        match std::mem::replace(&mut self.mode, Mode::Normal) {
            Mode::Normal => self.handle_normal_key(key),
            Mode::Search => self.handle_search_key(key),
            Mode::Adding(mut form) => match form.handle_key(key) {
                FormAction::None => self.mode = Mode::Adding(form),
                FormAction::Cancel => {}
                FormAction::Submit => self.submit_new(form),
            },
            Mode::Editing { task_id, mut form } => match form.handle_key(key) {
                FormAction::None => self.mode = Mode::Editing { task_id, form },
                FormAction::Cancel => {}
                FormAction::Submit => self.submit_edit(task_id, form),
            },
            Mode::ConfirmDelete { task_id, title } => match key.code {
                KeyCode::Char('y') | KeyCode::Char('Y') => self.delete(task_id),
                KeyCode::Char('n') | KeyCode::Char('N') | KeyCode::Esc => {}
                _ => self.mode = Mode::ConfirmDelete { task_id, title },
            },
            Mode::PathPrompt { action, mut input } => match key.code {
                KeyCode::Esc => {}
                KeyCode::Enter => self.run_csv(action, PathBuf::from(input.trim())),
                KeyCode::Backspace => {
                    input.pop();
                    self.mode = Mode::PathPrompt { action, input };
                }
                KeyCode::Char(c) => {
                    input.push(c);
                    self.mode = Mode::PathPrompt { action, input };
                }
                _ => self.mode = Mode::PathPrompt { action, input },
            },
        }
    }

    fn handle_normal_key(&mut self, key: KeyEvent) {
        let shift = key.modifiers.contains(KeyModifiers::SHIFT);
        let ctrl = key.modifiers.contains(KeyModifiers::CONTROL);
        match key.code {
            KeyCode::Char('q') => self.should_quit = true,
            KeyCode::Esc => self.board.cancel_grab(),
            KeyCode::Left | KeyCode::Char('h') => self.board.focus_left(),
            KeyCode::Right | KeyCode::Char('l') => self.board.focus_right(),
            KeyCode::Up if shift => self.board.move_selected(-1),
            KeyCode::Down if shift => self.board.move_selected(1),
            KeyCode::Char('K') => self.board.move_selected(-1),
            KeyCode::Char('J') => self.board.move_selected(1),
            KeyCode::Up | KeyCode::Char('k') => self.board.select_previous(),
            KeyCode::Down | KeyCode::Char('j') => self.board.select_next(),
            KeyCode::Char(' ') | KeyCode::Enter if self.board.grabbed.is_some() => {
                let target = self.board.focused_status();
                let row = self.board.focused_column().selected;
                let outcome = self.board.drop_on(target, row);
                self.apply_drop(outcome);
            }
            KeyCode::Char(' ') => {
                self.board.grab_selected();
            }
            KeyCode::Char('n') if ctrl => self.mode = Mode::Adding(TaskForm::new()),
            KeyCode::Char('u') if ctrl => self.begin_edit(),
            KeyCode::Char('e') if ctrl => self.begin_csv(CsvAction::Export),
            KeyCode::Char('a') => self.mode = Mode::Adding(TaskForm::new()),
            KeyCode::Char('e') | KeyCode::Enter => self.begin_edit(),
            KeyCode::Char('d') | KeyCode::Delete => self.begin_delete(),
            KeyCode::Char('/') => self.mode = Mode::Search,
            KeyCode::Char('p') => self.cycle_priority_filter(),
            KeyCode::Char('r') => self.reload(),
            KeyCode::Char('x') => self.begin_csv(CsvAction::Export),
            KeyCode::Char('i') => self.begin_csv(CsvAction::Import),
            _ => {}
        }
    }

    fn handle_search_key(&mut self, key: KeyEvent) {
        match key.code {
            KeyCode::Esc | KeyCode::Enter => return,
            KeyCode::Backspace => {
                self.filter.text.pop();
            }
            KeyCode::Char('u') if key.modifiers.contains(KeyModifiers::CONTROL) => {
                self.filter.text.clear();
            }
            KeyCode::Char(c) => self.filter.text.push(c),
            _ => {}
        }
        self.mode = Mode::Search;
        self.reload();
    }

    pub fn set_priority_filter(&mut self, priority: Option<Priority>) {
        self.filter.priority = priority;
        self.reload();
    }

    fn cycle_priority_filter(&mut self) {
        let next = match self.filter.priority {
            None => Some(Priority::Low),
            Some(Priority::High) => None,
            Some(p) => Some(p.next()),
        };
        self.set_priority_filter(next);
    }

    fn submit_new(&mut self, mut form: TaskForm) {
        let result = form
            .to_draft()
            .and_then(|draft| self.store.insert(&draft, now()));
        match result {
            Ok(id) => {
                info!(task_id = id, "task added");
                form.clear();
                self.reload();
                self.board.select_task(id);
            }
            Err(err) => {
                self.fail("Could not add the task", err);
                self.mode = Mode::Adding(form);
            }
        }
    }

    pub fn begin_edit(&mut self) {
        let Some(task_id) = self.board.selected_card().map(|c| c.task_id) else {
            self.notify(NoticeKind::Warning, "Update", "No task selected.");
            return;
        };
        match self.store.get(task_id) {
            Ok(Some(task)) => {
                self.mode = Mode::Editing {
                    task_id,
                    form: TaskForm::from_task(&task),
                }
            }
            Ok(None) => {
                warn!(task_id, "selected task vanished before edit");
                self.notify(
                    NoticeKind::Warning,
                    "Update",
                    "The task was not found in the database.",
                );
                self.reload();
            }
            Err(err) => self.fail("Could not load the task", err),
        }
    }

    fn submit_edit(&mut self, task_id: i64, form: TaskForm) {
        let draft = match form.to_draft() {
            Ok(draft) => draft,
            Err(err) => {
                self.fail("Could not update the task", err);
                self.mode = Mode::Editing { task_id, form };
                return;
            }
        };
        match self.store.update(task_id, &draft, now()) {
            Ok(()) => info!(task_id, status = %draft.status, "task updated"),
            Err(err @ Error::NotFound(_)) => self.fail("Could not update the task", err),
            Err(err) => {
                self.fail("Could not update the task", err);
                self.mode = Mode::Editing { task_id, form };
            }
        }
        self.reload();
    }

    pub fn begin_delete(&mut self) {
        match self.board.selected_card() {
            Some(card) => {
                self.mode = Mode::ConfirmDelete {
                    task_id: card.task_id,
                    title: card.label.clone(),
                }
            }
            None => self.notify(NoticeKind::Warning, "Delete", "No task selected."),
        }
    }

    fn delete(&mut self, task_id: i64) {
        match self.store.delete(task_id) {
            Ok(()) => info!(task_id, "task deleted"),
            Err(err) => self.fail("Could not delete the task", err),
        }
        self.reload();
    }

    /// Persists a drop that changed columns, then reloads every column.
    pub fn apply_drop(&mut self, outcome: DropOutcome) {
        let DropOutcome::StatusChange { task_id, status } = outcome else {
            return;
        };
        match self.store.set_status(task_id, status, now()) {
            Ok(()) => info!(task_id, %status, "task moved"),
            Err(err) => self.fail("Could not update the task status", err),
        }
        self.reload();
        self.board.select_task(task_id);
    }

    fn handle_mouse(&mut self, mouse: MouseEvent) {
        let columns = ui::column_areas(self.board_area);
        let hit = columns
            .iter()
            .position(|r| contains(*r, mouse.column, mouse.row));
        match mouse.kind {
            MouseEventKind::Down(MouseButton::Left) => {
                let Some(column) = hit else {
                    return;
                };
                let col = &self.board.columns[column];
                match ui::card_at(columns[column], col.selected, col.cards.len(), mouse.row) {
                    Some(row) => {
                        self.board.grab_at(column, row);
                    }
                    None => self.board.select(column, None),
                }
            }
            MouseEventKind::Down(MouseButton::Right) => {
                let Some(column) = hit else {
                    return;
                };
                let col = &self.board.columns[column];
                if let Some(row) =
                    ui::card_at(columns[column], col.selected, col.cards.len(), mouse.row)
                {
                    self.board.cancel_grab();
                    self.board.select(column, Some(row));
                    self.begin_edit();
                }
            }
            MouseEventKind::Up(MouseButton::Left) => {
                let Some(grab) = self.board.grabbed else {
                    return;
                };
                let Some(column) = hit else {
                    self.board.cancel_grab();
                    return;
                };
                let target = Status::ALL[column];
                let row = (target == grab.from)
                    .then(|| {
                        let col = &self.board.columns[column];
                        ui::card_at(columns[column], col.selected, col.cards.len(), mouse.row)
                    })
                    .flatten();
                let outcome = self.board.drop_on(target, row);
                self.apply_drop(outcome);
            }
            _ => {}
        }
    }

    fn begin_csv(&mut self, action: CsvAction) {
        let input = match action {
            CsvAction::Export => "tasks.csv".to_string(),
            CsvAction::Import => String::new(),
        };
        self.mode = Mode::PathPrompt { action, input };
    }

    pub fn run_csv(&mut self, action: CsvAction, path: PathBuf) {
        if path.as_os_str().is_empty() {
            return;
        }
        match action {
            CsvAction::Export => match interchange::export(&self.store, &path) {
                Ok(count) => self.notify(
                    NoticeKind::Info,
                    "Export",
                    format!("Exported {count} tasks to {}.", path.display()),
                ),
                Err(err) => self.fail("Could not export tasks", err),
            },
            CsvAction::Import => {
                match interchange::import(&self.store, &path) {
                    Ok(count) => self.notify(
                        NoticeKind::Info,
                        "Import",
                        format!("Imported {count} tasks from {}.", path.display()),
                    ),
                    Err(err) => self.fail("Could not import tasks", err),
                }
                self.reload();
            }
        }
    }

    /// Runs a reminder scan and queues one notice per hit.
    pub fn check_reminders(&mut self, now: NaiveDateTime) {
        match reminder::scan(&self.store, now, self.config.reminder_window()) {
            Ok(hits) => {
                for hit in hits {
                    self.notify(NoticeKind::Reminder, "Reminder", hit.message());
                }
            }
            Err(err) => self.fail("Could not check reminders", err),
        }
    }

    pub fn tick(&mut self, at: Instant) {
        if self.timer.poll(at) {
            self.check_reminders(now());
        }
    }
}

fn contains(area: Rect, x: u16, y: u16) -> bool {
    x >= area.x && x < area.x + area.width && y >= area.y && y < area.y + area.height
}

/// Draws, waits for input up to the next reminder tick, and dispatches until quit.
pub fn run<B: Backend>(terminal: &mut Terminal<B>, app: &mut App) -> io::Result<()> {
    loop {
        terminal.draw(|f| {
            app.board_area = ui::layout(f.area()).board;
            ui::draw(f, app);
        })?;

        if event::poll(app.timer.time_left(Instant::now()))? {
            app.handle_event(event::read()?);
        }
        app.tick(Instant::now());

        if app.should_quit {
            return Ok(());
        }
    }
}
