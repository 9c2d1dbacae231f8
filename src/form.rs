use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};

use crate::error::Result;
use crate::task::{
    format_date, format_time, parse_date, parse_optional, parse_time, Priority, Status, Task,
    TaskDraft,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Field {
    Title,
    Description,
    DueDate,
    DueTime,
    Priority,
    Status,
}

impl Field {
    pub const ALL: [Field; 6] = [
        Field::Title,
        Field::Description,
        Field::DueDate,
        Field::DueTime,
        Field::Priority,
        Field::Status,
    ];

    pub fn label(self) -> &'static str {
        match self {
            Field::Title => "Task",
            Field::Description => "Description",
            Field::DueDate => "Due date (YYYY-MM-DD)",
            Field::DueTime => "Due time (HH:MM)",
            Field::Priority => "Priority",
            Field::Status => "Status",
        }
    }

    fn is_text(self) -> bool {
        !matches!(self, Field::Priority | Field::Status)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FormAction {
    None,
    Submit,
    Cancel,
}

/// State behind both the add form and the edit dialog.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskForm {
    pub title: String,
    pub description: String,
    pub due_date: String,
    pub due_time: String,
    pub priority: Priority,
    pub status: Status,
    pub focus: Field,
}

impl Default for TaskForm {
    fn default() -> Self {
        Self {
            title: String::new(),
            description: String::new(),
            due_date: String::new(),
            due_time: String::new(),
            priority: Priority::Medium,
            status: Status::ToDo,
            focus: Field::Title,
        }
    }
}

impl TaskForm {
    pub fn new() -> Self {
        Self::default()
    }

    /// Pre-fills the form from an existing row.
    pub fn from_task(task: &Task) -> Self {
        Self {
            title: task.title.clone(),
            description: task.description.clone().unwrap_or_default(),
            due_date: task.due_date.map(format_date).unwrap_or_default(),
            due_time: task.due_time.map(format_time).unwrap_or_default(),
            priority: task.priority,
            status: task.status,
            focus: Field::Title,
        }
    }

    pub fn clear(&mut self) {
        *self = Self::default();
    }

    pub fn value(&self, field: Field) -> String {
        match field {
            Field::Title => self.title.clone(),
            Field::Description => self.description.clone(),
            Field::DueDate => self.due_date.clone(),
            Field::DueTime => self.due_time.clone(),
            Field::Priority => self.priority.to_string(),
            Field::Status => self.status.to_string(),
        }
    }

    fn text_mut(&mut self, field: Field) -> Option<&mut String> {
        match field {
            Field::Title => Some(&mut self.title),
            Field::Description => Some(&mut self.description),
            Field::DueDate => Some(&mut self.due_date),
            Field::DueTime => Some(&mut self.due_time),
            Field::Priority | Field::Status => None,
        }
    }

    fn step_focus(&mut self, forward: bool) {
        let len = Field::ALL.len();
        let i = Field::ALL.iter().position(|f| *f == self.focus).unwrap_or(0);
        let next = if forward { (i + 1) % len } else { (i + len - 1) % len };
        self.focus = Field::ALL[next];
    }

    fn cycle_choice(&mut self, forward: bool) {
        match (self.focus, forward) {
            (Field::Priority, true) => self.priority = self.priority.next(),
            (Field::Priority, false) => self.priority = self.priority.prev(),
            (Field::Status, true) => self.status = self.status.next(),
            (Field::Status, false) => self.status = self.status.prev(),
            _ => {}
        }
    }

    pub fn handle_key(&mut self, key: KeyEvent) -> FormAction {
        match key.code {
            KeyCode::Esc => return FormAction::Cancel,
            KeyCode::Enter => return FormAction::Submit,
            KeyCode::Tab | KeyCode::Down => self.step_focus(true),
            KeyCode::BackTab | KeyCode::Up => self.step_focus(false),
            KeyCode::Left if !self.focus.is_text() => self.cycle_choice(false),
            KeyCode::Right | KeyCode::Char(' ') if !self.focus.is_text() => {
                self.cycle_choice(true)
            }
            KeyCode::Backspace => {
                if let Some(text) = self.text_mut(self.focus) {
                    text.pop();
                }
            }
            KeyCode::Char('u') if key.modifiers.contains(KeyModifiers::CONTROL) => {
                if let Some(text) = self.text_mut(self.focus) {
                    text.clear();
                }
            }
            KeyCode::Char(c) => {
                if let Some(text) = self.text_mut(self.focus) {
                    text.push(c);
                }
            }
            _ => {}
        }
        FormAction::None
    }

    /// Validated draft; the title must be non-blank and dates well formed.
    pub fn to_draft(&self) -> Result<TaskDraft> {
        let description = self.description.trim();
        let draft = TaskDraft {
            title: self.title.trim().to_string(),
            description: (!description.is_empty()).then(|| description.to_string()),
            due_date: parse_optional(Some(&self.due_date), parse_date)?,
            due_time: parse_optional(Some(&self.due_time), parse_time)?,
            priority: self.priority,
            status: self.status,
        };
        draft.validate()?;
        Ok(draft)
    }
}
