use crate::task::{Priority, Status, Task};

/// Side record for one rendered list item; the widget itself only gets `label`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Card {
    pub task_id: i64,
    pub priority: Priority,
    pub label: String,
    pub description: Option<String>,
}

impl Card {
    fn from_task(task: &Task) -> Self {
        Self {
            task_id: task.id,
            priority: task.priority,
            label: task.display_label(),
            description: task.description.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Column {
    pub status: Status,
    pub cards: Vec<Card>,
    pub selected: Option<usize>,
}

impl Column {
    fn new(status: Status) -> Self {
        Self {
            status,
            cards: Vec::new(),
            selected: None,
        }
    }

    pub fn selected_card(&self) -> Option<&Card> {
        self.selected.and_then(|i| self.cards.get(i))
    }

    fn position_of(&self, task_id: i64) -> Option<usize> {
        self.cards.iter().position(|c| c.task_id == task_id)
    }
}

/// A card picked up for a drag and drop gesture.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Grab {
    pub task_id: i64,
    pub from: Status,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DropOutcome {
    /// The card landed on another column; persist the new status.
    StatusChange { task_id: i64, status: Status },
    /// Same column: in-memory reorder only.
    Reordered,
    /// The grabbed card is no longer on the board.
    Ignored,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Board {
    pub columns: [Column; 4],
    pub focused: usize,
    pub grabbed: Option<Grab>,
}

impl Default for Board {
    fn default() -> Self {
        Self::new()
    }
}

impl Board {
    pub fn new() -> Self {
        Self {
            columns: Status::ALL.map(Column::new),
            focused: 0,
            grabbed: None,
        }
    }

    /// Splits `tasks` into columns, keeping their order.
    pub fn from_tasks(tasks: &[Task]) -> Self {
        let mut board = Self::new();
        for task in tasks {
            board.columns[task.status.index()]
                .cards
                .push(Card::from_task(task));
        }
        board
    }

    /// Rebuilds the columns from fresh rows, keeping focus, the selected task and any grab.
    pub fn reload(&mut self, tasks: &[Task]) {
        let selected_id = self.selected_card().map(|c| c.task_id);
        let mut fresh = Self::from_tasks(tasks);
        fresh.focused = self.focused;
        fresh.grabbed = self
            .grabbed
            .filter(|g| fresh.columns.iter().any(|c| c.position_of(g.task_id).is_some()));
        if let Some(id) = selected_id {
            fresh.select_task(id);
        }
        if fresh.selected_card().is_none() {
            fresh.clamp_selection();
        }
        *self = fresh;
    }

    pub fn focused_column(&self) -> &Column {
        &self.columns[self.focused]
    }

    pub fn focused_status(&self) -> Status {
        self.focused_column().status
    }

    /// First column holding a selection wins; selection is kept exclusive.
    pub fn selected_card(&self) -> Option<&Card> {
        self.columns.iter().find_map(Column::selected_card)
    }

    pub fn select(&mut self, column: usize, row: Option<usize>) {
        if column >= self.columns.len() {
            return;
        }
        for (i, col) in self.columns.iter_mut().enumerate() {
            if i != column {
                col.selected = None;
            }
        }
        self.focused = column;
        let col = &mut self.columns[column];
        col.selected = row.filter(|r| *r < col.cards.len());
    }

    pub fn select_task(&mut self, task_id: i64) -> bool {
        let found = self
            .columns
            .iter()
            .enumerate()
            .find_map(|(i, c)| c.position_of(task_id).map(|row| (i, row)));
        match found {
            Some((column, row)) => {
                self.select(column, Some(row));
                true
            }
            None => false,
        }
    }

    fn clamp_selection(&mut self) {
        let col = &self.columns[self.focused];
        let row = match col.cards.len() {
            0 => None,
            len => Some(col.selected.unwrap_or(0).min(len - 1)),
        };
        self.select(self.focused, row);
    }

    pub fn focus_left(&mut self) {
        if self.focused > 0 {
            self.focus_column(self.focused - 1);
        }
    }

    pub fn focus_right(&mut self) {
        if self.focused + 1 < self.columns.len() {
            self.focus_column(self.focused + 1);
        }
    }

    fn focus_column(&mut self, column: usize) {
        let row = (!self.columns[column].cards.is_empty()).then_some(0);
        self.select(column, row);
    }

    pub fn select_next(&mut self) {
        let col = &self.columns[self.focused];
        if col.cards.is_empty() {
            return;
        }
        let row = match col.selected {
            Some(i) if i + 1 < col.cards.len() => i + 1,
            Some(i) => i,
            None => 0,
        };
        self.select(self.focused, Some(row));
    }

    pub fn select_previous(&mut self) {
        let col = &self.columns[self.focused];
        if col.cards.is_empty() {
            return;
        }
        let row = col.selected.map_or(0, |i| i.saturating_sub(1));
        self.select(self.focused, Some(row));
    }

    /// Moves the selected card one slot up (`-1`) or down (`1`) within its column.
    pub fn move_selected(&mut self, direction: isize) {
        let col = &mut self.columns[self.focused];
        let Some(from) = col.selected else {
            return;
        };
        let to = (from as isize + direction).clamp(0, col.cards.len() as isize - 1) as usize;
        if to != from {
            col.cards.swap(from, to);
            col.selected = Some(to);
        }
    }

    /// Picks up the selected card.
    pub fn grab_selected(&mut self) -> Option<Grab> {
        let card = self.selected_card()?;
        let from = self
            .columns
            .iter()
            .find(|c| c.position_of(card.task_id).is_some())?
            .status;
        let grab = Grab {
            task_id: card.task_id,
            from,
        };
        self.grabbed = Some(grab);
        Some(grab)
    }

    pub fn grab_at(&mut self, column: usize, row: usize) -> Option<Grab> {
        let card = self.columns.get(column)?.cards.get(row)?;
        let grab = Grab {
            task_id: card.task_id,
            from: self.columns[column].status,
        };
        self.select(column, Some(row));
        self.grabbed = Some(grab);
        Some(grab)
    }

    pub fn cancel_grab(&mut self) {
        self.grabbed = None;
    }

    /// Drops the grabbed card on `target`. A drop on the source column moves it to
    /// `row` (or leaves it in place) without touching the store.
    pub fn drop_on(&mut self, target: Status, row: Option<usize>) -> DropOutcome {
        let Some(grab) = self.grabbed.take() else {
            return DropOutcome::Ignored;
        };
        let source = &mut self.columns[grab.from.index()];
        let Some(from) = source.position_of(grab.task_id) else {
            return DropOutcome::Ignored;
        };
        if target != grab.from {
            return DropOutcome::StatusChange {
                task_id: grab.task_id,
                status: target,
            };
        }
        let to = row.unwrap_or(from).min(source.cards.len() - 1);
        let card = source.cards.remove(from);
        source.cards.insert(to, card);
        self.select(grab.from.index(), Some(to));
        DropOutcome::Reordered
    }
}
