use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Clear, List, ListItem, ListState, Paragraph, Wrap},
    Frame,
};

use crate::app::{App, CsvAction, Mode, NoticeKind};
use crate::board::Column;
use crate::form::{Field, TaskForm};
use crate::task::Priority;

const CARD_FG: Color = Color::Rgb(0x2e, 0x34, 0x40);
const SELECTED_BG: Color = Color::Rgb(0x81, 0xa1, 0xc1);
const ACCENT: Color = Color::Rgb(0x88, 0xc0, 0xd0);

pub fn priority_color(priority: Priority) -> Color {
    match priority {
        Priority::High => Color::Rgb(0xbf, 0x61, 0x6a),
        Priority::Medium => Color::Rgb(0xeb, 0xcb, 0x8b),
        Priority::Low => Color::Rgb(0xa3, 0xbe, 0x8c),
    }
}

pub struct Areas {
    pub board: Rect,
    pub side: Rect,
    pub status: Rect,
}

pub fn layout(area: Rect) -> Areas {
    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints(vec![Constraint::Min(3), Constraint::Length(1)])
        .split(area);
    let cols = Layout::default()
        .direction(Direction::Horizontal)
        .constraints(vec![Constraint::Percentage(75), Constraint::Percentage(25)])
        .split(rows[0]);
    Areas {
        board: cols[0],
        side: cols[1],
        status: rows[1],
    }
}

pub fn column_areas(board: Rect) -> [Rect; 4] {
    let chunks = Layout::default()
        .direction(Direction::Horizontal)
        .constraints(vec![
            Constraint::Percentage(25),
            Constraint::Percentage(25),
            Constraint::Percentage(25),
            Constraint::Percentage(25),
        ])
        .split(board);
    [chunks[0], chunks[1], chunks[2], chunks[3]]
}

/// Index of the card drawn at screen row `y` inside a bordered column.
///
/// Mirrors the list's scrolling: the offset is whatever keeps `selected` on screen.
pub fn card_at(area: Rect, selected: Option<usize>, len: usize, y: u16) -> Option<usize> {
    let top = area.y + 1;
    let height = area.height.saturating_sub(2) as usize;
    if y < top || (y - top) as usize >= height {
        return None;
    }
    let offset = selected.map_or(0, |s| (s + 1).saturating_sub(height));
    let index = offset + (y - top) as usize;
    (index < len).then_some(index)
}

pub fn draw(frame: &mut Frame, app: &App) {
    let areas = layout(frame.area());
    for (column, area) in app.board.columns.iter().zip(column_areas(areas.board)) {
        draw_column(frame, app, column, area);
    }
    draw_side_panel(frame, app, areas.side);
    draw_status_bar(frame, app, areas.status);

    match &app.mode {
        Mode::Adding(form) => draw_form(frame, "New task", form),
        Mode::Editing { form, .. } => draw_form(frame, "Update task", form),
        Mode::ConfirmDelete { title, .. } => draw_confirm(frame, title),
        Mode::PathPrompt { action, input } => draw_prompt(frame, *action, input),
        Mode::Normal | Mode::Search => {}
    }
    if let Some(notice) = app.notices.front() {
        draw_notice(frame, notice.kind, &notice.title, &notice.body);
    }
}

fn draw_column(frame: &mut Frame, app: &App, column: &Column, area: Rect) {
    let focused = app.board.focused_status() == column.status;
    let grabbed = app.board.grabbed.map(|g| g.task_id);

    let items: Vec<ListItem> = column
        .cards
        .iter()
        .map(|card| {
            let style = Style::default()
                .fg(CARD_FG)
                .bg(priority_color(card.priority));
            let mut spans = vec![
                Span::styled(
                    format!("{:<3} ", card.priority.marker()),
                    style.add_modifier(Modifier::BOLD),
                ),
                Span::styled(card.label.as_str(), style),
            ];
            if grabbed == Some(card.task_id) {
                spans.push(Span::styled(
                    " [moving]",
                    style.add_modifier(Modifier::ITALIC),
                ));
            }
            ListItem::new(Line::from(spans)).style(style)
        })
        .collect();

    let title = format!("{} ({})", column.status.label(), column.cards.len());
    let list = List::new(items)
        .block(
            Block::default()
                .title(title)
                .borders(Borders::ALL)
                .border_style(if focused {
                    Style::default().fg(ACCENT)
                } else {
                    Style::default()
                }),
        )
        .highlight_style(
            Style::default()
                .bg(SELECTED_BG)
                .fg(CARD_FG)
                .add_modifier(Modifier::BOLD),
        );

    let mut state = ListState::default().with_selected(column.selected);
    frame.render_stateful_widget(list, area, &mut state);
}

fn draw_side_panel(frame: &mut Frame, app: &App, area: Rect) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints(vec![Constraint::Length(4), Constraint::Min(3)])
        .split(area);

    let searching = app.mode == Mode::Search;
    let priority = app
        .filter
        .priority
        .map_or("All".to_string(), |p| p.to_string());
    let filters = Paragraph::new(vec![
        Line::from(vec![
            Span::raw("Search: "),
            Span::styled(
                format!("{}{}", app.filter.text, if searching { "_" } else { "" }),
                Style::default().fg(ACCENT),
            ),
        ]),
        Line::from(vec![
            Span::raw("Priority: "),
            Span::styled(priority, Style::default().fg(ACCENT)),
        ]),
    ])
    .block(Block::default().title("Filter").borders(Borders::ALL));
    frame.render_widget(filters, chunks[0]);

    let details = match app.board.selected_card() {
        Some(card) => vec![
            Line::from(Span::styled(
                card.label.as_str(),
                Style::default().add_modifier(Modifier::BOLD),
            )),
            Line::from(format!("#{} · {} priority", card.task_id, card.priority)),
            Line::from(""),
            Line::from(card.description.as_deref().unwrap_or("No description.")),
        ],
        None => vec![Line::from("Select a task to see its description.")],
    };
    let details = Paragraph::new(details)
        .wrap(Wrap { trim: false })
        .block(Block::default().title("Description").borders(Borders::ALL));
    frame.render_widget(details, chunks[1]);
}

fn draw_status_bar(frame: &mut Frame, app: &App, area: Rect) {
    let hint = match (&app.mode, app.board.grabbed) {
        (Mode::Search, _) => "type to search · Enter/Esc done · Ctrl+U clear",
        (_, Some(_)) => "←/→ target column · Space/Enter drop · Esc cancel",
        _ => "a add · e edit · d delete · Space move · / search · p priority · x export · i import · q quit",
    };
    frame.render_widget(
        Paragraph::new(hint).style(Style::default().fg(Color::DarkGray)),
        area,
    );
}

fn draw_form(frame: &mut Frame, title: &str, form: &TaskForm) {
    let area = centered_rect(60, 50, frame.area());
    let lines: Vec<Line> = Field::ALL
        .iter()
        .map(|field| {
            let focused = *field == form.focus;
            let value = form.value(*field);
            let value = match (field, focused) {
                (Field::Priority | Field::Status, true) => format!("< {value} >"),
                (_, true) => format!("{value}_"),
                _ => value,
            };
            let label_style = if focused {
                Style::default().fg(ACCENT).add_modifier(Modifier::BOLD)
            } else {
                Style::default()
            };
            Line::from(vec![
                Span::styled(format!("{:>22}: ", field.label()), label_style),
                Span::raw(value),
            ])
        })
        .chain([
            Line::from(""),
            Line::from(Span::styled(
                "Tab/↑↓ field · ←/→ choice · Enter save · Esc cancel",
                Style::default().fg(Color::DarkGray),
            )),
        ])
        .collect();

    frame.render_widget(Clear, area);
    frame.render_widget(
        Paragraph::new(lines)
            .wrap(Wrap { trim: false })
            .block(Block::default().title(title).borders(Borders::ALL)),
        area,
    );
}

fn draw_confirm(frame: &mut Frame, title: &str) {
    let area = centered_rect(50, 20, frame.area());
    let text = vec![
        Line::from("Are you sure you want to delete this task?"),
        Line::from(Span::styled(title, Style::default().add_modifier(Modifier::BOLD))),
        Line::from(""),
        Line::from("y yes · n no"),
    ];
    frame.render_widget(Clear, area);
    frame.render_widget(
        Paragraph::new(text)
            .wrap(Wrap { trim: true })
            .block(Block::default().title("Delete task").borders(Borders::ALL)),
        area,
    );
}

fn draw_prompt(frame: &mut Frame, action: CsvAction, input: &str) {
    let area = centered_rect(60, 20, frame.area());
    let title = match action {
        CsvAction::Export => "Export tasks to CSV",
        CsvAction::Import => "Import tasks from CSV",
    };
    let text = vec![
        Line::from(format!("File: {input}_")),
        Line::from(""),
        Line::from(Span::styled(
            "Enter confirm · Esc cancel",
            Style::default().fg(Color::DarkGray),
        )),
    ];
    frame.render_widget(Clear, area);
    frame.render_widget(
        Paragraph::new(text).block(Block::default().title(title).borders(Borders::ALL)),
        area,
    );
}

fn draw_notice(frame: &mut Frame, kind: NoticeKind, title: &str, body: &str) {
    let area = centered_rect(50, 25, frame.area());
    let color = match kind {
        NoticeKind::Info => ACCENT,
        NoticeKind::Reminder => priority_color(Priority::Medium),
        NoticeKind::Warning => Color::Yellow,
        NoticeKind::Error => priority_color(Priority::High),
    };
    let mut text: Vec<Line> = body.lines().map(Line::from).collect();
    text.push(Line::from(""));
    text.push(Line::from(Span::styled(
        "press any key",
        Style::default().fg(Color::DarkGray),
    )));
    frame.render_widget(Clear, area);
    frame.render_widget(
        Paragraph::new(text).wrap(Wrap { trim: true }).block(
            Block::default()
                .title(title)
                .borders(Borders::ALL)
                .border_style(Style::default().fg(color)),
        ),
        area,
    );
}

fn centered_rect(percent_x: u16, percent_y: u16, r: Rect) -> Rect {
    let popup_layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Percentage((100 - percent_y) / 2),
            Constraint::Percentage(percent_y),
            Constraint::Percentage((100 - percent_y) / 2),
        ])
        .split(r);

    Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage((100 - percent_x) / 2),
            Constraint::Percentage(percent_x),
            Constraint::Percentage((100 - percent_x) / 2),
        ])
        .split(popup_layout[1])[1]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::TaskStore;
    use crate::task::TaskDraft;
    use ratatui::{backend::TestBackend, Terminal};

    #[test]
    fn columns_split_the_board_evenly() {
        let areas = column_areas(Rect::new(0, 0, 80, 10));
        assert!(areas.iter().all(|r| r.width == 20 && r.height == 10));
        assert_eq!(areas[3].x, 60);
    }

    #[test]
    fn card_at_accounts_for_border_and_scroll() {
        let area = Rect::new(0, 0, 20, 6); // four visible rows
        assert_eq!(card_at(area, None, 3, 0), None);
        assert_eq!(card_at(area, None, 3, 1), Some(0));
        assert_eq!(card_at(area, None, 3, 4), None);
        assert_eq!(card_at(area, Some(9), 10, 1), Some(6));
        assert_eq!(card_at(area, Some(9), 10, 4), Some(9));
        assert_eq!(card_at(area, Some(0), 10, 5), None);
    }

    #[test]
    fn board_renders_labels_and_columns() {
        let dir = tempfile::tempdir().unwrap();
        let store = TaskStore::open(dir.path().join("tasks.db")).unwrap();
        store
            .insert(&TaskDraft::new("Buy milk"), chrono::Local::now().naive_local())
            .unwrap();
        let app = App::new(store, crate::config::Config::default());

        let mut terminal = Terminal::new(TestBackend::new(120, 20)).unwrap();
        terminal.draw(|f| draw(f, &app)).unwrap();
        let buffer = terminal.backend().buffer().clone();
        let text: String = buffer.content().iter().map(|c| c.symbol()).collect();
        for needle in ["To Do (1)", "In Progress (0)", "Review (0)", "Done (0)", "Buy milk"] {
            assert!(text.contains(needle), "missing {needle}");
        }
    }
}
