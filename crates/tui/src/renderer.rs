use std::io::{Stdout, stdout};
use std::time::Duration;

use anyhow::Result;
use calltrace_core::ProfileSession;
use calltrace_protocol::{TraversalDirection, TreeRow};
use crossterm::{
    event::{
        self, DisableMouseCapture, EnableMouseCapture, Event, KeyCode, KeyEventKind, MouseEventKind,
    },
    execute,
    terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode},
};
use ratatui::{
    Terminal,
    backend::CrosstermBackend,
    layout::{Constraint, Layout},
    style::{Color, Modifier, Style},
    widgets::{Block, Borders, List, ListItem, ListState, Paragraph},
};

/// One row as plain text: sample share, count, on-CPU share, then the
/// indented label behind an open/closed marker.
pub fn format_row(row: &TreeRow) -> String {
    let marker = match (row.has_children, row.opened) {
        (false, _) => ' ',
        (true, true) => '▾',
        (true, false) => '▸',
    };
    let cpu = row
        .on_cpu_pct
        .map_or_else(String::new, |pct| format!("{pct:.2}%"));
    format!(
        "{:>6.2}% {:>9} {cpu:>7}  {}{marker} {}",
        row.samples_pct,
        row.samples,
        " ".repeat(row.indent as usize),
        row.label
    )
}

struct App {
    view: TraversalDirection,
    hot_methods: ListState,
    call_tree: ListState,
    /// Filter text being typed, while the prompt is open.
    editing: Option<String>,
}

impl App {
    fn new(view: TraversalDirection) -> Self {
        Self {
            view,
            hot_methods: ListState::default().with_selected(Some(0)),
            call_tree: ListState::default().with_selected(Some(0)),
            editing: None,
        }
    }

    fn state(&mut self) -> &mut ListState {
        match self.view {
            TraversalDirection::HotMethods => &mut self.hot_methods,
            TraversalDirection::CallTree => &mut self.call_tree,
        }
    }

    fn clamp(&mut self, len: usize) {
        let state = self.state();
        match (len, state.selected()) {
            (0, _) => state.select(None),
            (_, None) => state.select(Some(0)),
            (_, Some(i)) => state.select(Some(i.min(len - 1))),
        }
    }

    fn step(&mut self, len: usize, delta: isize) {
        if len == 0 {
            return;
        }
        let state = self.state();
        let current = state.selected().unwrap_or(0);
        let next = current.saturating_add_signed(delta).min(len - 1);
        state.select(Some(next));
    }
}

/// Run the interactive viewer until the user quits.
pub fn run_tui(session: &mut ProfileSession, view: TraversalDirection) -> Result<()> {
    enable_raw_mode()?;
    let mut stdout = stdout();
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let result = event_loop(&mut terminal, session, App::new(view));

    disable_raw_mode()?;
    execute!(
        terminal.backend_mut(),
        LeaveAlternateScreen,
        DisableMouseCapture
    )?;
    terminal.show_cursor()?;

    result
}

fn event_loop(
    terminal: &mut Terminal<CrosstermBackend<Stdout>>,
    session: &mut ProfileSession,
    mut app: App,
) -> Result<()> {
    loop {
        let rows = session.rows(app.view);
        app.clamp(rows.len());
        draw(terminal, session, &rows, &mut app)?;

        if !event::poll(Duration::from_millis(100))? {
            continue;
        }
        match event::read()? {
            Event::Key(key) if key.kind == KeyEventKind::Press => {
                if let Some(text) = app.editing.as_mut() {
                    match key.code {
                        KeyCode::Char(c) => text.push(c),
                        KeyCode::Backspace => {
                            text.pop();
                        }
                        KeyCode::Enter => {
                            let text = std::mem::take(text);
                            session.set_filter(app.view, &text);
                            app.editing = None;
                            app.state().select(Some(0));
                        }
                        KeyCode::Esc => app.editing = None,
                        _ => {}
                    }
                    continue;
                }

                let selected = app.state().selected().and_then(|i| rows.get(i));
                match key.code {
                    KeyCode::Char('q') | KeyCode::Esc => break,
                    KeyCode::Up | KeyCode::Char('k') => app.step(rows.len(), -1),
                    KeyCode::Down | KeyCode::Char('j') => app.step(rows.len(), 1),
                    KeyCode::PageUp => app.step(rows.len(), -20),
                    KeyCode::PageDown => app.step(rows.len(), 20),
                    KeyCode::Enter | KeyCode::Char(' ') | KeyCode::Right | KeyCode::Left => {
                        if let Some(row) = selected {
                            let wants_open = key.code != KeyCode::Left;
                            let flip = match key.code {
                                KeyCode::Right | KeyCode::Left => row.opened != wants_open,
                                _ => true,
                            };
                            if flip {
                                session.toggle(app.view, &row.id);
                            }
                        }
                    }
                    KeyCode::Char('h') => {
                        if let Some(row) = selected {
                            session.highlight(app.view, &row.id);
                        }
                    }
                    KeyCode::Char('/') => {
                        let current = session.view(app.view).filter_text().unwrap_or("");
                        app.editing = Some(current.to_string());
                    }
                    KeyCode::Tab => {
                        app.view = match app.view {
                            TraversalDirection::HotMethods => TraversalDirection::CallTree,
                            TraversalDirection::CallTree => TraversalDirection::HotMethods,
                        };
                    }
                    _ => {}
                }
            }
            Event::Mouse(mouse) => match mouse.kind {
                MouseEventKind::ScrollDown => app.step(rows.len(), 3),
                MouseEventKind::ScrollUp => app.step(rows.len(), -3),
                _ => {}
            },
            _ => {}
        }
    }
    Ok(())
}

fn draw(
    terminal: &mut Terminal<CrosstermBackend<Stdout>>,
    session: &ProfileSession,
    rows: &[TreeRow],
    app: &mut App,
) -> Result<()> {
    let view = app.view;
    let filter = session.view(view).filter_text().map(str::to_string);
    let footer_text = match &app.editing {
        Some(text) => format!(" filter: {text}▏"),
        None => match &filter {
            Some(f) => format!(" filter: {f} | / edit | tab switch view | q quit"),
            None => " ↑↓ select | enter toggle | h highlight | / filter | tab switch view | q quit"
                .to_string(),
        },
    };

    terminal.draw(|frame| {
        let [header, body, footer] = Layout::vertical([
            Constraint::Length(1),
            Constraint::Min(0),
            Constraint::Length(1),
        ])
        .areas(frame.area());

        let title = Paragraph::new(format!(
            " calltrace | {} | {} | {} frames ",
            session.label(),
            view,
            session.table().len()
        ))
        .style(Style::default().fg(Color::White).bg(Color::DarkGray));
        frame.render_widget(title, header);

        let block = Block::default()
            .borders(Borders::ALL)
            .title(format!(" {view} "));
        if rows.is_empty() {
            let empty = Paragraph::new("no results")
                .style(Style::default().fg(Color::DarkGray))
                .block(block);
            frame.render_widget(empty, body);
        } else {
            let items: Vec<ListItem> = rows
                .iter()
                .map(|row| {
                    let style = if row.highlighted {
                        Style::default().fg(Color::Yellow)
                    } else {
                        Style::default()
                    };
                    ListItem::new(format_row(row)).style(style)
                })
                .collect();
            let list = List::new(items).block(block).highlight_style(
                Style::default()
                    .bg(Color::DarkGray)
                    .add_modifier(Modifier::BOLD),
            );
            frame.render_stateful_widget(list, body, app.state());
        }

        let status = Paragraph::new(footer_text.as_str())
            .style(Style::default().fg(Color::Gray).bg(Color::Black));
        frame.render_widget(status, footer);
    })?;
    Ok(())
}
