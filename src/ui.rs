use crate::{
    app::Input,
    console::{
        ConsolePhase,
        ConsoleView,
        Focus,
        MutationKind,
    },
    model::Bet,
    toast::{
        Toast,
        ToastKind,
        ToastQueue,
    },
};
use chrono::Local;
use color_eyre::eyre::{
    Result,
    eyre,
};
use crossterm::{
    event::{
        Event,
        EventStream,
        KeyCode,
        KeyEventKind,
        KeyModifiers,
    },
    terminal::{
        disable_raw_mode,
        enable_raw_mode,
    },
};
use futures::StreamExt;
use ratatui::{
    prelude::*,
    widgets::*,
};
use std::io::stdout;
use unicode_width::{
    UnicodeWidthChar,
    UnicodeWidthStr,
};

const TITLE: &str = "Gomboc Gambling Casino";
const HELP: &str =
    "Tab/↑/↓ focus | Enter activate | s bet | w withdraw | h history | Esc cancel | r reload | q quit";
const TOAST_MAX_WIDTH: u16 = 48;
const TOAST_MAX_LINES: usize = 4;

#[derive(Debug, Default)]
pub struct UiState {
    terminal: Option<Terminal<CrosstermBackend<std::io::Stdout>>>,
}

pub fn terminal_enter(state: &mut UiState) -> Result<()> {
    enable_raw_mode()?;
    crossterm::execute!(std::io::stdout(), crossterm::terminal::EnterAlternateScreen)?;
    // One persistent Terminal keeps the diffing buffers across draws
    let backend = CrosstermBackend::new(stdout());
    let terminal = Terminal::new(backend)?;
    state.terminal = Some(terminal);
    Ok(())
}

pub fn terminal_exit() -> Result<()> {
    disable_raw_mode()?;
    crossterm::execute!(std::io::stdout(), crossterm::terminal::LeaveAlternateScreen)?;
    Ok(())
}

pub fn draw(state: &mut UiState, view: &ConsoleView, toasts: &ToastQueue) -> Result<()> {
    if let Some(term) = state.terminal.as_mut() {
        term.draw(|f| render(f, view, toasts))?;
    }
    Ok(())
}

pub fn input_event_stream() -> EventStream {
    EventStream::new()
}

pub async fn next_raw_event(events: &mut EventStream) -> Result<Event> {
    match events.next().await {
        Some(event) => Ok(event?),
        None => Err(eyre!("terminal input stream closed")),
    }
}

/// Maps a terminal event onto the console's input model. Key releases and
/// unbound keys yield `None`.
pub fn interpret_event(event: Event) -> Option<Input> {
    let key = match event {
        Event::Key(key) => key,
        Event::Resize(_, _) => return Some(Input::Redraw),
        _ => return None,
    };
    if key.kind != KeyEventKind::Press {
        return None;
    }
    if key.modifiers.contains(KeyModifiers::CONTROL) {
        return matches!(key.code, KeyCode::Char('c')).then_some(Input::Quit);
    }
    match key.code {
        KeyCode::Tab | KeyCode::Down => Some(Input::FocusNext),
        KeyCode::BackTab | KeyCode::Up => Some(Input::FocusPrev),
        KeyCode::Enter => Some(Input::Enter),
        KeyCode::Esc => Some(Input::Cancel),
        KeyCode::Backspace => Some(Input::Backspace),
        KeyCode::Char(c) => Some(Input::Char(c)),
        _ => None,
    }
}

pub fn render(f: &mut Frame, view: &ConsoleView, toasts: &ToastQueue) {
    f.render_widget(Clear, f.area());
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(1), // title
            Constraint::Min(0),    // console body
            Constraint::Length(3), // help
        ])
        .split(f.area());

    let title = Paragraph::new(TITLE)
        .alignment(Alignment::Center)
        .style(Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD));
    f.render_widget(title, chunks[0]);

    match &view.phase {
        ConsolePhase::Initializing => draw_placeholder(f, chunks[1], "Loading...", Color::Gray),
        ConsolePhase::Error(message) => draw_placeholder(
            f,
            chunks[1],
            &format!("Error: {message}"),
            Color::Red,
        ),
        ConsolePhase::Ready | ConsolePhase::Submitting(_) => draw_console(f, chunks[1], view),
    }

    let help = Paragraph::new(HELP).block(Block::default().borders(Borders::ALL).title("Help"));
    f.render_widget(help, chunks[2]);

    draw_toasts(f, f.area(), toasts);
}

fn draw_placeholder(f: &mut Frame, area: Rect, text: &str, color: Color) {
    let body = Paragraph::new(text)
        .wrap(Wrap { trim: false })
        .style(Style::default().fg(color))
        .block(Block::default().borders(Borders::ALL));
    f.render_widget(body, area);
}

fn draw_console(f: &mut Frame, area: Rect, view: &ConsoleView) {
    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(4), // balance + message
            Constraint::Length(5), // bet form
            Constraint::Length(3), // actions
            Constraint::Min(0),    // history
        ])
        .split(area);

    draw_balance(f, rows[0], view);
    draw_bet_form(f, rows[1], view);
    draw_actions(f, rows[2], view);
    if view.show_history {
        draw_history(f, rows[3], view);
    }
}

fn draw_balance(f: &mut Frame, area: Rect, view: &ConsoleView) {
    let mut lines = Vec::new();
    if let Some(user) = &view.user.data {
        lines.push(Line::from(format!("Balance: ${}", user.balance)).bold());
        if let Some(message) = user.message.as_deref().filter(|m| !m.is_empty()) {
            lines.push(Line::from(message.to_string()));
        }
    }
    let balance =
        Paragraph::new(lines).block(Block::default().borders(Borders::ALL).title("Account"));
    f.render_widget(balance, area);
}

fn draw_bet_form(f: &mut Frame, area: Rect, view: &ConsoleView) {
    let submit_label = match view.phase {
        ConsolePhase::Submitting(MutationKind::PlaceBet) => "[Placing bet...]",
        _ => "[Submit Bet]",
    };
    let lines = vec![
        input_line("Amount: ", &view.form.amount, view.focus == Focus::Amount),
        input_line(
            "Dice Number (1-6): ",
            &view.form.dice_number,
            view.focus == Focus::DiceNumber,
        ),
        Line::from(button_span(
            submit_label,
            view.controls.submit_enabled,
            view.focus == Focus::SubmitBet,
        )),
    ];
    let form = Paragraph::new(lines).block(Block::default().borders(Borders::ALL).title("Place a Bet"));
    f.render_widget(form, area);
}

fn draw_actions(f: &mut Frame, area: Rect, view: &ConsoleView) {
    let withdraw_label = match view.phase {
        ConsolePhase::Submitting(MutationKind::Withdraw) => "[Withdrawing...]",
        _ => "[Withdraw]",
    };
    let history_label = if view.show_history {
        "[Hide History]"
    } else {
        "[Show History]"
    };
    let line = Line::from(vec![
        button_span(
            withdraw_label,
            view.controls.withdraw_enabled,
            view.focus == Focus::Withdraw,
        ),
        Span::raw("  "),
        button_span(history_label, true, view.focus == Focus::History),
    ]);
    let actions = Paragraph::new(line).block(Block::default().borders(Borders::ALL).title("Actions"));
    f.render_widget(actions, area);
}

fn draw_history(f: &mut Frame, area: Rect, view: &ConsoleView) {
    let block = Block::default().borders(Borders::ALL).title("Bet History");
    let bets: &[Bet] = match (&view.bets.data, &view.bets.error) {
        (Some(bets), _) => bets.as_slice(),
        (None, Some(error)) => {
            let failed = Paragraph::new(Line::styled(
                format!("Could not load bets: {error}"),
                Style::default().fg(Color::Red),
            ))
            .wrap(Wrap { trim: false })
            .block(block);
            f.render_widget(failed, area);
            return;
        }
        (None, None) => &[],
    };
    if bets.is_empty() {
        let empty = Paragraph::new(Line::styled(
            "No bets placed yet.",
            Style::default().fg(Color::DarkGray),
        ))
        .block(block);
        f.render_widget(empty, area);
        return;
    }

    let header = Row::new(["ID", "Amount", "Dice Number", "Result", "Timestamp"])
        .style(Style::default().add_modifier(Modifier::BOLD));
    let rows = bets.iter().map(history_row);
    let table = Table::new(
        rows,
        [
            Constraint::Min(8),
            Constraint::Length(10),
            Constraint::Length(12),
            Constraint::Length(8),
            Constraint::Length(20),
        ],
    )
    .header(header)
    .block(block);
    f.render_widget(table, area);
}

fn history_row(bet: &Bet) -> Row<'static> {
    let result_style = if bet.result.is_win() {
        Style::default().fg(Color::Green)
    } else {
        Style::default().fg(Color::Red)
    };
    Row::new(vec![
        Cell::from(bet.id.clone()),
        Cell::from(format!("${}", bet.amount)),
        Cell::from(bet.dice_number.to_string()),
        Cell::from(bet.result.to_string()).style(result_style),
        Cell::from(local_timestamp(bet)),
    ])
}

fn local_timestamp(bet: &Bet) -> String {
    bet.timestamp
        .with_timezone(&Local)
        .format("%Y-%m-%d %H:%M:%S")
        .to_string()
}

fn input_line(label: &'static str, value: &str, focused: bool) -> Line<'static> {
    let style = if focused {
        Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD)
    } else {
        Style::default()
    };
    let cursor = if focused { "_" } else { "" };
    Line::from(vec![
        Span::raw(label),
        Span::styled(format!("{value}{cursor}"), style),
    ])
}

fn button_span(label: &'static str, enabled: bool, focused: bool) -> Span<'static> {
    let mut style = if enabled {
        Style::default().fg(Color::Cyan)
    } else {
        Style::default().fg(Color::DarkGray)
    };
    if focused {
        style = style.add_modifier(Modifier::REVERSED);
    }
    Span::styled(label, style)
}

/// Stacks live toasts in the top-right corner, newest last.
fn draw_toasts(f: &mut Frame, area: Rect, toasts: &ToastQueue) {
    let mut y = area.y;
    for toast in toasts.visible() {
        let (rect, lines) = toast_layout(area, y, toast);
        if rect.bottom() > area.bottom() {
            break;
        }
        let color = toast_color(toast.kind);
        let widget = Paragraph::new(lines.into_iter().map(Line::from).collect::<Vec<_>>())
            .style(Style::default().fg(color))
            .block(
                Block::default()
                    .borders(Borders::ALL)
                    .border_style(Style::default().fg(color)),
            );
        f.render_widget(Clear, rect);
        f.render_widget(widget, rect);
        y = rect.bottom();
    }
}

fn toast_layout(area: Rect, y: u16, toast: &Toast) -> (Rect, Vec<String>) {
    let text_width = toast.text.lines().map(UnicodeWidthStr::width).max().unwrap_or(0);
    let width = u16::try_from(text_width)
        .unwrap_or(u16::MAX)
        .saturating_add(2)
        .min(TOAST_MAX_WIDTH)
        .min(area.width);
    let lines = wrap_toast_text(&toast.text, usize::from(width.saturating_sub(2)));
    let height = u16::try_from(lines.len()).unwrap_or(u16::MAX).saturating_add(2);
    let rect = Rect {
        x: area.right() - width,
        y,
        width,
        height,
    };
    (rect, lines)
}

/// Hard-wraps `text` to `width` columns, at most `TOAST_MAX_LINES` lines.
/// Overflow is marked with a trailing ellipsis.
fn wrap_toast_text(text: &str, width: usize) -> Vec<String> {
    let width = width.max(1);
    let mut lines = Vec::new();
    for raw in text.lines() {
        let mut line = String::new();
        let mut used = 0;
        for c in raw.chars() {
            let w = c.width().unwrap_or(0);
            if used + w > width && !line.is_empty() {
                lines.push(std::mem::take(&mut line));
                used = 0;
            }
            line.push(c);
            used += w;
        }
        lines.push(line);
    }
    if lines.is_empty() {
        lines.push(String::new());
    }
    if lines.len() > TOAST_MAX_LINES {
        lines.truncate(TOAST_MAX_LINES);
        if let Some(last) = lines.last_mut() {
            while last.width() >= width && last.pop().is_some() {}
            last.push('…');
        }
    }
    lines
}

fn toast_color(kind: ToastKind) -> Color {
    match kind {
        ToastKind::Success => Color::Green,
        ToastKind::Info => Color::Blue,
        ToastKind::Error => Color::Red,
    }
}
