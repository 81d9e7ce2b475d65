//! Dashboard rendering
//!
//! One frame is: header with the session badge, stat tiles, the chat pane
//! next to the intelligence panel, and the input box.

use crate::intelligence::ScamIntelligence;
use crate::runtime::SessionView;
use crate::state_machine::{MessageRole, SessionStatus};
use chrono::Local;
use ratatui::{
    layout::{Constraint, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span, Text},
    widgets::{Block, Borders, Paragraph, Scrollbar, ScrollbarOrientation, ScrollbarState, Wrap},
    Frame,
};

const EMPTY_CHAT: &str = "Waiting for incoming scam message...";
const EMPTY_INTEL: &str = "Waiting for extraction...";
const THINKING: &str = "Agent is thinking...";
const INPUT_PLACEHOLDER: &str = "Simulate scammer message...";
const KEY_HINT: &str = " Enter send │ Esc cancel │ ↑↓ PgUp/PgDn scroll │ Ctrl+Q quit ";

/// Chat pane geometry from the last frame, used to clamp scrolling
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ScrollInfo {
    pub total_lines: usize,
    pub viewport_height: usize,
}

impl ScrollInfo {
    pub fn max_scroll(self) -> usize {
        self.total_lines.saturating_sub(self.viewport_height)
    }
}

/// Draw a full frame. `scroll` is clamped; `usize::MAX` pins to the bottom.
pub fn draw(
    f: &mut Frame,
    view: &SessionView,
    input: &str,
    error: Option<&str>,
    scroll: usize,
) -> ScrollInfo {
    let rows = Layout::vertical([
        Constraint::Length(3),
        Constraint::Length(3),
        Constraint::Min(6),
        Constraint::Length(3),
    ])
    .split(f.area());
    let body = Layout::horizontal([Constraint::Percentage(65), Constraint::Percentage(35)])
        .split(rows[2]);

    draw_header(f, rows[0], view);
    draw_stats(f, rows[1], view);
    let info = draw_chat(f, body[0], view, scroll);
    draw_intelligence(f, body[1], &view.session.intelligence);
    draw_input(f, rows[3], view, input, error);
    info
}

fn status_color(status: SessionStatus) -> Color {
    match status {
        SessionStatus::Idle => Color::Gray,
        SessionStatus::Detecting => Color::Yellow,
        SessionStatus::Engaging => Color::Red,
        SessionStatus::Completed => Color::Green,
    }
}

fn draw_header(f: &mut Frame, area: Rect, view: &SessionView) {
    let session = &view.session;
    let mut spans = vec![
        Span::styled(
            " HONEY-POT AGENT ",
            Style::default().add_modifier(Modifier::BOLD),
        ),
        Span::raw(" "),
        Span::styled(
            format!(" {} ", session.status.as_str().to_uppercase()),
            Style::default()
                .fg(Color::Black)
                .bg(status_color(session.status))
                .add_modifier(Modifier::BOLD),
        ),
    ];
    if !session.persona.is_empty() {
        spans.push(Span::raw(format!("  Persona: {}", session.persona)));
    }
    if session.is_scam {
        spans.push(Span::raw(format!(
            "  Confidence: {:.0}%",
            session.confidence * 100.0
        )));
    }
    if view.busy {
        spans.push(Span::styled(
            format!("  [{}]", view.phase.describe()),
            Style::default().fg(Color::DarkGray),
        ));
    }

    let block = Block::default()
        .title(" Agent Command Center ")
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Yellow));
    f.render_widget(Paragraph::new(Line::from(spans)).block(block), area);
}

fn draw_stats(f: &mut Frame, area: Rect, view: &SessionView) {
    let tiles = Layout::horizontal([Constraint::Ratio(1, 3); 3]).split(area);
    let (agent_status, agent_color) = if view.stats.engaged {
        ("ENGAGED", Color::Red)
    } else if view.session.status == SessionStatus::Idle {
        ("STANDBY", Color::Gray)
    } else {
        ("MONITORING", Color::Yellow)
    };

    let values = [
        (
            "Messages Intercepted",
            format!(
                "{}  ({})",
                view.stats.messages_intercepted,
                replies_label(view.stats.agent_replies)
            ),
            Color::Cyan,
        ),
        ("Intel Points", view.stats.intel_points.to_string(), Color::Green),
        ("Agent Status", agent_status.to_string(), agent_color),
    ];
    for ((title, value, color), tile) in values.into_iter().zip(tiles.iter()) {
        let block = Block::default()
            .title(format!(" {title} "))
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::DarkGray));
        let paragraph = Paragraph::new(Span::styled(
            value,
            Style::default().fg(color).add_modifier(Modifier::BOLD),
        ))
        .block(block);
        f.render_widget(paragraph, *tile);
    }
}

fn replies_label(count: usize) -> String {
    if count == 1 {
        "1 reply".to_string()
    } else {
        format!("{count} replies")
    }
}

fn draw_chat(f: &mut Frame, area: Rect, view: &SessionView, scroll: usize) -> ScrollInfo {
    let block = Block::default()
        .title(" Live Conversation ")
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Blue));
    // Borders plus scrollbar column
    let content_width = usize::from(area.width.saturating_sub(3));

    let mut lines: Vec<Line> = Vec::new();
    if view.session.messages.is_empty() && !view.busy {
        lines.push(Line::from(Span::styled(
            EMPTY_CHAT,
            Style::default()
                .fg(Color::DarkGray)
                .add_modifier(Modifier::ITALIC),
        )));
    }

    for (idx, m) in view.session.messages.iter().enumerate() {
        if idx > 0 {
            lines.push(Line::default());
        }
        let (label, color) = match m.role {
            MessageRole::Incoming => ("Incoming Message", Color::Red),
            MessageRole::Agent => ("Honey-Pot Agent", Color::Green),
            MessageRole::System => ("System", Color::Gray),
        };
        lines.push(Line::from(vec![
            Span::styled(label, Style::default().fg(color).add_modifier(Modifier::BOLD)),
            Span::styled(
                format!("  {}", m.timestamp.with_timezone(&Local).format("%H:%M:%S")),
                Style::default().fg(Color::DarkGray),
            ),
        ]));
        for line in wrap_text(&m.text, content_width.saturating_sub(2).max(20)) {
            lines.push(Line::from(format!("  {line}")));
        }
    }

    if view.busy {
        if !lines.is_empty() {
            lines.push(Line::default());
        }
        lines.push(Line::from(Span::styled(
            THINKING,
            Style::default()
                .fg(Color::DarkGray)
                .add_modifier(Modifier::ITALIC),
        )));
    }

    let viewport_height = usize::from(area.height.saturating_sub(2));
    let info = ScrollInfo {
        total_lines: lines.len(),
        viewport_height,
    };
    let offset = scroll.min(info.max_scroll());

    let paragraph = Paragraph::new(Text::from(lines))
        .block(block)
        .scroll((u16::try_from(offset).unwrap_or(u16::MAX), 0));
    f.render_widget(paragraph, area);

    if info.total_lines > viewport_height {
        let mut state = ScrollbarState::new(info.total_lines)
            .position(offset)
            .viewport_content_length(viewport_height);
        let scrollbar = Scrollbar::new(ScrollbarOrientation::VerticalRight)
            .thumb_symbol("█")
            .track_symbol(Some("░"));
        f.render_stateful_widget(scrollbar, area, &mut state);
    }

    info
}

fn draw_intelligence(f: &mut Frame, area: Rect, intel: &ScamIntelligence) {
    let block = Block::default()
        .title(" REAL-TIME INTEL ")
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Green));

    let sections = [
        ("UPI IDs", &intel.upi_ids),
        ("Bank Accounts", &intel.bank_accounts),
        ("Phishing URLs", &intel.phishing_urls),
        ("Contacts", &intel.phone_numbers),
    ];

    let mut lines: Vec<Line> = Vec::new();
    if intel.is_empty() {
        lines.push(Line::from(Span::styled(
            EMPTY_INTEL,
            Style::default()
                .fg(Color::DarkGray)
                .add_modifier(Modifier::ITALIC),
        )));
    }
    for (title, entries) in sections {
        if entries.is_empty() {
            continue;
        }
        lines.push(Line::from(Span::styled(
            title.to_uppercase(),
            Style::default()
                .fg(Color::DarkGray)
                .add_modifier(Modifier::BOLD),
        )));
        for entry in entries {
            lines.push(Line::from(Span::styled(
                format!("  {entry}"),
                Style::default().fg(Color::Green),
            )));
        }
        lines.push(Line::default());
    }
    if !intel.scam_type.is_empty() {
        if intel.is_empty() {
            lines.push(Line::default());
        }
        lines.push(Line::from(Span::styled(
            "Detected Category",
            Style::default().fg(Color::DarkGray),
        )));
        lines.push(Line::from(Span::styled(
            intel.scam_type.clone(),
            Style::default().add_modifier(Modifier::BOLD),
        )));
    }

    let paragraph = Paragraph::new(Text::from(lines))
        .block(block)
        .wrap(Wrap { trim: false });
    f.render_widget(paragraph, area);
}

fn draw_input(f: &mut Frame, area: Rect, view: &SessionView, input: &str, error: Option<&str>) {
    let error = error.or(view.notice.as_deref());
    let (title, border) = if let Some(err) = error {
        (format!(" {err} "), Color::Red)
    } else if view.busy {
        (format!(" {THINKING} "), Color::DarkGray)
    } else {
        (" Incoming Message ".to_string(), Color::Blue)
    };

    let block = Block::default()
        .title(title)
        .title_bottom(Line::from(Span::styled(
            KEY_HINT,
            Style::default().fg(Color::DarkGray),
        )))
        .borders(Borders::ALL)
        .border_style(Style::default().fg(border));

    let paragraph = if input.is_empty() {
        Paragraph::new(Span::styled(
            INPUT_PLACEHOLDER,
            Style::default().fg(Color::DarkGray),
        ))
    } else if view.busy {
        Paragraph::new(Span::styled(input, Style::default().fg(Color::DarkGray)))
    } else {
        Paragraph::new(input)
    };
    f.render_widget(paragraph.block(block), area);

    if !view.busy {
        let typed = u16::try_from(input.chars().count()).unwrap_or(u16::MAX);
        let x = area
            .x
            .saturating_add(1)
            .saturating_add(typed)
            .min(area.right().saturating_sub(2));
        f.set_cursor_position((x, area.y + 1));
    }
}

/// Break text into lines of at most `width` characters, honouring newlines
pub fn wrap_text(s: &str, width: usize) -> Vec<String> {
    if width == 0 {
        return vec![s.to_string()];
    }
    let mut lines = Vec::new();
    for para in s.split('\n') {
        let mut line = String::new();
        let mut count = 0;
        for ch in para.chars() {
            if count >= width {
                lines.push(std::mem::take(&mut line));
                count = 0;
            }
            line.push(ch);
            count += 1;
        }
        lines.push(line);
    }
    lines
}
