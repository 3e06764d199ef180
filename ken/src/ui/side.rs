//! Right panel of the workspace screen: the chunk chat or the activity log.
//!
//! Chat text is wrapped here rather than by `Paragraph`, so the renderer knows
//! the exact row count and can clamp `side_scroll` to it. `u16::MAX` means
//! "follow the newest message".

use std::borrow::Cow;

use chrono::Utc;
use ken_core::chat::{ChatMessage, Role};
use ken_core::types::{relative_time, Activity, ActivityStatus};
use ratatui::{
    Frame,
    layout::{Constraint, Layout, Rect},
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::Paragraph,
};
use unicode_width::{UnicodeWidthChar, UnicodeWidthStr};

use crate::app::{InputTarget, Mode, PanelFocus, SidePanel, WorkspaceState};
use crate::theme::Theme;
use crate::ui::layout::{inner_rect, panel_block};

/// Renders the side panel and returns the height of its scrollable area.
///
/// # Arguments
///
/// * `frame` - current render frame
/// * `area` - the `Rect` for the right panel (includes borders)
/// * `ws` - workspace state; `side_scroll` is clamped in place
/// * `input_active` - `true` while the chat prompt receives keystrokes
/// * `theme` - active color theme
/// * `spinner` - loading glyph for the current tick
pub fn render_side(
    frame: &mut Frame,
    area: Rect,
    ws: &mut WorkspaceState,
    input_active: bool,
    theme: &Theme,
    spinner: &str,
) -> u16 {
    let is_focused = ws.focus == PanelFocus::Side;
    let title = match ws.side {
        SidePanel::Chat => " Chat  (t: activity) ",
        SidePanel::Activity => " Activity  (t: chat) ",
    };
    frame.render_widget(panel_block(title, is_focused, theme), area);
    let inner = inner_rect(area);

    match ws.side {
        SidePanel::Chat => render_chat(frame, inner, ws, input_active, theme, spinner),
        SidePanel::Activity => render_activity(frame, inner, ws, theme, spinner),
    }
}

/// Whether the chat prompt is the active insert target.
pub fn chat_input_active(mode: Mode, input: InputTarget) -> bool {
    mode == Mode::Insert && input == InputTarget::ChatPrompt
}

fn render_chat(
    frame: &mut Frame,
    inner: Rect,
    ws: &mut WorkspaceState,
    input_active: bool,
    theme: &Theme,
    spinner: &str,
) -> u16 {
    let header_rows = if ws.chunk.is_some() { 2 } else { 0 };
    let [header, body, input] = inner.layout(&Layout::vertical([
        Constraint::Length(header_rows),
        Constraint::Fill(1),
        Constraint::Length(1),
    ]));

    if let Some(chunk) = &ws.chunk {
        let preview = chunk
            .markdown
            .lines()
            .map(str::trim)
            .find(|l| !l.is_empty())
            .unwrap_or("");
        frame.render_widget(
            Paragraph::new(vec![
                Line::styled(
                    format!("Chunk {}", chunk.id),
                    Style::default().fg(theme.accent).add_modifier(Modifier::BOLD),
                ),
                Line::styled(truncate(preview, usize::from(header.width)), Style::default().fg(theme.text_muted)),
            ]),
            header,
        );
    }

    let width = usize::from(body.width.max(1));
    let mut lines: Vec<Line> = Vec::new();
    if ws.chat.messages().is_empty() {
        let hint = if ws.chunk.is_some() {
            "Press a to start the analysis, or i to ask a question."
        } else {
            "Select a chunk in the viewer (Enter) to discuss it, or press i to ask about the workspace."
        };
        for row in wrap_text(hint, width) {
            lines.push(Line::styled(row, Style::default().fg(theme.text_muted)));
        }
    }
    for message in ws.chat.messages() {
        push_message(&mut lines, message, width, theme);
    }
    if ws.chat.is_streaming() {
        lines.push(Line::styled(format!("{spinner} thinking"), Style::default().fg(theme.text_muted)));
    }

    let max_scroll = u16::try_from(lines.len().saturating_sub(usize::from(body.height)))
        .unwrap_or(u16::MAX);
    ws.side_scroll = ws.side_scroll.min(max_scroll);
    frame.render_widget(Paragraph::new(lines).scroll((ws.side_scroll, 0)), body);

    let prompt_style = if input_active {
        Style::default().fg(theme.text)
    } else {
        Style::default().fg(theme.text_muted)
    };
    let mut spans = vec![Span::styled("> ", Style::default().fg(theme.accent))];
    if ws.chat_input.is_empty() && !input_active {
        spans.push(Span::styled("press i to type", prompt_style));
    } else {
        let visible = tail(&ws.chat_input, usize::from(input.width.saturating_sub(3)));
        spans.push(Span::styled(visible.to_owned(), prompt_style));
        if input_active {
            spans.push(Span::styled("_", Style::default().fg(theme.accent)));
        }
    }
    frame.render_widget(Paragraph::new(Line::from(spans)), input);

    body.height
}

fn push_message(lines: &mut Vec<Line<'static>>, message: &ChatMessage, width: usize, theme: &Theme) {
    let (label, color) = match message.role {
        Role::User => ("You", theme.chat_user),
        Role::Assistant => ("Ken", theme.chat_assistant),
        Role::Error => ("Error", theme.error),
    };
    if !lines.is_empty() {
        lines.push(Line::from(""));
    }
    lines.push(Line::styled(label, Style::default().fg(color).add_modifier(Modifier::BOLD)));
    let body_style = match message.role {
        Role::Error => Style::default().fg(theme.error),
        _ => Style::default().fg(theme.text),
    };
    for row in wrap_text(&message.content, width) {
        lines.push(Line::styled(row, body_style));
    }
}

fn render_activity(
    frame: &mut Frame,
    inner: Rect,
    ws: &mut WorkspaceState,
    theme: &Theme,
    spinner: &str,
) -> u16 {
    let width = usize::from(inner.width.max(1));
    let mut lines: Vec<Line> = Vec::new();

    if ws.activities_loading && ws.activities.is_empty() {
        lines.push(Line::styled(format!("{spinner} Loading activity..."), Style::default().fg(theme.text_muted)));
    } else if let Some(error) = &ws.activities_error {
        lines.push(Line::styled(format!("{error}  (r to retry)"), Style::default().fg(theme.error)));
    } else if ws.activities.is_empty() {
        lines.push(Line::styled("No activity yet", Style::default().fg(theme.text_muted)));
    }

    let now = Utc::now();
    for activity in &ws.activities {
        push_activity(&mut lines, activity, now, width, theme);
    }

    let max_scroll = u16::try_from(lines.len().saturating_sub(usize::from(inner.height)))
        .unwrap_or(u16::MAX);
    ws.side_scroll = ws.side_scroll.min(max_scroll);
    frame.render_widget(Paragraph::new(lines).scroll((ws.side_scroll, 0)), inner);
    inner.height
}

fn push_activity(
    lines: &mut Vec<Line<'static>>,
    activity: &Activity,
    now: chrono::DateTime<Utc>,
    width: usize,
    theme: &Theme,
) {
    let dot = match activity.status_kind() {
        ActivityStatus::Succeeded => theme.activity_ok,
        ActivityStatus::Failed => theme.activity_failed,
        ActivityStatus::Neutral => theme.activity_neutral,
    };
    lines.push(Line::from(vec![
        Span::styled("* ", Style::default().fg(dot)),
        Span::styled(activity.title.clone(), Style::default().fg(theme.text).add_modifier(Modifier::BOLD)),
        Span::styled(
            format!("  {}", relative_time(&activity.created_at, now)),
            Style::default().fg(theme.text_muted),
        ),
    ]));
    for row in wrap_text(&activity.message, width.saturating_sub(2).max(1)) {
        lines.push(Line::styled(format!("  {row}"), Style::default().fg(theme.text_muted)));
    }
}

/// Word-wraps `text` to rows of at most `width` terminal columns.
///
/// Explicit newlines always break; words longer than a row are split.
fn wrap_text(text: &str, width: usize) -> Vec<String> {
    textwrap::wrap(text, width.max(1))
        .into_iter()
        .map(Cow::into_owned)
        .collect()
}

fn truncate(text: &str, width: usize) -> String {
    if text.width() <= width {
        return text.to_owned();
    }
    let budget = width.saturating_sub(3);
    let mut used = 0;
    let mut out = String::new();
    for c in text.chars() {
        let w = c.width().unwrap_or(0);
        if used + w > budget {
            break;
        }
        used += w;
        out.push(c);
    }
    out.push_str("...");
    out
}

/// Trailing part of `text` that fits in `width` columns, so the cursor end of a
/// long prompt stays visible.
fn tail(text: &str, width: usize) -> &str {
    let mut used = 0;
    let mut start = text.len();
    for (i, c) in text.char_indices().rev() {
        let w = c.width().unwrap_or(0);
        if used + w > width {
            break;
        }
        used += w;
        start = i;
    }
    &text[start..]
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn wraps_on_word_boundaries() {
        assert_eq!(
            wrap_text("revenue grew four percent", 12),
            vec!["revenue grew", "four percent"]
        );
    }

    #[test]
    fn splits_words_longer_than_a_row() {
        assert_eq!(wrap_text("abcdefghij", 4), vec!["abcd", "efgh", "ij"]);
    }

    #[test]
    fn keeps_blank_lines() {
        assert_eq!(wrap_text("a\n\nb", 10), vec!["a", "", "b"]);
    }

    #[test]
    fn wide_glyphs_fit_the_row_width() {
        let rows = wrap_text("利润增长百分之八", 8);
        assert_eq!(rows, vec!["利润增长", "百分之八"]);
        assert!(rows.iter().all(|row| row.width() <= 8));

        let mixed = wrap_text("净利润 rose 百分之八 in 2024", 10);
        assert!(mixed.iter().all(|row| row.width() <= 10), "{mixed:?}");
    }

    #[test]
    fn tail_keeps_the_end_of_long_input() {
        assert_eq!(tail("what was net income", 6), "income");
        assert_eq!(tail("short", 10), "short");
        assert_eq!(tail("利润增长", 5), "增长");
    }

    #[test]
    fn truncate_marks_cut_text() {
        assert_eq!(truncate("Revenue and costs", 10), "Revenue...");
        assert_eq!(truncate("利润增长百分之八", 9), "利润增...");
    }
}
