//! Document viewer panel.
//!
//! Plain text goes through the windowed renderer: only the lines inside the
//! current window are turned into widgets, and the scrollbar is sized from the
//! full document height so the scroll extent stays fixed while the window
//! moves. Markup is shown line by line with a cursor for chunk selection; the
//! lines of the selected chunk carry a gutter mark.

use ratatui::{
    Frame,
    layout::{Margin, Rect},
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::{Paragraph, Scrollbar, ScrollbarOrientation, ScrollbarState, Wrap},
};

use crate::app::{MarkupView, PanelFocus, ViewerContent, WindowedText, WorkspaceState};
use crate::theme::Theme;
use crate::ui::layout::{inner_rect, panel_block};

/// Renders the centre panel of the workspace screen.
///
/// # Arguments
///
/// * `frame` - current render frame
/// * `area` - the `Rect` for the centre panel (includes borders)
/// * `ws` - workspace state supplying the viewer content and selected chunk
/// * `theme` - active color theme
/// * `spinner` - loading glyph for the current tick
pub fn render_viewer(
    frame: &mut Frame,
    area: Rect,
    ws: &WorkspaceState,
    theme: &Theme,
    spinner: &str,
) {
    let is_focused = ws.focus == PanelFocus::Viewer;
    let title = match &ws.viewer.document {
        Some(document) => format!(" {} ", document.file_name()),
        None => " Viewer ".to_owned(),
    };
    frame.render_widget(panel_block(title, is_focused, theme), area);
    let inner = inner_rect(area);

    match &ws.viewer.content {
        ViewerContent::Empty => render_message(
            frame,
            inner,
            "Select a document and press Enter to open it",
            Style::default().fg(theme.text_muted),
        ),
        ViewerContent::Loading => render_message(
            frame,
            inner,
            &format!("{spinner} Loading document..."),
            Style::default().fg(theme.text_muted),
        ),
        ViewerContent::Failed(error) => render_message(
            frame,
            inner,
            &format!("Could not load document: {error}"),
            Style::default().fg(theme.error),
        ),
        ViewerContent::Pdf(preview) => {
            let lines = vec![
                Line::styled("PDF document", Style::default().fg(theme.accent).add_modifier(Modifier::BOLD)),
                Line::from(""),
                Line::from(vec![
                    Span::styled("Saved to  ", Style::default().fg(theme.text_muted)),
                    Span::styled(preview.path().display().to_string(), Style::default().fg(theme.text)),
                ]),
                Line::from(vec![
                    Span::styled("Size      ", Style::default().fg(theme.text_muted)),
                    Span::styled(format_size(preview.size()), Style::default().fg(theme.text)),
                ]),
                Line::from(""),
                Line::styled(
                    "Open the file above in a PDF viewer. It is removed when another document is opened.",
                    Style::default().fg(theme.text_muted),
                ),
            ];
            frame.render_widget(Paragraph::new(lines).wrap(Wrap { trim: false }), inner);
        }
        ViewerContent::Windowed(text) => render_windowed(frame, area, inner, text, theme),
        ViewerContent::Markup(view) => {
            let chunk_id = ws.chunk.as_ref().map(|c| c.id.as_str());
            render_markup(frame, area, inner, view, chunk_id, is_focused, theme);
        }
    }
}

fn render_message(frame: &mut Frame, area: Rect, text: &str, style: Style) {
    frame.render_widget(
        Paragraph::new(Line::styled(text.to_owned(), style)).wrap(Wrap { trim: false }),
        area,
    );
}

fn render_windowed(frame: &mut Frame, area: Rect, inner: Rect, text: &WindowedText, theme: &Theme) {
    let lines: Vec<Line> = text
        .viewport_lines()
        .map(|l| Line::styled(l, Style::default().fg(theme.text)))
        .collect();
    frame.render_widget(Paragraph::new(lines), inner);

    let total = text.layout().total_height;
    if total > text.viewport_height() {
        let mut scrollbar = ScrollbarState::new(total as usize)
            .position(text.scroll_top() as usize)
            .viewport_content_length(text.viewport_height() as usize);
        frame.render_stateful_widget(
            Scrollbar::new(ScrollbarOrientation::VerticalRight),
            area.inner(Margin { vertical: 1, horizontal: 0 }),
            &mut scrollbar,
        );
    }
}

fn render_markup(
    frame: &mut Frame,
    area: Rect,
    inner: Rect,
    view: &MarkupView,
    chunk_id: Option<&str>,
    is_focused: bool,
    theme: &Theme,
) {
    let height = usize::from(inner.height);
    let end = (view.scroll + height).min(view.line_count());
    let lines: Vec<Line> = (view.scroll..end)
        .map(|i| {
            let text = view.lines().line(i).unwrap_or_default();
            let in_chunk = chunk_id.is_some() && view.anchor_at_line(i) == chunk_id;
            let gutter = if in_chunk {
                Span::styled("| ", Style::default().fg(theme.accent))
            } else {
                Span::raw("  ")
            };
            let mut style = Style::default().fg(theme.text);
            if is_focused && i == view.cursor {
                style = style.bg(theme.selection_bg);
            }
            Line::from(vec![gutter, Span::styled(text, style)])
        })
        .collect();
    frame.render_widget(Paragraph::new(lines), inner);

    if view.line_count() > height {
        let mut scrollbar = ScrollbarState::new(view.line_count())
            .position(view.scroll)
            .viewport_content_length(height);
        frame.render_stateful_widget(
            Scrollbar::new(ScrollbarOrientation::VerticalRight),
            area.inner(Margin { vertical: 1, horizontal: 0 }),
            &mut scrollbar,
        );
    }
}

fn format_size(bytes: usize) -> String {
    match bytes {
        b if b < 1024 => format!("{b} B"),
        b if b < 1024 * 1024 => format!("{:.1} KB", b as f64 / 1024.0),
        b => format!("{:.1} MB", b as f64 / (1024.0 * 1024.0)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sizes_use_binary_units() {
        assert_eq!(format_size(512), "512 B");
        assert_eq!(format_size(2048), "2.0 KB");
        assert_eq!(format_size(3 * 1024 * 1024), "3.0 MB");
    }
}
