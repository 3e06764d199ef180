//! UI rendering for Ken.
//!
//! `render()` is the single entry point called by the event loop's
//! `terminal.draw()` closure. It dispatches on the current screen; layout
//! arithmetic lives in `layout.rs`.

mod documents;
mod home;
mod layout;
mod side;
mod viewer;
pub mod help;
pub mod keybindings;

use ratatui::{
    Frame,
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Paragraph},
};

use crate::app::{AppState, Mode, Screen, WorkspaceStatus};
use crate::theme::Theme;
use layout::{
    compute_workspace_layout, inner_rect, render_status_bar, spinner, workspace_header,
};

/// Renders one complete frame.
///
/// Panel rects and viewport heights are written back into `state` so the next
/// key press or click can use them. The one-frame lag is not visible.
///
/// # Arguments
///
/// * `frame` - current render frame provided by `terminal.draw()`
/// * `state` - app state; geometry caches and `side_scroll` are updated here
/// * `theme` - active color theme
pub fn render(frame: &mut Frame, state: &mut AppState, theme: &Theme) {
    frame.render_widget(Block::new().style(Style::default().bg(theme.background)), frame.area());

    match state.screen {
        Screen::Home => home::render_home(frame, state, theme),
        Screen::Workspace => render_workspace(frame, state, theme),
    }

    if state.mode == Mode::HelpOverlay {
        help::render_help_overlay(frame, theme, state.help_scroll);
    }
}

fn render_workspace(frame: &mut Frame, state: &mut AppState, theme: &Theme) {
    let [documents, viewer, side, status_bar] = compute_workspace_layout(frame);
    let header_area = workspace_header(frame);
    state.panel_rects = [documents, viewer, side];
    state.list_viewport_height = inner_rect(documents).height.saturating_sub(1);
    state.set_viewer_area(inner_rect(viewer));

    let glyph = spinner(state);
    let input_active = side::chat_input_active(state.mode, state.input);
    let Some(ws) = state.workspace.as_mut() else {
        render_status_bar(frame, status_bar, state, theme);
        return;
    };

    let header = match &ws.status {
        WorkspaceStatus::Creating => Span::styled(
            format!("{glyph} Creating workspace {}...", ws.workspace_id),
            Style::default().fg(theme.text_muted),
        ),
        WorkspaceStatus::Loading => Span::styled(
            format!("{glyph} Loading workspace {}...", ws.workspace_id),
            Style::default().fg(theme.text_muted),
        ),
        WorkspaceStatus::Ready => Span::styled(
            ws.title().to_owned(),
            Style::default().fg(theme.accent).add_modifier(Modifier::BOLD),
        ),
        WorkspaceStatus::Failed(error) => Span::styled(
            format!("{error}  (r to retry, Esc for home)"),
            Style::default().fg(theme.error),
        ),
    };
    let mut header_spans = vec![header];
    if let Some(ticker) = ws.workspace.as_ref().and_then(|w| w.ticker.as_deref()) {
        header_spans.push(Span::styled(format!("  {ticker}"), Style::default().fg(theme.text_muted)));
    }
    frame.render_widget(Paragraph::new(Line::from(header_spans)), header_area);

    if documents.width > 0 {
        documents::render_documents(frame, documents, ws, theme);
    }
    viewer::render_viewer(frame, viewer, ws, theme, glyph);
    let side_height = if side.width > 0 {
        side::render_side(frame, side, ws, input_active, theme, glyph)
    } else {
        0
    };
    state.side_viewport_height = side_height;

    render_status_bar(frame, status_bar, state, theme);
}
