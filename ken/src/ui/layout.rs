//! Layout arithmetic and shared panel chrome.
//!
//! Called inside `terminal.draw()` on every render, so every frame gets a
//! fresh layout for the current terminal size. Adjacent panel borders overlap
//! by one column and merge through `MergeStrategy::Fuzzy`.

use ratatui::{
    Frame,
    layout::{Constraint, Layout, Margin, Rect, Spacing},
    style::{Modifier, Style},
    symbols::merge::MergeStrategy,
    text::{Line, Span},
    widgets::{Block, BorderType, Paragraph},
};

use crate::app::{AppState, HomeFocus, InputTarget, Mode, PanelFocus, Screen};
use crate::theme::Theme;

/// Terminals narrower than this collapse the document list.
const WIDE_LAYOUT_MIN_COLS: u16 = 120;

const SPINNER: [&str; 4] = ["|", "/", "-", "\\"];

/// Returns `[search, results, workspaces, status_bar]` for the home screen.
pub fn compute_home_layout(frame: &Frame) -> [Rect; 4] {
    let [search, main_area, status_bar] = frame.area().layout(&Layout::vertical([
        Constraint::Length(3),
        Constraint::Fill(1),
        Constraint::Length(1),
    ]));
    let [results, workspaces] = main_area.layout(
        &Layout::horizontal([Constraint::Percentage(50), Constraint::Percentage(50)])
            .spacing(Spacing::Overlap(1)),
    );
    [search, results, workspaces, status_bar]
}

/// Returns `[documents, viewer, side, status_bar]` for the workspace screen.
///
/// | Terminal width | Layout |
/// |----------------|--------|
/// | `< 120` cols   | Document list collapsed; viewer and side panel share the width |
/// | `>= 120` cols  | 22 / 50 / 28 split |
pub fn compute_workspace_layout(frame: &Frame) -> [Rect; 4] {
    let [_header, main_area, status_bar] = frame.area().layout(&Layout::vertical([
        Constraint::Length(1),
        Constraint::Fill(1),
        Constraint::Length(1),
    ]));

    let horizontal = if frame.area().width >= WIDE_LAYOUT_MIN_COLS {
        Layout::horizontal([
            Constraint::Percentage(22),
            Constraint::Percentage(50),
            Constraint::Percentage(28),
        ])
    } else {
        Layout::horizontal([
            Constraint::Length(0),
            Constraint::Percentage(60),
            Constraint::Percentage(40),
        ])
    }
    .spacing(Spacing::Overlap(1));

    let [documents, viewer, side] = main_area.layout(&horizontal);
    [documents, viewer, side, status_bar]
}

/// Row above the workspace panels holding the workspace title.
pub fn workspace_header(frame: &Frame) -> Rect {
    Rect { height: 1, ..frame.area() }
}

/// Inner `Rect` of a panel after removing its border.
pub fn inner_rect(area: Rect) -> Rect {
    area.inner(Margin { vertical: 1, horizontal: 1 })
}

/// Builds a bordered `Block` for a panel.
///
/// Focused panels get a thick border in `border_active`; others a plain one.
///
/// # Arguments
///
/// * `title` - panel title shown in the top border
/// * `is_focused` - `true` when this panel has keyboard focus
/// * `theme` - active color theme
pub fn panel_block<'a>(title: impl Into<Line<'a>>, is_focused: bool, theme: &Theme) -> Block<'a> {
    let border_style = if is_focused {
        Style::default().fg(theme.border_active)
    } else {
        Style::default().fg(theme.border_inactive)
    };
    let border_type = if is_focused { BorderType::Thick } else { BorderType::Plain };

    Block::bordered()
        .title(title)
        .border_type(border_type)
        .border_style(border_style)
        .merge_borders(MergeStrategy::Fuzzy)
}

/// Spinner glyph for the current tick.
pub fn spinner(state: &AppState) -> &'static str {
    SPINNER[(state.tick % SPINNER.len() as u64) as usize]
}

/// Renders the 1-row status bar: mode, location, notice and key hints.
pub fn render_status_bar(frame: &mut Frame, area: Rect, state: &AppState, theme: &Theme) {
    let (mode_text, mode_fg) = match state.mode {
        Mode::Insert => (" INSERT ", theme.status_mode_insert),
        Mode::Normal | Mode::ConfirmQuit | Mode::HelpOverlay => {
            (" NORMAL ", theme.status_mode_normal)
        }
    };

    let mut spans = vec![
        Span::styled(mode_text, Style::default().fg(mode_fg).add_modifier(Modifier::BOLD)),
        Span::raw(" "),
    ];

    let location = match (&state.screen, &state.workspace) {
        (Screen::Workspace, Some(ws)) => format!("Ken / {}", ws.title()),
        _ => "Ken".to_owned(),
    };
    spans.push(Span::raw(location));

    if state.has_active_stream() {
        spans.push(Span::raw(format!("  {} streaming", spinner(state))));
    }

    if state.mode == Mode::ConfirmQuit {
        spans.push(Span::styled(
            "  A response is still streaming. Quit anyway? (y/n)",
            Style::default().fg(theme.error).add_modifier(Modifier::BOLD),
        ));
    } else if let Some(notice) = &state.notice {
        spans.push(Span::styled(format!("  {notice}"), Style::default().fg(theme.error)));
    } else {
        spans.push(Span::styled(
            format!("  {}", key_hints(state)),
            Style::default().fg(theme.text_muted),
        ));
    }

    frame.render_widget(
        Paragraph::new(Line::from(spans))
            .style(Style::default().bg(theme.status_bar_bg).fg(theme.status_bar_fg)),
        area,
    );
}

fn key_hints(state: &AppState) -> &'static str {
    if state.mode == Mode::Insert {
        return match state.input {
            InputTarget::Search => "Enter results  Esc done",
            InputTarget::UploadPath => "Enter upload  Esc cancel",
            InputTarget::ChatPrompt => "Enter send  Esc done",
        };
    }
    match state.screen {
        Screen::Home => match state.home.focus {
            HomeFocus::Search => "/ search  u upload  Tab focus  ? help  q quit",
            HomeFocus::Results => "Enter analyze ticker  Tab focus  ? help",
            HomeFocus::Workspaces => "Enter open  r refresh  Tab focus  ? help",
        },
        Screen::Workspace => match state.workspace.as_ref().map(|w| w.focus) {
            Some(PanelFocus::Documents) => "Enter open  f filter  Esc home  ? help",
            Some(PanelFocus::Viewer) => "Enter select chunk  j/k move  Esc home  ? help",
            _ => "i ask  a start analysis  t activity  Esc home  ? help",
        },
    }
}
