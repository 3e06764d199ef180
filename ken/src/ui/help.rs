//! Help overlay.
//!
//! Drawn inside the same `terminal.draw()` closure as the panels: `Clear`
//! erases the area first, then a bordered `Paragraph` lists the keybindings.

use ratatui::{
    Frame,
    layout::Constraint,
    style::{Modifier, Style},
    text::{Line, Text},
    widgets::{Block, Clear, Paragraph, Wrap},
};

use crate::theme::Theme;

/// Renders the help overlay as a centred modal on top of the current screen.
///
/// Skipped on terminals narrower than 60 columns.
///
/// # Arguments
///
/// * `frame` - current render frame
/// * `theme` - active color theme
/// * `help_scroll` - vertical scroll offset, changed by j/k while the overlay is open
pub fn render_help_overlay(frame: &mut Frame, theme: &Theme, help_scroll: u16) {
    if frame.area().width < 60 {
        return;
    }

    let overlay_area = frame
        .area()
        .centered(Constraint::Percentage(80), Constraint::Percentage(80));
    frame.render_widget(Clear, overlay_area);

    let block = Block::bordered()
        .title(" Help  (j/k scroll, ? or Esc to close) ")
        .border_style(Style::default().fg(theme.border_active));

    frame.render_widget(
        Paragraph::new(build_help_text(theme))
            .block(block)
            .wrap(Wrap { trim: false })
            .scroll((help_scroll, 0)),
        overlay_area,
    );
}

fn build_help_text(theme: &Theme) -> Text<'static> {
    let heading = Style::default().fg(theme.accent).add_modifier(Modifier::BOLD);
    Text::from(vec![
        Line::styled("Navigation", heading),
        Line::from("  j / k         Move down / up"),
        Line::from("  g / G         Jump to top / bottom"),
        Line::from("  Ctrl-d / u    Half page down / up"),
        Line::from("  Ctrl-f / b    Full page down / up"),
        Line::from("  Tab / H / L   Move panel focus"),
        Line::from(""),
        Line::styled("Home", heading),
        Line::from("  /             Search tickers"),
        Line::from("  Enter         Analyze the selected ticker or open the selected workspace"),
        Line::from("  u             Upload a document into a new workspace"),
        Line::from("  r             Reload the workspace list"),
        Line::from(""),
        Line::styled("Workspace", heading),
        Line::from("  Enter         Open document (list) / select chunk (viewer)"),
        Line::from("  f             Cycle the document filter"),
        Line::from("  t             Switch between chat and activity"),
        Line::from("  a             Start the analysis"),
        Line::from("  i             Ask the analyst"),
        Line::from("  r             Retry / reload activity"),
        Line::from("  Esc / Bksp    Back to home"),
        Line::from(""),
        Line::styled("Editing", heading),
        Line::from("  Enter         Submit"),
        Line::from("  Esc           Stop editing"),
        Line::from(""),
        Line::styled("General", heading),
        Line::from("  ?             Open / close this help"),
        Line::from("  q             Quit (asks first while a response is streaming)"),
    ])
}
