//! Home screen: ticker search, search results, recent workspaces, and the
//! upload prompt.

use chrono::Utc;
use ken_core::types::{relative_time, SearchResult, Workspace};
use ratatui::{
    Frame,
    layout::{Constraint, Rect},
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Clear, List, ListItem, Paragraph, Wrap},
};

use crate::app::{AppState, HomeFocus, InputTarget, Mode};
use crate::theme::Theme;
use crate::ui::layout::{compute_home_layout, inner_rect, panel_block, render_status_bar, spinner};

/// Renders the whole home screen.
pub fn render_home(frame: &mut Frame, state: &mut AppState, theme: &Theme) {
    let [search, results, workspaces, status_bar] = compute_home_layout(frame);
    state.panel_rects = [search, results, workspaces];
    state.list_viewport_height = inner_rect(results).height;

    render_search_box(frame, search, state, theme);
    render_results(frame, results, state, theme);
    render_workspaces(frame, workspaces, state, theme);
    render_status_bar(frame, status_bar, state, theme);

    if state.home.upload_open {
        render_upload_prompt(frame, state, theme);
    }
}

fn editing(state: &AppState, target: InputTarget) -> bool {
    state.mode == Mode::Insert && state.input == target
}

fn render_search_box(frame: &mut Frame, area: Rect, state: &AppState, theme: &Theme) {
    let focused = state.home.focus == HomeFocus::Search;
    let query = state.home.search.query();

    let line = if query.is_empty() && !editing(state, InputTarget::Search) {
        Line::from(Span::styled(
            "Press / and type a ticker or company name",
            Style::default().fg(theme.text_muted),
        ))
    } else {
        let mut spans = vec![Span::styled(query.to_owned(), Style::default().fg(theme.text))];
        if editing(state, InputTarget::Search) {
            spans.push(Span::styled("_", Style::default().fg(theme.accent)));
        }
        Line::from(spans)
    };

    frame.render_widget(
        Paragraph::new(line).block(panel_block(" Search ", focused, theme)),
        area,
    );
}

fn render_results(frame: &mut Frame, area: Rect, state: &mut AppState, theme: &Theme) {
    let focused = matches!(state.home.focus, HomeFocus::Results);
    let search = &state.home.search;
    let title = if search.results().is_empty() {
        " Results ".to_owned()
    } else {
        format!(" Results ({}) ", search.results().len())
    };

    let items: Vec<ListItem> = if search.is_loading() {
        vec![ListItem::new(Line::styled(
            format!("{} Searching...", spinner(state)),
            Style::default().fg(theme.text_muted),
        ))]
    } else if let Some(error) = search.error() {
        vec![ListItem::new(Line::styled(
            error.to_owned(),
            Style::default().fg(theme.error),
        ))]
    } else if search.results().is_empty() {
        let hint = if search.query().trim().is_empty() {
            "Results appear here as you type"
        } else {
            "No matching tickers"
        };
        vec![ListItem::new(Line::styled(hint, Style::default().fg(theme.text_muted)))]
    } else {
        search.results().iter().map(|r| result_item(r, theme)).collect()
    };

    let list = List::new(items)
        .block(panel_block(title, focused, theme))
        .highlight_style(
            Style::default()
                .bg(theme.selection_bg)
                .add_modifier(Modifier::BOLD),
        );
    frame.render_stateful_widget(list, area, &mut state.home.results_state);
}

fn result_item<'a>(result: &'a SearchResult, theme: &Theme) -> ListItem<'a> {
    ListItem::new(Line::from(vec![
        Span::styled(
            format!("{:<8}", result.symbol),
            Style::default().fg(theme.accent).add_modifier(Modifier::BOLD),
        ),
        Span::styled(result.name.as_str(), Style::default().fg(theme.text)),
    ]))
}

fn render_workspaces(frame: &mut Frame, area: Rect, state: &mut AppState, theme: &Theme) {
    let focused = state.home.focus == HomeFocus::Workspaces;
    let workspaces = &state.home.workspaces;
    let now = Utc::now();

    let items: Vec<ListItem> = if state.home.workspaces_loading && workspaces.is_empty() {
        vec![ListItem::new(Line::styled(
            format!("{} Loading workspaces...", spinner(state)),
            Style::default().fg(theme.text_muted),
        ))]
    } else if let Some(error) = &state.home.workspaces_error {
        vec![ListItem::new(Line::styled(
            format!("{error}  (r to retry)"),
            Style::default().fg(theme.error),
        ))]
    } else if workspaces.is_empty() {
        vec![ListItem::new(Line::styled(
            "No workspaces yet",
            Style::default().fg(theme.text_muted),
        ))]
    } else {
        workspaces
            .iter()
            .map(|w| workspace_item(w, now, theme))
            .collect()
    };

    let list = List::new(items)
        .block(panel_block(" Workspaces ", focused, theme))
        .highlight_style(
            Style::default()
                .bg(theme.selection_bg)
                .add_modifier(Modifier::BOLD),
        );
    frame.render_stateful_widget(list, area, &mut state.home.workspaces_state);
}

fn workspace_item<'a>(
    workspace: &'a Workspace,
    now: chrono::DateTime<Utc>,
    theme: &Theme,
) -> ListItem<'a> {
    let mut spans = vec![Span::styled(
        workspace.display_name(),
        Style::default().fg(theme.text),
    )];
    if let Some(ticker) = &workspace.ticker {
        spans.push(Span::styled(
            format!("  {ticker}"),
            Style::default().fg(theme.accent),
        ));
    }
    if let Some(created) = &workspace.created_at {
        spans.push(Span::styled(
            format!("  {}", relative_time(created, now)),
            Style::default().fg(theme.text_muted),
        ));
    }
    ListItem::new(Line::from(spans))
}

/// Centred prompt asking for the path of a file to upload.
fn render_upload_prompt(frame: &mut Frame, state: &AppState, theme: &Theme) {
    if frame.area().width < 40 {
        return;
    }
    let area = frame
        .area()
        .centered(Constraint::Percentage(60), Constraint::Length(7));
    frame.render_widget(Clear, area);

    let mut path = vec![
        Span::raw("Path: "),
        Span::styled(state.home.upload_path.clone(), Style::default().fg(theme.text)),
    ];
    if editing(state, InputTarget::UploadPath) {
        path.push(Span::styled("_", Style::default().fg(theme.accent)));
    }
    let mut lines = vec![Line::from(path), Line::from("")];
    match &state.home.upload_error {
        Some(error) => lines.push(Line::styled(error.clone(), Style::default().fg(theme.error))),
        None => lines.push(Line::styled(
            "Enter to upload, Esc to cancel",
            Style::default().fg(theme.text_muted),
        )),
    }

    let block = Block::bordered()
        .title(" Upload a document ")
        .border_style(Style::default().fg(theme.border_active));
    frame.render_widget(
        Paragraph::new(lines).block(block).wrap(Wrap { trim: false }),
        area,
    );
}
