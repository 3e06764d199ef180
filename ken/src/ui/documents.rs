//! Document list panel: filter tabs above a list of the workspace's documents.
//!
//! Each row shows a file-type badge, the file name, and the filing date when
//! the backend provided one.

use ken_core::types::{short_date, DocFilter, Document, FileKind};
use ratatui::{
    Frame,
    layout::{Constraint, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{List, ListItem, Paragraph},
};

use crate::app::{PanelFocus, WorkspaceState, WorkspaceStatus};
use crate::theme::Theme;
use crate::ui::layout::{inner_rect, panel_block};

/// Renders the left panel of the workspace screen.
///
/// # Arguments
///
/// * `frame` - current render frame
/// * `area` - the `Rect` for the left panel (includes borders)
/// * `ws` - workspace state supplying documents, filter and list selection
/// * `theme` - active color theme
pub fn render_documents(frame: &mut Frame, area: Rect, ws: &mut WorkspaceState, theme: &Theme) {
    let is_focused = ws.focus == PanelFocus::Documents;
    let count = ws.filtered_documents().len();
    let title = if count > 0 {
        format!(" Documents ({count}) ")
    } else {
        " Documents ".to_owned()
    };
    frame.render_widget(panel_block(title, is_focused, theme), area);

    let inner = inner_rect(area);
    let [tabs_area, list_area] =
        inner.layout(&Layout::vertical([Constraint::Length(1), Constraint::Fill(1)]));

    frame.render_widget(Paragraph::new(filter_tabs(ws.filter, theme)), tabs_area);

    let filter = ws.filter;
    let documents: Vec<&Document> = ws.documents.iter().filter(|d| filter.matches(d)).collect();
    let items: Vec<ListItem> = if documents.is_empty() {
        let msg = match (&ws.status, &ws.documents_error) {
            (_, Some(error)) => error.clone(),
            (WorkspaceStatus::Creating | WorkspaceStatus::Loading, _) => "Loading...".to_owned(),
            _ if ws.documents.is_empty() => "No documents".to_owned(),
            _ => format!("No {} documents", ws.filter.label()),
        };
        vec![ListItem::new(Line::styled(msg, Style::default().fg(theme.text_muted)))]
    } else {
        documents.iter().map(|d| document_item(d, theme)).collect()
    };

    let list = List::new(items).highlight_style(
        Style::default()
            .bg(theme.selection_bg)
            .add_modifier(Modifier::BOLD),
    );
    frame.render_stateful_widget(list, list_area, &mut ws.doc_list_state);
}

fn filter_tabs(active: DocFilter, theme: &Theme) -> Line<'static> {
    let mut spans = Vec::with_capacity(DocFilter::ALL.len() * 2);
    for filter in DocFilter::ALL {
        let style = if filter == active {
            Style::default().fg(theme.accent).add_modifier(Modifier::BOLD | Modifier::UNDERLINED)
        } else {
            Style::default().fg(theme.text_muted)
        };
        spans.push(Span::styled(filter.label(), style));
        spans.push(Span::raw(" "));
    }
    Line::from(spans)
}

fn document_item<'a>(document: &'a Document, theme: &Theme) -> ListItem<'a> {
    let name = document.file_name();
    let kind = FileKind::from_name(name);
    let badge_color = match kind {
        FileKind::Pdf => Color::Red,
        FileKind::Word => Color::Blue,
        FileKind::Spreadsheet | FileKind::Csv => Color::Green,
        _ => theme.badge,
    };
    let mut spans = vec![
        Span::styled(format!("{} ", kind.badge()), Style::default().fg(badge_color)),
        Span::styled(name, Style::default().fg(theme.text)),
    ];
    if let Some(date) = &document.filing_date {
        spans.push(Span::styled(
            format!("  {}", short_date(date)),
            Style::default().fg(theme.text_muted),
        ));
    }
    ListItem::new(Line::from(spans))
}
