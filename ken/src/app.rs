//! Central application state for the Ken client.
//!
//! Owns all mutable UI state: the current screen and mode, focus, scroll
//! positions, the pending-workspace cache, and the per-screen data received
//! from the API worker. No rendering lives here. The render module reads this
//! state and the keybinding dispatcher mutates it.
//!
//! Work that needs the backend is sent to the worker through `api_tx`; its
//! results come back through [`AppState::apply_api_event`]. Every result is
//! checked against what is currently shown and dropped if it is stale.

use ken_core::chat::ChatSession;
use ken_core::document::{Chunk, DocumentContent, ParsedDocument, PdfPreview, TextPresentation};
use ken_core::error::ChatError;
use ken_core::markup::{AnchorIndex, RenderedMarkup};
use ken_core::pending::{generate_workspace_id, PendingWorkspace, PendingWorkspaces, UploadFile};
use ken_core::search::SearchState;
use ken_core::text_window::{TextDocument, WindowLayout, WindowMetrics, DEFAULT_OVERSCAN_LINES};
use ken_core::types::{Activity, DocFilter, Document, Workspace};
use ratatui::layout::Rect;
use ratatui::widgets::ListState;
use tokio::sync::mpsc::UnboundedSender;
use tracing::{debug, info};

use crate::worker::{ApiEvent, ApiRequest, ChatUpdate};

/// Message shown when a workspace is opened from a pending id that has no entry.
pub const NO_WORKSPACE_DATA: &str = "No workspace data found";

/// Keybinding mode.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    #[default]
    Normal,
    /// Typing into the field named by `AppState::input`.
    Insert,
    HelpOverlay,
    /// Quit requested while an agent response is still streaming.
    ConfirmQuit,
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub enum Screen {
    #[default]
    Home,
    Workspace,
}

/// Text field that receives keystrokes in Insert mode.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub enum InputTarget {
    #[default]
    Search,
    UploadPath,
    ChatPrompt,
}

/// Focusable panels of the home screen.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub enum HomeFocus {
    #[default]
    Search,
    Results,
    Workspaces,
}

impl HomeFocus {
    pub fn next(self) -> Self {
        match self {
            HomeFocus::Search => HomeFocus::Results,
            HomeFocus::Results => HomeFocus::Workspaces,
            HomeFocus::Workspaces => HomeFocus::Search,
        }
    }

    pub fn prev(self) -> Self {
        match self {
            HomeFocus::Search => HomeFocus::Workspaces,
            HomeFocus::Results => HomeFocus::Search,
            HomeFocus::Workspaces => HomeFocus::Results,
        }
    }
}

/// Focusable panels of the workspace screen, left to right.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub enum PanelFocus {
    #[default]
    Documents,
    Viewer,
    Side,
}

impl PanelFocus {
    pub fn next(self) -> Self {
        match self {
            PanelFocus::Documents => PanelFocus::Viewer,
            PanelFocus::Viewer => PanelFocus::Side,
            PanelFocus::Side => PanelFocus::Documents,
        }
    }

    pub fn prev(self) -> Self {
        match self {
            PanelFocus::Documents => PanelFocus::Side,
            PanelFocus::Viewer => PanelFocus::Documents,
            PanelFocus::Side => PanelFocus::Viewer,
        }
    }
}

/// What the right-hand panel of the workspace screen shows.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub enum SidePanel {
    #[default]
    Chat,
    Activity,
}

/// Home screen state.
#[derive(Debug, Default)]
pub struct HomeState {
    pub focus: HomeFocus,
    pub search: SearchState,
    pub results_state: ListState,
    pub workspaces: Vec<Workspace>,
    pub workspaces_state: ListState,
    pub workspaces_loading: bool,
    pub workspaces_error: Option<String>,
    /// Upload prompt is open.
    pub upload_open: bool,
    pub upload_path: String,
    pub upload_error: Option<String>,
}

/// Where a workspace screen gets its workspace from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkspaceSource {
    /// Created from the pending cache entry with the same id.
    Pending,
    /// Already exists on the backend.
    Existing,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WorkspaceStatus {
    Creating,
    Loading,
    Ready,
    Failed(String),
}

/// Plain text shown through the windowed renderer, one line per row.
#[derive(Debug)]
pub struct WindowedText {
    document: TextDocument,
    metrics: WindowMetrics,
    scroll_top: u64,
    viewport_height: u64,
    layout: WindowLayout,
}

impl WindowedText {
    pub fn new(text: String) -> Self {
        let document = TextDocument::new(text);
        let metrics = WindowMetrics::rows(DEFAULT_OVERSCAN_LINES);
        let layout = document.recompute_window(metrics, 0, 0);
        Self {
            document,
            metrics,
            scroll_top: 0,
            viewport_height: 0,
            layout,
        }
    }

    pub fn layout(&self) -> &WindowLayout {
        &self.layout
    }

    pub fn scroll_top(&self) -> u64 {
        self.scroll_top
    }

    pub fn viewport_height(&self) -> u64 {
        self.viewport_height
    }

    /// Records the viewer height; recomputes the window when it changed.
    pub fn set_viewport_height(&mut self, height: u16) {
        let height = u64::from(height);
        if height != self.viewport_height {
            self.viewport_height = height;
            self.scroll_top = self.scroll_top.min(self.max_scroll());
            self.recompute();
        }
    }

    /// Scrolls by `delta` rows, clamped to the document.
    pub fn scroll_by(&mut self, delta: i64) {
        let target = if delta < 0 {
            self.scroll_top.saturating_sub(delta.unsigned_abs())
        } else {
            self.scroll_top.saturating_add(delta as u64)
        };
        self.scroll_to(target);
    }

    pub fn scroll_to(&mut self, top: u64) {
        let top = top.min(self.max_scroll());
        if top != self.scroll_top {
            self.scroll_top = top;
            self.recompute();
        }
    }

    pub fn scroll_to_bottom(&mut self) {
        self.scroll_to(u64::MAX);
    }

    /// Lines that fall inside the viewport, taken from the rendered window.
    pub fn viewport_lines(&self) -> impl Iterator<Item = &str> + '_ {
        let skip = self.scroll_top.saturating_sub(self.layout.top_padding) as usize;
        self.document
            .visible_lines(&self.layout)
            .skip(skip)
            .take(self.viewport_height as usize)
    }

    fn max_scroll(&self) -> u64 {
        self.document
            .total_height(self.metrics)
            .saturating_sub(self.viewport_height)
    }

    fn recompute(&mut self) {
        self.layout = self
            .document
            .recompute_window(self.metrics, self.scroll_top, self.viewport_height);
    }
}

/// Markup rendered whole, with a line cursor for chunk selection.
#[derive(Debug)]
pub struct MarkupView {
    lines: TextDocument,
    anchors: AnchorIndex,
    pub cursor: usize,
    pub scroll: usize,
    pub viewport_height: usize,
}

impl MarkupView {
    pub fn new(rendered: RenderedMarkup) -> Self {
        Self {
            lines: TextDocument::new(rendered.text),
            anchors: rendered.anchors,
            cursor: 0,
            scroll: 0,
            viewport_height: 0,
        }
    }

    pub fn lines(&self) -> &TextDocument {
        &self.lines
    }

    pub fn line_count(&self) -> usize {
        self.lines.line_count()
    }

    /// Id of the nearest anchor at or before the start of `line`.
    pub fn anchor_at_line(&self, line: usize) -> Option<&str> {
        self.anchors.anchor_at(self.lines.offset_of_line(line))
    }

    pub fn move_cursor(&mut self, delta: i64) {
        let last = self.line_count().saturating_sub(1);
        let target = if delta < 0 {
            self.cursor.saturating_sub(delta.unsigned_abs() as usize)
        } else {
            self.cursor.saturating_add(delta as usize)
        };
        self.cursor = target.min(last);
        self.keep_cursor_visible();
    }

    fn keep_cursor_visible(&mut self) {
        let height = self.viewport_height.max(1);
        if self.cursor < self.scroll {
            self.scroll = self.cursor;
        } else if self.cursor >= self.scroll + height {
            self.scroll = self.cursor + 1 - height;
        }
    }
}

/// Body of the document viewer.
#[derive(Debug, Default)]
pub enum ViewerContent {
    #[default]
    Empty,
    Loading,
    Failed(String),
    Pdf(PdfPreview),
    Windowed(WindowedText),
    Markup(MarkupView),
}

#[derive(Debug, Default)]
pub struct ViewerState {
    pub document: Option<Document>,
    pub content: ViewerContent,
    /// Chunks of a structured-text document.
    pub parsed: Option<ParsedDocument>,
}

/// Workspace screen state.
#[derive(Debug)]
pub struct WorkspaceState {
    pub workspace_id: String,
    pub workspace: Option<Workspace>,
    pub status: WorkspaceStatus,
    pub documents: Vec<Document>,
    pub documents_error: Option<String>,
    pub filter: DocFilter,
    pub doc_list_state: ListState,
    pub viewer: ViewerState,
    pub side: SidePanel,
    pub side_scroll: u16,
    pub activities: Vec<Activity>,
    pub activities_loading: bool,
    pub activities_error: Option<String>,
    pub chat: ChatSession,
    /// Identifies `chat` to the worker; results for older sessions are dropped.
    pub chat_session: u64,
    pub chat_input: String,
    pub chunk: Option<Chunk>,
    pub focus: PanelFocus,
}

impl WorkspaceState {
    fn new(workspace_id: String, status: WorkspaceStatus, chat_session: u64) -> Self {
        Self {
            chat: ChatSession::new(workspace_id.clone()),
            workspace_id,
            workspace: None,
            status,
            documents: Vec::new(),
            documents_error: None,
            filter: DocFilter::All,
            doc_list_state: ListState::default(),
            viewer: ViewerState::default(),
            side: SidePanel::Chat,
            side_scroll: 0,
            activities: Vec::new(),
            activities_loading: false,
            activities_error: None,
            chat_session,
            chat_input: String::new(),
            chunk: None,
            focus: PanelFocus::Documents,
        }
    }

    /// Documents matching the active filter tab.
    pub fn filtered_documents(&self) -> Vec<&Document> {
        self.documents
            .iter()
            .filter(|d| self.filter.matches(d))
            .collect()
    }

    pub fn title(&self) -> &str {
        self.workspace
            .as_ref()
            .map(Workspace::display_name)
            .unwrap_or(&self.workspace_id)
    }
}

/// All mutable UI state.
#[derive(Debug, Default)]
pub struct AppState {
    pub mode: Mode,
    pub screen: Screen,
    pub input: InputTarget,
    pub home: HomeState,
    pub workspace: Option<WorkspaceState>,
    pub pending: PendingWorkspaces,
    /// Request channel to the API worker. `None` in tests.
    pub api_tx: Option<UnboundedSender<ApiRequest>>,
    /// One-line notice shown in the status bar until the next key press.
    pub notice: Option<String>,
    pub help_scroll: u16,
    /// Advances on every logic tick; drives the loading spinner.
    pub tick: u64,
    /// Outer rects of the left, centre and right panels from the last frame.
    pub panel_rects: [Rect; 3],
    /// Inner rect of the document viewer from the last frame.
    pub viewer_inner: Rect,
    /// Inner heights of the left and right panels from the last frame.
    pub list_viewport_height: u16,
    pub side_viewport_height: u16,
    next_chat_session: u64,
}

impl AppState {
    pub fn new(api_tx: UnboundedSender<ApiRequest>) -> Self {
        Self {
            api_tx: Some(api_tx),
            ..Self::default()
        }
    }

    pub fn request(&self, request: ApiRequest) {
        if let Some(tx) = &self.api_tx {
            let _ = tx.send(request);
        }
    }

    /// Requests the home screen's workspace list.
    pub fn refresh_workspaces(&mut self) {
        self.home.workspaces_loading = true;
        self.home.workspaces_error = None;
        self.request(ApiRequest::ListWorkspaces);
    }

    /// True while an agent response is streaming into the open chat.
    pub fn has_active_stream(&self) -> bool {
        self.workspace.as_ref().is_some_and(|w| w.chat.is_streaming())
    }

    // -----------------------------------------------------------------------
    // Home screen
    // -----------------------------------------------------------------------

    /// Replaces the search query and schedules a debounced search for it.
    pub fn set_search_query(&mut self, query: String) {
        let generation = self.home.search.set_query(query.clone());
        self.home.results_state.select(None);
        self.request(ApiRequest::Search { query, generation });
    }

    /// Opens a new workspace for the selected search result's ticker.
    pub fn select_search_result(&mut self) {
        let Some(index) = self.home.results_state.selected() else {
            return;
        };
        let Some(result) = self.home.search.results().get(index) else {
            return;
        };
        let pending = PendingWorkspace {
            workspace_id: generate_workspace_id(),
            ticker: Some(result.symbol.clone()),
            file: None,
        };
        self.open_pending(pending);
    }

    /// Reads the file named in the upload prompt and opens a new workspace for it.
    pub fn submit_upload(&mut self) {
        let path = self.home.upload_path.trim();
        if path.is_empty() {
            return;
        }
        match UploadFile::read(std::path::Path::new(path)) {
            Ok(file) => {
                self.home.upload_open = false;
                self.home.upload_error = None;
                self.home.upload_path.clear();
                self.mode = Mode::Normal;
                let pending = PendingWorkspace {
                    workspace_id: generate_workspace_id(),
                    ticker: None,
                    file: Some(file),
                };
                self.open_pending(pending);
            }
            Err(e) => self.home.upload_error = Some(format!("Cannot read {path}: {e}")),
        }
    }

    /// Opens the workspace selected in the home screen's list.
    pub fn open_selected_workspace(&mut self) {
        let selected = self
            .home
            .workspaces_state
            .selected()
            .and_then(|i| self.home.workspaces.get(i))
            .map(|w| w.id.clone());
        if let Some(id) = selected {
            self.open_workspace(id, WorkspaceSource::Existing);
        }
    }

    fn open_pending(&mut self, pending: PendingWorkspace) {
        let id = pending.workspace_id.clone();
        info!(workspace_id = %id, ticker = ?pending.ticker, "new workspace");
        self.pending.insert(pending);
        self.open_workspace(id, WorkspaceSource::Pending);
    }

    // -----------------------------------------------------------------------
    // Navigation
    // -----------------------------------------------------------------------

    /// Switches to the workspace screen for `workspace_id`.
    ///
    /// # Arguments
    ///
    /// * `workspace_id` - id of the workspace to show
    /// * `source` - `Pending` creates the workspace from the pending cache;
    ///   `Existing` loads it from the backend
    pub fn open_workspace(&mut self, workspace_id: String, source: WorkspaceSource) {
        self.next_chat_session += 1;
        let status = match source {
            WorkspaceSource::Pending => match self.pending.get(&workspace_id) {
                Some(pending) => {
                    self.request(ApiRequest::CreateWorkspace(pending.clone()));
                    WorkspaceStatus::Creating
                }
                None => WorkspaceStatus::Failed(NO_WORKSPACE_DATA.to_owned()),
            },
            WorkspaceSource::Existing => {
                self.request(ApiRequest::LoadWorkspace(workspace_id.clone()));
                WorkspaceStatus::Loading
            }
        };
        self.workspace = Some(WorkspaceState::new(workspace_id, status, self.next_chat_session));
        self.screen = Screen::Workspace;
        self.mode = Mode::Normal;
    }

    /// Retries whatever the workspace screen failed to do.
    pub fn retry_workspace(&mut self) {
        let Some(ws) = &self.workspace else {
            return;
        };
        if matches!(ws.status, WorkspaceStatus::Failed(_)) {
            let id = ws.workspace_id.clone();
            let source = if self.pending.get(&id).is_some() {
                WorkspaceSource::Pending
            } else {
                WorkspaceSource::Existing
            };
            self.open_workspace(id, source);
        } else {
            self.refresh_activities();
        }
    }

    /// Leaves the workspace screen. Any agent stream is dropped.
    pub fn go_home(&mut self) {
        if self.workspace.take().is_some() {
            self.request(ApiRequest::CancelAgent);
        }
        self.screen = Screen::Home;
        self.mode = Mode::Normal;
        self.refresh_workspaces();
    }

    fn refresh_activities(&mut self) {
        let Some(ws) = self.workspace.as_mut() else {
            return;
        };
        ws.activities_loading = true;
        let id = ws.workspace_id.clone();
        self.request(ApiRequest::ListActivities(id));
    }

    // -----------------------------------------------------------------------
    // Workspace screen
    // -----------------------------------------------------------------------

    pub fn cycle_filter(&mut self) {
        if let Some(ws) = self.workspace.as_mut() {
            ws.filter = ws.filter.next();
            let any = !ws.filtered_documents().is_empty();
            ws.doc_list_state.select(any.then_some(0));
        }
    }

    /// Downloads the selected document into the viewer.
    pub fn open_selected_document(&mut self) {
        let Some(ws) = self.workspace.as_mut() else {
            return;
        };
        let Some(document) = ws
            .doc_list_state
            .selected()
            .and_then(|i| ws.filtered_documents().get(i).map(|d| (*d).clone()))
        else {
            return;
        };
        if ws.viewer.document.as_ref().is_some_and(|d| d.id == document.id)
            && !matches!(ws.viewer.content, ViewerContent::Failed(_))
        {
            ws.focus = PanelFocus::Viewer;
            return;
        }
        debug!(document_id = %document.id, "opening document");
        ws.viewer = ViewerState {
            document: Some(document.clone()),
            content: ViewerContent::Loading,
            parsed: None,
        };
        ws.focus = PanelFocus::Viewer;
        self.request(ApiRequest::Download(document));
    }

    /// Selects the chunk enclosing the viewer cursor and opens its chat.
    pub fn select_chunk_at_cursor(&mut self) {
        let Some(ws) = self.workspace.as_mut() else {
            return;
        };
        let ViewerContent::Markup(view) = &ws.viewer.content else {
            return;
        };
        let Some(anchor) = view.anchor_at_line(view.cursor) else {
            self.notice = Some("No chunk at this position".to_owned());
            return;
        };
        let chunk = ws
            .viewer
            .parsed
            .as_ref()
            .and_then(|p| p.chunk(anchor))
            .cloned()
            .unwrap_or_else(|| Chunk {
                id: anchor.to_owned(),
                markdown: String::new(),
            });
        if ws.chunk.as_ref().is_some_and(|c| c.id == chunk.id) {
            ws.side = SidePanel::Chat;
            return;
        }
        debug!(chunk_id = %chunk.id, "chunk selected");
        self.next_chat_session += 1;
        ws.chunk = Some(chunk);
        ws.chat = ChatSession::new(ws.workspace_id.clone());
        ws.chat_session = self.next_chat_session;
        ws.chat_input.clear();
        ws.side = SidePanel::Chat;
        ws.side_scroll = 0;
        self.request(ApiRequest::CancelAgent);
    }

    /// Moves the viewer cursor to screen row `row` and selects its chunk.
    pub fn select_chunk_at_row(&mut self, row: u16) {
        let inner = self.viewer_inner;
        if let Some(ViewerContent::Markup(view)) =
            self.workspace.as_mut().map(|w| &mut w.viewer.content)
        {
            let line = view.scroll + usize::from(row.saturating_sub(inner.y));
            if line < view.line_count() {
                view.cursor = line;
                self.select_chunk_at_cursor();
            }
        }
    }

    /// Pushes the assistant greeting into the chat.
    pub fn start_analysis(&mut self) {
        if let Some(ws) = self.workspace.as_mut() {
            ws.side = SidePanel::Chat;
            ws.chat.start_analysis();
        }
    }

    pub fn toggle_side_panel(&mut self) {
        let refresh = match self.workspace.as_mut() {
            Some(ws) => {
                ws.side = match ws.side {
                    SidePanel::Chat => SidePanel::Activity,
                    SidePanel::Activity => SidePanel::Chat,
                };
                ws.side_scroll = 0;
                ws.side == SidePanel::Activity
            }
            None => false,
        };
        if refresh {
            self.refresh_activities();
        }
    }

    /// Sends the typed prompt to the agent.
    ///
    /// Rejected while a previous response is streaming; the typed text is kept.
    pub fn submit_chat(&mut self) {
        let Some(ws) = self.workspace.as_mut() else {
            return;
        };
        match ws.chat.begin_request(&ws.chat_input, ws.chunk.as_ref()) {
            Ok(query) => {
                ws.chat_input.clear();
                ws.side_scroll = u16::MAX;
                let session = ws.chat_session;
                self.request(ApiRequest::Agent { session, query });
            }
            Err(ChatError::Busy) => {
                self.notice = Some("Wait for the current response to finish".to_owned());
            }
            Err(ChatError::EmptyPrompt) => {}
        }
    }

    // -----------------------------------------------------------------------
    // API results
    // -----------------------------------------------------------------------

    /// Folds one worker result into the state.
    pub fn apply_api_event(&mut self, event: ApiEvent) {
        match event {
            ApiEvent::Workspaces(outcome) => {
                self.home.workspaces_loading = false;
                match outcome {
                    Ok(workspaces) => {
                        let any = !workspaces.is_empty();
                        self.home.workspaces = workspaces;
                        self.home.workspaces_error = None;
                        if self.home.workspaces_state.selected().is_none() {
                            self.home.workspaces_state.select(any.then_some(0));
                        }
                    }
                    Err(e) => self.home.workspaces_error = Some(e),
                }
            }
            ApiEvent::SearchResults { generation, outcome } => {
                if self.home.search.apply(generation, outcome) {
                    let any = !self.home.search.results().is_empty();
                    self.home.results_state.select(any.then_some(0));
                }
            }
            ApiEvent::WorkspaceCreated { workspace_id, outcome } => {
                let Some(ws) = self.current_workspace(&workspace_id) else {
                    return;
                };
                match outcome {
                    Ok(created) => {
                        info!(%workspace_id, documents = created.documents.len(), "workspace created");
                        ws.workspace = Some(created.workspace);
                        ws.doc_list_state.select((!created.documents.is_empty()).then_some(0));
                        ws.documents = created.documents;
                        ws.status = WorkspaceStatus::Ready;
                        ws.activities_loading = true;
                        self.pending.remove(&workspace_id);
                        self.request(ApiRequest::ListActivities(workspace_id));
                    }
                    Err(e) => ws.status = WorkspaceStatus::Failed(e),
                }
            }
            ApiEvent::WorkspaceLoaded { workspace_id, outcome } => {
                let Some(ws) = self.current_workspace(&workspace_id) else {
                    return;
                };
                match outcome {
                    Ok(workspace) => {
                        ws.workspace = Some(workspace);
                        ws.status = WorkspaceStatus::Ready;
                        ws.activities_loading = true;
                        self.request(ApiRequest::ListDocuments(workspace_id.clone()));
                        self.request(ApiRequest::ListActivities(workspace_id));
                    }
                    Err(e) => ws.status = WorkspaceStatus::Failed(e),
                }
            }
            ApiEvent::Documents { workspace_id, outcome } => {
                let Some(ws) = self.current_workspace(&workspace_id) else {
                    return;
                };
                match outcome {
                    Ok(documents) => {
                        ws.doc_list_state.select((!documents.is_empty()).then_some(0));
                        ws.documents = documents;
                        ws.documents_error = None;
                    }
                    Err(e) => ws.documents_error = Some(e),
                }
            }
            ApiEvent::Activities { workspace_id, outcome } => {
                let Some(ws) = self.current_workspace(&workspace_id) else {
                    return;
                };
                ws.activities_loading = false;
                match outcome {
                    Ok(activities) => {
                        ws.activities = activities;
                        ws.activities_error = None;
                    }
                    Err(e) => ws.activities_error = Some(e),
                }
            }
            ApiEvent::DocumentLoaded { document_id, outcome } => {
                let Some(ws) = self.workspace.as_mut() else {
                    return;
                };
                if ws.viewer.document.as_ref().map(|d| d.id.as_str()) != Some(document_id.as_str()) {
                    debug!(%document_id, "dropping stale download");
                    return;
                }
                let (content, parsed) = match outcome {
                    Ok(content) => viewer_content(content),
                    Err(e) => (ViewerContent::Failed(e), None),
                };
                ws.viewer.content = content;
                ws.viewer.parsed = parsed;
            }
            ApiEvent::Chat { session, update } => {
                let Some(ws) = self.workspace.as_mut() else {
                    return;
                };
                if ws.chat_session != session {
                    debug!(session, "dropping update for closed chat");
                    return;
                }
                match update {
                    ChatUpdate::Event(event) => {
                        ws.chat.apply(event);
                    }
                    ChatUpdate::Failed(reason) => ws.chat.fail(reason),
                    ChatUpdate::Ended => ws.chat.end_of_stream(),
                }
                ws.side_scroll = u16::MAX;
            }
        }
    }

    fn current_workspace(&mut self, workspace_id: &str) -> Option<&mut WorkspaceState> {
        self.workspace
            .as_mut()
            .filter(|ws| ws.workspace_id == workspace_id)
    }

    // -----------------------------------------------------------------------
    // Scrolling
    // -----------------------------------------------------------------------

    /// Scrolls the focused panel down by `lines` rows (negative scrolls up).
    pub fn scroll_by(&mut self, lines: i64) {
        match self.screen {
            Screen::Home => {
                let list = match self.home.focus {
                    HomeFocus::Search | HomeFocus::Results => &mut self.home.results_state,
                    HomeFocus::Workspaces => &mut self.home.workspaces_state,
                };
                move_list(list, lines);
            }
            Screen::Workspace => {
                let Some(ws) = self.workspace.as_mut() else {
                    return;
                };
                match ws.focus {
                    PanelFocus::Documents => move_list(&mut ws.doc_list_state, lines),
                    PanelFocus::Viewer => match &mut ws.viewer.content {
                        ViewerContent::Windowed(text) => text.scroll_by(lines),
                        ViewerContent::Markup(view) => view.move_cursor(lines),
                        _ => {}
                    },
                    PanelFocus::Side => {
                        let magnitude = u16::try_from(lines.unsigned_abs()).unwrap_or(u16::MAX);
                        // The renderer clamps `side_scroll` to the content each frame.
                        ws.side_scroll = if lines < 0 {
                            ws.side_scroll.saturating_sub(magnitude)
                        } else {
                            ws.side_scroll.saturating_add(magnitude)
                        };
                    }
                }
            }
        }
    }

    pub fn scroll_top(&mut self) {
        self.scroll_by(-i64::from(u32::MAX));
    }

    pub fn scroll_bottom(&mut self) {
        self.scroll_by(i64::from(u32::MAX));
    }

    /// Height of the focused panel's viewport, for page-wise scrolling.
    pub fn page_height(&self) -> i64 {
        let rows = match (self.screen, self.workspace.as_ref().map(|w| w.focus)) {
            (Screen::Workspace, Some(PanelFocus::Viewer)) => self.viewer_inner.height,
            (Screen::Workspace, Some(PanelFocus::Side)) => self.side_viewport_height,
            _ => self.list_viewport_height,
        };
        i64::from(rows.max(1))
    }

    /// Records the viewer size from the last frame and recomputes its window.
    pub fn set_viewer_area(&mut self, inner: Rect) {
        self.viewer_inner = inner;
        if let Some(ws) = self.workspace.as_mut() {
            match &mut ws.viewer.content {
                ViewerContent::Windowed(text) => text.set_viewport_height(inner.height),
                ViewerContent::Markup(view) => view.viewport_height = usize::from(inner.height),
                _ => {}
            }
        }
    }
}

/// Moves a list selection by `delta` rows; `ListState` clamps at render time.
fn move_list(list: &mut ListState, delta: i64) {
    let magnitude = u16::try_from(delta.unsigned_abs()).unwrap_or(u16::MAX);
    if delta < 0 {
        list.scroll_up_by(magnitude);
    } else {
        list.scroll_down_by(magnitude);
    }
}

/// Turns downloaded content into what the viewer shows.
fn viewer_content(content: DocumentContent) -> (ViewerContent, Option<ParsedDocument>) {
    match content {
        DocumentContent::Pdf(bytes) => match PdfPreview::create(&bytes) {
            Ok(preview) => (ViewerContent::Pdf(preview), None),
            Err(e) => (ViewerContent::Failed(e.to_string()), None),
        },
        DocumentContent::StructuredText(mut parsed) => {
            let markdown = std::mem::take(&mut parsed.markdown);
            (text_content(markdown), Some(parsed))
        }
        DocumentContent::PlainText(text) => (text_content(text), None),
    }
}

fn text_content(text: String) -> ViewerContent {
    match TextPresentation::for_text(text) {
        TextPresentation::Windowed(text) => ViewerContent::Windowed(WindowedText::new(text)),
        TextPresentation::Markup(rendered) => ViewerContent::Markup(MarkupView::new(rendered)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ken_core::stream::StreamEvent;
    use ken_core::types::CreatedWorkspace;
    use tokio::sync::mpsc::unbounded_channel;

    fn workspace(id: &str) -> Workspace {
        Workspace {
            id: id.into(),
            name: Some("Apple".into()),
            ticker: Some("AAPL".into()),
            created_at: None,
        }
    }

    fn document(id: &str, doc_type: &str) -> Document {
        Document {
            id: id.into(),
            workspace_id: "w".into(),
            doc_type: doc_type.into(),
            file_path: format!("/data/{id}.txt"),
            filing_date: None,
            reporting_date: None,
            doc_id: None,
        }
    }

    #[test]
    fn pending_workspace_is_removed_after_creation() {
        let (tx, mut rx) = unbounded_channel();
        let mut state = AppState::new(tx);
        state.open_pending(PendingWorkspace {
            workspace_id: "abcd1234".into(),
            ticker: Some("AAPL".into()),
            file: None,
        });
        assert!(matches!(rx.try_recv(), Ok(ApiRequest::CreateWorkspace(p)) if p.workspace_id == "abcd1234"));
        assert_eq!(state.screen, Screen::Workspace);
        assert_eq!(state.pending.len(), 1);

        state.apply_api_event(ApiEvent::WorkspaceCreated {
            workspace_id: "abcd1234".into(),
            outcome: Ok(CreatedWorkspace {
                workspace: workspace("abcd1234"),
                documents: vec![document("d1", "10_K")],
            }),
        });
        assert!(state.pending.is_empty());
        let ws = state.workspace.as_ref().unwrap();
        assert_eq!(ws.status, WorkspaceStatus::Ready);
        assert_eq!(ws.documents.len(), 1);
        assert!(matches!(rx.try_recv(), Ok(ApiRequest::ListActivities(_))));
    }

    #[test]
    fn failed_creation_keeps_pending_entry() {
        let (tx, _rx) = unbounded_channel();
        let mut state = AppState::new(tx);
        state.open_pending(PendingWorkspace {
            workspace_id: "abcd1234".into(),
            ticker: None,
            file: None,
        });
        state.apply_api_event(ApiEvent::WorkspaceCreated {
            workspace_id: "abcd1234".into(),
            outcome: Err("API Error: Bad Gateway".into()),
        });
        assert_eq!(state.pending.len(), 1);
        assert_eq!(
            state.workspace.as_ref().map(|w| w.status.clone()),
            Some(WorkspaceStatus::Failed("API Error: Bad Gateway".into()))
        );
    }

    #[test]
    fn missing_pending_entry_fails_without_request() {
        let (tx, mut rx) = unbounded_channel();
        let mut state = AppState::new(tx);
        state.open_workspace("zzzz9999".into(), WorkspaceSource::Pending);
        assert!(rx.try_recv().is_err());
        assert_eq!(
            state.workspace.as_ref().map(|w| w.status.clone()),
            Some(WorkspaceStatus::Failed(NO_WORKSPACE_DATA.into()))
        );
    }

    #[test]
    fn results_for_other_workspaces_are_dropped() {
        let (tx, _rx) = unbounded_channel();
        let mut state = AppState::new(tx);
        state.open_workspace("w1".into(), WorkspaceSource::Existing);
        state.apply_api_event(ApiEvent::Documents {
            workspace_id: "w0".into(),
            outcome: Ok(vec![document("d1", "10_K")]),
        });
        assert!(state.workspace.as_ref().unwrap().documents.is_empty());
    }

    #[test]
    fn filter_limits_visible_documents() {
        let (tx, _rx) = unbounded_channel();
        let mut state = AppState::new(tx);
        state.open_workspace("w".into(), WorkspaceSource::Existing);
        state.apply_api_event(ApiEvent::Documents {
            workspace_id: "w".into(),
            outcome: Ok(vec![document("a", "10_K"), document("b", "10_Q"), document("c", "other")]),
        });
        state.cycle_filter();
        let ws = state.workspace.as_ref().unwrap();
        assert_eq!(ws.filter, DocFilter::TenK);
        let ids: Vec<_> = ws.filtered_documents().iter().map(|d| d.id.clone()).collect();
        assert_eq!(ids, vec!["a"]);
    }

    #[test]
    fn windowed_text_recomputes_on_scroll_and_resize() {
        let text = (0..1000).map(|i| format!("line {i}")).collect::<Vec<_>>().join("\n");
        let mut view = WindowedText::new(text);
        view.set_viewport_height(20);
        assert_eq!(view.layout().start_line, 0);
        assert_eq!(view.layout().end_line, 120);

        view.scroll_by(500);
        assert_eq!(view.scroll_top(), 500);
        assert_eq!(view.layout().start_line, 400);
        assert_eq!(view.viewport_lines().next(), Some("line 500"));
        assert_eq!(view.viewport_lines().count(), 20);

        view.scroll_to_bottom();
        assert_eq!(view.scroll_top(), 1000 - 20);
        assert_eq!(view.layout().end_line, 1000);

        view.set_viewport_height(50);
        assert_eq!(view.scroll_top(), 1000 - 50);
    }

    #[test]
    fn chunk_selection_starts_a_fresh_chat() {
        let (tx, _rx) = unbounded_channel();
        let mut state = AppState::new(tx);
        state.open_workspace("w".into(), WorkspaceSource::Existing);
        let doc = document("d1", "10_K");
        {
            let ws = state.workspace.as_mut().unwrap();
            ws.viewer.document = Some(doc);
        }
        let markdown = r#"<a id="c1"></a><p>Revenue</p><a id="c2"></a><p>Costs</p>"#;
        let parsed: ParsedDocument = serde_json::from_value(serde_json::json!({
            "markdown": markdown,
            "chunks": [{"id": "c1", "markdown": "Revenue"}, {"id": "c2", "markdown": "Costs"}]
        }))
        .unwrap();
        state.apply_api_event(ApiEvent::DocumentLoaded {
            document_id: "d1".into(),
            outcome: Ok(DocumentContent::StructuredText(parsed)),
        });

        let session_before = state.workspace.as_ref().unwrap().chat_session;
        if let Some(ViewerContent::Markup(view)) = state.workspace.as_mut().map(|w| &mut w.viewer.content) {
            view.move_cursor(1);
        } else {
            panic!("expected markup view");
        }
        state.select_chunk_at_cursor();

        let ws = state.workspace.as_ref().unwrap();
        assert_eq!(ws.chunk.as_ref().map(|c| c.markdown.as_str()), Some("Costs"));
        assert_ne!(ws.chat_session, session_before);
    }

    #[test]
    fn stale_chat_updates_are_ignored() {
        let (tx, mut rx) = unbounded_channel();
        let mut state = AppState::new(tx);
        state.open_workspace("w".into(), WorkspaceSource::Existing);
        let _ = rx.try_recv();
        let ws = state.workspace.as_mut().unwrap();
        ws.chat_input = "hello".into();
        let session = ws.chat_session;
        state.submit_chat();
        assert!(matches!(rx.try_recv(), Ok(ApiRequest::Agent { session: s, .. }) if s == session));

        state.apply_api_event(ApiEvent::Chat {
            session: session + 100,
            update: ChatUpdate::Event(StreamEvent::Text { content: "nope".into() }),
        });
        state.apply_api_event(ApiEvent::Chat {
            session,
            update: ChatUpdate::Event(StreamEvent::Text { content: "hi".into() }),
        });
        let chat = &state.workspace.as_ref().unwrap().chat;
        assert_eq!(chat.messages()[1].content, "hi");
        assert!(state.has_active_stream());

        state.workspace.as_mut().unwrap().chat_input = "again".into();
        state.submit_chat();
        assert!(state.notice.is_some());
        assert!(rx.try_recv().is_err(), "no second agent request while streaming");
        assert_eq!(state.workspace.as_ref().unwrap().chat_input, "again");
    }
}
