//! Keybinding dispatcher.
//!
//! Translates crossterm key and mouse events into `AppState` mutations and
//! returns a `KeyAction` telling the event loop whether to continue or quit.
//! The dispatcher branches first on `state.mode`, then on the screen.

use crossterm::event::{KeyCode, KeyEvent, KeyModifiers, MouseButton, MouseEvent, MouseEventKind};
use ratatui::layout::Position;

use crate::app::{AppState, HomeFocus, InputTarget, Mode, PanelFocus, Screen, SidePanel};

/// Control-flow signal returned from the key dispatcher.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyAction {
    Continue,
    Quit,
}

/// Rows moved per mouse wheel notch.
const WHEEL_LINES: i64 = 3;

/// Dispatches a key event to the handler matching the current mode.
///
/// # Arguments
///
/// * `key`   - the raw crossterm key event (code + modifiers)
/// * `state` - mutable reference to all UI state
pub fn handle_key(key: KeyEvent, state: &mut AppState) -> KeyAction {
    if key.code == KeyCode::Char('c') && key.modifiers.contains(KeyModifiers::CONTROL) {
        return request_quit(state);
    }
    match state.mode {
        Mode::HelpOverlay => handle_help(key, state),
        Mode::ConfirmQuit => handle_confirm_quit(key, state),
        Mode::Insert => {
            state.notice = None;
            handle_insert(key, state)
        }
        Mode::Normal => {
            state.notice = None;
            handle_normal(key, state)
        }
    }
}

fn request_quit(state: &mut AppState) -> KeyAction {
    if state.has_active_stream() && state.mode != Mode::ConfirmQuit {
        state.mode = Mode::ConfirmQuit;
        KeyAction::Continue
    } else {
        KeyAction::Quit
    }
}

// ---------------------------------------------------------------------------
// Normal mode
// ---------------------------------------------------------------------------

fn handle_normal(key: KeyEvent, state: &mut AppState) -> KeyAction {
    if handle_scroll_key(key, state) {
        return KeyAction::Continue;
    }

    match key.code {
        KeyCode::Char('?') => {
            state.help_scroll = 0;
            state.mode = Mode::HelpOverlay;
        }
        KeyCode::Char('q') => return request_quit(state),
        KeyCode::Tab | KeyCode::Char('L') => focus_next(state),
        KeyCode::BackTab | KeyCode::Char('H') => focus_prev(state),
        _ => match state.screen {
            Screen::Home => handle_home_key(key, state),
            Screen::Workspace => handle_workspace_key(key, state),
        },
    }
    KeyAction::Continue
}

/// Handles j / k / g / G and the Ctrl page keys. Returns `true` when consumed.
fn handle_scroll_key(key: KeyEvent, state: &mut AppState) -> bool {
    let ctrl = key.modifiers.contains(KeyModifiers::CONTROL);
    let page = state.page_height();

    match key.code {
        KeyCode::Char('j') | KeyCode::Down => state.scroll_by(1),
        KeyCode::Char('k') | KeyCode::Up => state.scroll_by(-1),
        KeyCode::Char('g') | KeyCode::Home => state.scroll_top(),
        KeyCode::Char('G') | KeyCode::End => state.scroll_bottom(),
        KeyCode::Char('d') if ctrl => state.scroll_by(page / 2),
        KeyCode::Char('u') if ctrl => state.scroll_by(-(page / 2)),
        KeyCode::Char('f') if ctrl => state.scroll_by(page),
        KeyCode::Char('b') if ctrl => state.scroll_by(-page),
        KeyCode::PageDown => state.scroll_by(page),
        KeyCode::PageUp => state.scroll_by(-page),
        _ => return false,
    }
    true
}

fn focus_next(state: &mut AppState) {
    let documents_collapsed = state.panel_rects[0].width == 0;
    match state.screen {
        Screen::Home => state.home.focus = state.home.focus.next(),
        Screen::Workspace => {
            if let Some(ws) = state.workspace.as_mut() {
                ws.focus = ws.focus.next();
                if documents_collapsed && ws.focus == PanelFocus::Documents {
                    ws.focus = ws.focus.next();
                }
            }
        }
    }
}

fn focus_prev(state: &mut AppState) {
    let documents_collapsed = state.panel_rects[0].width == 0;
    match state.screen {
        Screen::Home => state.home.focus = state.home.focus.prev(),
        Screen::Workspace => {
            if let Some(ws) = state.workspace.as_mut() {
                ws.focus = ws.focus.prev();
                if documents_collapsed && ws.focus == PanelFocus::Documents {
                    ws.focus = ws.focus.prev();
                }
            }
        }
    }
}

fn begin_insert(state: &mut AppState, target: InputTarget) {
    state.input = target;
    state.mode = Mode::Insert;
}

fn handle_home_key(key: KeyEvent, state: &mut AppState) {
    match key.code {
        KeyCode::Char('/') | KeyCode::Char('i') => {
            state.home.focus = HomeFocus::Search;
            begin_insert(state, InputTarget::Search);
        }
        KeyCode::Char('u') => {
            state.home.upload_open = true;
            state.home.upload_error = None;
            begin_insert(state, InputTarget::UploadPath);
        }
        KeyCode::Char('r') => state.refresh_workspaces(),
        KeyCode::Enter => match state.home.focus {
            HomeFocus::Search => begin_insert(state, InputTarget::Search),
            HomeFocus::Results => state.select_search_result(),
            HomeFocus::Workspaces => state.open_selected_workspace(),
        },
        _ => {}
    }
}

fn handle_workspace_key(key: KeyEvent, state: &mut AppState) {
    let focus = state.workspace.as_ref().map(|w| w.focus);
    match key.code {
        KeyCode::Esc | KeyCode::Backspace => state.go_home(),
        KeyCode::Enter => match focus {
            Some(PanelFocus::Documents) => state.open_selected_document(),
            Some(PanelFocus::Viewer) => state.select_chunk_at_cursor(),
            Some(PanelFocus::Side) => open_chat_prompt(state),
            None => {}
        },
        KeyCode::Char('f') => state.cycle_filter(),
        KeyCode::Char('t') => state.toggle_side_panel(),
        KeyCode::Char('a') => state.start_analysis(),
        KeyCode::Char('i') => open_chat_prompt(state),
        KeyCode::Char('r') => state.retry_workspace(),
        _ => {}
    }
}

fn open_chat_prompt(state: &mut AppState) {
    if let Some(ws) = state.workspace.as_mut() {
        ws.side = SidePanel::Chat;
        ws.focus = PanelFocus::Side;
        begin_insert(state, InputTarget::ChatPrompt);
    }
}

// ---------------------------------------------------------------------------
// Insert mode
// ---------------------------------------------------------------------------

/// Edits the field named by `state.input`.
///
/// Every keystroke in the search box schedules a new debounced search.
fn handle_insert(key: KeyEvent, state: &mut AppState) -> KeyAction {
    match key.code {
        KeyCode::Esc => {
            state.mode = Mode::Normal;
            if state.input == InputTarget::UploadPath {
                state.home.upload_open = false;
                state.home.upload_path.clear();
                state.home.upload_error = None;
            }
        }
        KeyCode::Enter => match state.input {
            InputTarget::Search => {
                state.mode = Mode::Normal;
                state.home.focus = HomeFocus::Results;
            }
            InputTarget::UploadPath => state.submit_upload(),
            InputTarget::ChatPrompt => state.submit_chat(),
        },
        KeyCode::Backspace => edit_input(state, |text| {
            text.pop();
        }),
        KeyCode::Char(c) if !key.modifiers.contains(KeyModifiers::CONTROL) => {
            edit_input(state, |text| text.push(c));
        }
        _ => {}
    }
    KeyAction::Continue
}

fn edit_input(state: &mut AppState, edit: impl FnOnce(&mut String)) {
    match state.input {
        InputTarget::Search => {
            let mut query = state.home.search.query().to_owned();
            edit(&mut query);
            if query != state.home.search.query() {
                state.set_search_query(query);
            }
        }
        InputTarget::UploadPath => {
            edit(&mut state.home.upload_path);
            state.home.upload_error = None;
        }
        InputTarget::ChatPrompt => {
            if let Some(ws) = state.workspace.as_mut() {
                edit(&mut ws.chat_input);
            }
        }
    }
}

// ---------------------------------------------------------------------------
// HelpOverlay and ConfirmQuit modes
// ---------------------------------------------------------------------------

fn handle_help(key: KeyEvent, state: &mut AppState) -> KeyAction {
    match key.code {
        KeyCode::Char('j') | KeyCode::Down => {
            state.help_scroll = state.help_scroll.saturating_add(1);
        }
        KeyCode::Char('k') | KeyCode::Up => {
            state.help_scroll = state.help_scroll.saturating_sub(1);
        }
        KeyCode::Char('g') => state.help_scroll = 0,
        KeyCode::Char('?') | KeyCode::Esc | KeyCode::Char('q') => state.mode = Mode::Normal,
        _ => {}
    }
    KeyAction::Continue
}

/// `y` quits with the stream still running; `n` or `Esc` goes back.
fn handle_confirm_quit(key: KeyEvent, state: &mut AppState) -> KeyAction {
    match key.code {
        KeyCode::Char('y') | KeyCode::Char('Y') => KeyAction::Quit,
        KeyCode::Char('n') | KeyCode::Char('N') | KeyCode::Esc => {
            state.mode = Mode::Normal;
            KeyAction::Continue
        }
        _ => KeyAction::Continue,
    }
}

// ---------------------------------------------------------------------------
// Mouse events
// ---------------------------------------------------------------------------

/// Handles a mouse event: click-to-focus, click-to-select-chunk, and the wheel.
///
/// # Arguments
///
/// * `mouse` - the crossterm mouse event
/// * `state` - mutable reference to all UI state
pub fn handle_mouse(mouse: MouseEvent, state: &mut AppState) -> KeyAction {
    match mouse.kind {
        MouseEventKind::Down(MouseButton::Left) => handle_mouse_click(mouse.column, mouse.row, state),
        MouseEventKind::ScrollUp => handle_wheel(state, -WHEEL_LINES),
        MouseEventKind::ScrollDown => handle_wheel(state, WHEEL_LINES),
        _ => {}
    }
    KeyAction::Continue
}

/// Focuses the clicked panel; a click inside the viewer text also selects
/// the chunk under the pointer.
///
/// Panels with zero width are skipped so collapsed panels cannot receive focus.
fn handle_mouse_click(col: u16, row: u16, state: &mut AppState) {
    if state.mode != Mode::Normal {
        return;
    }
    let pos = Position { x: col, y: row };
    let [left, center, right] = state.panel_rects;
    let hit = if left.width > 0 && left.contains(pos) {
        0
    } else if center.contains(pos) {
        1
    } else if right.width > 0 && right.contains(pos) {
        2
    } else {
        return;
    };

    match state.screen {
        Screen::Home => {
            state.home.focus = [HomeFocus::Search, HomeFocus::Results, HomeFocus::Workspaces][hit];
        }
        Screen::Workspace => {
            if let Some(ws) = state.workspace.as_mut() {
                ws.focus = [PanelFocus::Documents, PanelFocus::Viewer, PanelFocus::Side][hit];
            }
            if hit == 1 && state.viewer_inner.contains(pos) {
                state.select_chunk_at_row(row);
            }
        }
    }
}

/// Scrolls the help overlay when it is open, otherwise the focused panel.
fn handle_wheel(state: &mut AppState, lines: i64) {
    if state.mode == Mode::HelpOverlay {
        state.help_scroll = if lines < 0 {
            state.help_scroll.saturating_sub(WHEEL_LINES as u16)
        } else {
            state.help_scroll.saturating_add(WHEEL_LINES as u16)
        };
    } else {
        state.scroll_by(lines);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::worker::ApiRequest;
    use tokio::sync::mpsc::unbounded_channel;

    fn press(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    fn type_text(state: &mut AppState, text: &str) {
        for c in text.chars() {
            handle_key(press(KeyCode::Char(c)), state);
        }
    }

    #[test]
    fn every_search_keystroke_schedules_a_newer_search() {
        let (tx, mut rx) = unbounded_channel();
        let mut state = AppState::new(tx);

        handle_key(press(KeyCode::Char('/')), &mut state);
        assert_eq!(state.mode, Mode::Insert);
        type_text(&mut state, "AA");

        let generations: Vec<u64> = std::iter::from_fn(|| rx.try_recv().ok())
            .filter_map(|r| match r {
                ApiRequest::Search { query, generation } => Some((query, generation)),
                _ => None,
            })
            .map(|(query, generation)| {
                assert!(query == "A" || query == "AA");
                generation
            })
            .collect();
        assert_eq!(generations.len(), 2);
        assert!(generations[1] > generations[0]);
        assert_eq!(state.home.search.query(), "AA");
    }

    #[test]
    fn enter_in_search_moves_focus_to_results() {
        let mut state = AppState::default();
        handle_key(press(KeyCode::Char('/')), &mut state);
        handle_key(press(KeyCode::Enter), &mut state);
        assert_eq!(state.mode, Mode::Normal);
        assert_eq!(state.home.focus, HomeFocus::Results);
    }

    #[test]
    fn escape_closes_the_upload_prompt() {
        let mut state = AppState::default();
        handle_key(press(KeyCode::Char('u')), &mut state);
        assert!(state.home.upload_open);
        type_text(&mut state, "/tmp/x");
        assert_eq!(state.home.upload_path, "/tmp/x");

        handle_key(press(KeyCode::Esc), &mut state);
        assert!(!state.home.upload_open);
        assert!(state.home.upload_path.is_empty());
        assert_eq!(state.mode, Mode::Normal);
    }

    #[test]
    fn q_quits_when_nothing_is_streaming() {
        let mut state = AppState::default();
        assert_eq!(handle_key(press(KeyCode::Char('q')), &mut state), KeyAction::Quit);
    }

    #[test]
    fn help_toggles_and_ignores_other_keys() {
        let mut state = AppState::default();
        handle_key(press(KeyCode::Char('?')), &mut state);
        assert_eq!(state.mode, Mode::HelpOverlay);
        handle_key(press(KeyCode::Char('j')), &mut state);
        assert_eq!(state.help_scroll, 1);
        assert_eq!(handle_key(press(KeyCode::Char('x')), &mut state), KeyAction::Continue);
        handle_key(press(KeyCode::Esc), &mut state);
        assert_eq!(state.mode, Mode::Normal);
    }
}
