//! Background API worker.
//!
//! Owns the [`ApiClient`]. Requests arrive over a channel as [`ApiRequest`];
//! every request runs in its own task so a slow download or a long agent
//! stream never holds up the next one. Results go back to the main loop as
//! `AppEvent::Api`.
//!
//! Searches are superseded: each new search cancels the previous one, and a
//! cancelled search sends nothing. The agent stream is forwarded one event at
//! a time so the chat panel updates as text arrives.

use std::time::Duration;

use futures::StreamExt;
use ken_core::chat::{AgentQuery, SEND_FAILED};
use ken_core::document::DocumentContent;
use ken_core::pending::PendingWorkspace;
use ken_core::search::{debounced_search, Searcher};
use ken_core::stream::StreamEvent;
use ken_core::types::{Activity, CreatedWorkspace, Document, SearchResult, Workspace};
use ken_core::ApiClient;
use tokio::sync::mpsc::{UnboundedReceiver, UnboundedSender};
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::event::AppEvent;

/// Work the UI asks the worker to do.
#[derive(Debug)]
pub enum ApiRequest {
    ListWorkspaces,
    /// Debounced ticker search; supersedes any search still in flight.
    Search { query: String, generation: u64 },
    CreateWorkspace(PendingWorkspace),
    LoadWorkspace(String),
    ListDocuments(String),
    ListActivities(String),
    Download(Document),
    /// Opens an agent stream for chat session `session`.
    Agent { session: u64, query: AgentQuery },
    /// Drops the agent stream, if any (the chat view was closed).
    CancelAgent,
}

/// One update from an agent stream.
#[derive(Debug)]
pub enum ChatUpdate {
    Event(StreamEvent),
    /// The request or the stream failed; the text is shown as an error message.
    Failed(String),
    /// The body ended without a `done` or `error` event.
    Ended,
}

/// Results sent back to the main loop.
///
/// Every result names what it belongs to so the state can drop results for a
/// screen, document or chat that is no longer shown.
#[derive(Debug)]
pub enum ApiEvent {
    Workspaces(Result<Vec<Workspace>, String>),
    SearchResults {
        generation: u64,
        outcome: Result<Vec<SearchResult>, String>,
    },
    WorkspaceCreated {
        workspace_id: String,
        outcome: Result<CreatedWorkspace, String>,
    },
    WorkspaceLoaded {
        workspace_id: String,
        outcome: Result<Workspace, String>,
    },
    Documents {
        workspace_id: String,
        outcome: Result<Vec<Document>, String>,
    },
    Activities {
        workspace_id: String,
        outcome: Result<Vec<Activity>, String>,
    },
    DocumentLoaded {
        document_id: String,
        outcome: Result<DocumentContent, String>,
    },
    Chat { session: u64, update: ChatUpdate },
}

fn send(tx: &UnboundedSender<AppEvent>, event: ApiEvent) {
    let _ = tx.send(AppEvent::Api(Box::new(event)));
}

/// Runs until every request sender is dropped.
///
/// # Arguments
///
/// * `api` - backend client shared by all request tasks
/// * `debounce` - delay applied to each search before it is issued
/// * `rx` - incoming requests
/// * `event_tx` - the main event bus
pub async fn api_worker_loop(
    api: ApiClient,
    debounce: Duration,
    mut rx: UnboundedReceiver<ApiRequest>,
    event_tx: UnboundedSender<AppEvent>,
) {
    let mut searcher = Searcher::new();
    let mut agent_token: Option<CancellationToken> = None;

    while let Some(request) = rx.recv().await {
        match request {
            ApiRequest::Search { query, generation } => {
                let token = searcher.supersede();
                let (api, tx) = (api.clone(), event_tx.clone());
                tokio::spawn(async move {
                    match debounced_search(&api, &query, &token, debounce).await {
                        Ok(None) => {}
                        Ok(Some(results)) => send(
                            &tx,
                            ApiEvent::SearchResults {
                                generation,
                                outcome: Ok(results),
                            },
                        ),
                        Err(e) => {
                            warn!(error = %e, query = %query, "search failed");
                            send(
                                &tx,
                                ApiEvent::SearchResults {
                                    generation,
                                    outcome: Err(e.to_string()),
                                },
                            );
                        }
                    }
                });
            }
            ApiRequest::Agent { session, query } => {
                if let Some(previous) = agent_token.take() {
                    previous.cancel();
                }
                let token = CancellationToken::new();
                agent_token = Some(token.clone());
                let (api, tx) = (api.clone(), event_tx.clone());
                tokio::spawn(async move {
                    tokio::select! {
                        _ = token.cancelled() => debug!(session, "agent stream dropped"),
                        _ = forward_agent_stream(&api, session, query, &tx) => {}
                    }
                });
            }
            ApiRequest::CancelAgent => {
                if let Some(previous) = agent_token.take() {
                    previous.cancel();
                }
            }
            other => {
                let (api, tx) = (api.clone(), event_tx.clone());
                tokio::spawn(async move {
                    let event = handle_request(&api, other).await;
                    if let Some(event) = event {
                        send(&tx, event);
                    }
                });
            }
        }
    }
}

/// Runs one request/response call and wraps its result.
async fn handle_request(api: &ApiClient, request: ApiRequest) -> Option<ApiEvent> {
    let event = match request {
        ApiRequest::ListWorkspaces => {
            ApiEvent::Workspaces(api.list_workspaces().await.map_err(|e| e.to_string()))
        }
        ApiRequest::CreateWorkspace(pending) => ApiEvent::WorkspaceCreated {
            outcome: api.create_workspace(&pending).await.map_err(|e| e.to_string()),
            workspace_id: pending.workspace_id,
        },
        ApiRequest::LoadWorkspace(workspace_id) => ApiEvent::WorkspaceLoaded {
            outcome: api.get_workspace(&workspace_id).await.map_err(|e| e.to_string()),
            workspace_id,
        },
        ApiRequest::ListDocuments(workspace_id) => ApiEvent::Documents {
            outcome: api.list_documents(&workspace_id).await.map_err(|e| e.to_string()),
            workspace_id,
        },
        ApiRequest::ListActivities(workspace_id) => ApiEvent::Activities {
            outcome: api.list_activities(&workspace_id).await.map_err(|e| e.to_string()),
            workspace_id,
        },
        ApiRequest::Download(document) => ApiEvent::DocumentLoaded {
            outcome: api.download_document(&document).await.map_err(|e| e.to_string()),
            document_id: document.id,
        },
        ApiRequest::Search { .. } | ApiRequest::Agent { .. } | ApiRequest::CancelAgent => {
            return None;
        }
    };
    if let Some(error) = event_error(&event) {
        warn!(error, "api request failed");
    }
    Some(event)
}

fn event_error(event: &ApiEvent) -> Option<&str> {
    match event {
        ApiEvent::Workspaces(Err(e))
        | ApiEvent::WorkspaceCreated { outcome: Err(e), .. }
        | ApiEvent::WorkspaceLoaded { outcome: Err(e), .. }
        | ApiEvent::Documents { outcome: Err(e), .. }
        | ApiEvent::Activities { outcome: Err(e), .. }
        | ApiEvent::DocumentLoaded { outcome: Err(e), .. } => Some(e),
        _ => None,
    }
}

/// Opens the agent stream and forwards its events until a terminal event.
async fn forward_agent_stream(
    api: &ApiClient,
    session: u64,
    query: AgentQuery,
    tx: &UnboundedSender<AppEvent>,
) {
    let chat = |update| send(tx, ApiEvent::Chat { session, update });

    let events = match api.query_agent_stream(&query).await {
        Ok(events) => events,
        Err(e) => {
            warn!(error = %e, "agent request failed");
            chat(ChatUpdate::Failed(SEND_FAILED.to_owned()));
            return;
        }
    };
    let mut events = std::pin::pin!(events);
    while let Some(event) = events.next().await {
        match event {
            Ok(event) => {
                let terminal = matches!(event, StreamEvent::Done | StreamEvent::Error { .. });
                chat(ChatUpdate::Event(event));
                if terminal {
                    return;
                }
            }
            Err(e) => {
                warn!(error = %e, "agent stream failed");
                chat(ChatUpdate::Failed(e.to_string()));
                return;
            }
        }
    }
    chat(ChatUpdate::Ended);
}
