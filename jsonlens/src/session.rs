//! Retrieval session: download, parse, render, supersede.
//!
//! A session owns one surface and tracks which retrieval is current.
//! Starting a new retrieval bumps the current id; events tagged with an
//! older id are dropped on the floor, so a slow response can never
//! overwrite the document a faster, newer retrieval already put up.
//! The superseded transfer itself is left to finish (or fail) in the
//! background; only its effects are suppressed.

use serde_json::{Value, json};
use tokio::sync::mpsc::UnboundedSender;
use tracing::{debug, info, warn};

use jsonlens_core::RetrievalError;

use crate::parser::{ParseOutcome, parse_off_thread};
use crate::reader::{RetrievalProgress, fetch_document};
use crate::surface::Surface;

/// Identity of one retrieval within a session. Later retrievals compare
/// greater.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct RetrievalId(u64);

/// What the viewer currently shows.
#[derive(Debug, Clone, PartialEq)]
pub enum ViewMode {
    Empty,
    /// A parsed document.
    Tree(Value),
    /// Raw text of a document that did not parse.
    Text(String),
}

/// Events emitted by a running retrieval.
#[derive(Debug)]
pub enum RetrievalEvent {
    Progress(RetrievalProgress),
    /// Download finished and the off-thread parse came back.
    Completed { text: String, outcome: ParseOutcome },
    /// Download never finished.
    Failed(RetrievalError),
}

/// One viewer, one session.
pub struct ViewerSession<S: Surface> {
    surface: S,
    current: u64,
    mode: ViewMode,
}

impl<S: Surface> ViewerSession<S> {
    pub fn new(surface: S) -> Self {
        Self {
            surface,
            current: 0,
            mode: ViewMode::Empty,
        }
    }

    /// Begin a new retrieval, superseding any retrieval in flight.
    ///
    /// The previous document stays visible while the new one loads; only
    /// the status line and progress indicator reset.
    pub fn begin(&mut self, target: &str) -> RetrievalId {
        self.current += 1;
        info!(target, retrieval = self.current, "retrieval started");
        self.surface.set_status(&format!("Loading {target} ..."));
        self.surface.set_progress(None);
        RetrievalId(self.current)
    }

    /// Apply an event from retrieval `id`. Events from a superseded
    /// retrieval are no-ops.
    pub fn apply(&mut self, id: RetrievalId, event: RetrievalEvent) {
        if id.0 != self.current {
            debug!(
                event_retrieval = id.0,
                current = self.current,
                "dropping stale retrieval event"
            );
            return;
        }

        match event {
            RetrievalEvent::Progress(progress) => {
                self.surface.set_progress(progress.percent());
            }
            RetrievalEvent::Completed { text, outcome } => match outcome {
                ParseOutcome::Success(document) => {
                    info!(bytes = text.len(), retrieval = id.0, "document parsed");
                    self.surface.set_progress(Some(100));
                    self.surface
                        .set_status(&format!("Loaded ({} bytes)", text.len()));
                    self.surface.show_tree(&document);
                    self.mode = ViewMode::Tree(document);
                }
                ParseOutcome::Failure { message } => {
                    warn!(
                        retrieval = id.0,
                        error = %message,
                        "document is not JSON, showing raw text"
                    );
                    self.surface.set_progress(Some(100));
                    self.surface
                        .set_status(&format!("Not valid JSON ({message}); showing raw text"));
                    self.surface.show_text(&text);
                    self.mode = ViewMode::Text(text);
                }
            },
            RetrievalEvent::Failed(error) => {
                warn!(retrieval = id.0, error = %error, "retrieval failed");
                let message = error.to_string();
                let document = json!({"error": message});
                self.surface.set_progress(None);
                self.surface.set_status(&message);
                self.surface.show_tree(&document);
                self.mode = ViewMode::Tree(document);
            }
        }
    }

    /// Current view state.
    pub fn mode(&self) -> &ViewMode {
        &self.mode
    }

    /// The surface, for inspection.
    pub fn surface(&self) -> &S {
        &self.surface
    }
}

/// Drive one retrieval end to end, emitting events tagged with `id`.
///
/// Progress flows while the body downloads; the parse starts only after
/// the final byte. The session side decides staleness, so a superseded
/// retrieval keeps running here without harm, and a closed receiver just
/// means nobody is listening any more.
pub async fn retrieve(
    client: reqwest::Client,
    proxy_base: String,
    target: String,
    id: RetrievalId,
    events: UnboundedSender<(RetrievalId, RetrievalEvent)>,
) {
    let progress_events = events.clone();
    let result = fetch_document(&client, &proxy_base, &target, move |progress| {
        let _ = progress_events.send((id, RetrievalEvent::Progress(progress)));
    })
    .await;

    match result {
        Ok(text) => {
            let reply = parse_off_thread(text).await;
            let _ = events.send((
                id,
                RetrievalEvent::Completed {
                    text: reply.text,
                    outcome: reply.outcome,
                },
            ));
        }
        Err(error) => {
            let _ = events.send((id, RetrievalEvent::Failed(error)));
        }
    }
}
