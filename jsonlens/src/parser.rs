//! Off-thread JSON parsing.
//!
//! A large document can take long enough to parse that it would stall an
//! interactive loop, so each parse runs on its own named worker thread
//! and reports back over a oneshot channel. One message in, one message
//! out, and the worker exits.

use serde_json::Value;
use tracing::{debug, warn};

/// What became of a parse attempt.
#[derive(Debug, Clone, PartialEq)]
pub enum ParseOutcome {
    /// The document is valid JSON. Object key order is preserved.
    Success(Value),
    /// Not JSON; the caller falls back to the raw text.
    Failure { message: String },
}

/// Parse result paired with the text it came from, so the caller can
/// still show the raw document on failure.
#[derive(Debug, Clone, PartialEq)]
pub struct ParseReply {
    pub text: String,
    pub outcome: ParseOutcome,
}

/// Parse `text` as JSON.
///
/// The failure message keeps serde's line and column so the status line
/// can say where the document went wrong.
pub fn parse_text(text: &str) -> ParseOutcome {
    match serde_json::from_str::<Value>(text) {
        Ok(value) => ParseOutcome::Success(value),
        Err(e) => ParseOutcome::Failure {
            message: e.to_string(),
        },
    }
}

/// Run one parse on a dedicated worker thread.
///
/// If the worker cannot be spawned or dies before replying, the reply
/// degrades to a parse failure instead of hanging the caller; the text
/// is lost in that case because it had already moved to the worker.
pub async fn parse_off_thread(text: String) -> ParseReply {
    let (reply_tx, reply_rx) = tokio::sync::oneshot::channel();

    let spawned = std::thread::Builder::new()
        .name("jsonlens-parse".to_string())
        .spawn(move || {
            let outcome = parse_text(&text);
            debug!(
                ok = matches!(outcome, ParseOutcome::Success(_)),
                bytes = text.len(),
                "parse worker finished"
            );
            let _ = reply_tx.send(ParseReply { text, outcome });
        });

    match spawned {
        Ok(_join) => match reply_rx.await {
            Ok(reply) => reply,
            Err(_) => {
                warn!("parse worker dropped its reply");
                ParseReply {
                    text: String::new(),
                    outcome: ParseOutcome::Failure {
                        message: "parse worker terminated unexpectedly".to_string(),
                    },
                }
            }
        },
        Err(e) => {
            warn!(error = %e, "failed to spawn parse worker");
            ParseReply {
                text: String::new(),
                outcome: ParseOutcome::Failure {
                    message: format!("failed to start parse worker: {e}"),
                },
            }
        }
    }
}
