//! Spreadsheet sink: one-way submission of the finished document.
//!
//! The receiving script's reply is not trusted as a success signal. Any HTTP
//! response counts as dispatched; only a transport failure is a failure.
use crate::document::WorkshopDocument;
use std::fmt;
use std::time::{Duration, Instant};

const SINK_TIMEOUT: Duration = Duration::from_secs(30);

/// State of the last submission.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum SubmissionOutcome {
    #[default]
    Pending,
    /// The request was sent; the receiver's result is not observed.
    DispatchedAssumedOk,
    DispatchFailed(String),
}

impl fmt::Display for SubmissionOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SubmissionOutcome::Pending => f.write_str("not submitted"),
            SubmissionOutcome::DispatchedAssumedOk => f.write_str("submitted"),
            SubmissionOutcome::DispatchFailed(reason) => write!(f, "submission failed: {reason}"),
        }
    }
}

pub trait Sink {
    fn submit(&self, document: &WorkshopDocument) -> SubmissionOutcome;
}

/// Sink used when no URL is configured; every submission fails.
pub struct NoSink;

impl Sink for NoSink {
    fn submit(&self, _document: &WorkshopDocument) -> SubmissionOutcome {
        SubmissionOutcome::DispatchFailed(
            "no sink URL configured (set --sink-url or ESGW_SINK_URL)".to_string(),
        )
    }
}

/// POSTs the document as JSON to a webhook (e.g. an Apps Script endpoint).
pub struct WebhookSink {
    agent: ureq::Agent,
    url: String,
}

impl WebhookSink {
    pub fn new(url: impl Into<String>) -> Self {
        let agent: ureq::Agent = ureq::Agent::config_builder()
            .timeout_global(Some(SINK_TIMEOUT))
            .http_status_as_error(false)
            .build()
            .into();
        WebhookSink {
            agent,
            url: url.into(),
        }
    }
}

impl Sink for WebhookSink {
    fn submit(&self, document: &WorkshopDocument) -> SubmissionOutcome {
        let start = Instant::now();
        match self.agent.post(self.url.as_str()).send_json(document) {
            Ok(response) => {
                let status = response.status().as_u16();
                tracing::info!(
                    elapsed_ms = start.elapsed().as_millis(),
                    status,
                    "sink dispatch complete"
                );
                if !(200..300).contains(&status) {
                    tracing::warn!(status, "sink replied with a non-success status");
                }
                SubmissionOutcome::DispatchedAssumedOk
            }
            Err(err) => {
                tracing::warn!(error = %err, "sink dispatch failed");
                SubmissionOutcome::DispatchFailed(err.to_string())
            }
        }
    }
}
