//! Fakes shared by the crate's unit tests.

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use shared::{domain::HistoryEntry, protocol::FormSnapshot};

use crate::{
    presenter::HistorySink,
    submission::{PredictionTransport, RawResponse, SubmissionError},
};

pub enum Scripted {
    Respond { status: u16, body: String },
    Fail(String),
}

/// Transport that answers every request with the same scripted reply and
/// records the snapshots it was given.
pub struct ScriptedTransport {
    reply: Scripted,
    pub requests: Mutex<Vec<FormSnapshot>>,
}

impl ScriptedTransport {
    pub fn respond(status: u16, body: impl Into<String>) -> Arc<Self> {
        Arc::new(Self {
            reply: Scripted::Respond {
                status,
                body: body.into(),
            },
            requests: Mutex::new(Vec::new()),
        })
    }

    pub fn fail(message: impl Into<String>) -> Arc<Self> {
        Arc::new(Self {
            reply: Scripted::Fail(message.into()),
            requests: Mutex::new(Vec::new()),
        })
    }

    pub fn request_count(&self) -> usize {
        self.requests.lock().expect("requests").len()
    }
}

#[async_trait]
impl PredictionTransport for ScriptedTransport {
    async fn post_prediction(&self, snapshot: &FormSnapshot) -> Result<RawResponse, SubmissionError> {
        self.requests.lock().expect("requests").push(snapshot.clone());
        tokio::task::yield_now().await;
        match &self.reply {
            Scripted::Respond { status, body } => Ok(RawResponse {
                status: *status,
                body: body.clone().into_bytes(),
            }),
            Scripted::Fail(message) => Err(SubmissionError::Transport(message.clone())),
        }
    }
}

#[derive(Default)]
pub struct RecordingHistory {
    pub entries: Mutex<Vec<HistoryEntry>>,
}

impl RecordingHistory {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn saved(&self) -> Vec<HistoryEntry> {
        self.entries.lock().expect("entries").clone()
    }
}

#[async_trait]
impl HistorySink for RecordingHistory {
    async fn save(&self, entry: HistoryEntry) {
        self.entries.lock().expect("entries").push(entry);
    }
}
