use shared::domain::HistoryEntry;
use tracing::{debug, warn};

use crate::Storage;

pub const HISTORY_KEY: &str = "crop_yield_history";
pub const HISTORY_LIMIT: usize = 10;

/// Newest-first list of past predictions, capped at [`HISTORY_LIMIT`].
///
/// Persistence is best-effort: read failures and corrupt payloads yield an
/// empty history, write failures are logged and dropped.
#[derive(Clone)]
pub struct HistoryStore {
    storage: Storage,
}

impl HistoryStore {
    pub fn new(storage: Storage) -> Self {
        Self { storage }
    }

    pub async fn entries(&self) -> Vec<HistoryEntry> {
        let raw = match self.storage.get_value(HISTORY_KEY).await {
            Ok(Some(raw)) => raw,
            Ok(None) => return Vec::new(),
            Err(error) => {
                warn!(%error, "failed to read prediction history");
                return Vec::new();
            }
        };

        match serde_json::from_str::<Vec<HistoryEntry>>(&raw) {
            Ok(entries) => entries,
            Err(error) => {
                warn!(%error, "stored prediction history is corrupt; treating as empty");
                Vec::new()
            }
        }
    }

    pub async fn save(&self, entry: HistoryEntry) {
        let mut entries = self.entries().await;
        entries.insert(0, entry);
        entries.truncate(HISTORY_LIMIT);

        let raw = match serde_json::to_string(&entries) {
            Ok(raw) => raw,
            Err(error) => {
                warn!(%error, "failed to encode prediction history");
                return;
            }
        };

        match self.storage.set_value(HISTORY_KEY, &raw).await {
            Ok(()) => debug!(retained = entries.len(), "saved prediction to history"),
            Err(error) => warn!(%error, "failed to save prediction history"),
        }
    }

    pub async fn clear(&self) {
        if let Err(error) = self.storage.remove_value(HISTORY_KEY).await {
            warn!(%error, "failed to clear prediction history");
        }
    }
}
