use shared::domain::Theme;
use tracing::warn;

use crate::Storage;

pub const THEME_KEY: &str = "app-theme";

#[derive(Clone)]
pub struct ThemeStore {
    storage: Storage,
}

impl ThemeStore {
    pub fn new(storage: Storage) -> Self {
        Self { storage }
    }

    /// Stored theme, or light when nothing usable is stored.
    pub async fn current(&self) -> Theme {
        match self.storage.get_value(THEME_KEY).await {
            Ok(Some(raw)) => Theme::parse(&raw).unwrap_or_else(|| {
                warn!(stored = %raw, "unrecognized stored theme; using light");
                Theme::default()
            }),
            Ok(None) => Theme::default(),
            Err(error) => {
                warn!(%error, "failed to read theme preference");
                Theme::default()
            }
        }
    }

    pub async fn set_theme(&self, theme: Theme) {
        if let Err(error) = self.storage.set_value(THEME_KEY, theme.as_str()).await {
            warn!(%error, theme = theme.as_str(), "failed to persist theme preference");
        }
    }

    pub async fn toggle(&self) -> Theme {
        let next = self.current().await.toggled();
        self.set_theme(next).await;
        next
    }
}
