//! Prediction assets: the yield model and the category encodings, loaded once
//! at startup.

use std::{fs, path::Path, sync::Arc};

use anyhow::{bail, Context};
use serde::Deserialize;
use shared::protocol::OptionsResponse;
use tracing::{error, info};

use crate::config::Settings;

pub const FEATURE_COUNT: usize = 11;

pub type FeatureVector = [f64; FEATURE_COUNT];

pub trait YieldModel: Send + Sync {
    fn predict(&self, features: &FeatureVector) -> anyhow::Result<f64>;
}

/// `intercept + Σ weights[i] * features[i]`.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct LinearYieldModel {
    intercept: f64,
    weights: Vec<f64>,
}

impl LinearYieldModel {
    pub fn new(intercept: f64, weights: Vec<f64>) -> anyhow::Result<Self> {
        if weights.len() != FEATURE_COUNT {
            bail!(
                "model expects {FEATURE_COUNT} weights, found {}",
                weights.len()
            );
        }
        if !intercept.is_finite() || weights.iter().any(|weight| !weight.is_finite()) {
            bail!("model coefficients must be finite");
        }
        Ok(Self { intercept, weights })
    }

    pub fn from_json_str(raw: &str) -> anyhow::Result<Self> {
        let parsed: Self = serde_json::from_str(raw).context("invalid model coefficients")?;
        Self::new(parsed.intercept, parsed.weights)
    }

    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let raw = fs::read_to_string(path)
            .with_context(|| format!("failed to read model '{}'", path.display()))?;
        Self::from_json_str(&raw)
    }
}

impl YieldModel for LinearYieldModel {
    fn predict(&self, features: &FeatureVector) -> anyhow::Result<f64> {
        let value = self.intercept
            + self
                .weights
                .iter()
                .zip(features)
                .map(|(weight, feature)| weight * feature)
                .sum::<f64>();
        if !value.is_finite() {
            bail!("model produced a non-finite prediction");
        }
        Ok(value)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Category {
    Crop,
    State,
    Season,
}

impl Category {
    pub fn field(self) -> &'static str {
        match self {
            Self::Crop => "crop",
            Self::State => "state",
            Self::Season => "season",
        }
    }
}

/// Ordered category lists; a value's index is its model feature.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct CategoricalEncodings {
    #[serde(rename = "Crop")]
    pub crops: Vec<String>,
    #[serde(rename = "State")]
    pub states: Vec<String>,
    #[serde(rename = "Season")]
    pub seasons: Vec<String>,
}

impl CategoricalEncodings {
    pub fn from_json_str(raw: &str) -> anyhow::Result<Self> {
        serde_json::from_str(raw).context("invalid categorical encodings")
    }

    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let raw = fs::read_to_string(path)
            .with_context(|| format!("failed to read encodings '{}'", path.display()))?;
        Self::from_json_str(&raw)
    }

    fn values(&self, category: Category) -> &[String] {
        match category {
            Category::Crop => &self.crops,
            Category::State => &self.states,
            Category::Season => &self.seasons,
        }
    }

    pub fn index_of(&self, category: Category, value: &str) -> Option<usize> {
        self.values(category).iter().position(|known| known == value)
    }

    pub fn sorted_options(&self) -> OptionsResponse {
        let sorted = |category| {
            let mut values = self.values(category).to_vec();
            values.sort();
            values
        };
        OptionsResponse {
            crops: sorted(Category::Crop),
            states: sorted(Category::State),
            seasons: sorted(Category::Season),
        }
    }
}

#[derive(Clone, Default)]
pub struct Assets {
    pub model: Option<Arc<dyn YieldModel>>,
    pub encodings: Option<CategoricalEncodings>,
}

impl Assets {
    /// Loads both assets; a failure leaves that asset absent so the server
    /// can still start and report it per request.
    pub fn load(settings: &Settings) -> Self {
        let model = match LinearYieldModel::load(Path::new(&settings.model_path)) {
            Ok(model) => {
                info!(path = %settings.model_path, "model loaded");
                Some(Arc::new(model) as Arc<dyn YieldModel>)
            }
            Err(error) => {
                error!(path = %settings.model_path, error = %format!("{error:#}"), "could not load model");
                None
            }
        };

        let encodings = match CategoricalEncodings::load(Path::new(&settings.encodings_path)) {
            Ok(encodings) => {
                info!(path = %settings.encodings_path, "encodings loaded");
                Some(encodings)
            }
            Err(error) => {
                error!(path = %settings.encodings_path, error = %format!("{error:#}"), "could not load encodings");
                None
            }
        };

        Self { model, encodings }
    }
}
