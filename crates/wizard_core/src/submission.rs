use std::{sync::Arc, time::Duration};

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::{header, Client};
use serde_json::Value;
use shared::{
    domain::PredictionOutcome,
    protocol::{FormSnapshot, OptionsResponse, OPTIONS_ROUTE, PREDICT_ROUTE},
};
use thiserror::Error;
use tracing::{info, warn};

pub const UNKNOWN_ERROR_MESSAGE: &str = "An unknown error occurred.";

#[derive(Debug, Error)]
pub enum SubmissionError {
    #[error("{0}")]
    Transport(String),
    #[error("{message}")]
    Status { status: u16, message: String },
    #[error("{0}")]
    Protocol(String),
}

impl SubmissionError {
    pub fn class(&self) -> &'static str {
        match self {
            Self::Transport(_) | Self::Status { .. } => "transport",
            Self::Protocol(_) => "protocol",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawResponse {
    pub status: u16,
    pub body: Vec<u8>,
}

#[async_trait]
pub trait PredictionTransport: Send + Sync {
    async fn post_prediction(&self, snapshot: &FormSnapshot) -> Result<RawResponse, SubmissionError>;
}

pub struct HttpPredictionTransport {
    http: Client,
    server_url: String,
}

impl HttpPredictionTransport {
    pub fn new(server_url: impl Into<String>) -> Self {
        Self::with_client(Client::new(), server_url)
    }

    pub fn with_timeout(server_url: impl Into<String>, timeout: Duration) -> Result<Self> {
        let http = Client::builder()
            .timeout(timeout)
            .build()
            .context("failed to build prediction http client")?;
        Ok(Self::with_client(http, server_url))
    }

    pub fn with_client(http: Client, server_url: impl Into<String>) -> Self {
        let server_url = server_url.into();
        Self {
            http,
            server_url: server_url.trim_end_matches('/').to_string(),
        }
    }

    pub fn server_url(&self) -> &str {
        &self.server_url
    }

    pub async fn fetch_options(&self) -> Result<OptionsResponse> {
        let options = self
            .http
            .get(format!("{}{OPTIONS_ROUTE}", self.server_url))
            .header(header::ACCEPT, "application/json")
            .send()
            .await
            .context("failed to request form options")?
            .error_for_status()?
            .json::<OptionsResponse>()
            .await
            .context("failed to decode form options")?;
        Ok(options)
    }
}

#[async_trait]
impl PredictionTransport for HttpPredictionTransport {
    async fn post_prediction(&self, snapshot: &FormSnapshot) -> Result<RawResponse, SubmissionError> {
        let response = self
            .http
            .post(format!("{}{PREDICT_ROUTE}", self.server_url))
            .header(header::ACCEPT, "application/json")
            .json(snapshot)
            .send()
            .await
            .map_err(|error| SubmissionError::Transport(error.to_string()))?;
        let status = response.status().as_u16();
        let body = response
            .bytes()
            .await
            .map_err(|error| SubmissionError::Transport(error.to_string()))?;
        Ok(RawResponse {
            status,
            body: body.to_vec(),
        })
    }
}

/// Maps a status and body to the predicted value and unit.
///
/// An undecodable body is read as an empty object.
pub fn interpret_response(status: u16, body: &[u8]) -> Result<(f64, String), SubmissionError> {
    let payload: Value = serde_json::from_slice(body).unwrap_or(Value::Null);
    let error_message = payload
        .pointer("/error/message")
        .and_then(Value::as_str)
        .map(str::to_string);

    if !(200..300).contains(&status) {
        return Err(SubmissionError::Status {
            status,
            message: error_message.unwrap_or_else(|| format!("Server error: {status}")),
        });
    }

    let data = payload.get("data").filter(|data| data.is_object());
    let prediction = data.and_then(|data| data.get("prediction")).and_then(|value| {
        value
            .as_f64()
            .or_else(|| value.as_str().and_then(|raw| raw.trim().parse().ok()))
    });
    let unit = data
        .and_then(|data| data.get("unit"))
        .and_then(Value::as_str);

    match (prediction, unit) {
        (Some(prediction), Some(unit)) if prediction.is_finite() => Ok((prediction, unit.to_string())),
        _ => Err(SubmissionError::Protocol(
            error_message.unwrap_or_else(|| UNKNOWN_ERROR_MESSAGE.to_string()),
        )),
    }
}

#[derive(Clone)]
pub struct SubmissionController {
    transport: Arc<dyn PredictionTransport>,
}

impl SubmissionController {
    pub fn new(transport: Arc<dyn PredictionTransport>) -> Self {
        Self { transport }
    }

    pub async fn submit(&self, snapshot: FormSnapshot) -> PredictionOutcome {
        match self.request(&snapshot).await {
            Ok((value, unit)) => {
                info!(value, %unit, "prediction succeeded");
                PredictionOutcome::success(value, unit)
            }
            Err(error) => {
                match &error {
                    SubmissionError::Status { status, .. } => {
                        warn!(class = error.class(), status, %error, "prediction failed")
                    }
                    _ => warn!(class = error.class(), %error, "prediction failed"),
                }
                PredictionOutcome::failure(error.to_string())
            }
        }
    }

    async fn request(&self, snapshot: &FormSnapshot) -> Result<(f64, String), SubmissionError> {
        let response = self.transport.post_prediction(snapshot).await?;
        interpret_response(response.status, &response.body)
    }
}

#[cfg(test)]
#[path = "tests/submission_tests.rs"]
mod tests;
