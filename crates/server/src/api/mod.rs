use serde_json::{Map, Value};
use shared::{
    error::{ApiException, ErrorCode},
    protocol::{OptionsResponse, PredictResponse, PredictionData},
};
use tracing::{error, info, warn};

use crate::model::{Assets, CategoricalEncodings, Category, FeatureVector, FEATURE_COUNT};

/// Model input order.
pub const FEATURE_SCHEMA: [&str; FEATURE_COUNT] = [
    "crop_year",
    "annual_rainfall",
    "fertilizer",
    "pesticide",
    "n_soil",
    "p_soil",
    "k_soil",
    "ph_soil",
    "crop",
    "season",
    "state",
];

const NUMERIC_FEATURE_COUNT: usize = 8;

pub const PREDICTION_UNIT: &str = "Tons / Hectare";

pub const MODEL_NOT_LOADED_MESSAGE: &str =
    "Prediction model is not available. Please contact support.";
pub const BAD_REQUEST_FORMAT_MESSAGE: &str =
    "Invalid request: Content-Type must be application/json.";
pub const INTERNAL_ERROR_MESSAGE: &str = "An unexpected server error occurred. Please try again.";

pub fn list_options(assets: &Assets) -> Result<OptionsResponse, ApiException> {
    let encodings = assets.encodings.as_ref().ok_or_else(|| {
        error!("encodings not loaded; cannot list options");
        ApiException::new(ErrorCode::AssetsNotLoaded, INTERNAL_ERROR_MESSAGE)
    })?;
    Ok(encodings.sorted_options())
}

/// Accepts `application/json` and `application/*+json` bodies holding a JSON object.
pub fn parse_json_body(
    content_type: Option<&str>,
    body: &[u8],
) -> Result<Map<String, Value>, ApiException> {
    let is_json = content_type
        .and_then(|value| value.split(';').next())
        .map(|mime| mime.trim().to_ascii_lowercase())
        .is_some_and(|mime| {
            mime == "application/json"
                || (mime.starts_with("application/") && mime.ends_with("+json"))
        });
    if !is_json {
        warn!(
            content_type = content_type.unwrap_or_default(),
            "prediction request was not json"
        );
        return Err(bad_request_format());
    }

    match serde_json::from_slice::<Value>(body) {
        Ok(Value::Object(map)) => Ok(map),
        Ok(_) => {
            warn!("prediction request body was not a json object");
            Err(bad_request_format())
        }
        Err(error) => {
            warn!(%error, "prediction request body was not valid json");
            Err(bad_request_format())
        }
    }
}

fn bad_request_format() -> ApiException {
    ApiException::new(ErrorCode::BadRequestFormat, BAD_REQUEST_FORMAT_MESSAGE)
}

pub fn missing_fields(payload: &Map<String, Value>) -> Vec<&'static str> {
    FEATURE_SCHEMA
        .iter()
        .copied()
        .filter(|key| !payload.contains_key(*key))
        .collect()
}

fn invalid_value(detail: String) -> ApiException {
    warn!(%detail, "prediction request carried an invalid value");
    ApiException::new(
        ErrorCode::InvalidDataValue,
        format!("Invalid data provided: {detail}. Check that all values are correct."),
    )
}

fn numeric_feature(key: &str, value: &Value) -> Result<f64, ApiException> {
    let parsed = match value {
        Value::Number(number) => number.as_f64(),
        Value::String(raw) => raw.trim().parse::<f64>().ok(),
        _ => None,
    };
    parsed
        .filter(|number| number.is_finite())
        .ok_or_else(|| invalid_value(format!("could not convert {key} value {value} to a number")))
}

fn categorical_feature(
    encodings: &CategoricalEncodings,
    category: Category,
    value: &Value,
) -> Result<f64, ApiException> {
    let index = value
        .as_str()
        .and_then(|raw| encodings.index_of(category, raw));
    match index {
        Some(index) => Ok(index as f64),
        None => Err(invalid_value(format!(
            "{value} is not a known {}",
            category.field()
        ))),
    }
}

/// Builds the model input from a payload whose keys are all present.
pub fn encode_features(
    encodings: &CategoricalEncodings,
    payload: &Map<String, Value>,
) -> Result<FeatureVector, ApiException> {
    static ABSENT: Value = Value::Null;
    let field = |key: &str| payload.get(key).unwrap_or(&ABSENT);

    let crop = categorical_feature(encodings, Category::Crop, field("crop"))?;
    let state = categorical_feature(encodings, Category::State, field("state"))?;
    let season = categorical_feature(encodings, Category::Season, field("season"))?;

    let mut features = [0.0; FEATURE_COUNT];
    for (slot, key) in features
        .iter_mut()
        .zip(FEATURE_SCHEMA.iter())
        .take(NUMERIC_FEATURE_COUNT)
    {
        *slot = numeric_feature(key, field(key))?;
    }
    features[8] = crop;
    features[9] = season;
    features[10] = state;
    Ok(features)
}

pub fn predict(
    assets: &Assets,
    content_type: Option<&str>,
    body: &[u8],
) -> Result<PredictResponse, ApiException> {
    let model = assets.model.as_ref().ok_or_else(|| {
        error!("prediction failed: model is not loaded");
        ApiException::new(ErrorCode::ModelNotLoaded, MODEL_NOT_LOADED_MESSAGE)
    })?;

    let payload = parse_json_body(content_type, body)?;

    let missing = missing_fields(&payload);
    if !missing.is_empty() {
        warn!(?missing, "prediction request missing fields");
        return Err(ApiException::new(
            ErrorCode::MissingFields,
            format!("Missing required fields: {}", missing.join(", ")),
        ));
    }

    let encodings = assets.encodings.as_ref().ok_or_else(|| {
        error!("prediction failed: encodings are not loaded");
        ApiException::new(ErrorCode::InternalServerError, INTERNAL_ERROR_MESSAGE)
    })?;
    let features = encode_features(encodings, &payload)?;

    let prediction = model.predict(&features).map_err(|error| {
        error!(error = %format!("{error:#}"), "prediction failed unexpectedly");
        ApiException::new(ErrorCode::InternalServerError, INTERNAL_ERROR_MESSAGE)
    })?;
    info!(prediction, "prediction served");

    Ok(PredictResponse {
        data: PredictionData {
            prediction,
            unit: PREDICTION_UNIT.to_string(),
        },
    })
}

#[cfg(test)]
#[path = "tests/mod_tests.rs"]
mod tests;
