use std::collections::HashSet;

use serde::{Deserialize, Serialize};
use shared::protocol::OptionsResponse;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SchemaError {
    #[error("form schema declares no steps")]
    NoSteps,
    #[error("step {0} has no fields")]
    EmptyStep(usize),
    #[error("field '{field}' is placed on step {step}, but the form has {total} steps")]
    StepOutOfRange {
        field: String,
        step: usize,
        total: usize,
    },
    #[error("field '{0}' is declared more than once")]
    DuplicateField(String),
    #[error("field '{field}' has min {min} greater than max {max}")]
    InvertedBounds { field: String, min: f64, max: f64 },
    #[error("failed to parse form schema: {0}")]
    Parse(#[from] toml::de::Error),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldKind {
    #[default]
    Text,
    Number,
    Select,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldSpec {
    pub id: String,
    pub label: String,
    pub step: usize,
    #[serde(default)]
    pub kind: FieldKind,
    #[serde(default)]
    pub required: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max: Option<f64>,
    /// Allowed values for select fields. Empty means any non-empty value.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub options: Vec<String>,
}

impl FieldSpec {
    fn new(id: &str, label: &str, step: usize, kind: FieldKind) -> Self {
        Self {
            id: id.to_string(),
            label: label.to_string(),
            step,
            kind,
            required: true,
            min: None,
            max: None,
            options: Vec::new(),
        }
    }

    fn bounded(mut self, min: Option<f64>, max: Option<f64>) -> Self {
        self.min = min;
        self.max = max;
        self
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StepSpec {
    pub title: String,
}

#[derive(Debug, Deserialize)]
struct RawSchema {
    steps: Vec<StepSpec>,
    #[serde(default)]
    fields: Vec<FieldSpec>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FormSchema {
    steps: Vec<StepSpec>,
    fields: Vec<FieldSpec>,
}

impl FormSchema {
    pub fn new(steps: Vec<StepSpec>, fields: Vec<FieldSpec>) -> Result<Self, SchemaError> {
        if steps.is_empty() {
            return Err(SchemaError::NoSteps);
        }

        let total = steps.len();
        let mut seen = HashSet::new();
        for field in &fields {
            if field.step == 0 || field.step > total {
                return Err(SchemaError::StepOutOfRange {
                    field: field.id.clone(),
                    step: field.step,
                    total,
                });
            }
            if !seen.insert(field.id.as_str()) {
                return Err(SchemaError::DuplicateField(field.id.clone()));
            }
            if let (Some(min), Some(max)) = (field.min, field.max) {
                if min > max {
                    return Err(SchemaError::InvertedBounds {
                        field: field.id.clone(),
                        min,
                        max,
                    });
                }
            }
        }

        if let Some(empty) = (1..=total).find(|step| !fields.iter().any(|f| f.step == *step)) {
            return Err(SchemaError::EmptyStep(empty));
        }

        Ok(Self { steps, fields })
    }

    pub fn from_toml_str(raw: &str) -> Result<Self, SchemaError> {
        let raw: RawSchema = toml::from_str(raw)?;
        Self::new(raw.steps, raw.fields)
    }

    pub fn crop_yield() -> Self {
        use FieldKind::{Number, Select};

        let steps = ["Location & Crop", "Climate & Inputs", "Soil Profile"]
            .into_iter()
            .map(|title| StepSpec {
                title: title.to_string(),
            })
            .collect();
        let fields = vec![
            FieldSpec::new("state", "State", 1, Select),
            FieldSpec::new("crop", "Crop", 1, Select),
            FieldSpec::new("season", "Season", 1, Select),
            FieldSpec::new("crop_year", "Crop year", 1, Number).bounded(Some(1997.0), Some(2030.0)),
            FieldSpec::new("annual_rainfall", "Annual rainfall (mm)", 2, Number)
                .bounded(Some(0.0), Some(10000.0)),
            FieldSpec::new("fertilizer", "Fertilizer (kg)", 2, Number).bounded(Some(0.0), None),
            FieldSpec::new("pesticide", "Pesticide (kg)", 2, Number).bounded(Some(0.0), None),
            FieldSpec::new("n_soil", "Nitrogen (N)", 3, Number).bounded(Some(0.0), Some(300.0)),
            FieldSpec::new("p_soil", "Phosphorus (P)", 3, Number).bounded(Some(0.0), Some(300.0)),
            FieldSpec::new("k_soil", "Potassium (K)", 3, Number).bounded(Some(0.0), Some(300.0)),
            FieldSpec::new("ph_soil", "Soil pH", 3, Number).bounded(Some(0.0), Some(14.0)),
        ];

        Self { steps, fields }
    }

    pub fn total_steps(&self) -> usize {
        self.steps.len()
    }

    pub fn contains_step(&self, step: usize) -> bool {
        (1..=self.steps.len()).contains(&step)
    }

    pub fn steps(&self) -> &[StepSpec] {
        &self.steps
    }

    pub fn fields(&self) -> &[FieldSpec] {
        &self.fields
    }

    pub fn field(&self, id: &str) -> Option<&FieldSpec> {
        self.fields.iter().find(|field| field.id == id)
    }

    pub fn fields_in_step(&self, step: usize) -> impl Iterator<Item = &FieldSpec> {
        self.fields.iter().filter(move |field| field.step == step)
    }

    pub fn set_options(&mut self, id: &str, options: Vec<String>) -> bool {
        match self
            .fields
            .iter_mut()
            .find(|field| field.id == id && field.kind == FieldKind::Select)
        {
            Some(field) => {
                field.options = options;
                true
            }
            None => false,
        }
    }

    pub fn apply_options(&mut self, options: &OptionsResponse) {
        self.set_options("crop", options.crops.clone());
        self.set_options("state", options.states.clone());
        self.set_options("season", options.seasons.clone());
    }
}
