use std::{collections::HashMap, sync::Arc};

use thiserror::Error;
use tracing::{debug, warn};

use crate::{
    form::FormState,
    schema::{FieldKind, FieldSpec, FormSchema},
};

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ValidationError {
    #[error("This field is required.")]
    Required,
    #[error("Value must be at least {min}.")]
    BelowMinimum { min: f64 },
    #[error("Value cannot be more than {max}.")]
    AboveMaximum { max: f64 },
    #[error("Please enter a number.")]
    NotANumber,
    #[error("Please select an item in the list.")]
    NotAnOption,
}

pub fn check_field(spec: &FieldSpec, raw: &str) -> Result<(), ValidationError> {
    let value = raw.trim();
    if value.is_empty() {
        return if spec.required {
            Err(ValidationError::Required)
        } else {
            Ok(())
        };
    }

    match spec.kind {
        FieldKind::Text => Ok(()),
        FieldKind::Number => {
            let number = value.parse::<f64>().ok().filter(|n| n.is_finite());
            if let (Some(number), Some(min)) = (number, spec.min) {
                if number < min {
                    return Err(ValidationError::BelowMinimum { min });
                }
            }
            if let (Some(number), Some(max)) = (number, spec.max) {
                if number > max {
                    return Err(ValidationError::AboveMaximum { max });
                }
            }
            number.map(|_| ()).ok_or(ValidationError::NotANumber)
        }
        FieldKind::Select => {
            if spec.options.is_empty() || spec.options.iter().any(|option| option == value) {
                Ok(())
            } else {
                Err(ValidationError::NotAnOption)
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldVerdict {
    pub valid: bool,
    pub message: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValidationReport {
    verdicts: Vec<(String, FieldVerdict)>,
}

impl ValidationReport {
    pub fn passed(&self) -> bool {
        self.verdicts.iter().all(|(_, verdict)| verdict.valid)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &FieldVerdict)> {
        self.verdicts
            .iter()
            .map(|(field, verdict)| (field.as_str(), verdict))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum FieldMarker {
    #[default]
    Unmarked,
    Valid,
    Invalid(String),
}

impl FieldMarker {
    pub fn message(&self) -> &str {
        match self {
            Self::Invalid(message) => message,
            Self::Unmarked | Self::Valid => "",
        }
    }

    pub fn is_marked(&self) -> bool {
        !matches!(self, Self::Unmarked)
    }
}

pub struct ValidationEngine {
    schema: Arc<FormSchema>,
    markers: HashMap<String, FieldMarker>,
}

impl ValidationEngine {
    pub fn new(schema: Arc<FormSchema>) -> Self {
        Self {
            schema,
            markers: HashMap::new(),
        }
    }

    pub fn evaluate_step(&self, step: usize, form: &FormState) -> ValidationReport {
        let verdicts = self
            .schema
            .fields_in_step(step)
            .map(|spec| {
                let verdict = match check_field(spec, form.get(&spec.id).unwrap_or_default()) {
                    Ok(()) => FieldVerdict {
                        valid: true,
                        message: String::new(),
                    },
                    Err(error) => FieldVerdict {
                        valid: false,
                        message: error.to_string(),
                    },
                };
                (spec.id.clone(), verdict)
            })
            .collect();
        ValidationReport { verdicts }
    }

    pub fn validate_step(&mut self, step: usize, form: &FormState) -> bool {
        if !self.schema.contains_step(step) {
            warn!(step, total = self.schema.total_steps(), "validation requested for unknown step");
            return false;
        }

        let report = self.evaluate_step(step, form);
        for (id, verdict) in report.iter() {
            let marker = if verdict.valid {
                FieldMarker::Valid
            } else {
                FieldMarker::Invalid(verdict.message.clone())
            };
            self.markers.insert(id.to_string(), marker);
        }

        let passed = report.passed();
        debug!(step, passed, "validated step");
        passed
    }

    pub fn clear_all(&mut self) {
        self.markers.clear();
    }

    pub fn marker(&self, id: &str) -> FieldMarker {
        self.markers.get(id).cloned().unwrap_or_default()
    }
}
