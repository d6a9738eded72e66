use shared::protocol::FormSnapshot;
use thiserror::Error;

use crate::schema::FormSchema;

#[derive(Debug, Error, PartialEq, Eq)]
#[error("form has no field named '{0}'")]
pub struct UnknownField(pub String);

#[derive(Debug, Clone)]
pub struct FormState {
    values: Vec<(String, String)>,
}

impl FormState {
    pub fn new(schema: &FormSchema) -> Self {
        Self {
            values: schema
                .fields()
                .iter()
                .map(|field| (field.id.clone(), String::new()))
                .collect(),
        }
    }

    pub fn set(&mut self, id: &str, value: impl Into<String>) -> Result<(), UnknownField> {
        let slot = self
            .values
            .iter_mut()
            .find(|(field, _)| field == id)
            .ok_or_else(|| UnknownField(id.to_string()))?;
        slot.1 = value.into();
        Ok(())
    }

    pub fn get(&self, id: &str) -> Option<&str> {
        self.values
            .iter()
            .find(|(field, _)| field == id)
            .map(|(_, value)| value.as_str())
    }

    pub fn clear(&mut self) {
        for (_, value) in &mut self.values {
            value.clear();
        }
    }

    pub fn snapshot(&self) -> FormSnapshot {
        FormSnapshot::from_pairs(self.values.iter().cloned())
    }
}
