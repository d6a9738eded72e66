//! Client side of the crop-yield wizard.

pub mod controller;
pub mod form;
pub mod machine;
pub mod presenter;
pub mod schema;
pub mod submission;
pub mod validation;

pub use controller::{
    FieldView, LoadingGuard, LoadingState, PendingSubmission, WizardController, WizardView,
};
pub use form::{FormState, UnknownField};
pub use machine::{StepMachine, StepView, Transition};
pub use presenter::{
    AnimationTiming, CountUp, HistorySink, ResultDisplay, ResultPresenter, ResultTone,
};
pub use schema::{FieldKind, FieldSpec, FormSchema, SchemaError, StepSpec};
pub use submission::{
    interpret_response, HttpPredictionTransport, PredictionTransport, RawResponse,
    SubmissionController, SubmissionError,
};
pub use validation::{
    check_field, FieldMarker, FieldVerdict, ValidationEngine, ValidationError, ValidationReport,
};

#[cfg(test)]
#[path = "tests/support.rs"]
mod test_support;
