use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};

use shared::{domain::PredictionOutcome, protocol::FormSnapshot};
use tracing::{debug, info, warn};

use crate::{
    form::{FormState, UnknownField},
    machine::{StepMachine, StepView, Transition},
    presenter::{ResultDisplay, ResultPresenter},
    schema::FormSchema,
    submission::SubmissionController,
    validation::{FieldMarker, ValidationEngine},
};

#[derive(Debug, Clone, Default)]
pub struct LoadingState(Arc<AtomicBool>);

impl LoadingState {
    pub fn is_loading(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }

    /// Sets the flag until the returned guard is dropped.
    pub fn enter(&self) -> LoadingGuard {
        self.0.store(true, Ordering::SeqCst);
        LoadingGuard(Arc::clone(&self.0))
    }
}

#[must_use = "loading ends when the guard is dropped"]
pub struct LoadingGuard(Arc<AtomicBool>);

impl Drop for LoadingGuard {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

pub struct PendingSubmission {
    snapshot: FormSnapshot,
    submission: SubmissionController,
    _loading: LoadingGuard,
}

impl PendingSubmission {
    pub fn snapshot(&self) -> &FormSnapshot {
        &self.snapshot
    }

    pub async fn send(&self) -> PredictionOutcome {
        self.submission.submit(self.snapshot.clone()).await
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldView {
    pub id: String,
    pub label: String,
    pub step: usize,
    pub value: String,
    pub marker: FieldMarker,
    pub visible: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WizardView {
    pub steps: StepView,
    pub step_titles: Vec<String>,
    pub fields: Vec<FieldView>,
    pub loading: bool,
    pub submit_enabled: bool,
    pub result: ResultDisplay,
}

pub struct WizardController {
    schema: Arc<FormSchema>,
    form: FormState,
    validation: ValidationEngine,
    machine: StepMachine,
    submission: SubmissionController,
    presenter: ResultPresenter,
    loading: LoadingState,
}

impl WizardController {
    pub fn new(
        schema: FormSchema,
        submission: SubmissionController,
        presenter: ResultPresenter,
    ) -> Self {
        let schema = Arc::new(schema);
        let machine = StepMachine::new(schema.total_steps());
        info!(step = machine.current(), total = machine.total(), "wizard initialized");
        Self {
            form: FormState::new(&schema),
            validation: ValidationEngine::new(Arc::clone(&schema)),
            machine,
            schema,
            submission,
            presenter,
            loading: LoadingState::default(),
        }
    }

    pub fn schema(&self) -> &FormSchema {
        &self.schema
    }

    pub fn current_step(&self) -> usize {
        self.machine.current()
    }

    pub fn total_steps(&self) -> usize {
        self.machine.total()
    }

    pub fn is_loading(&self) -> bool {
        self.loading.is_loading()
    }

    pub fn loading_state(&self) -> LoadingState {
        self.loading.clone()
    }

    pub fn set_field(&mut self, id: &str, value: impl Into<String>) -> Result<(), UnknownField> {
        self.form.set(id, value)
    }

    pub fn field_value(&self, id: &str) -> Option<&str> {
        self.form.get(id)
    }

    pub fn marker(&self, id: &str) -> FieldMarker {
        self.validation.marker(id)
    }

    pub fn result(&self) -> ResultDisplay {
        self.presenter.display()
    }

    pub fn is_result_animating(&self) -> bool {
        self.presenter.is_animating()
    }

    pub fn validate_step(&mut self, step: usize) -> bool {
        self.validation.validate_step(step, &self.form)
    }

    pub fn clear_all_validation(&mut self) {
        self.validation.clear_all();
    }

    pub fn next(&mut self) -> Transition {
        let validation = &mut self.validation;
        let form = &self.form;
        let transition = self.machine.advance_if(|step| {
            if step > 1 {
                validation.validate_step(step - 1, form);
            }
            validation.validate_step(step, form)
        });
        if transition == Transition::Blocked {
            debug!(step = self.machine.current(), "advance blocked by validation");
        }
        transition
    }

    pub fn previous(&mut self) -> Transition {
        let validation = &mut self.validation;
        self.machine.retreat_with(|| validation.clear_all())
    }

    pub fn reset(&mut self) {
        self.presenter.hide();
        self.form.clear();
        self.validation.clear_all();
        self.machine.reset();
        info!("wizard reset");
    }

    /// Validates the final step and enters loading. The returned request
    /// holds the loading guard, so `view()` reports loading until it is
    /// handed back to [`Self::finish_submit`] or dropped.
    pub fn begin_submit(&mut self) -> Option<PendingSubmission> {
        if !self.machine.is_last() {
            warn!(
                step = self.machine.current(),
                total = self.machine.total(),
                "submit ignored before the final step"
            );
            return None;
        }

        self.validation.clear_all();
        if !self.validation.validate_step(self.machine.current(), &self.form) {
            debug!("submit blocked by validation");
            return None;
        }

        self.validation.clear_all();
        let loading = self.loading.enter();
        self.presenter.hide();
        Some(PendingSubmission {
            snapshot: self.form.snapshot(),
            submission: self.submission.clone(),
            _loading: loading,
        })
    }

    pub async fn finish_submit(&mut self, pending: PendingSubmission, outcome: &PredictionOutcome) {
        self.presenter.present(outcome, &pending.snapshot).await;
    }

    pub async fn submit(&mut self) -> Option<PredictionOutcome> {
        let pending = self.begin_submit()?;
        let outcome = pending.send().await;
        self.finish_submit(pending, &outcome).await;
        Some(outcome)
    }

    pub fn view(&self) -> WizardView {
        let current = self.machine.current();
        let loading = self.loading.is_loading();
        let fields = self
            .schema
            .fields()
            .iter()
            .map(|spec| FieldView {
                id: spec.id.clone(),
                label: spec.label.clone(),
                step: spec.step,
                value: self.form.get(&spec.id).unwrap_or_default().to_string(),
                marker: self.validation.marker(&spec.id),
                visible: spec.step == current,
            })
            .collect();

        WizardView {
            steps: self.machine.view(),
            step_titles: self
                .schema
                .steps()
                .iter()
                .map(|step| step.title.clone())
                .collect(),
            fields,
            loading,
            submit_enabled: self.machine.is_last() && !loading,
            result: self.presenter.display(),
        }
    }
}

#[cfg(test)]
#[path = "tests/controller_tests.rs"]
mod tests;
