use super::*;
use crate::{
    presenter::{ResultTone, ERROR_INDICATOR},
    submission::{PredictionTransport, RawResponse, SubmissionError},
    test_support::{RecordingHistory, ScriptedTransport},
};
use async_trait::async_trait;
use shared::protocol::FormSnapshot;
use std::{sync::Mutex, time::Duration};
use tokio::time::{sleep, timeout};

const STEP_ONE: [(&str, &str); 4] = [
    ("state", "Assam"),
    ("crop", "Rice"),
    ("season", "Kharif"),
    ("crop_year", "2020"),
];
const STEP_TWO: [(&str, &str); 3] = [
    ("annual_rainfall", "1500"),
    ("fertilizer", "120"),
    ("pesticide", "3.5"),
];
const STEP_THREE: [(&str, &str); 4] = [
    ("n_soil", "80"),
    ("p_soil", "40"),
    ("k_soil", "40"),
    ("ph_soil", "6.5"),
];

fn controller_with(
    transport: Arc<dyn PredictionTransport>,
    history: Arc<RecordingHistory>,
) -> WizardController {
    WizardController::new(
        FormSchema::crop_yield(),
        SubmissionController::new(transport),
        ResultPresenter::new(history),
    )
}

fn fill(controller: &mut WizardController, values: &[(&str, &str)]) {
    for (id, value) in values {
        controller.set_field(id, *value).expect("known field");
    }
}

fn advance_to_last_step(controller: &mut WizardController) {
    fill(controller, &STEP_ONE);
    assert!(controller.next().moved());
    fill(controller, &STEP_TWO);
    assert!(controller.next().moved());
    fill(controller, &STEP_THREE);
    assert_eq!(controller.current_step(), 3);
}

fn any_marked(controller: &WizardController) -> bool {
    controller
        .schema()
        .fields()
        .iter()
        .any(|field| controller.marker(&field.id).is_marked())
}

fn success_transport() -> Arc<ScriptedTransport> {
    ScriptedTransport::respond(200, r#"{"data":{"prediction":87.5,"unit":"kg/ha"}}"#)
}

#[tokio::test]
async fn initial_view_shows_step_one_controls() {
    let controller = controller_with(success_transport(), RecordingHistory::new());
    let view = controller.view();

    assert_eq!(view.steps.current, 1);
    assert_eq!(view.steps.total, 3);
    assert!(!view.steps.previous_visible);
    assert!(view.steps.next_visible);
    assert!(!view.steps.submit_visible);
    assert!(!view.submit_enabled);
    assert!(!view.loading);
    assert!(!view.result.visible);
    assert_eq!(view.step_titles.len(), 3);
    assert!(view
        .fields
        .iter()
        .all(|field| field.visible == (field.step == 1)));
}

#[tokio::test]
async fn invalid_step_blocks_advance_and_surfaces_errors() {
    let mut controller = controller_with(success_transport(), RecordingHistory::new());
    controller.set_field("crop_year", "1800").expect("field");

    assert_eq!(controller.next(), Transition::Blocked);
    assert_eq!(controller.current_step(), 1);
    assert_eq!(
        controller.marker("state"),
        FieldMarker::Invalid("This field is required.".into())
    );
    assert_eq!(
        controller.marker("crop_year").message(),
        "Value must be at least 1997."
    );
    assert_eq!(controller.marker("annual_rainfall"), FieldMarker::Unmarked);
}

#[tokio::test]
async fn valid_step_advances_and_updates_view() {
    let mut controller = controller_with(success_transport(), RecordingHistory::new());
    fill(&mut controller, &STEP_ONE);

    assert_eq!(controller.next(), Transition::Moved { from: 1, to: 2 });
    let view = controller.view();
    assert_eq!(view.steps.progress, vec![false, true, false]);
    assert_eq!(view.steps.panels, vec![false, true, false]);
    assert!(view.steps.previous_visible);
    assert!(view.steps.next_visible);
    assert!(!view.steps.submit_visible);
    assert_eq!(controller.marker("crop"), FieldMarker::Valid);
}

#[tokio::test]
async fn advance_rechecks_previous_step_without_blocking() {
    let mut controller = controller_with(success_transport(), RecordingHistory::new());
    fill(&mut controller, &STEP_ONE);
    controller.next();
    controller.clear_all_validation();

    controller.set_field("crop", "").expect("field");
    fill(&mut controller, &STEP_TWO);

    assert_eq!(controller.next(), Transition::Moved { from: 2, to: 3 });
    assert_eq!(
        controller.marker("crop"),
        FieldMarker::Invalid("This field is required.".into())
    );
    assert_eq!(controller.marker("state"), FieldMarker::Valid);
    assert_eq!(controller.marker("fertilizer"), FieldMarker::Valid);
}

#[tokio::test]
async fn retreat_clears_markers_across_the_whole_form() {
    let mut controller = controller_with(success_transport(), RecordingHistory::new());
    advance_to_last_step(&mut controller);
    controller.set_field("ph_soil", "20").expect("field");
    controller.validate_step(3);
    assert!(any_marked(&controller));

    assert_eq!(controller.previous(), Transition::Moved { from: 3, to: 2 });
    assert!(!any_marked(&controller));
    assert_eq!(controller.field_value("ph_soil"), Some("20"));

    controller.previous();
    assert_eq!(controller.previous(), Transition::Unchanged);
    assert_eq!(controller.current_step(), 1);
}

#[tokio::test(start_paused = true)]
async fn reset_returns_to_first_step_with_blank_form_and_hidden_result() {
    let history = RecordingHistory::new();
    let mut controller = controller_with(success_transport(), history.clone());
    advance_to_last_step(&mut controller);
    controller.submit().await.expect("submitted");
    controller.validate_step(3);
    assert!(controller.result().visible);

    controller.reset();
    sleep(Duration::from_secs(2)).await;

    let view = controller.view();
    assert_eq!(view.steps.current, 1);
    assert!(view.fields.iter().all(|field| field.value.is_empty()));
    assert!(!any_marked(&controller));
    assert_eq!(view.result, ResultDisplay::default());
}

#[tokio::test(start_paused = true)]
async fn successful_submit_presents_value_and_records_history() {
    let transport = success_transport();
    let history = RecordingHistory::new();
    let mut controller = controller_with(transport.clone(), history.clone());
    advance_to_last_step(&mut controller);

    let outcome = controller.submit().await;

    assert_eq!(outcome, Some(PredictionOutcome::success(87.5, "kg/ha")));
    assert!(!controller.is_loading());
    assert!(!any_marked(&controller));
    assert_eq!(transport.request_count(), 1);

    let sent = transport.requests.lock().expect("requests")[0].clone();
    assert_eq!(sent.len(), controller.schema().fields().len());
    assert_eq!(sent.get("crop_year"), Some("2020"));
    assert_eq!(sent.get("ph_soil"), Some("6.5"));

    sleep(Duration::from_secs(2)).await;
    let result = controller.result();
    assert!(result.visible && result.entered);
    assert_eq!(result.tone, Some(ResultTone::Success));
    assert_eq!(result.value_text, "87.50");
    assert_eq!(result.subtitle, "For 2020 Rice in Assam");

    let saved = history.saved();
    assert_eq!(saved.len(), 1);
    assert_eq!(saved[0].value, 87.5);
    assert_eq!(saved[0].unit, "kg/ha");
    assert_eq!(controller.current_step(), 3);
}

#[tokio::test]
async fn invalid_final_step_never_reaches_transport() {
    let transport = success_transport();
    let mut controller = controller_with(transport.clone(), RecordingHistory::new());
    advance_to_last_step(&mut controller);
    controller.set_field("ph_soil", "").expect("field");

    assert_eq!(controller.submit().await, None);
    assert_eq!(transport.request_count(), 0);
    assert!(!controller.is_loading());
    assert!(!controller.result().visible);
    assert_eq!(controller.marker("ph_soil").message(), "This field is required.");
}

#[tokio::test]
async fn submit_before_final_step_is_ignored() {
    let transport = success_transport();
    let mut controller = controller_with(transport.clone(), RecordingHistory::new());
    fill(&mut controller, &STEP_ONE);

    assert_eq!(controller.submit().await, None);
    assert_eq!(transport.request_count(), 0);
}

#[tokio::test(start_paused = true)]
async fn server_error_without_body_fails_with_status_message() {
    let history = RecordingHistory::new();
    let mut controller = controller_with(ScriptedTransport::respond(500, "{}"), history.clone());
    advance_to_last_step(&mut controller);

    let outcome = controller.submit().await;

    assert_eq!(outcome, Some(PredictionOutcome::failure("Server error: 500")));
    assert!(!controller.is_loading());
    sleep(Duration::from_millis(50)).await;
    let result = controller.result();
    assert_eq!(result.tone, Some(ResultTone::Error));
    assert_eq!(result.value_text, ERROR_INDICATOR);
    assert!(history.saved().is_empty());
}

#[tokio::test]
async fn network_failure_fails_with_error_message_and_clears_loading() {
    let history = RecordingHistory::new();
    let mut controller = controller_with(
        ScriptedTransport::fail("error sending request: connection refused"),
        history.clone(),
    );
    advance_to_last_step(&mut controller);

    let outcome = controller.submit().await;

    assert_eq!(
        outcome,
        Some(PredictionOutcome::failure(
            "error sending request: connection refused"
        ))
    );
    assert!(!controller.is_loading());
    assert!(controller.view().submit_enabled);
    assert!(history.saved().is_empty());
}

struct ObservingTransport {
    loading: Mutex<Option<LoadingState>>,
    seen_loading: Mutex<Option<bool>>,
}

#[async_trait]
impl PredictionTransport for ObservingTransport {
    async fn post_prediction(&self, _snapshot: &FormSnapshot) -> Result<RawResponse, SubmissionError> {
        let loading = self
            .loading
            .lock()
            .expect("loading")
            .as_ref()
            .map(LoadingState::is_loading);
        *self.seen_loading.lock().expect("seen") = loading;
        Ok(RawResponse {
            status: 200,
            body: br#"{"data":{"prediction":1.0,"unit":"t"}}"#.to_vec(),
        })
    }
}

#[tokio::test]
async fn loading_is_active_only_while_request_is_in_flight() {
    let transport = Arc::new(ObservingTransport {
        loading: Mutex::new(None),
        seen_loading: Mutex::new(None),
    });
    let mut controller = controller_with(transport.clone(), RecordingHistory::new());
    *transport.loading.lock().expect("loading") = Some(controller.loading_state());
    advance_to_last_step(&mut controller);

    controller.submit().await.expect("submitted");

    assert_eq!(*transport.seen_loading.lock().expect("seen"), Some(true));
    assert!(!controller.is_loading());
}

struct StalledTransport;

#[async_trait]
impl PredictionTransport for StalledTransport {
    async fn post_prediction(&self, _snapshot: &FormSnapshot) -> Result<RawResponse, SubmissionError> {
        std::future::pending().await
    }
}

#[tokio::test(start_paused = true)]
async fn abandoned_submit_still_clears_loading() {
    let mut controller = controller_with(Arc::new(StalledTransport), RecordingHistory::new());
    advance_to_last_step(&mut controller);
    let loading = controller.loading_state();

    let abandoned = timeout(Duration::from_millis(10), controller.submit()).await;

    assert!(abandoned.is_err());
    assert!(!loading.is_loading());
    assert!(!controller.result().visible);
}

#[tokio::test(start_paused = true)]
async fn view_reports_loading_between_begin_and_finish() {
    let history = RecordingHistory::new();
    let mut controller = controller_with(success_transport(), history.clone());
    advance_to_last_step(&mut controller);

    let pending = controller.begin_submit().expect("pending");
    let busy = controller.view();
    assert!(busy.loading);
    assert!(!busy.submit_enabled);
    assert!(!busy.result.visible);
    assert_eq!(pending.snapshot().get("crop"), Some("Rice"));

    let outcome = pending.send().await;
    assert!(controller.view().loading);

    controller.finish_submit(pending, &outcome).await;
    let done = controller.view();
    assert!(!done.loading);
    assert!(done.submit_enabled);
    assert!(done.result.visible);
    assert_eq!(history.saved().len(), 1);
}

#[tokio::test]
async fn dropped_pending_submission_clears_loading() {
    let transport = success_transport();
    let mut controller = controller_with(transport.clone(), RecordingHistory::new());
    advance_to_last_step(&mut controller);

    let pending = controller.begin_submit().expect("pending");
    assert!(controller.is_loading());
    drop(pending);

    assert!(!controller.is_loading());
    assert_eq!(transport.request_count(), 0);
}
