use super::*;

use chrono::{TimeZone, Utc};
use wizard_core::{FieldView, StepMachine};

fn view_on_step(step: usize, schema: &FormSchema) -> WizardView {
    let mut machine = StepMachine::new(schema.total_steps());
    for _ in 1..step {
        machine.advance_if(|_| true);
    }
    let fields = schema
        .fields()
        .iter()
        .map(|spec| FieldView {
            id: spec.id.clone(),
            label: spec.label.clone(),
            step: spec.step,
            value: String::new(),
            marker: FieldMarker::Unmarked,
            visible: spec.step == step,
        })
        .collect();
    WizardView {
        steps: machine.view(),
        step_titles: schema.steps().iter().map(|s| s.title.clone()).collect(),
        fields,
        loading: false,
        submit_enabled: machine.is_last(),
        result: ResultDisplay::default(),
    }
}

#[test]
fn first_step_shows_only_its_fields_and_next() {
    let schema = FormSchema::crop_yield();
    let out = render_view(&view_on_step(1, &schema), &schema, Palette::PLAIN);

    assert!(out.starts_with("Step 1 of 3  ●○○  Location & Crop"));
    assert!(out.contains("crop_year"));
    assert!(!out.contains("ph_soil"));
    assert!(out.contains("[next] [reset]"));
    assert!(!out.contains("back"));
}

#[test]
fn markers_and_select_options_render() {
    let mut schema = FormSchema::crop_yield();
    schema.set_options("crop", vec!["Rice".into(), "Wheat".into()]);
    let mut view = view_on_step(1, &schema);
    for field in &mut view.fields {
        match field.id.as_str() {
            "crop" => field.marker = FieldMarker::Valid,
            "state" => field.marker = FieldMarker::Invalid("This field is required.".into()),
            _ => {}
        }
    }

    let out = render_view(&view, &schema, Palette::PLAIN);
    assert!(out.contains("✓"));
    assert!(out.contains("✗ This field is required."));
    assert!(out.contains("options: Rice, Wheat"));
}

#[test]
fn last_step_shows_submit_state_and_result() {
    let schema = FormSchema::crop_yield();
    let mut view = view_on_step(3, &schema);
    view.loading = true;
    view.submit_enabled = false;
    view.result = ResultDisplay {
        visible: true,
        entered: true,
        tone: Some(ResultTone::Error),
        title: "Prediction Failed".into(),
        subtitle: "Server error: 500".into(),
        value_text: "Error".into(),
        unit: String::new(),
    };

    let out = render_view(&view, &schema, Palette::PLAIN);
    assert!(out.contains("[back] [submit (busy)] [reset]"));
    assert!(out.contains("Predicting..."));
    assert!(out.contains("Prediction Failed\n  Server error: 500\n  Error\n"));
}

#[test]
fn dark_palette_differs_from_light() {
    assert_ne!(
        Palette::for_theme(Theme::Dark, true),
        Palette::for_theme(Theme::Light, true)
    );
    assert_eq!(Palette::for_theme(Theme::Dark, false), Palette::PLAIN);
}

#[test]
fn history_lists_entries_or_empty_state() {
    assert_eq!(render_history(&[]), "No predictions yet.\n");

    let timestamp = Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).single().expect("time");
    let out = render_history(&[HistoryEntry::new("Rice", 3.14159, "Tons / Hectare", timestamp)]);
    assert!(out.contains("Rice"));
    assert!(out.contains("3.14 Tons / Hectare"));
}
