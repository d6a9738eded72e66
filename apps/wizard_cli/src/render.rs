use std::fmt::Write as _;

use chrono::Local;
use shared::domain::{HistoryEntry, Theme};
use wizard_core::{FieldMarker, FormSchema, ResultDisplay, ResultTone, WizardView};

pub const EMPTY_HISTORY: &str = "No predictions yet.";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Palette {
    accent: &'static str,
    success: &'static str,
    error: &'static str,
    dim: &'static str,
    reset: &'static str,
}

impl Palette {
    pub const PLAIN: Self = Self {
        accent: "",
        success: "",
        error: "",
        dim: "",
        reset: "",
    };

    pub fn for_theme(theme: Theme, color: bool) -> Self {
        if !color {
            return Self::PLAIN;
        }
        match theme {
            Theme::Light => Self {
                accent: "\x1b[34m",
                success: "\x1b[32m",
                error: "\x1b[31m",
                dim: "\x1b[2m",
                reset: "\x1b[0m",
            },
            Theme::Dark => Self {
                accent: "\x1b[96m",
                success: "\x1b[92m",
                error: "\x1b[91m",
                dim: "\x1b[90m",
                reset: "\x1b[0m",
            },
        }
    }
}

pub fn render_view(view: &WizardView, schema: &FormSchema, palette: Palette) -> String {
    let Palette {
        accent,
        success,
        error,
        dim,
        reset,
    } = palette;
    let mut out = String::new();

    let progress: String = view
        .steps
        .progress
        .iter()
        .map(|selected| if *selected { '●' } else { '○' })
        .collect();
    let title = view
        .step_titles
        .get(view.steps.current - 1)
        .map(String::as_str)
        .unwrap_or_default();
    let _ = writeln!(
        out,
        "{accent}Step {} of {}{reset}  {progress}  {title}",
        view.steps.current, view.steps.total
    );

    for field in view.fields.iter().filter(|field| field.visible) {
        let value = if field.value.is_empty() {
            format!("{dim}(empty){reset}")
        } else {
            field.value.clone()
        };
        let mark = match &field.marker {
            FieldMarker::Unmarked => String::new(),
            FieldMarker::Valid => format!("  {success}✓{reset}"),
            FieldMarker::Invalid(message) => format!("  {error}✗ {message}{reset}"),
        };
        let _ = writeln!(out, "  {:<16} {}: {value}{mark}", field.id, field.label);

        if let Some(spec) = schema.field(&field.id) {
            if !spec.options.is_empty() {
                let _ = writeln!(out, "  {:<16} {dim}options: {}{reset}", "", spec.options.join(", "));
            }
        }
    }

    let mut controls = Vec::new();
    if view.steps.previous_visible {
        controls.push("back");
    }
    if view.steps.next_visible {
        controls.push("next");
    }
    if view.steps.submit_visible {
        controls.push(if view.submit_enabled { "submit" } else { "submit (busy)" });
    }
    controls.push("reset");
    let _ = writeln!(out, "{dim}[{}]{reset}", controls.join("] ["));

    if view.loading {
        let _ = writeln!(out, "{dim}Predicting...{reset}");
    }
    if view.result.visible {
        out.push_str(&render_result(&view.result, palette));
    }
    out
}

pub fn render_result(result: &ResultDisplay, palette: Palette) -> String {
    let tone = match result.tone {
        Some(ResultTone::Success) => palette.success,
        Some(ResultTone::Error) => palette.error,
        None => "",
    };
    let reset = palette.reset;
    let mut out = String::new();
    let _ = writeln!(out, "{tone}{}{reset}", result.title);
    let _ = writeln!(out, "  {}", result.subtitle);
    let value = if result.unit.is_empty() {
        result.value_text.clone()
    } else {
        format!("{} {}", result.value_text, result.unit)
    };
    let _ = writeln!(out, "  {tone}{value}{reset}");
    out
}

pub fn render_history(entries: &[HistoryEntry]) -> String {
    if entries.is_empty() {
        return format!("{EMPTY_HISTORY}\n");
    }
    let mut out = String::new();
    for entry in entries {
        let _ = writeln!(
            out,
            "  {:<16} {}  {:.2} {}",
            entry.crop,
            entry.timestamp.with_timezone(&Local).format("%Y-%m-%d %H:%M"),
            entry.value,
            entry.unit
        );
    }
    out
}

#[cfg(test)]
#[path = "tests/render_tests.rs"]
mod tests;
