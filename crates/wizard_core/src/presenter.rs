use std::{
    sync::{Arc, Mutex, MutexGuard, PoisonError},
    time::Duration,
};

use async_trait::async_trait;
use chrono::Utc;
use shared::{
    domain::{HistoryEntry, PredictionOutcome},
    protocol::FormSnapshot,
};
use storage::HistoryStore;
use tokio::{
    task::JoinHandle,
    time::{interval_at, sleep, Instant},
};

pub const SUCCESS_TITLE: &str = "Prediction Successful";
pub const FAILURE_TITLE: &str = "Prediction Failed";
pub const ERROR_INDICATOR: &str = "Error";
pub const UNKNOWN_CROP: &str = "Unknown Crop";

#[async_trait]
pub trait HistorySink: Send + Sync {
    async fn save(&self, entry: HistoryEntry);
}

#[async_trait]
impl HistorySink for HistoryStore {
    async fn save(&self, entry: HistoryEntry) {
        HistoryStore::save(self, entry).await;
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResultTone {
    Success,
    Error,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResultDisplay {
    pub visible: bool,
    pub entered: bool,
    pub tone: Option<ResultTone>,
    pub title: String,
    pub subtitle: String,
    pub value_text: String,
    pub unit: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AnimationTiming {
    pub duration: Duration,
    pub frame_interval: Duration,
    pub reveal_delay: Duration,
}

impl Default for AnimationTiming {
    fn default() -> Self {
        Self {
            duration: Duration::from_millis(1500),
            frame_interval: Duration::from_secs(1) / 60,
            reveal_delay: Duration::from_millis(10),
        }
    }
}

impl AnimationTiming {
    pub fn total_frames(&self) -> u32 {
        if self.frame_interval.is_zero() {
            return 1;
        }
        let frames = (self.duration.as_secs_f64() / self.frame_interval.as_secs_f64()).round();
        (frames as u32).max(1)
    }
}

fn ease_out_quad(t: f64) -> f64 {
    t * (2.0 - t)
}

/// Displayed text for each animation frame; the last frame is always the
/// exact target to two decimals.
#[derive(Debug, Clone)]
pub struct CountUp {
    target: f64,
    frame: u32,
    total_frames: u32,
}

impl CountUp {
    pub fn new(target: f64, total_frames: u32) -> Self {
        Self {
            target,
            frame: 0,
            total_frames: total_frames.max(1),
        }
    }
}

impl Iterator for CountUp {
    type Item = String;

    fn next(&mut self) -> Option<String> {
        if self.frame >= self.total_frames {
            return None;
        }
        self.frame += 1;
        if self.frame == self.total_frames {
            return Some(format!("{:.2}", self.target));
        }
        let progress = ease_out_quad(f64::from(self.frame) / f64::from(self.total_frames));
        Some(format!("{:.2}", self.target * progress))
    }
}

fn lock(display: &Mutex<ResultDisplay>) -> MutexGuard<'_, ResultDisplay> {
    display.lock().unwrap_or_else(PoisonError::into_inner)
}

pub struct ResultPresenter {
    display: Arc<Mutex<ResultDisplay>>,
    history: Arc<dyn HistorySink>,
    timing: AnimationTiming,
    animation: Option<JoinHandle<()>>,
    reveal: Option<JoinHandle<()>>,
}

impl ResultPresenter {
    pub fn new(history: Arc<dyn HistorySink>) -> Self {
        Self::with_timing(history, AnimationTiming::default())
    }

    pub fn with_timing(history: Arc<dyn HistorySink>, timing: AnimationTiming) -> Self {
        Self {
            display: Arc::new(Mutex::new(ResultDisplay::default())),
            history,
            timing,
            animation: None,
            reveal: None,
        }
    }

    pub fn display(&self) -> ResultDisplay {
        lock(&self.display).clone()
    }

    pub fn is_animating(&self) -> bool {
        self.animation
            .as_ref()
            .is_some_and(|handle| !handle.is_finished())
    }

    /// Renders `outcome` and, on success, records it in history. Must run
    /// inside a tokio runtime. Timers start before the history write.
    pub async fn present(&mut self, outcome: &PredictionOutcome, form: &FormSnapshot) {
        self.cancel_timers();

        *lock(&self.display) = match outcome {
            PredictionOutcome::Success { unit, .. } => ResultDisplay {
                visible: true,
                entered: false,
                tone: Some(ResultTone::Success),
                title: SUCCESS_TITLE.to_string(),
                subtitle: success_subtitle(form),
                value_text: "0.00".to_string(),
                unit: unit.clone(),
            },
            PredictionOutcome::Failure { message } => ResultDisplay {
                visible: true,
                entered: false,
                tone: Some(ResultTone::Error),
                title: FAILURE_TITLE.to_string(),
                subtitle: message.clone(),
                value_text: ERROR_INDICATOR.to_string(),
                unit: String::new(),
            },
        };
        self.reveal = Some(self.spawn_reveal());

        if let PredictionOutcome::Success { value, unit } = outcome {
            self.animation = Some(self.spawn_count_up(*value));
            let crop = form
                .get("crop")
                .map(str::trim)
                .filter(|crop| !crop.is_empty())
                .unwrap_or(UNKNOWN_CROP);
            self.history
                .save(HistoryEntry::new(crop, *value, unit.clone(), Utc::now()))
                .await;
        }
    }

    pub fn hide(&mut self) {
        self.cancel_timers();
        *lock(&self.display) = ResultDisplay::default();
    }

    fn cancel_timers(&mut self) {
        for handle in [self.animation.take(), self.reveal.take()].into_iter().flatten() {
            handle.abort();
        }
    }

    fn spawn_count_up(&self, target: f64) -> JoinHandle<()> {
        let display = Arc::clone(&self.display);
        let period = self.timing.frame_interval.max(Duration::from_millis(1));
        let frames = CountUp::new(target, self.timing.total_frames());
        tokio::spawn(async move {
            let mut ticker = interval_at(Instant::now() + period, period);
            for text in frames {
                ticker.tick().await;
                lock(&display).value_text = text;
            }
        })
    }

    fn spawn_reveal(&self) -> JoinHandle<()> {
        let display = Arc::clone(&self.display);
        let delay = self.timing.reveal_delay;
        tokio::spawn(async move {
            sleep(delay).await;
            let mut display = lock(&display);
            if display.visible {
                display.entered = true;
            }
        })
    }
}

impl Drop for ResultPresenter {
    fn drop(&mut self) {
        self.cancel_timers();
    }
}

fn success_subtitle(form: &FormSnapshot) -> String {
    let field = |name: &str| form.get(name).unwrap_or_default();
    format!(
        "For {} {} in {}",
        field("crop_year"),
        field("crop"),
        field("state")
    )
}

#[cfg(test)]
#[path = "tests/presenter_tests.rs"]
mod tests;
