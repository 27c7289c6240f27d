//! Application state machine.
//!
//! ```text
//! Idle --analyze (images non-empty)--> Analyzing --ok--> Results(plan)
//!                                                 \--err--> Error(message)
//! Error --dismiss/reset--> Idle (images kept)
//! Results --reset--> Idle (images cleared)
//! ```
//!
//! Images may only change while idle. A plan exists only in `Results` and a
//! message only in `Error`.

use securenest_contracts::events::{EventPayload, EventWriter};
use securenest_contracts::plan::SecurityPlan;
use serde_json::{json, Value};

use crate::capture::{EncodedImage, ImageSource, ImageTray};
use crate::client::AnalysisClient;
use crate::error::{AnalysisError, SessionError};

#[derive(Debug, Clone, PartialEq)]
pub enum AppState {
    Idle,
    Analyzing,
    Results(SecurityPlan),
    Error(String),
}

impl AppState {
    pub fn tag(&self) -> &'static str {
        match self {
            AppState::Idle => "idle",
            AppState::Analyzing => "analyzing",
            AppState::Results(_) => "results",
            AppState::Error(_) => "error",
        }
    }

    pub fn plan(&self) -> Option<&SecurityPlan> {
        match self {
            AppState::Results(plan) => Some(plan),
            _ => None,
        }
    }

    pub fn error_message(&self) -> Option<&str> {
        match self {
            AppState::Error(message) => Some(message),
            _ => None,
        }
    }

    pub fn is_idle(&self) -> bool {
        matches!(self, AppState::Idle)
    }
}

pub struct Session {
    images: ImageTray,
    state: AppState,
    events: Option<EventWriter>,
}

impl Default for Session {
    fn default() -> Self {
        Self::new()
    }
}

impl Session {
    pub fn new() -> Self {
        Self::with_tray(ImageTray::new())
    }

    pub fn with_tray(images: ImageTray) -> Self {
        Self {
            images,
            state: AppState::Idle,
            events: None,
        }
    }

    pub fn with_events(mut self, events: EventWriter) -> Self {
        self.events = Some(events);
        self
    }

    pub fn state(&self) -> &AppState {
        &self.state
    }

    pub fn images(&self) -> &ImageTray {
        &self.images
    }

    pub fn add_images(
        &mut self,
        sources: impl IntoIterator<Item = ImageSource>,
    ) -> Result<Vec<String>, SessionError> {
        self.require_idle()?;
        let ids = self.images.add(sources);
        self.emit(
            "images_added",
            json!({ "ids": ids, "total": self.images.len() }),
        );
        Ok(ids)
    }

    pub fn remove_image(&mut self, id: &str) -> Result<bool, SessionError> {
        self.require_idle()?;
        let removed = self.images.remove(id);
        if removed {
            self.emit(
                "image_removed",
                json!({ "id": id, "total": self.images.len() }),
            );
        }
        Ok(removed)
    }

    /// Moves Idle to Analyzing and returns the payloads to send.
    ///
    /// Returns `None`, leaving the state untouched, when not idle or when
    /// there are no images.
    pub fn begin_analysis(&mut self) -> Option<Vec<EncodedImage>> {
        if !self.state.is_idle() || self.images.is_empty() {
            return None;
        }
        let payloads = self.images.encoded_payloads();
        self.transition(AppState::Analyzing);
        self.emit("analysis_started", json!({ "images": payloads.len() }));
        Some(payloads)
    }

    /// Settles an in-flight attempt. Ignored unless the state is Analyzing.
    pub fn finish_analysis(&mut self, outcome: Result<SecurityPlan, AnalysisError>) -> bool {
        if self.state != AppState::Analyzing {
            tracing::warn!(
                state = self.state.tag(),
                "analysis outcome without attempt in flight"
            );
            return false;
        }
        match outcome {
            Ok(plan) => {
                self.emit(
                    "analysis_completed",
                    json!({
                        "recommendations": plan.recommendations.len(),
                        "vulnerabilities": plan.vulnerabilities.len(),
                        "cost_min": plan.total_estimated_cost_min,
                        "cost_max": plan.total_estimated_cost_max,
                    }),
                );
                self.transition(AppState::Results(plan));
            }
            Err(err) => {
                let message = err.user_message();
                tracing::warn!(kind = err.kind(), error = %message, "analysis failed");
                self.emit(
                    "analysis_failed",
                    json!({ "kind": err.kind(), "message": message }),
                );
                self.transition(AppState::Error(message));
            }
        }
        true
    }

    /// Runs one full attempt against `client`. Returns false when the guard
    /// rejected the attempt.
    pub fn analyze(&mut self, client: &AnalysisClient) -> bool {
        let Some(payloads) = self.begin_analysis() else {
            return false;
        };
        let outcome = client.analyze(&payloads);
        self.finish_analysis(outcome)
    }

    /// Error -> Idle, keeping the images.
    pub fn dismiss_error(&mut self) -> bool {
        if !matches!(self.state, AppState::Error(_)) {
            return false;
        }
        self.transition(AppState::Idle);
        true
    }

    /// Returns to Idle. From Results or Idle the image list is cleared; from
    /// Error this is the same as [`Session::dismiss_error`].
    pub fn reset(&mut self) -> bool {
        match self.state {
            AppState::Analyzing => false,
            AppState::Error(_) => self.dismiss_error(),
            AppState::Results(_) | AppState::Idle => {
                let discarded = self.images.len();
                self.images.clear();
                self.emit("images_cleared", json!({ "discarded": discarded }));
                self.transition(AppState::Idle);
                true
            }
        }
    }

    fn require_idle(&self) -> Result<(), SessionError> {
        if self.state.is_idle() {
            return Ok(());
        }
        Err(SessionError::NotIdle {
            state: self.state.tag(),
        })
    }

    fn transition(&mut self, next: AppState) {
        let from = self.state.tag();
        let to = next.tag();
        self.state = next;
        if from != to {
            tracing::info!(from, to, "state changed");
            self.emit("state_changed", json!({ "from": from, "to": to }));
        }
    }

    fn emit(&self, event_type: &str, payload: Value) {
        let Some(events) = self.events.as_ref() else {
            return;
        };
        let payload: EventPayload = match payload {
            Value::Object(map) => map,
            _ => EventPayload::new(),
        };
        if let Err(err) = events.emit(event_type, payload) {
            tracing::warn!(event = event_type, error = %err, "event log write failed");
        }
    }
}
