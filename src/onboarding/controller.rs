//! WizardController — owns the step cursor and answers for one session and
//! drives transitions, saves and the host button.

use std::sync::Arc;

use tokio::runtime::Handle;
use tokio::sync::mpsc;
use tokio::task::{JoinError, JoinHandle};
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::config::WizardConfig;
use crate::error::{AnswerError, SyncError, WizardError};

use super::answers::{AnswerStore, Category};
use super::host::HostChrome;
use super::presenter::{ButtonState, present};
use super::state::{SaveMarker, WizardStep};
use super::sync::{IdentityToken, ProgressSync};

/// Input events delivered by the host.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WizardEvent {
    /// The user picked `value` in option group `group`.
    OptionSelected { group: String, value: String },
    /// The host's primary action button was activated.
    PrimaryAction,
    /// The host was backgrounded or lost visibility.
    VisibilityLost,
}

/// What a primary action activation did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActionOutcome {
    /// Active step incomplete: best-effort save dispatched, session ended.
    EndedEarly,
    /// Awaited save in flight; the transition happens when it settles.
    SaveStarted(SaveMarker),
    /// An awaited save is already in flight. Nothing was dispatched.
    Rejected,
}

/// Result of an awaited save once it settles.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SettleOutcome {
    Advanced(WizardStep),
    Failed(SyncError),
    /// The save was confirmed but the cursor could not move. The step is
    /// unchanged.
    Stalled(WizardError),
}

struct InFlight {
    marker: SaveMarker,
    task: JoinHandle<Result<(), SyncError>>,
}

enum Next {
    Event(Option<WizardEvent>),
    Settled(Result<Result<(), SyncError>, JoinError>),
}

/// Per-session wizard controller. Construct one per session; nothing here
/// is shared between sessions.
///
/// Saves run as tokio tasks, so completing a step needs an ambient tokio
/// runtime. Without one the activation fails with
/// [`WizardError::RuntimeUnavailable`] before anything is dispatched.
pub struct WizardController {
    session_id: Uuid,
    host: Arc<dyn HostChrome>,
    sync: Arc<dyn ProgressSync>,
    config: WizardConfig,
    answers: AnswerStore,
    step: WizardStep,
    in_flight: Option<InFlight>,
    ended: bool,
}

impl WizardController {
    pub fn new(
        host: Arc<dyn HostChrome>,
        sync: Arc<dyn ProgressSync>,
        config: WizardConfig,
    ) -> Self {
        Self {
            session_id: Uuid::new_v4(),
            host,
            sync,
            config,
            answers: AnswerStore::new(),
            step: WizardStep::default(),
            in_flight: None,
            ended: false,
        }
    }

    pub fn session_id(&self) -> Uuid {
        self.session_id
    }

    pub fn step(&self) -> WizardStep {
        self.step
    }

    pub fn answers(&self) -> &AnswerStore {
        &self.answers
    }

    /// Whether an awaited save is in flight.
    pub fn is_busy(&self) -> bool {
        self.in_flight.is_some()
    }

    pub fn is_ended(&self) -> bool {
        self.ended
    }

    /// Current projection of the primary action button.
    pub fn button(&self) -> ButtonState {
        if self.ended {
            return ButtonState::hidden();
        }
        present(
            &self.config.labels,
            self.step,
            self.answers.is_complete(self.step),
            self.is_busy(),
        )
    }

    /// Push the initial button state to the host.
    pub fn start(&self) {
        info!(session_id = %self.session_id, step = %self.step, "Onboarding wizard started");
        self.refresh_button();
    }

    /// Process one event. Never suspends; awaited saves are spawned.
    pub fn handle(&mut self, event: WizardEvent) -> Result<(), WizardError> {
        match event {
            WizardEvent::OptionSelected { group, value } => self.select_option(&group, &value),
            WizardEvent::PrimaryAction => self.primary_action().map(|_| ()),
            WizardEvent::VisibilityLost => {
                self.visibility_lost();
                Ok(())
            }
        }
    }

    /// Record an answer for the active step.
    ///
    /// Groups that are unknown or belong to another step are wiring errors:
    /// logged and returned, never shown to the user.
    pub fn select_option(&mut self, group: &str, value: &str) -> Result<(), WizardError> {
        if self.ended {
            return Err(WizardError::SessionEnded);
        }

        let result = Category::from_key(group)
            .ok_or_else(|| AnswerError::InvalidCategory {
                step: self.step,
                category: group.to_string(),
            })
            .and_then(|category| self.answers.set_answer(self.step, category, value));

        if let Err(e) = result {
            error!(session_id = %self.session_id, step = %self.step, error = %e, "Rejected option selection");
            return Err(e.into());
        }

        debug!(
            session_id = %self.session_id,
            group,
            answered = self.answers.snapshot(self.step).answered(),
            "Option selected"
        );
        self.refresh_button();
        Ok(())
    }

    /// Handle activation of the host's primary action.
    pub fn primary_action(&mut self) -> Result<ActionOutcome, WizardError> {
        if self.ended {
            return Err(WizardError::SessionEnded);
        }
        if let Some(flight) = &self.in_flight {
            debug!(
                session_id = %self.session_id,
                marker = %flight.marker,
                "Primary action ignored while save in flight"
            );
            return Ok(ActionOutcome::Rejected);
        }

        let Some(token) = self.host.identity_token() else {
            warn!(session_id = %self.session_id, "Primary action without identity token");
            self.host.show_alert(&self.config.unauthenticated_notice);
            return Err(SyncError::Unauthenticated.into());
        };

        if !self.answers.is_complete(self.step) {
            info!(
                session_id = %self.session_id,
                step = %self.step,
                missing = ?self.answers.snapshot(self.step).missing(),
                "Leaving onboarding early"
            );
            self.sync
                .save_progress_best_effort(&token, SaveMarker::OnboardingIncomplete);
            self.end_session();
            return Ok(ActionOutcome::EndedEarly);
        }

        let Some(marker) = self.step.completion_marker() else {
            return Err(WizardError::SessionEnded);
        };
        let Ok(runtime) = Handle::try_current() else {
            error!(session_id = %self.session_id, "No async runtime to run the save on");
            return Err(WizardError::RuntimeUnavailable);
        };

        if self.step == WizardStep::BuildingProfile {
            // Generation is decoupled from the step transition
            self.sync
                .request_description_generation(&token, &self.answers.snapshot(self.step));
        }

        self.begin_save(&runtime, token, marker);
        Ok(ActionOutcome::SaveStarted(marker))
    }

    /// Safety-net save when the host goes to the background mid-step.
    /// Returns whether a save was dispatched.
    pub fn visibility_lost(&mut self) -> bool {
        if self.ended
            || self.step != WizardStep::AnsweringSecrets
            || self.answers.is_complete(self.step)
        {
            return false;
        }
        let Some(token) = self.host.identity_token() else {
            warn!(session_id = %self.session_id, "Backgrounded without identity token; save skipped");
            return false;
        };
        info!(session_id = %self.session_id, "Backgrounded mid-step, saving progress");
        self.sync
            .save_progress_best_effort(&token, SaveMarker::OnboardingIncomplete);
        true
    }

    /// Wait for the in-flight awaited save, if any, and apply its outcome.
    pub async fn settle(&mut self) -> Option<SettleOutcome> {
        let flight = self.in_flight.take()?;
        let joined = flight.task.await;
        Some(self.apply_settled(flight.marker, joined))
    }

    /// Event loop. Keeps consuming events while an awaited save is in
    /// flight, so repeated activations are rejected rather than queued.
    /// Returns the final step once the session ends or the sender closes,
    /// after background sends still on the wire have finished.
    pub async fn run(mut self, mut events: mpsc::Receiver<WizardEvent>) -> WizardStep {
        self.start();

        while !self.ended {
            let next = match self.in_flight.as_mut() {
                Some(flight) => tokio::select! {
                    joined = &mut flight.task => Next::Settled(joined),
                    event = events.recv() => Next::Event(event),
                },
                None => Next::Event(events.recv().await),
            };

            match next {
                Next::Settled(joined) => {
                    if let Some(flight) = self.in_flight.take() {
                        self.apply_settled(flight.marker, joined);
                    }
                }
                Next::Event(Some(event)) => {
                    if let Err(e) = self.handle(event) {
                        debug!(session_id = %self.session_id, error = %e, "Event not applied");
                    }
                }
                Next::Event(None) => {
                    // Host went away; let a pending save finish first
                    self.settle().await;
                    break;
                }
            }
        }

        self.sync.flush().await;
        self.step
    }

    fn begin_save(&mut self, runtime: &Handle, token: IdentityToken, marker: SaveMarker) {
        info!(session_id = %self.session_id, step = %self.step, marker = %marker, "Saving progress");
        let sync = Arc::clone(&self.sync);
        let task = runtime.spawn(async move { sync.save_progress(&token, marker).await });
        self.in_flight = Some(InFlight { marker, task });
        self.refresh_button();
    }

    fn apply_settled(
        &mut self,
        marker: SaveMarker,
        joined: Result<Result<(), SyncError>, JoinError>,
    ) -> SettleOutcome {
        let result = joined
            .unwrap_or_else(|e| Err(SyncError::NetworkFailure(format!("save task failed: {e}"))));

        if let Err(e) = result {
            warn!(session_id = %self.session_id, marker = %marker, error = %e, "Save failed, staying on step");
            self.host.show_alert(&self.config.failure_notice);
            self.refresh_button();
            return SettleOutcome::Failed(e);
        }

        let next = match self.step.advance() {
            Ok(next) => next,
            Err(e) => {
                error!(session_id = %self.session_id, error = %e, "Save confirmed but cannot advance");
                self.refresh_button();
                return SettleOutcome::Stalled(e);
            }
        };
        info!(session_id = %self.session_id, step = %next, "Advanced wizard step");

        if next.is_terminal() {
            self.end_session();
        } else {
            self.refresh_button();
            if let Some(popup) = &self.config.secrets_intro {
                self.host.show_popup(popup);
            }
        }
        SettleOutcome::Advanced(next)
    }

    fn end_session(&mut self) {
        self.ended = true;
        self.refresh_button();
        self.host.end_session();
        info!(session_id = %self.session_id, step = %self.step, "Onboarding session ended");
    }

    fn refresh_button(&self) {
        self.host.set_primary_action(&self.button());
    }
}
