//! End-to-end tests for the wizard controller event loop.
//!
//! Each test runs `WizardController::run` on its own task with a stub host
//! and a stub backend, feeds events through the mpsc sender, and observes
//! what the host and backend saw.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::{Notify, mpsc};
use tokio::task::JoinHandle;
use tokio::time::timeout;

use bolingo_onboard::config::WizardConfig;
use bolingo_onboard::error::SyncError;
use bolingo_onboard::onboarding::answers::{PROFILE_SCHEMA, SECRETS_SCHEMA};
use bolingo_onboard::onboarding::{
    ActionOutcome, AnswerSet, ButtonState, Category, HostChrome, IdentityToken, Popup,
    ProgressSync, SaveMarker, WizardController, WizardEvent, WizardStep,
};

/// Maximum time any test is allowed to run before we consider it hung.
const TEST_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Default)]
struct StubHost {
    token: Option<String>,
    buttons: Mutex<Vec<ButtonState>>,
    alerts: Mutex<Vec<String>>,
    popups: Mutex<Vec<Popup>>,
    ended: Mutex<u32>,
}

impl StubHost {
    fn new(token: Option<&str>) -> Arc<Self> {
        Arc::new(Self {
            token: token.map(String::from),
            ..Default::default()
        })
    }

    fn last_button(&self) -> ButtonState {
        self.buttons
            .lock()
            .unwrap()
            .last()
            .cloned()
            .expect("no button state pushed")
    }

    fn button_count(&self) -> usize {
        self.buttons.lock().unwrap().len()
    }

    fn alert_count(&self) -> usize {
        self.alerts.lock().unwrap().len()
    }

    fn ended(&self) -> u32 {
        *self.ended.lock().unwrap()
    }
}

impl HostChrome for StubHost {
    fn identity_token(&self) -> Option<IdentityToken> {
        self.token.clone().and_then(IdentityToken::new)
    }
    fn set_primary_action(&self, state: &ButtonState) {
        self.buttons.lock().unwrap().push(state.clone());
    }
    fn show_alert(&self, text: &str) {
        self.alerts.lock().unwrap().push(text.to_string());
    }
    fn show_popup(&self, popup: &Popup) {
        self.popups.lock().unwrap().push(popup.clone());
    }
    fn end_session(&self) {
        *self.ended.lock().unwrap() += 1;
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Call {
    Generate(usize),
    Save(SaveMarker),
    BestEffort(SaveMarker),
}

/// Stub backend. Awaited saves pop queued results (default `Ok`) and, when
/// a gate is set, wait for it to be released first.
#[derive(Default)]
struct StubSync {
    calls: Mutex<Vec<Call>>,
    results: Mutex<VecDeque<Result<(), SyncError>>>,
    gate: Option<Arc<Notify>>,
}

impl StubSync {
    fn gated(gate: Arc<Notify>) -> Arc<Self> {
        Arc::new(Self {
            gate: Some(gate),
            ..Default::default()
        })
    }

    fn failing(err: SyncError) -> Arc<Self> {
        let sync = Self::default();
        sync.results.lock().unwrap().push_back(Err(err));
        Arc::new(sync)
    }

    fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    fn count(&self, pred: impl Fn(&Call) -> bool) -> usize {
        self.calls.lock().unwrap().iter().filter(|&c| pred(c)).count()
    }
}

#[async_trait]
impl ProgressSync for StubSync {
    fn request_description_generation(&self, _token: &IdentityToken, answers: &AnswerSet) {
        self.calls
            .lock()
            .unwrap()
            .push(Call::Generate(answers.to_payload().len()));
    }

    async fn save_progress(
        &self,
        _token: &IdentityToken,
        marker: SaveMarker,
    ) -> Result<(), SyncError> {
        self.calls.lock().unwrap().push(Call::Save(marker));
        if let Some(gate) = &self.gate {
            gate.notified().await;
        }
        self.results.lock().unwrap().pop_front().unwrap_or(Ok(()))
    }

    fn save_progress_best_effort(&self, _token: &IdentityToken, marker: SaveMarker) {
        self.calls.lock().unwrap().push(Call::BestEffort(marker));
    }
}

/// Spawn the controller loop, return (sender, handle).
fn spawn_wizard(
    host: Arc<StubHost>,
    sync: Arc<StubSync>,
) -> (mpsc::Sender<WizardEvent>, JoinHandle<WizardStep>) {
    let (tx, rx) = mpsc::channel(32);
    let controller = WizardController::new(host, sync, WizardConfig::default());
    (tx, tokio::spawn(controller.run(rx)))
}

async fn select_all(tx: &mpsc::Sender<WizardEvent>, schema: &[Category]) {
    for (i, category) in schema.iter().enumerate() {
        tx.send(WizardEvent::OptionSelected {
            group: category.key().to_string(),
            value: format!("choice-{i}"),
        })
        .await
        .unwrap();
    }
}

async fn press(tx: &mpsc::Sender<WizardEvent>) {
    tx.send(WizardEvent::PrimaryAction).await.unwrap();
}

/// Poll until `cond` holds.
async fn wait_until(cond: impl Fn() -> bool) {
    while !cond() {
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
}

/// Reach the secrets step with a successful `builder_done` save.
async fn reach_secrets(host: &StubHost, tx: &mpsc::Sender<WizardEvent>) {
    select_all(tx, &PROFILE_SCHEMA).await;
    press(tx).await;
    wait_until(|| host.popups.lock().unwrap().len() == 1).await;
}

// ── End-to-end scenarios ─────────────────────────────────────────────

#[tokio::test]
async fn profile_saved_advances_to_secrets() {
    timeout(TEST_TIMEOUT, async {
        let host = StubHost::new(Some("init-data"));
        let sync = Arc::new(StubSync::default());
        let (tx, handle) = spawn_wizard(host.clone(), sync.clone());

        select_all(&tx, &PROFILE_SCHEMA).await;
        wait_until(|| host.button_count() == 1 + PROFILE_SCHEMA.len()).await;
        let before = host.last_button();
        assert_eq!(before.label, "Continue");

        press(&tx).await;
        wait_until(|| host.popups.lock().unwrap().len() == 1).await;

        let after = host.last_button();
        assert!(!after.busy);
        assert!(after.enabled);
        assert_ne!(after.label, before.label);
        assert_eq!(
            sync.calls(),
            vec![Call::Generate(4), Call::Save(SaveMarker::BuilderDone)]
        );
        assert_eq!(host.alert_count(), 0);

        drop(tx);
        assert_eq!(handle.await.unwrap(), WizardStep::AnsweringSecrets);
    })
    .await
    .expect("test timed out");
}

#[tokio::test]
async fn profile_save_network_failure_stays_on_profile() {
    timeout(TEST_TIMEOUT, async {
        let host = StubHost::new(Some("init-data"));
        let sync = StubSync::failing(SyncError::NetworkFailure("connection reset".into()));
        let (tx, handle) = spawn_wizard(host.clone(), sync.clone());

        select_all(&tx, &PROFILE_SCHEMA).await;
        press(&tx).await;
        wait_until(|| host.alert_count() == 1).await;

        let button = host.last_button();
        assert!(!button.busy);
        assert!(button.enabled);
        assert_eq!(button.label, "Continue");
        assert!(host.popups.lock().unwrap().is_empty());
        assert_eq!(host.ended(), 0);

        drop(tx);
        assert_eq!(handle.await.unwrap(), WizardStep::BuildingProfile);
    })
    .await
    .expect("test timed out");
}

#[tokio::test]
async fn missing_token_dispatches_nothing() {
    timeout(TEST_TIMEOUT, async {
        let host = StubHost::new(None);
        let sync = Arc::new(StubSync::default());
        let (tx, handle) = spawn_wizard(host.clone(), sync.clone());

        // Incomplete step (would be an early exit)
        press(&tx).await;
        wait_until(|| host.alert_count() == 1).await;

        // Complete step (would be an awaited save)
        select_all(&tx, &PROFILE_SCHEMA).await;
        press(&tx).await;
        wait_until(|| host.alert_count() == 2).await;

        assert!(sync.calls().is_empty());
        assert_eq!(host.ended(), 0);

        drop(tx);
        assert_eq!(handle.await.unwrap(), WizardStep::BuildingProfile);
    })
    .await
    .expect("test timed out");
}

#[tokio::test]
async fn full_completion_ends_session() {
    timeout(TEST_TIMEOUT, async {
        let host = StubHost::new(Some("init-data"));
        let sync = Arc::new(StubSync::default());
        let (tx, handle) = spawn_wizard(host.clone(), sync.clone());

        reach_secrets(&host, &tx).await;
        select_all(&tx, &SECRETS_SCHEMA).await;
        press(&tx).await;

        // The loop exits on its own once the session ends
        assert_eq!(handle.await.unwrap(), WizardStep::Done);
        assert_eq!(host.ended(), 1);
        assert!(!host.last_button().visible);
        assert_eq!(
            sync.calls(),
            vec![
                Call::Generate(4),
                Call::Save(SaveMarker::BuilderDone),
                Call::Save(SaveMarker::Completed),
            ]
        );
    })
    .await
    .expect("test timed out");
}

#[tokio::test]
async fn secrets_save_failure_stays_on_secrets() {
    timeout(TEST_TIMEOUT, async {
        let host = StubHost::new(Some("init-data"));
        let sync = Arc::new(StubSync::default());
        {
            let mut results = sync.results.lock().unwrap();
            results.push_back(Ok(()));
            results.push_back(Err(SyncError::ServerRejected {
                status: 400,
                detail: "unknown user".into(),
            }));
        }
        let (tx, handle) = spawn_wizard(host.clone(), sync.clone());

        reach_secrets(&host, &tx).await;
        select_all(&tx, &SECRETS_SCHEMA).await;
        press(&tx).await;
        wait_until(|| host.alert_count() == 1).await;

        assert_eq!(host.ended(), 0);
        assert!(!host.last_button().busy);
        assert_eq!(host.last_button().label, "Finish");

        // Manual retry succeeds
        press(&tx).await;
        assert_eq!(handle.await.unwrap(), WizardStep::Done);
        assert_eq!(sync.count(|c| *c == Call::Save(SaveMarker::Completed)), 2);
    })
    .await
    .expect("test timed out");
}

// ── Early exit ───────────────────────────────────────────────────────

#[tokio::test]
async fn incomplete_activation_exits_with_single_best_effort_save() {
    timeout(TEST_TIMEOUT, async {
        let host = StubHost::new(Some("init-data"));
        let sync = Arc::new(StubSync::default());
        let (tx, handle) = spawn_wizard(host.clone(), sync.clone());

        select_all(&tx, &PROFILE_SCHEMA[..2]).await;
        press(&tx).await;

        assert_eq!(handle.await.unwrap(), WizardStep::BuildingProfile);
        assert_eq!(
            sync.calls(),
            vec![Call::BestEffort(SaveMarker::OnboardingIncomplete)]
        );
        assert_eq!(host.ended(), 1);
        assert_eq!(host.alert_count(), 0);
    })
    .await
    .expect("test timed out");
}

#[tokio::test]
async fn incomplete_secrets_activation_exits_without_advancing() {
    timeout(TEST_TIMEOUT, async {
        let host = StubHost::new(Some("init-data"));
        let sync = Arc::new(StubSync::default());
        let (tx, handle) = spawn_wizard(host.clone(), sync.clone());

        reach_secrets(&host, &tx).await;
        select_all(&tx, &SECRETS_SCHEMA[..4]).await;
        press(&tx).await;

        assert_eq!(handle.await.unwrap(), WizardStep::AnsweringSecrets);
        assert_eq!(
            sync.count(|c| *c == Call::BestEffort(SaveMarker::OnboardingIncomplete)),
            1
        );
        assert_eq!(sync.count(|c| matches!(c, Call::Save(_))), 1);
    })
    .await
    .expect("test timed out");
}

// ── In-flight rejection ──────────────────────────────────────────────

#[tokio::test]
async fn activation_during_in_flight_save_is_rejected() {
    timeout(TEST_TIMEOUT, async {
        let gate = Arc::new(Notify::new());
        let host = StubHost::new(Some("init-data"));
        let sync = StubSync::gated(gate.clone());
        let (tx, handle) = spawn_wizard(host.clone(), sync.clone());

        select_all(&tx, &PROFILE_SCHEMA).await;
        press(&tx).await;
        wait_until(|| sync.count(|c| matches!(c, Call::Save(_))) == 1).await;
        assert!(host.last_button().busy);

        press(&tx).await;
        press(&tx).await;
        // A later selection proves the presses above were handled
        let seen = host.button_count();
        select_all(&tx, &PROFILE_SCHEMA[..1]).await;
        wait_until(|| host.button_count() == seen + 1).await;

        assert!(host.last_button().busy);
        assert!(!host.last_button().enabled);
        assert_eq!(sync.count(|c| matches!(c, Call::Save(_))), 1);
        assert_eq!(sync.count(|c| matches!(c, Call::Generate(_))), 1);

        gate.notify_one();
        wait_until(|| host.popups.lock().unwrap().len() == 1).await;
        assert!(!host.last_button().busy);

        drop(tx);
        assert_eq!(handle.await.unwrap(), WizardStep::AnsweringSecrets);
        assert_eq!(sync.count(|c| matches!(c, Call::Save(_))), 1);
    })
    .await
    .expect("test timed out");
}

#[tokio::test]
async fn direct_api_rejects_second_activation() {
    let gate = Arc::new(Notify::new());
    let host = StubHost::new(Some("init-data"));
    let sync = StubSync::gated(gate.clone());
    let mut controller = WizardController::new(host.clone(), sync.clone(), WizardConfig::default());

    for category in PROFILE_SCHEMA {
        controller.select_option(category.key(), "x").unwrap();
    }
    assert_eq!(
        controller.primary_action().unwrap(),
        ActionOutcome::SaveStarted(SaveMarker::BuilderDone)
    );
    assert_eq!(controller.primary_action().unwrap(), ActionOutcome::Rejected);
    assert!(controller.is_busy());

    gate.notify_one();
    controller.settle().await;
    assert_eq!(controller.step(), WizardStep::AnsweringSecrets);
    assert!(!controller.is_busy());
    assert_eq!(sync.count(|c| matches!(c, Call::Save(_))), 1);
}

#[tokio::test]
async fn hung_save_keeps_button_busy() {
    timeout(TEST_TIMEOUT, async {
        // The gate is never released: the transport never answers
        let host = StubHost::new(Some("init-data"));
        let sync = StubSync::gated(Arc::new(Notify::new()));
        let (tx, handle) = spawn_wizard(host.clone(), sync.clone());

        select_all(&tx, &PROFILE_SCHEMA).await;
        press(&tx).await;
        wait_until(|| sync.count(|c| matches!(c, Call::Save(_))) == 1).await;

        tokio::time::sleep(Duration::from_millis(50)).await;
        press(&tx).await;
        let seen = host.button_count();
        tx.send(WizardEvent::VisibilityLost).await.unwrap();
        select_all(&tx, &PROFILE_SCHEMA[..1]).await;
        wait_until(|| host.button_count() == seen + 1).await;

        let button = host.last_button();
        assert!(button.busy);
        assert!(!button.enabled);
        assert_eq!(sync.count(|c| matches!(c, Call::Save(_))), 1);
        assert_eq!(host.alert_count(), 0);

        handle.abort();
    })
    .await
    .expect("test timed out");
}

// ── Backgrounding ────────────────────────────────────────────────────

#[tokio::test]
async fn backgrounding_in_profile_step_saves_nothing() {
    timeout(TEST_TIMEOUT, async {
        let host = StubHost::new(Some("init-data"));
        let sync = Arc::new(StubSync::default());
        let (tx, handle) = spawn_wizard(host.clone(), sync.clone());

        select_all(&tx, &PROFILE_SCHEMA[..1]).await;
        tx.send(WizardEvent::VisibilityLost).await.unwrap();
        drop(tx);

        assert_eq!(handle.await.unwrap(), WizardStep::BuildingProfile);
        assert!(sync.calls().is_empty());
        assert_eq!(host.ended(), 0);
    })
    .await
    .expect("test timed out");
}

#[tokio::test]
async fn backgrounding_incomplete_secrets_saves_once() {
    timeout(TEST_TIMEOUT, async {
        let host = StubHost::new(Some("init-data"));
        let sync = Arc::new(StubSync::default());
        let (tx, handle) = spawn_wizard(host.clone(), sync.clone());

        reach_secrets(&host, &tx).await;
        select_all(&tx, &SECRETS_SCHEMA[..2]).await;
        tx.send(WizardEvent::VisibilityLost).await.unwrap();
        wait_until(|| sync.count(|c| matches!(c, Call::BestEffort(_))) == 1).await;

        // Complete now: another backgrounding is a no-op
        select_all(&tx, &SECRETS_SCHEMA).await;
        tx.send(WizardEvent::VisibilityLost).await.unwrap();
        drop(tx);

        assert_eq!(handle.await.unwrap(), WizardStep::AnsweringSecrets);
        assert_eq!(
            sync.count(|c| *c == Call::BestEffort(SaveMarker::OnboardingIncomplete)),
            1
        );
        // Backgrounding never ends the session
        assert_eq!(host.ended(), 0);
    })
    .await
    .expect("test timed out");
}

#[tokio::test]
async fn foreign_group_is_ignored_by_the_loop() {
    timeout(TEST_TIMEOUT, async {
        let host = StubHost::new(Some("init-data"));
        let sync = Arc::new(StubSync::default());
        let (tx, handle) = spawn_wizard(host.clone(), sync.clone());

        select_all(&tx, &SECRETS_SCHEMA).await;
        tx.send(WizardEvent::OptionSelected {
            group: "horoscope".into(),
            value: "leo".into(),
        })
        .await
        .unwrap();
        drop(tx);

        assert_eq!(handle.await.unwrap(), WizardStep::BuildingProfile);
        // Only the initial button render; nothing was recorded
        assert_eq!(host.button_count(), 1);
        assert_eq!(host.alert_count(), 0);
        assert!(sync.calls().is_empty());
    })
    .await
    .expect("test timed out");
}
