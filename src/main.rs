use std::sync::Arc;

use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;

use bolingo_onboard::config::{SyncConfig, WizardConfig};
use bolingo_onboard::onboarding::answers::{PROFILE_SCHEMA, SECRETS_SCHEMA};
use bolingo_onboard::onboarding::{
    ButtonState, HostChrome, HttpProgressSync, IdentityToken, Popup, WizardController,
    WizardEvent,
};

/// Terminal stand-in for the host chrome: renders to stderr.
struct TerminalHost {
    token: Option<IdentityToken>,
}

impl HostChrome for TerminalHost {
    fn identity_token(&self) -> Option<IdentityToken> {
        self.token.clone()
    }

    fn set_primary_action(&self, state: &ButtonState) {
        if !state.visible {
            eprintln!("   [button hidden]");
        } else if state.busy {
            eprintln!("   [{} …]", state.label);
        } else {
            eprintln!("   [{}]", state.label);
        }
    }

    fn show_alert(&self, text: &str) {
        eprintln!("⚠️  {}", text);
    }

    fn show_popup(&self, popup: &Popup) {
        eprintln!("💬 {}: {}", popup.title, popup.message);
    }

    fn end_session(&self) {
        eprintln!("👋 Session closed");
    }
}

fn parse_command(line: &str) -> Option<WizardEvent> {
    let mut parts = line.split_whitespace();
    match parts.next()? {
        "select" => {
            let group = parts.next()?.to_string();
            let value = parts.collect::<Vec<_>>().join(" ");
            Some(WizardEvent::OptionSelected { group, value })
        }
        "press" => Some(WizardEvent::PrimaryAction),
        "hide" => Some(WizardEvent::VisibilityLost),
        _ => None,
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_target(false)
        .init();

    let sync_config = SyncConfig::from_env();
    let token = std::env::var("BOLINGO_IDENTITY_TOKEN")
        .ok()
        .and_then(IdentityToken::new);

    let profile_keys: Vec<_> = PROFILE_SCHEMA.iter().map(|c| c.key()).collect();
    let secret_keys: Vec<_> = SECRETS_SCHEMA.iter().map(|c| c.key()).collect();

    eprintln!("💞 Bolingo onboarding v{}", env!("CARGO_PKG_VERSION"));
    eprintln!("   Backend: {}", sync_config.base_url);
    eprintln!(
        "   Identity token: {}",
        if token.is_some() { "set" } else { "missing" }
    );
    eprintln!("   Profile groups: {}", profile_keys.join(", "));
    eprintln!("   Secret groups: {}", secret_keys.join(", "));
    eprintln!("   Commands: select <group> <value> | press | hide | quit\n");

    let sync = Arc::new(HttpProgressSync::new(&sync_config)?);
    let host = Arc::new(TerminalHost { token });
    let controller = WizardController::new(host, sync, WizardConfig::default());

    let (tx, rx) = mpsc::channel(64);
    tokio::spawn(async move {
        let mut lines = BufReader::new(tokio::io::stdin()).lines();
        loop {
            match lines.next_line().await {
                Ok(Some(line)) => {
                    let line = line.trim();
                    if line.is_empty() {
                        continue;
                    }
                    if line == "quit" {
                        break;
                    }
                    match parse_command(line) {
                        Some(event) => {
                            if tx.send(event).await.is_err() {
                                break;
                            }
                        }
                        None => eprintln!("   Unknown command: {}", line),
                    }
                }
                Ok(None) => break, // EOF
                Err(e) => {
                    tracing::error!("Error reading stdin: {}", e);
                    break;
                }
            }
        }
    });

    let step = controller.run(rx).await;
    tracing::info!(step = %step, "Onboarding wizard exited");
    Ok(())
}
