//! Server application state shared across handlers

use std::sync::Arc;

use crate::config::Settings;
use crate::llm::{AnthropicClient, TextGenerator};
use crate::notify::{EmailSender, NotificationSender, SlackSender};
use crate::realtime::ConnectionRegistry;
use crate::shutdown::ShutdownState;
use crate::store::{DataStore, MemoryStore, SupabaseStore};

/// Shared state for the server: the connection registry plus the narrow
/// collaborator clients every handler works through.
#[derive(Clone)]
pub struct AppState {
    pub settings: Arc<Settings>,

    /// Live WebSocket connections and fan-out
    pub registry: Arc<ConnectionRegistry>,

    /// Persistence collaborator
    pub store: Arc<dyn DataStore>,

    /// LLM collaborator shared by all agents
    pub llm: Arc<dyn TextGenerator>,

    /// Email delivery collaborator
    pub email: Arc<dyn NotificationSender>,

    /// Slack delivery collaborator
    pub slack: Arc<dyn NotificationSender>,

    /// Shutdown state
    pub shutdown: ShutdownState,
}

impl AppState {
    /// Build the state from settings, wiring real collaborators where
    /// credentials exist and soft-failing stand-ins where they do not.
    pub fn new(settings: Settings) -> Self {
        let store: Arc<dyn DataStore> = match (&settings.supabase_url, &settings.supabase_key) {
            (Some(url), Some(key)) => Arc::new(SupabaseStore::new(url, key)),
            _ => {
                log::warn!("Supabase not configured; using the in-memory store");
                Arc::new(MemoryStore::new())
            }
        };

        let llm: Arc<dyn TextGenerator> = Arc::new(AnthropicClient::new(&settings));
        let email: Arc<dyn NotificationSender> = Arc::new(EmailSender::new(
            settings.sendgrid_api_key.clone(),
            settings.from_email.clone(),
        ));
        let slack: Arc<dyn NotificationSender> =
            Arc::new(SlackSender::new(settings.slack_webhook_url.clone()));

        Self {
            settings: Arc::new(settings),
            registry: Arc::new(ConnectionRegistry::new()),
            store,
            llm,
            email,
            slack,
            shutdown: ShutdownState::new(),
        }
    }
}
