pub mod config;
pub mod conversation;
pub mod error;
pub mod routes;
pub mod services;

use conversation::ConversationStore;

#[derive(Clone)]
pub struct AppState {
    pub config: config::Config,
    pub http: reqwest::Client,
    pub conversations: ConversationStore,
}

impl AppState {
    pub fn new(config: config::Config, http: reqwest::Client) -> Self {
        let conversations =
            ConversationStore::new(config.history_scope, config.history_retention)
                .with_max_sessions(config.history_max_sessions);
        Self {
            config,
            http,
            conversations,
        }
    }
}
