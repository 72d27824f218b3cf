//! Conversation history: role-tagged turns kept in insertion order.
//!
//! `ConversationLog` is the plain append-only sequence. `ConversationStore`
//! owns one log per scope key and is what request handlers hold via
//! `AppState`; with `HistoryScope::Shared` every request lands on the same key.

use dashmap::DashMap;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use crate::config::HistoryScope;

/// Key used for the process-wide log, and for session requests without an id.
pub const SHARED_SCOPE_KEY: &str = "shared";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::System => "system",
            Role::User => "user",
            Role::Assistant => "assistant",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Turn {
    pub role: Role,
    pub content: String,
}

impl Turn {
    pub fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
        }
    }

    pub fn system(content: impl Into<String>) -> Self {
        Self::new(Role::System, content)
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self::new(Role::User, content)
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self::new(Role::Assistant, content)
    }
}

#[derive(Debug, Default)]
pub struct ConversationLog {
    turns: VecDeque<Turn>,
    /// 0 = unbounded.
    retention: usize,
}

impl ConversationLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// A log that drops its oldest turns once it holds more than `retention`.
    pub fn with_retention(retention: usize) -> Self {
        Self {
            turns: VecDeque::new(),
            retention,
        }
    }

    pub fn append(&mut self, turn: Turn) {
        self.turns.push_back(turn);
        if self.retention > 0 {
            while self.turns.len() > self.retention {
                self.turns.pop_front();
            }
        }
    }

    /// The last `n` turns in their original order, or all of them if fewer.
    pub fn window(&self, n: usize) -> Vec<Turn> {
        let skip = self.turns.len().saturating_sub(n);
        self.turns.iter().skip(skip).cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.turns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }

    pub fn turns(&self) -> impl Iterator<Item = &Turn> {
        self.turns.iter()
    }
}

/// Conversation logs keyed by scope, created empty on first use.
///
/// The shared log lives for the life of the process. Session logs are capped
/// at `max_sessions`; opening one more evicts the least recently used session.
#[derive(Clone)]
pub struct ConversationStore {
    scope: HistoryScope,
    retention: usize,
    /// 0 = unbounded.
    max_sessions: usize,
    clock: Arc<AtomicU64>,
    logs: Arc<DashMap<String, LogSlot>>,
}

#[derive(Clone)]
struct LogSlot {
    log: Arc<Mutex<ConversationLog>>,
    last_used: Arc<AtomicU64>,
}

impl ConversationStore {
    pub fn new(scope: HistoryScope, retention: usize) -> Self {
        Self {
            scope,
            retention,
            max_sessions: 0,
            clock: Arc::new(AtomicU64::new(0)),
            logs: Arc::new(DashMap::new()),
        }
    }

    pub fn with_max_sessions(mut self, max_sessions: usize) -> Self {
        self.max_sessions = max_sessions;
        self
    }

    pub fn scope(&self) -> HistoryScope {
        self.scope
    }

    /// Resolve the log key for a request carrying an optional session id.
    pub fn scope_key(&self, session_id: Option<&str>) -> String {
        match (self.scope, session_id.map(str::trim)) {
            (HistoryScope::Session, Some(id)) if !id.is_empty() => id.to_string(),
            _ => SHARED_SCOPE_KEY.to_string(),
        }
    }

    /// Number of session logs currently held, not counting the shared one.
    pub fn session_count(&self) -> usize {
        self.logs
            .iter()
            .filter(|entry| entry.key() != SHARED_SCOPE_KEY)
            .count()
    }

    fn log(&self, key: &str) -> Arc<Mutex<ConversationLog>> {
        let tick = self.clock.fetch_add(1, Ordering::Relaxed);

        // Map guards are dropped before the log itself is locked.
        if let Some(slot) = self.logs.get(key) {
            slot.last_used.store(tick, Ordering::Relaxed);
            return slot.log.clone();
        }

        if key != SHARED_SCOPE_KEY && self.max_sessions > 0 {
            while self.session_count() >= self.max_sessions {
                if !self.evict_least_recent() {
                    break;
                }
            }
        }

        self.logs
            .entry(key.to_string())
            .or_insert_with(|| LogSlot {
                log: Arc::new(Mutex::new(ConversationLog::with_retention(self.retention))),
                last_used: Arc::new(AtomicU64::new(tick)),
            })
            .log
            .clone()
    }

    fn evict_least_recent(&self) -> bool {
        let oldest = self
            .logs
            .iter()
            .filter(|entry| entry.key() != SHARED_SCOPE_KEY)
            .min_by_key(|entry| entry.value().last_used.load(Ordering::Relaxed))
            .map(|entry| entry.key().clone());

        match oldest {
            Some(key) => {
                tracing::debug!("Evicting idle conversation {}", key);
                self.logs.remove(&key).is_some()
            }
            None => false,
        }
    }

    pub fn append(&self, key: &str, turn: Turn) {
        self.log(key).lock().append(turn);
    }

    /// Append `turn` and read the window under one lock, so the returned turns
    /// always end with the turn just added (a window of 0 is read as 1).
    pub fn append_and_window(&self, key: &str, turn: Turn, n: usize) -> Vec<Turn> {
        let log = self.log(key);
        let mut guard = log.lock();
        guard.append(turn);
        guard.window(n.max(1))
    }

    pub fn window(&self, key: &str, n: usize) -> Vec<Turn> {
        match self.logs.get(key) {
            Some(slot) => slot.log.lock().window(n),
            None => Vec::new(),
        }
    }

    pub fn len(&self, key: &str) -> usize {
        self.logs
            .get(key)
            .map(|slot| slot.log.lock().len())
            .unwrap_or(0)
    }
}
