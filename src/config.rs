use std::env;
use std::path::PathBuf;

/// How conversation history is partitioned between callers.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum HistoryScope {
    /// One process-wide log shared by every request.
    Shared,
    /// One log per `X-Session-Id` header value.
    Session,
}

impl HistoryScope {
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "shared" | "global" => Some(Self::Shared),
            "session" => Some(Self::Session),
            _ => None,
        }
    }
}

#[derive(Clone, Debug)]
pub struct Config {
    pub port: u16,
    pub openai_api_key: String,
    pub openai_base_url: String,
    pub chat_model: String,
    pub elevenlabs_api_key: String,
    pub elevenlabs_base_url: String,
    /// Directory holding the synthesized audio, served under `/static`.
    pub static_dir: PathBuf,
    /// Absolute base for audio URLs. Empty means derive it from the request.
    pub public_url: String,
    pub history_scope: HistoryScope,
    pub history_window: usize,
    /// Max turns kept per log; 0 keeps everything.
    pub history_retention: usize,
    /// Max session logs held in `session` scope; 0 keeps everything.
    pub history_max_sessions: usize,
    pub cors_origin: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            port: 5000,
            openai_api_key: String::new(),
            openai_base_url: "https://api.openai.com/v1".into(),
            chat_model: "gpt-3.5-turbo".into(),
            elevenlabs_api_key: String::new(),
            elevenlabs_base_url: "https://api.elevenlabs.io/v1".into(),
            static_dir: PathBuf::from("static"),
            public_url: String::new(),
            history_scope: HistoryScope::Shared,
            history_window: 10,
            history_retention: 0,
            history_max_sessions: 1000,
            cors_origin: "*".into(),
        }
    }
}

impl Config {
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            port: env::var("PORT")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.port),
            openai_api_key: env::var("OPENAI_API_KEY").unwrap_or_default(),
            openai_base_url: non_empty_var("OPENAI_BASE_URL")
                .unwrap_or(defaults.openai_base_url),
            chat_model: non_empty_var("CHAT_MODEL").unwrap_or(defaults.chat_model),
            elevenlabs_api_key: env::var("ELEVENLABS_API_KEY").unwrap_or_default(),
            elevenlabs_base_url: non_empty_var("ELEVENLABS_BASE_URL")
                .unwrap_or(defaults.elevenlabs_base_url),
            static_dir: non_empty_var("STATIC_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.static_dir),
            public_url: env::var("PUBLIC_URL").unwrap_or_default(),
            history_scope: env::var("HISTORY_SCOPE")
                .ok()
                .and_then(|v| HistoryScope::parse(&v))
                .unwrap_or(defaults.history_scope),
            history_window: parse_window(env::var("HISTORY_WINDOW").ok().as_deref())
                .unwrap_or(defaults.history_window),
            history_retention: env::var("HISTORY_RETENTION")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.history_retention),
            history_max_sessions: env::var("HISTORY_MAX_SESSIONS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.history_max_sessions),
            cors_origin: non_empty_var("CORS_ORIGIN").unwrap_or(defaults.cors_origin),
        }
    }

    pub fn cors_origins(&self) -> Vec<String> {
        self.cors_origin
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect()
    }

    /// Warn about keys the relay needs but did not get. Neither is fatal.
    pub fn log_missing_keys(&self) {
        if self.openai_api_key.is_empty() {
            tracing::warn!("OPENAI_API_KEY is not set; /gpt-tts will fail to generate replies");
        }
        if self.elevenlabs_api_key.is_empty() {
            tracing::warn!("ELEVENLABS_API_KEY is not set; replies will carry no audio");
        }
    }
}

/// A window must hold at least the caller's own turn; 0 is rejected.
fn parse_window(value: Option<&str>) -> Option<usize> {
    value
        .and_then(|v| v.trim().parse::<usize>().ok())
        .filter(|&n| n > 0)
}

fn non_empty_var(key: &str) -> Option<String> {
    env::var(key).ok().filter(|v| !v.trim().is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_history_scope_parsing() {
        assert_eq!(HistoryScope::parse("shared"), Some(HistoryScope::Shared));
        assert_eq!(HistoryScope::parse(" Session "), Some(HistoryScope::Session));
        assert_eq!(HistoryScope::parse("global"), Some(HistoryScope::Shared));
        assert_eq!(HistoryScope::parse("per-user"), None);
    }

    #[test]
    fn test_defaults_match_original_deployment() {
        let config = Config::default();
        assert_eq!(config.port, 5000);
        assert_eq!(config.history_window, 10);
        assert_eq!(config.history_retention, 0);
        assert_eq!(config.history_scope, HistoryScope::Shared);
        assert_eq!(config.chat_model, "gpt-3.5-turbo");
    }

    #[test]
    fn test_zero_window_falls_back() {
        assert_eq!(parse_window(Some("0")), None);
        assert_eq!(parse_window(Some(" 4 ")), Some(4));
        assert_eq!(parse_window(Some("-1")), None);
        assert_eq!(parse_window(None), None);
    }

    #[test]
    fn test_cors_origins_skip_blanks() {
        let config = Config {
            cors_origin: "http://localhost:3000, ,https://ava.example.mx".into(),
            ..Config::default()
        };
        assert_eq!(
            config.cors_origins(),
            vec!["http://localhost:3000", "https://ava.example.mx"]
        );
    }
}
