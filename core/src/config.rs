use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

pub const ENV_API_BASE_URL: &str = "INTERVIEW_API_BASE_URL";
pub const ENV_API_TOKEN: &str = "INTERVIEW_API_TOKEN";
pub const ENV_API_TIMEOUT_MS: &str = "INTERVIEW_API_TIMEOUT_MS";
pub const ENV_API_MAX_RETRY: &str = "INTERVIEW_API_MAX_RETRY";
pub const ENV_CONNECT_TIMEOUT_MS: &str = "INTERVIEW_CONNECT_TIMEOUT_MS";
pub const ENV_SELECTION_PATH: &str = "INTERVIEW_SELECTION_PATH";
pub const ENV_LOG_DIR: &str = "INTERVIEW_LOG_DIR";

const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);
const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(15);
const DEFAULT_MAX_RETRY: u8 = 2;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("required environment variable `{0}` is not set")]
    Missing(&'static str),
    #[error("environment variable `{key}` has invalid value `{value}`")]
    Invalid { key: &'static str, value: String },
}

/// 后端与运行环境配置，进程级共享。
#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub api_base_url: String,
    pub api_token: Option<String>,
    pub request_timeout: Duration,
    pub max_retry: u8,
    pub connect_timeout: Duration,
    pub selection_path: Option<PathBuf>,
    pub log_dir: Option<PathBuf>,
}

impl ClientConfig {
    pub fn new<S: Into<String>>(api_base_url: S) -> Self {
        Self {
            api_base_url: api_base_url.into(),
            api_token: None,
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
            max_retry: DEFAULT_MAX_RETRY,
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
            selection_path: None,
            log_dir: None,
        }
    }

    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub(crate) fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let read = |key: &'static str| {
            lookup(key)
                .map(|value| value.trim().to_string())
                .filter(|value| !value.is_empty())
        };

        let api_base_url = read(ENV_API_BASE_URL).ok_or(ConfigError::Missing(ENV_API_BASE_URL))?;
        let mut config = Self::new(api_base_url);
        config.api_token = read(ENV_API_TOKEN);

        if let Some(value) = read(ENV_API_TIMEOUT_MS) {
            config.request_timeout = Duration::from_millis(parse(ENV_API_TIMEOUT_MS, &value)?);
        }
        if let Some(value) = read(ENV_API_MAX_RETRY) {
            config.max_retry = parse(ENV_API_MAX_RETRY, &value)?;
        }
        if let Some(value) = read(ENV_CONNECT_TIMEOUT_MS) {
            config.connect_timeout =
                Duration::from_millis(parse(ENV_CONNECT_TIMEOUT_MS, &value)?);
        }
        config.selection_path = read(ENV_SELECTION_PATH).map(PathBuf::from);
        config.log_dir = read(ENV_LOG_DIR).map(PathBuf::from);

        Ok(config)
    }
}

fn parse<T: std::str::FromStr>(key: &'static str, value: &str) -> Result<T, ConfigError> {
    value.parse().map_err(|_| ConfigError::Invalid {
        key,
        value: value.to_string(),
    })
}

/// 单次面试会话的配置，在构造控制器时显式传入。
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// 分析报告所属的候选人；缺失时跳过分析请求。
    pub candidate_id: Option<String>,
    pub connect_timeout: Duration,
    pub enable_microphone: bool,
    pub event_capacity: usize,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            candidate_id: None,
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
            enable_microphone: true,
            event_capacity: 64,
        }
    }
}

impl SessionConfig {
    pub fn for_candidate<S: Into<String>>(candidate_id: S) -> Self {
        Self {
            candidate_id: Some(candidate_id.into()),
            ..Self::default()
        }
    }

    pub fn with_client(mut self, client: &ClientConfig) -> Self {
        self.connect_timeout = client.connect_timeout;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(key, value)| (key.to_string(), value.to_string()))
            .collect();
        move |key: &str| map.get(key).cloned()
    }

    #[test]
    fn base_url_is_required() {
        let err = ClientConfig::from_lookup(lookup(&[])).expect_err("missing base url");
        assert_eq!(err, ConfigError::Missing(ENV_API_BASE_URL));

        let err = ClientConfig::from_lookup(lookup(&[(ENV_API_BASE_URL, "   ")]))
            .expect_err("blank base url");
        assert_eq!(err, ConfigError::Missing(ENV_API_BASE_URL));
    }

    #[test]
    fn defaults_apply_when_optional_vars_absent() {
        let config = ClientConfig::from_lookup(lookup(&[(ENV_API_BASE_URL, "https://api")]))
            .expect("config");
        assert_eq!(config.api_base_url, "https://api");
        assert_eq!(config.request_timeout, DEFAULT_REQUEST_TIMEOUT);
        assert_eq!(config.max_retry, DEFAULT_MAX_RETRY);
        assert!(config.api_token.is_none());
        assert!(config.selection_path.is_none());
    }

    #[test]
    fn overrides_are_parsed() {
        let config = ClientConfig::from_lookup(lookup(&[
            (ENV_API_BASE_URL, "https://api"),
            (ENV_API_TOKEN, "secret"),
            (ENV_API_TIMEOUT_MS, "1500"),
            (ENV_API_MAX_RETRY, "0"),
            (ENV_CONNECT_TIMEOUT_MS, "800"),
            (ENV_SELECTION_PATH, "/tmp/selection.json"),
        ]))
        .expect("config");

        assert_eq!(config.api_token.as_deref(), Some("secret"));
        assert_eq!(config.request_timeout, Duration::from_millis(1500));
        assert_eq!(config.max_retry, 0);
        assert_eq!(config.connect_timeout, Duration::from_millis(800));
        assert_eq!(
            config.selection_path,
            Some(PathBuf::from("/tmp/selection.json"))
        );

        let session = SessionConfig::for_candidate("c-7").with_client(&config);
        assert_eq!(session.candidate_id.as_deref(), Some("c-7"));
        assert_eq!(session.connect_timeout, Duration::from_millis(800));
        assert!(session.enable_microphone);
    }

    #[test]
    fn invalid_numbers_are_rejected() {
        let err = ClientConfig::from_lookup(lookup(&[
            (ENV_API_BASE_URL, "https://api"),
            (ENV_API_MAX_RETRY, "many"),
        ]))
        .expect_err("invalid retry");
        assert_eq!(
            err,
            ConfigError::Invalid {
                key: ENV_API_MAX_RETRY,
                value: "many".into()
            }
        );
    }
}
