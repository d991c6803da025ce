// src/config/env.rs
// Environment-based configuration - single source of truth for all env vars

use std::cell::RefCell;
use std::str::FromStr;
use std::time::Duration;
use tracing::Level;

use crate::error::{Result, WafaqError};
use crate::resolver::FallbackPolicy;

pub const DEFAULT_HOST: &str = "0.0.0.0";
pub const DEFAULT_PORT: u16 = 8080;
pub const DEFAULT_MAX_INTENTS: usize = 5;
pub const DEFAULT_IAM_URL: &str = "https://iam.cloud.ibm.com/identity/token";
pub const DEFAULT_API_VERSION: &str = "2021-11-27";
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Everything the assistant client needs to talk to the remote service
#[derive(Debug, Clone)]
pub struct AssistantSettings {
    pub api_key: String,
    pub service_url: String,
    pub assistant_id: String,
    pub iam_url: String,
    pub api_version: String,
    pub timeout: Duration,
}

/// Problems found in the loaded configuration.
///
/// Errors stop `serve`; warnings are logged and start-up continues.
#[derive(Debug, Default)]
pub struct ConfigValidation {
    pub warnings: Vec<String>,
    pub errors: Vec<String>,
}

impl ConfigValidation {
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    fn error(&mut self, msg: impl Into<String>) {
        self.errors.push(msg.into());
    }

    fn warning(&mut self, msg: impl Into<String>) {
        self.warnings.push(msg.into());
    }

    /// One line per problem, errors first
    pub fn report(&self) -> String {
        if self.errors.is_empty() && self.warnings.is_empty() {
            return "Configuration OK".to_string();
        }
        self.errors
            .iter()
            .map(|e| format!("error: {e}"))
            .chain(self.warnings.iter().map(|w| format!("warning: {w}")))
            .collect::<Vec<_>>()
            .join("\n")
    }
}

/// Environment configuration - all env vars in one place
#[derive(Debug, Clone)]
pub struct EnvConfig {
    /// Bind address (HOST)
    pub host: String,
    /// Bind port (PORT)
    pub port: u16,
    /// IAM API key (API_KEY)
    pub api_key: Option<String>,
    /// Assistant service URL (WA_URL)
    pub wa_url: Option<String>,
    /// Assistant id (ASSISTANT_ID)
    pub assistant_id: Option<String>,
    /// Result window for /query (MAX_INTENTS)
    pub max_intents: usize,
    /// Token endpoint (IAM_URL)
    pub iam_url: String,
    /// API version date sent as `?version=` (WA_VERSION)
    pub api_version: String,
    /// Per remote call timeout (WA_TIMEOUT_SECS)
    pub timeout: Duration,
    /// How fallback intents interact with the window (FALLBACK_COUNTS_TOWARD_LIMIT)
    pub fallback_policy: FallbackPolicy,
    /// Register GET /kill (ENABLE_KILL_ENDPOINT)
    pub enable_kill_endpoint: bool,
    /// Max tracing level (WAFAQ_LOG_LEVEL)
    pub log_level: Level,
    /// Values that were set but could not be parsed (defaults used instead)
    pub parse_warnings: Vec<String>,
}

impl EnvConfig {
    /// Load all environment configuration (call once at startup)
    pub fn load() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build the configuration from an arbitrary key lookup
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let problems = RefCell::new(Vec::new());
        let read = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let read = Reader {
            read: &read,
            problems: &problems,
        };

        let counts_fallback = parse_or(&read, "FALLBACK_COUNTS_TOWARD_LIMIT", true, parse_bool);
        let fallback_policy = if counts_fallback {
            FallbackPolicy::CountInWindow
        } else {
            FallbackPolicy::CountMatchesOnly
        };

        Self {
            host: read.get("HOST").unwrap_or_else(|| DEFAULT_HOST.to_string()),
            port: parse_or(&read, "PORT", DEFAULT_PORT, |v| v.parse().ok()),
            api_key: read.get("API_KEY"),
            wa_url: read.get("WA_URL").map(|u| u.trim_end_matches('/').to_string()),
            assistant_id: read.get("ASSISTANT_ID"),
            max_intents: parse_or(&read, "MAX_INTENTS", DEFAULT_MAX_INTENTS, |v| v.parse().ok()),
            iam_url: read.get("IAM_URL").unwrap_or_else(|| DEFAULT_IAM_URL.to_string()),
            api_version: read.get("WA_VERSION").unwrap_or_else(|| DEFAULT_API_VERSION.to_string()),
            timeout: Duration::from_secs(parse_or(
                &read,
                "WA_TIMEOUT_SECS",
                DEFAULT_TIMEOUT_SECS,
                |v| v.parse().ok(),
            )),
            fallback_policy,
            enable_kill_endpoint: parse_or(&read, "ENABLE_KILL_ENDPOINT", false, parse_bool),
            log_level: parse_or(&read, "WAFAQ_LOG_LEVEL", Level::INFO, |v| {
                Level::from_str(v).ok()
            }),
            parse_warnings: problems.into_inner(),
        }
    }

    /// Settings for the assistant client; fails when a required value is missing
    pub fn assistant_settings(&self) -> Result<AssistantSettings> {
        let require = |value: &Option<String>, name: &str| {
            value
                .clone()
                .ok_or_else(|| WafaqError::Config(format!("{name} is not set")))
        };

        Ok(AssistantSettings {
            api_key: require(&self.api_key, "API_KEY")?,
            service_url: require(&self.wa_url, "WA_URL")?,
            assistant_id: require(&self.assistant_id, "ASSISTANT_ID")?,
            iam_url: self.iam_url.clone(),
            api_version: self.api_version.clone(),
            timeout: self.timeout,
        })
    }

    /// Validate the configuration
    pub fn validate(&self) -> ConfigValidation {
        let mut validation = ConfigValidation::default();

        if self.api_key.is_none() {
            validation.error("API_KEY is not set.");
        }
        match &self.wa_url {
            None => validation.error("WA_URL is not set."),
            Some(url) if !url.starts_with("http://") && !url.starts_with("https://") => {
                validation.error(format!("WA_URL '{}' is not an http(s) URL.", url));
            }
            Some(_) => {}
        }
        if self.assistant_id.is_none() {
            validation.error("ASSISTANT_ID is not set.");
        }

        for warning in &self.parse_warnings {
            validation.warning(warning.clone());
        }
        if self.max_intents == 0 {
            validation.warning("MAX_INTENTS is 0; /query will always return an empty list.");
        }
        if self.timeout.is_zero() {
            validation.warning("WA_TIMEOUT_SECS is 0; every assistant call will time out.");
        }
        if self.enable_kill_endpoint {
            validation.warning("ENABLE_KILL_ENDPOINT is on; anyone can stop the server.");
        }

        validation
    }

    /// One-line description for the startup log, without secrets
    pub fn summary(&self) -> String {
        format!(
            "url={} assistant={} max_intents={} fallback_policy={:?} timeout={}s",
            self.wa_url.as_deref().unwrap_or("<unset>"),
            self.assistant_id.as_deref().unwrap_or("<unset>"),
            self.max_intents,
            self.fallback_policy,
            self.timeout.as_secs()
        )
    }
}

/// Env lookup that remembers which values failed to parse
struct Reader<'a> {
    read: &'a dyn Fn(&str) -> Option<String>,
    problems: &'a RefCell<Vec<String>>,
}

impl Reader<'_> {
    fn get(&self, key: &str) -> Option<String> {
        (self.read)(key)
    }
}

fn parse_or<T, P>(read: &Reader<'_>, key: &str, default: T, parse: P) -> T
where
    P: Fn(&str) -> Option<T>,
{
    match read.get(key) {
        Some(raw) => match parse(raw.trim()) {
            Some(value) => value,
            None => {
                read.problems
                    .borrow_mut()
                    .push(format!("{key}='{raw}' could not be parsed, using the default."));
                default
            }
        },
        None => default,
    }
}

fn parse_bool(value: &str) -> Option<bool> {
    match value.to_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}
