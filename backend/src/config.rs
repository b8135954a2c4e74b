//! Application configuration.
//!
//! Fixed values live here as constants. Deployment-specific values come from
//! the environment (a `.env` file is loaded first when present):
//!
//! | Variable | Meaning | Default |
//! |----------|---------|---------|
//! | `MEMBERREG_STORE_URL` | Base URL of the remote member store | unset |
//! | `MEMBERREG_PORT` | HTTP port for `memberreg serve` | `3000` |
//! | `MEMBERREG_FLAG_POLICY` | `omit-false` or `explicit-false` | `omit-false` |
//! | `MEMBERREG_STRICT_PHONES` | Enforce phone digits on import rows | `false` |

use std::env;
use std::time::Duration;

use crate::error::ConfigError;
use crate::mapper::FlagPolicy;
use crate::models::flag_from_text;
use crate::validation::ValidationRules;

/// Default HTTP port.
pub const DEFAULT_PORT: u16 = 3000;

/// Maximum accepted upload size (10 MB).
pub const MAX_FILE_SIZE: usize = 10 * 1024 * 1024;

/// Download name of the CSV template.
pub const TEMPLATE_FILE_NAME: &str = "members_template.csv";

/// Prefix of the full export download name, followed by an ISO date.
pub const EXPORT_FILE_PREFIX: &str = "members_database_";

/// Upper bound on one call to the remote member store.
pub const STORE_TIMEOUT: Duration = Duration::from_secs(30);

/// Minimum number of digits in a phone number.
pub const MIN_PHONE_DIGITS: usize = 7;

const STORE_URL_VAR: &str = "MEMBERREG_STORE_URL";
const PORT_VAR: &str = "MEMBERREG_PORT";
const FLAG_POLICY_VAR: &str = "MEMBERREG_FLAG_POLICY";
const STRICT_PHONES_VAR: &str = "MEMBERREG_STRICT_PHONES";

/// Runtime settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    /// Remote store base URL, without trailing slash.
    pub store_url: Option<String>,
    pub port: u16,
    pub flag_policy: FlagPolicy,
    pub rules: ValidationRules,
    pub max_file_size: usize,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            store_url: None,
            port: DEFAULT_PORT,
            flag_policy: FlagPolicy::default(),
            rules: ValidationRules::default(),
            max_file_size: MAX_FILE_SIZE,
        }
    }
}

impl Settings {
    /// Load settings from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        let _ = dotenvy::dotenv();
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Load settings through an arbitrary variable lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut settings = Settings::default();

        settings.store_url = lookup(STORE_URL_VAR)
            .map(|url| url.trim().trim_end_matches('/').to_string())
            .filter(|url| !url.is_empty());

        if let Some(port) = lookup(PORT_VAR) {
            settings.port = port.trim().parse().map_err(|_| ConfigError::InvalidValue {
                key: PORT_VAR.to_string(),
                value: port.clone(),
                expected: "a port number",
            })?;
        }

        if let Some(policy) = lookup(FLAG_POLICY_VAR) {
            settings.flag_policy =
                FlagPolicy::from_name(&policy).ok_or_else(|| ConfigError::InvalidValue {
                    key: FLAG_POLICY_VAR.to_string(),
                    value: policy.clone(),
                    expected: "'omit-false' or 'explicit-false'",
                })?;
        }

        if let Some(strict) = lookup(STRICT_PHONES_VAR) {
            settings.rules.require_phone_digits = flag_from_text(&strict);
        }

        Ok(settings)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| vars.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let settings = Settings::from_lookup(lookup(&[])).unwrap();
        assert_eq!(settings, Settings::default());
        assert_eq!(settings.port, 3000);
        assert_eq!(settings.flag_policy, FlagPolicy::OmitFalse);
        assert!(!settings.rules.require_phone_digits);
    }

    #[test]
    fn test_overrides() {
        let settings = Settings::from_lookup(lookup(&[
            ("MEMBERREG_STORE_URL", "http://store.local:8080/api/"),
            ("MEMBERREG_PORT", "8081"),
            ("MEMBERREG_FLAG_POLICY", "explicit-false"),
            ("MEMBERREG_STRICT_PHONES", "yes"),
        ]))
        .unwrap();
        assert_eq!(settings.store_url.as_deref(), Some("http://store.local:8080/api"));
        assert_eq!(settings.port, 8081);
        assert_eq!(settings.flag_policy, FlagPolicy::ExplicitFalse);
        assert!(settings.rules.require_phone_digits);
    }

    #[test]
    fn test_invalid_values() {
        let err = Settings::from_lookup(lookup(&[("MEMBERREG_PORT", "eighty")])).unwrap_err();
        assert!(err.to_string().contains("MEMBERREG_PORT"));

        let err = Settings::from_lookup(lookup(&[("MEMBERREG_FLAG_POLICY", "maybe")])).unwrap_err();
        assert!(err.to_string().contains("omit-false"));
    }

    #[test]
    fn test_blank_store_url_is_unset() {
        let settings = Settings::from_lookup(lookup(&[("MEMBERREG_STORE_URL", "  ")])).unwrap();
        assert!(settings.store_url.is_none());
    }
}
