use crate::credential::CREDENTIAL_CAPACITY;

/// What to do with the account check and credential refresh results after a
/// successful `pam_authenticate`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PostAuthPolicy {
    /// Run both steps, log failures, keep the authentication status.
    #[default]
    Ignore,
    /// Use the first failing step's status as the final status.
    Enforce,
}

impl PostAuthPolicy {
    fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "ignore" => Some(Self::Ignore),
            "enforce" => Some(Self::Enforce),
            _ => None,
        }
    }
}

/// Helper configuration, loaded from environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    /// Handling of `pam_acct_mgmt` / `pam_setcred` failures.
    pub post_auth_policy: PostAuthPolicy,
    /// Whether to write an audit line to syslog (LOG_AUTHPRIV).
    pub syslog_enabled: bool,
    /// Credential buffer size. Not environment-controlled: the caller is
    /// unprivileged.
    pub credential_capacity: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            post_auth_policy: PostAuthPolicy::Ignore,
            syslog_enabled: true,
            credential_capacity: CREDENTIAL_CAPACITY,
        }
    }
}

impl Config {
    /// Load configuration from `PAM_HELPER_*` environment variables with defaults.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();

        let post_auth_policy = match lookup("PAM_HELPER_POST_AUTH_POLICY") {
            Some(v) => PostAuthPolicy::parse(&v).unwrap_or_else(|| {
                tracing::warn!(value = %v, "unknown PAM_HELPER_POST_AUTH_POLICY, using ignore");
                PostAuthPolicy::Ignore
            }),
            None => defaults.post_auth_policy,
        };

        Self {
            post_auth_policy,
            syslog_enabled: lookup("PAM_HELPER_SYSLOG")
                .map(|v| v != "0")
                .unwrap_or(defaults.syslog_enabled),
            credential_capacity: defaults.credential_capacity,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config(vars: &[(&str, &str)]) -> Config {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|key| map.get(key).cloned())
    }

    #[test]
    fn defaults_ignore_post_auth_failures() {
        let cfg = config(&[]);
        assert_eq!(cfg.post_auth_policy, PostAuthPolicy::Ignore);
        assert!(cfg.syslog_enabled);
        assert_eq!(cfg.credential_capacity, CREDENTIAL_CAPACITY);
    }

    #[test]
    fn enforce_policy_is_case_insensitive() {
        let cfg = config(&[("PAM_HELPER_POST_AUTH_POLICY", " Enforce ")]);
        assert_eq!(cfg.post_auth_policy, PostAuthPolicy::Enforce);
    }

    #[test]
    fn unknown_policy_falls_back_to_ignore() {
        let cfg = config(&[("PAM_HELPER_POST_AUTH_POLICY", "strict")]);
        assert_eq!(cfg.post_auth_policy, PostAuthPolicy::Ignore);
    }

    #[test]
    fn syslog_can_be_disabled() {
        assert!(!config(&[("PAM_HELPER_SYSLOG", "0")]).syslog_enabled);
        assert!(config(&[("PAM_HELPER_SYSLOG", "1")]).syslog_enabled);
    }
}
