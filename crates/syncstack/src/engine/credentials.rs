//! Credential embedding for authenticated clone URLs.
//!
//! Hosts differ in what they expect in the basic-auth slot of an HTTPS URL.
//! GitHub accepts the token as the username; GitLab wants a recognizable
//! principal (`oauth2`) with the token as the password. The policy maps a
//! host identity to the formatter that builds the URL userinfo.

use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use url::Url;

/// Builds the `(username, password)` userinfo for a credential.
pub trait CredentialFormatter: Send + Sync {
    fn userinfo(&self, token: &str) -> (String, Option<String>);
}

/// Embeds the token alone as the username.
#[derive(Debug, Clone, Copy, Default)]
pub struct TokenOnly;

impl CredentialFormatter for TokenOnly {
    fn userinfo(&self, token: &str) -> (String, Option<String>) {
        (token.to_string(), None)
    }
}

/// Embeds `principal:token`.
#[derive(Debug, Clone)]
pub struct PrincipalAndToken {
    principal: String,
}

impl PrincipalAndToken {
    pub fn new(principal: impl Into<String>) -> Self {
        Self {
            principal: principal.into(),
        }
    }
}

impl CredentialFormatter for PrincipalAndToken {
    fn userinfo(&self, token: &str) -> (String, Option<String>) {
        (self.principal.clone(), Some(token.to_string()))
    }
}

/// Identifies the hosts a formatter applies to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HostMatcher {
    /// The host itself or any subdomain of it.
    Domain(String),
    /// Any host with this DNS label, e.g. `gitlab` matches
    /// `gitlab.com` and `gitlab.example.org`.
    Family(String),
}

impl HostMatcher {
    pub fn matches(&self, host: &str) -> bool {
        let host = host.to_ascii_lowercase();
        match self {
            HostMatcher::Domain(domain) => {
                let domain = domain.to_ascii_lowercase();
                host == domain || host.ends_with(&format!(".{}", domain))
            }
            HostMatcher::Family(label) => {
                let label = label.to_ascii_lowercase();
                host.split('.').any(|part| part == label)
            }
        }
    }
}

/// Configured credential rule: hosts matching `host` get `username:token`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CredentialHostRule {
    pub host: String,
    pub username: String,
}

/// Ordered host rules; the first match wins, unmatched hosts use [`TokenOnly`].
pub struct CredentialPolicy {
    rules: Vec<(HostMatcher, Box<dyn CredentialFormatter>)>,
}

impl CredentialPolicy {
    /// Policy without any host rules.
    pub fn token_only() -> Self {
        Self { rules: Vec::new() }
    }

    /// Configured rules first, then the built-in GitLab family rule.
    pub fn from_rules(rules: &[CredentialHostRule]) -> Self {
        let mut policy = Self::token_only();
        for rule in rules {
            policy = policy.with_rule(
                HostMatcher::Domain(rule.host.clone()),
                PrincipalAndToken::new(rule.username.clone()),
            );
        }
        policy.with_rule(
            HostMatcher::Family("gitlab".to_string()),
            PrincipalAndToken::new("oauth2"),
        )
    }

    /// Appends a rule with lower precedence than the existing ones.
    pub fn with_rule(
        mut self,
        matcher: HostMatcher,
        formatter: impl CredentialFormatter + 'static,
    ) -> Self {
        self.rules.push((matcher, Box::new(formatter)));
        self
    }

    fn formatter_for(&self, host: &str) -> &dyn CredentialFormatter {
        self.rules
            .iter()
            .find(|(matcher, _)| matcher.matches(host))
            .map(|(_, formatter)| formatter.as_ref())
            .unwrap_or(&TokenOnly)
    }

    /// Embeds `credential` into an HTTP(S) remote URL.
    ///
    /// Non-HTTP remotes (local paths, `file:`, SSH) and empty credentials
    /// are returned unchanged. A credential that already has the
    /// `user:token` shape is embedded verbatim.
    pub fn authenticated_url(&self, remote_url: &str, credential: &SecretString) -> String {
        let token = credential.expose_secret();
        if token.is_empty() {
            return remote_url.to_string();
        }

        let Ok(mut url) = Url::parse(remote_url) else {
            return remote_url.to_string();
        };
        if !matches!(url.scheme(), "http" | "https") {
            return remote_url.to_string();
        }
        let Some(host) = url.host_str().map(str::to_string) else {
            return remote_url.to_string();
        };

        let (username, password) = match token.split_once(':') {
            Some((user, secret)) => (user.to_string(), Some(secret.to_string())),
            None => self.formatter_for(&host).userinfo(token),
        };

        if url.set_username(&username).is_err() || url.set_password(password.as_deref()).is_err() {
            return remote_url.to_string();
        }

        url.to_string()
    }
}

impl Default for CredentialPolicy {
    fn default() -> Self {
        Self::from_rules(&[])
    }
}
