// ABOUTME: Configuration options for the harbor client and the fluent ClientBuilder.
// ABOUTME: Covers timeouts, user agent, private-network policy, and registry/http overrides.

use std::collections::HashMap;
use std::time::Duration;

use crate::client::Client;
use crate::fetch::BROWSER_USER_AGENT;
use crate::sources::SourceRegistry;

/// Configuration options for the harbor client.
#[derive(Debug, Clone)]
pub struct Options {
    /// Timeout for static HTTP fetches.
    pub timeout: Duration,
    /// Navigation deadline for browser captures (settle delays are on top).
    pub nav_timeout: Duration,
    pub user_agent: String,
    pub allow_private_networks: bool,
    pub headers: HashMap<String, String>,
    pub http_client: Option<reqwest::Client>,
    pub registry: Option<SourceRegistry>,
}

impl Default for Options {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(20),
            nav_timeout: Duration::from_secs(60),
            user_agent: BROWSER_USER_AGENT.to_string(),
            allow_private_networks: false,
            headers: HashMap::new(),
            http_client: None,
            registry: None,
        }
    }
}

/// Builder for constructing Client instances with custom configuration.
#[derive(Debug, Clone, Default)]
pub struct ClientBuilder {
    opts: Options,
}

impl ClientBuilder {
    /// Create a new ClientBuilder with default options.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the static-fetch timeout.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.opts.timeout = timeout;
        self
    }

    /// Set the browser navigation deadline.
    pub fn nav_timeout(mut self, timeout: Duration) -> Self {
        self.opts.nav_timeout = timeout;
        self
    }

    /// Set the User-Agent presented to upstreams.
    pub fn user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.opts.user_agent = user_agent.into();
        self
    }

    /// Allow or disallow requests to private networks.
    pub fn allow_private_networks(mut self, allow: bool) -> Self {
        self.opts.allow_private_networks = allow;
        self
    }

    /// Add a custom header to all static requests.
    pub fn header(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.opts.headers.insert(key.into(), value.into());
        self
    }

    /// Use a custom HTTP client.
    pub fn http_client(mut self, client: reqwest::Client) -> Self {
        self.opts.http_client = Some(client);
        self
    }

    /// Use a custom source registry instead of the builtin six terminals.
    pub fn registry(mut self, registry: SourceRegistry) -> Self {
        self.opts.registry = Some(registry);
        self
    }

    /// Build the Client with the configured options.
    pub fn build(self) -> Client {
        Client::new(self.opts)
    }
}
