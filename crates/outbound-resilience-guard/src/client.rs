//! The guarded HTTP transport.

use crate::config::GuardConfig;
use crate::error::HttpError;
use crate::policy::AddressPolicy;
use crate::redirect::{check_url, parse_checked, redirect_policy};
use crate::resolver::{GuardedResolver, Lookup, SystemLookup};
use outbound_resilience_core::ConfigError;
use serde::de::DeserializeOwned;
use std::sync::Arc;

/// A `reqwest::Client` that can only reach allowed destinations.
///
/// Every connection goes through a [`GuardedResolver`], every redirect hop
/// through [`redirect_policy`], and IP-literal URLs through [`check_url`]
/// before the request is sent. Proxies are disabled: a proxy would resolve
/// the destination on our behalf and bypass the resolver.
///
/// Cheap to clone; clones share one connection pool.
#[derive(Debug, Clone)]
pub struct GuardedClient {
    client: reqwest::Client,
    policy: Arc<AddressPolicy>,
}

impl GuardedClient {
    /// Builds a client over the system resolver.
    pub fn new(config: &GuardConfig) -> Result<Self, ConfigError> {
        Self::with_lookup(config, Arc::new(SystemLookup))
    }

    /// Builds a client over a custom lookup backend.
    pub fn with_lookup(config: &GuardConfig, lookup: Arc<dyn Lookup>) -> Result<Self, ConfigError> {
        config.validate()?;
        let policy = Arc::new(config.policy());
        let resolver = GuardedResolver::with_lookup(Arc::clone(&policy), lookup);

        let mut builder = reqwest::Client::builder()
            .dns_resolver(Arc::new(resolver))
            .redirect(redirect_policy(Arc::clone(&policy), config.max_redirects))
            .no_proxy()
            .timeout(config.request_timeout)
            .user_agent(config.user_agent.as_str());
        if let Some(connect_timeout) = config.connect_timeout {
            builder = builder.connect_timeout(connect_timeout);
        }
        let client = builder
            .build()
            .map_err(|err| ConfigError::Transport(err.to_string()))?;

        #[cfg(feature = "tracing")]
        tracing::debug!(
            blocked = policy.blocked().len(),
            exempt = policy.exemptions().len(),
            max_redirects = config.max_redirects,
            "guarded http client ready"
        );

        Ok(Self { client, policy })
    }

    /// Sends a GET request and returns the response if its status is a
    /// success.
    pub async fn get(&self, url: &str) -> Result<reqwest::Response, HttpError> {
        let url = parse_checked(&self.policy, url).map_err(|err| err.record())?;
        self.send(self.client.get(url)).await
    }

    /// Sends a prepared request built with [`inner`](Self::inner).
    pub async fn execute(&self, request: reqwest::Request) -> Result<reqwest::Response, HttpError> {
        check_url(&self.policy, request.url()).map_err(|err| err.record())?;
        let response = self.client.execute(request).await?;
        ensure_success(response)
    }

    /// Sends a request builder created from [`inner`](Self::inner).
    pub async fn send(
        &self,
        request: reqwest::RequestBuilder,
    ) -> Result<reqwest::Response, HttpError> {
        let request = request.build()?;
        self.execute(request).await
    }

    /// GET and decode a JSON body.
    pub async fn get_json<T>(&self, url: &str) -> Result<T, HttpError>
    where
        T: DeserializeOwned,
    {
        let response = self.get(url).await?;
        Ok(response.json::<T>().await?)
    }

    /// GET and read the body as text.
    pub async fn get_text(&self, url: &str) -> Result<String, HttpError> {
        let response = self.get(url).await?;
        Ok(response.text().await?)
    }

    pub fn policy(&self) -> &AddressPolicy {
        &self.policy
    }

    /// The underlying client, for building requests. Requests must be sent
    /// through [`execute`](Self::execute) or [`send`](Self::send) so
    /// IP-literal URLs are checked.
    pub fn inner(&self) -> &reqwest::Client {
        &self.client
    }
}

fn ensure_success(response: reqwest::Response) -> Result<reqwest::Response, HttpError> {
    let status = response.status();
    if status.is_success() {
        Ok(response)
    } else {
        Err(HttpError::Status {
            status,
            url: response.url().to_string(),
        })
    }
}
