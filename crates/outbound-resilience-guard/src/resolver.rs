//! Connect-time DNS hook.
//!
//! reqwest asks its resolver for addresses right before opening a
//! connection and dials exactly what the resolver returns. Checking the
//! answer here leaves no gap between validation and use: a name that
//! resolves to a public address during a pre-check and to a private one at
//! connect time (DNS rebinding) is still caught.

use crate::error::GuardError;
use crate::policy::AddressPolicy;
use futures::future::BoxFuture;
use outbound_resilience_core::GuardReason;
use reqwest::dns::{Addrs, Name, Resolve, Resolving};
use std::collections::HashMap;
use std::io;
use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;

/// Name resolution backend for [`GuardedResolver`].
pub trait Lookup: Send + Sync + 'static {
    /// Resolves `host` to its addresses.
    fn lookup(&self, host: &str) -> BoxFuture<'static, io::Result<Vec<IpAddr>>>;
}

/// The operating system resolver, through tokio.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemLookup;

impl Lookup for SystemLookup {
    fn lookup(&self, host: &str) -> BoxFuture<'static, io::Result<Vec<IpAddr>>> {
        let host = host.to_owned();
        Box::pin(async move {
            let addrs = tokio::net::lookup_host((host.as_str(), 0)).await?;
            Ok::<_, io::Error>(addrs.map(|addr| addr.ip()).collect::<Vec<_>>())
        })
    }
}

/// Fixed host table, for tests and pinned deployments.
#[derive(Debug, Clone, Default)]
pub struct StaticLookup {
    hosts: HashMap<String, Vec<IpAddr>>,
}

impl StaticLookup {
    pub fn new() -> Self {
        Self::default()
    }

    /// Maps `host` to `addrs`. An empty list resolves successfully to nothing.
    pub fn with_host(
        mut self,
        host: impl Into<String>,
        addrs: impl IntoIterator<Item = IpAddr>,
    ) -> Self {
        self.hosts
            .insert(host.into().to_ascii_lowercase(), addrs.into_iter().collect());
        self
    }
}

impl Lookup for StaticLookup {
    fn lookup(&self, host: &str) -> BoxFuture<'static, io::Result<Vec<IpAddr>>> {
        let result = self
            .hosts
            .get(&host.to_ascii_lowercase())
            .cloned()
            .ok_or_else(|| {
                io::Error::new(io::ErrorKind::NotFound, format!("no such host: {}", host))
            });
        Box::pin(futures::future::ready(result))
    }
}

/// A reqwest resolver that refuses blocked destinations.
///
/// Fails closed: a resolver error or an empty answer is a
/// [`DnsFailure`](GuardReason::DnsFailure), and if any resolved address is
/// blocked the whole answer is rejected with
/// [`PrivateDestination`](GuardReason::PrivateDestination).
#[derive(Clone)]
pub struct GuardedResolver {
    policy: Arc<AddressPolicy>,
    lookup: Arc<dyn Lookup>,
}

impl GuardedResolver {
    /// Guards the system resolver.
    pub fn new(policy: Arc<AddressPolicy>) -> Self {
        Self::with_lookup(policy, Arc::new(SystemLookup))
    }

    /// Guards a custom lookup backend.
    pub fn with_lookup(policy: Arc<AddressPolicy>, lookup: Arc<dyn Lookup>) -> Self {
        Self { policy, lookup }
    }

    /// Resolves `host` and returns its addresses only if every one of them is
    /// allowed.
    pub async fn resolve_checked(&self, host: &str) -> Result<Vec<IpAddr>, GuardError> {
        resolve_checked(&self.policy, self.lookup.as_ref(), host).await
    }

    pub fn policy(&self) -> &AddressPolicy {
        &self.policy
    }
}

async fn resolve_checked(
    policy: &AddressPolicy,
    lookup: &dyn Lookup,
    host: &str,
) -> Result<Vec<IpAddr>, GuardError> {
    let addrs = lookup.lookup(host).await.map_err(|err| {
        GuardError::new(GuardReason::DnsFailure, format!("{}: {}", host, err)).record()
    })?;

    if addrs.is_empty() {
        return Err(
            GuardError::new(GuardReason::DnsFailure, format!("{}: no addresses", host)).record(),
        );
    }

    for ip in &addrs {
        if let Err(err) = policy.check(*ip) {
            let detail = format!("{} resolved to {}", host, err.detail);
            return Err(GuardError::new(err.reason, detail).record());
        }
    }

    #[cfg(feature = "tracing")]
    tracing::trace!(host, addrs = ?addrs, "resolved destination allowed");

    Ok(addrs)
}

impl Resolve for GuardedResolver {
    fn resolve(&self, name: Name) -> Resolving {
        let policy = Arc::clone(&self.policy);
        let lookup = Arc::clone(&self.lookup);
        Box::pin(async move {
            let addrs = resolve_checked(&policy, lookup.as_ref(), name.as_str()).await?;
            // the connector replaces port 0 with the URL's port
            let addrs: Addrs = Box::new(addrs.into_iter().map(|ip| SocketAddr::new(ip, 0)));
            Ok::<_, Box<dyn std::error::Error + Send + Sync>>(addrs)
        })
    }
}

impl std::fmt::Debug for GuardedResolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GuardedResolver")
            .field("policy", &self.policy)
            .finish_non_exhaustive()
    }
}
