//! URL and redirect-hop checks.
//!
//! reqwest dials IP-literal hosts without consulting the resolver, so
//! literals are classified here before the request leaves and again on every
//! redirect hop. Hostnames pass through to the [`GuardedResolver`], which sees
//! them at connect time.
//!
//! [`GuardedResolver`]: crate::GuardedResolver

use crate::error::GuardError;
use crate::policy::AddressPolicy;
use outbound_resilience_core::GuardReason;
use reqwest::redirect::{Attempt, Policy};
use std::net::IpAddr;
use std::sync::Arc;
use url::{Host, Url};

/// Checks that `url` is something the guard is willing to send.
///
/// Only `http` and `https` URLs with a host are accepted
/// ([`MalformedUrl`](GuardReason::MalformedUrl) otherwise). IP-literal hosts
/// are checked against `policy`; hostnames are left for connect time.
pub fn check_url(policy: &AddressPolicy, url: &Url) -> Result<(), GuardError> {
    match url.scheme() {
        "http" | "https" => {}
        other => {
            return Err(GuardError::new(
                GuardReason::MalformedUrl,
                format!("unsupported scheme `{}` in {}", other, url),
            ))
        }
    }

    match url.host() {
        None => Err(GuardError::new(
            GuardReason::MalformedUrl,
            format!("no host in {}", url),
        )),
        Some(Host::Domain(domain)) if domain.is_empty() => Err(GuardError::new(
            GuardReason::MalformedUrl,
            format!("empty host in {}", url),
        )),
        Some(Host::Domain(_)) => Ok(()),
        Some(Host::Ipv4(v4)) => policy.check(IpAddr::V4(v4)),
        Some(Host::Ipv6(v6)) => policy.check(IpAddr::V6(v6)),
    }
}

/// Parses and checks a URL string.
pub fn parse_checked(policy: &AddressPolicy, url: &str) -> Result<Url, GuardError> {
    let parsed = Url::parse(url).map_err(|err| {
        GuardError::new(GuardReason::MalformedUrl, format!("{}: {}", url, err))
    })?;
    check_url(policy, &parsed)?;
    Ok(parsed)
}

/// A reqwest redirect policy that checks every hop.
///
/// Hops beyond `max_redirects` stop the chain with a transport error. A hop
/// to a disallowed destination stops it with a
/// [`RedirectBlocked`](GuardReason::RedirectBlocked) rejection, which
/// [`HttpError::from_reqwest`](crate::HttpError::from_reqwest) recovers.
pub fn redirect_policy(policy: Arc<AddressPolicy>, max_redirects: usize) -> Policy {
    Policy::custom(move |attempt: Attempt| {
        if attempt.previous().len() > max_redirects {
            return attempt.error(format!("too many redirects (max {})", max_redirects));
        }
        match check_url(&policy, attempt.url()) {
            Ok(()) => attempt.follow(),
            Err(err) => {
                let err = err.into_redirect(attempt.url()).record();
                attempt.error(err)
            }
        }
    })
}
