use outbound_resilience_guard::{check_url, AddressPolicy, GuardReason, IpRange};
use std::net::IpAddr;

fn ip(s: &str) -> IpAddr {
    s.parse().unwrap()
}

#[test]
fn internal_destinations_are_blocked_and_public_ones_pass() {
    let policy = AddressPolicy::default();

    for blocked in ["127.0.0.1", "10.0.0.5", "169.254.169.254", "::1"] {
        let err = policy.check(ip(blocked)).unwrap_err();
        assert_eq!(err.reason, GuardReason::PrivateDestination, "{blocked}");
    }
    assert!(policy.check(ip("93.184.216.34")).is_ok());
}

#[test]
fn every_built_in_range_blocks_its_network_address() {
    let policy = AddressPolicy::default();
    for blocked in policy.blocked() {
        assert!(
            !policy.is_allowed(blocked.range.network()),
            "{} should be blocked",
            blocked
        );
    }
}

#[test]
fn exemptions_are_narrow() {
    let policy = AddressPolicy::default().with_exemptions(["127.0.0.1".parse::<IpRange>().unwrap()]);
    assert!(policy.is_allowed(ip("127.0.0.1")));
    assert!(!policy.is_allowed(ip("127.0.0.2")));
    assert!(!policy.is_allowed(ip("::1")));
}

#[test]
fn url_checks_cover_literal_forms() {
    let policy = AddressPolicy::default();
    for url in [
        "http://127.0.0.1/",
        "http://0x7f.0.0.1/",
        "http://2130706433/",
        "http://[::ffff:a9fe:a9fe]/",
        "http://[::1]:8080/",
    ] {
        let parsed = url::Url::parse(url).unwrap();
        assert!(check_url(&policy, &parsed).is_err(), "{url} should be blocked");
    }
}
