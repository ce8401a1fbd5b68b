use fakedns_domain::{AnswerMode, ProbePolicy, Settings, Transport};
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr, SocketAddr};
use std::time::Duration;

#[test]
fn test_settings_defaults() {
    let settings = Settings::new(0, "example.com.", "cloud.example.com.");

    assert_eq!(settings.bind_address(), IpAddr::V4(Ipv4Addr::LOCALHOST));
    assert!(settings.serves(Transport::Udp));
    assert!(settings.serves(Transport::Tcp));
    assert_eq!(settings.answer_mode(), AnswerMode::Static);
    assert_eq!(settings.probe(), ProbePolicy::default());
    assert!(settings.tsig_keys().is_empty());
}

#[test]
fn test_truncation_sentinel_under_edge_zone() {
    let settings = Settings::new(0, "example.com.", "cloud.example.com.");
    assert_eq!(settings.truncation_sentinel(), "tc.example.com.");

    let relative = Settings::new(0, "example.com", "cloud.example.com.");
    assert_eq!(relative.truncation_sentinel(), "tc.example.com.");
}

#[test]
fn test_truncation_sentinel_under_root_zone() {
    let settings = Settings::new(0, ".", "cloud.example.com.");
    assert_eq!(settings.truncation_sentinel(), "tc.");
}

#[test]
fn test_empty_transport_set_serves_both() {
    let settings = Settings::new(0, "test.", "a.test.").with_transports(Vec::<Transport>::new());
    assert_eq!(settings.transports(), &Transport::all());

    let tcp_only = Settings::new(0, "test.", "a.test.").with_transports([Transport::Tcp]);
    assert!(!tcp_only.serves(Transport::Udp));
}

#[test]
fn test_transports_bind_udp_first() {
    let order: Vec<Transport> = Transport::all().into_iter().collect();
    assert_eq!(order, vec![Transport::Udp, Transport::Tcp]);
}

#[test]
fn test_probe_target_replaces_unspecified_address() {
    let v4 = Settings::new(0, "test.", "a.test.")
        .with_bind_address(IpAddr::V4(Ipv4Addr::UNSPECIFIED));
    assert_eq!(
        v4.probe_target(5353),
        SocketAddr::new(IpAddr::V4(Ipv4Addr::LOCALHOST), 5353)
    );

    let v6 = Settings::new(0, "test.", "a.test.")
        .with_bind_address(IpAddr::V6(Ipv6Addr::UNSPECIFIED));
    assert_eq!(
        v6.probe_target(5353),
        SocketAddr::new(IpAddr::V6(Ipv6Addr::LOCALHOST), 5353)
    );

    let fixed = Settings::new(0, "test.", "a.test.")
        .with_bind_address("127.0.0.2".parse().unwrap());
    assert_eq!(fixed.probe_target(53), "127.0.0.2:53".parse().unwrap());
}

#[test]
fn test_probe_policy_needs_one_attempt() {
    let policy = ProbePolicy::new(0, Duration::ZERO, Duration::from_millis(100));
    assert_eq!(policy.attempts, 1);
}

#[test]
fn test_answer_mode_flags() {
    assert!(AnswerMode::Static.accepts_static_records());
    assert!(!AnswerMode::Static.reflects_clients());
    assert!(!AnswerMode::Reflect.accepts_static_records());
    assert!(AnswerMode::Reflect.reflects_clients());
    assert!(AnswerMode::StaticAndReflect.accepts_static_records());
    assert!(AnswerMode::StaticAndReflect.reflects_clients());
}
