use fakedns_domain::{FakeDnsError, ServerState, StartOutcome, Transport};

const ALL: [ServerState; 6] = [
    ServerState::Configured,
    ServerState::Starting,
    ServerState::Ready,
    ServerState::Running,
    ServerState::Stopped,
    ServerState::Failed,
];

#[test]
fn test_forward_transitions_allowed() {
    assert!(ServerState::Configured.can_transition_to(ServerState::Starting));
    assert!(ServerState::Starting.can_transition_to(ServerState::Ready));
    assert!(ServerState::Ready.can_transition_to(ServerState::Running));
    assert!(ServerState::Running.can_transition_to(ServerState::Stopped));
    assert!(ServerState::Ready.can_transition_to(ServerState::Stopped));
    assert!(ServerState::Starting.can_transition_to(ServerState::Failed));
    assert!(ServerState::Running.can_transition_to(ServerState::Failed));
}

#[test]
fn test_backward_transitions_rejected() {
    assert!(!ServerState::Ready.can_transition_to(ServerState::Starting));
    assert!(!ServerState::Running.can_transition_to(ServerState::Ready));
    assert!(!ServerState::Starting.can_transition_to(ServerState::Configured));
    assert!(!ServerState::Configured.can_transition_to(ServerState::Running));
    assert!(!ServerState::Starting.can_transition_to(ServerState::Stopped));
}

#[test]
fn test_terminal_states_are_final() {
    for terminal in [ServerState::Stopped, ServerState::Failed] {
        assert!(terminal.is_terminal());
        for next in ALL {
            assert!(
                !terminal.can_transition_to(next),
                "{} -> {} should be rejected",
                terminal,
                next
            );
        }
    }
}

#[test]
fn test_state_display() {
    assert_eq!(ServerState::Ready.to_string(), "ready");
    assert_eq!(ServerState::Failed.to_string(), "failed");
}

#[test]
fn test_start_outcome_accessors() {
    let ready = StartOutcome::Ready {
        addr: "127.0.0.1:5353".parse().unwrap(),
    };
    assert!(ready.is_ready());
    assert!(ready.error().is_none());

    let failed = StartOutcome::Failed(FakeDnsError::ProbeAborted);
    assert!(!failed.is_ready());
    assert_eq!(failed.error(), Some(&FakeDnsError::ProbeAborted));
}

#[test]
fn test_startup_failures_classified() {
    let bind = FakeDnsError::bind(Transport::Udp, "127.0.0.1:53", "Address already in use");
    assert!(bind.is_startup_failure());
    assert!(bind.to_string().contains("UDP"));
    assert!(bind.to_string().contains("127.0.0.1:53"));

    assert!(FakeDnsError::ProbeTimeout {
        addr: "127.0.0.1:53".to_string(),
        attempts: 3
    }
    .is_startup_failure());
    assert!(!FakeDnsError::socket_io(Transport::Tcp, "reset").is_startup_failure());
    assert!(!FakeDnsError::InvalidZone("bad..zone".to_string()).is_startup_failure());
}
