//! Integration tests for the authorization gate seam.

use deepcheck_auth::{
    AuthState, AuthStateMachine, AuthorizationGate, LoggingRedirect, SessionGate, SessionToken,
    SignInRedirect, StaticGate,
};

fn fixed_clock() -> u64 {
    10_000
}

#[test]
fn authorization_gate_tests_session_gate_is_usable_as_trait_object() {
    let gate = SessionGate::with_clock(AuthStateMachine::new(), fixed_clock);
    gate.sign_in(SessionToken {
        access_token: "token".to_string(),
        session_id: "session-1".to_string(),
        expires_at_ms: 20_000,
    });

    let gates: Vec<Box<dyn AuthorizationGate>> = vec![Box::new(gate), Box::new(StaticGate(false))];
    let answers: Vec<bool> = gates.iter().map(|gate| gate.is_authorized()).collect();

    assert_eq!(answers, vec![true, false]);
}

#[test]
fn authorization_gate_tests_sign_out_revokes_access() {
    let gate = SessionGate::with_clock(AuthStateMachine::new(), fixed_clock);
    gate.sign_in(SessionToken {
        access_token: "token".to_string(),
        session_id: "session-2".to_string(),
        expires_at_ms: 20_000,
    });
    gate.sign_out();

    assert!(!gate.is_authorized());
    assert_eq!(gate.state(), AuthState::SignedOut);
    assert_eq!(gate.access_token(), None);
}

#[test]
fn authorization_gate_tests_redirect_keeps_validated_target() {
    let redirect =
        LoggingRedirect::new("https://deepcheck.example/sign-in").expect("https target is valid");
    redirect.redirect_to_sign_in();

    assert_eq!(redirect.target().as_str(), "https://deepcheck.example/sign-in");
    assert!(LoggingRedirect::new("http://deepcheck.example/sign-in").is_err());
}
