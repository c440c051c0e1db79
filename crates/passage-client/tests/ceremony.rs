//! Passkey registration and login ceremonies against a mocked relay.

mod common;

use serde_json::json;
use wiremock::MockServer;
use wiremock::matchers::body_partial_json;

use common::*;
use passage_client::{
    AssertionCeremony, AssertionState, FailureReason, RegistrationCeremony, RegistrationState,
    VerificationProof,
};
use passage_core::error::{CeremonyError, Error};
use passage_core::{SessionStore, codec};

fn email_proof() -> VerificationProof {
    VerificationProof::EmailCode {
        email: "alice@example.com".into(),
        code: "123456".into(),
    }
}

fn registration_start(user_id: Option<&str>) -> serde_json::Value {
    let mut user = json!({ "name": "alice", "displayName": "Alice" });
    if let Some(id) = user_id {
        user["id"] = json!(id);
    }
    json!({
        "registrationId": "r1",
        "publicKeyCredentialCreationOptions": {
            "challenge": "AAA",
            "rp": { "name": "Wallet", "id": "wallet.example.com" },
            "user": user,
            "pubKeyCredParams": [{ "alg": -7, "type": "public-key" }],
            "timeout": 60000,
            "attestation": "none"
        }
    })
}

fn login_start() -> serde_json::Value {
    json!({
        "assertionId": "as-9",
        "credentialId": "AQIDBA",
        "publicKeyCredentialRequestOptions": {
            "challenge": "AAA",
            "timeout": 30000,
            "rpId": "wallet.example.com",
            "userVerification": "preferred"
        },
        "assertionRequest": { "userHandle": "QQ" }
    })
}

// ============================================================================
// Registration
// ============================================================================

#[tokio::test]
async fn registration_round_trip() {
    let server = MockServer::start().await;
    relayed("/auth/passkey/register/start")
        .and(body_partial_json(
            json!({ "data": { "email": "alice@example.com", "code": "123456" } }),
        ))
        .respond_with(ok(registration_start(Some("QQQ"))))
        .expect(1)
        .mount(&server)
        .await;
    relayed("/auth/passkey/register/finish")
        .respond_with(ok(json!({ "credentialName": "Passkey 1" })))
        .expect(1)
        .mount(&server)
        .await;

    let authenticator = FakeAuthenticator::new();
    let ceremony = RegistrationCeremony::new(
        client(&server, store_with("a0", "r0").await),
        authenticator.clone(),
    );
    let outcome = ceremony.run(&email_proof()).await.unwrap();

    assert_eq!(ceremony.state(), RegistrationState::Complete);
    assert_eq!(outcome.registration_id, "r1");
    assert_eq!(outcome.credential_id, "AQIDBA");
    assert_eq!(outcome.data["credentialName"], "Passkey 1");

    let options = authenticator.last_creation.lock().unwrap().clone().unwrap();
    assert_eq!(options.challenge, vec![0, 0]);
    assert_eq!(options.user.id, codec::decode("QQQ").unwrap());
    assert_eq!(options.timeout, Some(60000));
    assert_eq!(options.rp.id.as_deref(), Some("wallet.example.com"));

    let finish = &relayed_bodies(&server, "/auth/passkey/register/finish").await[0]["data"];
    assert_eq!(finish["registrationId"], "r1");
    assert_eq!(finish["credential"]["type"], "public-key");
    assert_eq!(finish["credential"]["id"], "AQIDBA");
    assert_eq!(finish["credential"]["rawId"], "AQIDBA");
    assert_eq!(finish["credential"]["response"]["attestationObject"], "owEC");
    assert_eq!(finish["credential"]["response"]["transports"], json!(["internal"]));
    assert_eq!(finish["credential"]["clientExtensionResults"], json!({}));
}

#[tokio::test]
async fn missing_user_id_fails_before_the_authenticator() {
    let server = MockServer::start().await;
    relayed("/auth/passkey/register/start")
        .respond_with(ok(registration_start(None)))
        .mount(&server)
        .await;
    relayed("/auth/passkey/register/finish")
        .respond_with(ok(json!(null)))
        .expect(0)
        .mount(&server)
        .await;

    let authenticator = FakeAuthenticator::new();
    let ceremony = RegistrationCeremony::new(
        client(&server, store_with("a0", "r0").await),
        authenticator.clone(),
    );
    let err = ceremony.run(&email_proof()).await.unwrap_err();

    assert!(matches!(
        err,
        Error::Ceremony(CeremonyError::InvalidChallenge { field: "user.id", .. })
    ));
    assert_eq!(
        ceremony.state(),
        RegistrationState::Failed(FailureReason::Validation)
    );
    assert_eq!(authenticator.creates(), 0);
}

#[tokio::test]
async fn dismissed_registration_prompt_is_cancelled() {
    let server = MockServer::start().await;
    relayed("/auth/passkey/register/start")
        .respond_with(ok(registration_start(Some("QQQ"))))
        .mount(&server)
        .await;
    relayed("/auth/passkey/register/finish")
        .respond_with(ok(json!(null)))
        .expect(0)
        .mount(&server)
        .await;

    let authenticator = FakeAuthenticator::dismissing();
    let ceremony = RegistrationCeremony::new(
        client(&server, store_with("a0", "r0").await),
        authenticator.clone(),
    );
    let err = ceremony.run(&email_proof()).await.unwrap_err();

    assert!(err.is_ceremony_cancelled());
    assert_eq!(
        ceremony.state(),
        RegistrationState::Failed(FailureReason::Cancelled)
    );
    assert_eq!(authenticator.creates(), 1);
}

#[tokio::test]
async fn registration_is_single_use() {
    let server = MockServer::start().await;
    relayed("/auth/passkey/register/start")
        .respond_with(ok(registration_start(None)))
        .expect(1)
        .mount(&server)
        .await;

    let ceremony = RegistrationCeremony::new(
        client(&server, store_with("a0", "r0").await),
        FakeAuthenticator::new(),
    );
    assert!(ceremony.run(&email_proof()).await.is_err());
    assert!(matches!(
        ceremony.run(&email_proof()).await,
        Err(Error::InvalidInput(_))
    ));
    assert_eq!(
        ceremony.state(),
        RegistrationState::Failed(FailureReason::Validation)
    );
}

// ============================================================================
// Login
// ============================================================================

#[tokio::test]
async fn passkey_login_stores_the_returned_session() {
    let server = MockServer::start().await;
    relayed("/auth/passkey/check")
        .and(body_partial_json(json!({ "data": { "username": "alice" } })))
        .respond_with(ok(json!(1)))
        .expect(1)
        .mount(&server)
        .await;
    relayed("/auth/passkey/login/start")
        .respond_with(ok(login_start()))
        .expect(1)
        .mount(&server)
        .await;
    relayed("/auth/login")
        .and(body_partial_json(
            json!({ "data": { "authType": "passkey", "assertionId": "as-9" } }),
        ))
        .respond_with(ok(grant("a9", "r9")))
        .expect(1)
        .mount(&server)
        .await;

    let store = SessionStore::in_memory();
    let authenticator = FakeAuthenticator::new();
    let ceremony = AssertionCeremony::new(client(&server, store.clone()), authenticator.clone());
    let mut states = ceremony.subscribe();

    let tokens = ceremony.run("alice").await.unwrap();

    assert_eq!(tokens.access_token.as_str(), "a9");
    assert_eq!(ceremony.state(), AssertionState::Complete);
    assert!(states.has_changed().unwrap());
    assert_eq!(*states.borrow_and_update(), AssertionState::Complete);

    let stored = store.read().await.unwrap().unwrap();
    assert_eq!(stored.refresh_token.as_str(), "r9");

    let request = authenticator.last_request.lock().unwrap().clone().unwrap();
    assert_eq!(request.challenge, vec![0, 0]);
    assert_eq!(request.allow_credentials.len(), 1);
    assert_eq!(request.allow_credentials[0].id, vec![1, 2, 3, 4]);
    assert_eq!(request.rp_id.as_deref(), Some("wallet.example.com"));

    let login = &relayed_bodies(&server, "/auth/login").await[0]["data"];
    assert_eq!(login["credential"]["rawId"], "AQIDBA");
    assert_eq!(login["credential"]["response"]["authenticatorData"], "CQkJ");
    assert_eq!(login["credential"]["response"]["signature"], "Bwc");
    assert_eq!(login["credential"]["response"]["userHandle"], "QQ");
}

#[tokio::test]
async fn disabled_passkey_never_starts_login() {
    let server = MockServer::start().await;
    relayed("/auth/passkey/check")
        .respond_with(ok(json!(0)))
        .mount(&server)
        .await;
    relayed("/auth/passkey/login/start")
        .respond_with(ok(login_start()))
        .expect(0)
        .mount(&server)
        .await;

    let authenticator = FakeAuthenticator::new();
    let ceremony = AssertionCeremony::new(
        client(&server, SessionStore::in_memory()),
        authenticator.clone(),
    );
    let err = ceremony.run("alice").await.unwrap_err();

    assert!(matches!(err, Error::Ceremony(CeremonyError::NotEnabled)));
    assert_eq!(err.to_string(), "ceremony error: passkey login is not enabled for this account");
    assert_eq!(
        ceremony.state(),
        AssertionState::Failed(FailureReason::NotEnabled)
    );
    assert_eq!(authenticator.gets(), 0);
}

#[tokio::test]
async fn login_without_tokens_is_rejected() {
    let server = MockServer::start().await;
    relayed("/auth/passkey/check")
        .respond_with(ok(json!(true)))
        .mount(&server)
        .await;
    relayed("/auth/passkey/login/start")
        .respond_with(ok(login_start()))
        .mount(&server)
        .await;
    relayed("/auth/login")
        .respond_with(ok(json!(null)))
        .mount(&server)
        .await;

    let store = SessionStore::in_memory();
    let ceremony = AssertionCeremony::new(client(&server, store.clone()), FakeAuthenticator::new());
    let err = ceremony.run("alice").await.unwrap_err();

    assert!(matches!(err, Error::Ceremony(CeremonyError::Rejected { .. })));
    assert_eq!(
        ceremony.state(),
        AssertionState::Failed(FailureReason::Rejected)
    );
    assert!(store.read().await.unwrap().is_none());
}

#[tokio::test]
async fn unauthorized_login_is_not_refreshed() {
    let server = MockServer::start().await;
    relayed("/auth/passkey/check")
        .respond_with(ok(json!(1)))
        .mount(&server)
        .await;
    relayed("/auth/passkey/login/start")
        .respond_with(ok(login_start()))
        .mount(&server)
        .await;
    relayed("/auth/login")
        .respond_with(unauthorized())
        .expect(1)
        .mount(&server)
        .await;

    let store = store_with("stale", "stale-refresh").await;
    let ceremony = AssertionCeremony::new(client(&server, store.clone()), FakeAuthenticator::new());
    let err = ceremony.run("alice").await.unwrap_err();

    assert!(matches!(err, Error::Http(ref e) if e.status == 401));
    assert_eq!(
        ceremony.state(),
        AssertionState::Failed(FailureReason::Rejected)
    );
    assert_eq!(
        store.read().await.unwrap().unwrap().access_token.as_str(),
        "stale"
    );
}

#[tokio::test]
async fn dismissed_login_prompt_is_cancelled() {
    let server = MockServer::start().await;
    relayed("/auth/passkey/check")
        .respond_with(ok(json!(1)))
        .mount(&server)
        .await;
    relayed("/auth/passkey/login/start")
        .respond_with(ok(login_start()))
        .mount(&server)
        .await;
    relayed("/auth/login")
        .respond_with(ok(grant("a9", "r9")))
        .expect(0)
        .mount(&server)
        .await;

    let ceremony = AssertionCeremony::new(
        client(&server, SessionStore::in_memory()),
        FakeAuthenticator::dismissing(),
    );
    let err = ceremony.run("alice").await.unwrap_err();

    assert!(err.is_ceremony_cancelled());
    assert_eq!(
        ceremony.state(),
        AssertionState::Failed(FailureReason::Cancelled)
    );
}
