//! Shared fixtures for passage-client integration tests.
//!
//! The relay is played by a wiremock server mounted at `/api/proxy`; mocks
//! match on the relay payload (`url`, `headers`, `data`) to stand in for
//! individual backend endpoints.

#![allow(dead_code)]

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use serde_json::{Value, json};
use wiremock::matchers::{body_partial_json, method, path};
use wiremock::{Mock, MockBuilder, MockServer, ResponseTemplate};

use passage_client::RequestClient;
use passage_core::types::{
    AssertionResponse, AttestationResponse, CreationOptions, RequestOptions,
};
use passage_core::{
    AssertionCredential, AttestationCredential, AuthenticatorError, BaseUrl, ClientConfig,
    CredentialProvider, SessionStore, TokenSet,
};

pub const API_BASE: &str = "https://api.example.com";

/// Absolute backend URL for `path`.
pub fn api(path: &str) -> String {
    format!("{API_BASE}{path}")
}

/// A client whose relay is `server`.
pub fn client(server: &MockServer, store: SessionStore) -> RequestClient {
    let config = ClientConfig::new(
        BaseUrl::new(server.uri()).unwrap(),
        BaseUrl::new(API_BASE).unwrap(),
    );
    RequestClient::new(config, store).unwrap()
}

/// A store holding `access`/`refresh` as a Bearer session.
pub async fn store_with(access: &str, refresh: &str) -> SessionStore {
    let store = SessionStore::in_memory();
    store
        .write(TokenSet::new(access, refresh, "Bearer"))
        .await
        .unwrap();
    store
}

/// Start matching a relayed call to backend `path`.
pub fn relayed(backend_path: &str) -> MockBuilder {
    Mock::given(method("POST"))
        .and(path("/api/proxy"))
        .and(body_partial_json(json!({ "url": api(backend_path) })))
}

/// Match the refresh exchange.
pub fn refresh_call() -> MockBuilder {
    relayed("/auth/login").and(body_partial_json(
        json!({ "data": { "authType": "refreshToken" } }),
    ))
}

/// Envelope `{code: 200, data}`.
pub fn ok(data: Value) -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_json(json!({ "code": 200, "msg": "ok", "data": data }))
}

/// A bare HTTP 401.
pub fn unauthorized() -> ResponseTemplate {
    ResponseTemplate::new(401).set_body_json(json!({ "msg": "token expired" }))
}

/// Token data as the backend issues it.
pub fn grant(access: &str, refresh: &str) -> Value {
    json!({ "access_token": access, "refresh_token": refresh, "token_type": "Bearer" })
}

/// Relay payload bodies received for backend `path`, in order.
pub async fn relayed_bodies(server: &MockServer, backend_path: &str) -> Vec<Value> {
    let target = api(backend_path);
    server
        .received_requests()
        .await
        .unwrap_or_default()
        .into_iter()
        .filter_map(|r| serde_json::from_slice::<Value>(&r.body).ok())
        .filter(|v| v["url"] == target.as_str())
        .collect()
}

/// Scripted platform authenticator that counts its calls.
#[derive(Default)]
pub struct FakeAuthenticator {
    pub create_calls: AtomicUsize,
    pub get_calls: AtomicUsize,
    pub cancel: bool,
    pub last_creation: std::sync::Mutex<Option<CreationOptions>>,
    pub last_request: std::sync::Mutex<Option<RequestOptions>>,
}

impl FakeAuthenticator {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// An authenticator whose prompt is always dismissed.
    pub fn dismissing() -> Arc<Self> {
        Arc::new(Self {
            cancel: true,
            ..Self::default()
        })
    }

    pub fn creates(&self) -> usize {
        self.create_calls.load(Ordering::SeqCst)
    }

    pub fn gets(&self) -> usize {
        self.get_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl CredentialProvider for FakeAuthenticator {
    async fn create(
        &self,
        options: CreationOptions,
    ) -> Result<AttestationCredential, AuthenticatorError> {
        self.create_calls.fetch_add(1, Ordering::SeqCst);
        *self.last_creation.lock().unwrap() = Some(options);
        if self.cancel {
            return Err(AuthenticatorError::Cancelled);
        }
        Ok(AttestationCredential {
            id: "cred".to_string(),
            raw_id: vec![1, 2, 3, 4],
            kind: "public-key".to_string(),
            response: AttestationResponse {
                client_data_json: b"{\"type\":\"webauthn.create\"}".to_vec(),
                attestation_object: vec![0xa3, 0x01, 0x02],
                transports: vec!["internal".to_string()],
            },
            client_extension_results: Value::Null,
        })
    }

    async fn get(&self, options: RequestOptions) -> Result<AssertionCredential, AuthenticatorError> {
        self.get_calls.fetch_add(1, Ordering::SeqCst);
        *self.last_request.lock().unwrap() = Some(options);
        if self.cancel {
            return Err(AuthenticatorError::Cancelled);
        }
        Ok(AssertionCredential {
            id: "cred".to_string(),
            raw_id: vec![1, 2, 3, 4],
            kind: "public-key".to_string(),
            response: AssertionResponse {
                client_data_json: b"{\"type\":\"webauthn.get\"}".to_vec(),
                authenticator_data: vec![9, 9, 9],
                signature: vec![7, 7],
                user_handle: Some(vec![0x41]),
            },
            client_extension_results: json!({}),
        })
    }
}
