//! Wiremock stand-ins for the authorization server and the BI service.
#![allow(dead_code)]

use std::sync::{Arc, Mutex};
use std::time::Duration;

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use bilink::{ClientConfig, Credentials, OAuthClient, TimedTransport};
use serde_json::{json, Value};
use sha2::{Digest, Sha256};
use wiremock::matchers::{body_string_contains, header, method, path, query_param};
use wiremock::{Mock, MockServer, Request, ResponseTemplate};

pub const OIDC: &str = "/oidc-provider/v1/oauth2";
pub const SESSION_COOKIE: &str = "sid=abc123";

pub fn oidc_path(name: &str) -> String {
    format!("{OIDC}/{name}")
}

pub fn client_config(server: &MockServer) -> ClientConfig {
    ClientConfig::new(server.uri(), server.uri(), "test-client", "ORG1").unwrap()
}

pub fn oauth_client(server: &MockServer, timeout: Duration) -> OAuthClient {
    OAuthClient::new(client_config(server), TimedTransport::new(timeout).unwrap())
}

pub fn credentials() -> Credentials {
    Credentials::new("api-user", "s3cret")
}

pub fn token_body(id: &str, refresh: &str) -> Value {
    json!({
        "id_token": id,
        "refresh_token": refresh,
        "access_token": format!("access-{id}"),
        "token_type": "Bearer",
        "expires_in": 1_209_600,
    })
}

fn form_value(request: &Request, key: &str) -> Option<String> {
    url::form_urlencoded::parse(&request.body)
        .find(|(k, _)| k == key)
        .map(|(_, v)| v.into_owned())
}

/// Remembers the `code_challenge` sent to authorize and checks that the
/// token request carries the verifier that hashes to it.
#[derive(Clone, Default)]
pub struct PkceWitness {
    challenge: Arc<Mutex<Option<String>>>,
}

pub struct RecordChallenge(PkceWitness);
pub struct VerifierMatches(PkceWitness);

impl PkceWitness {
    pub fn record(&self) -> RecordChallenge {
        RecordChallenge(self.clone())
    }

    pub fn verifies(&self) -> VerifierMatches {
        VerifierMatches(self.clone())
    }
}

impl wiremock::Match for RecordChallenge {
    fn matches(&self, request: &Request) -> bool {
        let challenge = request
            .url
            .query_pairs()
            .find(|(k, _)| k == "code_challenge")
            .map(|(_, v)| v.into_owned());
        *self.0.challenge.lock().unwrap() = challenge;
        true
    }
}

impl wiremock::Match for VerifierMatches {
    fn matches(&self, request: &Request) -> bool {
        let Some(verifier) = form_value(request, "code_verifier") else {
            return false;
        };
        let expected = self.0.challenge.lock().unwrap().clone();
        let actual = URL_SAFE_NO_PAD.encode(Sha256::digest(verifier.as_bytes()));
        expected.as_deref() == Some(actual.as_str())
    }
}

/// Authorize answers 302 with a session cookie; it must not be followed.
pub async fn mount_authorize(server: &MockServer, witness: &PkceWitness) {
    Mock::given(method("GET"))
        .and(path(oidc_path("authorize")))
        .and(query_param("response_type", "code"))
        .and(query_param("code_challenge_method", "S256"))
        .and(query_param("client_id", "test-client"))
        .and(witness.record())
        .respond_with(
            ResponseTemplate::new(302)
                .insert_header("Set-Cookie", format!("{SESSION_COOKIE}; Path=/; HttpOnly"))
                .insert_header("Location", oidc_path("login-page")),
        )
        .mount(server)
        .await;
}

/// Sign-in answers 302 to the callback with `code`, but only when the
/// authorize cookie comes back.
pub async fn mount_signin(server: &MockServer, code: &str) {
    Mock::given(method("POST"))
        .and(path(oidc_path("signin")))
        .and(header("cookie", SESSION_COOKIE))
        .and(body_string_contains("username=api-user"))
        .and(body_string_contains("grant_type=password"))
        .respond_with(
            ResponseTemplate::new(302)
                .insert_header("Location", format!("app://callback?code={code}")),
        )
        .mount(server)
        .await;
}

/// Token endpoint accepting `code` exactly once with the right verifier.
/// Any later exchange is answered with `invalid_grant`.
pub async fn mount_code_exchange(server: &MockServer, witness: &PkceWitness, code: &str, tokens: Value) {
    Mock::given(method("POST"))
        .and(path(oidc_path("token")))
        .and(body_string_contains("grant_type=authorization_code"))
        .and(body_string_contains(format!("code={code}")))
        .and(witness.verifies())
        .respond_with(ResponseTemplate::new(200).set_body_json(tokens))
        .up_to_n_times(1)
        .with_priority(1)
        .mount(server)
        .await;

    Mock::given(method("POST"))
        .and(path(oidc_path("token")))
        .and(body_string_contains("grant_type=authorization_code"))
        .respond_with(
            ResponseTemplate::new(400).set_body_json(json!({"error": "invalid_grant"})),
        )
        .with_priority(5)
        .mount(server)
        .await;
}

/// Full login flow issuing `tokens` for code `XYZ`.
pub async fn mount_login(server: &MockServer, tokens: Value) -> PkceWitness {
    let witness = PkceWitness::default();
    mount_authorize(server, &witness).await;
    mount_signin(server, "XYZ").await;
    mount_code_exchange(server, &witness, "XYZ", tokens).await;
    witness
}

/// Refresh grant for `refresh_token` answered with `response`.
pub async fn mount_refresh(server: &MockServer, refresh_token: &str, response: ResponseTemplate) {
    Mock::given(method("POST"))
        .and(path(oidc_path("token")))
        .and(body_string_contains("grant_type=refresh_token"))
        .and(body_string_contains(format!("refresh_token={refresh_token}")))
        .respond_with(response)
        .mount(server)
        .await;
}

/// Number of requests the server saw on `path`.
pub async fn hits(server: &MockServer, path: &str) -> usize {
    server
        .received_requests()
        .await
        .unwrap_or_default()
        .iter()
        .filter(|r| r.url.path() == path)
        .count()
}

/// Write a single-tenant bilink.json pointing both servers at `uri`.
pub fn write_tenant_config(dir: &std::path::Path, uri: &str) -> std::path::PathBuf {
    let config_path = dir.join("bilink.json");
    let config = json!({
        "tenants": {
            "acme": {
                "authServer": uri,
                "appServer": uri,
                "clientId": "test-client",
                "orgCode": "ORG1",
                "username": "api-user",
                "password": "s3cret",
                "timeoutMs": 5000,
            }
        }
    });
    std::fs::write(&config_path, serde_json::to_string_pretty(&config).unwrap()).unwrap();
    config_path
}
