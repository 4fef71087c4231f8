//! Headless authorization-code + PKCE login: authorize → sign-in → token.

use std::sync::LazyLock;

use regex::Regex;
use reqwest::header::{COOKIE, LOCATION};
use reqwest::Method;
use tracing::Instrument;

use crate::config::{ClientConfig, Credentials};
use crate::error::{truncate_body, BilinkError};
use crate::transport::{Redirects, TimedTransport};

use super::cookies::extract_cookies;
use super::pkce::{generate_pkce, PkceChallenge};
use super::token::{TokenResponse, TokenSet};

/// Redirect target registered for the client. Never fetched; the
/// authorization code is read out of the sign-in `Location` header instead.
pub const REDIRECT_URI: &str = "apiaccount://callback";

/// Path of the OIDC provider below the authorization server base URL.
pub const OIDC_PREFIX: &str = "/oidc-provider/v1/oauth2";

static CODE_PARAM: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"[?&#]code=([^&#\s]+)").expect("authorization code pattern is valid")
});

/// Pull the authorization code out of a redirect `Location` value.
///
/// The code may sit anywhere in the query (or fragment); percent-escapes are
/// decoded.
pub fn extract_authorization_code(location: &str) -> Option<String> {
    let raw = CODE_PARAM.captures(location)?.get(1)?.as_str();
    let decoded: String = url::form_urlencoded::parse(format!("c={raw}").as_bytes())
        .next()
        .map(|(_, v)| v.into_owned())?;
    (!decoded.is_empty()).then_some(decoded)
}

/// Client for the BI service's OIDC provider.
///
/// Holds no token state: every call takes what it needs and returns a fresh
/// [`TokenSet`] by value.
#[derive(Debug, Clone)]
pub struct OAuthClient {
    config: ClientConfig,
    transport: TimedTransport,
}

impl OAuthClient {
    pub fn new(config: ClientConfig, transport: TimedTransport) -> Self {
        Self { config, transport }
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    pub(crate) fn transport(&self) -> &TimedTransport {
        &self.transport
    }

    pub(crate) fn endpoint(&self, name: &str) -> String {
        format!("{}{OIDC_PREFIX}/{name}", self.config.auth_server)
    }

    /// Run the full three-step login and return a new token set.
    ///
    /// Each call draws fresh PKCE state and a fresh cookie jar; nothing
    /// survives the call whether it succeeds or fails.
    pub async fn bootstrap(&self, credentials: &Credentials) -> Result<TokenSet, BilinkError> {
        if !credentials.is_complete() {
            return Err(BilinkError::MissingCredentials {
                org: self.config.org_code.clone(),
            });
        }

        let span = tracing::info_span!(
            "bootstrap",
            attempt = %uuid::Uuid::new_v4(),
            org = %self.config.org_code,
        );

        async {
            let pkce = generate_pkce();
            let cookies = self.authorize(&pkce).await?;
            let code = self.signin(credentials, &cookies).await?;
            let tokens = self.exchange_code(&code, &pkce).await?;
            tracing::info!(expires_in = tokens.expires_in, "session bootstrapped");
            Ok(tokens)
        }
        .instrument(span)
        .await
    }

    /// Step 1: open an authorization session and collect its cookies.
    async fn authorize(&self, pkce: &PkceChallenge) -> Result<String, BilinkError> {
        let url = url::Url::parse_with_params(
            &self.endpoint("authorize"),
            &[
                ("response_type", "code"),
                ("client_id", self.config.client_id.as_str()),
                ("redirect_uri", REDIRECT_URI),
                ("scope", "openid"),
                ("code_challenge", pkce.code_challenge.as_str()),
                ("code_challenge_method", "S256"),
            ],
        )
        .map_err(|e| BilinkError::ProtocolError(format!("Cannot build authorize URL: {e}")))?;

        let request = self
            .transport
            .request(Redirects::Manual, Method::GET, url.as_str());
        let reply = self.transport.send("authorize", request).await?;

        if reply.status.is_server_error() {
            return Err(BilinkError::ServerError {
                operation: "authorize".to_string(),
                status: reply.status.as_u16(),
                body: truncate_body(&reply.body),
            });
        }

        let cookies = extract_cookies(&reply.headers);
        tracing::debug!(
            status = reply.status.as_u16(),
            cookie_count = cookies.split("; ").filter(|c| !c.is_empty()).count(),
            "authorize step complete"
        );
        Ok(cookies)
    }

    /// Step 2: post credentials with the session cookies and read the code
    /// from the redirect.
    async fn signin(&self, credentials: &Credentials, cookies: &str) -> Result<String, BilinkError> {
        let mut request = self
            .transport
            .request(Redirects::Manual, Method::POST, &self.endpoint("signin"))
            .form(&[
                ("username", credentials.username.as_str()),
                ("password", credentials.password.as_str()),
                ("grant_type", "password"),
            ]);
        if !cookies.is_empty() {
            request = request.header(COOKIE, cookies);
        }
        let reply = self.transport.send("signin", request).await?;

        if reply.status.is_server_error() {
            return Err(BilinkError::ServerError {
                operation: "signin".to_string(),
                status: reply.status.as_u16(),
                body: truncate_body(&reply.body),
            });
        }

        let location = reply.header(LOCATION).unwrap_or_default();
        match extract_authorization_code(location) {
            Some(code) => {
                tracing::debug!(status = reply.status.as_u16(), "signin returned authorization code");
                Ok(code)
            }
            None => {
                tracing::warn!(
                    status = reply.status.as_u16(),
                    has_location = !location.is_empty(),
                    "signin did not return an authorization code"
                );
                let detail = if reply.body.trim().is_empty() {
                    location
                } else {
                    reply.body.as_str()
                };
                Err(BilinkError::AuthorizationCodeMissing {
                    status: reply.status.as_u16(),
                    body: truncate_body(detail),
                })
            }
        }
    }

    /// Step 3: trade the single-use code and the verifier for tokens.
    async fn exchange_code(&self, code: &str, pkce: &PkceChallenge) -> Result<TokenSet, BilinkError> {
        let request = self
            .transport
            .request(Redirects::Follow, Method::POST, &self.endpoint("token"))
            .form(&[
                ("grant_type", "authorization_code"),
                ("client_id", self.config.client_id.as_str()),
                ("code", code),
                ("code_verifier", pkce.code_verifier.as_str()),
                ("redirect_uri", REDIRECT_URI),
                ("scope", "openid"),
            ]);
        let reply = self.transport.send("token exchange", request).await?;

        if reply.status.is_server_error() {
            return Err(BilinkError::ServerError {
                operation: "token exchange".to_string(),
                status: reply.status.as_u16(),
                body: truncate_body(&reply.body),
            });
        }

        let rejected = || BilinkError::TokenExchangeRejected {
            status: reply.status.as_u16(),
            body: truncate_body(&reply.body),
        };

        if !reply.is_success() {
            tracing::warn!(status = reply.status.as_u16(), "token exchange rejected");
            return Err(rejected());
        }

        TokenResponse::parse(&reply.body)
            .and_then(|resp| resp.into_token_set(None))
            .ok_or_else(|| {
                tracing::warn!("token exchange response has no id_token");
                rejected()
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn client(auth: &str) -> OAuthClient {
        let config = ClientConfig::new(auth, "https://app.example.com", "cid", "ORG").unwrap();
        OAuthClient::new(config, TimedTransport::new(Duration::from_secs(1)).unwrap())
    }

    #[test]
    fn code_as_only_parameter() {
        assert_eq!(
            extract_authorization_code("app://callback?code=XYZ").as_deref(),
            Some("XYZ")
        );
    }

    #[test]
    fn code_after_other_parameters() {
        assert_eq!(
            extract_authorization_code("apiaccount://callback?state=s1&code=abc-123&iss=x")
                .as_deref(),
            Some("abc-123")
        );
    }

    #[test]
    fn code_is_percent_decoded() {
        assert_eq!(
            extract_authorization_code("app://cb?code=a%2Bb%3D").as_deref(),
            Some("a+b=")
        );
    }

    #[test]
    fn code_in_fragment() {
        assert_eq!(
            extract_authorization_code("app://cb#code=frag").as_deref(),
            Some("frag")
        );
    }

    #[test]
    fn no_code_present() {
        assert!(extract_authorization_code("").is_none());
        assert!(extract_authorization_code("https://auth/login?error=access_denied").is_none());
        assert!(extract_authorization_code("app://cb?code=").is_none());
        // `xcode=` is a different parameter
        assert!(extract_authorization_code("app://cb?xcode=nope").is_none());
    }

    #[test]
    fn endpoints_use_oidc_prefix() {
        let c = client("https://auth.example.com/");
        assert_eq!(
            c.endpoint("token"),
            "https://auth.example.com/oidc-provider/v1/oauth2/token"
        );
    }

    #[tokio::test]
    async fn bootstrap_requires_credentials() {
        let c = client("http://127.0.0.1:9");
        let err = c.bootstrap(&Credentials::default()).await.unwrap_err();
        assert!(
            matches!(&err, BilinkError::MissingCredentials { org } if org == "ORG"),
            "{err:?}"
        );
        assert_eq!(err.code(), "missing_credentials");
        assert!(!err.is_retryable());
        assert!(!err.to_string().contains('<'));
    }
}
