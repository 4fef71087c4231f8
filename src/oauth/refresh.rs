use reqwest::Method;

use crate::error::{truncate_body, BilinkError};
use crate::transport::Redirects;

use super::bootstrap::{OAuthClient, REDIRECT_URI};
use super::token::{TokenResponse, TokenSet};

impl OAuthClient {
    /// Exchange a refresh token for a new token set.
    ///
    /// Any 4xx (or a 2xx without `id_token`) means the refresh token is dead
    /// and surfaces as [`BilinkError::SessionExpired`]. A 5xx is a
    /// [`BilinkError::ServerError`]; the refresh token may still be good.
    pub async fn refresh(&self, refresh_token: &str) -> Result<TokenSet, BilinkError> {
        let request = self
            .transport()
            .request(Redirects::Follow, Method::POST, &self.endpoint("token"))
            .form(&[
                ("grant_type", "refresh_token"),
                ("client_id", self.config().client_id.as_str()),
                ("refresh_token", refresh_token),
                ("redirect_uri", REDIRECT_URI),
                ("scope", "openid"),
            ]);
        let reply = self.transport().send("refresh", request).await?;
        let status = reply.status.as_u16();

        if reply.status.is_server_error() {
            tracing::debug!(status, "refresh endpoint failed");
            return Err(BilinkError::ServerError {
                operation: "refresh".to_string(),
                status,
                body: truncate_body(&reply.body),
            });
        }

        let expired = || BilinkError::SessionExpired {
            status,
            body: truncate_body(&reply.body),
        };

        if !reply.is_success() {
            tracing::warn!(status, "refresh token rejected");
            return Err(expired());
        }

        let tokens = TokenResponse::parse(&reply.body)
            .and_then(|resp| resp.into_token_set(Some(refresh_token)))
            .ok_or_else(|| {
                tracing::warn!(status, "refresh response has no id_token");
                expired()
            })?;

        tracing::info!(
            expires_in = tokens.expires_in,
            rotated = tokens.refresh_token != refresh_token,
            "session refreshed"
        );
        Ok(tokens)
    }
}
