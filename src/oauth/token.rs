use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

/// Lifetime assumed when a token response omits `expires_in`.
pub const FALLBACK_EXPIRES_IN: i64 = 3600;

/// Longest lifetime honored from a token response (ten years).
pub const MAX_EXPIRES_IN: i64 = 10 * 365 * 24 * 3600;

/// Credentials issued together by one token response.
///
/// `id_token` is the bearer credential for data calls. The set is only valid
/// as a unit: a refresh replaces every field.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenSet {
    pub id_token: String,
    pub refresh_token: String,
    #[serde(default)]
    pub access_token: String,
    /// Nominal lifetime of `id_token` in seconds.
    pub expires_in: i64,
    /// Local time the set was received; anchors `expires_in`.
    #[serde(default = "Utc::now")]
    pub issued_at: DateTime<Utc>,
}

impl std::fmt::Debug for TokenSet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenSet")
            .field("id_token", &format_args!("<{} bytes>", self.id_token.len()))
            .field(
                "refresh_token",
                &format_args!("<{} bytes>", self.refresh_token.len()),
            )
            .field(
                "access_token",
                &format_args!("<{} bytes>", self.access_token.len()),
            )
            .field("expires_in", &self.expires_in)
            .field("issued_at", &self.issued_at)
            .finish()
    }
}

impl TokenSet {
    pub fn expires_at(&self) -> DateTime<Utc> {
        let lifetime = Duration::seconds(self.expires_in.clamp(0, MAX_EXPIRES_IN));
        self.issued_at
            .checked_add_signed(lifetime)
            .unwrap_or(DateTime::<Utc>::MAX_UTC)
    }

    pub fn is_expired(&self) -> bool {
        Utc::now() >= self.expires_at()
    }

    /// True when the id token expires within `margin` from now.
    pub fn needs_refresh(&self, margin: Duration) -> bool {
        Utc::now()
            .checked_add_signed(margin)
            .is_none_or(|deadline| deadline >= self.expires_at())
    }
}

/// Raw token endpoint response. Every field is optional so that a 2xx body
/// missing `id_token` can be classified instead of failing to parse.
#[derive(Debug, Default, Deserialize)]
pub(crate) struct TokenResponse {
    #[serde(default)]
    pub id_token: Option<String>,
    #[serde(default)]
    pub refresh_token: Option<String>,
    #[serde(default)]
    pub access_token: Option<String>,
    #[serde(default)]
    pub expires_in: Option<i64>,
}

impl TokenResponse {
    pub fn parse(body: &str) -> Option<Self> {
        serde_json::from_str(body).ok()
    }

    /// Build a [`TokenSet`] if the response carries a non-empty `id_token`.
    ///
    /// `previous_refresh` is kept when a refresh response does not rotate the
    /// refresh token.
    pub fn into_token_set(self, previous_refresh: Option<&str>) -> Option<TokenSet> {
        let id_token = self.id_token.filter(|t| !t.is_empty())?;
        let refresh_token = self
            .refresh_token
            .filter(|t| !t.is_empty())
            .or_else(|| previous_refresh.map(str::to_string))?;
        Some(TokenSet {
            id_token,
            refresh_token,
            access_token: self.access_token.unwrap_or_default(),
            expires_in: self
                .expires_in
                .unwrap_or(FALLBACK_EXPIRES_IN)
                .clamp(0, MAX_EXPIRES_IN),
            issued_at: Utc::now(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn token(expires_in: i64, issued_at: DateTime<Utc>) -> TokenSet {
        TokenSet {
            id_token: "id".into(),
            refresh_token: "refresh".into(),
            access_token: "access".into(),
            expires_in,
            issued_at,
        }
    }

    #[test]
    fn expires_at_adds_lifetime() {
        let issued = Utc::now();
        let t = token(1_209_600, issued);
        assert_eq!(t.expires_at(), issued + Duration::days(14));
    }

    #[test]
    fn not_expired_when_fresh() {
        let t = token(3600, Utc::now());
        assert!(!t.is_expired());
        assert!(!t.needs_refresh(Duration::minutes(5)));
    }

    #[test]
    fn needs_refresh_inside_margin() {
        let t = token(3600, Utc::now() - Duration::minutes(58));
        assert!(!t.is_expired());
        assert!(t.needs_refresh(Duration::minutes(5)));
    }

    #[test]
    fn expired_when_past() {
        let t = token(60, Utc::now() - Duration::hours(1));
        assert!(t.is_expired());
    }

    #[test]
    fn parse_full_response() {
        let body = r#"{"id_token":"i","refresh_token":"r","access_token":"a","expires_in":1209600,"token_type":"Bearer"}"#;
        let set = TokenResponse::parse(body)
            .unwrap()
            .into_token_set(None)
            .unwrap();
        assert_eq!(set.id_token, "i");
        assert_eq!(set.refresh_token, "r");
        assert_eq!(set.access_token, "a");
        assert_eq!(set.expires_in, 1_209_600);
    }

    #[test]
    fn missing_id_token_yields_none() {
        let body = r#"{"refresh_token":"r","access_token":"a","expires_in":10}"#;
        assert!(TokenResponse::parse(body)
            .unwrap()
            .into_token_set(None)
            .is_none());
        let empty = r#"{"id_token":"","refresh_token":"r"}"#;
        assert!(TokenResponse::parse(empty)
            .unwrap()
            .into_token_set(None)
            .is_none());
    }

    #[test]
    fn refresh_without_rotation_keeps_previous_refresh_token() {
        let body = r#"{"id_token":"i2","expires_in":10}"#;
        let set = TokenResponse::parse(body)
            .unwrap()
            .into_token_set(Some("r1"))
            .unwrap();
        assert_eq!(set.refresh_token, "r1");
        assert!(TokenResponse::parse(body)
            .unwrap()
            .into_token_set(None)
            .is_none());
    }

    #[test]
    fn missing_expires_in_uses_fallback() {
        let body = r#"{"id_token":"i","refresh_token":"r"}"#;
        let set = TokenResponse::parse(body)
            .unwrap()
            .into_token_set(None)
            .unwrap();
        assert_eq!(set.expires_in, FALLBACK_EXPIRES_IN);
    }

    #[test]
    fn oversized_lifetime_is_clamped() {
        let body = format!(r#"{{"id_token":"i","refresh_token":"r","expires_in":{}}}"#, i64::MAX);
        let set = TokenResponse::parse(&body)
            .unwrap()
            .into_token_set(None)
            .unwrap();
        assert_eq!(set.expires_in, MAX_EXPIRES_IN);
        assert!(!set.needs_refresh(Duration::hours(1)));
    }

    #[test]
    fn expiry_math_never_overflows() {
        let t = token(i64::MAX, Utc::now());
        assert!(t.expires_at() > Utc::now());
        assert!(!t.is_expired());
        assert!(!t.needs_refresh(Duration::hours(1)));

        let far = token(MAX_EXPIRES_IN, DateTime::<Utc>::MAX_UTC - Duration::days(1));
        assert_eq!(far.expires_at(), DateTime::<Utc>::MAX_UTC);

        let negative = token(-5, Utc::now());
        assert!(negative.is_expired());
    }

    #[test]
    fn non_json_body_does_not_parse() {
        assert!(TokenResponse::parse("<html>oops</html>").is_none());
    }

    #[test]
    fn serialization_roundtrip_keeps_issue_time() {
        let t = token(100, Utc::now());
        let json = serde_json::to_string(&t).unwrap();
        let back: TokenSet = serde_json::from_str(&json).unwrap();
        assert_eq!(back, t);
    }

    #[test]
    fn debug_hides_secrets() {
        let t = TokenSet {
            id_token: "eyJsecret".into(),
            refresh_token: "rt-secret".into(),
            access_token: "at-secret".into(),
            expires_in: 1,
            issued_at: Utc::now(),
        };
        let shown = format!("{t:?}");
        assert!(!shown.contains("secret"));
        assert!(shown.contains("9 bytes"));
    }
}
