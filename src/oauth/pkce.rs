use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use sha2::{Digest, Sha256};

/// Random bytes drawn for each verifier.
const VERIFIER_BYTES: usize = 32;

/// A verifier/challenge pair for one login attempt. Never reused.
pub struct PkceChallenge {
    pub code_verifier: String,
    pub code_challenge: String,
}

impl std::fmt::Debug for PkceChallenge {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PkceChallenge")
            .field("code_verifier", &"<redacted>")
            .field("code_challenge", &self.code_challenge)
            .finish()
    }
}

pub fn generate_pkce() -> PkceChallenge {
    let mut buf = [0u8; VERIFIER_BYTES];
    rand::Rng::fill_bytes(&mut rand::rng(), &mut buf);
    let code_verifier = URL_SAFE_NO_PAD.encode(buf);
    let code_challenge = challenge_for(&code_verifier);

    PkceChallenge {
        code_verifier,
        code_challenge,
    }
}

/// S256 transform: `BASE64URL(SHA256(verifier))` without padding.
pub fn challenge_for(verifier: &str) -> String {
    URL_SAFE_NO_PAD.encode(Sha256::digest(verifier.as_bytes()))
}
