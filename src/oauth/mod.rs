pub mod bootstrap;
pub mod cache;
pub mod cookies;
pub mod pkce;
pub mod refresh;
pub mod token;

pub use bootstrap::{extract_authorization_code, OAuthClient, REDIRECT_URI};
pub use cache::{cache_path, clear_token, load_cached_token, save_token, TokenStore};
pub use cookies::{extract_cookies, split_set_cookie};
pub use pkce::{generate_pkce, PkceChallenge};
pub use token::TokenSet;
