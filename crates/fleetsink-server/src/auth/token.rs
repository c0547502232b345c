//! JWT issuance and validation.
//!
//! The same access-token validation runs for REST calls and for push
//! channel establishment, so an owner session means one thing everywhere.

use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use fleetsink_core::db::unix_timestamp;

const KIND_ACCESS: &str = "access";
const KIND_REFRESH: &str = "refresh";

/// Claims embedded in fleetsink tokens.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// JWT ID (unique per token).
    pub jti: String,
    /// Subject (account ID).
    pub sub: String,
    /// Username, for log context.
    pub username: String,
    /// Issued at (unix timestamp).
    pub iat: i64,
    /// Expiration (unix timestamp).
    pub exp: i64,
    /// Token kind: "access" or "refresh".
    pub token_kind: String,
}

impl Claims {
    pub fn is_access(&self) -> bool {
        self.token_kind == KIND_ACCESS
    }

    pub fn is_refresh(&self) -> bool {
        self.token_kind == KIND_REFRESH
    }
}

/// Signs and validates fleetsink JWTs.
#[derive(Clone)]
pub struct TokenSigner {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    access_ttl_secs: i64,
    refresh_ttl_secs: i64,
}

impl TokenSigner {
    pub fn new(secret: &[u8], access_ttl_secs: i64, refresh_ttl_secs: i64) -> Self {
        Self {
            encoding_key: EncodingKey::from_secret(secret),
            decoding_key: DecodingKey::from_secret(secret),
            access_ttl_secs,
            refresh_ttl_secs,
        }
    }

    /// Issue an access token. Returns the token and its TTL in seconds.
    pub fn issue_access(
        &self,
        account_id: &str,
        username: &str,
    ) -> Result<(String, i64), jsonwebtoken::errors::Error> {
        let token = self.issue(account_id, username, KIND_ACCESS, self.access_ttl_secs)?;
        Ok((token, self.access_ttl_secs))
    }

    /// Issue a refresh token. Returns the token and its absolute expiry.
    pub fn issue_refresh(
        &self,
        account_id: &str,
        username: &str,
    ) -> Result<(String, i64), jsonwebtoken::errors::Error> {
        let exp = unix_timestamp() + self.refresh_ttl_secs;
        let token = self.issue(account_id, username, KIND_REFRESH, self.refresh_ttl_secs)?;
        Ok((token, exp))
    }

    fn issue(
        &self,
        account_id: &str,
        username: &str,
        kind: &str,
        ttl_secs: i64,
    ) -> Result<String, jsonwebtoken::errors::Error> {
        let now = unix_timestamp();
        let claims = Claims {
            jti: uuid::Uuid::new_v4().to_string(),
            sub: account_id.to_string(),
            username: username.to_string(),
            iat: now,
            exp: now + ttl_secs,
            token_kind: kind.to_string(),
        };

        jsonwebtoken::encode(&Header::default(), &claims, &self.encoding_key)
    }

    /// Validate a token and return its claims.
    pub fn validate(&self, token: &str) -> Result<Claims, jsonwebtoken::errors::Error> {
        let data =
            jsonwebtoken::decode::<Claims>(token, &self.decoding_key, &Validation::default())?;
        Ok(data.claims)
    }

    /// Hash a token for storage (raw refresh tokens never hit the database).
    pub fn hash_token(token: &str) -> String {
        let mut hasher = Sha256::new();
        hasher.update(token.as_bytes());
        format!("{:x}", hasher.finalize())
    }
}

#[cfg(test)]
#[allow(clippy::panic, clippy::expect_used, clippy::unwrap_used)]
mod tests {
    use super::*;

    fn signer() -> TokenSigner {
        TokenSigner::new(b"test-secret-key-for-testing", 3600, 86400)
    }

    #[test]
    fn access_token_round_trip() {
        let signer = signer();
        let (token, ttl) = signer.issue_access("a1", "alice").unwrap();
        assert_eq!(ttl, 3600);

        let claims = signer.validate(&token).unwrap();
        assert_eq!(claims.sub, "a1");
        assert_eq!(claims.username, "alice");
        assert!(claims.is_access());
        assert!(!claims.is_refresh());
    }

    #[test]
    fn refresh_token_round_trip() {
        let signer = signer();
        let (token, exp) = signer.issue_refresh("a1", "alice").unwrap();
        assert!(exp > unix_timestamp());

        let claims = signer.validate(&token).unwrap();
        assert!(claims.is_refresh());
    }

    #[test]
    fn garbage_token_rejected() {
        assert!(signer().validate("not-a-valid-token").is_err());
    }

    #[test]
    fn wrong_secret_rejected() {
        let other = TokenSigner::new(b"different-secret", 3600, 86400);
        let (token, _) = signer().issue_access("a1", "alice").unwrap();
        assert!(other.validate(&token).is_err());
    }

    #[test]
    fn token_hash_is_deterministic() {
        let h1 = TokenSigner::hash_token("same-token");
        let h2 = TokenSigner::hash_token("same-token");
        assert_eq!(h1, h2);
        assert_ne!(h1, TokenSigner::hash_token("different-token"));
    }
}
