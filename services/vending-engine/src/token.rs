//! Signed bearer tokens
//!
//! Tokens are HS256 JWTs. Expiry is carried in the claims but checked by
//! the session authority against its own clock, not by the decoder.

use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use tracing::debug;
use types::account::Role;
use types::errors::VendingError;
use types::ids::{AccountId, TokenId};

/// What a token may be used for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TokenScope {
    /// Full access for the holder of the stored session
    Session,
    /// Only ends the existing sessions of the account
    Terminate,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    pub sub: AccountId,
    pub email: String,
    pub role: Role,
    pub scope: TokenScope,
    /// Unique per issue, so two tokens minted in the same second differ
    pub jti: TokenId,
    pub iat: i64,
    pub exp: i64,
}

pub trait TokenService: Send + Sync {
    fn issue(&self, claims: &Claims) -> Result<String, VendingError>;

    /// Verify the signature and decode. Does not check expiry.
    fn decode(&self, token: &str) -> Result<Claims, VendingError>;
}

pub struct JwtTokens {
    encoding: EncodingKey,
    decoding: DecodingKey,
    validation: Validation,
}

impl JwtTokens {
    pub fn new(secret: &[u8]) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.validate_exp = false;
        Self {
            encoding: EncodingKey::from_secret(secret),
            decoding: DecodingKey::from_secret(secret),
            validation,
        }
    }
}

impl TokenService for JwtTokens {
    fn issue(&self, claims: &Claims) -> Result<String, VendingError> {
        encode(&Header::new(Algorithm::HS256), claims, &self.encoding)
            .map_err(|e| VendingError::Internal(format!("cannot sign token: {}", e)))
    }

    fn decode(&self, token: &str) -> Result<Claims, VendingError> {
        decode::<Claims>(token, &self.decoding, &self.validation)
            .map(|data| data.claims)
            .map_err(|e| {
                debug!(error = %e, "token rejected");
                VendingError::InvalidToken
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn claims(scope: TokenScope) -> Claims {
        Claims {
            sub: AccountId::new(),
            email: "a@x.io".into(),
            role: Role::Buyer,
            scope,
            jti: TokenId::new(),
            iat: 1_700_000_000,
            exp: 1_700_000_060,
        }
    }

    #[test]
    fn test_issue_then_decode() {
        let tokens = JwtTokens::new(b"test-secret");
        let original = claims(TokenScope::Session);
        let token = tokens.issue(&original).unwrap();
        assert_eq!(tokens.decode(&token).unwrap(), original);
    }

    #[test]
    fn test_expired_claims_still_decode() {
        // exp is far in the past; the authority decides what that means.
        let tokens = JwtTokens::new(b"test-secret");
        let token = tokens.issue(&claims(TokenScope::Terminate)).unwrap();
        assert_eq!(tokens.decode(&token).unwrap().scope, TokenScope::Terminate);
    }

    #[test]
    fn test_wrong_secret_rejected() {
        let token = JwtTokens::new(b"one").issue(&claims(TokenScope::Session)).unwrap();
        assert_eq!(
            JwtTokens::new(b"two").decode(&token),
            Err(VendingError::InvalidToken)
        );
    }

    #[test]
    fn test_garbage_rejected() {
        let tokens = JwtTokens::new(b"test-secret");
        assert_eq!(tokens.decode("not.a.jwt"), Err(VendingError::InvalidToken));
        assert_eq!(tokens.decode(""), Err(VendingError::InvalidToken));
    }

    #[test]
    fn test_same_second_tokens_differ() {
        let tokens = JwtTokens::new(b"test-secret");
        let a = claims(TokenScope::Session);
        let b = Claims {
            jti: TokenId::new(),
            ..a.clone()
        };
        assert_ne!(tokens.issue(&a).unwrap(), tokens.issue(&b).unwrap());
    }
}
