//! JWT access token minting and verification.

use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation, decode, encode};
use rand::distr::Alphanumeric;
use rand::{Rng, rng};

use super::{AuthConfig, AuthError};
use crate::models::auth::{DecodedToken, TokenClaims};

/// Length of generated token identifiers.
const TOKEN_ID_LEN: usize = 48;

/// Generate a cryptographically random token identifier (`jti`).
pub fn generate_token_id() -> String {
    rng()
        .sample_iter(&Alphanumeric)
        .take(TOKEN_ID_LEN)
        .map(char::from)
        .collect()
}

/// Signs and verifies access tokens. Pure: never touches the database.
#[derive(Clone)]
pub struct TokenCodec {
    header: Header,
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    validation: Validation,
}

impl TokenCodec {
    pub fn new(config: &AuthConfig) -> Self {
        let mut validation = Validation::new(config.algorithm());
        validation.validate_exp = true;
        validation.leeway = 0;
        validation.set_required_spec_claims(&["exp", "sub"]);
        Self {
            header: Header::new(config.algorithm()),
            encoding_key: EncodingKey::from_secret(config.secret()),
            decoding_key: DecodingKey::from_secret(config.secret()),
            validation,
        }
    }

    /// Mint a signed token for `subject` carrying `token_id`, valid for `ttl`.
    ///
    /// The returned expiry is whole-second precision and equals the `exp` claim.
    pub fn mint(
        &self,
        subject: i64,
        token_id: &str,
        ttl: Duration,
    ) -> Result<(String, DateTime<Utc>), AuthError> {
        let now = Utc::now();
        let exp = now
            .checked_add_signed(ttl)
            .ok_or_else(|| AuthError::Internal(format!("token lifetime out of range: {ttl}")))?
            .timestamp();
        let expires_at = DateTime::from_timestamp(exp, 0)
            .ok_or_else(|| AuthError::Internal(format!("token expiry out of range: {exp}")))?;
        let claims = TokenClaims {
            sub: subject.to_string(),
            jti: token_id.to_string(),
            exp,
            iat: now.timestamp(),
        };
        let token = encode(&self.header, &claims, &self.encoding_key)
            .map_err(|e| AuthError::Internal(format!("jwt encode: {e}")))?;
        Ok((token, expires_at))
    }

    /// Verify signature, shape and expiry of `token`.
    pub fn decode(&self, token: &str) -> Result<DecodedToken, AuthError> {
        let claims = decode::<TokenClaims>(token, &self.decoding_key, &self.validation)
            .map_err(|_| AuthError::InvalidToken)?
            .claims;
        let subject = claims
            .sub
            .parse::<i64>()
            .map_err(|_| AuthError::InvalidToken)?;
        if claims.jti.is_empty() {
            return Err(AuthError::InvalidToken);
        }
        let expires_at = DateTime::from_timestamp(claims.exp, 0).ok_or(AuthError::InvalidToken)?;
        Ok(DecodedToken {
            subject,
            token_id: claims.jti,
            expires_at,
        })
    }
}

#[cfg(test)]
mod tests {
    use jsonwebtoken::Algorithm;

    use super::*;

    fn codec(secret: &str) -> TokenCodec {
        TokenCodec::new(&AuthConfig::new(secret, Algorithm::HS256, Duration::minutes(30)).unwrap())
    }

    #[test]
    fn mint_then_decode_preserves_subject_and_token_id() {
        let codec = codec("test-secret");
        let before = Utc::now();
        let (token, expires_at) = codec.mint(123, "test_jti", Duration::minutes(5)).unwrap();

        let decoded = codec.decode(&token).unwrap();
        assert_eq!(decoded.subject, 123);
        assert_eq!(decoded.token_id, "test_jti");
        assert_eq!(decoded.expires_at, expires_at);
        assert!(expires_at <= before + Duration::minutes(5) + Duration::seconds(1));
        assert!(expires_at > before + Duration::minutes(4));
    }

    #[test]
    fn foreign_secret_is_rejected() {
        let (token, _) = codec("one").mint(1, "jti", Duration::minutes(5)).unwrap();
        assert!(matches!(codec("two").decode(&token), Err(AuthError::InvalidToken)));
    }

    #[test]
    fn expired_token_is_rejected() {
        let codec = codec("test-secret");
        let (token, _) = codec.mint(1, "jti", Duration::seconds(-5)).unwrap();
        assert!(matches!(codec.decode(&token), Err(AuthError::InvalidToken)));
    }

    #[test]
    fn tampered_and_garbage_tokens_are_rejected() {
        let codec = codec("test-secret");
        let (token, _) = codec.mint(1, "jti", Duration::minutes(5)).unwrap();
        let (other, _) = codec.mint(2, "jti", Duration::minutes(5)).unwrap();
        // Payload of `other` under the signature of `token`.
        let original: Vec<&str> = token.split('.').collect();
        let swapped: Vec<&str> = other.split('.').collect();
        let spliced = format!("{}.{}.{}", original[0], swapped[1], original[2]);
        assert!(matches!(codec.decode(&spliced), Err(AuthError::InvalidToken)));
        assert!(matches!(codec.decode("not.a.jwt"), Err(AuthError::InvalidToken)));
        assert!(matches!(codec.decode(""), Err(AuthError::InvalidToken)));
    }

    #[test]
    fn algorithm_mismatch_is_rejected() {
        let hs512 = TokenCodec::new(
            &AuthConfig::new("test-secret", Algorithm::HS512, Duration::minutes(5)).unwrap(),
        );
        let (token, _) = hs512.mint(1, "jti", Duration::minutes(5)).unwrap();
        assert!(matches!(codec("test-secret").decode(&token), Err(AuthError::InvalidToken)));
    }

    #[test]
    fn mint_reports_expiry_beyond_calendar_range() {
        let codec = codec("test-secret");
        let ttl = Duration::try_days(100_000_000).unwrap();
        assert!(matches!(
            codec.mint(1, "jti", ttl),
            Err(AuthError::Internal(_))
        ));
    }

    #[test]
    fn token_ids_are_random() {
        let a = generate_token_id();
        let b = generate_token_id();
        assert_eq!(a.len(), TOKEN_ID_LEN);
        assert_ne!(a, b);
    }
}
