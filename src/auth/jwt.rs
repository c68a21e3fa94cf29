use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use std::time::{SystemTime, UNIX_EPOCH};
use anyhow::Result;
use uuid::Uuid;

/// Claims as minted by the external authentication service; this core
/// only ever verifies them, never issues them in production. `sub` is
/// the caller's `Identity::id`, `role` one of the `IdentityRole`
/// variants in snake_case.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Claims {
    pub sub: String,
    pub exp: usize,
    pub role: String,
}

pub struct JwtManager {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    expiration_seconds: u64,
}

impl JwtManager {
    pub fn new(secret: &str, expiration_seconds: u64) -> Self {
        Self {
            encoding_key: EncodingKey::from_secret(secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
            expiration_seconds,
        }
    }

    /// Only used by tests and local tooling; the real token issuer is
    /// the external authentication service.
    pub fn generate_token(&self, identity_id: Uuid, role: &str) -> Result<String> {
        let now = SystemTime::now().duration_since(UNIX_EPOCH)?.as_secs() as usize;
        let expiration = now + self.expiration_seconds as usize;

        let claims = Claims {
            sub: identity_id.to_string(),
            exp: expiration,
            role: role.to_string(),
        };

        let token = encode(&Header::default(), &claims, &self.encoding_key)?;
        Ok(token)
    }

    pub fn validate_token(&self, token: &str) -> Result<Claims> {
        let token_data = decode::<Claims>(
            token,
            &self.decoding_key,
            &Validation::default(),
        )?;
        Ok(token_data.claims)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_a_token_through_generate_and_validate() {
        let manager = JwtManager::new("test-secret", 3600);
        let id = Uuid::new_v4();
        let token = manager.generate_token(id, "editor").unwrap();

        let claims = manager.validate_token(&token).unwrap();
        assert_eq!(claims.sub, id.to_string());
        assert_eq!(claims.role, "editor");
    }

    #[test]
    fn rejects_a_token_signed_with_a_different_secret() {
        let signer = JwtManager::new("secret-a", 3600);
        let verifier = JwtManager::new("secret-b", 3600);
        let token = signer.generate_token(Uuid::new_v4(), "viewer").unwrap();
        assert!(verifier.validate_token(&token).is_err());
    }
}
