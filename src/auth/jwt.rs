use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::auth::role::Role;

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Claims {
    pub sub: Uuid,
    pub cid: Uuid,
    pub email: String,
    pub role: Role,
    pub exp: i64,
}

impl Claims {
    pub fn new(user_id: Uuid, company_id: Uuid, email: String, role: Role, ttl_minutes: i64) -> Self {
        Self {
            sub: user_id,
            cid: company_id,
            email,
            role,
            exp: (Utc::now() + Duration::minutes(ttl_minutes)).timestamp(),
        }
    }
}

pub fn encode_token(claims: &Claims, secret: &str) -> Result<String, String> {
    encode(
        &Header::default(),
        claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
    .map_err(|e| format!("JWT encode failed: {e}"))
}

pub fn decode_token(token: &str, secret: &str) -> Result<Claims, String> {
    decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &Validation::default(),
    )
    .map(|data| data.claims)
    .map_err(|e| format!("JWT decode failed: {e}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    const SECRET: &str = "unit-test-secret-that-is-long-enough";

    #[test]
    fn decodes_what_it_encodes() {
        let user_id = Uuid::now_v7();
        let company_id = Uuid::now_v7();
        let claims = Claims::new(user_id, company_id, "a@b.c".to_string(), Role::Manager, 15);
        let token = encode_token(&claims, SECRET).unwrap();

        let decoded = decode_token(&token, SECRET).unwrap();
        assert_eq!(decoded.sub, user_id);
        assert_eq!(decoded.cid, company_id);
        assert_eq!(decoded.role, Role::Manager);
    }

    #[test]
    fn rejects_wrong_secret() {
        let claims = Claims::new(Uuid::now_v7(), Uuid::now_v7(), "a@b.c".to_string(), Role::User, 15);
        let token = encode_token(&claims, SECRET).unwrap();
        assert!(decode_token(&token, "another-secret-that-is-long-enough!").is_err());
    }

    #[test]
    fn rejects_expired_token() {
        let claims = Claims::new(Uuid::now_v7(), Uuid::now_v7(), "a@b.c".to_string(), Role::User, -10);
        let token = encode_token(&claims, SECRET).unwrap();
        assert!(decode_token(&token, SECRET).is_err());
    }
}
