use crate::error::{AppError, AppResult};
use chrono::{Duration, Utc};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};

pub const ROLE_USER: &str = "user";
pub const ROLE_ADMIN: &str = "admin";

/// Claims of tokens issued by the host application with the shared secret.
#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String, // user_id
    #[serde(default = "default_role")]
    pub role: String,
    pub exp: i64,
    pub iat: i64,
}

fn default_role() -> String {
    ROLE_USER.to_string()
}

#[derive(Clone)]
pub struct JwtService {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    access_token_expires_in: i64,
}

impl JwtService {
    pub fn new(secret: &str, access_expires_in: i64) -> Self {
        Self {
            encoding_key: EncodingKey::from_secret(secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
            access_token_expires_in: access_expires_in,
        }
    }

    /// Mints a token the middleware accepts. The gateway never calls this
    /// itself; host applications sharing the secret use it to issue tokens
    /// valid for `jwt.access_token_expires_in` seconds.
    pub fn generate_access_token(&self, user_id: i64, role: &str) -> AppResult<String> {
        let now = Utc::now();
        let exp = now + Duration::seconds(self.access_token_expires_in);

        let claims = Claims {
            sub: user_id.to_string(),
            role: role.to_string(),
            exp: exp.timestamp(),
            iat: now.timestamp(),
        };

        encode(&Header::default(), &claims, &self.encoding_key).map_err(AppError::JwtError)
    }

    pub fn verify_access_token(&self, token: &str) -> AppResult<Claims> {
        let validation = Validation::new(Algorithm::HS256);
        let claims = decode::<Claims>(token, &self.decoding_key, &validation)
            .map(|data| data.claims)
            .map_err(AppError::JwtError)?;

        if claims.sub.parse::<i64>().is_err() {
            return Err(AppError::AuthError("Invalid token subject".to_string()));
        }

        Ok(claims)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_issued_token_lifetime_follows_config() {
        let jwt = JwtService::new("secret", 7200);
        let token = jwt.generate_access_token(9, ROLE_USER).unwrap();
        let claims = jwt.verify_access_token(&token).unwrap();
        assert_eq!(claims.exp - claims.iat, 7200);
        assert_eq!(claims.role, ROLE_USER);
    }

    #[test]
    fn test_access_token_round_trip() {
        let jwt = JwtService::new("secret", 3600);
        let token = jwt.generate_access_token(42, ROLE_ADMIN).unwrap();
        let claims = jwt.verify_access_token(&token).unwrap();
        assert_eq!(claims.sub, "42");
        assert_eq!(claims.role, ROLE_ADMIN);
    }

    #[test]
    fn test_rejects_token_signed_with_other_secret() {
        let issuer = JwtService::new("other", 3600);
        let token = issuer.generate_access_token(42, ROLE_USER).unwrap();
        let jwt = JwtService::new("secret", 3600);
        assert!(jwt.verify_access_token(&token).is_err());
    }

    #[test]
    fn test_rejects_expired_token() {
        let jwt = JwtService::new("secret", -3600);
        let token = jwt.generate_access_token(42, ROLE_USER).unwrap();
        assert!(jwt.verify_access_token(&token).is_err());
    }
}
