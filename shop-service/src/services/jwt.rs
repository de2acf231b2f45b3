use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use secrecy::ExposeSecret;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::config::JwtConfig;

const ACCESS: &str = "access";
const REFRESH: &str = "refresh";

/// JWT service for token generation and validation
#[derive(Clone)]
pub struct JwtService {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    access_token_expiry_minutes: i64,
    refresh_token_expiry_days: i64,
}

/// Claims carried by both token kinds; `token_use` tells them apart.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenClaims {
    /// Subject (user ID)
    pub sub: String,
    pub username: String,
    /// "access" or "refresh"
    pub token_use: String,
    pub exp: i64,
    pub iat: i64,
    pub jti: String,
}

impl TokenClaims {
    pub fn user_id(&self) -> Result<Uuid, anyhow::Error> {
        Uuid::parse_str(&self.sub).map_err(|_| anyhow::anyhow!("Token subject is not a user id"))
    }
}

/// Token pair returned from the obtain endpoint.
#[derive(Debug, Serialize)]
pub struct TokenPair {
    pub access: String,
    pub refresh: String,
}

impl JwtService {
    pub fn new(config: &JwtConfig) -> Result<Self, anyhow::Error> {
        let secret = config.secret.expose_secret().as_bytes();
        if secret.len() < 32 {
            return Err(anyhow::anyhow!("JWT secret must be at least 32 bytes long"));
        }

        Ok(Self {
            encoding_key: EncodingKey::from_secret(secret),
            decoding_key: DecodingKey::from_secret(secret),
            access_token_expiry_minutes: config.access_token_expiry_minutes,
            refresh_token_expiry_days: config.refresh_token_expiry_days,
        })
    }

    fn issue(
        &self,
        user_id: Uuid,
        username: &str,
        token_use: &str,
        ttl: Duration,
    ) -> Result<String, anyhow::Error> {
        let now = Utc::now();
        let claims = TokenClaims {
            sub: user_id.to_string(),
            username: username.to_string(),
            token_use: token_use.to_string(),
            exp: (now + ttl).timestamp(),
            iat: now.timestamp(),
            jti: Uuid::new_v4().to_string(),
        };

        encode(&Header::new(Algorithm::HS256), &claims, &self.encoding_key)
            .map_err(|e| anyhow::anyhow!("Failed to encode {} token: {}", token_use, e))
    }

    pub fn generate_access_token(
        &self,
        user_id: Uuid,
        username: &str,
    ) -> Result<String, anyhow::Error> {
        self.issue(
            user_id,
            username,
            ACCESS,
            Duration::minutes(self.access_token_expiry_minutes),
        )
    }

    pub fn generate_token_pair(
        &self,
        user_id: Uuid,
        username: &str,
    ) -> Result<TokenPair, anyhow::Error> {
        Ok(TokenPair {
            access: self.generate_access_token(user_id, username)?,
            refresh: self.issue(
                user_id,
                username,
                REFRESH,
                Duration::days(self.refresh_token_expiry_days),
            )?,
        })
    }

    fn validate(&self, token: &str, expected_use: &str) -> Result<TokenClaims, anyhow::Error> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.validate_exp = true;

        let claims = decode::<TokenClaims>(token, &self.decoding_key, &validation)
            .map_err(|e| anyhow::anyhow!("Invalid {} token: {}", expected_use, e))?
            .claims;

        if claims.token_use != expected_use {
            return Err(anyhow::anyhow!(
                "Expected {} token, got {} token",
                expected_use,
                claims.token_use
            ));
        }

        Ok(claims)
    }

    pub fn validate_access_token(&self, token: &str) -> Result<TokenClaims, anyhow::Error> {
        self.validate(token, ACCESS)
    }

    pub fn validate_refresh_token(&self, token: &str) -> Result<TokenClaims, anyhow::Error> {
        self.validate(token, REFRESH)
    }
}
