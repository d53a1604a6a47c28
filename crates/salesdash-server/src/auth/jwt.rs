use std::collections::BTreeSet;

use anyhow::{anyhow, Result};
use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};

use salesdash_core::filter::AccessScope;

pub const ADMIN_ROLE: &str = "admin";

/// Token claims. Allow-lists restrict what a non-admin caller may see.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,
    pub role: String,
    pub exp: i64,
    pub iat: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub business_areas: Option<BTreeSet<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub channels: Option<BTreeSet<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub brands: Option<BTreeSet<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub customers: Option<BTreeSet<String>>,
}

impl Claims {
    pub fn new(sub: impl Into<String>, role: impl Into<String>, valid_for: Duration) -> Self {
        let now = Utc::now();
        Self {
            sub: sub.into(),
            role: role.into(),
            exp: (now + valid_for).timestamp(),
            iat: now.timestamp(),
            ..Self::default()
        }
    }

    pub fn is_admin(&self) -> bool {
        self.role == ADMIN_ROLE
    }

    /// Admins see everything; everyone else gets exactly their listed scopes.
    pub fn scope(&self) -> AccessScope {
        if self.is_admin() {
            return AccessScope::unrestricted();
        }
        AccessScope {
            business_areas: self.business_areas.clone(),
            channels: self.channels.clone(),
            brands: self.brands.clone(),
            customers: self.customers.clone(),
        }
    }
}

/// Encode an HS256 token.
pub fn encode_jwt(secret: &str, claims: &Claims) -> Result<String> {
    encode(
        &Header::default(),
        claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
    .map_err(|e| anyhow!("encode_jwt: {}", e))
}

/// Decode and validate a JWT token.
pub fn decode_jwt(token: &str, secret: &str) -> Result<Claims> {
    let data = decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &Validation::default(),
    )
    .map_err(|e| anyhow!("decode_jwt: {}", e))?;

    Ok(data.claims)
}
