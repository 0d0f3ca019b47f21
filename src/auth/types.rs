use serde::{Deserialize, Serialize};

/// JWT claims issued by the identity provider
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AuthClaims {
    pub sub: String, // Caller auth_id
    pub exp: usize,  // Expiration timestamp (standard JWT claim)
    pub iat: usize,  // Issued at timestamp (standard JWT claim)
}

/// Authenticated caller, inserted into request extensions by `require_auth`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthUser {
    pub auth_id: String,
}
