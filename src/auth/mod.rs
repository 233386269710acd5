//! Session tokens and role authorization.
//!
//! Tokens are stateless HS256 JWTs carrying identity and display fields,
//! valid for a fixed 7 days. The signing secret is injected at construction;
//! nothing in this module reads ambient environment state.

use anyhow::{bail, Result};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};

/// Session lifetime. There is no refresh mechanism; expiry forces re-login.
pub const TOKEN_TTL_DAYS: i64 = 7;

/// The three roles the system knows. Any other value is rejected at the
/// store boundary and at token verification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(rename_all = "lowercase")]
pub enum Role {
    Admin,
    Staff,
    Member,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Admin => "admin",
            Role::Staff => "staff",
            Role::Member => "member",
        }
    }

    pub fn parse(s: &str) -> Option<Role> {
        match s {
            "admin" => Some(Role::Admin),
            "staff" => Some(Role::Staff),
            "member" => Some(Role::Member),
            _ => None,
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Identity carried by a verified session token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionUser {
    pub user_id: String,
    pub email: String,
    pub role: Role,
    pub first_name: String,
    pub photo: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
struct Claims {
    sub: String,
    email: String,
    role: Role,
    first_name: String,
    photo: Option<String>,
    iat: i64,
    exp: i64,
}

/// Issues and verifies session tokens with a process-wide secret.
#[derive(Clone)]
pub struct TokenService {
    encoding: EncodingKey,
    decoding: DecodingKey,
    ttl_seconds: i64,
}

impl TokenService {
    pub fn new(secret: &str) -> Result<Self> {
        if secret.trim().is_empty() {
            bail!("signing secret must not be empty");
        }
        Ok(Self {
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
            ttl_seconds: TOKEN_TTL_DAYS * 24 * 60 * 60,
        })
    }

    #[cfg(test)]
    fn with_ttl(secret: &str, ttl_seconds: i64) -> Self {
        let mut svc = Self::new(secret).unwrap();
        svc.ttl_seconds = ttl_seconds;
        svc
    }

    /// Sign a token for a logged-in user.
    pub fn issue(&self, user: &SessionUser) -> Result<String> {
        let now = chrono::Utc::now().timestamp();
        let claims = Claims {
            sub: user.user_id.clone(),
            email: user.email.clone(),
            role: user.role,
            first_name: user.first_name.clone(),
            photo: user.photo.clone(),
            iat: now,
            exp: now + self.ttl_seconds,
        };
        Ok(encode(&Header::default(), &claims, &self.encoding)?)
    }

    /// Verify a token and return the identity it proves. Any failure (bad
    /// signature, malformed payload, expired, unknown role) is `None`;
    /// callers treat it the same as an absent token.
    pub fn verify(&self, token: &str) -> Option<SessionUser> {
        let mut validation = Validation::default();
        validation.leeway = 0;

        let data = decode::<Claims>(token, &self.decoding, &validation).ok()?;
        let claims = data.claims;

        Some(SessionUser {
            user_id: claims.sub,
            email: claims.email,
            role: claims.role,
            first_name: claims.first_name,
            photo: claims.photo,
        })
    }
}

/// Pure role gate: ok iff the user's role is in the allowed set. Handlers
/// performing privileged mutations call this (or its store-backed variant in
/// the api layer) before touching state.
pub fn authorize(user: &SessionUser, allowed: &[Role]) -> bool {
    allowed.contains(&user.role)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_user() -> SessionUser {
        SessionUser {
            user_id: "5b2b64a1-9a3f-4a87-b62f-0d9a0e3c51f7".to_string(),
            email: "amina@example.org".to_string(),
            role: Role::Member,
            first_name: "Amina".to_string(),
            photo: Some("1700000000000-amina.png".to_string()),
        }
    }

    #[test]
    fn test_empty_secret_rejected() {
        assert!(TokenService::new("").is_err());
        assert!(TokenService::new("   ").is_err());
    }

    #[test]
    fn test_issue_verify_round_trip() {
        let svc = TokenService::new("test-secret").unwrap();
        let user = sample_user();
        let token = svc.issue(&user).unwrap();
        assert_eq!(svc.verify(&token), Some(user));
    }

    #[test]
    fn test_tampered_token_invalid() {
        let svc = TokenService::new("test-secret").unwrap();
        let token = svc.issue(&sample_user()).unwrap();

        // Flip one character anywhere in the signed string.
        let mut bytes = token.into_bytes();
        let mid = bytes.len() / 2;
        bytes[mid] = if bytes[mid] == b'a' { b'b' } else { b'a' };
        let tampered = String::from_utf8(bytes).unwrap();

        assert_eq!(svc.verify(&tampered), None);
    }

    #[test]
    fn test_wrong_secret_invalid() {
        let issuer = TokenService::new("secret-one").unwrap();
        let verifier = TokenService::new("secret-two").unwrap();
        let token = issuer.issue(&sample_user()).unwrap();
        assert_eq!(verifier.verify(&token), None);
    }

    #[test]
    fn test_expired_token_invalid() {
        let svc = TokenService::with_ttl("test-secret", -1);
        let token = svc.issue(&sample_user()).unwrap();
        assert_eq!(svc.verify(&token), None);
    }

    #[test]
    fn test_unexpired_token_valid() {
        // Six days of the seven-day window remaining.
        let svc = TokenService::with_ttl("test-secret", 6 * 24 * 60 * 60);
        let token = svc.issue(&sample_user()).unwrap();
        assert!(svc.verify(&token).is_some());
    }

    #[test]
    fn test_garbage_token_invalid() {
        let svc = TokenService::new("test-secret").unwrap();
        assert_eq!(svc.verify("not-a-token"), None);
        assert_eq!(svc.verify(""), None);
    }

    #[test]
    fn test_authorize_is_pure() {
        let user = sample_user();
        let allowed = [Role::Staff, Role::Admin];
        // Repeated calls with the same inputs agree and mutate nothing.
        for _ in 0..3 {
            assert!(!authorize(&user, &allowed));
        }
        assert!(authorize(&user, &[Role::Member]));
        assert_eq!(user.role, Role::Member);
    }

    #[test]
    fn test_role_parse() {
        assert_eq!(Role::parse("admin"), Some(Role::Admin));
        assert_eq!(Role::parse("staff"), Some(Role::Staff));
        assert_eq!(Role::parse("member"), Some(Role::Member));
        assert_eq!(Role::parse("root"), None);
        assert_eq!(Role::parse("Admin"), None);
    }
}
