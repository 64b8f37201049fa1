//! Stateless session tokens.
//!
//! A token is an HS256 signed JWT carrying the account id (`sub`), the username and the
//! role of the account it was issued for. Nothing is stored server side: verification only
//! needs the signing secret, so every protected request re-verifies the token it carries
//! and a token stays valid until it expires.
use chrono::{DateTime, Duration, TimeZone, Utc};
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};

use crate::error::{ServiceError, ServiceResult};
use crate::models::{Account, Role, Session};

#[derive(Debug, PartialEq, Serialize, Deserialize)]
struct SessionClaims {
    sub: String,
    usr: String,
    role: String,
    iat: i64,
    exp: i64,
}

/// Issues and verifies session tokens with a shared secret.
#[derive(Clone)]
pub struct TokenIssuer {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    validation: Validation,
    lifetime: Duration,
}

impl TokenIssuer {
    pub fn new(secret: &[u8], lifetime: Duration) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 0;

        Self {
            encoding_key: EncodingKey::from_secret(secret),
            decoding_key: DecodingKey::from_secret(secret),
            validation,
            lifetime,
        }
    }

    /// Create a token for `account` that expires after the configured lifetime.
    pub fn issue(&self, account: &Account) -> ServiceResult<String> {
        self.issue_at(account, Utc::now())
    }

    pub fn issue_at(&self, account: &Account, now: DateTime<Utc>) -> ServiceResult<String> {
        let claims = SessionClaims {
            sub: account.id.to_string(),
            usr: account.username.clone(),
            role: account.role.as_str().to_owned(),
            iat: now.timestamp(),
            exp: (now + self.lifetime).timestamp(),
        };

        encode(&Header::new(Algorithm::HS256), &claims, &self.encoding_key)
            .map_err(|err| ServiceError::InternalServerError(err.to_string()))
    }

    /// Check signature and expiry of `token` and return the identity it carries.
    pub fn verify(&self, token: &str) -> ServiceResult<Session> {
        let data = decode::<SessionClaims>(token, &self.decoding_key, &self.validation).map_err(
            |err| match err.kind() {
                ErrorKind::ExpiredSignature => ServiceError::Unauthorized("Session expired"),
                _ => ServiceError::Unauthorized("Invalid session token"),
            },
        )?;
        let claims = data.claims;

        let account_id = claims
            .sub
            .parse::<u64>()
            .map_err(|_| ServiceError::Unauthorized("Invalid session token"))?;
        let role =
            Role::parse(&claims.role).ok_or(ServiceError::Unauthorized("Invalid session token"))?;
        let valid_until = Utc
            .timestamp_opt(claims.exp, 0)
            .single()
            .ok_or(ServiceError::Unauthorized("Invalid session token"))?;

        Ok(Session {
            account_id,
            username: claims.usr,
            role,
            valid_until,
        })
    }
}

/// Fails with `Forbidden` if the session does not have the `required` role.
pub fn authorize(session: &Session, required: Role) -> ServiceResult<()> {
    if session.role == required {
        Ok(())
    } else {
        Err(ServiceError::Forbidden)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn account(role: Role) -> Account {
        Account {
            id: 42,
            name: "Jane".to_owned(),
            last_name: "Doe".to_owned(),
            email: "jane@example.org".to_owned(),
            username: "jane".to_owned(),
            password_hash: vec![],
            password_salt: String::new(),
            role,
        }
    }

    fn issuer() -> TokenIssuer {
        TokenIssuer::new(b"test-secret-test-secret", Duration::minutes(60))
    }

    #[test]
    fn test_issue_and_verify() {
        let issuer = issuer();
        let now = Utc::now();
        let token = issuer.issue_at(&account(Role::Admin), now).unwrap();

        let session = issuer.verify(&token).unwrap();
        assert_eq!(session.account_id, 42);
        assert_eq!(session.username, "jane");
        assert_eq!(session.role, Role::Admin);
        assert_eq!(
            session.valid_until.timestamp(),
            (now + Duration::minutes(60)).timestamp()
        );
    }

    #[test]
    fn test_expired_token_is_rejected() {
        let issuer = issuer();
        let token = issuer
            .issue_at(&account(Role::User), Utc::now() - Duration::minutes(61))
            .unwrap();

        assert_eq!(
            issuer.verify(&token),
            Err(ServiceError::Unauthorized("Session expired"))
        );
    }

    #[test]
    fn test_foreign_signature_is_rejected() {
        let other = TokenIssuer::new(b"another-secret-another", Duration::minutes(60));
        let token = other.issue(&account(Role::Admin)).unwrap();

        assert_eq!(
            issuer().verify(&token),
            Err(ServiceError::Unauthorized("Invalid session token"))
        );
    }

    #[test]
    fn test_malformed_token_is_rejected() {
        assert_eq!(
            issuer().verify("not-a-token"),
            Err(ServiceError::Unauthorized("Invalid session token"))
        );
        assert_eq!(
            issuer().verify(""),
            Err(ServiceError::Unauthorized("Invalid session token"))
        );
    }

    #[test]
    fn test_tampered_payload_is_rejected() {
        let issuer = issuer();
        let token = issuer.issue(&account(Role::User)).unwrap();
        let forged = issuer.issue(&account(Role::Admin)).unwrap();

        // payload of the admin token, signature of the user token
        let mut parts: Vec<&str> = token.split('.').collect();
        let forged_parts: Vec<&str> = forged.split('.').collect();
        parts[1] = forged_parts[1];

        assert!(issuer.verify(&parts.join(".")).is_err());
    }

    #[test]
    fn test_authorize() {
        let session = issuer()
            .verify(&issuer().issue(&account(Role::User)).unwrap())
            .unwrap();

        assert_eq!(authorize(&session, Role::User), Ok(()));
        assert_eq!(
            authorize(&session, Role::Admin),
            Err(ServiceError::Forbidden)
        );
    }
}
