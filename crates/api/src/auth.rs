//! Caller identification and admin credential validation.
//!
//! Requests identify themselves through headers: `x-admin-key` for staff,
//! `x-partner-id` for delivery partners, and `x-customer-id` /
//! `x-customer-email` for account holders. Validating those identities
//! against an upstream session system is out of scope here; the one
//! credential this crate checks itself is the admin key.

use axum::http::HeaderMap;
use domain::booking::{CustomerId, PartnerId};

use crate::error::ApiError;

/// Validates admin credentials.
///
/// Injected so handlers never read process-global secrets directly.
pub trait CredentialStore: Send + Sync {
    /// Returns true if the submitted key grants admin access.
    fn is_admin_key(&self, key: &str) -> bool;
}

/// Credential store backed by a single key loaded at startup.
pub struct StaticCredentialStore {
    admin_key: String,
}

impl StaticCredentialStore {
    /// Creates a store accepting the given admin key.
    pub fn new(admin_key: impl Into<String>) -> Self {
        Self {
            admin_key: admin_key.into(),
        }
    }
}

impl CredentialStore for StaticCredentialStore {
    fn is_admin_key(&self, key: &str) -> bool {
        !self.admin_key.is_empty() && key == self.admin_key
    }
}

/// The caller class a request resolved to.
#[derive(Debug, Clone)]
pub enum Actor {
    /// Staff member holding a valid admin key.
    Admin,
    /// Registered customer.
    Customer {
        id: CustomerId,
        email: Option<String>,
    },
    /// Delivery partner.
    Partner { id: PartnerId },
    /// No identifying headers at all.
    Guest,
}

impl Actor {
    /// Returns true for admin callers.
    pub fn is_admin(&self) -> bool {
        matches!(self, Actor::Admin)
    }

    /// Requires an admin caller.
    pub fn require_admin(&self) -> Result<(), ApiError> {
        match self {
            Actor::Admin => Ok(()),
            Actor::Guest => Err(ApiError::Unauthorized("admin key required".to_string())),
            _ => Err(ApiError::Forbidden("admin access required".to_string())),
        }
    }

    /// Requires a partner caller and returns its id.
    pub fn require_partner(&self) -> Result<PartnerId, ApiError> {
        match self {
            Actor::Partner { id } => Ok(*id),
            Actor::Guest => Err(ApiError::Unauthorized("partner id required".to_string())),
            _ => Err(ApiError::Forbidden("partner access required".to_string())),
        }
    }

    /// Requires a customer caller and returns its id and email.
    pub fn require_customer(&self) -> Result<(CustomerId, Option<&str>), ApiError> {
        match self {
            Actor::Customer { id, email } => Ok((*id, email.as_deref())),
            Actor::Guest => Err(ApiError::Unauthorized("customer id required".to_string())),
            _ => Err(ApiError::Forbidden("customer access required".to_string())),
        }
    }
}

/// Resolves the calling actor from request headers.
///
/// An admin key takes precedence, then a partner id, then a customer id.
/// A present-but-invalid credential is rejected rather than downgraded.
pub fn actor_from_headers(
    credentials: &dyn CredentialStore,
    headers: &HeaderMap,
) -> Result<Actor, ApiError> {
    if let Some(key) = header_str(headers, "x-admin-key") {
        if credentials.is_admin_key(key) {
            return Ok(Actor::Admin);
        }
        return Err(ApiError::Unauthorized("invalid admin key".to_string()));
    }

    if let Some(id) = header_str(headers, "x-partner-id") {
        let uuid = uuid::Uuid::parse_str(id)
            .map_err(|e| ApiError::Unauthorized(format!("invalid partner id: {e}")))?;
        return Ok(Actor::Partner {
            id: PartnerId::from_uuid(uuid),
        });
    }

    if let Some(id) = header_str(headers, "x-customer-id") {
        let uuid = uuid::Uuid::parse_str(id)
            .map_err(|e| ApiError::Unauthorized(format!("invalid customer id: {e}")))?;
        return Ok(Actor::Customer {
            id: CustomerId::from_uuid(uuid),
            email: header_str(headers, "x-customer-email").map(String::from),
        });
    }

    Ok(Actor::Guest)
}

fn header_str<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers.get(name).and_then(|v| v.to_str().ok())
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    fn store() -> StaticCredentialStore {
        StaticCredentialStore::new("secret_key")
    }

    #[test]
    fn test_no_headers_is_guest() {
        let actor = actor_from_headers(&store(), &HeaderMap::new()).unwrap();
        assert!(matches!(actor, Actor::Guest));
    }

    #[test]
    fn test_valid_admin_key() {
        let mut headers = HeaderMap::new();
        headers.insert("x-admin-key", HeaderValue::from_static("secret_key"));
        let actor = actor_from_headers(&store(), &headers).unwrap();
        assert!(actor.is_admin());
    }

    #[test]
    fn test_invalid_admin_key_rejected() {
        let mut headers = HeaderMap::new();
        headers.insert("x-admin-key", HeaderValue::from_static("wrong"));
        assert!(actor_from_headers(&store(), &headers).is_err());
    }

    #[test]
    fn test_empty_configured_key_never_matches() {
        let store = StaticCredentialStore::new("");
        let mut headers = HeaderMap::new();
        headers.insert("x-admin-key", HeaderValue::from_static(""));
        assert!(actor_from_headers(&store, &headers).is_err());
    }

    #[test]
    fn test_partner_header() {
        let partner = PartnerId::new();
        let mut headers = HeaderMap::new();
        headers.insert(
            "x-partner-id",
            HeaderValue::from_str(&partner.to_string()).unwrap(),
        );
        let actor = actor_from_headers(&store(), &headers).unwrap();
        assert_eq!(actor.require_partner().unwrap(), partner);
    }

    #[test]
    fn test_malformed_partner_id_rejected() {
        let mut headers = HeaderMap::new();
        headers.insert("x-partner-id", HeaderValue::from_static("not-a-uuid"));
        assert!(actor_from_headers(&store(), &headers).is_err());
    }

    #[test]
    fn test_customer_with_email() {
        let customer = CustomerId::new();
        let mut headers = HeaderMap::new();
        headers.insert(
            "x-customer-id",
            HeaderValue::from_str(&customer.to_string()).unwrap(),
        );
        headers.insert(
            "x-customer-email",
            HeaderValue::from_static("ada@example.com"),
        );
        let actor = actor_from_headers(&store(), &headers).unwrap();
        let (id, email) = actor.require_customer().unwrap();
        assert_eq!(id, customer);
        assert_eq!(email, Some("ada@example.com"));
    }

    #[test]
    fn test_wrong_actor_is_forbidden() {
        let actor = Actor::Partner { id: PartnerId::new() };
        assert!(matches!(
            actor.require_admin(),
            Err(ApiError::Forbidden(_))
        ));
        assert!(matches!(
            Actor::Guest.require_admin(),
            Err(ApiError::Unauthorized(_))
        ));
    }
}
