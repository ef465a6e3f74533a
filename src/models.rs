//! Shared API models for the marketplace backend

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Account roles as asserted by the upstream gateway
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum UserRole {
    User,
    Seller,
    Dealer,
    Admin,
}

impl UserRole {
    /// Dealers and individual sellers publish listings without review.
    pub fn is_dealer_side(&self) -> bool {
        matches!(self, UserRole::Dealer | UserRole::Seller)
    }
}

impl std::str::FromStr for UserRole {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "user" => Ok(UserRole::User),
            "seller" => Ok(UserRole::Seller),
            "dealer" => Ok(UserRole::Dealer),
            "admin" => Ok(UserRole::Admin),
            other => Err(format!("unknown role: {other}")),
        }
    }
}

/// The account issuing a command
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
pub struct Actor {
    pub id: Uuid,
    pub role: UserRole,
}

impl Actor {
    pub fn new(id: Uuid, role: UserRole) -> Self {
        Self { id, role }
    }

    /// May act on behalf of the dealership (negotiation, payment completion).
    pub fn can_deal(&self) -> bool {
        self.role.is_dealer_side() || self.role == UserRole::Admin
    }

    pub fn is_admin(&self) -> bool {
        self.role == UserRole::Admin
    }
}

/// API response wrapper
#[derive(Debug, Serialize, Deserialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub data: Option<T>,
    pub error: Option<String>,
}

impl<T> ApiResponse<T> {
    pub fn ok(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
        }
    }

    pub fn failure(error: impl Into<String>) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(error.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_role_parse() {
        assert_eq!("Dealer".parse::<UserRole>(), Ok(UserRole::Dealer));
        assert_eq!(" admin ".parse::<UserRole>(), Ok(UserRole::Admin));
        assert!("oracle".parse::<UserRole>().is_err());
    }

    #[test]
    fn test_dealing_rights() {
        let id = Uuid::new_v4();
        assert!(Actor::new(id, UserRole::Dealer).can_deal());
        assert!(Actor::new(id, UserRole::Seller).can_deal());
        assert!(Actor::new(id, UserRole::Admin).can_deal());
        assert!(!Actor::new(id, UserRole::User).can_deal());
    }
}
