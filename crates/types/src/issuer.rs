//! Issuer records and their activation state.

use crate::identity::Principal;
use crate::time::Timestamp;
use serde::{Deserialize, Serialize};

/// Issuance gate of an issuer. Both transitions are legal and idempotent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IssuerStatus {
    Active,
    Inactive,
}

impl IssuerStatus {
    pub fn from_active(active: bool) -> Self {
        if active {
            IssuerStatus::Active
        } else {
            IssuerStatus::Inactive
        }
    }

    pub fn is_active(&self) -> bool {
        matches!(self, IssuerStatus::Active)
    }
}

/// Organization authorized to mint certificates under its authority identity.
///
/// Never deleted. Deactivation only closes the issuance gate; the
/// authority keeps its right to revoke what it already issued.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Issuer {
    /// Identity that issues and revokes on this issuer's behalf. Immutable.
    pub authority: Principal,
    /// Short display name (non-empty)
    pub name: String,
    /// Free-form description
    pub details: String,
    pub status: IssuerStatus,
    /// Set by the registry clock at registration
    pub registration_date: Timestamp,
    /// Audit counter, never used for authorization
    pub total_issued: u64,
}

impl Issuer {
    /// A freshly registered issuer: active, nothing issued yet.
    pub fn new(
        authority: Principal,
        name: String,
        details: String,
        registration_date: Timestamp,
    ) -> Self {
        Self {
            authority,
            name,
            details,
            status: IssuerStatus::Active,
            registration_date,
            total_issued: 0,
        }
    }

    pub fn is_active(&self) -> bool {
        self.status.is_active()
    }

    pub fn set_active(&mut self, active: bool) {
        self.status = IssuerStatus::from_active(active);
    }

    /// Whether `principal` may issue under this issuer right now.
    pub fn is_active_authority(&self, principal: &Principal) -> bool {
        self.authority == *principal && self.is_active()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_toggle_is_idempotent() {
        let mut issuer = Issuer::new(Principal::new([1; 32]), "Uni".into(), String::new(), 10);
        assert!(issuer.is_active());
        issuer.set_active(false);
        issuer.set_active(false);
        assert_eq!(issuer.status, IssuerStatus::Inactive);
        issuer.set_active(true);
        assert!(issuer.is_active());
    }

    #[test]
    fn active_authority_requires_both_identity_and_status() {
        let authority = Principal::new([1; 32]);
        let mut issuer = Issuer::new(authority, "Uni".into(), String::new(), 10);
        assert!(issuer.is_active_authority(&authority));
        assert!(!issuer.is_active_authority(&Principal::new([2; 32])));
        issuer.set_active(false);
        assert!(!issuer.is_active_authority(&authority));
    }
}
