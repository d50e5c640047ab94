//! Certificate records, revocation state, and the verification verdict.

use crate::identity::{CertificateId, Principal};
use crate::time::{Expiry, Timestamp};
use serde::{Deserialize, Serialize};

/// Returned when a revoked certificate is revoked again.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("certificate already revoked")]
pub struct AlreadyRevoked;

/// Revocation state. `Valid -> Revoked` is the only transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CertificateStatus {
    Valid,
    Revoked,
}

impl CertificateStatus {
    pub fn is_revoked(&self) -> bool {
        matches!(self, CertificateStatus::Revoked)
    }

    /// Apply the one-way revocation transition.
    pub fn revoke(&mut self) -> Result<(), AlreadyRevoked> {
        match self {
            CertificateStatus::Valid => {
                *self = CertificateStatus::Revoked;
                Ok(())
            }
            CertificateStatus::Revoked => Err(AlreadyRevoked),
        }
    }
}

/// A verifiable claim about a recipient, minted by an issuer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Certificate {
    pub id: CertificateId,
    /// Authority of the issuer that minted it
    pub issuer: Principal,
    pub recipient: Principal,
    /// Captured by the registry clock, never caller-supplied
    pub issue_date: Timestamp,
    pub expiry: Expiry,
    pub status: CertificateStatus,
    /// Opaque locator for off-registry content, stored verbatim
    pub metadata_uri: String,
}

impl Certificate {
    pub fn is_revoked(&self) -> bool {
        self.status.is_revoked()
    }

    /// Validity at `now`: not revoked and not past expiry.
    pub fn is_valid_at(&self, now: Timestamp) -> bool {
        !self.is_revoked() && !self.expiry.is_expired_at(now)
    }

    /// Build the verification verdict for reference time `now`.
    pub fn verify_at(&self, now: Timestamp) -> Verification {
        Verification {
            is_valid: self.is_valid_at(now),
            issuer: self.issuer,
            recipient: self.recipient,
            issue_date: self.issue_date,
            expiry_date: self.expiry.as_unix(),
            revoked: self.is_revoked(),
            metadata_uri: self.metadata_uri.clone(),
        }
    }
}

/// Result of verifying a certificate. `expiry_date` is `0` when it never expires.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Verification {
    pub is_valid: bool,
    pub issuer: Principal,
    pub recipient: Principal,
    pub issue_date: Timestamp,
    pub expiry_date: Timestamp,
    pub revoked: bool,
    pub metadata_uri: String,
}
