//! Externally observable notifications of committed registry transitions.

use crate::identity::{CertificateId, Principal};
use crate::time::Timestamp;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RegistryEvent {
    IssuerRegistered {
        authority: Principal,
        name: String,
        timestamp: Timestamp,
    },
    IssuerStatusUpdated {
        authority: Principal,
        active: bool,
        timestamp: Timestamp,
    },
    CertificateIssued {
        id: CertificateId,
        issuer: Principal,
        recipient: Principal,
        issue_date: Timestamp,
        metadata_uri: String,
    },
    CertificateRevoked {
        id: CertificateId,
        issuer: Principal,
        timestamp: Timestamp,
    },
    AdminGranted {
        principal: Principal,
        granted_by: Principal,
        timestamp: Timestamp,
    },
    AdminRevoked {
        principal: Principal,
        revoked_by: Principal,
        timestamp: Timestamp,
    },
}

impl RegistryEvent {
    /// Time at which the transition was committed.
    pub fn timestamp(&self) -> Timestamp {
        match self {
            RegistryEvent::IssuerRegistered { timestamp, .. }
            | RegistryEvent::IssuerStatusUpdated { timestamp, .. }
            | RegistryEvent::CertificateRevoked { timestamp, .. }
            | RegistryEvent::AdminGranted { timestamp, .. }
            | RegistryEvent::AdminRevoked { timestamp, .. } => *timestamp,
            RegistryEvent::CertificateIssued { issue_date, .. } => *issue_date,
        }
    }
}

/// Journal entry: an event plus its position in the registry's history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventRecord {
    pub sequence: u64,
    pub event: RegistryEvent,
}
