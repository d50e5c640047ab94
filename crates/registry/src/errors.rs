//! Error types for the certificate registry

use certreg_types::{CertificateId, Principal};
use serde::Serialize;
use std::fmt;
use thiserror::Error;

/// Every failed command leaves the registry exactly as it was.
#[derive(Error, Debug)]
pub enum RegistryError {
    #[error("Unauthorized: {caller} is not an admin")]
    NotAdmin { caller: Principal },

    #[error("Unauthorized: {caller} is not a registered issuer")]
    NotAnIssuer { caller: Principal },

    #[error("Unauthorized: {caller} is not an active issuer")]
    IssuerInactive { caller: Principal },

    #[error("Unauthorized: {caller} is not authorized to revoke certificate {id}")]
    NotIssuingAuthority { caller: Principal, id: CertificateId },

    #[error("Issuer not found: {authority}")]
    IssuerNotFound { authority: Principal },

    #[error("Certificate does not exist: {id}")]
    CertificateNotFound { id: CertificateId },

    #[error("Admin not found: {principal}")]
    AdminNotFound { principal: Principal },

    #[error("Issuer already registered: {authority}")]
    IssuerAlreadyExists { authority: Principal },

    #[error("Certificate already exists: {id}")]
    CertificateAlreadyExists { id: CertificateId },

    #[error("Already an admin: {principal}")]
    AdminAlreadyExists { principal: Principal },

    #[error("Certificate already revoked: {id}")]
    AlreadyRevoked { id: CertificateId },

    #[error("Cannot revoke {principal}: it is the last admin")]
    LastAdmin { principal: Principal },

    #[error("Registry already initialized")]
    AlreadyInitialized,

    #[error("Registry not initialized")]
    NotInitialized,

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Registry storage error: {0}")]
    Storage(#[from] anyhow::Error),
}

/// Coarse error taxonomy for callers that map failures to user-facing messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    Unauthorized,
    NotFound,
    AlreadyExists,
    AlreadyRevoked,
    InvalidState,
    InvalidArgument,
    Storage,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ErrorKind::Unauthorized => "unauthorized",
            ErrorKind::NotFound => "not_found",
            ErrorKind::AlreadyExists => "already_exists",
            ErrorKind::AlreadyRevoked => "already_revoked",
            ErrorKind::InvalidState => "invalid_state",
            ErrorKind::InvalidArgument => "invalid_argument",
            ErrorKind::Storage => "storage",
        };
        f.write_str(s)
    }
}

impl RegistryError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            RegistryError::NotAdmin { .. }
            | RegistryError::NotAnIssuer { .. }
            | RegistryError::IssuerInactive { .. }
            | RegistryError::NotIssuingAuthority { .. } => ErrorKind::Unauthorized,
            RegistryError::IssuerNotFound { .. }
            | RegistryError::CertificateNotFound { .. }
            | RegistryError::AdminNotFound { .. }
            | RegistryError::NotInitialized => ErrorKind::NotFound,
            RegistryError::IssuerAlreadyExists { .. }
            | RegistryError::CertificateAlreadyExists { .. }
            | RegistryError::AdminAlreadyExists { .. }
            | RegistryError::AlreadyInitialized => ErrorKind::AlreadyExists,
            RegistryError::AlreadyRevoked { .. } => ErrorKind::AlreadyRevoked,
            RegistryError::LastAdmin { .. } => ErrorKind::InvalidState,
            RegistryError::InvalidArgument(_) => ErrorKind::InvalidArgument,
            RegistryError::Storage(_) => ErrorKind::Storage,
        }
    }

    pub(crate) fn invalid(msg: impl Into<String>) -> Self {
        RegistryError::InvalidArgument(msg.into())
    }
}

pub type Result<T> = std::result::Result<T, RegistryError>;
