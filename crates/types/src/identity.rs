use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;
use std::str::FromStr;

/// Errors that can occur when parsing a principal identity string.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum IdentityError {
    #[error("principal must be {expected} hex characters, got {actual}")]
    InvalidLength { expected: usize, actual: usize },
    #[error("principal is not valid hexadecimal")]
    InvalidHex(#[from] hex::FromHexError),
}

/// Number of raw bytes contained in a principal identity.
pub const PRINCIPAL_BYTES: usize = 32;
/// Expected string length of an encoded principal (64 hex chars, no prefix).
pub const PRINCIPAL_STRING_LENGTH: usize = PRINCIPAL_BYTES * 2;

/// Opaque, externally authenticated identity (admin, issuer authority, recipient).
///
/// The registry only compares principals for equality. Authenticity is
/// established by the host before a call reaches the registry.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Principal([u8; PRINCIPAL_BYTES]);

impl Principal {
    /// The null identity. Never a valid recipient or authority.
    pub const NULL: Principal = Principal([0u8; PRINCIPAL_BYTES]);

    /// Create from byte array
    pub const fn new(bytes: [u8; PRINCIPAL_BYTES]) -> Self {
        Self(bytes)
    }

    /// Get as byte array
    pub fn as_bytes(&self) -> &[u8; PRINCIPAL_BYTES] {
        &self.0
    }

    /// Whether this is the all-zero null identity.
    pub fn is_null(&self) -> bool {
        self.0 == [0u8; PRINCIPAL_BYTES]
    }

    /// Lowercase hex encoding without prefix.
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }
}

impl FromStr for Principal {
    type Err = IdentityError;

    /// Accepts 64 hex characters, optionally prefixed with `0x`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let payload = s.strip_prefix("0x").unwrap_or(s);
        if payload.len() != PRINCIPAL_STRING_LENGTH {
            return Err(IdentityError::InvalidLength {
                expected: PRINCIPAL_STRING_LENGTH,
                actual: payload.len(),
            });
        }

        let mut bytes = [0u8; PRINCIPAL_BYTES];
        hex::decode_to_slice(payload, &mut bytes)?;
        Ok(Self(bytes))
    }
}

impl TryFrom<String> for Principal {
    type Error = IdentityError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Principal> for String {
    fn from(value: Principal) -> Self {
        value.to_hex()
    }
}

impl fmt::Display for Principal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl fmt::Debug for Principal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Principal({})", self.to_hex())
    }
}

/// Globally unique certificate identifier.
///
/// Either a caller-chosen string or the hex SHA-256 of the certificate
/// content. Uniqueness across logically different claims is the caller's
/// responsibility; content hashes make collisions practically impossible.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CertificateId(String);

impl CertificateId {
    /// Create a certificate id from a caller-chosen string
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Derive the content-hash id: lowercase hex SHA-256 of `content`.
    pub fn from_content(content: &[u8]) -> Self {
        Self(hex::encode(Sha256::digest(content)))
    }

    /// Get the id as string
    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl From<&str> for CertificateId {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<String> for CertificateId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl fmt::Display for CertificateId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
