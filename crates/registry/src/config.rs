use serde::{Deserialize, Serialize};

/// Input limits and issuance policy
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RegistryConfig {
    /// Maximum issuer name length in bytes
    pub max_name_len: usize,
    /// Maximum issuer details length in bytes
    pub max_details_len: usize,
    /// Maximum certificate id length in bytes
    pub max_certificate_id_len: usize,
    /// Maximum metadata locator length in bytes
    pub max_metadata_uri_len: usize,
    /// Reject non-zero expiry dates that are not in the future at issuance
    pub reject_past_expiry: bool,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            max_name_len: 100,
            max_details_len: 500,
            max_certificate_id_len: 64,
            max_metadata_uri_len: 200,
            reject_past_expiry: true,
        }
    }
}
