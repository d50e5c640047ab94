//! Authorization predicates
//!
//! Every check reads the store afresh; no decision is cached between calls.

use crate::errors::{RegistryError, Result};
use certreg_storage::RegistryStore;
use certreg_types::{Certificate, Issuer, Principal};

/// True iff `principal` holds the admin role.
pub fn is_admin<S: RegistryStore>(store: &S, principal: &Principal) -> Result<bool> {
    Ok(store.is_admin(principal)?)
}

/// True iff `principal` is the authority of a registered, active issuer.
pub fn is_active_issuer_authority<S: RegistryStore>(
    store: &S,
    principal: &Principal,
) -> Result<bool> {
    Ok(store
        .get_issuer(principal)?
        .is_some_and(|issuer| issuer.is_active_authority(principal)))
}

pub fn require_admin<S: RegistryStore>(store: &S, caller: &Principal) -> Result<()> {
    if is_admin(store, caller)? {
        Ok(())
    } else {
        Err(RegistryError::NotAdmin { caller: *caller })
    }
}

/// Resolve the caller's own issuer record and require it to be active.
///
/// The issuer is always looked up by the caller's identity, never taken
/// from an argument.
pub fn require_active_issuer<S: RegistryStore>(store: &S, caller: &Principal) -> Result<Issuer> {
    let issuer = store
        .get_issuer(caller)?
        .ok_or(RegistryError::NotAnIssuer { caller: *caller })?;

    if !issuer.is_active_authority(caller) {
        return Err(RegistryError::IssuerInactive { caller: *caller });
    }

    Ok(issuer)
}

/// Revocation right: the caller must be the authority that issued `certificate`.
/// The issuer's current activation state does not matter.
pub fn require_issuing_authority(certificate: &Certificate, caller: &Principal) -> Result<()> {
    if certificate.issuer == *caller {
        Ok(())
    } else {
        Err(RegistryError::NotIssuingAuthority {
            caller: *caller,
            id: certificate.id.clone(),
        })
    }
}
