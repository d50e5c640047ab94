//! Certificate registry state machine
//!
//! Admins register issuers and toggle their activation. Active issuers mint
//! certificates under their own authority and may revoke what they minted.
//! Anyone can verify a certificate from its id.
//!
//! Each command validates everything against the store first and then
//! commits one [`WriteBatch`]: it either applies whole or fails with no
//! effect. Commands take `&mut self`, so mutations are applied one at a time.

use crate::access;
use crate::clock::{Clock, SystemClock};
use crate::config::RegistryConfig;
use crate::errors::{RegistryError, Result};
use certreg_storage::{MemoryStore, RegistryMeta, RegistryStore, WriteBatch};
use certreg_types::{
    Certificate, CertificateId, CertificateStatus, EventRecord, Expiry, Issuer, Principal,
    RegistryEvent, Timestamp, Verification,
};
use tracing::{debug, info, warn};

/// Certificate registry over a store `S` and a clock `C`
pub struct CertificateRegistry<S: RegistryStore = MemoryStore, C: Clock = SystemClock> {
    store: S,
    clock: C,
    config: RegistryConfig,
}

fn rejected(operation: &'static str, err: RegistryError) -> RegistryError {
    warn!(operation, kind = %err.kind(), "{err}");
    err
}

impl CertificateRegistry<MemoryStore, SystemClock> {
    /// In-memory registry on the wall clock with default limits
    pub fn in_memory(admin: Principal) -> Result<Self> {
        Self::genesis(
            admin,
            MemoryStore::new(),
            SystemClock,
            RegistryConfig::default(),
        )
    }
}

impl<S: RegistryStore, C: Clock> CertificateRegistry<S, C> {
    /// Initialize an empty registry in `store` with `admin` holding the admin role.
    pub fn genesis(admin: Principal, store: S, clock: C, config: RegistryConfig) -> Result<Self> {
        if admin.is_null() {
            return Err(RegistryError::invalid("genesis admin must not be null"));
        }
        if store.load_meta()?.is_some() {
            return Err(RegistryError::AlreadyInitialized);
        }

        let registry = Self {
            store,
            clock,
            config,
        };

        let mut batch = WriteBatch::new();
        batch.put_admin(admin);
        let event = RegistryEvent::AdminGranted {
            principal: admin,
            granted_by: admin,
            timestamp: registry.clock.now(),
        };
        registry.commit(batch, RegistryMeta::default(), event)?;

        info!(%admin, "Registry initialized");
        Ok(registry)
    }

    /// Resume a registry previously initialized in `store`.
    pub fn open(store: S, clock: C, config: RegistryConfig) -> Result<Self> {
        if store.load_meta()?.is_none() {
            return Err(RegistryError::NotInitialized);
        }
        Ok(Self {
            store,
            clock,
            config,
        })
    }

    pub fn config(&self) -> &RegistryConfig {
        &self.config
    }

    pub fn clock(&self) -> &C {
        &self.clock
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    fn meta(&self) -> Result<RegistryMeta> {
        self.store.load_meta()?.ok_or(RegistryError::NotInitialized)
    }

    /// Journal `event`, write the updated counters, and commit everything at once.
    fn commit(
        &self,
        mut batch: WriteBatch,
        mut meta: RegistryMeta,
        event: RegistryEvent,
    ) -> Result<()> {
        batch.append_event(EventRecord {
            sequence: meta.next_event_sequence,
            event,
        });
        meta.next_event_sequence += 1;
        batch.put_meta(meta);
        self.store.commit(batch)?;
        Ok(())
    }

    // ---------------------------------------------------------------------
    // Role management
    // ---------------------------------------------------------------------

    /// Grant the admin role to `principal`
    pub fn grant_admin(&mut self, caller: &Principal, principal: Principal) -> Result<()> {
        self.try_grant_admin(caller, principal)
            .map_err(|e| rejected("grant_admin", e))
    }

    fn try_grant_admin(&mut self, caller: &Principal, principal: Principal) -> Result<()> {
        access::require_admin(&self.store, caller)?;
        if principal.is_null() {
            return Err(RegistryError::invalid("admin must not be null"));
        }
        if self.store.is_admin(&principal)? {
            return Err(RegistryError::AdminAlreadyExists { principal });
        }

        let meta = self.meta()?;
        let mut batch = WriteBatch::new();
        batch.put_admin(principal);
        let event = RegistryEvent::AdminGranted {
            principal,
            granted_by: *caller,
            timestamp: self.clock.now(),
        };
        self.commit(batch, meta, event)?;

        info!(%principal, granted_by = %caller, "Admin granted");
        Ok(())
    }

    /// Remove the admin role from `principal`. The last admin cannot be removed.
    pub fn revoke_admin(&mut self, caller: &Principal, principal: Principal) -> Result<()> {
        self.try_revoke_admin(caller, principal)
            .map_err(|e| rejected("revoke_admin", e))
    }

    fn try_revoke_admin(&mut self, caller: &Principal, principal: Principal) -> Result<()> {
        access::require_admin(&self.store, caller)?;
        if !self.store.is_admin(&principal)? {
            return Err(RegistryError::AdminNotFound { principal });
        }
        if self.store.admins()?.len() <= 1 {
            return Err(RegistryError::LastAdmin { principal });
        }

        let meta = self.meta()?;
        let mut batch = WriteBatch::new();
        batch.delete_admin(principal);
        let event = RegistryEvent::AdminRevoked {
            principal,
            revoked_by: *caller,
            timestamp: self.clock.now(),
        };
        self.commit(batch, meta, event)?;

        info!(%principal, revoked_by = %caller, "Admin revoked");
        Ok(())
    }

    // ---------------------------------------------------------------------
    // Issuer lifecycle
    // ---------------------------------------------------------------------

    /// Register a new issuer controlled by `authority`. Admin only.
    pub fn register_issuer(
        &mut self,
        caller: &Principal,
        authority: Principal,
        name: impl Into<String>,
        details: impl Into<String>,
    ) -> Result<Issuer> {
        self.try_register_issuer(caller, authority, name.into(), details.into())
            .map_err(|e| rejected("register_issuer", e))
    }

    fn try_register_issuer(
        &mut self,
        caller: &Principal,
        authority: Principal,
        name: String,
        details: String,
    ) -> Result<Issuer> {
        access::require_admin(&self.store, caller)?;

        if self.store.get_issuer(&authority)?.is_some() {
            return Err(RegistryError::IssuerAlreadyExists { authority });
        }
        if authority.is_null() {
            return Err(RegistryError::invalid("issuer authority must not be null"));
        }
        if name.is_empty() || name.len() > self.config.max_name_len {
            return Err(RegistryError::invalid(format!(
                "issuer name must be 1..={} bytes, got {}",
                self.config.max_name_len,
                name.len()
            )));
        }
        if details.len() > self.config.max_details_len {
            return Err(RegistryError::invalid(format!(
                "issuer details exceed {} bytes",
                self.config.max_details_len
            )));
        }

        let now = self.clock.now();
        let issuer = Issuer::new(authority, name, details, now);

        let mut meta = self.meta()?;
        meta.total_issuers += 1;
        let mut batch = WriteBatch::new();
        batch.put_issuer(issuer.clone());
        let event = RegistryEvent::IssuerRegistered {
            authority,
            name: issuer.name.clone(),
            timestamp: now,
        };
        self.commit(batch, meta, event)?;

        info!(%authority, name = %issuer.name, "Issuer registered");
        Ok(issuer)
    }

    /// Set an issuer's activation flag. Admin only; idempotent.
    ///
    /// Only future issuance is affected. Certificates already issued keep
    /// their state.
    pub fn update_issuer_status(
        &mut self,
        caller: &Principal,
        authority: &Principal,
        active: bool,
    ) -> Result<Issuer> {
        self.try_update_issuer_status(caller, authority, active)
            .map_err(|e| rejected("update_issuer_status", e))
    }

    fn try_update_issuer_status(
        &mut self,
        caller: &Principal,
        authority: &Principal,
        active: bool,
    ) -> Result<Issuer> {
        access::require_admin(&self.store, caller)?;

        let mut issuer = self
            .store
            .get_issuer(authority)?
            .ok_or(RegistryError::IssuerNotFound {
                authority: *authority,
            })?;
        issuer.set_active(active);

        let meta = self.meta()?;
        let mut batch = WriteBatch::new();
        batch.put_issuer(issuer.clone());
        let event = RegistryEvent::IssuerStatusUpdated {
            authority: *authority,
            active,
            timestamp: self.clock.now(),
        };
        self.commit(batch, meta, event)?;

        info!(%authority, active, "Issuer status updated");
        Ok(issuer)
    }

    // ---------------------------------------------------------------------
    // Certificates
    // ---------------------------------------------------------------------

    /// Mint a certificate under the caller's own issuer.
    ///
    /// `expiry_date` is unix seconds, `0` for no expiry. The issue date is
    /// taken from the registry clock.
    pub fn issue_certificate(
        &mut self,
        caller: &Principal,
        id: CertificateId,
        recipient: Principal,
        expiry_date: Timestamp,
        metadata_uri: impl Into<String>,
    ) -> Result<Certificate> {
        self.try_issue_certificate(caller, id, recipient, expiry_date, metadata_uri.into())
            .map_err(|e| rejected("issue_certificate", e))
    }

    fn try_issue_certificate(
        &mut self,
        caller: &Principal,
        id: CertificateId,
        recipient: Principal,
        expiry_date: Timestamp,
        metadata_uri: String,
    ) -> Result<Certificate> {
        let mut issuer = access::require_active_issuer(&self.store, caller)?;

        if id.is_empty() || id.len() > self.config.max_certificate_id_len {
            return Err(RegistryError::invalid(format!(
                "certificate id must be 1..={} bytes, got {}",
                self.config.max_certificate_id_len,
                id.len()
            )));
        }
        if self.store.get_certificate(&id)?.is_some() {
            return Err(RegistryError::CertificateAlreadyExists { id });
        }
        if recipient.is_null() {
            return Err(RegistryError::invalid("recipient must not be null"));
        }

        let now = self.clock.now();
        let expiry =
            Expiry::from_unix(expiry_date).map_err(|e| RegistryError::invalid(e.to_string()))?;
        if self.config.reject_past_expiry && expiry.is_expired_at(now) {
            return Err(RegistryError::invalid(format!(
                "expiry date {expiry_date} is not after the current time {now}"
            )));
        }
        if metadata_uri.len() > self.config.max_metadata_uri_len {
            return Err(RegistryError::invalid(format!(
                "metadata URI exceeds {} bytes",
                self.config.max_metadata_uri_len
            )));
        }

        let certificate = Certificate {
            id: id.clone(),
            issuer: issuer.authority,
            recipient,
            issue_date: now,
            expiry,
            status: CertificateStatus::Valid,
            metadata_uri,
        };

        let mut meta = self.meta()?;
        let ordinal = meta.total_certificates;
        meta.total_certificates += 1;
        issuer.total_issued += 1;

        let mut batch = WriteBatch::new();
        batch
            .put_certificate(certificate.clone())
            .put_issuer(issuer)
            .append_issuer_index(*caller, ordinal, id.clone())
            .append_recipient_index(recipient, ordinal, id.clone());
        let event = RegistryEvent::CertificateIssued {
            id: id.clone(),
            issuer: *caller,
            recipient,
            issue_date: now,
            metadata_uri: certificate.metadata_uri.clone(),
        };
        self.commit(batch, meta, event)?;

        info!(%id, issuer = %caller, %recipient, "Certificate issued");
        Ok(certificate)
    }

    /// Revoke a certificate. Only its issuing authority may do so, active or not.
    /// Revocation is one-way: a second call fails with `AlreadyRevoked`.
    pub fn revoke_certificate(
        &mut self,
        caller: &Principal,
        id: &CertificateId,
    ) -> Result<Certificate> {
        self.try_revoke_certificate(caller, id)
            .map_err(|e| rejected("revoke_certificate", e))
    }

    fn try_revoke_certificate(
        &mut self,
        caller: &Principal,
        id: &CertificateId,
    ) -> Result<Certificate> {
        let mut certificate = self.load_certificate(id)?;
        access::require_issuing_authority(&certificate, caller)?;
        certificate
            .status
            .revoke()
            .map_err(|_| RegistryError::AlreadyRevoked { id: id.clone() })?;

        let meta = self.meta()?;
        let mut batch = WriteBatch::new();
        batch.put_certificate(certificate.clone());
        let event = RegistryEvent::CertificateRevoked {
            id: id.clone(),
            issuer: certificate.issuer,
            timestamp: self.clock.now(),
        };
        self.commit(batch, meta, event)?;

        info!(%id, issuer = %caller, "Certificate revoked");
        Ok(certificate)
    }

    // ---------------------------------------------------------------------
    // Queries
    // ---------------------------------------------------------------------

    fn load_certificate(&self, id: &CertificateId) -> Result<Certificate> {
        self.store
            .get_certificate(id)?
            .ok_or_else(|| RegistryError::CertificateNotFound { id: id.clone() })
    }

    /// Verify `id` against the registry clock.
    pub fn verify_certificate(&self, id: &CertificateId) -> Result<Verification> {
        self.verify_certificate_at(id, self.clock.now())
    }

    /// Verify `id` against an explicit reference time.
    ///
    /// Unknown ids are an error, not an invalid verdict, so callers can tell
    /// "never issued" from "issued but no longer valid".
    pub fn verify_certificate_at(&self, id: &CertificateId, now: Timestamp) -> Result<Verification> {
        let verification = self.load_certificate(id)?.verify_at(now);
        debug!(%id, now, is_valid = verification.is_valid, "Certificate verified");
        Ok(verification)
    }

    pub fn get_certificate(&self, id: &CertificateId) -> Result<Certificate> {
        self.load_certificate(id)
    }

    pub fn get_issuer_info(&self, authority: &Principal) -> Result<Issuer> {
        self.store
            .get_issuer(authority)?
            .ok_or(RegistryError::IssuerNotFound {
                authority: *authority,
            })
    }

    /// Ids issued by `authority`, oldest first. Empty if none.
    pub fn get_certificates_by_issuer(&self, authority: &Principal) -> Result<Vec<CertificateId>> {
        Ok(self.store.issuer_index(authority)?)
    }

    /// Ids received by `recipient`, oldest first. Empty if none.
    pub fn get_certificates_by_recipient(
        &self,
        recipient: &Principal,
    ) -> Result<Vec<CertificateId>> {
        Ok(self.store.recipient_index(recipient)?)
    }

    pub fn get_total_certificates(&self) -> Result<u64> {
        Ok(self.meta()?.total_certificates)
    }

    pub fn get_total_issuers(&self) -> Result<u64> {
        Ok(self.meta()?.total_issuers)
    }

    pub fn is_admin(&self, principal: &Principal) -> Result<bool> {
        access::is_admin(&self.store, principal)
    }

    pub fn is_active_issuer_authority(&self, principal: &Principal) -> Result<bool> {
        access::is_active_issuer_authority(&self.store, principal)
    }

    pub fn admins(&self) -> Result<Vec<Principal>> {
        Ok(self.store.admins()?)
    }

    /// Journal entries with sequence >= `since`, oldest first
    pub fn events_since(&self, since: u64) -> Result<Vec<EventRecord>> {
        Ok(self.store.events_since(since)?)
    }
}
