use certreg_registry::{
    Certificate, CertificateId, CertificateRegistry, ErrorKind, EventRecord, Issuer, ManualClock,
    MemoryStore, Principal, RegistryConfig, RegistryError, RegistryEvent, RegistryStore,
    SledStore,
};
use certreg_storage::{RegistryMeta, WriteBatch};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tempfile::TempDir;

const ADMIN: Principal = Principal::new([0x0a; 32]);
const ISSUER: Principal = Principal::new([0x1b; 32]);
const RECIPIENT: Principal = Principal::new([0x2c; 32]);
const OUTSIDER: Principal = Principal::new([0x3d; 32]);

fn memory_registry() -> CertificateRegistry<MemoryStore, ManualClock> {
    CertificateRegistry::genesis(
        ADMIN,
        MemoryStore::new(),
        ManualClock::new(1_700_000_000),
        RegistryConfig::default(),
    )
    .expect("genesis")
}

/// Memory store whose commits can be switched to fail, as a full disk would.
#[derive(Clone, Default)]
struct FlakyStore {
    inner: MemoryStore,
    fail_commits: Arc<AtomicBool>,
}

impl FlakyStore {
    fn set_failing(&self, failing: bool) {
        self.fail_commits.store(failing, Ordering::SeqCst);
    }
}

impl RegistryStore for FlakyStore {
    fn load_meta(&self) -> anyhow::Result<Option<RegistryMeta>> {
        self.inner.load_meta()
    }

    fn get_issuer(&self, authority: &Principal) -> anyhow::Result<Option<Issuer>> {
        self.inner.get_issuer(authority)
    }

    fn get_certificate(&self, id: &CertificateId) -> anyhow::Result<Option<Certificate>> {
        self.inner.get_certificate(id)
    }

    fn is_admin(&self, principal: &Principal) -> anyhow::Result<bool> {
        self.inner.is_admin(principal)
    }

    fn admins(&self) -> anyhow::Result<Vec<Principal>> {
        self.inner.admins()
    }

    fn issuer_index(&self, issuer: &Principal) -> anyhow::Result<Vec<CertificateId>> {
        self.inner.issuer_index(issuer)
    }

    fn recipient_index(&self, recipient: &Principal) -> anyhow::Result<Vec<CertificateId>> {
        self.inner.recipient_index(recipient)
    }

    fn events_since(&self, since: u64) -> anyhow::Result<Vec<EventRecord>> {
        self.inner.events_since(since)
    }

    fn commit(&self, batch: WriteBatch) -> anyhow::Result<()> {
        if self.fail_commits.load(Ordering::SeqCst) {
            anyhow::bail!("disk full");
        }
        self.inner.commit(batch)
    }
}

fn failing_store() -> (CertificateRegistry<FlakyStore, ManualClock>, FlakyStore) {
    let store = FlakyStore::default();
    let mut registry = CertificateRegistry::genesis(
        ADMIN,
        store.clone(),
        ManualClock::new(1_700_000_000),
        RegistryConfig::default(),
    )
    .expect("genesis");
    registry.register_issuer(&ADMIN, ISSUER, "Uni", "").unwrap();
    (registry, store)
}

#[test]
fn issue_verify_revoke_lifecycle() {
    let mut registry = memory_registry();

    registry
        .register_issuer(&ADMIN, ISSUER, "Test University", "A test educational institution")
        .unwrap();
    assert!(registry.get_issuer_info(&ISSUER).unwrap().is_active());

    let h1 = CertificateId::from_content(b"cert123");
    registry
        .issue_certificate(&ISSUER, h1.clone(), RECIPIENT, 0, "ipfs://x")
        .unwrap();

    let verdict = registry.verify_certificate(&h1).unwrap();
    assert!(verdict.is_valid);
    assert_eq!(verdict.issuer, ISSUER);
    assert_eq!(verdict.recipient, RECIPIENT);
    assert!(!verdict.revoked);
    assert_eq!(verdict.metadata_uri, "ipfs://x");
    assert_eq!(verdict.issue_date, 1_700_000_000);
    assert_eq!(verdict.expiry_date, 0);

    registry.revoke_certificate(&ISSUER, &h1).unwrap();
    let verdict = registry.verify_certificate(&h1).unwrap();
    assert!(!verdict.is_valid);
    assert!(verdict.revoked);

    let err = registry.revoke_certificate(&ISSUER, &h1).unwrap_err();
    assert!(matches!(err, RegistryError::AlreadyRevoked { .. }));
    assert_eq!(err.kind(), ErrorKind::AlreadyRevoked);
}

#[test]
fn non_admin_cannot_register_issuer() {
    let mut registry = memory_registry();
    let events_before = registry.events_since(0).unwrap();

    let err = registry
        .register_issuer(&OUTSIDER, ISSUER, "Test University", "Details")
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Unauthorized);

    assert_eq!(registry.get_total_issuers().unwrap(), 0);
    assert_eq!(registry.get_issuer_info(&ISSUER).unwrap_err().kind(), ErrorKind::NotFound);
    assert_eq!(registry.events_since(0).unwrap(), events_before);
}

#[test]
fn duplicate_certificate_leaves_state_unchanged() {
    let mut registry = memory_registry();
    registry.register_issuer(&ADMIN, ISSUER, "Uni", "").unwrap();

    let id = CertificateId::new("cert-1");
    registry
        .issue_certificate(&ISSUER, id.clone(), RECIPIENT, 0, "ipfs://test")
        .unwrap();

    let total = registry.get_total_certificates().unwrap();
    let by_issuer = registry.get_certificates_by_issuer(&ISSUER).unwrap();
    let by_recipient = registry.get_certificates_by_recipient(&RECIPIENT).unwrap();
    let issued = registry.get_issuer_info(&ISSUER).unwrap().total_issued;
    let events = registry.events_since(0).unwrap();

    // Same id from a second recipient must still collide.
    let err = registry
        .issue_certificate(&ISSUER, id.clone(), OUTSIDER, 0, "ipfs://other")
        .unwrap_err();
    assert!(matches!(err, RegistryError::CertificateAlreadyExists { .. }));

    assert_eq!(registry.get_total_certificates().unwrap(), total);
    assert_eq!(registry.get_certificates_by_issuer(&ISSUER).unwrap(), by_issuer);
    assert_eq!(registry.get_certificates_by_recipient(&RECIPIENT).unwrap(), by_recipient);
    assert!(registry.get_certificates_by_recipient(&OUTSIDER).unwrap().is_empty());
    assert_eq!(registry.get_issuer_info(&ISSUER).unwrap().total_issued, issued);
    assert_eq!(registry.events_since(0).unwrap(), events);
    assert_eq!(registry.get_certificate(&id).unwrap().metadata_uri, "ipfs://test");
}

#[test]
fn revoked_id_is_never_reused() {
    let mut registry = memory_registry();
    registry.register_issuer(&ADMIN, ISSUER, "Uni", "").unwrap();

    let id = CertificateId::new("once");
    registry
        .issue_certificate(&ISSUER, id.clone(), RECIPIENT, 0, "")
        .unwrap();
    registry.revoke_certificate(&ISSUER, &id).unwrap();

    let err = registry
        .issue_certificate(&ISSUER, id, RECIPIENT, 0, "")
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::AlreadyExists);
}

#[test]
fn inactive_issuer_cannot_issue_but_can_revoke() {
    let mut registry = memory_registry();
    registry.register_issuer(&ADMIN, ISSUER, "Uni", "").unwrap();

    let id = CertificateId::new("before-deactivation");
    registry
        .issue_certificate(&ISSUER, id.clone(), RECIPIENT, 0, "")
        .unwrap();

    registry.update_issuer_status(&ADMIN, &ISSUER, false).unwrap();
    assert!(!registry.is_active_issuer_authority(&ISSUER).unwrap());

    // Existing certificates are unaffected by deactivation.
    assert!(registry.verify_certificate(&id).unwrap().is_valid);

    let err = registry
        .issue_certificate(&ISSUER, CertificateId::new("after"), RECIPIENT, 0, "")
        .unwrap_err();
    assert!(matches!(err, RegistryError::IssuerInactive { .. }));
    assert_eq!(err.kind(), ErrorKind::Unauthorized);

    registry.revoke_certificate(&ISSUER, &id).unwrap();
    assert!(registry.verify_certificate(&id).unwrap().revoked);

    registry.update_issuer_status(&ADMIN, &ISSUER, true).unwrap();
    registry
        .issue_certificate(&ISSUER, CertificateId::new("after"), RECIPIENT, 0, "")
        .unwrap();
}

#[test]
fn listing_follows_issuance_order_across_issuers() {
    let mut registry = memory_registry();
    let second = Principal::new([0x4e; 32]);
    registry.register_issuer(&ADMIN, ISSUER, "Uni A", "").unwrap();
    registry.register_issuer(&ADMIN, second, "Uni B", "").unwrap();

    let mut issued_by_a = Vec::new();
    for i in 0..3u8 {
        let id = CertificateId::from_content(&[b'a', i]);
        let recipient = Principal::new([0x50 + i; 32]);
        registry
            .issue_certificate(&ISSUER, id.clone(), recipient, 0, format!("ipfs://test{i}"))
            .unwrap();
        issued_by_a.push(id);

        registry
            .issue_certificate(&second, CertificateId::from_content(&[b'b', i]), RECIPIENT, 0, "")
            .unwrap();
    }

    assert_eq!(registry.get_certificates_by_issuer(&ISSUER).unwrap(), issued_by_a);
    assert_eq!(registry.get_certificates_by_issuer(&second).unwrap().len(), 3);
    assert_eq!(registry.get_certificates_by_recipient(&RECIPIENT).unwrap().len(), 3);
    assert_eq!(registry.get_total_certificates().unwrap(), 6);
    assert!(registry.get_certificates_by_issuer(&OUTSIDER).unwrap().is_empty());
}

#[test]
fn events_journal_every_committed_transition() {
    let mut registry = memory_registry();
    registry.register_issuer(&ADMIN, ISSUER, "Uni", "").unwrap();
    let id = CertificateId::new("evt");
    registry
        .issue_certificate(&ISSUER, id.clone(), RECIPIENT, 0, "ipfs://evt")
        .unwrap();
    registry.clock().advance(60);
    registry.revoke_certificate(&ISSUER, &id).unwrap();
    assert!(matches!(
        registry.revoke_certificate(&ISSUER, &id),
        Err(RegistryError::AlreadyRevoked { .. })
    ));

    let events = registry.events_since(0).unwrap();
    let sequences: Vec<u64> = events.iter().map(|r| r.sequence).collect();
    assert_eq!(sequences, vec![0, 1, 2, 3]);
    assert!(matches!(events[0].event, RegistryEvent::AdminGranted { .. }));
    assert!(matches!(events[1].event, RegistryEvent::IssuerRegistered { .. }));
    assert!(matches!(events[2].event, RegistryEvent::CertificateIssued { .. }));
    assert_eq!(
        events[3].event,
        RegistryEvent::CertificateRevoked {
            id,
            issuer: ISSUER,
            timestamp: 1_700_000_060,
        }
    );
    assert_eq!(registry.events_since(3).unwrap().len(), 1);
}

#[test]
fn sled_backed_registry_survives_reopen() {
    let dir = TempDir::new().expect("temp dir");
    let clock = ManualClock::new(1_700_000_000);
    let id = CertificateId::new("durable");

    {
        let store = SledStore::new(dir.path()).expect("sled store");
        let mut registry =
            CertificateRegistry::genesis(ADMIN, store, clock.clone(), RegistryConfig::default())
                .unwrap();
        registry.register_issuer(&ADMIN, ISSUER, "Uni", "").unwrap();
        registry
            .issue_certificate(&ISSUER, id.clone(), RECIPIENT, 1_800_000_000, "ipfs://d")
            .unwrap();
        registry.store().flush().unwrap();
    }

    let store = SledStore::new(dir.path()).expect("reopen");
    let mut registry =
        CertificateRegistry::open(store, clock.clone(), RegistryConfig::default()).unwrap();
    assert!(registry.is_admin(&ADMIN).unwrap());
    assert_eq!(registry.get_total_certificates().unwrap(), 1);
    assert_eq!(registry.get_certificates_by_recipient(&RECIPIENT).unwrap(), vec![id.clone()]);
    assert!(registry.verify_certificate(&id).unwrap().is_valid);

    clock.set(1_800_000_000);
    assert!(!registry.verify_certificate(&id).unwrap().is_valid);

    registry.revoke_certificate(&ISSUER, &id).unwrap();
    assert_eq!(registry.events_since(0).unwrap().len(), 4);
}

#[test]
fn failed_commit_leaves_registry_unchanged() {
    let (mut registry, store) = failing_store();
    let id = CertificateId::new("unlucky");
    let events = registry.events_since(0).unwrap();

    store.set_failing(true);
    let err = registry
        .issue_certificate(&ISSUER, id.clone(), RECIPIENT, 0, "ipfs://u")
        .unwrap_err();
    assert!(matches!(err, RegistryError::Storage(_)));
    assert_eq!(err.kind(), ErrorKind::Storage);

    assert_eq!(registry.get_total_certificates().unwrap(), 0);
    assert!(registry.get_certificates_by_issuer(&ISSUER).unwrap().is_empty());
    assert!(registry.get_certificates_by_recipient(&RECIPIENT).unwrap().is_empty());
    assert_eq!(registry.get_issuer_info(&ISSUER).unwrap().total_issued, 0);
    assert_eq!(registry.get_certificate(&id).unwrap_err().kind(), ErrorKind::NotFound);
    assert_eq!(registry.events_since(0).unwrap(), events);

    store.set_failing(false);
    registry
        .issue_certificate(&ISSUER, id.clone(), RECIPIENT, 0, "ipfs://u")
        .unwrap();
    assert_eq!(registry.get_total_certificates().unwrap(), 1);
    assert_eq!(registry.get_certificates_by_issuer(&ISSUER).unwrap(), vec![id]);
    assert_eq!(registry.events_since(0).unwrap().len(), events.len() + 1);
}

#[test]
fn failed_revocation_keeps_certificate_valid() {
    let (mut registry, store) = failing_store();
    let id = CertificateId::new("keep");
    registry
        .issue_certificate(&ISSUER, id.clone(), RECIPIENT, 0, "")
        .unwrap();

    store.set_failing(true);
    let err = registry.revoke_certificate(&ISSUER, &id).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Storage);
    assert!(registry.verify_certificate(&id).unwrap().is_valid);

    store.set_failing(false);
    registry.revoke_certificate(&ISSUER, &id).unwrap();
    assert!(registry.verify_certificate(&id).unwrap().revoked);
}
