use certreg_storage::{MemoryStore, RegistryMeta, RegistryStore, SledStore, WriteBatch};
use certreg_types::{
    Certificate, CertificateId, CertificateStatus, EventRecord, Expiry, Issuer, Principal,
    RegistryEvent,
};
use tempfile::TempDir;

const ADMIN: Principal = Principal::new([1u8; 32]);
const AUTHORITY: Principal = Principal::new([2u8; 32]);
const RECIPIENT: Principal = Principal::new([3u8; 32]);

fn certificate(id: &str, issue_date: i64) -> Certificate {
    Certificate {
        id: CertificateId::new(id),
        issuer: AUTHORITY,
        recipient: RECIPIENT,
        issue_date,
        expiry: Expiry::Never,
        status: CertificateStatus::Valid,
        metadata_uri: format!("ipfs://{id}"),
    }
}

fn seed<S: RegistryStore>(store: &S) {
    let mut batch = WriteBatch::new();
    batch
        .put_admin(ADMIN)
        .put_issuer(Issuer::new(AUTHORITY, "Test University".into(), String::new(), 5))
        .put_meta(RegistryMeta {
            total_issuers: 1,
            next_event_sequence: 1,
            ..Default::default()
        })
        .append_event(EventRecord {
            sequence: 0,
            event: RegistryEvent::IssuerRegistered {
                authority: AUTHORITY,
                name: "Test University".into(),
                timestamp: 5,
            },
        });
    store.commit(batch).unwrap();

    // Reverse lexical order on purpose: listing must follow ordinals, not ids.
    for (ordinal, id) in ["zeta", "alpha", "mid"].iter().enumerate() {
        let ordinal = ordinal as u64;
        let mut batch = WriteBatch::new();
        batch
            .put_certificate(certificate(id, 10 + ordinal as i64))
            .append_issuer_index(AUTHORITY, ordinal, CertificateId::new(*id))
            .append_recipient_index(RECIPIENT, ordinal, CertificateId::new(*id))
            .put_meta(RegistryMeta {
                total_certificates: ordinal + 1,
                total_issuers: 1,
                next_event_sequence: 1,
            });
        store.commit(batch).unwrap();
    }
}

fn assert_seeded<S: RegistryStore>(store: &S) {
    let meta = store.load_meta().unwrap().expect("initialized");
    assert_eq!(meta.total_certificates, 3);
    assert_eq!(meta.total_issuers, 1);

    assert!(store.is_admin(&ADMIN).unwrap());
    assert!(!store.is_admin(&AUTHORITY).unwrap());
    assert_eq!(store.admins().unwrap(), vec![ADMIN]);

    let issuer = store.get_issuer(&AUTHORITY).unwrap().expect("issuer");
    assert_eq!(issuer.name, "Test University");

    let expected: Vec<CertificateId> = ["zeta", "alpha", "mid"]
        .iter()
        .map(|id| CertificateId::new(*id))
        .collect();
    assert_eq!(store.issuer_index(&AUTHORITY).unwrap(), expected);
    assert_eq!(store.recipient_index(&RECIPIENT).unwrap(), expected);
    assert!(store.issuer_index(&RECIPIENT).unwrap().is_empty());

    let cert = store
        .get_certificate(&CertificateId::new("alpha"))
        .unwrap()
        .expect("certificate");
    assert_eq!(cert.metadata_uri, "ipfs://alpha");
    assert!(store
        .get_certificate(&CertificateId::new("missing"))
        .unwrap()
        .is_none());

    let events = store.events_since(0).unwrap();
    assert_eq!(events.len(), 1);
    assert!(store.events_since(1).unwrap().is_empty());
}

#[test]
fn memory_store_serves_seeded_state() {
    let store = MemoryStore::new();
    seed(&store);
    assert_seeded(&store);
}

#[test]
fn sled_store_serves_seeded_state() {
    let dir = TempDir::new().expect("temp dir");
    let store = SledStore::new(dir.path()).expect("sled store");
    seed(&store);
    assert_seeded(&store);
}

#[test]
fn sled_restart_restores_registry_state() {
    let dir = TempDir::new().expect("temp dir");
    let path = dir.path().to_path_buf();

    {
        let store = SledStore::new(&path).expect("sled store");
        assert!(store.load_meta().unwrap().is_none());
        seed(&store);
        store.flush().unwrap();
    }

    let reopened = SledStore::new(&path).expect("reopen sled store");
    assert_seeded(&reopened);
}

#[test]
fn sled_admin_removal_is_persisted() {
    let dir = TempDir::new().expect("temp dir");
    let store = SledStore::new(dir.path()).expect("sled store");
    seed(&store);

    let mut batch = WriteBatch::new();
    batch.put_admin(AUTHORITY).delete_admin(ADMIN);
    store.commit(batch).unwrap();

    assert_eq!(store.admins().unwrap(), vec![AUTHORITY]);
}
