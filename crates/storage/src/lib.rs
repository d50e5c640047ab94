//! Persistence for the certificate registry
//!
//! Key-addressed records (issuers by authority, certificates by id, admins by
//! principal), append-only secondary indexes, and a sequence-numbered event
//! journal. All writes go through [`WriteBatch`] and are applied atomically.

use anyhow::Result;
use certreg_types::{Certificate, CertificateId, EventRecord, Issuer, Principal};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use sled::{Db, Tree};
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::path::Path;
use std::sync::Arc;

mod batch;

pub use batch::{WriteBatch, WriteOp};

/// Storage errors
#[derive(thiserror::Error, Debug)]
pub enum StorageError {
    #[error("Database error: {0}")]
    Database(#[from] sled::Error),
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
    #[error("Corrupt key in {0} index")]
    CorruptKey(&'static str),
}

/// Registry-wide counters and journal position
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegistryMeta {
    pub total_certificates: u64,
    pub total_issuers: u64,
    /// Sequence number the next journal entry will receive
    pub next_event_sequence: u64,
}

/// Abstract registry store
///
/// Reads are exact-match lookups. `commit` applies a whole batch or nothing.
pub trait RegistryStore {
    /// `None` until the registry has been initialized.
    fn load_meta(&self) -> Result<Option<RegistryMeta>>;
    fn get_issuer(&self, authority: &Principal) -> Result<Option<Issuer>>;
    fn get_certificate(&self, id: &CertificateId) -> Result<Option<Certificate>>;
    fn is_admin(&self, principal: &Principal) -> Result<bool>;
    fn admins(&self) -> Result<Vec<Principal>>;
    /// Certificate ids issued by `issuer`, oldest first
    fn issuer_index(&self, issuer: &Principal) -> Result<Vec<CertificateId>>;
    /// Certificate ids received by `recipient`, oldest first
    fn recipient_index(&self, recipient: &Principal) -> Result<Vec<CertificateId>>;
    /// Journal entries with sequence >= `since`, in order
    fn events_since(&self, since: u64) -> Result<Vec<EventRecord>>;
    fn commit(&self, batch: WriteBatch) -> Result<()>;
}

const META_KEY: &[u8] = b"meta";
const ISSUER_PREFIX: &[u8] = b"issuer/";
const CERT_PREFIX: &[u8] = b"cert/";
const ADMIN_PREFIX: &[u8] = b"admin/";
const ISSUER_INDEX_PREFIX: &[u8] = b"idx/issuer/";
const RECIPIENT_INDEX_PREFIX: &[u8] = b"idx/recipient/";
const EVENT_PREFIX: &[u8] = b"event/";

fn encode<T: Serialize>(value: &T) -> std::result::Result<Vec<u8>, StorageError> {
    Ok(serde_json::to_vec(value)?)
}

fn decode<T: for<'de> Deserialize<'de>>(bytes: &[u8]) -> std::result::Result<T, StorageError> {
    Ok(serde_json::from_slice(bytes)?)
}

fn key(prefix: &[u8], parts: &[&[u8]]) -> Vec<u8> {
    let mut k = prefix.to_vec();
    for part in parts {
        k.extend_from_slice(part);
    }
    k
}

/// Sled-backed implementation
///
/// Everything lives in one tree under prefixed keys so a batch maps onto a
/// single atomic `apply_batch`.
pub struct SledStore {
    db: Db,
    records: Tree,
}

impl SledStore {
    pub fn new<P: AsRef<Path>>(path: P) -> Result<Self> {
        let db = sled::open(path).map_err(StorageError::from)?;
        let records = db.open_tree("registry").map_err(StorageError::from)?;
        Ok(Self { db, records })
    }

    pub fn flush(&self) -> Result<()> {
        self.db.flush().map_err(StorageError::from)?;
        Ok(())
    }

    fn get_json<T: for<'de> Deserialize<'de>>(&self, k: &[u8]) -> Result<Option<T>> {
        let value = self.records.get(k).map_err(StorageError::from)?;
        Ok(value.map(|v| decode(&v)).transpose()?)
    }

    fn scan_index(&self, prefix: Vec<u8>) -> Result<Vec<CertificateId>> {
        self.records
            .scan_prefix(prefix)
            .map(|r| -> Result<CertificateId> {
                let (_, v) = r.map_err(StorageError::from)?;
                Ok(decode(&v)?)
            })
            .collect()
    }
}

impl RegistryStore for SledStore {
    fn load_meta(&self) -> Result<Option<RegistryMeta>> {
        self.get_json(META_KEY)
    }

    fn get_issuer(&self, authority: &Principal) -> Result<Option<Issuer>> {
        self.get_json(&key(ISSUER_PREFIX, &[authority.as_bytes()]))
    }

    fn get_certificate(&self, id: &CertificateId) -> Result<Option<Certificate>> {
        self.get_json(&key(CERT_PREFIX, &[id.as_str().as_bytes()]))
    }

    fn is_admin(&self, principal: &Principal) -> Result<bool> {
        Ok(self
            .records
            .contains_key(key(ADMIN_PREFIX, &[principal.as_bytes()]))
            .map_err(StorageError::from)?)
    }

    fn admins(&self) -> Result<Vec<Principal>> {
        self.records
            .scan_prefix(ADMIN_PREFIX)
            .map(|r| -> Result<Principal> {
                let (k, _) = r.map_err(StorageError::from)?;
                let bytes: [u8; 32] = k[ADMIN_PREFIX.len()..]
                    .try_into()
                    .map_err(|_| StorageError::CorruptKey("admin"))?;
                Ok(Principal::new(bytes))
            })
            .collect()
    }

    fn issuer_index(&self, issuer: &Principal) -> Result<Vec<CertificateId>> {
        self.scan_index(key(ISSUER_INDEX_PREFIX, &[issuer.as_bytes()]))
    }

    fn recipient_index(&self, recipient: &Principal) -> Result<Vec<CertificateId>> {
        self.scan_index(key(RECIPIENT_INDEX_PREFIX, &[recipient.as_bytes()]))
    }

    fn events_since(&self, since: u64) -> Result<Vec<EventRecord>> {
        let start = key(EVENT_PREFIX, &[&since.to_be_bytes()]);
        self.records
            .range(start..)
            .take_while(|r| {
                r.as_ref()
                    .map(|(k, _)| k.starts_with(EVENT_PREFIX))
                    .unwrap_or(true)
            })
            .map(|r| -> Result<EventRecord> {
                let (_, v) = r.map_err(StorageError::from)?;
                Ok(decode(&v)?)
            })
            .collect()
    }

    fn commit(&self, batch: WriteBatch) -> Result<()> {
        let mut sled_batch = sled::Batch::default();
        for op in batch.into_ops() {
            match op {
                WriteOp::PutMeta(meta) => {
                    sled_batch.insert(META_KEY, encode(&meta)?);
                }
                WriteOp::PutIssuer(issuer) => {
                    let k = key(ISSUER_PREFIX, &[issuer.authority.as_bytes()]);
                    sled_batch.insert(k, encode(&issuer)?);
                }
                WriteOp::PutCertificate(cert) => {
                    let k = key(CERT_PREFIX, &[cert.id.as_str().as_bytes()]);
                    sled_batch.insert(k, encode(&cert)?);
                }
                WriteOp::PutAdmin(principal) => {
                    sled_batch.insert(key(ADMIN_PREFIX, &[principal.as_bytes()]), &b""[..]);
                }
                WriteOp::DeleteAdmin(principal) => {
                    sled_batch.remove(key(ADMIN_PREFIX, &[principal.as_bytes()]));
                }
                WriteOp::AppendIssuerIndex {
                    issuer,
                    ordinal,
                    id,
                } => {
                    let k = key(
                        ISSUER_INDEX_PREFIX,
                        &[issuer.as_bytes(), &ordinal.to_be_bytes()],
                    );
                    sled_batch.insert(k, encode(&id)?);
                }
                WriteOp::AppendRecipientIndex {
                    recipient,
                    ordinal,
                    id,
                } => {
                    let k = key(
                        RECIPIENT_INDEX_PREFIX,
                        &[recipient.as_bytes(), &ordinal.to_be_bytes()],
                    );
                    sled_batch.insert(k, encode(&id)?);
                }
                WriteOp::AppendEvent(record) => {
                    let k = key(EVENT_PREFIX, &[&record.sequence.to_be_bytes()]);
                    sled_batch.insert(k, encode(&record)?);
                }
            }
        }
        self.records
            .apply_batch(sled_batch)
            .map_err(StorageError::from)?;
        Ok(())
    }
}

#[derive(Default)]
struct MemoryState {
    meta: Option<RegistryMeta>,
    issuers: HashMap<Principal, Issuer>,
    certificates: HashMap<CertificateId, Certificate>,
    admins: BTreeSet<Principal>,
    issuer_index: HashMap<Principal, BTreeMap<u64, CertificateId>>,
    recipient_index: HashMap<Principal, BTreeMap<u64, CertificateId>>,
    events: Vec<EventRecord>,
}

/// In-memory backend
///
/// One lock guards all collections, so a commit is observed whole or not at all.
#[derive(Default, Clone)]
pub struct MemoryStore {
    state: Arc<RwLock<MemoryState>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl RegistryStore for MemoryStore {
    fn load_meta(&self) -> Result<Option<RegistryMeta>> {
        Ok(self.state.read().meta.clone())
    }

    fn get_issuer(&self, authority: &Principal) -> Result<Option<Issuer>> {
        Ok(self.state.read().issuers.get(authority).cloned())
    }

    fn get_certificate(&self, id: &CertificateId) -> Result<Option<Certificate>> {
        Ok(self.state.read().certificates.get(id).cloned())
    }

    fn is_admin(&self, principal: &Principal) -> Result<bool> {
        Ok(self.state.read().admins.contains(principal))
    }

    fn admins(&self) -> Result<Vec<Principal>> {
        Ok(self.state.read().admins.iter().copied().collect())
    }

    fn issuer_index(&self, issuer: &Principal) -> Result<Vec<CertificateId>> {
        Ok(self
            .state
            .read()
            .issuer_index
            .get(issuer)
            .map(|ids| ids.values().cloned().collect())
            .unwrap_or_default())
    }

    fn recipient_index(&self, recipient: &Principal) -> Result<Vec<CertificateId>> {
        Ok(self
            .state
            .read()
            .recipient_index
            .get(recipient)
            .map(|ids| ids.values().cloned().collect())
            .unwrap_or_default())
    }

    fn events_since(&self, since: u64) -> Result<Vec<EventRecord>> {
        Ok(self
            .state
            .read()
            .events
            .iter()
            .filter(|r| r.sequence >= since)
            .cloned()
            .collect())
    }

    fn commit(&self, batch: WriteBatch) -> Result<()> {
        let mut state = self.state.write();
        for op in batch.into_ops() {
            match op {
                WriteOp::PutMeta(meta) => state.meta = Some(meta),
                WriteOp::PutIssuer(issuer) => {
                    state.issuers.insert(issuer.authority, issuer);
                }
                WriteOp::PutCertificate(cert) => {
                    state.certificates.insert(cert.id.clone(), cert);
                }
                WriteOp::PutAdmin(principal) => {
                    state.admins.insert(principal);
                }
                WriteOp::DeleteAdmin(principal) => {
                    state.admins.remove(&principal);
                }
                WriteOp::AppendIssuerIndex {
                    issuer,
                    ordinal,
                    id,
                } => {
                    state
                        .issuer_index
                        .entry(issuer)
                        .or_default()
                        .insert(ordinal, id);
                }
                WriteOp::AppendRecipientIndex {
                    recipient,
                    ordinal,
                    id,
                } => {
                    state
                        .recipient_index
                        .entry(recipient)
                        .or_default()
                        .insert(ordinal, id);
                }
                WriteOp::AppendEvent(record) => state.events.push(record),
            }
        }
        Ok(())
    }
}
