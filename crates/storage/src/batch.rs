use crate::RegistryMeta;
use certreg_types::{Certificate, CertificateId, EventRecord, Issuer, Principal};

/// A single mutation inside a [`WriteBatch`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WriteOp {
    PutMeta(RegistryMeta),
    PutIssuer(Issuer),
    PutCertificate(Certificate),
    PutAdmin(Principal),
    DeleteAdmin(Principal),
    /// `ordinal` is the global issuance ordinal; it keeps index scans in insertion order.
    AppendIssuerIndex {
        issuer: Principal,
        ordinal: u64,
        id: CertificateId,
    },
    AppendRecipientIndex {
        recipient: Principal,
        ordinal: u64,
        id: CertificateId,
    },
    AppendEvent(EventRecord),
}

/// Ordered set of mutations committed atomically by a [`crate::RegistryStore`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WriteBatch {
    ops: Vec<WriteOp>,
}

impl WriteBatch {
    pub fn new() -> Self {
        Self::default()
    }

    fn push(&mut self, op: WriteOp) -> &mut Self {
        self.ops.push(op);
        self
    }

    pub fn put_meta(&mut self, meta: RegistryMeta) -> &mut Self {
        self.push(WriteOp::PutMeta(meta))
    }

    pub fn put_issuer(&mut self, issuer: Issuer) -> &mut Self {
        self.push(WriteOp::PutIssuer(issuer))
    }

    pub fn put_certificate(&mut self, certificate: Certificate) -> &mut Self {
        self.push(WriteOp::PutCertificate(certificate))
    }

    pub fn put_admin(&mut self, principal: Principal) -> &mut Self {
        self.push(WriteOp::PutAdmin(principal))
    }

    pub fn delete_admin(&mut self, principal: Principal) -> &mut Self {
        self.push(WriteOp::DeleteAdmin(principal))
    }

    pub fn append_issuer_index(
        &mut self,
        issuer: Principal,
        ordinal: u64,
        id: CertificateId,
    ) -> &mut Self {
        self.push(WriteOp::AppendIssuerIndex {
            issuer,
            ordinal,
            id,
        })
    }

    pub fn append_recipient_index(
        &mut self,
        recipient: Principal,
        ordinal: u64,
        id: CertificateId,
    ) -> &mut Self {
        self.push(WriteOp::AppendRecipientIndex {
            recipient,
            ordinal,
            id,
        })
    }

    pub fn append_event(&mut self, record: EventRecord) -> &mut Self {
        self.push(WriteOp::AppendEvent(record))
    }

    pub fn into_ops(self) -> Vec<WriteOp> {
        self.ops
    }
}
