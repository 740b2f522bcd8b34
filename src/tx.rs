//! Building, assembling and signing transaction envelopes.
//!
//! The flow is the one the SDK documents: wrap one operation into a
//! transaction with the account's next sequence number, simulate it,
//! fold the simulation results back in with [`assemble`] and sign the
//! result. Nothing here talks to the network; [`crate::rpc`] drives it.

use core::convert::TryInto;
use std::time::{SystemTime, SystemTimeError, UNIX_EPOCH};

use sha2::{Digest, Sha256};
use stellar_xdr::curr::{
    Limits, Memo, MuxedAccount, Operation, OperationBody, Preconditions, SequenceNumber,
    SorobanAuthorizationEntry, SorobanTransactionData, TimeBounds, TimePoint, Transaction,
    TransactionEnvelope, TransactionExt, TransactionSignaturePayload,
    TransactionSignaturePayloadTaggedTransaction, TransactionV1Envelope, VecM, WriteXdr,
};

use crate::keys::Keypair;
use crate::network::{Network, BASE_FEE, TX_TIMEOUT_SECS};

/// Builds a single-operation transaction.
///
/// The defaults are the ones every script uses: the base fee and a
/// 30 second timeout.
pub struct TransactionBuilder {
    source: MuxedAccount,
    sequence: i64,
    fee: u32,
    timeout: u64,
    operation: Option<Operation>,
}

impl TransactionBuilder {
    /// `sequence` is the account's current sequence number as stored in the
    /// ledger; the transaction consumes the next one.
    pub fn new(source: &Keypair, sequence: i64) -> Self {
        TransactionBuilder {
            source: source.muxed_account(),
            sequence,
            fee: BASE_FEE,
            timeout: TX_TIMEOUT_SECS,
            operation: None,
        }
    }

    pub fn fee(mut self, fee: u32) -> Self {
        self.fee = fee;
        self
    }

    pub fn timeout(mut self, secs: u64) -> Self {
        self.timeout = secs;
        self
    }

    pub fn add_operation(mut self, operation: Operation) -> Self {
        self.operation = Some(operation);
        self
    }

    pub fn build(self) -> Result<Transaction, BuildError> {
        let operation = self.operation.ok_or(BuildError::MissingOperation)?;
        let sequence = self
            .sequence
            .checked_add(1)
            .ok_or(BuildError::SequenceOverflow)?;
        let now = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map_err(BuildError::Clock)?
            .as_secs();
        Ok(Transaction {
            source_account: self.source,
            fee: self.fee,
            seq_num: SequenceNumber(sequence),
            cond: Preconditions::Time(TimeBounds {
                min_time: TimePoint(0),
                max_time: TimePoint(now + self.timeout),
            }),
            memo: Memo::None,
            operations: vec![operation]
                .try_into()
                .expect("a single operation is within the limit"),
            ext: TransactionExt::V0,
        })
    }
}

#[derive(Debug)]
pub enum BuildError {
    MissingOperation,
    SequenceOverflow,
    /// The system clock reads before the UNIX epoch.
    Clock(SystemTimeError),
}

/// Folds a simulation response into the transaction, the way the SDK's
/// `prepareTransaction` does: attach the resource footprint, raise the fee
/// by the resource fee and adopt the recorded authorization entries unless
/// the operation already carries its own.
pub fn assemble(
    mut tx: Transaction,
    data: SorobanTransactionData,
    resource_fee: u64,
    auth: Vec<SorobanAuthorizationEntry>,
) -> Result<Transaction, AssembleError> {
    let fee = u64::from(tx.fee)
        .checked_add(resource_fee)
        .ok_or(AssembleError::FeeOverflow)?;
    tx.fee = fee.try_into().map_err(|_| AssembleError::FeeOverflow)?;

    if !auth.is_empty() {
        let mut operations = tx.operations.to_vec();
        if let Some(Operation {
            body: OperationBody::InvokeHostFunction(op),
            ..
        }) = operations.first_mut()
        {
            if op.auth.is_empty() {
                op.auth = auth.try_into().map_err(AssembleError::TooManyAuthEntries)?;
            }
        }
        tx.operations = operations
            .try_into()
            .expect("the operation count did not change");
    }

    tx.ext = TransactionExt::V1(data);
    Ok(tx)
}

#[derive(Debug)]
pub enum AssembleError {
    /// Base fee plus resource fee does not fit the fee field.
    FeeOverflow,
    TooManyAuthEntries(stellar_xdr::curr::Error),
}

/// The transaction hash: SHA-256 of the signature payload, which pins the
/// network id. This is also the id the RPC server reports after
/// submission, so the poll loop looks up exactly this value.
pub fn hash(tx: &Transaction, network: Network) -> Result<[u8; 32], stellar_xdr::curr::Error> {
    let payload = TransactionSignaturePayload {
        network_id: network.id(),
        tagged_transaction: TransactionSignaturePayloadTaggedTransaction::Tx(tx.clone()),
    };
    Ok(Sha256::digest(&payload.to_xdr(Limits::none())?).into())
}

/// Signs the transaction for `network` and wraps it into an envelope.
pub fn sign(
    tx: Transaction,
    keys: &Keypair,
    network: Network,
) -> Result<TransactionEnvelope, stellar_xdr::curr::Error> {
    let digest = hash(&tx, network)?;
    let signature = keys.sign_decorated(&digest);
    Ok(TransactionEnvelope::Tx(TransactionV1Envelope {
        tx,
        signatures: vec![signature]
            .try_into()
            .expect("a single signature is within the limit"),
    }))
}

/// An envelope without signatures, as submitted to simulation.
pub fn unsigned_envelope(tx: &Transaction) -> TransactionEnvelope {
    TransactionEnvelope::Tx(TransactionV1Envelope {
        tx: tx.clone(),
        signatures: VecM::default(),
    })
}

#[cfg(test)]
mod tests {
    use core::convert::TryInto;

    use stellar_xdr::curr::{
        ExtensionPoint, LedgerFootprint, Limits, Preconditions, ReadXdr, SorobanAuthorizationEntry,
        SorobanAuthorizedFunction, SorobanAuthorizedInvocation, SorobanCredentials,
        SorobanResources, SorobanTransactionData, TimePoint, TransactionEnvelope, TransactionExt,
        WriteXdr,
    };

    use super::TransactionBuilder;
    use crate::contract::Contract;
    use crate::keys::Keypair;
    use crate::network::{Network, BASE_FEE};

    const SEED: &str = "SAAQCAIBAEAQCAIBAEAQCAIBAEAQCAIBAEAQCAIBAEAQCAIBAEAQC5MY";
    const CONTRACT: &str = "CABAEAQCAIBAEAQCAIBAEAQCAIBAEAQCAIBAEAQCAIBAEAQCAIBAFNSZ";

    fn call_operation() -> stellar_xdr::curr::Operation {
        Contract::from_string(CONTRACT)
            .unwrap()
            .call("get_offer", vec![])
            .unwrap()
    }

    fn soroban_data(resource_fee: i64) -> SorobanTransactionData {
        SorobanTransactionData {
            ext: ExtensionPoint::V0,
            resources: SorobanResources {
                footprint: LedgerFootprint {
                    read_only: Default::default(),
                    read_write: Default::default(),
                },
                instructions: 0,
                read_bytes: 0,
                write_bytes: 0,
            },
            resource_fee,
        }
    }

    #[test]
    fn build_uses_next_sequence_and_defaults() {
        let keys = Keypair::from_secret(SEED).unwrap();
        let tx = TransactionBuilder::new(&keys, 41)
            .add_operation(call_operation())
            .build()
            .unwrap();
        assert_eq!(tx.seq_num.0, 42);
        assert_eq!(tx.fee, BASE_FEE);
        assert_eq!(tx.operations.len(), 1);
        match tx.cond {
            Preconditions::Time(bounds) => {
                assert_eq!(bounds.min_time, TimePoint(0));
                assert!(bounds.max_time.0 > 0);
            }
            other => panic!("expected time bounds, got {:?}", other),
        }
    }

    #[test]
    fn build_without_operation_fails() {
        let keys = Keypair::from_secret(SEED).unwrap();
        assert!(matches!(
            TransactionBuilder::new(&keys, 0).build(),
            Err(super::BuildError::MissingOperation)
        ));
    }

    #[test]
    fn assemble_applies_simulation() {
        let keys = Keypair::from_secret(SEED).unwrap();
        let tx = TransactionBuilder::new(&keys, 0)
            .add_operation(call_operation())
            .build()
            .unwrap();

        let auth = SorobanAuthorizationEntry {
            credentials: SorobanCredentials::SourceAccount,
            root_invocation: SorobanAuthorizedInvocation {
                function: SorobanAuthorizedFunction::ContractFn(
                    match call_operation().body {
                        stellar_xdr::curr::OperationBody::InvokeHostFunction(op) => {
                            match op.host_function {
                                stellar_xdr::curr::HostFunction::InvokeContract(args) => args,
                                other => panic!("unexpected host function: {:?}", other),
                            }
                        }
                        other => panic!("unexpected operation: {:?}", other),
                    },
                ),
                sub_invocations: Default::default(),
            },
        };

        let assembled = super::assemble(tx, soroban_data(5000), 5000, vec![auth]).unwrap();
        assert_eq!(assembled.fee, BASE_FEE + 5000);
        assert!(matches!(assembled.ext, TransactionExt::V1(_)));
        match &assembled.operations.as_slice()[0].body {
            stellar_xdr::curr::OperationBody::InvokeHostFunction(op) => {
                assert_eq!(op.auth.len(), 1);
            }
            other => panic!("unexpected operation: {:?}", other),
        }
    }

    #[test]
    fn signed_envelope_carries_one_verifiable_signature() {
        use ed25519_dalek::{Signature, Verifier};

        let keys = Keypair::from_secret(SEED).unwrap();
        let tx = TransactionBuilder::new(&keys, 7)
            .add_operation(call_operation())
            .build()
            .unwrap();
        let digest = super::hash(&tx, Network::Testnet).unwrap();
        let envelope = super::sign(tx, &keys, Network::Testnet).unwrap();

        let v1 = match envelope {
            TransactionEnvelope::Tx(v1) => v1,
            other => panic!("unexpected envelope: {:?}", other),
        };
        assert_eq!(v1.signatures.len(), 1);
        let decorated = &v1.signatures.as_slice()[0];
        assert_eq!(decorated.hint, keys.signature_hint());
        let sig_bytes: [u8; 64] = decorated.signature.0.as_slice().try_into().unwrap();
        assert!(keys
            .verifying_key()
            .verify(&digest, &Signature::from_bytes(&sig_bytes))
            .is_ok());
    }

    #[test]
    fn hash_depends_on_network() {
        let keys = Keypair::from_secret(SEED).unwrap();
        let tx = TransactionBuilder::new(&keys, 7)
            .add_operation(call_operation())
            .build()
            .unwrap();
        assert_ne!(
            super::hash(&tx, Network::Testnet).unwrap(),
            super::hash(&tx, Network::Public).unwrap(),
        );
    }

    #[test]
    fn envelope_xdr_roundtrips() {
        let keys = Keypair::from_secret(SEED).unwrap();
        let tx = TransactionBuilder::new(&keys, 7)
            .add_operation(call_operation())
            .build()
            .unwrap();
        let envelope = super::sign(tx, &keys, Network::Testnet).unwrap();
        let encoded = envelope.to_xdr_base64(Limits::none()).unwrap();
        let decoded = TransactionEnvelope::from_xdr_base64(&encoded, Limits::none()).unwrap();
        assert_eq!(decoded, envelope);
    }
}
