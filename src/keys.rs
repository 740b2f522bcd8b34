//! Ed25519 key pairs loaded from strkey seeds.
//!
//! Every script signs with exactly one of the fixture key pairs. The seed
//! strings come from the environment (see [`crate::fixtures`]) in the usual
//! `S...` strkey encoding.

use core::convert::TryInto;
use core::fmt;

use ed25519_dalek::{Signer, SigningKey, VerifyingKey};
use stellar_xdr::curr::{
    AccountId, DecoratedSignature, MuxedAccount, PublicKey, ScAddress, ScVal, Signature,
    SignatureHint, Uint256,
};

use crate::scval::{ScValError, ToScVal};

/// An ed25519 key pair with its verifying half cached.
pub struct Keypair {
    signing: SigningKey,
    verifying: VerifyingKey,
}

impl Keypair {
    /// Parses a key pair from a strkey seed (`S...`).
    ///
    /// Anything that is not a seed, including a valid public key strkey,
    /// is rejected.
    pub fn from_secret(seed: &str) -> Result<Self, ParseKeyError> {
        let seed = stellar_strkey::ed25519::PrivateKey::from_string(seed)
            .map_err(ParseKeyError::InvalidSeed)?;
        let signing = SigningKey::from_bytes(&seed.0);
        let verifying = signing.verifying_key();
        Ok(Keypair { signing, verifying })
    }

    /// The public key in strkey encoding (`G...`).
    pub fn public_key(&self) -> String {
        stellar_strkey::ed25519::PublicKey(self.verifying.to_bytes()).to_string()
    }

    pub fn account_id(&self) -> AccountId {
        AccountId(PublicKey::PublicKeyTypeEd25519(Uint256(
            self.verifying.to_bytes(),
        )))
    }

    pub fn muxed_account(&self) -> MuxedAccount {
        MuxedAccount::Ed25519(Uint256(self.verifying.to_bytes()))
    }

    pub fn sc_address(&self) -> ScAddress {
        ScAddress::Account(self.account_id())
    }

    /// The last four bytes of the public key, used to match a signature to
    /// a signer in multi-signature envelopes.
    pub fn signature_hint(&self) -> SignatureHint {
        let bytes = self.verifying.to_bytes();
        let mut hint = [0u8; 4];
        hint.copy_from_slice(&bytes[28..]);
        SignatureHint(hint)
    }

    /// Signs a transaction payload hash and pairs the signature with the
    /// hint of this key.
    pub fn sign_decorated(&self, payload_hash: &[u8; 32]) -> DecoratedSignature {
        let signature = self.signing.sign(payload_hash);
        let bytes = signature.to_bytes().to_vec();
        DecoratedSignature {
            hint: self.signature_hint(),
            signature: Signature(bytes.try_into().expect("an ed25519 signature is 64 bytes")),
        }
    }

    pub(crate) fn verifying_key(&self) -> &VerifyingKey {
        &self.verifying
    }
}

impl ToScVal for Keypair {
    fn to_scval(&self) -> Result<ScVal, ScValError> {
        Ok(ScVal::Address(self.sc_address()))
    }
}

impl fmt::Debug for Keypair {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        // never print the seed
        write!(f, "Keypair({})", self.public_key())
    }
}

#[derive(Debug)]
pub enum ParseKeyError {
    InvalidSeed(stellar_strkey::DecodeError),
}
