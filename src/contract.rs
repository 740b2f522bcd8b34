//! Handles for deployed contracts and the classic assets behind them.
//!
//! A [`Contract`] is nothing but a strkey-encoded contract id; calling it
//! produces the `InvokeHostFunction` operation that the transaction builder
//! wraps into an envelope. [`Asset`] mirrors the classic asset pair
//! (code + issuer) the demo trades and knows how to derive the id of its
//! Stellar Asset Contract deterministically, the same way the deployed
//! token contracts got theirs.

use core::convert::TryInto;
use core::fmt;

use sha2::{Digest, Sha256};
use stellar_xdr::curr::{
    AccountId, AlphaNum12, AlphaNum4, Asset as XdrAsset, AssetCode12, AssetCode4,
    ContractExecutable, ContractIdPreimage, CreateContractArgs, Hash, HashIdPreimage,
    HashIdPreimageContractId, HostFunction, InvokeContractArgs, InvokeHostFunctionOp, Limits,
    Operation, OperationBody, PublicKey, ScAddress, ScSymbol, ScVal, StringM, Uint256, VecM,
    WriteXdr,
};

use crate::network::Network;
use crate::scval::{ScValError, ToScVal};

/// A handle to a deployed contract.
#[derive(Clone, Eq, PartialEq)]
pub struct Contract(stellar_strkey::Contract);

impl Contract {
    /// Parses a strkey contract address (`C...`).
    pub fn from_string(address: &str) -> Result<Self, ParseContractError> {
        stellar_strkey::Contract::from_string(address)
            .map(Contract)
            .map_err(ParseContractError::InvalidStrkey)
    }

    pub(crate) fn from_id(id: [u8; 32]) -> Self {
        Contract(stellar_strkey::Contract(id))
    }

    /// The strkey contract address.
    pub fn address(&self) -> String {
        self.0.to_string()
    }

    pub fn sc_address(&self) -> ScAddress {
        ScAddress::Contract(Hash((self.0).0))
    }

    /// Builds the operation invoking `function` with `args` on this
    /// contract. The operation still needs to be wrapped in an envelope,
    /// simulated and signed before it can be submitted.
    pub fn call(&self, function: &str, args: Vec<ScVal>) -> Result<Operation, CallError> {
        let function_name: StringM<32> = function
            .try_into()
            .map_err(CallError::InvalidFunctionName)?;
        let args: VecM<ScVal> = args.try_into().map_err(CallError::TooManyArguments)?;
        Ok(Operation {
            source_account: None,
            body: OperationBody::InvokeHostFunction(InvokeHostFunctionOp {
                host_function: HostFunction::InvokeContract(InvokeContractArgs {
                    contract_address: self.sc_address(),
                    function_name: ScSymbol(function_name),
                    args,
                }),
                auth: VecM::default(),
            }),
        })
    }
}

impl ToScVal for Contract {
    fn to_scval(&self) -> Result<ScVal, ScValError> {
        Ok(ScVal::Address(self.sc_address()))
    }
}

impl fmt::Debug for Contract {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "Contract({})", self.0)
    }
}

#[derive(Debug)]
pub enum ParseContractError {
    InvalidStrkey(stellar_strkey::DecodeError),
}

#[derive(Debug)]
pub enum CallError {
    /// Function names are symbols, so 32 bytes at most.
    InvalidFunctionName(stellar_xdr::curr::Error),
    TooManyArguments(stellar_xdr::curr::Error),
}

/// A classic asset: a short code issued by an account.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct Asset {
    code: String,
    issuer: stellar_strkey::ed25519::PublicKey,
}

impl Asset {
    /// Creates the asset from its code and the issuer public key strkey.
    pub fn new(code: &str, issuer: &str) -> Result<Self, AssetError> {
        if code.is_empty() || code.len() > 12 {
            return Err(AssetError::InvalidCodeLength(code.len()));
        }
        if !code.bytes().all(|byte| byte.is_ascii_alphanumeric()) {
            return Err(AssetError::InvalidCodeCharacter);
        }
        let issuer = stellar_strkey::ed25519::PublicKey::from_string(issuer)
            .map_err(AssetError::InvalidIssuer)?;
        Ok(Asset {
            code: code.to_owned(),
            issuer,
        })
    }

    pub fn code(&self) -> &str {
        &self.code
    }

    pub fn issuer(&self) -> String {
        self.issuer.to_string()
    }

    fn issuer_account_id(&self) -> AccountId {
        AccountId(PublicKey::PublicKeyTypeEd25519(Uint256(self.issuer.0)))
    }

    /// The XDR representation. Codes up to four characters use the short
    /// form, longer ones the long form, both zero-padded.
    pub fn to_xdr(&self) -> XdrAsset {
        let bytes = self.code.as_bytes();
        if bytes.len() <= 4 {
            let mut code = [0u8; 4];
            code[..bytes.len()].copy_from_slice(bytes);
            XdrAsset::CreditAlphanum4(AlphaNum4 {
                asset_code: AssetCode4(code),
                issuer: self.issuer_account_id(),
            })
        } else {
            let mut code = [0u8; 12];
            code[..bytes.len()].copy_from_slice(bytes);
            XdrAsset::CreditAlphanum12(AlphaNum12 {
                asset_code: AssetCode12(code),
                issuer: self.issuer_account_id(),
            })
        }
    }

    /// Derives the id of the Stellar Asset Contract for this asset on the
    /// given network: the SHA-256 of the contract id preimage, which pins
    /// the network id and the asset.
    pub fn contract_id(&self, network: Network) -> Result<Contract, stellar_xdr::curr::Error> {
        let preimage = HashIdPreimage::ContractId(HashIdPreimageContractId {
            network_id: network.id(),
            contract_id_preimage: ContractIdPreimage::Asset(self.to_xdr()),
        });
        let bytes = preimage.to_xdr(Limits::none())?;
        Ok(Contract::from_id(Sha256::digest(&bytes).into()))
    }
}

/// Builds the operation deploying the Stellar Asset Contract for `asset`.
///
/// Deploying is idempotent per network: the contract id is derived from the
/// asset, so a second attempt fails on the already-existing entry.
pub fn create_stellar_asset_contract(asset: &Asset) -> Operation {
    Operation {
        source_account: None,
        body: OperationBody::InvokeHostFunction(InvokeHostFunctionOp {
            host_function: HostFunction::CreateContract(CreateContractArgs {
                contract_id_preimage: ContractIdPreimage::Asset(asset.to_xdr()),
                executable: ContractExecutable::StellarAsset,
            }),
            auth: VecM::default(),
        }),
    }
}

#[derive(Debug)]
pub enum AssetError {
    /// Codes are between one and twelve characters.
    InvalidCodeLength(usize),
    InvalidCodeCharacter,
    InvalidIssuer(stellar_strkey::DecodeError),
}

#[cfg(test)]
mod tests {
    use stellar_xdr::curr::{Asset as XdrAsset, HostFunction, OperationBody};

    use super::{Asset, Contract};
    use crate::network::Network;

    const ISSUER: &str = "GAAQCAIBAEAQCAIBAEAQCAIBAEAQCAIBAEAQCAIBAEAQCAIBAEAQDZ7H";
    const CONTRACT: &str = "CABAEAQCAIBAEAQCAIBAEAQCAIBAEAQCAIBAEAQCAIBAEAQCAIBAFNSZ";

    #[test]
    fn contract_strkey_roundtrips() {
        let contract = Contract::from_string(CONTRACT).unwrap();
        assert_eq!(contract.address(), CONTRACT);
        // an account strkey is not a contract
        assert!(Contract::from_string(ISSUER).is_err());
    }

    #[test]
    fn short_and_long_asset_codes() {
        match Asset::new("USDC", ISSUER).unwrap().to_xdr() {
            XdrAsset::CreditAlphanum4(inner) => assert_eq!(&inner.asset_code.0, b"USDC"),
            other => panic!("wrong arm: {:?}", other),
        }
        match Asset::new("testUSDYC", ISSUER).unwrap().to_xdr() {
            XdrAsset::CreditAlphanum12(inner) => {
                assert_eq!(&inner.asset_code.0, b"testUSDYC\0\0\0");
            }
            other => panic!("wrong arm: {:?}", other),
        }
    }

    #[test]
    fn rejects_bad_asset_codes() {
        assert!(Asset::new("", ISSUER).is_err());
        assert!(Asset::new("THIRTEENCHARS", ISSUER).is_err());
        assert!(Asset::new("US-C", ISSUER).is_err());
        assert!(Asset::new("USDC", "not a key").is_err());
    }

    #[test]
    fn derives_known_asset_contract_ids() {
        let usdc = Asset::new("USDC", ISSUER).unwrap();
        assert_eq!(
            usdc.contract_id(Network::Testnet).unwrap().address(),
            "CBDHWZW32EHKVGJ5TZQOJ5MELFNWJYMVHN3N5CLUE7UNSV2RNAWPTJ4C",
        );
        // the id pins the network
        assert_eq!(
            usdc.contract_id(Network::Public).unwrap().address(),
            "CBSCR2NCMFMZQCFYP3TT4QFBGJC4FSMX2M2GQ4NH5TWFKJYPJJPOBY6F",
        );

        let usdyc = Asset::new("testUSDYC", ISSUER).unwrap();
        assert_eq!(
            usdyc.contract_id(Network::Testnet).unwrap().address(),
            "CDUL7ZRS4GQSBNMKZEGBZ74HT4FE334CLU7BRWW445OMFCH3N4TVVQTT",
        );
    }

    #[test]
    fn call_builds_invocation() {
        let contract = Contract::from_string(CONTRACT).unwrap();
        let operation = contract.call("updt_price", vec![]).unwrap();
        match operation.body {
            OperationBody::InvokeHostFunction(op) => match op.host_function {
                HostFunction::InvokeContract(invocation) => {
                    assert_eq!(invocation.contract_address, contract.sc_address());
                    assert_eq!(invocation.function_name.0.as_slice(), b"updt_price");
                    assert!(invocation.args.is_empty());
                }
                other => panic!("wrong host function: {:?}", other),
            },
            other => panic!("wrong operation: {:?}", other),
        }
        assert!(contract.call(&"f".repeat(33), vec![]).is_err());
    }
}
