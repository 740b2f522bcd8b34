//! Test fixtures sourced from environment variables.
//!
//! Nothing here is discovered or defaulted: the key pairs and contract
//! handles are exactly the ones the deploy produced, and a missing
//! variable is an error naming it. The variable names match the demo's
//! `.env` file.

use std::env;

use crate::contract::{Asset, AssetError, Contract, ParseContractError};
use crate::keys::{Keypair, ParseKeyError};

/// Everything the scripts share: who signs and what gets called.
#[derive(Debug)]
pub struct Fixtures {
    /// Issues both assets.
    pub issuer: Keypair,
    /// Sells USDyc through the vault and administers the offer.
    pub distributor: Keypair,
    /// The buyer.
    pub alice: Keypair,
    /// Receives the buy token from deposits.
    pub treasury: Keypair,
    pub usdyc: Asset,
    pub usdc: Asset,
    pub vault: Contract,
    pub usdyc_contract: Contract,
    pub usdc_contract: Contract,
}

impl Fixtures {
    pub fn from_env() -> Result<Self, FixtureError> {
        let issuer = keypair("ISSUER_KEYS")?;
        let distributor = keypair("DISTRIBUTOR_KEYS")?;
        let alice = keypair("ALICE_KEYS")?;
        let treasury = keypair("TREASURY_KEYS")?;

        let issuer_public = issuer.public_key();
        let usdyc = asset("testUSDYC", &issuer_public)?;
        let usdc = asset("USDC", &issuer_public)?;

        let vault = contract("VAULT_ADDRESS")?;
        let usdyc_contract = contract("USDYC_CONTRACT")?;
        let usdc_contract = contract("USDC_CONTRACT")?;

        Ok(Fixtures {
            issuer,
            distributor,
            alice,
            treasury,
            usdyc,
            usdc,
            vault,
            usdyc_contract,
            usdc_contract,
        })
    }
}

fn var(name: &'static str) -> Result<String, FixtureError> {
    env::var(name).map_err(|_| FixtureError::Missing(name))
}

fn keypair(name: &'static str) -> Result<Keypair, FixtureError> {
    Keypair::from_secret(&var(name)?).map_err(|error| FixtureError::InvalidKey { var: name, error })
}

fn contract(name: &'static str) -> Result<Contract, FixtureError> {
    Contract::from_string(&var(name)?)
        .map_err(|error| FixtureError::InvalidContract { var: name, error })
}

fn asset(code: &'static str, issuer: &str) -> Result<Asset, FixtureError> {
    Asset::new(code, issuer).map_err(|error| FixtureError::InvalidAsset { code, error })
}

#[derive(Debug)]
pub enum FixtureError {
    Missing(&'static str),
    InvalidKey {
        var: &'static str,
        error: ParseKeyError,
    },
    InvalidContract {
        var: &'static str,
        error: ParseContractError,
    },
    InvalidAsset {
        code: &'static str,
        error: AssetError,
    },
}
