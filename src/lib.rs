//! Client-side plumbing for the vault demo on the Stellar test network.
//!
//! This crate contains everything the demo scripts share: key handling,
//! transaction construction, the Soroban RPC client with its poll loop and
//! the fixtures loaded from environment variables. It deliberately contains
//! no contract logic - the vault and token contracts are already deployed
//! and this crate only invokes them.
//!
//! [`rpc::Server::invoke`] is the entry point most scripts use. It performs
//! the documented transaction lifecycle in order: fetch the account, build
//! the envelope, simulate, assemble, sign, send and poll.

pub mod network;
pub mod keys;
pub mod scval;
pub mod contract;
pub mod tx;
pub mod rpc;
pub mod fixtures;
