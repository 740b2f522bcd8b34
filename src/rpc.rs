//! The Soroban RPC client and the transaction lifecycle.
//!
//! One JSON-RPC 2.0 endpoint, four methods, no retry policy: a submitted
//! transaction is polled by hash until it leaves `NOT_FOUND` or a fixed
//! attempt budget runs out. [`Server::invoke`] strings the documented
//! lifecycle together in order - fetch the account, build, simulate,
//! assemble, sign, send, poll - which is everything the scripts need.

use std::time::Duration;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use stellar_xdr::curr::{
    AccountEntry, LedgerEntryData, LedgerKey, LedgerKeyAccount, Limits, Operation, ReadXdr, ScVal,
    SorobanAuthorizationEntry, SorobanTransactionData, Transaction, TransactionEnvelope,
    TransactionMeta, TransactionResult, WriteXdr,
};
use tracing::{debug, info};

use crate::keys::Keypair;
use crate::network::{Network, TESTNET_RPC_URL};
use crate::tx::{self, TransactionBuilder};

/// A Soroban RPC endpoint.
pub struct Server {
    client: reqwest::Client,
    url: String,
    network: Network,
}

impl Server {
    pub fn new(url: impl Into<String>, network: Network) -> Self {
        Server {
            client: reqwest::Client::new(),
            url: url.into(),
            network,
        }
    }

    /// The endpoint all scripts use.
    pub fn testnet() -> Self {
        Server::new(TESTNET_RPC_URL, Network::Testnet)
    }

    pub fn network(&self) -> Network {
        self.network
    }

    async fn request<P: Serialize, R: DeserializeOwned>(
        &self,
        method: &str,
        params: P,
    ) -> Result<R, Error> {
        let request = Request {
            jsonrpc: "2.0",
            id: 1,
            method,
            params,
        };
        let response: Response<R> = self
            .client
            .post(&self.url)
            .json(&request)
            .send()
            .await?
            .json()
            .await?;
        if let Some(error) = response.error {
            return Err(Error::Rpc(error));
        }
        response.result.ok_or(Error::MissingResult)
    }

    /// Fetches the ledger entry of an account, mainly for its sequence
    /// number.
    pub async fn get_account(&self, account: &Keypair) -> Result<AccountEntry, Error> {
        let key = LedgerKey::Account(LedgerKeyAccount {
            account_id: account.account_id(),
        });
        let params = GetLedgerEntriesParams {
            keys: vec![key.to_xdr_base64(Limits::none())?],
        };
        let response: GetLedgerEntriesResponse = self.request("getLedgerEntries", params).await?;
        let entry = response
            .entries
            .unwrap_or_default()
            .into_iter()
            .next()
            .ok_or_else(|| Error::AccountNotFound(account.public_key()))?;
        decode_account_entry(&entry.xdr)
    }

    /// Simulates the transaction against the current ledger state. A
    /// simulation that the server itself rejects is already an error here,
    /// before anything gets signed.
    pub async fn simulate_transaction(
        &self,
        tx: &Transaction,
    ) -> Result<SimulateTransactionResponse, Error> {
        let params = TransactionParams {
            transaction: tx::unsigned_envelope(tx).to_xdr_base64(Limits::none())?,
        };
        let mut response: SimulateTransactionResponse =
            self.request("simulateTransaction", params).await?;
        if let Some(error) = response.error.take() {
            return Err(Error::Simulation(error));
        }
        Ok(response)
    }

    pub async fn send_transaction(
        &self,
        envelope: &TransactionEnvelope,
    ) -> Result<SendTransactionResponse, Error> {
        let params = TransactionParams {
            transaction: envelope.to_xdr_base64(Limits::none())?,
        };
        self.request("sendTransaction", params).await
    }

    /// Looks up a submitted transaction by its hex-encoded hash.
    pub async fn get_transaction(&self, hash: &str) -> Result<GetTransactionResponse, Error> {
        let params = GetTransactionParams {
            hash: hash.to_owned(),
        };
        self.request("getTransaction", params).await
    }

    /// The poll loop: repeated status checks until the transaction
    /// finalizes or the attempt budget is exhausted.
    pub async fn wait_for_transaction(
        &self,
        hash: &str,
        poll: &Poll,
    ) -> Result<GetTransactionResponse, Error> {
        for attempt in 1..=poll.attempts {
            let response = self.get_transaction(hash).await?;
            match response.status {
                TransactionStatus::NotFound => {
                    debug!(hash, attempt, "transaction not in the ledger yet");
                    tokio::time::sleep(poll.delay).await;
                }
                _ => return Ok(response),
            }
        }
        Err(Error::PollBudgetExhausted {
            attempts: poll.attempts,
        })
    }

    /// The whole lifecycle for one signed contract invocation.
    ///
    /// The final status may still be `FAILED`; the caller gets the polled
    /// response either way and decides what to print.
    pub async fn invoke(&self, signer: &Keypair, operation: Operation) -> Result<Invocation, Error> {
        let account = self.get_account(signer).await?;
        let tx = TransactionBuilder::new(signer, account.seq_num.0)
            .add_operation(operation)
            .build()?;

        let simulation = self.simulate_transaction(&tx).await?;
        let tx = tx::assemble(
            tx,
            simulation.soroban_data()?,
            simulation.resource_fee()?,
            simulation.auth_entries()?,
        )?;

        let hash = hex::encode(tx::hash(&tx, self.network)?);
        let envelope = tx::sign(tx, signer, self.network)?;

        let sent = self.send_transaction(&envelope).await?;
        info!(hash = hash.as_str(), status = ?sent.status, "transaction submitted");
        match sent.status {
            SendStatus::Pending | SendStatus::Duplicate => {}
            SendStatus::TryAgainLater | SendStatus::Error => {
                return Err(Error::Submit(Box::new(sent)));
            }
        }

        let confirmed = self.wait_for_transaction(&hash, &Poll::default()).await?;
        info!(hash = hash.as_str(), status = ?confirmed.status, "transaction finalized");
        Ok(Invocation {
            hash,
            sent,
            confirmed,
        })
    }

    /// A read-only call: simulate and return the result value without
    /// submitting anything.
    pub async fn query(&self, source: &Keypair, operation: Operation) -> Result<ScVal, Error> {
        let account = self.get_account(source).await?;
        let tx = TransactionBuilder::new(source, account.seq_num.0)
            .add_operation(operation)
            .build()?;
        let simulation = self.simulate_transaction(&tx).await?;
        simulation.return_value()
    }
}

/// The result of a submitted invocation: the send response and the final
/// polled status.
#[derive(Debug)]
pub struct Invocation {
    pub hash: String,
    pub sent: SendTransactionResponse,
    pub confirmed: GetTransactionResponse,
}

/// The fixed poll budget. There is deliberately nothing smarter here: a
/// testnet transaction either closes within a ledger or two, or something
/// is wrong enough that a human should look at it.
#[derive(Debug, Clone)]
pub struct Poll {
    pub attempts: u32,
    pub delay: Duration,
}

impl Default for Poll {
    fn default() -> Self {
        Poll {
            attempts: 30,
            delay: Duration::from_secs(1),
        }
    }
}

#[derive(Serialize)]
struct Request<'a, P> {
    jsonrpc: &'static str,
    id: u32,
    method: &'a str,
    params: P,
}

#[derive(Deserialize)]
struct Response<T> {
    result: Option<T>,
    #[serde(default)]
    error: Option<RpcError>,
}

/// An error object returned by the server itself.
#[derive(Debug, Clone, Deserialize)]
pub struct RpcError {
    pub code: i64,
    #[serde(default)]
    pub message: String,
}

#[derive(Serialize)]
struct GetLedgerEntriesParams {
    keys: Vec<String>,
}

#[derive(Serialize)]
struct TransactionParams {
    transaction: String,
}

#[derive(Serialize)]
struct GetTransactionParams {
    hash: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GetLedgerEntriesResponse {
    #[serde(default)]
    pub entries: Option<Vec<LedgerEntryResult>>,
    pub latest_ledger: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LedgerEntryResult {
    pub key: String,
    pub xdr: String,
    #[serde(default)]
    pub last_modified_ledger_seq: Option<u32>,
    #[serde(default)]
    pub live_until_ledger_seq: Option<u32>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SimulateTransactionResponse {
    #[serde(default)]
    pub error: Option<String>,
    #[serde(default)]
    pub transaction_data: Option<String>,
    #[serde(default)]
    pub min_resource_fee: Option<String>,
    #[serde(default)]
    pub results: Option<Vec<SimulateHostFunctionResult>>,
    #[serde(default)]
    pub events: Option<Vec<String>>,
    pub latest_ledger: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SimulateHostFunctionResult {
    #[serde(default)]
    pub auth: Vec<String>,
    #[serde(default)]
    pub xdr: Option<String>,
}

impl SimulateTransactionResponse {
    /// The resource footprint to fold into the transaction.
    pub fn soroban_data(&self) -> Result<SorobanTransactionData, Error> {
        let data = self
            .transaction_data
            .as_ref()
            .ok_or(Error::IncompleteSimulation)?;
        Ok(SorobanTransactionData::from_xdr_base64(
            data.as_str(),
            Limits::none(),
        )?)
    }

    pub fn resource_fee(&self) -> Result<u64, Error> {
        self.min_resource_fee
            .as_ref()
            .ok_or(Error::IncompleteSimulation)?
            .parse()
            .map_err(Error::InvalidResourceFee)
    }

    /// The recorded authorization entries, one list across all results.
    pub fn auth_entries(&self) -> Result<Vec<SorobanAuthorizationEntry>, Error> {
        match &self.results {
            Some(results) => results
                .iter()
                .flat_map(|result| result.auth.iter())
                .map(|entry| {
                    Ok(SorobanAuthorizationEntry::from_xdr_base64(
                        entry.as_str(),
                        Limits::none(),
                    )?)
                })
                .collect(),
            None => Ok(Vec::new()),
        }
    }

    /// The simulated return value of the invocation.
    pub fn return_value(&self) -> Result<ScVal, Error> {
        let result = self
            .results
            .as_ref()
            .and_then(|results| results.first())
            .ok_or(Error::IncompleteSimulation)?;
        let xdr = result.xdr.as_ref().ok_or(Error::IncompleteSimulation)?;
        Ok(ScVal::from_xdr_base64(xdr.as_str(), Limits::none())?)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SendTransactionResponse {
    pub status: SendStatus,
    pub hash: String,
    pub latest_ledger: u32,
    #[serde(default)]
    pub latest_ledger_close_time: Option<String>,
    #[serde(default)]
    pub error_result_xdr: Option<String>,
    #[serde(default)]
    pub diagnostic_events_xdr: Option<Vec<String>>,
}

impl SendTransactionResponse {
    /// Decodes the result the core rejected the transaction with, if any.
    pub fn error_result(&self) -> Result<Option<TransactionResult>, Error> {
        match &self.error_result_xdr {
            Some(xdr) => Ok(Some(TransactionResult::from_xdr_base64(
                xdr.as_str(),
                Limits::none(),
            )?)),
            None => Ok(None),
        }
    }
}

#[derive(Debug, Copy, Clone, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SendStatus {
    Pending,
    Duplicate,
    TryAgainLater,
    Error,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GetTransactionResponse {
    pub status: TransactionStatus,
    pub latest_ledger: u32,
    #[serde(default)]
    pub latest_ledger_close_time: Option<String>,
    #[serde(default)]
    pub oldest_ledger: Option<u32>,
    #[serde(default)]
    pub oldest_ledger_close_time: Option<String>,
    #[serde(default)]
    pub application_order: Option<i32>,
    #[serde(default)]
    pub envelope_xdr: Option<String>,
    #[serde(default)]
    pub result_xdr: Option<String>,
    #[serde(default)]
    pub result_meta_xdr: Option<String>,
    #[serde(default)]
    pub ledger: Option<u32>,
    #[serde(default)]
    pub created_at: Option<String>,
}

#[derive(Debug, Copy, Clone, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TransactionStatus {
    NotFound,
    Success,
    Failed,
}

impl GetTransactionResponse {
    pub fn result(&self) -> Result<Option<TransactionResult>, Error> {
        match &self.result_xdr {
            Some(xdr) => Ok(Some(TransactionResult::from_xdr_base64(
                xdr.as_str(),
                Limits::none(),
            )?)),
            None => Ok(None),
        }
    }

    /// The value the invoked function returned, extracted from the
    /// transaction meta.
    pub fn return_value(&self) -> Result<Option<ScVal>, Error> {
        let meta = match &self.result_meta_xdr {
            Some(xdr) => TransactionMeta::from_xdr_base64(xdr.as_str(), Limits::none())?,
            None => return Ok(None),
        };
        match meta {
            TransactionMeta::V3(meta) => {
                Ok(meta.soroban_meta.map(|soroban| soroban.return_value))
            }
            _ => Ok(None),
        }
    }
}

fn decode_account_entry(xdr: &str) -> Result<AccountEntry, Error> {
    match LedgerEntryData::from_xdr_base64(xdr, Limits::none())? {
        LedgerEntryData::Account(entry) => Ok(entry),
        _ => Err(Error::UnexpectedLedgerEntry),
    }
}

#[derive(Debug)]
pub enum Error {
    Http(reqwest::Error),
    /// The server answered with a JSON-RPC error object.
    Rpc(RpcError),
    /// The response carried neither a result nor an error.
    MissingResult,
    Xdr(stellar_xdr::curr::Error),
    AccountNotFound(String),
    /// `getLedgerEntries` returned something that is not an account.
    UnexpectedLedgerEntry,
    /// The simulation itself failed; the string is the server's diagnostic.
    Simulation(String),
    /// The simulation succeeded but lacks data needed for assembly.
    IncompleteSimulation,
    InvalidResourceFee(std::num::ParseIntError),
    Build(tx::BuildError),
    Assemble(tx::AssembleError),
    /// The server refused the submission outright.
    Submit(Box<SendTransactionResponse>),
    PollBudgetExhausted {
        attempts: u32,
    },
}

impl From<reqwest::Error> for Error {
    fn from(error: reqwest::Error) -> Self {
        Error::Http(error)
    }
}

impl From<stellar_xdr::curr::Error> for Error {
    fn from(error: stellar_xdr::curr::Error) -> Self {
        Error::Xdr(error)
    }
}

impl From<tx::BuildError> for Error {
    fn from(error: tx::BuildError) -> Self {
        Error::Build(error)
    }
}

impl From<tx::AssembleError> for Error {
    fn from(error: tx::AssembleError) -> Self {
        Error::Assemble(error)
    }
}
