//! Ledger client used by the transfer spammer.
//!
//! The crate does not talk JSON-RPC or sign transactions by itself; it wraps the `web3` crate
//! behind [`EthInterface`] so that the components sending transactions can be tested against
//! [`MockEthereum`](crate::clients::MockEthereum).

use std::fmt;

use async_trait::async_trait;

pub use crate::{
    signer::PrivateKeySigner,
    types::{
        Address, Bytes, CallRequest, Error, FeeData, SignedTransaction, SignerError,
        TransactionParameters, TransactionReceipt, H256, U256, U64,
    },
};

pub mod clients;
mod signer;
mod types;

/// Common ledger node interface, as seen by the spammer.
///
/// ## Trait contents
///
/// Methods of this trait are not bound to a particular account: the sender is either passed
/// explicitly or derived from the signer. Implementations must be safe to share between
/// concurrently running workers; none of the methods retries on failure.
#[async_trait]
pub trait EthInterface: 'static + Sync + Send + fmt::Debug {
    /// Returns the chain ID reported by the node.
    async fn chain_id(&self) -> Result<u64, Error>;

    /// Returns the current fee market data. Fields the node cannot provide are left as `None`.
    async fn fee_data(&self) -> Result<FeeData, Error>;

    /// Estimates the gas consumed by the provided call.
    async fn estimate_gas(&self, request: CallRequest) -> Result<U256, Error>;

    /// Returns the nonce of the provided account including pending transactions.
    async fn pending_nonce(&self, account: Address) -> Result<U256, Error>;

    /// Returns the native balance of the provided account at the latest block.
    async fn balance(&self, account: Address) -> Result<U256, Error>;

    /// Signs the transaction with the provided key.
    ///
    /// No network calls are performed if `nonce`, `chain_id` and fee fields are set.
    async fn sign_transaction(
        &self,
        tx: TransactionParameters,
        signer: &PrivateKeySigner,
    ) -> Result<SignedTransaction, Error>;

    /// Broadcasts a signed transaction.
    async fn send_raw_tx(&self, raw_tx: Bytes) -> Result<H256, Error>;

    /// Returns the receipt for the specified transaction hash.
    ///
    /// Returns `Ok(None)` if the transaction is either not found or not included yet.
    async fn tx_receipt(&self, tx_hash: H256) -> Result<Option<TransactionReceipt>, Error>;
}
