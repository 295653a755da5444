pub use web3::types::{
    Address, Bytes, CallRequest, SignedTransaction, TransactionParameters, TransactionReceipt,
    H256, U256, U64,
};

/// Priority fee assumed when the node reports a base fee but no priority fee suggestion.
pub(crate) const FALLBACK_PRIORITY_FEE_PER_GAS: u64 = 1_000_000_000;

/// Common error type exposed by the crate.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Problem on the node side or in the transport (e.g. bad RPC call, network issues).
    #[error("Request to ledger node failed: {0}")]
    EthereumGateway(#[from] web3::Error),
    /// The node answered, but the answer cannot be used.
    #[error("Unexpected response to `{method}`: {message}")]
    InvalidResponse {
        method: &'static str,
        message: String,
    },
    /// Problem with the transaction signer.
    #[error("Transaction signing failed: {0}")]
    Signer(#[from] SignerError),
}

impl Error {
    pub(crate) fn invalid_response(method: &'static str, message: impl Into<String>) -> Self {
        Self::InvalidResponse {
            method,
            message: message.into(),
        }
    }
}

#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum SignerError {
    #[error("invalid private key: {0}")]
    InvalidPrivateKey(String),
}

/// Fee market data as reported by the node.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FeeData {
    /// EIP-1559 fee cap.
    pub max_fee_per_gas: Option<U256>,
    /// EIP-1559 miner tip.
    pub max_priority_fee_per_gas: Option<U256>,
}

impl FeeData {
    /// Composes fee data from raw node values.
    ///
    /// Fields are only set if the latest block has a base fee. In that case the fee cap
    /// is twice the base fee plus the tip, so that the transaction survives a couple of full blocks.
    pub fn from_block_fees(base_fee_per_gas: Option<U256>, priority_fee: Option<U256>) -> Self {
        let Some(base_fee_per_gas) = base_fee_per_gas else {
            return Self::default();
        };

        let max_priority_fee_per_gas =
            priority_fee.unwrap_or_else(|| FALLBACK_PRIORITY_FEE_PER_GAS.into());
        let max_fee_per_gas = base_fee_per_gas
            .saturating_mul(2.into())
            .saturating_add(max_priority_fee_per_gas);
        Self {
            max_fee_per_gas: Some(max_fee_per_gas),
            max_priority_fee_per_gas: Some(max_priority_fee_per_gas),
        }
    }
}
