use std::fmt;

use async_trait::async_trait;
use web3::{
    signing::SecretKeyRef,
    transports::Http,
    types::{BlockId, BlockNumber},
    Transport as _, Web3,
};

use crate::{
    Address, Bytes, CallRequest, Error, EthInterface, FeeData, PrivateKeySigner,
    SignedTransaction, TransactionParameters, TransactionReceipt, H256, U256,
};

/// HTTP-based ledger client. Cloning is cheap; clones share the underlying connection pool.
#[derive(Clone)]
pub struct QueryClient {
    url: String,
    web3: Web3<Http>,
}

impl fmt::Debug for QueryClient {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter
            .debug_struct("QueryClient")
            .field("url", &self.url)
            .finish_non_exhaustive()
    }
}

impl QueryClient {
    /// Creates a client for the node at the provided URL.
    pub fn new(url: &str) -> Result<Self, Error> {
        let transport = Http::new(url)?;
        tracing::info!("Created JSON-RPC client for {url}");
        Ok(Self {
            url: url.to_owned(),
            web3: Web3::new(transport),
        })
    }

    async fn max_priority_fee_per_gas(&self) -> Result<U256, Error> {
        const METHOD: &str = "eth_maxPriorityFeePerGas";

        let value = self.web3.transport().execute(METHOD, vec![]).await?;
        serde_json::from_value(value).map_err(|err| Error::invalid_response(METHOD, err.to_string()))
    }
}

#[async_trait]
impl EthInterface for QueryClient {
    async fn chain_id(&self) -> Result<u64, Error> {
        let chain_id = self.web3.eth().chain_id().await?;
        if chain_id > U256::from(u64::MAX) {
            return Err(Error::invalid_response(
                "eth_chainId",
                format!("chain ID {chain_id} does not fit into u64"),
            ));
        }
        Ok(chain_id.as_u64())
    }

    async fn fee_data(&self) -> Result<FeeData, Error> {
        let eth = self.web3.eth();
        let (block, priority_fee) = futures::join!(
            eth.block(BlockId::Number(BlockNumber::Latest)),
            self.max_priority_fee_per_gas(),
        );

        let block = block?.ok_or_else(|| {
            Error::invalid_response("eth_getBlockByNumber", "latest block is not available")
        })?;
        // Nodes without fee market support reject this call; treat that as "no value".
        let priority_fee = priority_fee
            .inspect_err(|err| tracing::debug!("`eth_maxPriorityFeePerGas` is unavailable: {err}"))
            .ok();

        Ok(FeeData::from_block_fees(block.base_fee_per_gas, priority_fee))
    }

    async fn estimate_gas(&self, request: CallRequest) -> Result<U256, Error> {
        Ok(self.web3.eth().estimate_gas(request, None).await?)
    }

    async fn pending_nonce(&self, account: Address) -> Result<U256, Error> {
        Ok(self
            .web3
            .eth()
            .transaction_count(account, Some(BlockNumber::Pending))
            .await?)
    }

    async fn balance(&self, account: Address) -> Result<U256, Error> {
        Ok(self.web3.eth().balance(account, None).await?)
    }

    async fn sign_transaction(
        &self,
        tx: TransactionParameters,
        signer: &PrivateKeySigner,
    ) -> Result<SignedTransaction, Error> {
        let key = SecretKeyRef::new(signer.secret_key());
        Ok(self.web3.accounts().sign_transaction(tx, key).await?)
    }

    async fn send_raw_tx(&self, raw_tx: Bytes) -> Result<H256, Error> {
        Ok(self.web3.eth().send_raw_transaction(raw_tx).await?)
    }

    async fn tx_receipt(&self, tx_hash: H256) -> Result<Option<TransactionReceipt>, Error> {
        Ok(self.web3.eth().transaction_receipt(tx_hash).await?)
    }
}
