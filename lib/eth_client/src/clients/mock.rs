use std::{
    collections::{hash_map::DefaultHasher, HashMap, HashSet},
    hash::Hasher,
    sync::{Arc, RwLock},
    time::Duration,
};

use async_trait::async_trait;

use crate::{
    Address, Bytes, CallRequest, Error, EthInterface, FeeData, PrivateKeySigner,
    SignedTransaction, TransactionParameters, TransactionReceipt, H256, U256, U64,
};

/// Transaction recorded by [`MockEthereum`].
#[derive(Debug, Clone, PartialEq)]
pub struct MockTx {
    pub hash: H256,
    pub from: Address,
    pub to: Option<Address>,
    pub value: U256,
    pub nonce: U256,
    pub gas: U256,
    pub max_fee_per_gas: Option<U256>,
    pub max_priority_fee_per_gas: Option<U256>,
}

/// Mutable part of [`MockEthereum`] that needs to be synchronized via an `RwLock`.
#[derive(Debug, Default)]
struct MockEthereumInner {
    block_number: u64,
    signed_txs: HashMap<H256, MockTx>,
    sent_txs: Vec<MockTx>,
    send_attempts: usize,
    estimate_calls: usize,
    fee_data_calls: usize,
    nonce_calls: usize,
    receipt_calls: usize,
    nonces: HashMap<Address, u64>,
    balances: HashMap<Address, U256>,
    receipts: HashMap<H256, (TransactionReceipt, usize)>,
}

impl MockEthereumInner {
    fn include_tx(&mut self, tx: &MockTx, gas_used: U256, success: bool, polls: usize) {
        self.block_number += 1;
        let receipt = TransactionReceipt {
            transaction_hash: tx.hash,
            block_number: Some(self.block_number.into()),
            gas_used: Some(gas_used),
            effective_gas_price: tx.max_fee_per_gas,
            status: Some(U64::from(u64::from(success))),
            ..TransactionReceipt::default()
        };
        self.receipts.insert(tx.hash, (receipt, polls));
    }

    fn transfer_value(&mut self, tx: &MockTx) {
        let sender_balance = self.balances.entry(tx.from).or_default();
        *sender_balance = sender_balance.saturating_sub(tx.value);
        if let Some(to) = tx.to {
            let recipient_balance = self.balances.entry(to).or_default();
            *recipient_balance = recipient_balance.saturating_add(tx.value);
        }
    }
}

/// Mock ledger client that records all incoming transactions for further analysis.
///
/// Transactions are included into a new block as soon as they are broadcast; the receipt becomes
/// visible after the configured number of polls. Sender nonces are validated, so a gap or a reuse
/// is rejected the same way a real node would. Accepted transfers move their value between
/// balances; fees are not charged.
#[derive(Debug, Clone)]
pub struct MockEthereum {
    chain_id: u64,
    fee_data: FeeData,
    estimated_gas: U256,
    receipt_polls: usize,
    broadcast_latency: Duration,
    failing_senders: HashSet<Address>,
    failing_sends: HashSet<usize>,
    failing_estimate_targets: HashSet<Address>,
    reverting_targets: HashSet<Address>,
    failing_fee_data: bool,
    failing_nonce_queries: bool,
    failing_receipts: bool,
    inner: Arc<RwLock<MockEthereumInner>>,
}

impl Default for MockEthereum {
    fn default() -> Self {
        Self {
            chain_id: 9,
            fee_data: FeeData {
                max_fee_per_gas: Some(100.into()),
                max_priority_fee_per_gas: Some(10.into()),
            },
            estimated_gas: 21_000.into(),
            receipt_polls: 0,
            broadcast_latency: Duration::ZERO,
            failing_senders: HashSet::new(),
            failing_sends: HashSet::new(),
            failing_estimate_targets: HashSet::new(),
            reverting_targets: HashSet::new(),
            failing_fee_data: false,
            failing_nonce_queries: false,
            failing_receipts: false,
            inner: Arc::default(),
        }
    }
}

/// Builds a node-side error similar to the ones surfaced by the HTTP transport.
fn node_error(message: impl Into<String>) -> Error {
    Error::EthereumGateway(web3::Error::InvalidResponse(message.into()))
}

impl MockEthereum {
    /// A fake hasher, which calculates an `std::hash` instead of Keccak.
    fn fake_hash(from: Address, nonce: U256, salt: usize) -> H256 {
        let mut hasher = DefaultHasher::new();
        hasher.write(from.as_bytes());
        hasher.write_u64(nonce.low_u64());
        hasher.write_usize(salt);
        H256::from_low_u64_be(hasher.finish())
    }

    pub fn with_chain_id(mut self, chain_id: u64) -> Self {
        self.chain_id = chain_id;
        self
    }

    pub fn with_fee_data(mut self, fee_data: FeeData) -> Self {
        self.fee_data = fee_data;
        self
    }

    pub fn with_estimated_gas(mut self, gas: u64) -> Self {
        self.estimated_gas = gas.into();
        self
    }

    /// Sets the number of `tx_receipt` calls returning `None` before the receipt is available.
    pub fn with_receipt_polls(mut self, polls: usize) -> Self {
        self.receipt_polls = polls;
        self
    }

    /// Makes every broadcast take the specified time.
    pub fn with_broadcast_latency(mut self, latency: Duration) -> Self {
        self.broadcast_latency = latency;
        self
    }

    /// Rejects all broadcasts from the specified account.
    pub fn with_failing_sender(mut self, sender: Address) -> Self {
        self.failing_senders.insert(sender);
        self
    }

    /// Rejects the broadcast with the specified zero-based ordinal (counted over all senders).
    pub fn with_failing_send(mut self, ordinal: usize) -> Self {
        self.failing_sends.insert(ordinal);
        self
    }

    /// Fails gas estimation for calls targeting the specified address.
    pub fn with_failing_estimate(mut self, target: Address) -> Self {
        self.failing_estimate_targets.insert(target);
        self
    }

    /// Includes transactions to the specified address with a failed status.
    pub fn with_reverting_target(mut self, target: Address) -> Self {
        self.reverting_targets.insert(target);
        self
    }

    /// Fails all `fee_data` queries.
    pub fn with_failing_fee_data(mut self) -> Self {
        self.failing_fee_data = true;
        self
    }

    /// Fails all `pending_nonce` queries.
    pub fn with_failing_nonce_queries(mut self) -> Self {
        self.failing_nonce_queries = true;
        self
    }

    /// Fails all `tx_receipt` queries. Broadcasts are still accepted and included.
    pub fn with_failing_receipts(mut self) -> Self {
        self.failing_receipts = true;
        self
    }

    pub fn with_balance(self, account: Address, balance: U256) -> Self {
        self.inner
            .write()
            .unwrap()
            .balances
            .insert(account, balance);
        self
    }

    /// Returns all accepted transactions in the order they were broadcast.
    pub fn sent_txs(&self) -> Vec<MockTx> {
        self.inner.read().unwrap().sent_txs.clone()
    }

    /// Returns accepted transactions sent by the specified account.
    pub fn sent_txs_from(&self, sender: Address) -> Vec<MockTx> {
        self.inner
            .read()
            .unwrap()
            .sent_txs
            .iter()
            .filter(|tx| tx.from == sender)
            .cloned()
            .collect()
    }

    /// Returns the number of broadcast attempts, including rejected ones.
    pub fn send_attempts(&self) -> usize {
        self.inner.read().unwrap().send_attempts
    }

    pub fn estimate_calls(&self) -> usize {
        self.inner.read().unwrap().estimate_calls
    }

    pub fn fee_data_calls(&self) -> usize {
        self.inner.read().unwrap().fee_data_calls
    }

    pub fn nonce_calls(&self) -> usize {
        self.inner.read().unwrap().nonce_calls
    }

    pub fn receipt_calls(&self) -> usize {
        self.inner.read().unwrap().receipt_calls
    }

    pub fn block_number(&self) -> u64 {
        self.inner.read().unwrap().block_number
    }
}

#[async_trait]
impl EthInterface for MockEthereum {
    async fn chain_id(&self) -> Result<u64, Error> {
        Ok(self.chain_id)
    }

    async fn fee_data(&self) -> Result<FeeData, Error> {
        self.inner.write().unwrap().fee_data_calls += 1;
        if self.failing_fee_data {
            return Err(node_error("fee history is unavailable"));
        }
        Ok(self.fee_data)
    }

    async fn estimate_gas(&self, request: CallRequest) -> Result<U256, Error> {
        self.inner.write().unwrap().estimate_calls += 1;
        if let Some(to) = request.to {
            if self.failing_estimate_targets.contains(&to) {
                return Err(node_error("execution reverted"));
            }
        }
        Ok(self.estimated_gas)
    }

    async fn pending_nonce(&self, account: Address) -> Result<U256, Error> {
        let mut inner = self.inner.write().unwrap();
        inner.nonce_calls += 1;
        if self.failing_nonce_queries {
            return Err(node_error("pending state is unavailable"));
        }
        Ok(inner.nonces.get(&account).copied().unwrap_or(0).into())
    }

    async fn balance(&self, account: Address) -> Result<U256, Error> {
        let inner = self.inner.read().unwrap();
        Ok(inner.balances.get(&account).copied().unwrap_or_default())
    }

    async fn sign_transaction(
        &self,
        tx: TransactionParameters,
        signer: &PrivateKeySigner,
    ) -> Result<SignedTransaction, Error> {
        let nonce = tx
            .nonce
            .ok_or_else(|| Error::invalid_response("sign", "nonce is not set"))?;
        let chain_id = tx
            .chain_id
            .ok_or_else(|| Error::invalid_response("sign", "chain ID is not set"))?;
        if chain_id != self.chain_id {
            return Err(Error::invalid_response(
                "sign",
                format!("chain ID mismatch: {chain_id} != {}", self.chain_id),
            ));
        }

        let mut inner = self.inner.write().unwrap();
        let hash = Self::fake_hash(signer.address(), nonce, inner.signed_txs.len());
        let mock_tx = MockTx {
            hash,
            from: signer.address(),
            to: tx.to,
            value: tx.value,
            nonce,
            gas: tx.gas,
            max_fee_per_gas: tx.max_fee_per_gas,
            max_priority_fee_per_gas: tx.max_priority_fee_per_gas,
        };
        inner.signed_txs.insert(hash, mock_tx);

        Ok(SignedTransaction {
            message_hash: hash,
            v: 0,
            r: H256::zero(),
            s: H256::zero(),
            raw_transaction: Bytes(hash.as_bytes().to_vec()),
            transaction_hash: hash,
        })
    }

    async fn send_raw_tx(&self, raw_tx: Bytes) -> Result<H256, Error> {
        if !self.broadcast_latency.is_zero() {
            tokio::time::sleep(self.broadcast_latency).await;
        }

        let mut inner = self.inner.write().unwrap();
        let ordinal = inner.send_attempts;
        inner.send_attempts += 1;

        if raw_tx.0.len() != 32 {
            return Err(node_error("rlp: unexpected input length"));
        }
        let hash = H256::from_slice(&raw_tx.0);
        let tx = inner
            .signed_txs
            .get(&hash)
            .cloned()
            .ok_or_else(|| node_error("transaction was not signed by this client"))?;

        if self.failing_sends.contains(&ordinal) {
            return Err(node_error("transaction pool is full"));
        }
        if self.failing_senders.contains(&tx.from) {
            return Err(node_error("insufficient funds for gas * price + value"));
        }
        let expected_nonce = inner.nonces.get(&tx.from).copied().unwrap_or(0);
        match tx.nonce.cmp(&expected_nonce.into()) {
            std::cmp::Ordering::Less => return Err(node_error("nonce too low")),
            std::cmp::Ordering::Greater => return Err(node_error("nonce too high")),
            std::cmp::Ordering::Equal => {}
        }

        inner.nonces.insert(tx.from, expected_nonce + 1);
        let success = tx.to.is_none_or(|to| !self.reverting_targets.contains(&to));
        inner.include_tx(&tx, self.estimated_gas, success, self.receipt_polls);
        if success {
            inner.transfer_value(&tx);
        }
        inner.sent_txs.push(tx);
        Ok(hash)
    }

    async fn tx_receipt(&self, tx_hash: H256) -> Result<Option<TransactionReceipt>, Error> {
        let mut inner = self.inner.write().unwrap();
        inner.receipt_calls += 1;
        if self.failing_receipts {
            return Err(node_error("receipt lookup timed out"));
        }
        let Some((receipt, polls_left)) = inner.receipts.get_mut(&tx_hash) else {
            return Ok(None);
        };
        if *polls_left > 0 {
            *polls_left -= 1;
            return Ok(None);
        }
        Ok(Some(receipt.clone()))
    }
}
