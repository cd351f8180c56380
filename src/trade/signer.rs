//! Local private-key signer
//!
//! Signs legacy transactions with a key read from the environment. Nonce
//! and gas price come from the chain at signing time.

use super::{TransactionSigner, UnsignedCall};
use crate::rpc::{ChainRpc, SignedTransaction};
use alloy_eips::eip2718::Encodable2718;
use alloy_primitives::Address;
use alloy_provider::network::{EthereumWallet, TransactionBuilder};
use alloy_rpc_types_eth::TransactionRequest;
use alloy_signer_local::PrivateKeySigner;
use anyhow::Context;
use async_trait::async_trait;
use std::str::FromStr;
use std::sync::Arc;
use tokio::sync::Mutex;

/// Signer holding a hex private key in memory
pub struct LocalKeySigner {
    address: Address,
    wallet: EthereumWallet,
    rpc: Arc<dyn ChainRpc>,
    /// Next nonce this signer handed out
    next_nonce: Mutex<Option<u64>>,
}

impl LocalKeySigner {
    /// Parse a hex key, with or without the `0x` prefix
    pub fn new(private_key: &str, rpc: Arc<dyn ChainRpc>) -> anyhow::Result<Self> {
        let signer = PrivateKeySigner::from_str(private_key.trim()).context("invalid private key")?;
        Ok(Self {
            address: signer.address(),
            wallet: EthereumWallet::from(signer),
            rpc,
            next_nonce: Mutex::new(None),
        })
    }

    /// Read the key from environment variable `var`
    pub fn from_env(var: &str, rpc: Arc<dyn ChainRpc>) -> anyhow::Result<Self> {
        let key = std::env::var(var).with_context(|| format!("{var} is not set"))?;
        Self::new(&key, rpc)
    }

    /// Chain's pending nonce, or one past the last nonce used here if that is higher
    async fn reserve_nonce(&self) -> anyhow::Result<u64> {
        let mut next = self.next_nonce.lock().await;
        let pending = self
            .rpc
            .transaction_count(self.address)
            .await
            .context("failed to fetch nonce")?;
        let nonce = next.map_or(pending, |local| local.max(pending));
        *next = Some(nonce + 1);
        Ok(nonce)
    }
}

#[async_trait]
impl TransactionSigner for LocalKeySigner {
    fn address(&self) -> Address {
        self.address
    }

    async fn sign(&self, call: &UnsignedCall) -> anyhow::Result<SignedTransaction> {
        let gas_price = self.rpc.gas_price().await.context("failed to fetch gas price")?;
        let nonce = self.reserve_nonce().await?;

        let request = TransactionRequest::default()
            .with_from(self.address)
            .with_to(call.to)
            .with_input(call.data.clone())
            .with_value(call.value)
            .with_chain_id(call.chain_id)
            .with_nonce(nonce)
            .with_gas_limit(call.gas_limit)
            .with_gas_price(gas_price);

        let envelope = request
            .build(&self.wallet)
            .await
            .map_err(|e| anyhow::anyhow!("signing failed for call to {}: {e}", call.to))?;

        tracing::debug!(to = %call.to, nonce, gas_price, "Signed transaction");

        Ok(SignedTransaction::with_hash(envelope.encoded_2718(), *envelope.tx_hash()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testkit::MockRpc;
    use alloy_primitives::{address, keccak256, Bytes, U256};

    // Well-known development key (anvil account 0)
    const DEV_KEY: &str = "0xac0974bec39a17e36ba4a6b4d238ff944bacb478cbed5efcae784d7bf4f2ff80";
    const DEV_ADDRESS: Address = address!("f39Fd6e51aad88F6F4ce6aB8827279cffFb92266");

    fn call() -> UnsignedCall {
        UnsignedCall {
            chain_id: 97,
            to: Address::repeat_byte(0x0a),
            data: Bytes::from(vec![0xde, 0xad, 0xbe, 0xef]),
            value: U256::from(1_000u64),
            gas_limit: 300_000,
        }
    }

    #[test]
    fn test_address_from_key() {
        let rpc = Arc::new(MockRpc::new("http://a"));
        let signer = LocalKeySigner::new(DEV_KEY, rpc.clone()).unwrap();
        assert_eq!(signer.address(), DEV_ADDRESS);

        let unprefixed = LocalKeySigner::new(&DEV_KEY[2..], rpc).unwrap();
        assert_eq!(unprefixed.address(), DEV_ADDRESS);
    }

    #[test]
    fn test_invalid_key_rejected() {
        let rpc = Arc::new(MockRpc::new("http://a"));
        assert!(LocalKeySigner::new("0x1234", rpc).is_err());
    }

    #[test]
    fn test_missing_env_var_rejected() {
        let rpc = Arc::new(MockRpc::new("http://a"));
        let err = LocalKeySigner::from_env("SNIPE_RACE_TEST_UNSET_KEY", rpc).err().unwrap();
        assert!(err.to_string().contains("SNIPE_RACE_TEST_UNSET_KEY"));
    }

    #[tokio::test]
    async fn test_sign_produces_hashed_legacy_transaction() {
        let rpc = Arc::new(MockRpc::new("http://a").nonce(7).gas_price(5_000_000_000));
        let signer = LocalKeySigner::new(DEV_KEY, rpc).unwrap();

        let signed = signer.sign(&call()).await.unwrap();
        let raw = signed.raw();

        // Legacy transactions are a bare RLP list
        assert!(raw[0] >= 0xc0);
        assert_eq!(signed.hash(), Some(keccak256(raw)));
    }

    #[tokio::test]
    async fn test_back_to_back_signs_use_fresh_nonces() {
        let rpc = Arc::new(MockRpc::new("http://a").nonce(3));
        let signer = LocalKeySigner::new(DEV_KEY, rpc).unwrap();

        // Chain still reports 3 for the second call; the local counter moves on
        assert_eq!(signer.reserve_nonce().await.unwrap(), 3);
        assert_eq!(signer.reserve_nonce().await.unwrap(), 4);

        let first = signer.sign(&call()).await.unwrap();
        let second = signer.sign(&call()).await.unwrap();
        assert_ne!(first.hash(), second.hash());
    }

    #[tokio::test]
    async fn test_unreachable_node_fails_signing() {
        let rpc = Arc::new(MockRpc::new("http://a").unreachable());
        let signer = LocalKeySigner::new(DEV_KEY, rpc).unwrap();
        assert!(signer.sign(&call()).await.is_err());
    }
}
