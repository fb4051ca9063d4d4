//! Ledger-facing collaborators: keypair signing and slot queries.

use std::sync::Arc;

use anchor_client::solana_sdk::{
    pubkey::Pubkey,
    signature::{Keypair, Signature},
    signer::Signer,
    transaction::Transaction,
};
use anyhow::{Context, Result};
use async_trait::async_trait;
use base64::{Engine as _, engine::general_purpose::STANDARD};
use solana_rpc_client::nonblocking::rpc_client::RpcClient;
use tracing::info;

use crate::retry::{RetryPolicy, with_retry};
use crate::service::{LedgerConnection, LiquidityIntent, WalletSigner};

/// Decode a gateway-prepared transaction from its base64 wire form.
fn decode_transaction(encoded: &str) -> Result<Transaction> {
    let bytes = STANDARD
        .decode(encoded)
        .context("prepared transaction is not valid base64")?;
    bincode::deserialize(&bytes).context("prepared transaction bytes did not deserialize")
}

/// Signs gateway-prepared transactions with the managed keypair and
/// submits them one at a time.
pub struct KeypairSigner {
    rpc: Arc<RpcClient>,
    keypair: Arc<Keypair>,
    retry: RetryPolicy,
}

impl KeypairSigner {
    pub fn new(rpc: Arc<RpcClient>, keypair: Arc<Keypair>) -> Self {
        Self {
            rpc,
            keypair,
            retry: RetryPolicy::default(),
        }
    }
}

#[async_trait]
impl WalletSigner for KeypairSigner {
    fn public_identity(&self) -> Pubkey {
        self.keypair.pubkey()
    }

    async fn sign_and_submit(&self, intent: LiquidityIntent) -> Result<Vec<Signature>> {
        let mut signatures = Vec::with_capacity(intent.transactions.len());
        for encoded in &intent.transactions {
            let mut transaction = decode_transaction(encoded)?;

            // Prepared transactions carry the gateway's blockhash, which
            // may already be stale; re-sign against a fresh one. Only the
            // blockhash query is retried, a submitted transaction is never
            // blindly resent.
            let blockhash = with_retry(self.retry, "latest-blockhash", || async {
                Ok(self.rpc.get_latest_blockhash().await?)
            })
            .await?;
            transaction
                .try_sign(&[self.keypair.as_ref()], blockhash)
                .context("transaction signing failed")?;

            let signature = self
                .rpc
                .send_and_confirm_transaction(&transaction)
                .await
                .with_context(|| format!("{} submission failed", intent.kind))?;
            info!(kind = %intent.kind, signature = %signature, "Transaction confirmed");
            signatures.push(signature);
        }
        Ok(signatures)
    }
}

/// Slot queries over the same RPC endpoint, used as a liveness check at
/// startup.
pub struct RpcLedgerConnection {
    rpc: Arc<RpcClient>,
    retry: RetryPolicy,
}

impl RpcLedgerConnection {
    pub fn new(rpc: Arc<RpcClient>) -> Self {
        Self {
            rpc,
            retry: RetryPolicy::default(),
        }
    }
}

#[async_trait]
impl LedgerConnection for RpcLedgerConnection {
    async fn current_slot(&self) -> Result<u64> {
        with_retry(self.retry, "current-slot", || async {
            Ok(self.rpc.get_slot().await?)
        })
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decodes_prepared_transaction() {
        let payer = Pubkey::new_unique();
        let transaction = Transaction::new_with_payer(&[], Some(&payer));
        let encoded = STANDARD.encode(bincode::serialize(&transaction).unwrap());

        let decoded = decode_transaction(&encoded).unwrap();
        assert_eq!(decoded, transaction);
    }

    #[test]
    fn test_rejects_invalid_base64() {
        let err = decode_transaction("!!not-base64!!").unwrap_err();
        assert!(format!("{err:#}").contains("base64"));
    }

    #[test]
    fn test_rejects_garbage_bytes() {
        let encoded = STANDARD.encode([0xffu8; 4]);
        assert!(decode_transaction(&encoded).is_err());
    }
}
