//! Scripted collaborators for monitor and coordinator tests.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use anchor_client::solana_sdk::{pubkey::Pubkey, signature::Signature};
use anyhow::Result;
use async_trait::async_trait;
use tokio::sync::Notify;

use crate::compliance::Side;
use crate::display::PoolRow;
use crate::service::{
    ActiveBucket, DiscoverySink, IntentKind, LiquidityIntent, PoolService, RawPosition,
    WalletSigner,
};
use crate::state::BucketRange;

/// A ledger-affecting call recorded by [`ScriptedPoolService`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServiceCall {
    Remove {
        position: Pubkey,
        range: BucketRange,
    },
    Add {
        position: Pubkey,
        range: BucketRange,
        total_x: u64,
        total_y: u64,
        side: Side,
    },
}

/// Pool gateway with queued active-bucket responses and recorded liquidity
/// calls. An exhausted queue repeats the last successful response.
#[derive(Default)]
pub struct ScriptedPoolService {
    active: Mutex<VecDeque<Result<ActiveBucket, String>>>,
    last_ok: Mutex<Option<ActiveBucket>>,
    positions: Mutex<Vec<RawPosition>>,
    calls: Mutex<Vec<ServiceCall>>,
    active_calls: AtomicUsize,
    position_fetches: AtomicUsize,
    fail_remove: AtomicBool,
    fail_add: AtomicBool,
    remove_gate: Mutex<Option<Arc<Notify>>>,
}

impl ScriptedPoolService {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_active(&self, id: i32, price: f64) {
        self.active
            .lock()
            .unwrap()
            .push_back(Ok(ActiveBucket { id, price }));
    }

    pub fn push_active_error(&self, message: &str) {
        self.active.lock().unwrap().push_back(Err(message.into()));
    }

    pub fn set_positions(&self, positions: Vec<RawPosition>) {
        *self.positions.lock().unwrap() = positions;
    }

    pub fn fail_remove_calls(&self) {
        self.fail_remove.store(true, Ordering::SeqCst);
    }

    pub fn fail_add_calls(&self) {
        self.fail_add.store(true, Ordering::SeqCst);
    }

    /// Make remove calls park until the returned handle is notified, so a
    /// test can observe an in-flight adjustment.
    pub fn hold_removals(&self) -> Arc<Notify> {
        let gate = Arc::new(Notify::new());
        *self.remove_gate.lock().unwrap() = Some(Arc::clone(&gate));
        gate
    }

    pub fn calls(&self) -> Vec<ServiceCall> {
        self.calls.lock().unwrap().clone()
    }

    pub fn active_calls(&self) -> usize {
        self.active_calls.load(Ordering::SeqCst)
    }

    pub fn position_fetches(&self) -> usize {
        self.position_fetches.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl PoolService for ScriptedPoolService {
    async fn active_bucket(&self) -> Result<ActiveBucket> {
        self.active_calls.fetch_add(1, Ordering::SeqCst);
        match self.active.lock().unwrap().pop_front() {
            Some(Ok(active)) => {
                *self.last_ok.lock().unwrap() = Some(active);
                Ok(active)
            }
            Some(Err(message)) => Err(anyhow::anyhow!(message)),
            None => self
                .last_ok
                .lock()
                .unwrap()
                .ok_or_else(|| anyhow::anyhow!("no scripted active bucket")),
        }
    }

    async fn positions_for_owner(&self, _owner: &Pubkey) -> Result<Vec<RawPosition>> {
        self.position_fetches.fetch_add(1, Ordering::SeqCst);
        Ok(self.positions.lock().unwrap().clone())
    }

    async fn remove_liquidity(
        &self,
        position: &Pubkey,
        range: BucketRange,
    ) -> Result<LiquidityIntent> {
        self.calls.lock().unwrap().push(ServiceCall::Remove {
            position: *position,
            range,
        });
        let gate = self.remove_gate.lock().unwrap().clone();
        if let Some(gate) = gate {
            gate.notified().await;
        }
        if self.fail_remove.load(Ordering::SeqCst) {
            anyhow::bail!("remove rejected");
        }
        Ok(LiquidityIntent {
            kind: IntentKind::RemoveLiquidity,
            transactions: vec!["dHg=".into()],
        })
    }

    async fn add_liquidity_with_strategy(
        &self,
        position: &Pubkey,
        range: BucketRange,
        total_x: u64,
        total_y: u64,
        side: Side,
    ) -> Result<LiquidityIntent> {
        self.calls.lock().unwrap().push(ServiceCall::Add {
            position: *position,
            range,
            total_x,
            total_y,
            side,
        });
        if self.fail_add.load(Ordering::SeqCst) {
            anyhow::bail!("add rejected");
        }
        Ok(LiquidityIntent {
            kind: IntentKind::AddLiquidity,
            transactions: vec!["dHg=".into()],
        })
    }
}

/// Signer that records submitted intent kinds; failures are injectable per
/// kind.
pub struct RecordingSigner {
    identity: Pubkey,
    submitted: Mutex<Vec<IntentKind>>,
    fail_kinds: Mutex<Vec<IntentKind>>,
}

impl RecordingSigner {
    pub fn new() -> Self {
        Self {
            identity: Pubkey::new_unique(),
            submitted: Mutex::new(Vec::new()),
            fail_kinds: Mutex::new(Vec::new()),
        }
    }

    pub fn fail_on(&self, kind: IntentKind) {
        self.fail_kinds.lock().unwrap().push(kind);
    }

    pub fn submissions(&self) -> Vec<IntentKind> {
        self.submitted.lock().unwrap().clone()
    }
}

#[async_trait]
impl WalletSigner for RecordingSigner {
    fn public_identity(&self) -> Pubkey {
        self.identity
    }

    async fn sign_and_submit(&self, intent: LiquidityIntent) -> Result<Vec<Signature>> {
        self.submitted.lock().unwrap().push(intent.kind);
        if self.fail_kinds.lock().unwrap().contains(&intent.kind) {
            anyhow::bail!("submission rejected");
        }
        Ok(vec![Signature::default(); intent.transactions.len()])
    }
}

/// Display sink that keeps every row snapshot it receives.
#[derive(Default)]
pub struct RecordingSink {
    updates: Mutex<Vec<Vec<PoolRow>>>,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn update_count(&self) -> usize {
        self.updates.lock().unwrap().len()
    }

    pub fn last_rows(&self) -> Option<Vec<PoolRow>> {
        self.updates.lock().unwrap().last().cloned()
    }
}

#[async_trait]
impl DiscoverySink for RecordingSink {
    async fn update_pools_data(&self, rows: Vec<PoolRow>) {
        self.updates.lock().unwrap().push(rows);
    }
}

/// Raw bucket payload in the shape the gateway hands to the parser.
pub fn raw_bucket(id: i32, amount_x: u64, amount_y: u64) -> serde_json::Value {
    serde_json::json!({
        "binId": id,
        "positionXAmount": amount_x.to_string(),
        "positionYAmount": amount_y.to_string(),
    })
}
