//! Notification plumbing between the price monitor and its subscribers.
//!
//! Handlers are invoked synchronously in registration order. A failing
//! handler is logged and skipped; it never blocks delivery to the rest or
//! aborts the monitor loop.

use std::sync::{Mutex, PoisonError};

use anchor_client::solana_sdk::pubkey::Pubkey;
use tracing::warn;

/// Raised whenever the active bucket id changes between refreshes.
#[derive(Debug, Clone, Copy)]
pub struct PriceChanged {
    pub previous_bucket_id: i32,
    pub bucket_id: i32,
    pub price: f64,
}

/// Raised when the active bucket moves into a different pool's range.
///
/// Either side can be `None` when the bucket came from, or moved to, a
/// region outside every tracked pool.
#[derive(Debug, Clone, Copy)]
pub struct PoolCrossed {
    pub from_pool: Option<Pubkey>,
    pub to_pool: Option<Pubkey>,
    pub bucket_id: i32,
}

type Handler<E> = Box<dyn Fn(&E) -> anyhow::Result<()> + Send + Sync>;

/// Ordered list of named event handlers.
pub struct HandlerList<E> {
    handlers: Mutex<Vec<(String, Handler<E>)>>,
}

impl<E> HandlerList<E> {
    pub fn new() -> Self {
        Self {
            handlers: Mutex::new(Vec::new()),
        }
    }

    pub fn register<F>(&self, name: impl Into<String>, handler: F)
    where
        F: Fn(&E) -> anyhow::Result<()> + Send + Sync + 'static,
    {
        self.handlers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push((name.into(), Box::new(handler)));
    }

    /// Deliver `event` to every handler in registration order, isolating
    /// failures per handler.
    pub fn emit(&self, event: &E) {
        let handlers = self
            .handlers
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        for (name, handler) in handlers.iter() {
            if let Err(e) = handler(event) {
                warn!(handler = %name, error = %e, "Event handler failed");
            }
        }
    }

    pub fn len(&self) -> usize {
        self.handlers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl<E> Default for HandlerList<E> {
    fn default() -> Self {
        Self::new()
    }
}
