//! Single-writer book actor
//!
//! One tokio task owns the [`OrderBookStore`] and drains a bounded command
//! queue in arrival order. Every command is answered over a oneshot channel
//! once its state transition or read has completed, so callers never observe
//! a partial mutation.

use crate::config::ServiceConfig;
use crate::core::{Entry, OrderBookStore};
use crate::error::{StoreError, StoreResult};
use crate::events::{BookRow, Instruction, InstructionEvent, InstructionKind};
use crate::metrics::{MetricsSnapshot, PerformanceMetrics};
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

enum Command {
    Apply {
        event: InstructionEvent,
        reply: oneshot::Sender<StoreResult<()>>,
    },
    Query {
        depth: u32,
        reply: oneshot::Sender<Vec<BookRow>>,
    },
    Snapshot {
        reply: oneshot::Sender<Vec<Entry>>,
    },
    Shutdown {
        reply: oneshot::Sender<()>,
    },
}

/// Cloneable client side of the book actor
#[derive(Clone)]
pub struct OrderBookHandle {
    commands: mpsc::Sender<Command>,
    metrics: Arc<PerformanceMetrics>,
    default_depth: u32,
}

impl OrderBookHandle {
    /// Apply one instruction and wait for its outcome
    pub async fn apply(&self, event: InstructionEvent) -> StoreResult<()> {
        let (reply, rx) = oneshot::channel();
        self.send(Command::Apply { event, reply }).await?;
        rx.await.map_err(|_| StoreError::ServiceStopped)?
    }

    /// Query levels `1..=depth`
    pub async fn order_book(&self, depth: u32) -> StoreResult<Vec<BookRow>> {
        let (reply, rx) = oneshot::channel();
        self.send(Command::Query { depth, reply }).await?;
        rx.await.map_err(|_| StoreError::ServiceStopped)
    }

    /// Copy of the committed entries
    pub async fn snapshot(&self) -> StoreResult<Vec<Entry>> {
        let (reply, rx) = oneshot::channel();
        self.send(Command::Snapshot { reply }).await?;
        rx.await.map_err(|_| StoreError::ServiceStopped)
    }

    /// Stop the actor after every previously queued command
    pub async fn shutdown(&self) -> StoreResult<()> {
        let (reply, rx) = oneshot::channel();
        self.send(Command::Shutdown { reply }).await?;
        rx.await.map_err(|_| StoreError::ServiceStopped)
    }

    /// Current metrics
    pub fn metrics(&self) -> MetricsSnapshot {
        self.metrics.get_snapshot()
    }

    /// Depth configured for queries that do not choose one
    pub fn default_depth(&self) -> u32 {
        self.default_depth
    }

    async fn send(&self, command: Command) -> StoreResult<()> {
        self.commands
            .send(command)
            .await
            .map_err(|_| StoreError::ServiceStopped)
    }
}

/// The book actor
pub struct OrderBookService {
    symbol: String,
    store: OrderBookStore,
    metrics: Arc<PerformanceMetrics>,
    commands: mpsc::Receiver<Command>,
}

impl OrderBookService {
    /// Spawn the actor on the current tokio runtime
    ///
    /// The join handle yields the final store once the actor stops, either on
    /// [`OrderBookHandle::shutdown`] or when every handle is dropped.
    pub fn spawn(config: &ServiceConfig) -> (OrderBookHandle, JoinHandle<OrderBookStore>) {
        let (tx, rx) = mpsc::channel(config.command_buffer.max(1));
        let metrics = Arc::new(PerformanceMetrics::new(config.symbol.clone()));

        let service = Self {
            symbol: config.symbol.clone(),
            store: OrderBookStore::new(),
            metrics: Arc::clone(&metrics),
            commands: rx,
        };
        let handle = OrderBookHandle {
            commands: tx,
            metrics,
            default_depth: config.default_depth,
        };

        (handle, tokio::spawn(service.run()))
    }

    async fn run(mut self) -> OrderBookStore {
        info!(symbol = %self.symbol, "order book service started");

        while let Some(command) = self.commands.recv().await {
            match command {
                Command::Apply { event, reply } => {
                    let result = self.apply(event);
                    let _ = reply.send(result);
                }
                Command::Query { depth, reply } => {
                    let start = Instant::now();
                    let rows = self.store.order_book(depth);
                    self.metrics.record_query(elapsed_ns(start));
                    let _ = reply.send(rows);
                }
                Command::Snapshot { reply } => {
                    let _ = reply.send(self.store.entries().to_vec());
                }
                Command::Shutdown { reply } => {
                    let _ = reply.send(());
                    break;
                }
            }
        }

        info!(symbol = %self.symbol, entries = self.store.len(), "order book service stopped");
        self.store
    }

    fn apply(&mut self, event: InstructionEvent) -> StoreResult<()> {
        let start = Instant::now();
        let outcome = Instruction::try_from(event).and_then(|instruction| {
            let kind = instruction.kind();
            self.store.execute(instruction).map(|()| kind)
        });

        match outcome {
            Ok(kind) => {
                self.metrics
                    .record_applied(kind, self.store.len(), elapsed_ns(start));
                debug!(symbol = %self.symbol, instruction = %kind, "instruction applied");
                Ok(())
            }
            // The delete was committed; only the reindex had nothing to work on
            Err(e @ StoreError::EmptyBookAfterDelete { .. }) => {
                self.metrics.record_applied(
                    InstructionKind::Delete,
                    self.store.len(),
                    elapsed_ns(start),
                );
                info!(symbol = %self.symbol, "delete emptied the book");
                Err(e)
            }
            Err(e) => {
                self.metrics.record_rejected();
                warn!(symbol = %self.symbol, error = %e, "instruction rejected");
                Err(e)
            }
        }
    }
}

#[inline]
fn elapsed_ns(start: Instant) -> u64 {
    u64::try_from(start.elapsed().as_nanos()).unwrap_or(u64::MAX)
}
