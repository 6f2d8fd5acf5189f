use anyhow::{anyhow, Result};
use tokio::sync::mpsc;

use crate::chaining::ChainedSequence;

use super::scheduler::SequenceSource;

/// Bounded FIFO of ready-to-play sequences between the production loop and
/// the scheduler.
pub fn pending_queue(capacity: usize) -> (QueueProducer, QueueConsumer) {
    let (tx, rx) = mpsc::channel(capacity.max(1));
    (QueueProducer { tx }, QueueConsumer { rx })
}

#[derive(Clone)]
pub struct QueueProducer {
    tx: mpsc::Sender<ChainedSequence>,
}

impl QueueProducer {
    /// Waits only while the queue is full.
    pub async fn push(&self, sequence: ChainedSequence) -> Result<()> {
        self.tx
            .send(sequence)
            .await
            .map_err(|_| anyhow!("pending queue closed"))
    }

    /// Sequences currently waiting.
    pub fn len(&self) -> usize {
        self.tx.max_capacity() - self.tx.capacity()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }
}

pub struct QueueConsumer {
    rx: mpsc::Receiver<ChainedSequence>,
}

impl SequenceSource for QueueConsumer {
    fn try_next(&mut self) -> Option<ChainedSequence> {
        self.rx.try_recv().ok()
    }
}
