use crossbeam_channel::{Receiver, Sender};

use crate::shared::sample_buffer::SampleBuffer;

/// Work items for the serial capture queue.
pub(crate) enum QueueItem {
    Sample(SampleBuffer),
    /// Acknowledged once every earlier item has been processed.
    Flush(Sender<()>),
    Shutdown,
}

/// Entry point of the capture queue handed to capture sources.
///
/// Buffers pushed from one source arrive at the queue in push order. A full
/// queue blocks the pushing device thread; nothing is dropped here.
#[derive(Clone)]
pub struct SampleSink {
    sender: Sender<QueueItem>,
}

impl SampleSink {
    pub(crate) fn new(sender: Sender<QueueItem>) -> Self {
        Self { sender }
    }

    /// Creates a sink with its receiving end, for driving a queue by hand.
    pub(crate) fn bounded(capacity: usize) -> (Self, Receiver<QueueItem>) {
        let (sender, receiver) = crossbeam_channel::bounded(capacity);
        (Self::new(sender), receiver)
    }

    /// Returns `false` once the queue has shut down.
    pub fn push(&self, buffer: SampleBuffer) -> bool {
        self.sender.send(QueueItem::Sample(buffer)).is_ok()
    }

    /// Number of buffers waiting for the capture queue.
    pub fn backlog(&self) -> usize {
        self.sender.len()
    }

    pub(crate) fn send(&self, item: QueueItem) -> bool {
        self.sender.send(item).is_ok()
    }
}
