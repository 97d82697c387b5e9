use tokio::sync::mpsc;
use tracing::{debug, warn};

use super::message::{Message, StreamConfig};
use crate::error::ChannelError;

pub const DEFAULT_CHANNEL_CAPACITY: usize = 64;

/// Creates a bounded single-producer/single-consumer stage channel.
///
/// Senders suspend while `capacity` messages are queued; nothing is dropped
/// or reordered. A capacity of zero is raised to one.
pub fn bounded<T>(name: &'static str, capacity: usize) -> (MessageSender<T>, MessageReceiver<T>) {
    let (tx, rx) = mpsc::channel(capacity.max(1));
    (
        MessageSender { inner: tx, name },
        MessageReceiver {
            inner: rx,
            name,
            finished: false,
        },
    )
}

/// Sending half of a stage channel.
///
/// The sender is consumed by [`MessageSender::shutdown`], so a `Shutdown`
/// marker is always the last message it can ever put on the channel.
#[derive(Debug)]
pub struct MessageSender<T> {
    inner: mpsc::Sender<Message<T>>,
    name: &'static str,
}

impl<T> MessageSender<T> {
    pub fn max_capacity(&self) -> usize {
        self.inner.max_capacity()
    }

    /// Free slots right now.
    pub fn available(&self) -> usize {
        self.inner.capacity()
    }

    pub fn is_closed(&self) -> bool {
        self.inner.is_closed()
    }

    pub async fn send_data(&self, payload: T) -> Result<(), ChannelError> {
        self.send(Message::Data(payload)).await
    }

    pub async fn send_config(&self, config: StreamConfig) -> Result<(), ChannelError> {
        self.send(Message::Config(config)).await
    }

    /// Sends the terminal marker and gives up the sender.
    pub async fn shutdown(self) -> Result<(), ChannelError> {
        debug!("Sending shutdown on channel '{}'", self.name);
        self.send(Message::Shutdown).await
    }

    async fn send(&self, message: Message<T>) -> Result<(), ChannelError> {
        self.inner
            .send(message)
            .await
            .map_err(|_| ChannelError::Closed(self.name))
    }
}

/// Receiving half of a stage channel.
#[derive(Debug)]
pub struct MessageReceiver<T> {
    inner: mpsc::Receiver<Message<T>>,
    name: &'static str,
    finished: bool,
}

impl<T> MessageReceiver<T> {
    /// Next message in send order.
    ///
    /// `Shutdown` is yielded once; every later call returns `None`. `None` is
    /// also returned if the sender vanished without a shutdown marker, which
    /// only happens when its stage was aborted.
    pub async fn recv(&mut self) -> Option<Message<T>> {
        if self.finished {
            return None;
        }

        match self.inner.recv().await {
            Some(Message::Shutdown) => {
                self.finished = true;
                self.inner.close();
                Some(Message::Shutdown)
            }
            Some(message) => Some(message),
            None => {
                self.finished = true;
                warn!(
                    "Channel '{}' closed without a shutdown marker, its sender was dropped",
                    self.name
                );
                None
            }
        }
    }

    pub fn is_finished(&self) -> bool {
        self.finished
    }
}
