pub mod channel;
pub mod message;
pub mod stages;

pub use channel::{bounded, MessageReceiver, MessageSender, DEFAULT_CHANNEL_CAPACITY};
pub use message::{AnalyzedFrame, Message, StreamConfig, DEFAULT_FRAME_RATE};
pub use stages::{Consumer, ConsumerStats, Producer, ProducerStats, Transformer, TransformerStats};
