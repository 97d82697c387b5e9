pub mod consumer;
pub mod producer;
pub mod transformer;

pub use consumer::{Consumer, ConsumerStats};
pub use producer::{Producer, ProducerStats};
pub use transformer::{Transformer, TransformerStats};
