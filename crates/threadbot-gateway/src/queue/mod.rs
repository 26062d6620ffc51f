//! Event queue between the gateway session and consumers

mod sliding;

pub use sliding::{SlidingQueue, DEFAULT_EVENT_QUEUE_CAPACITY};
