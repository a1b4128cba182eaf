mod bridge;
mod pipeline;

pub use bridge::*;
pub use pipeline::BridgeEvent;
