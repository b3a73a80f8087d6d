//! Event-flow pipelines: a synchronous, flush-driven graph and an
//! asynchronous, channel-driven graph sharing the same node/link contract.

pub mod async_pipeline;
pub mod node;
pub mod sync_pipeline;

pub use async_pipeline::{AsyncPipeline, NodeEntry, ProcessShape};
pub use node::{BoxNode, Echo, Node, Port};
pub use sync_pipeline::SyncPipeline;
