mod client;
mod sinks;

pub use client::{ClientError, ClientResult, ServiceClient};
pub use sinks::{
    GraphStoreClient, SinkError, SinkResult, TripleSink, WordCountClient, WordCountSink,
};
