//! Transport boundary between the client core and the remote service.
mod http;

use std::pin::Pin;

pub use http::HttpTransport;

use crate::errors::TransportError;
use crate::request::Request;
use crate::response::{ResponseMeta, UsageHistoryItem};

/// Raw response bytes as they arrive, one item per network read.
pub type ByteStream =
    Pin<Box<dyn futures::Stream<Item = Result<bytes::Bytes, TransportError>> + Send + 'static>>;

/// Contract implemented by every way of reaching the inference service.
///
/// Implementations never retry. A streaming implementation must stop
/// producing bytes once its stream is dropped.
#[async_trait::async_trait]
pub trait InferenceTransport: Send + Sync {
    /// Whether this transport can deliver bytes incrementally.
    fn supports_streaming(&self) -> bool {
        true
    }

    /// Sends the request and waits for the whole response.
    async fn complete(&self, request: &Request) -> Result<ResponseMeta, TransportError>;

    /// Sends the request and returns the framed response stream.
    async fn open_stream(&self, request: &Request) -> Result<ByteStream, TransportError>;

    /// Fetches the recent usage list, most recent first.
    async fn recent_usage(&self) -> Result<Vec<UsageHistoryItem>, TransportError>;
}
