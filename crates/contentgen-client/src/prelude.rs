//! Common imports for typical client usage.
pub use crate::{
    ClientConfig, ClientError, Dispatcher, HttpTransport, InferenceTransport, Request,
    RequestOptions, ResponseMeta, SessionState, SessionStatus, Task, TransportMode, UsageHistory,
    UsageHistoryItem,
};
