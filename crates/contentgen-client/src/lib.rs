//! Client core for the content generation service.
//!
//! Submits summarize / translate / generate requests and folds the response,
//! streamed or buffered, into one observable session state machine.
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use contentgen_client::prelude::*;
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() -> Result<(), ClientError> {
//! let transport = Arc::new(HttpTransport::from_env()?);
//! let dispatcher = Dispatcher::new(transport);
//!
//! let state = dispatcher
//!     .submit(Request::translate("Buenos días", "English"))
//!     .await;
//! match state.status {
//!     SessionStatus::Done => println!("{}", state.output),
//!     _ => eprintln!("failed: {:?}", state.error),
//! }
//! # Ok(())
//! # }
//! ```

/// Cooperative cancellation handle and token.
pub mod cancel;
/// Client configuration and `.env` loading.
pub mod config;
/// Transport mode selection and request driving.
pub mod dispatcher;
/// Public error types.
pub mod errors;
/// Cached recent usage list.
pub mod history;
/// Tracing subscriber setup.
pub mod observability;
/// Common imports for typical usage.
pub mod prelude;
/// Stream framing and event decoding.
pub mod protocol;
/// Request model and local validation.
pub mod request;
/// Response, usage and error body models.
pub mod response;
/// Session state machine and observable controller.
pub mod session;
/// Transport contract and HTTP implementation.
pub mod transport;

pub use cancel::{AbortHandle, CancelToken, cancel_pair};
pub use config::ClientConfig;
pub use dispatcher::{Dispatcher, TransportMode, select_mode};
pub use errors::{ClientError, TransportError, ValidationError};
pub use history::UsageHistory;
pub use protocol::{EndSummary, ProtocolDecoder, ProtocolEvent};
pub use request::{Request, RequestOptions, Task};
pub use response::{ResponseMeta, TokenUsage, UsageHistoryItem};
pub use session::{SessionController, SessionEvent, SessionState, SessionStatus, reduce};
pub use transport::{ByteStream, HttpTransport, InferenceTransport};
