//! Chat client for the support relay gateway.
//!
//! A [`ChatSession`] keeps the visible transcript, sends it to the gateway on
//! each submission and grows a single assistant message as the answer
//! streams in. Only one submission may be in flight per session.
//!
//! ```no_run
//! use relay_client::{ChatSession, GatewayClient, SubmitOutcome};
//!
//! # async fn demo() -> Result<(), relay_client::ClientError> {
//! let session = ChatSession::new(GatewayClient::new("http://127.0.0.1:3000")?);
//! let mut print = |m: &relay_client::DisplayMessage| println!("{}", m.content());
//! if let SubmitOutcome::Finalized { .. } = session.submit("How do I get a refund?", &mut print).await? {
//!     // answer complete
//! }
//! # Ok(())
//! # }
//! ```

pub mod errors;
pub mod message;
pub mod session;
pub mod transport;

pub use errors::ClientError;
pub use message::{DisplayMessage, MessageSink, NullSink};
pub use session::{APOLOGY, ChatSession, SubmissionState, SubmitOutcome};
pub use transport::GatewayClient;
