//! # Dispatch failures and where they end up.
//!
//! Every consumer failure (error or panic, sync or async) becomes a
//! [`DispatchFailure`] and is handed to the [`FailureSink`], which forwards it
//! to an [`ErrorLog`] on a best-effort basis.
//!
//! ```text
//! consumer Err / panic ──► DispatchFailure ──► FailureSink::record()
//!                                                   │
//!                                                   └─► ErrorLog::error()   (absent / panicking → dropped)
//! ```

mod failure;
mod log;
mod sink;

pub use failure::{DispatchFailure, DispatchMode};
pub use log::{ErrorLog, TracingLog};
pub use sink::FailureSink;
