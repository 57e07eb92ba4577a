//! Call session state machine and the records it produces.
//!
//! A single session moves idle → calling/incoming → in-call → idle. The
//! controller owns the only active recording and appends finished calls to
//! an injected history store.

pub mod error;
pub mod number;
pub mod record;
pub mod session_controller;
pub mod status;

pub use error::DialerError;
pub use number::NumberValidator;
pub use record::{
    now_millis, AudioPayload, CallRecord, RecordIdGenerator, StoredCallRecord, DEFAULT_MIME,
};
pub use session_controller::{ControllerOptions, SessionController};
pub use status::{CallDirection, CallMeta, CallSession, CallStatus, SessionEvent};
