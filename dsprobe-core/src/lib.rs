//! dsprobe core library
//!
//! This crate provides the fundamental types, session model and error
//! handling for the dsprobe zero-confirmation double-spend testing tool.

pub mod attack;
pub mod error;
pub mod response;
pub mod session;
pub mod types;

// Re-export commonly used types
pub use attack::{descriptors, AttackDescriptor, AttackKind, PayloadShape};
pub use error::{Error, ErrorKind, Result};
pub use response::{RawResponse, ResponseBody, ResultView};
pub use session::{parse_node_list, OrchestratorState, Session, SessionUpdate};
pub use types::*;
