//! Session orchestration: streaming response assembly and the
//! single-writer conversation controller.

pub mod assembler;
pub mod controller;

pub use assembler::ResponseAssembler;
pub use controller::{
    SessionCommand, SessionConfig, SessionController, SessionHandle, SessionSnapshot,
    SubmitOutcome,
};
