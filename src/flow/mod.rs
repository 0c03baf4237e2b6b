//! Automation flows: the structural validator and the editing service.

mod service;
mod validator;

pub use service::FlowService;
pub use validator::{FlowValidation, validate_flow};
