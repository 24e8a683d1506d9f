//! Gateway request contract

mod request;
mod validation;

pub use request::{GatewayRequest, GatewayResponse};
pub use validation::{GatewayLimits, ValidatedRequest};
