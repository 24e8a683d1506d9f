//! Infrastructure services

mod background;
mod gateway_service;
mod single_flight;

pub use background::BackgroundQueue;
pub use gateway_service::{GatewayService, GatewayServiceConfig};
pub use single_flight::{Flight, LeaderGuard, SingleFlight};
