//! HTTP handlers shared by every Stayhub service.

pub mod health;

pub use health::{ComponentCheck, ReadinessResponse, health_check, readiness};
