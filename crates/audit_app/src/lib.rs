//! Audit app: wiring between the pure core and the IO engine.
mod controller;
mod effects;
pub mod logging;
mod store;

pub use controller::AuditController;
pub use effects::EffectRunner;
pub use store::{Store, Subscriber};
