//! Audit engine: service client, job polling, and effect execution.
mod client;
mod engine;
mod persist;
mod poller;
mod types;

pub use client::{AnalysisService, ReqwestAnalysisService, ServiceSettings};
pub use engine::{EngineConfig, EngineHandle};
pub use persist::{ensure_output_dir, AtomicFileWriter, PersistError};
pub use poller::{ChannelEventSink, EventSink, PollSettings, PollerHandle, TierTiming};
pub use types::{EngineEvent, JobHandle, ServiceError, ServiceErrorKind, StatusSnapshot};
