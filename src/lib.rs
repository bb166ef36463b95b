//! Concurrent HTTP load generator.
//!
//! A [`Coordinator`] splits a request budget over a fixed number of workers,
//! waits until all of them have prepared their request, then releases them at
//! once and reports the average throughput of the timed window.

pub mod barrier;
pub mod coordinator;
pub mod error;
pub mod model;
pub mod transport;
pub mod worker;

pub use crate::coordinator::{partition, Coordinator};
pub use crate::error::{Error, Result, TransportError, WorkerFailure};
pub use crate::model::{RequestTemplate, RunConfig, RunResult};
pub use crate::transport::{HttpTransport, Transport, TransportOptions};
