use std::fmt;
use std::num::NonZeroUsize;
use std::str::FromStr;
use std::time::Duration;

use bytes::Bytes;

use crate::error::{Error, WorkerFailure};

#[derive(Clone, Debug)]
pub struct RunConfig {
    pub concurrency: NonZeroUsize,
    pub requests: u64,
    pub show_progress: bool,
}

/// One `name: value` request header.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct HeaderField {
    pub name: String,
    pub value: String,
}

impl HeaderField {
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
        }
    }
}

impl FromStr for HeaderField {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let Some((name, value)) = s.split_once(':') else {
            return Err(Error::Config(
                "header field format must be `name: value`".to_string(),
            ));
        };
        let name = name.trim();
        if name.is_empty() {
            return Err(Error::Config(format!("header field `{s}` has no name")));
        }
        Ok(Self::new(name, value.trim()))
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

/// The request every worker repeats.
///
/// Built once through the consuming builder methods and shared read-only
/// between workers afterwards.
#[derive(Clone, Debug)]
pub struct RequestTemplate {
    method: String,
    url: String,
    body: Bytes,
    headers: Vec<HeaderField>,
    credentials: Option<Credentials>,
}

impl RequestTemplate {
    pub fn new(method: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            method: method.into(),
            url: url.into(),
            body: Bytes::new(),
            headers: Vec::new(),
            credentials: None,
        }
    }

    pub fn body(mut self, body: impl Into<Bytes>) -> Self {
        self.body = body.into();
        self
    }

    /// Appends a header. Repeated names are kept, in insertion order.
    pub fn header(mut self, field: HeaderField) -> Self {
        self.headers.push(field);
        self
    }

    pub fn headers(mut self, fields: impl IntoIterator<Item = HeaderField>) -> Self {
        self.headers.extend(fields);
        self
    }

    pub fn basic_auth(mut self, username: impl Into<String>, password: impl Into<String>) -> Self {
        self.credentials = Some(Credentials {
            username: username.into(),
            password: password.into(),
        });
        self
    }

    pub fn method(&self) -> &str {
        &self.method
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn payload(&self) -> &Bytes {
        &self.body
    }

    pub fn header_fields(&self) -> &[HeaderField] {
        &self.headers
    }

    pub fn credentials(&self) -> Option<&Credentials> {
        self.credentials.as_ref()
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct WorkAssignment {
    pub index: usize,
    pub iterations: u64,
}

/// What a worker did, delivered with its Done signal.
#[derive(Debug)]
pub struct WorkerReport {
    pub index: usize,
    pub assigned: u64,
    /// Requests handed to the transport, including a failed last one.
    pub issued: u64,
    pub completed: u64,
    /// Completed requests answered with a status outside 2xx.
    pub non_success: u64,
    pub bytes_received: u64,
    pub failure: Option<WorkerFailure>,
}

impl WorkerReport {
    pub fn new(assignment: WorkAssignment) -> Self {
        Self {
            index: assignment.index,
            assigned: assignment.iterations,
            issued: 0,
            completed: 0,
            non_success: 0,
            bytes_received: 0,
            failure: None,
        }
    }

    pub fn is_failed(&self) -> bool {
        self.failure.is_some()
    }
}

/// Outcome of one timed run.
///
/// Throughput is computed from the requested total, not from what actually
/// completed, so it describes offered load when workers stopped early.
#[derive(Debug)]
pub struct RunResult {
    requested: u64,
    elapsed: Duration,
    workers: Vec<WorkerReport>,
}

impl RunResult {
    pub fn new(requested: u64, elapsed: Duration, mut workers: Vec<WorkerReport>) -> Self {
        workers.sort_by_key(|w| w.index);
        Self {
            requested,
            elapsed,
            workers,
        }
    }

    pub fn requested(&self) -> u64 {
        self.requested
    }

    pub fn elapsed(&self) -> Duration {
        self.elapsed
    }

    /// Requests per second over the timed window; zero for an empty window.
    pub fn throughput(&self) -> f64 {
        let secs = self.elapsed.as_secs_f64();
        if secs > 0.0 {
            self.requested as f64 / secs
        } else {
            0.0
        }
    }

    pub fn workers(&self) -> &[WorkerReport] {
        &self.workers
    }

    pub fn completed(&self) -> u64 {
        self.workers.iter().map(|w| w.completed).sum()
    }

    pub fn bytes_received(&self) -> u64 {
        self.workers.iter().map(|w| w.bytes_received).sum()
    }

    pub fn failed_workers(&self) -> impl Iterator<Item = &WorkerReport> {
        self.workers.iter().filter(|w| w.is_failed())
    }
}

impl fmt::Display for RunResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} requests sent in {:.2} seconds - average throughput {:.2} tps",
            self.requested,
            self.elapsed.as_secs_f64(),
            self.throughput()
        )
    }
}
