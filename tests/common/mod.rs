#![allow(dead_code)]

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use hammer::transport::{Exchange, Transport};
use hammer::{RequestTemplate, TransportError};
use tokio::time::Instant;

#[derive(Debug, Clone)]
pub struct Call {
    pub number: u64,
    pub at: Instant,
    pub body: Bytes,
}

/// Transport that records every call and can be told to stall or fail.
#[derive(Debug, Default)]
pub struct MockTransport {
    /// Delay for the n-th `prepare`, in call order. Missing entries mean no delay.
    setup_delays: Vec<Duration>,
    call_delay: Duration,
    fail_on: Option<u64>,
    panic_on: Option<u64>,
    setup_panic_on: Option<u64>,
    status: Option<u16>,

    prepares: AtomicU64,
    calls: AtomicU64,
    setups_done: Mutex<Vec<Instant>>,
    log: Mutex<Vec<Call>>,
}

impl MockTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_setup_delays(mut self, delays: Vec<Duration>) -> Self {
        self.setup_delays = delays;
        self
    }

    pub fn with_call_delay(mut self, delay: Duration) -> Self {
        self.call_delay = delay;
        self
    }

    /// Fails the `n`-th call across all workers, counting from 1.
    pub fn fail_on(mut self, n: u64) -> Self {
        self.fail_on = Some(n);
        self
    }

    pub fn panic_on(mut self, n: u64) -> Self {
        self.panic_on = Some(n);
        self
    }

    /// Panics inside the `n`-th `prepare`, counting from 1.
    pub fn panic_in_setup_on(mut self, n: u64) -> Self {
        self.setup_panic_on = Some(n);
        self
    }

    pub fn with_status(mut self, status: u16) -> Self {
        self.status = Some(status);
        self
    }

    pub fn calls(&self) -> Vec<Call> {
        self.log.lock().unwrap().clone()
    }

    pub fn call_count(&self) -> u64 {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn setups_done(&self) -> Vec<Instant> {
        self.setups_done.lock().unwrap().clone()
    }
}

#[async_trait]
impl Transport for MockTransport {
    type Request = Bytes;

    async fn prepare(&self, template: &RequestTemplate) -> Result<Bytes, TransportError> {
        let n = self.prepares.fetch_add(1, Ordering::SeqCst);
        if self.setup_panic_on == Some(n + 1) {
            panic!("transport panicked in setup {}", n + 1);
        }
        if let Some(delay) = self.setup_delays.get(n as usize) {
            tokio::time::sleep(*delay).await;
        }
        self.setups_done.lock().unwrap().push(Instant::now());
        Ok(template.payload().clone())
    }

    async fn execute(&self, request: &Bytes) -> Result<Exchange, TransportError> {
        let number = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
        self.log.lock().unwrap().push(Call {
            number,
            at: Instant::now(),
            body: request.clone(),
        });

        if self.panic_on == Some(number) {
            panic!("transport panicked on call {number}");
        }
        if !self.call_delay.is_zero() {
            tokio::time::sleep(self.call_delay).await;
        }
        if self.fail_on == Some(number) {
            return Err(TransportError::Io(std::io::Error::other(format!(
                "injected failure on call {number}"
            ))));
        }

        Ok(Exchange {
            status: self.status.unwrap_or(200),
            body_bytes: 2,
        })
    }
}
