// src/resilience/circuit_breaker.rs

use std::sync::Mutex;
use std::time::{Duration, Instant};
use tracing::{debug, warn};

/// The state of the circuit breaker
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CircuitState {
    /// Store calls flow normally
    Closed,
    /// Store calls are skipped entirely; the limiter runs in-process only
    Open,
    /// Probing recovery: calls flow again until enough succeed
    HalfOpen,
}

/// Configuration for the request log store circuit breaker
#[derive(Debug, Clone)]
pub struct CircuitBreakerConfig {
    /// Consecutive failures before opening the circuit
    pub failure_threshold: u32,
    /// How long the circuit stays open before probing with half-open calls
    pub reset_timeout: Duration,
    /// Consecutive successes in half-open state needed to close again
    pub success_threshold: u32,
}

impl Default for CircuitBreakerConfig {
    fn default() -> Self {
        Self {
            failure_threshold: 5,
            reset_timeout: Duration::from_secs(30),
            success_threshold: 2,
        }
    }
}

#[derive(Debug)]
struct BreakerInner {
    state: CircuitState,
    failures: u32,
    successes: u32,
    opened_at: Option<Instant>,
}

/// Circuit breaker guarding the durable request log store.
///
/// While open, sliding-window checks skip the store round-trip and fall back
/// to in-process accounting immediately instead of timing out against a dead
/// store on every request.
#[derive(Debug)]
pub struct CircuitBreaker {
    inner: Mutex<BreakerInner>,
    config: CircuitBreakerConfig,
}

impl CircuitBreaker {
    pub fn new(config: CircuitBreakerConfig) -> Self {
        Self {
            inner: Mutex::new(BreakerInner {
                state: CircuitState::Closed,
                failures: 0,
                successes: 0,
                opened_at: None,
            }),
            config,
        }
    }

    /// Whether the next store call should be attempted. An open circuit
    /// transitions to half-open once the reset timeout has elapsed.
    pub fn allow_request(&self) -> bool {
        let mut inner = self.inner.lock().unwrap();

        match inner.state {
            CircuitState::Closed | CircuitState::HalfOpen => true,
            CircuitState::Open => {
                let elapsed_enough = inner
                    .opened_at
                    .map(|at| at.elapsed() >= self.config.reset_timeout)
                    .unwrap_or(true);

                if elapsed_enough {
                    inner.state = CircuitState::HalfOpen;
                    inner.successes = 0;
                    debug!("Circuit breaker half-open, probing store recovery");
                    true
                } else {
                    false
                }
            }
        }
    }

    /// Record a successful store operation
    pub fn record_success(&self) {
        let mut inner = self.inner.lock().unwrap();

        match inner.state {
            CircuitState::Closed => {
                inner.failures = 0;
            }
            CircuitState::HalfOpen => {
                inner.successes += 1;
                if inner.successes >= self.config.success_threshold {
                    inner.state = CircuitState::Closed;
                    inner.failures = 0;
                    inner.successes = 0;
                    inner.opened_at = None;
                    debug!("Circuit breaker closed after successful probes");
                }
            }
            CircuitState::Open => {}
        }
    }

    /// Record a failed store operation
    pub fn record_failure(&self) {
        let mut inner = self.inner.lock().unwrap();

        match inner.state {
            CircuitState::Closed => {
                inner.failures += 1;
                if inner.failures >= self.config.failure_threshold {
                    inner.state = CircuitState::Open;
                    inner.opened_at = Some(Instant::now());
                    warn!(
                        failures = inner.failures,
                        "Circuit breaker opened, request log store bypassed"
                    );
                }
            }
            CircuitState::HalfOpen => {
                // One failed probe re-opens the circuit
                inner.state = CircuitState::Open;
                inner.opened_at = Some(Instant::now());
                inner.successes = 0;
                warn!("Circuit breaker re-opened after failed probe");
            }
            CircuitState::Open => {}
        }
    }

    pub fn state(&self) -> CircuitState {
        self.inner.lock().unwrap().state
    }
}

impl Default for CircuitBreaker {
    fn default() -> Self {
        Self::new(CircuitBreakerConfig::default())
    }
}
