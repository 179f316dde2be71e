//! Prometheus metrics collection for Encarta
//!
//! This module provides metrics instrumentation for tracking:
//! - Chat request outcomes (success and each failure kind, including supersession)
//! - Chat request latency, measured from dispatch to settlement
//!
//! `Metrics::gather_text()` renders everything in Prometheus text format.

use crate::error::ChatError;
use prometheus::{Encoder, Histogram, HistogramOpts, IntCounterVec, Opts, Registry, TextEncoder};
use std::sync::Arc;

/// Outcome enum for type-safe metrics labels
///
/// Restricts the `outcome` label to a fixed set of values at compile time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Success,
    Transport,
    BadStatus,
    Decode,
    EmptyResponse,
    Cancelled,
}

impl Outcome {
    /// Convert outcome to Prometheus label string
    pub fn as_str(&self) -> &'static str {
        match self {
            Outcome::Success => "success",
            Outcome::Transport => "transport",
            Outcome::BadStatus => "bad_status",
            Outcome::Decode => "decode",
            Outcome::EmptyResponse => "empty_response",
            Outcome::Cancelled => "cancelled",
        }
    }

    /// Classify a settled chat result
    pub fn of(result: &Result<String, ChatError>) -> Self {
        match result {
            Ok(_) => Outcome::Success,
            Err(ChatError::Transport { .. }) => Outcome::Transport,
            Err(ChatError::BadStatus { .. }) => Outcome::BadStatus,
            Err(ChatError::Decode { .. }) => Outcome::Decode,
            Err(ChatError::EmptyResponse) => Outcome::EmptyResponse,
            Err(ChatError::Cancelled) => Outcome::Cancelled,
        }
    }
}

/// Metrics collector for Encarta
#[derive(Clone)]
pub struct Metrics {
    pub registry: Arc<Registry>,
    requests_total: IntCounterVec,
    request_duration: Histogram,
}

impl Metrics {
    /// Create a new Metrics instance
    ///
    /// Registers all metrics with a new Prometheus registry.
    ///
    /// # Errors
    ///
    /// Returns an error if metric registration fails (e.g., duplicate names).
    pub fn new() -> Result<Self, prometheus::Error> {
        let registry = Registry::new();

        // Cardinality: 6 outcomes = 6 time series
        let requests_total = IntCounterVec::new(
            Opts::new(
                "encarta_chat_requests_total",
                "Total number of chat requests by outcome",
            ),
            &["outcome"],
        )?;

        // Superseded requests are not observed: they never settle.
        let request_duration = Histogram::with_opts(
            HistogramOpts::new(
                "encarta_chat_request_duration_ms",
                "Chat request latency in milliseconds, dispatch to settlement",
            )
            .buckets(vec![
                50.0, 100.0, 250.0, 500.0, 1000.0, 2500.0, 5000.0, 10000.0, 30000.0,
            ]),
        )?;

        registry.register(Box::new(requests_total.clone()))?;
        registry.register(Box::new(request_duration.clone()))?;

        Ok(Self {
            registry: Arc::new(registry),
            requests_total,
            request_duration,
        })
    }

    /// Record a request outcome
    pub fn record_outcome(&self, outcome: Outcome) {
        self.requests_total
            .with_label_values(&[outcome.as_str()])
            .inc();
    }

    /// Record the latency of a settled request
    pub fn record_duration(&self, duration_ms: f64) {
        self.request_duration.observe(duration_ms);
    }

    /// Current count for a single outcome
    pub fn outcome_count(&self, outcome: Outcome) -> u64 {
        self.requests_total
            .with_label_values(&[outcome.as_str()])
            .get()
    }

    /// Gather all metrics in Prometheus text format
    pub fn gather_text(&self) -> Result<String, prometheus::Error> {
        let encoder = TextEncoder::new();
        let families = self.registry.gather();
        let mut buffer = Vec::new();
        encoder.encode(&families, &mut buffer)?;
        String::from_utf8(buffer).map_err(|e| prometheus::Error::Msg(e.to_string()))
    }
}
