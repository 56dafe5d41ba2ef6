use std::collections::VecDeque;
use std::time::{Duration, Instant};

use hdrhistogram::Histogram;

const MAX_RECENT_ERRORS: usize = 100;
const MAX_ERROR_TEXT_BYTES: usize = 1024;

#[derive(Debug, Clone)]
struct ErrorRec {
    _at: Instant,
    _context: String,
    _detail: String,
}

fn truncate_string(s: &str) -> String {
    if s.len() <= MAX_ERROR_TEXT_BYTES {
        return s.to_string();
    }
    let mut end = MAX_ERROR_TEXT_BYTES;
    while end > 0 && !s.is_char_boundary(end) {
        end -= 1;
    }
    s[..end].to_string()
}

/// Counters and keepalive round-trip percentiles for one channel, without
/// interior mutability. Owned and updated by the channel actor only.
#[derive(Debug)]
pub struct ChannelHealth {
    connection_started: Instant,
    message_count: u64,
    malformed_count: u64,
    error_count: u64,
    reconnect_count: u64,
    remote_errors: VecDeque<ErrorRec>,
    internal_errors: VecDeque<ErrorRec>,
    rtt_histogram: Histogram<u64>,
}

/// Point-in-time snapshot of a channel's health.
#[derive(Clone, Debug)]
pub struct ChannelStats {
    pub uptime: Duration,
    pub messages: u64,
    pub malformed: u64,
    pub errors: u64,
    pub reconnects: u64,
    pub recent_remote_errors: usize,
    pub recent_internal_errors: usize,
    pub p50_keepalive_rtt_us: u64,
    pub p99_keepalive_rtt_us: u64,
    pub rtt_samples: u64,
}

impl ChannelHealth {
    pub fn new() -> Self {
        Self {
            connection_started: Instant::now(),
            message_count: 0,
            malformed_count: 0,
            error_count: 0,
            reconnect_count: 0,
            remote_errors: VecDeque::with_capacity(MAX_RECENT_ERRORS),
            internal_errors: VecDeque::with_capacity(MAX_RECENT_ERRORS),
            rtt_histogram: Histogram::new_with_bounds(1, 60_000_000, 3)
                .expect("histogram bounds are valid"),
        }
    }

    /// Called on each successful open; counters survive reconnects, uptime
    /// restarts with the physical connection.
    pub fn on_open(&mut self) {
        self.connection_started = Instant::now();
    }

    pub fn record_message(&mut self) {
        self.message_count = self.message_count.saturating_add(1);
    }

    pub fn record_malformed(&mut self) {
        self.malformed_count = self.malformed_count.saturating_add(1);
    }

    pub fn record_remote_error(&mut self, future: &str) {
        self.error_count = self.error_count.saturating_add(1);
        push_bounded(
            &mut self.remote_errors,
            ErrorRec {
                _at: Instant::now(),
                _context: "invoke".to_string(),
                _detail: truncate_string(future),
            },
        );
    }

    pub fn record_internal_error(&mut self, context: &str, error: &str) {
        self.error_count = self.error_count.saturating_add(1);
        push_bounded(
            &mut self.internal_errors,
            ErrorRec {
                _at: Instant::now(),
                _context: truncate_string(context),
                _detail: truncate_string(error),
            },
        );
    }

    pub fn record_keepalive_rtt(&mut self, rtt: Duration) {
        let micros = rtt.as_micros().min(u64::MAX as u128) as u64;
        let _ = self.rtt_histogram.record(micros);
    }

    pub fn increment_reconnect(&mut self) {
        self.reconnect_count = self.reconnect_count.saturating_add(1);
    }

    pub fn get_stats(&self) -> ChannelStats {
        let rtt_samples = self.rtt_histogram.len();
        let (p50, p99) = if rtt_samples == 0 {
            (0, 0)
        } else {
            (
                self.rtt_histogram.value_at_percentile(50.0),
                self.rtt_histogram.value_at_percentile(99.0),
            )
        };

        ChannelStats {
            uptime: self.connection_started.elapsed(),
            messages: self.message_count,
            malformed: self.malformed_count,
            errors: self.error_count,
            reconnects: self.reconnect_count,
            recent_remote_errors: self.remote_errors.len(),
            recent_internal_errors: self.internal_errors.len(),
            p50_keepalive_rtt_us: p50,
            p99_keepalive_rtt_us: p99,
            rtt_samples,
        }
    }
}

fn push_bounded(buffer: &mut VecDeque<ErrorRec>, rec: ErrorRec) {
    if buffer.len() == MAX_RECENT_ERRORS {
        buffer.pop_front();
    }
    buffer.push_back(rec);
}
