//! Prometheus-compatible metrics endpoint
//!
//! Counters are plain atomics updated from the session tick handlers.
//! Default endpoint: http://localhost:9090/metrics

use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};
#[cfg(feature = "metrics")]
use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::RwLock;
#[cfg(feature = "metrics")]
use tokio::io::{AsyncReadExt, AsyncWriteExt};
#[cfg(feature = "metrics")]
use tokio::net::TcpListener;
#[cfg(feature = "metrics")]
use tracing::{debug, info};

const TICK_HISTORY: usize = 1000;

/// Metrics registry shared by every session
#[derive(Debug)]
pub struct Metrics {
    // Sessions
    pub active_sessions: AtomicU64,
    pub sessions_started: AtomicU64,
    pub sessions_ended: AtomicU64,

    // Scheduling
    pub tick_count: AtomicU64,
    pub catch_up_ticks: AtomicU64,
    pub resyncs: AtomicU64,

    // Tick timing (microseconds)
    pub tick_time_us: AtomicU64,
    pub tick_time_p95_us: AtomicU64,
    pub tick_time_max_us: AtomicU64,

    // Output
    pub broadcasts: AtomicU64,
    pub timer_ticks: AtomicU64,
    pub events_emitted: AtomicU64,

    start_time: Instant,

    // Rolling tick times for percentile calculation
    tick_history: RwLock<VecDeque<u64>>,
}

impl Metrics {
    pub fn new() -> Self {
        Self {
            active_sessions: AtomicU64::new(0),
            sessions_started: AtomicU64::new(0),
            sessions_ended: AtomicU64::new(0),
            tick_count: AtomicU64::new(0),
            catch_up_ticks: AtomicU64::new(0),
            resyncs: AtomicU64::new(0),
            tick_time_us: AtomicU64::new(0),
            tick_time_p95_us: AtomicU64::new(0),
            tick_time_max_us: AtomicU64::new(0),
            broadcasts: AtomicU64::new(0),
            timer_ticks: AtomicU64::new(0),
            events_emitted: AtomicU64::new(0),
            start_time: Instant::now(),
            tick_history: RwLock::new(VecDeque::with_capacity(TICK_HISTORY)),
        }
    }

    /// Record a tick time and update percentiles
    pub fn record_tick_time(&self, duration: Duration) {
        let us = duration.as_micros() as u64;
        self.tick_time_us.store(us, Ordering::Relaxed);
        self.tick_count.fetch_add(1, Ordering::Relaxed);
        self.tick_time_max_us.fetch_max(us, Ordering::Relaxed);

        let mut history = self.tick_history.write();
        history.push_back(us);
        while history.len() > TICK_HISTORY {
            history.pop_front();
        }

        if history.len() >= 10 {
            let mut sorted: Vec<u64> = history.iter().copied().collect();
            sorted.sort_unstable();
            let p95_idx = (sorted.len() as f32 * 0.95) as usize;
            self.tick_time_p95_us
                .store(sorted[p95_idx.min(sorted.len() - 1)], Ordering::Relaxed);
        }
    }

    pub fn record_catch_up(&self, ticks: u32, resynced: bool) {
        self.catch_up_ticks.fetch_add(ticks as u64, Ordering::Relaxed);
        if resynced {
            self.resyncs.fetch_add(1, Ordering::Relaxed);
        }
    }

    pub fn record_broadcast(&self, events: usize) {
        self.broadcasts.fetch_add(1, Ordering::Relaxed);
        self.events_emitted.fetch_add(events as u64, Ordering::Relaxed);
    }

    pub fn session_started(&self) {
        self.sessions_started.fetch_add(1, Ordering::Relaxed);
        self.active_sessions.fetch_add(1, Ordering::Relaxed);
    }

    pub fn session_ended(&self) {
        self.sessions_ended.fetch_add(1, Ordering::Relaxed);
        let _ = self
            .active_sessions
            .fetch_update(Ordering::Relaxed, Ordering::Relaxed, |n| n.checked_sub(1));
    }

    /// Get uptime in seconds
    pub fn uptime_seconds(&self) -> u64 {
        self.start_time.elapsed().as_secs()
    }

    /// Generate Prometheus-format metrics output
    pub fn to_prometheus(&self) -> String {
        let mut output = String::with_capacity(2048);

        macro_rules! metric {
            ($name:expr, $help:expr, $type:expr, $value:expr) => {
                output.push_str(&format!(
                    "# HELP {} {}\n# TYPE {} {}\n{} {}\n",
                    $name, $help, $name, $type, $name, $value
                ));
            };
        }

        metric!("fish_arena_sessions_active", "Sessions currently running", "gauge",
            self.active_sessions.load(Ordering::Relaxed));
        metric!("fish_arena_sessions_started_total", "Sessions started", "counter",
            self.sessions_started.load(Ordering::Relaxed));
        metric!("fish_arena_sessions_ended_total", "Sessions ended or stopped", "counter",
            self.sessions_ended.load(Ordering::Relaxed));

        metric!("fish_arena_tick_count", "Total ticks processed", "counter",
            self.tick_count.load(Ordering::Relaxed));
        metric!("fish_arena_catch_up_ticks_total", "Ticks run late to catch up", "counter",
            self.catch_up_ticks.load(Ordering::Relaxed));
        metric!("fish_arena_resyncs_total", "Schedules resynchronised after a stall", "counter",
            self.resyncs.load(Ordering::Relaxed));
        metric!("fish_arena_tick_time_microseconds", "Last tick time in microseconds", "gauge",
            self.tick_time_us.load(Ordering::Relaxed));
        metric!("fish_arena_tick_time_p95_microseconds", "95th percentile tick time", "gauge",
            self.tick_time_p95_us.load(Ordering::Relaxed));
        metric!("fish_arena_tick_time_max_microseconds", "Maximum tick time", "gauge",
            self.tick_time_max_us.load(Ordering::Relaxed));

        metric!("fish_arena_broadcasts_total", "State snapshots handed to the transport", "counter",
            self.broadcasts.load(Ordering::Relaxed));
        metric!("fish_arena_timer_ticks_total", "Timer ticks handed to the transport", "counter",
            self.timer_ticks.load(Ordering::Relaxed));
        metric!("fish_arena_events_total", "Gameplay events emitted", "counter",
            self.events_emitted.load(Ordering::Relaxed));
        metric!("fish_arena_uptime_seconds", "Server uptime in seconds", "counter",
            self.uptime_seconds());

        output
    }

    /// JSON form for direct API access
    pub fn to_json(&self) -> String {
        serde_json::json!({
            "sessions": {
                "active": self.active_sessions.load(Ordering::Relaxed),
                "started": self.sessions_started.load(Ordering::Relaxed),
                "ended": self.sessions_ended.load(Ordering::Relaxed),
            },
            "performance": {
                "tick_count": self.tick_count.load(Ordering::Relaxed),
                "tick_time_us": self.tick_time_us.load(Ordering::Relaxed),
                "tick_time_p95_us": self.tick_time_p95_us.load(Ordering::Relaxed),
                "tick_time_max_us": self.tick_time_max_us.load(Ordering::Relaxed),
                "catch_up_ticks": self.catch_up_ticks.load(Ordering::Relaxed),
                "resyncs": self.resyncs.load(Ordering::Relaxed),
            },
            "output": {
                "broadcasts": self.broadcasts.load(Ordering::Relaxed),
                "timer_ticks": self.timer_ticks.load(Ordering::Relaxed),
                "events": self.events_emitted.load(Ordering::Relaxed),
            },
            "uptime_seconds": self.uptime_seconds(),
        })
        .to_string()
    }
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new()
    }
}

/// Start the metrics HTTP server
#[cfg(feature = "metrics")]
pub async fn start_metrics_server(metrics: Arc<Metrics>, port: u16) -> anyhow::Result<()> {
    let addr = format!("0.0.0.0:{}", port);
    let listener = TcpListener::bind(&addr).await?;

    info!("Metrics server listening on http://{}/metrics", addr);

    loop {
        let (mut socket, peer) = listener.accept().await?;
        let metrics = metrics.clone();

        tokio::spawn(async move {
            let mut buffer = [0u8; 1024];

            match socket.read(&mut buffer).await {
                Ok(n) if n > 0 => {
                    let request = String::from_utf8_lossy(&buffer[..n]);

                    let response = if request.starts_with("GET /metrics/json") {
                        let body = metrics.to_json();
                        format!(
                            "HTTP/1.1 200 OK\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                            body.len(),
                            body
                        )
                    } else if request.starts_with("GET /metrics") {
                        let body = metrics.to_prometheus();
                        format!(
                            "HTTP/1.1 200 OK\r\nContent-Type: text/plain; version=0.0.4\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                            body.len(),
                            body
                        )
                    } else if request.starts_with("GET /health") {
                        "HTTP/1.1 200 OK\r\nContent-Type: text/plain\r\nContent-Length: 2\r\nConnection: close\r\n\r\nOK".to_string()
                    } else {
                        "HTTP/1.1 404 Not Found\r\nContent-Length: 0\r\nConnection: close\r\n\r\n".to_string()
                    };

                    if let Err(e) = socket.write_all(response.as_bytes()).await {
                        debug!("Failed to write metrics response to {}: {}", peer, e);
                    }
                }
                Ok(_) => {}
                Err(e) => {
                    debug!("Failed to read from metrics socket {}: {}", peer, e);
                }
            }
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_tick_time() {
        let metrics = Metrics::new();
        for i in 0..100 {
            metrics.record_tick_time(Duration::from_micros(100 + i * 10));
        }

        assert_eq!(metrics.tick_count.load(Ordering::Relaxed), 100);
        assert_eq!(metrics.tick_time_max_us.load(Ordering::Relaxed), 1090);
        assert!(metrics.tick_time_p95_us.load(Ordering::Relaxed) >= 1000);
    }

    #[test]
    fn test_session_gauge_never_underflows() {
        let metrics = Metrics::new();
        metrics.session_started();
        metrics.session_ended();
        metrics.session_ended();
        assert_eq!(metrics.active_sessions.load(Ordering::Relaxed), 0);
        assert_eq!(metrics.sessions_ended.load(Ordering::Relaxed), 2);
    }

    #[test]
    fn test_prometheus_format() {
        let metrics = Metrics::new();
        metrics.session_started();
        metrics.record_broadcast(4);
        metrics.record_catch_up(5, true);

        let output = metrics.to_prometheus();
        assert!(output.contains("fish_arena_sessions_active 1"));
        assert!(output.contains("fish_arena_events_total 4"));
        assert!(output.contains("fish_arena_catch_up_ticks_total 5"));
        assert!(output.contains("fish_arena_resyncs_total 1"));
        assert!(output.contains("# TYPE fish_arena_broadcasts_total counter"));
    }

    #[test]
    fn test_json_format() {
        let metrics = Metrics::new();
        metrics.record_broadcast(12);
        let parsed: serde_json::Value = serde_json::from_str(&metrics.to_json()).unwrap();
        assert_eq!(parsed["output"]["events"], 12);
        assert_eq!(parsed["sessions"]["active"], 0);
    }
}
