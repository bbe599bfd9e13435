//! Per-session temporal state: bounded rings of recent signals, alerts and
//! frame rate samples, plus the object-detector cache.

use std::collections::VecDeque;
use std::time::{Duration, Instant};

use proctor_models::{AlertKind, Signals};

const ALERT_MAX_AGE: Duration = Duration::from_secs(5);
const ALERT_RING_CAPACITY: usize = 15;
const FPS_HISTORY_CAPACITY: usize = 30;

#[derive(Debug, Clone, Copy)]
struct AlertEvent {
    kind: AlertKind,
    at: Instant,
}

/// A detected object snapshot, cached between object-detector runs.
#[derive(Debug, Clone)]
pub struct CachedDetections {
    pub devices: Vec<crate::detection::object_detector::DetectedObject>,
    pub frame_index: u64,
}

/// Per-client state. Owned exclusively by the orchestrator for the
/// lifetime of one connection; never shared across sessions.
pub struct SessionBuffer {
    pub frame_count: u64,
    alert_history: VecDeque<AlertEvent>,
    signal_history: VecDeque<Signals>,
    fps_history: VecDeque<f64>,
    last_frame_at: Option<Instant>,
    pub last_heavy_detections: Option<CachedDetections>,
}

impl SessionBuffer {
    pub fn new() -> Self {
        Self {
            frame_count: 0,
            alert_history: VecDeque::with_capacity(ALERT_RING_CAPACITY),
            signal_history: VecDeque::with_capacity(FPS_HISTORY_CAPACITY),
            fps_history: VecDeque::with_capacity(FPS_HISTORY_CAPACITY),
            last_frame_at: None,
            last_heavy_detections: None,
        }
    }

    /// Append one frame's signals to the history. `frame_count` is advanced
    /// once per inbound frame by the caller, whether or not it is processed.
    pub fn add(&mut self, signals: Signals) {
        if self.signal_history.len() == FPS_HISTORY_CAPACITY {
            self.signal_history.pop_front();
        }
        self.signal_history.push_back(signals);
    }

    /// Advance `frame_count` by one. Called once per inbound frame, before
    /// the skip decision, so the counter tracks frames received rather than
    /// frames processed.
    pub fn increment_frame_count(&mut self) {
        self.frame_count += 1;
    }

    pub fn add_alert(&mut self, kind: AlertKind) {
        if self.alert_history.len() == ALERT_RING_CAPACITY {
            self.alert_history.pop_front();
        }
        self.alert_history.push_back(AlertEvent { kind, at: Instant::now() });
    }

    /// Drop events older than `ALERT_MAX_AGE`. Called at the start of every processed frame.
    pub fn clear_old_alerts(&mut self) {
        let now = Instant::now();
        self.alert_history.retain(|e| now.duration_since(e.at) <= ALERT_MAX_AGE);
    }

    pub fn alert_ring_is_empty(&self) -> bool {
        self.alert_history.is_empty()
    }

    /// True iff the alert history contains at least `required_count` events
    /// of `kind` with age <= `window`.
    pub fn should_trigger(&self, kind: AlertKind, required_count: usize, window: Duration) -> bool {
        let now = Instant::now();
        let count = self
            .alert_history
            .iter()
            .filter(|e| e.kind == kind && now.duration_since(e.at) <= window)
            .count();
        count >= required_count
    }

    /// Record one frame's wall-clock arrival and update the FPS moving average.
    pub fn update_fps(&mut self) -> f64 {
        let now = Instant::now();
        let instantaneous = match self.last_frame_at {
            Some(prev) => {
                let dt = now.duration_since(prev).as_secs_f64();
                if dt > 0.0 { 1.0 / dt } else { 0.0 }
            }
            None => 0.0,
        };
        self.last_frame_at = Some(now);

        if instantaneous > 0.0 {
            if self.fps_history.len() == FPS_HISTORY_CAPACITY {
                self.fps_history.pop_front();
            }
            self.fps_history.push_back(instantaneous);
        }
        instantaneous
    }

    pub fn avg_fps(&self) -> f64 {
        if self.fps_history.is_empty() {
            return 0.0;
        }
        self.fps_history.iter().sum::<f64>() / self.fps_history.len() as f64
    }

    /// True if a cached object-detector result is still within the reuse window.
    pub fn has_fresh_cache(&self, stride: u64) -> bool {
        match &self.last_heavy_detections {
            Some(cache) => self.frame_count.saturating_sub(cache.frame_index) < stride,
            None => false,
        }
    }
}

impl Default for SessionBuffer {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_add_does_not_touch_frame_count() {
        let mut buf = SessionBuffer::new();
        buf.increment_frame_count();
        buf.add(Signals::neutral());
        buf.increment_frame_count();
        buf.add(Signals::neutral());
        assert_eq!(buf.frame_count, 2);
    }

    #[test]
    fn test_should_trigger_requires_count_within_window() {
        let mut buf = SessionBuffer::new();
        buf.add_alert(AlertKind::GazeOffScreen);
        assert!(!buf.should_trigger(AlertKind::GazeOffScreen, 2, Duration::from_secs(1)));
        buf.add_alert(AlertKind::GazeOffScreen);
        assert!(buf.should_trigger(AlertKind::GazeOffScreen, 2, Duration::from_secs(1)));
    }

    #[test]
    fn test_alert_ring_bounded_at_fifteen() {
        let mut buf = SessionBuffer::new();
        for _ in 0..20 {
            buf.add_alert(AlertKind::HandNearFace);
        }
        assert_eq!(buf.alert_history.len(), ALERT_RING_CAPACITY);
    }

    #[test]
    fn test_cache_freshness_window() {
        let mut buf = SessionBuffer::new();
        buf.frame_count = 15;
        buf.last_heavy_detections = Some(CachedDetections { devices: Vec::new(), frame_index: 10 });
        assert!(buf.has_fresh_cache(10));
        buf.frame_count = 25;
        assert!(!buf.has_fresh_cache(10));
    }
}
