//! Metrics definitions for the signaling server.
//!
//! All metrics follow Prometheus naming conventions:
//! - `signaling_` prefix
//! - `_total` suffix for counters
//! - `_seconds` suffix for duration histograms
//!
//! # Cardinality
//!
//! Labels are bounded by code: session end reasons, frame kinds, room event
//! names, outcomes and reclaim triggers are all `&'static str`. Room and
//! participant ids are never used as labels.

use metrics::{counter, gauge, histogram};
use std::time::Duration;

// ============================================================================
// Session Metrics
// ============================================================================

/// Record a signaling session entering its relay loop.
///
/// Metric: `signaling_sessions_started_total`, `signaling_sessions_active`
pub fn record_session_started() {
    counter!("signaling_sessions_started_total").increment(1);
    gauge!("signaling_sessions_active").increment(1.0);
}

/// Record a signaling session ending.
///
/// Metric: `signaling_sessions_ended_total`, `signaling_session_duration_seconds`
/// Labels: `reason`
pub fn record_session_ended(reason: &'static str, duration: Duration) {
    counter!("signaling_sessions_ended_total", "reason" => reason).increment(1);
    histogram!("signaling_session_duration_seconds", "reason" => reason)
        .record(duration.as_secs_f64());
    gauge!("signaling_sessions_active").decrement(1.0);
}

/// Record a session refused during the connect phase.
///
/// Metric: `signaling_session_rejections_total`
/// Labels: `error_type`
pub fn record_session_rejected(error_type: &'static str) {
    counter!("signaling_session_rejections_total", "error_type" => error_type).increment(1);
}

// ============================================================================
// Relay Metrics
// ============================================================================

/// Record the fate of a client frame.
///
/// Metric: `signaling_frames_total`
/// Labels: `kind`, `outcome` (relayed, no_peer, timeout, peer_gone, ignored)
pub fn record_frame(kind: &'static str, outcome: &'static str) {
    counter!("signaling_frames_total", "kind" => kind, "outcome" => outcome).increment(1);
}

// ============================================================================
// Room Metrics
// ============================================================================

/// Record delivery of a room event to one subscriber queue.
///
/// Metric: `signaling_room_events_total`
/// Labels: `event`, `outcome` (delivered, dropped_full, closed)
pub fn record_room_event(event: &'static str, outcome: &'static str) {
    counter!("signaling_room_events_total", "event" => event, "outcome" => outcome).increment(1);
}

/// Record a room removed from the store.
///
/// Metric: `signaling_rooms_deleted_total`
/// Labels: `trigger` (explicit, list_reclaim, join_reclaim, leave_reclaim)
pub fn record_room_deleted(trigger: &'static str) {
    counter!("signaling_rooms_deleted_total", "trigger" => trigger).increment(1);
}

/// Record a room created.
///
/// Metric: `signaling_rooms_created_total`
pub fn record_room_created() {
    counter!("signaling_rooms_created_total").increment(1);
}
