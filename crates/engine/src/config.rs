use serde::{Deserialize, Serialize};

/// Tunables for one synchronization session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Inclusive zoom range; `zoom` commands clamp into it.
    pub min_zoom: f64,
    pub max_zoom: f64,

    /// Fraction of the viewport extent a default `pan` step moves.
    pub default_pan_delta: f64,

    /// Inbound viewport notifications older than the last local write by
    /// more than this window are dropped as out-of-order.
    pub staleness_window_ms: f64,

    /// Upper clamp on a single integration step, so a suspended tab does
    /// not produce a huge jump on resume.
    pub max_tick_dt_s: f64,

    /// Edge tolerance for the point-in-polygon containment test.
    pub containment_epsilon: f64,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            min_zoom: 10.0,
            max_zoom: 19.0,
            default_pan_delta: 0.15,
            staleness_window_ms: 200.0,
            max_tick_dt_s: 0.1,
            containment_epsilon: 1e-9,
        }
    }
}
