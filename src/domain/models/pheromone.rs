//! Pheromone trail domain model.
//!
//! A pheromone trail is a decaying numeric weight deposited on a resource by
//! an agent, used for stigmergic coordination.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PheromoneTrail {
    pub id: String,
    pub swarm_id: String,
    pub depositor_handle: String,
    pub resource_id: String,
    pub resource_type: String,
    pub trail_type: String,
    pub intensity: f64,
    pub metadata: Option<serde_json::Value>,
    pub created_at: i64,
}

impl PheromoneTrail {
    pub fn new(
        id: String,
        swarm_id: String,
        depositor_handle: String,
        resource_id: String,
        resource_type: String,
        trail_type: String,
        intensity: f64,
        created_at: i64,
    ) -> Self {
        Self {
            id,
            swarm_id,
            depositor_handle,
            resource_id,
            resource_type,
            trail_type,
            intensity,
            metadata: None,
            created_at,
        }
    }

    /// Apply one decay pass: `intensity *= (1 - rate)`.
    pub fn decay(&mut self, rate: f64) {
        self.intensity *= 1.0 - rate;
    }

    /// `true` once a trail has decayed below the removal floor.
    pub fn is_below(&self, min_intensity: f64) -> bool {
        self.intensity < min_intensity
    }
}

/// Filter criteria for pheromone queries.
#[derive(Debug, Clone, Default)]
pub struct PheromoneFilter {
    pub swarm_id: Option<String>,
    pub resource_id: Option<String>,
    pub resource_type: Option<String>,
    pub trail_type: Option<String>,
}

/// One entry in a hot-resource activity ranking.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResourceActivity {
    pub resource_id: String,
    pub resource_type: String,
    pub total_intensity: f64,
    pub trail_count: usize,
}

/// Result of a decay maintenance pass.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct DecayResult {
    pub decayed: usize,
    pub removed: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn composed_decay_matches_single_pass_with_combined_rate() {
        // Two decay passes at r1, r2 must equal a single pass at the
        // combined rate 1 - (1-r1)(1-r2).
        let mut a = PheromoneTrail::new(
            "a".into(), "s".into(), "h".into(), "r".into(), "t".into(), "trail".into(), 100.0, 0,
        );
        let mut b = a.clone();
        b.id = "b".into();

        a.decay(0.2);
        a.decay(0.3);

        let combined_rate = 1.0 - (1.0 - 0.2) * (1.0 - 0.3);
        b.decay(combined_rate);

        assert!((a.intensity - b.intensity).abs() < 1e-9);
    }
}
