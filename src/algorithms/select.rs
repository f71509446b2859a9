//! Per-witness selection of the strongest anomaly

use crate::core::{ClassificationResult, HotspotId};
use std::collections::BTreeMap;

/// Keep, for every witness, the edge with the most negative residual
///
/// Results without the edge flag are ignored. Output is ordered by witness id;
/// on equal residuals the earlier result is kept.
pub fn select_worst(results: &[ClassificationResult]) -> Vec<&ClassificationResult> {
    let mut worst: BTreeMap<&HotspotId, &ClassificationResult> = BTreeMap::new();
    for result in results.iter().filter(|r| r.edge_flag) {
        worst
            .entry(&result.witness)
            .and_modify(|current| {
                if result.residual_db < current.residual_db {
                    *current = result;
                }
            })
            .or_insert(result);
    }
    worst.into_values().collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::TerrainProfile;

    fn result(beaconer: &str, witness: &str, residual_db: f64, edge_flag: bool) -> ClassificationResult {
        ClassificationResult {
            beaconer: beaconer.into(),
            witness: witness.into(),
            transmit_power_dbm: 27.0,
            frequency_hz: 915e6,
            measured_rssi_dbm: -100.0,
            measured_loss_db: 127.0,
            samples: 20,
            std_dev_db: 1.0,
            model_loss_db: 127.0 - residual_db,
            loss_profile_db: None,
            residual_db,
            distance_km: 5.0,
            terrain_profile: TerrainProfile::new(vec![0.0, 5000.0], vec![0.0, 0.0], 10.0, 10.0),
            tx_antenna_height_m: 10.0,
            rx_antenna_height_m: 10.0,
            tx_antenna_gain_db: 0.0,
            rx_antenna_gain_db: 0.0,
            edge_flag,
        }
    }

    #[test]
    fn test_most_negative_residual_wins() {
        let results = vec![result("b1", "w1", -20.0, true), result("b2", "w1", -25.0, true)];
        let selected = select_worst(&results);
        assert_eq!(selected.len(), 1);
        assert_eq!(selected[0].beaconer.as_str(), "b2");
        assert_eq!(selected[0].residual_db, -25.0);
    }

    #[test]
    fn test_one_per_witness_ordered_by_witness() {
        let results = vec![
            result("b1", "w2", -18.0, true),
            result("b2", "w1", -30.0, true),
            result("b3", "w1", -40.0, false),
            result("b4", "w3", -50.0, false),
        ];
        let selected = select_worst(&results);
        let pairs: Vec<(&str, &str)> = selected
            .iter()
            .map(|r| (r.beaconer.as_str(), r.witness.as_str()))
            .collect();
        assert_eq!(pairs, vec![("b2", "w1"), ("b1", "w2")]);
    }

    #[test]
    fn test_ties_keep_first() {
        let results = vec![result("b1", "w1", -20.0, true), result("b2", "w1", -20.0, true)];
        assert_eq!(select_worst(&results)[0].beaconer.as_str(), "b1");
    }
}
