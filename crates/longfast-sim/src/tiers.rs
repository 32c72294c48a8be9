//! Signal quality tiers from path loss.

use serde::Serialize;

use crate::{Result, SimError};

/// Index of the first threshold `>= path_loss_db`, or `thresholds.len()` if none.
///
/// `thresholds` must be ascending. The last index is the worst ("barely") tier.
pub fn assign_tier(path_loss_db: f64, thresholds: &[f64]) -> usize {
    thresholds
        .iter()
        .position(|&threshold| path_loss_db <= threshold)
        .unwrap_or(thresholds.len())
}

/// Insert the midpoint between every adjacent pair of thresholds.
///
/// N thresholds become 2N-1, first and last unchanged. Lists shorter than two
/// are returned as-is.
pub fn build_fine_thresholds(thresholds: &[f64]) -> Vec<f64> {
    let Some((&last, _)) = thresholds.split_last() else {
        return Vec::new();
    };

    let mut fine = Vec::with_capacity(thresholds.len() * 2);
    for pair in thresholds.windows(2) {
        fine.push(pair[0]);
        fine.push((pair[0] + pair[1]) / 2.0);
    }
    fine.push(last);

    fine
}

/// Validated coarse thresholds and the fine thresholds used for classification.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TierThresholds {
    coarse: Vec<f64>,
    fine: Vec<f64>,
}

impl TierThresholds {
    /// Validate `coarse` against the configured count and expand it.
    pub fn new(coarse: Vec<f64>, expected_count: usize) -> Result<Self> {
        if coarse.len() != expected_count {
            return Err(SimError::ThresholdCount {
                expected: expected_count,
                actual: coarse.len(),
            });
        }
        let ordered = coarse.iter().all(|v| v.is_finite())
            && coarse.windows(2).all(|pair| pair[0] <= pair[1]);
        if !ordered {
            return Err(SimError::UnorderedThresholds(coarse));
        }

        let fine = build_fine_thresholds(&coarse);
        Ok(Self { coarse, fine })
    }

    /// Thresholds as configured.
    pub fn coarse(&self) -> &[f64] {
        &self.coarse
    }

    /// Thresholds with midpoints inserted.
    pub fn fine(&self) -> &[f64] {
        &self.fine
    }

    /// Number of fine tiers, including the worst.
    pub fn tier_count(&self) -> usize {
        self.fine.len() + 1
    }

    /// Fine tier index for a path loss.
    pub fn classify(&self, path_loss_db: f64) -> usize {
        assign_tier(path_loss_db, &self.fine)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const REFERENCE: [f64; 6] = [100.0, 110.0, 120.0, 130.0, 140.0, 150.0];

    #[test]
    fn test_assign_tier_reference() {
        assert_eq!(assign_tier(105.0, &REFERENCE), 1);
        assert_eq!(assign_tier(999.0, &REFERENCE), 6);
        assert_eq!(assign_tier(100.0, &REFERENCE), 0);
        assert_eq!(assign_tier(-5.0, &REFERENCE), 0);
        assert_eq!(assign_tier(150.0, &REFERENCE), 5);
        assert_eq!(assign_tier(1.0, &[]), 0);
    }

    #[test]
    fn test_fine_thresholds_reference() {
        let fine = build_fine_thresholds(&REFERENCE);
        assert_eq!(
            fine,
            vec![100.0, 105.0, 110.0, 115.0, 120.0, 125.0, 130.0, 135.0, 140.0, 145.0, 150.0]
        );
    }

    #[test]
    fn test_fine_thresholds_shape() {
        let inputs: Vec<Vec<f64>> = vec![
            vec![7.0],
            vec![1.0, 2.0],
            vec![112.0, 112.0, 118.5, 130.0],
            vec![-3.0, 0.0, 0.25, 9.0, 1e6],
        ];
        for input in inputs {
            let fine = build_fine_thresholds(&input);
            assert_eq!(fine.len(), 2 * input.len() - 1);
            assert_eq!(fine.first(), input.first());
            assert_eq!(fine.last(), input.last());
            assert!(fine.windows(2).all(|w| w[0] <= w[1]));
            // Every coarse value survives at an even index.
            for (i, v) in input.iter().enumerate() {
                assert_eq!(fine[2 * i], *v);
            }
        }
        assert!(build_fine_thresholds(&[]).is_empty());
    }

    #[test]
    fn test_thresholds_validated() {
        assert_eq!(
            TierThresholds::new(vec![1.0, 2.0], 6),
            Err(SimError::ThresholdCount {
                expected: 6,
                actual: 2
            })
        );
        assert!(matches!(
            TierThresholds::new(vec![1.0, 3.0, 2.0], 3),
            Err(SimError::UnorderedThresholds(_))
        ));
        assert!(TierThresholds::new(vec![1.0, f64::NAN, 2.0], 3).is_err());

        let tiers = TierThresholds::new(REFERENCE.to_vec(), 6).unwrap();
        assert_eq!(tiers.coarse(), &REFERENCE);
        assert_eq!(tiers.fine().len(), 11);
        assert_eq!(tiers.tier_count(), 12);
        assert_eq!(tiers.classify(104.0), 1);
        assert_eq!(tiers.classify(106.0), 2);
        assert_eq!(tiers.classify(999.0), 11);
    }
}
