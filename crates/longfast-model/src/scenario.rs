//! YAML scenario loading.
//!
//! A scenario bundles everything a run needs: radio and animation settings,
//! the tower list, cached line-of-sight rows and population per cell.
//!
//! ```yaml
//! seed: ridge
//! radio:
//!   spreading_factor: 11
//! animation:
//!   fps: 24
//!   hop_limit: 12
//! towers:
//!   - { id: "881f1d4", name: "North Ridge" }
//!   - { id: "881f1d5", source: greedy }
//! los:
//!   - { src: "881f1d4", dst: "881f1d6", path_loss_db: 118.5, clearance: 3.2 }
//! population:
//!   "881f1d6": 420
//! ```

use std::collections::BTreeMap;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::config::AnimationConfig;
use crate::coverage::{Coverage, LosProfile, LosRow, TowerId, TowerRecord};
use crate::thresholds::quantile_thresholds;
use crate::{RadioConfig, Result};

fn default_excluded_sources() -> Vec<String> {
    vec!["greedy".to_string()]
}

/// On-disk scenario layout.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct ScenarioYaml {
    seed: String,
    #[serde(default)]
    radio: RadioConfig,
    #[serde(default)]
    animation: AnimationConfig,
    #[serde(default)]
    los_profile: LosProfile,
    #[serde(default = "default_excluded_sources")]
    exclude_sources: Vec<String>,
    towers: Vec<TowerRecord>,
    #[serde(default)]
    los: Vec<LosRow>,
    #[serde(default)]
    population: BTreeMap<String, f64>,
}

/// A loaded, validated scenario.
#[derive(Debug, Clone)]
pub struct Scenario {
    /// Radio parameters for airtime.
    pub radio: RadioConfig,
    /// Animation and pacing settings.
    pub animation: AnimationConfig,
    /// Resolved seed tower id.
    pub seed_tower: TowerId,
    /// Towers, visibility and population.
    pub coverage: Coverage,
    /// Path loss of every LOS row matching the profile, for quantile thresholds.
    pub profile_path_losses: Vec<f64>,
}

impl Scenario {
    /// Coarse tier thresholds: explicit when configured, LOS quantiles otherwise.
    ///
    /// The count is not checked here; the simulator validates it against
    /// [`AnimationConfig::tier_count`].
    pub fn tier_thresholds(&self) -> Result<Vec<f64>> {
        match &self.animation.tier_thresholds_db {
            Some(spec) => spec.values(),
            None => Ok(quantile_thresholds(self.profile_path_losses.iter().copied())),
        }
    }
}

/// Load a scenario from a YAML file.
pub fn load_scenario(path: &Path) -> Result<Scenario> {
    let yaml = std::fs::read_to_string(path)?;
    load_scenario_from_str(&yaml)
}

/// Parse a scenario from a YAML string.
pub fn load_scenario_from_str(yaml: &str) -> Result<Scenario> {
    let raw: ScenarioYaml = serde_yaml::from_str(yaml)?;

    raw.radio.validate()?;
    raw.animation.validate()?;

    let towers: Vec<TowerRecord> = raw
        .towers
        .into_iter()
        .filter(|t| {
            t.source
                .as_ref()
                .map_or(true, |source| !raw.exclude_sources.contains(source))
        })
        .collect();

    let profile_path_losses: Vec<f64> = raw
        .los
        .iter()
        .filter(|row| raw.los_profile.accepts(row))
        .map(|row| row.path_loss_db)
        .collect();

    let coverage = Coverage::from_los_rows(towers, &raw.los, &raw.los_profile, raw.population)?;
    let seed_tower = coverage.resolve_seed(&raw.seed)?.to_string();

    info!(
        towers = coverage.towers().len(),
        links = coverage.link_count(),
        visibility_pairs = coverage.visibility_pair_count(),
        seed = %seed_tower,
        "Loaded scenario"
    );

    Ok(Scenario {
        radio: raw.radio,
        animation: raw.animation,
        seed_tower,
        coverage,
        profile_path_losses,
    })
}
