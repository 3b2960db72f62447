//! Configuration loading and validation. The file format follows the
//! familiar `config.json` layout: `population`, `virus`, `intervention`,
//! and `simulation` sections. Everything is range-checked up front so the
//! engine can treat its inputs as total; a run never starts on a bad config.

use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use rustc_hash::FxHashMap;
use serde::Deserialize;

use crate::agent::AgeGroup;
use crate::error::EpinetError;

#[derive(Clone, Debug, Deserialize)]
pub struct Config {
    pub population: PopulationConfig,
    pub virus: VirusConfig,
    #[serde(default)]
    pub intervention: InterventionConfig,
    pub simulation: SimulationConfig,
}

#[derive(Clone, Debug, Deserialize)]
pub struct PopulationConfig {
    pub size: usize,
    pub avg_degree: usize,
    pub rewire_prob: f64,
    /// Per-age-group susceptibility multiplier; unlisted groups default to 1.0.
    #[serde(default)]
    pub risk_factors: FxHashMap<AgeGroup, f64>,
    /// Relative weights used to draw each agent's age group at creation.
    #[serde(default = "default_age_distribution")]
    pub age_distribution: FxHashMap<AgeGroup, f64>,
}

pub(crate) fn default_age_distribution() -> FxHashMap<AgeGroup, f64> {
    let mut weights = FxHashMap::default();
    weights.insert(AgeGroup::Child, 0.25);
    weights.insert(AgeGroup::Adult, 0.55);
    weights.insert(AgeGroup::Senior, 0.20);
    weights
}

#[derive(Clone, Debug, Deserialize)]
pub struct VirusConfig {
    pub name: String,
    pub infect_rate: f64,
    pub cure_rate: f64,
    /// Incubation days spent exposed before becoming infectious.
    pub infection_time: u32,
}

#[derive(Clone, Debug, Default, Deserialize)]
pub struct InterventionConfig {
    #[serde(default)]
    pub vaccination: VaccinationConfig,
    #[serde(default)]
    pub quarantine: QuarantineConfig,
    #[serde(default)]
    pub social_distancing: SocialDistancingConfig,
}

#[derive(Clone, Debug, Default, Deserialize)]
pub struct VaccinationConfig {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default)]
    pub start_day: u32,
    /// Fraction of the whole population vaccinated, applied once.
    #[serde(default)]
    pub coverage: f64,
    /// Susceptibility reduction for vaccinated agents.
    #[serde(default)]
    pub effectiveness: f64,
    /// When set, vaccinated agents that are still susceptible move directly
    /// to recovered. Independent of `effectiveness`.
    #[serde(default)]
    pub confers_immunity: bool,
}

/// Which quarantine field is present selects the policy: `coverage` isolates
/// a random subset of currently-infected agents once; `threshold` applies a
/// partial transmission reduction for a fixed window whenever the infected
/// fraction crosses the trigger, and can re-trigger after the window expires.
#[derive(Clone, Debug, Default, Deserialize)]
pub struct QuarantineConfig {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default)]
    pub start_day: u32,
    #[serde(default)]
    pub coverage: Option<f64>,
    #[serde(default)]
    pub threshold: Option<f64>,
    #[serde(default)]
    pub reduction_factor: Option<f64>,
    #[serde(default)]
    pub duration: Option<u32>,
}

/// The resolved quarantine policy, produced by [`QuarantineConfig::policy`].
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum QuarantinePolicy {
    Coverage {
        coverage: f64,
    },
    Threshold {
        threshold: f64,
        reduction_factor: f64,
        duration: u32,
    },
}

impl QuarantineConfig {
    /// Resolves the policy from the fields present. A disabled section with
    /// neither field resolves to a zero-coverage no-op.
    pub fn policy(&self) -> Result<QuarantinePolicy, EpinetError> {
        match (self.coverage, self.threshold) {
            (Some(_), Some(_)) => Err(EpinetError::Config(
                "intervention.quarantine: declare either coverage or threshold, not both".into(),
            )),
            (Some(coverage), None) => Ok(QuarantinePolicy::Coverage { coverage }),
            (None, Some(threshold)) => {
                let reduction_factor = self.reduction_factor.ok_or_else(|| {
                    EpinetError::Config(
                        "intervention.quarantine.reduction_factor is required with threshold".into(),
                    )
                })?;
                let duration = self.duration.ok_or_else(|| {
                    EpinetError::Config(
                        "intervention.quarantine.duration is required with threshold".into(),
                    )
                })?;
                Ok(QuarantinePolicy::Threshold {
                    threshold,
                    reduction_factor,
                    duration,
                })
            }
            (None, None) if self.enabled => Err(EpinetError::Config(
                "intervention.quarantine: enabled but neither coverage nor threshold given".into(),
            )),
            (None, None) => Ok(QuarantinePolicy::Coverage { coverage: 0.0 }),
        }
    }
}

#[derive(Clone, Debug, Default, Deserialize)]
pub struct SocialDistancingConfig {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default)]
    pub start_day: u32,
    #[serde(default)]
    pub reduction_factor: f64,
    /// When present, the reduced contact rate applies for exactly this many
    /// days and then reverts; when absent, the reduction is permanent.
    #[serde(default)]
    pub duration: Option<u32>,
}

#[derive(Clone, Debug, Deserialize)]
pub struct SimulationConfig {
    /// Number of days to run.
    pub duration: u32,
    /// Agents seeded infected on day 0.
    #[serde(default = "default_initial_infected")]
    pub initial_infected: usize,
    /// Base seed for the run's random stream; a fixed seed makes the run
    /// reproducible byte for byte. Seeded from entropy when absent.
    #[serde(default)]
    pub seed: Option<u64>,
}

fn default_initial_infected() -> usize {
    1
}

impl Config {
    /// Loads and validates a configuration from a JSON file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, EpinetError> {
        let file = File::open(path)?;
        let config: Config = serde_json::from_reader(BufReader::new(file))?;
        config.validate()?;
        Ok(config)
    }

    /// Parses and validates a configuration from a JSON string.
    pub fn from_json(json: &str) -> Result<Self, EpinetError> {
        let config: Config = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Range-checks every field. Called before any simulated day runs.
    pub fn validate(&self) -> Result<(), EpinetError> {
        let population = &self.population;
        if population.size == 0 {
            return Err(EpinetError::Config("population.size must be positive".into()));
        }
        if population.avg_degree == 0 || population.avg_degree >= population.size {
            return Err(EpinetError::Config(format!(
                "population.avg_degree must be in [1, {}), got {}",
                population.size, population.avg_degree
            )));
        }
        check_probability("population.rewire_prob", population.rewire_prob)?;
        for (group, factor) in &population.risk_factors {
            if !factor.is_finite() || *factor <= 0.0 {
                return Err(EpinetError::Config(format!(
                    "population.risk_factors.{group:?} must be a positive multiplier, got {factor}"
                )));
            }
        }
        let mut weight_sum = 0.0;
        for (group, weight) in &population.age_distribution {
            if !weight.is_finite() || *weight < 0.0 {
                return Err(EpinetError::Config(format!(
                    "population.age_distribution.{group:?} must be non-negative, got {weight}"
                )));
            }
            weight_sum += weight;
        }
        if weight_sum <= 0.0 {
            return Err(EpinetError::Config(
                "population.age_distribution must have positive total weight".into(),
            ));
        }

        check_probability("virus.infect_rate", self.virus.infect_rate)?;
        check_probability("virus.cure_rate", self.virus.cure_rate)?;

        let vaccination = &self.intervention.vaccination;
        check_probability("intervention.vaccination.coverage", vaccination.coverage)?;
        check_probability("intervention.vaccination.effectiveness", vaccination.effectiveness)?;

        let quarantine = &self.intervention.quarantine;
        match quarantine.policy()? {
            QuarantinePolicy::Coverage { coverage } => {
                check_probability("intervention.quarantine.coverage", coverage)?;
            }
            QuarantinePolicy::Threshold {
                threshold,
                reduction_factor,
                duration,
            } => {
                check_probability("intervention.quarantine.threshold", threshold)?;
                check_probability("intervention.quarantine.reduction_factor", reduction_factor)?;
                if duration == 0 {
                    return Err(EpinetError::Config(
                        "intervention.quarantine.duration must be positive".into(),
                    ));
                }
            }
        }

        let distancing = &self.intervention.social_distancing;
        check_probability(
            "intervention.social_distancing.reduction_factor",
            distancing.reduction_factor,
        )?;
        if distancing.enabled && distancing.duration == Some(0) {
            return Err(EpinetError::Config(
                "intervention.social_distancing.duration must be positive when present".into(),
            ));
        }

        if self.simulation.duration == 0 {
            return Err(EpinetError::Config("simulation.duration must be positive".into()));
        }
        if self.simulation.initial_infected == 0 {
            return Err(EpinetError::Config("simulation.initial_infected must be positive".into()));
        }
        if self.simulation.initial_infected > population.size {
            return Err(EpinetError::Config(format!(
                "simulation.initial_infected exceeds population size {}",
                population.size
            )));
        }
        Ok(())
    }
}

fn check_probability(field: &str, value: f64) -> Result<(), EpinetError> {
    if !value.is_finite() || !(0.0..=1.0).contains(&value) {
        return Err(EpinetError::Config(format!(
            "{field} must be in [0, 1], got {value}"
        )));
    }
    Ok(())
}
