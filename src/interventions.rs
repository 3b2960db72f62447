//! Control policies that modulate the epidemic: vaccination, quarantine,
//! and social distancing. Each policy is gated on its config and start day
//! and is idempotent with respect to its own one-shot or timer state. The
//! engine runs before the population update each day and installs the
//! combined contact-rate multiplier.

use log::info;
use rand::Rng;
use rand::seq::index;

use crate::agent::Compartment;
use crate::config::{InterventionConfig, QuarantinePolicy};
use crate::error::EpinetError;
use crate::population::Population;
use crate::report::TransitionEvent;

/// Threshold-policy quarantine cycles between these two states; there is no
/// terminal state.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
enum QuarantineState {
    Inactive,
    Active { remaining: u32 },
}

pub struct InterventionEngine {
    cfg: InterventionConfig,
    quarantine_policy: QuarantinePolicy,
    vaccine_applied: bool,
    quarantine_applied: bool,
    quarantine_state: QuarantineState,
    distancing_engaged: bool,
}

impl InterventionEngine {
    pub fn new(cfg: &InterventionConfig) -> Result<Self, EpinetError> {
        let quarantine_policy = cfg.quarantine.policy()?;
        Ok(InterventionEngine {
            cfg: cfg.clone(),
            quarantine_policy,
            vaccine_applied: false,
            quarantine_applied: false,
            quarantine_state: QuarantineState::Inactive,
            distancing_engaged: false,
        })
    }

    /// Applies every policy for the day and installs the combined
    /// contact-rate multiplier on the population. Returns the compartment
    /// transitions forced by vaccination, if any.
    pub fn apply_all<R: Rng>(
        &mut self,
        day: u32,
        population: &mut Population,
        rng: &mut R,
    ) -> Result<Vec<TransitionEvent>, EpinetError> {
        let events = self.apply_vaccine(day, population, rng)?;
        self.apply_social_distancing(day);
        self.apply_quarantine(day, population, rng);

        let multiplier = self.contact_multiplier(day);
        if (multiplier - population.contact_rate()).abs() > f64::EPSILON {
            info!("day {day}: contact rate multiplier set to {multiplier:.2}");
        }
        population.set_contact_rate(multiplier);
        Ok(events)
    }

    /// One-shot vaccination of a random `coverage` fraction of the whole
    /// population. With `confers_immunity`, still-susceptible vaccinees move
    /// directly to recovered; otherwise vaccination only scales down their
    /// susceptibility through `effectiveness`.
    pub fn apply_vaccine<R: Rng>(
        &mut self,
        day: u32,
        population: &mut Population,
        rng: &mut R,
    ) -> Result<Vec<TransitionEvent>, EpinetError> {
        let cfg = &self.cfg.vaccination;
        if !cfg.enabled || day < cfg.start_day || self.vaccine_applied {
            return Ok(Vec::new());
        }

        let size = population.len();
        // Interventions are best effort: clamp instead of failing when the
        // request exceeds the pool.
        let count = ((cfg.coverage * size as f64).floor() as usize).min(size);
        let mut events = Vec::new();
        for agent_index in index::sample(rng, size, count) {
            let agent = population.agent_mut(agent_index);
            agent.vaccinate(cfg.effectiveness);
            if cfg.confers_immunity && agent.compartment() == Compartment::Susceptible {
                agent.immunize()?;
                events.push(TransitionEvent {
                    day,
                    agent: agent.id(),
                    age_group: agent.age_group(),
                    from: Compartment::Susceptible,
                    to: Compartment::Recovered,
                });
            }
        }
        self.vaccine_applied = true;
        info!("day {day}: vaccinated {count} agents");
        Ok(events)
    }

    /// Coverage policy: isolates a random fraction of currently-infected
    /// agents, once per run. Threshold policy: steps the timer and activates
    /// a transmission-reduction window whenever the infected fraction
    /// crosses the trigger; re-triggerable after expiry.
    pub fn apply_quarantine<R: Rng>(&mut self, day: u32, population: &mut Population, rng: &mut R) {
        let cfg = &self.cfg.quarantine;
        if !cfg.enabled || day < cfg.start_day {
            return;
        }
        match self.quarantine_policy {
            QuarantinePolicy::Coverage { coverage } => {
                if self.quarantine_applied {
                    return;
                }
                let candidates: Vec<usize> = population
                    .agents()
                    .iter()
                    .enumerate()
                    .filter(|(_, agent)| {
                        agent.compartment() == Compartment::Infected && !agent.is_isolated()
                    })
                    .map(|(index, _)| index)
                    .collect();
                let count =
                    ((coverage * candidates.len() as f64).floor() as usize).min(candidates.len());
                for position in index::sample(rng, candidates.len(), count) {
                    population.agent_mut(candidates[position]).isolate();
                }
                self.quarantine_applied = true;
                info!("day {day}: quarantine isolated {count} infected agents");
            }
            QuarantinePolicy::Threshold {
                threshold,
                duration,
                ..
            } => {
                if let QuarantineState::Active { remaining } = self.quarantine_state {
                    let remaining = remaining - 1;
                    self.quarantine_state = if remaining == 0 {
                        info!("day {day}: quarantine window expired");
                        QuarantineState::Inactive
                    } else {
                        QuarantineState::Active { remaining }
                    };
                }
                if self.quarantine_state == QuarantineState::Inactive
                    && population.infected_fraction() >= threshold
                {
                    self.quarantine_state = QuarantineState::Active {
                        remaining: duration,
                    };
                    info!("day {day}: quarantine activated for {duration} days");
                }
            }
        }
    }

    /// Social distancing either engages once and holds for the rest of the
    /// run (no `duration`), or applies during a fixed window derived from
    /// the day. The effect itself lands through [`Self::contact_multiplier`].
    pub fn apply_social_distancing(&mut self, day: u32) {
        let cfg = &self.cfg.social_distancing;
        if !cfg.enabled || day < cfg.start_day {
            return;
        }
        if cfg.duration.is_none() && !self.distancing_engaged {
            self.distancing_engaged = true;
            info!(
                "day {day}: social distancing engaged, contact rate reduced by {:.0}%",
                cfg.reduction_factor * 100.0
            );
        }
    }

    /// The combined contact-rate multiplier for the day: the social
    /// distancing factor times the threshold-quarantine reduction.
    #[must_use]
    pub fn contact_multiplier(&self, day: u32) -> f64 {
        self.distancing_multiplier(day) * self.quarantine_multiplier()
    }

    fn distancing_multiplier(&self, day: u32) -> f64 {
        let cfg = &self.cfg.social_distancing;
        if !cfg.enabled {
            return 1.0;
        }
        match cfg.duration {
            None if self.distancing_engaged => 1.0 - cfg.reduction_factor,
            None => 1.0,
            Some(duration) if day >= cfg.start_day && day - cfg.start_day < duration => {
                1.0 - cfg.reduction_factor
            }
            Some(_) => 1.0,
        }
    }

    fn quarantine_multiplier(&self) -> f64 {
        match (self.quarantine_state, self.quarantine_policy) {
            (
                QuarantineState::Active { .. },
                QuarantinePolicy::Threshold {
                    reduction_factor, ..
                },
            ) => 1.0 - reduction_factor,
            _ => 1.0,
        }
    }

    #[must_use]
    pub fn is_quarantine_active(&self) -> bool {
        matches!(self.quarantine_state, QuarantineState::Active { .. })
    }
}
