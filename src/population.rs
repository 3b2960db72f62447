//! The population and its single authoritative daily update. Candidate
//! transitions are computed from a consistent snapshot of the previous
//! day's state and applied in a second pass, so evaluation order never
//! lets one agent's same-day transition affect another agent's
//! transmission computation.

use log::trace;
use rand::Rng;
use rand::distr::weighted::WeightedIndex;
use rand::prelude::Distribution;
use rustc_hash::FxHashSet;

use crate::AgentId;
use crate::agent::{Agent, AgeGroup, Compartment};
use crate::config::PopulationConfig;
use crate::error::EpinetError;
use crate::network::ContactNetwork;
use crate::report::{CompartmentCounts, TransitionEvent};
use crate::virus::Virus;

pub struct Population {
    agents: Vec<Agent>,
    network: ContactNetwork,
    /// Scalar in [0, 1] de-weighting every contact; 1.0 means unrestricted.
    contact_rate: f64,
    cfg: PopulationConfig,
}

impl Population {
    /// Creates `cfg.size` susceptible agents and the contact network that
    /// connects them. Age groups are drawn from the configured weights.
    pub fn new<R: Rng>(cfg: &PopulationConfig, rng: &mut R) -> Result<Self, EpinetError> {
        let agents = build_agents(cfg, rng)?;
        let network = ContactNetwork::small_world(cfg.size, cfg.avg_degree, cfg.rewire_prob, rng);
        Ok(Population {
            agents,
            network,
            contact_rate: 1.0,
            cfg: cfg.clone(),
        })
    }

    /// Discards all agents and the network, recreating both with fresh
    /// susceptible state from the same configuration.
    pub fn regenerate<R: Rng>(&mut self, rng: &mut R) -> Result<(), EpinetError> {
        self.agents = build_agents(&self.cfg, rng)?;
        self.network =
            ContactNetwork::small_world(self.cfg.size, self.cfg.avg_degree, self.cfg.rewire_prob, rng);
        self.contact_rate = 1.0;
        Ok(())
    }

    /// Marks the first `count` agents infected, clamped to the population
    /// size. Used to seed patient zero before the first day runs.
    pub fn seed_infections(&mut self, count: usize, day: u32) -> Result<Vec<TransitionEvent>, EpinetError> {
        let count = count.min(self.agents.len());
        let mut events = Vec::with_capacity(count);
        for agent in self.agents.iter_mut().take(count) {
            agent.seed_infected(day)?;
            events.push(TransitionEvent {
                day,
                agent: agent.id(),
                age_group: agent.age_group(),
                from: Compartment::Susceptible,
                to: Compartment::Infected,
            });
        }
        Ok(events)
    }

    /// Advances every non-terminal agent by one day.
    ///
    /// Phase one computes candidate transitions from the previous day's
    /// snapshot: one Bernoulli trial per (infector, susceptible-neighbor)
    /// pair, one recovery trial per infected agent, and a deterministic
    /// incubation check per exposed agent. Phase two applies the queues in
    /// the fixed order expose, infect, recover, so no agent moves through
    /// two compartments in one day.
    pub fn update<R: Rng>(
        &mut self,
        virus: &Virus,
        day: u32,
        rng: &mut R,
    ) -> Result<Vec<TransitionEvent>, EpinetError> {
        // An agent exposed by several infectious neighbors is queued once.
        let mut to_expose: FxHashSet<usize> = FxHashSet::default();
        let mut to_infect: Vec<usize> = Vec::new();
        let mut to_recover: Vec<usize> = Vec::new();

        // Transmission: infected agents attempt each susceptible neighbor.
        // Isolated agents neither transmit nor receive.
        for (index, agent) in self.agents.iter().enumerate() {
            if agent.compartment() != Compartment::Infected || agent.is_isolated() {
                continue;
            }
            for &neighbor in self.network.neighbors(index) {
                let target = &self.agents[neighbor];
                if target.compartment() != Compartment::Susceptible || target.is_isolated() {
                    continue;
                }
                if rng.random_bool(self.transmission_probability(virus, target)) {
                    to_expose.insert(neighbor);
                }
            }
        }

        // Recovery: every infected agent draws one trial; isolation does not
        // stop the internal clock.
        for (index, agent) in self.agents.iter().enumerate() {
            if agent.compartment() == Compartment::Infected && rng.random_bool(virus.cure_rate()) {
                to_recover.push(index);
            }
        }

        // Incubation: deterministic, no draw.
        for (index, agent) in self.agents.iter().enumerate() {
            if agent.compartment() != Compartment::Exposed {
                continue;
            }
            let Some(exposed_on) = agent.exposed_on() else {
                return Err(EpinetError::Invariant(format!(
                    "exposed agent {:?} has no exposure day",
                    agent.id()
                )));
            };
            if day - exposed_on >= virus.incubation_days() {
                to_infect.push(index);
            }
        }

        let mut events = Vec::new();
        let mut exposures: Vec<usize> = to_expose.into_iter().collect();
        exposures.sort_unstable();
        for index in exposures {
            let agent = &mut self.agents[index];
            agent.expose(day)?;
            trace!("day {day}: agent {:?} exposed", agent.id());
            events.push(TransitionEvent {
                day,
                agent: agent.id(),
                age_group: agent.age_group(),
                from: Compartment::Susceptible,
                to: Compartment::Exposed,
            });
        }
        for index in to_infect {
            let agent = &mut self.agents[index];
            agent.infect(day)?;
            trace!("day {day}: agent {:?} infectious", agent.id());
            events.push(TransitionEvent {
                day,
                agent: agent.id(),
                age_group: agent.age_group(),
                from: Compartment::Exposed,
                to: Compartment::Infected,
            });
        }
        for index in to_recover {
            let agent = &mut self.agents[index];
            agent.recover()?;
            trace!("day {day}: agent {:?} recovered", agent.id());
            events.push(TransitionEvent {
                day,
                agent: agent.id(),
                age_group: agent.age_group(),
                from: Compartment::Infected,
                to: Compartment::Recovered,
            });
        }
        Ok(events)
    }

    /// Effective probability that an infectious contact exposes `target`.
    fn transmission_probability(&self, virus: &Virus, target: &Agent) -> f64 {
        let risk = self
            .cfg
            .risk_factors
            .get(&target.age_group())
            .copied()
            .unwrap_or(1.0);
        let vaccine = if target.is_vaccinated() {
            1.0 - target.vaccine_effectiveness()
        } else {
            1.0
        };
        (virus.infect_rate() * self.contact_rate * risk * vaccine).clamp(0.0, 1.0)
    }

    /// Sets the contact-rate multiplier, clamped to [0, 1]. Called by the
    /// intervention layer; a value below 1.0 de-weights every edge without
    /// changing the network itself.
    pub fn set_contact_rate(&mut self, multiplier: f64) {
        self.contact_rate = multiplier.clamp(0.0, 1.0);
    }

    #[must_use]
    pub fn contact_rate(&self) -> f64 {
        self.contact_rate
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.agents.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.agents.is_empty()
    }

    #[must_use]
    pub fn agents(&self) -> &[Agent] {
        &self.agents
    }

    pub(crate) fn agent_mut(&mut self, index: usize) -> &mut Agent {
        &mut self.agents[index]
    }

    #[must_use]
    pub fn network(&self) -> &ContactNetwork {
        &self.network
    }

    #[must_use]
    pub fn counts(&self) -> CompartmentCounts {
        let mut counts = CompartmentCounts::default();
        for agent in &self.agents {
            match agent.compartment() {
                Compartment::Susceptible => counts.susceptible += 1,
                Compartment::Exposed => counts.exposed += 1,
                Compartment::Infected => counts.infected += 1,
                Compartment::Recovered => counts.recovered += 1,
            }
        }
        counts
    }

    /// Compartment counts partitioned by age group, in a fixed group order.
    #[must_use]
    pub fn counts_by_age(&self) -> Vec<(AgeGroup, CompartmentCounts)> {
        AgeGroup::ALL
            .into_iter()
            .map(|group| {
                let mut counts = CompartmentCounts::default();
                for agent in self.agents.iter().filter(|a| a.age_group() == group) {
                    match agent.compartment() {
                        Compartment::Susceptible => counts.susceptible += 1,
                        Compartment::Exposed => counts.exposed += 1,
                        Compartment::Infected => counts.infected += 1,
                        Compartment::Recovered => counts.recovered += 1,
                    }
                }
                (group, counts)
            })
            .collect()
    }

    #[must_use]
    pub fn infected_fraction(&self) -> f64 {
        if self.agents.is_empty() {
            return 0.0;
        }
        self.counts().infected as f64 / self.agents.len() as f64
    }

    #[cfg(test)]
    pub(crate) fn for_testing(network: ContactNetwork) -> Self {
        use rustc_hash::FxHashMap;

        let size = network.node_count();
        let agents = (0..size)
            .map(|index| Agent::new(AgentId(index), AgeGroup::Adult))
            .collect();
        Population {
            agents,
            network,
            contact_rate: 1.0,
            cfg: PopulationConfig {
                size,
                avg_degree: 1,
                rewire_prob: 0.0,
                risk_factors: FxHashMap::default(),
                age_distribution: crate::config::default_age_distribution(),
            },
        }
    }
}

fn build_agents<R: Rng>(cfg: &PopulationConfig, rng: &mut R) -> Result<Vec<Agent>, EpinetError> {
    let weights: Vec<f64> = AgeGroup::ALL
        .iter()
        .map(|group| cfg.age_distribution.get(group).copied().unwrap_or(0.0))
        .collect();
    let age_sampler = WeightedIndex::new(&weights)
        .map_err(|error| EpinetError::Config(format!("invalid age distribution: {error}")))?;

    Ok((0..cfg.size)
        .map(|index| Agent::new(AgentId(index), AgeGroup::ALL[age_sampler.sample(rng)]))
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    fn path(n: usize) -> ContactNetwork {
        let edges: Vec<(usize, usize)> = (0..n - 1).map(|i| (i, i + 1)).collect();
        ContactNetwork::from_edges(n, &edges)
    }

    #[test]
    fn conservation_across_updates() {
        let mut rng = StdRng::seed_from_u64(11);
        let cfg = PopulationConfig {
            size: 60,
            avg_degree: 4,
            rewire_prob: 0.1,
            risk_factors: rustc_hash::FxHashMap::default(),
            age_distribution: crate::config::default_age_distribution(),
        };
        let mut population = Population::new(&cfg, &mut rng).unwrap();
        population.seed_infections(2, 0).unwrap();

        let virus = Virus::new("test", 0.4, 0.1, 2);
        for day in 1..=20 {
            population.update(&virus, day, &mut rng).unwrap();
            assert_eq!(population.counts().total(), 60);
        }
    }

    #[test]
    fn isolated_source_does_not_transmit() {
        let mut population = Population::for_testing(path(3));
        population.agent_mut(1).seed_infected(0).unwrap();
        population.agent_mut(1).isolate();

        let virus = Virus::new("test", 1.0, 0.0, 1);
        let mut rng = StdRng::seed_from_u64(0);
        population.update(&virus, 1, &mut rng).unwrap();

        assert_eq!(population.agents()[0].compartment(), Compartment::Susceptible);
        assert_eq!(population.agents()[2].compartment(), Compartment::Susceptible);
    }

    #[test]
    fn isolated_target_is_not_exposed() {
        let mut population = Population::for_testing(path(3));
        population.agent_mut(0).seed_infected(0).unwrap();
        population.agent_mut(1).isolate();

        let virus = Virus::new("test", 1.0, 0.0, 1);
        let mut rng = StdRng::seed_from_u64(0);
        population.update(&virus, 1, &mut rng).unwrap();

        assert_eq!(population.agents()[1].compartment(), Compartment::Susceptible);
    }

    #[test]
    fn isolation_does_not_stop_recovery() {
        let mut population = Population::for_testing(path(3));
        population.agent_mut(1).seed_infected(0).unwrap();
        population.agent_mut(1).isolate();

        let virus = Virus::new("test", 1.0, 1.0, 1);
        let mut rng = StdRng::seed_from_u64(0);
        population.update(&virus, 1, &mut rng).unwrap();

        assert_eq!(population.agents()[1].compartment(), Compartment::Recovered);
    }

    #[test]
    fn zero_degree_agent_never_infected() {
        let network = ContactNetwork::from_edges(3, &[(0, 1)]);
        let mut population = Population::for_testing(network);
        population.agent_mut(0).seed_infected(0).unwrap();

        let virus = Virus::new("test", 1.0, 0.0, 1);
        let mut rng = StdRng::seed_from_u64(0);
        for day in 1..=5 {
            population.update(&virus, day, &mut rng).unwrap();
        }
        assert_eq!(population.agents()[2].compartment(), Compartment::Susceptible);
        assert_ne!(population.agents()[1].compartment(), Compartment::Susceptible);
    }

    #[test]
    fn incubation_is_exact_and_deterministic() {
        let network = ContactNetwork::from_edges(2, &[]);
        let mut population = Population::for_testing(network);
        population.agent_mut(0).expose(2).unwrap();

        let virus = Virus::new("test", 0.0, 0.0, 3);
        let mut rng = StdRng::seed_from_u64(123);
        for day in 3..=4 {
            population.update(&virus, day, &mut rng).unwrap();
            assert_eq!(population.agents()[0].compartment(), Compartment::Exposed);
        }
        population.update(&virus, 5, &mut rng).unwrap();
        assert_eq!(population.agents()[0].compartment(), Compartment::Infected);
        assert_eq!(population.agents()[0].infected_on(), Some(5));
    }

    #[test]
    fn no_agent_advances_two_compartments_in_one_day() {
        // Path 0-1-2, certain transmission, one-day incubation.
        let mut population = Population::for_testing(path(3));
        population.agent_mut(0).seed_infected(0).unwrap();
        let virus = Virus::new("test", 1.0, 0.0, 1);
        let mut rng = StdRng::seed_from_u64(0);

        // Day 1: 1 is exposed; 2 is out of reach.
        population.update(&virus, 1, &mut rng).unwrap();
        assert_eq!(population.agents()[1].compartment(), Compartment::Exposed);
        assert_eq!(population.agents()[2].compartment(), Compartment::Susceptible);

        // Day 2: 1 turns infectious but was not infectious at the start of
        // the day, so 2 is still unexposed.
        population.update(&virus, 2, &mut rng).unwrap();
        assert_eq!(population.agents()[1].compartment(), Compartment::Infected);
        assert_eq!(population.agents()[2].compartment(), Compartment::Susceptible);

        // Day 3: now 2 is exposed.
        population.update(&virus, 3, &mut rng).unwrap();
        assert_eq!(population.agents()[2].compartment(), Compartment::Exposed);
    }

    #[test]
    fn multiple_infectors_expose_once() {
        let network = ContactNetwork::from_edges(3, &[(0, 1), (2, 1)]);
        let mut population = Population::for_testing(network);
        population.agent_mut(0).seed_infected(0).unwrap();
        population.agent_mut(2).seed_infected(0).unwrap();

        let virus = Virus::new("test", 1.0, 0.0, 1);
        let mut rng = StdRng::seed_from_u64(0);
        let events = population.update(&virus, 1, &mut rng).unwrap();

        let exposures: Vec<_> = events
            .iter()
            .filter(|e| e.to == Compartment::Exposed)
            .collect();
        assert_eq!(exposures.len(), 1);
        assert_eq!(exposures[0].agent, AgentId(1));
    }

    #[test]
    fn full_vaccine_effectiveness_blocks_exposure() {
        let mut population = Population::for_testing(path(2));
        population.agent_mut(0).seed_infected(0).unwrap();
        population.agent_mut(1).vaccinate(1.0);

        let virus = Virus::new("test", 1.0, 0.0, 1);
        let mut rng = StdRng::seed_from_u64(0);
        for day in 1..=10 {
            population.update(&virus, day, &mut rng).unwrap();
        }
        assert_eq!(population.agents()[1].compartment(), Compartment::Susceptible);
    }

    #[test]
    fn transmission_probability_is_clamped() {
        let mut population = Population::for_testing(path(2));
        population
            .cfg
            .risk_factors
            .insert(AgeGroup::Adult, 10.0);
        let virus = Virus::new("test", 0.5, 0.0, 1);
        let target = &population.agents()[1];
        assert_eq!(population.transmission_probability(&virus, target), 1.0);
    }

    #[test]
    fn regenerate_resets_state() {
        let mut rng = StdRng::seed_from_u64(4);
        let cfg = PopulationConfig {
            size: 20,
            avg_degree: 4,
            rewire_prob: 0.0,
            risk_factors: rustc_hash::FxHashMap::default(),
            age_distribution: crate::config::default_age_distribution(),
        };
        let mut population = Population::new(&cfg, &mut rng).unwrap();
        population.seed_infections(5, 0).unwrap();
        population.set_contact_rate(0.5);

        population.regenerate(&mut rng).unwrap();
        assert_eq!(population.counts().susceptible, 20);
        assert_eq!(population.contact_rate(), 1.0);
        assert_eq!(population.network().node_count(), 20);
    }

    #[test]
    fn seed_count_is_clamped() {
        let mut population = Population::for_testing(path(3));
        let events = population.seed_infections(10, 0).unwrap();
        assert_eq!(events.len(), 3);
        assert_eq!(population.counts().infected, 3);
    }
}
