//! The run driver: wires the virus, population, and intervention engine
//! from a validated configuration, then repeats interventions, population
//! update, snapshot for the configured number of days. Single-threaded and
//! turn-based; one day is fully processed before the next begins.

use log::info;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::config::Config;
use crate::error::EpinetError;
use crate::interventions::InterventionEngine;
use crate::population::Population;
use crate::report::{DailySnapshot, Recorder, TransitionEvent};
use crate::virus::Virus;

pub struct Simulation {
    virus: Virus,
    population: Population,
    interventions: InterventionEngine,
    duration: u32,
    rng: StdRng,
    seed: u64,
    /// Patient-zero seeding events, handed to the recorder when the run starts.
    pending: Vec<TransitionEvent>,
}

impl Simulation {
    /// Builds a runnable simulation. The configuration is validated first;
    /// nothing here can fail later for configuration reasons.
    pub fn from_config(config: &Config) -> Result<Self, EpinetError> {
        config.validate()?;
        let seed = config
            .simulation
            .seed
            .unwrap_or_else(|| rand::rng().random());
        let mut rng = StdRng::seed_from_u64(seed);

        let virus = Virus::new(
            config.virus.name.clone(),
            config.virus.infect_rate,
            config.virus.cure_rate,
            config.virus.infection_time,
        );
        let mut population = Population::new(&config.population, &mut rng)?;
        let pending = population.seed_infections(config.simulation.initial_infected, 0)?;
        let interventions = InterventionEngine::new(&config.intervention)?;

        Ok(Simulation {
            virus,
            population,
            interventions,
            duration: config.simulation.duration,
            rng,
            seed,
            pending,
        })
    }

    /// Runs every configured day, handing transition events and daily
    /// snapshots to the recorder as they happen.
    pub fn run(&mut self, recorder: &mut dyn Recorder) -> Result<(), EpinetError> {
        info!(
            "starting {}: {} agents, {} days, seed {}",
            self.virus.name(),
            self.population.len(),
            self.duration,
            self.seed
        );
        for event in std::mem::take(&mut self.pending) {
            recorder.record_event(&event)?;
        }

        for day in 1..=self.duration {
            let mut events = self
                .interventions
                .apply_all(day, &mut self.population, &mut self.rng)?;
            events.extend(self.population.update(&self.virus, day, &mut self.rng)?);
            for event in &events {
                recorder.record_event(event)?;
            }

            let counts = self.population.counts();
            info!("day {day}: {counts}");
            recorder.record_day(&DailySnapshot {
                day,
                counts,
                by_age: self.population.counts_by_age(),
            })?;
        }

        info!("{} complete: {}", self.virus.name(), self.population.counts());
        Ok(())
    }

    #[must_use]
    pub fn population(&self) -> &Population {
        &self.population
    }

    /// The seed actually used for this run, whether configured or drawn
    /// from entropy.
    #[must_use]
    pub fn seed(&self) -> u64 {
        self.seed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rustc_hash::FxHashMap;

    use crate::AgentId;
    use crate::agent::Compartment;
    use crate::report::MemoryRecorder;

    fn scenario_config(infect_rate: f64) -> Config {
        Config::from_json(&format!(
            r#"{{
                "population": {{ "size": 100, "avg_degree": 4, "rewire_prob": 0.1 }},
                "virus": {{ "name": "testvirus", "infect_rate": {infect_rate}, "cure_rate": 0.1, "infection_time": 3 }},
                "simulation": {{ "duration": 30, "seed": 1234 }}
            }}"#
        ))
        .unwrap()
    }

    fn run_scenario(config: &Config) -> MemoryRecorder {
        let mut recorder = MemoryRecorder::new();
        let mut simulation = Simulation::from_config(config).unwrap();
        simulation.run(&mut recorder).unwrap();
        recorder
    }

    #[test]
    fn conservation_and_nondecreasing_recovery() {
        let recorder = run_scenario(&scenario_config(0.3));

        assert_eq!(recorder.days.len(), 30);
        let mut last_recovered = 0;
        for snapshot in &recorder.days {
            assert_eq!(snapshot.counts.total(), 100);
            assert!(snapshot.counts.recovered >= last_recovered);
            last_recovered = snapshot.counts.recovered;

            let partitioned: usize = snapshot.by_age.iter().map(|(_, counts)| counts.total()).sum();
            assert_eq!(partitioned, 100);
        }
    }

    #[test]
    fn transitions_move_strictly_forward() {
        let recorder = run_scenario(&scenario_config(0.3));

        let mut last_seen: FxHashMap<AgentId, Compartment> = FxHashMap::default();
        for event in &recorder.events {
            assert!(event.from < event.to, "backward transition {event:?}");
            match last_seen.get(&event.agent) {
                Some(previous) => assert_eq!(*previous, event.from, "gap in history of {:?}", event.agent),
                None => assert_eq!(event.from, Compartment::Susceptible),
            }
            last_seen.insert(event.agent, event.to);
        }
    }

    #[test]
    fn zero_infect_rate_never_spreads() {
        let recorder = run_scenario(&scenario_config(0.0));

        for snapshot in &recorder.days {
            assert_eq!(snapshot.counts.exposed, 0);
            assert!(snapshot.counts.infected + snapshot.counts.recovered <= 1);
        }
        assert!(recorder.events.iter().all(|event| event.to != Compartment::Exposed));
    }

    #[test]
    fn fixed_seed_reproduces_the_run() {
        let config = scenario_config(0.3);
        let first = run_scenario(&config);
        let second = run_scenario(&config);

        assert_eq!(first.events, second.events);
        for (a, b) in first.days.iter().zip(&second.days) {
            assert_eq!(a.counts, b.counts);
        }
    }

    #[test]
    fn deterministic_wave_on_a_ring() {
        // With certain transmission, no recovery, one-day incubation, and no
        // rewiring, the infection advances two nodes per side every other
        // day: exposures land on odd days, conversions on even days.
        let config = Config::from_json(
            r#"{
                "population": { "size": 100, "avg_degree": 4, "rewire_prob": 0.0 },
                "virus": { "name": "wave", "infect_rate": 1.0, "cure_rate": 0.0, "infection_time": 1 },
                "simulation": { "duration": 30, "seed": 7 }
            }"#,
        )
        .unwrap();
        let recorder = run_scenario(&config);

        let last = recorder.days.last().unwrap();
        assert_eq!(last.counts.infected, 61);
        assert_eq!(last.counts.exposed, 0);
        assert_eq!(last.counts.susceptible, 39);
        assert_eq!(last.counts.recovered, 0);
    }
}
