/*!

An agent-based SEIR epidemic model. A population of agents is connected by a
small-world contact network; each simulated day every infected agent draws an
independent Bernoulli trial against each susceptible neighbor, and exposed
agents progress deterministically through incubation. Vaccination, quarantine,
and social distancing policies modulate the transition probabilities and
contact availability from a validated configuration.

*/

pub mod agent;
pub mod config;
pub mod error;
pub mod interventions;
pub mod log;
pub mod network;
pub mod population;
pub mod report;
pub mod simulation;
pub mod virus;

pub use agent::{Agent, AgeGroup, Compartment};
pub use config::Config;
pub use error::EpinetError;
pub use interventions::InterventionEngine;
pub use network::ContactNetwork;
pub use population::Population;
pub use report::{CsvRecorder, DailySnapshot, MemoryRecorder, Recorder, TransitionEvent};
pub use simulation::Simulation;
pub use virus::Virus;

use serde::Serialize;

/// Stable identity of one agent, also its node index in the contact network.
#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Debug, Serialize)]
pub struct AgentId(pub usize);
