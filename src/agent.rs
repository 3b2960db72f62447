//! One individual in the simulated population: compartment, timestamps,
//! demographic attribute, and intervention flags. Compartments only move
//! forward through S, E, I, R; every mutation goes through a named
//! transition operation that checks its legal predecessor.

use serde::{Deserialize, Serialize};

use crate::AgentId;
use crate::error::EpinetError;

/// Disease compartment of an agent. Declaration order gives the forward
/// ordering `Susceptible < Exposed < Infected < Recovered`.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Ord, PartialOrd, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Compartment {
    Susceptible,
    Exposed,
    Infected,
    Recovered,
}

impl Compartment {
    /// Single-letter code used in daily summaries.
    #[must_use]
    pub fn code(self) -> &'static str {
        match self {
            Compartment::Susceptible => "S",
            Compartment::Exposed => "E",
            Compartment::Infected => "I",
            Compartment::Recovered => "R",
        }
    }
}

/// Demographic group fixed at creation, used to scale susceptibility.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Ord, PartialOrd, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AgeGroup {
    Child,
    Adult,
    Senior,
}

impl AgeGroup {
    pub const ALL: [AgeGroup; 3] = [AgeGroup::Child, AgeGroup::Adult, AgeGroup::Senior];
}

#[derive(Clone, Debug)]
pub struct Agent {
    id: AgentId,
    compartment: Compartment,
    exposed_on: Option<u32>,
    infected_on: Option<u32>,
    age_group: AgeGroup,
    vaccinated: bool,
    vaccine_effectiveness: f64,
    isolated: bool,
}

impl Agent {
    #[must_use]
    pub fn new(id: AgentId, age_group: AgeGroup) -> Self {
        Agent {
            id,
            compartment: Compartment::Susceptible,
            exposed_on: None,
            infected_on: None,
            age_group,
            vaccinated: false,
            vaccine_effectiveness: 0.0,
            isolated: false,
        }
    }

    #[must_use]
    pub fn id(&self) -> AgentId {
        self.id
    }

    #[must_use]
    pub fn compartment(&self) -> Compartment {
        self.compartment
    }

    #[must_use]
    pub fn exposed_on(&self) -> Option<u32> {
        self.exposed_on
    }

    #[must_use]
    pub fn infected_on(&self) -> Option<u32> {
        self.infected_on
    }

    #[must_use]
    pub fn age_group(&self) -> AgeGroup {
        self.age_group
    }

    #[must_use]
    pub fn is_vaccinated(&self) -> bool {
        self.vaccinated
    }

    #[must_use]
    pub fn vaccine_effectiveness(&self) -> f64 {
        self.vaccine_effectiveness
    }

    #[must_use]
    pub fn is_isolated(&self) -> bool {
        self.isolated
    }

    /// Marks the agent vaccinated with the given effectiveness. Once set,
    /// the flag never reverts.
    pub fn vaccinate(&mut self, effectiveness: f64) {
        self.vaccinated = true;
        self.vaccine_effectiveness = effectiveness;
    }

    /// Removes the agent from the contact network for as long as the flag is
    /// set. Incubation and recovery still advance while isolated.
    pub fn isolate(&mut self) {
        self.isolated = true;
    }

    /// S → E. Stamps `exposed_on` with the current day.
    pub fn expose(&mut self, day: u32) -> Result<(), EpinetError> {
        if self.compartment != Compartment::Susceptible {
            return Err(EpinetError::Invariant(format!(
                "cannot expose agent {:?} in compartment {:?}",
                self.id, self.compartment
            )));
        }
        self.compartment = Compartment::Exposed;
        self.exposed_on = Some(day);
        Ok(())
    }

    /// E → I. Stamps `infected_on` with the current day.
    pub fn infect(&mut self, day: u32) -> Result<(), EpinetError> {
        if self.compartment != Compartment::Exposed {
            return Err(EpinetError::Invariant(format!(
                "cannot infect agent {:?} in compartment {:?}",
                self.id, self.compartment
            )));
        }
        self.compartment = Compartment::Infected;
        self.infected_on = Some(day);
        Ok(())
    }

    /// I → R. Recovery is terminal.
    pub fn recover(&mut self) -> Result<(), EpinetError> {
        if self.compartment != Compartment::Infected {
            return Err(EpinetError::Invariant(format!(
                "cannot recover agent {:?} in compartment {:?}",
                self.id, self.compartment
            )));
        }
        self.compartment = Compartment::Recovered;
        Ok(())
    }

    /// S → I, used to seed patient zero before the first day runs.
    pub fn seed_infected(&mut self, day: u32) -> Result<(), EpinetError> {
        if self.compartment != Compartment::Susceptible {
            return Err(EpinetError::Invariant(format!(
                "cannot seed agent {:?} in compartment {:?}",
                self.id, self.compartment
            )));
        }
        self.compartment = Compartment::Infected;
        self.infected_on = Some(day);
        Ok(())
    }

    /// S → R, used when vaccination is configured to confer immunity.
    pub fn immunize(&mut self) -> Result<(), EpinetError> {
        if self.compartment != Compartment::Susceptible {
            return Err(EpinetError::Invariant(format!(
                "cannot immunize agent {:?} in compartment {:?}",
                self.id, self.compartment
            )));
        }
        self.compartment = Compartment::Recovered;
        Ok(())
    }
}
