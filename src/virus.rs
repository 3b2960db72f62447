/// Immutable parameter bundle for one pathogen. The name is a label only.
#[derive(Clone, Debug)]
pub struct Virus {
    name: String,
    infect_rate: f64,
    cure_rate: f64,
    incubation_days: u32,
}

impl Virus {
    #[must_use]
    pub fn new(name: impl Into<String>, infect_rate: f64, cure_rate: f64, incubation_days: u32) -> Self {
        Virus {
            name: name.into(),
            infect_rate,
            cure_rate,
            incubation_days,
        }
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Probability of transmission per infectious contact-day.
    #[must_use]
    pub fn infect_rate(&self) -> f64 {
        self.infect_rate
    }

    /// Probability that an infected agent recovers on a given day.
    #[must_use]
    pub fn cure_rate(&self) -> f64 {
        self.cure_rate
    }

    /// Days spent exposed before becoming infectious.
    #[must_use]
    pub fn incubation_days(&self) -> u32 {
        self.incubation_days
    }
}
