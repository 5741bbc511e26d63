//! Declared action and observation spaces

use rand::Rng;

use super::observation::Observation;

/// One discrete choice per agent, each in `0..actions`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ActionSpace {
    pub agents: usize,
    pub actions: usize,
}

impl ActionSpace {
    pub fn new(agents: usize, actions: usize) -> Self {
        Self { agents, actions }
    }

    pub fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> Vec<usize> {
        (0..self.agents)
            .map(|_| rng.random_range(0..self.actions))
            .collect()
    }

    pub fn contains(&self, actions: &[usize]) -> bool {
        actions.len() == self.agents && actions.iter().all(|&a| a < self.actions)
    }
}

/// A bounded box, identical for every agent row.
#[derive(Debug, Clone, PartialEq)]
pub struct ObservationSpace {
    pub agents: usize,
    pub low: Vec<f32>,
    pub high: Vec<f32>,
}

impl ObservationSpace {
    pub fn new(agents: usize, low: Vec<f32>, high: Vec<f32>) -> Self {
        debug_assert_eq!(low.len(), high.len());
        Self { agents, low, high }
    }

    pub fn width(&self) -> usize {
        self.low.len()
    }

    pub fn shape(&self) -> (usize, usize) {
        (self.agents, self.width())
    }

    /// Pulls every feature back inside its bounds.
    pub fn clamp(&self, row: &mut [f32]) {
        for ((value, low), high) in row.iter_mut().zip(&self.low).zip(&self.high) {
            *value = value.clamp(*low, *high);
        }
    }

    pub fn contains(&self, observation: &Observation) -> bool {
        observation.agents.len() == self.agents
            && observation.agents.iter().all(|row| {
                row.len() == self.width()
                    && row
                        .iter()
                        .zip(&self.low)
                        .zip(&self.high)
                        .all(|((v, low), high)| *v >= *low && *v <= *high)
            })
    }
}
