//! Global-history branch predictor with a queue of
//! predictions still waiting for their branch to resolve

use std::collections::VecDeque;
use std::fmt;
use std::str::FromStr;

use crate::error::SimulatorError;

/// Ordered by complexity
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Default)]
pub enum PredictorHeuristic {
    /// Always not taken
    #[default]
    Static,
    OneBit,
    TwoBit,
}

impl fmt::Display for PredictorHeuristic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            PredictorHeuristic::Static => "static",
            PredictorHeuristic::OneBit => "1bit",
            PredictorHeuristic::TwoBit => "2bit",
        };
        write!(f, "{}", name)
    }
}

impl FromStr for PredictorHeuristic {
    type Err = SimulatorError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "static" => Ok(PredictorHeuristic::Static),
            "1bit" => Ok(PredictorHeuristic::OneBit),
            "2bit" => Ok(PredictorHeuristic::TwoBit),
            _ => Err(SimulatorError::ConfigError(format!(
                "unknown branch predictor '{}'",
                s
            ))),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
enum PredictorState {
    StronglyNot = 0,
    WeaklyNot = 1,
    Weakly = 2,
    Strongly = 3,
}

/// Result of checking a resolved branch against its prediction
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum PredictionOutcome {
    Hit,
    Miss,
}

pub struct BranchPredictor {
    heuristic: PredictorHeuristic,
    state: PredictorState,
    outstanding: VecDeque<bool>,
}

impl BranchPredictor {
    pub fn new(heuristic: PredictorHeuristic) -> Self {
        Self {
            heuristic,
            state: PredictorState::StronglyNot,
            outstanding: VecDeque::new(),
        }
    }

    pub fn heuristic(&self) -> PredictorHeuristic {
        self.heuristic
    }

    /// Raw history value, for the trace
    pub fn history(&self) -> u8 {
        self.state as u8
    }

    pub fn predict(&self) -> bool {
        match self.heuristic {
            PredictorHeuristic::Static => false,
            PredictorHeuristic::OneBit | PredictorHeuristic::TwoBit => {
                matches!(self.state, PredictorState::Weakly | PredictorState::Strongly)
            }
        }
    }

    /// Predicts and records the prediction as outstanding
    pub fn predict_and_record(&mut self) -> bool {
        let prediction = self.predict();
        self.outstanding.push_back(prediction);
        prediction
    }

    /// Moves the history toward the observed outcome
    pub fn update(&mut self, taken: bool) {
        self.state = match self.heuristic {
            PredictorHeuristic::Static => return,
            PredictorHeuristic::OneBit => match taken {
                true => PredictorState::Strongly,
                false => PredictorState::StronglyNot,
            },
            PredictorHeuristic::TwoBit if taken => match self.state {
                PredictorState::StronglyNot => PredictorState::WeaklyNot,
                PredictorState::WeaklyNot => PredictorState::Weakly,
                PredictorState::Weakly => PredictorState::Strongly,
                PredictorState::Strongly => PredictorState::Strongly,
            },
            PredictorHeuristic::TwoBit => match self.state {
                PredictorState::Strongly => PredictorState::Weakly,
                PredictorState::Weakly => PredictorState::WeaklyNot,
                PredictorState::WeaklyNot => PredictorState::StronglyNot,
                PredictorState::StronglyNot => PredictorState::StronglyNot,
            },
        };
    }

    /// Pops the oldest outstanding prediction, compares it with the
    /// actual outcome and trains the history.
    /// Returns None when nothing was outstanding.
    pub fn validate(&mut self, taken: bool) -> Option<PredictionOutcome> {
        let predicted = self.outstanding.pop_front()?;
        self.update(taken);
        Some(match predicted == taken {
            true => PredictionOutcome::Hit,
            false => PredictionOutcome::Miss,
        })
    }

    /// Drops predictions of squashed branches
    pub fn discard_outstanding(&mut self) {
        self.outstanding.clear();
    }

    pub fn outstanding(&self) -> usize {
        self.outstanding.len()
    }
}
