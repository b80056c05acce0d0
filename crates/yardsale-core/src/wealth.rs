//! The wealth vector: one non-negative balance per agent.
//!
//! An agent's identity is its index. The vector is validated once, at
//! construction: it must hold at least one agent and its total must fit in
//! a `u64`. Wealth is only ever moved between agents afterwards, so every
//! later sum over the vector fits as well.

use serde::{Deserialize, Serialize};

/// Errors produced when building or mutating a [`WealthVector`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum WealthError {
    /// The vector holds no agents.
    #[error("invalid input: wealth vector is empty")]
    Empty,

    /// An agent was given a negative balance.
    #[error("invalid input: agent {agent} has negative wealth {value}")]
    NegativeWealth {
        /// Index of the offending agent.
        agent: usize,
        /// The negative value supplied.
        value: i64,
    },

    /// The total wealth does not fit in a `u64`.
    #[error("total wealth exceeds u64::MAX")]
    TotalOverflow,

    /// A single agent's balance would exceed `u64::MAX`.
    #[error("wealth overflow at agent {agent}")]
    Overflow {
        /// Index of the agent whose balance overflowed.
        agent: usize,
    },

    /// An operation referenced an agent outside the population.
    #[error("agent {agent} is outside the population of {population}")]
    AgentOutOfRange {
        /// The offending agent index.
        agent: usize,
        /// Number of agents in the population.
        population: usize,
    },

    /// A vector's length does not match the configured population.
    #[error("length mismatch: expected {expected} agents, got {actual}")]
    LengthMismatch {
        /// The configured number of agents.
        expected: usize,
        /// The number of agents supplied.
        actual: usize,
    },
}

impl WealthError {
    /// Whether the error was caused by malformed caller input (an empty
    /// vector or a negative balance) rather than by an operation.
    pub const fn is_invalid_input(&self) -> bool {
        matches!(self, Self::Empty | Self::NegativeWealth { .. })
    }
}

/// Ordered per-agent wealth. Index = agent identity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "Vec<u64>", into = "Vec<u64>")]
pub struct WealthVector(Vec<u64>);

impl WealthVector {
    /// Wrap a list of balances.
    ///
    /// # Errors
    ///
    /// Returns [`WealthError::Empty`] for an empty list and
    /// [`WealthError::TotalOverflow`] if the balances sum past `u64::MAX`.
    pub fn new(balances: Vec<u64>) -> Result<Self, WealthError> {
        if balances.is_empty() {
            return Err(WealthError::Empty);
        }
        checked_total(&balances).ok_or(WealthError::TotalOverflow)?;
        Ok(Self(balances))
    }

    /// `agent_count` agents each holding `initial_wealth`.
    ///
    /// # Errors
    ///
    /// Returns [`WealthError::Empty`] when `agent_count` is zero and
    /// [`WealthError::TotalOverflow`] when the economy is too large.
    pub fn uniform(agent_count: usize, initial_wealth: u64) -> Result<Self, WealthError> {
        Self::new(vec![initial_wealth; agent_count])
    }

    /// Build a vector from signed balances, rejecting negatives.
    ///
    /// # Errors
    ///
    /// Returns [`WealthError::NegativeWealth`] naming the first negative
    /// balance, plus the errors of [`WealthVector::new`].
    pub fn from_signed(balances: &[i64]) -> Result<Self, WealthError> {
        let converted = balances
            .iter()
            .enumerate()
            .map(|(agent, &value)| {
                u64::try_from(value).map_err(|_err| WealthError::NegativeWealth { agent, value })
            })
            .collect::<Result<Vec<_>, _>>()?;
        Self::new(converted)
    }

    /// Number of agents.
    pub const fn len(&self) -> usize {
        self.0.len()
    }

    /// Always `false`: a validated vector holds at least one agent.
    pub const fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Balance of one agent.
    pub fn get(&self, agent: usize) -> Option<u64> {
        self.0.get(agent).copied()
    }

    /// All balances in agent order.
    pub const fn as_slice(&self) -> &[u64] {
        self.0.as_slice()
    }

    /// Total wealth. Cannot overflow: checked at construction and
    /// preserved by every mutation.
    pub fn total(&self) -> u64 {
        self.0.iter().fold(0_u64, |acc, &w| acc.saturating_add(w))
    }

    /// Number of agents holding any wealth.
    pub fn solvent_agents(&self) -> usize {
        self.0.iter().filter(|&&w| w > 0).count()
    }

    /// Unwrap into the raw balances.
    pub fn into_inner(self) -> Vec<u64> {
        self.0
    }

    /// Swap in new balances produced by a conserving operation.
    ///
    /// Callers in this crate guarantee the replacement has the same length
    /// and total as the current vector.
    pub(crate) fn replace(&mut self, balances: Vec<u64>) {
        self.0 = balances;
    }
}

impl TryFrom<Vec<u64>> for WealthVector {
    type Error = WealthError;

    fn try_from(balances: Vec<u64>) -> Result<Self, Self::Error> {
        Self::new(balances)
    }
}

impl From<WealthVector> for Vec<u64> {
    fn from(wealth: WealthVector) -> Self {
        wealth.0
    }
}

/// Sum balances, returning `None` on overflow.
fn checked_total(balances: &[u64]) -> Option<u64> {
    balances
        .iter()
        .try_fold(0_u64, |acc, &w| acc.checked_add(w))
}
