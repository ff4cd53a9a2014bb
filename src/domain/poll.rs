//! Two-option polls and their lifecycle values.

use crate::domain::error::{LedgerError, LedgerResult};
use serde::{Deserialize, Serialize};

/// Number of options every poll carries.
pub const OPTION_COUNT: usize = 2;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PollStatus {
    Open,
    Closed,
}

impl PollStatus {
    /// Integer code used by the relational backend.
    pub fn code(self) -> i64 {
        match self {
            PollStatus::Open => 0,
            PollStatus::Closed => 1,
        }
    }

    pub fn from_code(code: i64) -> Option<Self> {
        match code {
            0 => Some(PollStatus::Open),
            1 => Some(PollStatus::Closed),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PollOutcome {
    Pending,
    Option1,
    Option2,
}

impl PollOutcome {
    pub fn code(self) -> i64 {
        match self {
            PollOutcome::Pending => 0,
            PollOutcome::Option1 => 1,
            PollOutcome::Option2 => 2,
        }
    }

    pub fn from_code(code: i64) -> Option<Self> {
        match code {
            0 => Some(PollOutcome::Pending),
            1 => Some(PollOutcome::Option1),
            2 => Some(PollOutcome::Option2),
            _ => None,
        }
    }

    /// The zero-based option index this outcome names, if decided.
    pub fn winning_index(self) -> Option<usize> {
        match self {
            PollOutcome::Pending => None,
            PollOutcome::Option1 => Some(0),
            PollOutcome::Option2 => Some(1),
        }
    }
}

/// An immutable snapshot of a poll.
///
/// Transitions return a fresh value; the owning service decides when to persist it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Poll {
    id: String,
    title: String,
    options: [String; OPTION_COUNT],
    status: PollStatus,
    outcome: PollOutcome,
}

impl Poll {
    /// Builds a fresh open poll, rejecting anything other than exactly two options.
    pub fn open(id: String, title: String, options: Vec<String>) -> LedgerResult<Self> {
        let options: [String; OPTION_COUNT] = options.try_into().map_err(|given: Vec<String>| {
            LedgerError::InvalidInput(format!(
                "poll must have exactly {} options, got {}",
                OPTION_COUNT,
                given.len()
            ))
        })?;
        Ok(Self {
            id,
            title,
            options,
            status: PollStatus::Open,
            outcome: PollOutcome::Pending,
        })
    }

    /// Reassembles a poll from stored columns.
    pub fn from_parts(
        id: String,
        title: String,
        options: [String; OPTION_COUNT],
        status: PollStatus,
        outcome: PollOutcome,
    ) -> Self {
        Self {
            id,
            title,
            options,
            status,
            outcome,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn options(&self) -> &[String; OPTION_COUNT] {
        &self.options
    }

    pub fn status(&self) -> PollStatus {
        self.status
    }

    pub fn outcome(&self) -> PollOutcome {
        self.outcome
    }

    pub fn is_open(&self) -> bool {
        self.status == PollStatus::Open
    }

    /// Open -> Closed. A closed poll yields `AlreadyClosed`.
    pub(crate) fn close(&self) -> LedgerResult<Self> {
        if !self.is_open() {
            return Err(LedgerError::AlreadyClosed);
        }
        Ok(Self {
            status: PollStatus::Closed,
            ..self.clone()
        })
    }

    /// Pending -> `outcome`, only once the poll is closed.
    ///
    /// Asking for the outcome already set returns the poll unchanged; asking
    /// for a different one yields `OutcomeAlreadyDecided`.
    pub(crate) fn decide(&self, outcome: PollOutcome) -> LedgerResult<Self> {
        require_decisive(outcome)?;
        if self.is_open() {
            return Err(LedgerError::PollStillOpen);
        }
        match self.outcome {
            current if current == outcome => Ok(self.clone()),
            PollOutcome::Pending => Ok(Self {
                outcome,
                ..self.clone()
            }),
            _ => Err(LedgerError::OutcomeAlreadyDecided),
        }
    }
}

/// Rejects `Pending` as a requested outcome.
pub(crate) fn require_decisive(outcome: PollOutcome) -> LedgerResult<()> {
    match outcome.winning_index() {
        Some(_) => Ok(()),
        None => Err(LedgerError::InvalidInput(
            "outcome must name one of the two options".to_string(),
        )),
    }
}
