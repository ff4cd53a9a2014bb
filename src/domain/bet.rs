//! Wagers, their settlement rule and the aggregates derived from them.

use crate::domain::poll::{PollOutcome, OPTION_COUNT};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BetStatus {
    Pending,
    Won,
    Lost,
}

impl BetStatus {
    pub fn code(self) -> i64 {
        match self {
            BetStatus::Pending => 0,
            BetStatus::Won => 1,
            BetStatus::Lost => 2,
        }
    }

    pub fn from_code(code: i64) -> Option<Self> {
        match code {
            0 => Some(BetStatus::Pending),
            1 => Some(BetStatus::Won),
            2 => Some(BetStatus::Lost),
            _ => None,
        }
    }
}

/// Natural key of a bet; at most one bet exists per key.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct BetKey {
    pub poll_id: String,
    pub user_id: String,
}

impl BetKey {
    pub fn new(poll_id: impl Into<String>, user_id: impl Into<String>) -> Self {
        Self {
            poll_id: poll_id.into(),
            user_id: user_id.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Bet {
    key: BetKey,
    selected_option_index: usize,
    status: BetStatus,
}

impl Bet {
    /// A freshly placed bet. The caller validates the option index.
    pub fn placed(key: BetKey, selected_option_index: usize) -> Self {
        Self {
            key,
            selected_option_index,
            status: BetStatus::Pending,
        }
    }

    pub fn from_parts(key: BetKey, selected_option_index: usize, status: BetStatus) -> Self {
        Self {
            key,
            selected_option_index,
            status,
        }
    }

    pub fn key(&self) -> &BetKey {
        &self.key
    }

    pub fn poll_id(&self) -> &str {
        &self.key.poll_id
    }

    pub fn user_id(&self) -> &str {
        &self.key.user_id
    }

    pub fn selected_option_index(&self) -> usize {
        self.selected_option_index
    }

    pub fn status(&self) -> BetStatus {
        self.status
    }

    /// Pure settlement rule. Returns `None` while the outcome is pending.
    pub fn settled_status(&self, outcome: PollOutcome) -> Option<BetStatus> {
        outcome.winning_index().map(|winner| {
            if winner == self.selected_option_index {
                BetStatus::Won
            } else {
                BetStatus::Lost
            }
        })
    }

    pub(crate) fn with_status(&self, status: BetStatus) -> Self {
        Self {
            status,
            ..self.clone()
        }
    }
}

/// Returns true when `index` names one of the poll's options.
pub fn is_valid_option_index(index: usize) -> bool {
    index < OPTION_COUNT
}

/// Won/lost counts for one user. Pending bets are not counted.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WinLoss {
    pub wins: u64,
    pub losses: u64,
}

impl WinLoss {
    pub fn tally<'a>(bets: impl IntoIterator<Item = &'a Bet>) -> Self {
        bets.into_iter().fold(WinLoss::default(), |mut acc, bet| {
            match bet.status() {
                BetStatus::Won => acc.wins += 1,
                BetStatus::Lost => acc.losses += 1,
                BetStatus::Pending => {}
            }
            acc
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserStats {
    pub user_id: String,
    pub wins: u64,
    pub losses: u64,
    pub total: u64,
    /// `wins / losses`, or `None` when the user has no losses.
    pub win_loss_ratio: Option<f64>,
}

impl UserStats {
    pub fn new(user_id: String, wins: u64, losses: u64) -> Self {
        let win_loss_ratio = if losses == 0 {
            None
        } else {
            Some(wins as f64 / losses as f64)
        };
        Self {
            user_id,
            wins,
            losses,
            total: wins + losses,
            win_loss_ratio,
        }
    }
}
