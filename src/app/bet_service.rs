//! Wager ledger and settlement.

use crate::app::poll_service::PollService;
use crate::domain::{
    is_valid_option_index, Bet, BetKey, BetStatus, LedgerError, LedgerResult, UserStats,
    OPTION_COUNT,
};
use crate::storage::BetRepository;
use std::sync::Arc;
use tracing::{debug, info, warn};

#[derive(Clone)]
pub struct BetService {
    polls: PollService,
    repo: Arc<dyn BetRepository>,
}

/// What a settlement run changed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Settlement {
    pub won: usize,
    pub lost: usize,
    /// Bets that already carried their final status.
    pub unchanged: usize,
}

impl BetService {
    pub fn new(polls: PollService, repo: Arc<dyn BetRepository>) -> Self {
        Self { polls, repo }
    }

    /// Places a bet while the poll is open. One bet per (poll, user), ever.
    pub async fn create_bet(
        &self,
        poll_id: &str,
        user_id: &str,
        option_index: usize,
    ) -> LedgerResult<Bet> {
        if !is_valid_option_index(option_index) {
            return Err(LedgerError::InvalidInput(format!(
                "option index {} is out of range 0..{}",
                option_index, OPTION_COUNT
            )));
        }

        let poll = self.polls.get_poll_by_id(poll_id).await?;
        if !poll.is_open() {
            warn!(poll_id, user_id, "bet rejected, poll is closed");
            return Err(LedgerError::PollClosed);
        }

        let bet = Bet::placed(BetKey::new(poll_id, user_id), option_index);
        if let Err(err) = self.repo.save(&bet).await {
            if err.is_conflict() {
                warn!(poll_id, user_id, "bet rejected, user already bet");
            }
            return Err(err);
        }
        info!(poll_id, user_id, option_index, "bet placed");
        Ok(bet)
    }

    pub async fn get_bet(&self, poll_id: &str, user_id: &str) -> LedgerResult<Bet> {
        self.repo.get_by_key(&BetKey::new(poll_id, user_id)).await
    }

    pub async fn get_bets_from_user(&self, user_id: &str) -> LedgerResult<Vec<Bet>> {
        debug!(user_id, "fetching bets from user");
        self.repo.get_bets_from_user(user_id).await
    }

    pub async fn get_bets_by_poll(&self, poll_id: &str) -> LedgerResult<Vec<Bet>> {
        self.repo.get_bets_by_poll(poll_id).await
    }

    /// Settles every pending bet on the poll against its decided outcome.
    ///
    /// Fails with `OutcomePending` before any write if no outcome is set.
    /// Won and Lost are terminal: only Pending bets are written, so re-running
    /// after a partial failure finishes the job and a second full run writes
    /// nothing. A settled bet that contradicts the outcome fails the run with
    /// `SettledBetMismatch` before any write.
    pub async fn update_bets_by_poll_id(&self, poll_id: &str) -> LedgerResult<Settlement> {
        let poll = self.polls.get_poll_by_id(poll_id).await?;
        let outcome = poll.outcome();
        if outcome.winning_index().is_none() {
            warn!(poll_id, "settlement requested before an outcome was selected");
            return Err(LedgerError::OutcomePending);
        }

        let bets = self.repo.get_bets_by_poll(poll_id).await?;
        if let Some(stale) = bets.iter().find(|bet| {
            bet.status() != BetStatus::Pending && bet.settled_status(outcome) != Some(bet.status())
        }) {
            warn!(
                poll_id,
                user_id = stale.user_id(),
                "settled bet contradicts the poll outcome"
            );
            return Err(LedgerError::SettledBetMismatch {
                poll_id: poll_id.to_string(),
                user_id: stale.user_id().to_string(),
            });
        }

        let mut settlement = Settlement::default();
        for bet in bets {
            if bet.status() != BetStatus::Pending {
                settlement.unchanged += 1;
                continue;
            }
            let Some(status) = bet.settled_status(outcome) else {
                continue;
            };
            self.repo.update_bet(&bet.with_status(status)).await?;
            match status {
                BetStatus::Won => settlement.won += 1,
                BetStatus::Lost => settlement.lost += 1,
                BetStatus::Pending => {}
            }
        }

        info!(
            poll_id,
            won = settlement.won,
            lost = settlement.lost,
            unchanged = settlement.unchanged,
            "bets settled"
        );
        Ok(settlement)
    }

    /// Win/loss aggregates for every user who has placed a bet.
    pub async fn get_all_user_stats(&self) -> LedgerResult<Vec<UserStats>> {
        self.repo.get_all_user_stats().await
    }
}
