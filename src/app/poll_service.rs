//! Poll lifecycle: Open -> Closed for status, Pending -> Option1 | Option2 for outcome.

use crate::domain::poll::require_decisive;
use crate::domain::{LedgerError, LedgerResult, Poll, PollOutcome};
use crate::storage::PollRepository;
use std::sync::Arc;
use tracing::{debug, info, warn};
use uuid::Uuid;

#[derive(Clone)]
pub struct PollService {
    repo: Arc<dyn PollRepository>,
}

impl PollService {
    pub fn new(repo: Arc<dyn PollRepository>) -> Self {
        Self { repo }
    }

    /// Opens a new poll. Exactly two options are required.
    pub async fn create_poll(&self, title: &str, options: Vec<String>) -> LedgerResult<Poll> {
        let poll = Poll::open(Uuid::new_v4().to_string(), title.to_string(), options)?;
        self.repo.save(&poll).await?;
        info!(poll_id = poll.id(), title = poll.title(), "poll created");
        Ok(poll)
    }

    /// Closes betting. A second close fails with `AlreadyClosed`, also when
    /// both calls race.
    pub async fn close_poll(&self, id: &str) -> LedgerResult<Poll> {
        match self.repo.close(id).await {
            Ok(closed) => {
                info!(poll_id = id, "poll closed");
                Ok(closed)
            }
            Err(LedgerError::AlreadyClosed) => {
                warn!(poll_id = id, "close requested on a closed poll");
                Err(LedgerError::AlreadyClosed)
            }
            Err(err) => Err(err),
        }
    }

    /// Declares the winning option.
    ///
    /// The poll must be closed first. Re-selecting the same outcome is a no-op;
    /// changing a decided outcome fails with `OutcomeAlreadyDecided`.
    pub async fn select_outcome(&self, id: &str, outcome: PollOutcome) -> LedgerResult<Poll> {
        require_decisive(outcome)?;
        match self.repo.decide(id, outcome).await {
            Ok(decided) => {
                info!(poll_id = id, outcome = ?outcome, "outcome selected");
                Ok(decided)
            }
            Err(err @ (LedgerError::PollStillOpen | LedgerError::OutcomeAlreadyDecided)) => {
                warn!(poll_id = id, outcome = ?outcome, error = %err, "outcome rejected");
                Err(err)
            }
            Err(err) => Err(err),
        }
    }

    pub async fn get_poll_by_id(&self, id: &str) -> LedgerResult<Poll> {
        debug!(poll_id = id, "fetching poll");
        self.repo.get_by_id(id).await
    }

    pub async fn get_open_polls(&self) -> LedgerResult<Vec<Poll>> {
        self.repo.get_open_polls().await
    }

    /// Administrative removal; bets on the poll are left untouched.
    pub async fn delete_poll(&self, id: &str) -> LedgerResult<()> {
        self.repo.delete(id).await?;
        info!(poll_id = id, "poll deleted");
        Ok(())
    }
}
