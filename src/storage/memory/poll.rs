use crate::domain::{Conflict, Entity, LedgerError, LedgerResult, Poll, PollOutcome};
use crate::storage::PollRepository;
use async_trait::async_trait;
use std::collections::HashMap;
use tokio::sync::RwLock;

#[derive(Default)]
pub struct InMemoryPollRepository {
    polls: RwLock<HashMap<String, Poll>>,
}

impl InMemoryPollRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl PollRepository for InMemoryPollRepository {
    async fn save(&self, poll: &Poll) -> LedgerResult<()> {
        let mut polls = self.polls.write().await;
        if polls.contains_key(poll.id()) {
            return Err(LedgerError::Conflict(Conflict::PollExists));
        }
        polls.insert(poll.id().to_string(), poll.clone());
        Ok(())
    }

    async fn update(&self, poll: &Poll) -> LedgerResult<()> {
        let mut polls = self.polls.write().await;
        match polls.get_mut(poll.id()) {
            Some(stored) => {
                // Options are fixed at creation.
                *stored = Poll::from_parts(
                    poll.id().to_string(),
                    poll.title().to_string(),
                    stored.options().clone(),
                    poll.status(),
                    poll.outcome(),
                );
                Ok(())
            }
            None => Err(LedgerError::NotFound(Entity::Poll)),
        }
    }

    async fn close(&self, id: &str) -> LedgerResult<Poll> {
        let mut polls = self.polls.write().await;
        let stored = polls.get_mut(id).ok_or(LedgerError::NotFound(Entity::Poll))?;
        *stored = stored.close()?;
        Ok(stored.clone())
    }

    async fn decide(&self, id: &str, outcome: PollOutcome) -> LedgerResult<Poll> {
        let mut polls = self.polls.write().await;
        let stored = polls.get_mut(id).ok_or(LedgerError::NotFound(Entity::Poll))?;
        *stored = stored.decide(outcome)?;
        Ok(stored.clone())
    }

    async fn delete(&self, id: &str) -> LedgerResult<()> {
        self.polls
            .write()
            .await
            .remove(id)
            .map(|_| ())
            .ok_or(LedgerError::NotFound(Entity::Poll))
    }

    async fn get_by_id(&self, id: &str) -> LedgerResult<Poll> {
        self.polls
            .read()
            .await
            .get(id)
            .cloned()
            .ok_or(LedgerError::NotFound(Entity::Poll))
    }

    async fn get_open_polls(&self) -> LedgerResult<Vec<Poll>> {
        Ok(self
            .polls
            .read()
            .await
            .values()
            .filter(|poll| poll.is_open())
            .cloned()
            .collect())
    }
}
