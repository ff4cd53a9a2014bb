use crate::domain::{Bet, BetKey, Conflict, Entity, LedgerError, LedgerResult, UserStats, WinLoss};
use crate::storage::BetRepository;
use async_trait::async_trait;
use std::collections::{BTreeMap, HashMap};
use tokio::sync::Mutex;

#[derive(Default)]
pub struct InMemoryBetRepository {
    bets: Mutex<HashMap<BetKey, Bet>>,
}

impl InMemoryBetRepository {
    pub fn new() -> Self {
        Self::default()
    }

    async fn select(&self, keep: impl Fn(&BetKey) -> bool) -> Vec<Bet> {
        self.bets
            .lock()
            .await
            .iter()
            .filter(|(key, _)| keep(key))
            .map(|(_, bet)| bet.clone())
            .collect()
    }
}

#[async_trait]
impl BetRepository for InMemoryBetRepository {
    async fn save(&self, bet: &Bet) -> LedgerResult<()> {
        // Check and insert under the same guard.
        let mut bets = self.bets.lock().await;
        if bets.contains_key(bet.key()) {
            return Err(LedgerError::Conflict(Conflict::UserAlreadyBet));
        }
        bets.insert(bet.key().clone(), bet.clone());
        Ok(())
    }

    async fn get_by_key(&self, key: &BetKey) -> LedgerResult<Bet> {
        self.bets
            .lock()
            .await
            .get(key)
            .cloned()
            .ok_or(LedgerError::NotFound(Entity::Bet))
    }

    async fn get_bets_from_user(&self, user_id: &str) -> LedgerResult<Vec<Bet>> {
        Ok(self.select(|key| key.user_id == user_id).await)
    }

    async fn get_bets_by_poll(&self, poll_id: &str) -> LedgerResult<Vec<Bet>> {
        Ok(self.select(|key| key.poll_id == poll_id).await)
    }

    async fn update_bet(&self, bet: &Bet) -> LedgerResult<()> {
        let mut bets = self.bets.lock().await;
        match bets.get_mut(bet.key()) {
            Some(stored) => {
                *stored = bet.clone();
                Ok(())
            }
            None => Err(LedgerError::NotFound(Entity::Bet)),
        }
    }

    async fn get_all_user_stats(&self) -> LedgerResult<Vec<UserStats>> {
        let bets = self.bets.lock().await;
        let mut by_user: BTreeMap<&str, Vec<&Bet>> = BTreeMap::new();
        for bet in bets.values() {
            by_user.entry(bet.user_id()).or_default().push(bet);
        }
        Ok(by_user
            .into_iter()
            .map(|(user_id, user_bets)| {
                let tally = WinLoss::tally(user_bets);
                UserStats::new(user_id.to_string(), tally.wins, tally.losses)
            })
            .collect())
    }
}
