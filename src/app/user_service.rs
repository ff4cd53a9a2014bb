//! Identity management and the statistics derived from a user's bets.

use crate::app::bet_service::BetService;
use crate::domain::{Entity, Identity, LedgerError, LedgerResult, Profile, User, UserStats, WinLoss};
use crate::storage::UserRepository;
use serde::Serialize;
use std::cmp::Ordering;
use std::sync::Arc;
use tracing::{info, warn};
use uuid::Uuid;

#[derive(Clone)]
pub struct UserService {
    repo: Arc<dyn UserRepository>,
    bets: BetService,
}

/// One row of the leaderboard.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LeaderboardEntry {
    /// `None` when the user has since been deleted.
    pub display_name: Option<String>,
    pub stats: UserStats,
}

impl UserService {
    pub fn new(repo: Arc<dyn UserRepository>, bets: BetService) -> Self {
        Self { repo, bets }
    }

    /// Creates a user bound to `identity`. Fails `Conflict` if it is taken.
    pub async fn create_user(&self, identity: &Identity) -> LedgerResult<User> {
        self.create_user_with_profile(identity, Profile::default())
            .await
    }

    pub async fn create_user_with_profile(
        &self,
        identity: &Identity,
        profile: Profile,
    ) -> LedgerResult<User> {
        let user_id = Uuid::new_v4().to_string();
        if let Err(err) = self.repo.save(&user_id, &profile, identity).await {
            if err.is_conflict() {
                warn!(provider = %identity.provider, "identity already claimed");
            }
            return Err(err);
        }
        info!(user_id = %user_id, provider = %identity.provider, "user created");
        Ok(User::new(user_id, profile, vec![identity.clone()]))
    }

    pub async fn add_identity(&self, user_id: &str, identity: &Identity) -> LedgerResult<()> {
        self.repo.add_identity(user_id, identity).await?;
        info!(user_id, provider = %identity.provider, "identity added");
        Ok(())
    }

    pub async fn get_user(&self, user_id: &str) -> LedgerResult<User> {
        self.repo.get_by_id(user_id).await
    }

    pub async fn get_user_by_external_id(&self, identity: &Identity) -> LedgerResult<User> {
        self.repo.get_by_external_id(identity).await
    }

    /// Resolves the user through `identity`, then removes it with all identities.
    pub async fn delete_user(&self, identity: &Identity) -> LedgerResult<()> {
        let user = self.repo.get_by_external_id(identity).await?;
        self.repo.delete(user.id()).await?;
        info!(user_id = user.id(), "user deleted");
        Ok(())
    }

    pub async fn count_users(&self) -> LedgerResult<u64> {
        self.repo.count().await
    }

    /// Counts Won and Lost bets; pending bets are ignored.
    pub async fn get_win_loss(&self, user_id: &str) -> LedgerResult<WinLoss> {
        let bets = self.bets.get_bets_from_user(user_id).await?;
        Ok(WinLoss::tally(&bets))
    }

    /// All bettors, most wins first, then fewest losses, then user id.
    pub async fn leaderboard(&self) -> LedgerResult<Vec<LeaderboardEntry>> {
        let mut stats = self.bets.get_all_user_stats().await?;
        stats.sort_by(|a, b| match b.wins.cmp(&a.wins) {
            Ordering::Equal => a
                .losses
                .cmp(&b.losses)
                .then_with(|| a.user_id.cmp(&b.user_id)),
            other => other,
        });

        let mut entries = Vec::with_capacity(stats.len());
        for stats in stats {
            let display_name = match self.repo.get_by_id(&stats.user_id).await {
                Ok(user) => Some(user.display_name().to_string()),
                Err(LedgerError::NotFound(Entity::User)) => None,
                Err(err) => return Err(err),
            };
            entries.push(LeaderboardEntry {
                display_name,
                stats,
            });
        }
        Ok(entries)
    }
}
