use super::is_unique_violation;
use crate::domain::{Bet, BetKey, BetStatus, Conflict, Entity, LedgerError, LedgerResult, UserStats};
use crate::storage::BetRepository;
use async_trait::async_trait;
use sqlx::sqlite::{SqlitePool, SqliteRow};
use sqlx::Row;

const BET_COLUMNS: &str = "poll_id, user_id, selected_option_index, bet_status";

#[derive(Clone)]
pub struct SqliteBetRepository {
    pool: SqlitePool,
}

impl SqliteBetRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    fn decode(row: &SqliteRow) -> Result<Bet, sqlx::Error> {
        let poll_id: String = row.try_get("poll_id")?;
        let user_id: String = row.try_get("user_id")?;
        let selected: i64 = row.try_get("selected_option_index")?;
        let status_code: i64 = row.try_get("bet_status")?;

        let selected = usize::try_from(selected)
            .map_err(|_| sqlx::Error::Decode(format!("negative option index {}", selected).into()))?;
        let status = BetStatus::from_code(status_code)
            .ok_or_else(|| sqlx::Error::Decode(format!("unknown bet status {}", status_code).into()))?;
        Ok(Bet::from_parts(BetKey::new(poll_id, user_id), selected, status))
    }

    async fn fetch_where(
        &self,
        column: &'static str,
        value: &str,
        context: &'static str,
    ) -> LedgerResult<Vec<Bet>> {
        let sql = format!("SELECT {} FROM bets WHERE {} = ?", BET_COLUMNS, column);
        let rows = sqlx::query(&sql)
            .bind(value)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| LedgerError::storage(context, e))?;
        rows.iter()
            .map(|row| Self::decode(row).map_err(|e| LedgerError::storage(context, e)))
            .collect()
    }
}

#[async_trait]
impl BetRepository for SqliteBetRepository {
    async fn save(&self, bet: &Bet) -> LedgerResult<()> {
        // The primary key on (poll_id, user_id) makes this a single atomic check-and-insert.
        sqlx::query(
            "INSERT INTO bets (poll_id, user_id, selected_option_index, bet_status) VALUES (?, ?, ?, ?)",
        )
        .bind(bet.poll_id())
        .bind(bet.user_id())
        .bind(bet.selected_option_index() as i64)
        .bind(bet.status().code())
        .execute(&self.pool)
        .await
        .map_err(|e| {
            if is_unique_violation(&e) {
                LedgerError::Conflict(Conflict::UserAlreadyBet)
            } else {
                LedgerError::storage("saving bet", e)
            }
        })?;
        Ok(())
    }

    async fn get_by_key(&self, key: &BetKey) -> LedgerResult<Bet> {
        let sql = format!(
            "SELECT {} FROM bets WHERE poll_id = ? AND user_id = ?",
            BET_COLUMNS
        );
        let row = sqlx::query(&sql)
            .bind(&key.poll_id)
            .bind(&key.user_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| LedgerError::storage("fetching bet", e))?
            .ok_or(LedgerError::NotFound(Entity::Bet))?;
        Self::decode(&row).map_err(|e| LedgerError::storage("fetching bet", e))
    }

    async fn get_bets_from_user(&self, user_id: &str) -> LedgerResult<Vec<Bet>> {
        self.fetch_where("user_id", user_id, "fetching bets from user")
            .await
    }

    async fn get_bets_by_poll(&self, poll_id: &str) -> LedgerResult<Vec<Bet>> {
        self.fetch_where("poll_id", poll_id, "fetching bets by poll")
            .await
    }

    async fn update_bet(&self, bet: &Bet) -> LedgerResult<()> {
        let result = sqlx::query(
            "UPDATE bets SET selected_option_index = ?, bet_status = ? WHERE poll_id = ? AND user_id = ?",
        )
        .bind(bet.selected_option_index() as i64)
        .bind(bet.status().code())
        .bind(bet.poll_id())
        .bind(bet.user_id())
        .execute(&self.pool)
        .await
        .map_err(|e| LedgerError::storage("updating bet", e))?;
        if result.rows_affected() == 0 {
            return Err(LedgerError::NotFound(Entity::Bet));
        }
        Ok(())
    }

    async fn get_all_user_stats(&self) -> LedgerResult<Vec<UserStats>> {
        let rows = sqlx::query(
            "SELECT
                user_id,
                SUM(CASE WHEN bet_status = ? THEN 1 ELSE 0 END) AS wins,
                SUM(CASE WHEN bet_status = ? THEN 1 ELSE 0 END) AS losses
             FROM bets
             GROUP BY user_id
             ORDER BY user_id",
        )
        .bind(BetStatus::Won.code())
        .bind(BetStatus::Lost.code())
        .fetch_all(&self.pool)
        .await
        .map_err(|e| LedgerError::storage("aggregating user stats", e))?;

        let mut stats = Vec::with_capacity(rows.len());
        for row in rows {
            let user_id: String = row
                .try_get("user_id")
                .map_err(|e| LedgerError::storage("aggregating user stats", e))?;
            let wins: i64 = row
                .try_get("wins")
                .map_err(|e| LedgerError::storage("aggregating user stats", e))?;
            let losses: i64 = row
                .try_get("losses")
                .map_err(|e| LedgerError::storage("aggregating user stats", e))?;
            stats.push(UserStats::new(user_id, wins.max(0) as u64, losses.max(0) as u64));
        }
        Ok(stats)
    }
}
