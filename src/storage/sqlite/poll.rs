use super::is_unique_violation;
use crate::domain::poll::require_decisive;
use crate::domain::{
    Conflict, Entity, LedgerError, LedgerResult, Poll, PollOutcome, PollStatus, OPTION_COUNT,
};
use crate::storage::PollRepository;
use async_trait::async_trait;
use sqlx::sqlite::{SqlitePool, SqliteRow};
use sqlx::{Row, Sqlite, Transaction};

#[derive(Clone)]
pub struct SqlitePollRepository {
    pool: SqlitePool,
}

impl SqlitePollRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    async fn write_options(
        tx: &mut Transaction<'_, Sqlite>,
        poll: &Poll,
        context: &'static str,
    ) -> LedgerResult<()> {
        for (index, text) in poll.options().iter().enumerate() {
            sqlx::query(
                "INSERT INTO poll_options (poll_id, option_index, option_text) VALUES (?, ?, ?)
                 ON CONFLICT (poll_id, option_index) DO UPDATE SET option_text = excluded.option_text",
            )
            .bind(poll.id())
            .bind(index as i64)
            .bind(text)
            .execute(&mut **tx)
            .await
            .map_err(|e| LedgerError::storage(context, e))?;
        }
        Ok(())
    }

    /// Attaches options to poll rows. Rows missing an option are corrupt.
    async fn hydrate(&self, rows: Vec<SqliteRow>) -> LedgerResult<Vec<Poll>> {
        let mut polls = Vec::with_capacity(rows.len());
        for row in rows {
            let id: String = row
                .try_get("id")
                .map_err(|e| LedgerError::storage("reading poll", e))?;
            let title: String = row
                .try_get("title")
                .map_err(|e| LedgerError::storage("reading poll", e))?;
            let status_code: i64 = row
                .try_get("status")
                .map_err(|e| LedgerError::storage("reading poll", e))?;
            let outcome_code: i64 = row
                .try_get("outcome")
                .map_err(|e| LedgerError::storage("reading poll", e))?;

            let status = PollStatus::from_code(status_code).ok_or_else(|| {
                LedgerError::storage(
                    "decoding poll status",
                    sqlx::Error::Decode(format!("unknown poll status {}", status_code).into()),
                )
            })?;
            let outcome = PollOutcome::from_code(outcome_code).ok_or_else(|| {
                LedgerError::storage(
                    "decoding poll outcome",
                    sqlx::Error::Decode(format!("unknown poll outcome {}", outcome_code).into()),
                )
            })?;

            let texts: Vec<String> = sqlx::query_scalar(
                "SELECT option_text FROM poll_options WHERE poll_id = ? ORDER BY option_index",
            )
            .bind(&id)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| LedgerError::storage("reading poll options", e))?;
            let options: [String; OPTION_COUNT] = texts.try_into().map_err(|texts: Vec<String>| {
                LedgerError::storage(
                    "reading poll options",
                    sqlx::Error::Decode(
                        format!("poll {} has {} options stored", id, texts.len()).into(),
                    ),
                )
            })?;

            polls.push(Poll::from_parts(id, title, options, status, outcome));
        }
        Ok(polls)
    }
}

#[async_trait]
impl PollRepository for SqlitePollRepository {
    async fn save(&self, poll: &Poll) -> LedgerResult<()> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| LedgerError::storage("saving poll", e))?;

        sqlx::query("INSERT INTO polls (id, title, outcome, status) VALUES (?, ?, ?, ?)")
            .bind(poll.id())
            .bind(poll.title())
            .bind(poll.outcome().code())
            .bind(poll.status().code())
            .execute(&mut *tx)
            .await
            .map_err(|e| {
                if is_unique_violation(&e) {
                    LedgerError::Conflict(Conflict::PollExists)
                } else {
                    LedgerError::storage("saving poll", e)
                }
            })?;
        Self::write_options(&mut tx, poll, "saving poll options").await?;

        tx.commit()
            .await
            .map_err(|e| LedgerError::storage("committing poll", e))
    }

    async fn update(&self, poll: &Poll) -> LedgerResult<()> {
        let result = sqlx::query("UPDATE polls SET title = ?, outcome = ?, status = ? WHERE id = ?")
            .bind(poll.title())
            .bind(poll.outcome().code())
            .bind(poll.status().code())
            .bind(poll.id())
            .execute(&self.pool)
            .await
            .map_err(|e| LedgerError::storage("updating poll", e))?;
        if result.rows_affected() == 0 {
            return Err(LedgerError::NotFound(Entity::Poll));
        }
        Ok(())
    }

    async fn close(&self, id: &str) -> LedgerResult<Poll> {
        loop {
            let result = sqlx::query("UPDATE polls SET status = ? WHERE id = ? AND status = ?")
                .bind(PollStatus::Closed.code())
                .bind(id)
                .bind(PollStatus::Open.code())
                .execute(&self.pool)
                .await
                .map_err(|e| LedgerError::storage("closing poll", e))?;
            if result.rows_affected() == 1 {
                return self.get_by_id(id).await;
            }
            // Lost the race or never open: the stored row says which.
            let current = self.get_by_id(id).await?;
            current.close()?;
        }
    }

    async fn decide(&self, id: &str, outcome: PollOutcome) -> LedgerResult<Poll> {
        require_decisive(outcome)?;
        loop {
            let result = sqlx::query(
                "UPDATE polls SET outcome = ? WHERE id = ? AND status = ? AND outcome = ?",
            )
            .bind(outcome.code())
            .bind(id)
            .bind(PollStatus::Closed.code())
            .bind(PollOutcome::Pending.code())
            .execute(&self.pool)
            .await
            .map_err(|e| LedgerError::storage("deciding poll outcome", e))?;
            if result.rows_affected() == 1 {
                return self.get_by_id(id).await;
            }
            let current = self.get_by_id(id).await?;
            let wanted = current.decide(outcome)?;
            if wanted == current {
                return Ok(current);
            }
            // Closed between the update and the re-read; try the update again.
        }
    }

    async fn delete(&self, id: &str) -> LedgerResult<()> {
        // poll_options rows go with it through ON DELETE CASCADE.
        let result = sqlx::query("DELETE FROM polls WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(|e| LedgerError::storage("deleting poll", e))?;
        if result.rows_affected() == 0 {
            return Err(LedgerError::NotFound(Entity::Poll));
        }
        Ok(())
    }

    async fn get_by_id(&self, id: &str) -> LedgerResult<Poll> {
        let rows = sqlx::query("SELECT id, title, outcome, status FROM polls WHERE id = ?")
            .bind(id)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| LedgerError::storage("fetching poll", e))?;
        self.hydrate(rows)
            .await?
            .pop()
            .ok_or(LedgerError::NotFound(Entity::Poll))
    }

    async fn get_open_polls(&self) -> LedgerResult<Vec<Poll>> {
        let rows = sqlx::query("SELECT id, title, outcome, status FROM polls WHERE status = ?")
            .bind(PollStatus::Open.code())
            .fetch_all(&self.pool)
            .await
            .map_err(|e| LedgerError::storage("fetching open polls", e))?;
        self.hydrate(rows).await
    }
}
