//! SQLite implementation of the ArmRepository.

use async_trait::async_trait;
use chrono::Utc;
use sqlx::{Executor, Sqlite, SqlitePool};

use super::{format_datetime, parse_datetime};
use crate::domain::errors::{DomainError, DomainResult};
use crate::domain::models::{ArmKey, ArmStats, SelectionDecision};
use crate::domain::ports::ArmRepository;

const ARM_COLUMNS: &str = "arm_key, alpha, beta, successes, attempts, meta, created_at, last_updated";

/// Single-statement upsert. `?2` is 1 for a success and 0 for a failure.
const INCREMENT_SQL: &str = r#"INSERT INTO arms (arm_key, alpha, beta, successes, attempts, meta, created_at, last_updated)
VALUES (?1, 1.0 + ?2, 2.0 - ?2, ?2, 1, ?3, ?4, ?4)
ON CONFLICT(arm_key) DO UPDATE SET
    attempts = attempts + 1,
    successes = successes + excluded.successes,
    alpha = alpha + excluded.successes,
    beta = beta + (1 - excluded.successes),
    last_updated = excluded.last_updated
RETURNING arm_key, alpha, beta, successes, attempts, meta, created_at, last_updated"#;

#[derive(Clone)]
pub struct SqliteArmRepository {
    pool: SqlitePool,
}

impl SqliteArmRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    async fn apply_increment<'e, E>(executor: E, key: &ArmKey, success: bool) -> DomainResult<ArmStats>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        let meta_json = serde_json::to_string(&key.meta())?;
        let row: ArmRow = sqlx::query_as(INCREMENT_SQL)
            .bind(key.as_str())
            .bind(i64::from(success))
            .bind(meta_json)
            .bind(format_datetime(&Utc::now()))
            .fetch_one(executor)
            .await?;
        row.try_into()
    }
}

#[async_trait]
impl ArmRepository for SqliteArmRepository {
    async fn get(&self, arm_key: &str) -> DomainResult<Option<ArmStats>> {
        let row: Option<ArmRow> = sqlx::query_as(&format!("SELECT {ARM_COLUMNS} FROM arms WHERE arm_key = ?"))
            .bind(arm_key)
            .fetch_optional(&self.pool)
            .await?;

        row.map(TryInto::try_into).transpose()
    }

    async fn get_or_create(&self, key: &ArmKey) -> DomainResult<ArmStats> {
        let now = format_datetime(&Utc::now());
        sqlx::query(
            r#"INSERT INTO arms (arm_key, alpha, beta, successes, attempts, meta, created_at, last_updated)
               VALUES (?, 1.0, 1.0, 0, 0, ?, ?, ?)
               ON CONFLICT(arm_key) DO NOTHING"#,
        )
        .bind(key.as_str())
        .bind(serde_json::to_string(&key.meta())?)
        .bind(&now)
        .bind(&now)
        .execute(&self.pool)
        .await?;

        self.get(key.as_str())
            .await?
            .ok_or_else(|| DomainError::ArmNotFound(key.to_string()))
    }

    async fn increment(&self, key: &ArmKey, success: bool) -> DomainResult<ArmStats> {
        Self::apply_increment(&self.pool, key, success).await
    }

    async fn increment_once(&self, key: &ArmKey, success: bool, idempotency_key: &str) -> DomainResult<bool> {
        let mut tx = self.pool.begin().await?;

        let claimed = sqlx::query(
            r#"INSERT INTO arm_updates (idempotency_key, arm_key, success, applied_at)
               VALUES (?, ?, ?, ?)
               ON CONFLICT(idempotency_key) DO NOTHING"#,
        )
        .bind(idempotency_key)
        .bind(key.as_str())
        .bind(i64::from(success))
        .bind(format_datetime(&Utc::now()))
        .execute(&mut *tx)
        .await?
        .rows_affected();

        if claimed == 0 {
            tx.rollback().await?;
            return Ok(false);
        }

        Self::apply_increment(&mut *tx, key, success).await?;
        tx.commit().await?;
        Ok(true)
    }

    async fn reset(&self, arm_key: &str) -> DomainResult<()> {
        let result = sqlx::query(
            "UPDATE arms SET alpha = 1.0, beta = 1.0, successes = 0, attempts = 0, last_updated = ? WHERE arm_key = ?",
        )
        .bind(format_datetime(&Utc::now()))
        .bind(arm_key)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DomainError::ArmNotFound(arm_key.to_string()));
        }
        Ok(())
    }

    async fn list(&self) -> DomainResult<Vec<ArmStats>> {
        let rows: Vec<ArmRow> = sqlx::query_as(&format!(
            "SELECT {ARM_COLUMNS} FROM arms ORDER BY alpha / (alpha + beta) DESC, arm_key"
        ))
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(TryInto::try_into).collect()
    }

    async fn record_selection(&self, decision: &SelectionDecision) -> DomainResult<()> {
        sqlx::query(
            r#"INSERT INTO arm_selections (id, candidates, chosen_arm, sample, fallback, selected_at)
               VALUES (?, ?, ?, ?, ?, ?)"#,
        )
        .bind(decision.id.to_string())
        .bind(serde_json::to_string(&decision.candidates)?)
        .bind(&decision.chosen_arm)
        .bind(decision.sample)
        .bind(decision.fallback)
        .bind(format_datetime(&decision.selected_at))
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}

#[derive(sqlx::FromRow)]
struct ArmRow {
    arm_key: String,
    alpha: f64,
    beta: f64,
    successes: i64,
    attempts: i64,
    meta: String,
    created_at: String,
    last_updated: String,
}

impl TryFrom<ArmRow> for ArmStats {
    type Error = DomainError;

    fn try_from(row: ArmRow) -> Result<Self, Self::Error> {
        Ok(ArmStats {
            arm_key: row.arm_key,
            alpha: row.alpha,
            beta: row.beta,
            successes: u64::try_from(row.successes).unwrap_or(0),
            attempts: u64::try_from(row.attempts).unwrap_or(0),
            meta: serde_json::from_str(&row.meta)?,
            created_at: parse_datetime(&row.created_at)?,
            last_updated: parse_datetime(&row.last_updated)?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::sqlite::create_migrated_test_pool;

    async fn setup_test_repo() -> SqliteArmRepository {
        let pool = create_migrated_test_pool().await.unwrap();
        SqliteArmRepository::new(pool)
    }

    fn key(s: &str) -> ArmKey {
        ArmKey::parse(s).unwrap()
    }

    #[tokio::test]
    async fn test_get_or_create_uses_prior() {
        let repo = setup_test_repo().await;
        let arm = repo.get_or_create(&key("generator=gpt|tone=dry")).await.unwrap();

        assert_eq!(arm.alpha, 1.0);
        assert_eq!(arm.beta, 1.0);
        assert_eq!(arm.attempts, 0);
        assert_eq!(arm.meta["tone"], "dry");

        // Second call returns the existing row untouched.
        repo.increment(&key("generator=gpt|tone=dry"), true).await.unwrap();
        let again = repo.get_or_create(&key("generator=gpt|tone=dry")).await.unwrap();
        assert_eq!(again.successes, 1);
    }

    #[tokio::test]
    async fn test_increment_creates_missing_row() {
        let repo = setup_test_repo().await;
        let arm = repo.increment(&key("generator=gpt"), false).await.unwrap();

        assert_eq!(arm.attempts, 1);
        assert_eq!(arm.successes, 0);
        assert_eq!(arm.alpha, 1.0);
        assert_eq!(arm.beta, 2.0);
    }

    #[tokio::test]
    async fn test_increment_keeps_prior_invariant() {
        let repo = setup_test_repo().await;
        let k = key("generator=gpt|format=thread");
        for success in [true, false, true, true, false] {
            repo.increment(&k, success).await.unwrap();
        }

        let arm = repo.get(k.as_str()).await.unwrap().unwrap();
        assert_eq!(arm.attempts, 5);
        assert_eq!(arm.successes, 3);
        assert_eq!(arm.alpha, 1.0 + arm.successes as f64);
        assert_eq!(arm.beta, 1.0 + (arm.attempts - arm.successes) as f64);
    }

    #[tokio::test]
    async fn test_increment_once_is_idempotent() {
        let repo = setup_test_repo().await;
        let k = key("generator=gpt");

        assert!(repo.increment_once(&k, true, "post-1").await.unwrap());
        assert!(!repo.increment_once(&k, true, "post-1").await.unwrap());
        assert!(repo.increment_once(&k, false, "post-2").await.unwrap());

        let arm = repo.get(k.as_str()).await.unwrap().unwrap();
        assert_eq!(arm.attempts, 2);
        assert_eq!(arm.successes, 1);
    }

    #[tokio::test]
    async fn test_reset_restores_prior() {
        let repo = setup_test_repo().await;
        let k = key("generator=gpt");
        repo.increment(&k, true).await.unwrap();
        repo.reset(k.as_str()).await.unwrap();

        let arm = repo.get(k.as_str()).await.unwrap().unwrap();
        assert_eq!((arm.alpha, arm.beta, arm.attempts, arm.successes), (1.0, 1.0, 0, 0));

        let err = repo.reset("generator=missing").await.unwrap_err();
        assert!(matches!(err, DomainError::ArmNotFound(_)));
    }

    #[tokio::test]
    async fn test_list_orders_by_posterior_mean() {
        let repo = setup_test_repo().await;
        repo.increment(&key("generator=weak"), false).await.unwrap();
        repo.increment(&key("generator=strong"), true).await.unwrap();
        repo.get_or_create(&key("generator=fresh")).await.unwrap();

        let arms = repo.list().await.unwrap();
        let keys: Vec<&str> = arms.iter().map(|a| a.arm_key.as_str()).collect();
        assert_eq!(keys, vec!["generator=strong", "generator=fresh", "generator=weak"]);
    }

    #[tokio::test]
    async fn test_record_selection() {
        let repo = setup_test_repo().await;
        let decision = SelectionDecision::new(
            vec!["generator=a".into(), "generator=b".into()],
            "generator=b".into(),
            Some(0.71),
            false,
        );
        repo.record_selection(&decision).await.unwrap();

        let (chosen, candidates): (String, String) =
            sqlx::query_as("SELECT chosen_arm, candidates FROM arm_selections WHERE id = ?")
                .bind(decision.id.to_string())
                .fetch_one(&repo.pool)
                .await
                .unwrap();
        assert_eq!(chosen, "generator=b");
        assert_eq!(candidates, r#"["generator=a","generator=b"]"#);
    }
}
