//! Recipient Selection
//!
//! Read-only queries over the contact store: who is eligible for a
//! broadcast, the engagement-tier breakdown, and a humanized delivery-time
//! estimate derived from the engine's pacing.
//!
//! Eligibility is "has sent at least one message and has a phone number".
//! Higher-volume contacts come first so an interrupted run has already
//! reached the most engaged audience.

use sqlx::{Row, SqlitePool};
use std::time::Duration;

/// Engagement classification from the contact store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
pub enum EngagementTier {
    High,
    Medium,
    Low,
}

impl EngagementTier {
    fn from_level(level: &str) -> Self {
        match level {
            "high" => EngagementTier::High,
            "medium" => EngagementTier::Medium,
            _ => EngagementTier::Low,
        }
    }
}

/// Immutable recipient snapshot taken at selection time.
///
/// The live contact store may change afterwards without affecting an
/// in-flight broadcast.
#[derive(Debug, Clone)]
pub struct Recipient {
    pub phone: String,
    pub tier: EngagementTier,
    pub total_messages: i64,
}

/// Per-tier eligible counts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
pub struct TierBreakdown {
    pub high_engagement: i64,
    pub medium_engagement: i64,
    pub low_engagement: i64,
}

/// What the operator sees before committing to a broadcast.
#[derive(Debug, Clone, serde::Serialize)]
pub struct BroadcastPreview {
    pub total_eligible_contacts: i64,
    pub criteria: String,
    pub breakdown: TierBreakdown,
    pub estimated_delivery_time: String,
}

const ELIGIBILITY: &str = "total_messages > 0 AND phone IS NOT NULL AND TRIM(phone) != ''";

/// Read-only selector over the contact store.
#[derive(Clone)]
pub struct RecipientSelector {
    pool: SqlitePool,
    pacing: Duration,
}

impl RecipientSelector {
    /// `pacing` must be the dispatch engine's pacing interval so the ETA
    /// estimate matches what a run will actually take.
    pub fn new(pool: SqlitePool, pacing: Duration) -> Self {
        Self { pool, pacing }
    }

    /// Snapshot of eligible recipients, highest message volume first.
    ///
    /// The sort is stable: equal-volume contacts keep store order. A store
    /// failure is transient; retry the whole selection, never a partial one.
    pub async fn select(&self) -> Result<Vec<Recipient>, sqlx::Error> {
        let rows = sqlx::query(&format!(
            "SELECT phone, engagement_level, total_messages FROM contacts WHERE {}",
            ELIGIBILITY
        ))
        .fetch_all(&self.pool)
        .await?;

        let mut recipients = Vec::with_capacity(rows.len());
        for row in &rows {
            let level: Option<String> = row.try_get("engagement_level")?;
            recipients.push(Recipient {
                phone: row.try_get("phone")?,
                tier: EngagementTier::from_level(level.as_deref().unwrap_or("")),
                total_messages: row.try_get("total_messages")?,
            });
        }

        recipients.sort_by(|a, b| b.total_messages.cmp(&a.total_messages));
        Ok(recipients)
    }

    /// Eligible-recipient counts, tier breakdown and delivery-time estimate.
    pub async fn preview(&self) -> Result<BroadcastPreview, sqlx::Error> {
        let row = sqlx::query(&format!(
            "SELECT COUNT(*) AS total_contacts, \
                    COUNT(CASE WHEN engagement_level = 'high' THEN 1 END) AS high_engagement, \
                    COUNT(CASE WHEN engagement_level = 'medium' THEN 1 END) AS medium_engagement, \
                    COUNT(CASE WHEN engagement_level = 'low' THEN 1 END) AS low_engagement \
             FROM contacts WHERE {}",
            ELIGIBILITY
        ))
        .fetch_one(&self.pool)
        .await?;

        let total: i64 = row.try_get("total_contacts")?;
        Ok(BroadcastPreview {
            total_eligible_contacts: total,
            criteria: "Contatos que enviaram pelo menos 1 mensagem".to_string(),
            breakdown: TierBreakdown {
                high_engagement: row.try_get("high_engagement")?,
                medium_engagement: row.try_get("medium_engagement")?,
                low_engagement: row.try_get("low_engagement")?,
            },
            estimated_delivery_time: estimate_duration(total.max(0) as usize, self.pacing),
        })
    }
}

/// Humanize how long `count` paced sends will take.
pub fn estimate_duration(count: usize, pacing: Duration) -> String {
    if count == 0 {
        return "0 minutos".to_string();
    }

    let total_seconds = count as u64 * pacing.as_secs();
    let minutes = total_seconds.div_ceil(60);

    if minutes < 60 {
        return format!("{} minutos", minutes);
    }

    let hours = minutes / 60;
    let remaining_minutes = minutes % 60;
    format!("{}h {}min", hours, remaining_minutes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::broadcast::DEFAULT_PACING;
    use proptest::prelude::*;
    use sqlx::sqlite::SqlitePoolOptions;

    async fn pool_with_contacts(rows: &[(&str, &str, i64)]) -> SqlitePool {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .unwrap();
        sqlx::query(
            "CREATE TABLE contacts ( \
                 id INTEGER PRIMARY KEY AUTOINCREMENT, \
                 phone TEXT, \
                 name TEXT, \
                 engagement_level TEXT, \
                 total_messages INTEGER NOT NULL DEFAULT 0 \
             )",
        )
        .execute(&pool)
        .await
        .unwrap();
        for &(phone, level, total) in rows {
            sqlx::query(
                "INSERT INTO contacts (phone, engagement_level, total_messages) VALUES (?1, ?2, ?3)",
            )
            .bind(phone)
            .bind(level)
            .bind(total)
            .execute(&pool)
            .await
            .unwrap();
        }
        pool
    }

    fn selector(pool: SqlitePool) -> RecipientSelector {
        RecipientSelector::new(pool, DEFAULT_PACING)
    }

    #[tokio::test]
    async fn test_select_orders_by_volume_descending() {
        let pool = pool_with_contacts(&[
            ("5511000000001", "low", 3),
            ("5511000000002", "high", 40),
            ("5511000000003", "medium", 12),
        ])
        .await;

        let recipients = selector(pool).select().await.unwrap();
        let volumes: Vec<i64> = recipients.iter().map(|r| r.total_messages).collect();
        assert_eq!(volumes, vec![40, 12, 3]);
    }

    #[tokio::test]
    async fn test_select_ties_keep_store_order() {
        let pool = pool_with_contacts(&[
            ("5511000000001", "low", 5),
            ("5511000000002", "low", 5),
            ("5511000000003", "low", 5),
        ])
        .await;

        let recipients = selector(pool).select().await.unwrap();
        let phones: Vec<&str> = recipients.iter().map(|r| r.phone.as_str()).collect();
        assert_eq!(
            phones,
            vec!["5511000000001", "5511000000002", "5511000000003"]
        );
    }

    #[tokio::test]
    async fn test_select_filters_silent_and_blank_contacts() {
        let pool = pool_with_contacts(&[
            ("5511000000001", "high", 10),
            ("5511000000002", "low", 0),
            ("", "medium", 7),
            ("   ", "medium", 7),
        ])
        .await;

        let recipients = selector(pool).select().await.unwrap();
        assert_eq!(recipients.len(), 1);
        assert_eq!(recipients[0].phone, "5511000000001");
        assert_eq!(recipients[0].tier, EngagementTier::High);
    }

    #[tokio::test]
    async fn test_preview_breaks_down_tiers() {
        let pool = pool_with_contacts(&[
            ("5511000000001", "high", 10),
            ("5511000000002", "high", 8),
            ("5511000000003", "medium", 4),
            ("5511000000004", "low", 1),
            ("5511000000005", "low", 0), // not eligible
        ])
        .await;

        let preview = selector(pool).preview().await.unwrap();
        assert_eq!(preview.total_eligible_contacts, 4);
        assert_eq!(preview.breakdown.high_engagement, 2);
        assert_eq!(preview.breakdown.medium_engagement, 1);
        assert_eq!(preview.breakdown.low_engagement, 1);
        assert_eq!(preview.criteria, "Contatos que enviaram pelo menos 1 mensagem");
        assert_eq!(preview.estimated_delivery_time, "1 minutos");
    }

    #[tokio::test]
    async fn test_preview_of_empty_store() {
        let pool = pool_with_contacts(&[]).await;

        let preview = selector(pool).preview().await.unwrap();
        assert_eq!(preview.total_eligible_contacts, 0);
        assert_eq!(preview.estimated_delivery_time, "0 minutos");
    }

    #[test]
    fn test_estimate_duration_examples() {
        assert_eq!(estimate_duration(0, DEFAULT_PACING), "0 minutos");
        // 100 contacts at one message per 2 seconds: 200s, rounded up to 4min.
        assert_eq!(estimate_duration(100, DEFAULT_PACING), "4 minutos");
        assert_eq!(estimate_duration(1, DEFAULT_PACING), "1 minutos");
        // 2000 contacts: 4000s = 66.7min, rounded up to 67.
        assert_eq!(estimate_duration(2000, DEFAULT_PACING), "1h 7min");
        assert_eq!(estimate_duration(1800, DEFAULT_PACING), "1h 0min");
    }

    proptest! {
        /// The estimate always charges one pacing interval per recipient,
        /// rounded up to whole minutes.
        #[test]
        fn estimate_matches_ceiling_of_paced_time(count in 1usize..100_000) {
            let estimate = estimate_duration(count, DEFAULT_PACING);
            let minutes = (count as u64 * 2).div_ceil(60);
            let expected = if minutes < 60 {
                format!("{} minutos", minutes)
            } else {
                format!("{}h {}min", minutes / 60, minutes % 60)
            };
            prop_assert_eq!(estimate, expected);
        }
    }
}
