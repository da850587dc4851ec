use super::config::{load_or_create, open_pool, resolve_config_path};
use arauto::broadcast::RecipientSelector;

/// Show how many contacts would receive a broadcast right now
///
/// Reads the contact store configured in the operator database and prints
/// the eligible count, the engagement-tier breakdown and the estimated
/// delivery time at the configured pacing.
pub async fn execute(config: Option<String>) -> Result<(), Box<dyn std::error::Error>> {
    let config_path = resolve_config_path(config);
    let config = load_or_create(&config_path)?;

    let pool = open_pool(&config.database.path).await?;
    let selector = RecipientSelector::new(pool, config.broadcast.pacing());
    let preview = selector.preview().await?;

    println!("📣 Broadcast preview");
    println!();
    println!("   Eligible contacts: {}", preview.total_eligible_contacts);
    println!("   Criteria: {}", preview.criteria);
    println!();
    println!("   High engagement:   {}", preview.breakdown.high_engagement);
    println!("   Medium engagement: {}", preview.breakdown.medium_engagement);
    println!("   Low engagement:    {}", preview.breakdown.low_engagement);
    println!();
    println!(
        "   Estimated delivery time: {}",
        preview.estimated_delivery_time
    );

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_preview_execute_with_empty_store() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("config.toml");
        let db_path = temp_dir.path().join("arauto.db");

        std::fs::write(
            &config_path,
            format!(
                "[whatsapp]\nstore_path = \"{}\"\n\n[database]\npath = \"{}\"\n",
                temp_dir.path().join("wa-session").display(),
                db_path.display()
            ),
        )
        .unwrap();

        // The contacts table is owned by the surrounding system; create it
        // the way an ingestion job would.
        let pool = open_pool(&db_path).await.unwrap();
        sqlx::query(
            "CREATE TABLE contacts ( \
                 id INTEGER PRIMARY KEY AUTOINCREMENT, \
                 phone TEXT, \
                 engagement_level TEXT, \
                 total_messages INTEGER NOT NULL DEFAULT 0 \
             )",
        )
        .execute(&pool)
        .await
        .unwrap();
        drop(pool);

        let result = execute(Some(config_path.to_string_lossy().to_string())).await;
        assert!(result.is_ok());
    }
}
