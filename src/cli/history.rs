use super::config::{load_or_create, open_pool, resolve_config_path};
use arauto::broadcast::BroadcastAudit;

/// List recent broadcast runs from the audit log, newest first
pub async fn execute(limit: u32, config: Option<String>) -> Result<(), Box<dyn std::error::Error>> {
    let config_path = resolve_config_path(config);
    let config = load_or_create(&config_path)?;

    let pool = open_pool(&config.database.path).await?;
    let audit = BroadcastAudit::new(pool);
    audit.ensure_schema().await?;

    let records = audit.recent(limit).await?;

    if records.is_empty() {
        println!("🗂  No broadcasts recorded yet.");
        return Ok(());
    }

    println!("🗂  Broadcast history ({} most recent runs)", records.len());
    for record in &records {
        let preview: String = record.message.chars().take(60).collect();
        let ellipsis = if record.message.chars().count() > 60 {
            "..."
        } else {
            ""
        };

        println!();
        println!(
            "   #{} — {} sent, {} failed of {}",
            record.id, record.successful_sends, record.failed_sends, record.total_recipients
        );
        println!(
            "      started_at={} completed_at={}",
            record.started_at, record.completed_at
        );
        println!("      \"{}{}\"", preview, ellipsis);
        for failure in &record.failures {
            println!("      ⚠️  {}: {}", failure.phone, failure.reason);
        }
    }

    Ok(())
}
