use serde_json::{json, Value};
use std::sync::Arc;

use crate::cli::OutputFormat;
use crate::config::config;
use crate::database::{DatabaseManager, PgStore};

/// Output a success message in the appropriate format
pub fn output_success(output_format: &OutputFormat, message: &str, data: Option<Value>) -> anyhow::Result<()> {
    match output_format {
        OutputFormat::Json => {
            let mut response = json!({
                "success": true,
                "message": message
            });
            if let (Some(Value::Object(extra)), Some(object)) = (data, response.as_object_mut()) {
                object.extend(extra);
            }
            println!("{}", serde_json::to_string_pretty(&response)?);
        }
        OutputFormat::Text => {
            println!("✓ {}", message);
        }
    }
    Ok(())
}

/// Print `label: value` lines in text mode; JSON mode prints nothing extra.
pub fn output_fields(output_format: &OutputFormat, fields: &[(&str, String)]) {
    if let OutputFormat::Text = output_format {
        let width = fields.iter().map(|(label, _)| label.len()).max().unwrap_or(0);
        for (label, value) in fields {
            println!("  {:<width$}  {}", label, value, width = width);
        }
    }
}

/// Store over the configured database, for commands that touch data.
pub async fn connect_store() -> anyhow::Result<Arc<PgStore>> {
    let pool = DatabaseManager::connect(&config().database).await?;
    Ok(Arc::new(PgStore::new(pool)))
}
