//! CLI `export` command — print an export to stdout.

use anyhow::{Context, Result};

use crate::config::{HippocampusConfig, Passphrase};
use crate::db;
use crate::memory::export::{self, ExportFormat};

pub fn export(
    config: &HippocampusConfig,
    format: &str,
    entity: Option<&str>,
    entity_type: Option<&str>,
) -> Result<()> {
    let format: ExportFormat = format.parse().context("invalid export format")?;

    let passphrase = Passphrase::from_env()?;
    let conn = db::open_database(config.resolved_db_path(), &passphrase)?;

    let output = export::export(&conn, format, entity, entity_type)
        .context("export failed")?;

    match format {
        ExportFormat::Json => println!("{}", serde_json::to_string_pretty(&output.data)?),
        _ => println!("{}", output.data.as_str().unwrap_or_default()),
    }

    eprintln!(
        "Exported {} entities and {} observations.",
        output.entity_count, output.observation_count
    );
    Ok(())
}
