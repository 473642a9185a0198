//! `stratplan export` command: render a plan file as a workbook, text
//! document, CSV or JSON.

use std::io::Write;
use std::path::Path;

use anyhow::{Context, Result};

use stratplan_core::assemble::export::{export_to_path, export_to_vec};
use stratplan_core::assemble::{ExportFormat, assemble};

/// Run the export command. Without `output` the rendering goes to stdout.
pub fn run_export(file: &Path, format: ExportFormat, output: Option<&Path>) -> Result<()> {
    let plan = crate::input::load_plan(file)?;
    let table = assemble(&plan);
    let today = chrono::Local::now().date_naive();

    match output {
        Some(path) => {
            let rows = export_to_path(&table, format, path, today)
                .with_context(|| format!("cannot export to {}", path.display()))?;
            println!("Exported {rows} rows to {}", path.display());
        }
        None => {
            let bytes = export_to_vec(&table, format, today)?;
            let mut stdout = std::io::stdout().lock();
            stdout.write_all(&bytes)?;
            stdout.flush()?;
        }
    }
    Ok(())
}
