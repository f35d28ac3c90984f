// Export pre-processing: read, dispatch on vendor, validate, write

pub mod processing;
pub mod table;

use std::path::Path;

use serde::Serialize;
use tracing::{info, instrument, warn};

use crate::error::Result;
use processing::{PlanReport, Vendor, VendorRegistry};
use table::Table;

/// Result of a complete pre-processing run over one export
#[derive(Debug, Clone, Serialize)]
pub struct PreprocessResult {
    pub vendor: Vendor,
    pub plan: &'static str,
    pub rows: usize,
    pub report: PlanReport,
}

pub struct Pipeline {
    registry: VendorRegistry,
}

impl Pipeline {
    pub fn new() -> Self {
        Self::with_registry(VendorRegistry::new())
    }

    pub fn with_registry(registry: VendorRegistry) -> Self {
        Self { registry }
    }

    pub fn registry(&self) -> &VendorRegistry {
        &self.registry
    }

    /// Detect the vendor and apply its plan to the table in place.
    pub fn preprocess_table(&self, table: &mut Table) -> Result<PreprocessResult> {
        let vendor = Vendor::detect(table)?;
        if !vendor.is_known() {
            warn!(marker = %vendor, "Unrecognised SOFTVEND marker, passing file through unchanged");
        }

        let plan = self.registry.plan_for(&vendor);
        if plan.is_passthrough() {
            info!(vendor = %vendor, "No processing needed");
        }
        let report = plan.apply(table);

        info!(
            vendor = %vendor,
            plan = plan.name(),
            rows = table.row_count(),
            applied = ?report.applied,
            "✅ Validated export"
        );

        Ok(PreprocessResult {
            vendor,
            plan: plan.name(),
            rows: table.row_count(),
            report,
        })
    }

    /// Decode and process a raw Latin-1 upload, returning the cleaned CSV.
    pub fn preprocess_bytes(&self, bytes: &[u8]) -> Result<(Vec<u8>, PreprocessResult)> {
        let mut table = Table::from_latin1_bytes(bytes)?;
        let result = self.preprocess_table(&mut table)?;
        Ok((table.to_csv_bytes()?, result))
    }

    /// Process the CSV at `input` and write the cleaned copy to `output`.
    #[instrument(skip(self))]
    pub fn preprocess_file(&self, input: &Path, output: &Path) -> Result<PreprocessResult> {
        let mut table = Table::read_path(input)?;
        info!(columns = ?table.headers(), "Read uploaded file");

        let result = self.preprocess_table(&mut table)?;
        table.write_path(output)?;
        info!("💾 Processed file saved as {}", output.display());

        Ok(result)
    }
}

impl Default for Pipeline {
    fn default() -> Self {
        Self::new()
    }
}
