use serde::Serialize;
use tracing::debug;

use crate::pipeline::table::Table;

pub mod registry;
pub mod validators;

pub use registry::{Vendor, VendorRegistry};
pub use validators::{
    validate_email, validate_phone, validate_postcode, validate_state, Validator,
};

pub const STATE_FIELD: &str = "State";
pub const POSTCODE_FIELD: &str = "PCode";
pub const PHONE_FIELD: &str = "Phone";
pub const MOBILE_FIELD: &str = "Mobile";
pub const FAX_FIELD: &str = "Fax";
pub const EMAIL_FIELD: &str = "Email";

/// A single logical column and the validator applied to each of its cells
#[derive(Clone, Copy)]
pub struct FieldRule {
    pub field: &'static str,
    pub validator: Validator,
}

impl std::fmt::Debug for FieldRule {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FieldRule").field("field", &self.field).finish()
    }
}

/// Ordered set of field rules applied to a table for one vendor
#[derive(Debug, Clone)]
pub struct ValidationPlan {
    name: &'static str,
    rules: Vec<FieldRule>,
}

/// Outcome of applying a plan to a table
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct PlanReport {
    /// Columns that were rewritten, by their real names in the file
    pub applied: Vec<String>,
    /// Logical fields the file did not contain
    pub skipped: Vec<String>,
}

impl ValidationPlan {
    pub fn new(name: &'static str, rules: Vec<FieldRule>) -> Self {
        Self { name, rules }
    }

    /// State, postcode and every contact field
    pub fn broad() -> Self {
        Self::new(
            "broad",
            vec![
                rule(STATE_FIELD, validate_state),
                rule(POSTCODE_FIELD, validate_postcode),
                rule(PHONE_FIELD, validate_phone),
                rule(MOBILE_FIELD, validate_phone),
                rule(FAX_FIELD, validate_phone),
                rule(EMAIL_FIELD, validate_email),
            ],
        )
    }

    /// State and postcode only
    pub fn narrow() -> Self {
        Self::new(
            "narrow",
            vec![
                rule(STATE_FIELD, validate_state),
                rule(POSTCODE_FIELD, validate_postcode),
            ],
        )
    }

    pub fn passthrough() -> Self {
        Self::new("passthrough", Vec::new())
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn rules(&self) -> &[FieldRule] {
        &self.rules
    }

    pub fn is_passthrough(&self) -> bool {
        self.rules.is_empty()
    }

    pub fn fields(&self) -> Vec<&'static str> {
        self.rules.iter().map(|r| r.field).collect()
    }

    /// Rewrite every planned column present in the table. Missing columns are
    /// skipped; rows are never added, removed or reordered.
    pub fn apply(&self, table: &mut Table) -> PlanReport {
        let mut report = PlanReport::default();

        for FieldRule { field, validator } in &self.rules {
            let (index, actual_name) = match table.find_column(field) {
                Ok((index, name)) => (index, name.to_string()),
                Err(_) => {
                    debug!(field = %field, "Column not found, skipping validation");
                    report.skipped.push(field.to_string());
                    continue;
                }
            };

            table.map_column(index, *validator);
            debug!(field = %field, column = %actual_name, rows = table.row_count(), "Validated column");
            report.applied.push(actual_name);
        }

        report
    }
}

fn rule(field: &'static str, validator: Validator) -> FieldRule {
    FieldRule { field, validator }
}
