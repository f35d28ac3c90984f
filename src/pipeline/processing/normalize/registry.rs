use std::collections::HashMap;
use std::fmt;

use serde::Serialize;

use super::ValidationPlan;
use crate::error::{PreprocessError, Result};
use crate::pipeline::table::Table;

/// Column whose first value names the software that produced the export
pub const MARKER_COLUMN: &str = "SOFTVEND";

/// Property-management packages recognised by their `SOFTVEND` marker
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub enum Vendor {
    Rockend,
    PropertyIq,
    MaxSoft,
    StrataSphere,
    StrataPlus,
    /// Any other marker, kept uppercased as it appeared in the file
    Unknown(String),
}

impl Vendor {
    pub const KNOWN: [Vendor; 5] = [
        Vendor::Rockend,
        Vendor::PropertyIq,
        Vendor::MaxSoft,
        Vendor::StrataSphere,
        Vendor::StrataPlus,
    ];

    pub fn from_marker(marker: &str) -> Self {
        let marker = marker.trim().to_uppercase();
        match marker.as_str() {
            "ROCKEND" => Vendor::Rockend,
            "PROPERTYIQ" => Vendor::PropertyIq,
            "MAXSOFT" => Vendor::MaxSoft,
            "STRATASPHERE" => Vendor::StrataSphere,
            "STRATA PLUS" => Vendor::StrataPlus,
            _ => Vendor::Unknown(marker),
        }
    }

    pub fn marker(&self) -> &str {
        match self {
            Vendor::Rockend => "ROCKEND",
            Vendor::PropertyIq => "PROPERTYIQ",
            Vendor::MaxSoft => "MAXSOFT",
            Vendor::StrataSphere => "STRATASPHERE",
            Vendor::StrataPlus => "STRATA PLUS",
            Vendor::Unknown(marker) => marker,
        }
    }

    pub fn is_known(&self) -> bool {
        !matches!(self, Vendor::Unknown(_))
    }

    /// Read the vendor from the first row of the marker column.
    pub fn detect(table: &Table) -> Result<Self> {
        let (index, actual_name) = table.find_column(MARKER_COLUMN)?;

        let marker = table
            .cell(0, index)
            .and_then(|v| v.as_str())
            .map(str::trim)
            .filter(|m| !m.is_empty())
            .ok_or_else(|| PreprocessError::MissingMarkerValue(actual_name.to_string()))?;

        Ok(Self::from_marker(marker))
    }
}

impl fmt::Display for Vendor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.marker())
    }
}

/// Maps each vendor to the validation plan its exports need
pub struct VendorRegistry {
    plans: HashMap<Vendor, ValidationPlan>,
    fallback: ValidationPlan,
}

impl VendorRegistry {
    /// Create a registry with the built-in vendor plans
    pub fn new() -> Self {
        let mut plans = HashMap::new();

        plans.insert(Vendor::Rockend, ValidationPlan::narrow());
        plans.insert(Vendor::PropertyIq, ValidationPlan::narrow());
        plans.insert(Vendor::MaxSoft, ValidationPlan::broad());
        // Strata exports are already clean
        plans.insert(Vendor::StrataSphere, ValidationPlan::passthrough());
        plans.insert(Vendor::StrataPlus, ValidationPlan::passthrough());

        Self {
            plans,
            fallback: ValidationPlan::passthrough(),
        }
    }

    /// Register or replace the plan for a vendor
    pub fn register(&mut self, vendor: Vendor, plan: ValidationPlan) {
        self.plans.insert(vendor, plan);
    }

    /// Plan for a vendor; unregistered vendors pass through unchanged.
    pub fn plan_for(&self, vendor: &Vendor) -> &ValidationPlan {
        self.plans.get(vendor).unwrap_or(&self.fallback)
    }

    pub fn is_registered(&self, vendor: &Vendor) -> bool {
        self.plans.contains_key(vendor)
    }

    pub fn list_vendors(&self) -> Vec<&Vendor> {
        self.plans.keys().collect()
    }
}

impl Default for VendorRegistry {
    fn default() -> Self {
        Self::new()
    }
}
