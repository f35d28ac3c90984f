// Pipeline processing: vendor dispatch and per-field validation

pub mod normalize;

pub use normalize::{PlanReport, ValidationPlan, Vendor, VendorRegistry};
