//! Row materialization.

mod materializer;

pub use materializer::{materialize, materialize_plain, plan_for, RowPlan, NAV_SEPARATOR};
