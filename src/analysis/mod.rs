pub mod pipeline;
pub mod attribution;
pub mod evidence;
pub mod scoring;
pub mod activity;

pub use pipeline::ProfileAnalyzer;
pub use attribution::{is_name_similar, CommitAttribution};
pub use scoring::{aggregate_profiles, apply_weight, merge_weighted};
