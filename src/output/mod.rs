//! Output module for operator-facing reports
//!
//! This module handles:
//! - The `--status` report (watermark, row counts, last run)
//! - The `--check` connectivity report

pub mod check;
pub mod status;

pub use check::{
    check_content_api, check_storage, check_vector_index, print_check_report, run_checks,
    CheckReport, CheckResult,
};
pub use status::{load_status, print_status, SyncStatus};
