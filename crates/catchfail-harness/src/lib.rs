//! Test-suite plumbing over `catchfail-kernel`.
//!
//! - [`settings`]: capture profiles read from TOML.
//! - [`report`]: serialisable view of the captured failure, for snapshots.
//! - [`check`]: assertions made after the call, against the register.

pub mod check;
pub mod report;
pub mod settings;

pub use check::expect_captured;
pub use report::CapturedReport;
pub use settings::{CaptureSettings, HarnessSettings, ProfileSettings, SettingsError};
