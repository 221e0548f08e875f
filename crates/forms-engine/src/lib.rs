//! OpenSASE Forms Engine
//!
//! Static analysis and runtime rule evaluation over form definitions.
//!
//! ## Layout
//! - **diagnostics**: schema + cycle + render checks folded into one report
//! - **graph**: field dependency graph, cycle groups, evaluation order
//! - **render**: per-field simulated render checks
//! - **visibility**: conditional visibility over submitted values
//! - **calculated**: calculated fields in dependency order
//! - **submission**: validation rules applied to submitted values
//! - **carryforward**: copy values between fields
//!
//! ```text
//!               ┌──────────────┐
//!  JSON form ──►│ diagnostics  │──► DiagnosticsReport
//!               └──────┬───────┘
//!                      │ validator · graph · render
//!               ┌──────▼───────┐
//!  Form+values ►│ visibility   │──► calculated ──► submission ──► FieldError*
//!               └──────────────┘
//! ```

#![warn(clippy::all)]

pub mod calculated;
pub mod carryforward;
pub mod diagnostics;
pub mod error;
pub mod graph;
pub mod render;
pub mod submission;
pub mod visibility;

pub use calculated::{compute_calculated_values, Calculation};
pub use carryforward::{apply_carryforward, CarryforwardMode, CarryforwardRule};
pub use diagnostics::{
    run_form_diagnostics, DiagnosticEntry, DiagnosticStatus, DiagnosticType, DiagnosticsReport,
    Severity,
};
pub use error::{EngineError, Result};
pub use graph::{CycleGroup, DependencyGraph};
pub use render::render_field;
pub use submission::{validate_field, validate_submission, FieldError};
pub use visibility::{condition_holds, is_field_visible};
