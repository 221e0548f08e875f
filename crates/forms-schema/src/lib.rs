//! OpenSASE Forms Schema
//!
//! Declarative model of a form builder definition and its structural
//! validator.
//!
//! ## Layout
//! - **draft**: lenient mirror of the builder JSON, every property optional
//! - **model**: validated form tree with a closed `FieldKind` union
//! - **validator**: JSON → `Form`, or every violation found
//!
//! ```text
//! Form ─► Page* ─► Section* ─► Field*
//!                                 ├─ kind (select / matrix / calculated / lookup / ...)
//!                                 ├─ validation rules
//!                                 ├─ conditional visibility
//!                                 └─ prefill config
//! ```

#![warn(clippy::all)]

pub mod draft;
pub mod error;
pub mod model;
pub mod validator;

pub use draft::{FieldDraft, FormDraft, PageDraft, SectionDraft};
pub use error::*;
pub use model::*;
pub use validator::{validate_draft, validate_form_structure, ValidationOutcome};

use serde_json::Value;
use std::collections::HashMap;

/// Submitted or in-progress field values keyed by field ID
pub type FieldValues = HashMap<String, Value>;
