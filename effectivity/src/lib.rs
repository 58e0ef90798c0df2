//! Temporal effective-value resolution for lease and service contracts
//!
//! A contract's terms change over its life through amendments and renewals,
//! each carrying a sparse overlay of field overrides with its own validity
//! window. This crate answers "what was field X worth on date D, and which
//! document said so" by walking the approved documents backward in time and
//! falling through to the contract baseline.
//!
//! # Key Components
//!
//! - [`resolve_field`] / [`resolve_field_as_of`]: per-field chain resolution,
//!   non-strict ("who last touched it") and strict ("in force on the date")
//! - [`effective_view`]: the full as-of snapshot of economic terms, with
//!   modification flags and layered index adjustments
//! - [`build_policy_requirements`]: effective insurance requirements per
//!   policy type, with sub-limit breakdowns
//! - [`evaluate_policy`]: two-tier coverage compliance against a requirement
//! - [`validate_no_overlap`]: amendment validity-window conflict detection
//! - [`plan_renewal`]: computes the extension a renewal applies
//!
//! # Example
//!
//! ```ignore
//! use effectivity::{effective_view, EffectiveView};
//!
//! let view = effective_view(&contract, &documents, as_of_date);
//! if let EffectiveView::InForce(terms) = view {
//!     println!("canon on {as_of_date}: {:?}", terms.canon.value);
//! }
//! ```

pub mod compliance;
pub mod dates;
pub mod fields;
pub mod overlap;
pub mod renewal;
pub mod requirements;
pub mod resolve;
pub mod types;
pub mod view;

// Re-export main types
pub use compliance::{evaluate_policy, needs_renewal_for, Compliance, ComplianceFailure};
pub use fields::{FieldKey, FieldOverlay, FieldValue, Overlay, PolicyOverlay};
pub use overlap::{validate_no_overlap, OverlapConflict};
pub use renewal::{plan_renewal, RenewalError, RenewalOptions};
pub use requirements::{build_policy_requirements, PolicyRequirement};
pub use resolve::{
    current_document, current_end_date, resolve_field, resolve_field_as_of, Resolution,
};
pub use types::*;
pub use view::{
    effective_view, AppliedIndexation, EffectiveTerms, EffectiveView, OutOfForceReason,
    ResolvedField,
};
