//! # slab_core - Slab Dispatch Measurement Engine
//!
//! `slab_core` is the computational heart of SlabTally, tracking measured
//! stone slabs from the gantry to the truck. All inputs and outputs are
//! JSON-serializable, so any front end (CLI, GUI, service) can drive it.
//!
//! ## Design Philosophy
//!
//! - **Total computation**: measurement functions never fail; malformed
//!   numeric input coerces to zero instead of breaking the entry flow
//! - **JSON-First**: all types implement Serialize/Deserialize
//! - **Rich Errors**: structured error types at the edges, not just strings
//! - **Explicit state**: the working batch is a passable session value,
//!   not hidden UI state
//!
//! ## Quick Start
//!
//! ```rust
//! use slab_core::dispatch::NumberDirection;
//! use slab_core::session::{DispatchMeta, DispatchSession, SlabDraft};
//! use slab_core::units::MeasurementUnit;
//!
//! let meta = DispatchMeta::new("Sharma Marbles", "Steel Grey Granite", "LOT-88");
//! let mut session = DispatchSession::new(meta, MeasurementUnit::Inches, NumberDirection::Ascending);
//!
//! // 120" x 60" slab: 10 ft x 5 ft = 50 sq ft
//! session.add_slab(SlabDraft::new(1, 120.0, 60.0, 0.75)).unwrap();
//!
//! let dispatch = session.finalize().unwrap();
//! assert_eq!(dispatch.slabs[0].net_area.value(), 50.0);
//! ```
//!
//! ## Modules
//!
//! - [`units`] - Measurement units and feet/square-feet conversions
//! - [`deductions`] - Corner deduction entries and their areas
//! - [`measure`] - Slab records and the area computation engine
//! - [`session`] - The in-progress dispatch working batch
//! - [`dispatch`] - Grouping, slab numbering, dispatch identifiers
//! - [`reports`] - Typed breakdowns (party, material, supervisor, day)
//! - [`ledger`] - Persistent record container and queries
//! - [`store`] - File operations with atomic saves and locking
//! - [`pdf`] - Dispatch note and register rendering via Typst
//! - [`errors`] - Structured error types

pub mod deductions;
pub mod dispatch;
pub mod errors;
pub mod ledger;
pub mod measure;
pub mod pdf;
pub mod reports;
pub mod session;
pub mod store;
pub mod units;

// Re-export commonly used types at crate root for convenience
pub use dispatch::{group_by_dispatch, DispatchBatch};
pub use errors::{DispatchError, DispatchResult};
pub use ledger::{DispatchLedger, RecordFilter};
pub use measure::{compute_slab_areas, SlabMeasurement};
pub use session::{DispatchMeta, DispatchSession, SlabDraft};
pub use store::{load_ledger, save_ledger, FileLock};
pub use units::{convert_to_feet, MeasurementUnit};
