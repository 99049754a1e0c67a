//! Reconciliation engine that converges a NetBox instance to declared state.
//!
//! - **[`Controller`]** runs a full pass: foundation objects, network
//!   objects, device types, then devices and cables. It returns a
//!   [`SyncReport`] instead of stopping at the first bad object.
//!
//! - **[`SiteCache`]** resolves slugs and names to ids. Site-scoped
//!   resources (VLANs, racks, VLAN groups) live under `Scope::Site(id)` so
//!   identical names at different sites never collide.
//!
//! - **[`Applier`]** is the idempotent create-or-update primitive. It sends
//!   only the fields that differ and stamps every write with the ownership
//!   tag.
//!
//! - **[`CableReconciler`]** converges physical links: it finds existing
//!   cables in either orientation, removes stray cables on a port, and
//!   creates at most one cable per unordered endpoint pair.
//!
//! - **[`DeviceReconciler`]** applies devices and their components, then
//!   resolves every queued link once all peers exist.

pub mod apply;
pub mod cable;
pub mod cache;
pub mod color;
pub mod config;
pub mod controller;
pub mod devices;
pub mod diff;
pub mod error;
pub mod loader;
pub mod model;
pub mod reconcile;
pub mod report;
pub mod tags;

// ── Primary re-exports ──────────────────────────────────────────────
pub use apply::{Action, Applied, Applier, ApplyStats};
pub use cable::{CableEndpoint, CableOutcome, CableReconciler, CableAttributes, TerminationKind};
pub use cache::{Resource, Scope, SiteCache};
pub use color::Color;
pub use config::{DEFAULT_PATCH_PANEL_ROLE, SyncConfig, TlsVerification};
pub use controller::Controller;
pub use devices::{DeviceReconciler, plan_link};
pub use error::CoreError;
pub use loader::load_definitions;
pub use model::Definitions;
pub use report::{CableStats, Failure, SkippedLink, SyncReport};
pub use tags::{MANAGED_TAG_SLUG, ensure_managed_tag};
