//! Actor-based monitoring runtime
//!
//! Each long-lived component runs as an independent async task communicating
//! via Tokio channels.
//!
//! ```text
//!            ┌────────────────┐
//!            │  climon (main) │
//!            └───────┬────────┘
//!                    │ spawns
//!         ┌──────────┴───────────┐
//!         │                      │
//! ┌───────▼────────┐    ┌───────▼────────┐
//! │  MonitorActor  │    │  StorageActor  │
//! │ (one cycle per │    │ (batch writes, │
//! │  schedule slot)│    │  read queries) │
//! └───────┬────────┘    └───────▲────────┘
//!         │   ObservationEvent  │
//!         └──────broadcast──────┘
//! ```
//!
//! The monitor drives the cycle (fetch → alert → sample → report) and
//! publishes observations; the storage actor subscribes and persists them.
//! The API layer holds handles to both and never touches actor internals.

pub mod messages;
pub mod monitor;
pub mod storage;
