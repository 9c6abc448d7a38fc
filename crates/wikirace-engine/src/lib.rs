//! Race-session engine for Wikirace.
//!
//! Each room runs as an isolated Tokio task (actor model) that owns the
//! room state; a shared [`RoomRegistry`] creates, finds, restores, and
//! garbage-collects rooms. Article resolution happens in the pipeline
//! layer outside the actors, with preconditions re-validated at apply
//! time.
//!
//! # Key types
//!
//! - [`RoomRegistry`] — creates/destroys rooms, routes joins, idle GC
//! - [`RoomHandle`] — send operations to a running room actor
//! - [`GameError`] — the recoverable gameplay error taxonomy
//! - [`scoring`] — the pure scoring calculator

mod clock;
mod error;
mod pipeline;
mod registry;
mod room;
pub mod scoring;

pub use clock::{elapsed_secs, now_millis};
pub use error::{GameError, RoundSlot};
pub use registry::{JoinRequest, RoomRegistry, spawn_idle_sweeper};
pub use room::{PlayerSender, RoomHandle, RoomInfo};
