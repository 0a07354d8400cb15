//! Wayland protocol frontend for a tiling surface compositor.
//!
//! This crate terminates client connections, mediates every Wayland
//! protocol request and event, and keeps the bookkeeping that ties
//! wire-level resources to the compositor's own surfaces and regions.
//! It does not draw anything: the [`coordinator`] module describes the
//! small, explicit interface this crate expects its caller (the
//! compositor's surface/render core) to implement.
//!
//! The four pieces described in the module docs below are, in data-flow
//! order: [`cache`] (shared bookkeeping), [`facade`] (client requests
//! flow in through here), [`gateway`] (compositor events flow out
//! through here), and `protocol::*` (the thin per-interface bind/
//! dispatch/unbind shells that call into the facade).

#[macro_use]
pub mod logging;

pub mod cache;
pub mod config;
pub mod coordinator;
pub mod engine;
pub mod facade;
pub mod gateway;
pub mod geometry;
pub mod ids;
pub mod keyboard_state;
pub mod protocol;
pub mod state;
pub mod transfer;

pub use config::EngineConfig;
pub use coordinator::{Coordinator, CoordinatorEvents};
pub use engine::Engine;
pub use ids::{ClientId, RegionId, SurfaceId};
