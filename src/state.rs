//! The single per-display context threaded through every protocol
//! handler (§9 "Global singleton for the context" design note: this
//! crate carries the context explicitly instead of through a
//! process-wide global).
//!
//! Austin Shafer - 2020

use std::sync::{Arc, Mutex};

use crate::cache::Cache;
use crate::coordinator::Coordinator;
use crate::facade::Facade;
use crate::gateway::Gateway;
use crate::ids::SerialCounter;

/// Bound to every `wl_display` via `wayland_server::Dispatch`'s state
/// type parameter. Protocol handlers reach the [`Facade`] and
/// [`Gateway`] through here; `facade` and `gateway` are disjoint
/// fields, so a handler that needs both (e.g. a late keyboard bind
/// that may need to emit an immediate `enter`) calls
/// `state.facade.method(..., &mut state.gateway)` and relies on the
/// borrow checker treating the two fields independently.
pub struct Wayfront {
    pub cache: Arc<Cache>,
    pub coordinator: Arc<Mutex<dyn Coordinator>>,
    pub serials: Arc<SerialCounter>,
    pub facade: Facade,
    pub gateway: Gateway,
}

impl Wayfront {
    pub fn new(
        cache: Arc<Cache>,
        coordinator: Arc<Mutex<dyn Coordinator>>,
        serials: Arc<SerialCounter>,
        gateway: Gateway,
    ) -> Self {
        let facade = Facade::new(cache.clone(), coordinator.clone(), serials.clone());
        Wayfront {
            cache,
            coordinator,
            serials,
            facade,
            gateway,
        }
    }
}
