//! Wire-level bind/dispatch shells (§4.5). Every handler here owns only
//! resource lifetime and request decoding; all actual state mutation
//! happens through the one [`crate::facade::Facade`] entry the request
//! maps to.
//!
//! Austin Shafer - 2020

pub mod compositor;
pub mod data_device;
pub mod keyboard;
pub mod output;
pub mod pointer;
pub mod region;
pub mod screenshooter;
pub mod seat;
pub mod shell;
pub mod shm;
pub mod subcompositor;
pub mod surface;
pub mod xdg_shell;

use wayland_server::DisplayHandle;

use crate::ids::ClientId;

/// Advertise every global this frontend implements except `wl_output`,
/// which is created/destroyed dynamically as the coordinator reports
/// outputs appearing and disappearing (§4.1/§6).
pub fn register_globals(dh: &DisplayHandle) {
    compositor::register(dh);
    subcompositor::register(dh);
    shell::register(dh);
    xdg_shell::register(dh);
    seat::register(dh);
    data_device::register(dh);
    screenshooter::register(dh);
    shm::register(dh);
}

pub(crate) fn client_id_of(client: &wayland_server::Client) -> ClientId {
    ClientId::from_backend(client.id())
}
