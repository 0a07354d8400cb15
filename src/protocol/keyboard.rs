//! `wl_keyboard` (§4.5/§4.6): key events and the keymap handoff.
//!
//! Austin Shafer - 2020

use wayland_server::protocol::wl_keyboard::{KeymapFormat, Request, WlKeyboard};
use wayland_server::{Client, DataInit, Dispatch, DisplayHandle, New};

use crate::ids::ClientId;
use crate::state::Wayfront;

impl Dispatch<WlKeyboard, ()> for Wayfront {
    fn request(
        _state: &mut Self,
        _client: &Client,
        _resource: &WlKeyboard,
        request: Request,
        _data: &(),
        _dhandle: &DisplayHandle,
        _data_init: &mut DataInit<'_, Self>,
    ) {
        match request {
            Request::Release => {}
            _ => unreachable!(),
        }
    }

    fn destroyed(state: &mut Self, _client: wayland_server::backend::ClientId, object: wayland_server::backend::ObjectId, _data: &()) {
        state.facade.remove_keyboard_resource(object);
    }
}

/// Bind a new keyboard resource for `wl_seat.get_keyboard`: hand it the
/// compositor's keymap immediately, then register it (§4.3/§4.6, which
/// may emit an immediate `enter` if the owning client is already
/// keyboard-focused).
pub(crate) fn bind(
    data_init: &mut DataInit<'_, Wayfront>,
    resource: New<WlKeyboard>,
    state: &Wayfront,
    owner: ClientId,
) {
    let keyboard = data_init.init(resource, ());

    let keymap = state.coordinator.lock().unwrap().keymap();
    keyboard.keymap(KeymapFormat::XkbV1, keymap.fd, keymap.size);
    // The event above has already written the fd into the wire message;
    // our copy is no longer needed (mirrors Facade::receive_data_offer).
    unsafe {
        libc::close(keymap.fd);
    }

    state.facade.add_keyboard_resource(keyboard, owner, &state.gateway);
}
