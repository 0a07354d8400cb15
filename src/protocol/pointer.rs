//! `wl_pointer` (§4.5/§10.6): motion, button and axis events, plus the
//! `set_cursor` request that assigns the cursor surface role.
//!
//! Austin Shafer - 2020

use wayland_server::protocol::wl_pointer::{Error, Request, WlPointer};
use wayland_server::{Client, DataInit, Dispatch, DisplayHandle, New, Resource};

use crate::geometry::Position;
use crate::ids::{ClientId, SurfaceId};
use crate::state::Wayfront;

impl Dispatch<WlPointer, ()> for Wayfront {
    fn request(
        state: &mut Self,
        _client: &Client,
        resource: &WlPointer,
        request: Request,
        _data: &(),
        _dhandle: &DisplayHandle,
        _data_init: &mut DataInit<'_, Self>,
    ) {
        match request {
            Request::SetCursor { serial, surface, hotspot_x, hotspot_y } => {
                let sid = surface.map(|s| {
                    *s.data::<SurfaceId>().expect("wl_surface carries a SurfaceId")
                });
                let ok = state
                    .facade
                    .set_cursor(serial, Position::new(hotspot_x, hotspot_y), sid);
                if !ok {
                    resource.post_error(Error::Role as u32, "surface already has a non-cursor role".to_string());
                }
            }
            Request::Release => {}
            _ => unreachable!(),
        }
    }

    fn destroyed(state: &mut Self, _client: wayland_server::backend::ClientId, object: wayland_server::backend::ObjectId, _data: &()) {
        state.facade.remove_pointer_resource(object);
    }
}

/// Bind a new pointer resource for `wl_seat.get_pointer` (§4.3, which
/// may emit an immediate `enter` if the owning client is already
/// pointer-focused).
pub(crate) fn bind(
    data_init: &mut DataInit<'_, Wayfront>,
    resource: New<WlPointer>,
    state: &Wayfront,
    owner: ClientId,
) {
    let pointer = data_init.init(resource, ());
    state.facade.add_pointer_resource(pointer, owner, &state.gateway);
}
