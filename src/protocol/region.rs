//! `wl_region` (§4.5): a client-side handle onto one of the cache's
//! region records (§3/§4.2), reduced to a single bounding rectangle.
//!
//! Austin Shafer - 2020

use wayland_server::protocol::wl_region::{Request, WlRegion};
use wayland_server::{Client, DataInit, Dispatch, DisplayHandle, New};

use crate::ids::RegionId;
use crate::state::Wayfront;

impl Dispatch<WlRegion, RegionId> for Wayfront {
    fn request(
        state: &mut Self,
        _client: &Client,
        _resource: &WlRegion,
        request: Request,
        data: &RegionId,
        _dhandle: &DisplayHandle,
        _data_init: &mut DataInit<'_, Self>,
    ) {
        match request {
            Request::Add { x, y, width, height } => {
                state.facade.inflate_region(*data, x, y, width, height);
            }
            // `subtract` is a documented no-op (§9): regions are reduced
            // to a single bounding rectangle, so concave input regions
            // cannot currently be expressed.
            Request::Subtract { .. } => {
                crate::nyimp!("wl_region.subtract: regions are a single bounding rect");
            }
            Request::Destroy => {}
            _ => unreachable!(),
        }
    }

    fn destroyed(state: &mut Self, _client: wayland_server::backend::ClientId, _object: wayland_server::backend::ObjectId, data: &RegionId) {
        state.facade.remove_region(*data);
    }
}

/// Binds a fresh region record and registers its `wl_region` resource
/// with `id` as user data, for `wl_compositor.create_region` (§4.5).
pub(crate) fn bind(
    data_init: &mut DataInit<'_, Wayfront>,
    resource: New<WlRegion>,
    state: &Wayfront,
) -> WlRegion {
    let id = state.facade.create_region();
    data_init.init(resource, id)
}
