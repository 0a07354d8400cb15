//! `wl_compositor` (§4.5): the factory for `wl_surface` and `wl_region`.
//!
//! Austin Shafer - 2020

use wayland_server::protocol::wl_compositor::{Request, WlCompositor};
use wayland_server::{Client, DataInit, Dispatch, DisplayHandle, GlobalDispatch, New};

use crate::state::Wayfront;

const VERSION: u32 = 3;

pub(crate) fn register(dh: &DisplayHandle) {
    dh.create_global::<Wayfront, WlCompositor, ()>(VERSION, ());
}

impl GlobalDispatch<WlCompositor, ()> for Wayfront {
    fn bind(
        _state: &mut Self,
        _handle: &DisplayHandle,
        _client: &Client,
        resource: New<WlCompositor>,
        _global_data: &(),
        data_init: &mut DataInit<'_, Self>,
    ) {
        data_init.init(resource, ());
    }
}

impl Dispatch<WlCompositor, ()> for Wayfront {
    fn request(
        state: &mut Self,
        client: &Client,
        _resource: &WlCompositor,
        request: Request,
        _data: &(),
        _dhandle: &DisplayHandle,
        data_init: &mut DataInit<'_, Self>,
    ) {
        match request {
            Request::CreateSurface { id } => {
                super::surface::bind(data_init, id, state, client);
            }
            Request::CreateRegion { id } => {
                super::region::bind(data_init, id, state);
            }
            _ => unreachable!(),
        }
    }
}
