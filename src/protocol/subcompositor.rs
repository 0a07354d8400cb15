//! `wl_subcompositor` and `wl_subsurface` (§4.5): the stacking-order
//! parent/child relation between surfaces (§8 S4).
//!
//! Austin Shafer - 2020

use wayland_server::protocol::wl_subcompositor::{Error, Request as CompositorRequest, WlSubcompositor};
use wayland_server::protocol::wl_subsurface::{Request, WlSubsurface};
use wayland_server::{Client, DataInit, Dispatch, DisplayHandle, GlobalDispatch, New, Resource};

use crate::geometry::Position;
use crate::ids::SurfaceId;
use crate::state::Wayfront;

const VERSION: u32 = 1;

pub(crate) fn register(dh: &DisplayHandle) {
    dh.create_global::<Wayfront, WlSubcompositor, ()>(VERSION, ());
}

impl GlobalDispatch<WlSubcompositor, ()> for Wayfront {
    fn bind(
        _state: &mut Self,
        _handle: &DisplayHandle,
        _client: &Client,
        resource: New<WlSubcompositor>,
        _global_data: &(),
        data_init: &mut DataInit<'_, Self>,
    ) {
        data_init.init(resource, ());
    }
}

impl Dispatch<WlSubcompositor, ()> for Wayfront {
    fn request(
        state: &mut Self,
        _client: &Client,
        resource: &WlSubcompositor,
        request: CompositorRequest,
        _data: &(),
        _dhandle: &DisplayHandle,
        data_init: &mut DataInit<'_, Self>,
    ) {
        match request {
            CompositorRequest::GetSubsurface { id, surface, parent } => {
                let sid = *surface.data::<SurfaceId>().expect("wl_surface carries a SurfaceId");
                let parent_sid = *parent.data::<SurfaceId>().expect("wl_surface carries a SurfaceId");
                let ok = state.facade.add_subsurface(sid, parent_sid, Position::new(0, 0));
                if !ok {
                    resource.post_error(Error::BadSurface as u32, "surface already has a conflicting role".to_string());
                    return;
                }
                data_init.init(id, sid);
            }
            CompositorRequest::Destroy => {}
            _ => unreachable!(),
        }
    }
}

impl Dispatch<WlSubsurface, SurfaceId> for Wayfront {
    fn request(
        state: &mut Self,
        _client: &Client,
        _resource: &WlSubsurface,
        request: Request,
        data: &SurfaceId,
        _dhandle: &DisplayHandle,
        _data_init: &mut DataInit<'_, Self>,
    ) {
        let sid = *data;
        match request {
            Request::SetPosition { x, y } => {
                state.facade.set_subsurface_position(sid, Position::new(x, y));
            }
            Request::PlaceAbove { sibling } => {
                let sibling_sid = *sibling.data::<SurfaceId>().expect("wl_surface carries a SurfaceId");
                state.facade.reorder_satellites(sid, sibling_sid, true);
            }
            Request::PlaceBelow { sibling } => {
                let sibling_sid = *sibling.data::<SurfaceId>().expect("wl_surface carries a SurfaceId");
                state.facade.reorder_satellites(sid, sibling_sid, false);
            }
            Request::SetSync | Request::SetDesync => {
                // Sub-surface commit-ordering synchronization is part of
                // the coordinator's own framing tree, which this crate
                // does not model (§1 Non-goals: frame composition).
                crate::nyimp!("wl_subsurface sync/desync has no coordinator-side effect");
            }
            Request::Destroy => {}
            _ => unreachable!(),
        }
    }
}
