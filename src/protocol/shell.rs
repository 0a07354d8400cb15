//! `wl_shell` and `wl_shell_surface` (§4.5): the legacy, deprecated
//! toplevel-window protocol, still spoken by some clients.
//!
//! Austin Shafer - 2020

use wayland_server::protocol::wl_shell::{Request as ShellRequest, WlShell};
use wayland_server::protocol::wl_shell_surface::{Request, WlShellSurface};
use wayland_server::{Client, DataInit, Dispatch, DisplayHandle, GlobalDispatch, New, Resource};

use crate::cache::{RoleSlot, SurfaceResource, SurfaceRole};
use crate::coordinator::ShowReason;
use crate::ids::SurfaceId;
use crate::state::Wayfront;

const VERSION: u32 = 1;

pub(crate) fn register(dh: &DisplayHandle) {
    dh.create_global::<Wayfront, WlShell, ()>(VERSION, ());
}

impl GlobalDispatch<WlShell, ()> for Wayfront {
    fn bind(
        _state: &mut Self,
        _handle: &DisplayHandle,
        _client: &Client,
        resource: New<WlShell>,
        _global_data: &(),
        data_init: &mut DataInit<'_, Self>,
    ) {
        data_init.init(resource, ());
    }
}

impl Dispatch<WlShell, ()> for Wayfront {
    fn request(
        _state: &mut Self,
        _client: &Client,
        _resource: &WlShell,
        request: ShellRequest,
        _data: &(),
        _dhandle: &DisplayHandle,
        data_init: &mut DataInit<'_, Self>,
    ) {
        match request {
            ShellRequest::GetShellSurface { id, surface } => {
                let sid = *surface.data::<SurfaceId>().expect("wl_surface carries a SurfaceId");
                data_init.init(id, sid);
            }
            _ => unreachable!(),
        }
    }
}

impl Dispatch<WlShellSurface, SurfaceId> for Wayfront {
    fn request(
        state: &mut Self,
        _client: &Client,
        resource: &WlShellSurface,
        request: Request,
        data: &SurfaceId,
        _dhandle: &DisplayHandle,
        _data_init: &mut DataInit<'_, Self>,
    ) {
        let sid = *data;
        match request {
            Request::SetToplevel => {
                let ok = state.facade.add_shell_surface(
                    sid,
                    SurfaceRole::WlShellToplevel,
                    SurfaceResource::WlShellSurface(resource.clone()),
                    ShowReason::ShellSurfaceAssigned,
                );
                if !ok {
                    crate::debug!("wl_shell_surface.set_toplevel: surface already has a conflicting role");
                }
            }
            Request::Pong { .. } => {}
            Request::SetTitle { .. } | Request::SetClass { .. } => {}
            Request::Move { .. } | Request::Resize { .. } => {
                crate::nyimp!("wl_shell_surface interactive move/resize is an input-layer concern");
            }
            Request::SetFullscreen { .. }
            | Request::SetPopup { .. }
            | Request::SetMaximized { .. }
            | Request::SetTransient { .. } => {
                crate::nyimp!("wl_shell_surface: only the toplevel role is implemented");
            }
            _ => unreachable!(),
        }
    }

    fn destroyed(state: &mut Self, _client: wayland_server::backend::ClientId, _object: wayland_server::backend::ObjectId, data: &SurfaceId) {
        state.facade.clear_role_resource(*data, RoleSlot::WlShellSurface);
    }
}
