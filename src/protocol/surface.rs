//! `wl_surface` and `wl_callback` (§4.5): the main surface resource and
//! the one-shot frame-callback objects it hands out.
//!
//! Austin Shafer - 2020

use wayland_server::protocol::wl_buffer::WlBuffer;
use wayland_server::protocol::wl_callback::WlCallback;
use wayland_server::protocol::wl_surface::{Request, WlSurface};
use wayland_server::{Client, DataInit, Dispatch, DisplayHandle, New, Resource};

use crate::facade::AttachedBuffer;
use crate::geometry::Position;
use crate::ids::SurfaceId;
use crate::state::Wayfront;

impl Dispatch<WlSurface, SurfaceId> for Wayfront {
    fn request(
        state: &mut Self,
        _client: &Client,
        _resource: &WlSurface,
        request: Request,
        data: &SurfaceId,
        _dhandle: &DisplayHandle,
        data_init: &mut DataInit<'_, Self>,
    ) {
        let sid = *data;
        match request {
            Request::Attach { buffer, x, y } => {
                // §4.3: a null buffer detaches the current one. We don't
                // replay a release for it here; the next frame refresh
                // (or surface teardown) reconciles the slot.
                let buffer = match buffer {
                    Some(b) => b,
                    None => {
                        state.facade.reset_offset_and_requested_size(sid);
                        return;
                    }
                };
                if (x, y) != (0, 0) {
                    state.facade.set_offset(sid, Position::new(x, y));
                }
                let attached = classify_buffer(&buffer);
                state.facade.surface_attach(sid, buffer, attached);
            }
            Request::Damage { .. } | Request::DamageBuffer { .. } => {
                // Damage tracking beyond ack is out of scope (§1 Non-goals).
            }
            Request::Frame { callback } => {
                let cb = data_init.init(callback, ());
                state.facade.add_frame_callback(sid, cb);
            }
            Request::SetOpaqueRegion { .. } => {
                // Opaque-region hinting feeds rendering, which is out of
                // scope (§1 Non-goals); accepted and otherwise ignored.
            }
            Request::SetInputRegion { region } => {
                let rid = region
                    .map(|r| {
                        *r.data::<crate::ids::RegionId>()
                            .expect("wl_region carries a RegionId")
                    })
                    .unwrap_or_else(crate::ids::RegionId::none);
                state.facade.set_input_region(sid, rid);
            }
            Request::Commit => {
                state.facade.commit(sid);
            }
            Request::SetBufferTransform { .. } | Request::SetBufferScale { .. } => {
                crate::nyimp!("wl_surface buffer transform/scale not applied to geometry yet");
            }
            Request::Destroy => {}
            _ => unreachable!(),
        }
    }

    fn destroyed(state: &mut Self, _client: wayland_server::backend::ClientId, _object: wayland_server::backend::ObjectId, data: &SurfaceId) {
        state.facade.remove_surface(*data);
    }
}

/// No requests are defined on `wl_callback`; it exists only so the
/// gateway can call `done()` then let the client drop its reference
/// (§3 I4/§4.4).
impl Dispatch<WlCallback, ()> for Wayfront {
    fn request(
        _state: &mut Self,
        _client: &Client,
        _resource: &WlCallback,
        _request: wayland_server::protocol::wl_callback::Request,
        _data: &(),
        _dhandle: &DisplayHandle,
        _data_init: &mut DataInit<'_, Self>,
    ) {
        unreachable!("wl_callback has no requests");
    }
}

/// Binds a fresh surface record and registers its `wl_surface` resource,
/// for `wl_compositor.create_surface` (§4.5). `client` is the binding
/// client, already available to the caller's `wl_compositor` dispatch.
pub(crate) fn bind(
    data_init: &mut DataInit<'_, Wayfront>,
    resource: New<WlSurface>,
    state: &Wayfront,
    client: &Client,
) -> WlSurface {
    let sid = state.facade.create_surface();
    let surface = data_init.init(resource, sid);
    state
        .facade
        .add_surface(sid, crate::protocol::client_id_of(client), surface.clone());
    surface
}

fn classify_buffer(buffer: &WlBuffer) -> AttachedBuffer {
    match buffer.data::<std::sync::Arc<crate::protocol::shm::ShmBuffer>>() {
        Some(shm) => shm.attached(),
        None => AttachedBuffer::Opaque,
    }
}
