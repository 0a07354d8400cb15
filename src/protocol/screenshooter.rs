//! Hand-scanned bindings for the compositor's own, non-standard
//! `screenshooter` protocol (`protocols/screenshooter.xml`, generated at
//! build time by `wayland-scanner`; see `build.rs`). One request,
//! `shoot`, with no reply: it hands the server a `wl_buffer` to fill
//! with an output's current contents.
//!
//! §9 marks the actual pixel copy as a future feature: the coordinator
//! interface this frontend consumes (§6) has no operation for reading
//! back framebuffer contents, so `shoot` logs NYIMP rather than silently
//! dropping the request.
//!
//! Austin Shafer - 2020

#![allow(dead_code, non_camel_case_types, unused_imports)]

mod generated {
    use wayland_server::backend;
    use wayland_server::protocol::{wl_buffer, wl_output};
    use wayland_server::{Client, DataInit, Dispatch, DisplayHandle, GlobalDispatch, New, Resource, WEnum};

    include!(concat!(env!("OUT_DIR"), "/screenshooter_generated.rs"));
}

use generated::screenshooter::{Request, Screenshooter};
use wayland_server::{Client, DataInit, Dispatch, DisplayHandle, GlobalDispatch, New};

use crate::state::Wayfront;

const VERSION: u32 = 1;

pub(crate) fn register(dh: &DisplayHandle) {
    dh.create_global::<Wayfront, Screenshooter, ()>(VERSION, ());
}

impl GlobalDispatch<Screenshooter, ()> for Wayfront {
    fn bind(
        _state: &mut Self,
        _handle: &DisplayHandle,
        _client: &Client,
        resource: New<Screenshooter>,
        _global_data: &(),
        data_init: &mut DataInit<'_, Self>,
    ) {
        data_init.init(resource, ());
    }
}

impl Dispatch<Screenshooter, ()> for Wayfront {
    fn request(
        _state: &mut Self,
        _client: &Client,
        _resource: &Screenshooter,
        request: Request,
        _data: &(),
        _dhandle: &DisplayHandle,
        _data_init: &mut DataInit<'_, Self>,
    ) {
        match request {
            Request::Shoot { output: _, buffer: _ } => {
                crate::nyimp!("screenshooter.shoot: framebuffer readback is not exposed by the coordinator interface");
            }
            _ => unreachable!(),
        }
    }
}
