//! `wl_output` (§4.5/§6): one global per compositor output, created and
//! destroyed as [`crate::gateway::Gateway`] hears about outputs
//! appearing and disappearing. Unlike every other global in this
//! module, there's no single static registration at startup — the
//! `OutputInfo` snapshot is captured as the global's user data at the
//! moment the output is found, and every client that binds afterwards
//! sees that same snapshot.
//!
//! Austin Shafer - 2020

use wayland_server::backend::GlobalId;
use wayland_server::protocol::wl_output::{Mode, Subpixel, Transform, WlOutput};
use wayland_server::{Client, DataInit, Dispatch, DisplayHandle, GlobalDispatch, New, Resource};

use crate::coordinator::OutputInfo;
use crate::state::Wayfront;

const VERSION: u32 = 2;

/// Create the global for a newly discovered output, returning the id
/// needed to remove it again in [`unregister`].
pub(crate) fn register(dh: &DisplayHandle, info: OutputInfo) -> GlobalId {
    dh.create_global::<Wayfront, WlOutput, OutputInfo>(VERSION, info)
}

pub(crate) fn unregister(dh: &DisplayHandle, id: GlobalId) {
    dh.remove_global::<Wayfront>(id);
}

impl GlobalDispatch<WlOutput, OutputInfo> for Wayfront {
    fn bind(
        _state: &mut Self,
        _handle: &DisplayHandle,
        _client: &Client,
        resource: New<WlOutput>,
        global_data: &OutputInfo,
        data_init: &mut DataInit<'_, Self>,
    ) {
        let out = data_init.init(resource, ());

        out.geometry(
            global_data.position.x,
            global_data.position.y,
            global_data.physical_size_mm.width,
            global_data.physical_size_mm.height,
            Subpixel::Unknown,
            "wayfront".to_string(),
            global_data.name.clone(),
            Transform::Normal,
        );

        out.mode(
            Mode::Current,
            global_data.pixel_size.width,
            global_data.pixel_size.height,
            global_data.refresh_mhz,
        );

        if out.version() >= 2 {
            out.scale(global_data.scale);
        }

        out.done();
    }
}

impl Dispatch<WlOutput, ()> for Wayfront {
    fn request(
        _state: &mut Self,
        _client: &Client,
        _resource: &WlOutput,
        _request: wayland_server::protocol::wl_output::Request,
        _data: &(),
        _dhandle: &DisplayHandle,
        _data_init: &mut DataInit<'_, Self>,
    ) {
    }
}
