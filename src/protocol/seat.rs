//! `wl_seat` (§4.5): the single logical input seat, `seat0`, advertising
//! the keyboard and pointer capabilities this frontend always provides.
//!
//! Austin Shafer - 2020

use wayland_server::protocol::wl_seat::{Capability, Request, WlSeat};
use wayland_server::protocol::wl_touch::WlTouch;
use wayland_server::{Client, DataInit, Dispatch, DisplayHandle, GlobalDispatch, New};

use crate::state::Wayfront;

const VERSION: u32 = 4;

pub(crate) fn register(dh: &DisplayHandle) {
    dh.create_global::<Wayfront, WlSeat, ()>(VERSION, ());
}

impl GlobalDispatch<WlSeat, ()> for Wayfront {
    fn bind(
        _state: &mut Self,
        _handle: &DisplayHandle,
        _client: &Client,
        resource: New<WlSeat>,
        _global_data: &(),
        data_init: &mut DataInit<'_, Self>,
    ) {
        let seat = data_init.init(resource, ());
        seat.capabilities(Capability::Keyboard | Capability::Pointer);
        seat.name("seat0".to_string());
    }
}

impl Dispatch<WlSeat, ()> for Wayfront {
    fn request(
        state: &mut Self,
        client: &Client,
        _resource: &WlSeat,
        request: Request,
        _data: &(),
        _dhandle: &DisplayHandle,
        data_init: &mut DataInit<'_, Self>,
    ) {
        let owner = super::client_id_of(client);
        match request {
            Request::GetKeyboard { id } => {
                super::keyboard::bind(data_init, id, state, owner);
            }
            Request::GetPointer { id } => {
                super::pointer::bind(data_init, id, state, owner);
            }
            Request::GetTouch { id } => {
                crate::nyimp!("wl_seat.get_touch: no touch input device is modeled");
                data_init.init(id, ());
            }
            Request::Release => {}
            _ => unreachable!(),
        }
    }
}

/// `wl_touch` has no requests worth decoding; the interface exists only
/// so `wl_seat.get_touch` has an object to bind, for clients that probe
/// for it unconditionally (§4.5).
impl Dispatch<WlTouch, ()> for Wayfront {
    fn request(
        _state: &mut Self,
        _client: &Client,
        _resource: &WlTouch,
        _request: wayland_server::protocol::wl_touch::Request,
        _data: &(),
        _dhandle: &DisplayHandle,
        _data_init: &mut DataInit<'_, Self>,
    ) {
    }
}
