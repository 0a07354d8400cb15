//! `wl_data_device_manager`, `wl_data_device`, `wl_data_source` and
//! `wl_data_offer` (§4.5): copy/paste and drag-and-drop. Per §9/§10.6,
//! everything except `start_drag` itself is implemented against the
//! protocol; `start_drag` logs NYIMP and completes without establishing
//! a drag grab, since grabbing pointer input for a drag is an input-
//! layer concern this frontend does not own.
//!
//! Austin Shafer - 2020

use wayland_server::protocol::wl_data_device::{Request as DeviceRequest, WlDataDevice};
use wayland_server::protocol::wl_data_device_manager::{Request as ManagerRequest, WlDataDeviceManager};
use wayland_server::protocol::wl_data_offer::{Request as OfferRequest, WlDataOffer};
use wayland_server::protocol::wl_data_source::{Request as SourceRequest, WlDataSource};
use wayland_server::{Client, DataInit, Dispatch, DisplayHandle, GlobalDispatch, New, Resource};

use crate::state::Wayfront;

const VERSION: u32 = 3;

pub(crate) fn register(dh: &DisplayHandle) {
    dh.create_global::<Wayfront, WlDataDeviceManager, ()>(VERSION, ());
}

impl GlobalDispatch<WlDataDeviceManager, ()> for Wayfront {
    fn bind(
        _state: &mut Self,
        _handle: &DisplayHandle,
        _client: &Client,
        resource: New<WlDataDeviceManager>,
        _global_data: &(),
        data_init: &mut DataInit<'_, Self>,
    ) {
        data_init.init(resource, ());
    }
}

impl Dispatch<WlDataDeviceManager, ()> for Wayfront {
    fn request(
        state: &mut Self,
        client: &Client,
        _resource: &WlDataDeviceManager,
        request: ManagerRequest,
        _data: &(),
        _dhandle: &DisplayHandle,
        data_init: &mut DataInit<'_, Self>,
    ) {
        match request {
            ManagerRequest::CreateDataSource { id } => {
                let source = data_init.init(id, ());
                state.facade.create_transfer(source);
            }
            ManagerRequest::GetDataDevice { id, seat: _ } => {
                let owner = super::client_id_of(client);
                let device = data_init.init(id, ());
                state.facade.add_data_device_resource(device, owner);
            }
            _ => unreachable!(),
        }
    }
}

impl Dispatch<WlDataDevice, ()> for Wayfront {
    fn request(
        state: &mut Self,
        _client: &Client,
        _resource: &WlDataDevice,
        request: DeviceRequest,
        _data: &(),
        _dhandle: &DisplayHandle,
        _data_init: &mut DataInit<'_, Self>,
    ) {
        match request {
            DeviceRequest::SetSelection { source, serial: _ } => match source {
                Some(source) => state.facade.send_selection(&source, &mut state.gateway),
                None => crate::debug!("wl_data_device.set_selection(None): clearing the selection is not implemented"),
            },
            DeviceRequest::StartDrag { .. } => {
                crate::nyimp!("wl_data_device.start_drag: no drag grab is established");
            }
            DeviceRequest::Release => {}
            _ => unreachable!(),
        }
    }

    fn destroyed(state: &mut Self, _client: wayland_server::backend::ClientId, object: wayland_server::backend::ObjectId, _data: &()) {
        state.facade.remove_data_device_resource(object);
    }
}

impl Dispatch<WlDataSource, ()> for Wayfront {
    fn request(
        state: &mut Self,
        _client: &Client,
        resource: &WlDataSource,
        request: SourceRequest,
        _data: &(),
        _dhandle: &DisplayHandle,
        _data_init: &mut DataInit<'_, Self>,
    ) {
        match request {
            SourceRequest::Offer { mime_type } => {
                state.facade.add_mime_type(resource, mime_type);
            }
            SourceRequest::SetActions { .. } => {
                crate::nyimp!("wl_data_source.set_actions: only the copy action is offered");
            }
            SourceRequest::Destroy => {}
            _ => unreachable!(),
        }
    }

    fn destroyed(state: &mut Self, _client: wayland_server::backend::ClientId, object: wayland_server::backend::ObjectId, _data: &()) {
        state.facade.drop_transfer(object);
    }
}

impl Dispatch<WlDataOffer, WlDataSource> for Wayfront {
    fn request(
        state: &mut Self,
        _client: &Client,
        _resource: &WlDataOffer,
        request: OfferRequest,
        data: &WlDataSource,
        _dhandle: &DisplayHandle,
        _data_init: &mut DataInit<'_, Self>,
    ) {
        match request {
            OfferRequest::Accept { .. } => {}
            OfferRequest::Receive { mime_type, fd } => {
                state.facade.receive_data_offer(data, mime_type, fd);
            }
            OfferRequest::Finish => {}
            OfferRequest::SetActions { .. } => {
                crate::nyimp!("wl_data_offer.set_actions: only the copy action is offered");
            }
            OfferRequest::Destroy => {}
            _ => unreachable!(),
        }
    }
}
