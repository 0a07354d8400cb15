//! The inbound boundary (§4.3): every mutation originating from a
//! client request flows through exactly one of these entries.
//!
//! Austin Shafer - 2020

use std::collections::HashMap;
use std::os::unix::io::RawFd;
use std::sync::{Arc, Mutex};

use wayland_server::backend::ObjectId;
use wayland_server::protocol::wl_buffer::WlBuffer;
use wayland_server::protocol::wl_data_source::WlDataSource;
use wayland_server::protocol::wl_keyboard::WlKeyboard;
use wayland_server::Resource;

use crate::cache::{Cache, RoleSlot, SurfaceResource, SurfaceRole};
use crate::coordinator::{Coordinator, ShowReason};
use crate::gateway::Gateway;
use crate::geometry::{Position, Rect, Size};
use crate::ids::{ClientId, RegionId, SerialCounter, SurfaceId};
use crate::transfer::Transfer;

/// The pixel source attached on `wl_surface.attach`, already classified
/// by the protocol handler that inspected the buffer resource.
///
/// Non-SHM buffers (dmabuf, shm-pool-less client allocations) are
/// reported as `Opaque`: the attach still proceeds so the coordinator
/// can decide whether to accept it, but no pixel data is available to
/// hand over (§4.3).
pub enum AttachedBuffer {
    Shm {
        width: i32,
        height: i32,
        stride: i32,
        data: *const u8,
    },
    Opaque,
}

/// The single inbound boundary. Every method is fire-and-forget: the
/// only return values are newly minted identifiers, and failures are
/// logged rather than propagated (§4.3 "every facade entry").
pub struct Facade {
    cache: Arc<Cache>,
    coordinator: Arc<Mutex<dyn Coordinator>>,
    serials: Arc<SerialCounter>,
    /// Transfers under construction, keyed by the data-source resource
    /// that owns them, until `send_selection` promotes one of them to
    /// the gateway's current selection (§3/§4.3).
    transfers: Mutex<HashMap<ObjectId, Transfer>>,
}

impl Facade {
    pub fn new(
        cache: Arc<Cache>,
        coordinator: Arc<Mutex<dyn Coordinator>>,
        serials: Arc<SerialCounter>,
    ) -> Self {
        Facade {
            cache,
            coordinator,
            serials,
            transfers: Mutex::new(HashMap::new()),
        }
    }

    pub fn create_surface(&self) -> SurfaceId {
        self.coordinator.lock().unwrap().surface_create()
    }

    /// Register the main resource for a surface already minted by
    /// `create_surface`.
    pub fn add_surface(
        &self,
        sid: SurfaceId,
        owner: ClientId,
        main_resource: wayland_server::protocol::wl_surface::WlSurface,
    ) {
        let mut cache = self.cache.lock();
        cache.create_surface(sid, owner);
        cache.add_surface_resource(sid, SurfaceResource::Main(main_resource));
    }

    pub fn commit(&self, sid: SurfaceId) {
        self.coordinator.lock().unwrap().surface_commit(sid);
    }

    /// Cache the attached buffer and inform the coordinator of the new
    /// pixel source. A non-SHM buffer is passed through as zeroed
    /// dimensions with a null pointer; see [`AttachedBuffer`].
    pub fn surface_attach(&self, sid: SurfaceId, buffer: WlBuffer, attached: AttachedBuffer) {
        self.cache
            .lock()
            .add_surface_resource(sid, SurfaceResource::Buffer(buffer));

        let (width, height, stride, data) = match attached {
            AttachedBuffer::Shm {
                width,
                height,
                stride,
                data,
            } => (width, height, stride, data),
            AttachedBuffer::Opaque => {
                crate::debug!("surface_attach({:?}): non-SHM buffer, zeroing pixel source", sid);
                (0, 0, 0, std::ptr::null())
            }
        };

        self.coordinator
            .lock()
            .unwrap()
            .surface_attach(sid, width, height, stride, data);
    }

    pub fn set_requested_size(&self, sid: SurfaceId, size: Size) {
        self.coordinator
            .lock()
            .unwrap()
            .surface_set_requested_size(sid, size);
    }

    pub fn set_offset(&self, sid: SurfaceId, pos: Position) {
        self.coordinator.lock().unwrap().surface_set_offset(sid, pos);
    }

    pub fn reset_offset_and_requested_size(&self, sid: SurfaceId) {
        self.coordinator
            .lock()
            .unwrap()
            .surface_reset_offset_and_requested_size(sid);
    }

    pub fn set_subsurface_position(&self, sid: SurfaceId, pos: Position) {
        self.coordinator
            .lock()
            .unwrap()
            .surface_set_relative_position(sid, pos);
    }

    /// Establish `sid` as a satellite of `parent_sid` at offset `pos`,
    /// both locally (stacking order, §8 S4) and via the coordinator, and
    /// give it the `Subsurface` role. Returns `false` if `sid` already
    /// carries a different, conflicting role, so the caller (`wl_subcompositor
    /// .get_subsurface`) can post `wl_subcompositor::Error::BadSurface`
    /// (§7), mirroring `set_cursor`'s role-conflict check.
    pub fn add_subsurface(&self, sid: SurfaceId, parent_sid: SurfaceId, pos: Position) -> bool {
        {
            let mut cache = self.cache.lock();
            let record = match cache.find_surface_mut(sid) {
                Some(r) => r,
                None => return false,
            };
            if let Some(existing) = record.role {
                if existing != SurfaceRole::Subsurface {
                    return false;
                }
            }
            record.role = Some(SurfaceRole::Subsurface);
            cache.surface_relate(sid, parent_sid);
        }
        let mut coordinator = self.coordinator.lock().unwrap();
        coordinator.surface_relate(sid, parent_sid);
        coordinator.surface_set_relative_position(sid, pos);
        true
    }

    /// Establish the parent/child stacking relation (§8 S4) for a
    /// surface whose role is already something other than `Subsurface`
    /// (an `xdg_popup`'s parent link, §4.5). Unlike `add_subsurface`,
    /// this never touches `record.role`: a popup keeps its `XdgPopup`
    /// role, it just also needs a place in its parent's satellite list.
    pub fn relate_satellite(&self, sid: SurfaceId, parent_sid: SurfaceId, pos: Position) {
        self.cache.lock().surface_relate(sid, parent_sid);
        let mut coordinator = self.coordinator.lock().unwrap();
        coordinator.surface_relate(sid, parent_sid);
        coordinator.surface_set_relative_position(sid, pos);
    }

    /// Read the region's bounding rectangle and forward it as the
    /// surface's input region. The sentinel region id resets the input
    /// region to the whole surface (§4.3).
    pub fn set_input_region(&self, sid: SurfaceId, rid: RegionId) {
        let rect = if rid.is_none() {
            None
        } else {
            self.cache.lock().find_region(rid).map(|r| r.rect)
        };
        self.coordinator
            .lock()
            .unwrap()
            .surface_set_input_region(sid, rect);
    }

    /// Register an `xdg_surface` resource before its role (toplevel or
    /// popup) is known; `xdg_surface.get_toplevel`/`get_popup` assign
    /// the role afterwards via `add_shell_surface` (§4.5).
    pub fn store_xdg_surface(
        &self,
        sid: SurfaceId,
        resource: wayland_protocols::xdg::shell::server::xdg_surface::XdgSurface,
    ) {
        self.cache
            .lock()
            .add_surface_resource(sid, SurfaceResource::XdgSurface(resource));
    }

    /// Cache the shell resource in its role slot and tell the
    /// coordinator the surface is now mappable. Returns `false` without
    /// doing anything if `sid` already carries a different role, so the
    /// caller can post the interface-specific role-conflict error (§7).
    pub fn add_shell_surface(
        &self,
        sid: SurfaceId,
        role: SurfaceRole,
        resource: SurfaceResource,
        reason: ShowReason,
    ) -> bool {
        {
            let mut cache = self.cache.lock();
            let record = match cache.find_surface_mut(sid) {
                Some(r) => r,
                None => return false,
            };
            if let Some(existing) = record.role {
                if existing != role {
                    return false;
                }
            }
            record.role = Some(role);
            cache.add_surface_resource(sid, resource);
        }
        self.coordinator.lock().unwrap().surface_show(sid, reason);
        true
    }

    /// Mint a fresh region (§4.2/§4.3); the bounding rect starts empty.
    pub fn create_region(&self) -> RegionId {
        self.cache.lock().create_region()
    }

    /// Grow a region's bounding rectangle by the given rect (`wl_region.add`).
    pub fn inflate_region(&self, rid: RegionId, x: i32, y: i32, width: i32, height: i32) {
        if let Some(region) = self.cache.lock().find_region_mut(rid) {
            region.rect.add(x, y, width, height);
        }
    }

    pub fn remove_region(&self, rid: RegionId) {
        self.cache.lock().remove_region(rid);
    }


    /// Tear down a surface in one locked section: the coordinator is
    /// told first (in case it needs to look anything up before the
    /// record disappears), then the whole record is dropped, which
    /// detaches every remaining slot without replaying release events
    /// (§3 lifecycle). Called from `wl_surface`'s `destroyed` hook,
    /// which only ever has the surface id and no resource handle.
    pub fn remove_surface(&self, sid: SurfaceId) {
        self.coordinator.lock().unwrap().surface_destroy(sid);
        self.cache.lock().remove_surface(sid);
    }

    /// Queue a one-shot frame callback on a surface's frame-callback
    /// list (`wl_surface.frame`); drained in FIFO order by the
    /// gateway's `screen_refresh` (§3 I4/§4.4).
    pub fn add_frame_callback(&self, sid: SurfaceId, callback: wayland_server::protocol::wl_callback::WlCallback) {
        self.cache
            .lock()
            .add_surface_resource(sid, SurfaceResource::FrameCallback(callback));
    }

    /// Remove a single role-slot resource directly (§4.5 unbind step
    /// 3), for slots whose lifetime is tied to a satellite resource
    /// rather than the main surface resource: shell surfaces, xdg
    /// surfaces/toplevels/popups, and frame callbacks that are dropped
    /// by the client before ever firing.
    pub fn remove_surface_resource(&self, sid: SurfaceId, resource: SurfaceResource) {
        self.cache.lock().remove_surface_resource(sid, &resource);
    }

    /// Clear a role-slot resource from a surface's `destroyed` hook,
    /// which only has ids to work with (§4.5 unbind step 3).
    pub fn clear_role_resource(&self, sid: SurfaceId, slot: RoleSlot) {
        self.cache.lock().clear_role_slot(sid, slot);
    }

    /// Reorder `sid` to sit immediately above/below `sibling_sid` among
    /// their shared parent's satellites. Quietly does nothing if either
    /// is not currently a satellite of the same parent (§4.3/§8 S4).
    pub fn reorder_satellites(&self, sid: SurfaceId, sibling_sid: SurfaceId, above: bool) {
        self.cache.lock().reorder_satellites(sid, sibling_sid, above);
    }

    pub fn create_transfer(&self, source: WlDataSource) {
        let mut transfers = self.transfers.lock().unwrap();
        transfers.insert(source.id(), Transfer::new(source));
    }

    pub fn add_mime_type(&self, source: &WlDataSource, mime: String) {
        let mut transfers = self.transfers.lock().unwrap();
        match transfers.get_mut(&source.id()) {
            Some(t) => t.add_mime_type(mime),
            None => crate::debug!("add_mime_type: no transfer for this data source"),
        }
    }

    /// Drop a transfer under construction that was never promoted to a
    /// selection (the client destroyed its `wl_data_source` first). Keyed
    /// on `ObjectId` like the other unbind-driven removals (§4.5 unbind
    /// step 3): `wl_data_source`'s `destroyed` hook only has ids to work
    /// with.
    pub fn drop_transfer(&self, id: ObjectId) {
        self.transfers.lock().unwrap().remove(&id);
    }

    /// Promote a transfer under construction to the current selection
    /// and immediately ask the gateway to offer it to the focused
    /// client (§4.3/§4.4).
    pub fn send_selection(&self, source: &WlDataSource, gateway: &mut Gateway) {
        let transfer = self.transfers.lock().unwrap().remove(&source.id());
        let transfer = match transfer {
            Some(t) => t,
            None => {
                crate::debug!("send_selection: no transfer for this data source");
                return;
            }
        };
        gateway.set_selection(transfer);
        gateway.send_selection();
    }

    /// Forward a client's paste request on the data-source resource and
    /// close our end of the fd once the source has been given the
    /// chance to write to it (§4.3/§7.4 NYIMP note in DESIGN.md).
    pub fn receive_data_offer(&self, source: &WlDataSource, mime: String, fd: RawFd) {
        source.send(mime, fd);
        // SAFETY: `fd` was handed to us solely to pass to the data
        // source; we own it and must close our copy once sent.
        unsafe {
            libc::close(fd);
        }
    }

    /// Record the cursor hotspot as an offset and mark the surface as
    /// the seat's cursor. `sid` of `None` clears the cursor (the client
    /// passed a null surface, per `wl_pointer.set_cursor`). Returns
    /// `false` if `sid` already carries a non-cursor role, so the caller
    /// can post `wl_pointer::Error::Role` (§7).
    pub fn set_cursor(&self, _serial: u32, hotspot: Position, sid: Option<SurfaceId>) -> bool {
        let sid = match sid {
            Some(sid) => sid,
            None => return true,
        };
        {
            let mut cache = self.cache.lock();
            let record = match cache.find_surface_mut(sid) {
                Some(r) => r,
                None => return false,
            };
            if let Some(existing) = record.role {
                if existing != SurfaceRole::Cursor {
                    return false;
                }
            }
            record.role = Some(SurfaceRole::Cursor);
        }
        let mut coordinator = self.coordinator.lock().unwrap();
        coordinator.surface_set_offset(sid, Position::new(-hotspot.x, -hotspot.y));
        coordinator.surface_set_as_cursor(sid);
        true
    }

    /// Store a newly bound keyboard resource; if its owning client is
    /// already keyboard-focused, emit `enter` immediately with the
    /// current serial so a late-binding keyboard does not miss focus
    /// (§4.3/§8 S5).
    pub fn add_keyboard_resource(&self, resource: WlKeyboard, owner: ClientId, gateway: &Gateway) {
        let focused_sid = gateway.keyboard_focus_sid();
        let focused_client = gateway.keyboard_focus_client();

        if focused_client == Some(owner) && !focused_sid.is_none() {
            let main = self.cache.lock().find_surface(focused_sid).and_then(|r| r.main_resource.clone());
            if let Some(main) = main {
                resource.enter(self.serials.next_serial(), &main, Vec::new());
            }
        }

        self.cache.lock().add_keyboard_resource(resource, owner);
    }

    pub fn remove_keyboard_resource(&self, id: ObjectId) {
        self.cache.lock().remove_keyboard_resource(id);
    }

    /// Store a newly bound pointer resource; if its owning client is
    /// already pointer-focused, emit `enter` immediately so a
    /// late-binding pointer does not miss focus (mirrors
    /// `add_keyboard_resource`, §4.3/§8 S5).
    pub fn add_pointer_resource(
        &self,
        resource: wayland_server::protocol::wl_pointer::WlPointer,
        owner: ClientId,
        gateway: &Gateway,
    ) {
        let focused_sid = gateway.pointer_focus_sid();
        let focused_client = gateway.pointer_focus_client();

        if focused_client == Some(owner) && !focused_sid.is_none() {
            let main = self.cache.lock().find_surface(focused_sid).and_then(|r| r.main_resource.clone());
            if let Some(main) = main {
                let serial = self.serials.next_serial();
                resource.enter(serial, &main, wayland_server::Fixed::from(0), wayland_server::Fixed::from(0));
            }
        }

        self.cache.lock().add_pointer_resource(resource, owner);
    }

    pub fn remove_pointer_resource(&self, id: ObjectId) {
        self.cache.lock().remove_pointer_resource(id);
    }

    pub fn add_data_device_resource(
        &self,
        resource: wayland_server::protocol::wl_data_device::WlDataDevice,
        owner: ClientId,
    ) {
        self.cache.lock().add_data_device_resource(resource, owner);
    }

    pub fn remove_data_device_resource(&self, id: ObjectId) {
        self.cache.lock().remove_data_device_resource(id);
    }
}
