//! The lock-held primitives backing [`super::Cache`].
//!
//! Austin Shafer - 2020

use crate::geometry::Rect;
use crate::ids::{ClientId, RegionId, SurfaceId};
use std::collections::{HashMap, VecDeque};

use wayland_protocols::xdg::shell::server::xdg_popup::XdgPopup;
use wayland_protocols::xdg::shell::server::xdg_surface::XdgSurface;
use wayland_protocols::xdg::shell::server::xdg_toplevel::XdgToplevel;
use wayland_server::protocol::wl_buffer::WlBuffer;
use wayland_server::protocol::wl_callback::WlCallback;
use wayland_server::protocol::wl_data_device::WlDataDevice;
use wayland_server::protocol::wl_keyboard::WlKeyboard;
use wayland_server::protocol::wl_pointer::WlPointer;
use wayland_server::protocol::wl_shell_surface::WlShellSurface;
use wayland_server::protocol::wl_surface::WlSurface;
use wayland_server::backend::ObjectId;
use wayland_server::Resource;

/// Which role a surface currently plays. Tracked here (rather than
/// only in the coordinator) so protocol handlers can enforce role
/// exclusivity locally, e.g. `wl_pointer.set_cursor` refusing to steal
/// a surface that already has a shell role (§10.6).
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum SurfaceRole {
    Cursor,
    Subsurface,
    WlShellToplevel,
    XdgToplevel,
    XdgPopup,
}

/// One resource destined for a surface's role-slot table (§3).
///
/// `FrameCallback` is the only role that accumulates (Qt and other
/// toolkits queue several one-shot callbacks per commit); every other
/// variant occupies a single slot.
pub enum SurfaceResource {
    Main(WlSurface),
    Buffer(WlBuffer),
    FrameCallback(WlCallback),
    WlShellSurface(WlShellSurface),
    XdgSurface(XdgSurface),
    XdgToplevel(XdgToplevel),
    XdgPopup(XdgPopup),
}

/// See [`CacheInner::clear_role_slot`].
#[derive(Copy, Clone)]
pub enum RoleSlot {
    WlShellSurface,
    XdgSurface,
    XdgToplevel,
    XdgPopup,
}

/// One live surface known to the frontend (§3).
pub struct SurfaceRecord {
    pub id: SurfaceId,
    pub owner: ClientId,
    pub main_resource: Option<WlSurface>,
    pub buffer: Option<WlBuffer>,
    pub frame_callbacks: VecDeque<WlCallback>,
    pub wl_shell_surface: Option<WlShellSurface>,
    pub xdg_surface: Option<XdgSurface>,
    pub xdg_toplevel: Option<XdgToplevel>,
    pub xdg_popup: Option<XdgPopup>,
    pub role: Option<SurfaceRole>,
    /// Sentinel if this surface has no parent.
    pub parent: SurfaceId,
    /// Ordered satellites of this surface, bottom of the stack first
    /// (§4.3 `reorder_satellites`/§8 S4). Not part of §3's per-surface
    /// resource slot table since it tracks sibling order, not a wire
    /// resource; kept in the same record because it is still frontend-
    /// local bookkeeping the coordinator does not need to see beyond
    /// the individual `surface_relate` calls that establish membership.
    pub children: Vec<SurfaceId>,
}

impl SurfaceRecord {
    fn new(id: SurfaceId, owner: ClientId) -> Self {
        SurfaceRecord {
            id,
            owner,
            main_resource: None,
            buffer: None,
            frame_callbacks: VecDeque::new(),
            wl_shell_surface: None,
            xdg_surface: None,
            xdg_toplevel: None,
            xdg_popup: None,
            role: None,
            parent: SurfaceId::none(),
            children: Vec::new(),
        }
    }
}

/// A region, reduced to a single bounding rectangle (§3/§9).
pub struct RegionRecord {
    pub id: RegionId,
    pub rect: Rect,
}

/// A resource in one of the cache's general (non-surface-keyed)
/// categories, paired with the client that owns it so the gateway can
/// filter by client without a second lookup (§3).
pub enum GeneralResource {
    Keyboard(WlKeyboard, ClientId),
    Pointer(WlPointer, ClientId),
    DataDevice(WlDataDevice, ClientId),
}

/// The lock-held state. Every method here assumes the caller already
/// holds `Cache`'s mutex.
#[derive(Default)]
pub struct CacheInner {
    surfaces: HashMap<SurfaceId, SurfaceRecord>,
    regions: HashMap<RegionId, RegionRecord>,
    keyboards: Vec<(WlKeyboard, ClientId)>,
    pointers: Vec<(WlPointer, ClientId)>,
    data_devices: Vec<(WlDataDevice, ClientId)>,
}

impl CacheInner {
    pub fn new() -> Self {
        CacheInner::default()
    }

    // -- surfaces --------------------------------------------------

    /// Create a surface record. A no-op for the sentinel id (§4.2
    /// boundary behavior): some handlers construct a `SurfaceId`
    /// optimistically before the coordinator has actually minted one,
    /// and silently dropping that case is simpler than threading an
    /// error back through every caller.
    pub fn create_surface(&mut self, id: SurfaceId, owner: ClientId) {
        if id.is_none() {
            return;
        }
        self.surfaces.insert(id, SurfaceRecord::new(id, owner));
    }

    pub fn remove_surface(&mut self, id: SurfaceId) -> Option<SurfaceRecord> {
        let record = self.surfaces.remove(&id)?;
        if !record.parent.is_none() {
            if let Some(parent) = self.surfaces.get_mut(&record.parent) {
                parent.children.retain(|&c| c != id);
            }
        }
        Some(record)
    }

    pub fn find_surface(&self, id: SurfaceId) -> Option<&SurfaceRecord> {
        self.surfaces.get(&id)
    }

    pub fn find_surface_mut(&mut self, id: SurfaceId) -> Option<&mut SurfaceRecord> {
        self.surfaces.get_mut(&id)
    }

    /// Establish `sid` as a satellite of `parent_sid`, appended to the
    /// top of the parent's stacking order (§4.3 `add_subsurface`/§8 S4).
    pub fn surface_relate(&mut self, sid: SurfaceId, parent_sid: SurfaceId) {
        if let Some(record) = self.surfaces.get_mut(&sid) {
            record.parent = parent_sid;
        }
        if let Some(parent) = self.surfaces.get_mut(&parent_sid) {
            if !parent.children.contains(&sid) {
                parent.children.push(sid);
            }
        }
    }

    /// Move `sid` immediately above/below `sibling_sid` in their shared
    /// parent's stacking order. A no-op if either is not currently a
    /// satellite of the same parent (§4.3 `reorder_satellites`).
    pub fn reorder_satellites(&mut self, sid: SurfaceId, sibling_sid: SurfaceId, above: bool) {
        let parent_sid = match self.surfaces.get(&sid) {
            Some(r) => r.parent,
            None => return,
        };
        if parent_sid.is_none() {
            return;
        }
        let parent = match self.surfaces.get_mut(&parent_sid) {
            Some(r) => r,
            None => return,
        };
        let sid_pos = match parent.children.iter().position(|&c| c == sid) {
            Some(p) => p,
            None => return,
        };
        let sibling_pos = match parent.children.iter().position(|&c| c == sibling_sid) {
            Some(p) => p,
            None => return,
        };
        if sid_pos == sibling_pos {
            return;
        }

        parent.children.remove(sid_pos);
        let sibling_pos = parent.children.iter().position(|&c| c == sibling_sid).unwrap();
        let insert_at = if above { sibling_pos + 1 } else { sibling_pos };
        parent.children.insert(insert_at, sid);
    }

    /// Add a resource to a surface's role slot.
    ///
    /// Adding to a surface that does not exist is tolerated: some
    /// clients destroy the shell/xdg role resource after the main
    /// surface resource has already unbound, so this is logged as a
    /// warning rather than treated as an error (§4.2/§7.3).
    pub fn add_surface_resource(&mut self, id: SurfaceId, resource: SurfaceResource) {
        let record = match self.surfaces.get_mut(&id) {
            Some(r) => r,
            None => {
                crate::debug!("add_surface_resource: no surface {:?}, dropping resource", id);
                return;
            }
        };
        match resource {
            SurfaceResource::Main(r) => record.main_resource = Some(r),
            SurfaceResource::Buffer(r) => record.buffer = Some(r),
            SurfaceResource::FrameCallback(r) => record.frame_callbacks.push_back(r),
            SurfaceResource::WlShellSurface(r) => record.wl_shell_surface = Some(r),
            SurfaceResource::XdgSurface(r) => record.xdg_surface = Some(r),
            SurfaceResource::XdgToplevel(r) => record.xdg_toplevel = Some(r),
            SurfaceResource::XdgPopup(r) => record.xdg_popup = Some(r),
        }
    }

    /// Remove a resource from a surface's role slot. A cache-miss here
    /// (surface already gone, or the slot already empty) is a no-op;
    /// see §4.2/§7.3.
    pub fn remove_surface_resource(&mut self, id: SurfaceId, resource: &SurfaceResource) {
        let record = match self.surfaces.get_mut(&id) {
            Some(r) => r,
            None => {
                crate::debug!("remove_surface_resource: no surface {:?}", id);
                return;
            }
        };
        match resource {
            SurfaceResource::Main(r) => {
                if record.main_resource.as_ref() == Some(r) {
                    record.main_resource = None;
                }
            }
            SurfaceResource::Buffer(r) => {
                if record.buffer.as_ref() == Some(r) {
                    record.buffer = None;
                }
            }
            SurfaceResource::FrameCallback(r) => {
                if let Some(pos) = record.frame_callbacks.iter().position(|c| c == r) {
                    record.frame_callbacks.remove(pos);
                }
            }
            SurfaceResource::WlShellSurface(r) => {
                if record.wl_shell_surface.as_ref() == Some(r) {
                    record.wl_shell_surface = None;
                }
            }
            SurfaceResource::XdgSurface(r) => {
                if record.xdg_surface.as_ref() == Some(r) {
                    record.xdg_surface = None;
                }
            }
            SurfaceResource::XdgToplevel(r) => {
                if record.xdg_toplevel.as_ref() == Some(r) {
                    record.xdg_toplevel = None;
                }
            }
            SurfaceResource::XdgPopup(r) => {
                if record.xdg_popup.as_ref() == Some(r) {
                    record.xdg_popup = None;
                }
            }
        }
    }

    /// Which role-slot resource a `destroyed` hook should clear. Unbind
    /// callbacks only ever get ids back (wayland-server's `Dispatch::
    /// destroyed` has no resource handle), so they can't use
    /// `remove_surface_resource`'s by-value equality check; this clears
    /// the slot unconditionally instead.
    pub fn clear_role_slot(&mut self, id: SurfaceId, slot: RoleSlot) {
        let record = match self.surfaces.get_mut(&id) {
            Some(r) => r,
            None => return,
        };
        match slot {
            RoleSlot::WlShellSurface => record.wl_shell_surface = None,
            RoleSlot::XdgSurface => record.xdg_surface = None,
            RoleSlot::XdgToplevel => record.xdg_toplevel = None,
            RoleSlot::XdgPopup => record.xdg_popup = None,
        }
    }

    /// Clear every role slot without emitting the release/done events
    /// a normal transition would. Used when a surface's main resource
    /// unbinds and the surface record itself is about to be dropped
    /// (§3 lifecycle): there is nobody left to send events to.
    pub fn detach_all_resources(&mut self, id: SurfaceId) {
        if let Some(record) = self.surfaces.get_mut(&id) {
            record.main_resource = None;
            record.buffer = None;
            record.frame_callbacks.clear();
            record.wl_shell_surface = None;
            record.xdg_surface = None;
            record.xdg_toplevel = None;
            record.xdg_popup = None;
        }
    }

    // -- regions -----------------------------------------------------

    /// Mint a new region id from a random space, retrying on collision
    /// (§3: "drawn from a random space, guaranteed unique").
    pub fn create_region(&mut self) -> RegionId {
        use rand::Rng;
        loop {
            let candidate = RegionId::new(rand::thread_rng().gen::<u64>().max(1));
            if !self.regions.contains_key(&candidate) {
                self.regions.insert(
                    candidate,
                    RegionRecord {
                        id: candidate,
                        rect: Rect::default(),
                    },
                );
                return candidate;
            }
        }
    }

    pub fn find_region(&self, id: RegionId) -> Option<&RegionRecord> {
        self.regions.get(&id)
    }

    pub fn find_region_mut(&mut self, id: RegionId) -> Option<&mut RegionRecord> {
        self.regions.get_mut(&id)
    }

    pub fn remove_region(&mut self, id: RegionId) -> Option<RegionRecord> {
        self.regions.remove(&id)
    }

    // -- general resources --------------------------------------------

    pub fn add_keyboard_resource(&mut self, resource: WlKeyboard, client: ClientId) {
        self.keyboards.push((resource, client));
    }

    /// Removal keys on `ObjectId` rather than the resource itself: the
    /// `Dispatch::destroyed` unbind hook only ever gets ids back.
    pub fn remove_keyboard_resource(&mut self, id: ObjectId) {
        self.keyboards.retain(|(r, _)| r.id() != id);
    }

    pub fn keyboards(&self) -> &[(WlKeyboard, ClientId)] {
        &self.keyboards
    }

    pub fn add_pointer_resource(&mut self, resource: WlPointer, client: ClientId) {
        self.pointers.push((resource, client));
    }

    pub fn remove_pointer_resource(&mut self, id: ObjectId) {
        self.pointers.retain(|(r, _)| r.id() != id);
    }

    pub fn pointers(&self) -> &[(WlPointer, ClientId)] {
        &self.pointers
    }

    pub fn add_data_device_resource(&mut self, resource: WlDataDevice, client: ClientId) {
        self.data_devices.push((resource, client));
    }

    pub fn remove_data_device_resource(&mut self, id: ObjectId) {
        self.data_devices.retain(|(r, _)| r.id() != id);
    }

    pub fn data_devices(&self) -> &[(WlDataDevice, ClientId)] {
        &self.data_devices
    }

    /// The surface's main resource and its owning client, or `None` if
    /// the surface is unknown or has already lost its main resource
    /// (§4.2).
    pub fn resource_and_client_for(&self, id: SurfaceId) -> Option<(WlSurface, ClientId)> {
        let record = self.surfaces.get(&id)?;
        let resource = record.main_resource.clone()?;
        Some((resource, record.owner))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // Surface-record round trips need a live ClientId, which can only
    // be minted from an actual client connection; those are covered in
    // tests/scenarios.rs alongside the rest of the facade/gateway
    // integration scenarios. These tests cover the bookkeeping that
    // does not depend on a connected client.

    #[test]
    fn region_round_trip() {
        let mut cache = CacheInner::new();
        let id = cache.create_region();
        assert!(cache.find_region(id).is_some());
        cache.find_region_mut(id).unwrap().rect.add(0, 0, 10, 10);
        assert_eq!(cache.find_region(id).unwrap().rect, Rect::new(0, 0, 10, 10));
        cache.remove_region(id);
        assert!(cache.find_region(id).is_none());
    }

    #[test]
    fn region_ids_are_unique() {
        let mut cache = CacheInner::new();
        let a = cache.create_region();
        let b = cache.create_region();
        assert_ne!(a, b);
    }

    #[test]
    fn missing_surface_lookups_are_none_not_panics() {
        let cache = CacheInner::new();
        assert!(cache.find_surface(SurfaceId::new(999)).is_none());
        assert!(cache.resource_and_client_for(SurfaceId::new(999)).is_none());
    }
}
