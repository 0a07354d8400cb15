//! `xdg_wm_base`, `xdg_surface`, `xdg_toplevel`, `xdg_popup` and
//! `xdg_positioner` (§4.5): the modern toplevel/popup shell.
//!
//! Austin Shafer - 2020

use std::sync::Mutex;

use wayland_protocols::xdg::shell::server::{
    xdg_popup, xdg_positioner, xdg_surface, xdg_toplevel, xdg_wm_base,
};
use wayland_server::{Client, DataInit, Dispatch, DisplayHandle, GlobalDispatch, New, Resource};

use crate::cache::{RoleSlot, SurfaceResource, SurfaceRole};
use crate::coordinator::ShowReason;
use crate::geometry::{Position, Rect};
use crate::ids::SurfaceId;
use crate::state::Wayfront;

const VERSION: u32 = 3;

pub(crate) fn register(dh: &DisplayHandle) {
    dh.create_global::<Wayfront, xdg_wm_base::XdgWmBase, ()>(VERSION, ());
}

impl GlobalDispatch<xdg_wm_base::XdgWmBase, ()> for Wayfront {
    fn bind(
        _state: &mut Self,
        _handle: &DisplayHandle,
        _client: &Client,
        resource: New<xdg_wm_base::XdgWmBase>,
        _global_data: &(),
        data_init: &mut DataInit<'_, Self>,
    ) {
        data_init.init(resource, ());
    }
}

impl Dispatch<xdg_wm_base::XdgWmBase, ()> for Wayfront {
    fn request(
        state: &mut Self,
        _client: &Client,
        _resource: &xdg_wm_base::XdgWmBase,
        request: xdg_wm_base::Request,
        _data: &(),
        _dhandle: &DisplayHandle,
        data_init: &mut DataInit<'_, Self>,
    ) {
        match request {
            xdg_wm_base::Request::GetXdgSurface { id, surface } => {
                let sid = *surface.data::<SurfaceId>().expect("wl_surface carries a SurfaceId");
                let xdg_surface = data_init.init(id, sid);
                state.facade.store_xdg_surface(sid, xdg_surface);
            }
            xdg_wm_base::Request::CreatePositioner { id } => {
                data_init.init(id, Mutex::new(Positioner::default()));
            }
            xdg_wm_base::Request::Pong { .. } => {}
            xdg_wm_base::Request::Destroy => {}
            _ => unreachable!(),
        }
    }
}

impl Dispatch<xdg_surface::XdgSurface, SurfaceId> for Wayfront {
    fn request(
        state: &mut Self,
        _client: &Client,
        resource: &xdg_surface::XdgSurface,
        request: xdg_surface::Request,
        data: &SurfaceId,
        _dhandle: &DisplayHandle,
        data_init: &mut DataInit<'_, Self>,
    ) {
        let sid = *data;
        match request {
            xdg_surface::Request::GetToplevel { id } => {
                let toplevel = data_init.init(id, sid);
                let ok = state.facade.add_shell_surface(
                    sid,
                    SurfaceRole::XdgToplevel,
                    SurfaceResource::XdgToplevel(toplevel.clone()),
                    ShowReason::XdgSurfaceAssigned,
                );
                if !ok {
                    crate::debug!("xdg_surface.get_toplevel: surface already has a conflicting role");
                    return;
                }
                // width/height 0 means "client picks a size".
                toplevel.configure(0, 0, Vec::new());
                resource.configure(state.serials.next_serial());
            }
            xdg_surface::Request::GetPopup { id, parent, positioner } => {
                let popup = data_init.init(id, sid);
                let ok = state.facade.add_shell_surface(
                    sid,
                    SurfaceRole::XdgPopup,
                    SurfaceResource::XdgPopup(popup.clone()),
                    ShowReason::XdgSurfaceAssigned,
                );
                if !ok {
                    crate::debug!("xdg_surface.get_popup: surface already has a conflicting role");
                    return;
                }
                if let Some(parent) = parent {
                    let parent_sid = *parent
                        .data::<SurfaceId>()
                        .expect("xdg_surface carries a SurfaceId");
                    let (loc, size) = positioner
                        .data::<Mutex<Positioner>>()
                        .map(|p| {
                            let p = p.lock().unwrap();
                            (p.location(), p.size)
                        })
                        .unwrap_or_default();
                    state.facade.relate_satellite(sid, parent_sid, loc);
                    popup.configure(loc.x, loc.y, size.0, size.1);
                    resource.configure(state.serials.next_serial());
                } else {
                    crate::debug!("xdg_surface.get_popup: no parent surface given");
                }
            }
            xdg_surface::Request::AckConfigure { serial } => {
                crate::debug!("xdg_surface.ack_configure({}): {:?}", serial, sid);
            }
            xdg_surface::Request::SetWindowGeometry { .. } => {
                // Window geometry (the content sub-rect of the surface) is
                // not modeled; the coordinator always sizes from the
                // attached buffer (§1 Non-goals: frame composition).
            }
            xdg_surface::Request::Destroy => {}
            _ => unreachable!(),
        }
    }

    fn destroyed(state: &mut Self, _client: wayland_server::backend::ClientId, _object: wayland_server::backend::ObjectId, data: &SurfaceId) {
        state.facade.clear_role_resource(*data, RoleSlot::XdgSurface);
    }
}

impl Dispatch<xdg_toplevel::XdgToplevel, SurfaceId> for Wayfront {
    fn request(
        _state: &mut Self,
        _client: &Client,
        _resource: &xdg_toplevel::XdgToplevel,
        request: xdg_toplevel::Request,
        _data: &SurfaceId,
        _dhandle: &DisplayHandle,
        _data_init: &mut DataInit<'_, Self>,
    ) {
        match request {
            xdg_toplevel::Request::SetTitle { .. } | xdg_toplevel::Request::SetAppId { .. } => {
                // Window chrome/identification is not modeled by this
                // frontend; the coordinator has no consumer for it.
            }
            xdg_toplevel::Request::SetParent { .. } => {}
            xdg_toplevel::Request::Move { .. } | xdg_toplevel::Request::Resize { .. } => {
                crate::nyimp!("xdg_toplevel interactive move/resize is an input-layer concern");
            }
            xdg_toplevel::Request::ShowWindowMenu { .. } => {
                crate::nyimp!("xdg_toplevel.show_window_menu has no window-menu consumer");
            }
            xdg_toplevel::Request::SetMaxSize { .. }
            | xdg_toplevel::Request::SetMinSize { .. }
            | xdg_toplevel::Request::SetMaximized
            | xdg_toplevel::Request::UnsetMaximized
            | xdg_toplevel::Request::SetFullscreen { .. }
            | xdg_toplevel::Request::UnsetFullscreen
            | xdg_toplevel::Request::SetMinimized => {
                crate::nyimp!("xdg_toplevel size/state constraints are not enforced by the coordinator");
            }
            xdg_toplevel::Request::Destroy => {}
            _ => unreachable!(),
        }
    }

    fn destroyed(state: &mut Self, _client: wayland_server::backend::ClientId, _object: wayland_server::backend::ObjectId, data: &SurfaceId) {
        state.facade.clear_role_resource(*data, RoleSlot::XdgToplevel);
    }
}

impl Dispatch<xdg_popup::XdgPopup, SurfaceId> for Wayfront {
    fn request(
        state: &mut Self,
        _client: &Client,
        resource: &xdg_popup::XdgPopup,
        request: xdg_popup::Request,
        _data: &SurfaceId,
        _dhandle: &DisplayHandle,
        _data_init: &mut DataInit<'_, Self>,
    ) {
        match request {
            xdg_popup::Request::Destroy => {
                resource.popup_done();
            }
            xdg_popup::Request::Grab { .. } => {
                crate::nyimp!("xdg_popup.grab is an input-layer concern; dismissing immediately");
                resource.popup_done();
            }
            xdg_popup::Request::Reposition { .. } => {
                crate::nyimp!("xdg_popup.reposition: popups do not reposition after mapping");
            }
            _ => unreachable!(),
        }
    }

    fn destroyed(state: &mut Self, _client: wayland_server::backend::ClientId, _object: wayland_server::backend::ObjectId, data: &SurfaceId) {
        state.facade.clear_role_resource(*data, RoleSlot::XdgPopup);
    }
}

impl Dispatch<xdg_positioner::XdgPositioner, Mutex<Positioner>> for Wayfront {
    fn request(
        _state: &mut Self,
        _client: &Client,
        _resource: &xdg_positioner::XdgPositioner,
        request: xdg_positioner::Request,
        data: &Mutex<Positioner>,
        _dhandle: &DisplayHandle,
        _data_init: &mut DataInit<'_, Self>,
    ) {
        let mut pos = data.lock().unwrap();
        match request {
            xdg_positioner::Request::SetSize { width, height } => {
                pos.size = (width, height);
            }
            xdg_positioner::Request::SetAnchorRect { x, y, width, height } => {
                pos.anchor_rect = Rect::new(x, y, width, height);
            }
            xdg_positioner::Request::SetAnchor { anchor } => {
                pos.anchor = anchor.into_result().unwrap_or(xdg_positioner::Anchor::None);
            }
            xdg_positioner::Request::SetGravity { .. } => {}
            xdg_positioner::Request::SetConstraintAdjustment { .. } => {}
            xdg_positioner::Request::SetOffset { x, y } => {
                pos.offset = Position::new(x, y);
            }
            xdg_positioner::Request::SetReactive => {}
            xdg_positioner::Request::SetParentSize { .. } => {}
            xdg_positioner::Request::SetParentConfigure { .. } => {}
            xdg_positioner::Request::Destroy => {}
            _ => unreachable!(),
        }
    }
}

/// Accumulated `xdg_positioner` state (§4.5), reduced to the single
/// bounding-rect anchor model the rest of this crate uses for regions.
#[derive(Copy, Clone)]
pub struct Positioner {
    offset: Position,
    size: (i32, i32),
    anchor_rect: Rect,
    anchor: xdg_positioner::Anchor,
}

impl Default for Positioner {
    fn default() -> Self {
        Positioner {
            offset: Position::default(),
            size: (0, 0),
            anchor_rect: Rect::default(),
            anchor: xdg_positioner::Anchor::None,
        }
    }
}

impl Positioner {
    /// Resolve a surface-local popup position from the anchor rect and
    /// edge, plus the accumulated offset.
    fn location(&self) -> Position {
        let rect = &self.anchor_rect;
        let anchor = match self.anchor {
            xdg_positioner::Anchor::None => Position::new(0, 0),
            xdg_positioner::Anchor::Top => Position::new(rect.pos.x + rect.size.width / 2, rect.pos.y),
            xdg_positioner::Anchor::Bottom => {
                Position::new(rect.pos.x + rect.size.width / 2, rect.pos.y + rect.size.height)
            }
            xdg_positioner::Anchor::Left => Position::new(rect.pos.x, rect.pos.y + rect.size.height / 2),
            xdg_positioner::Anchor::Right => {
                Position::new(rect.pos.x + rect.size.width, rect.pos.y + rect.size.height / 2)
            }
            xdg_positioner::Anchor::TopLeft => Position::new(rect.pos.x, rect.pos.y),
            xdg_positioner::Anchor::BottomLeft => Position::new(rect.pos.x, rect.pos.y + rect.size.height),
            xdg_positioner::Anchor::TopRight => Position::new(rect.pos.x + rect.size.width, rect.pos.y),
            xdg_positioner::Anchor::BottomRight => {
                Position::new(rect.pos.x + rect.size.width, rect.pos.y + rect.size.height)
            }
            _ => Position::new(0, 0),
        };
        Position::new(anchor.x + self.offset.x, anchor.y + self.offset.y)
    }
}
