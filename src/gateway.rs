//! The outbound boundary (§4.4): every Wayland event sent to a client
//! originates from exactly one of these entries.
//!
//! `Gateway` itself only runs on the protocol thread. Coordinator
//! threads reach it indirectly: they hold a [`GatewayHandle`], whose
//! [`CoordinatorEvents`] methods marshal each call as a [`GatewayMessage`]
//! over a `calloop` channel (§10.1), and the protocol thread's event
//! loop drains the channel into [`Gateway::dispatch`].
//!
//! Austin Shafer - 2020

use std::collections::{HashMap, VecDeque};

use wayland_protocols::xdg::shell::server::xdg_toplevel;
use wayland_server::protocol::wl_data_device::WlDataDevice;
use wayland_server::protocol::wl_data_offer::WlDataOffer;
use wayland_server::protocol::wl_data_source::WlDataSource;
use wayland_server::protocol::wl_pointer::{Axis, ButtonState, WlPointer};
use wayland_server::protocol::wl_shell_surface::WlShellSurface;
use wayland_server::{DisplayHandle, Fixed, Resource};

use crate::cache::Cache;
use crate::coordinator::{CoordinatorEvents, OutputInfo, SurfaceStateFlags};
use crate::geometry::{Position, Size};
use crate::ids::{ClientId, SerialCounter, SurfaceId};
use crate::keyboard_state::KeyboardState;
use crate::state::Wayfront;
use crate::transfer::Transfer;
use std::sync::Arc;

/// The single outbound boundary. Owns the pieces of "Wayland state"
/// that sit outside the cache (§3: current focus, the active
/// selection, xkb state) because only the gateway's serialized view of
/// a focus epoch can keep them consistent.
pub struct Gateway {
    cache: Arc<Cache>,
    serials: Arc<SerialCounter>,
    dh: DisplayHandle,
    keyboard_state: KeyboardState,
    keyboard_focus_sid: SurfaceId,
    keyboard_focus_client: Option<ClientId>,
    pointer_focus_sid: SurfaceId,
    pointer_focus_client: Option<ClientId>,
    selection: Option<Transfer>,
    outputs: HashMap<String, wayland_server::backend::GlobalId>,
}

impl Gateway {
    pub fn new(
        cache: Arc<Cache>,
        serials: Arc<SerialCounter>,
        dh: DisplayHandle,
        keyboard_state: KeyboardState,
    ) -> Self {
        Gateway {
            cache,
            serials,
            dh,
            keyboard_state,
            keyboard_focus_sid: SurfaceId::none(),
            keyboard_focus_client: None,
            pointer_focus_sid: SurfaceId::none(),
            pointer_focus_client: None,
            selection: None,
            outputs: HashMap::new(),
        }
    }

    pub fn keyboard_focus_sid(&self) -> SurfaceId {
        self.keyboard_focus_sid
    }

    pub fn keyboard_focus_client(&self) -> Option<ClientId> {
        self.keyboard_focus_client
    }

    pub fn pointer_focus_sid(&self) -> SurfaceId {
        self.pointer_focus_sid
    }

    pub fn pointer_focus_client(&self) -> Option<ClientId> {
        self.pointer_focus_client
    }

    /// Used by [`crate::facade::Facade::send_selection`] to promote a
    /// transfer under construction to the current selection before
    /// immediately offering it (§4.3).
    pub fn set_selection(&mut self, transfer: Transfer) {
        self.selection = Some(transfer);
    }

    /// §4.4 "Frame refresh": release the attached buffer, then drain
    /// queued frame callbacks in FIFO order.
    pub fn screen_refresh(&mut self, sid: SurfaceId, timestamp_ms: u32) {
        let (buffer, callbacks) = {
            let mut cache = self.cache.lock();
            let record = match cache.find_surface_mut(sid) {
                Some(r) => r,
                None => return,
            };
            let buffer = record.buffer.take();
            let callbacks: VecDeque<_> = record.frame_callbacks.drain(..).collect();
            (buffer, callbacks)
        };

        if let Some(buffer) = buffer {
            buffer.release();
        }
        for callback in callbacks {
            callback.done(timestamp_ms);
        }
    }

    /// A new output appeared: create its `wl_output` global, keyed by
    /// name so a later loss can find it again (§4.1/§6). Replaces any
    /// stale global already registered under the same name.
    fn output_found(&mut self, info: OutputInfo) {
        let name = info.name.clone();
        let id = crate::protocol::output::register(&self.dh, info);
        if let Some(old) = self.outputs.insert(name, id) {
            crate::protocol::output::unregister(&self.dh, old);
        }
    }

    fn output_lost(&mut self, name: &str) {
        match self.outputs.remove(name) {
            Some(id) => crate::protocol::output::unregister(&self.dh, id),
            None => crate::debug!("output lost: no global registered for {}", name),
        }
    }

    /// §4.4 "Keyboard focus update": leave/enter pair when the owning
    /// client actually changes, immediately followed by the current
    /// selection offer; both surfaces are then reconfigured either way.
    pub fn keyboard_focus_update(
        &mut self,
        old_sid: SurfaceId,
        old_size: Size,
        old_flags: SurfaceStateFlags,
        new_sid: SurfaceId,
        new_size: Size,
        new_flags: SurfaceStateFlags,
    ) {
        let old_client = self.cache.lock().resource_and_client_for(old_sid).map(|(_, c)| c);
        let new_client = self.cache.lock().resource_and_client_for(new_sid).map(|(_, c)| c);

        if old_client != new_client {
            self.keyboard_focus_sid = SurfaceId::none();

            if let Some(old_client) = old_client {
                let serial = self.serials.next_serial();
                let cache = self.cache.lock();
                if let Some(main) = main_resource_for_notify(&cache, old_sid) {
                    for (kbd, client) in cache.keyboards() {
                        if *client == old_client {
                            kbd.leave(serial, &main);
                        }
                    }
                }
            }
            if let Some(new_client) = new_client {
                let serial = self.serials.next_serial();
                let cache = self.cache.lock();
                if let Some(main) = cache.find_surface(new_sid).and_then(|r| r.main_resource.clone()) {
                    for (kbd, client) in cache.keyboards() {
                        if *client == new_client {
                            kbd.enter(serial, &main, Vec::new());
                        }
                    }
                }
            }

            self.keyboard_focus_sid = new_sid;
            self.keyboard_focus_client = new_client;
            self.send_selection();
        }

        self.surface_reconfigure(old_sid, old_size, old_flags);
        self.surface_reconfigure(new_sid, new_size, new_flags);
    }

    /// §4.4 "Key event": update xkb, deliver `key` to the focused
    /// client's keyboards, and follow with `modifiers` iff they changed.
    pub fn key_event(&mut self, time: u32, keycode: u32, pressed: bool) {
        let (before, after) = self.keyboard_state.update_key(keycode, pressed);

        if self.keyboard_focus_sid.is_none() {
            return;
        }
        let focused_client = match self.keyboard_focus_client {
            Some(c) => c,
            None => return,
        };

        let wire_state = if pressed {
            wayland_server::protocol::wl_keyboard::KeyState::Pressed
        } else {
            wayland_server::protocol::wl_keyboard::KeyState::Released
        };

        let cache = self.cache.lock();
        for (kbd, client) in cache.keyboards() {
            if *client != focused_client {
                continue;
            }
            let serial = self.serials.next_serial();
            kbd.key(serial, time, keycode, wire_state);
            if before != after {
                kbd.modifiers(serial, after.depressed, after.latched, after.locked, after.group);
            }
        }
    }

    /// §4.4 "Pointer focus update": same leave/enter pattern as
    /// keyboard, carrying the surface-local position.
    pub fn pointer_focus_update(&mut self, new_sid: SurfaceId, pos: Position) {
        let old_sid = self.pointer_focus_sid;
        let old_client = self.cache.lock().resource_and_client_for(old_sid).map(|(_, c)| c);
        let new_client = self.cache.lock().resource_and_client_for(new_sid).map(|(_, c)| c);

        if old_client != new_client {
            if let Some(old_client) = old_client {
                let serial = self.serials.next_serial();
                let cache = self.cache.lock();
                for (ptr, client) in cache.pointers() {
                    if *client == old_client {
                        if let Some(main) = cache.find_surface(old_sid).and_then(|r| r.main_resource.clone()) {
                            ptr.leave(serial, &main);
                        }
                    }
                }
            }
            if let Some(new_client) = new_client {
                let serial = self.serials.next_serial();
                let cache = self.cache.lock();
                if let Some(main) = cache.find_surface(new_sid).and_then(|r| r.main_resource.clone()) {
                    for (ptr, client) in cache.pointers() {
                        if *client == new_client {
                            ptr.enter(serial, &main, Fixed::from(pos.x), Fixed::from(pos.y));
                        }
                    }
                }
            }
        }

        self.pointer_focus_sid = new_sid;
        self.pointer_focus_client = new_client;
    }

    pub fn pointer_motion(&self, time: u32, pos: Position) {
        let focused_client = match self.pointer_focus_client {
            Some(c) => c,
            None => return,
        };
        let cache = self.cache.lock();
        for (ptr, client) in cache.pointers() {
            if *client == focused_client {
                ptr.motion(time, Fixed::from(pos.x), Fixed::from(pos.y));
            }
        }
    }

    pub fn pointer_button(&self, time: u32, code: u32, pressed: bool) {
        let focused_client = match self.pointer_focus_client {
            Some(c) => c,
            None => return,
        };
        let state = if pressed {
            ButtonState::Pressed
        } else {
            ButtonState::Released
        };
        let cache = self.cache.lock();
        for (ptr, client) in cache.pointers() {
            if *client == focused_client {
                let serial = self.serials.next_serial();
                ptr.button(serial, time, code, state);
            }
        }
    }

    /// §4.4 "Pointer axis": per direction, `axis_discrete` (if present)
    /// then either `axis` or `axis_stop`.
    pub fn pointer_axis(&self, time: u32, horizontal: f64, vertical: f64, h_discrete: i32, v_discrete: i32) {
        let focused_client = match self.pointer_focus_client {
            Some(c) => c,
            None => return,
        };
        let cache = self.cache.lock();
        for (ptr, client) in cache.pointers() {
            if *client != focused_client {
                continue;
            }
            emit_axis(ptr, time, Axis::HorizontalScroll, horizontal, h_discrete);
            emit_axis(ptr, time, Axis::VerticalScroll, vertical, v_discrete);
        }
    }

    /// §4.4 "Surface reconfiguration": wl-shell wins over xdg-shell
    /// when a surface somehow carries both (§9 design note).
    pub fn surface_reconfigure(&mut self, sid: SurfaceId, size: Size, flags: SurfaceStateFlags) {
        if sid.is_none() {
            return;
        }
        let cache = self.cache.lock();
        let record = match cache.find_surface(sid) {
            Some(r) => r,
            None => return,
        };

        if let Some(wl_shell_surface) = &record.wl_shell_surface {
            wl_shell_surface.configure(0, size.width, size.height);
            return;
        }

        if let (Some(xdg_surface), Some(xdg_toplevel)) = (&record.xdg_surface, &record.xdg_toplevel) {
            let mut states = Vec::new();
            if flags.contains(SurfaceStateFlags::MAXIMIZED) {
                states.extend_from_slice(&(xdg_toplevel::State::Maximized as u32).to_ne_bytes());
            }
            if sid == self.keyboard_focus_sid {
                states.extend_from_slice(&(xdg_toplevel::State::Activated as u32).to_ne_bytes());
            }
            xdg_toplevel.configure(size.width, size.height, states);
            let serial = self.serials.next_serial();
            xdg_surface.configure(serial);
        }
    }

    /// §4.4 "Send selection": offer the current selection to the
    /// keyboard-focused client's data devices.
    pub fn send_selection(&mut self) {
        let transfer = match &self.selection {
            Some(t) => t,
            None => return,
        };
        let focused_client = match self.keyboard_focus_client {
            Some(c) => c,
            None => return,
        };

        let cache = self.cache.lock();
        for (device, client) in cache.data_devices() {
            if *client != focused_client {
                continue;
            }
            let offer = match make_data_offer(device, &self.dh, transfer.source.clone()) {
                Some(o) => o,
                None => {
                    crate::error!("send_selection: failed to create wl_data_offer for a client");
                    continue;
                }
            };
            device.data_offer(&offer);
            for mime in &transfer.mime_types {
                offer.offer(mime.clone());
            }
            offer.action(wayland_server::protocol::wl_data_device_manager::DndAction::Copy);
            device.selection(Some(&offer));
        }
    }
}

fn emit_axis(ptr: &WlPointer, time: u32, axis: Axis, value: f64, discrete: i32) {
    if discrete != 0 {
        ptr.axis_discrete(axis, discrete);
    }
    if value != 0.0 {
        ptr.axis(time, axis, Fixed::from(value));
    } else {
        ptr.axis_stop(time, axis);
    }
}

/// The offer's user data is the source it was created from, so
/// `wl_data_offer.receive` (§4.5/protocol::data_device) knows which
/// source to forward the paste request to.
fn make_data_offer(device: &WlDataDevice, dh: &DisplayHandle, source: WlDataSource) -> Option<WlDataOffer> {
    let client = device.client(dh)?;
    client
        .create_resource::<WlDataOffer, WlDataSource, Wayfront>(dh, device.version(), source)
        .ok()
}

/// A surface's main resource may already be gone by the time its old
/// focus owner is notified (the client could have disconnected between
/// the coordinator's decision and this emission); `None` means skip.
fn main_resource_for_notify(
    cache: &std::sync::MutexGuard<'_, crate::cache::CacheInner>,
    sid: SurfaceId,
) -> Option<wayland_server::protocol::wl_surface::WlSurface> {
    cache.find_surface(sid).and_then(|r| r.main_resource.clone())
}

/// Everything a protocol-thread event loop needs to drain from the
/// coordinator-events channel into [`Gateway`] method calls (§10.1).
pub enum GatewayMessage {
    SurfaceFrame(SurfaceId, u32),
    KeyboardFocusChanged {
        old_sid: SurfaceId,
        old_size: Size,
        old_flags: SurfaceStateFlags,
        new_sid: SurfaceId,
        new_size: Size,
        new_flags: SurfaceStateFlags,
    },
    PointerFocusChanged(SurfaceId, Position),
    KeyboardEvent(u32, u32, bool),
    PointerRelativeMotion(SurfaceId, Position),
    PointerButton(u32, u32, bool),
    PointerAxis(f64, f64, i32, i32),
    SurfaceReconfigured(SurfaceId, Size, SurfaceStateFlags),
    OutputFound(OutputInfo),
    OutputLost(String),
    Finalize,
}

impl Gateway {
    /// Apply one message marshaled across the channel from a
    /// coordinator thread. Only ever called on the protocol thread.
    pub fn dispatch(&mut self, msg: GatewayMessage) {
        match msg {
            GatewayMessage::SurfaceFrame(sid, ts) => self.screen_refresh(sid, ts),
            GatewayMessage::KeyboardFocusChanged {
                old_sid,
                old_size,
                old_flags,
                new_sid,
                new_size,
                new_flags,
            } => self.keyboard_focus_update(old_sid, old_size, old_flags, new_sid, new_size, new_flags),
            GatewayMessage::PointerFocusChanged(sid, pos) => self.pointer_focus_update(sid, pos),
            GatewayMessage::KeyboardEvent(time, code, pressed) => self.key_event(time, code, pressed),
            GatewayMessage::PointerRelativeMotion(_sid, pos) => self.pointer_motion(0, pos),
            GatewayMessage::PointerButton(time, code, pressed) => self.pointer_button(time, code, pressed),
            GatewayMessage::PointerAxis(h, v, hd, vd) => self.pointer_axis(0, h, v, hd, vd),
            GatewayMessage::SurfaceReconfigured(sid, size, flags) => self.surface_reconfigure(sid, size, flags),
            GatewayMessage::OutputFound(info) => self.output_found(info),
            GatewayMessage::OutputLost(name) => self.output_lost(&name),
            GatewayMessage::Finalize => {
                crate::info!("coordinator requested shutdown");
            }
        }
    }
}

/// The [`CoordinatorEvents`] side of the boundary: a cheap, `Send +
/// Sync` handle the coordinator's own thread(s) can call freely. Every
/// method just marshals its arguments across a `calloop` channel; the
/// real work happens in [`Gateway::dispatch`] on the protocol thread.
#[derive(Clone)]
pub struct GatewayHandle {
    sender: calloop::channel::Sender<GatewayMessage>,
}

impl GatewayHandle {
    pub fn new(sender: calloop::channel::Sender<GatewayMessage>) -> Self {
        GatewayHandle { sender }
    }

    fn send(&self, msg: GatewayMessage) {
        if self.sender.send(msg).is_err() {
            crate::error!("coordinator event dropped: protocol thread channel is gone");
        }
    }
}

impl CoordinatorEvents for GatewayHandle {
    fn on_surface_frame(&self, sid: SurfaceId, timestamp_ms: u32) {
        self.send(GatewayMessage::SurfaceFrame(sid, timestamp_ms));
    }

    fn on_keyboard_focus_changed(
        &self,
        old_sid: SurfaceId,
        old_size: Size,
        old_flags: SurfaceStateFlags,
        new_sid: SurfaceId,
        new_size: Size,
        new_flags: SurfaceStateFlags,
    ) {
        self.send(GatewayMessage::KeyboardFocusChanged {
            old_sid,
            old_size,
            old_flags,
            new_sid,
            new_size,
            new_flags,
        });
    }

    fn on_pointer_focus_changed(&self, sid: SurfaceId, pos: Position) {
        self.send(GatewayMessage::PointerFocusChanged(sid, pos));
    }

    fn on_keyboard_event(&self, time: u32, keycode: u32, pressed: bool) {
        self.send(GatewayMessage::KeyboardEvent(time, keycode, pressed));
    }

    fn on_pointer_relative_motion(&self, sid: SurfaceId, pos: Position) {
        self.send(GatewayMessage::PointerRelativeMotion(sid, pos));
    }

    fn on_pointer_button(&self, time: u32, code: u32, pressed: bool) {
        self.send(GatewayMessage::PointerButton(time, code, pressed));
    }

    fn on_pointer_axis(&self, horizontal: f64, vertical: f64, h_discrete: i32, v_discrete: i32) {
        self.send(GatewayMessage::PointerAxis(horizontal, vertical, h_discrete, v_discrete));
    }

    fn on_surface_reconfigured(&self, sid: SurfaceId, size: Size, flags: SurfaceStateFlags) {
        self.send(GatewayMessage::SurfaceReconfigured(sid, size, flags));
    }

    fn on_output_found(&self, output: OutputInfo) {
        self.send(GatewayMessage::OutputFound(output));
    }

    fn on_output_lost(&self, name: &str) {
        self.send(GatewayMessage::OutputLost(name.to_string()));
    }

    fn finalize(&self) {
        self.send(GatewayMessage::Finalize);
    }
}

