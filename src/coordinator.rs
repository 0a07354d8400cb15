//! The boundary contract with the compositor core (§6).
//!
//! The coordinator owns surface state, framing, focus and rendering;
//! none of that lives in this crate. Both directions of the boundary
//! are expressed as plain traits: [`Coordinator`] is implemented by
//! whatever owns surface state and is called by the [`facade`](crate::facade)
//! on every inbound client request; [`CoordinatorEvents`] is implemented
//! by this crate's [`gateway`](crate::gateway) and called by the
//! coordinator's own thread(s) whenever something happens that clients
//! need to hear about.
//!
//! Austin Shafer - 2020

use crate::geometry::{Position, Rect, Size};
use crate::ids::SurfaceId;
use std::os::unix::io::RawFd;

bitflags::bitflags! {
    /// Surface state flags carried by reconfiguration notifications
    /// (§4.4). Only `MAXIMIZED` and `ACTIVATED` are meaningful today;
    /// more xdg_toplevel states (fullscreen, resizing, tiled edges) can
    /// be added here without touching the gateway's dispatch logic.
    #[derive(Default)]
    pub struct SurfaceStateFlags: u32 {
        const MAXIMIZED = 0b0000_0001;
        const ACTIVATED = 0b0000_0010;
    }
}

/// Why a surface transitioned to "show" (mappable). Informational only;
/// the coordinator is free to ignore it.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum ShowReason {
    ShellSurfaceAssigned,
    XdgSurfaceAssigned,
}

/// One compositor output, as exposed to `wl_output` (§4.5/§6).
#[derive(Debug, Clone)]
pub struct OutputInfo {
    pub name: String,
    pub position: Position,
    pub physical_size_mm: Size,
    pub pixel_size: Size,
    pub refresh_mhz: i32,
    pub scale: i32,
}

/// The keymap handoff triple (§4.6/§6): a wire format tag, the size of
/// the keymap string in bytes, and an fd the client can mmap.
#[derive(Debug)]
pub struct Keymap {
    pub format: u32,
    pub size: u32,
    pub fd: RawFd,
}

/// Everything the facade needs to ask of the compositor core.
///
/// Every method here corresponds 1:1 to an operation in §6's
/// "Coordinator interface (consumed)" list, plus the output geometry
/// getters used to populate `wl_output` globals.
pub trait Coordinator: Send {
    fn surface_create(&mut self) -> SurfaceId;
    fn surface_destroy(&mut self, sid: SurfaceId);
    fn surface_commit(&mut self, sid: SurfaceId);
    fn surface_show(&mut self, sid: SurfaceId, reason: ShowReason);
    fn surface_attach(
        &mut self,
        sid: SurfaceId,
        width: i32,
        height: i32,
        stride: i32,
        data: *const u8,
    );
    fn surface_set_as_cursor(&mut self, sid: SurfaceId);

    fn surface_set_offset(&mut self, sid: SurfaceId, pos: Position);
    fn surface_set_requested_size(&mut self, sid: SurfaceId, size: Size);
    fn surface_reset_offset_and_requested_size(&mut self, sid: SurfaceId);
    fn surface_set_relative_position(&mut self, sid: SurfaceId, pos: Position);
    fn surface_relate(&mut self, sid: SurfaceId, parent_sid: SurfaceId);

    /// Not one of §6's originally enumerated operations, but needed to
    /// actually carry out the facade's documented `set_input_region`
    /// contract (§4.3); see DESIGN.md. `None` resets to the default
    /// (whole-surface) input region.
    fn surface_set_input_region(&mut self, sid: SurfaceId, region: Option<Rect>);

    fn output_get_name(&self, output_index: usize) -> Option<String>;
    fn output_get_area(&self, output_index: usize) -> Option<(Position, Size)>;
    fn output_get_physical_size(&self, output_index: usize) -> Option<Size>;

    fn keymap(&self) -> Keymap;
}

/// Everything the compositor core may tell the gateway.
///
/// Implemented by [`crate::gateway::Gateway`]; every method corresponds
/// to an entry in §6's "Coordinator interface (provided back)" list.
pub trait CoordinatorEvents: Send {
    fn on_surface_frame(&self, sid: SurfaceId, timestamp_ms: u32);
    fn on_keyboard_focus_changed(
        &self,
        old_sid: SurfaceId,
        old_size: Size,
        old_flags: SurfaceStateFlags,
        new_sid: SurfaceId,
        new_size: Size,
        new_flags: SurfaceStateFlags,
    );
    fn on_pointer_focus_changed(&self, sid: SurfaceId, pos: Position);
    fn on_keyboard_event(&self, time: u32, keycode: u32, pressed: bool);
    fn on_pointer_relative_motion(&self, sid: SurfaceId, pos: Position);
    fn on_pointer_button(&self, time: u32, code: u32, pressed: bool);
    fn on_pointer_axis(&self, horizontal: f64, vertical: f64, h_discrete: i32, v_discrete: i32);
    fn on_surface_reconfigured(&self, sid: SurfaceId, size: Size, flags: SurfaceStateFlags);
    fn on_output_found(&self, output: OutputInfo);
    fn on_output_lost(&self, name: &str);
    fn finalize(&self);
}

/// A minimal in-memory stand-in for [`Coordinator`], used only by this
/// crate's own tests so the frontend can be exercised without a real
/// compositor core. Not part of the production surface (§6); gated
/// behind `test-util` rather than bare `cfg(test)` so the integration
/// tests under `tests/` (compiled as a separate crate against this one
/// as an ordinary dependency) can reach it too.
#[cfg(any(test, feature = "test-util"))]
pub mod test_stub {
    use super::*;
    use std::sync::atomic::{AtomicU64, Ordering};
    use std::sync::Mutex;

    pub struct StubCoordinator {
        next_id: AtomicU64,
        pub calls: Mutex<Vec<String>>,
    }

    impl StubCoordinator {
        pub fn new() -> Self {
            StubCoordinator {
                next_id: AtomicU64::new(1),
                calls: Mutex::new(Vec::new()),
            }
        }

        fn record(&self, s: impl Into<String>) {
            self.calls.lock().unwrap().push(s.into());
        }
    }

    impl Coordinator for StubCoordinator {
        fn surface_create(&mut self) -> SurfaceId {
            let id = self.next_id.fetch_add(1, Ordering::SeqCst);
            self.record(format!("surface_create -> {}", id));
            SurfaceId::new(id)
        }

        fn surface_destroy(&mut self, sid: SurfaceId) {
            self.record(format!("surface_destroy({:?})", sid));
        }

        fn surface_commit(&mut self, sid: SurfaceId) {
            self.record(format!("surface_commit({:?})", sid));
        }

        fn surface_show(&mut self, sid: SurfaceId, reason: ShowReason) {
            self.record(format!("surface_show({:?}, {:?})", sid, reason));
        }

        fn surface_attach(
            &mut self,
            sid: SurfaceId,
            width: i32,
            height: i32,
            stride: i32,
            _data: *const u8,
        ) {
            self.record(format!(
                "surface_attach({:?}, {}, {}, {})",
                sid, width, height, stride
            ));
        }

        fn surface_set_as_cursor(&mut self, sid: SurfaceId) {
            self.record(format!("surface_set_as_cursor({:?})", sid));
        }

        fn surface_set_offset(&mut self, sid: SurfaceId, pos: Position) {
            self.record(format!("surface_set_offset({:?}, {:?})", sid, pos));
        }

        fn surface_set_requested_size(&mut self, sid: SurfaceId, size: Size) {
            self.record(format!("surface_set_requested_size({:?}, {:?})", sid, size));
        }

        fn surface_reset_offset_and_requested_size(&mut self, sid: SurfaceId) {
            self.record(format!("surface_reset_offset_and_requested_size({:?})", sid));
        }

        fn surface_set_relative_position(&mut self, sid: SurfaceId, pos: Position) {
            self.record(format!(
                "surface_set_relative_position({:?}, {:?})",
                sid, pos
            ));
        }

        fn surface_relate(&mut self, sid: SurfaceId, parent_sid: SurfaceId) {
            self.record(format!("surface_relate({:?}, {:?})", sid, parent_sid));
        }

        fn surface_set_input_region(&mut self, sid: SurfaceId, region: Option<Rect>) {
            self.record(format!("surface_set_input_region({:?}, {:?})", sid, region));
        }

        fn output_get_name(&self, _output_index: usize) -> Option<String> {
            Some("eDP-1".to_string())
        }

        fn output_get_area(&self, _output_index: usize) -> Option<(Position, Size)> {
            Some((Position::new(0, 0), Size::new(1920, 1080)))
        }

        fn output_get_physical_size(&self, _output_index: usize) -> Option<Size> {
            Some(Size::new(310, 170))
        }

        fn keymap(&self) -> Keymap {
            Keymap {
                format: 1,
                size: 0,
                fd: -1,
            }
        }
    }
}
