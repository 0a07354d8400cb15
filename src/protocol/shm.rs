//! `wl_shm`, `wl_shm_pool` and shm-backed `wl_buffer` (§6 "Wire
//! protocols"): the one pixel-source transport the frontend understands
//! natively. Not one of spec.md's originally enumerated protocol
//! handlers, but required for §4.3's `surface_attach` to ever see real
//! pixels; grounded in the teacher's own shm module.
//!
//! Austin Shafer - 2020

use std::ffi::c_void;
use std::os::unix::io::{AsRawFd, RawFd};
use std::sync::{Arc, Mutex};

use nix::{sys::mman, unistd};
use wayland_server::protocol::{wl_buffer, wl_shm, wl_shm_pool};
use wayland_server::{Client, DataInit, Dispatch, DisplayHandle, GlobalDispatch, New, Resource};

use crate::facade::AttachedBuffer;
use crate::state::Wayfront;

pub(crate) fn register(dh: &DisplayHandle) {
    dh.create_global::<Wayfront, wl_shm::WlShm, ()>(1, ());
}

impl GlobalDispatch<wl_shm::WlShm, ()> for Wayfront {
    fn bind(
        _state: &mut Self,
        _handle: &DisplayHandle,
        _client: &Client,
        resource: New<wl_shm::WlShm>,
        _global_data: &(),
        data_init: &mut DataInit<'_, Self>,
    ) {
        let shm = data_init.init(resource, ());
        shm.format(wl_shm::Format::Argb8888);
        shm.format(wl_shm::Format::Xrgb8888);
    }
}

impl Dispatch<wl_shm::WlShm, ()> for Wayfront {
    fn request(
        _state: &mut Self,
        _client: &Client,
        resource: &wl_shm::WlShm,
        request: wl_shm::Request,
        _data: &(),
        _dhandle: &DisplayHandle,
        data_init: &mut DataInit<'_, Self>,
    ) {
        match request {
            wl_shm::Request::CreatePool { id, fd, size } => {
                if size <= 0 {
                    resource.post_error(wl_shm::Error::InvalidFd as u32, "invalid pool size".to_string());
                    return;
                }
                match ShmRegion::new(fd.as_raw_fd(), size as usize) {
                    Some(region) => {
                        std::mem::forget(fd);
                        data_init.init(id, Arc::new(Mutex::new(region)));
                    }
                    None => resource.post_error(wl_shm::Error::InvalidFd as u32, "mmap failed".to_string()),
                }
            }
            _ => unreachable!(),
        }
    }
}

impl Dispatch<wl_shm_pool::WlShmPool, Arc<Mutex<ShmRegion>>> for Wayfront {
    fn request(
        _state: &mut Self,
        _client: &Client,
        resource: &wl_shm_pool::WlShmPool,
        request: wl_shm_pool::Request,
        data: &Arc<Mutex<ShmRegion>>,
        _dhandle: &DisplayHandle,
        data_init: &mut DataInit<'_, Self>,
    ) {
        match request {
            wl_shm_pool::Request::CreateBuffer {
                id,
                offset,
                width,
                height,
                stride,
                format,
            } => {
                let format = match format.into_result() {
                    Ok(f) => f,
                    Err(_) => {
                        resource.post_error(wl_shm::Error::InvalidFormat as u32, "bad format enum".to_string());
                        return;
                    }
                };
                if format != wl_shm::Format::Xrgb8888 && format != wl_shm::Format::Argb8888 {
                    resource.post_error(
                        wl_shm::Error::InvalidFormat as u32,
                        format!("shm format {:?} is not supported", format),
                    );
                    return;
                }
                let buf = ShmBuffer {
                    region: data.clone(),
                    offset,
                    width,
                    height,
                    stride,
                    format,
                };
                crate::debug!("wl_shm_pool: created {}x{} buffer", width, height);
                data_init.init(id, Arc::new(buf));
            }
            wl_shm_pool::Request::Resize { size } => {
                data.lock().unwrap().resize(size as usize);
            }
            wl_shm_pool::Request::Destroy => {}
            _ => unreachable!(),
        }
    }
}

/// An mmapped region of shared memory, owned jointly by a `wl_shm_pool`
/// resource and every `ShmBuffer` carved from it (§3 "attached buffer").
pub struct ShmRegion {
    fd: RawFd,
    ptr: *mut c_void,
    size: usize,
}

// SAFETY: the raw pointer is a read-only mmap of client-shared memory;
// nothing here mutates through it from more than one thread at a time.
unsafe impl Send for ShmRegion {}

impl ShmRegion {
    fn new(fd: RawFd, size: usize) -> Option<ShmRegion> {
        let ptr = unsafe {
            mman::mmap(
                std::ptr::null_mut(),
                size,
                mman::ProtFlags::PROT_READ,
                mman::MapFlags::MAP_SHARED,
                fd,
                0,
            )
            .ok()?
        };
        Some(ShmRegion { fd, ptr, size })
    }

    /// Pools only grow (§9 teacher behavior: "shrinking a pool is not
    /// supported"); remap at the new size.
    fn resize(&mut self, size: usize) {
        if size <= self.size {
            return;
        }
        match unsafe {
            mman::mmap(
                std::ptr::null_mut(),
                size,
                mman::ProtFlags::PROT_READ,
                mman::MapFlags::MAP_SHARED,
                self.fd,
                0,
            )
        } {
            Ok(ptr) => {
                let _ = unsafe { mman::munmap(self.ptr, self.size) };
                self.ptr = ptr;
                self.size = size;
            }
            Err(e) => crate::error!("wl_shm_pool.resize: mmap failed: {}", e),
        }
    }
}

impl Drop for ShmRegion {
    fn drop(&mut self) {
        unsafe {
            let _ = mman::munmap(self.ptr, self.size);
        }
        let _ = unistd::close(self.fd);
    }
}

/// A `wl_buffer` carved out of a `ShmRegion`; this is the userdata
/// stored on the `wl_buffer` resource itself.
pub struct ShmBuffer {
    region: Arc<Mutex<ShmRegion>>,
    offset: i32,
    pub width: i32,
    pub height: i32,
    stride: i32,
    #[allow(dead_code)]
    format: wl_shm::Format,
}

impl ShmBuffer {
    /// Build the classified view `wl_surface.attach` hands to the
    /// facade (§4.3). The pointer is valid only while the client keeps
    /// the backing pool mapped; the coordinator is expected to copy out
    /// what it needs before returning from `surface_attach`.
    pub(crate) fn attached(&self) -> AttachedBuffer {
        let region = self.region.lock().unwrap();
        let data = unsafe { region.ptr.offset(self.offset as isize) } as *const u8;
        AttachedBuffer::Shm {
            width: self.width,
            height: self.height,
            stride: self.stride,
            data,
        }
    }
}

impl Dispatch<wl_buffer::WlBuffer, Arc<ShmBuffer>> for Wayfront {
    fn request(
        _state: &mut Self,
        _client: &Client,
        _resource: &wl_buffer::WlBuffer,
        request: wl_buffer::Request,
        _data: &Arc<ShmBuffer>,
        _dhandle: &DisplayHandle,
        _data_init: &mut DataInit<'_, Self>,
    ) {
        match request {
            wl_buffer::Request::Destroy => {}
            _ => unreachable!(),
        }
    }

    fn destroyed(
        _state: &mut Self,
        _client: wayland_server::backend::ClientId,
        _object: wayland_server::backend::ObjectId,
        _data: &Arc<ShmBuffer>,
    ) {
        // The backing ShmRegion unmaps itself via Drop once the last
        // Arc reference (this one) goes away; no explicit fd close here.
    }
}

// Real `wl_buffer` resources can only be constructed from in here: the
// equality and buffer-release scenarios (§8 S1, S3) need a live
// ShmBuffer, and its fields are private by design (§9). Everything
// else in §8 is covered by the black-box tests in tests/scenarios.rs.
#[cfg(test)]
mod tests {
    use super::*;
    use std::os::unix::io::AsRawFd;
    use std::os::unix::net::UnixStream;

    use wayland_server::backend::{ClientData, ClientId as BackendClientId, DisconnectReason};
    use wayland_server::protocol::wl_callback::WlCallback;
    use wayland_server::protocol::wl_shell_surface::WlShellSurface;
    use wayland_server::protocol::wl_surface::WlSurface;
    use wayland_server::Display;

    use crate::cache::{Cache, SurfaceResource, SurfaceRole};
    use crate::config::EngineConfig;
    use crate::coordinator::test_stub::StubCoordinator;
    use crate::coordinator::{Coordinator, ShowReason};
    use crate::gateway::Gateway;
    use crate::ids::{ClientId, SerialCounter, SurfaceId};
    use crate::keyboard_state::KeyboardState;
    use std::sync::Mutex as StdMutex;

    #[derive(Debug, Default)]
    struct NullClientData;

    impl ClientData for NullClientData {
        fn initialized(&self, _client_id: BackendClientId) {}
        fn disconnected(&self, _client_id: BackendClientId, _reason: DisconnectReason) {}
    }

    fn harness() -> (Display<Wayfront>, Wayfront, Client, Arc<StdMutex<StubCoordinator>>) {
        let display = Display::<Wayfront>::new().expect("display");
        let dh = display.handle();

        let stub = Arc::new(StdMutex::new(StubCoordinator::new()));
        let coordinator: Arc<StdMutex<dyn Coordinator>> = stub.clone();

        let config = EngineConfig::default();
        let keyboard_state = KeyboardState::new(&config).expect("keymap should compile");

        let cache = Arc::new(Cache::new());
        let serials = Arc::new(SerialCounter::new());
        let gateway = Gateway::new(cache.clone(), serials.clone(), dh.clone(), keyboard_state);
        let state = Wayfront::new(cache, coordinator, serials, gateway);

        let (sock, _peer) = UnixStream::pair().expect("socketpair");
        let client = dh
            .insert_client(sock, Arc::new(NullClientData))
            .expect("insert_client");
        (display, state, client, stub)
    }

    /// Back a `ShmBuffer` with a real, sized fd (an unnamed temp file
    /// stands in for the client's shm pool) so `ShmRegion::new`'s mmap
    /// succeeds exactly as it would against a real client pool.
    fn make_shm_buffer(width: i32, height: i32, stride: i32) -> Arc<ShmBuffer> {
        let file = tempfile::tempfile().expect("tempfile");
        file.set_len((stride as u64) * (height as u64)).expect("set_len");
        let region = ShmRegion::new(file.as_raw_fd(), (stride * height) as usize).expect("mmap");
        std::mem::forget(file);
        Arc::new(ShmBuffer {
            region: Arc::new(Mutex::new(region)),
            offset: 0,
            width,
            height,
            stride,
            format: wl_shm::Format::Xrgb8888,
        })
    }

    #[test]
    fn s1_single_client_single_toplevel_window() {
        let (display, state, client, stub) = harness();
        let dh = display.handle();

        let sid = state.facade.create_surface();
        let surface = client
            .create_resource::<WlSurface, SurfaceId, Wayfront>(&dh, 1, sid)
            .expect("wl_surface");
        state
            .facade
            .add_surface(sid, ClientId::from_backend(client.id()), surface);

        let shell_surface = client
            .create_resource::<WlShellSurface, SurfaceId, Wayfront>(&dh, 1, sid)
            .expect("wl_shell_surface");
        let accepted = state.facade.add_shell_surface(
            sid,
            SurfaceRole::WlShellToplevel,
            SurfaceResource::WlShellSurface(shell_surface),
            ShowReason::ShellSurfaceAssigned,
        );
        assert!(accepted);

        let buf = make_shm_buffer(100, 50, 400);
        let buffer = client
            .create_resource::<wl_buffer::WlBuffer, Arc<ShmBuffer>, Wayfront>(&dh, 1, buf.clone())
            .expect("wl_buffer");
        state.facade.surface_attach(sid, buffer, buf.attached());
        state.facade.commit(sid);

        let calls = stub.lock().unwrap().calls.lock().unwrap().clone();
        assert_eq!(
            calls,
            vec![
                "surface_create -> 1".to_string(),
                "surface_show(SurfaceId(1), ShellSurfaceAssigned)".to_string(),
                "surface_attach(SurfaceId(1), 100, 50, 400)".to_string(),
                "surface_commit(SurfaceId(1))".to_string(),
            ]
        );
    }

    #[test]
    fn s3_frame_callback_releases_buffer_in_order() {
        let (display, mut state, client, _stub) = harness();
        let dh = display.handle();

        let sid = state.facade.create_surface();
        let surface = client
            .create_resource::<WlSurface, SurfaceId, Wayfront>(&dh, 1, sid)
            .expect("wl_surface");
        state
            .facade
            .add_surface(sid, ClientId::from_backend(client.id()), surface);

        let buf1 = make_shm_buffer(10, 10, 40);
        let buffer1 = client
            .create_resource::<wl_buffer::WlBuffer, Arc<ShmBuffer>, Wayfront>(&dh, 1, buf1.clone())
            .expect("wl_buffer 1");
        state.facade.surface_attach(sid, buffer1, buf1.attached());

        let cb1 = client
            .create_resource::<WlCallback, (), Wayfront>(&dh, 1, ())
            .expect("callback 1");
        state.facade.add_frame_callback(sid, cb1);
        state.facade.commit(sid);

        assert!(state.cache.lock().find_surface(sid).unwrap().buffer.is_some());
        assert_eq!(state.cache.lock().find_surface(sid).unwrap().frame_callbacks.len(), 1);

        state.gateway.screen_refresh(sid, 1000);

        assert!(state.cache.lock().find_surface(sid).unwrap().buffer.is_none());
        assert_eq!(state.cache.lock().find_surface(sid).unwrap().frame_callbacks.len(), 0);

        // A second attach + a pair of callbacks drains both in order,
        // releasing the newly attached buffer along the way.
        let buf2 = make_shm_buffer(20, 20, 80);
        let buffer2 = client
            .create_resource::<wl_buffer::WlBuffer, Arc<ShmBuffer>, Wayfront>(&dh, 1, buf2.clone())
            .expect("wl_buffer 2");
        state.facade.surface_attach(sid, buffer2, buf2.attached());
        let cb2 = client
            .create_resource::<WlCallback, (), Wayfront>(&dh, 1, ())
            .expect("callback 2");
        let cb3 = client
            .create_resource::<WlCallback, (), Wayfront>(&dh, 1, ())
            .expect("callback 3");
        state.facade.add_frame_callback(sid, cb2);
        state.facade.add_frame_callback(sid, cb3);
        assert_eq!(state.cache.lock().find_surface(sid).unwrap().frame_callbacks.len(), 2);

        state.gateway.screen_refresh(sid, 2000);

        assert!(state.cache.lock().find_surface(sid).unwrap().buffer.is_none());
        assert_eq!(state.cache.lock().find_surface(sid).unwrap().frame_callbacks.len(), 0);
    }
}
