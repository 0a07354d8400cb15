//! Cross-module scenarios (§8) driven against the public API surface,
//! using a real `wayland_server::Client` minted over a socketpair so
//! surfaces, keyboards and data devices are backed by live resources
//! rather than hand-built fakes. Buffer-bearing scenarios (S1, and the
//! release half of S3) need a real SHM-backed `wl_buffer`, which can
//! only be constructed from inside `protocol::shm` itself (its buffer
//! type has no public constructor); those live in that module's own
//! `#[cfg(test)]` block instead.
//!
//! Austin Shafer - 2020

use std::os::unix::net::UnixStream;
use std::sync::{Arc, Mutex};

use wayland_server::backend::{ClientData, ClientId as BackendClientId, DisconnectReason};
use wayland_server::protocol::wl_callback::WlCallback;
use wayland_server::protocol::wl_data_device::WlDataDevice;
use wayland_server::protocol::wl_data_source::WlDataSource;
use wayland_server::protocol::wl_keyboard::WlKeyboard;
use wayland_server::protocol::wl_shell_surface::WlShellSurface;
use wayland_server::protocol::wl_surface::WlSurface;
use wayland_server::{Client, Display, DisplayHandle};

use wayfront::cache::{Cache, SurfaceResource, SurfaceRole};
use wayfront::coordinator::test_stub::StubCoordinator;
use wayfront::coordinator::{Coordinator, ShowReason};
use wayfront::gateway::Gateway;
use wayfront::ids::SerialCounter;
use wayfront::state::Wayfront;
use wayfront::{ClientId, EngineConfig, SurfaceId};

#[derive(Debug, Default)]
struct NullClientData;

impl ClientData for NullClientData {
    fn initialized(&self, _client_id: BackendClientId) {}
    fn disconnected(&self, _client_id: BackendClientId, _reason: DisconnectReason) {}
}

/// A display plus a `Wayfront` wired against a `StubCoordinator`, with
/// one real client already connected. Returns the stub so tests can
/// inspect the calls the facade forwarded to it.
fn harness() -> (Display<Wayfront>, Wayfront, Client, Arc<Mutex<StubCoordinator>>) {
    let display = Display::<Wayfront>::new().expect("failed to create display");
    let dh = display.handle();

    let stub = Arc::new(Mutex::new(StubCoordinator::new()));
    let coordinator: Arc<Mutex<dyn Coordinator>> = stub.clone();

    let config = EngineConfig::default();
    let keyboard_state = wayfront::keyboard_state::KeyboardState::new(&config).expect("keymap");

    let cache = Arc::new(Cache::new());
    let serials = Arc::new(SerialCounter::new());
    let gateway = Gateway::new(cache.clone(), serials.clone(), dh.clone(), keyboard_state);
    let state = Wayfront::new(cache, coordinator, serials, gateway);

    let client = new_client(&dh);
    (display, state, client, stub)
}

fn new_client(dh: &DisplayHandle) -> Client {
    let (sock, _peer) = UnixStream::pair().expect("socketpair");
    dh.insert_client(sock, Arc::new(NullClientData)).expect("insert_client")
}

fn owner_of(client: &Client) -> ClientId {
    ClientId::from_backend(client.id())
}

fn surface(dh: &DisplayHandle, client: &Client, state: &Wayfront) -> (SurfaceId, WlSurface) {
    let sid = state.facade.create_surface();
    let resource = client
        .create_resource::<WlSurface, SurfaceId, Wayfront>(dh, 1, sid)
        .expect("create wl_surface");
    state.facade.add_surface(sid, owner_of(client), resource.clone());
    (sid, resource)
}

fn children(state: &Wayfront, sid: SurfaceId) -> Vec<SurfaceId> {
    state.cache.lock().find_surface(sid).unwrap().children.clone()
}

#[test]
fn s2_focus_handoff_with_clipboard() {
    let (display, mut state, client_a, _stub) = harness();
    let dh = display.handle();
    let client_b = new_client(&dh);

    let (sa, _surface_a) = surface(&dh, &client_a, &state);
    let (sb, _surface_b) = surface(&dh, &client_b, &state);

    let owner_a = owner_of(&client_a);
    let owner_b = owner_of(&client_b);

    let keyboard_a = client_a
        .create_resource::<WlKeyboard, (), Wayfront>(&dh, 1, ())
        .expect("keyboard a");
    let keyboard_b = client_b
        .create_resource::<WlKeyboard, (), Wayfront>(&dh, 1, ())
        .expect("keyboard b");
    state.facade.add_keyboard_resource(keyboard_a, owner_a, &state.gateway);
    state.facade.add_keyboard_resource(keyboard_b, owner_b, &state.gateway);

    let data_device_b = client_b
        .create_resource::<WlDataDevice, (), Wayfront>(&dh, 3, ())
        .expect("data device b");
    state.facade.add_data_device_resource(data_device_b, owner_b);

    // A is focused first, and sets a text/plain selection while it owns
    // focus.
    state.gateway.keyboard_focus_update(
        SurfaceId::none(),
        Default::default(),
        Default::default(),
        sa,
        Default::default(),
        Default::default(),
    );
    assert_eq!(state.gateway.keyboard_focus_client(), Some(owner_a));

    let source_a = client_a
        .create_resource::<WlDataSource, (), Wayfront>(&dh, 3, ())
        .expect("data source");
    state.facade.create_transfer(source_a.clone());
    state.facade.add_mime_type(&source_a, "text/plain".to_string());
    state.facade.send_selection(&source_a, &mut state.gateway);

    // Focus now moves straight to B, which never had it before: B
    // should only ever see enter, never a leave of its own, and should
    // pick up the clipboard A just set.
    state.gateway.keyboard_focus_update(
        sa,
        Default::default(),
        Default::default(),
        sb,
        Default::default(),
        Default::default(),
    );

    assert_eq!(state.gateway.keyboard_focus_sid(), sb);
    assert_eq!(state.gateway.keyboard_focus_client(), Some(owner_b));
}

#[test]
fn s4_subsurface_stacking() {
    let (display, state, client, _stub) = harness();
    let dh = display.handle();

    let (p, _) = surface(&dh, &client, &state);
    let (a, _) = surface(&dh, &client, &state);
    let (b, _) = surface(&dh, &client, &state);
    let (c, _) = surface(&dh, &client, &state);

    state.facade.add_subsurface(a, p, Default::default());
    state.facade.add_subsurface(b, p, Default::default());
    state.facade.add_subsurface(c, p, Default::default());

    assert_eq!(children(&state, p), vec![a, b, c]);

    // place_above(A, C): [A, B, C] -> [B, C, A]
    state.facade.reorder_satellites(a, c, true);
    assert_eq!(children(&state, p), vec![b, c, a]);

    // place_below(A, B): [B, C, A] -> [A, B, C]
    state.facade.reorder_satellites(a, b, false);
    assert_eq!(children(&state, p), vec![a, b, c]);
}

#[test]
fn s5_late_keyboard_binding_after_focus() {
    let (display, mut state, client, _stub) = harness();
    let dh = display.handle();
    let (sid, _) = surface(&dh, &client, &state);
    let owner = owner_of(&client);

    state.gateway.keyboard_focus_update(
        SurfaceId::none(),
        Default::default(),
        Default::default(),
        sid,
        Default::default(),
        Default::default(),
    );
    assert_eq!(state.gateway.keyboard_focus_client(), Some(owner));

    let before = state.cache.lock().keyboards().len();
    let keyboard = client
        .create_resource::<WlKeyboard, (), Wayfront>(&dh, 1, ())
        .expect("keyboard");
    // Binding while already focused must not panic and must register
    // the new resource, even though enter() fires before it's stored.
    state.facade.add_keyboard_resource(keyboard, owner, &state.gateway);
    assert_eq!(state.cache.lock().keyboards().len(), before + 1);
}

#[test]
fn s6_shutdown_under_load() {
    let (display, state, _first_client, _stub) = harness();
    let dh = display.handle();

    let mut sids = Vec::new();
    for _ in 0..10 {
        let client = new_client(&dh);
        let (sid, _surface) = surface(&dh, &client, &state);

        let shell_surface = client
            .create_resource::<WlShellSurface, SurfaceId, Wayfront>(&dh, 1, sid)
            .expect("shell surface");
        state.facade.add_shell_surface(
            sid,
            SurfaceRole::WlShellToplevel,
            SurfaceResource::WlShellSurface(shell_surface),
            ShowReason::ShellSurfaceAssigned,
        );

        let cb = client
            .create_resource::<WlCallback, (), Wayfront>(&dh, 1, ())
            .expect("frame callback");
        state.facade.add_frame_callback(sid, cb);

        sids.push(sid);
    }

    for &sid in &sids {
        assert!(state.cache.lock().find_surface(sid).is_some());
    }

    for &sid in &sids {
        state.facade.remove_surface(sid);
    }

    for &sid in &sids {
        assert!(state.cache.lock().find_surface(sid).is_none());
    }

    // The lock is never held across a call: if it were, the loop above
    // would have deadlocked against itself already.
    assert!(state.cache.lock().find_surface(SurfaceId::new(999_999)).is_none());
}
