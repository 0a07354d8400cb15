//! The Engine (§4.1): owns the single Wayland display, the protocol
//! thread, the serial counter, and per-output globals. Everything else
//! in this crate other than `initialize`'s synchronous setup only ever
//! runs from inside that one thread.
//!
//! Austin Shafer - 2020

use std::sync::{Arc, Mutex};
use std::thread::JoinHandle;

use calloop::channel::{Channel as GatewayChannel, Sender as GatewayChannelSender};
use calloop::generic::Generic;
use calloop::timer::{TimeoutAction, Timer};
use calloop::{EventLoop, Interest, LoopSignal, Mode, PostAction};
use wayland_server::backend::{ClientData, ClientId as BackendClientId, DisconnectReason};
use wayland_server::{Display, ListeningSocket};

use crate::cache::Cache;
use crate::config::EngineConfig;
use crate::coordinator::{Coordinator, CoordinatorEvents, OutputInfo};
use crate::gateway::{Gateway, GatewayHandle, GatewayMessage};
use crate::ids::SerialCounter;
use crate::keyboard_state::KeyboardState;
use crate::state::Wayfront;

/// The calloop event-loop data for the protocol thread. The display has
/// to live alongside the dispatch state rather than be captured by a
/// closure, so that both the `Generic` source driving client dispatch
/// and the display itself can be reached from a single `&mut Protocol`
/// (mirrors the teacher's wayland worker-thread structure in
/// `compositor.rs`, adapted to the newer `Display`-owns-nothing-global
/// API).
struct Protocol {
    state: Wayfront,
    display: Display<Wayfront>,
}

/// Per-client bookkeeping hook required by `wayland_server::backend`.
/// This frontend has nothing to track per client beyond what the cache
/// already keys by `ClientId`, so `disconnected` only logs.
#[derive(Debug, Default)]
struct ClientState;

impl ClientData for ClientState {
    fn initialized(&self, _client_id: BackendClientId) {}

    fn disconnected(&self, client_id: BackendClientId, reason: DisconnectReason) {
        crate::debug!("client {:?} disconnected: {:?}", client_id, reason);
    }
}

/// Owns the display lifecycle described in §4.1.
///
/// `initialize` performs every fallible step synchronously — creating
/// the display, binding the socket, compiling the keyboard's initial
/// keymap — so a bad socket name or an unusable keymap is reported to
/// the caller before `start` ever spawns a thread (§4.1 "Failure").
/// `start` then registers the protocol globals and spawns the one
/// protocol thread that runs for the engine's lifetime.
pub struct Engine {
    serials: Arc<SerialCounter>,
    gateway_handle: GatewayHandle,
    socket_name: String,
    watchdog_period_ms: Option<u64>,

    // Torn down by `start`; `None` afterwards.
    protocol: Option<Protocol>,
    socket: Option<ListeningSocket>,
    gateway_events: Option<GatewayChannel<GatewayMessage>>,

    // Populated by `start`; used by `stop`.
    loop_signal: Option<LoopSignal>,
    thread: Option<JoinHandle<()>>,
}

impl Engine {
    /// §4.1 *initialize*.
    pub fn initialize(config: EngineConfig, coordinator: Arc<Mutex<dyn Coordinator>>) -> anyhow::Result<Self> {
        let cache = Arc::new(Cache::new());
        let serials = Arc::new(SerialCounter::new());

        let display = Display::<Wayfront>::new()
            .map_err(|e| anyhow::anyhow!("failed to create wayland display: {}", e))?;
        let dh = display.handle();

        let socket = ListeningSocket::bind(config.socket_name.as_str()).map_err(|e| {
            anyhow::anyhow!(
                "failed to bind wayland socket {:?}: {:?}",
                config.socket_name,
                e
            )
        })?;

        let keyboard_state = KeyboardState::new(&config)?;

        let (gateway_tx, gateway_rx): (GatewayChannelSender<GatewayMessage>, GatewayChannel<GatewayMessage>) =
            calloop::channel::channel();
        let gateway_handle = GatewayHandle::new(gateway_tx);
        let gateway = Gateway::new(cache.clone(), serials.clone(), dh, keyboard_state);

        let state = Wayfront::new(cache, coordinator, serials.clone(), gateway);

        Ok(Engine {
            serials,
            gateway_handle,
            socket_name: config.socket_name,
            watchdog_period_ms: config.watchdog_period_ms,
            protocol: Some(Protocol { state, display }),
            socket: Some(socket),
            gateway_events: Some(gateway_rx),
            loop_signal: None,
            thread: None,
        })
    }

    /// A cheap, `Send + Clone` handle the compositor core hands to its
    /// own thread(s) so they can report events back into this frontend
    /// without reaching across thread boundaries themselves (§4.1/§10.1).
    pub fn gateway_handle(&self) -> GatewayHandle {
        self.gateway_handle.clone()
    }

    /// The name the listening socket was actually bound under.
    pub fn socket_name(&self) -> &str {
        &self.socket_name
    }

    /// §4.1 *next_serial*.
    pub fn next_serial(&self) -> u32 {
        self.serials.next_serial()
    }

    /// §4.1 *advertise_output*. Routed through the same coordinator-
    /// events channel as every other gateway notification so the
    /// `wl_output` global is only ever created from the protocol thread
    /// (§10.1/§10.6).
    pub fn advertise_output(&self, info: OutputInfo) {
        self.gateway_handle.on_output_found(info);
    }

    /// §4.1 *destroy_output*.
    pub fn destroy_output(&self, name: &str) {
        self.gateway_handle.on_output_lost(name);
    }

    /// §4.1 *start*: register every global in §6, then spawn the single
    /// protocol thread and run the calloop loop to completion on it.
    /// That thread blocks SIGINT/SIGTERM so only the process's main
    /// thread ever handles them (§4.1/§5).
    pub fn start(&mut self) -> anyhow::Result<()> {
        let protocol = self
            .protocol
            .take()
            .ok_or_else(|| anyhow::anyhow!("engine already started"))?;
        let socket = self
            .socket
            .take()
            .ok_or_else(|| anyhow::anyhow!("engine already started"))?;
        let gateway_events = self
            .gateway_events
            .take()
            .ok_or_else(|| anyhow::anyhow!("engine already started"))?;
        let watchdog_period_ms = self.watchdog_period_ms;

        crate::protocol::register_globals(&protocol.display.handle());

        let mut event_loop: EventLoop<Protocol> =
            EventLoop::try_new().map_err(|e| anyhow::anyhow!("failed to create event loop: {}", e))?;
        self.loop_signal = Some(event_loop.get_signal());

        let handle = event_loop.handle();

        // Accept new clients: loop `accept()` on every readiness until it
        // reports no more pending connections (§10.1).
        handle
            .insert_source(
                Generic::new(socket, Interest::READ, Mode::Level),
                |_, socket, protocol: &mut Protocol| {
                    loop {
                        match socket.accept() {
                            Ok(Some(stream)) => {
                                let dh = protocol.display.handle();
                                if let Err(e) = dh.insert_client(stream, Arc::new(ClientState)) {
                                    crate::error!("failed to insert new wayland client: {}", e);
                                }
                            }
                            Ok(None) => break,
                            Err(e) => {
                                crate::error!("wayland socket accept failed: {}", e);
                                break;
                            }
                        }
                    }
                    Ok(PostAction::Continue)
                },
            )
            .map_err(|e| anyhow::anyhow!("failed to register listening socket: {}", e))?;

        // Pump already-connected clients' requests whenever the display's
        // backend fd is readable.
        handle
            .insert_source(
                Generic::new(protocol.display.backend().poll_fd(), Interest::READ, Mode::Level),
                |_, _, protocol: &mut Protocol| {
                    if let Err(e) = protocol.display.dispatch_clients(&mut protocol.state) {
                        crate::error!("dispatch_clients failed: {}", e);
                    }
                    Ok(PostAction::Continue)
                },
            )
            .map_err(|e| anyhow::anyhow!("failed to register display source: {}", e))?;

        // §4.1/§9 watchdog: keeps the loop responsive when no client
        // activity exists. Configurable, defaulting to on (§10.3).
        if let Some(period_ms) = watchdog_period_ms {
            let period = std::time::Duration::from_millis(period_ms);
            handle
                .insert_source(
                    Timer::from_duration(period),
                    move |_, _, protocol: &mut Protocol| {
                        if let Err(e) = protocol.display.flush_clients() {
                            crate::debug!("watchdog flush_clients failed: {}", e);
                        }
                        TimeoutAction::ToDuration(period)
                    },
                )
                .map_err(|e| anyhow::anyhow!("failed to register watchdog timer: {}", e))?;
        }

        // Drain coordinator-events notifications into the gateway; this
        // is the only path by which `state.gateway` is ever mutated
        // (§10.1). `Finalize` is intercepted here rather than forwarded
        // into `Gateway::dispatch`: it means the coordinator is tearing
        // itself down, so the protocol thread's own loop must stop too
        // (§5 "Global shutdown").
        let finalize_signal = event_loop.get_signal();
        handle
            .insert_source(gateway_events, move |event, _, protocol: &mut Protocol| {
                if let calloop::channel::Event::Msg(msg) = event {
                    if matches!(msg, GatewayMessage::Finalize) {
                        crate::info!("coordinator requested shutdown");
                        finalize_signal.stop();
                        return;
                    }
                    protocol.state.gateway.dispatch(msg);
                }
            })
            .map_err(|e| anyhow::anyhow!("failed to register coordinator-events channel: {}", e))?;

        let thread = std::thread::Builder::new()
            .name("wayfront_protocol".to_string())
            .spawn(move || {
                block_termination_signals();

                let mut protocol = protocol;
                if let Err(e) = event_loop.run(None, &mut protocol, |_| {}) {
                    crate::error!("protocol event loop exited with an error: {}", e);
                }
            })
            .map_err(|e| anyhow::anyhow!("failed to spawn protocol thread: {}", e))?;

        self.thread = Some(thread);
        Ok(())
    }

    /// §4.1 *stop*: signal the loop to terminate and join the thread.
    /// Idempotent; calling this on an engine that was never started, or
    /// twice, is a no-op.
    pub fn stop(&mut self) {
        if let Some(signal) = self.loop_signal.take() {
            signal.stop();
        }
        if let Some(thread) = self.thread.take() {
            if thread.join().is_err() {
                crate::error!("protocol thread panicked");
            }
        }
    }
}

impl Drop for Engine {
    fn drop(&mut self) {
        self.stop();
    }
}

/// Block SIGINT/SIGTERM on the calling (protocol) thread so only the
/// process's main thread ever observes them (§4.1/§5).
fn block_termination_signals() {
    use nix::sys::signal::{pthread_sigmask, SigSet, SigmaskHow, Signal};

    let mut set = SigSet::empty();
    set.add(Signal::SIGINT);
    set.add(Signal::SIGTERM);
    if let Err(e) = pthread_sigmask(SigmaskHow::SIG_BLOCK, Some(&set), None) {
        crate::error!("failed to block SIGINT/SIGTERM on the protocol thread: {}", e);
    }
}
