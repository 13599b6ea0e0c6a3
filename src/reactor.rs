//! The event reconciler: one writer, one ordered event stream.
//!
//! Every event is applied sequentially against the registry; after each one
//! the affected trees are verified, re-arranged, the rectangle batch is
//! handed to the sink worker, and a fresh [`State`] snapshot is published.
//! Per-event failures are logged and never abort the loop.

use std::sync::Arc;
use std::thread;

use crossbeam_channel::{Receiver, Sender};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info, instrument, trace, warn};

use rustc_hash::FxHashMap;
use crate::common::config::Config;
use crate::layout::{Direction, RestorePoint, Sizing, record_resize};
use crate::model::rect::Rect;
use crate::model::swaparc::SwapArc;
use crate::model::window::{WindowDescriptor, WindowHandle};
use crate::registry::{Registry, RouteDecision, State};

/// How many rectangle batches may queue up before the reconciler waits for
/// the sink worker to catch up.
const SINK_QUEUE_DEPTH: usize = 64;

#[derive(Debug, Error)]
pub enum ReactorError {
    #[error("{0} is no longer live")]
    StaleHandle(WindowHandle),
    #[error("tree invariant violated: {0}")]
    InvariantViolation(String),
}

#[derive(Debug, Error)]
pub enum SinkError {
    /// The window vanished between computation and application. A non-fatal
    /// miss; the batch continues.
    #[error("window disappeared before the rectangle was applied")]
    WindowGone,
    #[error(transparent)]
    Backend(#[from] anyhow::Error),
}

/// Applies computed rectangles to real windows. Implementations may block
/// per call; they run on the sink worker thread, never on the reconciler.
pub trait RectangleSink: Send + 'static {
    fn apply(&mut self, window: WindowHandle, rect: Rect) -> Result<(), SinkError>;
}

/// Everything the reconciler consumes, lifecycle notifications and user
/// commands alike, in one ordered stream.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Event {
    Created { window: WindowHandle, descriptor: WindowDescriptor },
    Destroyed { window: WindowHandle },
    Focused { window: WindowHandle, descriptor: WindowDescriptor },
    /// The user moved the window out from under us; re-snap.
    Moved { window: WindowHandle },
    /// The user resized the window out from under us; re-snap.
    Resized { window: WindowHandle },
    Minimized { window: WindowHandle },
    Restored { window: WindowHandle },
    ToggleFloat,
    ToggleMonocle,
    MoveFocusedWindow { direction: Direction },
    ResizeFocusedWindow { direction: Direction, sizing: Sizing, delta: i32 },
    FocusMonitor { monitor_idx: usize },
    FocusWorkspace { monitor_idx: usize, workspace_idx: usize },
    /// Re-arrange everything, optionally dropping resize adjustments.
    Retile { reset_resize: bool },
    ReloadConfig(Box<Config>),
    /// Event kinds this core does not understand are logged and dropped.
    Unknown { kind: String },
}

/// Lifecycle stage of a known window.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
enum WindowState {
    /// Seen, not yet classifiable (slow-registering application).
    Pending,
    Managed,
    Floating,
    Ignored,
}

#[derive(Debug, Copy, Clone)]
struct MinimizedWindow {
    monitor_idx: usize,
    workspace_idx: usize,
    point: RestorePoint,
}

pub struct Reactor {
    registry: Registry,
    window_states: FxHashMap<WindowHandle, WindowState>,
    /// Last known identity per window, for re-classification passes.
    descriptors: FxHashMap<WindowHandle, WindowDescriptor>,
    minimized: FxHashMap<WindowHandle, MinimizedWindow>,
    snapshot: Arc<SwapArc<State>>,
    sink_tx: Option<Sender<Vec<(WindowHandle, Rect)>>>,
    sink_worker: Option<thread::JoinHandle<()>>,
}

impl Reactor {
    pub fn new<S: RectangleSink>(registry: Registry, sink: S) -> Self {
        let snapshot = Arc::new(SwapArc::from_value(registry.state()));
        let (sink_tx, sink_rx) = crossbeam_channel::bounded(SINK_QUEUE_DEPTH);
        let sink_worker = thread::Builder::new()
            .name("rect-sink".to_string())
            .spawn(move || sink_worker(sink, sink_rx))
            .ok();

        Self {
            registry,
            window_states: FxHashMap::default(),
            descriptors: FxHashMap::default(),
            minimized: FxHashMap::default(),
            snapshot,
            sink_tx: Some(sink_tx),
            sink_worker,
        }
    }

    pub fn registry(&self) -> &Registry { &self.registry }

    /// The cell readers poll; cheap to clone and hand to other threads.
    pub fn snapshot_cell(&self) -> Arc<SwapArc<State>> { Arc::clone(&self.snapshot) }

    pub fn snapshot(&self) -> Arc<State> { self.snapshot.load() }

    /// Drain events until the source disconnects. The single-writer loop:
    /// no other code path mutates the registry while this runs.
    pub fn run(&mut self, events: Receiver<Event>) {
        info!("reconciler running");
        for event in events {
            self.step(event);
        }
        info!("event source disconnected, reconciler stopping");
    }

    /// Apply one event, then verify, re-arrange, hand off rectangles, and
    /// publish a snapshot.
    pub fn step(&mut self, event: Event) {
        trace!(?event, "processing");
        if let Err(error) = self.handle_event(event) {
            match error {
                ReactorError::StaleHandle(window) => {
                    debug!("dropped operation on stale {window}");
                }
                ReactorError::InvariantViolation(ref detail) => {
                    warn!("{detail}; rebuilding affected trees");
                }
            }
        }
        self.recover_broken_trees();
        let mapping = self.registry.arrange_all();
        if let Some(tx) = &self.sink_tx
            && !mapping.is_empty()
            && tx.send(mapping).is_err()
        {
            warn!("rectangle sink worker is gone, rectangles not applied");
        }
        self.snapshot.store(Arc::new(self.registry.state()));
    }

    fn handle_event(&mut self, event: Event) -> Result<(), ReactorError> {
        match event {
            Event::Created { window, descriptor } => self.on_created(window, &descriptor),
            Event::Destroyed { window } => self.on_destroyed(window),
            Event::Focused { window, descriptor } => self.on_focused(window, &descriptor),
            Event::Moved { window } | Event::Resized { window } => self.on_resnap(window),
            Event::Minimized { window } => self.on_minimized(window),
            Event::Restored { window } => self.on_restored(window),
            Event::ToggleFloat => self.on_toggle_float(),
            Event::ToggleMonocle => {
                if let Some(monitor) = self.registry.focused_monitor_mut() {
                    monitor.focused_workspace_mut().toggle_monocle();
                }
                Ok(())
            }
            Event::MoveFocusedWindow { direction } => {
                let outcome = self.registry.move_focused_window(direction);
                debug!("move {direction}: {outcome:?}");
                Ok(())
            }
            Event::ResizeFocusedWindow { direction, sizing, delta } => {
                self.on_resize(direction, sizing, delta)
            }
            Event::FocusMonitor { monitor_idx } => {
                self.registry.focus_monitor(monitor_idx);
                Ok(())
            }
            Event::FocusWorkspace { monitor_idx, workspace_idx } => {
                self.registry.focus_workspace(monitor_idx, workspace_idx);
                Ok(())
            }
            Event::Retile { reset_resize } => {
                self.registry.retile_all(reset_resize);
                Ok(())
            }
            Event::ReloadConfig(config) => {
                if let Err(error) = self.registry.reload(*config) {
                    warn!("reload rejected, keeping previous configuration: {error:#}");
                }
                Ok(())
            }
            Event::Unknown { kind } => {
                debug!("ignoring unknown event kind '{kind}'");
                Ok(())
            }
        }
    }

    #[instrument(skip(self, descriptor))]
    fn on_created(
        &mut self,
        window: WindowHandle,
        descriptor: &WindowDescriptor,
    ) -> Result<(), ReactorError> {
        if self.window_states.contains_key(&window) {
            trace!("{window} already tracked, ignoring duplicate create");
            return Ok(());
        }

        if descriptor.is_blank() || self.registry.rules().slow.matches(descriptor) {
            debug!("{window} registered slowly, deferring classification");
            self.window_states.insert(window, WindowState::Pending);
            return Ok(());
        }

        self.classify(window, descriptor, true);
        Ok(())
    }

    /// Route and place a window, recording its lifecycle state.
    fn classify(&mut self, window: WindowHandle, descriptor: &WindowDescriptor, initial: bool) {
        self.descriptors.insert(window, descriptor.clone());
        let decision = self.registry.route_new_window(descriptor, initial);
        let state = match decision {
            RouteDecision::Ignored => WindowState::Ignored,
            RouteDecision::Floating { .. } => WindowState::Floating,
            RouteDecision::Tiled { .. } => WindowState::Managed,
        };
        debug!("{window} classified as {state:?}");
        self.registry.place_window(window, decision);
        if let WindowState::Managed = state {
            self.registry.focus_window(window);
        }
        self.window_states.insert(window, state);
    }

    #[instrument(skip(self))]
    fn on_destroyed(&mut self, window: WindowHandle) -> Result<(), ReactorError> {
        self.minimized.remove(&window);
        self.descriptors.remove(&window);
        let known = self.window_states.remove(&window).is_some();
        let removed = self.registry.remove_window(window).is_some();
        if !known && !removed {
            return Err(ReactorError::StaleHandle(window));
        }
        Ok(())
    }

    fn on_focused(
        &mut self,
        window: WindowHandle,
        descriptor: &WindowDescriptor,
    ) -> Result<(), ReactorError> {
        match self.window_states.get(&window) {
            // A fuller descriptor resolves a deferred classification.
            Some(WindowState::Pending) if !descriptor.is_blank() => {
                self.classify(window, descriptor, true);
                Ok(())
            }
            Some(WindowState::Managed) => {
                self.registry.focus_window(window);
                Ok(())
            }
            Some(_) => Ok(()),
            None => Err(ReactorError::StaleHandle(window)),
        }
    }

    /// A user-initiated move or resize outside our control: the next
    /// arrangement pass snaps the window back to its computed rectangle.
    fn on_resnap(&mut self, window: WindowHandle) -> Result<(), ReactorError> {
        match self.window_states.get(&window) {
            Some(WindowState::Managed) => {
                trace!("{window} moved externally, re-snapping");
                Ok(())
            }
            Some(_) => Ok(()),
            None => Err(ReactorError::StaleHandle(window)),
        }
    }

    #[instrument(skip(self))]
    fn on_minimized(&mut self, window: WindowHandle) -> Result<(), ReactorError> {
        if !matches!(self.window_states.get(&window), Some(WindowState::Managed)) {
            return Ok(());
        }
        let Some((monitor_idx, workspace_idx, Some(point))) = self.registry.remove_window(window)
        else {
            return Err(ReactorError::StaleHandle(window));
        };
        self.minimized.insert(
            window,
            MinimizedWindow { monitor_idx, workspace_idx, point },
        );
        Ok(())
    }

    #[instrument(skip(self))]
    fn on_restored(&mut self, window: WindowHandle) -> Result<(), ReactorError> {
        let Some(minimized) = self.minimized.remove(&window) else {
            // Restore of something we never minimized: nothing to undo.
            return Ok(());
        };
        let Some(monitor) = self.registry.monitors_mut().get_mut(minimized.monitor_idx) else {
            return Err(ReactorError::StaleHandle(window));
        };
        monitor.ensure_workspace_count(minimized.workspace_idx + 1);
        if let Some(workspace) = monitor.workspace_mut(minimized.workspace_idx) {
            workspace.tree_mut().restore_window_at(window, minimized.point);
        }
        Ok(())
    }

    /// Managed -> Floating lifts the focused window out of its tree;
    /// Floating -> Managed re-enters through the normal routing path.
    fn on_toggle_float(&mut self) -> Result<(), ReactorError> {
        let Some(window) = self
            .registry
            .focused_monitor()
            .map(|m| m.focused_workspace())
            .and_then(|w| w.tree().focused_window().or_else(|| w.floating().last().copied()))
        else {
            return Ok(());
        };

        match self.window_states.get(&window) {
            Some(WindowState::Managed) => {
                let Some((monitor_idx, workspace_idx, _)) = self.registry.remove_window(window)
                else {
                    return Err(ReactorError::StaleHandle(window));
                };
                if let Some(workspace) = self
                    .registry
                    .monitors_mut()
                    .get_mut(monitor_idx)
                    .and_then(|m| m.workspace_mut(workspace_idx))
                {
                    workspace.add_floating_window(window);
                }
                self.window_states.insert(window, WindowState::Floating);
                Ok(())
            }
            Some(WindowState::Floating) => {
                self.registry.remove_window(window);
                // Same routing as a new window, but a float rule must not
                // bounce it straight back out of the tree.
                let descriptor = self.descriptors.get(&window).cloned().unwrap_or_default();
                let decision = match self.registry.route_new_window(&descriptor, false) {
                    RouteDecision::Floating { monitor_idx, workspace_idx }
                    | RouteDecision::Tiled { monitor_idx, workspace_idx } => {
                        RouteDecision::Tiled { monitor_idx, workspace_idx }
                    }
                    RouteDecision::Ignored => RouteDecision::Tiled {
                        monitor_idx: self.registry.focused_monitor_idx(),
                        workspace_idx: self
                            .registry
                            .focused_monitor()
                            .map(|m| m.focused_workspace_idx())
                            .unwrap_or_default(),
                    },
                };
                self.registry.place_window(window, decision);
                self.registry.focus_window(window);
                self.window_states.insert(window, WindowState::Managed);
                Ok(())
            }
            _ => Ok(()),
        }
    }

    fn on_resize(
        &mut self,
        direction: Direction,
        sizing: Sizing,
        delta: i32,
    ) -> Result<(), ReactorError> {
        let Some(monitor) = self.registry.focused_monitor_mut() else {
            return Ok(());
        };
        let workspace = monitor.focused_workspace_mut();
        let kind = workspace.effective_layout();
        let tree = workspace.tree_mut();
        let idx = tree.focused_container_idx();
        let len = tree.len();
        if len == 0 {
            return Ok(());
        }
        // Unsupported layouts make this a silent no-op, not a failure.
        if let Err(error) =
            record_resize(kind, tree.resize_dimensions_mut(), idx, len, direction, sizing, delta)
        {
            debug!("resize ignored: {error}");
        }
        Ok(())
    }

    /// A failed structural check never kills the process: the broken tree
    /// is rebuilt flat from its own live windows.
    fn recover_broken_trees(&mut self) {
        for monitor in self.registry.monitors_mut() {
            for workspace in monitor.workspaces_mut() {
                if let Err(detail) = workspace.tree().verify() {
                    warn!("tree invariant violated ({detail}), rebuilding from live windows");
                    let windows: Vec<WindowHandle> = workspace.tree().windows().collect();
                    *workspace.tree_mut() =
                        crate::layout::ContainerTree::rebuild_from_windows(&windows);
                }
            }
        }
    }
}

impl Drop for Reactor {
    fn drop(&mut self) {
        // Closing the channel lets the worker drain and exit.
        self.sink_tx.take();
        if let Some(worker) = self.sink_worker.take() {
            let _ = worker.join();
        }
    }
}

fn sink_worker<S: RectangleSink>(mut sink: S, batches: Receiver<Vec<(WindowHandle, Rect)>>) {
    for batch in batches {
        for (window, rect) in batch {
            match sink.apply(window, rect) {
                Ok(()) => {}
                Err(SinkError::WindowGone) => {
                    debug!("{window} vanished before its rectangle was applied");
                }
                Err(SinkError::Backend(error)) => {
                    warn!("sink failed to place {window}: {error:#}");
                }
            }
        }
    }
}
