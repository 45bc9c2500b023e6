//! Concurrent start-up and supervision of every enabled transport.

use std::fmt;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, Sender};
use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use hearth_config::{TransportKind, TransportPlan, TransportSpec};

use crate::health::HealthReporter;

use super::listener::SocketListener;
use super::{ConnectionHandler, ListenerError, Terminator, supervisor};

#[cfg(unix)]
use super::permissions;

/// Lifecycle of one listener.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListenerState {
    /// Thread spawned; not yet bound.
    Starting,
    /// Bound and accepting connections.
    Serving,
    /// Stopped after a shutdown request.
    Closed,
    /// Stopped by a bind or serve failure.
    Fatal,
}

/// A fatal error raised by one listener.
#[derive(Debug)]
pub struct ListenerFailure {
    /// Transport that failed.
    pub kind: TransportKind,
    /// The underlying error.
    pub error: ListenerError,
}

impl fmt::Display for ListenerFailure {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(formatter, "{} listener failed: {}", self.kind, self.error)
    }
}

impl std::error::Error for ListenerFailure {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(&self.error)
    }
}

#[derive(Debug)]
struct StatusCell {
    inner: Mutex<Status>,
    changed: Condvar,
}

#[derive(Debug, Clone, Copy)]
struct Status {
    state: ListenerState,
    local_addr: Option<SocketAddr>,
}

impl StatusCell {
    fn new() -> Self {
        Self {
            inner: Mutex::new(Status {
                state: ListenerState::Starting,
                local_addr: None,
            }),
            changed: Condvar::new(),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Status> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn get(&self) -> Status {
        *self.lock()
    }

    fn set_state(&self, state: ListenerState) {
        self.lock().state = state;
        self.changed.notify_all();
    }

    fn set_serving(&self, local_addr: Option<SocketAddr>) {
        {
            let mut status = self.lock();
            status.state = ListenerState::Serving;
            status.local_addr = local_addr;
        }
        self.changed.notify_all();
    }

    /// Blocks while the listener is still starting, up to `timeout`.
    fn wait_started(&self, timeout: Duration) -> Status {
        let (status, _) = self
            .changed
            .wait_timeout_while(self.lock(), timeout, |status| {
                status.state == ListenerState::Starting
            })
            .unwrap_or_else(PoisonError::into_inner);
        *status
    }
}

/// Starts one listener thread per enabled transport.
pub struct ListenerOrchestrator {
    handler: Arc<dyn ConnectionHandler>,
    reporter: Arc<dyn HealthReporter>,
}

impl ListenerOrchestrator {
    /// Builds an orchestrator sharing `handler` across every listener.
    #[must_use]
    pub fn new(handler: Arc<dyn ConnectionHandler>, reporter: Arc<dyn HealthReporter>) -> Self {
        Self { handler, reporter }
    }

    /// Starts every enabled transport in plan order and returns immediately.
    ///
    /// Binding happens on the listener threads, so bind failures surface
    /// through `terminator` rather than this call. An empty plan yields an
    /// empty set.
    ///
    /// # Errors
    ///
    /// Returns [`ListenerError::Spawn`] when a thread cannot be created. Any
    /// listener already started is asked to stop.
    pub fn launch(
        &self,
        plan: &TransportPlan,
        terminator: Arc<dyn Terminator>,
    ) -> Result<ListenerSet, ListenerError> {
        let (failures, receiver) = mpsc::channel();
        let supervisor = supervisor::spawn(receiver, terminator)
            .map_err(|source| ListenerError::Spawn { source })?;
        let mut set = ListenerSet {
            units: Vec::new(),
            supervisor: Some(supervisor),
        };
        for spec in plan.enabled() {
            self.reporter.listener_starting(&spec);
            set.units.push(self.spawn_unit(spec, failures.clone())?);
        }
        Ok(set)
    }

    fn spawn_unit(
        &self,
        spec: TransportSpec,
        failures: Sender<ListenerFailure>,
    ) -> Result<ListenerUnit, ListenerError> {
        let kind = spec.kind();
        let shutdown = Arc::new(AtomicBool::new(false));
        let status = Arc::new(StatusCell::new());
        let context = UnitContext {
            spec,
            shutdown: Arc::clone(&shutdown),
            status: Arc::clone(&status),
            handler: Arc::clone(&self.handler),
            reporter: Arc::clone(&self.reporter),
            failures,
        };
        let handle = thread::Builder::new()
            .name(format!("{kind}-listener"))
            .spawn(move || context.run())
            .map_err(|source| ListenerError::Spawn { source })?;
        Ok(ListenerUnit {
            kind,
            shutdown,
            status,
            handle: Some(handle),
        })
    }
}

struct UnitContext {
    spec: TransportSpec,
    shutdown: Arc<AtomicBool>,
    status: Arc<StatusCell>,
    handler: Arc<dyn ConnectionHandler>,
    reporter: Arc<dyn HealthReporter>,
    failures: Sender<ListenerFailure>,
}

impl UnitContext {
    fn run(self) {
        let kind = self.spec.kind();
        match self.bind_and_serve() {
            Ok(()) => {
                self.status.set_state(ListenerState::Closed);
                self.reporter.listener_closed(kind);
            }
            Err(error) => {
                self.status.set_state(ListenerState::Fatal);
                let failure = ListenerFailure { kind, error };
                self.reporter.listener_failed(&failure);
                // The supervisor stops listening after the first failure.
                let _ = self.failures.send(failure);
            }
        }
    }

    fn bind_and_serve(&self) -> Result<(), ListenerError> {
        let listener = SocketListener::bind(&self.spec)?;
        #[cfg(unix)]
        if let TransportSpec::UnixSocket(binding) = &self.spec {
            permissions::apply_reported(binding, self.reporter.as_ref());
        }
        self.status.set_serving(listener.local_addr());
        self.reporter
            .listener_serving(listener.kind(), &listener.endpoint());
        listener.serve(&self.shutdown, &self.handler)
    }
}

struct ListenerUnit {
    kind: TransportKind,
    shutdown: Arc<AtomicBool>,
    status: Arc<StatusCell>,
    handle: Option<JoinHandle<()>>,
}

/// Handles to the running listeners.
///
/// Dropping the set asks every listener to stop without waiting for it.
pub struct ListenerSet {
    units: Vec<ListenerUnit>,
    supervisor: Option<JoinHandle<()>>,
}

impl ListenerSet {
    /// Transports in the set, in start-up order.
    #[must_use]
    pub fn kinds(&self) -> Vec<TransportKind> {
        self.units.iter().map(|unit| unit.kind).collect()
    }

    /// Number of listeners in the set.
    #[must_use]
    pub fn len(&self) -> usize {
        self.units.len()
    }

    /// Returns `true` when no transport was started.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.units.is_empty()
    }

    /// Current state of the listener for `kind`.
    #[must_use]
    pub fn status(&self, kind: TransportKind) -> Option<ListenerState> {
        self.unit(kind).map(|unit| unit.status.get().state)
    }

    /// Bound address of a TCP listener once it is serving.
    #[must_use]
    pub fn local_addr(&self, kind: TransportKind) -> Option<SocketAddr> {
        self.unit(kind).and_then(|unit| unit.status.get().local_addr)
    }

    /// Waits until the listener for `kind` has left `Starting` and returns
    /// its bound TCP address.
    ///
    /// `None` when the transport is absent, failed to bind, is a Unix socket
    /// or did not start within `timeout`.
    #[must_use]
    pub fn wait_for_address(&self, kind: TransportKind, timeout: Duration) -> Option<SocketAddr> {
        let status = self.unit(kind)?.status.wait_started(timeout);
        match status.state {
            ListenerState::Serving => status.local_addr,
            _ => None,
        }
    }

    /// Asks every listener to stop accepting connections.
    pub fn shutdown(&self) {
        for unit in &self.units {
            unit.shutdown.store(true, Ordering::SeqCst);
        }
    }

    /// Waits for every listener thread, then for the supervisor.
    ///
    /// Blocks until each listener has stopped, so call [`Self::shutdown`]
    /// first unless every listener is known to have failed.
    ///
    /// # Errors
    ///
    /// Returns [`ListenerError::ThreadPanic`] if any thread panicked.
    pub fn join(mut self) -> Result<(), ListenerError> {
        let mut panicked = false;
        for unit in &mut self.units {
            if let Some(handle) = unit.handle.take() {
                panicked |= handle.join().is_err();
            }
        }
        if let Some(handle) = self.supervisor.take() {
            panicked |= handle.join().is_err();
        }
        if panicked {
            Err(ListenerError::ThreadPanic)
        } else {
            Ok(())
        }
    }

    fn unit(&self, kind: TransportKind) -> Option<&ListenerUnit> {
        self.units.iter().find(|unit| unit.kind == kind)
    }
}

impl fmt::Debug for ListenerSet {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter
            .debug_struct("ListenerSet")
            .field("kinds", &self.kinds())
            .finish_non_exhaustive()
    }
}

impl Drop for ListenerSet {
    fn drop(&mut self) {
        self.shutdown();
    }
}
