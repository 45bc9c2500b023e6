//! Listeners for the HTTP, HTTPS and Unix socket transports.
//!
//! Every enabled transport runs on its own thread against one shared
//! [`ConnectionHandler`]. Bind and serve failures travel to a supervisor
//! which hands the first one to a [`Terminator`].

mod errors;
mod handler;
mod listener;
mod orchestrator;
mod permissions;
mod supervisor;
#[cfg(test)]
mod test_utils;
mod tls;

pub use self::errors::ListenerError;
pub use self::handler::{ConnectionHandler, ConnectionStream, StatusRouter};
pub use self::orchestrator::{
    ListenerFailure, ListenerOrchestrator, ListenerSet, ListenerState,
};
pub use self::permissions::PermissionError;
pub use self::supervisor::{ShutdownTerminator, Terminator};

#[cfg(test)]
pub(crate) use self::test_utils::{CountingHandler, wait_for_state};

const LISTENER_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::transport");
