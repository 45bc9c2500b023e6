//! Native webview shell built on `tao` windows and `wry` webviews.
//!
//! The event loop must be created on the main thread, which is where
//! `run_server` drives the shell. A shutdown signal, whether from the
//! operating system or a fatal listener, closes the window through an
//! event-loop proxy.

use std::sync::Arc;
use std::thread;

use tao::dpi::{LogicalSize, PhysicalPosition};
use tao::event::{Event, WindowEvent};
use tao::event_loop::{ControlFlow, EventLoop, EventLoopBuilder};
use tao::platform::run_return::EventLoopExtRunReturn;
use tao::window::{Window, WindowBuilder};
use tracing::{debug, info, warn};
use wry::{WebContext, WebView, WebViewBuilder};

use crate::process::ShutdownSignal;

use super::{Shell, ShellError, ShellLauncher, ShellOptions};

const SHELL_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::shell");
const BLANK_PAGE: &str = "about:blank";

#[derive(Debug, Clone, Copy)]
enum ShellEvent {
    Close,
}

/// A window hosting one webview.
pub struct WebviewShell {
    event_loop: EventLoop<ShellEvent>,
    window: Window,
    context: WebContext,
    webview: Option<WebView>,
    debug: bool,
    signal: Arc<dyn ShutdownSignal>,
}

impl WebviewShell {
    fn build_webview(&mut self, url: &str) -> Result<WebView, wry::Error> {
        WebViewBuilder::new_with_web_context(&mut self.context)
            .with_url(url)
            .with_devtools(self.debug)
            .build(&self.window)
    }
}

impl Shell for WebviewShell {
    fn navigate(&mut self, url: &str) -> Result<(), ShellError> {
        let webview = self.build_webview(url).map_err(|error| ShellError::Navigate {
            url: url.to_owned(),
            reason: error.to_string(),
        })?;
        self.webview = Some(webview);
        Ok(())
    }

    fn run(&mut self) -> Result<(), ShellError> {
        if self.webview.is_none() {
            let webview = self
                .build_webview(BLANK_PAGE)
                .map_err(|error| ShellError::Run {
                    reason: error.to_string(),
                })?;
            self.webview = Some(webview);
        }

        let proxy = self.event_loop.create_proxy();
        let signal = Arc::clone(&self.signal);
        let watcher = thread::Builder::new()
            .name(String::from("shell-shutdown"))
            .spawn(move || {
                if let Err(error) = signal.wait() {
                    warn!(target: SHELL_TARGET, error = %error, "shutdown signal unavailable");
                }
                if proxy.send_event(ShellEvent::Close).is_err() {
                    debug!(target: SHELL_TARGET, "shell event loop already closed");
                }
            })
            .map_err(|error| ShellError::Run {
                reason: error.to_string(),
            })?;

        let window_id = self.window.id();
        self.event_loop
            .run_return(move |event, _, control_flow| {
                *control_flow = ControlFlow::Wait;
                match event {
                    Event::WindowEvent {
                        window_id: id,
                        event: WindowEvent::CloseRequested,
                        ..
                    } if id == window_id => *control_flow = ControlFlow::Exit,
                    Event::UserEvent(ShellEvent::Close) => *control_flow = ControlFlow::Exit,
                    _ => {}
                }
            });

        // A window closed by the user also ends the process.
        self.signal.trigger();
        watcher.join().map_err(|_| ShellError::Run {
            reason: String::from("shutdown watcher panicked"),
        })
    }

    fn destroy(&mut self) {
        self.webview = None;
        self.window.set_visible(false);
        info!(target: SHELL_TARGET, "webview shell closed");
    }
}

/// Launcher producing [`WebviewShell`]s that close when `signal` fires.
#[derive(Clone)]
pub struct WebviewShellLauncher {
    signal: Arc<dyn ShutdownSignal>,
}

impl WebviewShellLauncher {
    /// Builds a launcher bound to `signal`.
    #[must_use]
    pub fn new(signal: Arc<dyn ShutdownSignal>) -> Self {
        Self { signal }
    }
}

impl ShellLauncher for WebviewShellLauncher {
    fn open(&self, options: &ShellOptions) -> Result<Box<dyn Shell>, ShellError> {
        let event_loop = EventLoopBuilder::<ShellEvent>::with_user_event().build();
        let window = WindowBuilder::new()
            .with_title(options.title.as_str())
            .with_inner_size(LogicalSize::new(
                f64::from(options.width),
                f64::from(options.height),
            ))
            .build(&event_loop)
            .map_err(|error| ShellError::Open {
                reason: error.to_string(),
            })?;
        if options.centered {
            centre(&window);
        }
        Ok(Box::new(WebviewShell {
            event_loop,
            window,
            context: WebContext::new(Some(options.data_path.clone())),
            webview: None,
            debug: options.debug,
            signal: Arc::clone(&self.signal),
        }))
    }
}

fn centre(window: &Window) {
    let Some(monitor) = window.current_monitor() else {
        return;
    };
    let origin = monitor.position();
    let size = monitor.size();
    let outer = window.outer_size();
    let (x, y) = centred_origin(
        (origin.x, origin.y),
        (size.width, size.height),
        (outer.width, outer.height),
    );
    window.set_outer_position(PhysicalPosition::new(x, y));
}

/// Top-left corner that centres a window of `window` size on a monitor.
fn centred_origin(origin: (i32, i32), monitor: (u32, u32), window: (u32, u32)) -> (i32, i32) {
    let offset = |monitor: u32, window: u32| i32::try_from(monitor.saturating_sub(window) / 2);
    (
        origin.0.saturating_add(offset(monitor.0, window.0).unwrap_or(0)),
        origin.1.saturating_add(offset(monitor.1, window.1).unwrap_or(0)),
    )
}
