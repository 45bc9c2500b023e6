//! Shutdown signal double released only by `trigger`.

use std::sync::{Condvar, Mutex};

use crate::process::{ShutdownError, ShutdownSignal};

#[derive(Debug, Default)]
pub struct LatchSignal {
    triggered: Mutex<bool>,
    wake: Condvar,
}

impl LatchSignal {
    #[must_use]
    pub fn is_triggered(&self) -> bool {
        *self.triggered.lock().expect("latch mutex poisoned")
    }
}

impl ShutdownSignal for LatchSignal {
    fn wait(&self) -> Result<(), ShutdownError> {
        let triggered = self.triggered.lock().expect("latch mutex poisoned");
        let _released = self
            .wake
            .wait_while(triggered, |triggered| !*triggered)
            .expect("latch mutex poisoned");
        Ok(())
    }

    fn trigger(&self) {
        *self.triggered.lock().expect("latch mutex poisoned") = true;
        self.wake.notify_all();
    }
}
