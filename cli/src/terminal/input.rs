use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crossterm::{
    event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers},
    terminal::{disable_raw_mode, enable_raw_mode},
};
use tracing::debug;

const POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Watches for `q` or Ctrl-C and raises the run's stop flag.
///
/// With input enabled the terminal is in raw mode while the listener lives, so Ctrl-C
/// arrives as a key. A signal handler covers the disabled case.
pub struct KeyListener {
    done: Arc<AtomicBool>,
    thread: Option<JoinHandle<()>>,
    signal: tokio::task::JoinHandle<()>,
}

impl KeyListener {
    pub fn spawn(stop: Arc<AtomicBool>, disable_input: bool) -> Self {
        let done = Arc::new(AtomicBool::new(false));

        let signal_stop = stop.clone();
        let signal = tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                discovr_common::warn!("Interrupted, finishing early");
                signal_stop.store(true, Ordering::Relaxed);
            }
        });

        let thread = if disable_input {
            None
        } else {
            let done = done.clone();
            Some(thread::spawn(move || listen(stop, done)))
        };

        Self {
            done,
            thread,
            signal,
        }
    }
}

impl Drop for KeyListener {
    fn drop(&mut self) {
        self.done.store(true, Ordering::Relaxed);
        self.signal.abort();
        if let Some(thread) = self.thread.take() {
            let _ = thread.join();
        }
        let _ = disable_raw_mode();
    }
}

fn listen(stop: Arc<AtomicBool>, done: Arc<AtomicBool>) {
    if let Err(e) = enable_raw_mode() {
        debug!("key listener unavailable: {e}");
        return;
    }

    while !done.load(Ordering::Relaxed) && !stop.load(Ordering::Relaxed) {
        match event::poll(POLL_INTERVAL) {
            Ok(true) => {
                if let Ok(Event::Key(key_event)) = event::read() {
                    if is_stop_key(&key_event) {
                        stop.store(true, Ordering::Relaxed);
                        break;
                    }
                }
            }
            Ok(false) => {}
            Err(e) => {
                debug!("key listener stopped: {e}");
                break;
            }
        }
    }

    let _ = disable_raw_mode();
    if stop.load(Ordering::Relaxed) && !done.load(Ordering::Relaxed) {
        discovr_common::warn!("Stop requested, finishing early");
    }
}

fn is_stop_key(key_event: &KeyEvent) -> bool {
    let is_q = key_event.code == KeyCode::Char('q');
    let is_ctrl_c = key_event.code == KeyCode::Char('c')
        && key_event.modifiers.contains(KeyModifiers::CONTROL);

    (is_q || is_ctrl_c) && key_event.kind == KeyEventKind::Press
}

// ╔════════════════════════════════════════════╗
// ║ ████████╗███████╗███████╗████████╗███████╗ ║
// ║ ╚══██╔══╝██╔════╝██╔════╝╚══██╔══╝██╔════╝ ║
// ║    ██║   █████╗  ███████╗   ██║   ███████╗ ║
// ║    ██║   ██╔══╝  ╚════██║   ██║   ╚════██║ ║
// ║    ██║   ███████╗███████║   ██║   ███████║ ║
// ║    ╚═╝   ╚══════╝╚══════╝   ╚═╝   ╚══════╝ ║
// ╚════════════════════════════════════════════╝
