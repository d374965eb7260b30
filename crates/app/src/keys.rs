// Copyright 2025-2026 CEMAXECUTER LLC

//! Keyboard-driven shutdown. A background thread reads stdin line by
//! line and forwards the first character of each line; the control
//! hook polls the channel every control cycle and stops the engine on
//! `q` or when a sink raises the shared done flag.

use std::io::BufRead;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;

use crossbeam::channel::{bounded, Receiver, Sender};

use duo_engine::{Control, ControlHook, TuneParams};

/// Spawns the stdin reader thread. The thread exits on EOF or when the
/// receiver is dropped.
pub fn spawn_key_watcher() -> Receiver<char> {
    let (tx, rx): (Sender<char>, Receiver<char>) = bounded(4);
    thread::spawn(move || {
        let stdin = std::io::stdin();
        let mut line = String::new();
        loop {
            line.clear();
            match stdin.lock().read_line(&mut line) {
                Ok(0) | Err(_) => break,
                Ok(_) => {}
            }
            if let Some(key) = line.trim().chars().next() {
                if tx.send(key).is_err() {
                    break;
                }
            }
        }
    });
    rx
}

/// Control hook that requests a stop when the user types `q` or when
/// the optional done flag is raised by the transfer sink.
pub struct QuitHook {
    keys: Receiver<char>,
    done: Option<Arc<AtomicBool>>,
}

impl QuitHook {
    pub fn new(keys: Receiver<char>, done: Option<Arc<AtomicBool>>) -> Self {
        QuitHook { keys, done }
    }

    fn done_raised(&self) -> bool {
        self.done
            .as_ref()
            .map_or(false, |d| d.load(Ordering::SeqCst))
    }
}

impl ControlHook for QuitHook {
    fn on_control(&mut self, _params: &mut TuneParams) -> Control {
        while let Ok(key) = self.keys.try_recv() {
            if key == 'q' {
                if let Some(done) = &self.done {
                    done.store(true, Ordering::SeqCst);
                }
                return Control::Stop;
            }
        }
        if self.done_raised() {
            return Control::Stop;
        }
        Control::Continue
    }
}
