//! Background thread hosting a [`GameBoy`].
//!
//! The machine is owned by exactly one thread at a time: it moves into the
//! worker on [`EmulatorThread::spawn`] and comes back out of
//! [`EmulatorThread::stop`]. The host talks to it through a command channel
//! and receives finished frames on a bounded channel.

use std::{
    sync::{
        Arc, Condvar, Mutex, MutexGuard, PoisonError,
        atomic::{AtomicU64, Ordering},
    },
    thread::{self, JoinHandle},
    time::Duration,
};

use crossbeam_channel as cb;
use log::{debug, warn};

use crate::{
    gameboy::GameBoy,
    input::Button,
    ppu::{SCREEN_HEIGHT, SCREEN_WIDTH},
};

/// Frames buffered for the host before new ones are dropped.
pub const FRAME_QUEUE_DEPTH: usize = 3;
/// How often a pausing host re-checks that the worker is still alive.
const PARK_POLL: Duration = Duration::from_millis(50);

/// A finished picture, 0x00RRGGBB row-major.
#[derive(Clone, Debug)]
pub struct Frame {
    pub number: u64,
    pub pixels: Box<[u32; SCREEN_WIDTH * SCREEN_HEIGHT]>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunState {
    Running,
    Paused,
    Stopping,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    Button(Button, bool),
    Reset,
}

struct Control {
    requested: RunState,
    /// The worker is waiting on `wake` and will not touch the machine.
    parked: bool,
}

struct Shared {
    control: Mutex<Control>,
    wake: Condvar,
    dropped: AtomicU64,
}

impl Shared {
    fn lock(&self) -> MutexGuard<'_, Control> {
        self.control.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn request(&self, next: RunState) {
        let mut control = self.lock();
        if control.requested != RunState::Stopping {
            control.requested = next;
        }
        self.wake.notify_all();
    }
}

pub struct EmulatorThread {
    shared: Arc<Shared>,
    commands: cb::Sender<Command>,
    frames: cb::Receiver<Frame>,
    handle: Option<JoinHandle<GameBoy>>,
}

impl EmulatorThread {
    pub fn spawn(gb: GameBoy) -> Self {
        let shared = Arc::new(Shared {
            control: Mutex::new(Control {
                requested: RunState::Running,
                parked: false,
            }),
            wake: Condvar::new(),
            dropped: AtomicU64::new(0),
        });
        let (frame_tx, frame_rx) = cb::bounded(FRAME_QUEUE_DEPTH);
        let (cmd_tx, cmd_rx) = cb::unbounded();
        let worker = Arc::clone(&shared);
        let handle = thread::spawn(move || run(gb, &worker, &cmd_rx, &frame_tx));
        debug!("emulator thread started");
        Self {
            shared,
            commands: cmd_tx,
            frames: frame_rx,
            handle: Some(handle),
        }
    }

    pub fn frames(&self) -> &cb::Receiver<Frame> {
        &self.frames
    }

    /// Frames thrown away because the host was not keeping up.
    pub fn dropped_frames(&self) -> u64 {
        self.shared.dropped.load(Ordering::Relaxed)
    }

    pub fn state(&self) -> RunState {
        self.shared.lock().requested
    }

    /// Pause after the frame in progress. Returns once the worker has
    /// parked, so no further frames arrive until [`resume`](Self::resume).
    pub fn pause(&self) {
        debug!("emulator thread paused");
        self.shared.request(RunState::Paused);
        let mut control = self.shared.lock();
        while control.requested == RunState::Paused && !control.parked {
            if self.handle.as_ref().is_none_or(JoinHandle::is_finished) {
                break;
            }
            control = self
                .shared
                .wake
                .wait_timeout(control, PARK_POLL)
                .unwrap_or_else(PoisonError::into_inner)
                .0;
        }
    }

    pub fn resume(&self) {
        debug!("emulator thread resumed");
        self.shared.request(RunState::Running);
    }

    pub fn send(&self, command: Command) {
        // The worker only hangs up once it is stopping.
        let _ = self.commands.send(command);
    }

    pub fn set_button(&self, button: Button, pressed: bool) {
        self.send(Command::Button(button, pressed));
    }

    /// Stop the worker and take the machine back. Battery RAM is saved
    /// first when the machine has autosave enabled.
    pub fn stop(mut self) -> GameBoy {
        match self.shutdown() {
            Some(Ok(gb)) => gb,
            Some(Err(panic)) => std::panic::resume_unwind(panic),
            // `handle` is only taken here and in `drop`.
            None => unreachable!("emulator thread already joined"),
        }
    }

    fn shutdown(&mut self) -> Option<thread::Result<GameBoy>> {
        let handle = self.handle.take()?;
        {
            let mut control = self.shared.lock();
            control.requested = RunState::Stopping;
            self.shared.wake.notify_all();
        }
        Some(handle.join())
    }
}

impl Drop for EmulatorThread {
    fn drop(&mut self) {
        if let Some(Err(_)) = self.shutdown() {
            warn!("emulator thread panicked");
        }
    }
}

fn run(
    mut gb: GameBoy,
    shared: &Shared,
    commands: &cb::Receiver<Command>,
    frames: &cb::Sender<Frame>,
) -> GameBoy {
    loop {
        {
            let mut control = shared.lock();
            while control.requested == RunState::Paused {
                if !control.parked {
                    control.parked = true;
                    shared.wake.notify_all();
                }
                control = shared
                    .wake
                    .wait(control)
                    .unwrap_or_else(PoisonError::into_inner);
            }
            control.parked = false;
            if control.requested == RunState::Stopping {
                break;
            }
        }

        for command in commands.try_iter() {
            match command {
                Command::Button(button, pressed) => gb.set_button(button, pressed),
                Command::Reset => gb.reset(),
            }
        }

        if !gb.run_frame() {
            continue;
        }
        let frame = Frame {
            number: gb.mmu.ppu.frames(),
            pixels: Box::new(*gb.framebuffer()),
        };
        match frames.try_send(frame) {
            Ok(()) => {}
            Err(cb::TrySendError::Full(_)) => {
                shared.dropped.fetch_add(1, Ordering::Relaxed);
            }
            // Nobody is listening; keep emulating until told to stop.
            Err(cb::TrySendError::Disconnected(_)) => {}
        }
    }

    if gb.autosave {
        if let Err(e) = gb.save_ram() {
            warn!("autosave failed: {e}");
        }
    }
    debug!("emulator thread stopped");
    gb
}
