//! Master-half keyboard context.
//!
//! [`Keyboard`] owns every piece of mutable keyboard state (debounce
//! table, key registry, report builder and channel, device profile, idle
//! timer, task queue) and is driven from a single execution context:
//!
//! ```text
//!   scan timer ──► tick() ──┐
//!   link / USB / flash ─► post(task) ──► TaskQueue ──► run_pending(board)
//!                                                        │
//!   Scan ─► Translate ─► GenerateReport ─► ReportChannel ─► ReportSink
//! ```
//!
//! Hardware is reached only through the [`Board`] traits, so the whole
//! pipeline runs on the host in tests.

use heapless::Vec;
use rand_core::RngCore;

use crate::channel::{ReportChannel, ReportSink};
use crate::config::{Settings, KEY_SLOT_CAPACITY, REPORT_BUFFER_CAPACITY, TASK_QUEUE_CAPACITY};
use crate::error::Error;
use crate::hid::KeyboardLeds;
use crate::keymap::{DeviceCommand, Keymap};
use crate::matrix::{Debouncer, MatrixLayout, MatrixPins};
use crate::power::{IdleTimer, PowerState, ScanControl};
use crate::profile::{ProfileBackend, ProfileStore, SystemControl};
use crate::registry::{KeyRegistry, Source};
use crate::relay::RelayPayload;
use crate::report::ReportBuilder;
use crate::task::{Task, TaskQueue};
use crate::translate::translate;

/// Everything the keyboard needs from the hardware.
pub trait Board:
    MatrixPins + ReportSink + ProfileBackend + ScanControl + SystemControl + RngCore
{
}

impl<T> Board for T where
    T: MatrixPins + ReportSink + ProfileBackend + ScanControl + SystemControl + RngCore + ?Sized
{
}

pub struct Keyboard<'a, const ROWS: usize, const COLS: usize, const LAYERS: usize, const KEYS: usize>
{
    layout: &'a MatrixLayout<ROWS, COLS>,
    keymap: &'a Keymap<LAYERS, KEYS>,
    settings: Settings,
    matrix: Debouncer<ROWS, COLS>,
    registry: KeyRegistry<KEY_SLOT_CAPACITY>,
    builder: ReportBuilder,
    channel: ReportChannel<REPORT_BUFFER_CAPACITY>,
    profiles: ProfileStore,
    tasks: TaskQueue<TASK_QUEUE_CAPACITY>,
    idle: IdleTimer,
    power: PowerState,
    leds: KeyboardLeds,
}

impl<'a, const ROWS: usize, const COLS: usize, const LAYERS: usize, const KEYS: usize>
    Keyboard<'a, ROWS, COLS, LAYERS, KEYS>
{
    pub fn new(
        layout: &'a MatrixLayout<ROWS, COLS>,
        keymap: &'a Keymap<LAYERS, KEYS>,
        settings: Settings,
        profiles: ProfileStore,
    ) -> Self {
        Self {
            layout,
            keymap,
            matrix: Debouncer::new(&settings),
            registry: KeyRegistry::new(),
            builder: ReportBuilder::new(),
            channel: ReportChannel::new(),
            profiles,
            tasks: TaskQueue::new(),
            idle: IdleTimer::new(settings.low_power_delay_ms),
            power: PowerState::Scanning,
            leds: KeyboardLeds::default(),
            settings,
        }
    }

    /// Scan timer expiry.  Only queues a scan.
    pub fn tick(&mut self) -> Result<(), Error> {
        self.tasks.push(Task::Scan)
    }

    /// Queue an event from outside the scan loop.
    pub fn post(&mut self, task: Task) -> Result<(), Error> {
        self.tasks.push(task)
    }

    /// Run queued tasks until the queue is empty.  Stops at the first
    /// fatal error.
    pub fn run_pending<B: Board + ?Sized>(&mut self, board: &mut B) -> Result<(), Error> {
        while self.step(board)? {}
        Ok(())
    }

    /// Run the oldest queued task.  Returns `false` if there was none.
    pub fn step<B: Board + ?Sized>(&mut self, board: &mut B) -> Result<bool, Error> {
        match self.tasks.pop() {
            Some(task) => {
                self.handle(task, board)?;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    fn handle<B: Board + ?Sized>(&mut self, task: Task, board: &mut B) -> Result<(), Error> {
        match task {
            Task::Scan => self.scan(board),
            Task::Translate => self.translate_keys(board),
            Task::GenerateReport => self.generate_report(board),
            Task::RelayPayload(payload) => self.apply_relay(&payload),
            Task::LinkDisconnected => {
                let removed = self.registry.remove_all(Source::Remote);
                info!("link lost, released {} remote keys", removed);
                self.tasks.push(Task::GenerateReport)
            }
            Task::TransportReady => self.channel.drain(board),
            Task::ProfileWritten(result) => self.profiles.on_write_complete(result, board),
            Task::Wake => self.wake(board),
        }
    }

    fn scan<B: Board + ?Sized>(&mut self, board: &mut B) -> Result<(), Error> {
        if self.power == PowerState::LowPower {
            trace!("scan skipped in low power");
            return Ok(());
        }

        let registry = &mut self.registry;
        let summary = self
            .matrix
            .scan(board, self.layout, |edit| registry.apply(edit, Source::Local));

        if summary.presses > 0 {
            self.tasks.push(Task::Translate)?;
        } else if summary.releases > 0 {
            self.tasks.push(Task::GenerateReport)?;
        }

        let period_ms = self.settings.scan_period_ms as i32;
        if self.idle.observe(!summary.is_idle(), period_ms) {
            info!("no key activity, entering low power");
            board.enter_low_power();
            self.power = PowerState::LowPower;
        }
        Ok(())
    }

    fn translate_keys<B: Board + ?Sized>(&mut self, board: &mut B) -> Result<(), Error> {
        let mut commands: Vec<DeviceCommand, KEY_SLOT_CAPACITY> = Vec::new();
        translate(&mut self.registry, self.keymap, |command| {
            // One command per slot at most, so this cannot overflow.
            let _ = commands.push(command);
        });

        for command in commands {
            self.profiles.execute(command, board)?;
        }
        self.tasks.push(Task::GenerateReport)
    }

    fn generate_report<B: Board + ?Sized>(&mut self, board: &mut B) -> Result<(), Error> {
        for report in self.builder.build(&self.registry) {
            self.channel.submit(report, board)?;
        }
        Ok(())
    }

    fn apply_relay(&mut self, payload: &RelayPayload) -> Result<(), Error> {
        trace!("relay edits {:?}", payload.edits());
        for &edit in payload.edits() {
            self.registry.apply(edit, Source::Remote);
        }
        self.tasks.push(Task::Translate)
    }

    fn wake<B: Board + ?Sized>(&mut self, board: &mut B) -> Result<(), Error> {
        if self.power == PowerState::Scanning {
            debug!("wake while scanning");
            return Ok(());
        }

        info!("row activity, resuming scan");
        board.exit_low_power();
        self.power = PowerState::Scanning;
        self.idle.reset();
        self.tasks.push(Task::Scan)
    }

    /// Host transport connected or disconnected.
    pub fn set_host_connected(&mut self, connected: bool) {
        self.channel.set_connected(connected);
    }

    /// Keyboard output report (LED state) from the host.
    pub fn on_output_report(&mut self, data: &[u8]) {
        self.leds = KeyboardLeds::from_output_report(data);
        debug!("host leds {:#x}", self.leds.0);
    }

    pub fn registry(&self) -> &KeyRegistry<KEY_SLOT_CAPACITY> {
        &self.registry
    }

    pub fn profiles(&self) -> &ProfileStore {
        &self.profiles
    }

    pub fn power_state(&self) -> PowerState {
        self.power
    }

    pub fn leds(&self) -> KeyboardLeds {
        self.leds
    }

    pub fn is_host_connected(&self) -> bool {
        self.channel.is_connected()
    }

    pub fn pending_reports(&self) -> usize {
        self.channel.pending()
    }

    pub fn tasks(&self) -> &TaskQueue<TASK_QUEUE_CAPACITY> {
        &self.tasks
    }
}
