//! Resilient frame loop
//!
//! The host owns the real frame source (`requestAnimationFrame`, a vsync
//! callback, a fixed-rate timer). It calls [`FrameLoop::on_frame`] with the
//! token it was handed in [`Host::request_frame`]. At most one frame request
//! is outstanding at a time; stale tokens are ignored.
//!
//! Each frame: run due delayed tasks, tick the simulation inside a failure
//! boundary, then dispatch events and render behind a second boundary of
//! their own, then request the next frame unless the run is over. A faulted
//! tick never kills the loop; it backs off briefly and resumes.

use std::cell::{Cell, RefCell};
use std::panic::{self, AssertUnwindSafe};
use std::sync::Once;
use std::time::Instant;

use super::pool::GovernorReport;
use super::state::{GamePhase, GameState};
use super::tick::{Deferred, DeferredAction, GameEvent, SoundCue, TickInput, TickReport};
use super::timers::DelayedTasks;
use crate::consts::{BOSS_WATCHDOG_DELAY_MS, FAULT_BACKOFF_MS};
use crate::error::{HostError, SimError};
use crate::settings::Settings;

/// Handle for one outstanding frame request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FrameToken(pub u64);

/// Everything outside the simulation core: frame source, renderer, audio, UI
///
/// Collaborator failures are logged and never interrupt the frame.
pub trait Host {
    /// Arrange for `on_frame(token, ..)` to be called on the next frame
    fn request_frame(&mut self, token: FrameToken);

    /// Withdraw a frame request that has not fired yet
    fn cancel_frame(&mut self, _token: FrameToken) {}

    fn render(&mut self, state: &GameState) -> Result<(), HostError>;

    fn play_sound(&mut self, cue: SoundCue) -> Result<(), HostError>;

    fn show_level_complete(&mut self, level: u32) -> Result<(), HostError>;

    fn show_game_over(&mut self, score: u64) -> Result<(), HostError>;
}

/// The simulation as seen by the frame loop
pub trait Simulate {
    /// Advance one tick
    fn update(&mut self, input: &TickInput) -> Result<TickReport, SimError>;

    /// Delayed actions queued since the last call
    ///
    /// Drained after every tick, faulted or not.
    fn take_deferred(&mut self) -> Vec<Deferred>;

    /// Run a delayed action whose time has come
    fn apply_deferred(&mut self, action: DeferredAction) -> Vec<GameEvent>;

    /// Periodic memory trimming
    fn govern(&mut self) -> GovernorReport;

    fn state(&self) -> &GameState;

    /// Abort the current session and begin a fresh one
    fn restart(&mut self);

    fn is_over(&self) -> bool {
        self.state().phase == GamePhase::GameOver
    }
}

/// Where the loop is in its lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopStatus {
    /// Not started
    Idle,
    Running,
    /// Last tick faulted; waiting for the retry
    Faulted,
    /// Game over; no more frames are requested
    Stopped,
}

/// What a single `on_frame` call did
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameOutcome {
    /// Token was stale or the loop is not running
    Ignored,
    Ticked,
    /// Skipped the tick while waiting out a fault backoff
    BackingOff,
    /// The tick faulted; a retry is scheduled
    Faulted,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LoopTask {
    Sim(DeferredAction),
    Retry,
    /// Checks that ticks advanced since the task was scheduled
    Watchdog { ticks_at_schedule: u64 },
}

/// Counters kept for diagnostics
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct LoopStats {
    pub ticks: u64,
    pub faults: u64,
    pub overruns: u64,
    pub last_tick_ms: f32,
    pub live_objects: usize,
}

/// Drives a [`Simulate`] from host frame callbacks
pub struct FrameLoop<S> {
    sim: S,
    status: LoopStatus,
    /// Outstanding frame request; `Some` blocks any second request
    pending: Option<FrameToken>,
    next_token: u64,
    tasks: DelayedTasks<LoopTask>,
    frame_budget_ms: f32,
    governor_interval: u64,
    stats: LoopStats,
    last_fault: Option<SimError>,
}

impl<S: Simulate> FrameLoop<S> {
    pub fn new(sim: S, settings: &Settings) -> Self {
        Self {
            sim,
            status: LoopStatus::Idle,
            pending: None,
            next_token: 0,
            tasks: DelayedTasks::new(),
            frame_budget_ms: settings.frame_budget_ms,
            governor_interval: settings.governor_interval_ticks.max(1),
            stats: LoopStats::default(),
            last_fault: None,
        }
    }

    pub fn sim(&self) -> &S {
        &self.sim
    }

    pub fn sim_mut(&mut self) -> &mut S {
        &mut self.sim
    }

    pub fn status(&self) -> LoopStatus {
        self.status
    }

    pub fn stats(&self) -> LoopStats {
        self.stats
    }

    /// The most recent tick fault, if any
    pub fn last_fault(&self) -> Option<&SimError> {
        self.last_fault.as_ref()
    }

    /// Token of the outstanding frame request, if any
    pub fn pending_frame(&self) -> Option<FrameToken> {
        self.pending
    }

    /// Delayed tasks still waiting
    pub fn pending_tasks(&self) -> usize {
        self.tasks.len()
    }

    /// Start a new session and request the first frame
    pub fn start<H: Host + ?Sized>(&mut self, host: &mut H) {
        self.cancel_frame(host);
        self.tasks.clear();
        self.sim.restart();
        self.status = LoopStatus::Running;
        self.request_frame(host);
    }

    /// Abort the session in progress and start over
    ///
    /// Pending frames and every delayed task of the old session are dropped.
    /// Calling it twice in a row leaves exactly one frame requested.
    pub fn reset<H: Host + ?Sized>(&mut self, host: &mut H) {
        log::info!("Resetting session (status {:?})", self.status);
        self.start(host);
    }

    /// Handle one host frame callback
    pub fn on_frame<H: Host + ?Sized>(
        &mut self,
        token: FrameToken,
        now_ms: f64,
        input: &TickInput,
        host: &mut H,
    ) -> FrameOutcome {
        if self.pending != Some(token) {
            log::debug!("Ignoring stale frame {:?}", token);
            return FrameOutcome::Ignored;
        }
        self.pending = None;
        if self.status == LoopStatus::Stopped || self.status == LoopStatus::Idle {
            return FrameOutcome::Ignored;
        }

        self.run_due_tasks(now_ms, host);

        let outcome = if self.status == LoopStatus::Faulted {
            FrameOutcome::BackingOff
        } else {
            self.guarded_tick(now_ms, input, host)
        };

        if self.sim.is_over() {
            self.status = LoopStatus::Stopped;
            self.tasks.clear();
            log::info!("Frame loop stopped after {} ticks", self.stats.ticks);
        } else {
            self.request_frame(host);
        }
        outcome
    }

    /// Run due delayed tasks without ticking
    ///
    /// For hosts with an idle or timer hook; lets the watchdog fire even
    /// when frames stop arriving.
    pub fn poll<H: Host + ?Sized>(&mut self, now_ms: f64, host: &mut H) {
        if matches!(self.status, LoopStatus::Running | LoopStatus::Faulted) {
            self.run_due_tasks(now_ms, host);
        }
    }

    fn request_frame<H: Host + ?Sized>(&mut self, host: &mut H) {
        if self.pending.is_some() {
            return;
        }
        let token = FrameToken(self.next_token);
        self.next_token += 1;
        self.pending = Some(token);
        host.request_frame(token);
    }

    fn cancel_frame<H: Host + ?Sized>(&mut self, host: &mut H) {
        if let Some(token) = self.pending.take() {
            host.cancel_frame(token);
        }
    }

    fn run_due_tasks<H: Host + ?Sized>(&mut self, now_ms: f64, host: &mut H) {
        while let Some(task) = self.tasks.pop_due(now_ms) {
            match task {
                LoopTask::Sim(action) => {
                    let sim = &mut self.sim;
                    match contain(|| sim.apply_deferred(action)) {
                        Ok(events) => notify(&events, None, host),
                        Err(payload) => {
                            self.stats.faults += 1;
                            log::error!(
                                "Delayed {:?} panicked: {}",
                                action,
                                panic_message(payload.as_ref())
                            );
                        }
                    }
                }
                LoopTask::Retry => {
                    log::info!("Retrying after fault");
                    self.status = LoopStatus::Running;
                }
                LoopTask::Watchdog { ticks_at_schedule } => {
                    if self.stats.ticks == ticks_at_schedule && !self.sim.is_over() {
                        log::warn!(
                            "Frame loop stalled at tick {}, forcing a new frame",
                            self.stats.ticks
                        );
                        self.cancel_frame(host);
                        self.request_frame(host);
                    }
                }
            }
        }
    }

    /// Tick inside the failure boundary, then hand the results to the host
    fn guarded_tick<H: Host + ?Sized>(
        &mut self,
        now_ms: f64,
        input: &TickInput,
        host: &mut H,
    ) -> FrameOutcome {
        let started = Instant::now();
        let result = contain(|| self.tick_body(input))
            .unwrap_or_else(|payload| Err(SimError::Panicked(panic_message(payload.as_ref()))));

        // Whatever the tick queued before a fault still has to run
        self.schedule_deferred(now_ms);

        match result {
            Ok(report) => {
                notify(&report.events, Some(self.sim.state()), host);

                let elapsed_ms = started.elapsed().as_secs_f32() * 1000.0;
                self.stats.last_tick_ms = elapsed_ms;
                if elapsed_ms > self.frame_budget_ms {
                    self.stats.overruns += 1;
                    log::warn!(
                        "Tick {} took {:.2}ms (budget {:.1}ms)",
                        self.stats.ticks,
                        elapsed_ms,
                        self.frame_budget_ms
                    );
                }
                FrameOutcome::Ticked
            }
            Err(err) => {
                self.stats.faults += 1;
                log::error!("Tick fault #{}: {}", self.stats.faults, err);
                self.last_fault = Some(err);
                if !self.sim.is_over() {
                    self.status = LoopStatus::Faulted;
                    self.tasks.schedule(now_ms + FAULT_BACKOFF_MS, LoopTask::Retry);
                }
                FrameOutcome::Faulted
            }
        }
    }

    fn tick_body(&mut self, input: &TickInput) -> Result<TickReport, SimError> {
        let report = self.sim.update(input)?;
        self.stats.ticks += 1;

        if self.stats.ticks % self.governor_interval == 0 {
            let governed = self.sim.govern();
            self.stats.live_objects = governed.live_objects;
            log::debug!(
                "Governor pass at tick {}: trimmed {}, {} live",
                self.stats.ticks,
                governed.trimmed,
                governed.live_objects
            );
        }
        Ok(report)
    }

    /// Move the simulation's queued actions onto the timer heap
    fn schedule_deferred(&mut self, now_ms: f64) {
        for deferred in self.sim.take_deferred() {
            let due = now_ms + deferred.delay_ms;
            self.tasks.schedule(due, LoopTask::Sim(deferred.action));
            self.tasks.schedule(
                due + BOSS_WATCHDOG_DELAY_MS,
                LoopTask::Watchdog {
                    ticks_at_schedule: self.stats.ticks,
                },
            );
        }
    }
}

/// Forward events to collaborators and render, behind their own boundary
///
/// A failing or panicking collaborator is logged and never faults the tick.
fn notify<H: Host + ?Sized>(events: &[GameEvent], frame: Option<&GameState>, host: &mut H) {
    let delivered = contain(|| {
        dispatch(events, host);
        if let Some(state) = frame {
            if let Err(err) = host.render(state) {
                log::warn!("{err}");
            }
        }
    });
    if let Err(payload) = delivered {
        log::error!("Collaborator panicked: {}", panic_message(payload.as_ref()));
    }
}

/// Forward events to collaborators, logging (never propagating) failures
fn dispatch<H: Host + ?Sized>(events: &[GameEvent], host: &mut H) {
    for event in events {
        let result = match *event {
            GameEvent::Sound(cue) => host.play_sound(cue),
            GameEvent::LevelComplete { level } => host.show_level_complete(level),
            GameEvent::GameOver { score } => host.show_game_over(score),
        };
        if let Err(err) = result {
            log::warn!("Collaborator failed on {:?}: {}", event, err);
        }
    }
}

thread_local! {
    /// Set while this thread runs inside [`contain`]
    static CONTAINED: Cell<bool> = const { Cell::new(false) };
    /// Location of the last contained panic on this thread
    static PANIC_SITE: RefCell<Option<String>> = const { RefCell::new(None) };
}

static QUIET_HOOK: Once = Once::new();

/// Chain a panic hook that keeps contained panics off stderr
///
/// Panics outside a boundary still go to the previous hook.
fn install_quiet_hook() {
    QUIET_HOOK.call_once(|| {
        let previous = panic::take_hook();
        panic::set_hook(Box::new(move |info| {
            if CONTAINED.with(Cell::get) {
                let site = info.location().map(|l| format!("{}:{}", l.file(), l.line()));
                PANIC_SITE.with(|s| *s.borrow_mut() = site);
            } else {
                previous(info);
            }
        }));
    });
}

/// Run `f`, catching any panic; the panic is reported through `log` only
fn contain<R>(f: impl FnOnce() -> R) -> std::thread::Result<R> {
    install_quiet_hook();
    let outer = CONTAINED.with(|c| c.replace(true));
    let result = panic::catch_unwind(AssertUnwindSafe(f));
    CONTAINED.with(|c| c.set(outer));
    result
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    let message = if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    };
    match PANIC_SITE.with(|s| s.borrow_mut().take()) {
        Some(site) => format!("{message} at {site}"),
        None => message,
    }
}
