//! Rolling look-ahead scheduler.
//!
//! A [`Schedule`] binds a motion vector to an [`Axis`]: it plans a time
//! window ahead of the clock, asks the axis for the cue endpoints the motion
//! will sweep during that window, computes the exact crossing instants and
//! fires callbacks as they come due. Windows advance strictly forward; a
//! single timer is outstanding at any moment.

pub mod timing;

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use log::{debug, error, info};
use parking_lot::Mutex;
use thiserror::Error;
use tokio::sync::Notify;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use cue_axis::Axis;
use cue_types::Interval;
use eventify::{CallbackHandle, CallbackRegistry};

pub use motion_math::{Direction, EndpointEvent, MotionVector};
pub use timing::{LocalTimingSource, TimingSource};

const DEFAULT_LOOKAHEAD_MS: u64 = 5_000;
/// Floor for the armed delay. A zero deadline occurs only at window expiry,
/// where a hair of slack is invisible; events always re-check against the
/// clock when the timer fires.
const MIN_TIMER_DELAY_S: f64 = 1e-3;

#[derive(Clone, Debug)]
pub struct ScheduleConfig {
    pub label: String,
    pub lookahead: Duration,
}

impl Default for ScheduleConfig {
    fn default() -> Self {
        Self {
            label: "dev".to_string(),
            lookahead: Duration::from_millis(DEFAULT_LOOKAHEAD_MS),
        }
    }
}

#[derive(Debug, Error)]
pub enum ScheduleError {
    #[error("schedule loop already running")]
    AlreadyRunning,
    #[error("schedule loop is not running")]
    NotRunning,
    #[error("timer armed while another timer is outstanding")]
    IllegalState,
}

/// Synchronous cycle state: the rolling windows, the ordered queue of pending
/// crossings and the armed deadline.
struct Planner {
    lookahead: f64,
    vector: Option<MotionVector>,
    time_interval: Option<Interval>,
    pos_interval: Option<Interval>,
    queue: Vec<EndpointEvent>,
    armed: Option<f64>,
}

impl Planner {
    fn new(lookahead: f64) -> Self {
        Self {
            lookahead,
            vector: None,
            time_interval: None,
            pos_interval: None,
            queue: Vec::new(),
            armed: None,
        }
    }

    /// Install a fresh motion and drop every plan derived from the old one.
    fn set_vector(&mut self, vector: MotionVector) {
        self.vector = Some(vector);
        self.time_interval = None;
        self.pos_interval = None;
        self.queue.clear();
        self.armed = None;
    }

    /// One cycle: fire whatever is due, then advance the window and load
    /// crossings once `now` moved past it. Windows never regress.
    fn cycle(&mut self, now: f64, axis: &Axis, range: (f64, f64)) -> Vec<EndpointEvent> {
        let mut due = self.pop_due(now);
        let moving = self.vector.map(|v| v.is_moving()).unwrap_or(false);
        if !moving {
            return due;
        }
        let expired = self.time_interval.map(|w| now > w.high()).unwrap_or(true);
        if expired {
            self.advance(now, axis, range);
            due.extend(self.pop_due(now));
        }
        due
    }

    fn advance(&mut self, now: f64, axis: &Axis, range: (f64, f64)) {
        let Some(vector) = self.vector else {
            return;
        };
        let Ok(window) = Interval::new(now, now + self.lookahead, true, false) else {
            return;
        };
        let pos = motion_math::position_interval(&window, &vector);
        debug!("advance window {} sweeping {}", window, pos);
        self.time_interval = Some(window);
        self.pos_interval = Some(pos);
        self.queue.clear();
        self.load(axis, range, window.low());
    }

    /// Cues changed inside the current window: rebuild the queue. Crossings
    /// already in the past drop out silently.
    fn reload(&mut self, now: f64, axis: &Axis, range: (f64, f64)) {
        if self.time_interval.is_none() {
            return;
        }
        self.queue.clear();
        self.load(axis, range, now);
    }

    /// Query the axis for endpoints inside the position window, compute their
    /// crossing instants and queue the keepers in endpoint order.
    fn load(&mut self, axis: &Axis, range: (f64, f64), minimum_ts: f64) {
        let (Some(window), Some(pos), Some(vector)) =
            (self.time_interval, self.pos_interval, self.vector)
        else {
            return;
        };
        let points = axis.get_cue_points_by_interval(&pos);
        if points.is_empty() {
            return;
        }
        let (_, ts_leave) = motion_math::range_intersect(&vector, range);
        // a crossing on the very edge of the window belongs to it
        let span = Interval::closed(window.low(), window.high()).expect("window bounds are ordered");
        let mut events = motion_math::endpoint_events(&span, &vector, &points);
        events.retain(|event| {
            if event.ts < minimum_ts || event.ts >= ts_leave {
                return false;
            }
            // tangent touch: the point does not change active state
            if vector.acceleration != 0.0 && event.direction == Direction::Still {
                return false;
            }
            span.covers(event.ts)
        });
        events.sort_by(|a, b| a.ts.total_cmp(&b.ts).then(a.endpoint.cmp_order(&b.endpoint)));
        debug!("loaded {} crossing(s) into {}", events.len(), span);
        self.queue = events;
    }

    fn pop_due(&mut self, now: f64) -> Vec<EndpointEvent> {
        let due = self
            .queue
            .iter()
            .take_while(|event| event.ts <= now)
            .count();
        self.queue.drain(..due).collect()
    }

    /// Seconds until the next timer target: the queue head or the window end.
    fn next_deadline(&self, now: f64) -> Option<f64> {
        let window = self.time_interval?;
        let target = self
            .queue
            .first()
            .map(|event| event.ts)
            .unwrap_or(window.high());
        Some((target - now).max(0.0))
    }

    fn arm(&mut self, deadline: f64) -> Result<(), ScheduleError> {
        if self.armed.is_some() {
            return Err(ScheduleError::IllegalState);
        }
        self.armed = Some(deadline);
        Ok(())
    }

    fn disarm(&mut self) {
        self.armed = None;
    }
}

enum RuntimeState {
    Stopped,
    Running {
        cancel: CancellationToken,
        handle: JoinHandle<()>,
        axis_sub: CallbackHandle,
    },
}

struct ScheduleInner {
    config: ScheduleConfig,
    axis: Arc<Axis>,
    timing: Arc<dyn TimingSource>,
    planner: Mutex<Planner>,
    callbacks: Mutex<CallbackRegistry<Vec<EndpointEvent>>>,
    cues_changed: AtomicBool,
    wake: Notify,
    state: Mutex<RuntimeState>,
}

impl ScheduleInner {
    async fn run(inner: Arc<ScheduleInner>, cancel: CancellationToken) {
        info!("[{}] schedule loop running", inner.config.label);
        loop {
            let now = inner.timing.now();
            let range = inner.timing.range();
            let due = {
                let mut planner = inner.planner.lock();
                let mut due = planner.cycle(now, &inner.axis, range);
                if inner.cues_changed.swap(false, Ordering::Relaxed) {
                    planner.reload(now, &inner.axis, range);
                    due.extend(planner.pop_due(now));
                }
                due
            };
            if !due.is_empty() {
                debug!("[{}] {} due event(s)", inner.config.label, due.len());
                inner.callbacks.lock().trigger(&due);
            }
            let sleep_for = {
                let mut planner = inner.planner.lock();
                match planner.next_deadline(now) {
                    Some(delta) => {
                        let delta = delta.max(MIN_TIMER_DELAY_S);
                        match planner.arm(now + delta) {
                            Ok(()) => Some(delta),
                            Err(err) => {
                                error!("[{}] {}", inner.config.label, err);
                                break;
                            }
                        }
                    }
                    None => None,
                }
            };
            tokio::select! {
                _ = cancel.cancelled() => break,
                _ = inner.wake.notified() => {
                    inner.planner.lock().disarm();
                }
                _ = sleep_or_park(sleep_for) => {
                    inner.planner.lock().disarm();
                }
            }
        }
        info!("[{}] schedule loop exiting", inner.config.label);
    }
}

async fn sleep_or_park(delta: Option<f64>) {
    match delta {
        Some(seconds) => tokio::time::sleep(Duration::from_secs_f64(seconds)).await,
        None => std::future::pending().await,
    }
}

/// Real-time event generator bound to one axis and one timing source.
pub struct Schedule {
    inner: Arc<ScheduleInner>,
}

impl Schedule {
    pub fn new(axis: Arc<Axis>, timing: Arc<dyn TimingSource>, config: ScheduleConfig) -> Self {
        let lookahead = config.lookahead.as_secs_f64();
        Self {
            inner: Arc::new(ScheduleInner {
                config,
                axis,
                timing,
                planner: Mutex::new(Planner::new(lookahead)),
                callbacks: Mutex::new(CallbackRegistry::new()),
                cues_changed: AtomicBool::new(false),
                wake: Notify::new(),
                state: Mutex::new(RuntimeState::Stopped),
            }),
        }
    }

    /// Spawn the runtime loop on the current tokio runtime. The loop watches
    /// the axis for changes inside the open window.
    pub fn start(&self) -> Result<(), ScheduleError> {
        let mut state = self.inner.state.lock();
        if matches!(*state, RuntimeState::Running { .. }) {
            return Err(ScheduleError::AlreadyRunning);
        }
        let cancel = CancellationToken::new();
        let weak = Arc::downgrade(&self.inner);
        let axis_sub = self.inner.axis.on_change(move |_batch| {
            if let Some(inner) = weak.upgrade() {
                inner.cues_changed.store(true, Ordering::Relaxed);
                inner.wake.notify_one();
            }
        });
        let handle = tokio::spawn(ScheduleInner::run(Arc::clone(&self.inner), cancel.clone()));
        info!("[{}] schedule loop starting", self.inner.config.label);
        *state = RuntimeState::Running {
            cancel,
            handle,
            axis_sub,
        };
        Ok(())
    }

    pub fn stop(&self) -> Result<(), ScheduleError> {
        let mut state = self.inner.state.lock();
        match std::mem::replace(&mut *state, RuntimeState::Stopped) {
            RuntimeState::Running {
                cancel,
                handle,
                axis_sub,
            } => {
                cancel.cancel();
                drop(handle);
                self.inner.axis.off_change(axis_sub);
                info!("[{}] schedule loop stopping", self.inner.config.label);
                Ok(())
            }
            RuntimeState::Stopped => Err(ScheduleError::NotRunning),
        }
    }

    /// Reset to a fresh motion and re-plan. The outstanding timer is
    /// cleared; the loop replans immediately when the motion is moving.
    pub fn set_vector(&self, vector: MotionVector) {
        self.inner.planner.lock().set_vector(vector);
        debug!(
            "[{}] vector set: p={} v={} a={} t={}",
            self.inner.config.label,
            vector.position,
            vector.velocity,
            vector.acceleration,
            vector.timestamp
        );
        self.inner.wake.notify_one();
    }

    pub fn add_callback(
        &self,
        handler: impl Fn(&Vec<EndpointEvent>) + Send + Sync + 'static,
    ) -> CallbackHandle {
        self.inner.callbacks.lock().subscribe(handler)
    }

    pub fn del_callback(&self, handle: CallbackHandle) -> bool {
        self.inner.callbacks.lock().unsubscribe(handle)
    }
}

impl Drop for Schedule {
    fn drop(&mut self) {
        let _ = self.stop();
    }
}
