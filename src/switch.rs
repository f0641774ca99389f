//! # Polling Switch Reader
//!
//! A background sampler task reads a digital input every poll interval (20 ms
//! by default) and emits a [`SwitchEvent`] each time the input changes into the
//! configured trigger level. Events travel over an mpsc channel to either a
//! dispatcher on tokio's blocking pool running the user callback or straight to
//! the caller, so a slow callback never holds up sampling.
//!
//! Stopping is cooperative: [`PollingSwitch::stop`] signals the sampler, which
//! exits at its next wake-up and hands the input back. A later start samples
//! the hardware afresh.
//!
//! ```rust,no_run
//! use rpi_components::hal::mock::MockBoard;
//! use rpi_components::hal::{Level, Pull};
//! use rpi_components::switch::PollingSwitch;
//!
//! # async fn demo() -> rpi_components::Result<()> {
//! let board = MockBoard::new();
//! let mut switch = PollingSwitch::new(board.input(21, Pull::Down)?, Level::High);
//! switch.start(|event| println!("switch {} pressed", event.switch_id))?;
//! // ...
//! switch.stop().await?;
//! # Ok(())
//! # }
//! ```

use crate::error::{ComponentError, Result};
use crate::hal::{InputLine, Level};
use crate::util::logging::LogThrottle;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::{Duration, Instant};
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;

pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(20);

static NEXT_SWITCH_ID: AtomicUsize = AtomicUsize::new(1);

/// One transition into the trigger level
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SwitchEvent {
    pub switch_id: usize,
    pub level: Level,
    pub at: Instant,
}

struct Running<I> {
    shutdown_tx: oneshot::Sender<()>,
    sampler: JoinHandle<I>,
}

/// Input watched by a background sampling task
pub struct PollingSwitch<I: InputLine + Send + 'static> {
    id: usize,
    input: Option<I>,
    trigger: Level,
    poll_interval: Duration,
    running: Option<Running<I>>,
}

impl<I: InputLine + Send + 'static> PollingSwitch<I> {
    /// Watch `input` for transitions into `trigger`
    pub fn new(input: I, trigger: Level) -> Self {
        Self {
            id: NEXT_SWITCH_ID.fetch_add(1, Ordering::Relaxed),
            input: Some(input),
            trigger,
            poll_interval: DEFAULT_POLL_INTERVAL,
            running: None,
        }
    }

    pub fn with_poll_interval(mut self, poll_interval: Duration) -> Self {
        self.poll_interval = poll_interval;
        self
    }

    /// Process-unique instance number, starting at 1
    pub fn id(&self) -> usize {
        self.id
    }

    pub fn trigger(&self) -> Level {
        self.trigger
    }

    pub fn poll_interval(&self) -> Duration {
        self.poll_interval
    }

    pub fn is_running(&self) -> bool {
        self.running.is_some()
    }

    /// Start sampling; `callback` runs on the blocking thread pool for every
    /// event and may block without stalling the sampler.
    ///
    /// The dispatcher exits once the sampler stops and queued events drain.
    pub fn start<F>(&mut self, mut callback: F) -> Result<()>
    where
        F: FnMut(SwitchEvent) + Send + 'static,
    {
        let mut events = self.start_channel()?;
        tokio::task::spawn_blocking(move || {
            while let Some(event) = events.blocking_recv() {
                callback(event);
            }
        });
        Ok(())
    }

    /// Start sampling with no handler; transitions are logged at info level
    pub fn start_logging(&mut self) -> Result<()> {
        self.start(|event| {
            log::info!("Callback happened on switch #{}", event.switch_id);
        })
    }

    /// Start sampling and return the raw event stream
    pub fn start_channel(&mut self) -> Result<mpsc::UnboundedReceiver<SwitchEvent>> {
        if self.running.is_some() {
            return Err(ComponentError::invalid(format!(
                "switch #{} is already running",
                self.id
            )));
        }
        let input = self.input.take().ok_or_else(|| {
            ComponentError::TaskFailed(format!("switch #{} has no input", self.id))
        })?;

        let (event_tx, event_rx) = mpsc::unbounded_channel();
        let (shutdown_tx, shutdown_rx) = oneshot::channel();
        let sampler = tokio::spawn(sample_loop(
            input,
            self.id,
            self.trigger,
            self.poll_interval,
            event_tx,
            shutdown_rx,
        ));

        log::debug!(
            "Switch #{} sampling every {:?}, trigger {}",
            self.id,
            self.poll_interval,
            self.trigger
        );
        self.running = Some(Running {
            shutdown_tx,
            sampler,
        });
        Ok(event_rx)
    }

    /// Stop sampling and reclaim the input. A no-op when not running.
    pub async fn stop(&mut self) -> Result<()> {
        let Some(running) = self.running.take() else {
            return Ok(());
        };
        if running.shutdown_tx.send(()).is_err() {
            log::warn!("Switch #{} sampler already exited", self.id);
        }
        match running.sampler.await {
            Ok(input) => {
                self.input = Some(input);
                log::debug!("Switch #{} stopped", self.id);
                Ok(())
            }
            Err(e) => Err(ComponentError::TaskFailed(format!(
                "switch #{} sampler: {e}",
                self.id
            ))),
        }
    }
}

impl<I: InputLine + Send + 'static> Drop for PollingSwitch<I> {
    fn drop(&mut self) {
        if let Some(running) = self.running.take() {
            let _ = running.shutdown_tx.send(());
        }
    }
}

async fn sample_loop<I: InputLine>(
    mut input: I,
    switch_id: usize,
    trigger: Level,
    poll_interval: Duration,
    events: mpsc::UnboundedSender<SwitchEvent>,
    mut shutdown_rx: oneshot::Receiver<()>,
) -> I {
    let mut throttle = LogThrottle::new(5_000, 3);
    let mut last = match input.read() {
        Ok(level) => Some(level),
        Err(e) => {
            log::warn!("Switch #{switch_id} initial read failed: {e}");
            None
        }
    };

    let mut ticker = tokio::time::interval(poll_interval);
    ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            _ = &mut shutdown_rx => break,
            _ = ticker.tick() => {
                let level = match input.read() {
                    Ok(level) => level,
                    Err(e) => {
                        if throttle.allow() {
                            log::warn!("Switch #{switch_id} read failed: {e}");
                        }
                        continue;
                    }
                };
                if last.is_some_and(|prev| prev != level) && level == trigger {
                    let event = SwitchEvent {
                        switch_id,
                        level,
                        at: Instant::now(),
                    };
                    if events.send(event).is_err() {
                        log::debug!("Switch #{switch_id} event receiver dropped");
                    }
                }
                last = Some(level);
            }
        }
    }
    input
}
