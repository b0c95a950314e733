//! Async tick loop driving a [`Session`] over a live connection.

use crate::session::{Session, SessionEvent};
use anyhow::{Context, Result};
use arena_core::DEFAULT_TICK_HZ;
use arena_net::{ClientConnection, Inbound, InputLogEntry, InputLogger};
use arena_physics::InputSample;
use std::time::Duration;
use tokio::time::{interval, MissedTickBehavior};
use tracing::{info, warn};

/// Produces the control reading for each local tick.
pub trait InputSource {
    /// Sample the controls for the next tick.
    fn sample(&mut self, session: &Session) -> InputSample;
}

/// Inputs that never press anything.
#[derive(Debug, Clone, Copy, Default)]
pub struct IdleInput;

impl InputSource for IdleInput {
    fn sample(&mut self, _session: &Session) -> InputSample {
        InputSample::default()
    }
}

/// Presentation hook: receives every batch of session events.
pub trait Presenter {
    /// React to `events`; `session` exposes the current state.
    fn present(&mut self, session: &Session, events: &[SessionEvent]);
}

/// Presenter that drops everything.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullPresenter;

impl Presenter for NullPresenter {
    fn present(&mut self, _session: &Session, _events: &[SessionEvent]) {}
}

/// Tuning for [`run`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DriverOptions {
    /// Local ticks per second.
    pub tick_hz: u32,
    /// Stop (and close the connection) after this many ticks.
    pub max_ticks: Option<u64>,
}

impl Default for DriverOptions {
    fn default() -> Self {
        Self {
            tick_hz: DEFAULT_TICK_HZ,
            max_ticks: None,
        }
    }
}

/// Why [`run`] returned.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DriverExit {
    /// The server closed the connection.
    Closed {
        /// Close reason, if the server gave one.
        reason: Option<String>,
        /// Ticks run before the close.
        ticks: u64,
    },
    /// The tick limit was reached and the client hung up.
    TickLimit {
        /// Ticks run.
        ticks: u64,
    },
}

/// Drive `session` over `connection` until the connection closes or the tick
/// limit is reached.
///
/// Inbound frames are handled as they arrive; local ticks run on a fixed
/// interval that skips missed ticks instead of bursting to catch up. Every
/// exit, including errors, leaves the session disconnected.
pub async fn run(
    session: &mut Session,
    connection: &mut ClientConnection,
    input: &mut impl InputSource,
    presenter: &mut impl Presenter,
    recorder: Option<&mut InputLogger>,
    options: DriverOptions,
) -> Result<DriverExit> {
    let result = drive(session, connection, input, presenter, recorder, options).await;
    if result.is_err() && session.connection().is_open() {
        let events = session.on_close();
        presenter.present(session, &events);
    }
    result
}

async fn drive(
    session: &mut Session,
    connection: &mut ClientConnection,
    input: &mut impl InputSource,
    presenter: &mut impl Presenter,
    mut recorder: Option<&mut InputLogger>,
    options: DriverOptions,
) -> Result<DriverExit> {
    for msg in session.on_open() {
        connection.send(&msg).await?;
    }

    let period = Duration::from_secs_f64(1.0 / f64::from(options.tick_hz.max(1)));
    let mut ticker = interval(period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
    let mut ticks: u64 = 0;

    loop {
        tokio::select! {
            inbound = connection.recv() => {
                match inbound? {
                    Inbound::Message(msg) => {
                        let events = session.handle_message(msg);
                        presenter.present(session, &events);
                    }
                    Inbound::Malformed(err) => {
                        let events = session.handle_decoded(Err(err));
                        presenter.present(session, &events);
                    }
                    Inbound::Closed { reason } => {
                        let events = session.on_close();
                        presenter.present(session, &events);
                        return Ok(DriverExit::Closed { reason, ticks });
                    }
                }
            }
            _ = ticker.tick() => {
                let sample = input.sample(session);
                let outcome = session.tick(sample);
                if let (Some(logger), Some(applied)) = (recorder.as_mut(), outcome.applied) {
                    logger
                        .log(&InputLogEntry::from(applied))
                        .context("Failed to record input")?;
                }
                for msg in &outcome.messages {
                    connection.send(msg).await?;
                }
                if outcome.applied.is_some() {
                    presenter.present(session, &[SessionEvent::Predicted(*session.predicted())]);
                }

                ticks += 1;
                if options.max_ticks.is_some_and(|max| ticks >= max) {
                    info!(ticks, "Tick limit reached; disconnecting");
                    if let Err(err) = connection.close().await {
                        warn!(error = %err, "Failed to close connection cleanly");
                    }
                    let events = session.on_close();
                    presenter.present(session, &events);
                    return Ok(DriverExit::TickLimit { ticks });
                }
            }
        }
    }
}
