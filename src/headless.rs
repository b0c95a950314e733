use crate::config::ClientConfig;
use crate::scripted_input::ScriptedInput;
use anyhow::{Context, Result};
use arena_assets::MapStore;
use arena_client::{
    driver, DriverExit, DriverOptions, IdleInput, InputSource, Presenter, Session, SessionEvent,
};
use arena_net::{ClientConnection, InputLogger};
use arena_physics::InputSample;
use std::path::PathBuf;
use std::time::Duration;
use tracing::{debug, info, trace, warn};

pub struct HeadlessConfig {
    pub client: ClientConfig,
    pub scripted_input: Option<PathBuf>,
    pub record_inputs: Option<PathBuf>,
    pub max_ticks: Option<u64>,
}

pub fn run(cfg: HeadlessConfig) -> Result<()> {
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("Failed to start async runtime")?;
    runtime.block_on(run_session(cfg))
}

enum HeadlessInput {
    Idle(IdleInput),
    Scripted(ScriptedInput),
}

impl InputSource for HeadlessInput {
    fn sample(&mut self, session: &Session) -> InputSample {
        match self {
            Self::Idle(input) => input.sample(session),
            Self::Scripted(input) => input.sample(session),
        }
    }
}

/// Logs what a renderer would draw.
struct LogPresenter;

impl Presenter for LogPresenter {
    fn present(&mut self, session: &Session, events: &[SessionEvent]) {
        for event in events {
            match event {
                SessionEvent::Identified { player_id } => info!(player_id, "Joined server"),
                SessionEvent::RoomChanged { from, to } => info!(?from, ?to, "Room changed"),
                SessionEvent::MapChanged { id } => info!(map = %id, "Map loaded"),
                SessionEvent::WaveDefined(def) => {
                    info!(wave = def.wave_number, half_size = def.half_size, "Wave defined")
                }
                SessionEvent::InviteReceived(invite) => info!(
                    from_id = invite.from_id,
                    from = %invite.from_name,
                    "Party invite received"
                ),
                SessionEvent::PartyChanged(party) => info!(
                    party_id = party.party_id,
                    leader_id = party.leader_id,
                    members = party.members.len(),
                    "Party updated"
                ),
                SessionEvent::LeaderboardUpdated => {
                    debug!(entries = session.leaderboard().len(), "Leaderboard updated")
                }
                SessionEvent::SnapshotApplied { tick, room } => {
                    let position = session.local_player_position();
                    trace!(tick, ?room, x = position.x, y = position.y, "Snapshot applied")
                }
                SessionEvent::Reconciled(result) => trace!(?result, "Reconciled"),
                SessionEvent::Disconnected => info!("Disconnected"),
                _ => {}
            }
        }
    }
}

async fn run_session(cfg: HeadlessConfig) -> Result<()> {
    let client = &cfg.client;
    let mut input = match &cfg.scripted_input {
        Some(path) => HeadlessInput::Scripted(ScriptedInput::from_path(path)?),
        None => HeadlessInput::Idle(IdleInput),
    };
    let mut recorder = match &cfg.record_inputs {
        Some(path) => Some(InputLogger::create(path)?),
        None => None,
    };

    let mut session = Session::new(MapStore::new(&client.maps_dir), client.max_pending_inputs);
    if !client.player_name.is_empty() {
        session.commit_name(&client.player_name);
    }
    let mut presenter = LogPresenter;
    let mut remaining = cfg.max_ticks;
    let delay = Duration::from_millis(client.reconnect_delay_ms);

    loop {
        if remaining == Some(0) {
            break;
        }
        let mut connection = match ClientConnection::connect(&client.server_url).await {
            Ok(connection) => connection,
            Err(err) if client.reconnect => {
                warn!(error = %format!("{err:#}"), "Connection failed; retrying");
                if interrupted_during(delay).await {
                    break;
                }
                continue;
            }
            Err(err) => return Err(err),
        };

        let options = DriverOptions {
            tick_hz: client.tick_hz,
            max_ticks: remaining,
        };
        let exit = tokio::select! {
            exit = driver::run(
                &mut session,
                &mut connection,
                &mut input,
                &mut presenter,
                recorder.as_mut(),
                options,
            ) => exit,
            _ = tokio::signal::ctrl_c() => {
                info!("Interrupted; disconnecting");
                if let Err(err) = connection.close().await {
                    debug!(error = %err, "Close after interrupt failed");
                }
                session.on_close();
                break;
            }
        };

        match exit {
            Ok(DriverExit::TickLimit { ticks }) => {
                info!(ticks, "Finished");
                break;
            }
            Ok(DriverExit::Closed { reason, ticks }) => {
                info!(?reason, ticks, "Server closed the connection");
                remaining = remaining.map(|left| left.saturating_sub(ticks));
            }
            Err(err) if client.reconnect => {
                warn!(error = %format!("{err:#}"), "Connection lost")
            }
            Err(err) => return Err(err),
        }
        if !client.reconnect || interrupted_during(delay).await {
            break;
        }
    }

    if let Some(recorder) = recorder.as_mut() {
        recorder.flush()?;
        info!(entries = recorder.entries_written(), "Input recording saved");
    }
    let metrics = session.predictor().metrics();
    info!(
        predictions = metrics.total_predictions,
        replays = metrics.total_replays,
        resyncs = metrics.total_resyncs,
        evicted = metrics.evicted_inputs,
        max_correction = metrics.max_correction,
        "Prediction summary"
    );
    Ok(())
}

/// Sleep for `delay`; returns true if Ctrl-C arrived first.
async fn interrupted_during(delay: Duration) -> bool {
    tokio::select! {
        _ = tokio::time::sleep(delay) => false,
        _ = tokio::signal::ctrl_c() => true,
    }
}
