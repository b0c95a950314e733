use anyhow::Context;
use arena_client::{InputSource, Session};
use arena_core::Fixed;
use arena_net::InputLogReader;
use arena_physics::InputSample;
use serde::Deserialize;
use std::{fs, path::Path};

#[derive(Debug, Deserialize)]
struct ScriptedInputFile {
    steps: Vec<ScriptedStep>,
}

#[derive(Debug, Clone, Deserialize, Default)]
struct ScriptedStep {
    ticks: u64,
    #[serde(default)]
    up: bool,
    #[serde(default)]
    down: bool,
    #[serde(default)]
    left: bool,
    #[serde(default)]
    right: bool,
    /// Mouse offset from the player in world units; steering when present.
    #[serde(default)]
    mouse: Option<[f32; 2]>,
}

impl ScriptedStep {
    fn sample(&self) -> InputSample {
        let (mouse_active, [dx, dy]) = match self.mouse {
            Some(offset) => (true, offset),
            None => (false, [0.0, 0.0]),
        };
        InputSample {
            up: self.up,
            down: self.down,
            left: self.left,
            right: self.right,
            mouse_active,
            mouse_dx: Fixed::from_world(dx),
            mouse_dy: Fixed::from_world(dy),
        }
    }
}

/// Plays a fixed input script; the last step repeats forever.
pub struct ScriptedInputPlayer {
    steps: Vec<ScriptedStep>,
    index: usize,
    ticks_in_step: u64,
}

impl ScriptedInputPlayer {
    pub fn from_path(path: &Path) -> anyhow::Result<Self> {
        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read scripted input {}", path.display()))?;
        Self::from_json(&contents)
    }

    pub fn from_json(contents: &str) -> anyhow::Result<Self> {
        let file: ScriptedInputFile = serde_json::from_str(contents)?;
        if file.steps.is_empty() {
            anyhow::bail!("scripted input file contains no steps");
        }
        Ok(Self {
            steps: file.steps,
            index: 0,
            ticks_in_step: 0,
        })
    }

    pub fn advance(&mut self) -> InputSample {
        while self.index + 1 < self.steps.len()
            && self.ticks_in_step >= self.steps[self.index].ticks
        {
            self.index += 1;
            self.ticks_in_step = 0;
        }
        self.ticks_in_step += 1;
        self.steps
            .get(self.index)
            .map(ScriptedStep::sample)
            .unwrap_or_default()
    }
}

/// Replays a recorded JSONL input log, then goes idle.
pub struct RecordedInputPlayer {
    reader: InputLogReader,
}

impl RecordedInputPlayer {
    pub fn from_path(path: &Path) -> anyhow::Result<Self> {
        Ok(Self {
            reader: InputLogReader::load(path)?,
        })
    }
}

/// Input source selected on the command line.
pub enum ScriptedInput {
    Script(ScriptedInputPlayer),
    Recording(RecordedInputPlayer),
}

impl ScriptedInput {
    /// `.jsonl` files are recordings; anything else is a step script.
    pub fn from_path(path: &Path) -> anyhow::Result<Self> {
        if path.extension().is_some_and(|ext| ext == "jsonl") {
            Ok(Self::Recording(RecordedInputPlayer::from_path(path)?))
        } else {
            Ok(Self::Script(ScriptedInputPlayer::from_path(path)?))
        }
    }
}

impl InputSource for ScriptedInput {
    fn sample(&mut self, _session: &Session) -> InputSample {
        match self {
            Self::Script(player) => player.advance(),
            Self::Recording(player) => player
                .reader
                .next_entry()
                .map(|entry| entry.input)
                .unwrap_or_default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use arena_core::InputSeq;
    use arena_net::{InputLogEntry, InputLogger};
    use tempfile::tempdir;

    #[test]
    fn steps_advance_by_tick_and_last_repeats() {
        let mut player = ScriptedInputPlayer::from_json(
            r#"{ "steps": [
                { "ticks": 2, "up": true },
                { "ticks": 1, "mouse": [30, -40] }
            ] }"#,
        )
        .unwrap();

        assert!(player.advance().up);
        assert!(player.advance().up);
        let steer = player.advance();
        assert!(!steer.up);
        assert!(steer.mouse_active);
        assert_eq!(steer.mouse_dx, Fixed(30_000));
        assert_eq!(steer.mouse_dy, Fixed(-40_000));
        assert_eq!(player.advance(), steer);
        assert_eq!(player.advance(), steer);
    }

    #[test]
    fn zero_tick_steps_are_skipped() {
        let mut player = ScriptedInputPlayer::from_json(
            r#"{ "steps": [ { "ticks": 0, "up": true }, { "ticks": 1, "left": true } ] }"#,
        )
        .unwrap();
        let first = player.advance();
        assert!(first.left && !first.up);
    }

    #[test]
    fn empty_script_is_rejected() {
        assert!(ScriptedInputPlayer::from_json(r#"{ "steps": [] }"#).is_err());
    }

    #[test]
    fn recordings_replay_then_idle() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("run.jsonl");
        let mut logger = InputLogger::create(&path).unwrap();
        let pressed = InputSample {
            down: true,
            ..InputSample::default()
        };
        logger
            .log(&InputLogEntry {
                seq: InputSeq(1),
                input: pressed,
                slow_mul: Fixed::ONE,
            })
            .unwrap();
        logger.flush().unwrap();
        drop(logger);

        let session = Session::new(arena_assets::MapStore::new(dir.path()), 8);
        let mut source = ScriptedInput::from_path(&path).unwrap();
        assert!(matches!(source, ScriptedInput::Recording(_)));
        assert_eq!(source.sample(&session), pressed);
        assert_eq!(source.sample(&session), InputSample::default());
    }
}
