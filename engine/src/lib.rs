use std::{fs, io, path::Path};

use serde::{Deserialize, Serialize, de::DeserializeOwned};

/// Linear state history with a movable cursor.
///
/// Recording after a rewind drops the rewound future. An optional limit caps
/// how many states are kept; the oldest ones fall off first.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TimeMachine<State> {
    states: Vec<State>,
    frame: usize,
    #[serde(default)]
    limit: Option<usize>,
}

impl<State> TimeMachine<State> {
    pub fn new(initial_state: State) -> Self {
        Self {
            states: vec![initial_state],
            frame: 0,
            limit: None,
        }
    }

    /// Keep at most `limit` states (clamped to at least one).
    pub fn with_limit(initial_state: State, limit: usize) -> Self {
        Self {
            states: vec![initial_state],
            frame: 0,
            limit: Some(limit.max(1)),
        }
    }

    pub fn frame(&self) -> usize {
        self.frame
    }

    pub fn len(&self) -> usize {
        self.states.len()
    }

    pub fn is_empty(&self) -> bool {
        self.states.is_empty()
    }

    pub fn limit(&self) -> Option<usize> {
        self.limit
    }

    pub fn state(&self) -> &State {
        &self.states[self.frame]
    }

    pub fn state_at(&self, frame: usize) -> Option<&State> {
        self.states.get(frame)
    }

    pub fn history(&self) -> &[State] {
        &self.states
    }

    pub fn can_rewind(&self) -> bool {
        self.frame > 0
    }

    pub fn can_forward(&self) -> bool {
        self.frame + 1 < self.states.len()
    }

    pub fn rewind(&mut self, frames: usize) -> usize {
        self.frame = self.frame.saturating_sub(frames);
        self.frame
    }

    pub fn forward(&mut self, frames: usize) -> usize {
        let max_frame = self.states.len().saturating_sub(1);
        self.frame = (self.frame + frames).min(max_frame);
        self.frame
    }

    pub fn seek(&mut self, frame: usize) -> usize {
        let max_frame = self.states.len().saturating_sub(1);
        self.frame = frame.min(max_frame);
        self.frame
    }

    pub fn record(&mut self, state: State) -> usize {
        if self.frame + 1 < self.states.len() {
            self.states.truncate(self.frame + 1);
        }
        self.states.push(state);
        self.frame += 1;

        if let Some(limit) = self.limit {
            let overflow = self.states.len().saturating_sub(limit);
            if overflow > 0 {
                self.states.drain(..overflow);
                self.frame -= overflow;
            }
        }
        self.frame
    }

    /// Drop all history and start over from `initial_state`.
    pub fn reset(&mut self, initial_state: State) {
        self.states.clear();
        self.states.push(initial_state);
        self.frame = 0;
    }
}

impl<State: Serialize> TimeMachine<State> {
    pub fn save_json_file(&self, path: impl AsRef<Path>) -> io::Result<()> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        let text = serde_json::to_string_pretty(self)
            .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;
        fs::write(path, text)
    }
}

impl<State: DeserializeOwned> TimeMachine<State> {
    pub fn load_json_file(path: impl AsRef<Path>) -> io::Result<Self> {
        let bytes = fs::read(path)?;
        let tm: Self = serde_json::from_slice(&bytes)
            .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;
        if tm.states.is_empty() || tm.frame >= tm.states.len() {
            return Err(io::Error::new(
                io::ErrorKind::InvalidData,
                "timemachine frame out of range",
            ));
        }
        Ok(tm)
    }
}

pub trait GameLogic {
    type State;
    type Input;

    fn initial_state(&self) -> Self::State;
    fn step(&self, state: &Self::State, input: Self::Input) -> Self::State;
}

#[derive(Debug)]
pub struct HeadlessRunner<G: GameLogic> {
    game: G,
    timemachine: TimeMachine<G::State>,
}

impl<G: GameLogic> HeadlessRunner<G> {
    pub fn new(game: G) -> Self {
        let initial_state = game.initial_state();
        Self {
            game,
            timemachine: TimeMachine::new(initial_state),
        }
    }

    pub fn from_timemachine(game: G, timemachine: TimeMachine<G::State>) -> Self {
        Self { game, timemachine }
    }

    pub fn game(&self) -> &G {
        &self.game
    }

    pub fn frame(&self) -> usize {
        self.timemachine.frame()
    }

    pub fn state(&self) -> &G::State {
        self.timemachine.state()
    }

    pub fn history(&self) -> &[G::State] {
        self.timemachine.history()
    }

    pub fn timemachine(&self) -> &TimeMachine<G::State> {
        &self.timemachine
    }

    pub fn step(&mut self, input: G::Input) -> usize {
        let next_state = self.game.step(self.timemachine.state(), input);
        self.timemachine.record(next_state)
    }

    pub fn run<I>(&mut self, inputs: I) -> usize
    where
        I: IntoIterator<Item = G::Input>,
    {
        let mut last_frame = self.frame();
        for input in inputs {
            last_frame = self.step(input);
        }
        last_frame
    }

    pub fn rewind(&mut self, frames: usize) -> usize {
        self.timemachine.rewind(frames)
    }

    pub fn forward(&mut self, frames: usize) -> usize {
        self.timemachine.forward(frames)
    }

    pub fn seek(&mut self, frame: usize) -> usize {
        self.timemachine.seek(frame)
    }

    pub fn reset(&mut self) {
        let initial_state = self.game.initial_state();
        self.timemachine.reset(initial_state);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Doubling;

    impl GameLogic for Doubling {
        type State = u32;
        type Input = bool;

        fn initial_state(&self) -> Self::State {
            1
        }

        fn step(&self, state: &Self::State, input: Self::Input) -> Self::State {
            if input { state * 2 } else { *state }
        }
    }

    #[test]
    fn timemachine_rewind_and_branch() {
        let mut tm = TimeMachine::new(0);
        tm.record(1);
        tm.record(2);
        assert_eq!(tm.state(), &2);

        tm.rewind(1);
        assert_eq!(tm.state(), &1);
        assert!(tm.can_forward());
        assert_eq!(tm.state_at(2), Some(&2));

        tm.record(99);
        assert!(!tm.can_forward());
        assert_eq!(tm.history(), &[0, 1, 99]);
        assert_eq!(tm.frame(), 2);
    }

    #[test]
    fn limit_drops_oldest_states() {
        let mut tm = TimeMachine::with_limit(0, 3);
        for n in 1..=5 {
            tm.record(n);
        }
        assert_eq!(tm.history(), &[3, 4, 5]);
        assert_eq!(tm.frame(), 2);
        assert_eq!(tm.state(), &5);

        tm.rewind(10);
        assert_eq!(tm.state(), &3);
        assert!(!tm.can_rewind());
    }

    #[test]
    fn reset_keeps_limit() {
        let mut tm = TimeMachine::with_limit(7, 2);
        tm.record(8);
        tm.reset(0);
        assert_eq!(tm.history(), &[0]);
        assert_eq!(tm.limit(), Some(2));
    }

    #[test]
    fn runner_steps_seeks_and_resets() {
        let mut runner = HeadlessRunner::new(Doubling);
        runner.run([true, false, true]);
        assert_eq!(runner.frame(), 3);
        assert_eq!(runner.state(), &4);

        runner.seek(1);
        assert_eq!(runner.state(), &2);

        runner.forward(5);
        assert_eq!(runner.state(), &4);

        runner.reset();
        assert_eq!(runner.frame(), 0);
        assert_eq!(runner.history(), &[1]);
    }
}
