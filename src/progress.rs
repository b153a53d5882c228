use crate::state::RunState;
use std::path::Path;
use std::time::{Duration, Instant};
use tracing::info;

const TICK_LINES: u64 = 100_000;
const TICK_INTERVAL: Duration = Duration::from_secs(2);

pub trait ProgressSink {
    fn start_input(&mut self, _path: &Path) {}
    fn on_line(&mut self, _state: &RunState) {}
    fn finish(&mut self, _state: &RunState) {}
}

pub struct ProgressReporter {
    enabled: bool,
    lines_since_tick: u64,
    last_emit: Instant,
    current_input: Option<String>,
}

impl ProgressReporter {
    pub fn new(enabled: bool) -> Self {
        Self {
            enabled,
            lines_since_tick: 0,
            last_emit: Instant::now(),
            current_input: None,
        }
    }

    fn current_input(&self) -> &str {
        self.current_input.as_deref().unwrap_or("unknown input")
    }

    fn reset_tick(&mut self) {
        self.lines_since_tick = 0;
        self.last_emit = Instant::now();
    }
}

impl ProgressSink for ProgressReporter {
    fn start_input(&mut self, path: &Path) {
        if !self.enabled {
            return;
        }
        self.current_input = Some(path.display().to_string());
        info!(input = self.current_input(), "Processing input");
        self.reset_tick();
    }

    fn on_line(&mut self, state: &RunState) {
        if !self.enabled {
            return;
        }
        self.lines_since_tick += 1;
        if self.lines_since_tick >= TICK_LINES || self.last_emit.elapsed() >= TICK_INTERVAL {
            info!(
                input = self.current_input(),
                lines = state.lines,
                successful = state.successful,
                failed = state.failed,
                duplicates = state.duplicates,
                missing = state.missing,
                "Progress"
            );
            self.reset_tick();
        }
    }

    fn finish(&mut self, state: &RunState) {
        if !self.enabled {
            return;
        }
        info!(input = self.current_input(), lines = state.lines, "Finished input");
        self.current_input = None;
    }
}
