//! Per-request correlator generation.

use chrono::{Local, NaiveTime};

/// Generates the `correlator` attribute for each request of a session.
///
/// A correlator is `HHMMSS-<counter><command>` where the command has all
/// whitespace removed. The counter is never reset, so two requests issued
/// within the same second still get distinct correlators.
#[derive(Debug, Default)]
pub struct Correlator {
    count: u64,
}

impl Correlator {
    /// Create a generator starting at zero.
    pub fn new() -> Self {
        Self::default()
    }

    /// Produce the correlator for `command` using the local wall clock.
    pub fn next(&mut self, command: &str) -> String {
        self.next_at(Local::now().time(), command)
    }

    /// Produce the correlator for `command` at a fixed clock reading.
    pub fn next_at(&mut self, time: NaiveTime, command: &str) -> String {
        let stripped: String = command.split_whitespace().collect();
        let correlator = format!("{}-{}{}", time.format("%H%M%S"), self.count, stripped);
        self.count += 1;
        correlator
    }

    /// Number of correlators issued so far.
    pub fn count(&self) -> u64 {
        self.count
    }
}
