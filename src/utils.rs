use std::io::{IsTerminal, Write};

/// Prints a running count to stderr every `interval` items. Stays silent
/// when stderr is not a terminal.
pub struct ProgressCounter {
    label: &'static str,
    interval: u64,
    count: u64,
    enabled: bool,
}

impl ProgressCounter {
    pub fn new(label: &'static str, interval: u64) -> Self {
        let counter = Self {
            label,
            interval: interval.max(1),
            count: 0,
            enabled: std::io::stderr().is_terminal(),
        };
        counter.print();
        counter
    }

    pub fn inc(&mut self, delta: u64) {
        let prev = self.count;
        self.count += delta;
        // Print if we crossed an interval boundary
        if prev / self.interval < self.count / self.interval {
            self.print();
        }
    }

    pub fn finish(&self) {
        self.print();
        if self.enabled {
            eprintln!();
        }
    }

    fn print(&self) {
        if !self.enabled {
            return;
        }
        eprint!("\r{}: {}", self.label, self.count);
        let _ = std::io::stderr().flush();
    }
}
