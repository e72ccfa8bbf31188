//! Host collaborator interfaces: console, pins, and clock.
//!
//! On a microcontroller these map to the serial port, GPIO, and a busy
//! delay. Hosted builds (tests, desktop) use the in-memory stubs or the
//! std-backed implementations below.

use std::collections::VecDeque;
use std::io::BufRead;
use std::sync::mpsc;
use std::thread;
use std::time::Duration;

/// Line-oriented console. The VM's only output channel.
pub trait Console {
    /// Write one line of text, newline included.
    fn print_line(&mut self, text: &str);

    /// Read one line, waiting at most `timeout_ms`. `None` on timeout.
    fn read_line_with_timeout(&mut self, timeout_ms: u32) -> Option<String>;
}

/// Digital output pins.
pub trait Pins {
    /// Configure a pin as an output.
    fn set_output(&mut self, pin: u8);

    /// Drive a pin high or low.
    fn write(&mut self, pin: u8, high: bool);
}

/// Millisecond clock.
pub trait Clock {
    /// Block for `ms` milliseconds.
    fn sleep_ms(&mut self, ms: u32);
}

impl<T: Console + ?Sized> Console for &mut T {
    fn print_line(&mut self, text: &str) {
        (**self).print_line(text)
    }

    fn read_line_with_timeout(&mut self, timeout_ms: u32) -> Option<String> {
        (**self).read_line_with_timeout(timeout_ms)
    }
}

impl<T: Pins + ?Sized> Pins for &mut T {
    fn set_output(&mut self, pin: u8) {
        (**self).set_output(pin)
    }

    fn write(&mut self, pin: u8, high: bool) {
        (**self).write(pin, high)
    }
}

impl<T: Clock + ?Sized> Clock for &mut T {
    fn sleep_ms(&mut self, ms: u32) {
        (**self).sleep_ms(ms)
    }
}

// ---- Hosted stubs ----

/// In-memory console: records every output line, serves scripted input.
#[derive(Debug, Default)]
pub struct BufferConsole {
    /// Every line printed, in order.
    pub lines: Vec<String>,
    inputs: VecDeque<Option<String>>,
}

impl BufferConsole {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a line for the next `read_line_with_timeout`.
    pub fn push_input(&mut self, line: &str) {
        self.inputs.push_back(Some(line.to_string()));
    }

    /// Queue a timeout for the next `read_line_with_timeout`.
    pub fn push_timeout(&mut self) {
        self.inputs.push_back(None);
    }

    /// All output joined with newlines.
    pub fn output(&self) -> String {
        self.lines.join("\n")
    }
}

impl Console for BufferConsole {
    fn print_line(&mut self, text: &str) {
        self.lines.push(text.to_string());
    }

    fn read_line_with_timeout(&mut self, _timeout_ms: u32) -> Option<String> {
        self.inputs.pop_front().flatten()
    }
}

/// Records pin-mode changes and writes instead of touching hardware.
#[derive(Debug, Default)]
pub struct RecordingPins {
    /// Pins configured as outputs, in call order.
    pub outputs: Vec<u8>,
    /// Every (pin, level) write, in call order.
    pub writes: Vec<(u8, bool)>,
}

impl RecordingPins {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Pins for RecordingPins {
    fn set_output(&mut self, pin: u8) {
        self.outputs.push(pin);
    }

    fn write(&mut self, pin: u8, high: bool) {
        self.writes.push((pin, high));
    }
}

/// Pin driver that ignores everything. For hosts with no GPIO.
#[derive(Debug, Default)]
pub struct NullPins;

impl Pins for NullPins {
    fn set_output(&mut self, _pin: u8) {}

    fn write(&mut self, _pin: u8, _high: bool) {}
}

/// Records requested delays without sleeping.
#[derive(Debug, Default)]
pub struct ManualClock {
    /// Every requested delay, in call order.
    pub sleeps: Vec<u32>,
}

impl ManualClock {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Clock for ManualClock {
    fn sleep_ms(&mut self, ms: u32) {
        self.sleeps.push(ms);
    }
}

// ---- Std-backed implementations ----

/// Console over stdout/stdin.
#[derive(Debug, Default)]
pub struct StdConsole;

impl Console for StdConsole {
    fn print_line(&mut self, text: &str) {
        println!("{text}");
    }

    fn read_line_with_timeout(&mut self, timeout_ms: u32) -> Option<String> {
        // stdin has no native timeout; a helper thread does the blocking
        // read and the deadline is enforced on the channel.
        let (tx, rx) = mpsc::channel();
        thread::spawn(move || {
            let mut line = String::new();
            if std::io::stdin().lock().read_line(&mut line).is_ok() {
                let _ = tx.send(line);
            }
        });
        rx.recv_timeout(Duration::from_millis(u64::from(timeout_ms)))
            .ok()
            .map(|line| line.trim_end_matches(['\r', '\n']).to_string())
    }
}

/// Clock over `std::thread::sleep`.
#[derive(Debug, Default)]
pub struct StdClock;

impl Clock for StdClock {
    fn sleep_ms(&mut self, ms: u32) {
        thread::sleep(Duration::from_millis(u64::from(ms)));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn buffer_console_records_output() {
        let mut console = BufferConsole::new();
        console.print_line("a");
        console.print_line("b");
        assert_eq!(console.lines, vec!["a", "b"]);
        assert_eq!(console.output(), "a\nb");
    }

    #[test]
    fn buffer_console_scripted_input() {
        let mut console = BufferConsole::new();
        console.push_input("42");
        console.push_timeout();
        assert_eq!(console.read_line_with_timeout(1000), Some("42".to_string()));
        assert_eq!(console.read_line_with_timeout(1000), None);
        // Exhausted queue reads as timeout.
        assert_eq!(console.read_line_with_timeout(1000), None);
    }

    #[test]
    fn recording_pins() {
        let mut pins = RecordingPins::new();
        pins.set_output(13);
        pins.write(13, true);
        pins.write(13, false);
        assert_eq!(pins.outputs, vec![13]);
        assert_eq!(pins.writes, vec![(13, true), (13, false)]);
    }

    #[test]
    fn manual_clock() {
        let mut clock = ManualClock::new();
        clock.sleep_ms(250);
        assert_eq!(clock.sleeps, vec![250]);
    }

    #[test]
    fn mut_ref_forwarding() {
        fn takes_console(mut console: impl Console) {
            console.print_line("via ref");
        }
        let mut buffer = BufferConsole::new();
        takes_console(&mut buffer);
        assert_eq!(buffer.lines, vec!["via ref"]);
    }
}
