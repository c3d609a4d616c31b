/// Digital lines as the programmer needs them: a handful of outputs with a
/// defined initial level, the data bus switchable to inputs for reading, and
/// a way to hand everything back to a safe state.
///
/// Anything beyond that (edge detection, pull resistors, PWM, ...) is out of
/// scope.

use std::fmt;
use std::io;
use std::thread;
use std::time::{
	Duration,
	Instant,
};

pub mod mock;
pub mod rpi;

/// physical line id (BCM GPIO number on a Raspberry Pi)
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug)]
pub struct Line(pub u8);

impl fmt::Display for Line {
	fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
		write!(f, "GPIO{}", self.0)
	}
}

#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug)]
pub enum Direction {
	Input,
	Output,
}

pub fn reliable_sleep(mut duration: Duration) {
	loop {
		let now = Instant::now();
		thread::sleep(duration);
		let elapsed = now.elapsed();
		if elapsed >= duration {
			return;
		}
		duration -= elapsed;
	}
}

pub trait DigitalIo {
	/// (re)configure a line; `initial_level` is applied before an output
	/// starts driving and ignored for inputs
	fn configure_line(&mut self, line: Line, direction: Direction, initial_level: bool) -> io::Result<()>;

	fn set_line(&mut self, line: Line, level: bool) -> io::Result<()>;

	fn get_line(&mut self, line: Line) -> io::Result<bool>;

	/// return every configured line to an unconfigured (input) state
	fn release_all(&mut self) -> io::Result<()>;

	// wait for (at least) `duration`
	fn delay(&mut self, duration: Duration) {
		reliable_sleep(duration);
	}
}

impl<'a, G: ?Sized + DigitalIo> DigitalIo for &'a mut G {
	fn configure_line(&mut self, line: Line, direction: Direction, initial_level: bool) -> io::Result<()> {
		G::configure_line(*self, line, direction, initial_level)
	}
	fn set_line(&mut self, line: Line, level: bool) -> io::Result<()> {
		G::set_line(*self, line, level)
	}
	fn get_line(&mut self, line: Line) -> io::Result<bool> {
		G::get_line(*self, line)
	}
	fn release_all(&mut self) -> io::Result<()> {
		G::release_all(*self)
	}
	fn delay(&mut self, duration: Duration) {
		G::delay(*self, duration)
	}
}

impl<G: ?Sized + DigitalIo> DigitalIo for Box<G> {
	fn configure_line(&mut self, line: Line, direction: Direction, initial_level: bool) -> io::Result<()> {
		G::configure_line(self, line, direction, initial_level)
	}
	fn set_line(&mut self, line: Line, level: bool) -> io::Result<()> {
		G::set_line(self, line, level)
	}
	fn get_line(&mut self, line: Line) -> io::Result<bool> {
		G::get_line(self, line)
	}
	fn release_all(&mut self) -> io::Result<()> {
		G::release_all(self)
	}
	fn delay(&mut self, duration: Duration) {
		G::delay(self, duration)
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn reliable_sleep_waits_at_least_duration() {
		let start = Instant::now();
		reliable_sleep(Duration::from_micros(300));
		assert!(start.elapsed() >= Duration::from_micros(300));
	}

	#[test]
	fn line_display() {
		assert_eq!(Line(21).to_string(), "GPIO21");
	}
}
