/// Raspberry Pi GPIO through `rppal`; lines are BCM numbers.

use std::collections::BTreeMap;
use std::fmt;
use std::io;

use rppal::gpio::{
	Gpio,
	IoPin,
	Level,
	Mode,
};

use crate::gpio::{
	DigitalIo,
	Direction,
	Line,
};

fn annotate<E: fmt::Display>(line: Line, e: E) -> io::Error {
	io::Error::new(io::ErrorKind::Other, format!("{}: {}", line, e))
}

fn level(high: bool) -> Level {
	if high { Level::High } else { Level::Low }
}

pub struct RpiGpio {
	gpio: Gpio,
	pins: BTreeMap<Line, IoPin>,
}

impl RpiGpio {
	/// fails on boards `rppal` doesn't know
	pub fn open() -> io::Result<Self> {
		let gpio = Gpio::new().map_err(|e| io::Error::new(io::ErrorKind::Other, format!("GPIO: {}", e)))?;
		Ok(RpiGpio {
			gpio,
			pins: BTreeMap::new(),
		})
	}

	fn pin(&mut self, line: Line) -> io::Result<&mut IoPin> {
		self.pins.get_mut(&line).ok_or_else(|| {
			io::Error::new(io::ErrorKind::InvalidInput, format!("{} is not configured", line))
		})
	}
}

impl DigitalIo for RpiGpio {
	fn configure_line(&mut self, line: Line, direction: Direction, initial_level: bool) -> io::Result<()> {
		if !self.pins.contains_key(&line) {
			let pin = self.gpio.get(line.0).map_err(|e| annotate(line, e))?;
			debug!("{}: acquired", line);
			self.pins.insert(line, pin.into_io(Mode::Input));
		}
		let pin = self.pin(line)?;
		match direction {
			Direction::Input => pin.set_mode(Mode::Input),
			Direction::Output => {
				// latch the level before the output driver is enabled
				pin.write(level(initial_level));
				pin.set_mode(Mode::Output);
			},
		}
		Ok(())
	}

	fn set_line(&mut self, line: Line, high: bool) -> io::Result<()> {
		self.pin(line)?.write(level(high));
		Ok(())
	}

	fn get_line(&mut self, line: Line) -> io::Result<bool> {
		Ok(self.pin(line)?.read() == Level::High)
	}

	fn release_all(&mut self) -> io::Result<()> {
		for (line, mut pin) in std::mem::replace(&mut self.pins, BTreeMap::new()) {
			pin.set_mode(Mode::Input);
			// stay an input instead of going back to whatever mode it had
			pin.set_reset_on_drop(false);
			trace!("{}: released", line);
		}
		Ok(())
	}
}
