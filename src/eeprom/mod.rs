/// Parallel EEPROM in the AT28C16 style (byte wide, active low control
/// inputs), with the lower 10 address bits in use.
///
/// Lines:
/// - A0..A10: address; A10 is held low
/// - D0..D7: data, bidirectional
/// - WE: write enable; the byte on the data bus is latched into the
///   addressed cell on the rising edge
/// - OE: output enable; the chip drives the data bus while asserted
///
/// CE is expected to be tied low.
///
/// OE and WE are never asserted at the same time, and the host stops
/// driving the data bus before OE gets asserted. After a write the chip is
/// busy for its internal write cycle; bulk operations wait for that.

mod bus;
mod output;
mod pins;
mod program;
mod read;
mod timing;
mod write;

pub use self::bus::{
	BusController,
	BusState,
	parse_address,
	parse_bits,
	parse_data,
};

pub use self::output::OutputController;

pub use self::pins::{
	ADDRESS_BITS,
	ADDRESS_LIMIT,
	ADDRESS_LINES,
	DATA_BITS,
	PinMap,
	PinRole,
};

pub use self::timing::TimingProfile;

pub use self::write::{
	WriteSequencer,
	WriteState,
};

use crate::error::{
	EResult,
	EepromError,
};
use crate::gpio::DigitalIo;

/// Owns the digital lines for its lifetime; on `close` (or drop) the control
/// lines are deasserted and all lines released.
pub struct Programmer<G: DigitalIo> {
	io: G,
	bus: BusController,
	output: OutputController,
	writer: WriteSequencer,
	timing: TimingProfile,
	capacity: usize,
	open: bool,
}

impl<G: DigitalIo> Programmer<G> {
	pub fn open(io: G, pins: PinMap, timing: TimingProfile) -> EResult<Self> {
		let mut programmer = Programmer {
			io,
			output: OutputController::new(&pins),
			writer: WriteSequencer::new(&pins, timing),
			bus: BusController::new(pins),
			timing,
			capacity: ADDRESS_LIMIT,
			open: true,
		};

		// control lines first (deasserted), so nothing happens while the
		// buses come up; on error drop releases what got configured
		programmer.writer.configure(&mut programmer.io)?;
		programmer.output.configure(&mut programmer.io)?;
		programmer.bus.configure(&mut programmer.io)?;
		debug!("lines configured:\n{}", programmer.bus.pins());

		Ok(programmer)
	}

	/// number of addresses bulk operations cover, starting at 0
	pub fn set_capacity(&mut self, capacity: usize) -> EResult<()> {
		if 0 == capacity || capacity > ADDRESS_LIMIT {
			return Err(EepromError::range("capacity", capacity, "1..1024"));
		}
		self.capacity = capacity;
		Ok(())
	}

	pub fn capacity(&self) -> usize {
		self.capacity
	}

	pub fn pins(&self) -> &PinMap {
		self.bus.pins()
	}

	pub fn bus_state(&self) -> &BusState {
		self.bus.state()
	}

	pub fn is_output_enabled(&self) -> bool {
		self.output.is_output_enabled()
	}

	pub fn io(&self) -> &G {
		&self.io
	}

	#[cfg(test)]
	pub(crate) fn io_mut(&mut self) -> &mut G {
		&mut self.io
	}

	pub fn set_address(&mut self, address: usize) -> EResult<()> {
		self.bus.set_address(&mut self.io, address)
	}

	pub fn set_data(&mut self, value: usize) -> EResult<()> {
		self.bus.set_data(&mut self.io, value)
	}

	pub fn set_data_bits(&mut self, bits: &str) -> EResult<()> {
		self.bus.set_data_bits(&mut self.io, bits)
	}

	pub fn set_output_enable(&mut self, enabled: bool) -> EResult<()> {
		self.output.set_output_enable(&mut self.io, &mut self.bus, enabled)
	}

	pub fn pulse_write(&mut self) -> EResult<()> {
		self.writer.pulse(&mut self.io, &mut self.bus, &mut self.output)
	}

	// every step is attempted; the first error is returned
	fn shutdown(&mut self) -> EResult<()> {
		let mut result = Ok(());
		let mut note = |r: EResult<()>| {
			if let Err(e) = r {
				warn!("shutdown: {}", e);
				if result.is_ok() {
					result = Err(e);
				}
			}
		};
		note(self.writer.disable(&mut self.io));
		note(self.output.disable(&mut self.io));
		note(self.io.release_all().map_err(EepromError::from));
		result
	}

	pub fn close(mut self) -> EResult<()> {
		self.open = false;
		self.shutdown()
	}
}

impl<G: DigitalIo> Drop for Programmer<G> {
	fn drop(&mut self) {
		if self.open {
			self.open = false;
			if let Err(e) = self.shutdown() {
				error!("Failed to release digital lines: {}", e);
			}
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::gpio::Direction;
	use crate::gpio::mock::{
		Event,
		MockChip,
		MockIo,
	};

	#[test]
	fn open_deasserts_controls_before_buses() {
		let pins = PinMap::default();
		let mut io = MockIo::new();
		{
			let _p = Programmer::open(&mut io, pins.clone(), TimingProfile::default()).unwrap();
		}
		let events: Vec<_> = io.events().collect();
		assert_eq!(events[0], Event::Configure {
			line: pins.write_enable_line(),
			direction: Direction::Output,
			level: true,
		});
		assert_eq!(events[1], Event::Configure {
			line: pins.output_enable_line(),
			direction: Direction::Output,
			level: true,
		});
		let configured = events.iter().filter(|e| match e {
			Event::Configure { .. } => true,
			_ => false,
		}).count();
		assert_eq!(configured, ADDRESS_LINES + DATA_BITS + 2);
	}

	#[test]
	fn drop_releases_lines() {
		let mut io = MockIo::new();
		{
			let mut p = Programmer::open(&mut io, PinMap::default(), TimingProfile::default()).unwrap();
			p.set_output_enable(true).unwrap();
		}
		let pins = PinMap::default();
		let events: Vec<_> = io.events().collect();
		let n = events.len();
		assert_eq!(events[n - 1], Event::ReleaseAll);
		assert_eq!(events[n - 2], Event::Set { line: pins.output_enable_line(), level: true });
		assert_eq!(events[n - 3], Event::Set { line: pins.write_enable_line(), level: true });
		assert_eq!(io.configured_lines(), 0);
	}

	#[test]
	fn close_releases_once() {
		let mut io = MockIo::new();
		let p = Programmer::open(&mut io, PinMap::default(), TimingProfile::default()).unwrap();
		p.close().unwrap();
		let releases = io.events().filter(|e| *e == Event::ReleaseAll).count();
		assert_eq!(releases, 1);
	}

	#[test]
	fn failed_open_still_releases() {
		let pins = PinMap::default();
		let mut io = MockIo::new();
		io.fail_on(pins.data_line(3));
		let err = Programmer::open(&mut io, pins, TimingProfile::default()).err().unwrap();
		match err {
			EepromError::Io(_) => (),
			e => panic!("unexpected error: {}", e),
		}
		assert_eq!(io.events().last(), Some(Event::ReleaseAll));
		assert_eq!(io.configured_lines(), 0);
	}

	#[test]
	fn capacity_limits() {
		let pins = PinMap::default();
		let mut p = Programmer::open(MockIo::with_chip(MockChip::new(pins.clone())), pins, TimingProfile::default()).unwrap();
		assert_eq!(p.capacity(), 1024);
		p.set_capacity(16).unwrap();
		assert_eq!(p.capacity(), 16);
		assert!(p.set_capacity(0).unwrap_err().is_range());
		assert!(p.set_capacity(1025).unwrap_err().is_range());
		assert_eq!(p.capacity(), 16);
	}
}
