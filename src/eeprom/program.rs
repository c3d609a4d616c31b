use super::Programmer;
use super::bus::{
	check_address_usize,
	check_data_usize,
};
use crate::error::{
	EResult,
	EepromError,
};
use crate::gpio::DigitalIo;

const PROGRESS_INTERVAL: usize = 128;

impl<G: DigitalIo> Programmer<G> {
	/// Program a single byte and wait for the chip's write cycle.
	pub fn write_byte(&mut self, address: usize, value: u8) -> EResult<()> {
		check_address_usize(address)?;
		self.set_data(value as usize)?;
		self.set_address(address)?;
		self.pulse_write()?;
		self.io.delay(self.timing.write_cycle);
		Ok(())
	}

	/// Program `value` into every address below the capacity, ascending.
	///
	/// Stops at the first failing address; bytes written before stay
	/// written.
	pub fn fill_all(&mut self, value: usize) -> EResult<()> {
		let value = check_data_usize(value)?;
		info!("Filling {} bytes with 0x{:02x}", self.capacity, value);

		for address in 0..self.capacity {
			if let Err(e) = self.fill_one(address, value) {
				error!("Fill aborted at 0x{:03x}", address);
				return Err(e);
			}
			let done = address + 1;
			if 0 == done % PROGRESS_INTERVAL && done < self.capacity {
				info!("Filled {}/{} bytes", done, self.capacity);
			}
		}

		info!("Filled {} bytes", self.capacity);
		Ok(())
	}

	fn fill_one(&mut self, address: usize, value: u8) -> EResult<()> {
		self.set_address(address)?;
		self.set_data(value as usize)?;
		self.pulse_write()?;
		self.io.delay(self.timing.write_cycle);
		Ok(())
	}

	pub fn verify_byte(&mut self, address: usize, expected: u8) -> EResult<()> {
		let found = self.read(address)?;
		if found != expected {
			return Err(EepromError::Verify { address, expected, found });
		}
		Ok(())
	}

	/// check every address below the capacity holds `expected`; reports the
	/// first mismatch
	pub fn verify_all(&mut self, expected: usize) -> EResult<()> {
		let expected = check_data_usize(expected)?;
		for address in 0..self.capacity {
			self.verify_byte(address, expected)?;
		}
		info!("Verified {} bytes", self.capacity);
		Ok(())
	}
}

#[cfg(test)]
mod tests {
	use crate::eeprom::{
		PinMap,
		Programmer,
		TimingProfile,
	};
	use crate::error::EepromError;
	use crate::gpio::mock::{
		Event,
		MockChip,
		MockIo,
	};

	fn programmer(capacity: usize) -> Programmer<MockIo> {
		let pins = PinMap::default();
		let io = MockIo::with_chip(MockChip::new(pins.clone()));
		let mut p = Programmer::open(io, pins, TimingProfile::default()).unwrap();
		p.set_capacity(capacity).unwrap();
		p.io_mut().clear_records();
		p
	}

	#[test]
	fn fill_pulses_every_address_once() {
		let mut p = programmer(16);
		p.fill_all(0xaa).unwrap();

		let strobes = p.io().write_strobes(p.pins());
		let expected: Vec<(usize, u8)> = (0..16).map(|address| (address, 0xaa)).collect();
		assert_eq!(strobes, expected);

		let memory = p.io().chip().unwrap().memory();
		assert!(memory[..16].iter().all(|&b| b == 0xaa));
		assert!(memory[16..].iter().all(|&b| b == 0xff));
		assert_eq!(p.io().chip().unwrap().contentions(), 0);
	}

	#[test]
	fn fill_waits_for_write_cycles() {
		let mut p = programmer(4);
		let start = p.io().now();
		p.fill_all(0).unwrap();

		let timing = TimingProfile::default();
		let per_byte = timing.write_pulse_total() + timing.write_cycle;
		assert!(p.io().now() - start >= per_byte * 4);
		let cycles = p.io().events().filter(|e| *e == Event::Delay(timing.write_cycle)).count();
		assert_eq!(cycles, 4);
	}

	#[test]
	fn fill_value_out_of_range() {
		let mut p = programmer(16);
		assert!(p.fill_all(256).unwrap_err().is_range());
		assert!(p.io().records().is_empty());
	}

	#[test]
	fn write_then_read_back() {
		let mut p = programmer(1024);
		p.write_byte(0x2a5, 0x5a).unwrap();
		p.write_byte(0x000, 0x01).unwrap();
		assert_eq!(p.read(0x2a5).unwrap(), 0x5a);
		assert_eq!(p.read(0x000).unwrap(), 0x01);
		p.verify_byte(0x2a5, 0x5a).unwrap();
		assert_eq!(p.io().write_strobes(p.pins()), vec![(0x2a5, 0x5a), (0x000, 0x01)]);
	}

	#[test]
	fn write_byte_out_of_range_touches_nothing() {
		let mut p = programmer(1024);
		let data = p.bus_state().data_value();
		assert!(p.write_byte(1024, 0x12).unwrap_err().is_range());
		assert_eq!(p.bus_state().data_value(), data);
		assert!(p.io().records().is_empty());
	}

	#[test]
	fn verify_reports_first_mismatch() {
		let mut p = programmer(32);
		p.fill_all(0x00).unwrap();
		{
			let memory = p.io_mut().chip_mut().unwrap().memory_mut();
			memory[20] = 0x10;
			memory[25] = 0x20;
		}
		match p.verify_all(0x00).unwrap_err() {
			EepromError::Verify { address, expected, found } => {
				assert_eq!(address, 20);
				assert_eq!(expected, 0x00);
				assert_eq!(found, 0x10);
			},
			e => panic!("unexpected error: {}", e),
		}
		assert!(p.verify_all(256).unwrap_err().is_range());
	}

	#[test]
	fn verify_after_fill() {
		let mut p = programmer(64);
		p.fill_all(0xc3).unwrap();
		p.verify_all(0xc3).unwrap();
		assert!(!p.is_output_enabled());
	}
}
