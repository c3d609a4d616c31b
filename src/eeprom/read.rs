use super::Programmer;
use super::bus::check_address_usize;
use super::pins::ADDRESS_LIMIT;
use crate::error::{
	EResult,
	EepromError,
};
use crate::gpio::DigitalIo;

impl<G: DigitalIo> Programmer<G> {
	/// Read one byte. Output enable stays asserted afterwards only if it
	/// already was before.
	pub fn read(&mut self, address: usize) -> EResult<u8> {
		self.set_address(address)?;

		let was_enabled = self.output.is_output_enabled();
		if !was_enabled {
			self.output.set_output_enable(&mut self.io, &mut self.bus, true)?;
		}
		self.io.delay(self.timing.output_access);
		let sampled = self.bus.sample_data(&mut self.io);

		let restored = if was_enabled {
			Ok(())
		} else {
			self.output.set_output_enable(&mut self.io, &mut self.bus, false)
		};
		// a failed sample is the more interesting error
		let value = sampled?;
		restored?;
		trace!("read 0x{:02x} @ 0x{:03x}", value, address);
		Ok(value)
	}

	pub fn dump(&mut self, start: usize, len: usize) -> EResult<Vec<u8>> {
		check_address_usize(start)?;
		if len > ADDRESS_LIMIT - start {
			return Err(EepromError::range("length", len, "start + length <= 1024"));
		}

		let mut buf = Vec::with_capacity(len);
		for address in start..start + len {
			buf.push(self.read(address)?);
		}
		Ok(buf)
	}
}

#[cfg(test)]
mod tests {
	use crate::eeprom::{
		PinMap,
		Programmer,
		TimingProfile,
	};
	use crate::gpio::mock::{
		Event,
		MockChip,
		MockIo,
	};

	fn programmer(memory: &[(usize, u8)]) -> Programmer<MockIo> {
		let pins = PinMap::default();
		let mut chip = MockChip::new(pins.clone());
		for &(address, value) in memory {
			chip.memory_mut()[address] = value;
		}
		Programmer::open(MockIo::with_chip(chip), pins, TimingProfile::default()).unwrap()
	}

	#[test]
	fn read_samples_chip_output() {
		let mut p = programmer(&[(0x000, 0x12), (0x155, 0xa5), (0x3ff, 0x80)]);
		assert_eq!(p.read(0x155).unwrap(), 0xa5);
		assert_eq!(p.read(0x000).unwrap(), 0x12);
		assert_eq!(p.read(0x3ff).unwrap(), 0x80);
		assert_eq!(p.read(0x001).unwrap(), 0xff);
		assert!(!p.is_output_enabled());
		assert!(p.bus_state().address_value() == 0x001);
		assert_eq!(p.io().chip().unwrap().contentions(), 0);
	}

	#[test]
	fn read_waits_for_output_access() {
		let mut p = programmer(&[]);
		p.io_mut().clear_records();
		p.read(3).unwrap();

		let oe = p.pins().output_enable_line();
		let records = p.io().records();
		let asserted = records.iter().find(|r| r.event == Event::Set { line: oe, level: false }).unwrap();
		let first_sample = records.iter().find(|r| match r.event {
			Event::Get { .. } => true,
			_ => false,
		}).unwrap();
		assert!(first_sample.at - asserted.at >= TimingProfile::default().output_access);
	}

	#[test]
	fn read_keeps_enabled_output() {
		let mut p = programmer(&[(9, 0x3c)]);
		p.set_output_enable(true).unwrap();
		p.io_mut().clear_records();
		assert_eq!(p.read(9).unwrap(), 0x3c);
		assert!(p.is_output_enabled());
		let oe = p.pins().output_enable_line();
		assert!(p.io().events().all(|e| match e {
			Event::Set { line, .. } => line != oe,
			_ => true,
		}));
	}

	#[test]
	fn read_out_of_range() {
		let mut p = programmer(&[]);
		p.io_mut().clear_records();
		assert!(p.read(1024).unwrap_err().is_range());
		assert!(p.io().records().is_empty());
	}

	#[test]
	fn dump_range() {
		let mut p = programmer(&[(0x3fe, 1), (0x3ff, 2)]);
		assert_eq!(p.dump(0x3fd, 3).unwrap(), vec![0xff, 1, 2]);
		assert!(p.dump(0x3fd, 4).unwrap_err().is_range());
		assert!(p.dump(1024, 0).unwrap_err().is_range());
		assert_eq!(p.dump(0, 0).unwrap(), Vec::<u8>::new());
	}
}
