use std::collections::HashMap;
use std::fmt;

use crate::error::{
	EResult,
	EepromError,
};
use crate::gpio::Line;

/// bits of the logical address; the device has one more address line (A10)
/// that is held low
pub const ADDRESS_BITS: usize = 10;
pub const ADDRESS_LINES: usize = 11;
pub const ADDRESS_LIMIT: usize = 1 << ADDRESS_BITS;
pub const DATA_BITS: usize = 8;

/// what a physical line is used for; bus indices are positions in the pin
/// map, not bit weights
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug)]
pub enum PinRole {
	Address(usize),
	Data(usize),
	WriteEnable,
	OutputEnable,
}

impl fmt::Display for PinRole {
	fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
		match self {
			PinRole::Address(i) => write!(f, "A{}", i),
			PinRole::Data(i) => write!(f, "D{}", i),
			PinRole::WriteEnable => write!(f, "WE"),
			PinRole::OutputEnable => write!(f, "OE"),
		}
	}
}

#[derive(Clone, PartialEq, Eq, Hash, Debug)]
pub struct PinMap {
	address: [Line; ADDRESS_LINES],
	data: [Line; DATA_BITS],
	write_enable: Line,
	output_enable: Line,
}

impl PinMap {
	pub fn build(
		address: [Line; ADDRESS_LINES],
		data: [Line; DATA_BITS],
		write_enable: Line,
		output_enable: Line,
	) -> EResult<Self> {
		let map = PinMap {
			address,
			data,
			write_enable,
			output_enable,
		};

		let mut seen = HashMap::new();
		for (role, line) in map.assignments() {
			if let Some(first) = seen.insert(line, role) {
				return Err(EepromError::Configuration {
					line,
					first,
					second: role,
				});
			}
		}

		Ok(map)
	}

	/// replace the control lines, validating the result again
	pub fn with_control_lines(&self, write_enable: Line, output_enable: Line) -> EResult<Self> {
		Self::build(self.address, self.data, write_enable, output_enable)
	}

	pub fn address_line(&self, index: usize) -> Line {
		self.address[index]
	}

	pub fn data_line(&self, index: usize) -> Line {
		self.data[index]
	}

	pub fn write_enable_line(&self) -> Line {
		self.write_enable
	}

	pub fn output_enable_line(&self) -> Line {
		self.output_enable
	}

	pub fn assignments(&self) -> impl Iterator<Item = (PinRole, Line)> + '_ {
		let address = self.address.iter().enumerate().map(|(i, l)| (PinRole::Address(i), *l));
		let data = self.data.iter().enumerate().map(|(i, l)| (PinRole::Data(i), *l));
		address
			.chain(data)
			.chain(Some((PinRole::WriteEnable, self.write_enable)))
			.chain(Some((PinRole::OutputEnable, self.output_enable)))
	}
}

impl Default for PinMap {
	/// Raspberry Pi wiring (BCM numbers); index 0 of each bus carries the
	/// most significant bit
	fn default() -> Self {
		PinMap {
			address: [
				Line(15), Line(14), Line(2), Line(3), Line(4),
				Line(17), Line(27), Line(22), Line(10), Line(9),
				Line(18),
			],
			data: [
				Line(7), Line(1), Line(12), Line(16),
				Line(20), Line(11), Line(0), Line(5),
			],
			write_enable: Line(6),
			output_enable: Line(21),
		}
	}
}

impl fmt::Display for PinMap {
	fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
		for (role, line) in self.assignments() {
			writeln!(f, "{:>3}: {}", role.to_string(), line)?;
		}
		Ok(())
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	fn address_lines(start: u8) -> [Line; ADDRESS_LINES] {
		let mut a = [Line(0); ADDRESS_LINES];
		for (i, l) in a.iter_mut().enumerate() {
			*l = Line(start + i as u8);
		}
		a
	}

	fn data_lines(start: u8) -> [Line; DATA_BITS] {
		let mut a = [Line(0); DATA_BITS];
		for (i, l) in a.iter_mut().enumerate() {
			*l = Line(start + i as u8);
		}
		a
	}

	#[test]
	fn default_wiring_is_valid() {
		let map = PinMap::default();
		let rebuilt = PinMap::build(map.address, map.data, map.write_enable, map.output_enable).unwrap();
		assert_eq!(rebuilt, map);
		assert_eq!(map.assignments().count(), ADDRESS_LINES + DATA_BITS + 2);
	}

	#[test]
	fn lookups() {
		let map = PinMap::build(address_lines(0), data_lines(11), Line(19), Line(20)).unwrap();
		assert_eq!(map.address_line(0), Line(0));
		assert_eq!(map.address_line(10), Line(10));
		assert_eq!(map.data_line(7), Line(18));
		assert_eq!(map.write_enable_line(), Line(19));
		assert_eq!(map.output_enable_line(), Line(20));
	}

	#[test]
	fn aliased_lines_are_rejected() {
		let err = PinMap::build(address_lines(0), data_lines(11), Line(19), Line(3)).unwrap_err();
		match err {
			EepromError::Configuration { line, first, second } => {
				assert_eq!(line, Line(3));
				assert_eq!(first, PinRole::Address(3));
				assert_eq!(second, PinRole::OutputEnable);
			},
			e => panic!("unexpected error: {}", e),
		}

		let mut data = data_lines(11);
		data[5] = Line(12);
		assert!(PinMap::build(address_lines(0), data, Line(19), Line(20)).unwrap_err().is_configuration());
	}

	#[test]
	fn control_line_override() {
		let map = PinMap::default();
		let moved = map.with_control_lines(Line(23), Line(24)).unwrap();
		assert_eq!(moved.write_enable_line(), Line(23));
		assert!(map.with_control_lines(Line(23), Line(23)).is_err());
		assert!(map.with_control_lines(Line(15), Line(24)).is_err());
	}
}
