use std::fmt;
use std::io;

use crate::eeprom::PinRole;
use crate::gpio::Line;

#[derive(Debug, Fail)]
pub enum EepromError {
	/// two signals of the pin map share one physical line
	#[fail(display = "invalid pin map: {} is assigned to both {} and {}", line, first, second)]
	Configuration {
		line: Line,
		first: PinRole,
		second: PinRole,
	},

	#[fail(display = "{} out of range: {} (expected {})", what, value, expected)]
	Range {
		what: &'static str,
		value: String,
		expected: &'static str,
	},

	#[fail(display = "digital I/O failed: {}", _0)]
	Io(#[cause] io::Error),

	#[fail(display = "verify failed at 0x{:03x}: expected 0x{:02x}, read 0x{:02x}", address, expected, found)]
	Verify {
		address: usize,
		expected: u8,
		found: u8,
	},
}

impl EepromError {
	pub(crate) fn range<V: fmt::Display>(what: &'static str, value: V, expected: &'static str) -> Self {
		EepromError::Range {
			what,
			value: value.to_string(),
			expected,
		}
	}

	pub fn is_range(&self) -> bool {
		match self {
			EepromError::Range { .. } => true,
			_ => false,
		}
	}

	pub fn is_configuration(&self) -> bool {
		match self {
			EepromError::Configuration { .. } => true,
			_ => false,
		}
	}
}

impl From<io::Error> for EepromError {
	fn from(e: io::Error) -> Self {
		EepromError::Io(e)
	}
}

pub type EResult<T> = Result<T, EepromError>;
