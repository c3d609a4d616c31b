use std::fmt;

use super::pins::{
	ADDRESS_BITS,
	ADDRESS_LIMIT,
	ADDRESS_LINES,
	DATA_BITS,
	PinMap,
};
use crate::error::{
	EResult,
	EepromError,
};
use crate::gpio::{
	DigitalIo,
	Direction,
};

/// Last values set for the buses, one entry per bus index. Index 0 holds
/// the most significant bit, i.e. bit k of a value lives at index
/// (width - 1 - k).
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, Default)]
pub struct BusState {
	pub address: [bool; ADDRESS_BITS],
	pub data: [bool; DATA_BITS],
}

fn spread(value: usize, bits: &mut [bool]) {
	let width = bits.len();
	for k in 0..width {
		bits[width - 1 - k] = 0 != (value >> k) & 1;
	}
}

fn gather(bits: &[bool]) -> usize {
	bits.iter().fold(0, |acc, &bit| (acc << 1) | bit as usize)
}

fn format_bits(f: &mut fmt::Formatter, bits: &[bool]) -> fmt::Result {
	for &bit in bits {
		f.write_str(if bit { "1" } else { "0" })?;
	}
	Ok(())
}

impl BusState {
	pub fn address_value(&self) -> usize {
		gather(&self.address)
	}

	pub fn data_value(&self) -> u8 {
		gather(&self.data) as u8
	}

	pub fn address_bits(&self) -> impl fmt::Display + '_ {
		Bits(&self.address)
	}

	pub fn data_bits(&self) -> impl fmt::Display + '_ {
		Bits(&self.data)
	}
}

struct Bits<'a>(&'a [bool]);

impl<'a> fmt::Display for Bits<'a> {
	fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
		format_bits(f, self.0)
	}
}

/// parse an address: decimal or 0x-prefixed hex, 0..1023
pub fn parse_address(s: &str) -> EResult<usize> {
	let value = parse_number(s).ok_or_else(|| EepromError::range("address", s, "0..1023"))?;
	check_address(value)
}

/// parse a data byte: either exactly eight `0`/`1` characters (most
/// significant bit first), or a decimal / 0x-prefixed hex number 0..255
pub fn parse_data(s: &str) -> EResult<u8> {
	let s = s.trim();
	if s.len() == DATA_BITS && s.bytes().all(|c| c == b'0' || c == b'1') {
		return parse_bits(s);
	}
	let value = parse_number(s).ok_or_else(|| EepromError::range("data", s, "0..255 or 8 bits"))?;
	check_data(value)
}

/// parse exactly eight `0`/`1` characters, most significant bit first
pub fn parse_bits(s: &str) -> EResult<u8> {
	if s.len() != DATA_BITS {
		return Err(EepromError::range("data bits", format!("{:?}", s), "8 characters 0/1"));
	}
	s.bytes().try_fold(0u8, |acc, c| match c {
		b'0' => Ok(acc << 1),
		b'1' => Ok((acc << 1) | 1),
		_ => Err(EepromError::range("data bits", format!("{:?}", s), "8 characters 0/1")),
	})
}

fn parse_number(s: &str) -> Option<i64> {
	let s = s.trim();
	if s.starts_with("0x") || s.starts_with("0X") {
		i64::from_str_radix(&s[2..], 16).ok()
	} else {
		s.parse::<i64>().ok()
	}
}

fn check_address(value: i64) -> EResult<usize> {
	match value {
		v if v >= 0 && v < ADDRESS_LIMIT as i64 => Ok(v as usize),
		_ => Err(EepromError::range("address", value, "0..1023")),
	}
}

fn check_data(value: i64) -> EResult<u8> {
	match value {
		v if v >= 0 && v <= 0xff => Ok(v as u8),
		_ => Err(EepromError::range("data", value, "0..255")),
	}
}

pub(crate) fn check_address_usize(address: usize) -> EResult<usize> {
	if address >= ADDRESS_LIMIT {
		return Err(EepromError::range("address", address, "0..1023"));
	}
	Ok(address)
}

pub(crate) fn check_data_usize(value: usize) -> EResult<u8> {
	if value > 0xff {
		return Err(EepromError::range("data", value, "0..255"));
	}
	Ok(value as u8)
}

/// Projects the logical bus values onto the physical lines.
///
/// The data bus is shared with the chip: while it is released for reading
/// (lines are inputs) data values are only recorded, and driven once the
/// bus is reclaimed.
pub struct BusController {
	pins: PinMap,
	state: BusState,
	data_driven: bool,
}

impl BusController {
	pub fn new(pins: PinMap) -> Self {
		BusController {
			pins,
			state: BusState::default(),
			data_driven: true,
		}
	}

	pub fn pins(&self) -> &PinMap {
		&self.pins
	}

	pub fn state(&self) -> &BusState {
		&self.state
	}

	pub fn is_data_driven(&self) -> bool {
		self.data_driven
	}

	/// all bus lines become outputs driving the current (initially zero)
	/// state; the unused top address line is held low
	pub(crate) fn configure<G: DigitalIo + ?Sized>(&mut self, io: &mut G) -> EResult<()> {
		for index in 0..ADDRESS_LINES {
			let level = index < ADDRESS_BITS && self.state.address[index];
			io.configure_line(self.pins.address_line(index), Direction::Output, level)?;
		}
		for index in 0..DATA_BITS {
			io.configure_line(self.pins.data_line(index), Direction::Output, self.state.data[index])?;
		}
		self.data_driven = true;
		Ok(())
	}

	pub fn set_address<G: DigitalIo + ?Sized>(&mut self, io: &mut G, address: usize) -> EResult<()> {
		let address = check_address_usize(address)?;
		spread(address, &mut self.state.address);
		trace!("address: 0x{:03x} ({})", address, self.state.address_bits());
		self.drive_address(io)
	}

	pub fn set_data<G: DigitalIo + ?Sized>(&mut self, io: &mut G, value: usize) -> EResult<()> {
		let value = check_data_usize(value)?;
		spread(value as usize, &mut self.state.data);
		trace!("data: 0x{:02x} ({})", value, self.state.data_bits());
		if self.data_driven {
			self.drive_data(io)?;
		}
		Ok(())
	}

	pub fn set_data_bits<G: DigitalIo + ?Sized>(&mut self, io: &mut G, bits: &str) -> EResult<()> {
		let value = parse_bits(bits)?;
		self.set_data(io, value as usize)
	}

	/// put the stored state on the lines again
	pub fn update<G: DigitalIo + ?Sized>(&mut self, io: &mut G) -> EResult<()> {
		self.drive_address(io)?;
		if self.data_driven {
			self.drive_data(io)?;
		}
		Ok(())
	}

	fn drive_address<G: DigitalIo + ?Sized>(&self, io: &mut G) -> EResult<()> {
		for (index, &bit) in self.state.address.iter().enumerate() {
			io.set_line(self.pins.address_line(index), bit)?;
		}
		Ok(())
	}

	fn drive_data<G: DigitalIo + ?Sized>(&self, io: &mut G) -> EResult<()> {
		for (index, &bit) in self.state.data.iter().enumerate() {
			io.set_line(self.pins.data_line(index), bit)?;
		}
		Ok(())
	}

	/// stop driving the data bus (before the chip starts driving it)
	pub(crate) fn release_data<G: DigitalIo + ?Sized>(&mut self, io: &mut G) -> EResult<()> {
		if !self.data_driven {
			return Ok(());
		}
		// mark first: a partially released bus must not be driven again
		self.data_driven = false;
		for index in 0..DATA_BITS {
			io.configure_line(self.pins.data_line(index), Direction::Input, false)?;
		}
		trace!("data bus released");
		Ok(())
	}

	/// drive the data bus again with the stored data (after the chip
	/// stopped driving it)
	pub(crate) fn reclaim_data<G: DigitalIo + ?Sized>(&mut self, io: &mut G) -> EResult<()> {
		if self.data_driven {
			return Ok(());
		}
		for index in 0..DATA_BITS {
			io.configure_line(self.pins.data_line(index), Direction::Output, self.state.data[index])?;
		}
		self.data_driven = true;
		trace!("data bus driven: {}", self.state.data_bits());
		Ok(())
	}

	/// read the data lines (only meaningful while released)
	pub(crate) fn sample_data<G: DigitalIo + ?Sized>(&self, io: &mut G) -> EResult<u8> {
		let mut bits = [false; DATA_BITS];
		for (index, bit) in bits.iter_mut().enumerate() {
			*bit = io.get_line(self.pins.data_line(index))?;
		}
		Ok(gather(&bits) as u8)
	}
}
