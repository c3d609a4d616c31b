/// Recording stand-in for real digital lines.
///
/// Every call is recorded with a timestamp from a virtual clock; `delay`
/// only advances that clock. With a `MockChip` attached it also behaves
/// like a (perfectly fast) parallel EEPROM wired according to a `PinMap`,
/// and counts bus contention.

use std::collections::BTreeMap;
use std::io;
use std::time::Duration;

use super::{
	DigitalIo,
	Direction,
	Line,
};
use crate::eeprom::{
	ADDRESS_BITS,
	ADDRESS_LIMIT,
	DATA_BITS,
	PinMap,
};

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Event {
	Configure {
		line: Line,
		direction: Direction,
		level: bool,
	},
	Set {
		line: Line,
		level: bool,
	},
	Get {
		line: Line,
		level: bool,
	},
	Delay(Duration),
	ReleaseAll,
}

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct Record {
	pub at: Duration,
	pub event: Event,
}

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
struct LineState {
	direction: Direction,
	level: bool,
}

#[derive(Clone, Debug)]
pub struct MockChip {
	pins: PinMap,
	memory: Vec<u8>,
	write_enabled: bool,
	contended: bool,
	contentions: usize,
}

impl MockChip {
	/// erased chip (all bytes 0xff)
	pub fn new(pins: PinMap) -> Self {
		MockChip {
			pins,
			memory: vec![0xff; ADDRESS_LIMIT],
			write_enabled: false,
			contended: false,
			contentions: 0,
		}
	}

	pub fn memory(&self) -> &[u8] {
		&self.memory
	}

	pub fn memory_mut(&mut self) -> &mut [u8] {
		&mut self.memory
	}

	pub fn contentions(&self) -> usize {
		self.contentions
	}
}

#[derive(Clone, Debug, Default)]
pub struct MockIo {
	now: Duration,
	lines: BTreeMap<Line, LineState>,
	records: Vec<Record>,
	chip: Option<MockChip>,
	// line, uses left before it starts failing
	failing: Option<(Line, usize)>,
}

// control inputs of the chip are active low
fn asserted(lines: &BTreeMap<Line, LineState>, line: Line) -> bool {
	match lines.get(&line) {
		Some(state) => state.direction == Direction::Output && !state.level,
		None => false,
	}
}

fn driven_level(lines: &BTreeMap<Line, LineState>, line: Line) -> bool {
	lines.get(&line).map_or(false, |state| state.level)
}

fn decode_address(lines: &BTreeMap<Line, LineState>, pins: &PinMap) -> usize {
	(0..ADDRESS_BITS).fold(0, |acc, index| {
		(acc << 1) | driven_level(lines, pins.address_line(index)) as usize
	})
}

fn decode_data(lines: &BTreeMap<Line, LineState>, pins: &PinMap) -> u8 {
	(0..DATA_BITS).fold(0, |acc, index| {
		(acc << 1) | driven_level(lines, pins.data_line(index)) as u8
	})
}

impl MockIo {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn with_chip(chip: MockChip) -> Self {
		MockIo {
			chip: Some(chip),
			..Self::default()
		}
	}

	/// make every operation on `line` fail with an I/O error
	pub fn fail_on(&mut self, line: Line) {
		self.fail_on_nth(line, 1);
	}

	/// let the first `n - 1` operations on `line` (counted from now) succeed,
	/// fail every one after that
	pub fn fail_on_nth(&mut self, line: Line, n: usize) {
		self.failing = Some((line, n.saturating_sub(1)));
	}

	pub fn records(&self) -> &[Record] {
		&self.records
	}

	pub fn events(&self) -> impl Iterator<Item = Event> + '_ {
		self.records.iter().map(|r| r.event)
	}

	pub fn clear_records(&mut self) {
		self.records.clear();
	}

	pub fn now(&self) -> Duration {
		self.now
	}

	pub fn level(&self, line: Line) -> Option<bool> {
		self.lines.get(&line).map(|state| state.level)
	}

	pub fn direction(&self, line: Line) -> Option<Direction> {
		self.lines.get(&line).map(|state| state.direction)
	}

	pub fn configured_lines(&self) -> usize {
		self.lines.len()
	}

	pub fn chip(&self) -> Option<&MockChip> {
		self.chip.as_ref()
	}

	pub fn chip_mut(&mut self) -> Option<&mut MockChip> {
		self.chip.as_mut()
	}

	/// (address, data) present on the buses at every falling WE edge,
	/// replayed from the records
	pub fn write_strobes(&self, pins: &PinMap) -> Vec<(usize, u8)> {
		let mut lines = BTreeMap::new();
		let mut strobes = Vec::new();
		let we = pins.write_enable_line();
		for record in &self.records {
			let was_asserted = asserted(&lines, we);
			match record.event {
				Event::Configure { line, direction, level } => {
					lines.insert(line, LineState { direction, level });
				},
				Event::Set { line, level } => {
					// configured before the records were cleared
					lines.entry(line)
						.or_insert(LineState { direction: Direction::Output, level })
						.level = level;
				},
				Event::ReleaseAll => lines.clear(),
				Event::Get { .. } | Event::Delay(_) => (),
			}
			if !was_asserted && asserted(&lines, we) {
				strobes.push((decode_address(&lines, pins), decode_data(&lines, pins)));
			}
		}
		strobes
	}

	fn record(&mut self, event: Event) {
		trace!("mock {:>10?}: {:?}", self.now, event);
		self.records.push(Record { at: self.now, event });
	}

	fn check_failing(&mut self, line: Line) -> io::Result<()> {
		match self.failing.as_mut() {
			Some((failing, 0)) if *failing == line => {
				Err(io::Error::new(io::ErrorKind::Other, format!("{}: injected failure", line)))
			},
			Some((failing, left)) if *failing == line => {
				*left -= 1;
				Ok(())
			},
			_ => Ok(()),
		}
	}

	// let the simulated chip react to the current line levels
	fn simulate(&mut self) {
		let lines = &self.lines;
		let chip = match self.chip.as_mut() {
			Some(chip) => chip,
			None => return,
		};
		let oe = asserted(lines, chip.pins.output_enable_line());
		let we = asserted(lines, chip.pins.write_enable_line());

		// data is latched on the rising WE edge
		if chip.write_enabled && !we && !oe {
			let address = decode_address(lines, &chip.pins);
			chip.memory[address] = decode_data(lines, &chip.pins);
		}
		chip.write_enabled = we;

		let host_drives_data = (0..DATA_BITS).any(|index| {
			lines.get(&chip.pins.data_line(index)).map_or(false, |s| s.direction == Direction::Output)
		});
		let contended = (oe && we) || (oe && host_drives_data);
		if contended && !chip.contended {
			warn!("mock: bus contention (OE: {}, WE: {}, host driving data: {})", oe, we, host_drives_data);
			chip.contentions += 1;
		}
		chip.contended = contended;
	}

	fn chip_output(&self, line: Line) -> Option<bool> {
		let chip = self.chip.as_ref()?;
		if !asserted(&self.lines, chip.pins.output_enable_line()) {
			return None;
		}
		let index = (0..DATA_BITS).find(|&index| chip.pins.data_line(index) == line)?;
		let address = decode_address(&self.lines, &chip.pins);
		let bit = DATA_BITS - 1 - index;
		Some(0 != chip.memory[address] & (1 << bit))
	}
}

impl DigitalIo for MockIo {
	fn configure_line(&mut self, line: Line, direction: Direction, initial_level: bool) -> io::Result<()> {
		self.check_failing(line)?;
		self.record(Event::Configure { line, direction, level: initial_level });
		let level = match direction {
			Direction::Output => initial_level,
			Direction::Input => false,
		};
		self.lines.insert(line, LineState { direction, level });
		self.simulate();
		Ok(())
	}

	fn set_line(&mut self, line: Line, level: bool) -> io::Result<()> {
		self.check_failing(line)?;
		self.record(Event::Set { line, level });
		match self.lines.get_mut(&line) {
			Some(state) if state.direction == Direction::Output => state.level = level,
			_ => return Err(io::Error::new(io::ErrorKind::InvalidInput, format!("{} is not an output", line))),
		}
		self.simulate();
		Ok(())
	}

	fn get_line(&mut self, line: Line) -> io::Result<bool> {
		self.check_failing(line)?;
		let level = match self.lines.get(&line) {
			Some(state) if state.direction == Direction::Input => {
				self.chip_output(line).unwrap_or(state.level)
			},
			Some(state) => state.level,
			None => return Err(io::Error::new(io::ErrorKind::InvalidInput, format!("{} is not configured", line))),
		};
		self.record(Event::Get { line, level });
		Ok(level)
	}

	fn release_all(&mut self) -> io::Result<()> {
		self.record(Event::ReleaseAll);
		self.lines.clear();
		self.simulate();
		Ok(())
	}

	fn delay(&mut self, duration: Duration) {
		self.record(Event::Delay(duration));
		self.now += duration;
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn records_with_virtual_clock() {
		let mut io = MockIo::new();
		io.configure_line(Line(4), Direction::Output, true).unwrap();
		io.delay(Duration::from_micros(250));
		io.set_line(Line(4), false).unwrap();

		let records = io.records();
		assert_eq!(records.len(), 3);
		assert_eq!(records[0].at, Duration::from_micros(0));
		assert_eq!(records[2].at, Duration::from_micros(250));
		assert_eq!(records[2].event, Event::Set { line: Line(4), level: false });
		assert_eq!(io.level(Line(4)), Some(false));
	}

	#[test]
	fn set_on_unconfigured_line_fails() {
		let mut io = MockIo::new();
		assert!(io.set_line(Line(7), true).is_err());
	}

	#[test]
	fn injected_failure() {
		let mut io = MockIo::new();
		io.fail_on(Line(3));
		assert!(io.configure_line(Line(3), Direction::Output, false).is_err());
		assert!(io.configure_line(Line(2), Direction::Output, false).is_ok());
	}

	#[test]
	fn injected_failure_after_some_uses() {
		let mut io = MockIo::new();
		io.configure_line(Line(3), Direction::Output, false).unwrap();
		io.fail_on_nth(Line(3), 3);
		io.set_line(Line(3), true).unwrap();
		io.set_line(Line(3), false).unwrap();
		assert!(io.set_line(Line(3), true).is_err());
		assert!(io.set_line(Line(3), true).is_err());
		assert_eq!(io.level(Line(3)), Some(false));
	}

	#[test]
	fn release_all_forgets_lines() {
		let mut io = MockIo::new();
		io.configure_line(Line(1), Direction::Output, true).unwrap();
		io.configure_line(Line(2), Direction::Input, false).unwrap();
		io.release_all().unwrap();
		assert_eq!(io.configured_lines(), 0);
		assert_eq!(io.events().last(), Some(Event::ReleaseAll));
	}

	#[test]
	fn chip_flags_control_contention() {
		let pins = PinMap::default();
		let mut io = MockIo::with_chip(MockChip::new(pins.clone()));
		io.configure_line(pins.output_enable_line(), Direction::Output, false).unwrap();
		io.configure_line(pins.write_enable_line(), Direction::Output, false).unwrap();
		assert_eq!(io.chip().unwrap().contentions(), 1);
	}
}
