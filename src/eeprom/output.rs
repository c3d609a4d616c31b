use super::bus::BusController;
use super::pins::PinMap;
use crate::error::EResult;
use crate::gpio::{
	DigitalIo,
	Direction,
	Line,
};

/// Line level for a control input of the chip; CE/OE/WE are all active low.
pub(crate) fn control_level(asserted: bool) -> bool {
	!asserted
}

/// configure a control line as output, deasserted before it starts driving
pub(crate) fn configure_control<G: DigitalIo + ?Sized>(io: &mut G, line: Line) -> EResult<()> {
	io.configure_line(line, Direction::Output, control_level(false))?;
	Ok(())
}

pub(crate) fn set_control<G: DigitalIo + ?Sized>(io: &mut G, line: Line, asserted: bool) -> EResult<()> {
	io.set_line(line, control_level(asserted))?;
	Ok(())
}

/// Output enable: read mode (chip drives the data bus) vs. write mode (we
/// drive it).
pub struct OutputController {
	output_enable: Line,
	enabled: bool,
}

impl OutputController {
	pub fn new(pins: &PinMap) -> Self {
		OutputController {
			output_enable: pins.output_enable_line(),
			enabled: false,
		}
	}

	pub fn is_output_enabled(&self) -> bool {
		self.enabled
	}

	pub(crate) fn configure<G: DigitalIo + ?Sized>(&mut self, io: &mut G) -> EResult<()> {
		configure_control(io, self.output_enable)?;
		self.enabled = false;
		Ok(())
	}

	/// Enabling releases the data bus first, disabling drives the stored data
	/// again once OE is deasserted; the host and the chip never drive the
	/// data bus at the same time.
	pub fn set_output_enable<G: DigitalIo + ?Sized>(&mut self, io: &mut G, bus: &mut BusController, enabled: bool) -> EResult<()> {
		if enabled {
			bus.release_data(io)?;
			set_control(io, self.output_enable, true)?;
			self.enabled = true;
			debug!("output enabled");
		} else {
			set_control(io, self.output_enable, false)?;
			self.enabled = false;
			bus.reclaim_data(io)?;
			debug!("output disabled");
		}
		Ok(())
	}

	/// deassert OE without touching the data bus (shutdown)
	pub(crate) fn disable<G: DigitalIo + ?Sized>(&mut self, io: &mut G) -> EResult<()> {
		set_control(io, self.output_enable, false)?;
		self.enabled = false;
		Ok(())
	}
}
