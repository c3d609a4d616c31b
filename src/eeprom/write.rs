use std::cmp;

use super::bus::BusController;
use super::output::{
	OutputController,
	configure_control,
	set_control,
};
use super::pins::PinMap;
use super::timing::TimingProfile;
use crate::error::EResult;
use crate::gpio::{
	DigitalIo,
	Line,
};

#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug)]
pub enum WriteState {
	Idle,
	AddressDataSettling,
	OutputDisabled,
	WriteAsserted,
	WriteDeasserted,
}

/// The write pulse:
///
/// ```text
/// address/data  ==X=======================================X==
/// OE            ‾‾(s0)‾‾\______________________________/‾(s0)
/// WE            ‾‾‾‾‾‾‾‾‾‾‾‾‾‾\____________/‾‾‾‾‾‾‾‾‾‾‾‾‾‾‾‾‾
///                 setup   settle   pulse      hold
/// ```
///
/// No readback: whether the chip actually stored the byte has to be
/// checked separately.
pub struct WriteSequencer {
	write_enable: Line,
	timing: TimingProfile,
	state: WriteState,
}

impl WriteSequencer {
	pub fn new(pins: &PinMap, timing: TimingProfile) -> Self {
		WriteSequencer {
			write_enable: pins.write_enable_line(),
			timing,
			state: WriteState::Idle,
		}
	}

	pub fn state(&self) -> WriteState {
		self.state
	}

	pub(crate) fn configure<G: DigitalIo + ?Sized>(&mut self, io: &mut G) -> EResult<()> {
		configure_control(io, self.write_enable)?;
		self.state = WriteState::Idle;
		Ok(())
	}

	/// deassert WE (shutdown)
	pub(crate) fn disable<G: DigitalIo + ?Sized>(&mut self, io: &mut G) -> EResult<()> {
		set_control(io, self.write_enable, false)?;
		self.state = WriteState::Idle;
		Ok(())
	}

	fn enter(&mut self, state: WriteState) {
		trace!("write pulse: {:?} -> {:?}", self.state, state);
		self.state = state;
	}

	pub fn pulse<G: DigitalIo + ?Sized>(&mut self, io: &mut G, bus: &mut BusController, output: &mut OutputController) -> EResult<()> {
		let s0 = output.is_output_enabled();
		debug!("write pulse 0x{:02x} @ 0x{:03x}", bus.state().data_value(), bus.state().address_value());

		match self.run(io, bus, output, s0) {
			Ok(()) => {
				self.enter(WriteState::Idle);
				Ok(())
			},
			Err(e) => {
				// WE might still be asserted; only then OE must stay off
				if self.state != WriteState::WriteAsserted && output.is_output_enabled() != s0 {
					if let Err(restore) = output.set_output_enable(io, bus, s0) {
						error!("failed to restore output enable after aborted write pulse: {}", restore);
					}
				}
				warn!("write pulse aborted in state {:?}: {}", self.state, e);
				self.state = WriteState::Idle;
				Err(e)
			},
		}
	}

	fn run<G: DigitalIo + ?Sized>(&mut self, io: &mut G, bus: &mut BusController, output: &mut OutputController, s0: bool) -> EResult<()> {
		self.enter(WriteState::AddressDataSettling);
		bus.update(io)?;
		io.delay(self.timing.setup());

		// with OE enabled the data bus was released; it gets driven again
		// right after OE is deasserted and needs its own setup time then
		let data_was_driven = bus.is_data_driven();
		output.set_output_enable(io, bus, false)?;
		self.enter(WriteState::OutputDisabled);
		let settle = if data_was_driven {
			self.timing.output_disable_settle
		} else {
			cmp::max(self.timing.output_disable_settle, self.timing.data_setup)
		};
		io.delay(settle);

		set_control(io, self.write_enable, true)?;
		self.enter(WriteState::WriteAsserted);
		io.delay(self.timing.write_pulse_width);

		set_control(io, self.write_enable, false)?;
		self.enter(WriteState::WriteDeasserted);
		io.delay(self.timing.hold());

		if s0 {
			output.set_output_enable(io, bus, true)?;
		}
		Ok(())
	}
}
