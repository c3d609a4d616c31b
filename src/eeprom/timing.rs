use std::cmp;
use std::time::Duration;

/// Delays around the control line transitions. The host side is slow (a
/// GPIO write takes longer than most of the chip's nanosecond minimums),
/// so these are generous microsecond values.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct TimingProfile {
	/// address stable before WE gets asserted
	pub address_setup: Duration,
	/// address stable after WE got deasserted
	pub address_hold: Duration,
	/// data stable before WE gets deasserted
	pub data_setup: Duration,
	/// data stable after WE got deasserted
	pub data_hold: Duration,
	/// chip stops driving the data bus after OE got deasserted
	pub output_disable_settle: Duration,
	/// minimum time WE stays asserted
	pub write_pulse_width: Duration,
	/// data valid after OE got asserted (and address set)
	pub output_access: Duration,
	/// internal write cycle of the chip; no access during that time
	pub write_cycle: Duration,
}

impl Default for TimingProfile {
	fn default() -> Self {
		TimingProfile {
			address_setup: Duration::from_micros(20),
			address_hold: Duration::from_micros(200),
			data_setup: Duration::from_micros(100),
			data_hold: Duration::from_micros(20),
			output_disable_settle: Duration::from_micros(30),
			write_pulse_width: Duration::from_micros(250),
			output_access: Duration::from_micros(100),
			// AT28C16 t_WC is 1ms max
			write_cycle: Duration::from_millis(1),
		}
	}
}

impl TimingProfile {
	pub fn with_write_cycle(mut self, write_cycle: Duration) -> Self {
		self.write_cycle = write_cycle;
		self
	}

	/// wait after putting address and data on the bus
	pub fn setup(&self) -> Duration {
		cmp::max(self.address_setup, self.data_setup)
	}

	/// wait after deasserting WE
	pub fn hold(&self) -> Duration {
		cmp::max(self.address_hold, self.data_hold)
	}

	/// lower bound for a complete write pulse
	pub fn write_pulse_total(&self) -> Duration {
		self.setup() + self.output_disable_settle + self.write_pulse_width + self.hold()
	}
}
