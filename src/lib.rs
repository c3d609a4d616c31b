#[macro_use]
extern crate failure;
#[macro_use]
extern crate log;

macro_rules! with_context {
	(( $fmt:tt $($t:tt)* ), $e:expr) => {{
		use failure::Error;

		match (|| { $e })() {
			Ok(v) => Ok(v),
			Err(e) => {
				let e: Error = e;
				let msg = format!(concat!($fmt, ": {}") $($t)*, e);
				Err(Error::from(e.context(msg)))
			}
		}
	}};

	($msg:expr, $e:expr) => {
		with_context!(("{}", $msg), $e)
	};
}

pub type AResult<T> = Result<T, failure::Error>;

pub mod eeprom;
pub mod error;
pub mod gpio;

pub use crate::eeprom::{
	PinMap,
	Programmer,
	TimingProfile,
};
pub use crate::error::{
	EResult,
	EepromError,
};
pub use crate::gpio::DigitalIo;

/// Run `f` with a programmer on `io`; the lines are released afterwards
/// even if `f` fails.
pub fn with_programmer<G, F, R>(io: G, pins: PinMap, timing: TimingProfile, f: F) -> AResult<R>
where
	G: DigitalIo,
	F: FnOnce(&mut Programmer<G>) -> AResult<R>,
{
	let mut programmer = with_context!("Failed to set up digital lines", {
		Ok(Programmer::open(io, pins, timing)?)
	})?;
	let res = f(&mut programmer);
	let closed = programmer.close();
	let res = res?;
	with_context!("Failed to release digital lines", {
		Ok(closed?)
	})?;
	Ok(res)
}
