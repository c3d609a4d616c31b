#[macro_use]
extern crate clap;
#[macro_use]
extern crate failure;
#[macro_use]
extern crate log;

extern crate parallel_eeprom_programmer;
use parallel_eeprom_programmer::*;

use std::io::{
	self,
	BufRead,
	Write,
};
use std::process::exit;
use std::time::Duration;

use parallel_eeprom_programmer::eeprom::{
	ADDRESS_LIMIT,
	parse_address,
	parse_data,
};
use parallel_eeprom_programmer::gpio::{
	Line,
	mock,
	rpi,
};

fn get_param<T>(matches: &clap::ArgMatches, name: &str) -> AResult<T>
where
	T: std::str::FromStr,
	failure::Error: From<<T as std::str::FromStr>::Err>,
{
	let param = match matches.value_of(name) {
		Some(p) => p,
		None => bail!("missing parameter {}", name),
	};
	param.parse::<T>().map_err(|e| {
		let e = failure::Error::from(e);
		let msg = format!("invalid parameter {}: {}", name, e);
		e.context(msg).into()
	})
}

fn get_opt_param<T>(matches: &clap::ArgMatches, name: &str) -> AResult<Option<T>>
where
	T: std::str::FromStr,
	failure::Error: From<<T as std::str::FromStr>::Err>,
{
	if matches.is_present(name) {
		get_param(matches, name).map(Some)
	} else {
		Ok(None)
	}
}

fn get_address(matches: &clap::ArgMatches, name: &str) -> AResult<Option<usize>> {
	match matches.value_of(name) {
		None => Ok(None),
		Some(s) => Ok(Some(parse_address(s)?)),
	}
}

fn get_data(matches: &clap::ArgMatches, name: &str) -> AResult<u8> {
	match matches.value_of(name) {
		None => bail!("missing parameter {}", name),
		Some(s) => Ok(parse_data(s)?),
	}
}

struct Settings {
	backend: String,
	pins: PinMap,
	timing: TimingProfile,
	capacity: usize,
}

impl Settings {
	fn from_matches(matches: &clap::ArgMatches) -> AResult<Self> {
		let backend = matches.value_of("backend").unwrap_or("rpi").to_string();
		match backend.as_str() {
			"rpi" | "mock" => (),
			_ => bail!("unknown backend {:?} (expected rpi or mock)", backend),
		}

		let mut pins = PinMap::default();
		let we = get_opt_param::<u8>(matches, "we")?.map(Line);
		let oe = get_opt_param::<u8>(matches, "oe")?.map(Line);
		if we.is_some() || oe.is_some() {
			pins = pins.with_control_lines(
				we.unwrap_or(pins.write_enable_line()),
				oe.unwrap_or(pins.output_enable_line()),
			)?;
		}

		let mut timing = TimingProfile::default();
		if let Some(us) = get_opt_param::<u64>(matches, "write_cycle")? {
			timing = timing.with_write_cycle(Duration::from_micros(us));
		}

		let capacity = get_opt_param::<usize>(matches, "capacity")?.unwrap_or(ADDRESS_LIMIT);
		ensure!(capacity > 0 && capacity <= ADDRESS_LIMIT, "capacity must be within 1..{}", ADDRESS_LIMIT);

		Ok(Settings {
			backend,
			pins,
			timing,
			capacity,
		})
	}

	fn open_backend(&self) -> AResult<Box<dyn DigitalIo>> {
		let io: Box<dyn DigitalIo> = match self.backend.as_str() {
			"rpi" => Box::new(rpi::RpiGpio::open()?),
			"mock" => {
				warn!("Dry run: using simulated lines, nothing is programmed");
				Box::new(mock::MockIo::with_chip(mock::MockChip::new(self.pins.clone())))
			},
			backend => bail!("unknown backend {:?}", backend),
		};
		Ok(io)
	}

	fn run<F, R>(&self, f: F) -> AResult<R>
	where
		F: FnOnce(&mut Programmer<Box<dyn DigitalIo>>) -> AResult<R>,
	{
		let io = self.open_backend()?;
		let capacity = self.capacity;
		with_programmer(io, self.pins.clone(), self.timing, |p| {
			p.set_capacity(capacity)?;
			f(p)
		})
	}
}

fn print_hex(start: usize, data: &[u8]) {
	for (i, byte) in data.iter().enumerate() {
		let address = start + i;
		if 0 == i || 0 == address % 16 {
			if 0 != i {
				println!("");
			}
			print!("{:03x}:", address);
		} else if 0 == address % 8 {
			print!(" ");
		}
		print!(" {:02x}", byte);
	}
	if !data.is_empty() {
		println!("");
	}
}

fn cmd_pins(settings: &Settings) -> AResult<()> {
	print!("{}", settings.pins);
	Ok(())
}

fn cmd_write(settings: &Settings, sub_m: &clap::ArgMatches) -> AResult<()> {
	let address = match get_address(sub_m, "ADDRESS")? {
		Some(a) => a,
		None => bail!("missing parameter ADDRESS"),
	};
	let data = get_data(sub_m, "DATA")?;
	let verify = sub_m.is_present("verify");

	settings.run(|p| {
		p.write_byte(address, data)?;
		if verify {
			p.verify_byte(address, data)?;
			info!("Verified 0x{:02x} @ 0x{:03x}", data, address);
		}
		Ok(())
	})
}

fn cmd_read(settings: &Settings, sub_m: &clap::ArgMatches) -> AResult<()> {
	let address = match get_address(sub_m, "ADDRESS")? {
		Some(a) => a,
		None => bail!("missing parameter ADDRESS"),
	};

	let value = settings.run(|p| Ok(p.read(address)?))?;
	println!("0x{:03x}: 0x{:02x} ({:08b})", address, value, value);
	Ok(())
}

fn cmd_fill(settings: &Settings, sub_m: &clap::ArgMatches) -> AResult<()> {
	let value = get_data(sub_m, "VALUE")?;
	let verify = sub_m.is_present("verify");

	settings.run(|p| {
		p.fill_all(value as usize)?;
		if verify {
			p.verify_all(value as usize)?;
		}
		Ok(())
	})
}

fn cmd_dump(settings: &Settings, sub_m: &clap::ArgMatches) -> AResult<()> {
	let start = get_address(sub_m, "START")?.unwrap_or(0);
	let len = match get_opt_param::<usize>(sub_m, "LEN")? {
		Some(len) => len,
		None => settings.capacity.saturating_sub(start),
	};

	let data = settings.run(|p| Ok(p.dump(start, len)?))?;
	print_hex(start, &data);
	Ok(())
}

const MENU: &str = "Main Menu:
	p) Program Address
	1) Set Bits
	2) Set Address
	3) Pulse WE
	4) Print Current Bits
	5) Print Current Address
	o) Print Output
	s) Set All";

struct Shell<L> {
	lines: L,
}

impl<L> Shell<L>
where
	L: Iterator<Item = io::Result<String>>,
{
	/// `None` on end of input
	fn prompt(&mut self, text: &str) -> AResult<Option<String>> {
		print!("{}", text);
		io::stdout().flush()?;
		match self.lines.next() {
			None => Ok(None),
			Some(line) => Ok(Some(line?.trim().to_string())),
		}
	}

	fn run<G: DigitalIo>(&mut self, p: &mut Programmer<G>) -> AResult<()> {
		loop {
			println!("{}", MENU);
			println!("\te) {} Output", if p.is_output_enabled() { "Disable" } else { "Enable" });
			println!("\tq) Quit");

			let choice = match self.prompt("\nEnter command: ")? {
				Some(choice) => choice,
				None => return Ok(()),
			};
			println!("");

			match self.command(p, &choice) {
				Ok(true) => (),
				Ok(false) => return Ok(()),
				// bad input is reported, everything else ends the session
				Err(e) => match e.downcast::<EepromError>() {
					Ok(ref e) if e.is_range() => println!("Error: {}\n", e),
					Ok(e) => return Err(e.into()),
					Err(e) => return Err(e),
				},
			}
		}
	}

	// false: quit
	fn command<G: DigitalIo>(&mut self, p: &mut Programmer<G>, choice: &str) -> AResult<bool> {
		match choice {
			"p" => {
				let data = match self.prompt("Enter 8-bit word: ")? {
					Some(s) => parse_data(&s)?,
					None => return Ok(false),
				};
				let address = match self.prompt("Enter address (0-1023): ")? {
					Some(s) => parse_address(&s)?,
					None => return Ok(false),
				};
				p.write_byte(address, data)?;
			},
			"1" => {
				match self.prompt("Enter 8-bit word: ")? {
					Some(s) => p.set_data_bits(&s)?,
					None => return Ok(false),
				}
			},
			"2" => {
				match self.prompt("Enter address (0-1023): ")? {
					Some(s) => p.set_address(parse_address(&s)?)?,
					None => return Ok(false),
				}
			},
			"3" => p.pulse_write()?,
			"4" => println!("Bits: {}", p.bus_state().data_bits()),
			"5" => println!("Address: {}", p.bus_state().address_bits()),
			"o" => {
				let address = p.bus_state().address_value();
				let value = p.read(address)?;
				println!("Data at address {}: {:08b}\n", p.bus_state().address_bits(), value);
			},
			"s" => {
				match self.prompt("Enter 8-bit word: ")? {
					Some(s) => p.fill_all(parse_data(&s)? as usize)?,
					None => return Ok(false),
				}
			},
			"e" => {
				let enabled = !p.is_output_enabled();
				p.set_output_enable(enabled)?;
			},
			"q" => return Ok(false),
			_ => println!("Error: Invalid menu choice {:?}\n", choice),
		}
		Ok(true)
	}
}

fn cmd_shell(settings: &Settings) -> AResult<()> {
	let stdin = io::stdin();
	let mut shell = Shell {
		lines: stdin.lock().lines(),
	};
	settings.run(|p| shell.run(p))
}

fn main_app() -> AResult<()> {
	let matches = clap_app!(@app (app_from_crate!())
		(@setting SubcommandRequiredElseHelp)
		(global_setting: clap::AppSettings::VersionlessSubcommands)
		(@arg backend: -b --backend +takes_value "digital I/O backend: rpi (default) or mock (dry run)")
		(@arg we: --we +takes_value "GPIO line for write enable (BCM number)")
		(@arg oe: --oe +takes_value "GPIO line for output enable (BCM number)")
		(@arg write_cycle: --("write-cycle-us") +takes_value "wait after each write for the chip's write cycle (microseconds)")
		(@arg capacity: -c --capacity +takes_value "number of bytes fill and dump cover (up to 1024)")
		(@subcommand pins =>
			(about: "show pin assignments")
		)
		(@subcommand write =>
			(about: "program a single byte")
			(@arg verify: -v --verify "read back after writing")
			(@arg ADDRESS: +required "address (decimal or 0x hex)")
			(@arg DATA: +required "byte value (decimal, 0x hex or 8 bits)")
		)
		(@subcommand read =>
			(about: "read a single byte")
			(@arg ADDRESS: +required "address (decimal or 0x hex)")
		)
		(@subcommand fill =>
			(about: "program every byte with the same value")
			(@arg verify: -v --verify "read everything back after writing")
			(@arg VALUE: +required "byte value (decimal, 0x hex or 8 bits)")
		)
		(@subcommand dump =>
			(about: "read a range and print it as hex")
			(@arg START: "first address (default 0)")
			(@arg LEN: "number of bytes (default up to capacity)")
		)
		(@subcommand shell =>
			(about: "interactive menu")
		)
	).get_matches();

	let settings = Settings::from_matches(&matches)?;

	match matches.subcommand() {
		("pins", _) => {
			cmd_pins(&settings)
		},
		("write", Some(sub_m)) => {
			cmd_write(&settings, sub_m)
		},
		("read", Some(sub_m)) => {
			cmd_read(&settings, sub_m)
		},
		("fill", Some(sub_m)) => {
			cmd_fill(&settings, sub_m)
		},
		("dump", Some(sub_m)) => {
			cmd_dump(&settings, sub_m)
		},
		("shell", _) => {
			cmd_shell(&settings)
		},
		("", _) => bail!("no subcommand"),
		(cmd, _) => bail!("not implemented subcommand {:?}", cmd),
	}
}

fn main() {
	env_logger::from_env(env_logger::Env::default().default_filter_or("info")).init();

	if let Err(e) = main_app() {
		error!("Error: {}", e);
		exit(1);
	}
}
