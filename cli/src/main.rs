mod error;
use clap::{Parser, Subcommand};
use error::*;
use samplecontrol::{
	config::{DEFAULT_SAMPLE_RATE, DEFAULT_STACK_SIZE},
	disasm, info, log, AssemblerOptions, Config, Devices, HeadlessScreen, Module, Runtime, StdoutConsole,
};
use std::{path::PathBuf, process};

#[derive(Debug, Parser)]
#[command(name = "sc", version, about = "Assembler, disassembler and VM for SC modules")]
#[command(propagate_version = true)]
struct Cli {
	/// Print debug output
	#[arg(short, long, global = true, env = "SC_VERBOSE")]
	verbose: bool,

	#[command(subcommand)]
	command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
	/// Assemble a source file into a module
	Assemble {
		input: PathBuf,
		output: PathBuf,
		/// Extra directory to search for @include files
		#[arg(short = 'I', long = "include", env = "SC_INCLUDE", value_delimiter = ':')]
		include: Vec<PathBuf>,
	},
	/// Print a listing of a module
	Disassemble {
		module: PathBuf,
		/// Dump the literal pool too
		#[arg(long)]
		literals: bool,
	},
	/// Run a module
	Run {
		module: PathBuf,
		#[arg(long, env = "SC_SAMPLE_RATE", default_value_t = DEFAULT_SAMPLE_RATE)]
		sample_rate: u32,
		/// Stack size of each task, in words
		#[arg(long, env = "SC_STACK_SIZE", default_value_t = DEFAULT_STACK_SIZE)]
		stack_size: usize,
		/// Log every executed instruction
		#[arg(long, env = "SC_TRACE")]
		trace: bool,
	},
}

fn main() {
	let cli = match Cli::try_parse() {
		Ok(cli) => cli,
		Err(e) => {
			let _ = e.print();
			process::exit(exit_code(&e));
		}
	};
	log::set_verbose(cli.verbose);
	if let Err(e) = exec(cli.command) {
		match e {
			CLIError::Assembler(_) => eprintln!("{}", e),
			_ => samplecontrol::error!("{}", e),
		}
		process::exit(1);
	}
}

/// `--help` and `--version` are not failures; anything else clap rejects is.
fn exit_code(e: &clap::Error) -> i32 {
	if e.use_stderr() {
		1
	} else {
		0
	}
}

fn exec(command: Command) -> CLIResult {
	match command {
		Command::Assemble { input, output, include } => {
			let options = include
				.into_iter()
				.fold(AssemblerOptions::default(), |options, path| options.with_include_path(path));
			let module = samplecontrol::assemble_file(&input, &options)?;
			module.write_file(&output)?;
			info!(
				"wrote {} ({} instructions, {} literal words)",
				output.display(),
				module.code.len(),
				module.literals.len()
			);
		}
		Command::Disassemble { module, literals } => {
			let module = Module::read_file(module)?;
			print!("{}", disasm::disassemble(&module, disasm::DisassemblyOptions { literals }));
		}
		Command::Run { module, sample_rate, stack_size, trace } => {
			let config = Config::default()
				.with_sample_rate(sample_rate)
				.with_stack_size(stack_size)
				.with_trace(trace);
			if trace {
				log::set_verbose(true);
			}
			let devices = Devices::new()
				.with_console(StdoutConsole::new())
				.with_screen(HeadlessScreen::new());
			let exit = Runtime::load(module, config, devices)?.exec()?;
			info!("exited: {:?}", exit);
		}
	}
	Ok(())
}
