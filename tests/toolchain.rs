use pretty_assertions::assert_eq;
use samplecontrol::{
	assemble, assemble_file,
	device::{pack_pointer, Devices},
	disasm::{disassemble, DisassemblyOptions},
	error::assembler::{AssemblerError, SourceError},
	AssemblerOptions, BufferConsole, Capabilities, Config, Exit, HeadlessScreen, Module, RingBuffer, Runtime,
};
use std::{fs, path::Path, sync::Arc, thread};

const PRINT: &str = "\
; prints the NUL terminated string at R0
@func _print:
	MOVL R2 #1
	MOVL R3 #0
_loop:
	LDRB R1 R0
	CMP R1 R3
	JMPZ _done
	.Console/write R1
	ADD R0 R0 R2
	JMP _loop
_done:
	RET
";

const HELLO: &str = "\
@include \"print.sc\"
@entry
	LDL R0 \"ok\\n\"
	CALL _print
	HALT
";

fn write(dir: &Path, name: &str, text: &str) {
	fs::write(dir.join(name), text).unwrap();
}

fn run_with_console(module: Module) -> (Exit, String) {
	let console = BufferConsole::new();
	let devices = Devices::new().with_console(console.clone());
	let exit = Runtime::new(module, Config::default(), devices).unwrap().exec().unwrap();
	(exit, console.contents_lossy())
}

#[test]
fn assemble_write_load_run() {
	let dir = tempfile::tempdir().unwrap();
	write(dir.path(), "print.sc", PRINT);
	write(dir.path(), "hello.sc", HELLO);

	let module = assemble_file(dir.path().join("hello.sc"), &AssemblerOptions::default()).unwrap();
	let path = dir.path().join("hello.scb");
	module.write_file(&path).unwrap();
	let loaded = Module::read_file(&path).unwrap();
	assert_eq!(loaded, module);
	assert!(loaded.capabilities.contains(Capabilities::CONSOLE));

	let (exit, output) = run_with_console(loaded);
	assert_eq!(exit, Exit::Halted);
	assert_eq!(output, "ok\n");
}

#[test]
fn disassembly_of_loaded_module() {
	let dir = tempfile::tempdir().unwrap();
	write(dir.path(), "print.sc", PRINT);
	write(dir.path(), "hello.sc", HELLO);
	let module = assemble_file(dir.path().join("hello.sc"), &AssemblerOptions::default()).unwrap();
	let path = dir.path().join("hello.scb");
	module.write_file(&path).unwrap();

	let text = disassemble(&Module::read_file(&path).unwrap(), DisassemblyOptions { literals: true });
	let lines: Vec<&str> = text.lines().collect();
	assert_eq!(lines[0], "requires device .Console");
	assert_eq!(lines[1], "; literals");
	// _print is 9 instructions long, so main starts at 9
	let entry = lines.iter().position(|l| *l == "@entry").unwrap();
	assert!(lines[entry + 1].starts_with("   9\tLDL\tR0\t["));
	assert_eq!(text.matches("CONSOLE").count(), 1);
}

#[test]
fn include_search_paths() {
	let dir = tempfile::tempdir().unwrap();
	let lib = dir.path().join("lib");
	fs::create_dir(&lib).unwrap();
	write(&lib, "print.sc", PRINT);
	write(dir.path(), "hello.sc", HELLO);

	let source = dir.path().join("hello.sc");
	match assemble_file(&source, &AssemblerOptions::default()) {
		Err(AssemblerError::Source { location, kind: SourceError::Include { path, .. } }) => {
			assert_eq!(path, "print.sc");
			assert_eq!(location.line, 1);
		}
		other => panic!("expected a missing include, got {:?}", other),
	}

	let options = AssemblerOptions::default().with_include_path(&lib);
	let (_, output) = run_with_console(assemble_file(&source, &options).unwrap());
	assert_eq!(output, "ok\n");
}

#[test]
fn errors_in_included_files_name_that_file() {
	let dir = tempfile::tempdir().unwrap();
	write(dir.path(), "bad.sc", "NOP\nFROB R0\n");
	write(dir.path(), "main.sc", "@include \"bad.sc\"\nHALT\n");

	let err = assemble_file(dir.path().join("main.sc"), &AssemblerOptions::default()).unwrap_err();
	match &err {
		AssemblerError::Source { location, kind } => {
			assert!(location.file.ends_with("bad.sc"));
			assert_eq!(location.line, 2);
			assert_eq!(kind, &SourceError::InvalidOpcode("FROB".into()));
		}
		other => panic!("expected a source error, got {:?}", other),
	}
}

#[test]
fn ring_across_threads() {
	const COUNT: u32 = 100_000;
	let ring = Arc::new(RingBuffer::new(64));

	let producer = {
		let ring = ring.clone();
		thread::spawn(move || {
			for value in 0..COUNT {
				while !ring.enqueue(value) {
					thread::yield_now();
				}
			}
		})
	};

	let mut expected = 0;
	while expected < COUNT {
		match ring.dequeue() {
			Some(value) => {
				assert_eq!(value, expected);
				expected += 1;
			}
			None => thread::yield_now(),
		}
	}
	producer.join().unwrap();
	assert!(ring.is_empty());
}

#[test]
fn host_thread_feeds_vm_stream() {
	let source = "\
@stream S2 #32 SR #0
	MOVL R1 #0
	MOVL R2 #0
	MOVL R3 #100
_wait:
	SREAD R0 S2
	JMPNZ _wait
	ADD R1 R1 R0
	MOVL R4 #1
	ADD R2 R2 R4
	CMP R2 R3
	JMPNZ _wait
	HALT
";
	let mut runtime = Runtime::new(assemble(source).unwrap(), Config::default(), Devices::new()).unwrap();
	for _ in 0..3 {
		runtime.step().unwrap();
	}
	let ring = runtime.stream(2).unwrap();
	let producer = thread::spawn(move || {
		for value in 1..=100 {
			while !ring.enqueue(value) {
				thread::yield_now();
			}
		}
	});
	assert_eq!(runtime.exec(), Ok(Exit::Halted));
	producer.join().unwrap();
	assert_eq!(runtime.reg(1), 5050);
}

#[test]
fn pointer_motion_reaches_sread() {
	let source = "\
@stream S0 #32 SR #0
@attach G0 S0 #0
_wait:
	YIELD
	SREAD R1 S0
	JMPNZ _wait
	HALT
";
	let screen = HeadlessScreen::new();
	let devices = Devices::new().with_screen(screen.clone());
	let module = assemble(source).unwrap();
	assert!(module.capabilities.contains(Capabilities::SCREEN));

	let mut runtime = Runtime::new(module, Config::default(), devices).unwrap();
	for _ in 0..4 {
		runtime.step().unwrap();
	}
	assert!(screen.inject_pointer(3, 4));
	assert_eq!(runtime.exec(), Ok(Exit::Halted));
	assert_eq!(runtime.reg(1), pack_pointer(3, 4));
}

#[test]
fn console_sink_drains_on_yield() {
	let source = "\
@stream S0 #8 SR #0
@attach S0 C0 #0
	LDL R0 \"hi\"
	MOVL R2 #1
	LDRB R1 R0
	SWRITE S0 R1
	ADD R0 R0 R2
	LDRB R1 R0
	SWRITE S0 R1
	YIELD
	HALT
";
	let (exit, output) = run_with_console(assemble(source).unwrap());
	assert_eq!(exit, Exit::Halted);
	assert_eq!(output, "hi");
}

#[test]
fn screen_draws_then_closes() {
	let source = "\
	MOVL R0 #16
	MOVL R1 #8
	.Screen/resize R0 R1
	MOVL R2 #3
	.Screen/colour R2
	.Screen/fill
	MOVL R2 #5
	.Screen/colour R2
	MOVL R0 #2
	MOVL R1 #1
	.Screen/move R0 R1
	.Screen/pixel
_frame:
	.Screen/begin
	.Screen/end
	.Screen/poll
	JMP _frame
";
	let screen = HeadlessScreen::new();
	screen.request_close();
	let devices = Devices::new().with_screen(screen.clone());
	let mut runtime = Runtime::new(assemble(source).unwrap(), Config::default(), devices).unwrap();
	assert_eq!(runtime.exec(), Ok(Exit::Closed));

	assert_eq!(screen.pixel(0, 0), Some(3));
	assert_eq!(screen.pixel(2, 1), Some(5));
	assert_eq!(screen.pixel(16, 0), None);
	let state = screen.state().unwrap();
	assert_eq!((state.width, state.height, state.frames), (16, 8, 1));
}

#[test]
fn missing_screen_is_reported() {
	let module = assemble(".Screen/fill\nHALT\n").unwrap();
	let err = Runtime::new(module, Config::default(), Devices::new()).err().unwrap();
	assert_eq!(err.to_string(), "required screen device is not available");
}
