/*
    # Assembler
    Source is read line by line. A line holds a directive, a device call, a
    label definition or an instruction followed by its operands:

        @task _main:           ; labels defined after @task/@func are scoped
        _loop:                 ; to the task, i.e. `main.loop`
            MOVL R0 #5
            JMP _loop

    Everything is collected into an [Assembly] (instructions, literal pool,
    labels, entry point and device capabilities) which is shared with any
    `@include`d files. Labels stay symbolic until [Assembly::finish] encodes
    the instruction words, so forward references need no second pass over
    the source.
*/

use crate::{
    config::AssemblerOptions,
    device::{ConsoleOp, ScreenOp},
    error::{assembler::*, pool::*},
    fileio::{Capabilities, Module},
    instruction::{Instruction, LabelId, Operand},
    isa::{self, Opcode, OperandKind, RegisterBank},
    pool::LiteralPool,
    scanner::TokenKind,
};
use logos::{Lexer, Logos};
use std::{
    collections::HashMap,
    fs,
    path::{Path, PathBuf},
};

mod diagnostic;
mod labels;
pub use diagnostic::render;
pub use labels::*;

pub const MAX_INSTRUCTIONS: usize = u16::MAX as usize / 4;
pub const MAX_LABELS: usize = u16::MAX as usize;
pub const MAX_INCLUDE_DEPTH: usize = 16;

macro_rules! source_error {
	($self:ident, $kind:expr) => {
		return Err($self.error($kind))
	};
}

/// State shared by every file taking part in one assembly.
#[derive(Debug, Default)]
pub struct Assembly {
	pub instructions: Vec<Instruction>,
	pub literals: LiteralPool,
	pub labels: LabelTable,
	pub entry_point: Option<(u16, Location)>,
	pub capabilities: Capabilities,
	// Device sub-op code -> pool index, so each code is stored once.
	device_ops: HashMap<u32, u16>,
}

impl Assembly {
	pub fn new() -> Self {
		Self::default()
	}

	/// Assembles `source` into this context. `name` is used in diagnostics and
	/// as the base for relative includes.
	pub fn assemble_source(&mut self, name: &str, source: &str, options: &AssemblerOptions) -> AssemblerResult {
		isa::verify_table().map_err(AssemblerError::Table)?;
		Assembler::new(self, options, name, source, 0).assemble()
	}

	pub fn assemble_file(&mut self, path: impl AsRef<Path>, options: &AssemblerOptions) -> AssemblerResult {
		let path = path.as_ref();
		let source = fs::read_to_string(path).map_err(|e| AssemblerError::Io {
			path: path.display().to_string(),
			reason: e.to_string(),
		})?;
		self.assemble_source(&path.display().to_string(), &source, options)
	}

	/// Resolves labels and encodes every instruction.
	pub fn finish(self) -> AssemblerResult<Module> {
		for id in 0..self.labels.len() {
			if let Err(label) = self.labels.resolve(id) {
				return Err(AssemblerError::Source {
					location: label.first_use.clone(),
					kind: SourceError::UndefinedLabel(label.name.clone()),
				});
			}
		}

		let mut code = Vec::with_capacity(self.instructions.len());
		for ins in &self.instructions {
			let word = ins
				.encode(|id| self.labels.resolve(id).map_or(0, u32::from))
				.map_err(|value| AssemblerError::Source {
					location: ins.location.clone(),
					kind: SourceError::OperandRange(value),
				})?;
			code.push(word);
		}

		let entry_point = match self.entry_point {
			Some((entry, location)) => {
				if !code.is_empty() && entry as usize >= code.len() {
					return Err(AssemblerError::Source {
						location,
						kind: SourceError::Expected("an instruction after @entry"),
					});
				}
				entry
			}
			None => {
				warn!("no @entry given, execution starts at instruction 0");
				0
			}
		};

		debug!(
			"assembled {} instructions, {} literal words, {} labels",
			code.len(),
			self.literals.len(),
			self.labels.len()
		);
		Ok(Module {
			capabilities: self.capabilities,
			entry_point,
			literals: self.literals.into_words(),
			code,
		})
	}
}

/// Assembles a single in-memory source with default options.
pub fn assemble(source: &str) -> AssemblerResult<Module> {
	let mut assembly = Assembly::new();
	assembly.assemble_source("<source>", source, &AssemblerOptions::default())?;
	assembly.finish()
}

pub fn assemble_file(path: impl AsRef<Path>, options: &AssemblerOptions) -> AssemblerResult<Module> {
	let mut assembly = Assembly::new();
	assembly.assemble_file(path, options)?;
	assembly.finish()
}

/// Parser for one source file.
pub struct Assembler<'src, 'ctx> {
	lexer: Lexer<'src, TokenKind>,
	source: &'src str,
	file: String,
	ctx: &'ctx mut Assembly,
	options: &'ctx AssemblerOptions,
	current: Option<TokenKind>,
	line: usize,
	line_start: usize,
	scope: Option<String>,
	// Set by @task/@func until the next label definition names the scope.
	pending_scope: bool,
	depth: usize,
}

impl<'src, 'ctx> Assembler<'src, 'ctx> {
	pub fn new(
		ctx: &'ctx mut Assembly,
		options: &'ctx AssemblerOptions,
		file: &str,
		source: &'src str,
		depth: usize,
	) -> Self {
		Self {
			lexer: TokenKind::lexer(source),
			source,
			file: file.to_string(),
			ctx,
			options,
			current: None,
			line: 1,
			line_start: 0,
			scope: None,
			pending_scope: false,
			depth,
		}
	}

	pub fn assemble(&mut self) -> AssemblerResult {
		while let Some(token) = self.next() {
			match token {
				TokenKind::Newline => {}
				TokenKind::Directive(name) => self.directive(&name)?,
				TokenKind::Device((device, function)) => self.device(&device, &function)?,
				TokenKind::LabelDef(name) => self.define_label(&name)?,
				TokenKind::LabelRef(name) => {
					self.reference_label(&name)?;
				}
				TokenKind::Mnemonic(mnemonic) => self.instruction(&mnemonic)?,
				TokenKind::Literal(_) | TokenKind::Str(_) => source_error!(self, SourceError::BareLiteral),
				TokenKind::Error => return Err(self.invalid_token()),
				_ => source_error!(self, SourceError::InvalidToken(self.lexer.slice().to_string())),
			}
		}
		Ok(())
	}

	/// Wrapper around [Lexer::next] keeping track of the current line.
	fn next(&mut self) -> Option<TokenKind> {
		if self.current == Some(TokenKind::Newline) {
			self.line += 1;
			self.line_start = self.lexer.span().end;
		}
		self.current = self.lexer.next();
		self.current.clone()
	}

	fn peek(&self) -> Option<TokenKind> {
		self.lexer.clone().next()
	}

	fn at_line_end(&self) -> bool {
		matches!(self.peek(), None | Some(TokenKind::Newline))
	}

	fn end_of_line(&mut self) -> AssemblerResult {
		if !self.at_line_end() {
			self.next();
			source_error!(self, SourceError::Expected("end of line"));
		}
		Ok(())
	}

	/// Consume the rest of the line, returning how many tokens were skipped.
	fn skip_line(&mut self) -> usize {
		let mut skipped = 0;
		while !self.at_line_end() {
			self.next();
			skipped += 1;
		}
		skipped
	}

	fn location(&self) -> Location {
		let column = self.lexer.span().start.saturating_sub(self.line_start) + 1;
		let text = self.source[self.line_start..].lines().next().unwrap_or_default();
		Location {
			file: self.file.clone(),
			line: self.line,
			column,
			text: text.to_string(),
		}
	}

	fn error(&self, kind: SourceError) -> AssemblerError {
		AssemblerError::Source {
			location: self.location(),
			kind,
		}
	}

	fn invalid_token(&self) -> AssemblerError {
		let slice = self.lexer.slice().to_string();
		if slice.starts_with('#') {
			self.error(SourceError::InvalidLiteral(slice))
		} else {
			self.error(SourceError::InvalidToken(slice))
		}
	}

	fn pool<F>(&mut self, f: F) -> AssemblerResult<u16>
	where
		F: FnOnce(&mut LiteralPool) -> PoolResult<u16>,
	{
		f(&mut self.ctx.literals).map_err(|e| self.error(SourceError::Pool(e)))
	}

	fn directive(&mut self, name: &str) -> AssemblerResult {
		// Every toplevel construct ends the current label scope.
		self.scope = None;
		self.pending_scope = false;
		match name {
			"task" | "func" => self.pending_scope = true,
			"entry" => {
				if self.ctx.entry_point.is_some() {
					source_error!(self, SourceError::DuplicateEntry);
				}
				let entry = self.ctx.instructions.len() as u16;
				self.ctx.entry_point = Some((entry, self.location()));
			}
			"stream" => self.stream()?,
			"attach" => self.attach()?,
			"include" => self.include()?,
			_ => source_error!(self, SourceError::UnknownDirective(name.to_string())),
		}
		// `@task _main:` may name its scope on the same line.
		if self.pending_scope {
			if let Some(TokenKind::LabelDef(_)) = self.peek() {
				return Ok(());
			}
		}
		self.end_of_line()
	}

	fn scoped(&self, name: &str) -> String {
		match &self.scope {
			Some(scope) if !self.pending_scope => format!("{}.{}", scope, name),
			_ => name.to_string(),
		}
	}

	fn define_label(&mut self, name: &str) -> AssemblerResult {
		let full = self.scoped(name);
		if self.ctx.labels.find(&full).is_none() && self.ctx.labels.len() >= MAX_LABELS {
			source_error!(self, SourceError::Pool(PoolError::Full(PoolItem::Labels)));
		}
		let offset = self.ctx.instructions.len() as u16;
		let location = self.location();
		if self.ctx.labels.define(&full, offset, location).is_none() {
			source_error!(self, SourceError::DuplicateLabel(full));
		}
		if self.pending_scope {
			self.scope = Some(name.to_string());
			self.pending_scope = false;
		}
		Ok(())
	}

	/// A scoped label wins, then an already defined global one. Otherwise a
	/// forward entry is made for the scoped name, falling back to the global
	/// name if the scoped one is never defined.
	fn reference_label(&mut self, name: &str) -> AssemblerResult<LabelId> {
		let scoped = self.scoped(name);
		if let Some(id) = self.ctx.labels.find(&scoped) {
			return Ok(id);
		}
		if scoped != name && self.ctx.labels.is_defined(name) {
			if let Some(id) = self.ctx.labels.find(name) {
				return Ok(id);
			}
		}
		if self.ctx.labels.len() >= MAX_LABELS {
			source_error!(self, SourceError::Pool(PoolError::Full(PoolItem::Labels)));
		}
		let fallback = (scoped != name).then_some(name);
		let location = self.location();
		Ok(self.ctx.labels.reference(&scoped, fallback, location))
	}

	fn emit(&mut self, opcode: Opcode, operands: Vec<Operand>, location: Location) -> AssemblerResult {
		if self.ctx.instructions.len() >= MAX_INSTRUCTIONS {
			return Err(AssemblerError::Source {
				location,
				kind: SourceError::Pool(PoolError::Full(PoolItem::Instructions)),
			});
		}
		self.ctx.instructions.push(Instruction::new(opcode, operands, location));
		Ok(())
	}

	fn instruction(&mut self, mnemonic: &str) -> AssemblerResult {
		let opcode = match Opcode::from_mnemonic(mnemonic) {
			Some(op) if !op.is_directive_only() => op,
			_ => source_error!(self, SourceError::InvalidOpcode(mnemonic.to_string())),
		};
		let location = self.location();
		let operands = self.operands(opcode)?;
		self.emit(opcode, operands, location)
	}

	/// Parse the rest of the line as operands of `opcode`, checking each
	/// against the slot it lands in.
	fn operands(&mut self, opcode: Opcode) -> AssemblerResult<Vec<Operand>> {
		let kinds = opcode.operands();
		let mut operands = Vec::with_capacity(kinds.len());
		while !self.at_line_end() {
			if operands.len() == kinds.len() {
				let found = operands.len() + self.skip_line();
				source_error!(self, SourceError::ArityMismatch {
					mnemonic: opcode.mnemonic(),
					expected: kinds.len(),
					found,
				});
			}
			let operand = self.operand()?;
			let index = operands.len();
			if !kinds[index].accepts(&operand) {
				source_error!(self, SourceError::InvalidOperand {
					mnemonic: opcode.mnemonic(),
					index,
					expected: kinds[index].describe(),
				});
			}
			operands.push(operand);
		}
		if operands.len() != kinds.len() {
			source_error!(self, SourceError::ArityMismatch {
				mnemonic: opcode.mnemonic(),
				expected: kinds.len(),
				found: operands.len(),
			});
		}
		Ok(operands)
	}

	fn operand(&mut self) -> AssemblerResult<Operand> {
		Ok(match self.next() {
			Some(TokenKind::General(n)) => self.register(RegisterBank::General, n)?,
			Some(TokenKind::Stream(n)) => self.register(RegisterBank::Stream, n)?,
			Some(TokenKind::Generator(n)) => self.register(RegisterBank::Generator, n)?,
			Some(TokenKind::Consumer(n)) => self.register(RegisterBank::Consumer, n)?,
			Some(TokenKind::SampleRate) => Operand::Register(isa::SAMPLE_RATE_REG),
			Some(TokenKind::Literal(literal)) => Operand::Literal(self.pool(|p| p.push_literal(literal))?),
			Some(TokenKind::Str(text)) => Operand::Literal(self.pool(|p| p.push_str(&text))?),
			Some(TokenKind::LabelRef(name)) => Operand::Label(self.reference_label(&name)?),
			Some(TokenKind::Error) => return Err(self.invalid_token()),
			_ => source_error!(self, SourceError::Expected("an operand")),
		})
	}

	fn register(&self, bank: RegisterBank, n: u32) -> AssemblerResult<Operand> {
		match bank.register(n) {
			Some(reg) => Ok(Operand::Register(reg)),
			None => source_error!(self, SourceError::InvalidRegister(self.lexer.slice().to_string())),
		}
	}

	/// A `#literal` operand, returned with its pool index and raw word.
	fn literal(&mut self) -> AssemblerResult<(u16, u32)> {
		match self.next() {
			Some(TokenKind::Literal(literal)) => {
				let idx = self.pool(|p| p.push_literal(literal))?;
				Ok((idx, literal.to_word()))
			}
			Some(TokenKind::Error) => Err(self.invalid_token()),
			_ => source_error!(self, SourceError::Expected("a literal")),
		}
	}

	/// `@stream S<n> #<size> #<rate>|SR #<continuous>`
	fn stream(&mut self) -> AssemblerResult {
		let location = self.location();
		let stream = self.operand()?;
		if !OperandKind::Str.accepts(&stream) {
			source_error!(self, SourceError::Expected("a stream register"));
		}

		let (size, width) = self.literal()?;
		if !matches!(width, 8 | 16 | 32) {
			source_error!(self, SourceError::InvalidStreamSize(width));
		}
		let rate = if self.peek() == Some(TokenKind::SampleRate) {
			self.next();
			self.pool(|p| p.push_word(isa::SAMPLE_RATE_SENTINEL))?
		} else {
			self.literal()?.0
		};
		let (continuous, flag) = self.literal()?;
		if flag > 1 {
			source_error!(self, SourceError::InvalidContinuous(flag));
		}

		self.emit(Opcode::Stream, vec![stream, Operand::Literal(size)], location.clone())?;
		self.emit(Opcode::Setsf, vec![stream, Operand::Literal(rate)], location.clone())?;
		self.emit(Opcode::Setsc, vec![stream, Operand::Literal(continuous)], location)
	}

	/// `@attach <from> <to> #<block>`, either stream to consumer or generator to stream.
	fn attach(&mut self) -> AssemblerResult {
		let location = self.location();
		let operands = self.operands(Opcode::Attach)?;
		match (operands[0], operands[1]) {
			(Operand::Register(from), Operand::Register(to))
				if (isa::is_stream_reg(from) && isa::is_consumer_reg(to))
					|| (isa::is_generator_reg(from) && isa::is_stream_reg(to)) => {}
			_ => source_error!(self, SourceError::Expected("a stream and consumer, or a generator and stream")),
		}
		// G0 is fed by the screen pointer, C0 drains into the console
		match (operands[0], operands[1]) {
			(Operand::Register(isa::GENERATOR_BASE), _) => self.ctx.capabilities.insert(Capabilities::SCREEN),
			(_, Operand::Register(isa::CONSUMER_BASE)) => self.ctx.capabilities.insert(Capabilities::CONSOLE),
			_ => {}
		}
		self.emit(Opcode::Attach, operands, location)
	}

	fn include(&mut self) -> AssemblerResult {
		let path = match self.next() {
			Some(TokenKind::Str(path)) => path,
			_ => source_error!(self, SourceError::Expected("a quoted path")),
		};
		if self.depth + 1 > MAX_INCLUDE_DEPTH {
			source_error!(self, SourceError::IncludeDepth(MAX_INCLUDE_DEPTH));
		}
		let resolved = match self.resolve_include(&path) {
			Some(resolved) => resolved,
			None => source_error!(self, SourceError::Include {
				path,
				reason: "file not found".to_string(),
			}),
		};
		let source = match fs::read_to_string(&resolved) {
			Ok(source) => source,
			Err(e) => source_error!(self, SourceError::Include {
				path,
				reason: e.to_string(),
			}),
		};

		let file = resolved.display().to_string();
		debug!("including {}", file);
		let mut included = Assembler::new(&mut *self.ctx, self.options, &file, &source, self.depth + 1);
		included.assemble()
	}

	fn resolve_include(&self, path: &str) -> Option<PathBuf> {
		let base = Path::new(&self.file)
			.parent()
			.map(Path::to_path_buf)
			.unwrap_or_default();
		std::iter::once(base)
			.chain(self.options.include_paths.iter().cloned())
			.map(|dir| dir.join(path))
			.find(|candidate| candidate.is_file())
	}

	/// `.Console/<fn>` and `.Screen/<fn>` calls.
	fn device(&mut self, device: &str, function: &str) -> AssemblerResult {
		let location = self.location();
		let unknown = || SourceError::UnknownDeviceFunction {
			device: device.to_string(),
			function: function.to_string(),
		};
		let (opcode, op, registers, capability) = match device {
			"Console" => match ConsoleOp::from_name(function) {
				Some((op, n)) => (Opcode::Console, op as u32, n, Capabilities::CONSOLE),
				None => source_error!(self, unknown()),
			},
			"Screen" => match ScreenOp::from_name(function) {
				Some((op, n)) => (Opcode::Screen, op as u32, n, Capabilities::SCREEN),
				None => source_error!(self, unknown()),
			},
			_ => source_error!(self, SourceError::UnknownDevice(device.to_string())),
		};

		let mut operands = vec![Operand::Literal(self.device_op(op)?)];
		for index in 0..registers {
			if self.at_line_end() {
				source_error!(self, SourceError::ArityMismatch {
					mnemonic: opcode.mnemonic(),
					expected: registers,
					found: index,
				});
			}
			let operand = self.operand()?;
			if !OperandKind::Reg.accepts(&operand) {
				source_error!(self, SourceError::InvalidOperand {
					mnemonic: opcode.mnemonic(),
					index: index + 1,
					expected: OperandKind::Reg.describe(),
				});
			}
			operands.push(operand);
		}
		self.end_of_line()?;
		operands.resize(opcode.arity(), Operand::Register(0));

		self.ctx.capabilities.insert(capability);
		self.emit(opcode, operands, location)
	}

	fn device_op(&mut self, op: u32) -> AssemblerResult<u16> {
		if let Some(idx) = self.ctx.device_ops.get(&op) {
			return Ok(*idx);
		}
		let idx = self.pool(|p| p.push_word(op))?;
		self.ctx.device_ops.insert(op, idx);
		Ok(idx)
	}
}

#[cfg(test)]
pub(crate) mod tests {
	use super::*;
	use crate::isa::{decode, Decoded};
	use pretty_assertions::assert_eq;

	pub(crate) mod util {
		use super::*;

		pub fn assemble_ok(source: &str) -> Module {
			match assemble(source) {
				Ok(module) => module,
				Err(e) => panic!("assembly failed: {}", e),
			}
		}

		pub fn assemble_err(source: &str) -> (usize, SourceError) {
			match assemble(source) {
				Err(AssemblerError::Source { location, kind }) => (location.line, kind),
				other => panic!("expected a source error, got {:?}", other),
			}
		}

		pub fn decoded(module: &Module) -> Vec<Decoded> {
			module.code.iter().map(|w| decode(*w).unwrap()).collect()
		}
	}
	use util::*;

	#[test]
	fn minimal_program() {
		let module = assemble_ok("@entry\nMOVL R0 #5\nMOVL R1 #7\nADD R2 R0 R1\nHALT\n");
		assert_eq!(module.literals, vec![5, 7]);
		assert_eq!(
			module.code,
			vec![
				isa::encode(Opcode::Movl, [0, 0, 0]),
				isa::encode(Opcode::Movl, [1, 4, 0]),
				isa::encode(Opcode::Add, [2, 0, 1]),
				isa::encode(Opcode::Halt, [0, 0, 0]),
			]
		);
		assert_eq!(module.entry_point, 0);
		assert_eq!(module.capabilities, Capabilities::NONE);
	}

	#[test]
	fn literal_in_register_slot_reports_line() {
		let (line, kind) = assemble_err("@entry\nNOP\nMOV R0 #5\n");
		assert_eq!(line, 3);
		assert_eq!(
			kind,
			SourceError::InvalidOperand {
				mnemonic: "MOV",
				index: 1,
				expected: "a register",
			}
		);
	}

	#[test]
	fn forward_and_backward_labels() {
		let module = assemble_ok("_top:\nNOP\nJMP _end\nJMP _top\n_end:\nHALT\n");
		let code = decoded(&module);
		assert_eq!(code[1].fields[0], 3);
		assert_eq!(code[2].fields[0], 0);
	}

	#[test]
	fn duplicate_label() {
		let (line, kind) = assemble_err("_a:\nNOP\n_a:\n");
		assert_eq!(line, 3);
		assert_eq!(kind, SourceError::DuplicateLabel("a".into()));
	}

	#[test]
	fn undefined_label_reported_at_first_use() {
		let (line, kind) = assemble_err("NOP\nJMP _nowhere\nJMP _nowhere\n");
		assert_eq!(line, 2);
		assert_eq!(kind, SourceError::UndefinedLabel("nowhere".into()));
	}

	#[test]
	fn scoped_labels() {
		let source = "\
@task _a:
_loop:
	JMP _loop
@task _b:
_loop:
	JMP _loop
	CALL _helper
	JMP _a
@func _helper:
	RET
";
		let code = decoded(&assemble_ok(source));
		assert_eq!(code[0].fields[0], 0);
		assert_eq!(code[1].fields[0], 1);
		assert_eq!(code[2].fields[0], 4);
		assert_eq!(code[3].fields[0], 0);
	}

	#[test]
	fn any_directive_ends_a_scope() {
		let code = decoded(&assemble_ok("@task _a:\n_x:\nNOP\n@entry\n_x:\nJMP _x\n"));
		assert_eq!(code[1].fields[0], 1);

		let source = "@task _a:\n_x:\nNOP\n@stream S0 #8 #1 #0\n_x:\nJMP _x\n";
		let code = decoded(&assemble_ok(source));
		// STREAM, SETSF and SETSC sit between the two labels
		assert_eq!(code[4].fields[0], 4);
	}

	#[test]
	fn register_bank_edges() {
		let cases = [
			("R127", Some(127)),
			("S0", Some(isa::STREAM_BASE)),
			("S31", Some(159)),
			("G31", Some(191)),
			("C31", Some(223)),
			("SR", Some(isa::SAMPLE_RATE_REG)),
			("R128", None),
			("S32", None),
			("G32", None),
			("C32", None),
		];
		for (name, expected) in cases {
			let source = format!("MOV R0 {}\n", name);
			match expected {
				Some(reg) => assert_eq!(decoded(&assemble_ok(&source))[0].fields[1], reg, "{}", name),
				None => assert_eq!(assemble_err(&source), (1, SourceError::InvalidRegister(name.into()))),
			}
		}
	}

	#[test]
	fn arity_mismatch() {
		let (_, kind) = assemble_err("ADD R0 R1\n");
		assert_eq!(
			kind,
			SourceError::ArityMismatch {
				mnemonic: "ADD",
				expected: 3,
				found: 2
			}
		);
		let (_, kind) = assemble_err("HALT R0 R1\n");
		assert_eq!(
			kind,
			SourceError::ArityMismatch {
				mnemonic: "HALT",
				expected: 0,
				found: 2
			}
		);
	}

	#[test]
	fn toplevel_errors() {
		assert_eq!(assemble_err("#5\n").1, SourceError::BareLiteral);
		assert_eq!(assemble_err("@bogus\n").1, SourceError::UnknownDirective("bogus".into()));
		assert_eq!(assemble_err("FROB R0\n").1, SourceError::InvalidOpcode("FROB".into()));
		assert_eq!(assemble_err("STREAM S0 #8\n").1, SourceError::InvalidOpcode("STREAM".into()));
		assert_eq!(assemble_err("@entry\n@entry\n").1, SourceError::DuplicateEntry);
		assert_eq!(assemble_err("MOV R128 R0\n").1, SourceError::InvalidRegister("R128".into()));
		assert_eq!(assemble_err(".Keyboard/read\n").1, SourceError::UnknownDevice("Keyboard".into()));
	}

	#[test]
	fn missing_entry_defaults_to_zero() {
		assert_eq!(assemble_ok("NOP\nHALT\n").entry_point, 0);
		assert_eq!(assemble_ok("NOP\n@entry\nHALT\n").entry_point, 1);
	}

	#[test]
	fn stream_directive() {
		let module = assemble_ok("@stream S2 #16 SR #1\n");
		let code = decoded(&module);
		let ops: Vec<_> = code.iter().map(|d| d.opcode).collect();
		assert_eq!(ops, vec![Opcode::Stream, Opcode::Setsf, Opcode::Setsc]);
		assert!(code.iter().all(|d| d.fields[0] == isa::STREAM_BASE + 2));
		assert_eq!(module.literals, vec![16, isa::SAMPLE_RATE_SENTINEL, 1]);
		assert_eq!(code[1].fields[1], 4);

		assert_eq!(assemble_err("@stream S0 #12 #100 #0\n").1, SourceError::InvalidStreamSize(12));
		assert_eq!(assemble_err("@stream S0 #8 #100 #2\n").1, SourceError::InvalidContinuous(2));
		assert_eq!(
			assemble_err("@stream R0 #8 #100 #0\n").1,
			SourceError::Expected("a stream register")
		);
	}

	#[test]
	fn attach_directive() {
		let code = decoded(&assemble_ok("@attach S0 C0 #4\n@attach G0 S1 #0\n"));
		assert_eq!(code[0].opcode, Opcode::Attach);
		assert_eq!(&code[0].fields[..2], &[isa::STREAM_BASE, isa::CONSUMER_BASE]);
		assert_eq!(&code[1].fields[..2], &[isa::GENERATOR_BASE, isa::STREAM_BASE + 1]);
		assert!(matches!(assemble_err("@attach C0 S0 #0\n").1, SourceError::Expected(_)));
		assert!(assemble_ok("@attach S0 C0 #0\n").capabilities.contains(Capabilities::CONSOLE));
		assert_eq!(assemble_ok("@attach S0 C1 #0\n").capabilities, Capabilities::NONE);
	}

	#[test]
	fn device_calls() {
		let module = assemble_ok(".Console/write R3\n.Screen/colour R1\n.Screen/pixel\n.Console/write R4\n");
		assert!(module.capabilities.contains(Capabilities::CONSOLE));
		assert!(module.capabilities.contains(Capabilities::SCREEN));
		let code = decoded(&module);
		assert_eq!(code[0], Decoded { opcode: Opcode::Console, fields: [0, 3, 0] });
		assert_eq!(code[1].fields, [4, 1, 0]);
		assert_eq!(code[2].fields, [8, 0, 0]);
		assert_eq!(code[3].fields, [0, 4, 0]);
		// write is code 0, colour 2, pixel 3
		assert_eq!(module.literals, vec![0, 2, 3]);

		assert!(matches!(
			assemble_err(".Screen/blit\n").1,
			SourceError::UnknownDeviceFunction { .. }
		));
		assert!(matches!(assemble_err(".Screen/move R0\n").1, SourceError::ArityMismatch { .. }));
	}

	#[test]
	fn string_literals_are_pooled() {
		let module = assemble_ok("LDL R0 \"hi\\n\"\nMOVL R1 #1\n");
		assert_eq!(module.literals, vec![u32::from_le_bytes(*b"hi\n\0"), 1]);
		assert_eq!(decoded(&module)[1].fields[1], 4);
	}

	#[test]
	fn operand_range() {
		let mut source = "JMP _far\n".to_string();
		source.push_str(&"NOP\n".repeat(300));
		source.push_str("_far:\nHALT\n");
		let (line, kind) = assemble_err(&source);
		assert_eq!(line, 1);
		assert_eq!(kind, SourceError::OperandRange(301));
	}

	#[test]
	fn comments_and_blank_lines() {
		let module = assemble_ok("; header\n\n   NOP ; trailing\n\n\tHALT\n");
		assert_eq!(module.code.len(), 2);
	}
}
