//! Text listing of an assembled [Module].
//!
//! Registers print by name, branch targets as raw instruction indices and
//! literal operands as `[offset]` byte offsets into the pool, followed by the
//! pool word they point at. Words with an unknown opcode print as `.word`.

use crate::{
    fileio::{Capabilities, Module},
    isa::{self, Decoded, OperandKind},
};
use std::fmt::Write;

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct DisassemblyOptions {
    /// Dump the literal pool before the code.
    pub literals: bool,
}

/// Mnemonic and operands, tab separated.
pub fn format_decoded(decoded: &Decoded) -> String {
    let mut line = decoded.opcode.mnemonic().to_string();
    for (kind, field) in decoded.opcode.operands().iter().zip(decoded.fields) {
        line.push('\t');
        match kind {
            OperandKind::Reg | OperandKind::Str | OperandKind::End => {
                line.push_str(&isa::register_name(field))
            }
            OperandKind::Lit => {
                let _ = write!(line, "[{}]", field);
            }
            OperandKind::Tgt => {
                let _ = write!(line, "{}", field);
            }
        }
    }
    line
}

pub fn format_word(word: u32) -> String {
    match isa::decode(word) {
        Some(decoded) => format_decoded(&decoded),
        None => format!(".word\t0x{:08x}", word),
    }
}

fn literal_comment(module: &Module, decoded: &Decoded) -> Option<String> {
    let offsets: Vec<String> = decoded
        .opcode
        .operands()
        .iter()
        .zip(decoded.fields)
        .filter(|(kind, _)| **kind == OperandKind::Lit)
        .filter_map(|(_, field)| module.literals.get(field as usize / 4))
        .map(|word| format!("0x{:08x}", word))
        .collect();
    (!offsets.is_empty()).then(|| offsets.join(", "))
}

pub fn disassemble(module: &Module, options: DisassemblyOptions) -> String {
    let mut out = String::new();
    if module.capabilities.contains(Capabilities::CONSOLE) {
        out.push_str("requires device .Console\n");
    }
    if module.capabilities.contains(Capabilities::SCREEN) {
        out.push_str("requires device .Screen\n");
    }

    if options.literals && !module.literals.is_empty() {
        out.push_str("; literals\n");
        for (idx, word) in module.literals.iter().enumerate() {
            let bytes = word.to_le_bytes();
            let text: String = bytes
                .iter()
                .map(|b| if b.is_ascii_graphic() || *b == b' ' { *b as char } else { '.' })
                .collect();
            let _ = writeln!(out, ";{:>6}  0x{:08x}  {:>11}  {}", idx * 4, word, *word as i32, text);
        }
    }

    for (idx, word) in module.code.iter().enumerate() {
        if idx == module.entry_point as usize {
            out.push_str("@entry\n");
        }
        let _ = write!(out, "{:>4}\t{}", idx, format_word(*word));
        if let Some(comment) = isa::decode(*word).and_then(|d| literal_comment(module, &d)) {
            let _ = write!(out, "\t; {}", comment);
        }
        out.push('\n');
    }
    out
}

/// Decodes every instruction word, `Err` carrying the raw word for unknown opcodes.
pub fn decode_module(module: &Module) -> Vec<Result<Decoded, u32>> {
    module
        .code
        .iter()
        .map(|word| isa::decode(*word).ok_or(*word))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{assembler::assemble, isa::Opcode};
    use pretty_assertions::assert_eq;

    #[test]
    fn listing() {
        let module = assemble("MOVL R0 #5\n@entry\nSREAD R1 S0\nJMP _x\n_x:\nHALT\n").unwrap();
        let text = disassemble(&module, DisassemblyOptions::default());
        assert_eq!(
            text,
            "   0\tMOVL\tR0\t[0]\t; 0x00000005\n\
             @entry\n   1\tSREAD\tR1\tS0\n   2\tJMP\t3\n   3\tHALT\n"
        );
    }

    #[test]
    fn capabilities_and_literals() {
        let module = assemble(".Console/write R0\n").unwrap();
        let text = disassemble(&module, DisassemblyOptions { literals: true });
        assert!(text.starts_with("requires device .Console\n; literals\n"));
        assert!(text.contains("0x00000000"));
    }

    #[test]
    fn unknown_opcodes_are_raw_words() {
        let module = Module {
            code: vec![0xFF00_0001, isa::encode(Opcode::Halt, [0, 0, 0])],
            ..Module::default()
        };
        let text = disassemble(&module, DisassemblyOptions::default());
        assert!(text.contains("   0\t.word\t0xff000001\n"));
        assert_eq!(decode_module(&module)[0], Err(0xFF00_0001));
    }

    #[test]
    fn round_trip_preserves_opcodes_and_arity() {
        let source = "\
@entry
MOVL R0 #5
MOVL R1 #7
ADD R2 R0 R1
CMP R2 R1
JMPZ _done
@stream S0 #32 SR #0
SREAD R3 S0
PUSH R3
_done:
HALT
";
        let module = assemble(source).unwrap();
        let shape: Vec<(Opcode, usize)> = decode_module(&module)
            .into_iter()
            .map(|d| d.map(|d| (d.opcode, d.opcode.arity())).unwrap())
            .collect();
        assert_eq!(
            shape,
            vec![
                (Opcode::Movl, 2),
                (Opcode::Movl, 2),
                (Opcode::Add, 3),
                (Opcode::Cmp, 2),
                (Opcode::Jmpz, 1),
                (Opcode::Stream, 2),
                (Opcode::Setsf, 2),
                (Opcode::Setsc, 2),
                (Opcode::Sread, 2),
                (Opcode::Push, 1),
                (Opcode::Halt, 0),
            ]
        );
    }
}
