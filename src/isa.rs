/*
    # Instruction set
    Every instruction is a single 32-bit word:

        opcode << 24 | op1 << 16 | op2 << 8 | op3

    Operand fields are 8 bits wide. Register operands hold a register number,
    literal operands hold a byte offset into the literal pool and target
    operands hold an absolute instruction index.

    Registers 0..=255 are partitioned into banks:
        R0..R127   general purpose
        S0..S31    streams      (128..=159)
        G0..G31    generators   (160..=191)
        C0..C31    consumers    (192..=223)
        SR         sample rate  (224)
*/

use crate::instruction::Operand;
use lazy_static::lazy_static;
use num_derive::FromPrimitive;
use num_traits::FromPrimitive;
use std::collections::{HashMap, HashSet};

pub const REGISTER_COUNT: usize = 256;
pub const BANK_SIZE: u8 = 32;
pub const GENERAL_COUNT: u8 = 128;
pub const STREAM_BASE: u8 = 128;
pub const GENERATOR_BASE: u8 = 160;
pub const CONSUMER_BASE: u8 = 192;
pub const SAMPLE_RATE_REG: u8 = 224;

/// Literal word standing for "the runtime's sample rate" in a stream rate slot.
pub const SAMPLE_RATE_SENTINEL: u32 = u32::MAX;

/// Kind of operand accepted in a given slot of an instruction.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum OperandKind {
    /// Any register.
    Reg,
    /// A stream register, S0..S31.
    Str,
    /// A literal or string, encoded as a pool byte offset.
    Lit,
    /// A label or register, encoded as an instruction index.
    Tgt,
    /// A stream, generator or consumer register.
    End,
}

impl OperandKind {
    pub fn accepts(&self, operand: &Operand) -> bool {
        match (self, operand) {
            (OperandKind::Reg, Operand::Register(_)) => true,
            (OperandKind::Str, Operand::Register(r)) => is_stream_reg(*r),
            (OperandKind::Lit, Operand::Literal(_)) => true,
            (OperandKind::Tgt, Operand::Register(_) | Operand::Label(_)) => true,
            (OperandKind::End, Operand::Register(r)) => {
                is_stream_reg(*r) || is_generator_reg(*r) || is_consumer_reg(*r)
            }
            _ => false,
        }
    }

    pub fn describe(&self) -> &'static str {
        match self {
            OperandKind::Reg => "a register",
            OperandKind::Str => "a stream register",
            OperandKind::Lit => "a literal",
            OperandKind::Tgt => "a label",
            OperandKind::End => "a stream, generator or consumer register",
        }
    }
}

macro_rules! for_each_opcode {
    ($callback:ident) => {
        $callback! {
            /// MOV d s: R(d) = R(s)
            Mov = 0, "MOV" => [Reg, Reg],
            /// MOVL d #l: R(d) = word at literal l
            Movl = 1, "MOVL" => [Reg, Lit],
            /// LDL d #l: R(d) = byte address of literal l
            Ldl = 2, "LDL" => [Reg, Lit],
            /// SREAD d s: dequeue from stream s into R(d), flag set on success
            Sread = 3, "SREAD" => [Reg, Str],
            /// SWRITE s v: enqueue R(v) into stream s, flag set on success
            Swrite = 4, "SWRITE" => [Str, Reg],
            Jmp = 5, "JMP" => [Tgt],
            /// Jump when the comparison flag is set.
            Jmpz = 6, "JMPZ" => [Tgt],
            /// Jump when the comparison flag is clear.
            Jmpnz = 7, "JMPNZ" => [Tgt],
            Nop = 8, "NOP" => [],
            /// CMP a b: flag = R(a) == R(b)
            Cmp = 9, "CMP" => [Reg, Reg],
            /// CMPLT a b: flag = R(a) < R(b), signed
            Cmplt = 10, "CMPLT" => [Reg, Reg],
            Call = 11, "CALL" => [Tgt],
            Ret = 12, "RET" => [],
            Halt = 13, "HALT" => [],
            Add = 14, "ADD" => [Reg, Reg, Reg],
            Sub = 15, "SUB" => [Reg, Reg, Reg],
            Mul = 16, "MUL" => [Reg, Reg, Reg],
            /// Signed division, faults on a zero divisor.
            Div = 17, "DIV" => [Reg, Reg, Reg],
            And = 18, "AND" => [Reg, Reg, Reg],
            Or = 19, "OR" => [Reg, Reg, Reg],
            Xor = 20, "XOR" => [Reg, Reg, Reg],
            Shl = 21, "SHL" => [Reg, Reg, Reg],
            /// Logical right shift.
            Shr = 22, "SHR" => [Reg, Reg, Reg],
            Ftoi = 23, "FTOI" => [Reg, Reg],
            Addf = 24, "ADDF" => [Reg, Reg, Reg],
            Subf = 25, "SUBF" => [Reg, Reg, Reg],
            Mulf = 26, "MULF" => [Reg, Reg, Reg],
            Divf = 27, "DIVF" => [Reg, Reg, Reg],
            Itof = 28, "ITOF" => [Reg, Reg],
            Cmpltf = 29, "CMPLTF" => [Reg, Reg],
            Push = 30, "PUSH" => [Reg],
            Pop = 31, "POP" => [Reg],
            /// LDR d a: R(d) = word at address R(a)
            Ldr = 32, "LDR" => [Reg, Reg],
            /// STR v a: word at address R(a) = R(v)
            Str = 33, "STR" => [Reg, Reg],
            Ldrb = 34, "LDRB" => [Reg, Reg],
            Strb = 35, "STRB" => [Reg, Reg],
            Ldrh = 36, "LDRH" => [Reg, Reg],
            Strh = 37, "STRH" => [Reg, Reg],
            Ldrsb = 38, "LDRSB" => [Reg, Reg],
            Ldrsh = 39, "LDRSH" => [Reg, Reg],
            /// SPAWN r start: new task at start, running at R(r) Hz
            Spawn = 40, "SPAWN" => [Reg, Tgt],
            Yield = 41, "YIELD" => [],
            /// Swap execution with the partner task.
            Start = 42, "START" => [],
            /// CONSOLE #op v
            Console = 43, "CONSOLE" => [Lit, Reg],
            /// SCREEN #op a b
            Screen = 44, "SCREEN" => [Lit, Reg, Reg],
            /// STREAM s #width: allocate a ring for stream s
            Stream = 45, "STREAM" => [Str, Lit],
            Setsf = 46, "SETSF" => [Str, Lit],
            Setsc = 47, "SETSC" => [Str, Lit],
            /// ATTACH from to #block
            Attach = 48, "ATTACH" => [End, End, Lit],
        }
    };
}

macro_rules! define_opcodes {
    ( $( $(#[$doc:meta])* $name:ident = $code:expr, $mnemonic:literal => [ $( $kind:ident ),* ] ),* $(,)? ) => {
        #[repr(u8)]
        #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, FromPrimitive)]
        pub enum Opcode {
            $( $(#[$doc])* $name = $code, )*
        }

        impl Opcode {
            pub const ALL: &'static [Opcode] = &[ $( Opcode::$name, )* ];

            pub const fn mnemonic(&self) -> &'static str {
                match self {
                    $( Opcode::$name => $mnemonic, )*
                }
            }

            pub const fn operands(&self) -> &'static [OperandKind] {
                match self {
                    $( Opcode::$name => &[ $( OperandKind::$kind ),* ], )*
                }
            }
        }
    };
}

for_each_opcode!(define_opcodes);

impl Opcode {
    pub const fn arity(&self) -> usize {
        self.operands().len()
    }

    /// Opcodes that may only be produced by a directive.
    pub fn is_directive_only(&self) -> bool {
        matches!(self, Opcode::Stream | Opcode::Attach)
    }

    pub fn from_mnemonic(mnemonic: &str) -> Option<Opcode> {
        MNEMONICS.get(mnemonic).copied()
    }
}

lazy_static! {
    static ref MNEMONICS: HashMap<&'static str, Opcode> =
        Opcode::ALL.iter().map(|op| (op.mnemonic(), *op)).collect();
}

/// Checks that opcode codes are contiguous from zero and mnemonics are unique.
pub fn verify_table() -> Result<(), String> {
    let mut seen = HashSet::new();
    for (index, op) in Opcode::ALL.iter().enumerate() {
        if *op as usize != index {
            return Err(format!("{} has code {}, expected {}", op.mnemonic(), *op as u8, index));
        }
        if !seen.insert(op.mnemonic()) {
            return Err(format!("mnemonic {} is defined twice", op.mnemonic()));
        }
    }
    Ok(())
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Decoded {
    pub opcode: Opcode,
    pub fields: [u8; 3],
}

pub const fn encode(opcode: Opcode, fields: [u8; 3]) -> u32 {
    (opcode as u32) << 24 | (fields[0] as u32) << 16 | (fields[1] as u32) << 8 | fields[2] as u32
}

/// Splits a word into its opcode and operand fields, or `None` for an unknown opcode.
pub fn decode(word: u32) -> Option<Decoded> {
    let opcode = Opcode::from_u8((word >> 24) as u8)?;
    Some(Decoded {
        opcode,
        fields: [(word >> 16) as u8, (word >> 8) as u8, word as u8],
    })
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RegisterBank {
    General,
    Stream,
    Generator,
    Consumer,
    SampleRate,
}

impl RegisterBank {
    pub fn of(reg: u8) -> Option<(RegisterBank, u8)> {
        match reg {
            r if r < STREAM_BASE => Some((RegisterBank::General, r)),
            r if r < GENERATOR_BASE => Some((RegisterBank::Stream, r - STREAM_BASE)),
            r if r < CONSUMER_BASE => Some((RegisterBank::Generator, r - GENERATOR_BASE)),
            r if r < SAMPLE_RATE_REG => Some((RegisterBank::Consumer, r - CONSUMER_BASE)),
            SAMPLE_RATE_REG => Some((RegisterBank::SampleRate, 0)),
            _ => None,
        }
    }

    /// Register number for index `n` of this bank.
    pub fn register(&self, n: u32) -> Option<u8> {
        let (base, size) = match self {
            RegisterBank::General => (0, GENERAL_COUNT),
            RegisterBank::Stream => (STREAM_BASE, BANK_SIZE),
            RegisterBank::Generator => (GENERATOR_BASE, BANK_SIZE),
            RegisterBank::Consumer => (CONSUMER_BASE, BANK_SIZE),
            RegisterBank::SampleRate => (SAMPLE_RATE_REG, 1),
        };
        if n < size as u32 {
            Some(base + n as u8)
        } else {
            None
        }
    }

    pub fn prefix(&self) -> &'static str {
        match self {
            RegisterBank::General => "R",
            RegisterBank::Stream => "S",
            RegisterBank::Generator => "G",
            RegisterBank::Consumer => "C",
            RegisterBank::SampleRate => "SR",
        }
    }
}

pub fn is_general_reg(reg: u8) -> bool {
    reg < STREAM_BASE
}

pub fn is_stream_reg(reg: u8) -> bool {
    (STREAM_BASE..GENERATOR_BASE).contains(&reg)
}

pub fn is_generator_reg(reg: u8) -> bool {
    (GENERATOR_BASE..CONSUMER_BASE).contains(&reg)
}

pub fn is_consumer_reg(reg: u8) -> bool {
    (CONSUMER_BASE..SAMPLE_RATE_REG).contains(&reg)
}

pub fn register_name(reg: u8) -> String {
    match RegisterBank::of(reg) {
        Some((RegisterBank::SampleRate, _)) => "SR".to_string(),
        Some((bank, n)) => format!("{}{}", bank.prefix(), n),
        None => format!("?{}", reg),
    }
}
