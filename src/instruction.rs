use crate::{
    error::assembler::Location,
    isa::{self, Opcode},
};

pub type LabelId = usize;

/*
    Operands as written in source. Registers are already partitioned into
    their bank, literals point at a pool word and labels stay symbolic until
    the module is written.
*/
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Operand {
    Register(u8),
    Literal(u16),
    Label(LabelId),
}

#[derive(Clone, Debug, PartialEq)]
pub struct Instruction {
    pub opcode: Opcode,
    pub operands: Vec<Operand>,
    pub location: Location,
}

impl Instruction {
    pub fn new(opcode: Opcode, operands: Vec<Operand>, location: Location) -> Self {
        Self {
            opcode,
            operands,
            location,
        }
    }

    /// Packs the instruction into a word, with `resolve` turning labels into
    /// instruction indices. Returns the offending value when a field overflows.
    pub fn encode<F>(&self, mut resolve: F) -> Result<u32, u32>
    where
        F: FnMut(LabelId) -> u32,
    {
        let mut fields = [0u8; 3];
        for (field, operand) in fields.iter_mut().zip(&self.operands) {
            let value = match *operand {
                Operand::Register(r) => r as u32,
                Operand::Literal(index) => index as u32 * 4,
                Operand::Label(id) => resolve(id),
            };
            *field = u8::try_from(value).map_err(|_| value)?;
        }
        Ok(isa::encode(self.opcode, fields))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn literal_operands_encode_as_byte_offsets() {
        let ins = Instruction::new(
            Opcode::Movl,
            vec![Operand::Register(3), Operand::Literal(2)],
            Location::default(),
        );
        assert_eq!(ins.encode(|_| 0), Ok(0x0103_0800));
    }

    #[test]
    fn overflowing_field_is_reported() {
        let ins = Instruction::new(
            Opcode::Movl,
            vec![Operand::Register(0), Operand::Literal(64)],
            Location::default(),
        );
        assert_eq!(ins.encode(|_| 0), Err(256));

        let jump = Instruction::new(Opcode::Jmp, vec![Operand::Label(0)], Location::default());
        assert_eq!(jump.encode(|_| 300), Err(300));
    }
}
