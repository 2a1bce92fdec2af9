/// These instruction forms collapse register-vs-immediate and offset-vs-base mode bits into
/// a single variant (rather than splitting e.g. ADD/ADDIMM into two enum cases), carrying the
/// raw 16-bit operand fields un-sign-extended; `sign_extend` is applied once, at the point of
/// use, in `execute`.
#[derive(Debug)]
pub enum Instruction {
    Br(bool, bool, bool, u16),
    Add(Register, Register, Register, bool, u16),
    Ld(Register, u16),
    St(Register, u16),
    Jsr(bool, u16, Register),
    And(bool, u16, Register, Register, Register),
    Ldr(Register, Register, u16),
    Str(Register, Register, u16),
    /// Opcode 0b1000 (RTI). No-op in this core; see design notes.
    Unused,
    Not(Register, Register),
    Ldi(Register, u16),
    Sti(Register, u16),
    Jmp(Register),
    /// Opcode 0b1101 (RES). No-op in this core; see design notes.
    Reserved,
    Lea(Register, u16),
    Trap(u16),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Register {
    R0 = 0,
    R1 = 1,
    R2 = 2,
    R3 = 3,
    R4 = 4,
    R5 = 5,
    R6 = 6,
    R7 = 7,
}

impl Register {
    fn from(n: u16) -> Register {
        match n {
            0 => Register::R0,
            1 => Register::R1,
            2 => Register::R2,
            3 => Register::R3,
            4 => Register::R4,
            5 => Register::R5,
            6 => Register::R6,
            7 => Register::R7,
            _ => unreachable!("register field is masked to 3 bits"),
        }
    }
}

impl Instruction {
    pub fn decode(instruction: u16) -> Self {
        let opcode = instruction >> 12;

        match opcode {
            0x00 => {
                let n = ((instruction >> 11) & 0x1) == 1;
                let z = ((instruction >> 10) & 0x1) == 1;
                let p = ((instruction >> 9) & 0x1) == 1;
                let pc_offset = instruction & 0x1ff;

                Instruction::Br(n, z, p, pc_offset)
            }

            0x01 => {
                let r0 = Register::from((instruction >> 9) & 0x7);
                let r1 = Register::from((instruction >> 6) & 0x7);
                let r2 = Register::from(instruction & 0x7);
                let immediate_flag = ((instruction >> 5) & 0x1) == 0x1;
                let immediate_value = instruction & 0x1f;

                Instruction::Add(r0, r1, r2, immediate_flag, immediate_value)
            }

            0x02 => {
                let r0 = Register::from((instruction >> 9) & 0x7);
                let pc_offset = instruction & 0x1ff;

                Instruction::Ld(r0, pc_offset)
            }

            0x03 => {
                let r0 = Register::from((instruction >> 9) & 0x7);
                let pc_offset = instruction & 0x1ff;

                Instruction::St(r0, pc_offset)
            }

            0x04 => {
                let use_pc_offset = ((instruction >> 11) & 1) == 1;
                let r0 = Register::from((instruction >> 6) & 0x7);
                let pc_offset = instruction & 0x7ff;

                Instruction::Jsr(use_pc_offset, pc_offset, r0)
            }

            0x05 => {
                // `& 0x1` (bitwise), not `== 1 && ...` — a logical-AND here would silently
                // treat every odd instruction word as immediate-mode.
                let immediate_flag = ((instruction >> 5) & 0x1) == 1;
                let immediate_value = instruction & 0x1f;

                let r0 = Register::from((instruction >> 9) & 0x7);
                let r1 = Register::from((instruction >> 6) & 0x7);
                let r2 = Register::from(instruction & 0x7);

                Instruction::And(immediate_flag, immediate_value, r0, r1, r2)
            }

            0x06 => {
                let r0 = Register::from((instruction >> 9) & 0x7);
                let r1 = Register::from((instruction >> 6) & 0x7);
                let offset = instruction & 0x3f;

                Instruction::Ldr(r0, r1, offset)
            }

            0x07 => {
                let sr = Register::from((instruction >> 9) & 0x7);
                let base_r = Register::from((instruction >> 6) & 0x7);
                // 0x3f (6 bits), not 0x2f — a narrower mask would clip bit [4] of the offset.
                let offset = instruction & 0x3f;

                Instruction::Str(sr, base_r, offset)
            }

            0x08 => Instruction::Unused,

            0x09 => {
                let r0 = Register::from((instruction >> 9) & 0x7);
                let r1 = Register::from((instruction >> 6) & 0x7);

                Instruction::Not(r0, r1)
            }

            0x0a => {
                let dr = Register::from((instruction >> 9) & 0x7);
                let pc_offset = instruction & 0x1ff;

                Instruction::Ldi(dr, pc_offset)
            }

            0x0b => {
                let r0 = Register::from((instruction >> 9) & 0x7);
                let pc_offset = instruction & 0x1ff;

                Instruction::Sti(r0, pc_offset)
            }

            0x0c => {
                let r0 = Register::from((instruction >> 6) & 0x7);

                Instruction::Jmp(r0)
            }

            0x0d => Instruction::Reserved,

            0x0e => {
                let r0 = Register::from((instruction >> 9) & 0x7);
                let pc_offset = instruction & 0x1ff;

                Instruction::Lea(r0, pc_offset)
            }

            0x0f => Instruction::Trap(instruction & 0xff),

            _ => unreachable!("opcode is masked to 4 bits"),
        }
    }
}
