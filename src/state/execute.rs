use crate::sign_extend::SignExtend;
use crate::state::instructions::{Instruction, Register::*};
use crate::state::{Condition, State};
use crate::trap_vector::TrapVector;
use std::io;

/// Performs the semantic effect of one decoded instruction, consuming and returning the
/// whole VM state rather than taking `&mut State` — the run loop and (previously) the
/// debugger both thread state this way throughout this codebase.
pub fn execute(mut state: State, instruction: Instruction) -> io::Result<State> {
    state.pc = state.pc.wrapping_add(1);

    match instruction {
        // BR - Conditional Branch
        //
        // The condition codes specified by bits [11:9] are tested; if any tested code is
        // set, the program branches to the incremented PC plus the sign-extended offset.
        Instruction::Br(n, z, p, pc_offset) => {
            let condition = state.condition;
            if (n && condition == Condition::N)
                || (z && condition == Condition::Z)
                || (p && condition == Condition::P)
            {
                state.pc = state.pc.wrapping_add(pc_offset.sign_extend(9));
            }
        }

        // ADD - Addition. Second operand is SR2 or a sign-extended imm5, selected by bit [5].
        Instruction::Add(dr, sr1, sr2, immediate_flag, immediate_value) => {
            let rhs = if immediate_flag {
                immediate_value.sign_extend(5)
            } else {
                state.registers.read(sr2)
            };
            let value = state.registers.read(sr1).wrapping_add(rhs);

            state.registers.write(dr, value);
            state.update_flags(dr);
        }

        // LD - Load. DR <- mem[incremented PC + pc_offset9].
        Instruction::Ld(dr, pc_offset) => {
            let address = state.pc.wrapping_add(pc_offset.sign_extend(9));
            let value = state.memory.read(address);

            state.registers.write(dr, value);
            state.update_flags(dr);
        }

        // ST - Store. mem[incremented PC + pc_offset9] <- SR.
        Instruction::St(sr, pc_offset) => {
            let address = state.pc.wrapping_add(pc_offset.sign_extend(9));

            state.memory.write(address, state.registers.read(sr));
        }

        // JSR / JSRR - Jump to Subroutine. The incremented PC is saved into R7 *before* the
        // new PC is computed, so JSRR R7 (jumping through the very register being
        // overwritten) behaves correctly.
        Instruction::Jsr(use_pc_offset, pc_offset, base_r) => {
            let return_address = state.pc;

            state.pc = if use_pc_offset {
                state.pc.wrapping_add(pc_offset.sign_extend(11))
            } else {
                state.registers.read(base_r)
            };

            state.registers.write(R7, return_address);
        }

        // AND - Bit-wise Logical AND. Same operand shape as ADD.
        Instruction::And(immediate_flag, immediate_value, dr, sr1, sr2) => {
            let rhs = if immediate_flag {
                immediate_value.sign_extend(5)
            } else {
                state.registers.read(sr2)
            };
            let value = state.registers.read(sr1) & rhs;

            state.registers.write(dr, value);
            state.update_flags(dr);
        }

        // LDR - Load Base+offset. DR <- mem[BaseR + offset6].
        Instruction::Ldr(dr, base_r, offset) => {
            let address = state.registers.read(base_r).wrapping_add(offset.sign_extend(6));
            let value = state.memory.read(address);

            state.registers.write(dr, value);
            state.update_flags(dr);
        }

        // STR - Store Base+offset. mem[BaseR + offset6] <- SR.
        Instruction::Str(sr, base_r, offset) => {
            let address = state.registers.read(base_r).wrapping_add(offset.sign_extend(6));
            let value = state.registers.read(sr);

            state.memory.write(address, value);
        }

        // RTI - privileged-mode return. Undefined in user mode; no-op here.
        Instruction::Unused => {
            log::debug!("executed RTI (opcode 0b1000); no-op");
        }

        // NOT - Bit-Wise Complement.
        Instruction::Not(dr, sr) => {
            state.registers.write(dr, !state.registers.read(sr));
            state.update_flags(dr);
        }

        // LDI - Load Indirect. DR <- mem[mem[incremented PC + pc_offset9]].
        Instruction::Ldi(dr, pc_offset) => {
            let pointer_address = state.pc.wrapping_add(pc_offset.sign_extend(9));
            let address = state.memory.read(pointer_address);
            let value = state.memory.read(address);

            state.registers.write(dr, value);
            state.update_flags(dr);
        }

        // STI - Store Indirect. mem[mem[incremented PC + pc_offset9]] <- SR.
        Instruction::Sti(sr, pc_offset) => {
            let pointer_address = state.pc.wrapping_add(pc_offset.sign_extend(9));
            let address = state.memory.read(pointer_address);

            state.memory.write(address, state.registers.read(sr));
        }

        // JMP / RET - Jump. RET is JMP R7.
        Instruction::Jmp(base_r) => {
            state.pc = state.registers.read(base_r);
        }

        // RES - reserved opcode. No-op here.
        Instruction::Reserved => {
            log::debug!("executed RES (opcode 0b1101); no-op");
        }

        // LEA - Load Effective Address. DR <- incremented PC + pc_offset9 (the address
        // itself, memory is not read).
        Instruction::Lea(dr, pc_offset) => {
            let address = state.pc.wrapping_add(pc_offset.sign_extend(9));

            state.registers.write(dr, address);
            state.update_flags(dr);
        }

        // TRAP - System Call. R7 saves the return address, but only once a recognized
        // vector is about to run — an unrecognized vector is a full no-op, including no
        // register write.
        Instruction::Trap(trapvect8) => match TrapVector::decode(trapvect8) {
            Some(trap_vector) => {
                state.registers.write(R7, state.pc);
                log::debug!("TRAP {:?}", trap_vector);
                run_trap(&mut state, trap_vector)?;
            }
            None => {
                log::warn!("unrecognized TRAP vector {:#04x}; ignoring", trapvect8);
            }
        },
    }

    Ok(state)
}

fn run_trap(state: &mut State, trap_vector: TrapVector) -> io::Result<()> {
    match trap_vector {
        // Read a single character from the keyboard, blocking. Its ASCII code is copied
        // into R0 (high eight bits cleared); not echoed.
        TrapVector::GETC => {
            let byte = state.io.read_char()?;
            state.registers.write(R0, u16::from(byte));
        }

        // Write R0[7:0] to the console display.
        TrapVector::OUT => {
            let byte = state.registers.read(R0) as u8;
            state.io.write_char(byte)?;
            state.io.flush()?;
        }

        // Write consecutive memory locations as ASCII characters, one per word, starting
        // at mem[R0], until a 0x0000 word.
        TrapVector::PUTS => {
            let mut address = state.registers.read(R0);
            loop {
                let word = state.memory.read(address);
                if word == 0 {
                    break;
                }
                state.io.write_char(word as u8)?;
                address = address.wrapping_add(1);
            }
            state.io.flush()?;
        }

        // Prompt, read one character (blocking), echo it, and copy its code into R0.
        TrapVector::IN => {
            for &byte in b"Enter a character: " {
                state.io.write_char(byte)?;
            }
            state.io.flush()?;

            let byte = state.io.read_char()?;
            state.io.write_char(byte)?;
            state.io.flush()?;

            state.registers.write(R0, u16::from(byte));
        }

        // Write consecutive memory locations as ASCII characters, two per word (low byte
        // first), until a 0x0000 word. A trailing 0x00 high byte is not written.
        TrapVector::PUTSP => {
            let mut address = state.registers.read(R0);
            loop {
                let word = state.memory.read(address);
                if word == 0 {
                    break;
                }

                let low = (word & 0xff) as u8;
                state.io.write_char(low)?;

                let high = (word >> 8) as u8;
                if high != 0 {
                    state.io.write_char(high)?;
                }

                address = address.wrapping_add(1);
            }
            state.io.flush()?;
        }

        // Print a halt notice and stop the run loop.
        TrapVector::HALT => {
            for &byte in b"HALT\n" {
                state.io.write_char(byte)?;
            }
            state.io.flush()?;
            state.running = false;
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::io::BufferedIo;

    fn run_to_halt(mut state: State) -> State {
        while state.running {
            state = state.step().unwrap();
        }
        state
    }

    #[test]
    fn add_immediate() {
        let mut state = State::new();
        state.registers.write(R2, 5);
        state.memory.write(0x3000, 0b0001_001_010_1_00011); // ADD R1, R2, #3
        let state = state.step().unwrap();

        assert_eq!(state.registers.read(R1), 8);
        assert_eq!(state.condition, Condition::P);
    }

    #[test]
    fn add_sign_extended_negative_immediate() {
        let mut state = State::new();
        state.registers.write(R1, 0);
        state.memory.write(0x3000, 0b0001_001_001_1_11111); // ADD R1, R1, #-1
        let state = state.step().unwrap();

        assert_eq!(state.registers.read(R1), 0xFFFF);
        assert_eq!(state.condition, Condition::N);
    }

    #[test]
    fn ldi_indirection() {
        let mut state = State::new();
        state.memory.write(0x3000, 0b1010_001_000000001); // LDI R1, #1
        state.memory.write(0x3002, 0x4000);
        state.memory.write(0x4000, 0x0042);
        let state = state.step().unwrap();

        assert_eq!(state.registers.read(R1), 0x0042);
        assert_eq!(state.condition, Condition::P);
    }

    #[test]
    fn br_unconditional_is_always_taken() {
        let mut state = State::new();
        state.condition = Condition::Z;
        state.memory.write(0x3000, 0b0000_111_000000010); // BRnzp #2
        let state = state.step().unwrap();

        assert_eq!(state.pc, 0x3003);
    }

    #[test]
    fn br_with_untested_flag_falls_through() {
        let mut state = State::new();
        state.condition = Condition::Z;
        state.memory.write(0x3000, 0b0000_100_000000010); // BRn #2, COND is Z
        let state = state.step().unwrap();

        assert_eq!(state.pc, 0x3001);
    }

    #[test]
    fn jsr_saves_return_address_then_ret_restores_pc() {
        let mut state = State::new();
        state.memory.write(0x3000, 0b0100_1_00000000010); // JSR #+2
        state.memory.write(0x3003, 0b1100_000_111_000000); // RET (JMP R7)

        let state = state.step().unwrap();
        assert_eq!(state.registers.read(R7), 0x3001);
        assert_eq!(state.pc, 0x3003);

        let state = state.step().unwrap();
        assert_eq!(state.pc, 0x3001);
    }

    #[test]
    fn jsrr_through_the_register_it_overwrites() {
        // R7 starts out pointing at the JSRR instruction's own address; saving the
        // return address into R7 must happen before the base register is read.
        let mut state = State::new();
        state.registers.write(R7, 0x3000);
        state.memory.write(0x3000, 0b0100_0_00_111_000000); // JSRR R7
        let state = state.step().unwrap();

        assert_eq!(state.registers.read(R7), 0x3001);
        assert_eq!(state.pc, 0x3000);
    }

    #[test]
    fn puts_then_halt_writes_expected_bytes_and_stops() {
        let io = BufferedIo::with_input(&[]);
        let output = io.output_handle();
        let mut state = State::with_io(Box::new(io));

        state.registers.write(R0, 0x3010);
        state.memory.write(0x3010, u16::from(b'H'));
        state.memory.write(0x3011, u16::from(b'i'));
        state.memory.write(0x3012, u16::from(b'!'));
        state.memory.write(0x3013, 0);
        state.memory.write(0x3000, 0xF022); // TRAP x22 (PUTS)
        state.memory.write(0x3001, 0xF025); // TRAP x25 (HALT)

        let state = run_to_halt(state);

        assert!(!state.running);
        assert_eq!(&output.borrow()[..], b"Hi!HALT\n");
    }

    #[test]
    fn putsp_packs_two_characters_per_word_without_a_spurious_trailing_byte() {
        let io = BufferedIo::with_input(&[]);
        let output = io.output_handle();
        let mut state = State::with_io(Box::new(io));

        state.registers.write(R0, 0x3010);
        state.memory.write(0x3010, u16::from_le_bytes([b'H', b'i']));
        state.memory.write(0x3011, u16::from(b'!')); // odd-length tail: high byte is 0
        state.memory.write(0x3012, 0);
        state.memory.write(0x3000, 0xF024); // TRAP x24 (PUTSP)
        state.memory.write(0x3001, 0xF025); // TRAP x25 (HALT)

        let state = run_to_halt(state);

        assert_eq!(&output.borrow()[..], b"Hi!HALT\n");
    }

    #[test]
    fn getc_stores_byte_without_echo() {
        let io = BufferedIo::with_input(&[b'Q']);
        let output = io.output_handle();
        let mut state = State::with_io(Box::new(io));
        state.memory.write(0x3000, 0xF020); // TRAP x20 (GETC)

        let state = state.step().unwrap();

        assert_eq!(state.registers.read(R0), u16::from(b'Q'));
        assert!(output.borrow().is_empty());
    }

    #[test]
    fn in_trap_prompts_and_echoes() {
        let io = BufferedIo::with_input(&[b'Q']);
        let output = io.output_handle();
        let mut state = State::with_io(Box::new(io));
        state.memory.write(0x3000, 0xF023); // TRAP x23 (IN)

        let state = state.step().unwrap();

        assert_eq!(state.registers.read(R0), u16::from(b'Q'));
        assert_eq!(&output.borrow()[..], b"Enter a character: Q");
    }

    #[test]
    fn unrecognized_trap_vector_is_a_no_op() {
        let mut state = State::new();
        state.registers.write(R0, 0x1234);
        state.registers.write(R7, 0x5678);
        state.memory.write(0x3000, 0xF0AB); // trapvect8 0xAB is undefined
        let state = state.step().unwrap();

        assert!(state.running);
        assert_eq!(state.registers.read(R0), 0x1234);
        assert_eq!(state.registers.read(R7), 0x5678); // no register write, not even R7
        assert_eq!(state.pc, 0x3001);
    }

    #[test]
    fn rti_and_res_are_no_ops() {
        let mut state = State::new();
        state.memory.write(0x3000, 0x8000); // RTI
        state.memory.write(0x3001, 0xD000); // RES
        let state = state.step().unwrap();
        assert_eq!(state.pc, 0x3001);
        let state = state.step().unwrap();
        assert_eq!(state.pc, 0x3002);
    }

    #[test]
    fn not_not_restores_the_original_value() {
        let mut state = State::new();
        state.registers.write(R1, 0x00FF);
        state.memory.write(0x3000, 0b1001_010_001_111111); // NOT R2, R1
        state.memory.write(0x3001, 0b1001_011_010_111111); // NOT R3, R2
        let state = state.step().unwrap();
        let state = state.step().unwrap();

        assert_eq!(state.registers.read(R3), 0x00FF);
    }

    #[test]
    fn add_self_plus_zero_leaves_value_unchanged_but_updates_flags() {
        let mut state = State::new();
        state.registers.write(R1, 0x8000);
        state.condition = Condition::P;
        state.memory.write(0x3000, 0b0001_001_001_1_00000); // ADD R1, R1, #0
        let state = state.step().unwrap();

        assert_eq!(state.registers.read(R1), 0x8000);
        assert_eq!(state.condition, Condition::N);
    }

    #[test]
    fn and_self_with_zero_zeroes_the_register() {
        let mut state = State::new();
        state.registers.write(R1, 0xBEEF);
        state.memory.write(0x3000, 0b0101_001_001_1_00000); // AND R1, R1, #0
        let state = state.step().unwrap();

        assert_eq!(state.registers.read(R1), 0);
        assert_eq!(state.condition, Condition::Z);
    }

    #[test]
    fn lea_zero_offset_yields_the_address_of_the_next_instruction() {
        let mut state = State::new();
        state.memory.write(0x3000, 0b1110_001_000000000); // LEA R1, #0
        let state = state.step().unwrap();

        assert_eq!(state.registers.read(R1), 0x3001);
    }

    #[test]
    fn ld_and_st_round_trip_through_memory_without_touching_flags_on_store() {
        let mut state = State::new();
        state.registers.write(R1, 0x1234);
        state.memory.write(0x3000, 0b0011_001_000000010); // ST R1, #2
        state.condition = Condition::N;
        let state = state.step().unwrap();
        assert_eq!(state.condition, Condition::N); // ST never touches COND

        let mut state = state;
        state.memory.write(0x3001, 0b0010_010_000000001); // LD R2, #1
        let state = state.step().unwrap();

        assert_eq!(state.registers.read(R2), 0x1234);
        assert_eq!(state.condition, Condition::P);
    }

    #[test]
    fn ldr_and_str_use_base_plus_offset() {
        let mut state = State::new();
        state.registers.write(R1, 0x4000);
        state.registers.write(R2, 0xABCD);
        state.memory.write(0x3000, 0b0111_010_001_000011); // STR R2, R1, #3
        let state = state.step().unwrap();

        let mut state = state;
        state.memory.write(0x3001, 0b0110_011_001_000011); // LDR R3, R1, #3
        let mut state = state.step().unwrap();

        assert_eq!(state.memory.read(0x4003), 0xABCD);
        assert_eq!(state.registers.read(R3), 0xABCD);
    }

    #[test]
    fn jmp_sets_pc_to_base_register() {
        let mut state = State::new();
        state.registers.write(R4, 0x5000);
        state.memory.write(0x3000, 0b1100_000_100_000000); // JMP R4
        let state = state.step().unwrap();

        assert_eq!(state.pc, 0x5000);
    }
}
