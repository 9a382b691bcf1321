use super::{hash_map, run_test, set_in_state, ExpectedState, ALL_REGISTERS};

use crate::cpu::registers::CpuRegister;

#[test]
fn add_immediate() {
    run_test(
        // LD A, 0x05; ADD 0xDE
        "3E05C6DE",
        &ExpectedState { a: Some(0xE3), f: Some(0x20), ..ExpectedState::empty() },
    );

    run_test(
        // LD A, 0x01; ADD 0x03
        "3E01C603",
        &ExpectedState { a: Some(0x04), f: Some(0x00), ..ExpectedState::empty() },
    );

    run_test(
        // LD A, 0x55; ADD 0xAB
        "3E55C6AB",
        &ExpectedState { a: Some(0x00), f: Some(0xB0), ..ExpectedState::empty() },
    );

    run_test(
        // LD A, 0xFF; ADD 0x12
        "3EFFC612",
        &ExpectedState { a: Some(0x11), f: Some(0x30), ..ExpectedState::empty() },
    );
}

#[test]
fn add_register() {
    for r in ALL_REGISTERS {
        let load_opcode = 0x06 | (r.to_opcode_bits() << 3);
        let add_opcode = 0x80 | r.to_opcode_bits();

        let (expected_a, expected_f) = match r {
            CpuRegister::A => (0x68, 0x10),
            _ => (0xEA, 0x00),
        };

        run_test(
            // LD A, 0x36; LD <r>, 0xB4; ADD <r>
            &format!("3E36{load_opcode:02x}B4{add_opcode:02x}"),
            &ExpectedState { a: Some(expected_a), f: Some(expected_f), ..ExpectedState::empty() },
        );
    }
}

#[test]
fn add_indirect_hl() {
    run_test(
        // LD HL, 0xCDA4; LD (HL), 0x3B; LD A, 0xA1; ADD (HL)
        "21A4CD363B3EA186",
        &ExpectedState { a: Some(0xDC), f: Some(0x00), ..ExpectedState::empty() },
    );
}

#[test]
fn add_a_a_half_and_full_carry() {
    run_test(
        // LD A, 0x88; ADD A
        "3E8887",
        &ExpectedState { a: Some(0x10), f: Some(0x30), ..ExpectedState::empty() },
    );
}

#[test]
fn adc_immediate() {
    run_test(
        // LD A, 0xBC; ADC 0x15
        "3EBCCE15",
        &ExpectedState { a: Some(0xD1), f: Some(0x20), ..ExpectedState::empty() },
    );

    run_test(
        // LD A, 0xBC; SCF; ADC 0x15
        "3EBC37CE15",
        &ExpectedState { a: Some(0xD2), f: Some(0x20), ..ExpectedState::empty() },
    );

    run_test(
        // LD A, 0xFD; SCF; ADC 0x02
        "3EFD37CE02",
        &ExpectedState { a: Some(0x00), f: Some(0xB0), ..ExpectedState::empty() },
    );
}

#[test]
fn sub_immediate() {
    run_test(
        // LD A, 0x3E; SUB 0x3E
        "3E3ED63E",
        &ExpectedState { a: Some(0x00), f: Some(0xC0), ..ExpectedState::empty() },
    );

    run_test(
        // LD A, 0x3E; SUB 0x0F
        "3E3ED60F",
        &ExpectedState { a: Some(0x2F), f: Some(0x60), ..ExpectedState::empty() },
    );

    run_test(
        // LD A, 0x3E; SUB 0x40
        "3E3ED640",
        &ExpectedState { a: Some(0xFE), f: Some(0x50), ..ExpectedState::empty() },
    );
}

#[test]
fn sub_register() {
    for r in ALL_REGISTERS {
        if r == CpuRegister::A {
            continue;
        }

        let load_opcode = 0x06 | (r.to_opcode_bits() << 3);
        let sub_opcode = 0x90 | r.to_opcode_bits();

        run_test(
            // LD A, 0x3E; LD <r>, 0x0F; SUB <r>
            &format!("3E3E{load_opcode:02x}0F{sub_opcode:02x}"),
            &ExpectedState { a: Some(0x2F), f: Some(0x60), ..ExpectedState::empty() },
        );
    }

    run_test(
        // LD A, 0x3E; SUB A
        "3E3E97",
        &ExpectedState { a: Some(0x00), f: Some(0xC0), ..ExpectedState::empty() },
    );
}

#[test]
fn sbc_immediate() {
    run_test(
        // LD A, 0x3B; SCF; SBC 0x2A
        "3E3B37DE2A",
        &ExpectedState { a: Some(0x10), f: Some(0x40), ..ExpectedState::empty() },
    );

    run_test(
        // LD A, 0x3B; SCF; SBC 0x3A
        "3E3B37DE3A",
        &ExpectedState { a: Some(0x00), f: Some(0xC0), ..ExpectedState::empty() },
    );

    run_test(
        // LD A, 0x3B; SCF; SBC 0x4F
        "3E3B37DE4F",
        &ExpectedState { a: Some(0xEB), f: Some(0x70), ..ExpectedState::empty() },
    );
}

#[test]
fn compare_immediate() {
    run_test(
        // LD A, 0x3C; CP 0x2F
        "3E3CFE2F",
        &ExpectedState { a: Some(0x3C), f: Some(0x60), ..ExpectedState::empty() },
    );

    run_test(
        // LD A, 0x3C; CP 0x3C
        "3E3CFE3C",
        &ExpectedState { a: Some(0x3C), f: Some(0xC0), ..ExpectedState::empty() },
    );

    run_test(
        // LD A, 0x3C; CP 0x40
        "3E3CFE40",
        &ExpectedState { a: Some(0x3C), f: Some(0x50), ..ExpectedState::empty() },
    );
}

#[test]
fn increment_register() {
    for r in ALL_REGISTERS {
        let load_opcode = 0x06 | (r.to_opcode_bits() << 3);
        let inc_opcode = 0x04 | (r.to_opcode_bits() << 3);

        let mut expected_state =
            ExpectedState { f: Some(0xA0), ..ExpectedState::empty() };
        set_in_state(&mut expected_state, r, 0x00);

        run_test(
            // LD <r>, 0xFF; INC <r>
            &format!("{load_opcode:02x}FF{inc_opcode:02x}"),
            &expected_state,
        );
    }

    run_test(
        // LD B, 0x4F; INC B
        "064F04",
        &ExpectedState { b: Some(0x50), f: Some(0x20), ..ExpectedState::empty() },
    );
}

#[test]
fn increment_indirect_hl() {
    run_test(
        // LD HL, 0xCDA4; LD (HL), 0x50; INC (HL)
        "21A4CD365034",
        &ExpectedState {
            f: Some(0x00),
            memory: hash_map! { 0xCDA4: 0x51 },
            ..ExpectedState::empty()
        },
    );
}

#[test]
fn decrement_register() {
    run_test(
        // LD B, 0x01; DEC B
        "060105",
        &ExpectedState { b: Some(0x00), f: Some(0xC0), ..ExpectedState::empty() },
    );

    run_test(
        // LD B, 0x00; DEC B
        "060005",
        &ExpectedState { b: Some(0xFF), f: Some(0x60), ..ExpectedState::empty() },
    );

    // Carry flag is preserved
    run_test(
        // SCF; LD B, 0x10; DEC B
        "37061005",
        &ExpectedState { b: Some(0x0F), f: Some(0x70), ..ExpectedState::empty() },
    );
}

#[test]
fn add_hl_register_pair() {
    run_test(
        // LD HL, 0x1301; LD BC, 0x0FFF; ADD HL, BC
        "21011301FF0F09",
        &ExpectedState {
            h: Some(0x23),
            l: Some(0x00),
            f: Some(0x20),
            ..ExpectedState::empty()
        },
    );

    run_test(
        // LD HL, 0x8FFF; ADD HL, HL
        "21FF8F29",
        &ExpectedState {
            h: Some(0x1F),
            l: Some(0xFE),
            f: Some(0x30),
            ..ExpectedState::empty()
        },
    );

    // Z flag is preserved
    run_test(
        // LD A, 0x00; CP 0x00; LD HL, 0x1234; LD DE, 0x1111; ADD HL, DE
        "3E00FE0021341211111119",
        &ExpectedState {
            h: Some(0x23),
            l: Some(0x45),
            f: Some(0x80),
            ..ExpectedState::empty()
        },
    );
}

#[test]
fn increment_register_pair() {
    run_test(
        // LD BC, 0xFFFF; INC BC
        "01FFFF03",
        &ExpectedState { b: Some(0x00), c: Some(0x00), f: Some(0x00), ..ExpectedState::empty() },
    );

    run_test(
        // LD DE, 0x12FF; INC DE
        "11FF1213",
        &ExpectedState { d: Some(0x13), e: Some(0x00), ..ExpectedState::empty() },
    );
}

#[test]
fn decrement_register_pair() {
    run_test(
        // LD BC, 0x0000; DEC BC
        "0100000B",
        &ExpectedState { b: Some(0xFF), c: Some(0xFF), f: Some(0x00), ..ExpectedState::empty() },
    );

    run_test(
        // LD SP, 0x1000; DEC SP
        "3100103B",
        &ExpectedState { sp: Some(0x0FFF), ..ExpectedState::empty() },
    );
}

#[test]
fn add_sp_immediate() {
    run_test(
        // ADD SP, 0x05
        "E805",
        &ExpectedState { sp: Some(0x0003), f: Some(0x30), ..ExpectedState::empty() },
    );

    run_test(
        // ADD SP, -0x02
        "E8FE",
        &ExpectedState { sp: Some(0xFFFC), f: Some(0x30), ..ExpectedState::empty() },
    );

    run_test(
        // LD SP, 0x1000; ADD SP, 0x05
        "311010E805",
        &ExpectedState { sp: Some(0x1015), f: Some(0x00), ..ExpectedState::empty() },
    );
}

#[test]
fn load_hl_sp_offset() {
    run_test(
        // LDHL SP, -0x04
        "F8FC",
        &ExpectedState {
            h: Some(0xFF),
            l: Some(0xFA),
            sp: Some(0xFFFE),
            f: Some(0x30),
            ..ExpectedState::empty()
        },
    );
}

#[test]
fn decimal_adjust_after_addition() {
    run_test(
        // LD A, 0x15; ADD A; DAA
        "3E158727",
        &ExpectedState { a: Some(0x30), f: Some(0x00), ..ExpectedState::empty() },
    );

    run_test(
        // LD A, 0x45; ADD 0x38; DAA
        "3E45C63827",
        &ExpectedState { a: Some(0x83), f: Some(0x00), ..ExpectedState::empty() },
    );

    run_test(
        // LD A, 0x90; ADD 0x90; DAA
        "3E90C69027",
        &ExpectedState { a: Some(0x80), f: Some(0x10), ..ExpectedState::empty() },
    );

    run_test(
        // LD A, 0x99; ADD 0x01; DAA
        "3E99C60127",
        &ExpectedState { a: Some(0x00), f: Some(0x90), ..ExpectedState::empty() },
    );
}

#[test]
fn decimal_adjust_after_subtraction() {
    run_test(
        // LD A, 0x20; SUB 0x13; DAA
        "3E20D61327",
        &ExpectedState { a: Some(0x07), f: Some(0x40), ..ExpectedState::empty() },
    );

    run_test(
        // LD A, 0x05; SUB 0x05; DAA
        "3E05D60527",
        &ExpectedState { a: Some(0x00), f: Some(0xC0), ..ExpectedState::empty() },
    );
}
