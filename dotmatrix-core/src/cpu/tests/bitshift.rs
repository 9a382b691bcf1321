use super::{hash_map, run_test, ExpectedState};

#[test]
fn rotate_left_accumulator() {
    // Z is forced to 0 by the accumulator rotate opcodes
    run_test(
        // LD A, 0x85; RLCA
        "3E8507",
        &ExpectedState { a: Some(0x0B), f: Some(0x10), ..ExpectedState::empty() },
    );

    run_test(
        // LD A, 0x80; RLCA
        "3E8007",
        &ExpectedState { a: Some(0x01), f: Some(0x10), ..ExpectedState::empty() },
    );

    run_test(
        // LD A, 0x00; RLCA
        "3E0007",
        &ExpectedState { a: Some(0x00), f: Some(0x00), ..ExpectedState::empty() },
    );
}

#[test]
fn rotate_left_accumulator_thru_carry() {
    run_test(
        // LD A, 0x55; SCF; RLA
        "3E553717",
        &ExpectedState { a: Some(0xAB), f: Some(0x00), ..ExpectedState::empty() },
    );

    run_test(
        // LD A, 0x85; RLA
        "3E8517",
        &ExpectedState { a: Some(0x0A), f: Some(0x10), ..ExpectedState::empty() },
    );
}

#[test]
fn rotate_right_accumulator() {
    run_test(
        // LD A, 0x01; RRCA
        "3E010F",
        &ExpectedState { a: Some(0x80), f: Some(0x10), ..ExpectedState::empty() },
    );

    run_test(
        // LD A, 0x3A; RRCA
        "3E3A0F",
        &ExpectedState { a: Some(0x1D), f: Some(0x00), ..ExpectedState::empty() },
    );
}

#[test]
fn rotate_right_accumulator_thru_carry() {
    run_test(
        // LD A, 0x01; RRA
        "3E011F",
        &ExpectedState { a: Some(0x00), f: Some(0x10), ..ExpectedState::empty() },
    );

    run_test(
        // LD A, 0x02; SCF; RRA
        "3E02371F",
        &ExpectedState { a: Some(0x81), f: Some(0x00), ..ExpectedState::empty() },
    );
}

#[test]
fn rotate_left_register() {
    // RLC B
    run_test(
        // LD B, 0x85; RLC B
        "0685CB00",
        &ExpectedState { b: Some(0x0B), f: Some(0x10), ..ExpectedState::empty() },
    );

    // Unlike RLCA, the CB-prefixed rotates set Z on a zero result
    run_test(
        // LD B, 0x00; RLC B
        "0600CB00",
        &ExpectedState { b: Some(0x00), f: Some(0x80), ..ExpectedState::empty() },
    );

    // RL B
    run_test(
        // LD B, 0x80; RL B
        "0680CB10",
        &ExpectedState { b: Some(0x00), f: Some(0x90), ..ExpectedState::empty() },
    );

    run_test(
        // LD B, 0x11; SCF; RL B
        "061137CB10",
        &ExpectedState { b: Some(0x23), f: Some(0x00), ..ExpectedState::empty() },
    );
}

#[test]
fn rotate_right_register() {
    // RRC C
    run_test(
        // LD C, 0x01; RRC C
        "0E01CB09",
        &ExpectedState { c: Some(0x80), f: Some(0x10), ..ExpectedState::empty() },
    );

    // RR C
    run_test(
        // LD C, 0x01; RR C
        "0E01CB19",
        &ExpectedState { c: Some(0x00), f: Some(0x90), ..ExpectedState::empty() },
    );

    run_test(
        // LD C, 0x8A; RR C
        "0E8ACB19",
        &ExpectedState { c: Some(0x45), f: Some(0x00), ..ExpectedState::empty() },
    );
}

#[test]
fn shift_left_arithmetic() {
    run_test(
        // LD D, 0xFF; SLA D
        "16FFCB22",
        &ExpectedState { d: Some(0xFE), f: Some(0x10), ..ExpectedState::empty() },
    );

    run_test(
        // LD D, 0x80; SLA D
        "1680CB22",
        &ExpectedState { d: Some(0x00), f: Some(0x90), ..ExpectedState::empty() },
    );
}

#[test]
fn shift_right_arithmetic() {
    // SRA keeps bit 7
    run_test(
        // LD E, 0x81; SRA E
        "1E81CB2B",
        &ExpectedState { e: Some(0xC0), f: Some(0x10), ..ExpectedState::empty() },
    );

    run_test(
        // LD E, 0x01; SRA E
        "1E01CB2B",
        &ExpectedState { e: Some(0x00), f: Some(0x90), ..ExpectedState::empty() },
    );
}

#[test]
fn shift_right_logical() {
    run_test(
        // LD H, 0x81; SRL H
        "2681CB3C",
        &ExpectedState { h: Some(0x40), f: Some(0x10), ..ExpectedState::empty() },
    );

    run_test(
        // LD H, 0xFF; SRL H
        "26FFCB3C",
        &ExpectedState { h: Some(0x7F), f: Some(0x10), ..ExpectedState::empty() },
    );
}

#[test]
fn swap_nibbles() {
    run_test(
        // LD L, 0xF1; SWAP L
        "2EF1CB35",
        &ExpectedState { l: Some(0x1F), f: Some(0x00), ..ExpectedState::empty() },
    );

    run_test(
        // LD L, 0x00; SWAP L
        "2E00CB35",
        &ExpectedState { l: Some(0x00), f: Some(0x80), ..ExpectedState::empty() },
    );
}

#[test]
fn shifts_indirect_hl() {
    // RLC (HL)
    run_test(
        // LD HL, 0xCDA4; LD (HL), 0x85; RLC (HL)
        "21A4CD3685CB06",
        &ExpectedState {
            f: Some(0x10),
            memory: hash_map! { 0xCDA4: 0x0B },
            ..ExpectedState::empty()
        },
    );

    // SRL (HL)
    run_test(
        // LD HL, 0xCDA4; LD (HL), 0x01; SRL (HL)
        "21A4CD3601CB3E",
        &ExpectedState {
            f: Some(0x90),
            memory: hash_map! { 0xCDA4: 0x00 },
            ..ExpectedState::empty()
        },
    );

    // SWAP (HL)
    run_test(
        // LD HL, 0xCDA4; LD (HL), 0xB7; SWAP (HL)
        "21A4CD36B7CB36",
        &ExpectedState {
            f: Some(0x00),
            memory: hash_map! { 0xCDA4: 0x7B },
            ..ExpectedState::empty()
        },
    );
}
