//! Instruction behaviour tests for the 6510.

use emu_core::{Cpu, SimpleBus};
use mos_6510::{CpuError, CpuState, Mos6510, flags};

/// Load a program at $0200 and set PC there.
fn setup_program(bus: &mut SimpleBus, cpu: &mut Mos6510, program: &[u8]) {
    bus.load(0x0200, program);
    cpu.regs.pc = 0x0200;
}

/// Run `count` instructions, panicking on any CPU error.
fn run(cpu: &mut Mos6510, bus: &mut SimpleBus, count: usize) -> u32 {
    (0..count)
        .map(|_| cpu.step(bus).expect("instruction should execute"))
        .sum()
}

#[test]
fn test_adc_wraps_to_zero_with_carry() {
    let mut bus = SimpleBus::new();
    let mut cpu = Mos6510::new();

    // CLC; LDA #$FF; ADC #$01
    setup_program(&mut bus, &mut cpu, &[0x18, 0xA9, 0xFF, 0x69, 0x01]);
    run(&mut cpu, &mut bus, 3);

    assert_eq!(cpu.regs.a, 0x00);
    assert!(cpu.regs.p.is_set(flags::C));
    assert!(cpu.regs.p.is_set(flags::Z));
    assert!(!cpu.regs.p.is_set(flags::N));
    assert!(!cpu.regs.p.is_set(flags::V));
}

#[test]
fn test_adc_signed_overflow() {
    let mut bus = SimpleBus::new();
    let mut cpu = Mos6510::new();

    // CLC; LDA #$7F; ADC #$01
    setup_program(&mut bus, &mut cpu, &[0x18, 0xA9, 0x7F, 0x69, 0x01]);
    run(&mut cpu, &mut bus, 3);

    assert_eq!(cpu.regs.a, 0x80);
    assert!(cpu.regs.p.is_set(flags::V));
    assert!(cpu.regs.p.is_set(flags::N));
    assert!(!cpu.regs.p.is_set(flags::C));
}

#[test]
fn test_decimal_sbc_borrows_across_zero() {
    let mut bus = SimpleBus::new();
    let mut cpu = Mos6510::new();

    // SED; SEC; LDA #$00; SBC #$01
    setup_program(&mut bus, &mut cpu, &[0xF8, 0x38, 0xA9, 0x00, 0xE9, 0x01]);
    run(&mut cpu, &mut bus, 4);

    assert_eq!(cpu.regs.a, 0x99);
    assert!(!cpu.regs.p.is_set(flags::C), "borrow should clear carry");
}

#[test]
fn test_decimal_adc_carries() {
    let mut bus = SimpleBus::new();
    let mut cpu = Mos6510::new();

    // SED; CLC; LDA #$58; ADC #$46
    setup_program(&mut bus, &mut cpu, &[0xF8, 0x18, 0xA9, 0x58, 0x69, 0x46]);
    run(&mut cpu, &mut bus, 4);

    assert_eq!(cpu.regs.a, 0x04);
    assert!(cpu.regs.p.is_set(flags::C));
}

#[test]
fn test_stack_pha_pla() {
    let mut bus = SimpleBus::new();
    let mut cpu = Mos6510::new();

    let program = [
        0xA9, 0x42, // LDA #$42
        0xA2, 0xFF, // LDX #$FF
        0x9A, // TXS
        0x48, // PHA
        0xA9, 0x00, // LDA #$00
        0x68, // PLA
    ];
    setup_program(&mut bus, &mut cpu, &program);
    run(&mut cpu, &mut bus, 6);

    assert_eq!(cpu.regs.a, 0x42, "PLA should restore A");
    assert_eq!(cpu.regs.s, 0xFF, "SP should be back to $FF after PLA");
    assert_eq!(bus.peek(0x01FF), 0x42);
}

#[test]
fn test_stack_php_plp() {
    let mut bus = SimpleBus::new();
    let mut cpu = Mos6510::new();

    let program = [
        0xA2, 0xFF, // LDX #$FF
        0x9A, // TXS
        0x38, // SEC
        0x08, // PHP
        0x18, // CLC
        0x28, // PLP
    ];
    setup_program(&mut bus, &mut cpu, &program);
    run(&mut cpu, &mut bus, 6);

    assert!(cpu.regs.p.is_set(flags::C), "PLP should restore carry flag");
    assert!(!cpu.regs.p.is_set(flags::B), "B never lives in P");
    assert_eq!(bus.peek(0x01FF) & flags::B, flags::B, "PHP pushes B set");
    assert_eq!(cpu.regs.s, 0xFF);
}

#[test]
fn test_stack_pointer_wraps() {
    let mut bus = SimpleBus::new();
    let mut cpu = Mos6510::new();

    // LDX #$00; TXS; LDA #$AB; PHA
    setup_program(&mut bus, &mut cpu, &[0xA2, 0x00, 0x9A, 0xA9, 0xAB, 0x48]);
    run(&mut cpu, &mut bus, 4);

    assert_eq!(bus.peek(0x0100), 0xAB);
    assert_eq!(cpu.regs.s, 0xFF);
}

#[test]
fn test_jsr_rts() {
    let mut bus = SimpleBus::new();
    let mut cpu = Mos6510::new();

    // $0200: JSR $0300; LDX #$01
    // $0300: LDA #$55; RTS
    setup_program(&mut bus, &mut cpu, &[0x20, 0x00, 0x03, 0xA2, 0x01]);
    bus.load(0x0300, &[0xA9, 0x55, 0x60]);

    let cycles = run(&mut cpu, &mut bus, 4);

    assert_eq!(cpu.regs.a, 0x55);
    assert_eq!(cpu.regs.x, 0x01);
    assert_eq!(cpu.regs.pc, 0x0205);
    assert_eq!(cycles, 6 + 2 + 6 + 2);
}

#[test]
fn test_jmp_indirect_page_bug() {
    let mut bus = SimpleBus::new();
    let mut cpu = Mos6510::new();

    // JMP ($02FF): low byte from $02FF, high byte from $0200 (not $0300).
    setup_program(&mut bus, &mut cpu, &[0x6C, 0xFF, 0x02]);
    bus.load(0x02FF, &[0x34]);
    bus.load(0x0300, &[0x99]);

    assert_eq!(cpu.step(&mut bus), Ok(5));
    // $0200 holds the JMP opcode itself.
    assert_eq!(cpu.regs.pc, 0x6C34);
}

#[test]
fn test_brk_stack_layout() {
    let mut bus = SimpleBus::new();
    let mut cpu = Mos6510::new();

    bus.load(0xFFFE, &[0x00, 0x03]);
    setup_program(&mut bus, &mut cpu, &[0x00, 0xEA]); // BRK + padding

    assert_eq!(cpu.step(&mut bus), Ok(7));
    assert_eq!(cpu.regs.pc, 0x0300);
    assert_eq!(cpu.state(), CpuState::ServicingInterrupt);
    assert!(cpu.regs.p.is_set(flags::I));

    // Return address skips the padding byte.
    assert_eq!(bus.peek(0x01FD), 0x02);
    assert_eq!(bus.peek(0x01FC), 0x02);
    assert_eq!(bus.peek(0x01FB) & flags::B, flags::B);
}

#[test]
fn test_brk_then_rti_resumes_after_padding() {
    let mut bus = SimpleBus::new();
    let mut cpu = Mos6510::new();

    bus.load(0xFFFE, &[0x00, 0x03]);
    bus.load(0x0300, &[0x40]); // RTI
    setup_program(&mut bus, &mut cpu, &[0x00, 0xEA, 0xE8]); // BRK; pad; INX

    run(&mut cpu, &mut bus, 3);

    assert_eq!(cpu.regs.x, 1);
    assert_eq!(cpu.state(), CpuState::Running);
    assert_eq!(cpu.regs.s, 0xFD);
}

#[test]
fn test_irq_entry_and_return() {
    let mut bus = SimpleBus::new();
    let mut cpu = Mos6510::new();

    bus.load(0xFFFE, &[0x00, 0x04]);
    bus.load(0x0400, &[0xA9, 0x77, 0x40]); // LDA #$77; RTI
    setup_program(&mut bus, &mut cpu, &[0x58, 0xEA, 0xEA]); // CLI; NOP; NOP

    run(&mut cpu, &mut bus, 1);
    cpu.set_irq(true);

    assert_eq!(cpu.step(&mut bus), Ok(7));
    assert_eq!(cpu.regs.pc, 0x0400);
    assert_eq!(bus.peek(0x01FB) & flags::B, 0, "IRQ pushes B clear");

    // Handler acknowledges the source before returning.
    run(&mut cpu, &mut bus, 1);
    cpu.set_irq(false);
    run(&mut cpu, &mut bus, 1);

    assert_eq!(cpu.regs.pc, 0x0201);
    assert_eq!(cpu.regs.a, 0x77);
    assert!(!cpu.regs.p.is_set(flags::I), "RTI restores I");
    assert_eq!(cpu.state(), CpuState::Running);
}

#[test]
fn test_nmi_nested_inside_irq() {
    let mut bus = SimpleBus::new();
    let mut cpu = Mos6510::new();

    bus.load(0xFFFE, &[0x00, 0x04]);
    bus.load(0xFFFA, &[0x00, 0x05]);
    bus.load(0x0400, &[0xEA, 0x40]); // NOP; RTI
    bus.load(0x0500, &[0x40]); // RTI
    setup_program(&mut bus, &mut cpu, &[0x58, 0xEA]);

    run(&mut cpu, &mut bus, 1);
    cpu.set_irq(true);
    run(&mut cpu, &mut bus, 1);
    cpu.set_irq(false);
    assert_eq!(cpu.regs.pc, 0x0400);

    cpu.nmi();
    run(&mut cpu, &mut bus, 1);
    assert_eq!(cpu.regs.pc, 0x0500);

    // Leaving the NMI handler still leaves the IRQ handler active.
    run(&mut cpu, &mut bus, 1);
    assert_eq!(cpu.regs.pc, 0x0400);
    assert_eq!(cpu.state(), CpuState::ServicingInterrupt);

    run(&mut cpu, &mut bus, 2);
    assert_eq!(cpu.regs.pc, 0x0201);
    assert_eq!(cpu.state(), CpuState::Running);
}

#[test]
fn test_illegal_opcode_halts() {
    let mut bus = SimpleBus::new();
    let mut cpu = Mos6510::new();

    // LDA #$10; <illegal $FF>
    setup_program(&mut bus, &mut cpu, &[0xA9, 0x10, 0xFF]);

    run(&mut cpu, &mut bus, 1);
    let err = cpu.step(&mut bus).expect_err("illegal opcode");

    assert_eq!(
        err,
        CpuError::IllegalOpcode {
            opcode: 0xFF,
            address: 0x0202
        }
    );
    assert!(cpu.is_halted());
    assert_eq!(cpu.regs.a, 0x10);
    assert_eq!(cpu.pc(), 0x0202);
    assert!(matches!(cpu.step(&mut bus), Err(CpuError::Halted { .. })));
}

#[test]
fn test_read_modify_write_memory() {
    let mut bus = SimpleBus::new();
    let mut cpu = Mos6510::new();

    bus.load(0x0010, &[0x81]);
    // ASL $10; ROR $10; INC $10; DEC $10
    setup_program(&mut bus, &mut cpu, &[0x06, 0x10, 0x66, 0x10, 0xE6, 0x10]);

    run(&mut cpu, &mut bus, 1);
    assert_eq!(bus.peek(0x0010), 0x02);
    assert!(cpu.regs.p.is_set(flags::C));

    run(&mut cpu, &mut bus, 1);
    assert_eq!(bus.peek(0x0010), 0x81);
    assert!(!cpu.regs.p.is_set(flags::C));
    assert!(cpu.regs.p.is_set(flags::N));

    run(&mut cpu, &mut bus, 1);
    assert_eq!(bus.peek(0x0010), 0x82);
}

#[test]
fn test_indirect_indexed_load() {
    let mut bus = SimpleBus::new();
    let mut cpu = Mos6510::new();

    bus.load(0x0040, &[0x00, 0x30]); // pointer -> $3000
    bus.load(0x3005, &[0x9C]);
    // LDY #$05; LDA ($40),Y
    setup_program(&mut bus, &mut cpu, &[0xA0, 0x05, 0xB1, 0x40]);
    run(&mut cpu, &mut bus, 2);

    assert_eq!(cpu.regs.a, 0x9C);
    assert!(cpu.regs.p.is_set(flags::N));
}

#[test]
fn test_compare_and_branch_loop() {
    let mut bus = SimpleBus::new();
    let mut cpu = Mos6510::new();

    let program = [
        0xA2, 0x00, // LDX #$00
        0xE8, // loop: INX
        0xE0, 0x05, // CPX #$05
        0xD0, 0xFB, // BNE loop
        0x00, // BRK (never reached in this test)
    ];
    setup_program(&mut bus, &mut cpu, &program);

    // 1 + 5 * 3 instructions
    run(&mut cpu, &mut bus, 16);
    assert_eq!(cpu.regs.x, 5);
    assert!(cpu.regs.p.is_set(flags::Z));
    assert!(cpu.regs.p.is_set(flags::C));
    assert_eq!(cpu.regs.pc, 0x0207);
}

#[test]
fn test_bit_sets_flags_from_memory() {
    let mut bus = SimpleBus::new();
    let mut cpu = Mos6510::new();

    bus.load(0x0020, &[0xC0]);
    // LDA #$01; BIT $20
    setup_program(&mut bus, &mut cpu, &[0xA9, 0x01, 0x24, 0x20]);
    run(&mut cpu, &mut bus, 2);

    assert!(cpu.regs.p.is_set(flags::Z));
    assert!(cpu.regs.p.is_set(flags::N));
    assert!(cpu.regs.p.is_set(flags::V));
    assert_eq!(cpu.regs.a, 0x01);
}
