//! Whole-system tests: programs poking real registers through the bus.

use emu_core::Value;
use emu_sid::{
    EmulationClock, EmulationError, MemorySink, Player, RegisterPolicy, SessionConfig, Vector,
    WavSink,
};
use format_psid::PsidFile;
use mos_6510::CpuError;

fn clock_with(config: SessionConfig) -> EmulationClock {
    EmulationClock::new(config).expect("valid config")
}

fn run_program(clock: &mut EmulationClock<impl emu_sid::AudioSink>, program: &[u8]) {
    clock.load(program, 0x1000).expect("program fits");
    clock.set_entry(0x1000);
}

/// Voice 1 at `freq`, attack 0, sustain 15, volume 15, triangle + gate,
/// then spin.
fn triangle_program(freq: u16) -> Vec<u8> {
    let [lo, hi] = freq.to_le_bytes();
    let mut program = vec![
        0xA9, lo, 0x8D, 0x00, 0xD4, // LDA #lo ; STA $D400
        0xA9, hi, 0x8D, 0x01, 0xD4, // LDA #hi ; STA $D401
        0xA9, 0x00, 0x8D, 0x05, 0xD4, // LDA #$00 ; STA $D405
        0xA9, 0xF0, 0x8D, 0x06, 0xD4, // LDA #$F0 ; STA $D406
        0xA9, 0x0F, 0x8D, 0x18, 0xD4, // LDA #$0F ; STA $D418
        0xA9, 0x11, 0x8D, 0x04, 0xD4, // LDA #$11 ; STA $D404
    ];
    let spin = 0x1000 + program.len() as u16;
    let [lo, hi] = spin.to_le_bytes();
    program.extend_from_slice(&[0x4C, lo, hi]);
    program
}

#[test]
fn gated_triangle_produces_audio_after_gate_on() {
    let mut clock = clock_with(SessionConfig::default());
    run_program(&mut clock, &triangle_program(0x1000));
    clock.run_cycles(50_000).expect("runs");

    let events = clock.finish_events();
    let gate_frame = usize::try_from(events[0][0].start_frame).expect("frame fits");
    let samples = clock.into_sink().expect("flush").into_samples();
    assert!(!samples.is_empty());
    assert!(samples.iter().any(|&s| s != 0));

    let first_sound = samples.iter().position(|&s| s != 0).expect("audible");
    assert!(first_sound >= gate_frame);

    // Attack rate 0 is 2 ms; nothing reaches full level before that.
    let attack_samples = (0.002 * 44_100.0) as usize;
    let peak = samples
        .iter()
        .map(|&s| i32::from(s).abs())
        .max()
        .expect("non-empty");
    let first_peak = samples
        .iter()
        .position(|&s| i32::from(s).abs() == peak)
        .expect("peak exists");
    assert!(
        first_peak + 1 >= gate_frame + attack_samples,
        "peak at {first_peak}, gate at {gate_frame}"
    );
}

#[test]
fn silent_without_volume() {
    let mut program = triangle_program(0x1000);
    // Replace LDA #$0F before STA $D418 with LDA #$00.
    program[21] = 0x00;
    let mut clock = clock_with(SessionConfig::default());
    run_program(&mut clock, &program);
    clock.run_cycles(20_000).expect("runs");
    let samples = clock.into_sink().expect("flush").into_samples();
    assert!(!samples.is_empty());
    assert!(samples.iter().all(|&s| s == 0));
}

#[test]
fn timer_a_underflow_vectors_through_irq() {
    let mut clock = clock_with(SessionConfig::default());
    run_program(
        &mut clock,
        &[
            0xA9, 0x10, 0x8D, 0x04, 0xDC, // LDA #$10 ; STA $DC04
            0xA9, 0x00, 0x8D, 0x05, 0xDC, // LDA #$00 ; STA $DC05
            0xA9, 0x81, 0x8D, 0x0D, 0xDC, // LDA #$81 ; STA $DC0D
            0xA9, 0x11, 0x8D, 0x0E, 0xDC, // LDA #$11 ; STA $DC0E
            0x58, // CLI
            0x4C, 0x15, 0x10, // JMP $1015
        ],
    );
    // Handler: LDA $DC0D ; INC $0400 ; RTI
    clock
        .load(&[0xAD, 0x0D, 0xDC, 0xEE, 0x00, 0x04, 0x40], 0x2000)
        .expect("handler fits");
    clock.set_vector(Vector::Irq, 0x2000);

    let mut underflowed = false;
    for _ in 0..100 {
        clock.step().expect("step");
        if clock.bus().cia.icr_status() & 0x01 != 0 {
            underflowed = true;
            break;
        }
    }
    assert!(underflowed, "timer A never underflowed");
    assert_eq!(clock.query("cia.irq"), Some(Value::Bool(true)));

    assert_eq!(clock.step().expect("interrupt entry"), 7);
    assert_eq!(clock.cpu().regs.pc, 0x2000);

    clock.run_cycles(17 * 10).expect("runs");
    assert!(clock.bus().peek(0x0400) >= 5);
}

#[test]
fn illegal_opcode_stops_run_for() {
    let mut clock = clock_with(SessionConfig::default());
    // LDX #$FF ; DEX ; BNE -3 ; KIL
    run_program(&mut clock, &[0xA2, 0xFF, 0xCA, 0xD0, 0xFD, 0x02]);

    let err = clock.run_for(10_000).expect_err("halts");
    assert!(matches!(
        err,
        EmulationError::Cpu(CpuError::IllegalOpcode {
            opcode: 0x02,
            address: 0x1005
        })
    ));
    assert!(clock.is_halted());
    let frames = clock.frames();
    assert!((50..70).contains(&frames), "{frames} frames before halt");
    assert!(matches!(
        clock.step(),
        Err(EmulationError::Cpu(CpuError::Halted { .. }))
    ));
}

#[test]
fn fail_policy_surfaces_unmapped_sid_access() {
    let mut clock = clock_with(SessionConfig {
        register_policy: RegisterPolicy::Fail,
        ..SessionConfig::default()
    });
    // STA $D41D ; NOP
    run_program(&mut clock, &[0x8D, 0x1D, 0xD4, 0xEA]);
    assert!(matches!(
        clock.step(),
        Err(EmulationError::UnsupportedRegister { address: 0xD41D })
    ));
    assert!(!clock.is_halted());
    assert_eq!(clock.cpu().regs.pc, 0x1003);
    assert_eq!(clock.step().expect("nop"), 2);
}

#[test]
fn load_past_top_of_memory_is_rejected() {
    let mut clock = clock_with(SessionConfig::default());
    assert!(matches!(
        clock.load(&[0; 4], 0xFFFE),
        Err(EmulationError::AddressOutOfRange {
            address: 0xFFFE,
            len: 4
        })
    ));
}

#[test]
fn config_sample_rate_sets_frame_pacing() {
    let config =
        SessionConfig::from_toml_str("sample_rate = 22050\nbuffer_capacity = 100\n").expect("toml");
    let mut clock = clock_with(config);
    run_program(&mut clock, &[0x4C, 0x00, 0x10]);
    clock.run_cycles(985_248).expect("runs");
    let frames = clock.frames();
    assert!((22_049..=22_051).contains(&frames), "{frames}");
    assert_eq!(clock.sink().samples().len() % 100, 0);
}

fn psid(init: u16, play: u16, code: &[u8]) -> PsidFile {
    let mut data = vec![0u8; format_psid::V2_HEADER_SIZE];
    data[0..4].copy_from_slice(b"PSID");
    data[0x04..0x06].copy_from_slice(&2u16.to_be_bytes());
    data[0x06..0x08].copy_from_slice(&0x7Cu16.to_be_bytes());
    data[0x08..0x0A].copy_from_slice(&0x1000u16.to_be_bytes());
    data[0x0A..0x0C].copy_from_slice(&init.to_be_bytes());
    data[0x0C..0x0E].copy_from_slice(&play.to_be_bytes());
    data[0x0E..0x10].copy_from_slice(&3u16.to_be_bytes());
    data[0x10..0x12].copy_from_slice(&2u16.to_be_bytes());
    data[0x16..0x1C].copy_from_slice(b"Test A");
    data.extend_from_slice(code);
    PsidFile::parse(&data).expect("valid PSID")
}

/// Init stores A at $0401 and starts concert A on voice 1. Play counts
/// calls in $0400 and releases the gate on the 25th.
fn concert_a_tune() -> PsidFile {
    let code = [
        0x8D, 0x01, 0x04, // $1000 STA $0401
        0xA9, 0x45, 0x8D, 0x00, 0xD4, // $1003 LDA #$45 ; STA $D400
        0xA9, 0x1D, 0x8D, 0x01, 0xD4, // $1008 LDA #$1D ; STA $D401
        0xA9, 0xF0, 0x8D, 0x06, 0xD4, // $100D LDA #$F0 ; STA $D406
        0xA9, 0x0F, 0x8D, 0x18, 0xD4, // $1012 LDA #$0F ; STA $D418
        0xA9, 0x11, 0x8D, 0x04, 0xD4, // $1017 LDA #$11 ; STA $D404
        0x60, // $101C RTS
        0xEE, 0x00, 0x04, // $101D INC $0400
        0xAD, 0x00, 0x04, // $1020 LDA $0400
        0xC9, 0x19, // $1023 CMP #$19
        0xD0, 0x05, // $1025 BNE $102C
        0xA9, 0x10, 0x8D, 0x04, 0xD4, // $1027 LDA #$10 ; STA $D404
        0x60, // $102C RTS
    ];
    psid(0x1000, 0x101D, &code)
}

#[test]
fn player_runs_init_and_play_and_exports_events() {
    let tune = concert_a_tune();
    let clock = clock_with(SessionConfig::default());
    let mut player = Player::new(clock, &tune, None).expect("init");
    assert_eq!(player.song(), 2);
    assert_eq!(player.clock().bus().peek(0x0401), 1);

    let frames = player.render_seconds(1.0).expect("plays");
    assert!(frames >= 50);
    assert_eq!(u64::from(player.clock().bus().peek(0x0400)), frames);
    assert_eq!(player.clock().cpu().regs.pc, 0xFFF0);

    let events = player.clock_mut().finish_events();
    assert_eq!(events[0].len(), 1);
    assert!(events[1].is_empty() && events[2].is_empty());

    let json = serde_json::to_value(&events).expect("serialise");
    let note = &json[0][0];
    assert_eq!(note["tone"], 69);
    assert_eq!(note["waveform"], "triangle");
    assert_eq!(note["release"], 0);
    let sustain = note["sustain_length"].as_u64().expect("number");
    assert!((20_500..22_000).contains(&sustain), "{sustain}");
}

#[test]
fn player_renders_to_wav() {
    let path =
        std::env::temp_dir().join(format!("emu-sid-e2e-{}.wav", std::process::id()));
    let config = SessionConfig::default();
    let sink = WavSink::create(&path, config.sample_rate).expect("create");
    let clock = EmulationClock::with_sink(config, sink).expect("valid config");
    let mut player = Player::new(clock, &concert_a_tune(), Some(1)).expect("init");
    assert_eq!(player.song(), 1);
    player.render_seconds(0.2).expect("plays");
    let clock = player.clock_mut();
    clock.finish().expect("finalize");
    let frames = clock.frames();

    let reader = hound::WavReader::open(&path).expect("open");
    assert_eq!(u64::from(reader.len()), frames);
    assert_eq!(reader.spec().bits_per_sample, 16);
    let _ = std::fs::remove_file(&path);
}

#[test]
fn memory_sink_matches_frame_count() {
    let mut clock: EmulationClock<MemorySink> = clock_with(SessionConfig::default());
    run_program(&mut clock, &triangle_program(0x2000));
    let produced = clock.run_for(5000).expect("runs");
    assert_eq!(produced, 5000);
    assert_eq!(clock.into_sink().expect("flush").samples().len(), 5000);
}
