//! Render a PSID tune to WAV and voice-event JSON.

use std::path::PathBuf;
use std::process;

use emu_sid::{
    AudioSink, EmulationClock, EmulationError, NullSink, Player, SessionConfig, WavSink,
};
use format_psid::PsidFile;
use log::info;
use thiserror::Error;

#[derive(Debug, Error)]
enum CliError {
    #[error("cannot read {}: {source}", path.display())]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("cannot write {}: {source}", path.display())]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error(transparent)]
    Emulation(#[from] EmulationError),
}

#[derive(Debug)]
struct CliArgs {
    sid_path: PathBuf,
    song: Option<u16>,
    seconds: f64,
    wav_path: Option<PathBuf>,
    events_path: Option<PathBuf>,
    config_path: Option<PathBuf>,
    queries: Vec<String>,
}

fn print_usage() {
    eprintln!("Usage: sid-render [OPTIONS] <file.sid>");
    eprintln!();
    eprintln!("Options:");
    eprintln!("  --song <n>         Song to play (1-based) [default: tune's start song]");
    eprintln!("  --seconds <s>      Length to render [default: 30]");
    eprintln!("  --wav <file>       Write 16-bit mono WAV");
    eprintln!("  --events <file>    Write per-voice note events as JSON");
    eprintln!("  --config <file>    Session config (TOML)");
    eprintln!("  --query <path>     Print a state value after rendering (repeatable)");
}

/// The value following option `name`.
fn value<'a>(args: &'a [String], i: usize, name: &str) -> Result<&'a str, String> {
    args.get(i)
        .map(String::as_str)
        .ok_or_else(|| format!("{name} needs a value"))
}

/// Parse `args` (program name first). `Ok(None)` means help was asked for.
fn parse_args(args: &[String]) -> Result<Option<CliArgs>, String> {
    let mut sid_path = None;
    let mut cli = CliArgs {
        sid_path: PathBuf::new(),
        song: None,
        seconds: 30.0,
        wav_path: None,
        events_path: None,
        config_path: None,
        queries: Vec::new(),
    };

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--song" => {
                i += 1;
                let s = value(args, i, "--song")?;
                let song = s
                    .parse::<u16>()
                    .ok()
                    .filter(|&n| n > 0)
                    .ok_or_else(|| format!("invalid song number: {s}"))?;
                cli.song = Some(song);
            }
            "--seconds" => {
                i += 1;
                let s = value(args, i, "--seconds")?;
                cli.seconds = s
                    .parse::<f64>()
                    .ok()
                    .filter(|secs| secs.is_finite() && *secs >= 0.0)
                    .ok_or_else(|| format!("invalid length in seconds: {s}"))?;
            }
            "--wav" => {
                i += 1;
                cli.wav_path = Some(PathBuf::from(value(args, i, "--wav")?));
            }
            "--events" => {
                i += 1;
                cli.events_path = Some(PathBuf::from(value(args, i, "--events")?));
            }
            "--config" => {
                i += 1;
                cli.config_path = Some(PathBuf::from(value(args, i, "--config")?));
            }
            "--query" => {
                i += 1;
                cli.queries.push(value(args, i, "--query")?.to_string());
            }
            "--help" | "-h" => return Ok(None),
            other if other.starts_with("--") => {
                return Err(format!("unknown argument: {other}"));
            }
            path => {
                sid_path = Some(PathBuf::from(path));
            }
        }
        i += 1;
    }

    cli.sid_path = sid_path.ok_or("no SID file given (see --help)")?;
    Ok(Some(cli))
}

fn run(cli: &CliArgs) -> Result<(), CliError> {
    let data = std::fs::read(&cli.sid_path).map_err(|source| CliError::Read {
        path: cli.sid_path.clone(),
        source,
    })?;
    let tune = PsidFile::parse(&data).map_err(EmulationError::from)?;

    let config = match cli.config_path {
        Some(ref path) => SessionConfig::load(path).map_err(EmulationError::from)?,
        None => SessionConfig {
            cpu_frequency: tune.header.clock.cpu_frequency(),
            frame_rate: tune.header.clock.frame_rate(),
            ..SessionConfig::default()
        },
    };
    info!(
        "sid-render: {} Hz CPU, {} Hz audio, {:?} register policy",
        config.cpu_frequency, config.sample_rate, config.register_policy
    );

    let sink: Box<dyn AudioSink> = match cli.wav_path {
        Some(ref path) => {
            let wav = WavSink::create(path, config.sample_rate).map_err(EmulationError::from)?;
            Box::new(wav)
        }
        None => Box::new(NullSink),
    };

    let clock = EmulationClock::with_sink(config, sink)?;
    let mut player = Player::new(clock, &tune, cli.song)?;
    let frames = player.render_seconds(cli.seconds)?;

    let clock = player.clock_mut();
    clock.finish()?;
    info!(
        "sid-render: {frames} player frames, {} audio frames, {} cycles",
        clock.frames(),
        clock.cycles()
    );

    if let Some(ref path) = cli.events_path {
        let events = clock.finish_events();
        serde_json::to_string_pretty(&events)
            .map_err(std::io::Error::other)
            .and_then(|json| std::fs::write(path, json))
            .map_err(|source| CliError::Write {
                path: path.clone(),
                source,
            })?;
    }

    for path in &cli.queries {
        match clock.query(path) {
            Some(value) => println!("{path} = {value}"),
            None => println!("{path} = <unknown>"),
        }
    }

    Ok(())
}

fn main() {
    env_logger::init();
    let args: Vec<String> = std::env::args().collect();
    let cli = match parse_args(&args) {
        Ok(Some(cli)) => cli,
        Ok(None) => {
            print_usage();
            return;
        }
        Err(msg) => {
            eprintln!("sid-render: {msg}");
            process::exit(1);
        }
    };
    if let Err(e) = run(&cli) {
        eprintln!("sid-render: {e}");
        process::exit(1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(list: &[&str]) -> Vec<String> {
        std::iter::once("sid-render")
            .chain(list.iter().copied())
            .map(String::from)
            .collect()
    }

    #[test]
    fn parses_options_and_path() {
        let cli = parse_args(&args(&["--song", "3", "--seconds", "2.5", "tune.sid"]))
            .expect("valid")
            .expect("not help");
        assert_eq!(cli.sid_path, PathBuf::from("tune.sid"));
        assert_eq!(cli.song, Some(3));
        assert!((cli.seconds - 2.5).abs() < f64::EPSILON);
    }

    #[test]
    fn bad_seconds_is_reported() {
        let err = parse_args(&args(&["--seconds", "abc", "tune.sid"])).expect_err("rejected");
        assert!(err.contains("abc"), "{err}");
        assert!(parse_args(&args(&["--seconds", "-1", "tune.sid"])).is_err());
        assert!(parse_args(&args(&["tune.sid", "--seconds"])).is_err());
    }

    #[test]
    fn bad_song_is_reported() {
        assert!(parse_args(&args(&["--song", "x", "tune.sid"])).is_err());
        assert!(parse_args(&args(&["--song", "0", "tune.sid"])).is_err());
    }

    #[test]
    fn missing_path_is_reported() {
        let err = parse_args(&args(&["--seconds", "5"])).expect_err("rejected");
        assert!(err.contains("no SID file"), "{err}");
    }

    #[test]
    fn help_short_circuits() {
        assert!(parse_args(&args(&["--help"])).expect("valid").is_none());
    }

    #[test]
    fn unreadable_file_is_an_error() {
        let cli = parse_args(&args(&["/nonexistent/emu-sid/tune.sid"]))
            .expect("valid")
            .expect("not help");
        assert!(matches!(run(&cli), Err(CliError::Read { .. })));
    }
}
