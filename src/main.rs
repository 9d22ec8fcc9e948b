use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{bail, Context, Result};
use readaloud::playback::types::AudioFormat;
use readaloud::playback::wav;
use readaloud::{CancelToken, SessionEvent, SessionState, Speaker, TtsConfig};

const USAGE: &str = "\
Usage: readaloud [OPTIONS] <text>...

Speaks the given text through the configured TTS server.

Options:
  --server <url>    Override the server base URL for this run
  --voice <name>    Override the voice for this run
  --save <file>     Write the synthesized audio to a WAV file instead of playing it
  --save-config     Persist the (overridden) server URL and voice as defaults
  --list-voices     Print the server's voice catalog and exit
  --health          Check server health and exit
  -h, --help        Show this help
";

struct CliArgs {
    text: Vec<String>,
    server: Option<String>,
    voice: Option<String>,
    save: Option<PathBuf>,
    save_config: bool,
    list_voices: bool,
    health: bool,
}

fn parse_args(args: impl Iterator<Item = String>) -> Result<CliArgs> {
    let mut parsed = CliArgs {
        text: Vec::new(),
        server: None,
        voice: None,
        save: None,
        save_config: false,
        list_voices: false,
        health: false,
    };
    let mut args = args;
    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--server" => parsed.server = Some(flag_value(&mut args, "--server")?),
            "--voice" => parsed.voice = Some(flag_value(&mut args, "--voice")?),
            "--save" => parsed.save = Some(PathBuf::from(flag_value(&mut args, "--save")?)),
            "--save-config" => parsed.save_config = true,
            "--list-voices" => parsed.list_voices = true,
            "--health" => parsed.health = true,
            "-h" | "--help" => {
                print!("{USAGE}");
                std::process::exit(0);
            }
            _ if arg.starts_with('-') => bail!("unknown option {arg}"),
            _ => parsed.text.push(arg),
        }
    }
    Ok(parsed)
}

fn flag_value(args: &mut impl Iterator<Item = String>, flag: &str) -> Result<String> {
    args.next().with_context(|| format!("{flag} needs a value"))
}

fn state_label(state: SessionState) -> &'static str {
    match state {
        SessionState::Connecting => "connecting...",
        SessionState::Buffering => "buffering...",
        SessionState::Playing => "playing...",
        SessionState::Draining => "finishing...",
        SessionState::Completed => "done",
        SessionState::Failed => "failed",
    }
}

fn run() -> Result<()> {
    let args = parse_args(std::env::args().skip(1))?;

    let mut config = TtsConfig::load();
    if let Some(server) = args.server {
        config.server_url = server.trim_end_matches('/').to_string();
    }
    if let Some(voice) = args.voice {
        config.voice = voice;
    }
    if args.save_config {
        config.save()?;
        tracing::info!("configuration saved");
    }
    let speaker = Speaker::new(config);

    if args.health {
        let health = speaker.health()?;
        println!("server status: {}", health.status);
        return Ok(());
    }
    if args.list_voices {
        let catalog = speaker.voices()?;
        for (key, info) in &catalog.voices {
            println!("{key}: {} - {}", info.name, info.description);
        }
        return Ok(());
    }

    let text = args.text.join(" ");
    if text.trim().is_empty() {
        print!("{USAGE}");
        bail!("no text given");
    }
    if !speaker.config().enabled {
        bail!("speech is disabled in the configuration");
    }

    if let Some(path) = args.save {
        let pcm = speaker.fetch_pcm(&text)?;
        wav::write_wav(&path, &pcm, &AudioFormat::stream())
            .with_context(|| format!("writing {}", path.display()))?;
        println!("wrote {} ({} bytes of audio)", path.display(), pcm.len());
        return Ok(());
    }

    let outcome = speaker.speak_with(&text, CancelToken::new(), |event| match event {
        SessionEvent::State(state) => tracing::info!("{}", state_label(state)),
        SessionEvent::Progress { received } => {
            tracing::debug!("received {:.1} KB", received as f64 / 1024.0);
        }
    })?;
    tracing::debug!("session outcome: {outcome:?}");
    Ok(())
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    match run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("error: {err:#}");
            ExitCode::FAILURE
        }
    }
}
