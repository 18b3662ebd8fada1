use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;

use clap::{Parser, Subcommand};
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing_subscriber::EnvFilter;

use homework_tutor::voice::{
    AudioInput, CpalSink, Listener, MicrophoneSource, Playback, Speaker, Transcriber,
    Transcription,
};
use homework_tutor::{Config, Conversation, Reply, Tone, TurnDispatcher, VoiceSession};

/// Tutor - Voice-enabled homework tutoring assistant
#[derive(Parser)]
#[command(name = "tutor", version, about)]
struct Cli {
    /// Tone to answer in (gentle, strict, humorous)
    #[arg(short, long, env = "TUTOR_TONE")]
    tone: Option<Tone>,

    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Interactive text chat (type /clear to reset, /quit to exit)
    Chat {
        /// Speak each reply
        #[arg(long)]
        speak: bool,
    },
    /// Ask a single question in the selected tone
    Ask {
        /// Question text
        question: String,
    },
    /// Transcribe a WAV file
    Transcribe {
        /// Path to a WAV file
        path: PathBuf,
    },
    /// Listen on the microphone until a pause, then print the text
    Listen,
    /// Run one voice turn from a WAV file and speak the reply
    Voice {
        /// Path to a WAV file
        path: PathBuf,
    },
    /// Speak text in the selected tone
    Speak {
        /// Text to speak
        #[arg(default_value = "Hello! Let's work through your homework together.")]
        text: String,
    },
    /// Recommend practice problems for a mistake
    Practice {
        /// Subject of the mistake (e.g. "math")
        #[arg(short, long)]
        subject: String,
        /// The question that was answered wrong
        #[arg(short, long)]
        question: String,
    },
    /// Test speaker output
    TestSpeaker,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    // Set up logging based on verbosity
    let filter = match cli.verbose {
        0 => "warn,homework_tutor=info",
        1 => "info,homework_tutor=debug",
        2 => "debug",
        _ => "trace",
    };

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(filter))
        .with_writer(std::io::stderr)
        .init();

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!("fatal: {e}");
            ExitCode::FAILURE
        }
    }
}

#[allow(clippy::future_not_send)]
async fn run(cli: Cli) -> anyhow::Result<()> {
    let command = match cli.command {
        Command::TestSpeaker => return test_speaker().await,
        command => command,
    };

    let config = Config::load()?;
    tracing::debug!(?config, "loaded configuration");

    let tone = cli.tone.unwrap_or_else(|| config.tones.default_tone());

    match command {
        Command::Chat { speak } => chat(&config, tone, speak).await,
        Command::Ask { question } => ask(&config, tone, &question).await,
        Command::Transcribe { path } => transcribe(&config, path).await,
        Command::Listen => listen(&config).await,
        Command::Voice { path } => voice(&config, tone, path).await,
        Command::Speak { text } => speak(&config, tone, &text).await,
        Command::Practice { subject, question } => {
            practice(&config, tone, &subject, &question).await
        }
        Command::TestSpeaker => test_speaker().await,
    }
}

fn dispatcher(config: &Config) -> anyhow::Result<TurnDispatcher> {
    Ok(TurnDispatcher::new(
        config.completion_provider()?,
        Arc::new(config.tones.clone()),
        config.completion_settings(),
    ))
}

fn transcriber(config: &Config) -> anyhow::Result<Transcriber> {
    let transcriber = Transcriber::new(config.recognizer()?, config.voice.language.clone());
    Ok(match &config.voice.temp_dir {
        Some(dir) => transcriber.with_temp_dir(dir),
        None => transcriber,
    })
}

fn speaker(config: &Config) -> anyhow::Result<Speaker> {
    let playback = Playback::new(Arc::new(CpalSink::new()?));
    let speaker = Speaker::new(config.synthesizer()?, playback, Arc::new(config.tones.clone()))
        .with_speed(config.voice.speed);
    Ok(match &config.voice.temp_dir {
        Some(dir) => speaker.with_temp_dir(dir),
        None => speaker,
    })
}

/// Interactive stdin chat
async fn chat(config: &Config, tone: Tone, speak: bool) -> anyhow::Result<()> {
    let dispatcher = dispatcher(config)?;
    let speaker = if speak { Some(speaker(config)?) } else { None };
    let mut conversation = Conversation::new(config.llm.system_prompt.clone());

    println!("Homework tutor ({tone}). Type /clear to reset, /quit to exit.");

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        match line.trim() {
            "/quit" | "/exit" => break,
            "/clear" => {
                conversation.clear();
                println!("(conversation cleared)");
                continue;
            }
            _ => {}
        }

        let reply = dispatcher.submit(&mut conversation, &line).await;
        println!("{}\n", reply.text());

        if let (Some(speaker), Reply::Answer(text)) = (&speaker, &reply) {
            if !speaker.speak(text, tone.as_str()).await {
                eprintln!("(speech playback failed)");
            }
        }
    }

    Ok(())
}

/// Single tone-framed question
async fn ask(config: &Config, tone: Tone, question: &str) -> anyhow::Result<()> {
    let dispatcher = dispatcher(config)?;
    let mut conversation = Conversation::new(config.llm.system_prompt.clone());

    let reply = dispatcher.ask(&mut conversation, question, tone).await;
    println!("{}", reply.text());

    if let Reply::Failed(e) = reply {
        anyhow::bail!("completion failed: {e}");
    }
    Ok(())
}

async fn transcribe(config: &Config, path: PathBuf) -> anyhow::Result<()> {
    let transcriber = transcriber(config)?;
    print_transcription(transcriber.transcribe(AudioInput::File(path)).await)
}

#[allow(clippy::future_not_send)]
async fn listen(config: &Config) -> anyhow::Result<()> {
    let listener = Listener::new(transcriber(config)?)
        .with_silence_window(config.voice.silence_window);
    let mut source = MicrophoneSource::open()?;

    println!("Listening... speak, then pause to finish.");
    print_transcription(listener.listen(&mut source).await)
}

fn print_transcription(transcription: Transcription) -> anyhow::Result<()> {
    match transcription {
        Transcription::Text(text) => println!("{text}"),
        Transcription::NoSpeech => println!("{}", homework_tutor::voice::NO_SPEECH_TEXT),
        Transcription::Failed(e) => anyhow::bail!("speech recognition failed: {e}"),
    }
    Ok(())
}

/// One voice turn from a recorded question
async fn voice(config: &Config, tone: Tone, path: PathBuf) -> anyhow::Result<()> {
    let session = VoiceSession::new(
        transcriber(config)?,
        dispatcher(config)?,
        Some(speaker(config)?),
        tone,
    );
    let mut conversation = Conversation::new(config.llm.system_prompt.clone());

    let turn = session
        .voice_turn(&mut conversation, AudioInput::File(path))
        .await;
    println!("{}", turn.display_text());
    Ok(())
}

async fn speak(config: &Config, tone: Tone, text: &str) -> anyhow::Result<()> {
    let speaker = speaker(config)?;
    if !speaker.speak(text, tone.as_str()).await {
        anyhow::bail!("speech synthesis or playback failed");
    }
    Ok(())
}

/// Practice problems with answers revealed on Enter
async fn practice(
    config: &Config,
    tone: Tone,
    subject: &str,
    question: &str,
) -> anyhow::Result<()> {
    let dispatcher = dispatcher(config)?;
    let mut conversation = Conversation::new(config.llm.system_prompt.clone());

    let practice = dispatcher
        .recommend_practice(&mut conversation, subject, question, tone)
        .await?;
    println!("{}", practice.problems);

    if practice.answers.is_empty() {
        return Ok(());
    }

    println!("\nPress Enter to show the answers...");
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let _ = lines.next_line().await?;
    println!("{}", practice.answers);
    Ok(())
}

/// Test speaker output with a sine wave
async fn test_speaker() -> anyhow::Result<()> {
    println!("Testing speaker output...");
    println!("You should hear a 440Hz tone for 2 seconds\n");

    let sink = CpalSink::new()?;

    // 2 seconds of 440Hz sine wave at 24kHz
    let sample_rate = 24000_u32;
    let frequency = 440.0_f32;
    #[allow(clippy::cast_precision_loss)]
    let samples: Vec<f32> = (0..sample_rate * 2)
        .map(|i| {
            let t = i as f32 / sample_rate as f32;
            (2.0 * std::f32::consts::PI * frequency * t).sin() * 0.3 // 30% volume
        })
        .collect();

    println!("Playing {} samples at {} Hz...", samples.len(), sample_rate);

    let mut handle = sink.start_pcm(samples, sample_rate)?;
    while handle.is_busy() {
        tokio::time::sleep(Duration::from_millis(100)).await;
    }
    handle.stop();

    println!("\n---");
    println!("If you heard the tone, your speakers are working!");
    println!("If you didn't hear anything, check:");
    println!("  1. Run: pactl info | grep 'Default Sink'");
    println!("  2. Run: pactl list sinks short");
    println!("  3. Try: pavucontrol (to check output levels)");

    Ok(())
}
