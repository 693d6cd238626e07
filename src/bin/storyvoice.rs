//! `storyvoice`: section a text file and turn it into numbered audio files.
//!
//! Usage:
//!   storyvoice sections story.txt --max-chars 1200
//!   storyvoice speak story.html --html --out audio/ --voice nova --quality hd
//!
//! `speak` reads the API key from `OPENAI_API_KEY`.

use std::{
    path::{Path, PathBuf},
    sync::Arc,
};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};

use storyvoice::{
    batch::generate_batch,
    credentials::EnvCredentials,
    format::flatten_html,
    instructions::{enhance_voice_instructions, ReadingRules},
    logging::{init_logging, DEFAULT_FILTER},
    openai::OpenAiSynthesizer,
    player::export_file_name,
    sectionize, Config, QualityTier, SpeechSynthesizer,
};

#[derive(Parser, Debug)]
#[command(name = "storyvoice", version, about = "Long-form text to speech, one section at a time")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Path to a JSON configuration file
    #[arg(long, global = true, value_name = "PATH")]
    config: Option<PathBuf>,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Print the sections a file would be split into
    Sections {
        file: PathBuf,

        /// Per-section character limit (overrides the config)
        #[arg(long, value_name = "N")]
        max_chars: Option<usize>,

        /// Treat the input as editor HTML
        #[arg(long)]
        html: bool,
    },

    /// Generate audio for every section and write one file per section
    Speak {
        file: PathBuf,

        /// Output directory
        #[arg(long, short, value_name = "DIR", default_value = ".")]
        out: PathBuf,

        #[arg(long, value_name = "VOICE")]
        voice: Option<String>,

        /// Mood / style line for the voice
        #[arg(long, value_name = "TEXT")]
        instructions: Option<String>,

        /// standard, fast or hd
        #[arg(long, value_name = "TIER")]
        quality: Option<QualityTier>,

        /// Reading-rules JSON appended to the instructions
        #[arg(long, value_name = "PATH")]
        rules: Option<PathBuf>,

        /// Add the dynamic-inflection guidance block
        #[arg(long)]
        dynamic_inflection: bool,

        #[arg(long, value_name = "N")]
        max_chars: Option<usize>,

        #[arg(long)]
        html: bool,
    },
}

fn read_input(path: &Path, html: bool) -> Result<String> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("Cannot read input: {}", path.display()))?;
    Ok(if html { flatten_html(&raw) } else { raw })
}

fn load_config(path: Option<&Path>) -> Result<Config> {
    let config = match path {
        Some(path) => Config::load(path)?,
        None => Config::default(),
    };
    config.with_env_overrides()
}

fn print_sections(config: &Config, file: &Path, max_chars: Option<usize>, html: bool) -> Result<()> {
    let text = read_input(file, html)?;
    let limit = max_chars.unwrap_or(config.max_chars);
    let sections = sectionize(&text, limit)?;

    for (i, section) in sections.iter().enumerate() {
        println!("── Section {} of {} ({} chars) ──", i + 1, sections.len(), section.char_len());
        println!("{}\n", section);
    }
    Ok(())
}

#[allow(clippy::too_many_arguments)]
async fn speak(
    mut config: Config,
    file: &Path,
    out: &Path,
    voice: Option<String>,
    instructions: Option<String>,
    quality: Option<QualityTier>,
    rules: Option<&Path>,
    dynamic_inflection: bool,
    max_chars: Option<usize>,
    html: bool,
) -> Result<()> {
    if let Some(voice) = voice {
        config.voice = voice;
    }
    if let Some(instructions) = instructions {
        config.instructions = instructions;
    }
    if let Some(quality) = quality {
        config.quality = quality;
    }
    if let Some(max_chars) = max_chars {
        config.max_chars = max_chars;
    }
    config.validate()?;

    let mut params = config.voice_params();
    if let Some(rules) = rules {
        let rules = ReadingRules::load(rules)?;
        params.instructions = enhance_voice_instructions(&params.instructions, &rules, dynamic_inflection);
    }

    let synth = OpenAiSynthesizer::from_config(&config, Arc::new(EnvCredentials::default()));
    synth.ready()?;

    let text = read_input(file, html)?;
    let sections = sectionize(&text, config.max_chars)?;
    let total = sections.len();

    let resources = generate_batch(&synth, &sections, &params, |i, n| {
        eprintln!("Generating section {} of {}…", i + 1, n);
    })
    .await?;

    tokio::fs::create_dir_all(out)
        .await
        .with_context(|| format!("Cannot create output directory: {}", out.display()))?;

    for (index, resource) in resources.iter().enumerate() {
        let Some(bytes) = resource.bytes() else {
            tracing::warn!(index, location = %resource.location, "resource has no inline audio, skipped");
            continue;
        };
        let path = out.join(export_file_name(index, total, resource.format.extension()));
        tokio::fs::write(&path, bytes)
            .await
            .with_context(|| format!("Cannot write {}", path.display()))?;
        println!("{}", path.display());
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    init_logging(DEFAULT_FILTER);
    let cli = Cli::parse();
    let config = load_config(cli.config.as_deref())?;

    match cli.command {
        Commands::Sections { file, max_chars, html } => print_sections(&config, &file, max_chars, html),
        Commands::Speak {
            file,
            out,
            voice,
            instructions,
            quality,
            rules,
            dynamic_inflection,
            max_chars,
            html,
        } => {
            speak(
                config,
                &file,
                &out,
                voice,
                instructions,
                quality,
                rules.as_deref(),
                dynamic_inflection,
                max_chars,
                html,
            )
            .await
        }
    }
}
