//! LanguePro CLI - translate documents and text, read them aloud, chat.

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};
use langue_core::features::{ChatRequest, PdfAudioRequest, SpeechRequest, TranslateRequest};
use langue_core::pdf::DocumentFormat;
use langue_core::{
    AppConfig, Assistant, DocumentTranslationPipeline, FeatureHandler, Lang, OpenAiClient,
    ProgressCallback, SourceDocument, create_translator,
};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{Level, info};
use tracing_subscriber::FmtSubscriber;

#[derive(Parser, Debug)]
#[command(name = "langue")]
#[command(author, version, about = "Translate, read aloud and chat with an LLM backend", long_about = None)]
struct Args {
    #[command(subcommand)]
    command: Command,

    /// Config file path
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// OpenAI-compatible API base URL
    #[arg(long, global = true, env = "LLM_API_BASE")]
    api_base: Option<String>,

    /// API key for the LLM backend
    #[arg(long, global = true, env = "GROQ_API_KEY", hide_env_values = true)]
    api_key: Option<String>,

    /// Chat model name
    #[arg(long, global = true, env = "LLM_MODEL")]
    model: Option<String>,

    /// Verbose output
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Translate a PDF and render the translation as a new PDF
    Pdf {
        /// Input PDF file
        input: PathBuf,

        /// Output PDF file (default: input-<target>.pdf)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Also write the translated text to this file
        #[arg(long)]
        text_output: Option<PathBuf>,

        /// Source language code
        #[arg(short, long)]
        source: Option<String>,

        /// Target language code
        #[arg(short, long)]
        target: Option<String>,

        /// TrueType font used for the output
        #[arg(long)]
        font: Option<PathBuf>,

        /// Maximum extracted characters to accept
        #[arg(long)]
        size_limit: Option<usize>,

        /// Maximum characters per translation call
        #[arg(long)]
        max_chunk_len: Option<usize>,

        /// Translation calls in flight at once
        #[arg(long)]
        concurrency: Option<usize>,
    },

    /// Translate a text
    Text {
        text: String,

        /// Source language code (default: detect)
        #[arg(short, long)]
        source: Option<String>,

        /// Target language code
        #[arg(short, long)]
        target: Option<String>,
    },

    /// Read a text or a document aloud as MP3
    Speak {
        /// Text to read
        #[arg(long, conflicts_with = "file", required_unless_present = "file")]
        text: Option<String>,

        /// Text or PDF file to read
        #[arg(long)]
        file: Option<PathBuf>,

        /// Language of the text
        #[arg(short, long)]
        lang: Option<String>,

        /// Output MP3 file
        #[arg(short, long, default_value = "speech.mp3")]
        output: PathBuf,
    },

    /// Chat with the assistant on stdin
    Chat,
}

fn load_config(args: &Args) -> Result<AppConfig> {
    let mut config = if let Some(config_path) = &args.config {
        AppConfig::from_file(config_path).context("Failed to load config file")?
    } else {
        AppConfig::load().context("Failed to load configuration")?
    };

    if let Some(api_base) = &args.api_base {
        config.llm.api_base.clone_from(api_base);
    }
    if args.api_key.is_some() {
        config.llm.api_key.clone_from(&args.api_key);
    }
    if let Some(model) = &args.model {
        config.llm.model.clone_from(model);
    }

    Ok(config)
}

fn default_output(input: &Path, target: &Lang) -> PathBuf {
    let stem = input
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("output");
    input.with_file_name(format!("{stem}-{target}.pdf"))
}

#[allow(clippy::too_many_arguments)]
async fn translate_pdf(
    mut config: AppConfig,
    input: PathBuf,
    output: Option<PathBuf>,
    text_output: Option<PathBuf>,
    source: Option<String>,
    target: Option<String>,
    font: Option<PathBuf>,
    size_limit: Option<usize>,
    max_chunk_len: Option<usize>,
    concurrency: Option<usize>,
) -> Result<()> {
    if let Some(source) = source {
        config.source_lang = Lang::new(source);
    }
    if let Some(target) = target {
        config.target_lang = Lang::new(target);
    }
    if let Some(font) = font {
        config.document.font_path = font;
    }
    if let Some(size_limit) = size_limit {
        config.document.size_limit = size_limit;
    }
    if let Some(max_chunk_len) = max_chunk_len {
        config.document.max_chunk_len = max_chunk_len;
    }
    if let Some(concurrency) = concurrency {
        config.document.concurrency = concurrency;
    }
    config.validate().context("Invalid options")?;

    info!("Loading PDF: {}", input.display());
    let document = SourceDocument::from_file(&input)
        .with_context(|| format!("Failed to load PDF: {}", input.display()))?;

    let client = Arc::new(OpenAiClient::new(&config.llm).context("Failed to create LLM client")?);
    let translator = create_translator(&config.llm, client);
    let pipeline = DocumentTranslationPipeline::from_config(&config, translator);

    let pb = ProgressBar::new(0);
    // Template is hardcoded and valid, unwrap is safe
    #[allow(clippy::unwrap_used)]
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} chunks ({eta})")
            .unwrap()
            .progress_chars("#>-"),
    );

    let bar = pb.clone();
    let progress: ProgressCallback = Box::new(move |done, total| {
        bar.set_length(total as u64);
        bar.set_position(done as u64);
    });

    let result = pipeline
        .translate_with_progress(
            &document,
            &config.source_lang,
            &config.target_lang,
            config.document.size_limit,
            Some(progress),
        )
        .await;
    let translated = match result {
        Ok(translated) => {
            pb.finish_with_message("Translation complete");
            translated
        }
        Err(e) => {
            pb.abandon();
            return Err(e).context("Failed to translate document");
        }
    };

    let output_path = output.unwrap_or_else(|| default_output(&input, &config.target_lang));
    std::fs::write(&output_path, translated.document.bytes())
        .with_context(|| format!("Failed to write output: {}", output_path.display()))?;

    if let Some(text_path) = &text_output {
        std::fs::write(text_path, &translated.text)
            .with_context(|| format!("Failed to write text: {}", text_path.display()))?;
    }

    // CLI output is intentional
    #[allow(clippy::print_stdout)]
    {
        println!(
            "Translated {} characters in {} chunks, {} pages",
            translated.source_len,
            translated.chunk_count,
            translated.document.page_count()
        );
        println!("Translated PDF saved to: {}", output_path.display());
    }

    Ok(())
}

async fn translate_text(
    config: &AppConfig,
    text: String,
    source: Option<String>,
    target: Option<String>,
) -> Result<()> {
    let assistant = Assistant::from_config(config).context("Failed to initialize assistant")?;
    let response = assistant
        .translate()
        .handle(TranslateRequest {
            text,
            source_lang: source.map(Lang::new),
            target_lang: target.map_or_else(|| config.target_lang.clone(), Lang::new),
        })
        .await
        .context("Translation failed")?;

    #[allow(clippy::print_stdout)]
    {
        println!("{}", response.text);
    }
    Ok(())
}

async fn speak(
    config: &AppConfig,
    text: Option<String>,
    file: Option<PathBuf>,
    lang: Option<String>,
    output: &Path,
) -> Result<()> {
    let assistant = Assistant::from_config(config).context("Failed to initialize assistant")?;
    let lang = lang.map_or_else(|| config.source_lang.clone(), Lang::new);

    let clip = match (text, file) {
        (Some(text), _) => {
            assistant
                .text_to_audio()
                .handle(SpeechRequest { text, lang })
                .await
        }
        (None, Some(path)) => {
            let is_pdf = path
                .file_name()
                .and_then(|n| n.to_str())
                .is_some_and(|n| DocumentFormat::from_file_name(n).is_ok());
            if is_pdf {
                let document = SourceDocument::from_file(&path)
                    .with_context(|| format!("Failed to load PDF: {}", path.display()))?;
                assistant
                    .pdf_to_audio()
                    .handle(PdfAudioRequest { document, lang })
                    .await
            } else {
                let text = std::fs::read_to_string(&path)
                    .with_context(|| format!("Failed to read {}", path.display()))?;
                assistant
                    .text_to_audio()
                    .handle(SpeechRequest { text, lang })
                    .await
            }
        }
        (None, None) => bail!("Nothing to read: pass --text or --file"),
    }
    .context("Speech synthesis failed")?;

    std::fs::write(output, &clip.audio)
        .with_context(|| format!("Failed to write audio: {}", output.display()))?;

    #[allow(clippy::print_stdout)]
    {
        println!(
            "Audio saved to: {} ({} segments)",
            output.display(),
            clip.segments
        );
    }
    Ok(())
}

#[allow(clippy::print_stdout)]
async fn chat(config: &AppConfig) -> Result<()> {
    let assistant = Assistant::from_config(config).context("Failed to initialize assistant")?;
    let handler = assistant.chat();
    let mut session = None;

    println!("Type a message, /reset to start over, /quit to leave.");
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        print!("> ");
        std::io::stdout().flush()?;

        let Some(line) = lines.next_line().await? else {
            break;
        };
        let message = line.trim();
        match message {
            "" => continue,
            "/quit" | "/exit" => break,
            "/reset" => {
                if let Some(id) = session.take() {
                    handler.sessions().remove(id).await?;
                }
                println!("Conversation cleared.");
                continue;
            }
            _ => {}
        }

        match handler
            .handle(ChatRequest {
                session,
                message: message.to_string(),
            })
            .await
        {
            Ok(reply) => {
                session = Some(reply.session);
                println!("{}", reply.reply);
            }
            Err(e) => println!("Error: {e}"),
        }
    }

    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present (before parsing args so env vars are available)
    dotenvy::dotenv().ok();

    let args = Args::parse();

    let log_level = match args.verbose {
        0 => Level::WARN,
        1 => Level::INFO,
        2 => Level::DEBUG,
        _ => Level::TRACE,
    };

    FmtSubscriber::builder()
        .with_max_level(log_level)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let config = load_config(&args)?;

    match args.command {
        Command::Pdf {
            input,
            output,
            text_output,
            source,
            target,
            font,
            size_limit,
            max_chunk_len,
            concurrency,
        } => {
            translate_pdf(
                config,
                input,
                output,
                text_output,
                source,
                target,
                font,
                size_limit,
                max_chunk_len,
                concurrency,
            )
            .await
        }
        Command::Text {
            text,
            source,
            target,
        } => translate_text(&config, text, source, target).await,
        Command::Speak {
            text,
            file,
            lang,
            output,
        } => speak(&config, text, file, lang, &output).await,
        Command::Chat => chat(&config).await,
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::panic)]
mod tests {
    use super::*;

    #[test]
    fn test_default_output_name() {
        let path = default_output(Path::new("/tmp/report.pdf"), &Lang::new("en"));
        assert_eq!(path, PathBuf::from("/tmp/report-en.pdf"));
    }

    #[test]
    fn test_parse_pdf_command() {
        let args = Args::try_parse_from([
            "langue", "pdf", "in.pdf", "-t", "de", "--concurrency", "4",
        ])
        .unwrap();
        match args.command {
            Command::Pdf {
                input,
                target,
                concurrency,
                ..
            } => {
                assert_eq!(input, PathBuf::from("in.pdf"));
                assert_eq!(target.as_deref(), Some("de"));
                assert_eq!(concurrency, Some(4));
            }
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn test_speak_requires_input() {
        assert!(Args::try_parse_from(["langue", "speak"]).is_err());
        assert!(Args::try_parse_from(["langue", "speak", "--text", "a", "--file", "b"]).is_err());
    }
}
