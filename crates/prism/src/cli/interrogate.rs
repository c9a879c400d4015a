//! The `prism interrogate` command.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use clap::{Args, ValueEnum};
use prism_core::caption::{caption_with_retry, Captioner, OllamaCaptioner, RetryPolicy};
use prism_core::{ClipProvider, Config, Interrogator, LabelSource, Mode};
use serde::Serialize;

use super::images;

/// Prompt assembly mode.
#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum ModeArg {
    /// Joint category seeding plus greedy flavor chaining
    Best,
    /// Fixed template of top-1 categories and top flavors
    Classic,
    /// Single ranking over all vocabularies merged
    Fast,
    /// Top flavors only, no caption
    Flavors,
}

impl From<Mode> for ModeArg {
    fn from(mode: Mode) -> Self {
        match mode {
            Mode::Best => ModeArg::Best,
            Mode::Classic => ModeArg::Classic,
            Mode::Fast => ModeArg::Fast,
        }
    }
}

impl std::fmt::Display for ModeArg {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ModeArg::Best => write!(f, "best"),
            ModeArg::Classic => write!(f, "classic"),
            ModeArg::Fast => write!(f, "fast"),
            ModeArg::Flavors => write!(f, "flavors"),
        }
    }
}

/// Arguments for the `interrogate` command.
#[derive(Args, Debug)]
pub struct InterrogateArgs {
    /// Image file or directory to interrogate
    #[arg(required = true)]
    pub input: PathBuf,

    /// Prompt mode (defaults to `interrogator.mode` from config)
    #[arg(short, long, value_enum)]
    pub mode: Option<ModeArg>,

    /// Maximum number of flavors to add
    #[arg(long)]
    pub max_flavors: Option<usize>,

    /// Use this caption instead of asking the captioning model
    #[arg(long)]
    pub caption: Option<String>,

    /// Label file for the flavors mode (defaults to flavors_reduced.txt)
    #[arg(long)]
    pub labels: Option<PathBuf>,

    /// Emit one JSON object per image
    #[arg(long)]
    pub json: bool,
}

/// One interrogation result.
#[derive(Debug, Serialize)]
struct PromptRecord<'a> {
    path: &'a Path,
    mode: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    caption: Option<&'a str>,
    prompt: &'a str,
}

/// Execute the interrogate command.
pub async fn execute(args: InterrogateArgs, config: Config) -> anyhow::Result<()> {
    if !args.input.exists() {
        anyhow::bail!(
            "Input path does not exist: {:?}\n\n  Hint: Check the file path and try again.",
            args.input
        );
    }

    let files = images::discover(&args.input);
    if files.is_empty() {
        tracing::warn!("No supported image files found at {:?}", args.input);
        return Ok(());
    }
    tracing::info!("Found {} image(s) to interrogate", files.len());

    let mode = args.mode.unwrap_or_else(|| config.interrogator.mode.into());
    let max_flavors = args.max_flavors.unwrap_or(config.interrogator.max_flavors);

    let interrogator = load_interrogator(&config)?;
    let captioner = OllamaCaptioner::new(&config.caption);
    if mode != ModeArg::Flavors && args.caption.is_none() && !captioner.is_available().await {
        tracing::warn!(
            "Captioning backend at {} is not reachable; captions will fail",
            config.caption.endpoint
        );
    }

    let job = Job {
        interrogator: &interrogator,
        captioner: &captioner,
        policy: RetryPolicy::from(&config.caption),
        mode,
        max_flavors,
        caption: args.caption.as_deref(),
        labels: args.labels.as_deref(),
    };

    let progress = create_progress_bar(files.len() as u64)?;
    let mut failed: u64 = 0;

    for path in &files {
        progress.set_message(
            path.file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default(),
        );

        match job.run(path).await {
            Ok((caption, prompt)) => {
                let line = if args.json {
                    serde_json::to_string(&PromptRecord {
                        path,
                        mode: mode.to_string(),
                        caption: caption.as_deref(),
                        prompt: &prompt,
                    })?
                } else if files.len() > 1 {
                    format!("{}\t{}", path.display(), prompt)
                } else {
                    prompt
                };
                progress.suspend(|| println!("{line}"));
            }
            Err(e) => {
                failed += 1;
                tracing::error!("Failed to interrogate {:?}: {e:#}", path);
            }
        }
        progress.inc(1);
    }

    progress.finish_and_clear();
    if failed > 0 {
        tracing::warn!("{} of {} image(s) failed", failed, files.len());
        if failed == files.len() as u64 {
            anyhow::bail!("All images failed");
        }
    }
    Ok(())
}

/// Load the CLIP model and build the category tables.
fn load_interrogator(config: &Config) -> anyhow::Result<Interrogator> {
    let model_dir = config.model_dir();
    if !ClipProvider::model_exists(&config.clip, &model_dir) {
        anyhow::bail!(
            "CLIP model {} not found in {:?}.\n\n  Hint: export the model to ONNX \
             (vision_model.onnx, text_model.onnx, tokenizer.json) and place it there.",
            config.clip.model,
            ClipProvider::model_path(&config.clip, &model_dir)
        );
    }
    let provider = Arc::new(ClipProvider::load(&config.clip, &model_dir)?);
    Ok(Interrogator::new(config, provider)?)
}

/// Everything needed to turn one image into a prompt.
struct Job<'a> {
    interrogator: &'a Interrogator,
    captioner: &'a dyn Captioner,
    policy: RetryPolicy,
    mode: ModeArg,
    max_flavors: usize,
    caption: Option<&'a str>,
    labels: Option<&'a Path>,
}

impl Job<'_> {
    /// Returns the caption used (if any) and the prompt.
    async fn run(&self, path: &Path) -> anyhow::Result<(Option<String>, String)> {
        let loaded = images::load(path)?;
        let features = self.interrogator.image_features(&loaded.image)?;

        let caption = match self.mode {
            ModeArg::Flavors => None,
            _ => Some(self.caption_for(&loaded, path).await?),
        };

        let prompt = match (self.mode, caption.as_deref()) {
            (ModeArg::Best, Some(caption)) => {
                self.interrogator
                    .interrogate(&features, caption, self.max_flavors)?
            }
            (ModeArg::Classic, Some(caption)) => {
                self.interrogator
                    .interrogate_classic(&features, caption, self.max_flavors)?
            }
            (ModeArg::Fast, Some(caption)) => {
                self.interrogator
                    .interrogate_fast(&features, caption, self.max_flavors)?
            }
            _ => {
                let source = self.labels.map(LabelSource::Path);
                self.interrogator
                    .interrogate_flavors(&features, source, self.max_flavors)?
            }
        };
        Ok((caption, prompt))
    }

    async fn caption_for(&self, loaded: &images::LoadedImage, path: &Path) -> anyhow::Result<String> {
        let caption = match self.caption {
            Some(caption) => caption.to_string(),
            None => caption_with_retry(self.captioner, &loaded.input, self.policy).await?,
        };
        tracing::debug!("Caption for {:?}: {:?}", path, caption);
        Ok(caption)
    }
}

/// Progress bar over images; hidden for a single image.
fn create_progress_bar(total: u64) -> anyhow::Result<indicatif::ProgressBar> {
    use indicatif::{ProgressBar, ProgressStyle};

    if total <= 1 {
        return Ok(ProgressBar::hidden());
    }
    let pb = ProgressBar::new(total);
    pb.set_style(
        ProgressStyle::default_bar()
            .template(
                "{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({percent}%) {msg}",
            )?
            .progress_chars("##-"),
    );
    pb.set_message("starting...");
    Ok(pb)
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    #[derive(Parser)]
    struct TestCli {
        #[command(flatten)]
        args: InterrogateArgs,
    }

    #[test]
    fn test_parse_defaults() {
        let cli = TestCli::parse_from(["prism", "cat.jpg"]);
        assert_eq!(cli.args.input, PathBuf::from("cat.jpg"));
        assert!(cli.args.mode.is_none());
        assert!(cli.args.max_flavors.is_none());
        assert!(!cli.args.json);
    }

    #[test]
    fn test_parse_mode_and_limits() {
        let cli = TestCli::parse_from([
            "prism",
            "photos/",
            "--mode",
            "fast",
            "--max-flavors",
            "8",
            "--caption",
            "a photo of a cat",
            "--json",
        ]);
        assert_eq!(cli.args.mode, Some(ModeArg::Fast));
        assert_eq!(cli.args.max_flavors, Some(8));
        assert_eq!(cli.args.caption.as_deref(), Some("a photo of a cat"));
        assert!(cli.args.json);
    }

    #[test]
    fn test_mode_from_config() {
        assert_eq!(ModeArg::from(Mode::Classic), ModeArg::Classic);
        assert_eq!(ModeArg::from(Mode::default()).to_string(), "best");
    }

    #[test]
    fn test_record_omits_missing_caption() {
        let record = PromptRecord {
            path: Path::new("cat.jpg"),
            mode: "flavors".to_string(),
            caption: None,
            prompt: "sharp focus",
        };
        let json = serde_json::to_string(&record).unwrap();
        assert!(!json.contains("caption"));
        assert!(json.contains("\"prompt\":\"sharp focus\""));
    }
}
