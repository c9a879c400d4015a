//! The `prism score` command: image/text similarity.

use std::path::PathBuf;

use clap::Args;
use prism_core::labels::similarities;
use prism_core::math::l2_normalize_in_place;
use prism_core::{ClipProvider, Config, EmbeddingProvider};
use serde::Serialize;

use super::images;

/// Arguments for the `score` command.
#[derive(Args, Debug)]
pub struct ScoreArgs {
    /// Image to score against
    #[arg(required = true)]
    pub image: PathBuf,

    /// Text candidates to score
    #[arg(required = true, num_args = 1..)]
    pub texts: Vec<String>,

    /// Emit a JSON array instead of tab-separated lines
    #[arg(long)]
    pub json: bool,
}

#[derive(Debug, Serialize)]
struct ScoreRecord<'a> {
    text: &'a str,
    score: f32,
    fits: bool,
}

/// Execute the score command.
pub async fn execute(args: ScoreArgs, config: Config) -> anyhow::Result<()> {
    let model_dir = config.model_dir();
    let provider = ClipProvider::load(&config.clip, &model_dir)?;

    let loaded = images::load(&args.image)?;
    let mut features = provider.embed_image(&loaded.image)?;
    l2_normalize_in_place(&mut features);

    let scores = similarities(
        &provider,
        &features,
        &args.texts,
        config.interrogator.chunk_size,
    )?;
    let records: Vec<ScoreRecord> = args
        .texts
        .iter()
        .zip(scores)
        .map(|(text, score)| ScoreRecord {
            text,
            score,
            fits: provider.fits_budget(text),
        })
        .collect();

    if args.json {
        println!("{}", serde_json::to_string_pretty(&records)?);
    } else {
        for record in &records {
            let marker = if record.fits { "" } else { "\t(exceeds token budget)" };
            println!("{:.4}\t{}{}", record.score, record.text, marker);
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    #[derive(Parser)]
    struct TestCli {
        #[command(flatten)]
        args: ScoreArgs,
    }

    #[test]
    fn test_parse_multiple_texts() {
        let cli = TestCli::parse_from(["prism", "cat.jpg", "a cat", "a dog"]);
        assert_eq!(cli.args.image, PathBuf::from("cat.jpg"));
        assert_eq!(cli.args.texts, vec!["a cat", "a dog"]);
    }

    #[test]
    fn test_parse_requires_text() {
        assert!(TestCli::try_parse_from(["prism", "cat.jpg"]).is_err());
    }
}
