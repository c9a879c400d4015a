//! The interrogator: category tables plus every prompt assembly mode.
//!
//! Tables are built once (or loaded from the label cache) when the
//! interrogator is created. Each mode takes an image embedding from
//! [`Interrogator::image_features`] and, except the label-only modes, a
//! caption produced by a [`Captioner`](crate::caption::Captioner).

use std::path::{Path, PathBuf};
use std::sync::{Arc, OnceLock};

use image::DynamicImage;

use crate::config::Config;
use crate::embedding::EmbeddingProvider;
use crate::error::{ConfigError, PrismError, Result};
use crate::labels::vocabulary::FLAVORS_REDUCED_FILE;
use crate::labels::{load_list, similarities, similarity, LabelTable, TableSettings, Vocabularies};
use crate::math::l2_normalize_in_place;
use crate::prompt::{search, truncate_to_fit, CategoryTables, SearchParams, SEPARATOR};

/// Caller-supplied labels for the flavors-only and single-label modes.
#[derive(Debug, Clone, Copy)]
pub enum LabelSource<'a> {
    /// A label file, cached under its file name
    Path(&'a Path),
    /// An in-memory list, cached under the name `list`
    Options(&'a [String]),
}

/// Knobs shared by every mode.
#[derive(Debug, Clone)]
pub struct InterrogatorOptions {
    pub table_settings: TableSettings,
    pub flavor_intermediate_count: usize,
    /// Directory holding `flavors_reduced.txt`
    pub data_dir: PathBuf,
}

impl InterrogatorOptions {
    pub fn from_config(config: &Config) -> Self {
        Self {
            table_settings: config.table_settings(),
            flavor_intermediate_count: config.interrogator.flavor_intermediate_count,
            data_dir: config.data_dir(),
        }
    }
}

/// Image-to-prompt engine over the five category vocabularies.
pub struct Interrogator {
    provider: Arc<dyn EmbeddingProvider>,
    options: InterrogatorOptions,
    artists: LabelTable,
    flavors: LabelTable,
    mediums: LabelTable,
    movements: LabelTable,
    trendings: LabelTable,
    merged: OnceLock<LabelTable>,
}

impl Interrogator {
    /// Load vocabularies from the configured data directory and build all tables.
    pub fn new(config: &Config, provider: Arc<dyn EmbeddingProvider>) -> Result<Self> {
        let options = InterrogatorOptions::from_config(config);
        let vocab = Vocabularies::load(&options.data_dir)?;
        Self::from_vocabularies(vocab, provider, options)
    }

    /// Build all tables from already-loaded vocabularies.
    pub fn from_vocabularies(
        vocab: Vocabularies,
        provider: Arc<dyn EmbeddingProvider>,
        options: InterrogatorOptions,
    ) -> Result<Self> {
        let build = |labels: Vec<String>, name: &str| {
            LabelTable::build(labels, Some(name), provider.as_ref(), &options.table_settings)
        };

        let artists = build(vocab.artists, "artists")?;
        let flavors = build(vocab.flavors, "flavors")?;
        let mediums = build(vocab.mediums, "mediums")?;
        let movements = build(vocab.movements, "movements")?;
        let trendings = build(vocab.trendings, "trendings")?;

        tracing::info!(
            "Interrogator ready with {} labels for {}",
            artists.len() + flavors.len() + mediums.len() + movements.len() + trendings.len(),
            provider.model_id()
        );

        Ok(Self {
            provider,
            options,
            artists,
            flavors,
            mediums,
            movements,
            trendings,
            merged: OnceLock::new(),
        })
    }

    /// The embedding provider shared by every table.
    pub fn provider(&self) -> &dyn EmbeddingProvider {
        self.provider.as_ref()
    }

    /// Unit-length image embedding used by every mode.
    pub fn image_features(&self, image: &DynamicImage) -> Result<Vec<f32>> {
        let mut features = self.provider.embed_image(image)?;
        l2_normalize_in_place(&mut features);
        Ok(features)
    }

    /// Best mode: joint category seeding then greedy flavor chaining.
    pub fn interrogate(&self, features: &[f32], caption: &str, max_flavors: usize) -> Result<String> {
        let tables = CategoryTables {
            medium: &self.mediums,
            artist: &self.artists,
            trending: &self.trendings,
            movement: &self.movements,
            flavors: &self.flavors,
        };
        let params = SearchParams {
            max_flavors,
            flavor_intermediate_count: self.options.flavor_intermediate_count,
            batch_size: self.options.table_settings.chunk_size,
        };
        search(self.provider(), features, caption, &tables, &params)
    }

    /// Classic mode: a fixed template of top-1 categories and top flavors.
    pub fn interrogate_classic(
        &self,
        features: &[f32],
        caption: &str,
        max_flavors: usize,
    ) -> Result<String> {
        let top = |table: &LabelTable| -> Result<String> {
            Ok(table
                .rank(features, 1)?
                .first()
                .map(|s| s.to_string())
                .unwrap_or_default())
        };
        let medium = top(&self.mediums)?;
        let artist = top(&self.artists)?;
        let trending = top(&self.trendings)?;
        let movement = top(&self.movements)?;
        let flavors = self.flavors.rank(features, max_flavors)?.join(SEPARATOR);

        let prompt = if caption.starts_with(&medium) {
            format!("{caption} {artist}, {trending}, {movement}, {flavors}")
        } else {
            format!("{caption}, {medium} {artist}, {trending}, {movement}, {flavors}")
        };
        Ok(self.truncate(&prompt))
    }

    /// Fast mode: one ranking over all vocabularies merged.
    pub fn interrogate_fast(&self, features: &[f32], caption: &str, max_flavors: usize) -> Result<String> {
        let tops = self.merged()?.rank(features, max_flavors)?;
        if tops.is_empty() {
            return Ok(self.truncate(caption));
        }
        let prompt = format!("{caption}{SEPARATOR}{}", tops.join(SEPARATOR));
        Ok(self.truncate(&prompt))
    }

    /// Top `max_flavors` labels of `source` (default `flavors_reduced.txt`), comma-joined.
    pub fn interrogate_flavors(
        &self,
        features: &[f32],
        source: Option<LabelSource<'_>>,
        max_flavors: usize,
    ) -> Result<String> {
        let table = match source {
            Some(source) => self.source_table(source)?,
            None => {
                let path = self.options.data_dir.join(FLAVORS_REDUCED_FILE);
                self.build_table(load_list(&path)?, "flavors_reduced")?
            }
        };
        Ok(table.rank(features, max_flavors)?.join(SEPARATOR))
    }

    /// The single best label of `source`, truncated to the token budget.
    pub fn interrogate_one(&self, features: &[f32], source: Option<LabelSource<'_>>) -> Result<String> {
        let source = source.ok_or_else(|| {
            ConfigError::MissingLabels("provide a label file or a list of options".to_string())
        })?;
        let table = self.source_table(source)?;
        let best = table
            .rank(features, 1)?
            .first()
            .map(|s| s.to_string())
            .ok_or_else(|| ConfigError::MissingLabels("label source is empty".to_string()))?;
        Ok(self.truncate(&best))
    }

    /// Similarity between the image and one string.
    pub fn score(&self, features: &[f32], text: &str) -> Result<f32> {
        Ok(similarity(self.provider(), features, text)?)
    }

    /// Similarity of each option, in input order.
    pub fn score_list(&self, features: &[f32], options: &[String]) -> Result<Vec<f32>> {
        if options.is_empty() {
            return Err(ConfigError::MissingLabels("no options to score".to_string()).into());
        }
        Ok(similarities(
            self.provider(),
            features,
            options,
            self.options.table_settings.chunk_size,
        )?)
    }

    /// All category tables merged, built on first use.
    fn merged(&self) -> Result<&LabelTable> {
        if let Some(table) = self.merged.get() {
            return Ok(table);
        }
        let table = LabelTable::merge(&[
            &self.artists,
            &self.flavors,
            &self.mediums,
            &self.movements,
            &self.trendings,
        ])?;
        tracing::debug!("Merged {} labels for fast mode", table.len());
        Ok(self.merged.get_or_init(|| table))
    }

    fn source_table(&self, source: LabelSource<'_>) -> Result<LabelTable> {
        match source {
            LabelSource::Path(path) => {
                let name = path
                    .file_name()
                    .map(|n| n.to_string_lossy().into_owned())
                    .ok_or_else(|| PrismError::Config(ConfigError::VocabularyRead {
                        path: path.to_path_buf(),
                        message: "not a file".to_string(),
                    }))?;
                self.build_table(load_list(path)?, &name)
            }
            LabelSource::Options(options) => self.build_table(options.to_vec(), "list"),
        }
    }

    fn build_table(&self, labels: Vec<String>, name: &str) -> Result<LabelTable> {
        LabelTable::build(labels, Some(name), self.provider(), &self.options.table_settings)
    }

    fn truncate(&self, text: &str) -> String {
        truncate_to_fit(text, |s| self.provider.fits_budget(s))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::ScriptedProvider;

    fn strings(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    fn vocab() -> Vocabularies {
        Vocabularies {
            artists: strings(&["by Claude Monet", "by Frida Kahlo"]),
            flavors: strings(&["sharp focus", "studio lighting", "8k"]),
            mediums: strings(&["oil painting", "a photo"]),
            movements: strings(&["impressionism", "cubism"]),
            trendings: strings(&["trending on Artstation", "pixiv"]),
        }
    }

    fn scripted() -> ScriptedProvider {
        ScriptedProvider::new()
            .score("by Claude Monet", 0.6)
            .score("by Frida Kahlo", 0.1)
            .score("sharp focus", 0.5)
            .score("studio lighting", 0.4)
            .score("8k", 0.3)
            .score("oil painting", 0.7)
            .score("a photo", 0.2)
            .score("impressionism", 0.65)
            .score("cubism", 0.05)
            .score("trending on Artstation", 0.3)
            .score("pixiv", 0.2)
            .score("a cat", 0.1)
    }

    fn interrogator(provider: Arc<ScriptedProvider>, data_dir: &Path) -> Interrogator {
        let options = InterrogatorOptions {
            table_settings: TableSettings {
                cache_dir: Some(data_dir.join("cache")),
                ..TableSettings::default()
            },
            flavor_intermediate_count: 16,
            data_dir: data_dir.to_path_buf(),
        };
        Interrogator::from_vocabularies(vocab(), provider, options).unwrap()
    }

    #[test]
    fn test_image_features_are_normalized() {
        let dir = tempfile::tempdir().unwrap();
        let ci = interrogator(Arc::new(scripted()), dir.path());
        let image = DynamicImage::new_rgb8(4, 4);
        let features = ci.image_features(&image).unwrap();
        let norm: f32 = features.iter().map(|x| x * x).sum();
        assert!((norm - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_tables_are_cached_by_name() {
        let dir = tempfile::tempdir().unwrap();
        let first = Arc::new(scripted());
        interrogator(first.clone(), dir.path());
        assert_eq!(first.embed_calls(), 5);

        let second = Arc::new(scripted());
        interrogator(second.clone(), dir.path());
        assert_eq!(second.embed_calls(), 0);
        for name in ["artists", "flavors", "mediums", "movements", "trendings"] {
            assert!(dir
                .path()
                .join("cache")
                .join(format!("test_model_{name}.json"))
                .exists());
        }
    }

    #[test]
    fn test_classic_template() {
        let dir = tempfile::tempdir().unwrap();
        let provider = Arc::new(scripted());
        let ci = interrogator(provider.clone(), dir.path());
        let features = provider.image();

        let prompt = ci.interrogate_classic(&features, "a cat", 2).unwrap();
        assert_eq!(
            prompt,
            "a cat, oil painting by Claude Monet, trending on Artstation, impressionism, sharp focus, studio lighting"
        );

        let prompt = ci
            .interrogate_classic(&features, "oil painting of a cat", 1)
            .unwrap();
        assert_eq!(
            prompt,
            "oil painting of a cat by Claude Monet, trending on Artstation, impressionism, sharp focus"
        );
    }

    #[test]
    fn test_classic_truncates_to_budget() {
        let dir = tempfile::tempdir().unwrap();
        let provider = Arc::new(scripted().budget(40));
        let ci = interrogator(provider.clone(), dir.path());
        let prompt = ci.interrogate_classic(&provider.image(), "a cat", 3).unwrap();
        assert_eq!(prompt, "a cat, oil painting by Claude Monet");
    }

    #[test]
    fn test_fast_ranks_merged_table() {
        let dir = tempfile::tempdir().unwrap();
        let provider = Arc::new(scripted());
        let ci = interrogator(provider.clone(), dir.path());
        let features = provider.image();
        let calls = provider.embed_calls();

        let prompt = ci.interrogate_fast(&features, "a cat", 3).unwrap();
        assert_eq!(prompt, "a cat, oil painting, impressionism, by Claude Monet");
        // Merging reuses the stored embeddings.
        assert_eq!(provider.embed_calls(), calls);
        assert_eq!(ci.interrogate_fast(&features, "a cat", 3).unwrap(), prompt);

        assert_eq!(ci.interrogate_fast(&features, "a cat", 0).unwrap(), "a cat");
    }

    #[test]
    fn test_best_mode_search() {
        let dir = tempfile::tempdir().unwrap();
        let provider = Arc::new(
            scripted()
                .score("a cat, oil painting", 0.3)
                .score("a cat, oil painting, sharp focus", 0.35),
        );
        let ci = interrogator(provider.clone(), dir.path());
        let prompt = ci.interrogate(&provider.image(), "a cat", 32).unwrap();
        assert_eq!(prompt, "a cat, oil painting, sharp focus");
    }

    #[test]
    fn test_flavors_mode_sources() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join(FLAVORS_REDUCED_FILE),
            "studio lighting\nsharp focus\n8k\n",
        )
        .unwrap();
        let provider = Arc::new(scripted());
        let ci = interrogator(provider.clone(), dir.path());
        let features = provider.image();

        let default = ci.interrogate_flavors(&features, None, 2).unwrap();
        assert_eq!(default, "sharp focus, studio lighting");

        let options = strings(&["8k", "cubism"]);
        let listed = ci
            .interrogate_flavors(&features, Some(LabelSource::Options(&options)), 5)
            .unwrap();
        assert_eq!(listed, "8k, cubism");
        assert!(dir.path().join("cache").join("test_model_list.json").exists());
        assert!(dir
            .path()
            .join("cache")
            .join("test_model_flavors_reduced.json")
            .exists());
    }

    #[test]
    fn test_flavors_mode_missing_default_file() {
        let dir = tempfile::tempdir().unwrap();
        let provider = Arc::new(scripted());
        let ci = interrogator(provider.clone(), dir.path());
        let err = ci.interrogate_flavors(&provider.image(), None, 2).unwrap_err();
        assert!(err.to_string().contains(FLAVORS_REDUCED_FILE));
    }

    #[test]
    fn test_one_mode() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("colors.txt");
        std::fs::write(&path, "cubism\nimpressionism\n").unwrap();
        let provider = Arc::new(scripted());
        let ci = interrogator(provider.clone(), dir.path());
        let features = provider.image();

        let best = ci
            .interrogate_one(&features, Some(LabelSource::Path(&path)))
            .unwrap();
        assert_eq!(best, "impressionism");
        assert!(dir
            .path()
            .join("cache")
            .join("test_model_colors.txt.json")
            .exists());

        let err = ci.interrogate_one(&features, None).unwrap_err();
        assert!(matches!(
            err,
            PrismError::Config(ConfigError::MissingLabels(_))
        ));

        let empty: Vec<String> = Vec::new();
        let err = ci
            .interrogate_one(&features, Some(LabelSource::Options(&empty)))
            .unwrap_err();
        assert!(matches!(
            err,
            PrismError::Config(ConfigError::MissingLabels(_))
        ));
    }

    #[test]
    fn test_score_and_score_list() {
        let dir = tempfile::tempdir().unwrap();
        let provider = Arc::new(scripted());
        let ci = interrogator(provider.clone(), dir.path());
        let features = provider.image();

        assert!((ci.score(&features, "oil painting").unwrap() - 0.7).abs() < 1e-5);

        let scores = ci
            .score_list(&features, &strings(&["cubism", "oil painting"]))
            .unwrap();
        assert_eq!(scores.len(), 2);
        assert!((scores[0] - 0.05).abs() < 1e-5);
        assert!((scores[1] - 0.7).abs() < 1e-5);

        let err = ci.score_list(&features, &[]).unwrap_err();
        assert!(matches!(
            err,
            PrismError::Config(ConfigError::MissingLabels(_))
        ));
    }

    #[test]
    fn test_new_reports_missing_data_dir() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = Config::default();
        config.general.data_dir = dir.path().join("missing");
        config.interrogator.cache_labels = false;
        let err = match Interrogator::new(&config, Arc::new(scripted())) {
            Ok(_) => panic!("expected missing vocabulary error"),
            Err(e) => e,
        };
        assert!(err.to_string().contains("artists.txt"));
    }
}
