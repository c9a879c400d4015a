//! Category vocabularies loaded from plain-text label lists.
//!
//! A data directory holds one file per category with one label per line:
//!
//! ```text
//! data/
//!   artists.txt
//!   flavors.txt
//!   flavors_reduced.txt
//!   mediums.txt
//!   movements.txt
//! ```
//!
//! The trending category is generated from a fixed list of sites.

use std::path::Path;

use crate::error::{ConfigError, PrismError, Result};

pub const ARTISTS_FILE: &str = "artists.txt";
pub const FLAVORS_FILE: &str = "flavors.txt";
pub const FLAVORS_REDUCED_FILE: &str = "flavors_reduced.txt";
pub const MEDIUMS_FILE: &str = "mediums.txt";
pub const MOVEMENTS_FILE: &str = "movements.txt";

/// Sites combined into the trending vocabulary.
pub const TRENDING_SITES: &[&str] = &[
    "Artstation",
    "behance",
    "cg society",
    "cgsociety",
    "deviantart",
    "dribble",
    "flickr",
    "instagram",
    "pexels",
    "pinterest",
    "pixabay",
    "pixiv",
    "polycount",
    "reddit",
    "shutterstock",
    "tumblr",
    "unsplash",
    "zbrush central",
];

/// Read a label list: one label per line, trimmed, blank lines skipped.
///
/// Invalid UTF-8 is replaced rather than rejected.
pub fn load_list(path: &Path) -> Result<Vec<String>> {
    let bytes = std::fs::read(path).map_err(|e| {
        PrismError::Config(ConfigError::VocabularyRead {
            path: path.to_path_buf(),
            message: e.to_string(),
        })
    })?;

    Ok(String::from_utf8_lossy(&bytes)
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(str::to_string)
        .collect())
}

/// The trending vocabulary: every site bare, then `trending on`, `featured on`
/// and `contest winner` variants, each group in site order.
pub fn trending_labels() -> Vec<String> {
    let mut labels = Vec::with_capacity(TRENDING_SITES.len() * 4);
    labels.extend(TRENDING_SITES.iter().map(|s| s.to_string()));
    labels.extend(TRENDING_SITES.iter().map(|s| format!("trending on {s}")));
    labels.extend(TRENDING_SITES.iter().map(|s| format!("featured on {s}")));
    labels.extend(TRENDING_SITES.iter().map(|s| format!("{s} contest winner")));
    labels
}

/// Expand raw artist names into `by {name}` labels followed by
/// `inspired by {name}` labels.
pub fn artist_labels(names: &[String]) -> Vec<String> {
    let mut labels = Vec::with_capacity(names.len() * 2);
    labels.extend(names.iter().map(|n| format!("by {n}")));
    labels.extend(names.iter().map(|n| format!("inspired by {n}")));
    labels
}

/// Label lists for every search category.
#[derive(Debug, Clone, Default)]
pub struct Vocabularies {
    pub artists: Vec<String>,
    pub flavors: Vec<String>,
    pub mediums: Vec<String>,
    pub movements: Vec<String>,
    pub trendings: Vec<String>,
}

impl Vocabularies {
    /// Load every category from `data_dir`.
    pub fn load(data_dir: &Path) -> Result<Self> {
        let raw_artists = load_list(&data_dir.join(ARTISTS_FILE))?;
        let vocab = Self {
            artists: artist_labels(&raw_artists),
            flavors: load_list(&data_dir.join(FLAVORS_FILE))?,
            mediums: load_list(&data_dir.join(MEDIUMS_FILE))?,
            movements: load_list(&data_dir.join(MOVEMENTS_FILE))?,
            trendings: trending_labels(),
        };

        tracing::debug!(
            "Loaded vocabularies from {:?}: {} artists, {} flavors, {} mediums, {} movements, {} trendings",
            data_dir,
            vocab.artists.len(),
            vocab.flavors.len(),
            vocab.mediums.len(),
            vocab.movements.len(),
            vocab.trendings.len()
        );
        Ok(vocab)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write_data_dir(dir: &Path) {
        std::fs::write(dir.join(ARTISTS_FILE), "Claude Monet\nFrida Kahlo\n").unwrap();
        std::fs::write(dir.join(FLAVORS_FILE), "sharp focus\nstudio lighting\n").unwrap();
        std::fs::write(dir.join(MEDIUMS_FILE), "oil painting\n").unwrap();
        std::fs::write(dir.join(MOVEMENTS_FILE), "impressionism\ncubism\n").unwrap();
    }

    #[test]
    fn test_load_list_trims_and_skips_blank() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("list.txt");
        std::fs::write(&path, "  oil painting \r\n\nwatercolor\n   \n").unwrap();
        assert_eq!(load_list(&path).unwrap(), vec!["oil painting", "watercolor"]);
    }

    #[test]
    fn test_load_list_replaces_invalid_utf8() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("list.txt");
        std::fs::write(&path, b"caf\xe9\nok\n").unwrap();
        let labels = load_list(&path).unwrap();
        assert_eq!(labels.len(), 2);
        assert!(labels[0].starts_with("caf"));
        assert!(labels[0].contains('\u{FFFD}'));
    }

    #[test]
    fn test_load_list_missing_file() {
        let err = load_list(Path::new("/nonexistent/list.txt")).unwrap_err();
        assert!(matches!(
            err,
            PrismError::Config(ConfigError::VocabularyRead { .. })
        ));
        assert!(err.to_string().contains("/nonexistent/list.txt"));
    }

    #[test]
    fn test_trending_labels_layout() {
        let labels = trending_labels();
        let n = TRENDING_SITES.len();
        assert_eq!(labels.len(), n * 4);
        assert_eq!(labels[0], "Artstation");
        assert_eq!(labels[n], "trending on Artstation");
        assert_eq!(labels[2 * n], "featured on Artstation");
        assert_eq!(labels[3 * n], "Artstation contest winner");
    }

    #[test]
    fn test_artist_labels_groups_prefixes() {
        let names = vec!["Claude Monet".to_string(), "Frida Kahlo".to_string()];
        assert_eq!(
            artist_labels(&names),
            vec![
                "by Claude Monet",
                "by Frida Kahlo",
                "inspired by Claude Monet",
                "inspired by Frida Kahlo",
            ]
        );
    }

    #[test]
    fn test_vocabularies_load() {
        let dir = tempfile::tempdir().unwrap();
        write_data_dir(dir.path());
        let vocab = Vocabularies::load(dir.path()).unwrap();
        assert_eq!(vocab.artists.len(), 4);
        assert_eq!(vocab.flavors, vec!["sharp focus", "studio lighting"]);
        assert_eq!(vocab.mediums, vec!["oil painting"]);
        assert_eq!(vocab.movements.len(), 2);
        assert_eq!(vocab.trendings, trending_labels());
    }

    #[test]
    fn test_vocabularies_missing_category() {
        let dir = tempfile::tempdir().unwrap();
        write_data_dir(dir.path());
        std::fs::remove_file(dir.path().join(MEDIUMS_FILE)).unwrap();
        let err = Vocabularies::load(dir.path()).unwrap_err();
        assert!(err.to_string().contains("mediums.txt"));
    }
}
