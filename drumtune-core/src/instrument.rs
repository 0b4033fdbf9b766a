//! # Instrument Module
//!
//! Static reference data describing the drums the tuner knows about: how many
//! tension rods each head has and which frequency range suits each head side.
//!
//! ## Features
//! - Built-in presets for a standard kit
//! - JSON catalogs for custom kits, validated on load
//! - Frequency ranges used to seed the target frequency of a session

use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;

/// One of the two membranes on a drum.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HeadSide {
    /// The struck head.
    Batter,
    /// The bottom head.
    Resonant,
}

impl HeadSide {
    pub fn as_str(&self) -> &'static str {
        match self {
            HeadSide::Batter => "batter",
            HeadSide::Resonant => "resonant",
        }
    }
}

impl fmt::Display for HeadSide {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for HeadSide {
    type Err = CatalogError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "batter" | "top" => Ok(HeadSide::Batter),
            "resonant" | "reso" | "bottom" => Ok(HeadSide::Resonant),
            other => Err(CatalogError::UnknownHeadSide(other.to_string())),
        }
    }
}

/// Inclusive frequency range in Hz.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FreqRange {
    pub min: f32,
    pub max: f32,
}

impl FreqRange {
    pub const fn new(min: f32, max: f32) -> Self {
        Self { min, max }
    }

    /// Midpoint of the range; the default target for a head.
    pub fn midpoint(&self) -> f32 {
        (self.min + self.max) / 2.0
    }

    pub fn contains(&self, hz: f32) -> bool {
        hz >= self.min && hz <= self.max
    }

    fn is_valid(&self) -> bool {
        self.min.is_finite() && self.max.is_finite() && self.min > 0.0 && self.min < self.max
    }
}

/// A drum the tuner can be configured for.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Instrument {
    pub id: String,
    pub name: String,
    /// Number of tension rods per head.
    pub lugs: usize,
    pub batter_range: FreqRange,
    pub resonant_range: FreqRange,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub sizes: Vec<String>,
    #[serde(default)]
    pub default_size: Option<String>,
    #[serde(default)]
    pub tips: String,
}

impl Instrument {
    /// Frequency range for the requested head side.
    pub fn range(&self, head: HeadSide) -> FreqRange {
        match head {
            HeadSide::Batter => self.batter_range,
            HeadSide::Resonant => self.resonant_range,
        }
    }
}

/// Errors raised while loading or querying instrument configuration.
#[derive(Debug, thiserror::Error)]
pub enum CatalogError {
    #[error("IO error reading catalog '{path}': {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Invalid catalog JSON: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Catalog contains no instruments")]
    Empty,

    #[error("Instrument '{0}' must have at least one lug")]
    NoLugs(String),

    #[error("Instrument '{id}' has an invalid {head} range {min}-{max} Hz")]
    InvalidRange {
        id: String,
        head: HeadSide,
        min: f32,
        max: f32,
    },

    #[error("Duplicate instrument id '{0}'")]
    DuplicateId(String),

    #[error("Unknown head side '{0}' (expected batter or resonant)")]
    UnknownHeadSide(String),
}

#[allow(clippy::too_many_arguments)]
fn preset(
    id: &str,
    name: &str,
    lugs: usize,
    batter_range: (f32, f32),
    resonant_range: (f32, f32),
    description: &str,
    sizes: &[&str],
    default_size: &str,
    tips: &str,
) -> Instrument {
    Instrument {
        id: id.to_string(),
        name: name.to_string(),
        lugs,
        batter_range: FreqRange::new(batter_range.0, batter_range.1),
        resonant_range: FreqRange::new(resonant_range.0, resonant_range.1),
        description: description.to_string(),
        sizes: sizes.iter().map(|s| s.to_string()).collect(),
        default_size: Some(default_size.to_string()),
        tips: tips.to_string(),
    }
}

/// Built-in kit, computed once on first use.
static PRESETS: Lazy<Vec<Instrument>> = Lazy::new(|| {
    vec![
        preset(
            "snare",
            "Snare",
            8,
            (220.0, 330.0),
            (280.0, 420.0),
            "Batter & resonant head tuning",
            &["13\"", "14\""],
            "14\"",
            "Tune the resonant head slightly higher than the batter for snare response.",
        ),
        preset(
            "bass",
            "Bass Drum",
            8,
            (55.0, 90.0),
            (60.0, 100.0),
            "Deep punch & resonance control",
            &["18\"", "20\"", "22\"", "24\""],
            "22\"",
            "Tune both heads evenly for maximum sustain. Detune the batter slightly for more attack.",
        ),
        preset(
            "rack-tom",
            "Rack Tom",
            6,
            (140.0, 240.0),
            (160.0, 280.0),
            "Clear pitch with controlled sustain",
            &["10\"", "12\"", "13\""],
            "12\"",
            "Tune the resonant head a minor third above the batter for melodic toms.",
        ),
        preset(
            "floor-tom",
            "Floor Tom",
            8,
            (80.0, 160.0),
            (90.0, 180.0),
            "Warm low-end with body",
            &["14\"", "16\"", "18\""],
            "16\"",
            "Lower tuning gives more warmth. Keep lugs even to avoid warbling.",
        ),
        preset(
            "hi-hat",
            "Hi-Hat",
            6,
            (300.0, 500.0),
            (330.0, 550.0),
            "Chick sound & wash tuning",
            &["13\"", "14\"", "15\""],
            "14\"",
            "The bottom hi-hat should be slightly tighter than the top for a clean 'chick'.",
        ),
    ]
});

/// The built-in presets.
pub fn presets() -> &'static [Instrument] {
    &PRESETS
}

/// Looks up a built-in preset by id.
pub fn find_preset(id: &str) -> Option<&'static Instrument> {
    PRESETS.iter().find(|i| i.id == id)
}

/// A validated list of instruments.
#[derive(Debug, Clone, PartialEq)]
pub struct InstrumentCatalog {
    instruments: Vec<Instrument>,
}

impl Default for InstrumentCatalog {
    fn default() -> Self {
        Self::builtin()
    }
}

impl InstrumentCatalog {
    pub fn builtin() -> Self {
        Self {
            instruments: PRESETS.clone(),
        }
    }

    /// Builds a catalog, rejecting entries the session store could not use.
    pub fn new(instruments: Vec<Instrument>) -> Result<Self, CatalogError> {
        if instruments.is_empty() {
            return Err(CatalogError::Empty);
        }
        let mut seen = HashSet::new();
        for instrument in &instruments {
            if !seen.insert(instrument.id.as_str()) {
                return Err(CatalogError::DuplicateId(instrument.id.clone()));
            }
            if instrument.lugs == 0 {
                return Err(CatalogError::NoLugs(instrument.id.clone()));
            }
            for head in [HeadSide::Batter, HeadSide::Resonant] {
                let range = instrument.range(head);
                if !range.is_valid() {
                    return Err(CatalogError::InvalidRange {
                        id: instrument.id.clone(),
                        head,
                        min: range.min,
                        max: range.max,
                    });
                }
            }
        }
        Ok(Self { instruments })
    }

    /// Parses a JSON array of instruments.
    pub fn from_json(json: &str) -> Result<Self, CatalogError> {
        let instruments: Vec<Instrument> = serde_json::from_str(json)?;
        Self::new(instruments)
    }

    pub fn load(path: &Path) -> Result<Self, CatalogError> {
        let data = fs::read_to_string(path).map_err(|source| CatalogError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let catalog = Self::from_json(&data)?;
        log::info!(
            "[CATALOG] Loaded {} instruments from {}",
            catalog.instruments.len(),
            path.display()
        );
        Ok(catalog)
    }

    pub fn find(&self, id: &str) -> Option<&Instrument> {
        self.instruments.iter().find(|i| i.id == id)
    }

    pub fn instruments(&self) -> &[Instrument] {
        &self.instruments
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtin_presets_are_valid() {
        let catalog = InstrumentCatalog::new(presets().to_vec()).unwrap();
        assert_eq!(catalog.instruments().len(), 5);
        assert_eq!(catalog, InstrumentCatalog::builtin());
    }

    #[test]
    fn snare_batter_midpoint() {
        let snare = find_preset("snare").unwrap();
        assert_eq!(snare.lugs, 8);
        assert_eq!(snare.range(HeadSide::Batter).midpoint(), 275.0);
        assert_eq!(snare.range(HeadSide::Resonant).midpoint(), 350.0);
    }

    #[test]
    fn head_side_parsing() {
        assert_eq!("batter".parse::<HeadSide>().unwrap(), HeadSide::Batter);
        assert_eq!("Resonant".parse::<HeadSide>().unwrap(), HeadSide::Resonant);
        assert!(matches!(
            "snare".parse::<HeadSide>(),
            Err(CatalogError::UnknownHeadSide(_))
        ));
    }

    #[test]
    fn catalog_from_json() {
        let json = r#"[
            {
                "id": "piccolo",
                "name": "Piccolo Snare",
                "lugs": 10,
                "batter_range": { "min": 300.0, "max": 450.0 },
                "resonant_range": { "min": 350.0, "max": 500.0 }
            }
        ]"#;
        let catalog = InstrumentCatalog::from_json(json).unwrap();
        let piccolo = catalog.find("piccolo").unwrap();
        assert_eq!(piccolo.lugs, 10);
        assert!(piccolo.sizes.is_empty());
        assert_eq!(piccolo.range(HeadSide::Batter).midpoint(), 375.0);
    }

    #[test]
    fn catalog_rejects_bad_entries() {
        let mut zero_lugs = find_preset("snare").unwrap().clone();
        zero_lugs.lugs = 0;
        assert!(matches!(
            InstrumentCatalog::new(vec![zero_lugs]),
            Err(CatalogError::NoLugs(_))
        ));

        let mut inverted = find_preset("bass").unwrap().clone();
        inverted.resonant_range = FreqRange::new(100.0, 60.0);
        assert!(matches!(
            InstrumentCatalog::new(vec![inverted]),
            Err(CatalogError::InvalidRange { head: HeadSide::Resonant, .. })
        ));

        let twice = vec![presets()[0].clone(), presets()[0].clone()];
        assert!(matches!(
            InstrumentCatalog::new(twice),
            Err(CatalogError::DuplicateId(_))
        ));

        assert!(matches!(InstrumentCatalog::new(vec![]), Err(CatalogError::Empty)));
        assert!(matches!(
            InstrumentCatalog::from_json("{ not json"),
            Err(CatalogError::Parse(_))
        ));
    }
}
