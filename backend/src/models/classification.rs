//! Land-cover classification codes, the raw-to-category code map and the
//! category legend used by every land-cover view.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use serde::{Deserialize, Serialize};
use tracing::warn;

crate::define_code_type!(u8, ClassCode);
crate::define_code_type!(u8, CategoryCode);

/// Fallback color for class names that have no legend entry.
pub const FALLBACK_COLOR: &str = "#999999";

/// Errors raised while building or applying a classification scheme.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ClassificationError {
    #[error("code map is misaligned: {codes} source codes but {new_classes} target classes")]
    LengthMismatch { codes: usize, new_classes: usize },

    #[error("code map is empty")]
    EmptyMap,

    #[error("raw code {0} has no mapping and the unmapped policy rejects it")]
    UnmappedCode(ClassCode),

    #[error("category {0} has no legend entry")]
    MissingLegendEntry(CategoryCode),

    #[error("invalid color '{color}' for category {code}; expected #rrggbb")]
    InvalidColor { code: CategoryCode, color: String },

    #[error("duplicate legend entry for category {0}")]
    DuplicateLegendEntry(CategoryCode),
}

/// What to do with raw codes that are not listed in the code map.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UnmappedPolicy {
    /// Keep the raw value as the category value.
    #[default]
    PassThrough,
    /// Map every unlisted code to one designated category.
    Default(CategoryCode),
    /// Fail the evaluation.
    Reject,
}

/// Serialized shape of a code map: two positionally aligned lists.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CodeMapSpec {
    pub codes: Vec<u8>,
    pub new_classes: Vec<u8>,
    #[serde(default)]
    pub unmapped: UnmappedPolicy,
}

/// Positional mapping `codes[i] -> new_classes[i]` from raw MapBiomas codes to
/// reduced categories.
///
/// When a source code is listed more than once the last occurrence wins.
#[derive(Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "CodeMapSpec", into = "CodeMapSpec")]
pub struct ClassificationCodeMap {
    codes: Vec<ClassCode>,
    new_classes: Vec<CategoryCode>,
    lookup: [Option<CategoryCode>; 256],
    unmapped: UnmappedPolicy,
}

impl ClassificationCodeMap {
    pub fn new(codes: &[u8], new_classes: &[u8]) -> Result<Self, ClassificationError> {
        if codes.len() != new_classes.len() {
            return Err(ClassificationError::LengthMismatch {
                codes: codes.len(),
                new_classes: new_classes.len(),
            });
        }
        if codes.is_empty() {
            return Err(ClassificationError::EmptyMap);
        }

        let mut lookup = [None; 256];
        for (&code, &target) in codes.iter().zip(new_classes) {
            if let Some(previous) = lookup[code as usize] {
                if previous != CategoryCode(target) {
                    warn!(
                        code,
                        previous = %previous,
                        replacement = target,
                        "duplicate source code in code map; last mapping wins"
                    );
                }
            }
            lookup[code as usize] = Some(CategoryCode(target));
        }

        Ok(Self {
            codes: codes.iter().copied().map(ClassCode).collect(),
            new_classes: new_classes.iter().copied().map(CategoryCode).collect(),
            lookup,
            unmapped: UnmappedPolicy::default(),
        })
    }

    pub fn with_unmapped(mut self, policy: UnmappedPolicy) -> Self {
        self.unmapped = policy;
        self
    }

    /// The MapBiomas collection 9 grouping into six categories plus "not observed".
    pub fn mapbiomas_default() -> Self {
        const CODES: [u8; 38] = [
            0, 1, 3, 4, 5, 6, 49, 10, 11, 12, 32, 29, 50, 14, 15, 18, 19, 39, 20, 40, 62, 41, 36,
            46, 47, 35, 48, 9, 21, 22, 23, 24, 30, 25, 26, 33, 31, 27,
        ];
        const NEW_CLASSES: [u8; 38] = [
            0, 1, 1, 1, 1, 1, 1, 2, 2, 2, 2, 2, 2, 3, 3, 3, 3, 3, 3, 3, 3, 3, 3, 3, 3, 3, 3, 3, 4,
            4, 4, 4, 4, 4, 5, 5, 5, 6,
        ];
        Self::new(&CODES, &NEW_CLASSES).expect("built-in MapBiomas code map is aligned")
    }

    pub fn unmapped_policy(&self) -> UnmappedPolicy {
        self.unmapped
    }

    pub fn len(&self) -> usize {
        self.codes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.codes.is_empty()
    }

    pub fn source_codes(&self) -> &[ClassCode] {
        &self.codes
    }

    /// Mapped category for a listed code, ignoring the unmapped policy.
    pub fn lookup(&self, code: ClassCode) -> Option<CategoryCode> {
        self.lookup[code.0 as usize]
    }

    /// Apply the mapping to one raw value.
    pub fn apply(&self, code: ClassCode) -> Result<CategoryCode, ClassificationError> {
        if let Some(target) = self.lookup(code) {
            return Ok(target);
        }
        match self.unmapped {
            UnmappedPolicy::PassThrough => Ok(CategoryCode(code.0)),
            UnmappedPolicy::Default(category) => Ok(category),
            UnmappedPolicy::Reject => Err(ClassificationError::UnmappedCode(code)),
        }
    }

    /// Apply the mapping to a slice of raw pixel values.
    pub fn apply_values(&self, values: &[u8]) -> Result<Vec<u8>, ClassificationError> {
        values
            .iter()
            .map(|&v| self.apply(ClassCode(v)).map(|c| c.0))
            .collect()
    }

    /// Every category this map can emit for listed codes, plus the designated
    /// default category when one is configured.
    pub fn target_codes(&self) -> BTreeSet<CategoryCode> {
        let mut targets: BTreeSet<CategoryCode> = self.new_classes.iter().copied().collect();
        if let UnmappedPolicy::Default(category) = self.unmapped {
            targets.insert(category);
        }
        targets
    }
}

impl fmt::Debug for ClassificationCodeMap {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClassificationCodeMap")
            .field("codes", &self.codes)
            .field("new_classes", &self.new_classes)
            .field("unmapped", &self.unmapped)
            .finish()
    }
}

impl TryFrom<CodeMapSpec> for ClassificationCodeMap {
    type Error = ClassificationError;

    fn try_from(spec: CodeMapSpec) -> Result<Self, Self::Error> {
        Ok(Self::new(&spec.codes, &spec.new_classes)?.with_unmapped(spec.unmapped))
    }
}

impl From<ClassificationCodeMap> for CodeMapSpec {
    fn from(map: ClassificationCodeMap) -> Self {
        Self {
            codes: map.codes.iter().map(|c| c.0).collect(),
            new_classes: map.new_classes.iter().map(|c| c.0).collect(),
            unmapped: map.unmapped,
        }
    }
}

/// Display name and color of one reduced category.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LegendEntry {
    pub code: CategoryCode,
    pub name: String,
    pub color: String,
}

impl LegendEntry {
    pub fn new(code: u8, name: impl Into<String>, color: impl Into<String>) -> Self {
        Self {
            code: CategoryCode(code),
            name: name.into(),
            color: color.into(),
        }
    }
}

/// Category labels keyed by category code.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "Vec<LegendEntry>", into = "Vec<LegendEntry>")]
pub struct Legend {
    entries: BTreeMap<CategoryCode, LegendEntry>,
}

impl Legend {
    pub fn new(entries: Vec<LegendEntry>) -> Result<Self, ClassificationError> {
        let mut map = BTreeMap::new();
        for entry in entries {
            if !is_hex_color(&entry.color) {
                return Err(ClassificationError::InvalidColor {
                    code: entry.code,
                    color: entry.color,
                });
            }
            let code = entry.code;
            if map.insert(code, entry).is_some() {
                return Err(ClassificationError::DuplicateLegendEntry(code));
            }
        }
        Ok(Self { entries: map })
    }

    pub fn mapbiomas_default() -> Self {
        Self::new(vec![
            LegendEntry::new(0, "Não Observado", "#ffffff"),
            LegendEntry::new(1, "Floresta", "#1f8d49"),
            LegendEntry::new(2, "Vegetação Herbácea", "#d6bc74"),
            LegendEntry::new(3, "Agropecuária", "#ffefc3"),
            LegendEntry::new(4, "Área não Vegetada", "#d4271e"),
            LegendEntry::new(5, "Corpo D'água", "#2532e4"),
            LegendEntry::new(6, "Não Observado", "#ffffff"),
        ])
        .expect("built-in MapBiomas legend is valid")
    }

    pub fn entry(&self, code: CategoryCode) -> Option<&LegendEntry> {
        self.entries.get(&code)
    }

    pub fn entries(&self) -> impl Iterator<Item = &LegendEntry> {
        self.entries.values()
    }

    pub fn codes(&self) -> Vec<CategoryCode> {
        self.entries.keys().copied().collect()
    }

    /// Label for a category; unknown categories get a generic `Classe N` name.
    pub fn name_for(&self, code: CategoryCode) -> String {
        self.entry(code)
            .map(|e| e.name.clone())
            .unwrap_or_else(|| format!("Classe {}", code))
    }

    /// Color for a class name, as used by name-keyed charts.
    pub fn color_for_name(&self, name: &str) -> &str {
        self.entries
            .values()
            .find(|e| e.name == name)
            .map(|e| e.color.as_str())
            .unwrap_or(FALLBACK_COLOR)
    }

    pub fn min_code(&self) -> Option<CategoryCode> {
        self.entries.keys().next().copied()
    }

    pub fn max_code(&self) -> Option<CategoryCode> {
        self.entries.keys().next_back().copied()
    }

    /// Palette indexed by category value from `min_code` to `max_code`.
    pub fn palette(&self) -> Vec<String> {
        let (Some(min), Some(max)) = (self.min_code(), self.max_code()) else {
            return Vec::new();
        };
        (min.0..=max.0)
            .map(|code| {
                self.entry(CategoryCode(code))
                    .map(|e| e.color.clone())
                    .unwrap_or_else(|| FALLBACK_COLOR.to_string())
            })
            .collect()
    }

    /// Every category the code map can produce must have an entry here.
    pub fn validate_covers(&self, map: &ClassificationCodeMap) -> Result<(), ClassificationError> {
        for code in map.target_codes() {
            if !self.entries.contains_key(&code) {
                return Err(ClassificationError::MissingLegendEntry(code));
            }
        }
        Ok(())
    }
}

impl TryFrom<Vec<LegendEntry>> for Legend {
    type Error = ClassificationError;

    fn try_from(entries: Vec<LegendEntry>) -> Result<Self, Self::Error> {
        Self::new(entries)
    }
}

impl From<Legend> for Vec<LegendEntry> {
    fn from(legend: Legend) -> Self {
        legend.entries.into_values().collect()
    }
}

fn is_hex_color(color: &str) -> bool {
    color.len() == 7
        && color.starts_with('#')
        && color[1..].chars().all(|c| c.is_ascii_hexdigit())
}
