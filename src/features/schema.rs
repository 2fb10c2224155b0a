//! Fixed feature-column layout
//!
//! ```text
//! [contrast_left, contrast_right,
//!  total_spikes.<area>  x |areas|,
//!  early_rate.<area>    x |areas|,
//!  late_rate.<area>     x |areas|]
//! ```
//!
//! The name→index lookup is built once per vocabulary, never per row.

use rustc_hash::FxHashMap;

use crate::vocabulary::AreaVocabulary;

/// Column name of the left contrast feature.
pub const CONTRAST_LEFT: &str = "contrast_left";
/// Column name of the right contrast feature.
pub const CONTRAST_RIGHT: &str = "contrast_right";
/// Number of stimulus columns preceding the per-area blocks.
pub const STIMULUS_COLUMNS: usize = 2;

/// Per-area feature family.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AreaFeature {
    /// Summed spike count over the trial window
    TotalSpikes,
    /// Mean per-neuron rate in the early half
    EarlyRate,
    /// Mean per-neuron rate in the late half
    LateRate,
}

impl AreaFeature {
    /// Families in column-block order.
    pub const ALL: [Self; 3] = [Self::TotalSpikes, Self::EarlyRate, Self::LateRate];

    /// Column-name prefix.
    #[must_use]
    pub const fn prefix(self) -> &'static str {
        match self {
            Self::TotalSpikes => "total_spikes",
            Self::EarlyRate => "early_rate",
            Self::LateRate => "late_rate",
        }
    }

    const fn block(self) -> usize {
        match self {
            Self::TotalSpikes => 0,
            Self::EarlyRate => 1,
            Self::LateRate => 2,
        }
    }

    /// Column name for an area, e.g. `early_rate.CA1`.
    #[must_use]
    pub fn column_name(self, area: &str) -> String {
        format!("{}.{area}", self.prefix())
    }

    /// Split a column name back into family and area label.
    #[must_use]
    pub fn parse_column(name: &str) -> Option<(Self, &str)> {
        let (prefix, area) = name.split_once('.')?;
        let feature = Self::ALL.into_iter().find(|f| f.prefix() == prefix)?;
        Some((feature, area))
    }
}

/// Feature-column layout for one frozen vocabulary.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeatureSchema {
    areas: usize,
    names: Vec<String>,
    index: FxHashMap<String, usize>,
}

impl FeatureSchema {
    /// Lay out columns for a vocabulary.
    #[must_use]
    pub fn new(vocabulary: &AreaVocabulary) -> Self {
        let mut names = Vec::with_capacity(Self::width_for(vocabulary.len()));
        names.push(CONTRAST_LEFT.to_string());
        names.push(CONTRAST_RIGHT.to_string());
        for feature in AreaFeature::ALL {
            names.extend(vocabulary.iter().map(|area| feature.column_name(area)));
        }

        let index = names
            .iter()
            .enumerate()
            .map(|(i, name)| (name.clone(), i))
            .collect();

        Self {
            areas: vocabulary.len(),
            names,
            index,
        }
    }

    /// Feature-vector width for a vocabulary of `areas` labels: `2 + 3 * areas`.
    #[must_use]
    pub const fn width_for(areas: usize) -> usize {
        STIMULUS_COLUMNS + 3 * areas
    }

    /// Number of feature columns.
    #[must_use]
    pub fn width(&self) -> usize {
        self.names.len()
    }

    /// Number of areas the schema was built for.
    #[must_use]
    pub const fn area_count(&self) -> usize {
        self.areas
    }

    /// Column names in order.
    #[must_use]
    pub fn names(&self) -> &[String] {
        &self.names
    }

    /// Column position by name.
    #[must_use]
    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.index.get(name).copied()
    }

    /// Column position of an area feature, by vocabulary index.
    #[must_use]
    pub const fn column(&self, feature: AreaFeature, area_index: usize) -> usize {
        STIMULUS_COLUMNS + feature.block() * self.areas + area_index
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_layout() {
        let vocab = AreaVocabulary::from_labels(["CA1", "root", "DG"]);
        let schema = FeatureSchema::new(&vocab);

        assert_eq!(schema.width(), 11);
        assert_eq!(schema.names()[0], CONTRAST_LEFT);
        assert_eq!(schema.names()[2], "total_spikes.CA1");
        assert_eq!(schema.names()[5], "early_rate.CA1");
        assert_eq!(schema.names()[10], "late_rate.DG");
        assert_eq!(schema.column(AreaFeature::EarlyRate, 1), 6);
        assert_eq!(schema.index_of("early_rate.root"), Some(6));
        assert_eq!(schema.index_of("session_id"), None);
    }

    #[test]
    fn test_empty_vocabulary_has_stimulus_columns_only() {
        let schema = FeatureSchema::new(&AreaVocabulary::from_labels(Vec::<String>::new()));
        assert_eq!(schema.width(), 2);
        assert_eq!(FeatureSchema::width_for(0), 2);
    }

    #[test]
    fn test_parse_column() {
        assert_eq!(
            AreaFeature::parse_column("late_rate.VISp"),
            Some((AreaFeature::LateRate, "VISp"))
        );
        assert_eq!(AreaFeature::parse_column("contrast_left"), None);
        assert_eq!(AreaFeature::parse_column("mean_rate.CA1"), None);
    }
}
