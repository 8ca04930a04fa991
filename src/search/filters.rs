//! Search filter facets and their cross-product generation.
//!
//! A work unit is a (query, filter-combination) pair. The combination list
//! is generated once per run from the enabled facet axes; its order must
//! stay stable between resumes of the same checkpoint, so the enum variant
//! order below is load-bearing.

use serde::{Deserialize, Serialize};

/// Date-window facet restricting results by recency.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DateRestrict {
    /// Past 30 days.
    PastMonth,
    /// Past six months.
    PastSixMonths,
    /// Past year.
    PastYear,
    /// Past five years.
    PastFiveYears,
}

impl DateRestrict {
    /// All date windows, in generation order.
    pub const ALL: [Self; 4] = [
        Self::PastMonth,
        Self::PastSixMonths,
        Self::PastYear,
        Self::PastFiveYears,
    ];

    /// Wire value for the `dateRestrict` request parameter.
    #[must_use]
    pub fn as_param(self) -> &'static str {
        match self {
            Self::PastMonth => "d30",
            Self::PastSixMonths => "m6",
            Self::PastYear => "y1",
            Self::PastFiveYears => "y5",
        }
    }
}

/// Image-size facet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ImageSize {
    /// Large images.
    Large,
    /// Extra-large images.
    XLarge,
    /// Double-extra-large images.
    XxLarge,
    /// Huge images.
    Huge,
}

impl ImageSize {
    /// All size classes, in generation order.
    pub const ALL: [Self; 4] = [Self::Large, Self::XLarge, Self::XxLarge, Self::Huge];

    /// Wire value for the `imgSize` request parameter.
    #[must_use]
    pub fn as_param(self) -> &'static str {
        match self {
            Self::Large => "large",
            Self::XLarge => "xlarge",
            Self::XxLarge => "xxlarge",
            Self::Huge => "huge",
        }
    }
}

/// An optional pair of orthogonal search facets.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilterCombination {
    /// Date window, when the date axis is enabled.
    pub date_restrict: Option<DateRestrict>,
    /// Size class, when the size axis is enabled.
    pub image_size: Option<ImageSize>,
}

impl FilterCombination {
    /// Generates the full cross product of the enabled facet axes.
    ///
    /// When neither axis is enabled the result is a single empty
    /// combination, so every query still yields one work unit.
    #[must_use]
    pub fn generate(use_date_filters: bool, use_size_filters: bool) -> Vec<Self> {
        let dates: Vec<Option<DateRestrict>> = if use_date_filters {
            DateRestrict::ALL.iter().copied().map(Some).collect()
        } else {
            vec![None]
        };
        let sizes: Vec<Option<ImageSize>> = if use_size_filters {
            ImageSize::ALL.iter().copied().map(Some).collect()
        } else {
            vec![None]
        };

        let mut combinations = Vec::with_capacity(dates.len() * sizes.len());
        for date_restrict in &dates {
            for image_size in &sizes {
                combinations.push(Self {
                    date_restrict: *date_restrict,
                    image_size: *image_size,
                });
            }
        }
        combinations
    }

    /// Human-readable form for logs and the no-results report.
    #[must_use]
    pub fn describe(&self) -> String {
        let mut parts = Vec::new();
        if let Some(date) = self.date_restrict {
            parts.push(format!("dateRestrict={}", date.as_param()));
        }
        if let Some(size) = self.image_size {
            parts.push(format!("imgSize={}", size.as_param()));
        }
        if parts.is_empty() {
            "no filters".to_string()
        } else {
            parts.join(", ")
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_both_axes_enabled_is_full_cross_product() {
        let combinations = FilterCombination::generate(true, true);
        assert_eq!(combinations.len(), 16);
        // Row-major: date outer, size inner.
        assert_eq!(
            combinations[0],
            FilterCombination {
                date_restrict: Some(DateRestrict::PastMonth),
                image_size: Some(ImageSize::Large),
            }
        );
        assert_eq!(
            combinations[15],
            FilterCombination {
                date_restrict: Some(DateRestrict::PastFiveYears),
                image_size: Some(ImageSize::Huge),
            }
        );
    }

    #[test]
    fn test_single_axis_enabled() {
        let date_only = FilterCombination::generate(true, false);
        assert_eq!(date_only.len(), 4);
        assert!(date_only.iter().all(|c| c.image_size.is_none()));

        let size_only = FilterCombination::generate(false, true);
        assert_eq!(size_only.len(), 4);
        assert!(size_only.iter().all(|c| c.date_restrict.is_none()));
    }

    #[test]
    fn test_no_axes_yields_single_empty_combination() {
        let combinations = FilterCombination::generate(false, false);
        assert_eq!(combinations, vec![FilterCombination::default()]);
        assert_eq!(combinations[0].describe(), "no filters");
    }

    #[test]
    fn test_describe_lists_enabled_facets() {
        let combo = FilterCombination {
            date_restrict: Some(DateRestrict::PastMonth),
            image_size: Some(ImageSize::Huge),
        };
        assert_eq!(combo.describe(), "dateRestrict=d30, imgSize=huge");
    }

    #[test]
    fn test_generation_order_is_stable() {
        // Resume correctness depends on the list being identical across runs.
        let first = FilterCombination::generate(true, true);
        let second = FilterCombination::generate(true, true);
        assert_eq!(first, second);
    }
}
