//! Per-year reclassification of the MapBiomas integration bands.

use std::sync::Arc;

use tracing::debug;

use crate::models::{year_band_name, BandExpr, ClassificationCodeMap, ImageStack, NamedBand};

/// Remap the `classification_{year}` band of every year and concatenate the
/// results into one stack, keeping the band names and the year order.
///
/// Nothing is evaluated here; each band is a lazy expression for the engine.
pub fn reclassify_bands(
    asset_id: &str,
    years: impl IntoIterator<Item = i32>,
    map: &Arc<ClassificationCodeMap>,
) -> ImageStack {
    let stack = ImageStack::cat(years.into_iter().map(|year| {
        let name = year_band_name(year);
        NamedBand {
            expr: BandExpr::asset(asset_id, name.clone()).remap(Arc::clone(map)),
            name,
        }
    }));
    debug!(asset = %asset_id, bands = stack.len(), "reclassified band stack built");
    stack
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{ClassCode, YearRange};
    use proptest::prelude::*;

    const ASSET: &str = "projects/mapbiomas-public/assets/brazil/lulc/collection9/mapbiomas_collection90_integration_v1";

    #[test]
    fn test_full_range_yields_39_ordered_bands() {
        let map = Arc::new(ClassificationCodeMap::mapbiomas_default());
        let stack = reclassify_bands(ASSET, YearRange::default().years(), &map);
        assert_eq!(stack.len(), 39);
        assert_eq!(stack.years(), (1985..=2023).collect::<Vec<_>>());
        assert_eq!(stack.bands()[0].name, "classification_1985");
        assert_eq!(stack.bands()[38].name, "classification_2023");
        for band in stack.bands() {
            assert_eq!(band.expr.source_band(), band.name);
            assert!(matches!(band.expr, BandExpr::Remap { .. }));
        }
    }

    #[test]
    fn test_selected_year_order_is_kept() {
        let map = Arc::new(ClassificationCodeMap::mapbiomas_default());
        let stack = reclassify_bands(ASSET, [2020, 1990, 2005], &map);
        assert_eq!(stack.years(), vec![2020, 1990, 2005]);
        assert!(stack.select_year(1990).is_some());
    }

    #[test]
    fn test_empty_year_list() {
        let map = Arc::new(ClassificationCodeMap::mapbiomas_default());
        assert!(reclassify_bands(ASSET, [], &map).is_empty());
    }

    proptest! {
        #[test]
        fn prop_remap_is_deterministic(values in proptest::collection::vec(any::<u8>(), 0..64)) {
            let map = ClassificationCodeMap::mapbiomas_default();
            let first = map.apply_values(&values).unwrap();
            let second = map.apply_values(&values).unwrap();
            prop_assert_eq!(first, second);
        }

        #[test]
        fn prop_remap_is_idempotent_when_targets_map_to_themselves(code in any::<u8>()) {
            // every target of this map is also a source mapping to itself
            let map = ClassificationCodeMap::new(&[0, 1, 2, 3, 10, 11], &[0, 1, 2, 3, 1, 2]).unwrap();
            let once = map.apply(ClassCode(code)).unwrap();
            let twice = map.apply(ClassCode(once.value())).unwrap();
            prop_assert_eq!(once, twice);
        }
    }
}
