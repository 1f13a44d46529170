use std::sync::Arc;

use crate::{AbrError, AbrResult, MediaTable, MediaType};

/// Read access to the quality ladder of each media type.
///
/// Index 0 is the lowest quality; bitrates ascend with the index. The ladder
/// itself is owned by the manifest layer.
#[cfg_attr(test, unimock::unimock(api = QualityLadderMock))]
pub trait QualityLadder {
    /// Number of representations available for `media_type`.
    fn variant_count(&self, media_type: MediaType) -> usize;

    /// Nominal bitrate in kbps of the representation at `index`.
    ///
    /// Returns `None` if the index is out of bounds.
    fn variant_bitrate_kbps(&self, media_type: MediaType, index: usize) -> Option<f64>;

    /// Highest index whose bitrate does not exceed `bitrate_kbps`, or 0 if
    /// every representation is above it.
    fn quality_for_bitrate(&self, media_type: MediaType, bitrate_kbps: f64) -> usize {
        (0..self.variant_count(media_type))
            .rev()
            .find(|&index| {
                self.variant_bitrate_kbps(media_type, index)
                    .is_some_and(|kbps| kbps <= bitrate_kbps)
            })
            .unwrap_or(0)
    }
}

impl<T: QualityLadder + ?Sized> QualityLadder for &T {
    fn variant_count(&self, media_type: MediaType) -> usize {
        (**self).variant_count(media_type)
    }

    fn variant_bitrate_kbps(&self, media_type: MediaType, index: usize) -> Option<f64> {
        (**self).variant_bitrate_kbps(media_type, index)
    }

    fn quality_for_bitrate(&self, media_type: MediaType, bitrate_kbps: f64) -> usize {
        (**self).quality_for_bitrate(media_type, bitrate_kbps)
    }
}

impl<T: QualityLadder + ?Sized> QualityLadder for Arc<T> {
    fn variant_count(&self, media_type: MediaType) -> usize {
        (**self).variant_count(media_type)
    }

    fn variant_bitrate_kbps(&self, media_type: MediaType, index: usize) -> Option<f64> {
        (**self).variant_bitrate_kbps(media_type, index)
    }

    fn quality_for_bitrate(&self, media_type: MediaType, bitrate_kbps: f64) -> usize {
        (**self).quality_for_bitrate(media_type, bitrate_kbps)
    }
}

/// Minimal representation information needed for ladder lookups.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Variant {
    pub variant_index: usize,
    pub bandwidth_bps: u64,
}

/// In-memory ladder, one ordered list of variants per media type.
#[derive(Clone, Debug, Default)]
pub struct Ladder {
    variants: MediaTable<Vec<Variant>>,
}

impl Ladder {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Install the variants of `media_type`.
    ///
    /// Variants must be listed by index `0..n` with non-decreasing bandwidth.
    pub fn with_variants(
        mut self,
        media_type: MediaType,
        variants: Vec<Variant>,
    ) -> AbrResult<Self> {
        let indexed = variants
            .iter()
            .enumerate()
            .all(|(position, v)| v.variant_index == position);
        let ascending = variants
            .windows(2)
            .all(|pair| pair[0].bandwidth_bps <= pair[1].bandwidth_bps);
        if !indexed || !ascending {
            return Err(AbrError::UnorderedLadder { media: media_type });
        }

        tracing::debug!(
            media = %media_type,
            variants = variants.len(),
            "quality ladder installed"
        );
        self.variants.insert(media_type, variants);
        Ok(self)
    }

    /// Build a ladder from plain bandwidth lists (bits per second).
    pub fn from_bandwidths(
        entries: impl IntoIterator<Item = (MediaType, Vec<u64>)>,
    ) -> AbrResult<Self> {
        entries
            .into_iter()
            .try_fold(Self::new(), |ladder, (media_type, bandwidths)| {
                let variants = bandwidths
                    .into_iter()
                    .enumerate()
                    .map(|(variant_index, bandwidth_bps)| Variant {
                        variant_index,
                        bandwidth_bps,
                    })
                    .collect();
                ladder.with_variants(media_type, variants)
            })
    }

    pub fn variants(&self, media_type: MediaType) -> &[Variant] {
        self.variants
            .get(media_type)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }
}

impl QualityLadder for Ladder {
    fn variant_count(&self, media_type: MediaType) -> usize {
        self.variants(media_type).len()
    }

    #[expect(clippy::cast_precision_loss)] // bitrate precision loss is negligible for ABR
    fn variant_bitrate_kbps(&self, media_type: MediaType, index: usize) -> Option<f64> {
        self.variants(media_type)
            .get(index)
            .map(|v| v.bandwidth_bps as f64 / 1000.0)
    }
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;

    fn ladder() -> Ladder {
        Ladder::from_bandwidths([(MediaType::Video, vec![256_000, 512_000, 1_024_000])]).unwrap()
    }

    #[rstest]
    #[case(100.0, 0, "below lowest falls back to lowest")]
    #[case(256.0, 0, "exact lowest")]
    #[case(511.9, 0, "just under second")]
    #[case(512.0, 1, "exact second")]
    #[case(900.0, 1, "between second and third")]
    #[case(5_000.0, 2, "above highest")]
    fn quality_for_bitrate_picks_highest_fitting(
        #[case] kbps: f64,
        #[case] expected: usize,
        #[case] _description: &str,
    ) {
        assert_eq!(ladder().quality_for_bitrate(MediaType::Video, kbps), expected);
    }

    #[test]
    fn empty_media_maps_to_zero() {
        let ladder = ladder();
        assert_eq!(ladder.variant_count(MediaType::Audio), 0);
        assert_eq!(ladder.quality_for_bitrate(MediaType::Audio, 10_000.0), 0);
    }

    #[test]
    fn variant_bitrate_is_reported_in_kbps() {
        let ladder = ladder();
        assert_eq!(ladder.variant_bitrate_kbps(MediaType::Video, 1), Some(512.0));
        assert_eq!(ladder.variant_bitrate_kbps(MediaType::Video, 3), None);
    }

    #[test]
    fn unordered_bandwidths_are_rejected() {
        let err = Ladder::from_bandwidths([(MediaType::Audio, vec![128_000, 64_000])]).unwrap_err();
        assert!(matches!(
            err,
            AbrError::UnorderedLadder {
                media: MediaType::Audio
            }
        ));
    }

    #[test]
    fn gaps_in_variant_indices_are_rejected() {
        let result = Ladder::new().with_variants(
            MediaType::Video,
            vec![
                Variant {
                    variant_index: 0,
                    bandwidth_bps: 100_000,
                },
                Variant {
                    variant_index: 2,
                    bandwidth_bps: 200_000,
                },
            ],
        );
        assert!(result.is_err());
    }

    #[test]
    fn shared_ladder_delegates() {
        let shared = Arc::new(ladder());
        assert_eq!(shared.quality_for_bitrate(MediaType::Video, 600.0), 1);
        assert_eq!((&*shared).variant_count(MediaType::Video), 3);
    }
}
