//! Volume Epoch Tracking
//!
//! R7 and R8 hold 14 daily buckets of transmuted ERG volume, one per
//! direction. Bucket 0 is the day anchored at R9; older days follow. Every
//! transmutation rolls both arrays forward by the days elapsed since the
//! anchor and adds its own volume to bucket 0 of the acting direction.

use gluon_core::{BlockHeight, ProtocolError};
use serde::{Deserialize, Serialize};

use crate::constants::{BLOCKS_PER_DAY, BUCKET_LEN};

/// Whole days elapsed between `anchor` and `height`, clamped to `0..=BUCKET_LEN`
pub fn days_passed(height: BlockHeight, anchor: BlockHeight) -> usize {
    let days = height.saturating_sub(anchor) / BLOCKS_PER_DAY;
    days.min(BUCKET_LEN as u64) as usize
}

/// Start of the day containing `height`; stamped into R9 by transmutations
pub fn epoch_anchor(height: BlockHeight) -> BlockHeight {
    (height / BLOCKS_PER_DAY) * BLOCKS_PER_DAY
}

/// Fixed window of daily ERG volumes, most recent day first
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct VolumeBuckets(pub [i64; BUCKET_LEN]);

impl VolumeBuckets {
    /// Build from a decoded register, which must hold exactly `BUCKET_LEN` entries
    pub fn from_slice(values: &[i64]) -> Result<Self, ProtocolError> {
        let buckets: [i64; BUCKET_LEN] =
            values.try_into().map_err(|_| ProtocolError::BoxParseError {
                message: format!(
                    "Volume register must hold {} buckets, found {}",
                    BUCKET_LEN,
                    values.len()
                ),
            })?;
        Ok(Self(buckets))
    }

    pub fn as_slice(&self) -> &[i64] {
        &self.0
    }

    /// Shift right by `days`, dropping the oldest buckets and zero-filling the front
    pub fn rolled(&self, days: usize) -> Self {
        let days = days.min(BUCKET_LEN);
        let mut out = [0i64; BUCKET_LEN];
        out[days..].copy_from_slice(&self.0[..BUCKET_LEN - days]);
        Self(out)
    }

    /// Roll to `height` relative to `anchor`, then add `volume` to today's bucket
    pub fn advanced(&self, height: BlockHeight, anchor: BlockHeight, volume: i64) -> Self {
        let mut out = self.rolled(days_passed(height, anchor));
        out.0[0] = out.0[0].saturating_add(volume);
        out
    }

    /// Total volume of the most recent `days` buckets
    pub fn accumulate(&self, days: usize) -> Result<i64, ProtocolError> {
        if days > BUCKET_LEN {
            return Err(ProtocolError::InvalidEpochRequest {
                requested: days,
                max: BUCKET_LEN,
            });
        }
        Ok(self.0[..days]
            .iter()
            .fold(0i64, |acc, v| acc.saturating_add(*v)))
    }

    /// Register encoding (`Coll[Long]`)
    pub fn to_register(&self) -> String {
        ergo_tx::encode_sigma_coll_long(&self.0)
    }
}

/// Bucket state written into a successor Gluon box by a transmutation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct EpochUpdate {
    /// New R7
    pub protons_to_neutrons: VolumeBuckets,
    /// New R8
    pub neutrons_to_protons: VolumeBuckets,
    /// New R9
    pub anchor: BlockHeight,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn buckets(head: &[i64]) -> VolumeBuckets {
        let mut values = [0i64; BUCKET_LEN];
        values[..head.len()].copy_from_slice(head);
        VolumeBuckets(values)
    }

    #[test]
    fn test_days_passed_clamps() {
        assert_eq!(days_passed(1_000, 1_000), 0);
        assert_eq!(days_passed(1_719, 1_000), 0);
        assert_eq!(days_passed(1_720, 1_000), 1);
        assert_eq!(days_passed(1_000 + 720 * 30, 1_000), BUCKET_LEN);
        // Anchor ahead of the chain tip counts as the same day
        assert_eq!(days_passed(500, 1_440), 0);
    }

    #[test]
    fn test_epoch_anchor() {
        assert_eq!(epoch_anchor(1_439), 720);
        assert_eq!(epoch_anchor(1_440), 1_440);
        assert_eq!(epoch_anchor(0), 0);
    }

    #[test]
    fn test_rolled_by_three_days() {
        let rolled = buckets(&[10, 5]).rolled(3);
        assert_eq!(rolled, buckets(&[0, 0, 0, 10, 5]));
        assert_eq!(rolled.as_slice().len(), BUCKET_LEN);
    }

    #[test]
    fn test_rolled_past_window_clears_everything() {
        let full = VolumeBuckets([7; BUCKET_LEN]);
        assert_eq!(full.rolled(BUCKET_LEN), VolumeBuckets::default());
        assert_eq!(full.rolled(99), VolumeBuckets::default());
        assert_eq!(full.rolled(0), full);
    }

    #[test]
    fn test_advanced_adds_to_today() {
        let anchor = 720 * 100;
        let start = buckets(&[10, 5]);

        let same_day = start.advanced(anchor + 719, anchor, 3);
        assert_eq!(same_day, buckets(&[13, 5]));

        let two_days_later = start.advanced(anchor + 2 * 720, anchor, 4);
        assert_eq!(two_days_later, buckets(&[4, 0, 10, 5]));
    }

    #[test]
    fn test_accumulate() {
        let b = buckets(&[1, 2, 3, 4]);
        assert_eq!(b.accumulate(0).unwrap(), 0);
        assert_eq!(b.accumulate(2).unwrap(), 3);
        assert_eq!(b.accumulate(BUCKET_LEN).unwrap(), 10);
    }

    #[test]
    fn test_accumulate_beyond_window_fails() {
        let err = VolumeBuckets::default().accumulate(15).unwrap_err();
        assert!(matches!(
            err,
            ProtocolError::InvalidEpochRequest {
                requested: 15,
                max: 14
            }
        ));
    }

    #[test]
    fn test_from_slice_rejects_wrong_length() {
        assert!(VolumeBuckets::from_slice(&[0; 13]).is_err());
        assert!(VolumeBuckets::from_slice(&[0; 15]).is_err());
        assert_eq!(
            VolumeBuckets::from_slice(&[0; BUCKET_LEN]).unwrap(),
            VolumeBuckets::default()
        );
    }

    #[test]
    fn test_register_round_trip() {
        let b = buckets(&[100, 0, 42]);
        let decoded = ergo_tx::decode_sigma_coll_long(&b.to_register()).unwrap();
        assert_eq!(VolumeBuckets::from_slice(&decoded).unwrap(), b);
    }
}
