//! Premium rating tables
//!
//! Pure lookups from coverage level, liability option and guest count to
//! whole-dollar premiums. Nothing here touches storage; the quote service
//! calls [`PremiumBreakdown::compute`] whenever a rating field changes.

use serde::{Deserialize, Serialize};

use crate::model::quote::LiabilityOption;

/// Base premium per coverage level, index 0 is level 1.
const BASE_PREMIUMS: [i64; 10] = [160, 200, 250, 300, 355, 450, 600, 750, 900, 1025];

/// Liquor liability premium per guest bucket, ascending.
const LIQUOR_PREMIUMS: [i64; 8] = [65, 65, 85, 85, 100, 100, 150, 150];

/// One of the eight guest-count ranges used to price liquor liability.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum GuestBucket {
    UpTo50,
    UpTo100,
    UpTo150,
    UpTo200,
    UpTo250,
    UpTo300,
    UpTo350,
    UpTo400,
}

impl GuestBucket {
    pub const ALL: [GuestBucket; 8] = [
        GuestBucket::UpTo50,
        GuestBucket::UpTo100,
        GuestBucket::UpTo150,
        GuestBucket::UpTo200,
        GuestBucket::UpTo250,
        GuestBucket::UpTo300,
        GuestBucket::UpTo350,
        GuestBucket::UpTo400,
    ];

    /// Inclusive upper bound of the range.
    pub fn upper_bound(self) -> u32 {
        (self.index() as u32 + 1) * 50
    }

    fn index(self) -> usize {
        self as usize
    }
}

pub fn guest_bucket_of(max_guests: u32) -> Option<GuestBucket> {
    GuestBucket::ALL
        .into_iter()
        .find(|bucket| max_guests <= bucket.upper_bound())
}

pub fn base_premium(coverage_level: Option<u8>) -> i64 {
    match coverage_level {
        Some(level @ 1..=10) => BASE_PREMIUMS[(level - 1) as usize],
        _ => 0,
    }
}

pub fn liability_premium(option: Option<LiabilityOption>) -> i64 {
    match option {
        Some(LiabilityOption::Option1) => 165,
        Some(LiabilityOption::Option2) => 180,
        Some(LiabilityOption::Option3) => 200,
        Some(LiabilityOption::NoCoverage) | None => 0,
    }
}

pub fn liquor_liability_premium(enabled: bool, bucket: Option<GuestBucket>) -> i64 {
    match (enabled, bucket) {
        (true, Some(bucket)) => LIQUOR_PREMIUMS[bucket.index()],
        _ => 0,
    }
}

/// The rating fields a premium depends on.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PremiumInputs {
    pub coverage_level: Option<u8>,
    pub liability: Option<LiabilityOption>,
    pub liquor_liability: bool,
    pub max_guests: Option<u32>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PremiumBreakdown {
    pub base_premium: i64,
    pub liability_premium: i64,
    pub liquor_liability_premium: i64,
    pub total_premium: i64,
}

impl PremiumBreakdown {
    /// Always computes every component and sums them fresh.
    pub fn compute(inputs: PremiumInputs) -> Self {
        let base_premium = base_premium(inputs.coverage_level);
        let liability_premium = liability_premium(inputs.liability);
        let bucket = inputs.max_guests.and_then(guest_bucket_of);
        let liquor_liability_premium = liquor_liability_premium(inputs.liquor_liability, bucket);
        PremiumBreakdown {
            base_premium,
            liability_premium,
            liquor_liability_premium,
            total_premium: base_premium + liability_premium + liquor_liability_premium,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_base_premium_table_edges() {
        assert_eq!(base_premium(Some(1)), 160);
        assert_eq!(base_premium(Some(5)), 355);
        assert_eq!(base_premium(Some(10)), 1025);
        assert_eq!(base_premium(None), 0);
        assert_eq!(base_premium(Some(0)), 0);
        assert_eq!(base_premium(Some(11)), 0);
    }

    #[test]
    fn test_liability_premium_options() {
        assert_eq!(liability_premium(Some(LiabilityOption::NoCoverage)), 0);
        assert_eq!(liability_premium(Some(LiabilityOption::Option1)), 165);
        assert_eq!(liability_premium(Some(LiabilityOption::Option2)), 180);
        assert_eq!(liability_premium(Some(LiabilityOption::Option3)), 200);
        assert_eq!(liability_premium(None), 0);
    }

    #[test]
    fn test_guest_bucket_boundaries() {
        assert_eq!(guest_bucket_of(0), Some(GuestBucket::UpTo50));
        assert_eq!(guest_bucket_of(50), Some(GuestBucket::UpTo50));
        assert_eq!(guest_bucket_of(51), Some(GuestBucket::UpTo100));
        assert_eq!(guest_bucket_of(120), Some(GuestBucket::UpTo150));
        assert_eq!(guest_bucket_of(300), Some(GuestBucket::UpTo300));
        assert_eq!(guest_bucket_of(400), Some(GuestBucket::UpTo400));
        assert_eq!(guest_bucket_of(401), None);
    }

    #[test]
    fn test_liquor_premium_requires_flag_and_bucket() {
        assert_eq!(liquor_liability_premium(false, Some(GuestBucket::UpTo400)), 0);
        assert_eq!(liquor_liability_premium(true, None), 0);
        assert_eq!(liquor_liability_premium(true, Some(GuestBucket::UpTo150)), 85);
        assert_eq!(liquor_liability_premium(true, Some(GuestBucket::UpTo300)), 100);
    }

    #[test]
    fn test_breakdown_matches_reference_quote() {
        let breakdown = PremiumBreakdown::compute(PremiumInputs {
            coverage_level: Some(5),
            liability: Some(LiabilityOption::Option2),
            liquor_liability: true,
            max_guests: Some(120),
        });
        assert_eq!(breakdown.base_premium, 355);
        assert_eq!(breakdown.liability_premium, 180);
        assert_eq!(breakdown.liquor_liability_premium, 85);
        assert_eq!(breakdown.total_premium, 620);
    }

    #[test]
    fn test_guests_over_limit_price_no_liquor() {
        let breakdown = PremiumBreakdown::compute(PremiumInputs {
            coverage_level: Some(1),
            liability: Some(LiabilityOption::Option1),
            liquor_liability: true,
            max_guests: Some(450),
        });
        assert_eq!(breakdown.liquor_liability_premium, 0);
        assert_eq!(breakdown.total_premium, 325);
    }

    fn liability_strategy() -> impl Strategy<Value = Option<LiabilityOption>> {
        prop_oneof![
            Just(None),
            Just(Some(LiabilityOption::NoCoverage)),
            Just(Some(LiabilityOption::Option1)),
            Just(Some(LiabilityOption::Option2)),
            Just(Some(LiabilityOption::Option3)),
        ]
    }

    proptest! {
        #[test]
        fn total_is_sum_of_components(
            level in proptest::option::of(0u8..=12),
            liability in liability_strategy(),
            liquor in any::<bool>(),
            guests in proptest::option::of(0u32..=600),
        ) {
            let b = PremiumBreakdown::compute(PremiumInputs {
                coverage_level: level,
                liability,
                liquor_liability: liquor,
                max_guests: guests,
            });
            prop_assert_eq!(b.total_premium, b.base_premium + b.liability_premium + b.liquor_liability_premium);
        }

        #[test]
        fn same_bucket_prices_the_same(g1 in 0u32..=400, g2 in 0u32..=400) {
            let (b1, b2) = (guest_bucket_of(g1), guest_bucket_of(g2));
            if b1 == b2 {
                prop_assert_eq!(liquor_liability_premium(true, b1), liquor_liability_premium(true, b2));
            }
        }

        #[test]
        fn liquor_premium_is_non_decreasing(g1 in 0u32..=400, g2 in 0u32..=400) {
            let (lo, hi) = if g1 <= g2 { (g1, g2) } else { (g2, g1) };
            prop_assert!(
                liquor_liability_premium(true, guest_bucket_of(lo))
                    <= liquor_liability_premium(true, guest_bucket_of(hi))
            );
        }
    }
}
