//! Coin change for a remaining balance
//!
//! Greedy over a fixed descending set of coins. For the coin set used here
//! greedy is optimal for every amount it can express; amounts that are not
//! a multiple of the smallest coin leave a remainder that is reported, not
//! dropped.

use types::numeric::Cents;

/// Coins in cents, largest first
pub const DENOMINATIONS: [u64; 5] = [100, 50, 20, 10, 5];

/// Lazy coin sequence for one amount, largest coin first.
///
/// Each call to [`change`] starts a fresh iterator; there is no shared state.
#[derive(Debug, Clone)]
pub struct ChangeIter {
    remaining: u64,
    index: usize,
}

impl ChangeIter {
    /// Amount not yet paid out. After exhaustion this is the part no coin
    /// can express.
    pub fn remainder(&self) -> Cents {
        Cents::new(self.remaining)
    }
}

impl Iterator for ChangeIter {
    type Item = u64;

    fn next(&mut self) -> Option<u64> {
        while let Some(&coin) = DENOMINATIONS.get(self.index) {
            if self.remaining >= coin {
                self.remaining -= coin;
                return Some(coin);
            }
            self.index += 1;
        }
        None
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        // Every coin is at least the smallest denomination.
        let upper = self.remaining / DENOMINATIONS[DENOMINATIONS.len() - 1];
        (0, Some(upper as usize))
    }
}

pub fn change(amount: Cents) -> ChangeIter {
    ChangeIter {
        remaining: amount.value(),
        index: 0,
    }
}

/// Collected coins plus whatever could not be paid out
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChangeBreakdown {
    pub coins: Vec<u64>,
    pub remainder: Cents,
}

pub fn make_change(amount: Cents) -> ChangeBreakdown {
    let mut iter = change(amount);
    let coins: Vec<u64> = iter.by_ref().collect();
    ChangeBreakdown {
        coins,
        remainder: iter.remainder(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_exact_denomination_is_single_coin() {
        let breakdown = make_change(Cents::new(50));
        assert_eq!(breakdown.coins, vec![50]);
        assert_eq!(breakdown.remainder, Cents::ZERO);
    }

    #[test]
    fn test_mixed_amount() {
        let breakdown = make_change(Cents::new(185));
        assert_eq!(breakdown.coins, vec![100, 50, 20, 10, 5]);
        assert_eq!(breakdown.remainder, Cents::ZERO);
    }

    #[test]
    fn test_uneven_amount_reports_remainder() {
        // 17 = 10 + 5 with 2 left over; there is no coin for it.
        let breakdown = make_change(Cents::new(17));
        assert_eq!(breakdown.coins, vec![10, 5]);
        assert_eq!(breakdown.remainder, Cents::new(2));
    }

    #[test]
    fn test_zero_amount() {
        let breakdown = make_change(Cents::ZERO);
        assert!(breakdown.coins.is_empty());
        assert_eq!(breakdown.remainder, Cents::ZERO);
    }

    #[test]
    fn test_iterator_is_lazy() {
        let mut iter = change(Cents::new(300));
        assert_eq!(iter.next(), Some(100));
        assert_eq!(iter.remainder(), Cents::new(200));
    }

    proptest! {
        #[test]
        fn coins_plus_remainder_equal_amount(amount in 0u64..1_000_000) {
            let breakdown = make_change(Cents::new(amount));
            let paid: u64 = breakdown.coins.iter().sum();
            prop_assert_eq!(paid + breakdown.remainder.value(), amount);
            prop_assert!(breakdown.remainder.value() < 5);
        }

        #[test]
        fn coins_are_non_increasing(amount in 0u64..1_000_000) {
            let coins = make_change(Cents::new(amount)).coins;
            prop_assert!(coins.windows(2).all(|w| w[0] >= w[1]));
        }

        #[test]
        fn repeated_calls_agree(amount in 0u64..1_000_000) {
            prop_assert_eq!(make_change(Cents::new(amount)), make_change(Cents::new(amount)));
        }

        #[test]
        fn coin_aligned_amounts_pay_out_fully(units in 0u64..200_000) {
            let breakdown = make_change(Cents::new(units * 5));
            prop_assert_eq!(breakdown.remainder, Cents::ZERO);
        }
    }
}
