//! Abstract states and their join-semilattice structure.

use std::collections::BTreeSet;
use std::fmt;

/// The abstract state that is carried along the control flow graph
/// during dataflow analysis.
///
/// `join` must be commutative, associative and idempotent, with the
/// `bottom` value given to the solver as identity. The solver only
/// terminates if the lattice has no infinite ascending chain (or if
/// `join` widens), it does not bound the number of iterations itself.
pub trait AbstractState: Clone + Eq + fmt::Debug {
    /// The state join operation function (least upper bound).
    #[must_use]
    fn join(&self, other: &Self) -> Self;

    /// Returns true if `other` is below or equal to `self` in the
    /// lattice order.
    fn is_greater_than_or_equal(&self, other: &Self) -> bool {
        &self.join(other) == self
    }
}

/// Joins every given state, starting from `bottom`.
pub fn join_all<'s, S, I>(bottom: &S, states: I) -> S
where
    S: AbstractState + 's,
    I: IntoIterator<Item = &'s S>,
{
    states
        .into_iter()
        .fold(bottom.clone(), |acc, state| acc.join(state))
}

// Powerset lattice ordered by inclusion, the usual shape of "may" analyses.
impl<T> AbstractState for BTreeSet<T>
where
    T: Ord + Clone + fmt::Debug,
{
    fn join(&self, other: &Self) -> Self {
        self.union(other).cloned().collect()
    }

    fn is_greater_than_or_equal(&self, other: &Self) -> bool {
        other.is_subset(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::Parity;

    #[test]
    fn parity_join() {
        assert_eq!(Parity::Odd.join(&Parity::Even), Parity::Top);
        assert_eq!(Parity::Bottom.join(&Parity::Even), Parity::Even);
        assert_eq!(Parity::Odd.join(&Parity::Odd), Parity::Odd);
        assert_eq!(Parity::Top.join(&Parity::Bottom), Parity::Top);
    }

    #[test]
    fn join_is_idempotent() {
        for s in [Parity::Bottom, Parity::Odd, Parity::Even, Parity::Top] {
            assert_eq!(s.join(&s), s);
        }
        let set: BTreeSet<u32> = [1, 4].into_iter().collect();
        assert_eq!(set.join(&set), set);
    }

    #[test]
    fn order_follows_join() {
        assert!(Parity::Top.is_greater_than_or_equal(&Parity::Odd));
        assert!(Parity::Odd.is_greater_than_or_equal(&Parity::Bottom));
        assert!(!Parity::Odd.is_greater_than_or_equal(&Parity::Even));
        assert!(!Parity::Bottom.is_greater_than_or_equal(&Parity::Top));
    }

    #[test]
    fn set_lattice() {
        let a: BTreeSet<u32> = [1, 2].into_iter().collect();
        let b: BTreeSet<u32> = [2, 3].into_iter().collect();
        let ab = a.join(&b);
        assert_eq!(ab, [1, 2, 3].into_iter().collect());
        assert!(ab.is_greater_than_or_equal(&a));
        assert!(!a.is_greater_than_or_equal(&b));
    }

    #[test]
    fn join_all_from_bottom() {
        let states = [Parity::Odd, Parity::Odd];
        assert_eq!(join_all(&Parity::Bottom, &states), Parity::Odd);
        assert_eq!(join_all(&Parity::Bottom, &[]), Parity::Bottom);
        let states = [Parity::Odd, Parity::Bottom, Parity::Even];
        assert_eq!(join_all(&Parity::Bottom, &states), Parity::Top);
    }
}
