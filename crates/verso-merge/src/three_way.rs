//! Classification of one unit's three states.

use crate::resolver::Choice;

/// How a unit changed across Original, Latest and Mine.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Classification {
    /// All three states are equal.
    Unchanged,
    /// Only one side changed; take that side.
    OneSided(Choice),
    /// Both sides changed the same way.
    Convergent,
    /// Both sides changed, differently.
    Divergent,
}

/// Classify a unit from its three states. `None` means absent.
pub fn classify<T: PartialEq + ?Sized>(original: Option<&T>, latest: Option<&T>, mine: Option<&T>) -> Classification {
    match (latest == original, mine == original) {
        (true, true) => Classification::Unchanged,
        (true, false) => Classification::OneSided(Choice::Mine),
        (false, true) => Classification::OneSided(Choice::Latest),
        (false, false) if latest == mine => Classification::Convergent,
        (false, false) => Classification::Divergent,
    }
}

/// The state a choice selects.
pub(crate) fn pick<T>(choice: Choice, original: T, latest: T, mine: T) -> T {
    match choice {
        Choice::Original => original,
        Choice::Latest => latest,
        Choice::Mine => mine,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn the_five_cases() {
        assert_eq!(classify(Some(&1), Some(&1), Some(&1)), Classification::Unchanged);
        assert_eq!(classify(Some(&1), Some(&3), Some(&1)), Classification::OneSided(Choice::Latest));
        assert_eq!(classify(Some(&1), Some(&1), None), Classification::OneSided(Choice::Mine));
        assert_eq!(classify(None, Some(&2), Some(&2)), Classification::Convergent);
        assert_eq!(classify(Some(&1), None, Some(&5)), Classification::Divergent);
    }

    #[test]
    fn absence_on_both_sides_is_convergent() {
        assert_eq!(classify::<i32>(Some(&1), None, None), Classification::Convergent);
        assert_eq!(classify::<i32>(None, None, None), Classification::Unchanged);
    }

    #[test]
    fn works_on_unsized_values() {
        assert_eq!(classify::<str>(Some("a"), Some("b"), Some("c")), Classification::Divergent);
    }

    proptest! {
        #[test]
        fn symmetric_in_latest_and_mine(o in proptest::option::of(0u8..4), l in proptest::option::of(0u8..4), m in proptest::option::of(0u8..4)) {
            let forward = classify(o.as_ref(), l.as_ref(), m.as_ref());
            let swapped = classify(o.as_ref(), m.as_ref(), l.as_ref());
            let mirrored = match forward {
                Classification::OneSided(Choice::Latest) => Classification::OneSided(Choice::Mine),
                Classification::OneSided(Choice::Mine) => Classification::OneSided(Choice::Latest),
                other => other,
            };
            prop_assert_eq!(swapped, mirrored);
        }

        #[test]
        fn one_sided_pick_is_the_changed_state(o in proptest::option::of(0u8..4), l in proptest::option::of(0u8..4), m in proptest::option::of(0u8..4)) {
            if let Classification::OneSided(side) = classify(o.as_ref(), l.as_ref(), m.as_ref()) {
                let taken = pick(side, o, l, m);
                prop_assert_ne!(taken, o);
            }
        }
    }
}
