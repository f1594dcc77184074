use super::MatchCollection;
use crate::models::{
    MatchRef,
    ScoreType,
};
use std::cell::Cell;
use std::ops::Deref;
use std::rc::Rc;

/// Read access to the matches of a collection. Holds the iterator lock
/// until dropped.
pub struct MatchGuard<'a> {
    matches: &'a [MatchRef],
    lock: Rc<Cell<usize>>,
}

impl<'a> MatchGuard<'a> {
    fn new(matches: &'a [MatchRef], lock: Rc<Cell<usize>>) -> Self {
        lock.set(lock.get() + 1);
        Self { matches, lock }
    }
}

impl Deref for MatchGuard<'_> {
    type Target = [MatchRef];

    fn deref(&self) -> &Self::Target {
        self.matches
    }
}

impl Drop for MatchGuard<'_> {
    fn drop(&mut self) {
        self.lock.set(self.lock.get().saturating_sub(1));
    }
}

/// Owning cursor over a snapshot of a collection's matches.
///
/// The collection stays locked against sorting, truncating and collapsing
/// until the cursor is dropped.
pub struct MatchIterator {
    matches: std::vec::IntoIter<MatchRef>,
    lock: Rc<Cell<usize>>,
}

impl Iterator for MatchIterator {
    type Item = MatchRef;

    fn next(&mut self) -> Option<Self::Item> {
        self.matches.next()
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.matches.size_hint()
    }
}

impl ExactSizeIterator for MatchIterator {}

impl Drop for MatchIterator {
    fn drop(&mut self) {
        self.lock.set(self.lock.get().saturating_sub(1));
    }
}

impl MatchCollection {
    pub fn iter(&self) -> MatchGuard<'_> {
        MatchGuard::new(&self.matches, self.iterator_lock.clone())
    }

    /// Sorts by `score_type`, then locks for reading.
    pub fn iter_by(&mut self, score_type: ScoreType) -> MatchGuard<'_> {
        self.sort(score_type);
        self.iter()
    }

    /// Matches ranked within the top `n` for the type the collection was
    /// last sorted by. Everything when the collection is not sorted by
    /// score.
    pub fn iter_top_n(&self, n: u32) -> impl Iterator<Item = &MatchRef> + '_ {
        let sorted_by = self.last_sorted_by();
        self.matches.iter().filter(move |m| match sorted_by {
            Some(t) => {
                let rank = m.borrow().rank(t);
                rank > 0 && rank <= n
            }
            None => true,
        })
    }

    /// A cursor that outlives borrows of the collection, optionally sorting
    /// first.
    pub fn match_iterator(&mut self, sort_by: Option<ScoreType>) -> MatchIterator {
        if let Some(t) = sort_by {
            self.sort(t);
        }
        let lock = self.iterator_lock.clone();
        lock.set(lock.get() + 1);
        MatchIterator {
            matches: self.matches.clone().into_iter(),
            lock,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::super::test_support::*;
    use super::*;

    #[test]
    fn test_guard_releases_lock() {
        let mc = collection_with(ScoreType::Xcorr, &[1.0, 2.0]);
        {
            let guard = mc.iter();
            assert_eq!(guard.len(), 2);
            assert!(mc.is_iterator_locked());
        }
        assert!(!mc.is_iterator_locked());
    }

    #[test]
    fn test_iterator_is_sorted_snapshot() {
        let mut mc = collection_with(ScoreType::Xcorr, &[1.0, 3.0, 2.0]);
        let it = mc.match_iterator(Some(ScoreType::Xcorr));
        assert!(mc.is_iterator_locked());
        let scores: Vec<f64> = it
            .map(|m| m.borrow().score(ScoreType::Xcorr).unwrap())
            .collect();
        assert_eq!(scores, vec![3.0, 2.0, 1.0]);
        assert!(!mc.is_iterator_locked());
        mc.truncate(1, ScoreType::Xcorr);
    }

    #[test]
    #[should_panic(expected = "while a match iterator is open")]
    fn test_sort_while_iterating_panics() {
        let mut mc = collection_with(ScoreType::Xcorr, &[1.0, 3.0]);
        let _it = mc.match_iterator(None);
        mc.sort(ScoreType::Xcorr);
    }

    #[test]
    fn test_iter_top_n() {
        let mut mc = collection_with(ScoreType::Xcorr, &[1.0, 3.0, 3.0, 2.0]);
        mc.populate_match_rank(ScoreType::Xcorr);
        assert_eq!(mc.iter_top_n(1).count(), 2);
        assert_eq!(mc.iter_top_n(2).count(), 3);
    }
}
