use std::cmp::Ordering;
use std::collections::BinaryHeap;

/// Which end of the value range a selection keeps.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum Keep
{
    Largest,
    Smallest,
}

impl Keep
{
    /// Map a value onto a scale where larger is always better.
    #[inline]
    fn rank(self, value: f64) -> f64
    {
        match self
        {
            Keep::Largest => value,
            Keep::Smallest => -value,
        }
    }
}

///
/// Pick at most `count` candidates whose value is strictly better than
/// `start`, keeping the best ones. Among equal values the earliest candidate
/// wins. NaN values never qualify. The result is in candidate order.
///
/// Runs in `O(n log count)`; when every candidate fits no heap is built.
///
pub(crate) fn select_best<K, I>(candidates: I, count: usize, start: f64, keep: Keep) -> Vec<(K, f64)>
    where I: IntoIterator<Item = (K, f64)>, I::IntoIter: ExactSizeIterator
{
    let candidates = candidates.into_iter();
    let floor = keep.rank(start);
    let fits_all = count >= candidates.len();
    let qualifying = candidates.filter(move |(_, value)| keep.rank(*value) > floor);
    if fits_all
    {
        return qualifying.collect();
    }
    if count == 0
    {
        return Vec::new();
    }
    let mut heap: BinaryHeap<Slot<K>> = BinaryHeap::with_capacity(count);
    for (arrival, (key, value)) in qualifying.enumerate()
    {
        // adding zero folds -0.0 into 0.0 so total_cmp treats them as a tie
        let slot = Slot { rank: keep.rank(value) + 0.0, arrival, key, value };
        if heap.len() < count
        {
            heap.push(slot);
        }
        else if let Some(mut worst) = heap.peek_mut()
        {
            if slot.rank > worst.rank
            {
                *worst = slot;
            }
        }
    }
    let mut kept = heap.into_vec();
    kept.sort_unstable_by_key(|slot| slot.arrival);
    kept.into_iter().map(|slot| (slot.key, slot.value)).collect()
}

struct Slot<K>
{
    rank: f64,
    arrival: usize,
    key: K,
    value: f64,
}

/// The heap top is the slot to evict next: lowest rank, latest among ties.
impl<K> Ord for Slot<K>
{
    fn cmp(&self, other: &Self) -> Ordering
    {
        other.rank.total_cmp(&self.rank).then(self.arrival.cmp(&other.arrival))
    }
}

impl<K> PartialOrd for Slot<K>
{
    fn partial_cmp(&self, other: &Self) -> Option<Ordering>
    {
        Some(self.cmp(other))
    }
}

impl<K> PartialEq for Slot<K>
{
    fn eq(&self, other: &Self) -> bool
    {
        self.cmp(other) == Ordering::Equal
    }
}

impl<K> Eq for Slot<K> {}

#[test]
fn test_select_largest()
{
    let candidates = vec![(0, 1.0), (1, 3.0), (2, 2.0), (3, 3.0), (4, 5.0)];
    let selected = select_best(candidates, 2, 0.0, Keep::Largest);
    assert_eq!(selected, vec![(1, 3.0), (4, 5.0)]);
}

#[test]
fn test_select_ties_keep_earliest()
{
    let candidates = vec![(0, 1.0), (1, 1.0), (2, 1.0)];
    assert_eq!(select_best(candidates, 2, 0.0, Keep::Largest), vec![(0, 1.0), (1, 1.0)]);
    let candidates = vec![(0, 2.0), (1, 1.0), (2, 1.0), (3, 0.5), (4, 1.0)];
    assert_eq!(select_best(candidates, 2, 0.0, Keep::Largest), vec![(0, 2.0), (1, 1.0)]);
    let candidates = vec![(0, 0.0), (1, -0.0), (2, 0.0)];
    assert_eq!(select_best(candidates, 1, f64::MAX, Keep::Smallest), vec![(0, 0.0)]);
}

#[test]
fn test_select_smallest_below_start()
{
    let candidates = vec![(7, 0.5), (8, f64::NAN), (9, 4.0)];
    assert_eq!(select_best(candidates, 3, 2.0, Keep::Smallest), vec![(7, 0.5)]);
    let candidates = vec![(7, 0.5), (8, f64::NAN), (9, 4.0), (10, 0.25)];
    assert_eq!(select_best(candidates, 1, 2.0, Keep::Smallest), vec![(10, 0.25)]);
    assert!(select_best(vec![(0, 1.0)], 0, 0.0, Keep::Largest).is_empty());
    assert!(select_best(vec![(0, 1.0), (1, 2.0)], 0, 0.0, Keep::Largest).is_empty());
    assert_eq!(select_best(vec![(0, 1.0)], usize::MAX, 0.0, Keep::Largest), vec![(0, 1.0)]);
}

#[test]
fn test_select_many_candidates()
{
    let n = 200_000usize;
    // distinct values in scrambled order
    let value = |i: usize| ((i * 7919) % n) as f64;
    let candidates: Vec<(usize, f64)> = (0..n).map(|i| (i, value(i))).collect();

    let selected = select_best(candidates.clone(), n / 2, -1.0, Keep::Largest);
    assert_eq!(selected.len(), n / 2);
    assert!(selected.iter().all(|&(_, v)| v >= (n / 2) as f64));
    assert!(selected.windows(2).all(|w| w[0].0 < w[1].0));

    let selected = select_best(candidates.clone(), 3, f64::MAX, Keep::Smallest);
    let mut values: Vec<f64> = selected.iter().map(|&(_, v)| v).collect();
    values.sort_by(f64::total_cmp);
    assert_eq!(values, vec![0.0, 1.0, 2.0]);

    assert_eq!(select_best(candidates, usize::MAX, f64::MAX, Keep::Smallest).len(), n);
}
