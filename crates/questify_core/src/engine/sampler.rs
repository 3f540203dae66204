//! Daily quest sampling without replacement.

use crate::model::progress::AssignedTask;
use crate::model::task_pool::TaskPoolEntry;
use rand::Rng;

/// Draws `min(count, pool.len())` distinct pool entries uniformly at random.
///
/// Each drawn entry becomes a pending [`AssignedTask`] holding a copy of the
/// entry title. A sparse or empty pool yields fewer tasks instead of failing.
pub fn sample<R: Rng + ?Sized>(
    pool: &[TaskPoolEntry],
    count: usize,
    rng: &mut R,
) -> Vec<AssignedTask> {
    let amount = count.min(pool.len());
    if amount == 0 {
        return Vec::new();
    }

    rand::seq::index::sample(rng, pool.len(), amount)
        .into_iter()
        .map(|index| AssignedTask::pending(pool[index].title.clone()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::sample;
    use crate::model::task_pool::TaskPoolEntry;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;
    use std::collections::{HashMap, HashSet};

    fn pool(size: usize) -> Vec<TaskPoolEntry> {
        (0..size)
            .map(|i| TaskPoolEntry::new(format!("quest {i}"), "", 10))
            .collect()
    }

    #[test]
    fn draws_distinct_entries_from_pool() {
        let pool = pool(10);
        let titles: HashSet<_> = pool.iter().map(|entry| entry.title.clone()).collect();

        for seed in 0..200 {
            let mut rng = ChaCha8Rng::seed_from_u64(seed);
            let drawn = sample(&pool, 3, &mut rng);
            assert_eq!(drawn.len(), 3);

            let distinct: HashSet<_> = drawn.iter().map(|task| task.title.clone()).collect();
            assert_eq!(distinct.len(), 3, "duplicate quest with seed {seed}");
            assert!(distinct.is_subset(&titles));
            assert!(drawn.iter().all(|task| !task.completed));
        }
    }

    #[test]
    fn empty_pool_yields_empty_set() {
        let mut rng = ChaCha8Rng::seed_from_u64(7);
        assert!(sample(&[], 3, &mut rng).is_empty());
    }

    #[test]
    fn sparse_pool_returns_everything() {
        let pool = pool(2);
        let mut rng = ChaCha8Rng::seed_from_u64(7);
        let drawn = sample(&pool, 3, &mut rng);
        assert_eq!(drawn.len(), 2);
        let distinct: HashSet<_> = drawn.iter().map(|task| task.title.as_str()).collect();
        assert_eq!(distinct.len(), 2);
    }

    #[test]
    fn same_seed_same_draw() {
        let pool = pool(10);
        let first = sample(&pool, 3, &mut ChaCha8Rng::seed_from_u64(99));
        let second = sample(&pool, 3, &mut ChaCha8Rng::seed_from_u64(99));
        assert_eq!(first, second);
    }

    #[test]
    fn pool_is_left_untouched() {
        let pool = pool(5);
        let snapshot = pool.clone();
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        let _ = sample(&pool, 3, &mut rng);
        assert_eq!(pool, snapshot);
    }

    #[test]
    fn every_entry_gets_drawn_at_a_similar_rate() {
        let pool = pool(10);
        let mut rng = ChaCha8Rng::seed_from_u64(2024);
        let mut hits: HashMap<String, u32> = HashMap::new();

        for _ in 0..3_000 {
            for task in sample(&pool, 3, &mut rng) {
                *hits.entry(task.title).or_default() += 1;
            }
        }

        // Expected 900 hits per entry; allow a wide band.
        assert_eq!(hits.len(), 10);
        for (title, count) in hits {
            assert!((750..=1_050).contains(&count), "{title} drawn {count} times");
        }
    }
}
