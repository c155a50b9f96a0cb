//! Loop scheduling on top of Rayon.
//!
//! Every schedule is fork-join: the calling thread blocks until all
//! iterations have been written, so callers can read the output right after
//! `for_each_index` returns.

use crate::domain::model::Schedule;
use crate::utils::error::Result;
use rayon::prelude::*;
use std::ops::Range;

/// Split `0..len` into `threads` contiguous blocks of `len / threads`
/// elements. The last block also takes the remainder.
pub fn partition(len: usize, threads: usize) -> Vec<Range<usize>> {
    let threads = threads.max(1);
    let thread_work = len / threads;

    (0..threads)
        .map(|thread_id| {
            let offset = thread_id * thread_work;
            let end = if thread_id == threads - 1 {
                len
            } else {
                offset + thread_work
            };
            offset..end
        })
        .collect()
}

impl Schedule {
    /// Write `f(i)` into `out[i]` for every index.
    pub fn for_each_index<F>(&self, out: &mut [i64], f: F)
    where
        F: Fn(usize) -> i64 + Sync,
    {
        match *self {
            Schedule::Sequential => {
                for (i, slot) in out.iter_mut().enumerate() {
                    *slot = f(i);
                }
            }
            Schedule::ParallelFor => {
                out.par_iter_mut()
                    .enumerate()
                    .for_each(|(i, slot)| *slot = f(i));
            }
            Schedule::Partitioned { threads } => {
                let ranges = partition(out.len(), threads);
                let f = &f;

                rayon::scope(|scope| {
                    let mut rest = out;
                    for range in ranges {
                        let (block, tail) = std::mem::take(&mut rest).split_at_mut(range.len());
                        rest = tail;
                        scope.spawn(move |_| {
                            for (j, slot) in block.iter_mut().enumerate() {
                                *slot = f(range.start + j);
                            }
                        });
                    }
                });
            }
        }
    }
}

/// Build a dedicated pool. `threads == 0` keeps Rayon's default sizing.
pub fn build_pool(threads: usize) -> Result<rayon::ThreadPool> {
    let mut builder =
        rayon::ThreadPoolBuilder::new().thread_name(|index| format!("parloop-worker-{}", index));
    if threads > 0 {
        builder = builder.num_threads(threads);
    }
    Ok(builder.build()?)
}

/// Threads a parallel region would get when started from the current context.
pub fn team_size() -> usize {
    rayon::current_num_threads()
}

pub fn cpu_summary() -> String {
    format!(
        "CPU ({} logical / {} physical cores)",
        num_cpus::get(),
        num_cpus::get_physical()
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partition_covers_range_in_order() {
        for (len, threads) in [(100, 4), (10, 3), (7, 8), (0, 2), (1, 1)] {
            let ranges = partition(len, threads);
            assert_eq!(ranges.len(), threads);
            assert_eq!(ranges.first().unwrap().start, 0);
            assert_eq!(ranges.last().unwrap().end, len);
            for pair in ranges.windows(2) {
                assert_eq!(pair[0].end, pair[1].start);
            }
        }
    }

    #[test]
    fn test_partition_last_block_takes_remainder() {
        let ranges = partition(10, 3);
        assert_eq!(ranges, vec![0..3, 3..6, 6..10]);

        // 執行緒比元素多時，前面的區塊為空
        let ranges = partition(3, 5);
        assert_eq!(ranges, vec![0..0, 0..0, 0..0, 0..0, 0..3]);
    }

    #[test]
    fn test_partition_zero_threads_is_one_block() {
        assert_eq!(partition(42, 0), vec![0..42]);
    }

    #[test]
    fn test_schedules_agree() {
        let size = 1_003;
        let expected: Vec<i64> = (0..size as i64).map(|i| i * i - 7).collect();

        for schedule in [
            Schedule::Sequential,
            Schedule::ParallelFor,
            Schedule::Partitioned { threads: 1 },
            Schedule::Partitioned { threads: 4 },
            Schedule::Partitioned { threads: 17 },
        ] {
            let mut out = vec![0; size];
            schedule.for_each_index(&mut out, |i| (i as i64) * (i as i64) - 7);
            assert_eq!(out, expected, "schedule {}", schedule);
        }
    }

    #[test]
    fn test_build_pool_with_fixed_threads() {
        let pool = build_pool(3).unwrap();
        assert_eq!(pool.current_num_threads(), 3);
        assert_eq!(pool.install(team_size), 3);
    }
}
