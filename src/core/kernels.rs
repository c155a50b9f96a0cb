use crate::core::schedule::team_size;
use crate::domain::model::{FixtureKind, Schedule, Workspace};
use crate::domain::ports::Kernel;
use crate::utils::error::Result;

pub fn add(a: i64, b: i64) -> i64 {
    a.wrapping_add(b)
}

/// 非零代表偶數；`%` 向零截斷，負奇數得 2
pub fn is_even(num: i64) -> i64 {
    1 - (num % 2)
}

/// 64 位元環繞乘法，20! 之後會溢位
pub fn factorial(n: u64) -> i64 {
    let mut acc: i64 = 1;
    for j in 1..=n {
        acc = acc.wrapping_mul(j as i64);
    }
    acc
}

pub fn kernel_for(kind: FixtureKind) -> Box<dyn Kernel> {
    match kind {
        FixtureKind::AddArrays => Box::new(AddArrays),
        FixtureKind::ParallelFor => Box::new(ParallelFor),
        FixtureKind::ParallelRegion => Box::new(ParallelRegion),
        FixtureKind::PlusFunction => Box::new(PlusFunction),
        FixtureKind::Factorial => Box::new(Factorial),
        FixtureKind::FunctionIf => Box::new(FunctionIf),
    }
}

/// The schedule a fixture binary uses when run on its own.
pub fn default_schedule(kind: FixtureKind) -> Schedule {
    match kind {
        FixtureKind::ParallelRegion => Schedule::Partitioned {
            threads: team_size(),
        },
        _ => Schedule::ParallelFor,
    }
}

fn ones_and_twos(size: usize) -> Result<Workspace> {
    Workspace::new(size)?.with_input(|_| 1)?.with_input(|_| 2)
}

#[derive(Debug, Clone, Copy, Default)]
pub struct AddArrays;

impl Kernel for AddArrays {
    fn kind(&self) -> FixtureKind {
        FixtureKind::AddArrays
    }

    fn populate(&self, size: usize) -> Result<Workspace> {
        let n = size as i64;
        Workspace::new(size)?.with_input(|i| i)?.with_input(|i| n - i)
    }

    fn execute(&self, workspace: &mut Workspace, schedule: Schedule) {
        let (b, c) = (&workspace.inputs[0], &workspace.inputs[1]);
        schedule.for_each_index(&mut workspace.output, |i| add(b[i], c[i]));
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct ParallelFor;

impl Kernel for ParallelFor {
    fn kind(&self) -> FixtureKind {
        FixtureKind::ParallelFor
    }

    fn populate(&self, size: usize) -> Result<Workspace> {
        ones_and_twos(size)
    }

    fn execute(&self, workspace: &mut Workspace, schedule: Schedule) {
        let (a, b) = (&workspace.inputs[0], &workspace.inputs[1]);
        schedule.for_each_index(&mut workspace.output, |i| a[i].wrapping_add(b[i]));
    }
}

/// Same loop as [`ParallelFor`], but every parallel schedule is turned into
/// explicit thread-id/offset blocks.
#[derive(Debug, Clone, Copy, Default)]
pub struct ParallelRegion;

impl Kernel for ParallelRegion {
    fn kind(&self) -> FixtureKind {
        FixtureKind::ParallelRegion
    }

    fn populate(&self, size: usize) -> Result<Workspace> {
        ones_and_twos(size)
    }

    fn execute(&self, workspace: &mut Workspace, schedule: Schedule) {
        let schedule = match schedule {
            Schedule::ParallelFor => Schedule::Partitioned {
                threads: team_size(),
            },
            other => other,
        };
        let (a, b) = (&workspace.inputs[0], &workspace.inputs[1]);
        schedule.for_each_index(&mut workspace.output, |i| a[i].wrapping_add(b[i]));
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct PlusFunction;

impl Kernel for PlusFunction {
    fn kind(&self) -> FixtureKind {
        FixtureKind::PlusFunction
    }

    fn populate(&self, size: usize) -> Result<Workspace> {
        ones_and_twos(size)
    }

    fn execute(&self, workspace: &mut Workspace, schedule: Schedule) {
        let (a, b) = (&workspace.inputs[0], &workspace.inputs[1]);
        schedule.for_each_index(&mut workspace.output, |i| add(a[i], b[i]));
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct Factorial;

impl Kernel for Factorial {
    fn kind(&self) -> FixtureKind {
        FixtureKind::Factorial
    }

    fn populate(&self, size: usize) -> Result<Workspace> {
        Workspace::new(size)
    }

    fn execute(&self, workspace: &mut Workspace, schedule: Schedule) {
        schedule.for_each_index(&mut workspace.output, |i| factorial(i as u64));
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct FunctionIf;

impl Kernel for FunctionIf {
    fn kind(&self) -> FixtureKind {
        FixtureKind::FunctionIf
    }

    fn populate(&self, size: usize) -> Result<Workspace> {
        Workspace::new(size)?
            .with_input(|i| i)?
            .with_input(|i| i)?
            .with_input(|i| -i)
    }

    fn execute(&self, workspace: &mut Workspace, schedule: Schedule) {
        let (b, c, d) = (
            &workspace.inputs[0],
            &workspace.inputs[1],
            &workspace.inputs[2],
        );
        schedule.for_each_index(&mut workspace.output, |i| {
            if is_even(i as i64) != 0 {
                b[i].wrapping_add(c[i])
            } else {
                b[i].wrapping_add(d[i])
            }
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SCHEDULES: [Schedule; 4] = [
        Schedule::Sequential,
        Schedule::ParallelFor,
        Schedule::Partitioned { threads: 3 },
        Schedule::Partitioned { threads: 8 },
    ];

    fn run(kind: FixtureKind, size: usize, schedule: Schedule) -> Workspace {
        let kernel = kernel_for(kind);
        let mut workspace = kernel.populate(size).unwrap();
        kernel.execute(&mut workspace, schedule);
        workspace
    }

    #[test]
    fn test_is_even() {
        for n in [-4_i64, -2, 0, 2, 10, 1_000_000] {
            assert_ne!(is_even(n), 0, "{} should be even", n);
        }
        for n in [-3_i64, -1, 1, 7, 999_999] {
            assert_eq!(is_even(n), 0, "{} should be odd", n);
        }
    }

    #[test]
    fn test_factorial_values() {
        assert_eq!(factorial(0), 1);
        assert_eq!(factorial(1), 1);
        assert_eq!(factorial(5), 120);
        assert_eq!(factorial(20), 2_432_902_008_176_640_000);
        // 21! 以 64 位元環繞
        assert_eq!(factorial(21), factorial(20).wrapping_mul(21));
        assert_eq!(factorial(21), -4_249_290_049_419_214_848);
    }

    #[test]
    fn test_add_arrays_sums_inputs() {
        let workspace = run(FixtureKind::AddArrays, 50, Schedule::ParallelFor);
        let (b, c) = (&workspace.inputs[0], &workspace.inputs[1]);
        for i in 0..50 {
            assert_eq!(workspace.output[i], b[i] + c[i]);
            assert_eq!(workspace.output[i], 50);
        }
    }

    #[test]
    fn test_parallel_for_and_plus_function_produce_threes() {
        for kind in [
            FixtureKind::ParallelFor,
            FixtureKind::ParallelRegion,
            FixtureKind::PlusFunction,
        ] {
            let workspace = run(kind, 100, Schedule::ParallelFor);
            assert!(workspace.output.iter().all(|&v| v == 3), "{}", kind);
        }
    }

    #[test]
    fn test_factorial_fixture() {
        let workspace = run(FixtureKind::Factorial, 15, Schedule::ParallelFor);
        for (i, value) in workspace.output.iter().enumerate() {
            assert_eq!(*value, (1..=i as i64).product::<i64>());
        }
    }

    #[test]
    fn test_function_if_branches() {
        let workspace = run(FixtureKind::FunctionIf, 10, Schedule::ParallelFor);
        assert_eq!(workspace.output, vec![0, 0, 4, 0, 8, 0, 12, 0, 16, 0]);
    }

    #[test]
    fn test_every_schedule_matches_sequential() {
        for kind in FixtureKind::ALL {
            let reference = run(kind, 257, Schedule::Sequential);
            for schedule in SCHEDULES {
                assert_eq!(
                    run(kind, 257, schedule).output,
                    reference.output,
                    "{} with {}",
                    kind,
                    schedule
                );
            }
        }
    }

    #[test]
    fn test_empty_size_is_fine() {
        for kind in FixtureKind::ALL {
            assert!(run(kind, 0, Schedule::ParallelFor).output.is_empty());
        }
    }

    #[test]
    fn test_populate_reports_oversized_buffers() {
        for kind in FixtureKind::ALL {
            assert!(kernel_for(kind).populate(usize::MAX).is_err(), "{}", kind);
        }
    }

    #[test]
    fn test_default_schedule() {
        assert_eq!(default_schedule(FixtureKind::Factorial), Schedule::ParallelFor);
        assert!(matches!(
            default_schedule(FixtureKind::ParallelRegion),
            Schedule::Partitioned { .. }
        ));
    }
}
