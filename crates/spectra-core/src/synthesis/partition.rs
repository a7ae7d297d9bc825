use crate::domain::{SpectraError, SpectraResult};
use std::fmt::{Display, Formatter};
use std::num::NonZeroUsize;
use std::ops::Range;
use std::str::FromStr;

/// How deposition work is divided between worker groups.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Parallelism {
    /// A fixed number of line groups.
    Groups(usize),
    /// One line per worker (`-1`).
    PerLine,
    /// Line-level parallelism first; spare workers split each line's window.
    #[default]
    Auto,
}

impl Parallelism {
    pub fn parse(value: &str) -> SpectraResult<Self> {
        let trimmed = value.trim();
        if trimmed.eq_ignore_ascii_case("auto") {
            return Ok(Self::Auto);
        }
        match trimmed.parse::<i64>() {
            Ok(-1) => Ok(Self::PerLine),
            Ok(groups) if groups > 0 => Ok(Self::Groups(groups as usize)),
            _ => Err(SpectraError::configuration(
                "CONFIG.PARALLELISM",
                format!(
                    "parallelism must be a positive group count, -1, or 'auto', got '{}'",
                    value
                ),
            )),
        }
    }
}

impl FromStr for Parallelism {
    type Err = SpectraError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        Self::parse(value)
    }
}

impl Display for Parallelism {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Groups(groups) => write!(f, "{}", groups),
            Self::PerLine => f.write_str("-1"),
            Self::Auto => f.write_str("auto"),
        }
    }
}

/// Worker count reported by the host, or 1 when it cannot be determined.
pub fn default_worker_count() -> usize {
    std::thread::available_parallelism()
        .map(NonZeroUsize::get)
        .unwrap_or(1)
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PartitionPlan {
    workers_per_group: usize,
    line_ranges: Vec<Range<usize>>,
}

impl PartitionPlan {
    pub fn groups(&self) -> usize {
        self.line_ranges.len()
    }

    /// Workers that share the wavelength window of each line in a group.
    pub fn workers_per_group(&self) -> usize {
        self.workers_per_group
    }

    pub fn total_workers(&self) -> usize {
        self.groups() * self.workers_per_group
    }

    /// Contiguous line indices handled by each group. Trailing groups may be empty.
    pub fn line_ranges(&self) -> &[Range<usize>] {
        &self.line_ranges
    }

    pub fn group_of(&self, line: usize) -> Option<usize> {
        self.line_ranges
            .iter()
            .position(|range| range.contains(&line))
    }
}

/// Splits `workers` into line groups for `lines` transitions.
pub fn plan_partition(policy: Parallelism, workers: usize, lines: usize) -> PartitionPlan {
    let workers = workers.max(1);
    let (groups, workers_per_group) = match policy {
        Parallelism::Groups(requested) => {
            let groups = requested.clamp(1, workers);
            (groups, workers / groups)
        }
        Parallelism::PerLine => (workers, 1),
        Parallelism::Auto if lines > 0 && workers > lines => (lines, workers / lines),
        Parallelism::Auto => (workers, 1),
    };

    PartitionPlan {
        workers_per_group,
        line_ranges: contiguous_ranges(lines, groups),
    }
}

fn contiguous_ranges(lines: usize, groups: usize) -> Vec<Range<usize>> {
    let base = lines / groups;
    let extra = lines % groups;
    let mut start = 0;
    (0..groups)
        .map(|group| {
            let size = base + usize::from(group < extra);
            let range = start..start + size;
            start += size;
            range
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::{Parallelism, plan_partition};

    #[test]
    fn parallelism_parses_counts_per_line_and_auto() {
        assert_eq!(Parallelism::parse("auto").expect("auto"), Parallelism::Auto);
        assert_eq!(Parallelism::parse("-1").expect("per line"), Parallelism::PerLine);
        assert_eq!(Parallelism::parse("4").expect("groups"), Parallelism::Groups(4));
        assert_eq!("AUTO".parse::<Parallelism>().expect("auto"), Parallelism::Auto);

        for value in ["0", "-2", "many", ""] {
            let error = Parallelism::parse(value).expect_err("invalid parallelism");
            assert_eq!(error.placeholder(), "CONFIG.PARALLELISM");
        }
    }

    #[test]
    fn explicit_groups_share_workers() {
        let plan = plan_partition(Parallelism::Groups(2), 8, 5);
        assert_eq!(plan.groups(), 2);
        assert_eq!(plan.workers_per_group(), 4);
        assert_eq!(plan.line_ranges(), &[0..3, 3..5]);

        let capped = plan_partition(Parallelism::Groups(16), 4, 10);
        assert_eq!(capped.groups(), 4);
        assert_eq!(capped.workers_per_group(), 1);
    }

    #[test]
    fn per_line_uses_one_worker_per_group() {
        let plan = plan_partition(Parallelism::PerLine, 4, 10);
        assert_eq!(plan.groups(), 4);
        assert_eq!(plan.workers_per_group(), 1);
        assert_eq!(plan.line_ranges(), &[0..3, 3..6, 6..8, 8..10]);
        assert_eq!(plan.group_of(7), Some(2));
        assert_eq!(plan.group_of(10), None);
    }

    #[test]
    fn auto_splits_windows_when_workers_exceed_lines() {
        let plan = plan_partition(Parallelism::Auto, 16, 3);
        assert_eq!(plan.groups(), 3);
        assert_eq!(plan.workers_per_group(), 5);
        assert_eq!(plan.line_ranges(), &[0..1, 1..2, 2..3]);
        assert_eq!(plan.total_workers(), 15);
    }

    #[test]
    fn auto_prefers_line_parallelism_otherwise() {
        let plan = plan_partition(Parallelism::Auto, 4, 12);
        assert_eq!(plan.groups(), 4);
        assert_eq!(plan.workers_per_group(), 1);
        assert!(plan.line_ranges().iter().all(|range| range.len() == 3));

        let equal = plan_partition(Parallelism::Auto, 4, 4);
        assert_eq!(equal.groups(), 4);
        assert_eq!(equal.workers_per_group(), 1);
    }

    #[test]
    fn zero_workers_is_treated_as_one() {
        let plan = plan_partition(Parallelism::Auto, 0, 2);
        assert_eq!(plan.groups(), 1);
        assert_eq!(plan.line_ranges(), &[0..2]);
    }
}
