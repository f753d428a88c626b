use std::fmt::Display;

/// Range and mean of a set of counts, collected from an iterator.
#[derive(Clone, Debug, PartialEq)]
pub struct Stats {
    pub count: usize,
    pub min: usize,
    pub max: usize,
    pub sum: usize,
}

impl Stats {
    pub fn mean(&self) -> f32 {
        if self.count == 0 {
            0.0
        } else {
            self.sum as f32 / self.count as f32
        }
    }
}

impl FromIterator<usize> for Stats {
    fn from_iter<I: IntoIterator<Item = usize>>(iter: I) -> Self {
        iter.into_iter().fold(
            Stats {
                count: 0,
                min: usize::MAX,
                max: 0,
                sum: 0,
            },
            |stats, value| Stats {
                count: stats.count + 1,
                min: stats.min.min(value),
                max: stats.max.max(value),
                sum: stats.sum + value,
            },
        )
    }
}

impl Display for Stats {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.count == 0 {
            return write!(f, "no samples");
        }
        write!(
            f,
            "{} - {}; avg {:.1}; {} samples",
            self.min,
            self.max,
            self.mean(),
            self.count
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert2::assert;

    #[test]
    fn collects_range_and_sum() {
        let s: Stats = [3, 1, 2, 6].into_iter().collect();
        assert!(s.count == 4);
        assert!(s.min == 1);
        assert!(s.max == 6);
        assert!(s.sum == 12);
        assert!(s.mean() == 3.0);
    }

    #[test]
    fn empty() {
        let s: Stats = std::iter::empty().collect();
        assert!(s.count == 0);
        assert!(s.mean() == 0.0);
        assert!(s.to_string() == "no samples");
    }

    #[test]
    fn display_format() {
        let s: Stats = [42].into_iter().collect();
        assert!(s.to_string() == "42 - 42; avg 42.0; 1 samples");
    }
}
