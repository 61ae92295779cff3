use crate::config::AggFunc;

/// Mergeable reduction state for one group cell.
///
/// Merging is associative and commutative, so partial states from any
/// partition of the input finish to the same value as a single pass.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Accumulator {
    sum: f64,
    count: u64,
    min: f64,
    max: f64,
}

impl Default for Accumulator {
    fn default() -> Self {
        Self {
            sum: 0.0,
            count: 0,
            min: f64::INFINITY,
            max: f64::NEG_INFINITY,
        }
    }
}

impl Accumulator {
    /// Fold one observation in.
    pub fn push(&mut self, value: f64) {
        self.sum += value;
        self.count += 1;
        self.min = self.min.min(value);
        self.max = self.max.max(value);
    }

    /// Fold another partial state in.
    pub fn merge(&mut self, other: &Accumulator) {
        self.sum += other.sum;
        self.count += other.count;
        self.min = self.min.min(other.min);
        self.max = self.max.max(other.max);
    }

    /// Final value under `func`; empty groups finish to `0`.
    pub fn finish(&self, func: AggFunc) -> f64 {
        if self.count == 0 {
            return 0.0;
        }
        match func {
            AggFunc::Sum => self.sum,
            AggFunc::Mean => self.sum / self.count as f64,
            AggFunc::Count => self.count as f64,
            AggFunc::Min => self.min,
            AggFunc::Max => self.max,
        }
    }
}
