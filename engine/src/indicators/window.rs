// Rolling window helpers shared by the bounded-lookback indicators
use std::collections::VecDeque;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Extrema {
    pub max: f64,
    pub min: f64,
}

/// Max and min over the last `period` elements of `series`.
///
/// Returns `None` when the series holds fewer than `period` elements or when
/// `period` is zero. The scan is O(period).
pub fn rolling_extrema<'a, I>(series: I, period: usize) -> Option<Extrema>
where
    I: IntoIterator<Item = &'a f64>,
    I::IntoIter: ExactSizeIterator + DoubleEndedIterator,
{
    let iter = series.into_iter();
    if period == 0 || iter.len() < period {
        return None;
    }
    let extrema = iter.rev().take(period).fold(
        Extrema { max: f64::NEG_INFINITY, min: f64::INFINITY },
        |acc, &v| Extrema { max: acc.max.max(v), min: acc.min.min(v) },
    );
    Some(extrema)
}

/// `(highest high + lowest low) / 2` over the last `period` points.
pub fn rolling_midpoint(highs: &VecDeque<f64>, lows: &VecDeque<f64>, period: usize) -> Option<f64> {
    let high = rolling_extrema(highs, period)?.max;
    let low = rolling_extrema(lows, period)?.min;
    Some((high + low) / 2.0)
}

/// Fixed-capacity FIFO of the most recent values.
///
/// Statistics are recomputed from the stored values on every call, so they
/// only depend on what is currently in the window.
#[derive(Debug, Clone)]
pub struct RollingWindow {
    capacity: usize,
    values: VecDeque<f64>,
}

impl RollingWindow {
    pub fn new(capacity: usize) -> Self {
        Self { capacity, values: VecDeque::with_capacity(capacity) }
    }

    /// Pushes `value`, evicting the oldest one once the window is full.
    pub fn push(&mut self, value: f64) {
        if self.capacity == 0 {
            return;
        }
        if self.values.len() == self.capacity {
            self.values.pop_front();
        }
        self.values.push_back(value);
    }

    pub fn is_full(&self) -> bool {
        self.capacity > 0 && self.values.len() == self.capacity
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn values(&self) -> &VecDeque<f64> {
        &self.values
    }

    /// Mean of the window, available only once it is full.
    pub fn mean(&self) -> Option<f64> {
        self.is_full().then(|| self.values.iter().sum::<f64>() / self.capacity as f64)
    }

    /// Population standard deviation around [`RollingWindow::mean`].
    pub fn std_dev(&self) -> Option<f64> {
        let mean = self.mean()?;
        let variance = self.values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / self.capacity as f64;
        Some(variance.sqrt())
    }

    pub fn clear(&mut self) {
        self.values.clear();
    }
}

/// Drops the oldest entries of `buffer` until it holds at most `capacity`.
pub(crate) fn trim_front<T>(buffer: &mut VecDeque<T>, capacity: usize) {
    while buffer.len() > capacity {
        buffer.pop_front();
    }
}
