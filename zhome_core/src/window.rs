//! Fixed-capacity FIFO of the most recent adjusted positions.

use std::collections::VecDeque;

use crate::error::HomeError;

#[derive(Debug, Clone)]
pub struct WindowBuffer {
    buf: VecDeque<f64>,
    capacity: usize,
    // Value pushed before the most recent one; survives eviction.
    previous: Option<f64>,
}

impl WindowBuffer {
    pub fn new(capacity: usize) -> Result<Self, HomeError> {
        if capacity == 0 {
            return Err(HomeError::Config(
                "window capacity must be >= 1".to_string(),
            ));
        }
        Ok(Self {
            buf: VecDeque::with_capacity(capacity + 1),
            capacity,
            previous: None,
        })
    }

    /// Append `value`, evicting the oldest entries beyond capacity.
    pub fn push(&mut self, value: f64) {
        self.previous = self.buf.back().copied();
        self.buf.push_back(value);
        while self.buf.len() > self.capacity {
            self.buf.pop_front();
        }
    }

    #[inline]
    pub fn is_full(&self) -> bool {
        self.buf.len() == self.capacity
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.buf.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    #[inline]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// `max - min` over a full window.
    pub fn range(&self) -> Result<f64, HomeError> {
        if !self.is_full() {
            return Err(HomeError::Precondition(format!(
                "window range needs {} samples, have {}",
                self.capacity,
                self.buf.len()
            )));
        }
        let (min, max) = self
            .buf
            .iter()
            .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), &v| {
                (lo.min(v), hi.max(v))
            });
        Ok(max - min)
    }

    /// The value pushed just before the most recent push.
    #[inline]
    pub fn previous_adjusted(&self) -> Option<f64> {
        self.previous
    }

    /// Current contents, oldest first.
    pub fn values(&self) -> impl Iterator<Item = f64> + '_ {
        self.buf.iter().copied()
    }

    pub fn clear(&mut self) {
        self.buf.clear();
        self.previous = None;
    }
}
