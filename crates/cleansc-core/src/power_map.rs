//! Power Map: real-valued N×M source power grid
//!
//! Used both for the dirty (beamformed) map of one iteration and for the
//! accumulated clean map returned by the deconvolver.
//!
//! ## Example
//!
//! ```rust
//! use cleansc_core::power_map::PowerMap;
//!
//! let mut map = PowerMap::zeros(3, 3);
//! map.add(1, 2, 4.0);
//! map.add(2, 0, 4.0); // tie: the earlier cell in row-major order wins
//!
//! let peak = map.peak().unwrap();
//! assert_eq!((peak.row, peak.col, peak.value), (1, 2, 4.0));
//! ```

use serde::{Deserialize, Serialize};

use crate::types::{CleanScError, CleanScResult};

/// Row-major real grid.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PowerMap {
    data: Vec<f64>,
    rows: usize,
    cols: usize,
}

/// Highest cell of a map.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Peak {
    pub row: usize,
    pub col: usize,
    pub value: f64,
}

impl PowerMap {
    /// All-zero map.
    pub fn zeros(rows: usize, cols: usize) -> Self {
        Self {
            data: vec![0.0; rows * cols],
            rows,
            cols,
        }
    }

    /// Create from a flat row-major array.
    pub fn new(rows: usize, cols: usize, data: Vec<f64>) -> CleanScResult<Self> {
        if data.len() != rows * cols {
            return Err(CleanScError::mismatch("power map data", rows * cols, data.len()));
        }
        Ok(Self { data, rows, cols })
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn cols(&self) -> usize {
        self.cols
    }

    pub fn get(&self, row: usize, col: usize) -> f64 {
        self.data[row * self.cols + col]
    }

    pub fn set(&mut self, row: usize, col: usize, value: f64) {
        self.data[row * self.cols + col] = value;
    }

    /// Add `value` to one cell.
    pub fn add(&mut self, row: usize, col: usize, value: f64) {
        self.data[row * self.cols + col] += value;
    }

    /// Cell-wise `self += other`. Both maps must share a shape.
    pub fn add_map(&mut self, other: &PowerMap) {
        debug_assert_eq!((self.rows, self.cols), (other.rows, other.cols));
        for (a, b) in self.data.iter_mut().zip(&other.data) {
            *a += b;
        }
    }

    pub fn as_slice(&self) -> &[f64] {
        &self.data
    }

    pub(crate) fn as_mut_slice(&mut self) -> &mut [f64] {
        &mut self.data
    }

    /// Sum over all cells.
    pub fn total(&self) -> f64 {
        self.data.iter().sum()
    }

    /// Maximum cell, scanning in row-major order.
    ///
    /// Ties keep the first cell encountered; NaN cells never win. Returns
    /// `None` for an empty map or one with no comparable value.
    pub fn peak(&self) -> Option<Peak> {
        let mut best: Option<(usize, f64)> = None;
        for (i, &v) in self.data.iter().enumerate() {
            if v.is_nan() {
                continue;
            }
            match best {
                Some((_, b)) if v <= b => {}
                _ => best = Some((i, v)),
            }
        }
        best.map(|(i, value)| Peak {
            row: i / self.cols,
            col: i % self.cols,
            value,
        })
    }

    /// Map in dB, `10·log10(max(v, floor))`.
    pub fn to_db(&self, floor: f64) -> Vec<f64> {
        self.data.iter().map(|&v| 10.0 * v.max(floor).log10()).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_peak_row_major_tie_break() {
        let map = PowerMap::new(2, 3, vec![1.0, 5.0, 2.0, 5.0, 0.0, 5.0]).unwrap();
        let peak = map.peak().unwrap();
        assert_eq!((peak.row, peak.col), (0, 1));
        assert_eq!(peak.value, 5.0);
    }

    #[test]
    fn test_peak_ignores_nan() {
        let map = PowerMap::new(1, 4, vec![f64::NAN, -3.0, f64::NAN, -1.0]).unwrap();
        let peak = map.peak().unwrap();
        assert_eq!((peak.row, peak.col, peak.value), (0, 3, -1.0));

        let all_nan = PowerMap::new(1, 2, vec![f64::NAN; 2]).unwrap();
        assert!(all_nan.peak().is_none());
        assert!(PowerMap::zeros(0, 0).peak().is_none());
    }

    #[test]
    fn test_peak_negative_values() {
        let map = PowerMap::new(2, 2, vec![-4.0, -2.0, -3.0, -2.5]).unwrap();
        let peak = map.peak().unwrap();
        assert_eq!((peak.row, peak.col), (0, 1));
    }

    #[test]
    fn test_add_map_and_total() {
        let mut a = PowerMap::zeros(2, 2);
        a.add(0, 0, 1.0);
        let b = PowerMap::new(2, 2, vec![0.5, 0.5, 0.5, 0.5]).unwrap();
        a.add_map(&b);
        assert_eq!(a.get(0, 0), 1.5);
        assert_eq!(a.total(), 3.0);
    }

    #[test]
    fn test_to_db_floor() {
        let map = PowerMap::new(1, 3, vec![1.0, 0.1, 0.0]).unwrap();
        let db = map.to_db(1e-10);
        assert!((db[0] - 0.0).abs() < 1e-12);
        assert!((db[1] + 10.0).abs() < 1e-9);
        assert!((db[2] + 100.0).abs() < 1e-9);
    }
}
