//! Minimal sparse matrix for the nodal head system.
//!
//! Entries are stored per row in ordered maps keyed by column, so iteration
//! order is deterministic and explicit zeros are never kept.

use std::collections::BTreeMap;

use nalgebra::DVector;

use crate::error::{SolverError, SolverResult};

/// Default Gauss-Seidel sweep cap.
pub const DEFAULT_MAX_SWEEPS: usize = 100;

/// Default Gauss-Seidel tolerance on the largest per-sweep change.
pub const DEFAULT_TOLERANCE: f64 = 1e-6;

/// Outcome of an iterative linear solve.
#[derive(Debug, Clone)]
pub struct LinearSolve {
    pub x: DVector<f64>,
    pub iterations: usize,
    /// Final stopping measure: largest sweep change (Gauss-Seidel) or
    /// relative preconditioned residual (conjugate gradient)
    pub residual: f64,
    pub converged: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SparseMatrix {
    rows: usize,
    cols: usize,
    data: Vec<BTreeMap<usize, f64>>,
}

impl SparseMatrix {
    pub fn new(rows: usize, cols: usize) -> Self {
        Self {
            rows,
            cols,
            data: vec![BTreeMap::new(); rows],
        }
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn cols(&self) -> usize {
        self.cols
    }

    fn check(&self, row: usize, col: usize) -> SolverResult<()> {
        if row >= self.rows || col >= self.cols {
            return Err(SolverError::Numeric {
                what: format!(
                    "entry ({row}, {col}) outside {}x{} matrix",
                    self.rows, self.cols
                ),
            });
        }
        Ok(())
    }

    /// Entry value; absent entries are zero.
    pub fn get(&self, row: usize, col: usize) -> f64 {
        self.data
            .get(row)
            .and_then(|r| r.get(&col))
            .copied()
            .unwrap_or(0.0)
    }

    /// Overwrite an entry. Setting zero removes it.
    pub fn set(&mut self, row: usize, col: usize, value: f64) -> SolverResult<()> {
        self.check(row, col)?;
        if value == 0.0 {
            self.data[row].remove(&col);
        } else {
            self.data[row].insert(col, value);
        }
        Ok(())
    }

    /// Accumulate into an entry.
    pub fn add(&mut self, row: usize, col: usize, value: f64) -> SolverResult<()> {
        self.check(row, col)?;
        let sum = self.get(row, col) + value;
        self.set(row, col, sum)
    }

    /// Number of stored (non-zero) entries.
    pub fn nnz(&self) -> usize {
        self.data.iter().map(BTreeMap::len).sum()
    }

    pub fn diagonal(&self) -> DVector<f64> {
        let n = self.rows.min(self.cols);
        DVector::from_iterator(n, (0..n).map(|i| self.get(i, i)))
    }

    /// Stored entries of one row as (column, value).
    pub fn row(&self, row: usize) -> impl Iterator<Item = (usize, f64)> + '_ {
        self.data
            .get(row)
            .into_iter()
            .flat_map(|r| r.iter().map(|(&c, &v)| (c, v)))
    }

    pub fn multiply_vector(&self, x: &DVector<f64>) -> SolverResult<DVector<f64>> {
        if x.len() != self.cols {
            return Err(SolverError::Numeric {
                what: format!("vector of length {} for {} columns", x.len(), self.cols),
            });
        }
        Ok(self.mul_unchecked(x))
    }

    fn mul_unchecked(&self, x: &DVector<f64>) -> DVector<f64> {
        DVector::from_iterator(
            self.rows,
            self.data
                .iter()
                .map(|row| row.iter().map(|(&c, &v)| v * x[c]).sum::<f64>()),
        )
    }

    fn check_square(&self, b: &DVector<f64>, x0: &DVector<f64>) -> SolverResult<()> {
        if self.rows != self.cols || b.len() != self.rows || x0.len() != self.rows {
            return Err(SolverError::Numeric {
                what: format!(
                    "solve needs a square system: matrix {}x{}, rhs {}, start {}",
                    self.rows,
                    self.cols,
                    b.len(),
                    x0.len()
                ),
            });
        }
        Ok(())
    }

    /// Gauss-Seidel from a zero start with the default cap and tolerance.
    pub fn solve(&self, b: &DVector<f64>) -> SolverResult<LinearSolve> {
        let x0 = DVector::zeros(self.rows);
        self.solve_from(b, &x0, DEFAULT_MAX_SWEEPS, DEFAULT_TOLERANCE)
    }

    /// Gauss-Seidel from `x0`, stopping when no unknown changes by more than
    /// `tolerance` within a sweep or after `max_sweeps` sweeps.
    ///
    /// Rows without a diagonal entry keep their starting value.
    pub fn solve_from(
        &self,
        b: &DVector<f64>,
        x0: &DVector<f64>,
        max_sweeps: usize,
        tolerance: f64,
    ) -> SolverResult<LinearSolve> {
        self.check_square(b, x0)?;
        let mut x = x0.clone();
        let mut change = 0.0;

        for sweep in 1..=max_sweeps {
            change = 0.0_f64;
            for (i, row) in self.data.iter().enumerate() {
                let mut diag = 0.0;
                let mut sum = b[i];
                for (&c, &v) in row {
                    if c == i {
                        diag = v;
                    } else {
                        sum -= v * x[c];
                    }
                }
                if diag == 0.0 {
                    continue;
                }
                let value = sum / diag;
                change = change.max((value - x[i]).abs());
                x[i] = value;
            }
            if change < tolerance {
                return Ok(LinearSolve {
                    x,
                    iterations: sweep,
                    residual: change,
                    converged: true,
                });
            }
        }

        Ok(LinearSolve {
            x,
            iterations: max_sweeps,
            residual: change,
            converged: false,
        })
    }

    /// Jacobi-preconditioned conjugate gradient for symmetric positive
    /// definite systems, warm-started from `x0`.
    ///
    /// Stops when the preconditioned residual drops below `tolerance`
    /// relative to the preconditioned right-hand side.
    pub fn solve_conjugate_gradient(
        &self,
        b: &DVector<f64>,
        x0: &DVector<f64>,
        max_iterations: usize,
        tolerance: f64,
    ) -> SolverResult<LinearSolve> {
        self.check_square(b, x0)?;
        let n = self.rows;
        let inv_diag = self
            .diagonal()
            .map(|d| if d > 0.0 { 1.0 / d } else { 1.0 });

        let mut x = x0.clone();
        let mut r = b - self.mul_unchecked(&x);
        let mut z = r.component_mul(&inv_diag);
        let mut p = z.clone();
        let mut rz = r.dot(&z);
        let b_norm = b.component_mul(&inv_diag).norm().max(1e-30);

        let mut relative = z.norm() / b_norm;
        let mut iterations = 0;
        while iterations < max_iterations && relative >= tolerance && n > 0 {
            let ap = self.mul_unchecked(&p);
            let p_ap = p.dot(&ap);
            if p_ap <= 0.0 {
                break;
            }
            let alpha = rz / p_ap;
            x.axpy(alpha, &p, 1.0);
            r.axpy(-alpha, &ap, 1.0);
            z = r.component_mul(&inv_diag);
            let rz_next = r.dot(&z);
            p = &z + (rz_next / rz) * &p;
            rz = rz_next;
            iterations += 1;
            relative = z.norm() / b_norm;
        }

        Ok(LinearSolve {
            x,
            iterations,
            residual: relative,
            converged: relative < tolerance || n == 0,
        })
    }
}
