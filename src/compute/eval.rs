//! Energy evaluation contract and the adapter binding a raw routine to its
//! structure context.

use std::collections::HashSet;
use std::fmt;

use crate::schema::Defect;

/// Error returned by an energy evaluation routine. Passed through untouched.
pub type EvalError = Box<dyn std::error::Error + Send + Sync>;

/// Computes the total energy of a defect configuration.
///
/// Implementations should be pure functions of their inputs. `debug` is
/// forwarded as given and only affects what the routine chooses to report.
pub trait Evaluate: Send + Sync {
    fn evaluate(&self, defects: &HashSet<Defect>, debug: bool) -> Result<f64, EvalError>;
}

impl<F> Evaluate for F
where
    F: Fn(&HashSet<Defect>, bool) -> Result<f64, EvalError> + Send + Sync,
{
    fn evaluate(&self, defects: &HashSet<Defect>, debug: bool) -> Result<f64, EvalError> {
        self(defects, debug)
    }
}

/// Binds a raw energy routine to a fixed structure, its matrices and an
/// auxiliary function set, so it can be called as `eval(defects, debug)`.
///
/// The structure and matrix types are opaque here; the adapter only hands
/// them back to the routine on every call.
pub struct EvalFunction<S, X, A, R> {
    raw: R,
    structure: S,
    matrices: X,
    function_set: A,
}

impl<S, X, A, R> EvalFunction<S, X, A, R>
where
    R: Fn(&S, &X, &HashSet<Defect>, &A, bool) -> Result<f64, EvalError>,
{
    pub fn new(raw: R, structure: S, matrices: X, function_set: A) -> Self {
        Self {
            raw,
            structure,
            matrices,
            function_set,
        }
    }

    /// Evaluate `defects` against the bound context.
    pub fn call(&self, defects: &HashSet<Defect>, debug: bool) -> Result<f64, EvalError> {
        (self.raw)(
            &self.structure,
            &self.matrices,
            defects,
            &self.function_set,
            debug,
        )
    }

    pub fn structure(&self) -> &S {
        &self.structure
    }

    pub fn matrices(&self) -> &X {
        &self.matrices
    }

    pub fn function_set(&self) -> &A {
        &self.function_set
    }
}

impl<S, X, A, R> Evaluate for EvalFunction<S, X, A, R>
where
    S: Send + Sync,
    X: Send + Sync,
    A: Send + Sync,
    R: Fn(&S, &X, &HashSet<Defect>, &A, bool) -> Result<f64, EvalError> + Send + Sync,
{
    fn evaluate(&self, defects: &HashSet<Defect>, debug: bool) -> Result<f64, EvalError> {
        self.call(defects, debug)
    }
}

impl<S: fmt::Debug, X, A, R> fmt::Debug for EvalFunction<S, X, A, R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EvalFunction")
            .field("structure", &self.structure)
            .finish_non_exhaustive()
    }
}
