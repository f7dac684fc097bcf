//! Collision-aware defect container.
//!
//! A [`DefectSet`] keeps two indices in lockstep: the defects themselves and
//! the coordinates they occupy. A coordinate hosts at most one defect,
//! whatever its type, so a query is "in" the set when either its exact value
//! is stored or its site is taken.
//!
//! When a desired site is taken, [`DefectSet::add_to_nearest`] walks a
//! breadth-first frontier of alternative placements proposed by a move
//! generator until it finds a free one.

use std::collections::HashSet;
use std::collections::hash_set;
use std::fmt;
use std::sync::Arc;

use log::{debug, trace, warn};

use super::eval::{EvalError, Evaluate};
use crate::schema::{Coords, Defect};

/// Errors raised by [`DefectSet`] operations. A failed operation leaves the
/// set unchanged.
#[derive(Debug, thiserror::Error)]
pub enum DefectSetError {
    #[error("Defect {defect} collides with a defect already in the set")]
    Duplicate { defect: Defect },
    #[error("Defect {defect} is not in the set")]
    NotFound { defect: Defect },
    #[error("Energy of an empty defect set is undefined")]
    EmptySetEnergy,
    #[error("No free position found for {defect} after {attempts} attempts")]
    NoFreePosition { defect: Defect, attempts: usize },
    #[error("Move generator ran out of candidates for {defect} after {attempts} attempts")]
    MovesExhausted { defect: Defect, attempts: usize },
    #[error("Energy evaluation failed: {0}")]
    Evaluation(#[source] EvalError),
}

/// A set of defects with at most one defect per lattice site.
///
/// Cloning yields an independently mutable set that shares the same
/// evaluator.
#[derive(Clone)]
pub struct DefectSet {
    defects: HashSet<Defect>,
    positions: HashSet<Coords>,
    evaluator: Arc<dyn Evaluate>,
    max_attempts: Option<usize>,
}

impl DefectSet {
    /// Create an empty set bound to an energy evaluator.
    pub fn new(evaluator: impl Evaluate + 'static) -> Self {
        Self::with_evaluator(Arc::new(evaluator))
    }

    /// Create an empty set sharing an existing evaluator.
    pub fn with_evaluator(evaluator: Arc<dyn Evaluate>) -> Self {
        Self {
            defects: HashSet::new(),
            positions: HashSet::new(),
            evaluator,
            max_attempts: None,
        }
    }

    /// Bound the number of alternative placements
    /// [`add_to_nearest`](Self::add_to_nearest) will try.
    pub fn with_max_attempts(mut self, max_attempts: usize) -> Self {
        self.max_attempts = Some(max_attempts);
        self
    }

    pub fn max_attempts(&self) -> Option<usize> {
        self.max_attempts
    }

    pub fn evaluator(&self) -> &Arc<dyn Evaluate> {
        &self.evaluator
    }

    /// Insert a defect whose value and site are both free.
    pub fn add(&mut self, defect: Defect) -> Result<(), DefectSetError> {
        if self.contains(&defect) {
            return Err(DefectSetError::Duplicate { defect });
        }
        self.insert_unchecked(defect);
        Ok(())
    }

    /// Remove a stored defect.
    pub fn remove(&mut self, defect: &Defect) -> Result<(), DefectSetError> {
        if !self.defects.remove(defect) {
            return Err(DefectSetError::NotFound { defect: *defect });
        }
        self.positions.remove(&defect.coords());
        Ok(())
    }

    /// True when `defect` is stored or its site is occupied by any defect.
    pub fn contains(&self, defect: &Defect) -> bool {
        self.defects.contains(defect) || self.is_occupied(defect)
    }

    /// True when the site of `defect` is occupied, regardless of type.
    pub fn is_occupied(&self, defect: &Defect) -> bool {
        self.positions.contains(&defect.coords())
    }

    /// Insert `defect`, or the first free placement reachable from it.
    ///
    /// When `defect` collides, `moves` is called with the frontier explored
    /// so far whenever every frontier entry has been tried, and whatever it
    /// proposes is appended. The first frontier entry that does not collide
    /// is inserted and returned. Returns the input unchanged if it was free.
    pub fn add_to_nearest<F, I>(
        &mut self,
        defect: Defect,
        mut moves: F,
    ) -> Result<Defect, DefectSetError>
    where
        F: FnMut(&[Defect]) -> I,
        I: IntoIterator<Item = Defect>,
    {
        if !self.contains(&defect) {
            self.insert_unchecked(defect);
            return Ok(defect);
        }

        let mut frontier = vec![defect];
        let mut index = 0;
        loop {
            index += 1;
            if let Some(limit) = self.max_attempts
                && index > limit
            {
                warn!("Gave up placing {defect} after {limit} attempts");
                return Err(DefectSetError::NoFreePosition {
                    defect,
                    attempts: limit,
                });
            }

            if index >= frontier.len() {
                let before = frontier.len();
                frontier.extend(moves(&frontier));
                debug!(
                    "Expanded frontier for {defect}: {before} -> {} candidates",
                    frontier.len()
                );
                if frontier.len() == before {
                    return Err(DefectSetError::MovesExhausted {
                        defect,
                        attempts: index - 1,
                    });
                }
            }

            let candidate = frontier[index];
            if self.contains(&candidate) {
                trace!("Candidate {candidate} is occupied");
                continue;
            }

            trace!("Placing {candidate} in place of {defect}");
            self.insert_unchecked(candidate);
            return Ok(candidate);
        }
    }

    /// Per-defect energy of the configuration.
    pub fn energy(&self, debug: bool) -> Result<f64, DefectSetError> {
        if self.defects.is_empty() {
            return Err(DefectSetError::EmptySetEnergy);
        }
        let total = self
            .evaluator
            .evaluate(&self.defects, debug)
            .map_err(DefectSetError::Evaluation)?;
        Ok(total / self.defects.len() as f64)
    }

    /// Stored defects.
    pub fn defects(&self) -> &HashSet<Defect> {
        &self.defects
    }

    pub fn iter(&self) -> hash_set::Iter<'_, Defect> {
        self.defects.iter()
    }

    pub fn len(&self) -> usize {
        self.defects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.defects.is_empty()
    }

    fn insert_unchecked(&mut self, defect: Defect) {
        self.positions.insert(defect.coords());
        self.defects.insert(defect);
    }
}

impl<'a> IntoIterator for &'a DefectSet {
    type Item = &'a Defect;
    type IntoIter = hash_set::Iter<'a, Defect>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

impl fmt::Debug for DefectSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DefectSet")
            .field("defects", &self.defects)
            .field("max_attempts", &self.max_attempts)
            .finish_non_exhaustive()
    }
}

impl fmt::Display for DefectSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{{")?;
        for (i, defect) in self.defects.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{defect}")?;
        }
        write!(f, "}}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Sums type codes, so energies are easy to predict.
    fn type_sum(defects: &HashSet<Defect>, _debug: bool) -> Result<f64, EvalError> {
        Ok(defects.iter().map(|d| d.kind() as f64).sum())
    }

    fn empty_set() -> DefectSet {
        DefectSet::new(type_sum)
    }

    /// Proposes the six face neighbours of every frontier entry.
    fn neighbours(frontier: &[Defect]) -> Vec<Defect> {
        frontier
            .iter()
            .flat_map(|d| {
                let c = d.coords();
                [
                    c.offset(1, 0, 0),
                    c.offset(-1, 0, 0),
                    c.offset(0, 1, 0),
                    c.offset(0, -1, 0),
                    c.offset(0, 0, 1),
                    c.offset(0, 0, -1),
                ]
                .map(|n| d.moved_to(n))
            })
            .collect()
    }

    #[test]
    fn test_add_and_contains() {
        let mut set = empty_set();
        let d = Defect::new(1, (0, 0, 0));
        assert!(!set.contains(&d));
        set.add(d).unwrap();
        assert!(set.contains(&d));
        assert_eq!(set.len(), 1);
    }

    #[test]
    fn test_add_duplicate_value_fails() {
        let mut set = empty_set();
        let d = Defect::new(1, (0, 0, 0));
        set.add(d).unwrap();
        assert!(matches!(set.add(d), Err(DefectSetError::Duplicate { .. })));
        assert_eq!(set.len(), 1);
    }

    #[test]
    fn test_add_occupied_site_fails_for_other_type() {
        let mut set = empty_set();
        set.add(Defect::new(1, (2, 3, 4))).unwrap();
        let other = Defect::new(9, (2, 3, 4));
        assert!(set.contains(&other));
        assert!(set.is_occupied(&other));
        assert!(matches!(
            set.add(other),
            Err(DefectSetError::Duplicate { defect }) if defect == other
        ));
        assert_eq!(set.len(), 1);
    }

    #[test]
    fn test_remove_round_trip() {
        let mut set = empty_set();
        let keep = Defect::new(2, (5, 5, 5));
        set.add(keep).unwrap();
        let before = set.defects().clone();

        let d = Defect::new(1, (0, 0, 1));
        set.add(d).unwrap();
        set.remove(&d).unwrap();

        assert_eq!(set.defects(), &before);
        assert!(!set.contains(&d));
        assert!(!set.is_occupied(&d));
        // The freed site accepts a defect of another type.
        set.add(Defect::new(7, (0, 0, 1))).unwrap();
    }

    #[test]
    fn test_remove_missing_fails() {
        let mut set = empty_set();
        set.add(Defect::new(1, (0, 0, 0))).unwrap();
        // Same site, different type: occupied, but not a member.
        let other = Defect::new(2, (0, 0, 0));
        assert!(matches!(
            set.remove(&other),
            Err(DefectSetError::NotFound { .. })
        ));
        assert!(set.is_occupied(&other));
        assert_eq!(set.len(), 1);
    }

    #[test]
    fn test_energy_is_per_defect() {
        let mut set = empty_set();
        set.add(Defect::new(2, (0, 0, 0))).unwrap();
        set.add(Defect::new(4, (1, 0, 0))).unwrap();
        assert_eq!(set.energy(false).unwrap(), 3.0);
    }

    #[test]
    fn test_energy_of_empty_set_fails() {
        let set = empty_set();
        assert!(matches!(
            set.energy(false),
            Err(DefectSetError::EmptySetEnergy)
        ));
    }

    #[test]
    fn test_energy_propagates_evaluation_error() {
        let mut set = DefectSet::new(
            |_: &HashSet<Defect>, _: bool| -> Result<f64, EvalError> { Err("diverged".into()) },
        );
        set.add(Defect::new(1, (0, 0, 0))).unwrap();
        match set.energy(true) {
            Err(DefectSetError::Evaluation(e)) => assert_eq!(e.to_string(), "diverged"),
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[test]
    fn test_add_to_nearest_free_site_skips_search() {
        let mut set = empty_set();
        let d = Defect::new(1, (0, 0, 0));
        let placed = set
            .add_to_nearest(d, |_: &[Defect]| -> Vec<Defect> {
                panic!("no expansion expected")
            })
            .unwrap();
        assert_eq!(placed, d);
        assert_eq!(set.len(), 1);
    }

    #[test]
    fn test_add_to_nearest_finds_neighbour() {
        let mut set = empty_set();
        set.add(Defect::new(1, (0, 0, 0))).unwrap();
        set.add(Defect::new(1, (1, 0, 0))).unwrap();

        let placed = set
            .add_to_nearest(Defect::new(3, (0, 0, 0)), neighbours)
            .unwrap();
        // (1,0,0) is taken; the next face neighbour is free.
        assert_eq!(placed, Defect::new(3, (-1, 0, 0)));
        assert!(set.contains(&placed));
        assert_eq!(set.len(), 3);
    }

    #[test]
    fn test_add_to_nearest_expands_beyond_first_shell() {
        let mut set = empty_set();
        let origin = Defect::new(0, (0, 0, 0));
        set.add(origin).unwrap();
        for n in neighbours(&[origin]) {
            set.add(n).unwrap();
        }

        let mut calls = 0;
        let placed = set
            .add_to_nearest(Defect::new(5, (0, 0, 0)), |frontier: &[Defect]| {
                calls += 1;
                neighbours(frontier)
            })
            .unwrap();

        assert_eq!(calls, 2);
        assert!(!neighbours(&[origin]).iter().any(|n| n.coords() == placed.coords()));
        assert_eq!(placed.kind(), 5);
        assert_eq!(set.len(), 8);
    }

    #[test]
    fn test_add_to_nearest_respects_attempt_bound() {
        let mut set = empty_set().with_max_attempts(3);
        set.add(Defect::new(1, (0, 0, 0))).unwrap();
        let before = set.defects().clone();

        // Always proposes the same occupied site.
        let err = set
            .add_to_nearest(Defect::new(1, (0, 0, 0)), |_: &[Defect]| {
                vec![Defect::new(2, (0, 0, 0))]
            })
            .unwrap_err();

        assert!(matches!(
            err,
            DefectSetError::NoFreePosition { attempts: 3, .. }
        ));
        assert_eq!(set.defects(), &before);
    }

    #[test]
    fn test_add_to_nearest_exhausted_moves() {
        let mut set = empty_set();
        set.add(Defect::new(1, (0, 0, 0))).unwrap();

        let err = set
            .add_to_nearest(Defect::new(1, (0, 0, 0)), |_: &[Defect]| Vec::new())
            .unwrap_err();
        assert!(matches!(
            err,
            DefectSetError::MovesExhausted { attempts: 0, .. }
        ));
        assert_eq!(set.len(), 1);
    }

    #[test]
    fn test_clone_is_independent() {
        let mut set = empty_set();
        set.add(Defect::new(1, (0, 0, 0))).unwrap();

        let mut copy = set.clone();
        copy.add(Defect::new(2, (1, 1, 1))).unwrap();
        copy.remove(&Defect::new(1, (0, 0, 0))).unwrap();

        assert_eq!(set.len(), 1);
        assert!(set.contains(&Defect::new(1, (0, 0, 0))));
        assert!(!set.is_occupied(&Defect::new(0, (1, 1, 1))));
        assert!(Arc::ptr_eq(set.evaluator(), copy.evaluator()));
        assert_eq!(copy.energy(false).unwrap(), 2.0);
    }

    #[test]
    fn test_display() {
        let mut set = empty_set();
        assert_eq!(set.to_string(), "{}");
        set.add(Defect::new(1, (0, 0, 0))).unwrap();
        assert_eq!(set.to_string(), "{[1,(0, 0, 0)]}");
    }
}
