use crate::point::CandidatePoint;
use serde::Serialize;

/// Candidate points kept sorted best-first.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Population {
    points: Vec<CandidatePoint>,
}

impl Population {
    /// Takes ownership of `points` and sorts them descending by objective.
    /// Ties keep their incoming order.
    pub fn from_points(mut points: Vec<CandidatePoint>) -> Self {
        points.sort_by(CandidatePoint::cmp_descending);
        Self { points }
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn points(&self) -> &[CandidatePoint] {
        &self.points
    }

    pub fn iter(&self) -> std::slice::Iter<'_, CandidatePoint> {
        self.points.iter()
    }

    pub fn best(&self) -> Option<&CandidatePoint> {
        self.points.first()
    }

    pub fn worst(&self) -> Option<&CandidatePoint> {
        self.points.last()
    }

    pub fn is_sorted_descending(&self) -> bool {
        self.points
            .windows(2)
            .all(|w| w[0].objective() >= w[1].objective())
    }

    pub fn into_points(self) -> Vec<CandidatePoint> {
        self.points
    }
}

impl<'a> IntoIterator for &'a Population {
    type Item = &'a CandidatePoint;
    type IntoIter = std::slice::Iter<'a, CandidatePoint>;

    fn into_iter(self) -> Self::IntoIter {
        self.points.iter()
    }
}
