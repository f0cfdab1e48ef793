use crate::error::{AcResult, AutocalError};
use crate::optimizer::population::Population;
use crate::point::CandidatePoint;

/// A point together with the population slot it was dealt from.
#[derive(Debug, Clone, PartialEq)]
pub struct Member {
    pub origin: usize,
    pub point: CandidatePoint,
}

/// One interleaved subset of the population.
#[derive(Debug, Clone, PartialEq)]
pub struct Complex {
    pub id: usize,
    pub members: Vec<Member>,
}

impl Complex {
    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    /// Stable best-first sort; members keep their origin slot.
    pub fn sort_descending(&mut self) {
        self.members
            .sort_by(|a, b| CandidatePoint::cmp_descending(&a.point, &b.point));
    }

    pub fn origins(&self) -> Vec<usize> {
        self.members.iter().map(|m| m.origin).collect()
    }

    pub fn points(&self) -> impl Iterator<Item = &CandidatePoint> {
        self.members.iter().map(|m| &m.point)
    }
}

/// Deals population slot `i` to complex `i % num_complexes`, so every complex
/// receives a spread of good and poor ranks.
pub fn partition(population: &Population, num_complexes: usize) -> AcResult<Vec<Complex>> {
    let size = population.len();
    if num_complexes == 0 || size == 0 || size % num_complexes != 0 {
        return Err(AutocalError::PartitionSize {
            population: size,
            num_complexes,
        });
    }

    let complex_size = size / num_complexes;
    let mut complexes: Vec<Complex> = (0..num_complexes)
        .map(|id| Complex {
            id,
            members: Vec::with_capacity(complex_size),
        })
        .collect();

    for (i, point) in population.iter().enumerate() {
        complexes[i % num_complexes].members.push(Member {
            origin: i,
            point: point.clone(),
        });
    }

    Ok(complexes)
}

/// Concatenates complexes in id order. The caller re-sorts.
pub fn recombine(complexes: Vec<Complex>) -> Vec<CandidatePoint> {
    complexes
        .into_iter()
        .flat_map(|c| c.members.into_iter().map(|m| m.point))
        .collect()
}
