use crate::space::ParameterSpace;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::BTreeMap;

/// One evaluated parameter vector.
///
/// Coordinates follow the order of the [`ParameterSpace`] that produced them.
/// Fields are private: a re-evaluation yields a new point.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CandidatePoint {
    values: Vec<f64>,
    objective: f64,
}

impl CandidatePoint {
    pub fn new(values: Vec<f64>, objective: f64) -> Self {
        Self { values, objective }
    }

    pub fn values(&self) -> &[f64] {
        &self.values
    }

    /// Higher is better.
    pub fn objective(&self) -> f64 {
        self.objective
    }

    pub fn as_vector<'a>(&'a self, space: &'a ParameterSpace) -> ParameterVector<'a> {
        ParameterVector::new(space, &self.values)
    }

    /// Ordering that puts better points first. Equal objectives compare equal,
    /// so a stable sort keeps their previous order.
    #[inline(always)]
    pub fn cmp_descending(a: &CandidatePoint, b: &CandidatePoint) -> Ordering {
        b.objective.total_cmp(&a.objective)
    }
}

/// Name-addressable view of a parameter vector, handed to evaluators.
#[derive(Debug, Clone, Copy)]
pub struct ParameterVector<'a> {
    space: &'a ParameterSpace,
    values: &'a [f64],
}

impl<'a> ParameterVector<'a> {
    pub fn new(space: &'a ParameterSpace, values: &'a [f64]) -> Self {
        debug_assert_eq!(space.len(), values.len());
        Self { space, values }
    }

    pub fn values(&self) -> &'a [f64] {
        self.values
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn get(&self, name: &str) -> Option<f64> {
        self.space.index_of(name).map(|i| self.values[i])
    }

    pub fn iter(&self) -> impl Iterator<Item = (&'a str, f64)> + 'a {
        let space = self.space;
        space.names().zip(self.values.iter().copied())
    }

    /// Entries tagged with `component`, in declaration order.
    pub fn component(&self, component: &'a str) -> impl Iterator<Item = (&'a str, f64)> + 'a {
        let space = self.space;
        space
            .bounds()
            .iter()
            .zip(self.values.iter().copied())
            .filter(move |(b, _)| b.component.as_deref() == Some(component))
            .map(|(b, v)| (b.name.as_str(), v))
    }

    pub fn to_map(&self) -> BTreeMap<String, f64> {
        self.iter().map(|(k, v)| (k.to_string(), v)).collect()
    }
}
