use crate::error::{AcResult, AutocalError};
use fastrand::Rng;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// A single calibrated parameter and its closed interval `[min, max]`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParameterBound {
    pub name: String,
    pub min: f64,
    pub max: f64,

    /// Model component the parameter belongs to (e.g. "soil").
    /// Only the I/O collaborator cares about this.
    #[serde(default)]
    pub component: Option<String>,
}

impl ParameterBound {
    pub fn new(name: impl Into<String>, min: f64, max: f64) -> Self {
        Self {
            name: name.into(),
            min,
            max,
            component: None,
        }
    }

    pub fn with_component(mut self, component: impl Into<String>) -> Self {
        self.component = Some(component.into());
        self
    }

    #[inline(always)]
    pub fn contains(&self, value: f64) -> bool {
        self.min <= value && value <= self.max
    }

    #[inline(always)]
    pub fn width(&self) -> f64 {
        self.max - self.min
    }
}

/// Ordered, immutable set of parameter bounds.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ParameterSpace {
    bounds: Vec<ParameterBound>,
}

impl ParameterSpace {
    pub fn new(bounds: Vec<ParameterBound>) -> AcResult<Self> {
        if bounds.is_empty() {
            return Err(AutocalError::Config(
                "Parameter space needs at least one parameter".to_string(),
            ));
        }

        let mut seen = HashSet::new();
        for b in &bounds {
            if !b.min.is_finite() || !b.max.is_finite() || b.min > b.max {
                return Err(AutocalError::InvalidBounds {
                    name: b.name.clone(),
                    min: b.min,
                    max: b.max,
                });
            }
            if !seen.insert(b.name.as_str()) {
                return Err(AutocalError::Config(format!(
                    "Duplicate parameter name '{}'",
                    b.name
                )));
            }
        }

        Ok(Self { bounds })
    }

    /// Builds a space from `(name, min, max)` triples.
    pub fn from_triples<I, S>(triples: I) -> AcResult<Self>
    where
        I: IntoIterator<Item = (S, f64, f64)>,
        S: Into<String>,
    {
        let bounds = triples
            .into_iter()
            .map(|(name, min, max)| ParameterBound::new(name, min, max))
            .collect();
        Self::new(bounds)
    }

    pub fn len(&self) -> usize {
        self.bounds.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bounds.is_empty()
    }

    pub fn bounds(&self) -> &[ParameterBound] {
        &self.bounds
    }

    pub fn names(&self) -> impl Iterator<Item = &str> + '_ {
        self.bounds.iter().map(|b| b.name.as_str())
    }

    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.bounds.iter().position(|b| b.name == name)
    }

    /// Distinct component labels in declaration order.
    pub fn components(&self) -> Vec<&str> {
        let mut out: Vec<&str> = Vec::new();
        for c in self.bounds.iter().filter_map(|b| b.component.as_deref()) {
            if !out.contains(&c) {
                out.push(c);
            }
        }
        out
    }

    /// Draws every coordinate uniformly from its interval. Nothing is evaluated.
    pub fn sample(&self, rng: &mut Rng) -> Vec<f64> {
        self.bounds
            .iter()
            .map(|b| {
                // Interpolating avoids max - min overflowing on very wide intervals
                let u = rng.f64();
                (b.min * (1.0 - u) + b.max * u).clamp(b.min, b.max)
            })
            .collect()
    }

    /// True iff `values` has one coordinate per parameter, each inside its bound.
    pub fn contains(&self, values: &[f64]) -> bool {
        values.len() == self.bounds.len()
            && self
                .bounds
                .iter()
                .zip(values)
                .all(|(b, &v)| b.contains(v))
    }
}
