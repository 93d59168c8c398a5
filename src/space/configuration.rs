//! Typed, total assignments of values to a space's hyperparameters.

use std::sync::Arc;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::space::{HyperparameterId, HyperparameterSpec};

/// A single hyperparameter value.
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize), serde(untagged))]
pub enum Value {
    /// An integer value.
    Int(i64),
    /// A real value.
    Float(f64),
}

impl Value {
    /// Returns the value as `f64`.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn as_f64(self) -> f64 {
        match self {
            Value::Int(v) => v as f64,
            Value::Float(v) => v,
        }
    }

    /// Returns the value as `i64` if it is an integer.
    #[must_use]
    pub fn as_i64(self) -> Option<i64> {
        match self {
            Value::Int(v) => Some(v),
            Value::Float(_) => None,
        }
    }
}

impl core::fmt::Display for Value {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Value::Int(v) => write!(f, "{v}"),
            Value::Float(v) => write!(f, "{v}"),
        }
    }
}

/// Ids and names of a space's hyperparameters, in declaration order.
#[derive(Debug, PartialEq, Eq)]
pub(crate) struct Layout {
    pub(crate) ids: Vec<HyperparameterId>,
    pub(crate) names: Vec<String>,
}

/// One fully specified assignment of values to every hyperparameter of a
/// [`ConfigurationSpace`](crate::space::ConfigurationSpace).
///
/// Configurations are only created by their space, so every key is always
/// bound and every value lies within its declared bounds.
///
/// # Examples
///
/// ```
/// use budget_search::space::{ConfigurationSpace, HyperparameterSpec};
///
/// let depth = HyperparameterSpec::int("depth", 1, 16).init(4.0);
/// let lr = HyperparameterSpec::float("lr", 0.001, 1.0).init(0.1);
/// let space = ConfigurationSpace::new(vec![depth.clone(), lr.clone()]).unwrap();
///
/// let config = space.init_config();
/// assert_eq!(config.get_int(&depth), Some(4));
/// assert_eq!(config.get(&lr), Some(0.1));
/// assert_eq!(config.to_string(), "{depth: 4, lr: 0.1}");
/// ```
#[derive(Clone, Debug, PartialEq)]
pub struct Configuration {
    layout: Arc<Layout>,
    values: Vec<Value>,
}

impl Configuration {
    pub(crate) fn from_parts(layout: Arc<Layout>, values: Vec<Value>) -> Self {
        debug_assert_eq!(layout.ids.len(), values.len());
        Self { layout, values }
    }

    fn position(&self, id: HyperparameterId) -> Option<usize> {
        self.layout.ids.iter().position(|&x| x == id)
    }

    /// Returns the value of `spec` as `f64`, or `None` if `spec` is not part of this configuration.
    #[must_use]
    pub fn get(&self, spec: &HyperparameterSpec) -> Option<f64> {
        self.position(spec.id()).map(|i| self.values[i].as_f64())
    }

    /// Returns the value of an integer hyperparameter.
    #[must_use]
    pub fn get_int(&self, spec: &HyperparameterSpec) -> Option<i64> {
        self.position(spec.id())
            .and_then(|i| self.values[i].as_i64())
    }

    /// Looks a value up by hyperparameter name.
    #[must_use]
    pub fn value(&self, name: &str) -> Option<Value> {
        self.layout
            .names
            .iter()
            .position(|n| n == name)
            .map(|i| self.values[i])
    }

    /// Iterates over `(name, value)` pairs in declaration order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, Value)> + '_ {
        self.layout
            .names
            .iter()
            .map(String::as_str)
            .zip(self.values.iter().copied())
    }

    /// Returns the number of hyperparameters.
    #[must_use]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Returns `true` if the configuration has no hyperparameters.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub(crate) fn values(&self) -> &[Value] {
        &self.values
    }

    pub(crate) fn layout(&self) -> &Arc<Layout> {
        &self.layout
    }
}

impl core::fmt::Display for Configuration {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{{")?;
        for (i, (name, value)) in self.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{name}: {value}")?;
        }
        write!(f, "}}")
    }
}

#[cfg(feature = "serde")]
impl Serialize for Configuration {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        use serde::ser::SerializeMap;

        let mut map = serializer.serialize_map(Some(self.values.len()))?;
        for (name, value) in self.iter() {
            map.serialize_entry(name, &value)?;
        }
        map.end()
    }
}
