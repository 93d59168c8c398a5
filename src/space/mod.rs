//! Configuration spaces: per-candidate hyperparameter domains.
//!
//! A [`ConfigurationSpace`] is an ordered, validated list of
//! [`HyperparameterSpec`]s, partitioned into a *primary* group (complexity
//! related hyperparameters, whose value changes the model's size) and a
//! *secondary* group (everything else). Local search alternates between
//! the two groups when it stalls.
//!
//! # Examples
//!
//! ```
//! use budget_search::space::{ConfigurationSpace, Group, HyperparameterSpec};
//!
//! let n_estimators = HyperparameterSpec::int("n_estimators", 4, 32_768)
//!     .complexity_related()
//!     .scales_with_sample_size();
//! let lr = HyperparameterSpec::float("learning_rate", 0.01, 1.0).init(0.1);
//! let space = ConfigurationSpace::new(vec![n_estimators.clone(), lr]).unwrap();
//!
//! assert_eq!(space.dim(), 2);
//! assert_eq!(space.group(Group::Primary).len(), 1);
//! assert_eq!(space.max_config(500).get_int(&n_estimators), Some(500));
//! ```

mod configuration;
mod hyperparameter;

use std::sync::Arc;

pub use configuration::{Configuration, Value};
pub(crate) use configuration::Layout;
pub use hyperparameter::{HyperparameterId, HyperparameterSpec};

use crate::error::{Error, Result};

/// One of the two hyperparameter groups perturbed by local search.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Group {
    /// Complexity-related hyperparameters.
    Primary,
    /// All other hyperparameters.
    Secondary,
}

impl Group {
    /// Returns the other group.
    #[must_use]
    pub fn other(self) -> Self {
        match self {
            Group::Primary => Group::Secondary,
            Group::Secondary => Group::Primary,
        }
    }
}

/// An ordered mapping `name -> HyperparameterSpec` for one candidate.
#[derive(Clone, Debug)]
pub struct ConfigurationSpace {
    specs: Vec<HyperparameterSpec>,
    layout: Arc<Layout>,
    primary: Vec<usize>,
    secondary: Vec<usize>,
}

impl ConfigurationSpace {
    /// Creates a space from hyperparameter specs, validating each of them.
    ///
    /// # Errors
    ///
    /// Returns [`Error::EmptySpace`] for an empty list,
    /// [`Error::DuplicateHyperparameter`] for repeated names, or the
    /// validation error of the first invalid spec.
    pub fn new(specs: Vec<HyperparameterSpec>) -> Result<Self> {
        if specs.is_empty() {
            return Err(Error::EmptySpace);
        }
        let mut names: Vec<String> = Vec::with_capacity(specs.len());
        for spec in &specs {
            spec.validate()?;
            if names.iter().any(|n| n == spec.name()) {
                return Err(Error::DuplicateHyperparameter(spec.name().to_string()));
            }
            names.push(spec.name().to_string());
        }
        let (primary, secondary): (Vec<usize>, Vec<usize>) =
            (0..specs.len()).partition(|&i| specs[i].is_complexity_related());
        let layout = Arc::new(Layout {
            ids: specs.iter().map(HyperparameterSpec::id).collect(),
            names,
        });
        Ok(Self {
            specs,
            layout,
            primary,
            secondary,
        })
    }

    /// Returns the hyperparameter specs in declaration order.
    #[must_use]
    pub fn specs(&self) -> &[HyperparameterSpec] {
        &self.specs
    }

    /// Returns the number of hyperparameters.
    #[must_use]
    pub fn dim(&self) -> usize {
        self.specs.len()
    }

    /// Returns the indices (into [`specs`](Self::specs)) of a group's members.
    #[must_use]
    pub fn group(&self, group: Group) -> &[usize] {
        match group {
            Group::Primary => &self.primary,
            Group::Secondary => &self.secondary,
        }
    }

    /// Complexity-related hyperparameters.
    pub fn primary(&self) -> impl Iterator<Item = &HyperparameterSpec> + '_ {
        self.primary.iter().map(|&i| &self.specs[i])
    }

    /// Hyperparameters that do not drive model size.
    pub fn secondary(&self) -> impl Iterator<Item = &HyperparameterSpec> + '_ {
        self.secondary.iter().map(|&i| &self.specs[i])
    }

    /// Returns the spec with the given name.
    #[must_use]
    pub fn spec(&self, name: &str) -> Option<&HyperparameterSpec> {
        self.specs.iter().find(|s| s.name() == name)
    }

    /// Configuration with every hyperparameter at its lower bound.
    #[must_use]
    pub fn min_config(&self) -> Configuration {
        self.build(self.specs.iter().map(HyperparameterSpec::lower), None)
    }

    /// Configuration with every hyperparameter at its upper bound; size-like
    /// hyperparameters are capped at `min(upper, sample_size_cap)`.
    #[must_use]
    pub fn max_config(&self, sample_size_cap: usize) -> Configuration {
        self.build(
            self.specs.iter().map(HyperparameterSpec::upper),
            Some(sample_size_cap),
        )
    }

    /// Configuration with every hyperparameter at its initial value.
    #[must_use]
    pub fn init_config(&self) -> Configuration {
        self.build(self.specs.iter().map(HyperparameterSpec::init_value), None)
    }

    /// Builds a total configuration from the initial values overridden by `pairs`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnknownHyperparameter`] if a spec does not belong to this
    /// space, or [`Error::ValueOutOfBounds`] if a value lies outside its bounds.
    pub fn configure<'a>(
        &self,
        pairs: impl IntoIterator<Item = (&'a HyperparameterSpec, f64)>,
    ) -> Result<Configuration> {
        let mut raw: Vec<f64> = self.specs.iter().map(HyperparameterSpec::init_value).collect();
        for (spec, value) in pairs {
            let idx = self
                .specs
                .iter()
                .position(|s| s.id() == spec.id())
                .ok_or_else(|| Error::UnknownHyperparameter(spec.name().to_string()))?;
            if !value.is_finite() || value < spec.lower() || value > spec.upper() {
                return Err(Error::ValueOutOfBounds {
                    name: spec.name().to_string(),
                    value,
                });
            }
            raw[idx] = value;
        }
        Ok(self.build(raw, None))
    }

    /// Verifies that `config` belongs to this space and respects every bound.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ConfigurationMismatch`] or [`Error::ValueOutOfBounds`].
    pub fn check(&self, config: &Configuration) -> Result<()> {
        if config.layout().as_ref() != self.layout.as_ref() {
            return Err(Error::ConfigurationMismatch);
        }
        for (spec, &value) in self.specs.iter().zip(config.values()) {
            if !spec.contains(value) {
                return Err(Error::ValueOutOfBounds {
                    name: spec.name().to_string(),
                    value: value.as_f64(),
                });
            }
        }
        Ok(())
    }

    /// Rounds and clips raw values into a configuration valid at `sample_size`.
    pub(crate) fn build(
        &self,
        raw: impl IntoIterator<Item = f64>,
        sample_size: Option<usize>,
    ) -> Configuration {
        let values = self
            .specs
            .iter()
            .zip(raw)
            .map(|(spec, v)| spec.clip(v, sample_size))
            .collect();
        Configuration::from_parts(Arc::clone(&self.layout), values)
    }

    /// Re-clips an existing configuration to the bounds in effect at `sample_size`.
    pub(crate) fn clip_to_sample(&self, config: &Configuration, sample_size: usize) -> Configuration {
        self.build(
            config.values().iter().copied().map(Value::as_f64),
            Some(sample_size),
        )
    }
}
