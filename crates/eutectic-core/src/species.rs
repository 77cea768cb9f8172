//! Species registry and pure-element derivation.

use std::collections::BTreeMap;
use std::collections::BTreeSet;

use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Name of the vacancy pseudo-element. Vacancies occupy sublattice sites
/// without contributing atoms and never get a mass-balance function.
pub const VACANCY: &str = "VA";

/// A chemical species: a name plus its constituent elements with
/// stoichiometric counts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Species {
    name: String,
    constituents: BTreeMap<String, f64>,
}

impl Species {
    /// A species with explicit constituent counts, e.g. `FE2O3`.
    pub fn new<I, S>(name: impl Into<String>, constituents: I) -> Self
    where
        I: IntoIterator<Item = (S, f64)>,
        S: Into<String>,
    {
        Species {
            name: name.into().to_uppercase(),
            constituents: constituents
                .into_iter()
                .map(|(el, count)| (el.into().to_uppercase(), count))
                .collect(),
        }
    }

    /// A single-element species, e.g. `AL`.
    pub fn pure(element: impl Into<String>) -> Self {
        let name = element.into().to_uppercase();
        let constituents = BTreeMap::from([(name.clone(), 1.0)]);
        Species { name, constituents }
    }

    /// The vacancy pseudo-species.
    pub fn vacancy() -> Self {
        Species {
            name: VACANCY.to_owned(),
            constituents: BTreeMap::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Constituent elements and their counts, ordered by element name.
    pub fn constituents(&self) -> &BTreeMap<String, f64> {
        &self.constituents
    }

    /// Stoichiometric count of `element` in this species.
    pub fn count_of(&self, element: &str) -> f64 {
        self.constituents.get(element).copied().unwrap_or(0.0)
    }

    /// Total atoms per formula unit. Zero for the vacancy.
    pub fn atoms(&self) -> f64 {
        self.constituents.values().sum()
    }
}

/// The database handle consumed by the pipeline: a species registry.
///
/// Parsing thermodynamic database files into one of these lives upstream;
/// the pipeline only resolves component names against it.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Database {
    species: FxHashMap<String, Species>,
}

impl Database {
    pub fn new() -> Self {
        Database::default()
    }

    /// Register a species, replacing any previous one with the same name.
    pub fn with_species(mut self, species: Species) -> Self {
        self.add_species(species);
        self
    }

    pub fn add_species(&mut self, species: Species) {
        self.species.insert(species.name.clone(), species);
    }

    pub fn species(&self, name: &str) -> Option<&Species> {
        self.species.get(&name.to_uppercase())
    }

    /// Resolve component names to registered species, deduplicated and
    /// sorted by species name.
    pub fn resolve_components<S: AsRef<str>>(&self, components: &[S]) -> Result<Vec<Species>> {
        let mut names = BTreeSet::new();
        for component in components {
            let name = component.as_ref().to_uppercase();
            if !self.species.contains_key(&name) {
                return Err(Error::UnknownComponent(component.as_ref().to_owned()));
            }
            names.insert(name);
        }
        Ok(names
            .into_iter()
            .filter_map(|name| self.species.get(&name).cloned())
            .collect())
    }
}

/// Pure elements covered by `species`: the union of constituent element
/// names, uppercased, vacancy excluded, sorted alphabetically.
///
/// Mass-balance functions are built one per entry, in this order.
pub fn pure_elements<'a>(species: impl IntoIterator<Item = &'a Species>) -> Vec<String> {
    let mut elements = BTreeSet::new();
    for sp in species {
        for element in sp.constituents.keys() {
            if element != VACANCY {
                elements.insert(element.clone());
            }
        }
    }
    elements.into_iter().collect()
}
