//! Phase models: property dispatch and the default sublattice model.
//!
//! The pipeline talks to models through [`PhaseModel`]; anything exposing a
//! symbolic energy surface can implement it. [`SublatticeModel`] is the
//! standard implementation: a compound-energy-formalism phase whose site
//! fractions and mass bookkeeping derive from its sublattice structure,
//! with property expressions attached explicitly.
//!
//! Output selection is a closed enumeration ([`Property`]) rather than a
//! by-name attribute lookup, so an unknown property is an error at the
//! boundary instead of a failure deep inside compilation.

use std::fmt;
use std::str::FromStr;

use eutectic_expr::Expr;
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};

use crate::error::Error;
use crate::species::{Species, pure_elements};
use crate::vars::{SiteFraction, StateVariable};

/// A recognized output property.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Property {
    /// Molar Gibbs energy, `GM`.
    GibbsEnergy,
    /// Molar enthalpy, `HM`.
    Enthalpy,
    /// Molar entropy, `SM`.
    Entropy,
    /// Molar heat capacity, `CPM`.
    HeatCapacity,
}

impl Property {
    /// Canonical short name, as used in output-property requests.
    pub fn name(&self) -> &'static str {
        match self {
            Property::GibbsEnergy => "GM",
            Property::Enthalpy => "HM",
            Property::Entropy => "SM",
            Property::HeatCapacity => "CPM",
        }
    }
}

impl fmt::Display for Property {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Property {
    type Err = Error;

    fn from_str(name: &str) -> Result<Self, Error> {
        match name.to_uppercase().as_str() {
            "GM" => Ok(Property::GibbsEnergy),
            "HM" => Ok(Property::Enthalpy),
            "SM" => Ok(Property::Entropy),
            "CPM" => Ok(Property::HeatCapacity),
            _ => Err(Error::UnrecognizedProperty(name.to_owned())),
        }
    }
}

/// A per-phase thermodynamic model, as seen by the compilation pipeline.
pub trait PhaseModel: Send + Sync {
    /// Phase name this model describes.
    fn phase_name(&self) -> &str;

    /// State variables the model's expressions depend on.
    fn state_variables(&self) -> &[StateVariable];

    /// Internal degrees of freedom, in the order the model declares them.
    fn site_fractions(&self) -> &[SiteFraction];

    /// Symbolic expression for `property`, if the model defines one.
    fn output_expression(&self, property: Property) -> Option<&Expr>;

    /// Moles of `element` per mole of atoms of this phase, in terms of the
    /// model's site fractions.
    fn moles_of(&self, element: &str) -> Expr;
}

/// Phase models keyed by uppercase phase name.
pub type ModelMap = FxHashMap<String, Box<dyn PhaseModel>>;

/// Build a [`ModelMap`] from owned models.
pub fn model_map<M>(models: impl IntoIterator<Item = M>) -> ModelMap
where
    M: PhaseModel + 'static,
{
    models
        .into_iter()
        .map(|m| {
            let name = m.phase_name().to_uppercase();
            (name, Box::new(m) as Box<dyn PhaseModel>)
        })
        .collect()
}

/// One sublattice: a site count and the species that may occupy it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Sublattice {
    site_count: f64,
    constituents: Vec<Species>,
}

impl Sublattice {
    /// Constituents are sorted by species name and deduplicated, which fixes
    /// the site-fraction order within the sublattice.
    pub fn new(site_count: f64, constituents: Vec<Species>) -> Self {
        let mut constituents = constituents;
        constituents.sort_by(|a, b| a.name().cmp(b.name()));
        constituents.dedup_by(|a, b| a.name() == b.name());
        Sublattice {
            site_count,
            constituents,
        }
    }

    pub fn site_count(&self) -> f64 {
        self.site_count
    }

    pub fn constituents(&self) -> &[Species] {
        &self.constituents
    }
}

/// Compound-energy-formalism phase model.
#[derive(Debug, Clone)]
pub struct SublatticeModel {
    phase_name: String,
    sublattices: Vec<Sublattice>,
    state_variables: Vec<StateVariable>,
    site_fractions: Vec<SiteFraction>,
    properties: FxHashMap<Property, Expr>,
}

impl SublatticeModel {
    /// A model with the conventional `{P, T}` declared state variables and
    /// no property expressions yet.
    ///
    /// The phase name is canonicalized to uppercase; site fractions are
    /// derived sublattice-major, species-sorted within each sublattice.
    pub fn new(phase_name: impl Into<String>, sublattices: Vec<Sublattice>) -> Self {
        let phase_name = phase_name.into().to_uppercase();
        let mut site_fractions = Vec::new();
        for (index, sublattice) in sublattices.iter().enumerate() {
            for species in sublattice.constituents() {
                site_fractions.push(SiteFraction::new(&phase_name, index, species.name()));
            }
        }
        SublatticeModel {
            phase_name,
            sublattices,
            state_variables: vec![StateVariable::pressure(), StateVariable::temperature()],
            site_fractions,
            properties: FxHashMap::default(),
        }
    }

    /// Attach (or replace) a property expression.
    pub fn with_property(mut self, property: Property, expression: Expr) -> Self {
        self.properties.insert(property, expression);
        self
    }

    /// Override the declared state variables.
    pub fn with_state_variables(mut self, state_variables: Vec<StateVariable>) -> Self {
        self.state_variables = state_variables;
        self
    }

    pub fn sublattices(&self) -> &[Sublattice] {
        &self.sublattices
    }

    /// The site-fraction symbol for one (sublattice, species) slot.
    pub fn site_fraction(&self, sublattice: usize, species: &str) -> SiteFraction {
        SiteFraction::new(&self.phase_name, sublattice, species.to_uppercase())
    }

    /// Non-vacant pure elements covered by the model's constituents, sorted.
    /// Handy for seeding a constraint builder from a model set.
    pub fn elements(&self) -> Vec<String> {
        pure_elements(self.sublattices.iter().flat_map(|s| s.constituents()))
    }
}

impl PhaseModel for SublatticeModel {
    fn phase_name(&self) -> &str {
        &self.phase_name
    }

    fn state_variables(&self) -> &[StateVariable] {
        &self.state_variables
    }

    fn site_fractions(&self) -> &[SiteFraction] {
        &self.site_fractions
    }

    fn output_expression(&self, property: Property) -> Option<&Expr> {
        self.properties.get(&property)
    }

    fn moles_of(&self, element: &str) -> Expr {
        let element = element.to_uppercase();
        let mut moles = Vec::new();
        let mut atoms = Vec::new();
        for (index, sublattice) in self.sublattices.iter().enumerate() {
            for species in sublattice.constituents() {
                let y = Expr::Sym(
                    SiteFraction::new(&self.phase_name, index, species.name()).symbol(),
                );
                let count = species.count_of(&element);
                if count != 0.0 {
                    moles.push(Expr::Num(sublattice.site_count * count) * y.clone());
                }
                let per_unit = species.atoms();
                if per_unit != 0.0 {
                    atoms.push(Expr::Num(sublattice.site_count * per_unit) * y);
                }
            }
        }
        // Per mole of atoms; vacancies drop out of both sums.
        Expr::add(moles) / Expr::add(atoms)
    }
}
