//! The closed action catalog.
//!
//! The catalog is fixed when the space is built: the engine never invents
//! endpoints, it only instantiates descriptors listed here.

use std::collections::HashSet;

use rand::Rng;
use serde::{Deserialize, Serialize};

use ferret_model::{Action, ActionParams, Precondition, Route};

use crate::domain::ParamDomain;

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum SpaceError {
    #[error("Unknown action: {name}")]
    UnknownAction { name: String },

    #[error("Cannot generate parameter '{param}' for action '{action}': {reason}")]
    ParameterGenerationFailure {
        action: String,
        param: String,
        reason: String,
    },

    #[error("Duplicate action in catalog: {name}")]
    DuplicateAction { name: String },

    #[error("Action catalog is empty")]
    EmptyCatalog,

    #[error("Invalid catalog JSON: {0}")]
    Json(String),
}

/// Name and domain of one action parameter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParamSpec {
    pub name: String,
    pub domain: ParamDomain,
}

impl ParamSpec {
    pub fn new(name: &str, domain: ParamDomain) -> Self {
        Self {
            name: name.to_string(),
            domain,
        }
    }
}

/// A legal action: where it goes, what it takes, when it may be sent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActionDescriptor {
    pub name: String,
    pub route: Route,
    #[serde(default)]
    pub params: Vec<ParamSpec>,
    #[serde(default)]
    pub precondition: Precondition,
}

/// Ordered, finite catalog of permitted actions.
#[derive(Debug, Clone)]
pub struct ActionSpace {
    descriptors: Vec<ActionDescriptor>,
}

impl ActionSpace {
    pub fn new(descriptors: Vec<ActionDescriptor>) -> Result<Self, SpaceError> {
        if descriptors.is_empty() {
            return Err(SpaceError::EmptyCatalog);
        }
        let mut seen = HashSet::new();
        for d in &descriptors {
            if !seen.insert(d.name.as_str()) {
                return Err(SpaceError::DuplicateAction {
                    name: d.name.clone(),
                });
            }
        }
        Ok(Self { descriptors })
    }

    /// Load a catalog from a JSON array of descriptors.
    pub fn from_json(json: &str) -> Result<Self, SpaceError> {
        let descriptors: Vec<ActionDescriptor> =
            serde_json::from_str(json).map_err(|e| SpaceError::Json(e.to_string()))?;
        Self::new(descriptors)
    }

    /// The inventory-store catalog: reset, restock, drain, purchase, mode toggle.
    pub fn inventory_store() -> Self {
        let items = ["widgets", "gadgets", "doodads"];
        Self {
            descriptors: vec![
                ActionDescriptor {
                    name: "reset".into(),
                    route: Route::post("/reset"),
                    params: vec![],
                    precondition: Precondition::Always,
                },
                ActionDescriptor {
                    name: "restock".into(),
                    route: Route::post("/inventory"),
                    params: vec![
                        ParamSpec::new("item", ParamDomain::choice(&items)),
                        ParamSpec::new("quantity", ParamDomain::Int { min: 1, max: 5 }),
                    ],
                    precondition: Precondition::Always,
                },
                ActionDescriptor {
                    name: "drain_inventory".into(),
                    route: Route::post("/inventory"),
                    params: vec![
                        ParamSpec::new("item", ParamDomain::choice(&items)),
                        // Negative restock probes edge cases through a legal endpoint.
                        ParamSpec::new("quantity", ParamDomain::Int { min: -3, max: -1 }),
                    ],
                    precondition: Precondition::ParamItemInStock {
                        param: "item".into(),
                    },
                },
                ActionDescriptor {
                    name: "purchase".into(),
                    route: Route::post("/purchase"),
                    params: vec![
                        ParamSpec::new("item", ParamDomain::choice(&items)),
                        ParamSpec::new("quantity", ParamDomain::Int { min: 1, max: 6 }),
                        ParamSpec::new("expedite", ParamDomain::Bool { p_true: 0.4 }),
                    ],
                    precondition: Precondition::ModeIsNot {
                        mode: "maintenance".into(),
                    },
                },
                ActionDescriptor {
                    name: "toggle_mode".into(),
                    route: Route::post("/mode"),
                    params: vec![ParamSpec::new(
                        "mode",
                        ParamDomain::choice(&["normal", "maintenance", "slow"]),
                    )],
                    precondition: Precondition::Always,
                },
            ],
        }
    }

    /// Descriptors in catalog order. Side-effect free.
    pub fn list_actions(&self) -> &[ActionDescriptor] {
        &self.descriptors
    }

    pub fn names(&self) -> impl Iterator<Item = &str> + '_ {
        self.descriptors.iter().map(|d| d.name.as_str())
    }

    pub fn len(&self) -> usize {
        self.descriptors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.descriptors.is_empty()
    }

    pub fn descriptor(&self, name: &str) -> Option<&ActionDescriptor> {
        self.descriptors.iter().find(|d| d.name == name)
    }

    /// Catalog position of an action, used for deterministic tie-breaking.
    pub fn position(&self, name: &str) -> Option<usize> {
        self.descriptors.iter().position(|d| d.name == name)
    }

    /// Build a concrete action, drawing parameters in schema order.
    pub fn instantiate<R: Rng + ?Sized>(&self, name: &str, rng: &mut R) -> Result<Action, SpaceError> {
        let descriptor = self.lookup(name)?;
        let mut params = ActionParams::new();
        for spec in &descriptor.params {
            let value = spec.domain.generate(rng).map_err(|reason| {
                SpaceError::ParameterGenerationFailure {
                    action: descriptor.name.clone(),
                    param: spec.name.clone(),
                    reason,
                }
            })?;
            params.insert(spec.name.clone(), value);
        }
        Ok(Action::new(
            &descriptor.name,
            descriptor.route.clone(),
            params,
            descriptor.precondition.clone(),
        ))
    }

    /// Build an action with caller-supplied parameters (scripted sequences).
    ///
    /// Every schema parameter must be supplied and no others. Values are not
    /// bound-checked: a script may deliberately step outside the sampled range.
    pub fn instantiate_with(&self, name: &str, params: ActionParams) -> Result<Action, SpaceError> {
        let descriptor = self.lookup(name)?;
        for spec in &descriptor.params {
            if !params.contains_key(&spec.name) {
                return Err(SpaceError::ParameterGenerationFailure {
                    action: descriptor.name.clone(),
                    param: spec.name.clone(),
                    reason: "not provided".to_string(),
                });
            }
        }
        if let Some(extra) = params
            .keys()
            .find(|k| !descriptor.params.iter().any(|s| &s.name == *k))
        {
            return Err(SpaceError::ParameterGenerationFailure {
                action: descriptor.name.clone(),
                param: extra.clone(),
                reason: "not in the action schema".to_string(),
            });
        }
        Ok(Action::new(
            &descriptor.name,
            descriptor.route.clone(),
            params,
            descriptor.precondition.clone(),
        ))
    }

    fn lookup(&self, name: &str) -> Result<&ActionDescriptor, SpaceError> {
        self.descriptor(name).ok_or_else(|| SpaceError::UnknownAction {
            name: name.to_string(),
        })
    }
}

impl Default for ActionSpace {
    fn default() -> Self {
        Self::inventory_store()
    }
}
