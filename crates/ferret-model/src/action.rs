use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::snapshot::StateSnapshot;

/// A concrete parameter value sent to the target.
///
/// Serialized untagged so a parameter map becomes a plain JSON object body.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ParamValue {
    Bool(bool),
    Int(i64),
    Text(String),
}

impl ParamValue {
    pub fn as_text(&self) -> Option<&str> {
        match self {
            ParamValue::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            ParamValue::Int(i) => Some(*i),
            _ => None,
        }
    }

    pub fn to_json(&self) -> serde_json::Value {
        match self {
            ParamValue::Bool(b) => serde_json::Value::Bool(*b),
            ParamValue::Int(i) => serde_json::Value::from(*i),
            ParamValue::Text(s) => serde_json::Value::String(s.clone()),
        }
    }
}

impl fmt::Display for ParamValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParamValue::Bool(b) => write!(f, "{b}"),
            ParamValue::Int(i) => write!(f, "{i}"),
            ParamValue::Text(s) => write!(f, "{s}"),
        }
    }
}

/// Parameter name -> value. BTreeMap keeps request bodies and artifacts
/// byte-stable across runs.
pub type ActionParams = BTreeMap<String, ParamValue>;

/// HTTP method used for an action route.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Method {
    Get,
    Post,
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Method::Get => f.write_str("GET"),
            Method::Post => f.write_str("POST"),
        }
    }
}

/// Where an action is sent on the target.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Route {
    pub method: Method,
    pub path: String,
}

impl Route {
    pub fn post(path: &str) -> Self {
        Self {
            method: Method::Post,
            path: path.to_string(),
        }
    }

    pub fn get(path: &str) -> Self {
        Self {
            method: Method::Get,
            path: path.to_string(),
        }
    }
}

/// Pure predicate over the last known snapshot and the action's own parameters.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Precondition {
    #[default]
    Always,
    /// Holds unless the target reports exactly this mode.
    ModeIsNot { mode: String },
    /// The item named by parameter `param` has positive stock.
    ParamItemInStock { param: String },
    All { all: Vec<Precondition> },
}

impl Precondition {
    pub fn holds(&self, snapshot: &StateSnapshot, params: &ActionParams) -> bool {
        match self {
            Precondition::Always => true,
            Precondition::ModeIsNot { mode } => snapshot.mode.as_deref() != Some(mode.as_str()),
            Precondition::ParamItemInStock { param } => params
                .get(param)
                .and_then(ParamValue::as_text)
                .map(|item| snapshot.quantity(item) > 0)
                .unwrap_or(false),
            Precondition::All { all } => all.iter().all(|p| p.holds(snapshot, params)),
        }
    }
}

/// One whitelisted, parameterized operation. Immutable once built.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Action {
    name: String,
    #[serde(flatten)]
    route: Route,
    params: ActionParams,
    #[serde(default)]
    precondition: Precondition,
}

impl Action {
    pub fn new(name: &str, route: Route, params: ActionParams, precondition: Precondition) -> Self {
        Self {
            name: name.to_string(),
            route,
            params,
            precondition,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn route(&self) -> &Route {
        &self.route
    }

    pub fn params(&self) -> &ActionParams {
        &self.params
    }

    pub fn precondition(&self) -> &Precondition {
        &self.precondition
    }

    pub fn precondition_holds(&self, snapshot: &StateSnapshot) -> bool {
        self.precondition.holds(snapshot, &self.params)
    }

    /// JSON request body built from the parameters.
    pub fn body(&self) -> serde_json::Value {
        serde_json::Value::Object(
            self.params
                .iter()
                .map(|(k, v)| (k.clone(), v.to_json()))
                .collect(),
        )
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}(", self.name)?;
        for (i, (k, v)) in self.params.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{k}={v}")?;
        }
        f.write_str(")")
    }
}
