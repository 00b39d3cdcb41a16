//! Typed parameters and the condition surface used to guard transitions.
//!
//! Two parameter tables exist: the controller-local table (`GraphParam`,
//! owned by [`crate::graph::Controller`]) and the network-synchronized list
//! (`SyncedParams`). The namespace manager keeps the two name-consistent;
//! triggers only ever exist controller-locally and are bridged over the wire
//! through a separate synced bool.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ParamType {
    Bool,
    Int,
    Float,
    /// Boolean-typed one-shot signal, consumed on the transition that reads it.
    Trigger,
}

/// Parameter local to the generated controller graph.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GraphParam {
    pub name: String,
    pub ty: ParamType,
    pub default: f32,
}

/// Wire type of a synced parameter. Triggers are never synced directly.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SyncType {
    Bool,
    Int,
    Float,
}

/// Entry in the network-synchronized parameter list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SyncedParam {
    pub name: String,
    pub ty: SyncType,
    pub default: f32,
    /// Persisted between sessions by the host.
    pub saved: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SyncedParams {
    pub params: Vec<SyncedParam>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CmpOp {
    Eq,
    Ne,
    Lt,
    Gt,
    IsTrue,
    IsFalse,
}

/// Leaf comparison against a single parameter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Cmp {
    pub param: String,
    pub op: CmpOp,
    pub value: f32,
}

/// Conjunction of leaf comparisons. An empty condition never fires; the
/// driver uses an always-true bool parameter where an unconditional
/// transition is needed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Condition(pub Vec<Cmp>);

impl Condition {
    fn leaf(param: &str, op: CmpOp, value: f32) -> Self {
        Condition(vec![Cmp {
            param: param.to_string(),
            op,
            value,
        }])
    }

    /// AND-combine with another condition.
    pub fn and(mut self, other: Condition) -> Condition {
        self.0.extend(other.0);
        self
    }
}

/// Handle to a boolean (or trigger) parameter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BoolParam(String);

impl BoolParam {
    pub(crate) fn new(name: String) -> Self {
        Self(name)
    }

    pub fn name(&self) -> &str {
        &self.0
    }

    pub fn is_true(&self) -> Condition {
        Condition::leaf(&self.0, CmpOp::IsTrue, 0.0)
    }

    pub fn is_false(&self) -> Condition {
        Condition::leaf(&self.0, CmpOp::IsFalse, 0.0)
    }
}

/// Handle to a numeric (int or float) parameter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NumParam(String);

impl NumParam {
    pub(crate) fn new(name: String) -> Self {
        Self(name)
    }

    pub fn name(&self) -> &str {
        &self.0
    }

    pub fn equals(&self, value: f32) -> Condition {
        Condition::leaf(&self.0, CmpOp::Eq, value)
    }

    pub fn not_equals(&self, value: f32) -> Condition {
        Condition::leaf(&self.0, CmpOp::Ne, value)
    }

    pub fn less_than(&self, value: f32) -> Condition {
        Condition::leaf(&self.0, CmpOp::Lt, value)
    }

    pub fn greater_than(&self, value: f32) -> Condition {
        Condition::leaf(&self.0, CmpOp::Gt, value)
    }
}
