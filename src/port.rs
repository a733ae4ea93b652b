// src/port.rs
//
// Parameter values, their domains, and typed port handles.

use std::fmt;
use std::marker::PhantomData;
use std::sync::Arc;

use crate::tree::NodeId;

/// Type of value a parameter port carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ValueType {
    Int,
    Float,
    Bool,
}

/// A dynamically typed parameter value.
///
/// This is the form values take when they travel by path
/// (dispatch/query) or across the hand-off to the render context.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ParamValue {
    Int(i32),
    Float(f32),
    Bool(bool),
}

impl ParamValue {
    pub fn value_type(&self) -> ValueType {
        match self {
            ParamValue::Int(_) => ValueType::Int,
            ParamValue::Float(_) => ValueType::Float,
            ParamValue::Bool(_) => ValueType::Bool,
        }
    }

    /// Numeric view used for range checks. Booleans map to 0/1.
    #[inline]
    pub fn as_f64(&self) -> f64 {
        match *self {
            ParamValue::Int(v) => v as f64,
            ParamValue::Float(v) => v as f64,
            ParamValue::Bool(v) => {
                if v {
                    1.0
                } else {
                    0.0
                }
            }
        }
    }
}

impl fmt::Display for ParamValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParamValue::Int(v) => write!(f, "{v}"),
            ParamValue::Float(v) => write!(f, "{v:.3}"),
            ParamValue::Bool(v) => write!(f, "{v}"),
        }
    }
}

/// Rust types that can back a typed port.
pub trait PortValue: Copy + Send + 'static {
    const TYPE: ValueType;

    fn into_value(self) -> ParamValue;

    fn from_value(value: &ParamValue) -> Option<Self>;
}

impl PortValue for i32 {
    const TYPE: ValueType = ValueType::Int;

    fn into_value(self) -> ParamValue {
        ParamValue::Int(self)
    }

    fn from_value(value: &ParamValue) -> Option<Self> {
        match *value {
            ParamValue::Int(v) => Some(v),
            _ => None,
        }
    }
}

impl PortValue for f32 {
    const TYPE: ValueType = ValueType::Float;

    fn into_value(self) -> ParamValue {
        ParamValue::Float(self)
    }

    fn from_value(value: &ParamValue) -> Option<Self> {
        match *value {
            ParamValue::Float(v) => Some(v),
            _ => None,
        }
    }
}

impl PortValue for bool {
    const TYPE: ValueType = ValueType::Bool;

    fn into_value(self) -> ParamValue {
        ParamValue::Bool(self)
    }

    fn from_value(value: &ParamValue) -> Option<Self> {
        match *value {
            ParamValue::Bool(v) => Some(v),
            _ => None,
        }
    }
}

type Check = Arc<dyn Fn(&ParamValue) -> bool + Send + Sync>;

/// The set of values a parameter port accepts.
///
/// The numeric limits come from the synthesis backend, so a domain is
/// supplied per port rather than being fixed by the tree.
#[derive(Clone, Default)]
pub struct ParamDomain {
    min: Option<f64>,
    max: Option<f64>,
    check: Option<Check>,
}

impl ParamDomain {
    /// Accept every value of the port's type.
    pub fn any() -> Self {
        Self::default()
    }

    /// Inclusive numeric range.
    pub fn range(min: f64, max: f64) -> Self {
        Self {
            min: Some(min),
            max: Some(max),
            check: None,
        }
    }

    /// Add a custom predicate, evaluated after the range.
    pub fn with_check<F>(mut self, check: F) -> Self
    where
        F: Fn(&ParamValue) -> bool + Send + Sync + 'static,
    {
        self.check = Some(Arc::new(check));
        self
    }

    pub fn min(&self) -> Option<f64> {
        self.min
    }

    pub fn max(&self) -> Option<f64> {
        self.max
    }

    pub fn contains(&self, value: &ParamValue) -> bool {
        let v = value.as_f64();
        if v.is_nan() {
            return false;
        }
        if self.min.is_some_and(|min| v < min) || self.max.is_some_and(|max| v > max) {
            return false;
        }
        self.check.as_ref().is_none_or(|check| check(value))
    }
}

impl fmt::Debug for ParamDomain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ParamDomain")
            .field("min", &self.min)
            .field("max", &self.max)
            .field("check", &self.check.is_some())
            .finish()
    }
}

/// Everything needed to construct a parameter port.
#[derive(Debug, Clone)]
pub struct PortSpec {
    pub default: ParamValue,
    pub domain: ParamDomain,
}

impl PortSpec {
    pub fn new(default: ParamValue) -> Self {
        Self {
            default,
            domain: ParamDomain::any(),
        }
    }

    pub fn domain(mut self, domain: ParamDomain) -> Self {
        self.domain = domain;
        self
    }

    pub fn value_type(&self) -> ValueType {
        self.default.value_type()
    }
}

/// Runtime state of a parameter port, stored in its tree node.
#[derive(Debug, Clone)]
pub struct PortState {
    pub(crate) path: Arc<str>,
    pub(crate) value: ParamValue,
    pub(crate) domain: ParamDomain,
}

impl PortState {
    pub(crate) fn new(path: Arc<str>, spec: PortSpec) -> Self {
        Self {
            path,
            value: spec.default,
            domain: spec.domain,
        }
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn value(&self) -> ParamValue {
        self.value
    }

    pub fn domain(&self) -> &ParamDomain {
        &self.domain
    }
}

/// Typed handle to a parameter port.
///
/// Cheap to copy; the value itself lives in the tree.
pub struct PortRef<T> {
    id: NodeId,
    _marker: PhantomData<fn() -> T>,
}

impl<T> PortRef<T> {
    pub(crate) fn new(id: NodeId) -> Self {
        Self {
            id,
            _marker: PhantomData,
        }
    }

    pub fn id(&self) -> NodeId {
        self.id
    }
}

impl<T> Clone for PortRef<T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Copy for PortRef<T> {}

impl<T> PartialEq for PortRef<T> {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl<T> fmt::Debug for PortRef<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PortRef({:?})", self.id)
    }
}

/// Discrete events a command port can emit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CommandKind {
    NoteOn,
    NoteOff,
}

impl CommandKind {
    /// Number of arguments accepted by path dispatch.
    pub const ARITY: usize = 3;
}

/// Handle to a write-only command port.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CommandRef {
    id: NodeId,
    kind: CommandKind,
}

impl CommandRef {
    pub(crate) fn new(id: NodeId, kind: CommandKind) -> Self {
        Self { id, kind }
    }

    pub fn id(&self) -> NodeId {
        self.id
    }

    pub fn kind(&self) -> CommandKind {
        self.kind
    }
}
