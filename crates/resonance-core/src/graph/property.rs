//! Typed, named properties on graph nodes.
//!
//! Every node exposes a small table of named properties: the state a user
//! (or another node, via forwarding) reads and writes between blocks. A
//! property carries its current value, a default, an optional range, a
//! "modified since last observation" flag, an optional post-change callback,
//! and an optional forward target. Forwarding itself — redirecting reads to
//! another node's property — is resolved one level up, by the graph, since a
//! table in isolation has no way to reach another node's table; see
//! [`super::Graph::get_property`].

use std::collections::HashMap;

use super::node::NodeId;

/// Tag identifying a property within a node's property table.
pub type PropertyTag = &'static str;

/// A 3-component vector property (position, velocity, etc).
pub type Float3 = [f32; 3];
/// A 6-component vector property, reserved for future multi-axis use.
pub type Float6 = [f32; 6];

/// Opaque reference to a loaded [`crate::buffer_asset::Buffer`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BufferHandle(pub(crate) u32);

/// A typed property value.
#[derive(Debug, Clone, PartialEq)]
pub enum PropertyValue {
    /// Integer, typically used for small discrete/enum-like selections.
    Int(i64),
    /// Single-precision float, the common case for gains, angles, etc.
    Float(f32),
    /// Double-precision float, used where seconds-since-start accumulate
    /// (buffer playback position) and `f32` would lose precision over time.
    Double(f64),
    /// Three-component vector (world-space position).
    Float3(Float3),
    /// Six-component vector, reserved.
    Float6(Float6),
    /// Free-form text.
    String(String),
    /// Reference to a loaded buffer asset, or `None` if unset.
    Buffer(Option<BufferHandle>),
}

impl PropertyValue {
    /// Returns the discriminant name, for `TYPE_MISMATCH` error messages.
    pub fn type_name(&self) -> &'static str {
        match self {
            PropertyValue::Int(_) => "int",
            PropertyValue::Float(_) => "float",
            PropertyValue::Double(_) => "double",
            PropertyValue::Float3(_) => "float3",
            PropertyValue::Float6(_) => "float6",
            PropertyValue::String(_) => "string",
            PropertyValue::Buffer(_) => "buffer",
        }
    }

    /// Extracts an `f32`, if this value is [`PropertyValue::Float`].
    pub fn as_float(&self) -> Option<f32> {
        match self {
            PropertyValue::Float(v) => Some(*v),
            _ => None,
        }
    }

    /// Extracts an `f64`, if this value is [`PropertyValue::Double`].
    pub fn as_double(&self) -> Option<f64> {
        match self {
            PropertyValue::Double(v) => Some(*v),
            _ => None,
        }
    }

    /// Extracts an `i64`, if this value is [`PropertyValue::Int`].
    pub fn as_int(&self) -> Option<i64> {
        match self {
            PropertyValue::Int(v) => Some(*v),
            _ => None,
        }
    }

    /// Extracts a [`Float3`], if this value holds one.
    pub fn as_float3(&self) -> Option<Float3> {
        match self {
            PropertyValue::Float3(v) => Some(*v),
            _ => None,
        }
    }

    /// Extracts a [`BufferHandle`], if this value is a set `Buffer` property.
    pub fn as_buffer(&self) -> Option<BufferHandle> {
        match self {
            PropertyValue::Buffer(v) => *v,
            _ => None,
        }
    }

    /// Extracts a `bool` from an `Int` property (`0` = false, anything else
    /// = true), the convention used for boolean-flavored properties like
    /// `looping`.
    pub fn as_bool(&self) -> Option<bool> {
        self.as_int().map(|v| v != 0)
    }
}

/// The range constraint attached to a property, governing `set_property`.
#[derive(Debug, Clone)]
pub enum PropertyRange {
    /// Continuous scalar range; out-of-range values are clamped silently.
    Continuous { min: f64, max: f64 },
    /// A closed set of legal integer values (tagged enums); a value outside
    /// the set is a [`PropertyError::Range`] error rather than a clamp.
    Discrete(Vec<i64>),
}

impl PropertyRange {
    fn clamp_continuous(&self, v: f64) -> f64 {
        match self {
            PropertyRange::Continuous { min, max } => v.clamp(*min, *max),
            PropertyRange::Discrete(_) => v,
        }
    }
}

/// Errors raised by property operations. Maps onto the spec's `RANGE` /
/// `TYPE_MISMATCH` error codes.
#[derive(Debug, Clone, thiserror::Error, PartialEq)]
pub enum PropertyError {
    /// No property with this tag exists on the node.
    #[error("unknown property tag `{0}`")]
    UnknownTag(&'static str),
    /// The value supplied does not match the property's variant.
    #[error("type mismatch setting `{tag}`: expected {expected}, got {got}")]
    TypeMismatch {
        /// The property tag being set.
        tag: &'static str,
        /// The variant name the property holds.
        expected: &'static str,
        /// The variant name of the value supplied.
        got: &'static str,
    },
    /// The value is outside a discrete (tagged-enum) range.
    #[error("value out of range for `{0}`")]
    Range(&'static str),
    /// Attempted to write directly to a property that forwards elsewhere.
    #[error("property `{0}` is forwarded and cannot be written directly")]
    ForwardedWrite(&'static str),
}

/// One named property slot in a node's table.
pub struct Property {
    value: PropertyValue,
    default: PropertyValue,
    range: Option<PropertyRange>,
    modified: bool,
    forward_target: Option<(NodeId, PropertyTag)>,
    post_changed: Option<Box<dyn FnMut(&PropertyValue) + Send>>,
}

impl Property {
    /// Creates a property with the given default value and no range.
    pub fn new(default: PropertyValue) -> Self {
        Self {
            value: default.clone(),
            default,
            range: None,
            modified: false,
            forward_target: None,
            post_changed: None,
        }
    }

    /// Attaches a range constraint, returning `self` for chained construction.
    pub fn with_range(mut self, range: PropertyRange) -> Self {
        self.range = Some(range);
        self
    }

    /// The property's local value (ignoring any forward target — callers
    /// that need forward resolution should go through [`super::Graph::get_property`]).
    pub fn value(&self) -> &PropertyValue {
        &self.value
    }

    /// The property's default value.
    pub fn default(&self) -> &PropertyValue {
        &self.default
    }

    /// Whether the value has been written since the previous tick boundary.
    pub fn is_modified(&self) -> bool {
        self.modified
    }

    /// Clears the modified flag. Called by the scheduler at the end of each
    /// tick so that block N+1's `process()` no longer observes block N's
    /// writes as "new" (writes landing between blocks re-set the flag).
    pub fn clear_modified(&mut self) {
        self.modified = false;
    }

    /// Registers a one-way forward target: reads of this property (via the
    /// graph) redirect to `(other_node, other_tag)`. Direct writes to a
    /// forwarded property fail with [`PropertyError::ForwardedWrite`].
    pub fn set_forward(&mut self, target: Option<(NodeId, PropertyTag)>) {
        self.forward_target = target;
    }

    /// The forward target, if any.
    pub fn forward_target(&self) -> Option<(NodeId, PropertyTag)> {
        self.forward_target
    }

    /// Installs a callback invoked synchronously after every successful set.
    pub fn set_post_changed(&mut self, cb: Option<Box<dyn FnMut(&PropertyValue) + Send>>) {
        self.post_changed = cb;
    }

    /// Writes a new value, range-clamping scalars and rejecting forwarded
    /// writes / type mismatches / out-of-range discrete values.
    pub fn set(&mut self, tag: PropertyTag, new_value: PropertyValue) -> Result<(), PropertyError> {
        if self.forward_target.is_some() {
            return Err(PropertyError::ForwardedWrite(tag));
        }
        if std::mem::discriminant(&new_value) != std::mem::discriminant(&self.value) {
            return Err(PropertyError::TypeMismatch {
                tag,
                expected: self.value.type_name(),
                got: new_value.type_name(),
            });
        }
        let clamped = match (&new_value, &self.range) {
            (PropertyValue::Float(v), Some(r)) => {
                PropertyValue::Float(r.clamp_continuous(*v as f64) as f32)
            }
            (PropertyValue::Double(v), Some(r)) => PropertyValue::Double(r.clamp_continuous(*v)),
            (PropertyValue::Int(v), Some(PropertyRange::Discrete(allowed))) => {
                if !allowed.contains(v) {
                    return Err(PropertyError::Range(tag));
                }
                new_value
            }
            (PropertyValue::Int(v), Some(r @ PropertyRange::Continuous { .. })) => {
                PropertyValue::Int(r.clamp_continuous(*v as f64) as i64)
            }
            _ => new_value,
        };
        self.value = clamped;
        self.modified = true;
        if let Some(cb) = self.post_changed.as_mut() {
            cb(&self.value);
        }
        Ok(())
    }

    /// Resets to the default value, marking the property modified.
    pub fn reset_to_default(&mut self) {
        self.value = self.default.clone();
        self.modified = true;
    }
}

/// A node's full set of named properties, keyed by static tag.
#[derive(Default)]
pub struct PropertyTable {
    entries: HashMap<PropertyTag, Property>,
}

impl PropertyTable {
    /// Creates an empty table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Declares a property with the given default (and no range).
    pub fn declare(&mut self, tag: PropertyTag, default: PropertyValue) -> &mut Self {
        self.entries.insert(tag, Property::new(default));
        self
    }

    /// Declares a property with a range constraint.
    pub fn declare_ranged(
        &mut self,
        tag: PropertyTag,
        default: PropertyValue,
        range: PropertyRange,
    ) -> &mut Self {
        self.entries.insert(tag, Property::new(default).with_range(range));
        self
    }

    /// Looks up a property by tag.
    pub fn get(&self, tag: PropertyTag) -> Result<&Property, PropertyError> {
        self.entries.get(tag).ok_or(PropertyError::UnknownTag(tag))
    }

    /// Looks up a property by tag, mutably.
    pub fn get_mut(&mut self, tag: PropertyTag) -> Result<&mut Property, PropertyError> {
        self.entries.get_mut(tag).ok_or(PropertyError::UnknownTag(tag))
    }

    /// Iterates all (tag, property) pairs, e.g. for clearing modified flags.
    pub fn iter_mut(&mut self) -> impl Iterator<Item = (&PropertyTag, &mut Property)> {
        self.entries.iter_mut()
    }
}
