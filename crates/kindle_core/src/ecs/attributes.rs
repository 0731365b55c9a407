//! Attribute maps: generic key/value input for building components.
//!
//! An [`AttributeKey`] names one field of one component type and fixes the
//! value type at compile time. Values are carried as [`AttributeValue`] so a
//! builder can collect them before the component exists.

use crate::geom::{BitMask, Rect};
use crate::types::TypeKey;
use glam::Vec2;
use std::fmt;
use std::marker::PhantomData;
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AttributeError {
    #[error("attribute '{key}' expects {expected} but holds {found}")]
    TypeMismatch {
        key: &'static str,
        expected: &'static str,
        found: &'static str,
    },

    #[error("attribute '{key}' is invalid: {reason}")]
    Invalid { key: &'static str, reason: String },
}

/// Typed key for attribute `V` of component `C`.
pub struct AttributeKey<C, V> {
    name: &'static str,
    _marker: PhantomData<fn() -> (C, V)>,
}

impl<C, V> AttributeKey<C, V> {
    pub const fn new(name: &'static str) -> Self {
        Self {
            name,
            _marker: PhantomData,
        }
    }

    #[inline]
    pub const fn name(&self) -> &'static str {
        self.name
    }
}

impl<C, V> Clone for AttributeKey<C, V> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<C, V> Copy for AttributeKey<C, V> {}

impl<C, V> fmt::Debug for AttributeKey<C, V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "AttributeKey({})", self.name)
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum AttributeValue {
    Int(i64),
    Float(f32),
    Bool(bool),
    Text(String),
    Vec2(Vec2),
    Rect(Rect),
    Key(TypeKey),
    Mask(BitMask),
}

impl AttributeValue {
    pub fn kind(&self) -> &'static str {
        match self {
            AttributeValue::Int(_) => "Int",
            AttributeValue::Float(_) => "Float",
            AttributeValue::Bool(_) => "Bool",
            AttributeValue::Text(_) => "Text",
            AttributeValue::Vec2(_) => "Vec2",
            AttributeValue::Rect(_) => "Rect",
            AttributeValue::Key(_) => "Key",
            AttributeValue::Mask(_) => "Mask",
        }
    }
}

impl fmt::Display for AttributeValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AttributeValue::Int(v) => write!(f, "{v}"),
            AttributeValue::Float(v) => write!(f, "{v:?}"),
            AttributeValue::Bool(v) => write!(f, "{v}"),
            AttributeValue::Text(v) => f.write_str(v),
            AttributeValue::Vec2(v) => write!(f, "({:?},{:?})", v.x, v.y),
            AttributeValue::Rect(v) => write!(f, "{v}"),
            AttributeValue::Key(v) => write!(f, "{v}"),
            AttributeValue::Mask(v) => write!(f, "mask{}", v.region()),
        }
    }
}

/// Conversion out of an [`AttributeValue`].
pub trait FromAttribute: Sized {
    const KIND: &'static str;

    fn from_attribute(value: &AttributeValue) -> Option<Self>;
}

macro_rules! attribute_conversions {
    ($($ty:ty => $variant:ident as $kind:literal, |$v:ident| $out:expr, |$i:ident| $into:expr;)*) => {
        $(
            impl FromAttribute for $ty {
                const KIND: &'static str = $kind;

                fn from_attribute(value: &AttributeValue) -> Option<Self> {
                    match value {
                        AttributeValue::$variant($v) => $out,
                        _ => None,
                    }
                }
            }

            impl From<$ty> for AttributeValue {
                fn from($i: $ty) -> Self {
                    AttributeValue::$variant($into)
                }
            }
        )*
    };
}

attribute_conversions! {
    i64 => Int as "Int", |v| Some(*v), |v| v;
    i32 => Int as "Int", |v| i32::try_from(*v).ok(), |v| v as i64;
    u32 => Int as "Int", |v| u32::try_from(*v).ok(), |v| v as i64;
    f32 => Float as "Float", |v| Some(*v), |v| v;
    bool => Bool as "Bool", |v| Some(*v), |v| v;
    String => Text as "Text", |v| Some(v.clone()), |v| v;
    Vec2 => Vec2 as "Vec2", |v| Some(*v), |v| v;
    Rect => Rect as "Rect", |v| Some(*v), |v| v;
    TypeKey => Key as "Key", |v| Some(*v), |v| v;
    BitMask => Mask as "Mask", |v| Some(v.clone()), |v| v;
}

impl From<&str> for AttributeValue {
    fn from(value: &str) -> Self {
        AttributeValue::Text(value.to_owned())
    }
}

/// Ordered attribute values for one component.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct AttributeMap {
    entries: Vec<(&'static str, AttributeValue)>,
}

impl AttributeMap {
    pub fn new() -> Self {
        Self {
            entries: Vec::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// Store `value` under `key`, replacing an earlier value.
    pub fn put<C, V: Into<AttributeValue>>(&mut self, key: AttributeKey<C, V>, value: V) {
        self.put_value(key.name(), value.into());
    }

    pub fn put_value(&mut self, name: &'static str, value: AttributeValue) {
        match self.entries.iter_mut().find(|(n, _)| *n == name) {
            Some(entry) => entry.1 = value,
            None => self.entries.push((name, value)),
        }
    }

    pub fn raw(&self, name: &str) -> Option<&AttributeValue> {
        self.entries
            .iter()
            .find(|(n, _)| *n == name)
            .map(|(_, v)| v)
    }

    pub fn contains<C, V>(&self, key: AttributeKey<C, V>) -> bool {
        self.raw(key.name()).is_some()
    }

    /// Typed read; `Ok(None)` when unset.
    pub fn get<C, V: FromAttribute>(
        &self,
        key: AttributeKey<C, V>,
    ) -> Result<Option<V>, AttributeError> {
        match self.raw(key.name()) {
            None => Ok(None),
            Some(value) => V::from_attribute(value)
                .map(Some)
                .ok_or(AttributeError::TypeMismatch {
                    key: key.name(),
                    expected: V::KIND,
                    found: value.kind(),
                }),
        }
    }

    /// Typed read falling back to `default` when unset.
    pub fn value_or<C, V: FromAttribute>(
        &self,
        key: AttributeKey<C, V>,
        default: V,
    ) -> Result<V, AttributeError> {
        Ok(self.get(key)?.unwrap_or(default))
    }

    /// Overwrite `target` if the key is set.
    pub fn read_into<C, V: FromAttribute>(
        &self,
        key: AttributeKey<C, V>,
        target: &mut V,
    ) -> Result<(), AttributeError> {
        if let Some(value) = self.get(key)? {
            *target = value;
        }
        Ok(())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&'static str, &AttributeValue)> {
        self.entries.iter().map(|(n, v)| (*n, v))
    }
}

impl fmt::Display for AttributeMap {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, (name, value)) in self.entries.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{name}={value}")?;
        }
        Ok(())
    }
}
