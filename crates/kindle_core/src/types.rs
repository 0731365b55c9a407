// types.rs - Reflection-free type indexing
//
// Every kind of component, system or category gets a dense index inside
// a named type space. Rust types are keyed by `TypeId`, data-driven kinds
// (contact categories, materials) by name. Lookups only happen at
// registration; hot paths carry the returned `TypeKey`.

use std::any::TypeId;
use std::borrow::Cow;
use std::collections::HashMap;
use std::fmt;
use thiserror::Error;

use crate::aspect::Aspect;

/// Handle to a type space inside a [`TypeRegistry`].
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SpaceId(u16);

impl SpaceId {
    #[inline]
    pub const fn raw(self) -> u16 {
        self.0
    }
}

/// A kind registered in a type space: the space plus its dense index.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TypeKey {
    space: SpaceId,
    index: u32,
}

impl TypeKey {
    pub(crate) const fn new(space: SpaceId, index: usize) -> Self {
        Self {
            space,
            index: index as u32,
        }
    }

    #[inline]
    pub const fn space(self) -> SpaceId {
        self.space
    }

    #[inline]
    pub const fn index(self) -> usize {
        self.index as usize
    }
}

impl fmt::Display for TypeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.space.0, self.index)
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TypeError {
    #[error("type space '{space}' is full ({capacity} kinds)")]
    TooManyTypes { space: String, capacity: usize },

    #[error("type space {space:?} does not exist")]
    UnknownSpace { space: SpaceId },
}

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
enum Kind {
    Type(TypeId),
    Named(Cow<'static, str>),
}

#[derive(Debug)]
struct TypeSpace {
    name: String,
    capacity: usize,
    by_type: HashMap<TypeId, u32>,
    by_name: HashMap<Cow<'static, str>, u32>,
    names: Vec<Cow<'static, str>>,
}

/// Registry of type spaces. Constructed explicitly and owned by whoever
/// needs it; there is no process-wide instance.
#[derive(Debug, Default)]
pub struct TypeRegistry {
    spaces: Vec<TypeSpace>,
}

impl TypeRegistry {
    pub fn new() -> Self {
        Self { spaces: Vec::new() }
    }

    /// Define a new type space holding at most `capacity` kinds.
    pub fn define_space(&mut self, name: impl Into<String>, capacity: usize) -> SpaceId {
        let id = SpaceId(self.spaces.len() as u16);
        let name = name.into();
        tracing::debug!(space = %name, capacity, "type space defined");
        self.spaces.push(TypeSpace {
            name,
            capacity,
            by_type: HashMap::new(),
            by_name: HashMap::new(),
            names: Vec::new(),
        });
        id
    }

    /// Index of the Rust type `T` in `space`, assigned on first request.
    pub fn key_of<T: 'static>(&mut self, space: SpaceId) -> Result<TypeKey, TypeError> {
        let name = Cow::Borrowed(short_type_name::<T>());
        self.key_for(space, Kind::Type(TypeId::of::<T>()), name)
    }

    /// Index of a named kind in `space`, assigned on first request.
    pub fn key_named(
        &mut self,
        space: SpaceId,
        name: impl Into<Cow<'static, str>>,
    ) -> Result<TypeKey, TypeError> {
        let name = name.into();
        self.key_for(space, Kind::Named(name.clone()), name)
    }

    /// Already-assigned key for `T`, without registering it.
    pub fn lookup<T: 'static>(&self, space: SpaceId) -> Option<TypeKey> {
        let ts = self.spaces.get(space.0 as usize)?;
        ts.by_type
            .get(&TypeId::of::<T>())
            .map(|&index| TypeKey { space, index })
    }

    /// Already-assigned key for a named kind, without registering it.
    pub fn lookup_named(&self, space: SpaceId, name: &str) -> Option<TypeKey> {
        let ts = self.spaces.get(space.0 as usize)?;
        ts.by_name
            .get(name)
            .map(|&index| TypeKey { space, index })
    }

    /// Human-readable name of a key (type name or registered name).
    pub fn name_of(&self, key: TypeKey) -> Option<&str> {
        self.spaces
            .get(key.space.0 as usize)?
            .names
            .get(key.index())
            .map(|n| n.as_ref())
    }

    pub fn space_name(&self, space: SpaceId) -> Option<&str> {
        self.spaces.get(space.0 as usize).map(|s| s.name.as_str())
    }

    /// Number of kinds registered so far in `space`.
    pub fn len(&self, space: SpaceId) -> usize {
        self.spaces.get(space.0 as usize).map_or(0, |s| s.names.len())
    }

    pub fn capacity(&self, space: SpaceId) -> usize {
        self.spaces.get(space.0 as usize).map_or(0, |s| s.capacity)
    }

    /// Empty aspect sized for the kinds currently registered in `space`.
    pub fn new_aspect(&self, space: SpaceId) -> Aspect {
        Aspect::with_capacity(space, self.len(space))
    }

    fn key_for(
        &mut self,
        space: SpaceId,
        kind: Kind,
        name: Cow<'static, str>,
    ) -> Result<TypeKey, TypeError> {
        let ts = self
            .spaces
            .get_mut(space.0 as usize)
            .ok_or(TypeError::UnknownSpace { space })?;

        let existing = match &kind {
            Kind::Type(id) => ts.by_type.get(id),
            Kind::Named(name) => ts.by_name.get(&**name),
        };
        if let Some(&index) = existing {
            return Ok(TypeKey { space, index });
        }

        if ts.names.len() >= ts.capacity {
            return Err(TypeError::TooManyTypes {
                space: ts.name.clone(),
                capacity: ts.capacity,
            });
        }

        let index = ts.names.len() as u32;
        tracing::trace!(space = %ts.name, index, kind = %name, "kind registered");
        match kind {
            Kind::Type(id) => ts.by_type.insert(id, index),
            Kind::Named(name) => ts.by_name.insert(name, index),
        };
        ts.names.push(name);
        Ok(TypeKey { space, index })
    }
}

fn short_type_name<T: ?Sized>() -> &'static str {
    let full = std::any::type_name::<T>();
    full.rsplit("::").next().unwrap_or(full)
}
