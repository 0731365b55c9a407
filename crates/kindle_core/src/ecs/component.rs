// component.rs - Entity component trait and type-erased per-kind storage
//
// Each component kind gets one column: an arena indexed by entity id.
// Columns are addressed by the kind's dense index in the component type
// space, so lookups never go through names.

use crate::ecs::AttributeError;
use crate::ecs::AttributeMap;
use crate::pool::Arena;
use std::any::Any;

/// Data attachable to an entity.
///
/// `Default` provides the blank instance that attribute maps are applied
/// to; `from_attributes` should only touch fields whose keys are present.
/// `Clone` lets a failed edit put the previous value back.
pub trait EntityComponent: Any + Default + Clone {
    /// Human-readable name for logs and attribute exports.
    const NAME: &'static str;

    fn from_attributes(&mut self, attributes: &AttributeMap) -> Result<(), AttributeError> {
        let _ = attributes;
        Ok(())
    }

    fn to_attributes(&self, attributes: &mut AttributeMap) {
        let _ = attributes;
    }
}

/// Type-erased column operations the registry needs without knowing `T`.
pub(crate) trait ComponentColumn: Any {
    fn name(&self) -> &'static str;

    fn contains(&self, entity: usize) -> bool;

    fn remove(&mut self, entity: usize) -> bool;

    /// Store a boxed `T`; panics on a type mismatch, which the builder rules
    /// out by construction.
    fn insert_boxed(&mut self, entity: usize, value: Box<dyn Any>);

    /// Apply attributes to the existing component or to a fresh default.
    /// Returns whether a new component was attached.
    fn apply_attributes(
        &mut self,
        entity: usize,
        attributes: &AttributeMap,
    ) -> Result<bool, AttributeError>;

    fn export(&self, entity: usize) -> Option<AttributeMap>;

    /// Boxed copy of the entity's component, for restoring after a failed edit.
    fn snapshot(&self, entity: usize) -> Option<Box<dyn Any>>;

    fn get_any(&self, entity: usize) -> Option<&dyn Any>;

    fn as_any(&self) -> &dyn Any;

    fn as_any_mut(&mut self) -> &mut dyn Any;
}

pub(crate) struct Column<T> {
    items: Arena<T>,
}

impl<T: EntityComponent> Column<T> {
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            items: Arena::with_capacity(capacity),
        }
    }

    #[inline]
    pub fn get(&self, entity: usize) -> Option<&T> {
        self.items.get(entity)
    }

    #[inline]
    pub fn get_mut(&mut self, entity: usize) -> Option<&mut T> {
        self.items.get_mut(entity)
    }

    pub fn set(&mut self, entity: usize, value: T) -> Option<T> {
        self.items.set(entity, value)
    }

    pub fn take(&mut self, entity: usize) -> Option<T> {
        self.items.remove(entity)
    }
}

impl<T: EntityComponent> ComponentColumn for Column<T> {
    fn name(&self) -> &'static str {
        T::NAME
    }

    fn contains(&self, entity: usize) -> bool {
        self.items.contains(entity)
    }

    fn remove(&mut self, entity: usize) -> bool {
        self.items.remove(entity).is_some()
    }

    fn insert_boxed(&mut self, entity: usize, value: Box<dyn Any>) {
        match value.downcast::<T>() {
            Ok(value) => {
                self.items.set(entity, *value);
            }
            Err(_) => panic!("component payload is not a {}", T::NAME),
        }
    }

    fn apply_attributes(
        &mut self,
        entity: usize,
        attributes: &AttributeMap,
    ) -> Result<bool, AttributeError> {
        if let Some(existing) = self.items.get_mut(entity) {
            existing.from_attributes(attributes)?;
            return Ok(false);
        }
        let mut fresh = T::default();
        fresh.from_attributes(attributes)?;
        self.items.set(entity, fresh);
        Ok(true)
    }

    fn export(&self, entity: usize) -> Option<AttributeMap> {
        let component = self.items.get(entity)?;
        let mut attributes = AttributeMap::new();
        component.to_attributes(&mut attributes);
        Some(attributes)
    }

    fn snapshot(&self, entity: usize) -> Option<Box<dyn Any>> {
        self.items
            .get(entity)
            .map(|c| Box::new(c.clone()) as Box<dyn Any>)
    }

    fn get_any(&self, entity: usize) -> Option<&dyn Any> {
        self.items.get(entity).map(|c| c as &dyn Any)
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

/// Helper macro implementing [`EntityComponent`] with no attribute support.
///
/// # Example
/// ```ignore
/// #[derive(Default, Clone)]
/// struct Tag;
/// define_component!(Tag, "Tag");
/// ```
#[macro_export]
macro_rules! define_component {
    ($ty:ty, $name:expr) => {
        impl $crate::ecs::EntityComponent for $ty {
            const NAME: &'static str = $name;
        }
    };
}
