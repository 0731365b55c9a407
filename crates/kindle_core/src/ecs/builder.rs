use crate::ecs::{AttributeKey, AttributeMap, AttributeValue, EntityComponent, EntityRegistry};
use crate::types::{TypeError, TypeKey};
use std::any::{Any, TypeId};
use std::fmt;

type Register = fn(&mut EntityRegistry) -> Result<TypeKey, TypeError>;

/// Pending data for one component kind.
pub(crate) struct PendingComponent {
    pub(crate) type_id: TypeId,
    pub(crate) name: &'static str,
    pub(crate) register: Register,
    pub(crate) value: Option<Box<dyn Any>>,
    pub(crate) attributes: AttributeMap,
}

fn register<C: EntityComponent>(registry: &mut EntityRegistry) -> Result<TypeKey, TypeError> {
    registry.component_key::<C>()
}

/// Scratch space for an entity that has not been committed yet.
///
/// Nothing here is visible to the registry until it is passed to
/// [`EntityRegistry::build`] or [`EntityRegistry::spawn`]. Components can be
/// given as whole values (`with`) or as attribute values (`set`); both may
/// be combined, in which case attributes are applied on top of the value.
#[derive(Default)]
pub struct EntityBuilder {
    pub(crate) parts: Vec<PendingComponent>,
}

impl EntityBuilder {
    /// Create a new empty builder.
    pub fn new() -> Self {
        Self { parts: Vec::new() }
    }

    /// Attach a fully constructed component, replacing an earlier one of
    /// the same kind.
    pub fn with<C: EntityComponent>(mut self, value: C) -> Self {
        self.part::<C>().value = Some(Box::new(value));
        self
    }

    /// Set one attribute of component `C`.
    pub fn set<C, V>(mut self, key: AttributeKey<C, V>, value: impl Into<V>) -> Self
    where
        C: EntityComponent,
        V: Into<AttributeValue>,
    {
        self.part::<C>().attributes.put(key, value.into());
        self
    }

    /// Merge a whole attribute map into component `C`.
    pub fn set_all<C: EntityComponent>(mut self, attributes: &AttributeMap) -> Self {
        let part = self.part::<C>();
        for (name, value) in attributes.iter() {
            part.attributes.put_value(name, value.clone());
        }
        self
    }

    /// Whether any data for `C` has been given.
    pub fn has<C: EntityComponent>(&self) -> bool {
        let type_id = TypeId::of::<C>();
        self.parts.iter().any(|p| p.type_id == type_id)
    }

    pub fn is_empty(&self) -> bool {
        self.parts.is_empty()
    }

    pub fn clear(&mut self) {
        self.parts.clear();
    }

    /// Move the contents out, leaving this builder empty for the next entity.
    pub fn take(&mut self) -> EntityBuilder {
        std::mem::take(self)
    }

    fn part<C: EntityComponent>(&mut self) -> &mut PendingComponent {
        let type_id = TypeId::of::<C>();
        let index = match self.parts.iter().position(|p| p.type_id == type_id) {
            Some(index) => index,
            None => {
                self.parts.push(PendingComponent {
                    type_id,
                    name: C::NAME,
                    register: register::<C>,
                    value: None,
                    attributes: AttributeMap::new(),
                });
                self.parts.len() - 1
            }
        };
        &mut self.parts[index]
    }
}

impl fmt::Debug for EntityBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut list = f.debug_list();
        for part in &self.parts {
            list.entry(&format_args!(
                "{}{{value: {}, attributes: [{}]}}",
                part.name,
                part.value.is_some(),
                part.attributes
            ));
        }
        list.finish()
    }
}
