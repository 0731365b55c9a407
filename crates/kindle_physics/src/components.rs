//! Components read and written by the physics systems.

use crate::contact::ContactConstraint;
use glam::Vec2;
use kindle_core::ecs::{AttributeError, AttributeKey, AttributeMap, EntityComponent};
use kindle_core::geom::{BitMask, Rect};
use kindle_core::types::TypeKey;

/// World placement of an entity.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Transform {
    pub position: Vec2,
    pub view_id: u32,
    pub layer_id: u32,
}

impl Transform {
    pub const POSITION: AttributeKey<Transform, Vec2> = AttributeKey::new("position");
    pub const VIEW_ID: AttributeKey<Transform, u32> = AttributeKey::new("view_id");
    pub const LAYER_ID: AttributeKey<Transform, u32> = AttributeKey::new("layer_id");

    pub fn at(x: f32, y: f32) -> Self {
        Self {
            position: Vec2::new(x, y),
            ..Self::default()
        }
    }

    pub fn on_layer(mut self, layer_id: u32) -> Self {
        self.layer_id = layer_id;
        self
    }
}

impl EntityComponent for Transform {
    const NAME: &'static str = "Transform";

    fn from_attributes(&mut self, attributes: &AttributeMap) -> Result<(), AttributeError> {
        attributes.read_into(Self::POSITION, &mut self.position)?;
        attributes.read_into(Self::VIEW_ID, &mut self.view_id)?;
        attributes.read_into(Self::LAYER_ID, &mut self.layer_id)
    }

    fn to_attributes(&self, attributes: &mut AttributeMap) {
        attributes.put(Self::POSITION, self.position);
        attributes.put(Self::VIEW_ID, self.view_id);
        attributes.put(Self::LAYER_ID, self.layer_id);
    }
}

/// Velocity and acceleration, in world units per tick.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Movement {
    pub velocity: Vec2,
    pub acceleration: Vec2,
    /// Inactive movements are skipped by the integrator.
    pub active: bool,
}

impl Movement {
    pub const VELOCITY: AttributeKey<Movement, Vec2> = AttributeKey::new("velocity");
    pub const ACCELERATION: AttributeKey<Movement, Vec2> = AttributeKey::new("acceleration");
    pub const ACTIVE: AttributeKey<Movement, bool> = AttributeKey::new("active");

    pub fn with_velocity(x: f32, y: f32) -> Self {
        Self {
            velocity: Vec2::new(x, y),
            ..Self::default()
        }
    }
}

impl Default for Movement {
    fn default() -> Self {
        Self {
            velocity: Vec2::ZERO,
            acceleration: Vec2::ZERO,
            active: true,
        }
    }
}

impl EntityComponent for Movement {
    const NAME: &'static str = "Movement";

    fn from_attributes(&mut self, attributes: &AttributeMap) -> Result<(), AttributeError> {
        attributes.read_into(Self::VELOCITY, &mut self.velocity)?;
        attributes.read_into(Self::ACCELERATION, &mut self.acceleration)?;
        attributes.read_into(Self::ACTIVE, &mut self.active)
    }

    fn to_attributes(&self, attributes: &mut AttributeMap) {
        attributes.put(Self::VELOCITY, self.velocity);
        attributes.put(Self::ACCELERATION, self.acceleration);
        attributes.put(Self::ACTIVE, self.active);
    }
}

/// Collision shape of an entity.
///
/// `bounds` is relative to the entity position. A `mask`, when present,
/// covers `bounds` cell for cell and makes the shape non-rectangular.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Collision {
    pub bounds: Rect,
    pub mask: Option<BitMask>,
    pub material: Option<TypeKey>,
    pub contact_type: Option<TypeKey>,
}

impl Collision {
    pub const BOUNDS: AttributeKey<Collision, Rect> = AttributeKey::new("bounds");
    pub const MASK: AttributeKey<Collision, BitMask> = AttributeKey::new("mask");
    pub const MATERIAL: AttributeKey<Collision, TypeKey> = AttributeKey::new("material");
    pub const CONTACT_TYPE: AttributeKey<Collision, TypeKey> = AttributeKey::new("contact_type");

    pub fn new(bounds: Rect) -> Self {
        Self {
            bounds,
            ..Self::default()
        }
    }

    /// Give the shape a mask; it must be exactly the size of `bounds`.
    pub fn with_mask(mut self, mask: BitMask) -> Self {
        debug_assert!(
            mask.width() == self.bounds.width && mask.height() == self.bounds.height,
            "mask {} does not cover bounds {}",
            mask.region(),
            self.bounds
        );
        self.mask = Some(mask);
        self
    }

    pub fn with_material(mut self, material: TypeKey) -> Self {
        self.material = Some(material);
        self
    }

    pub fn with_contact_type(mut self, contact_type: TypeKey) -> Self {
        self.contact_type = Some(contact_type);
        self
    }

    /// Shape bounds placed in the world at integer `origin`.
    pub fn world_bounds(&self, origin: glam::IVec2) -> Rect {
        self.bounds.translated(origin.x, origin.y)
    }
}

impl EntityComponent for Collision {
    const NAME: &'static str = "Collision";

    fn from_attributes(&mut self, attributes: &AttributeMap) -> Result<(), AttributeError> {
        attributes.read_into(Self::BOUNDS, &mut self.bounds)?;
        if self.bounds.width < 0 || self.bounds.height < 0 {
            return Err(AttributeError::Invalid {
                key: Self::BOUNDS.name(),
                reason: format!("negative size {}", self.bounds),
            });
        }
        if let Some(mask) = attributes.get(Self::MASK)? {
            if mask.width() != self.bounds.width || mask.height() != self.bounds.height {
                return Err(AttributeError::Invalid {
                    key: Self::MASK.name(),
                    reason: format!("mask {} does not cover bounds {}", mask.region(), self.bounds),
                });
            }
            self.mask = Some(mask);
        }
        if let Some(material) = attributes.get(Self::MATERIAL)? {
            self.material = Some(material);
        }
        if let Some(contact_type) = attributes.get(Self::CONTACT_TYPE)? {
            self.contact_type = Some(contact_type);
        }
        Ok(())
    }

    fn to_attributes(&self, attributes: &mut AttributeMap) {
        attributes.put(Self::BOUNDS, self.bounds);
        if let Some(mask) = &self.mask {
            attributes.put(Self::MASK, mask.clone());
        }
        if let Some(material) = self.material {
            attributes.put(Self::MATERIAL, material);
        }
        if let Some(contact_type) = self.contact_type {
            attributes.put(Self::CONTACT_TYPE, contact_type);
        }
    }
}

/// Contact constraints an entity scans for every tick.
#[derive(Debug, Clone, Default)]
pub struct ContactScan {
    constraints: Vec<ContactConstraint>,
}

impl ContactScan {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, constraint: ContactConstraint) -> Self {
        self.add(constraint);
        self
    }

    /// Add a constraint, replacing one with the same name.
    pub fn add(&mut self, constraint: ContactConstraint) {
        match self
            .constraints
            .iter_mut()
            .find(|c| c.name() == constraint.name())
        {
            Some(existing) => *existing = constraint,
            None => self.constraints.push(constraint),
        }
    }

    pub fn remove(&mut self, name: &str) -> Option<ContactConstraint> {
        let index = self.constraints.iter().position(|c| c.name() == name)?;
        Some(self.constraints.remove(index))
    }

    pub fn constraint(&self, name: &str) -> Option<&ContactConstraint> {
        self.constraints.iter().find(|c| c.name() == name)
    }

    pub fn constraint_mut(&mut self, name: &str) -> Option<&mut ContactConstraint> {
        self.constraints.iter_mut().find(|c| c.name() == name)
    }

    pub fn constraints(&self) -> &[ContactConstraint] {
        &self.constraints
    }

    pub(crate) fn constraints_mut(&mut self) -> &mut [ContactConstraint] {
        &mut self.constraints
    }

    pub fn is_empty(&self) -> bool {
        self.constraints.is_empty()
    }

    /// Any constraint holding a contact this tick.
    pub fn has_any_contact(&self) -> bool {
        self.constraints.iter().any(ContactConstraint::has_any_contact)
    }
}

impl EntityComponent for ContactScan {
    const NAME: &'static str = "ContactScan";
}
