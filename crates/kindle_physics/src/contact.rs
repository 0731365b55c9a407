//! Per-tick contact accumulation.
//!
//! A [`ContactConstraint`] is rebuilt every tick by the collision pass: it
//! is cleared, its look-ahead box is placed in the world, and every
//! overlapping candidate is added as a [`Contact`]. All coordinates handed
//! out by queries are local to the constraint's scan box, `(0, 0)` being
//! its top-left cell.

use glam::Vec2;
use kindle_core::aspect::Aspect;
use kindle_core::ecs::EntityId;
use kindle_core::geom::{BitMask, Rect};
use kindle_core::math::snap_ahead_vec;
use kindle_core::types::{SpaceId, TypeError, TypeKey, TypeRegistry};
use std::fmt;

/// Name of the type space holding contact categories.
pub const CONTACT_SPACE: &str = "contact type";
/// Name of the type space holding materials.
pub const MATERIAL_SPACE: &str = "material type";

/// The two type spaces contact categories and materials are drawn from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ContactSpaces {
    pub contact: SpaceId,
    pub material: SpaceId,
}

impl ContactSpaces {
    /// Define both spaces in `types`, each holding up to `capacity` kinds.
    pub fn define(types: &mut TypeRegistry, capacity: usize) -> Self {
        Self {
            contact: types.define_space(CONTACT_SPACE, capacity),
            material: types.define_space(MATERIAL_SPACE, capacity),
        }
    }

    /// Key for the named contact category, e.g. "solid" or "trigger".
    pub fn contact_type(
        &self,
        types: &mut TypeRegistry,
        name: &'static str,
    ) -> Result<TypeKey, TypeError> {
        types.key_named(self.contact, name)
    }

    /// Key for the named material, e.g. "ground" or "water".
    pub fn material(&self, types: &mut TypeRegistry, name: &'static str) -> Result<TypeKey, TypeError> {
        types.key_named(self.material, name)
    }
}

/// One overlap found this tick.
#[derive(Debug, Clone, PartialEq)]
pub struct Contact {
    entity: EntityId,
    material: Option<TypeKey>,
    contact_type: Option<TypeKey>,
    bounds: Rect,
    mask: Option<BitMask>,
}

impl Contact {
    /// `bounds` is the overlap in constraint-local cells; `mask`, when
    /// given, is placed at `bounds` and marks the cells actually touched.
    pub fn new(
        entity: EntityId,
        material: Option<TypeKey>,
        contact_type: Option<TypeKey>,
        bounds: Rect,
        mask: Option<BitMask>,
    ) -> Self {
        Self {
            entity,
            material,
            contact_type,
            bounds,
            mask,
        }
    }

    pub fn entity(&self) -> EntityId {
        self.entity
    }

    pub fn material(&self) -> Option<TypeKey> {
        self.material
    }

    pub fn contact_type(&self) -> Option<TypeKey> {
        self.contact_type
    }

    /// Overlap rectangle in constraint-local cells.
    pub fn bounds(&self) -> Rect {
        self.bounds
    }

    pub fn mask(&self) -> Option<&BitMask> {
        self.mask.as_ref()
    }

    /// Whether the constraint-local cell is touched by this contact.
    pub fn has_contact(&self, x: i32, y: i32) -> bool {
        match &self.mask {
            Some(mask) => mask.get_bit(x - mask.region().x, y - mask.region().y),
            None => self.bounds.contains(x, y),
        }
    }
}

/// Named contact scan owned by one entity.
#[derive(Clone)]
pub struct ContactConstraint {
    name: String,
    layer: Option<u32>,
    scan_bounds: Rect,
    normalized: Rect,
    world_bounds: Rect,
    material_filter: Aspect,
    filtering: bool,
    contact_types: Aspect,
    material_types: Aspect,
    intersection_mask: BitMask,
    contacts: Vec<Contact>,
}

impl ContactConstraint {
    /// `scan_bounds` is the look-ahead box relative to the entity position.
    pub fn new(name: impl Into<String>, scan_bounds: Rect, spaces: ContactSpaces) -> Self {
        debug_assert!(
            scan_bounds.width >= 0 && scan_bounds.height >= 0,
            "negative scan bounds"
        );
        let normalized = scan_bounds.normalized();
        Self {
            name: name.into(),
            layer: None,
            scan_bounds,
            normalized,
            world_bounds: scan_bounds,
            material_filter: Aspect::new(spaces.material),
            filtering: false,
            contact_types: Aspect::new(spaces.contact),
            material_types: Aspect::new(spaces.material),
            intersection_mask: BitMask::new(normalized),
            contacts: Vec::new(),
        }
    }

    /// Only consider candidates on `layer`.
    pub fn on_layer(mut self, layer: u32) -> Self {
        self.layer = Some(layer);
        self
    }

    pub fn with_contact_capacity(mut self, capacity: usize) -> Self {
        self.contacts.reserve(capacity);
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn layer(&self) -> Option<u32> {
        self.layer
    }

    pub fn scan_bounds(&self) -> Rect {
        self.scan_bounds
    }

    /// Scan box placed in the world by the last `update`.
    pub fn world_bounds(&self) -> Rect {
        self.world_bounds
    }

    // ------------------------------------------------------------------
    // Material filter
    // ------------------------------------------------------------------

    /// Restrict contacts to candidates of `material` (and any other
    /// material added the same way).
    pub fn add_to_material_filter(&mut self, material: TypeKey) -> &mut Self {
        self.material_filter.set(material);
        self.filtering = true;
        self
    }

    pub fn remove_from_filter(&mut self, material: TypeKey) -> &mut Self {
        self.material_filter.reset(material);
        self.filtering = !self.material_filter.is_empty();
        self
    }

    pub fn clear_filter(&mut self) {
        self.material_filter.clear();
        self.filtering = false;
    }

    pub fn filter_applied(&self) -> bool {
        self.filtering
    }

    /// Whether a candidate of `material` passes the filter. Candidates
    /// without a material only pass when no filter is set.
    pub fn matches(&self, material: Option<TypeKey>) -> bool {
        if !self.filtering {
            return true;
        }
        material.map_or(false, |m| self.material_filter.contains(m))
    }

    /// Whether a candidate on `layer` is in scope.
    pub fn accepts_layer(&self, layer: u32) -> bool {
        self.layer.map_or(true, |own| own == layer)
    }

    // ------------------------------------------------------------------
    // Queries
    // ------------------------------------------------------------------

    /// Any contact covers the local cell.
    pub fn has_contact(&self, x: i32, y: i32) -> bool {
        self.intersection_mask.get_bit(x, y)
    }

    /// A contact of `material` covers the local cell.
    pub fn has_material_contact_at(&self, material: TypeKey, x: i32, y: i32) -> bool {
        if !self.material_types.contains(material) {
            return false;
        }
        self.contacts
            .iter()
            .filter(|c| c.material == Some(material))
            .any(|c| c.has_contact(x, y))
    }

    pub fn has_any_contact(&self) -> bool {
        !self.contacts.is_empty()
    }

    /// Any contact of one of the categories in `contact_types`.
    pub fn has_any_contacts(&self, contact_types: &Aspect) -> bool {
        self.contact_types.intersects(contact_types)
    }

    pub fn has_contact_type(&self, contact_type: TypeKey) -> bool {
        self.contact_types.contains(contact_type)
    }

    pub fn has_any_material_contact(&self, materials: &Aspect) -> bool {
        self.material_types.intersects(materials)
    }

    pub fn has_material_contact(&self, material: TypeKey) -> bool {
        self.material_types.contains(material)
    }

    /// First contact of `contact_type` in scan order.
    pub fn get_first_contact(&self, contact_type: TypeKey) -> Option<&Contact> {
        self.contacts
            .iter()
            .find(|c| c.contact_type == Some(contact_type))
    }

    pub fn all_contacts(&self) -> &[Contact] {
        &self.contacts
    }

    /// Union of every contact's cells this tick.
    pub fn intersection_mask(&self) -> &BitMask {
        &self.intersection_mask
    }

    pub fn contact_types(&self) -> &Aspect {
        &self.contact_types
    }

    pub fn material_types(&self) -> &Aspect {
        &self.material_types
    }

    // ------------------------------------------------------------------
    // Per-tick rebuild
    // ------------------------------------------------------------------

    /// Drop all contacts and aggregated state.
    pub fn clear(&mut self) {
        self.contacts.clear();
        self.contact_types.clear();
        self.material_types.clear();
        self.intersection_mask.clear();
    }

    /// Place the scan box for this tick. Each axis is snapped toward the
    /// direction of travel before the scan offset is added.
    pub fn update(&mut self, position: Vec2, velocity: Vec2) {
        let origin = snap_ahead_vec(position, velocity);
        self.world_bounds = self.scan_bounds.translated(origin.x, origin.y);
        self.intersection_mask.reset(self.normalized);
    }

    /// Record `contact` if it overlaps the scan box. Returns whether it was
    /// kept.
    pub fn add_contact(&mut self, contact: Contact) -> bool {
        if !contact.bounds.intersects(self.normalized) {
            return false;
        }

        match contact.mask.as_ref().filter(|m| !m.is_empty()) {
            Some(mask) => self.intersection_mask.or(mask),
            None => self.intersection_mask.set_region(contact.bounds, true),
        }
        if let Some(contact_type) = contact.contact_type {
            self.contact_types.set(contact_type);
        }
        if let Some(material) = contact.material {
            self.material_types.set(material);
        }
        self.contacts.push(contact);
        true
    }

    /// Build the contact for a candidate occupying `candidate_bounds` in
    /// the world, with an optional mask covering those bounds. Returns
    /// `None` when the shapes do not touch.
    pub fn contact_with(
        &self,
        entity: EntityId,
        candidate_bounds: Rect,
        candidate_mask: Option<&BitMask>,
        material: Option<TypeKey>,
        contact_type: Option<TypeKey>,
    ) -> Option<Contact> {
        let overlap = self.world_bounds.intersection(candidate_bounds);
        if overlap.is_empty() {
            return None;
        }
        let local = overlap.translated(-self.world_bounds.x, -self.world_bounds.y);

        let mask = match candidate_mask {
            Some(mask) => {
                debug_assert!(
                    mask.width() == candidate_bounds.width && mask.height() == candidate_bounds.height,
                    "mask {} does not cover candidate bounds {}",
                    mask.region(),
                    candidate_bounds
                );
                let mut clipped = BitMask::new(local);
                clipped.or_offset(
                    mask,
                    candidate_bounds.x - self.world_bounds.x - local.x,
                    candidate_bounds.y - self.world_bounds.y - local.y,
                );
                if clipped.is_empty() {
                    return None;
                }
                Some(clipped)
            }
            None => None,
        };

        Some(Contact::new(entity, material, contact_type, local, mask))
    }
}

impl fmt::Debug for ContactConstraint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ContactConstraint")
            .field("name", &self.name)
            .field("layer", &self.layer)
            .field("scan_bounds", &format_args!("{}", self.scan_bounds))
            .field("world_bounds", &format_args!("{}", self.world_bounds))
            .field("filtering", &self.filtering)
            .field("contact_types", &self.contact_types)
            .field("material_types", &self.material_types)
            .field("contacts", &self.contacts.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Fixture {
        spaces: ContactSpaces,
        solid: TypeKey,
        trigger: TypeKey,
        ground: TypeKey,
        water: TypeKey,
    }

    fn fixture() -> Fixture {
        let mut types = TypeRegistry::new();
        let spaces = ContactSpaces::define(&mut types, 8);
        Fixture {
            solid: spaces.contact_type(&mut types, "solid").unwrap(),
            trigger: spaces.contact_type(&mut types, "trigger").unwrap(),
            ground: spaces.material(&mut types, "ground").unwrap(),
            water: spaces.material(&mut types, "water").unwrap(),
            spaces,
        }
    }

    fn scanned(f: &Fixture, position: Vec2, velocity: Vec2) -> ContactConstraint {
        let mut constraint = ContactConstraint::new("body", Rect::new(0, 0, 10, 10), f.spaces);
        constraint.clear();
        constraint.update(position, velocity);
        constraint
    }

    #[test]
    fn world_bounds_snap_toward_travel() {
        let f = fixture();
        let mut constraint =
            ContactConstraint::new("feet", Rect::new(2, 8, 4, 2), f.spaces);

        constraint.update(Vec2::new(10.2, 5.7), Vec2::new(1.0, -1.0));
        assert_eq!(constraint.world_bounds(), Rect::new(13, 13, 4, 2));

        constraint.update(Vec2::new(10.2, 5.7), Vec2::ZERO);
        assert_eq!(constraint.world_bounds(), Rect::new(12, 13, 4, 2));
    }

    #[test]
    fn reference_overlap_is_local() {
        let f = fixture();
        let constraint = scanned(&f, Vec2::new(22.0, 10.0), Vec2::new(3.0, 0.0));
        let contact = constraint
            .contact_with(EntityId::new(1), Rect::new(30, 10, 10, 10), None, None, None)
            .unwrap();
        assert_eq!(contact.bounds(), Rect::new(8, 0, 2, 10));
        assert_eq!(contact.bounds().to_string(), "[x=8,y=0,width=2,height=10]");

        let apart = scanned(&f, Vec2::new(19.0, 10.0), Vec2::new(3.0, 0.0));
        assert!(apart
            .contact_with(EntityId::new(1), Rect::new(30, 10, 10, 10), None, None, None)
            .is_none());
    }

    #[test]
    fn rectangles_fill_and_masks_union() {
        let f = fixture();
        let mut constraint = scanned(&f, Vec2::ZERO, Vec2::ZERO);

        let rect = constraint
            .contact_with(EntityId::new(1), Rect::new(8, 0, 4, 2), None, None, Some(f.solid))
            .unwrap();
        assert!(constraint.add_contact(rect));

        // Diagonal shape overlapping the bottom-left corner.
        let shape = BitMask::from_rows(0, 0, &["#..", ".#.", "..#"]);
        let masked = constraint
            .contact_with(
                EntityId::new(2),
                Rect::new(-1, 8, 3, 3),
                Some(&shape),
                Some(f.ground),
                Some(f.solid),
            )
            .unwrap();
        assert_eq!(masked.bounds(), Rect::new(0, 8, 2, 2));
        assert!(constraint.add_contact(masked));

        assert!(constraint.has_contact(8, 0));
        assert!(constraint.has_contact(9, 1));
        assert!(!constraint.has_contact(7, 0));
        assert!(constraint.has_contact(0, 9));
        assert!(!constraint.has_contact(1, 9));
        assert!(!constraint.has_contact(0, 8));
        assert_eq!(constraint.intersection_mask().cardinality(), 4 + 1);

        assert!(constraint.has_material_contact_at(f.ground, 0, 9));
        assert!(!constraint.has_material_contact_at(f.ground, 8, 0));
        assert!(!constraint.has_material_contact_at(f.water, 0, 9));
    }

    #[test]
    fn mask_without_overlapping_cells_is_no_contact() {
        let f = fixture();
        let constraint = scanned(&f, Vec2::ZERO, Vec2::ZERO);
        let shape = BitMask::from_rows(0, 0, &["#.", ".."]);
        assert!(constraint
            .contact_with(EntityId::new(1), Rect::new(-1, -1, 2, 2), Some(&shape), None, None)
            .is_none());
    }

    #[test]
    fn mask_is_clipped_to_the_overlap() {
        let f = fixture();
        let constraint = scanned(&f, Vec2::ZERO, Vec2::ZERO);
        let shape = BitMask::from_rows(0, 0, &["####", "#..#", "####"]);
        let contact = constraint
            .contact_with(EntityId::new(1), Rect::new(8, 8, 4, 3), Some(&shape), None, None)
            .unwrap();
        assert_eq!(contact.bounds(), Rect::new(8, 8, 2, 2));
        let mask = contact.mask().unwrap();
        assert_eq!(mask.region(), Rect::new(8, 8, 2, 2));
        assert_eq!(mask.cardinality(), 3);
        assert!(!mask.get_bit(1, 1));
    }

    #[cfg(debug_assertions)]
    #[test]
    #[should_panic(expected = "does not cover candidate bounds")]
    fn mask_smaller_than_candidate_bounds_panics() {
        let f = fixture();
        let constraint = scanned(&f, Vec2::ZERO, Vec2::ZERO);
        let shape = BitMask::filled(Rect::new(0, 0, 2, 2));
        let _ = constraint.contact_with(
            EntityId::new(1),
            Rect::new(0, 0, 10, 10),
            Some(&shape),
            None,
            None,
        );
    }

    #[test]
    fn first_contact_follows_scan_order() {
        let f = fixture();
        let mut constraint = scanned(&f, Vec2::ZERO, Vec2::ZERO);
        for (id, contact_type) in [(3, f.trigger), (1, f.solid), (2, f.solid)] {
            let contact = Contact::new(
                EntityId::new(id),
                None,
                Some(contact_type),
                Rect::new(0, 0, 1, 1),
                None,
            );
            constraint.add_contact(contact);
        }
        assert_eq!(
            constraint.get_first_contact(f.solid).map(Contact::entity),
            Some(EntityId::new(1))
        );
        assert!(constraint.has_contact_type(f.trigger));
        assert_eq!(constraint.all_contacts().len(), 3);

        let mut wanted = Aspect::new(f.spaces.contact);
        wanted.set(f.trigger);
        assert!(constraint.has_any_contacts(&wanted));
    }

    #[test]
    fn contacts_outside_scan_box_are_dropped() {
        let f = fixture();
        let mut constraint = scanned(&f, Vec2::ZERO, Vec2::ZERO);
        let outside = Contact::new(EntityId::new(1), None, None, Rect::new(10, 0, 2, 2), None);
        assert!(!constraint.add_contact(outside));
        assert!(!constraint.has_any_contact());
    }

    #[test]
    fn material_filter_editing() {
        let f = fixture();
        let mut constraint = scanned(&f, Vec2::ZERO, Vec2::ZERO);
        assert!(constraint.matches(None));

        constraint.add_to_material_filter(f.ground);
        assert!(constraint.filter_applied());
        assert!(constraint.matches(Some(f.ground)));
        assert!(!constraint.matches(Some(f.water)));
        assert!(!constraint.matches(None));

        constraint.remove_from_filter(f.ground);
        assert!(!constraint.filter_applied());
        assert!(constraint.matches(Some(f.water)));

        constraint.add_to_material_filter(f.water).add_to_material_filter(f.ground);
        constraint.clear_filter();
        assert!(!constraint.filter_applied());
    }

    #[test]
    fn clear_resets_aggregates() {
        let f = fixture();
        let mut constraint = scanned(&f, Vec2::ZERO, Vec2::ZERO);
        constraint.add_contact(Contact::new(
            EntityId::new(1),
            Some(f.water),
            Some(f.solid),
            Rect::new(0, 0, 3, 3),
            None,
        ));
        assert!(constraint.has_material_contact(f.water));

        constraint.clear();
        assert!(!constraint.has_any_contact());
        assert!(!constraint.has_material_contact(f.water));
        assert!(!constraint.has_contact_type(f.solid));
        assert!(constraint.intersection_mask().is_empty());
    }

    #[test]
    fn layers_scope_candidates() {
        let f = fixture();
        let any = ContactConstraint::new("a", Rect::new(0, 0, 1, 1), f.spaces);
        let scoped = any.clone().on_layer(2);
        assert!(any.accepts_layer(7));
        assert!(scoped.accepts_layer(2));
        assert!(!scoped.accepts_layer(0));
    }
}
