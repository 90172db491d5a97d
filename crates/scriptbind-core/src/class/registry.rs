//! Per-instance class registry.
//!
//! Each [`State`](crate::State) owns one [`ClassRegistry`]. Registering a
//! class assigns it a [`ClassId`] (a small integer scoped to the instance),
//! registers its bases first, and builds two offset maps:
//!
//! - `base_map`: every ancestor reachable from the class, with the
//!   ancestor's byte offset inside the class and the projection path to it.
//!   When two bases share an ancestor, the entry contributed by the base
//!   declared first is kept.
//! - `sub_map`: every registered descendant of the class, keyed by the
//!   descendant's id, holding the same entry as the descendant's
//!   `base_map[this class]`.
//!
//! Resolving an object against a target class only ever consults the
//! target's `sub_map`. A relationship that was never registered does not
//! resolve.

use std::any::{Any, TypeId};
use std::fmt;
use std::rc::Rc;

use rustc_hash::FxHashMap;

use super::members::ClassMembers;
use super::{BaseLink, Class, Upcast};
use crate::hash::NameHash;

/// Instance-scoped class identifier. Ids start at 1.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ClassId(u32);

impl ClassId {
    pub fn from_raw(raw: u32) -> Self {
        ClassId(raw)
    }

    pub fn raw(self) -> u32 {
        self.0
    }

    fn index(self) -> Option<usize> {
        (self.0 as usize).checked_sub(1)
    }
}

impl fmt::Debug for ClassId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ClassId({})", self.0)
    }
}

/// Chain of projections from a derived object to one of its ancestors.
pub type UpcastPath = Rc<[Rc<dyn Upcast>]>;

/// An ancestor relationship: where the ancestor lives inside the derived type.
#[derive(Clone)]
pub struct BaseEntry {
    /// Byte offset of the ancestor sub-object inside the derived object
    pub offset: usize,
    /// The ancestor class
    pub ancestor: ClassId,
    path: UpcastPath,
}

impl BaseEntry {
    fn direct(link: &BaseLink, ancestor: ClassId) -> Self {
        Self {
            offset: link.offset,
            ancestor,
            path: Rc::from(vec![Rc::clone(&link.upcast)]),
        }
    }

    /// Extend an entry of a base's own map with the step into that base.
    fn through(link: &BaseLink, inherited: &BaseEntry) -> Self {
        let mut path = Vec::with_capacity(inherited.path.len() + 1);
        path.push(Rc::clone(&link.upcast));
        path.extend(inherited.path.iter().cloned());
        Self {
            offset: link.offset + inherited.offset,
            ancestor: inherited.ancestor,
            path: Rc::from(path),
        }
    }

    /// Number of projection steps.
    pub fn depth(&self) -> usize {
        self.path.len()
    }
}

impl fmt::Debug for BaseEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BaseEntry")
            .field("offset", &self.offset)
            .field("ancestor", &self.ancestor)
            .field("depth", &self.path.len())
            .finish()
    }
}

/// Outcome of resolving an object's class against a target class.
#[derive(Clone, Debug)]
pub enum Resolution {
    /// The object is exactly the target class
    Direct,
    /// The object derives from the target class
    Adjusted(BaseEntry),
}

impl Resolution {
    /// Byte offset of the target inside the object.
    pub fn offset(&self) -> usize {
        match self {
            Resolution::Direct => 0,
            Resolution::Adjusted(entry) => entry.offset,
        }
    }

    /// Project the object's origin to the target sub-object.
    pub fn apply<'a>(&self, origin: &'a dyn Any) -> Option<&'a dyn Any> {
        match self {
            Resolution::Direct => Some(origin),
            Resolution::Adjusted(entry) => {
                let mut current = origin;
                for step in entry.path.iter() {
                    current = step.upcast(current)?;
                }
                Some(current)
            }
        }
    }

    /// Mutable counterpart of [`apply`](Self::apply).
    pub fn apply_mut<'a>(&self, origin: &'a mut dyn Any) -> Option<&'a mut dyn Any> {
        match self {
            Resolution::Direct => Some(origin),
            Resolution::Adjusted(entry) => {
                let mut current = origin;
                for step in entry.path.iter() {
                    current = step.upcast_mut(current)?;
                }
                Some(current)
            }
        }
    }
}

/// Runtime descriptor of one registered class.
pub struct TypeDescriptor {
    id: ClassId,
    name: &'static str,
    type_id: TypeId,
    supers: Vec<ClassId>,
    base_map: FxHashMap<ClassId, BaseEntry>,
    sub_map: FxHashMap<ClassId, BaseEntry>,
    members: ClassMembers,
}

impl TypeDescriptor {
    pub fn id(&self) -> ClassId {
        self.id
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn type_id(&self) -> TypeId {
        self.type_id
    }

    /// Direct bases in declaration order.
    pub fn supers(&self) -> &[ClassId] {
        &self.supers
    }

    pub fn base_entry(&self, ancestor: ClassId) -> Option<&BaseEntry> {
        self.base_map.get(&ancestor)
    }

    pub fn sub_entry(&self, descendant: ClassId) -> Option<&BaseEntry> {
        self.sub_map.get(&descendant)
    }

    pub fn ancestor_count(&self) -> usize {
        self.base_map.len()
    }

    pub fn descendant_count(&self) -> usize {
        self.sub_map.len()
    }

    pub fn members(&self) -> &ClassMembers {
        &self.members
    }

    pub fn members_mut(&mut self) -> &mut ClassMembers {
        &mut self.members
    }
}

impl fmt::Debug for TypeDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TypeDescriptor")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("supers", &self.supers)
            .finish_non_exhaustive()
    }
}

/// Registry of class descriptors for one runtime instance.
#[derive(Default)]
pub struct ClassRegistry {
    descriptors: Vec<TypeDescriptor>,
    by_type: FxHashMap<TypeId, ClassId>,
    by_name: FxHashMap<NameHash, ClassId>,
}

impl ClassRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `T` and, first, all of its bases.
    ///
    /// Idempotent: registering an already known class returns its id.
    #[cfg_attr(feature = "profiling", profiling::function)]
    pub fn register<T: Class>(&mut self) -> ClassId {
        if let Some(&id) = self.by_type.get(&TypeId::of::<T>()) {
            return id;
        }

        let links = T::bases();
        let supers: Vec<ClassId> = links.iter().map(|link| (link.register)(self)).collect();
        let id = ClassId(self.descriptors.len() as u32 + 1);

        let mut base_map: FxHashMap<ClassId, BaseEntry> = FxHashMap::default();
        for (link, &base) in links.iter().zip(&supers) {
            base_map
                .entry(base)
                .or_insert_with(|| BaseEntry::direct(link, base));
            let inherited: Vec<BaseEntry> = self
                .descriptor(base)
                .map(|d| d.base_map.values().cloned().collect())
                .unwrap_or_default();
            for entry in &inherited {
                base_map
                    .entry(entry.ancestor)
                    .or_insert_with(|| BaseEntry::through(link, entry));
            }
        }

        for (ancestor, entry) in &base_map {
            if let Some(descriptor) = ancestor.index().and_then(|i| self.descriptors.get_mut(i)) {
                descriptor.sub_map.entry(id).or_insert_with(|| entry.clone());
            }
        }

        self.descriptors.push(TypeDescriptor {
            id,
            name: T::NAME,
            type_id: TypeId::of::<T>(),
            supers,
            base_map,
            sub_map: FxHashMap::default(),
            members: ClassMembers::default(),
        });
        self.by_type.insert(TypeId::of::<T>(), id);
        if let Some(&previous) = self.by_name.get(&NameHash::from_name(T::NAME)) {
            let previous_name = self.descriptor(previous).map_or("", TypeDescriptor::name);
            if previous_name == T::NAME {
                tracing::warn!(class = T::NAME, previous = previous.raw(), "class name already registered");
            } else {
                tracing::warn!(class = T::NAME, other = previous_name, "class name hash collides with another class");
            }
        } else {
            self.by_name.insert(NameHash::from_name(T::NAME), id);
        }
        tracing::debug!(class = T::NAME, id = id.raw(), "registered class");
        id
    }

    /// Id of a registered Rust type.
    pub fn id_of<T: Any>(&self) -> Option<ClassId> {
        self.by_type.get(&TypeId::of::<T>()).copied()
    }

    /// Id of a registered class by its script-visible name.
    pub fn id_by_name(&self, name: &str) -> Option<ClassId> {
        let id = *self.by_name.get(&NameHash::from_name(name))?;
        self.descriptor(id).filter(|descriptor| descriptor.name() == name)?;
        Some(id)
    }

    pub fn descriptor(&self, id: ClassId) -> Option<&TypeDescriptor> {
        id.index().and_then(|i| self.descriptors.get(i))
    }

    pub fn descriptor_mut(&mut self, id: ClassId) -> Option<&mut TypeDescriptor> {
        id.index().and_then(|i| self.descriptors.get_mut(i))
    }

    /// Descriptor for an object's class, verified against its Rust type.
    ///
    /// Fails for ids issued before the registry was cleared.
    pub fn descriptor_checked(&self, id: ClassId, type_id: TypeId) -> Option<&TypeDescriptor> {
        self.descriptor(id).filter(|d| d.type_id == type_id)
    }

    /// Resolve an object of class `origin` against class `target`.
    ///
    /// `target`'s sub map lists every descendant, not only classes that name
    /// it as a direct base, so a class several levels below `target`
    /// resolves with one lookup and its accumulated offset. Registering a
    /// class fills the sub map of each ancestor for this reason.
    pub fn resolve(&self, origin: ClassId, target: ClassId) -> Option<Resolution> {
        if origin == target {
            return self.descriptor(target).map(|_| Resolution::Direct);
        }
        self.descriptor(target)?
            .sub_map
            .get(&origin)
            .cloned()
            .map(Resolution::Adjusted)
    }

    pub fn len(&self) -> usize {
        self.descriptors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.descriptors.is_empty()
    }

    /// Forget every descriptor. Previously issued ids stop resolving.
    pub fn clear(&mut self) {
        if !self.descriptors.is_empty() {
            tracing::debug!(classes = self.descriptors.len(), "class registry cleared");
        }
        self.descriptors.clear();
        self.by_type.clear();
        self.by_name.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Default)]
    struct Root {
        tag: u32,
    }

    #[derive(Default)]
    struct Left {
        root: Root,
        left: u32,
    }

    #[derive(Default)]
    struct Right {
        right: u64,
        root: Root,
    }

    #[derive(Default)]
    struct Diamond {
        left: Left,
        right: Right,
        own: u8,
    }

    impl Class for Root {
        const NAME: &'static str = "Root";
    }

    impl Class for Left {
        const NAME: &'static str = "Left";
        fn bases() -> Vec<BaseLink> {
            vec![BaseLink::new::<Self, Root>(
                core::mem::offset_of!(Left, root),
                |d| &d.root,
                |d| &mut d.root,
            )]
        }
    }

    impl Class for Right {
        const NAME: &'static str = "Right";
        fn bases() -> Vec<BaseLink> {
            vec![BaseLink::new::<Self, Root>(
                core::mem::offset_of!(Right, root),
                |d| &d.root,
                |d| &mut d.root,
            )]
        }
    }

    impl Class for Diamond {
        const NAME: &'static str = "Diamond";
        fn bases() -> Vec<BaseLink> {
            vec![
                BaseLink::new::<Self, Left>(
                    core::mem::offset_of!(Diamond, left),
                    |d| &d.left,
                    |d| &mut d.left,
                ),
                BaseLink::new::<Self, Right>(
                    core::mem::offset_of!(Diamond, right),
                    |d| &d.right,
                    |d| &mut d.right,
                ),
            ]
        }
    }

    #[test]
    fn bases_register_first_and_ids_start_at_one() {
        let mut registry = ClassRegistry::new();
        let diamond = registry.register::<Diamond>();
        let root = registry.id_of::<Root>().unwrap();
        assert_eq!(root.raw(), 1);
        assert_eq!(diamond.raw(), 4);
        assert_eq!(registry.len(), 4);
    }

    #[test]
    fn registration_is_idempotent() {
        let mut registry = ClassRegistry::new();
        let first = registry.register::<Left>();
        let second = registry.register::<Left>();
        assert_eq!(first, second);
        assert_eq!(registry.len(), 2);
    }

    #[test]
    fn base_map_is_transitive_with_offsets() {
        let mut registry = ClassRegistry::new();
        let diamond = registry.register::<Diamond>();
        let right = registry.id_of::<Right>().unwrap();
        let root = registry.id_of::<Root>().unwrap();
        let d = registry.descriptor(diamond).unwrap();

        assert_eq!(d.supers().len(), 2);
        assert_eq!(d.ancestor_count(), 3);
        assert_eq!(
            d.base_entry(right).unwrap().offset,
            core::mem::offset_of!(Diamond, right)
        );
        // First declared base wins for the shared ancestor.
        let via_left = core::mem::offset_of!(Diamond, left) + core::mem::offset_of!(Left, root);
        assert_eq!(d.base_entry(root).unwrap().offset, via_left);
        assert_eq!(d.base_entry(root).unwrap().depth(), 2);
    }

    #[test]
    fn sub_maps_cover_all_descendants() {
        let mut registry = ClassRegistry::new();
        let diamond = registry.register::<Diamond>();
        let root = registry.id_of::<Root>().unwrap();
        let left = registry.id_of::<Left>().unwrap();
        let r = registry.descriptor(root).unwrap();
        assert!(r.sub_entry(left).is_some());
        assert!(r.sub_entry(diamond).is_some());
        assert_eq!(r.descendant_count(), 3);
    }

    #[test]
    fn resolution_projects_to_the_sub_object() {
        let mut registry = ClassRegistry::new();
        let diamond = registry.register::<Diamond>();
        let root = registry.id_of::<Root>().unwrap();

        let mut value = Diamond::default();
        value.left.root.tag = 5;
        value.right.root.tag = 8;

        let resolution = registry.resolve(diamond, root).unwrap();
        let projected = resolution.apply(&value).unwrap();
        assert_eq!(projected.downcast_ref::<Root>().unwrap().tag, 5);

        let projected = resolution.apply_mut(&mut value).unwrap();
        projected.downcast_mut::<Root>().unwrap().tag = 6;
        assert_eq!(value.left.root.tag, 6);
    }

    #[test]
    fn unrelated_classes_do_not_resolve() {
        let mut registry = ClassRegistry::new();
        let left = registry.register::<Left>();
        let right = registry.register::<Right>();
        assert!(registry.resolve(left, right).is_none());
        // Upcasts only: a base never resolves to a derived target.
        let root = registry.id_of::<Root>().unwrap();
        assert!(registry.resolve(root, left).is_none());
        assert!(matches!(registry.resolve(left, left), Some(Resolution::Direct)));
    }

    #[test]
    fn name_lookup_checks_the_stored_name() {
        let mut registry = ClassRegistry::new();
        let left = registry.register::<Left>();
        assert_eq!(registry.id_by_name("Left"), Some(left));
        assert!(registry.id_by_name("Right").is_none());

        // A hash entry pointing at a class with a different name is a collision
        registry.by_name.insert(NameHash::from_name("Ghost"), left);
        assert!(registry.id_by_name("Ghost").is_none());
        assert_eq!(registry.id_by_name("Left"), Some(left));
    }

    #[test]
    fn clear_invalidates_ids() {
        let mut registry = ClassRegistry::new();
        let left = registry.register::<Left>();
        registry.clear();
        assert!(registry.descriptor(left).is_none());
        assert!(registry.id_of::<Left>().is_none());
        assert!(registry.id_by_name("Left").is_none());
        let again = registry.register::<Right>();
        assert!(
            registry
                .descriptor_checked(again, TypeId::of::<Left>())
                .is_none()
        );
    }
}
