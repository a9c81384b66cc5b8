//! Managers: the owned sequence of one entity kind inside a container

use geodex_geodesy::HasCoordinates;
use std::cell::RefCell;
use std::fmt;
use std::rc::{Rc, Weak};

use crate::container::Container;
use crate::criteria::Criteria;
use crate::entity::{handle, identity, Entity, Handle};
use crate::error::{Error, Result};
use crate::geometry::Geometry;
use crate::query::QueryCollection;
use crate::traversal::Collector;

/// Per-kind hooks a [`Manager`] needs
pub trait Kind: Entity {
    /// Whether recursive retrieval also unwraps placemark geometries and aggregates
    const UNWRAPS_GEOMETRY: bool = false;

    /// A default-constructed entity in a fresh handle
    fn new_handle() -> Handle<Self>;

    /// Wrap an already-built entity
    fn into_handle(self) -> Handle<Self> {
        handle(self)
    }

    /// The manager holding this kind inside a container
    fn manager(container: &Container) -> &Manager<Self>;

    fn manager_mut(container: &mut Container) -> &mut Manager<Self>;

    /// This kind's handle, if `geometry` is one
    fn from_geometry(_geometry: &Geometry) -> Option<Handle<Self>> {
        None
    }

    /// Refuse to be adopted into `target`
    fn check_adoption(&self, _target: &Weak<RefCell<Container>>) -> Result<()> {
        Ok(())
    }
}

/// Where a manager sits, which decides back-references and traversal reach
#[derive(Debug, Clone, Default)]
pub enum Scope {
    /// Standalone: no owner, no traversal beyond its own items
    #[default]
    Detached,
    /// The document root: traverses the whole tree, sets no back-references
    Root(Weak<RefCell<Container>>),
    /// Inside a container: children point back at it
    Bound(Weak<RefCell<Container>>),
}

impl Scope {
    /// The container whose tree recursive retrieval walks
    pub fn container(&self) -> Option<Handle<Container>> {
        match self {
            Self::Detached => None,
            Self::Root(weak) | Self::Bound(weak) => weak.upgrade(),
        }
    }

    /// The container children should point back at
    pub fn owner(&self) -> Option<&Weak<RefCell<Container>>> {
        match self {
            Self::Bound(weak) => Some(weak),
            _ => None,
        }
    }

    pub fn is_detached(&self) -> bool {
        matches!(self, Self::Detached)
    }
}

/// The authoritative sequence of one kind of entity.
///
/// [`children`](Self::children) is the sequence itself; [`all`](Self::all)
/// adds every same-kind entity reachable below this manager's container.
/// Query shortcuts operate on the children.
pub struct Manager<T> {
    items: Vec<Handle<T>>,
    scope: Scope,
}

impl<T> Default for Manager<T> {
    fn default() -> Self {
        Self {
            items: Vec::new(),
            scope: Scope::Detached,
        }
    }
}

impl<T> fmt::Debug for Manager<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let scope = match self.scope {
            Scope::Detached => "detached",
            Scope::Root(_) => "root",
            Scope::Bound(_) => "bound",
        };
        f.debug_struct("Manager")
            .field("len", &self.items.len())
            .field("scope", &scope)
            .finish()
    }
}

impl<T: Kind> Manager<T> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn scope(&self) -> &Scope {
        &self.scope
    }

    /// Move the manager to a new scope, re-pointing its children
    pub(crate) fn rebind(&mut self, scope: Scope) {
        for item in &self.items {
            let Ok(mut entity) = item.try_borrow_mut() else {
                tracing::warn!("Cannot re-parent a borrowed {}", T::KIND);
                continue;
            };
            match &scope {
                Scope::Bound(owner) => entity.meta_mut().set_parent(owner.clone()),
                Scope::Root(_) => entity.meta_mut().clear_parent(),
                Scope::Detached => {}
            }
        }
        self.scope = scope;
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Handle<T>> {
        self.items.iter()
    }

    pub fn as_slice(&self) -> &[Handle<T>] {
        &self.items
    }

    pub fn contains(&self, item: &Handle<T>) -> bool {
        self.items.iter().any(|existing| Rc::ptr_eq(existing, item))
    }

    /// Direct children only
    pub fn children(&self) -> QueryCollection<T> {
        QueryCollection::new(self.items.clone())
    }

    /// Children plus every same-kind descendant.
    ///
    /// Containers that are mutably borrowed are left out with a warning,
    /// including this manager's own when reached through a `RefMut`.
    pub fn all(&self) -> QueryCollection<T> {
        let container = self.scope.container();
        let collected = Collector::collect_all(&self.items, container.as_ref());
        QueryCollection::new(collected.items)
    }

    pub fn filter(&self, criteria: impl Into<Criteria>) -> Result<QueryCollection<T>> {
        self.children().filter(criteria)
    }

    pub fn exclude(&self, criteria: impl Into<Criteria>) -> Result<QueryCollection<T>> {
        self.children().exclude(criteria)
    }

    pub fn get(&self, criteria: impl Into<Criteria>) -> Result<Handle<T>> {
        self.children().get(criteria)
    }

    pub fn first(&self) -> Option<Handle<T>> {
        self.items.first().cloned()
    }

    pub fn last(&self) -> Option<Handle<T>> {
        self.items.last().cloned()
    }

    pub fn count(&self) -> usize {
        self.items.len()
    }

    pub fn exists(&self) -> bool {
        !self.items.is_empty()
    }

    pub fn none(&self) -> QueryCollection<T> {
        QueryCollection::empty()
    }

    pub fn order_by(&self, fields: &[&str]) -> Result<QueryCollection<T>> {
        self.children().order_by(fields)
    }

    /// Default-construct, apply `fields`, validate and append
    pub fn create(&mut self, fields: impl Into<Criteria>) -> Result<Handle<T>> {
        let fields = fields.into();
        let item = T::new_handle();
        item.borrow_mut().update(&fields)?;
        self.attach(&item)?;
        self.items.push(item.clone());
        Ok(item)
    }

    /// Append an entity value
    pub fn insert(&mut self, entity: T) -> Result<Handle<T>> {
        let item = entity.into_handle();
        self.add([item.clone()])?;
        Ok(item)
    }

    /// Append existing handles, skipping ones already present.
    ///
    /// A bound manager takes ownership: each item is detached from its
    /// previous container and pointed back at this one.
    pub fn add<I>(&mut self, items: I) -> Result<()>
    where
        I: IntoIterator<Item = Handle<T>>,
    {
        for item in items {
            if self.contains(&item) {
                continue;
            }
            self.attach(&item)?;
            self.items.push(item);
        }
        Ok(())
    }

    fn attach(&self, item: &Handle<T>) -> Result<()> {
        let (target, owner) = match &self.scope {
            Scope::Detached => return Ok(()),
            Scope::Root(root) => (root, None),
            Scope::Bound(owner) => (owner, Some(owner)),
        };

        let mut entity = item.try_borrow_mut().map_err(|_| Error::Validation {
            field: None,
            message: format!(
                "cannot add a {} that is currently borrowed (is it the container itself?)",
                T::KIND
            ),
        })?;
        entity.check_adoption(target)?;

        if let Some(previous) = entity.meta().parent() {
            let same = owner.map_or(false, |o| Rc::as_ptr(&previous) == o.as_ptr());
            if !same {
                match previous.try_borrow_mut() {
                    Ok(mut container) => T::manager_mut(&mut container).forget(item),
                    Err(_) => tracing::warn!(
                        "Could not detach {} from its previous container: container is borrowed",
                        T::KIND
                    ),
                }
            }
        }

        match owner {
            Some(owner) => entity.meta_mut().set_parent(owner.clone()),
            None => entity.meta_mut().clear_parent(),
        }
        Ok(())
    }

    /// Drop an item from the sequence without touching its back-reference
    pub(crate) fn forget(&mut self, item: &Handle<T>) {
        self.items.retain(|existing| !Rc::ptr_eq(existing, item));
    }

    fn release(&self, item: &Handle<T>) {
        let Some(owner) = self.scope.owner() else {
            return;
        };
        match item.try_borrow_mut() {
            Ok(mut entity) => {
                if entity.meta().is_child_of(owner) {
                    entity.meta_mut().clear_parent();
                }
            }
            Err(_) => tracing::warn!("Could not clear parent of a borrowed {}", T::KIND),
        }
    }

    /// Remove by identity; returns how many were removed
    pub fn remove<I>(&mut self, items: I) -> usize
    where
        I: IntoIterator<Item = Handle<T>>,
    {
        let mut removed = 0;
        for item in items {
            let before = self.items.len();
            self.forget(&item);
            if self.items.len() < before {
                self.release(&item);
                removed += 1;
            }
        }
        removed
    }

    pub fn clear(&mut self) {
        for item in &self.items {
            self.release(item);
        }
        self.items.clear();
    }

    /// Fetch the single match or create one from `criteria`.
    ///
    /// Both "no match" and "several matches" create a new entity; the
    /// ambiguous case is logged. Returns the entity and whether it was created.
    pub fn get_or_create(&mut self, criteria: impl Into<Criteria>) -> Result<(Handle<T>, bool)> {
        let criteria = criteria.into();
        match self.get(criteria.clone()) {
            Ok(existing) => Ok((existing, false)),
            Err(Error::NotFound { .. }) => Ok((self.create(criteria)?, true)),
            Err(Error::MultipleReturned { count, .. }) => {
                tracing::warn!(
                    "get_or_create found {} {} entities for ({}); creating another",
                    count,
                    T::KIND,
                    criteria
                );
                Ok((self.create(criteria)?, true))
            }
            Err(e) => Err(e),
        }
    }

    /// Append a batch of new entities without duplicate checks or validation
    pub fn bulk_create<I>(&mut self, entities: I) -> Vec<Handle<T>>
    where
        I: IntoIterator<Item = T>,
    {
        let owner = self.scope.owner().cloned();
        let created: Vec<Handle<T>> = entities
            .into_iter()
            .map(|entity| {
                let item = entity.into_handle();
                if let Some(owner) = &owner {
                    item.borrow_mut().meta_mut().set_parent(owner.clone());
                }
                item
            })
            .collect();
        self.items.extend(created.iter().cloned());
        tracing::debug!("Bulk created {} {} entities", created.len(), T::KIND);
        created
    }
}

impl<T: Kind + HasCoordinates> Manager<T> {
    pub fn near(
        &self,
        longitude: f64,
        latitude: f64,
        radius_km: Option<f64>,
    ) -> Result<QueryCollection<T>> {
        self.children().near(longitude, latitude, radius_km)
    }

    pub fn within_bounds(
        &self,
        north: f64,
        south: f64,
        east: f64,
        west: f64,
    ) -> Result<QueryCollection<T>> {
        self.children().within_bounds(north, south, east, west)
    }

    pub fn has_coordinates(&self) -> QueryCollection<T> {
        self.children().has_coordinates()
    }

    pub fn valid_coordinates(&self) -> QueryCollection<T> {
        self.children().valid_coordinates()
    }
}

/// Whether two handles point at the same entity
pub fn same<T>(a: &Handle<T>, b: &Handle<T>) -> bool {
    identity(a) == identity(b)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::Point;
    use crate::placemark::Placemark;
    use serde_json::json;

    #[test]
    fn test_create_applies_fields() {
        let mut manager: Manager<Placemark> = Manager::new();
        let cafe = manager
            .create([("name", json!("Cafe")), ("coordinates", json!([1.0, 2.0]))])
            .unwrap();
        assert_eq!(manager.count(), 1);
        assert_eq!(cafe.borrow().latitude(), Some(2.0));

        let err = manager.create([("coordinates", json!([1.0, 100.0]))]).unwrap_err();
        assert!(err.is_validation());
        assert_eq!(manager.count(), 1);
    }

    #[test]
    fn test_add_dedups_by_identity() {
        let mut manager: Manager<Point> = Manager::new();
        let point = handle(Point::new());
        manager.add([point.clone(), point.clone()]).unwrap();
        manager.add([point.clone()]).unwrap();
        assert_eq!(manager.len(), 1);

        assert_eq!(manager.remove([point.clone()]), 1);
        assert_eq!(manager.remove([point]), 0);
        assert!(!manager.exists());
    }

    #[test]
    fn test_get_and_get_or_create() {
        let mut manager: Manager<Placemark> = Manager::new();
        manager.create([("name", "A")]).unwrap();
        manager.create([("name", "B")]).unwrap();
        manager.create([("name", "B")]).unwrap();

        assert!(manager.get([("name", "A")]).is_ok());
        assert!(manager.get([("name", "Z")]).unwrap_err().is_not_found());
        assert!(manager.get([("name", "B")]).unwrap_err().is_multiple_returned());

        let (a, created) = manager.get_or_create([("name", "A")]).unwrap();
        assert!(!created);
        assert!(same(&a, &manager.first().unwrap()));

        let (_, created) = manager.get_or_create([("name", "C")]).unwrap();
        assert!(created);

        // ambiguity creates a fresh entity
        let (b, created) = manager.get_or_create([("name", "B")]).unwrap();
        assert!(created);
        assert_eq!(manager.filter([("name", "B")]).unwrap().count(), 3);
        assert!(same(&b, &manager.last().unwrap()));
    }

    #[test]
    fn test_bulk_create() {
        let mut manager: Manager<Point> = Manager::new();
        let created = manager.bulk_create(vec![Point::new(), Point::new()]);
        assert_eq!(created.len(), 2);
        assert_eq!(manager.len(), 2);
    }

    #[test]
    fn test_geospatial_shortcuts() {
        let mut manager: Manager<Point> = Manager::new();
        manager.insert(Point::at(0.0, 0.0).unwrap()).unwrap();
        manager.insert(Point::at(10.0, 10.0).unwrap()).unwrap();
        manager.insert(Point::new()).unwrap();

        assert_eq!(manager.near(0.0, 0.0, Some(100.0)).unwrap().count(), 1);
        assert_eq!(manager.has_coordinates().count(), 2);
        assert_eq!(
            manager.within_bounds(20.0, 5.0, 20.0, 5.0).unwrap().count(),
            1
        );
    }

    #[test]
    fn test_all_on_mutably_borrowed_container() {
        let folder = crate::container::Container::new();
        let nested = crate::container::Container::new();
        nested.borrow_mut().points.insert(Point::new()).unwrap();
        folder.borrow_mut().folders.add([nested]).unwrap();
        folder.borrow_mut().points.insert(Point::new()).unwrap();

        assert_eq!(folder.borrow().points.all().count(), 2);
        let mut guard = folder.borrow_mut();
        assert_eq!(guard.points.all().count(), 1);
        guard.points.insert(Point::new()).unwrap();
        assert_eq!(guard.points.all().count(), 2);
    }
}
