//! Containers: folders that own typed children and nested folders

use serde_json::Value;
use std::cell::RefCell;
use std::collections::HashSet;
use std::rc::{Rc, Weak};

use crate::entity::{handle, identity, Entity, EntityMeta, Field, Handle};
use crate::error::{Error, Result};
use crate::geometry::{Geometry, MultiGeometry, Path, Point, Polygon};
use crate::manager::{Kind, Manager, Scope};
use crate::placemark::Placemark;

/// A node owning one manager per child kind plus a manager of nested containers.
///
/// Containers always live behind a [`Handle`] so their managers can point
/// children back at them; build one with [`Container::new`] or
/// [`Container::named`].
#[derive(Debug, Default)]
pub struct Container {
    pub meta: EntityMeta,
    pub placemarks: Manager<Placemark>,
    pub folders: Manager<Container>,
    pub points: Manager<Point>,
    pub paths: Manager<Path>,
    pub polygons: Manager<Polygon>,
    pub multigeometries: Manager<MultiGeometry>,
}

impl Container {
    pub fn new() -> Handle<Self> {
        Self::default().into_handle()
    }

    pub fn named(name: impl Into<String>) -> Handle<Self> {
        Self {
            meta: EntityMeta::new().with_name(name),
            ..Self::default()
        }
        .into_handle()
    }

    /// Turn this container into a tree root.
    ///
    /// Root managers traverse the whole tree but set no back-references, so
    /// direct children end up without a parent.
    pub fn into_root(self) -> Handle<Self> {
        Rc::new_cyclic(|weak| {
            let mut container = self;
            container.rebind(Scope::Root(weak.clone()));
            RefCell::new(container)
        })
    }

    fn rebind(&mut self, scope: Scope) {
        self.placemarks.rebind(scope.clone());
        self.folders.rebind(scope.clone());
        self.points.rebind(scope.clone());
        self.paths.rebind(scope.clone());
        self.polygons.rebind(scope.clone());
        self.multigeometries.rebind(scope);
    }

    /// Typed access to the manager for `T`
    pub fn manager<T: Kind>(&self) -> &Manager<T> {
        T::manager(self)
    }

    pub fn manager_mut<T: Kind>(&mut self) -> &mut Manager<T> {
        T::manager_mut(self)
    }

    pub fn placemark_count(&self) -> usize {
        self.placemarks.len()
    }

    pub fn folder_count(&self) -> usize {
        self.folders.len()
    }

    pub fn point_count(&self) -> usize {
        self.points.len()
    }

    pub fn path_count(&self) -> usize {
        self.paths.len()
    }

    pub fn polygon_count(&self) -> usize {
        self.polygons.len()
    }

    pub fn multigeometry_count(&self) -> usize {
        self.multigeometries.len()
    }

    /// Direct children of every kind, nested containers included
    pub fn total_element_count(&self) -> usize {
        self.placemark_count()
            + self.folder_count()
            + self.point_count()
            + self.path_count()
            + self.polygon_count()
            + self.multigeometry_count()
    }
}

static CONTAINER_FIELDS: &[Field<Container>] = &[
    Field::read_only("placemark_count", |c: &Container| {
        Value::from(c.placemark_count())
    }),
    Field::read_only("folder_count", |c: &Container| Value::from(c.folder_count())),
    Field::read_only("point_count", |c: &Container| Value::from(c.point_count())),
    Field::read_only("path_count", |c: &Container| Value::from(c.path_count())),
    Field::read_only("polygon_count", |c: &Container| Value::from(c.polygon_count())),
    Field::read_only("multigeometry_count", |c: &Container| {
        Value::from(c.multigeometry_count())
    }),
    Field::read_only("total_element_count", |c: &Container| {
        Value::from(c.total_element_count())
    }),
];

impl Entity for Container {
    const KIND: &'static str = "Folder";

    fn meta(&self) -> &EntityMeta {
        &self.meta
    }

    fn meta_mut(&mut self) -> &mut EntityMeta {
        &mut self.meta
    }

    fn fields() -> &'static [Field<Self>] {
        CONTAINER_FIELDS
    }
}

impl Kind for Container {
    fn new_handle() -> Handle<Self> {
        Self::new()
    }

    /// Rebuilds the container around its final address and re-points its children
    fn into_handle(self) -> Handle<Self> {
        Rc::new_cyclic(|weak| {
            let mut container = self;
            container.rebind(Scope::Bound(weak.clone()));
            RefCell::new(container)
        })
    }

    fn manager(container: &Container) -> &Manager<Self> {
        &container.folders
    }

    fn manager_mut(container: &mut Container) -> &mut Manager<Self> {
        &mut container.folders
    }

    /// A folder cannot move below one of its own descendants
    fn check_adoption(&self, target: &Weak<RefCell<Container>>) -> Result<()> {
        let target = target.as_ptr();
        let mut visited = HashSet::new();
        let mut stack: Vec<Handle<Container>> = self.folders.iter().cloned().collect();
        while let Some(folder) = stack.pop() {
            if Rc::as_ptr(&folder) == target {
                return Err(Error::validation(
                    "folders",
                    "a folder cannot be added below one of its own descendants",
                ));
            }
            if !visited.insert(identity(&folder)) {
                continue;
            }
            let descendant = folder.try_borrow().map_err(|_| {
                Error::validation(
                    "folders",
                    "a descendant folder is borrowed; cannot rule out a cycle",
                )
            })?;
            stack.extend(descendant.folders.iter().cloned());
        }
        Ok(())
    }
}

impl Kind for Placemark {
    fn new_handle() -> Handle<Self> {
        handle(Self::default())
    }

    fn manager(container: &Container) -> &Manager<Self> {
        &container.placemarks
    }

    fn manager_mut(container: &mut Container) -> &mut Manager<Self> {
        &mut container.placemarks
    }
}

impl Kind for Point {
    const UNWRAPS_GEOMETRY: bool = true;

    fn new_handle() -> Handle<Self> {
        handle(Self::default())
    }

    fn manager(container: &Container) -> &Manager<Self> {
        &container.points
    }

    fn manager_mut(container: &mut Container) -> &mut Manager<Self> {
        &mut container.points
    }

    fn from_geometry(geometry: &Geometry) -> Option<Handle<Self>> {
        match geometry {
            Geometry::Point(point) => Some(point.clone()),
            _ => None,
        }
    }
}

impl Kind for Path {
    const UNWRAPS_GEOMETRY: bool = true;

    fn new_handle() -> Handle<Self> {
        handle(Self::default())
    }

    fn manager(container: &Container) -> &Manager<Self> {
        &container.paths
    }

    fn manager_mut(container: &mut Container) -> &mut Manager<Self> {
        &mut container.paths
    }

    fn from_geometry(geometry: &Geometry) -> Option<Handle<Self>> {
        match geometry {
            Geometry::Path(path) => Some(path.clone()),
            _ => None,
        }
    }
}

impl Kind for Polygon {
    const UNWRAPS_GEOMETRY: bool = true;

    fn new_handle() -> Handle<Self> {
        handle(Self::default())
    }

    fn manager(container: &Container) -> &Manager<Self> {
        &container.polygons
    }

    fn manager_mut(container: &mut Container) -> &mut Manager<Self> {
        &mut container.polygons
    }

    fn from_geometry(geometry: &Geometry) -> Option<Handle<Self>> {
        match geometry {
            Geometry::Polygon(polygon) => Some(polygon.clone()),
            _ => None,
        }
    }
}

impl Kind for MultiGeometry {
    const UNWRAPS_GEOMETRY: bool = true;

    fn new_handle() -> Handle<Self> {
        handle(Self::default())
    }

    fn manager(container: &Container) -> &Manager<Self> {
        &container.multigeometries
    }

    fn manager_mut(container: &mut Container) -> &mut Manager<Self> {
        &mut container.multigeometries
    }

    fn from_geometry(geometry: &Geometry) -> Option<Handle<Self>> {
        match geometry {
            Geometry::Multi(multi) => Some(multi.clone()),
            _ => None,
        }
    }
}
