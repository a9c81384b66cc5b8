//! Document root: the container an ingestion layer hands over

use geodex_geodesy::Bounds;
use serde::Serialize;
use std::cell::{Ref, RefMut};

use crate::container::Container;
use crate::entity::{EntityMeta, Handle};
use crate::geometry::{MultiGeometry, Path, Point, Polygon};
use crate::manager::{Kind, Manager};
use crate::placemark::Placemark;
use crate::traversal::Collector;

/// Entity totals across the whole tree
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DocumentSummary {
    pub placemarks: usize,
    pub folders: usize,
    pub points: usize,
    pub paths: usize,
    pub polygons: usize,
    pub multigeometries: usize,
}

/// A document tree.
///
/// The root's managers reach every nested container for recursive retrieval,
/// but root-level entities carry no parent.
#[derive(Debug, Clone)]
pub struct Document {
    root: Handle<Container>,
}

impl Default for Document {
    fn default() -> Self {
        Self::new()
    }
}

impl Document {
    pub fn new() -> Self {
        Self {
            root: Container::default().into_root(),
        }
    }

    pub fn named(name: impl Into<String>) -> Self {
        Self::from_container(Container {
            meta: EntityMeta::new().with_name(name),
            ..Container::default()
        })
    }

    /// Adopt a fully built tree; its direct children lose their parent
    pub fn from_container(container: Container) -> Self {
        Self {
            root: container.into_root(),
        }
    }

    pub fn root(&self) -> &Handle<Container> {
        &self.root
    }

    pub fn name(&self) -> Option<String> {
        self.root.borrow().meta.name.clone()
    }

    pub fn meta(&self) -> Ref<'_, EntityMeta> {
        Ref::map(self.root.borrow(), |root| &root.meta)
    }

    pub fn meta_mut(&self) -> RefMut<'_, EntityMeta> {
        RefMut::map(self.root.borrow_mut(), |root| &mut root.meta)
    }

    /// Typed access to the root manager for `T`
    pub fn manager<T: Kind>(&self) -> Ref<'_, Manager<T>> {
        Ref::map(self.root.borrow(), T::manager)
    }

    pub fn manager_mut<T: Kind>(&self) -> RefMut<'_, Manager<T>> {
        RefMut::map(self.root.borrow_mut(), T::manager_mut)
    }

    pub fn placemarks(&self) -> Ref<'_, Manager<Placemark>> {
        self.manager()
    }

    pub fn placemarks_mut(&self) -> RefMut<'_, Manager<Placemark>> {
        self.manager_mut()
    }

    pub fn folders(&self) -> Ref<'_, Manager<Container>> {
        self.manager()
    }

    pub fn folders_mut(&self) -> RefMut<'_, Manager<Container>> {
        self.manager_mut()
    }

    pub fn points(&self) -> Ref<'_, Manager<Point>> {
        self.manager()
    }

    pub fn points_mut(&self) -> RefMut<'_, Manager<Point>> {
        self.manager_mut()
    }

    pub fn paths(&self) -> Ref<'_, Manager<Path>> {
        self.manager()
    }

    pub fn paths_mut(&self) -> RefMut<'_, Manager<Path>> {
        self.manager_mut()
    }

    pub fn polygons(&self) -> Ref<'_, Manager<Polygon>> {
        self.manager()
    }

    pub fn polygons_mut(&self) -> RefMut<'_, Manager<Polygon>> {
        self.manager_mut()
    }

    pub fn multigeometries(&self) -> Ref<'_, Manager<MultiGeometry>> {
        self.manager()
    }

    pub fn multigeometries_mut(&self) -> RefMut<'_, Manager<MultiGeometry>> {
        self.manager_mut()
    }

    /// Every `T` in the tree; empty while the root is mutably borrowed
    fn collect<T: Kind>(&self) -> Vec<Handle<T>> {
        match self.root.try_borrow() {
            Ok(root) => Collector::collect_all(T::manager(&root).as_slice(), Some(&self.root)).items,
            Err(_) => {
                tracing::warn!("Document root is mutably borrowed; no {} entities collected", T::KIND);
                Vec::new()
            }
        }
    }

    /// Recursive totals per kind
    pub fn summary(&self) -> DocumentSummary {
        DocumentSummary {
            placemarks: self.collect::<Placemark>().len(),
            folders: self.collect::<Container>().len(),
            points: self.collect::<Point>().len(),
            paths: self.collect::<Path>().len(),
            polygons: self.collect::<Polygon>().len(),
            multigeometries: self.collect::<MultiGeometry>().len(),
        }
    }

    /// Smallest box around every placemark and point in the tree
    pub fn bounds(&self) -> Option<Bounds> {
        let placemarks = self.collect::<Placemark>();
        let points = self.collect::<Point>();
        let coordinates: Vec<_> = placemarks
            .iter()
            .filter_map(|p| p.try_borrow().ok()?.coordinates())
            .chain(
                points
                    .iter()
                    .filter_map(|p| p.try_borrow().ok()?.coordinates()),
            )
            .collect();
        Bounds::enclosing(&coordinates)
    }
}
