//! Recursive collection across containers, placemarks and aggregates

use serde::{Deserialize, Serialize};
use std::collections::{HashSet, VecDeque};

use crate::container::Container;
use crate::entity::{identity, Handle};
use crate::geometry::Geometry;
use crate::manager::Kind;

/// Collection statistics
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CollectionStats {
    pub containers_visited: usize,
    pub containers_skipped: usize,
    pub placemarks_scanned: usize,
    pub aggregates_unwrapped: usize,
    pub entities_collected: usize,
    pub duplicates_skipped: usize,
    pub max_depth_reached: u32,
}

/// Result of a recursive collection
#[derive(Debug, Clone)]
pub struct Collected<T> {
    pub items: Vec<Handle<T>>,
    pub stats: CollectionStats,
}

/// Output buffer that keeps first-seen order and drops repeated handles
struct Sink<T> {
    items: Vec<Handle<T>>,
    seen: HashSet<usize>,
}

impl<T> Sink<T> {
    fn new() -> Self {
        Self {
            items: Vec::new(),
            seen: HashSet::new(),
        }
    }

    fn push(&mut self, item: Handle<T>, stats: &mut CollectionStats) {
        if self.seen.insert(identity(&item)) {
            self.items.push(item);
        } else {
            stats.duplicates_skipped += 1;
        }
    }
}

/// Recursive collector over the container tree
pub struct Collector;

impl Collector {
    /// Collect `own` plus every same-kind entity under `scope`.
    ///
    /// Containers are walked breadth-first with a visited set. For kinds
    /// with [`Kind::UNWRAPS_GEOMETRY`], every visited level (the scope
    /// container included) also contributes the geometries embedded in its
    /// placemarks and the leaves of its aggregates, to any depth.
    ///
    /// A container that is mutably borrowed (typically the caller's own,
    /// reached through a `RefMut`) is skipped with a warning, together with
    /// everything below it; `own` is always part of the result.
    pub fn collect_all<T: Kind>(
        own: &[Handle<T>],
        scope: Option<&Handle<Container>>,
    ) -> Collected<T> {
        let mut stats = CollectionStats::default();
        let mut sink = Sink::new();
        for item in own {
            sink.push(item.clone(), &mut stats);
        }

        let Some(root) = scope else {
            stats.entities_collected = sink.items.len();
            return Collected {
                items: sink.items,
                stats,
            };
        };

        let mut visited: HashSet<usize> = HashSet::new();
        let mut aggregates_seen: HashSet<usize> = HashSet::new();
        let mut queue: VecDeque<(Handle<Container>, u32)> = VecDeque::new();

        visited.insert(identity(root));
        match root.try_borrow() {
            Ok(container) => {
                stats.containers_visited += 1;
                if T::UNWRAPS_GEOMETRY {
                    Self::unwrap_level(&container, &mut aggregates_seen, &mut sink, &mut stats);
                }
                for folder in container.folders.iter() {
                    queue.push_back((folder.clone(), 1));
                }
            }
            Err(_) => {
                stats.containers_skipped += 1;
                tracing::warn!(
                    "Collecting {} entities from a mutably borrowed container; only its direct children are returned",
                    T::KIND
                );
            }
        }

        while let Some((current, depth)) = queue.pop_front() {
            if !visited.insert(identity(&current)) {
                continue;
            }
            let Ok(container) = current.try_borrow() else {
                stats.containers_skipped += 1;
                tracing::warn!("Skipping a mutably borrowed container at depth {}", depth);
                continue;
            };
            stats.containers_visited += 1;
            stats.max_depth_reached = stats.max_depth_reached.max(depth);

            for item in T::manager(&container).iter() {
                sink.push(item.clone(), &mut stats);
            }
            if T::UNWRAPS_GEOMETRY {
                Self::unwrap_level(&container, &mut aggregates_seen, &mut sink, &mut stats);
            }
            for folder in container.folders.iter() {
                queue.push_back((folder.clone(), depth + 1));
            }
        }

        stats.entities_collected = sink.items.len();
        tracing::debug!(
            "Collected {} {} entities: {} containers ({} skipped), {} placemarks, {} aggregates, {} duplicates, depth {}",
            stats.entities_collected,
            T::KIND,
            stats.containers_visited,
            stats.containers_skipped,
            stats.placemarks_scanned,
            stats.aggregates_unwrapped,
            stats.duplicates_skipped,
            stats.max_depth_reached
        );

        Collected {
            items: sink.items,
            stats,
        }
    }

    /// Embedded geometries of this level's placemarks and its standalone aggregates
    fn unwrap_level<T: Kind>(
        container: &Container,
        aggregates_seen: &mut HashSet<usize>,
        sink: &mut Sink<T>,
        stats: &mut CollectionStats,
    ) {
        let mut seeds: Vec<Geometry> = Vec::new();
        for placemark in container.placemarks.iter() {
            let Ok(placemark) = placemark.try_borrow() else {
                tracing::warn!("Skipping a mutably borrowed Placemark");
                continue;
            };
            stats.placemarks_scanned += 1;
            seeds.extend(placemark.geometry.iter().cloned());
            seeds.extend(placemark.multigeometry.iter().cloned().map(Geometry::Multi));
        }
        seeds.extend(container.multigeometries.iter().cloned().map(Geometry::Multi));
        Self::walk(seeds, aggregates_seen, sink, stats);
    }

    /// Depth-first over aggregate members with an explicit stack
    fn walk<T: Kind>(
        seeds: Vec<Geometry>,
        aggregates_seen: &mut HashSet<usize>,
        sink: &mut Sink<T>,
        stats: &mut CollectionStats,
    ) {
        let mut stack = seeds;
        stack.reverse();
        while let Some(geometry) = stack.pop() {
            if let Some(item) = T::from_geometry(&geometry) {
                sink.push(item, stats);
            }
            if let Geometry::Multi(multi) = &geometry {
                if !aggregates_seen.insert(identity(multi)) {
                    continue;
                }
                stats.aggregates_unwrapped += 1;
                match multi.try_borrow() {
                    Ok(multi) => stack.extend(multi.geometries().iter().rev().cloned()),
                    Err(_) => tracing::warn!("Skipping a mutably borrowed MultiGeometry"),
                }
            }
        }
    }
}

/// Every handle of kind `T` reachable from `seeds`, unwrapping aggregates
pub fn unwrap_geometries<T: Kind>(seeds: impl IntoIterator<Item = Geometry>) -> Vec<Handle<T>> {
    let mut sink = Sink::new();
    let mut stats = CollectionStats::default();
    let mut aggregates_seen = HashSet::new();
    Collector::walk(
        seeds.into_iter().collect(),
        &mut aggregates_seen,
        &mut sink,
        &mut stats,
    );
    sink.items
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entity::handle;
    use crate::geometry::{MultiGeometry, Point};
    use crate::placemark::Placemark;

    #[test]
    fn test_detached_scope_returns_own_items() {
        let a = handle(Point::new());
        let collected = Collector::collect_all(&[a.clone(), a.clone()], None);
        assert_eq!(collected.items.len(), 1);
        assert_eq!(collected.stats.duplicates_skipped, 1);
    }

    #[test]
    fn test_unwrap_level_reaches_embedded_and_nested() {
        let root = Container::new();
        let mut inner = MultiGeometry::new();
        inner.add_geometry(Point::at(3.0, 3.0).unwrap());
        let mut outer = MultiGeometry::new();
        outer.add_geometry(inner);
        outer.add_geometry(Point::at(2.0, 2.0).unwrap());

        let placemark = Placemark::at(1.0, 1.0).unwrap().with_multigeometry(handle(outer));
        root.borrow_mut().placemarks.insert(placemark).unwrap();

        let collected = Collector::collect_all::<Point>(&[], Some(&root));
        assert_eq!(collected.items.len(), 3);
        assert_eq!(collected.stats.aggregates_unwrapped, 2);
        assert_eq!(collected.stats.placemarks_scanned, 1);

        let aggregates = Collector::collect_all::<MultiGeometry>(&[], Some(&root));
        assert_eq!(aggregates.items.len(), 2);

        // placemarks never come from geometry
        let placemarks = Collector::collect_all::<Placemark>(&[], Some(&root));
        assert!(placemarks.items.is_empty());
    }

    #[test]
    fn test_borrowed_scope_returns_own_items() {
        let root = Container::new();
        let nested = Container::new();
        nested.borrow_mut().placemarks.insert(Placemark::named("deep")).unwrap();
        root.borrow_mut().folders.add([nested.clone()]).unwrap();
        let top = root.borrow_mut().placemarks.insert(Placemark::named("top")).unwrap();

        let guard = root.borrow_mut();
        let collected = Collector::collect_all(guard.placemarks.as_slice(), Some(&root));
        assert_eq!(collected.items.len(), 1);
        assert!(std::rc::Rc::ptr_eq(&collected.items[0], &top));
        assert_eq!(collected.stats.containers_skipped, 1);
        assert_eq!(collected.stats.containers_visited, 0);
    }

    #[test]
    fn test_borrowed_descendant_is_skipped() {
        let root = Container::new();
        let busy = Container::new();
        let quiet = Container::new();
        busy.borrow_mut().placemarks.insert(Placemark::named("busy")).unwrap();
        quiet.borrow_mut().placemarks.insert(Placemark::named("quiet")).unwrap();
        root.borrow_mut().folders.add([busy.clone(), quiet.clone()]).unwrap();

        let _guard = busy.borrow_mut();
        let collected = Collector::collect_all::<Placemark>(&[], Some(&root));
        assert_eq!(collected.items.len(), 1);
        assert_eq!(collected.stats.containers_visited, 2);
        assert_eq!(collected.stats.containers_skipped, 1);
    }
}
