//! Query collections: chainable, read-only views over entity handles

use geodex_geodesy::{haversine_km, Bounds, Coordinate, HasCoordinates};
use serde_json::{Map, Value};
use std::collections::HashSet;
use std::fmt;

use crate::criteria::Criteria;
use crate::entity::{dedup_key, Entity, Handle};
use crate::error::{Error, Result};
use crate::limits::validate_order_fields;
use crate::lookup::{compile, sort_order, split_path, Predicate};

/// Marker for descending order in `order_by`
pub const DESCENDING_PREFIX: char = '-';

/// An ordered view over shared entities.
///
/// Every operation returns a new collection referencing the same handles;
/// nothing here mutates the tree. `filter`, `exclude` and `distinct` keep the
/// ordering metadata of their receiver.
pub struct QueryCollection<T> {
    items: Vec<Handle<T>>,
    ordered: bool,
    order_fields: Vec<String>,
    distinct: bool,
}

impl<T> Clone for QueryCollection<T> {
    fn clone(&self) -> Self {
        Self {
            items: self.items.clone(),
            ordered: self.ordered,
            order_fields: self.order_fields.clone(),
            distinct: self.distinct,
        }
    }
}

impl<T> fmt::Debug for QueryCollection<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("QueryCollection")
            .field("len", &self.items.len())
            .field("ordered", &self.ordered)
            .field("order_fields", &self.order_fields)
            .field("distinct", &self.distinct)
            .finish()
    }
}

impl<T> Default for QueryCollection<T> {
    fn default() -> Self {
        Self::empty()
    }
}

impl<T> QueryCollection<T> {
    pub fn new(items: Vec<Handle<T>>) -> Self {
        Self {
            items,
            ordered: false,
            order_fields: Vec::new(),
            distinct: false,
        }
    }

    pub fn empty() -> Self {
        Self::new(Vec::new())
    }

    /// Same metadata, different items
    fn derive(&self, items: Vec<Handle<T>>) -> Self {
        Self {
            items,
            ordered: self.ordered,
            order_fields: self.order_fields.clone(),
            distinct: self.distinct,
        }
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Handle<T>> {
        self.items.iter()
    }

    pub fn get_index(&self, index: usize) -> Option<&Handle<T>> {
        self.items.get(index)
    }

    /// Up to `limit` items starting at `offset`
    pub fn slice(&self, offset: usize, limit: usize) -> Self {
        let items = self.items.iter().skip(offset).take(limit).cloned().collect();
        self.derive(items)
    }

    pub fn as_slice(&self) -> &[Handle<T>] {
        &self.items
    }

    pub fn into_vec(self) -> Vec<Handle<T>> {
        self.items
    }

    pub fn is_ordered(&self) -> bool {
        self.ordered
    }

    pub fn order_by_fields(&self) -> &[String] {
        &self.order_fields
    }

    pub fn is_distinct(&self) -> bool {
        self.distinct
    }

    /// A plain copy with no ordering or distinct metadata
    pub fn all(&self) -> Self {
        Self::new(self.items.clone())
    }

    pub fn none(&self) -> Self {
        Self::empty()
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

    pub fn reverse(&self) -> Self {
        Self::new(self.items.iter().rev().cloned().collect())
    }
}

impl<T: Entity> QueryCollection<T> {
    fn matching(&self, predicates: &[Predicate], keep: bool) -> Vec<Handle<T>> {
        self.items
            .iter()
            .filter(|item| {
                let entity = item.borrow();
                let all_match = predicates
                    .iter()
                    .all(|p| p.matches(entity.resolve_path(p.path()).as_ref()));
                all_match == keep
            })
            .cloned()
            .collect()
    }

    /// Keep elements matching every criterion
    pub fn filter(&self, criteria: impl Into<Criteria>) -> Result<Self> {
        let predicates = compile(&criteria.into())?;
        Ok(self.derive(self.matching(&predicates, true)))
    }

    /// Drop elements matching every criterion
    pub fn exclude(&self, criteria: impl Into<Criteria>) -> Result<Self> {
        let predicates = compile(&criteria.into())?;
        Ok(self.derive(self.matching(&predicates, false)))
    }

    /// The single element matching `criteria`
    pub fn get(&self, criteria: impl Into<Criteria>) -> Result<Handle<T>> {
        let criteria = criteria.into();
        let predicates = compile(&criteria)?;
        let mut found = self.matching(&predicates, true);
        match found.len() {
            1 => Ok(found.remove(0)),
            0 => Err(Error::NotFound {
                kind: T::KIND,
                criteria,
            }),
            count => Err(Error::MultipleReturned {
                kind: T::KIND,
                count,
                criteria,
            }),
        }
    }

    /// Stable multi-key sort; `-field` sorts descending.
    ///
    /// Keys are applied last to first so the first field is primary. A field
    /// that does not resolve on some element is a query error.
    pub fn order_by(&self, fields: &[&str]) -> Result<Self> {
        if fields.is_empty() {
            return Ok(self.all());
        }
        validate_order_fields(fields.len())?;

        let mut items = self.items.clone();
        for field in fields.iter().rev() {
            let (descending, name) = match field.strip_prefix(DESCENDING_PREFIX) {
                Some(name) => (true, name),
                None => (false, *field),
            };
            let path = split_path(name).map_err(|e| Error::query_field(*field, e.to_string()))?;

            let mut keyed = items
                .into_iter()
                .map(|item| -> Result<(Value, Handle<T>)> {
                    let key = item.borrow().resolve_path(&path).ok_or_else(|| {
                        Error::query_field(name, format!("cannot order {} by this field", T::KIND))
                    })?;
                    Ok((key, item))
                })
                .collect::<Result<Vec<(Value, Handle<T>)>>>()?;

            keyed.sort_by(|(a, _), (b, _)| {
                let ordering = sort_order(a, b);
                if descending {
                    ordering.reverse()
                } else {
                    ordering
                }
            });
            items = keyed.into_iter().map(|(_, item)| item).collect();
        }

        Ok(Self {
            items,
            ordered: true,
            order_fields: fields.iter().map(|f| f.to_string()).collect(),
            distinct: self.distinct,
        })
    }

    /// Drop repeats by declared id, or by identity when there is none
    pub fn distinct(&self) -> Self {
        let mut seen = HashSet::new();
        let items = self
            .items
            .iter()
            .filter(|item| seen.insert(dedup_key(item)))
            .cloned()
            .collect();
        Self {
            distinct: true,
            ..self.derive(items)
        }
    }

    /// One map per element; no fields means the full field dump
    pub fn values(&self, fields: &[&str]) -> Result<Vec<Map<String, Value>>> {
        if fields.is_empty() {
            return Ok(self.items.iter().map(|item| item.borrow().to_field_map()).collect());
        }
        let paths = projection_paths(fields)?;
        Ok(self
            .items
            .iter()
            .map(|item| {
                let entity = item.borrow();
                paths
                    .iter()
                    .map(|(field, path)| {
                        let value = entity.resolve_path(path).unwrap_or(Value::Null);
                        (field.to_string(), value)
                    })
                    .collect()
            })
            .collect())
    }

    /// One array per element, or bare values when `flat` (which needs exactly one field).
    ///
    /// With no fields every element yields an empty array.
    pub fn values_list(&self, fields: &[&str], flat: bool) -> Result<Vec<Value>> {
        if flat && fields.len() != 1 {
            return Err(Error::query(format!(
                "values_list(flat=true) needs exactly one field, got {}",
                fields.len()
            )));
        }
        if fields.is_empty() {
            return Ok(self.items.iter().map(|_| Value::Array(Vec::new())).collect());
        }
        let paths = projection_paths(fields)?;
        Ok(self
            .items
            .iter()
            .map(|item| {
                let entity = item.borrow();
                let mut row: Vec<Value> = paths
                    .iter()
                    .map(|(_, path)| entity.resolve_path(path).unwrap_or(Value::Null))
                    .collect();
                if flat {
                    row.pop().unwrap_or(Value::Null)
                } else {
                    Value::Array(row)
                }
            })
            .collect())
    }
}

fn projection_paths<'a>(fields: &[&'a str]) -> Result<Vec<(&'a str, Vec<String>)>> {
    fields
        .iter()
        .map(|field| {
            let path = split_path(field).map_err(|e| Error::query_field(*field, e.to_string()))?;
            Ok((*field, path))
        })
        .collect()
}

impl<T: Entity + HasCoordinates> QueryCollection<T> {
    fn keep_where(&self, predicate: impl Fn(Coordinate) -> bool) -> Self {
        let items = self
            .items
            .iter()
            .filter(|item| item.get_coordinates().map_or(false, &predicate))
            .cloned()
            .collect();
        Self::new(items)
    }

    /// Elements within `radius_km` of `(lon, lat)`; no radius keeps everything
    pub fn near(&self, longitude: f64, latitude: f64, radius_km: Option<f64>) -> Result<Self> {
        let center = Coordinate::new(longitude, latitude)?;
        let Some(radius) = radius_km else {
            return Ok(self.all());
        };
        if radius.is_nan() || radius < 0.0 {
            return Err(Error::query_field(
                "radius",
                format!("radius must be a non-negative number, got {radius}"),
            ));
        }
        Ok(self.keep_where(|c| haversine_km(&center, &c) <= radius))
    }

    /// Elements inside the box; `west > east` wraps across the antimeridian
    pub fn within_bounds(&self, north: f64, south: f64, east: f64, west: f64) -> Result<Self> {
        let bounds =
            Bounds::new(north, south, east, west).map_err(|e| Error::query(e.to_string()))?;
        Ok(self.keep_where(|c| bounds.contains(&c)))
    }

    pub fn has_coordinates(&self) -> Self {
        self.keep_where(|_| true)
    }

    /// Elements whose coordinate passes range validation again
    pub fn valid_coordinates(&self) -> Self {
        self.keep_where(|c| {
            Coordinate::with_altitude(c.longitude(), c.latitude(), c.altitude()).is_ok()
        })
    }
}

impl<T> IntoIterator for QueryCollection<T> {
    type Item = Handle<T>;
    type IntoIter = std::vec::IntoIter<Handle<T>>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.into_iter()
    }
}

impl<'a, T> IntoIterator for &'a QueryCollection<T> {
    type Item = &'a Handle<T>;
    type IntoIter = std::slice::Iter<'a, Handle<T>>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.iter()
    }
}

impl<T> FromIterator<Handle<T>> for QueryCollection<T> {
    fn from_iter<I: IntoIterator<Item = Handle<T>>>(iter: I) -> Self {
        Self::new(iter.into_iter().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entity::handle;
    use crate::geometry::Point;
    use crate::placemark::Placemark;
    use serde_json::json;

    fn placemark(name: &str, lon: f64, lat: f64) -> Handle<Placemark> {
        let mut p = Placemark::at(lon, lat).unwrap();
        p.meta.name = Some(name.to_string());
        handle(p)
    }

    fn sample() -> QueryCollection<Placemark> {
        QueryCollection::new(vec![
            placemark("Capitol Coffee", -104.98, 39.74),
            placemark("Boulder Books", -105.27, 40.01),
            placemark("Denver Diner", -104.99, 39.75),
            handle(Placemark::named("Nowhere")),
        ])
    }

    fn names(collection: &QueryCollection<Placemark>) -> Vec<Option<String>> {
        collection.iter().map(|p| p.borrow().meta.name.clone()).collect()
    }

    #[test]
    fn test_filter_and_exclude_are_complements() {
        let all = sample();
        let coffee = all.filter([("name__icontains", "coffee")]).unwrap();
        assert_eq!(coffee.count(), 1);
        let rest = all.exclude([("name__icontains", "coffee")]).unwrap();
        assert_eq!(rest.count(), 3);
    }

    #[test]
    fn test_filter_on_nested_path() {
        let all = sample();
        let north = all.filter([("latitude__gte", 39.745)]).unwrap();
        assert_eq!(north.count(), 2);

        let nested = all
            .filter([("point__coordinates__latitude__lt", 39.745)])
            .unwrap();
        assert_eq!(names(&nested), vec![Some("Capitol Coffee".to_string())]);

        // an unresolvable path excludes the row in both directions
        let missing = all.filter([("point.coordinates.latitude__isnull", false)]).unwrap();
        assert_eq!(missing.count(), 3);
        let missing = all.exclude([("point.coordinates.latitude__isnull", false)]).unwrap();
        assert_eq!(names(&missing), vec![Some("Nowhere".to_string())]);
    }

    #[test]
    fn test_isnull() {
        let all = sample();
        assert_eq!(all.filter([("coordinates__isnull", true)]).unwrap().count(), 1);
        assert_eq!(all.filter([("address__isnull", true)]).unwrap().count(), 4);
        assert_eq!(all.filter([("not_a_field__isnull", true)]).unwrap().count(), 0);
    }

    #[test]
    fn test_unknown_lookup_fails_up_front() {
        let err = sample().filter([("name__fuzzy", "x")]).unwrap_err();
        assert!(err.is_query());
        assert!(QueryCollection::<Placemark>::empty()
            .filter([("name__fuzzy", "x")])
            .is_err());
    }

    #[test]
    fn test_get() {
        let all = sample();
        assert!(all.get([("name", "Boulder Books")]).is_ok());
        let err = all.get([("name", "Store")]).unwrap_err();
        assert_eq!(
            err.to_string(),
            "Placemark matching query (name=\"Store\") does not exist"
        );
        let err = all.get([("name__contains", "o")]).unwrap_err();
        assert!(matches!(err, Error::MultipleReturned { count: 3, .. }));
    }

    #[test]
    fn test_order_by_multi_key() {
        let rows: Vec<Handle<Placemark>> = [(1, 2), (1, 1), (2, 0)]
            .iter()
            .map(|(a, b)| {
                let mut p = Placemark::new();
                p.extended_data.insert("a".into(), json!(a));
                p.extended_data.insert("b".into(), json!(b));
                handle(p)
            })
            .collect();
        let collection = QueryCollection::new(rows.clone());

        let sorted = collection
            .order_by(&["extended_data.a", "extended_data.b"])
            .unwrap();
        let order: Vec<_> = sorted
            .iter()
            .map(|p| p.borrow().resolve("extended_data.b"))
            .collect();
        assert_eq!(order, vec![Some(json!(1)), Some(json!(2)), Some(json!(0))]);
        assert!(sorted.is_ordered());
        assert_eq!(sorted.order_by_fields(), ["extended_data.a", "extended_data.b"]);

        let desc = collection.order_by(&["-extended_data.a"]).unwrap();
        // stable: the two a=1 rows keep their relative order
        assert!(std::rc::Rc::ptr_eq(&desc.as_slice()[0], &rows[2]));
        assert!(std::rc::Rc::ptr_eq(&desc.as_slice()[1], &rows[0]));
        assert!(std::rc::Rc::ptr_eq(&desc.as_slice()[2], &rows[1]));
    }

    #[test]
    fn test_order_by_errors_and_empty() {
        let all = sample();
        let err = all.order_by(&["missing_field"]).unwrap_err();
        assert!(err.to_string().contains("missing_field"));

        let unsorted = all.order_by(&[]).unwrap();
        assert_eq!(unsorted.count(), 4);
        assert!(!unsorted.is_ordered());

        // null names sort first
        let by_lat = all.order_by(&["latitude"]).unwrap();
        assert_eq!(names(&by_lat)[0], Some("Nowhere".to_string()));
    }

    #[test]
    fn test_metadata_propagation() {
        let sorted = sample().order_by(&["name"]).unwrap();
        let filtered = sorted.filter([("visibility", true)]).unwrap();
        assert!(filtered.is_ordered());
        let distinct = filtered.distinct();
        assert!(distinct.is_ordered() && distinct.is_distinct());
        assert!(!distinct.reverse().is_ordered());
        assert!(!distinct.all().is_distinct());
    }

    #[test]
    fn test_distinct() {
        let point = handle(Point::new());
        let collection = QueryCollection::new(vec![point.clone(), point.clone()]);
        assert_eq!(collection.distinct().count(), 1);

        let a = handle(Point::new());
        let b = handle(Point::new());
        a.borrow_mut().meta.id = Some("same".into());
        b.borrow_mut().meta.id = Some("same".into());
        let collection = QueryCollection::new(vec![a, b, handle(Point::new())]);
        assert_eq!(collection.distinct().count(), 2);
    }

    #[test]
    fn test_values() {
        let all = sample();
        let rows = all.values(&["name", "latitude", "nope"]).unwrap();
        assert_eq!(rows[0]["name"], json!("Capitol Coffee"));
        assert_eq!(rows[3]["latitude"], Value::Null);
        assert_eq!(rows[0]["nope"], Value::Null);

        let dump = all.values(&[]).unwrap();
        assert_eq!(dump[0]["kind"], json!("Placemark"));
        assert!(dump[0].contains_key("extended_data"));

        let flat = all.values_list(&["name"], true).unwrap();
        assert_eq!(flat[1], json!("Boulder Books"));
        let rows = all.values_list(&["name", "visibility"], false).unwrap();
        assert_eq!(rows[1], json!(["Boulder Books", true]));
        assert!(all.values_list(&["name", "visibility"], true).unwrap_err().is_query());
        assert_eq!(all.values_list(&[], false).unwrap(), vec![json!([]); 4]);
        assert!(all.values_list(&[], true).unwrap_err().is_query());
    }

    #[test]
    fn test_near() {
        let all = sample();
        assert_eq!(all.near(-104.98, 39.74, None).unwrap().count(), 4);
        let close = all.near(-104.98, 39.74, Some(5.0)).unwrap();
        assert_eq!(close.count(), 2);
        assert!(all.near(-104.98, 39.74, Some(-1.0)).unwrap_err().is_query());
        assert!(all.near(-104.98, 39.74, Some(f64::NAN)).unwrap_err().is_query());
        assert!(all.near(-104.98, 99.0, None).unwrap_err().is_validation());
    }

    #[test]
    fn test_within_bounds_and_coordinate_filters() {
        let all = sample();
        let denver = all.within_bounds(39.8, 39.7, -104.9, -105.0).unwrap();
        assert_eq!(denver.count(), 2);
        assert!(all.within_bounds(0.0, 10.0, 0.0, 0.0).unwrap_err().is_query());
        assert!(all.within_bounds(10.0, 0.0, 0.0, 190.0).is_err());

        assert_eq!(all.has_coordinates().count(), 3);
        assert_eq!(all.valid_coordinates().count(), 3);
    }

    #[test]
    fn test_slice_and_iteration() {
        let all = sample();
        assert_eq!(all.slice(1, 2).count(), 2);
        assert_eq!(all.slice(3, 10).count(), 1);
        assert!(all.get_index(4).is_none());
        let collected: QueryCollection<Placemark> = all.clone().into_iter().collect();
        assert_eq!(collected.len(), 4);
    }
}
