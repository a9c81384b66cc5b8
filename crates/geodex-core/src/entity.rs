//! Entity identity, ownership and the field registry

use geodex_geodesy::{coerce_coordinate, Coordinate};
use serde_json::{Map, Value};
use std::cell::RefCell;
use std::rc::{Rc, Weak};

use crate::container::Container;
use crate::criteria::Criteria;
use crate::error::{Error, Result};

/// Shared, mutable reference to an entity in the tree
pub type Handle<T> = Rc<RefCell<T>>;

/// Wrap a value in a fresh handle
pub fn handle<T>(value: T) -> Handle<T> {
    Rc::new(RefCell::new(value))
}

/// Field names every entity answers to, whatever its kind
pub const COMMON_FIELDS: &[&str] = &["kind", "id", "name", "description", "visibility", "parent"];

/// Identity, display data and the owning container of an entity
#[derive(Debug, Clone)]
pub struct EntityMeta {
    pub id: Option<String>,
    pub name: Option<String>,
    pub description: Option<String>,
    pub visibility: bool,
    parent: Weak<RefCell<Container>>,
}

impl Default for EntityMeta {
    fn default() -> Self {
        Self {
            id: None,
            name: None,
            description: None,
            visibility: true,
            parent: Weak::new(),
        }
    }
}

impl EntityMeta {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// The owning container, if it is still alive
    pub fn parent(&self) -> Option<Handle<Container>> {
        self.parent.upgrade()
    }

    pub fn has_parent(&self) -> bool {
        self.parent.strong_count() > 0
    }

    pub(crate) fn set_parent(&mut self, parent: Weak<RefCell<Container>>) {
        self.parent = parent;
    }

    pub(crate) fn clear_parent(&mut self) {
        self.parent = Weak::new();
    }

    /// Whether the back-reference points at `container`
    pub fn is_child_of(&self, container: &Weak<RefCell<Container>>) -> bool {
        self.parent.ptr_eq(container) && self.has_parent()
    }

    fn resolve(&self, name: &str, kind: &'static str) -> Option<Value> {
        let value = match name {
            "kind" => Value::String(kind.to_string()),
            "id" => opt_str(&self.id),
            "name" => opt_str(&self.name),
            "description" => opt_str(&self.description),
            "visibility" => Value::Bool(self.visibility),
            "parent" => match self.parent() {
                Some(parent) => parent
                    .try_borrow()
                    .map_or(Value::Null, |c| summary(c.meta())),
                None => Value::Null,
            },
            _ => return None,
        };
        Some(value)
    }

    fn assign(&mut self, name: &str, value: Value) -> Option<Result<()>> {
        let outcome = match name {
            "id" => string_value(name, value).map(|v| self.id = v),
            "name" => string_value(name, value).map(|v| self.name = v),
            "description" => string_value(name, value).map(|v| self.description = v),
            "visibility" => bool_value(name, value).map(|v| self.visibility = v),
            "parent" => Err(Error::validation(
                name,
                "the parent is set by adding the entity to a container",
            )),
            "kind" => Err(Error::validation(name, "field is read-only")),
            _ => return None,
        };
        Some(outcome)
    }
}

fn summary(meta: &EntityMeta) -> Value {
    let mut map = Map::new();
    map.insert("id".into(), opt_str(&meta.id));
    map.insert("name".into(), opt_str(&meta.name));
    Value::Object(map)
}

/// Getter over a concrete entity type
pub type Getter<T> = fn(&T) -> Value;

/// Setter over a concrete entity type; rejects values it cannot take
pub type Setter<T> = fn(&mut T, Value) -> Result<()>;

/// One named field in a type's registry
pub struct Field<T> {
    pub name: &'static str,
    pub get: Getter<T>,
    pub set: Option<Setter<T>>,
}

impl<T> Field<T> {
    pub const fn read_only(name: &'static str, get: Getter<T>) -> Self {
        Self {
            name,
            get,
            set: None,
        }
    }

    pub const fn writable(name: &'static str, get: Getter<T>, set: Setter<T>) -> Self {
        Self {
            name,
            get,
            set: Some(set),
        }
    }

    pub fn is_writable(&self) -> bool {
        self.set.is_some()
    }
}

/// A node of the document tree.
///
/// Field access goes through a static registry of accessor functions per
/// type, so dotted paths such as `point.coordinates.latitude` resolve by
/// repeated lookups. `None` from a resolver always means "no such field".
pub trait Entity: Sized + 'static {
    /// Type name used in error messages and field dumps
    const KIND: &'static str;

    fn meta(&self) -> &EntityMeta;

    fn meta_mut(&mut self) -> &mut EntityMeta;

    /// Kind-specific fields; the common fields are handled separately
    fn fields() -> &'static [Field<Self>];

    /// Structural checks run after `update` and on manager creation
    fn validate(&self) -> Result<()> {
        Ok(())
    }

    fn field(name: &str) -> Option<&'static Field<Self>> {
        Self::fields().iter().find(|f| f.name == name)
    }

    /// Every field name this kind answers to
    fn field_names() -> Vec<&'static str> {
        COMMON_FIELDS
            .iter()
            .copied()
            .chain(Self::fields().iter().map(|f| f.name))
            .collect()
    }

    fn resolve_field(&self, name: &str) -> Option<Value> {
        match Self::field(name) {
            Some(field) => Some((field.get)(self)),
            None => self.meta().resolve(name, Self::KIND),
        }
    }

    /// Resolve a split path, stepping into objects by key and arrays by index
    fn resolve_path<S: AsRef<str>>(&self, path: &[S]) -> Option<Value> {
        let (first, rest) = path.split_first()?;
        let mut current = self.resolve_field(first.as_ref())?;
        for segment in rest {
            current = step(current, segment.as_ref())?;
        }
        Some(current)
    }

    /// Resolve a dotted path
    fn resolve(&self, path: &str) -> Option<Value> {
        let segments: Vec<&str> = path.split('.').collect();
        self.resolve_path(&segments)
    }

    fn set_field(&mut self, name: &str, value: Value) -> Result<()> {
        if let Some(field) = Self::field(name) {
            return match field.set {
                Some(set) => set(self, value),
                None => Err(Error::validation(name, "field is read-only")),
            };
        }
        match self.meta_mut().assign(name, value) {
            Some(outcome) => outcome,
            None => Err(Error::validation(
                name,
                format!("{} has no field '{}'", Self::KIND, name),
            )),
        }
    }

    /// Assign several fields, then validate the result
    fn update(&mut self, fields: &Criteria) -> Result<()> {
        for (name, value) in fields.iter() {
            self.set_field(name, value.clone())?;
        }
        self.validate()
    }

    /// Full per-entity dump: common fields, then the registry in order
    fn to_field_map(&self) -> Map<String, Value> {
        let mut map = Map::new();
        for name in COMMON_FIELDS {
            if let Some(value) = self.meta().resolve(name, Self::KIND) {
                map.insert((*name).to_string(), value);
            }
        }
        for field in Self::fields() {
            map.insert(field.name.to_string(), (field.get)(self));
        }
        map
    }

    /// A copy with no owning container
    fn copy(&self) -> Self
    where
        Self: Clone,
    {
        let mut copy = self.clone();
        copy.meta_mut().clear_parent();
        copy
    }
}

fn step(current: Value, segment: &str) -> Option<Value> {
    match current {
        Value::Object(mut map) => map.remove(segment),
        Value::Array(mut items) => {
            let index: usize = segment.parse().ok()?;
            (index < items.len()).then(|| items.swap_remove(index))
        }
        _ => None,
    }
}

/// Key used by `distinct`: the declared id, else the handle's address
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum DedupKey {
    Id(String),
    Identity(usize),
}

pub fn identity<T>(handle: &Handle<T>) -> usize {
    Rc::as_ptr(handle) as *const () as usize
}

pub fn dedup_key<T: Entity>(handle: &Handle<T>) -> DedupKey {
    let declared = handle
        .try_borrow()
        .ok()
        .and_then(|entity| entity.meta().id.clone())
        .filter(|id| !id.is_empty());
    match declared {
        Some(id) => DedupKey::Id(id),
        None => DedupKey::Identity(identity(handle)),
    }
}

/// Representative position from the `coordinates` field.
///
/// A single position is coerced directly; a vertex list yields its first
/// vertex. Failures are logged and give `None`.
pub fn probe_coordinates<T: Entity>(entity: &T) -> Option<Coordinate> {
    let value = match entity.resolve_field("coordinates")? {
        Value::Array(items) if items.is_empty() => return None,
        Value::Array(mut items) if items[0].is_array() || items[0].is_object() => {
            items.swap_remove(0)
        }
        other => other,
    };
    let context = match &entity.meta().id {
        Some(id) => format!("{} '{}'", T::KIND, id),
        None => T::KIND.to_string(),
    };
    coerce_coordinate(&value, &context)
}

pub(crate) fn opt_str(value: &Option<String>) -> Value {
    match value {
        Some(s) => Value::String(s.clone()),
        None => Value::Null,
    }
}

pub(crate) fn opt_f64(value: Option<f64>) -> Value {
    value.map_or(Value::Null, Value::from)
}

pub(crate) fn string_value(field: &str, value: Value) -> Result<Option<String>> {
    match value {
        Value::Null => Ok(None),
        Value::String(s) => Ok(Some(s)),
        other => Err(Error::validation(
            field,
            format!("expected a string or null, got {other}"),
        )),
    }
}

pub(crate) fn bool_value(field: &str, value: Value) -> Result<bool> {
    match value {
        Value::Bool(b) => Ok(b),
        other => Err(Error::validation(
            field,
            format!("expected true or false, got {other}"),
        )),
    }
}

/// Strict coordinate conversion for setters
pub(crate) fn coordinate_value(field: &str, value: &Value) -> Result<Coordinate> {
    Coordinate::try_from(value).map_err(|e| Error::validation(field, e.to_string()))
}

/// A list of coordinates for setters; every vertex must be valid
pub(crate) fn coordinate_list(field: &str, value: Value) -> Result<Vec<Coordinate>> {
    match value {
        Value::Null => Ok(Vec::new()),
        Value::Array(items) => items.iter().map(|v| coordinate_value(field, v)).collect(),
        other => Err(Error::validation(
            field,
            format!("expected a list of coordinates, got {other}"),
        )),
    }
}

pub(crate) fn coordinate_list_value(coords: &[Coordinate]) -> Value {
    Value::Array(
        coords
            .iter()
            .map(|c| Value::from(vec![c.longitude(), c.latitude(), c.altitude()]))
            .collect(),
    )
}
