//! Entity directory.
//!
//! An [`EntityRegistry`] maps string identifiers to arbitrary domain objects
//! (queues, servers, counters...) so that event handlers can look them up
//! through their [`Context`](crate::simulation::Context). The registry is a
//! directory, not a factory: entities are only ever added and removed by
//! domain code.
//!
//! Entities are kept in registration order so that iterating over the
//! directory is deterministic.

use std::any::{self, Any};
use std::error::Error;
use std::fmt;

use indexmap::IndexMap;

/// A directory of named domain entities.
#[derive(Default)]
pub struct EntityRegistry {
    entities: IndexMap<String, Box<dyn Any + Send>>,
}

impl EntityRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers an entity under the specified identifier.
    ///
    /// An error is returned if the identifier is already in use.
    pub fn add<T: Any + Send>(
        &mut self,
        name: impl Into<String>,
        entity: T,
    ) -> Result<(), EntityError> {
        let name = name.into();
        if self.entities.contains_key(&name) {
            return Err(EntityError::AlreadyRegistered(name));
        }
        self.entities.insert(name, Box::new(entity));

        Ok(())
    }

    /// Unregisters the entity with the specified identifier and returns it.
    pub fn remove(&mut self, name: &str) -> Result<Box<dyn Any + Send>, EntityError> {
        self.entities
            .shift_remove(name)
            .ok_or_else(|| EntityError::NotFound(name.to_owned()))
    }

    /// Returns a reference to the entity with the specified identifier.
    ///
    /// An error is returned if no entity is registered under this identifier
    /// or if it is not of type `T`.
    pub fn get<T: Any>(&self, name: &str) -> Result<&T, EntityError> {
        let entity = self
            .entities
            .get(name)
            .ok_or_else(|| EntityError::NotFound(name.to_owned()))?;

        entity
            .downcast_ref::<T>()
            .ok_or_else(|| EntityError::type_mismatch::<T>(name))
    }

    /// Returns a mutable reference to the entity with the specified
    /// identifier.
    ///
    /// An error is returned if no entity is registered under this identifier
    /// or if it is not of type `T`.
    pub fn get_mut<T: Any>(&mut self, name: &str) -> Result<&mut T, EntityError> {
        let entity = self
            .entities
            .get_mut(name)
            .ok_or_else(|| EntityError::NotFound(name.to_owned()))?;

        entity
            .downcast_mut::<T>()
            .ok_or_else(|| EntityError::type_mismatch::<T>(name))
    }

    /// Returns `true` if an entity is registered under this identifier.
    pub fn contains(&self, name: &str) -> bool {
        self.entities.contains_key(name)
    }

    /// Returns the number of registered entities.
    pub fn len(&self) -> usize {
        self.entities.len()
    }

    /// Returns `true` if no entity is registered.
    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }

    /// Returns an iterator over the identifiers in registration order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entities.keys().map(String::as_str)
    }
}

impl fmt::Debug for EntityRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.entities.keys()).finish()
    }
}

/// Error returned by the entity directory.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum EntityError {
    /// No entity is registered under this identifier.
    NotFound(String),
    /// An entity is already registered under this identifier.
    AlreadyRegistered(String),
    /// The entity registered under this identifier has another type.
    TypeMismatch {
        /// The entity identifier.
        name: String,
        /// The name of the requested type.
        expected: &'static str,
    },
}

impl EntityError {
    fn type_mismatch<T: Any>(name: &str) -> Self {
        Self::TypeMismatch {
            name: name.to_owned(),
            expected: any::type_name::<T>(),
        }
    }
}

impl fmt::Display for EntityError {
    fn fmt(&self, fmt: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotFound(name) => write!(fmt, "no entity is registered as '{}'", name),
            Self::AlreadyRegistered(name) => {
                write!(fmt, "an entity is already registered as '{}'", name)
            }
            Self::TypeMismatch { name, expected } => write!(
                fmt,
                "the entity registered as '{}' is not of type `{}`",
                name, expected
            ),
        }
    }
}

impl Error for EntityError {}
