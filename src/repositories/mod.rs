//! Persistence collaborators.
//!
//! Storage of models and destinations is external to the engine; this module holds
//! the narrow interfaces the engine needs plus an in-memory implementation.

mod datastore;
mod error;

pub use datastore::{
	increment_field, Datastore, DestinationStore, InMemoryDatastore, Model, ReadPreference,
};
pub use error::RepositoryError;
