pub mod memory;
#[cfg(feature = "mongodb")]
pub mod mongo;

pub use memory::InMemoryPersistenceClient;
#[cfg(feature = "mongodb")]
pub use mongo::MongoPersistenceClient;
