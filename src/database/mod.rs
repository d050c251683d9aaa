pub mod connection;
pub mod dynamic;
pub mod error;
pub mod executor;
pub mod pool;
pub mod row;

pub use connection::{Connection, ConnectionSource, PoolHealth, PoolStats, RowSet};
pub use dynamic::DynamicRepository;
pub use error::{DatabaseError, StoreError, StoreErrorKind};
pub use executor::{ResilientExecutor, RetryPolicy};
pub use pool::{PgLease, PoolConfig, PoolGateway};
