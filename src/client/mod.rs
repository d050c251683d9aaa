//! Client-side fluent query builder and the transports it sends through.
//!
//! ```no_run
//! # async fn demo() -> Result<(), carelink_api::client::ClientError> {
//! use carelink_api::client::{Client, HttpTransport};
//!
//! let client = Client::new(HttpTransport::new("http://localhost:3000")?.with_token(Some("token".into())));
//! let upcoming = client
//!     .from("therapy_sessions")
//!     .eq("status", "scheduled")
//!     .order("scheduled_at", true)
//!     .limit(10)
//!     .execute()
//!     .await?;
//! # let _ = upcoming;
//! # Ok(())
//! # }
//! ```

pub mod builder;
pub mod error;
pub mod transport;

pub use builder::{Client, IntoFilterList, IntoFilterValue, QueryBuilder};
pub use error::ClientError;
pub use transport::{decode_envelope, HttpTransport, Transport, WireCall};
