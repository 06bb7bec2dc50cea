//! Relaystack State Management
//!
//! Persists what has been handed to the provisioning engine so that each
//! subsequent deploy reconciles against it. Supports local-file state for
//! single-operator use and S3 state for shared operation, both with locking.
//!
//! # Overview
//!
//! - **StateFile**: recorded resources and grants, with serial and lineage
//! - **StateBackend**: trait for state storage backends (local, S3)
//! - **LockInfo**: lock records for concurrent access control
//!
//! # Example
//!
//! ```ignore
//! use relaystack_state::{BackendConfig, create_backend};
//!
//! let config = BackendConfig {
//!     backend_type: "s3".to_string(),
//!     attributes: [
//!         ("bucket".to_string(), "my-state-bucket".to_string()),
//!         ("key".to_string(), "deployments/prod/relaystack.state.json".to_string()),
//!         ("region".to_string(), "us-east-1".to_string()),
//!     ].into_iter().collect(),
//! };
//!
//! let backend = create_backend(&config).await?;
//!
//! let lock = backend.acquire_lock("apply").await?;
//! let state = backend.read_state().await?;
//! // ... reconcile and record ...
//! backend.write_state(&state).await?;
//! backend.release_lock(&lock).await?;
//! ```

pub mod backend;
pub mod backends;
pub mod lock;
pub mod state;

// Re-export main types for convenience
pub use backend::{BackendConfig, BackendError, BackendResult, StateBackend};
pub use backends::{LocalBackend, S3Backend, create_backend};
pub use lock::LockInfo;
pub use state::{GrantState, ResourceState, StateFile};
