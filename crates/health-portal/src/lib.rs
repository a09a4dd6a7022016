//! Health Portal - Patient Client Core
//!
//! Renderer-agnostic client state for the multi-role health portal
//! (doctor, patient, lab, pharmacy). The core keeps a local mirror of a
//! patient's profile, derives BMI from height and weight, reconciles local
//! edits with the remote API, gates views by role and caches the last good
//! snapshot for reloads.
//!
//! # Components
//!
//! - [`session`] - explicit session context: role marker and cached profile
//! - [`guard`] - role check run once per protected view mount
//! - [`profile`] - profile model, wire decoding, single-field edits
//! - [`store`] - load / edit / save with change notifications
//! - [`registration`] - registration form and submission
//! - [`api`] - remote API trait and its `reqwest` client
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use health_portal::{
//!     FileStore, HttpPortalApi, PortalConfig, ProfileField, ProfileStore, ProfileView,
//!     SessionContext,
//! };
//!
//! # async fn run() -> health_portal::Result<()> {
//! let config = PortalConfig::load()?;
//! let session = SessionContext::mount(Arc::new(FileStore::new(&config.cache_dir)));
//! let api = Arc::new(HttpPortalApi::new(&config)?);
//!
//! let store = ProfileStore::new(api, session, ProfileView::Settings);
//! if store.mount().await.is_allowed() {
//!     store.edit(ProfileField::Height, "172")?;
//!     store.save().await?;
//! }
//! # Ok(())
//! # }
//! ```

pub mod api;
pub mod config;
pub mod error;
pub mod guard;
mod in_flight;
pub mod profile;
pub mod registration;
pub mod role;
pub mod session;
pub mod store;

// Re-export commonly used types for convenience
pub use crate::api::{HttpPortalApi, PortalApi, ProfileView, RegisterRequest};
pub use crate::config::PortalConfig;
pub use crate::error::{PortalError, Result};
pub use crate::guard::{AccessGuard, GuardOutcome};
pub use crate::profile::{
    apply_edit, AllergyItem, AllergySeverity, EditError, PatientProfile, ProfileField,
};
pub use crate::registration::{
    RegistrationField, RegistrationFlow, RegistrationForm, RegistrationOutcome,
};
pub use crate::role::{account_catalog, AccountType, Role};
pub use crate::session::{DurableStore, FileStore, MemoryStore, SessionContext};
pub use crate::store::{Notice, NoticeLevel, ProfileStore, SaveOutcome, StoreEvent};
