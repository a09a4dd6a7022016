//! Patient profile store
//!
//! [`ProfileStore`] exclusively owns the in-memory [`PatientProfile`] of one
//! view. It loads the profile from the remote API, applies single-field
//! edits, pushes the full snapshot back on save and mirrors every good
//! snapshot into the session's durable cache.
//!
//! Renderers do not poll: they [`subscribe`](ProfileStore::subscribe) and
//! redraw on each [`StoreEvent`].

use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use base64::{engine::general_purpose::STANDARD, Engine as _};
use tokio::sync::broadcast;
use tracing::{debug, info, instrument, warn};

use crate::api::{PortalApi, ProfileView};
use crate::error::Result;
use crate::guard::{AccessGuard, GuardOutcome};
use crate::in_flight::InFlight;
use crate::profile::{apply_edit, PatientProfile, ProfileField};
use crate::role::Role;
use crate::session::SessionContext;

/// Buffered notifications per subscriber before the slowest one lags
const EVENT_CAPACITY: usize = 64;

pub const LOAD_FAILED_MESSAGE: &str = "Error loading profile data";
pub const SAVE_SUCCESS_MESSAGE: &str = "Profile updated successfully";

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum NoticeLevel {
    Success,
    Error,
}

/// A transient user-facing message (a toast, a status line)
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Notice {
    pub level: NoticeLevel,
    pub message: String,
}

impl Notice {
    pub fn success(message: impl Into<String>) -> Self {
        Notice {
            level: NoticeLevel::Success,
            message: message.into(),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Notice {
            level: NoticeLevel::Error,
            message: message.into(),
        }
    }
}

/// State change notification
#[derive(Clone, Debug, PartialEq)]
pub enum StoreEvent {
    /// Seeded from the durable cache while the remote load is pending
    Restored(PatientProfile),
    Loaded(PatientProfile),
    LoadFailed(Notice),
    Edited {
        field: ProfileField,
        profile: PatientProfile,
    },
    Saving,
    Saved(Notice),
    SaveFailed(Notice),
}

/// What happened to a save request
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SaveOutcome {
    Saved,
    /// Another save was already in flight; nothing was sent
    Ignored,
}

#[derive(Debug, Default)]
struct StoreState {
    profile: PatientProfile,
    load_failed: bool,
}

pub struct ProfileStore {
    api: Arc<dyn PortalApi>,
    session: Arc<SessionContext>,
    guard: AccessGuard,
    view: ProfileView,
    state: Mutex<StoreState>,
    saving: AtomicBool,
    events: broadcast::Sender<StoreEvent>,
}

impl std::fmt::Debug for ProfileStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProfileStore")
            .field("view", &self.view)
            .field("saving", &self.is_saving())
            .finish_non_exhaustive()
    }
}

impl ProfileStore {
    pub fn new(api: Arc<dyn PortalApi>, session: Arc<SessionContext>, view: ProfileView) -> Self {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        ProfileStore {
            api,
            guard: AccessGuard::new(session.clone(), Role::Patient),
            session,
            view,
            state: Mutex::new(StoreState::default()),
            saving: AtomicBool::new(false),
            events,
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<StoreEvent> {
        self.events.subscribe()
    }

    pub fn view(&self) -> ProfileView {
        self.view
    }

    /// Current profile snapshot
    pub fn snapshot(&self) -> PatientProfile {
        self.state().profile.clone()
    }

    /// Whether the last load attempt failed
    pub fn load_failed(&self) -> bool {
        self.state().load_failed
    }

    pub fn is_saving(&self) -> bool {
        self.saving.load(Ordering::Acquire)
    }

    fn state(&self) -> MutexGuard<'_, StoreState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn emit(&self, event: StoreEvent) {
        // no subscribers is fine
        let _ = self.events.send(event);
    }

    /// Enter the view: check the role marker, restore the cached snapshot,
    /// then load from the API.
    ///
    /// On a role mismatch nothing is read or fetched.
    pub async fn mount(&self) -> GuardOutcome {
        let outcome = self.guard.check();
        if !outcome.is_allowed() {
            return outcome;
        }

        if let Some(cached) = self.session.cached_profile() {
            debug!("restored cached profile");
            self.state().profile = cached.clone();
            self.emit(StoreEvent::Restored(cached));
        }

        // failures are reported through LoadFailed
        let _ = self.load().await;
        outcome
    }

    /// Clear the session; returns the patient login route
    pub fn logout(&self) -> String {
        self.guard.logout()
    }

    /// Fetch the profile for this view, replacing the in-memory snapshot.
    ///
    /// On failure the previous snapshot stays in place.
    #[instrument(skip(self), fields(view = ?self.view))]
    pub async fn load(&self) -> Result<PatientProfile> {
        match self.api.fetch_profile(self.view).await {
            Ok(profile) => {
                {
                    let mut state = self.state();
                    state.profile = profile.clone();
                    state.load_failed = false;
                }
                if let Err(e) = self.session.cache_profile(&profile) {
                    warn!(error = %e, "could not cache loaded profile");
                }
                debug!("profile loaded");
                self.emit(StoreEvent::Loaded(profile.clone()));
                Ok(profile)
            }
            Err(e) => {
                warn!(error = %e, "profile load failed");
                self.state().load_failed = true;
                self.emit(StoreEvent::LoadFailed(Notice::error(LOAD_FAILED_MESSAGE)));
                Err(e)
            }
        }
    }

    /// Apply one field change to the in-memory profile.
    pub fn edit(&self, field: ProfileField, value: &str) -> Result<PatientProfile> {
        let next = {
            let mut state = self.state();
            let next = apply_edit(&state.profile, field, value)?;
            state.profile = next.clone();
            next
        };

        self.emit(StoreEvent::Edited {
            field,
            profile: next.clone(),
        });
        Ok(next)
    }

    /// [`edit`](Self::edit) with the field given by its wire name
    pub fn edit_named(&self, field: &str, value: &str) -> Result<PatientProfile> {
        self.edit(field.parse()?, value)
    }

    /// Read an image file and set it as the profile picture.
    ///
    /// The picture is stored inline as a `data:` URL and goes out with the
    /// next save like any other field.
    pub async fn set_profile_picture(&self, path: impl AsRef<Path>) -> Result<PatientProfile> {
        let path = path.as_ref();
        let bytes = tokio::fs::read(path).await?;
        debug!(path = %path.display(), bytes = bytes.len(), "read profile picture");
        self.set_profile_picture_bytes(&bytes, mime_for_path(path))
    }

    pub fn set_profile_picture_bytes(&self, bytes: &[u8], mime: &str) -> Result<PatientProfile> {
        self.edit(ProfileField::ProfilePicture, &encode_data_url(bytes, mime))
    }

    /// Push the full snapshot to the API.
    ///
    /// Only one save runs at a time; a call made while another is pending
    /// returns [`SaveOutcome::Ignored`]. A failed save leaves both the
    /// in-memory profile and the durable cache as they were.
    #[instrument(skip(self))]
    pub async fn save(&self) -> Result<SaveOutcome> {
        let Some(_in_flight) = InFlight::acquire(&self.saving) else {
            debug!("save already in flight, ignoring");
            return Ok(SaveOutcome::Ignored);
        };

        let snapshot = self.snapshot();
        self.emit(StoreEvent::Saving);

        match self.api.update_settings(&snapshot).await {
            Ok(()) => {
                if let Err(e) = self.session.cache_profile(&snapshot) {
                    warn!(error = %e, "could not cache saved profile");
                }
                info!("profile saved");
                self.emit(StoreEvent::Saved(Notice::success(SAVE_SUCCESS_MESSAGE)));
                Ok(SaveOutcome::Saved)
            }
            Err(e) => {
                warn!(error = %e, "profile save failed");
                self.emit(StoreEvent::SaveFailed(Notice::error(e.user_message())));
                Err(e)
            }
        }
    }
}

/// Encode bytes as a self-contained `data:` URL
pub fn encode_data_url(bytes: &[u8], mime: &str) -> String {
    format!("data:{};base64,{}", mime, STANDARD.encode(bytes))
}

/// Guess an image MIME type from a file extension
pub fn mime_for_path(path: &Path) -> &'static str {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase());

    match ext.as_deref() {
        Some("png") => "image/png",
        Some("jpg") | Some("jpeg") => "image/jpeg",
        Some("gif") => "image/gif",
        Some("webp") => "image/webp",
        _ => "application/octet-stream",
    }
}
