//! Session lifecycle for uploaded images.
//!
//! A [`SessionStore`] owns every live session and the image file behind it.
//! Sessions expire after a fixed inactivity window, discovered lazily on
//! access and proactively by [`SessionStore::sweep`].

pub mod clock;
pub mod config;
pub mod store;
pub mod uploads;

pub use clock::{Clock, ManualClock, SystemClock};
pub use config::SessionConfig;
pub use store::SessionStore;
pub use uploads::{ManagedFile, UploadDir};
