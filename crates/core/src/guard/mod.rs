//! Persistence of guard data, the device-trust blob the remote issues during
//! authentication and accepts on later logins to skip extra verification.

mod fs_store;
mod store;

pub use fs_store::{FsGuardStore, GUARD_FILE_EXTENSION};
pub use store::{validate_username, GuardStore, GuardStoreError};
