pub mod config;
pub mod deploy;
pub mod editor;
pub mod error;
pub mod filter;
pub mod reload;
pub mod remote;
pub mod select;
pub mod store;

#[cfg(test)]
mod testing;

pub use config::SyncConfig;
pub use deploy::{DeployOutcome, DeployReport, deploy_page};
pub use error::{Result, SyncError};
pub use filter::{EXCLUDED_FIELDS, PageRecord, strip};
pub use reload::{ReloadReport, reload_pages};
pub use remote::{PageApi, PageClient};
pub use store::{IndexEntry, PageIndex, PageStore};
