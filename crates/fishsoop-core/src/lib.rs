pub mod artifact;
pub mod config;
pub mod context;
pub mod daily_summary;
pub mod dispatch;
pub mod error;
pub mod event;
pub mod extractor;
pub mod fleet;
pub mod ledger;
pub mod mailer;
pub mod message;
pub mod notifier;
pub mod recipients;
pub mod record;
pub mod render;
pub mod stats;
pub mod status_page;
pub mod templates;

pub use config::FishsoopConfig;
pub use context::JobContext;
pub use error::{JobError, NotifyError, Result};
