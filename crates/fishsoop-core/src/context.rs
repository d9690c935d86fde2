// crates/fishsoop-core/src/context.rs

use std::sync::Arc;

use fishsoop_bucket::{BucketStore, StagedBucketStore};

use crate::config::FishsoopConfig;
use crate::mailer::MailTransport;
use crate::render::{ReportRenderer, SvgReportRenderer};

/// Everything one job invocation needs, built once by the caller and passed down.
#[derive(Clone)]
pub struct JobContext {
    pub config: FishsoopConfig,
    pub store: Arc<dyn BucketStore>,
    pub transport: Arc<dyn MailTransport>,
    pub renderer: Arc<dyn ReportRenderer>,
    /// Compose everything but send nothing and leave the buckets untouched.
    pub dry_run: bool,
}

impl JobContext {
    pub fn new(
        config: FishsoopConfig,
        store: Arc<dyn BucketStore>,
        transport: Arc<dyn MailTransport>,
    ) -> Self {
        Self {
            config,
            store,
            transport,
            renderer: Arc::new(SvgReportRenderer::default()),
            dry_run: false,
        }
    }

    pub fn with_renderer(mut self, renderer: Arc<dyn ReportRenderer>) -> Self {
        self.renderer = renderer;
        self
    }

    /// Uploads are staged in memory and no email or ledger row is written.
    pub fn with_dry_run(mut self) -> Self {
        if !self.dry_run {
            self.store = Arc::new(StagedBucketStore::new(self.store));
            self.dry_run = true;
        }
        self
    }
}
