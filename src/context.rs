use crate::browser::BrowserSession;
use crate::document::{LayoutMetrics, ListDocument};
use crate::group_state::GroupStateStore;
use crate::options::{EngineTuning, Environment, Options};
use crate::store::KeyValueStore;

/// Everything the renderers need for one operation, borrowed from the board.
pub(crate) struct RenderCtx<'a> {
    pub doc: &'a mut ListDocument,
    pub browser: &'a mut dyn BrowserSession,
    pub session_store: &'a mut dyn KeyValueStore,
    pub group_state: &'a mut GroupStateStore,
    pub options: &'a Options,
    pub env: &'a Environment,
    pub tuning: &'a EngineTuning,

    /// Seconds since the unix epoch.
    pub now: f64,
}

impl RenderCtx<'_> {
    pub fn metrics(&self) -> LayoutMetrics {
        metrics_for(self.tuning)
    }

    pub fn now_ms(&self) -> f64 {
        self.now * 1000.0
    }
}

pub(crate) fn metrics_for(tuning: &EngineTuning) -> LayoutMetrics {
    LayoutMetrics {
        width: tuning.list_width,
        line_height: tuning.line_height,
        compact_line_height: tuning.compact_line_height,
        header_height: tuning.group_header_height,
        placeholder_height: tuning.line_height * 0.5,
    }
}
