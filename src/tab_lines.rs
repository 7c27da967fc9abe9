//! Tab line renderer: builds and refreshes the projection of single tabs and of the full list.

use ahash::HashSet;
use itertools::Itertools as _;

use crate::context::RenderCtx;
use crate::document::{NodeId, TabLine};
use crate::groups::GroupManager;
use crate::model::{TabChange, TabId, TabRecord, TabStatus};
use crate::options::Environment;

/// Shown when a page URL can't be resolved to a favicon.
pub const DEFAULT_FAVICON: &str = "icons/default-favicon.svg";

/// Is `tab` an instance of the board's own page?
pub fn is_self_tab(tab: &TabRecord, env: &Environment) -> bool {
    !env.self_url.is_empty() && tab.url.starts_with(&env.self_url)
}

/// Favicon endpoint URL for a page. Malformed page URLs get [`DEFAULT_FAVICON`].
pub fn favicon_url(env: &Environment, page_url: &str) -> String {
    match url::Url::parse(page_url) {
        Ok(parsed) => {
            let encoded: String =
                url::form_urlencoded::byte_serialize(parsed.as_str().as_bytes()).collect();
            format!("{}{encoded}", env.favicon_endpoint)
        }
        Err(err) => {
            log::debug!("no favicon for {page_url:?}: {err}");
            DEFAULT_FAVICON.to_owned()
        }
    }
}

fn cache_busted(favicon: &str, generation: u64) -> String {
    if favicon == DEFAULT_FAVICON {
        return favicon.to_owned();
    }
    let separator = if favicon.contains('?') { '&' } else { '?' };
    format!("{favicon}{separator}cacheBust={generation}")
}

/// "just now", "5 min ago", "3 h ago", "2 days ago".
pub fn describe_last_accessed(now_ms: f64, last_accessed_ms: f64) -> String {
    if last_accessed_ms <= 0.0 {
        return String::new();
    }
    let minutes = ((now_ms - last_accessed_ms) / 60_000.0).max(0.0).floor() as u64;
    match minutes {
        0 => "just now".to_owned(),
        1..=59 => format!("{minutes} min ago"),
        60..=1439 => format!("{} h ago", minutes / 60),
        _ => match minutes / 1440 {
            1 => "1 day ago".to_owned(),
            days => format!("{days} days ago"),
        },
    }
}

#[derive(Debug, Default)]
pub struct TabManager {
    visible_count: usize,
    most_recent: Option<(TabId, f64)>,
    discard_requested: HashSet<TabId>,
    favicon_generation: u64,
}

impl TabManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of lines created and not hidden since the last full render.
    pub fn visible_count(&self) -> usize {
        self.visible_count
    }

    /// Most recently accessed tab that is not the board's own page.
    pub fn most_recent(&self) -> Option<TabId> {
        self.most_recent.map(|(tab, _)| tab)
    }

    pub(crate) fn line_removed(&mut self, tab: TabId, was_hidden: bool) {
        if !was_hidden {
            self.visible_count = self.visible_count.saturating_sub(1);
        }
        if self.most_recent().is_some_and(|t| t == tab) {
            self.most_recent = None;
        }
        self.discard_requested.remove(&tab);
    }

    /// Build a detached line for `tab`.
    pub(crate) fn create_line(&mut self, ctx: &mut RenderCtx<'_>, tab: &TabRecord) -> NodeId {
        let is_self = is_self_tab(tab, ctx.env);
        let node = ctx.doc.create_line(TabLine {
            tab_id: Some(tab.id),
            index: tab.index,
            is_self,
            ..Default::default()
        });

        let hidden = self.apply_display_options(ctx, node);
        if !hidden {
            self.visible_count += 1;
        }

        if let Some(threshold) = ctx.options.auto_discard_threshold_ms() {
            let idle = ctx.now_ms() - tab.last_accessed;
            if !is_self
                && !tab.active
                && !tab.discarded
                && tab.last_accessed > 0.0
                && idle > threshold
                && self.discard_requested.insert(tab.id)
            {
                log::debug!("auto-discarding {} (idle {:.0} s)", tab.id, idle / 1000.0);
                if let Err(err) = ctx.browser.discard_tab(tab.id) {
                    log::warn!("auto-discard of {} failed: {err}", tab.id);
                }
            }
        }

        self.update_content(ctx, node, tab, None);
        node
    }

    /// Re-apply option-driven classes. Returns whether the line is hidden.
    pub(crate) fn apply_display_options(&self, ctx: &mut RenderCtx<'_>, node: NodeId) -> bool {
        let is_self = ctx.doc.line(node).is_some_and(|l| l.is_self);
        let options = ctx.options;
        let Some(flags) = ctx.doc.flags_mut(node) else {
            return false;
        };
        flags.full_title = options.show_full_title;
        flags.full_url = options.show_full_url;
        flags.compact = options.compact_view;
        flags.hidden = is_self && options.hide_self_tabs;
        flags.hidden
    }

    /// A tab navigated to or away from the board's own page. Returns whether visibility changed.
    pub(crate) fn refresh_self_state(&mut self, ctx: &mut RenderCtx<'_>, node: NodeId, tab: &TabRecord) -> bool {
        let is_self = is_self_tab(tab, ctx.env);
        let was_hidden = ctx.doc.node(node).is_some_and(|n| n.flags.hidden);
        if let Some(line) = ctx.doc.line_mut(node) {
            line.is_self = is_self;
        }
        let hidden = self.apply_display_options(ctx, node);
        match (was_hidden, hidden) {
            (false, true) => self.visible_count = self.visible_count.saturating_sub(1),
            (true, false) => self.visible_count += 1,
            _ => {}
        }
        if is_self && self.most_recent().is_some_and(|t| t == tab.id) {
            self.most_recent = None;
        }
        was_hidden != hidden
    }

    /// Refresh the visible fields of `node` from `tab`.
    ///
    /// With `change`, only the reported fields are touched. A reported favicon change forces a
    /// cache-busted refetch: browsers tend to serve a stale icon right after a navigation.
    pub(crate) fn update_content(
        &mut self,
        ctx: &mut RenderCtx<'_>,
        node: NodeId,
        tab: &TabRecord,
        change: Option<&TabChange>,
    ) {
        let full = change.is_none();
        let changed = |f: fn(&TabChange) -> bool| change.is_none_or(f);

        let mut favicon = None;
        if change.is_some_and(|c| c.fav_icon_url.is_some()) {
            self.favicon_generation += 1;
            favicon = Some(cache_busted(
                &favicon_url(ctx.env, &tab.url),
                self.favicon_generation,
            ));
        } else if changed(|c| c.url.is_some()) {
            favicon = Some(favicon_url(ctx.env, &tab.url));
        }

        let last_accessed = describe_last_accessed(ctx.now_ms(), tab.last_accessed);
        let Some(line) = ctx.doc.line_mut(node) else {
            log::debug!("update for {} without a line", tab.id);
            return;
        };

        if changed(|c| c.title.is_some() || c.url.is_some()) {
            line.title = if tab.title.is_empty() {
                tab.url.clone()
            } else {
                tab.title.clone()
            };
        }
        if changed(|c| c.url.is_some()) {
            line.url.clone_from(&tab.url);
        }
        if let Some(favicon) = favicon {
            line.favicon = favicon;
        }
        if changed(|c| c.pinned.is_some()) {
            line.pinned = tab.pinned;
        }
        if changed(|c| c.audible.is_some()) {
            line.audible = tab.audible;
        }
        if changed(|c| c.muted.is_some()) {
            line.muted = tab.muted;
        }
        if changed(|c| c.discarded.is_some()) {
            line.discarded = tab.discarded;
        }
        if changed(|c| c.frozen.is_some()) {
            line.frozen = tab.frozen;
        }
        line.last_accessed = last_accessed;
        let is_self = line.is_self;

        if full || change.is_some_and(|c| c.status.is_some()) {
            if let Some(flags) = ctx.doc.flags_mut(node) {
                flags.loading = tab.status == TabStatus::Loading;
            }
        }

        if !is_self && self.most_recent.is_none_or(|(_, at)| tab.last_accessed > at) {
            self.most_recent = Some((tab.id, tab.last_accessed));
        }
    }

    /// Rebuild the whole list from a snapshot of the window's tabs.
    ///
    /// Returns the tabs that were rendered (instances of the board's own page closed by the
    /// single-instance policy are left out).
    pub(crate) fn render_all(
        &mut self,
        ctx: &mut RenderCtx<'_>,
        tabs: Vec<TabRecord>,
        groups: &mut GroupManager,
    ) -> Vec<TabRecord> {
        ctx.doc.clear();
        groups.reset();
        self.visible_count = 0;
        self.most_recent = None;

        let mut tabs: Vec<TabRecord> = tabs.into_iter().sorted_by_key(|t| t.index).collect();

        if ctx.options.keep_single_self_tab {
            let self_tabs: Vec<TabId> = tabs
                .iter()
                .filter(|t| is_self_tab(t, ctx.env))
                .map(|t| t.id)
                .collect();
            if let Some((_keep, extra)) = self_tabs.split_last() {
                if !extra.is_empty() {
                    log::debug!("closing {} extra instance(s) of the board", extra.len());
                    match ctx.browser.close_tabs(extra) {
                        Ok(()) => tabs.retain(|t| !extra.contains(&t.id)),
                        Err(err) => log::warn!("failed to close extra board tabs: {err}"),
                    }
                }
            }
        }

        for tab in &tabs {
            let line = self.create_line(ctx, tab);
            if tab.group_id.is_some() {
                groups.append_to_group(ctx, tab, line);
            } else {
                ctx.doc.append(None, line);
            }
        }

        tabs
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn favicon_falls_back_for_malformed_urls() {
        let env = Environment::default();
        assert_eq!(favicon_url(&env, "not a url"), DEFAULT_FAVICON);
        assert_eq!(favicon_url(&env, ""), DEFAULT_FAVICON);

        let icon = favicon_url(&env, "https://example.com/a?b=c");
        assert!(icon.starts_with(&env.favicon_endpoint));
        assert!(icon.ends_with("https%3A%2F%2Fexample.com%2Fa%3Fb%3Dc"), "{icon}");
    }

    #[test]
    fn cache_bust_appends_query_parameter() {
        assert_eq!(cache_busted("/icon?x=1", 3), "/icon?x=1&cacheBust=3");
        assert_eq!(cache_busted("/icon", 4), "/icon?cacheBust=4");
        assert_eq!(cache_busted(DEFAULT_FAVICON, 5), DEFAULT_FAVICON);
    }

    #[test]
    fn last_accessed_descriptions() {
        let now = 10.0 * 86_400_000.0;
        assert_eq!(describe_last_accessed(now, 0.0), "");
        assert_eq!(describe_last_accessed(now, now - 10_000.0), "just now");
        assert_eq!(describe_last_accessed(now, now - 5.0 * 60_000.0), "5 min ago");
        assert_eq!(describe_last_accessed(now, now - 3.0 * 3_600_000.0), "3 h ago");
        assert_eq!(describe_last_accessed(now, now - 86_400_000.0), "1 day ago");
        assert_eq!(describe_last_accessed(now, now - 4.0 * 86_400_000.0), "4 days ago");
    }

    #[test]
    fn self_tabs_match_by_prefix() {
        let env = Environment {
            self_url: "chrome-extension://abc/index.html".to_owned(),
            ..Default::default()
        };
        let mut tab = TabRecord::new(
            TabId(1),
            crate::model::WindowId(1),
            0,
            "chrome-extension://abc/index.html#x",
        );
        assert!(is_self_tab(&tab, &env));
        tab.url = "https://abc/".to_owned();
        assert!(!is_self_tab(&tab, &env));
    }
}
