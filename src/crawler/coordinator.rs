//! Traversal orchestrator - main harvest loop
//!
//! This module walks the catalog starting at the run's base URL:
//! - Fetching listing pages and extracting their links in document order
//! - Classifying and gating every link
//! - Handing terminal downloads to the dispatch strategy
//! - Following continuation pages depth-first before resuming the current page
//! - Stopping once the completion counter reaches the configured cap

use crate::catalog::{extract_links, CatalogLink, Gate};
use crate::config::RunConfiguration;
use crate::crawler::counter::CompletionCounter;
use crate::crawler::dispatch::{default_pool_size, DispatchOutcome, Dispatcher};
use crate::crawler::fetcher::{FetchEngine, FetchResult};
use crate::output::{RunOutcome, RunSummary};
use crate::state::RunState;
use crate::{HarvestError, LinkError};
use std::collections::HashSet;
use std::path::Path;
use url::Url;

/// Links of one catalog page still waiting to be processed
struct PageCursor {
    links: std::vec::IntoIter<String>,
    /// Whether leaving this page counts as one dispatch
    counts_on_return: bool,
}

/// What to do with a link that passed the gate
#[derive(Debug, PartialEq, Eq)]
enum LinkPlan {
    /// Absolute resource, handed to the dispatch strategy
    Download(Url),
    /// Catalog continuation, fetched on the control loop
    FollowPage { url: Url, counted: bool },
}

/// Drives a single harvest run
///
/// An orchestrator is single-use: once `run` returns it is in a terminal
/// state and a second call fails with [`HarvestError::InvalidTransition`].
pub struct Orchestrator {
    config: RunConfiguration,
    engine: FetchEngine,
    dispatcher: Dispatcher,
    gate: Gate,
    counter: CompletionCounter,
    summary: RunSummary,
    state: RunState,
    visited_pages: HashSet<Url>,
}

impl Orchestrator {
    /// Creates an orchestrator for `config`
    ///
    /// # Errors
    ///
    /// Returns [`HarvestError::Client`] if the HTTP client cannot be built.
    pub fn new(config: RunConfiguration) -> crate::Result<Self> {
        let engine = FetchEngine::new(config.engine())?;
        let dispatcher = Dispatcher::for_mode(config.mode(), config.delay(), default_pool_size());
        let gate = Gate::new(config.zips_path(), config.overwrite());

        Ok(Self {
            config,
            engine,
            dispatcher,
            gate,
            counter: CompletionCounter::new(),
            summary: RunSummary::new(),
            state: RunState::Idle,
            visited_pages: HashSet::new(),
        })
    }

    /// Overrides the worker pool size used in concurrent mode
    pub fn with_pool_size(mut self, size: usize) -> Self {
        self.dispatcher = Dispatcher::for_mode(self.config.mode(), self.config.delay(), size);
        self
    }

    pub fn state(&self) -> RunState {
        self.state
    }

    pub fn counter(&self) -> &CompletionCounter {
        &self.counter
    }

    /// Runs the harvest to completion
    ///
    /// Outstanding concurrent downloads are drained even when the traversal
    /// fails, so no worker is cut off mid-write.
    pub async fn run(&mut self) -> crate::Result<RunSummary> {
        let traversal = self.traverse().await;

        let report = self.dispatcher.drain().await;
        self.summary.absorb(report);
        self.summary.finish();

        match traversal {
            Ok(()) => {
                if self.state == RunState::Draining {
                    self.transition(RunState::Done)?;
                }
                tracing::info!(
                    "Harvest finished: {} dispatched, {} downloaded, {} skipped",
                    self.summary.dispatched,
                    self.summary.downloaded,
                    self.summary.skipped
                );
                Ok(self.summary.clone())
            }
            Err(e) => {
                if self.state.can_transition_to(RunState::Failed) {
                    self.state = RunState::Failed;
                }
                tracing::error!("Harvest aborted: {}", e);
                Err(e)
            }
        }
    }

    async fn traverse(&mut self) -> crate::Result<()> {
        self.transition(RunState::FetchingPage)?;

        let base = self.config.base_url().clone();
        let zips = self.config.zips_path();
        let max_files = self.config.max_files();

        self.visited_pages.insert(base.clone());
        tracing::info!("Fetching catalog {}", base);
        let first = self.engine.fetch(&base, &zips).await;

        let first_page = first
            .saved_path()
            .filter(|_| first.is_catalog_page())
            .map(Path::to_path_buf);
        let Some(first_page) = first_page else {
            if let Some(e) = first.into_error(&base) {
                return Err(e);
            }
            tracing::info!("No links to download");
            self.summary.outcome = RunOutcome::NoLinks;
            return self.transition(RunState::Done);
        };

        let mut stack = vec![self.open_page(&first_page, false)?];

        loop {
            if self.counter.has_reached(max_files) {
                tracing::info!("Reached the limit of {} files", max_files);
                break;
            }

            let Some(cursor) = stack.last_mut() else {
                break;
            };
            let Some(href) = cursor.links.next() else {
                if let Some(finished) = stack.pop() {
                    if finished.counts_on_return {
                        self.count_dispatch();
                    }
                }
                continue;
            };

            let link = CatalogLink::new(href);
            if !self.gate.admits(&link) {
                tracing::debug!("Skipping {}, already downloaded", link.href());
                self.summary.skipped += 1;
                continue;
            }

            match self.plan(&link, &base) {
                Ok(LinkPlan::Download(url)) => self.download(&url, &zips).await?,
                Ok(LinkPlan::FollowPage { url, counted }) => {
                    match self.follow_page(&url, counted, &zips).await? {
                        Some(cursor) => stack.push(cursor),
                        None if counted => self.count_dispatch(),
                        None => {}
                    }
                }
                Err(e) => {
                    tracing::error!("{}", e);
                    self.summary.malformed += 1;
                }
            }
        }

        self.transition(RunState::Draining)
    }

    /// Decides how a gated link is handled
    ///
    /// A relative link that is not pagination-marked is still treated as a
    /// continuation, and counts as a dispatch.
    fn plan(&self, link: &CatalogLink, base: &Url) -> Result<LinkPlan, LinkError> {
        if link.is_pagination() {
            return Ok(LinkPlan::FollowPage {
                url: link.resolve_continuation(base)?,
                counted: false,
            });
        }

        match link.absolute_url()? {
            Some(url) => Ok(LinkPlan::Download(url)),
            None => Ok(LinkPlan::FollowPage {
                url: link.resolve_continuation(base)?,
                counted: true,
            }),
        }
    }

    async fn download(&mut self, url: &Url, zips: &Path) -> crate::Result<()> {
        self.transition(RunState::Dispatching)?;
        tracing::info!("New URL: {}", url);

        let outcome = self.dispatcher.dispatch(&self.engine, url, zips).await;
        self.count_dispatch();

        if let DispatchOutcome::Completed(result) = outcome {
            match result {
                FetchResult::Success { .. } => self.summary.downloaded += 1,
                FetchResult::SoftFailure => self.summary.soft_failures += 1,
                fatal => {
                    if let Some(e) = fatal.into_error(url) {
                        return Err(e);
                    }
                }
            }
        }

        self.transition(RunState::ProcessingLinks)
    }

    /// Fetches a continuation page; returns its cursor if it is a listing
    async fn follow_page(
        &mut self,
        url: &Url,
        counted: bool,
        zips: &Path,
    ) -> crate::Result<Option<PageCursor>> {
        self.transition(RunState::Recursing)?;

        if !self.visited_pages.insert(url.clone()) {
            tracing::debug!("Catalog page {} already visited", url);
            self.summary.revisited += 1;
            self.transition(RunState::ProcessingLinks)?;
            return Ok(None);
        }

        self.transition(RunState::FetchingPage)?;
        tracing::info!("Following catalog page {}", url);
        let result = self.dispatcher.fetch_page(&self.engine, url, zips).await;

        if result.is_catalog_page() {
            if let Some(path) = result.saved_path() {
                return self.open_page(path, counted).map(Some);
            }
        }

        match result {
            FetchResult::Success { .. } if counted => {
                tracing::debug!("{} saved as a resource", url);
                self.summary.downloaded += 1;
            }
            FetchResult::Success { content_type, .. } => {
                tracing::warn!("{} is not a catalog page ({}), skipping", url, content_type);
            }
            FetchResult::SoftFailure => {
                tracing::warn!("Catalog page {} timed out, skipping", url);
                self.summary.soft_failures += 1;
            }
            fatal => {
                if let Some(e) = fatal.into_error(url) {
                    return Err(e);
                }
            }
        }

        self.transition(RunState::ProcessingLinks)?;
        Ok(None)
    }

    fn open_page(&mut self, path: &Path, counts_on_return: bool) -> crate::Result<PageCursor> {
        self.transition(RunState::ExtractingLinks)?;
        let links = extract_links(path)?;
        tracing::debug!("Found {} links in {}", links.len(), path.display());
        self.summary.pages += 1;
        self.transition(RunState::ProcessingLinks)?;

        Ok(PageCursor {
            links: links.into_iter(),
            counts_on_return,
        })
    }

    fn count_dispatch(&mut self) {
        self.counter.increment();
        self.summary.dispatched += 1;
    }

    fn transition(&mut self, next: RunState) -> crate::Result<()> {
        if !self.state.can_transition_to(next) {
            return Err(HarvestError::InvalidTransition {
                from: self.state,
                to: next,
            });
        }
        tracing::trace!("{} -> {}", self.state, next);
        self.state = next;
        Ok(())
    }
}
