use std::{fmt, time::Duration};

use tracing::debug;

use crate::catalog::{DrugRecord, Field};
use crate::config::TriggerMode;
use crate::gateway::{GatewayError, Page};
use crate::query::{
    Logic, PageRequest, PageSize, QueryDescriptor, SearchCondition, SearchConfiguration, SortSpec,
    build,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// Showing the unfiltered catalog.
    Idle,
    /// Draft differs from what was last sent (manual trigger only).
    Editing,
    Requesting,
    Settled,
    Failed,
}

/// Tag carried by every issued request. Only the newest one may change the
/// visible result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct RequestToken(u64);

impl RequestToken {
    pub fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for RequestToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// A page read the caller must perform, after `delay` if one is set. A
/// `fresh` read must bypass any cached copy of the page.
#[derive(Debug, Clone, PartialEq)]
pub struct PendingRequest {
    pub token: RequestToken,
    pub descriptor: QueryDescriptor,
    pub delay: Option<Duration>,
    pub fresh: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SearchResult {
    pub rows: Vec<DrugRecord>,
    pub total_count: u64,
    pub page: u32,
    pub page_size: PageSize,
    pub loading: bool,
    pub error: Option<String>,
}

impl SearchResult {
    fn empty(page_size: PageSize) -> Self {
        Self {
            rows: Vec::new(),
            total_count: 0,
            page: 1,
            page_size,
            loading: false,
            error: None,
        }
    }

    pub fn total_pages(&self) -> u32 {
        let size = u64::from(self.page_size.get());
        u32::try_from(self.total_count.div_ceil(size)).unwrap_or(u32::MAX)
    }

    /// 1-based, inclusive row range shown on this page. `None` when empty.
    pub fn row_range(&self) -> Option<(u64, u64)> {
        if self.rows.is_empty() {
            return None;
        }
        let start = u64::from(self.page - 1) * u64::from(self.page_size.get()) + 1;
        Some((start, start + self.rows.len() as u64 - 1))
    }

    pub fn ids(&self) -> Vec<crate::catalog::RecordId> {
        self.rows.iter().map(|row| row.id).collect()
    }
}

/// Flags for the status line.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SearchStatus {
    /// The user has edits that are not reflected in the results yet.
    pub typing: bool,
    /// A request was issued but is still waiting out its quiet period.
    pub pending: bool,
    /// A request is on the wire.
    pub searching: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Applied {
    Applied,
    Stale,
}

/// Owns the search, sort and page state and decides when a page read is
/// needed. It performs no I/O: every mutation that needs data returns a
/// [`PendingRequest`], and responses come back through [`Self::apply`].
#[derive(Debug)]
pub struct SearchCoordinator {
    trigger: TriggerMode,
    debounce: Duration,
    draft: SearchConfiguration,
    committed: SearchConfiguration,
    sort: SortSpec,
    page: PageRequest,
    phase: Phase,
    request_seq: u64,
    in_flight: Option<RequestToken>,
    dispatched: bool,
    result: SearchResult,
}

impl SearchCoordinator {
    pub fn new(trigger: TriggerMode, debounce: Duration, page_size: PageSize) -> Self {
        Self {
            trigger,
            debounce,
            draft: SearchConfiguration::default(),
            committed: SearchConfiguration::default(),
            sort: SortSpec::default(),
            page: PageRequest::first(page_size),
            phase: Phase::Idle,
            request_seq: 0,
            in_flight: None,
            dispatched: false,
            result: SearchResult::empty(page_size),
        }
    }

    pub fn trigger(&self) -> TriggerMode {
        self.trigger
    }

    pub fn draft(&self) -> &SearchConfiguration {
        &self.draft
    }

    pub fn committed(&self) -> &SearchConfiguration {
        &self.committed
    }

    pub fn sort(&self) -> SortSpec {
        self.sort
    }

    pub fn page(&self) -> PageRequest {
        self.page
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn result(&self) -> &SearchResult {
        &self.result
    }

    pub fn active_token(&self) -> Option<RequestToken> {
        self.in_flight
    }

    /// Descriptor for the committed search at the current page.
    pub fn descriptor(&self) -> QueryDescriptor {
        build(&self.committed, self.sort, self.page)
    }

    pub fn status(&self) -> SearchStatus {
        let requesting = self.phase == Phase::Requesting;
        SearchStatus {
            typing: self.phase == Phase::Editing || self.draft != self.committed,
            pending: requesting && !self.dispatched,
            searching: requesting && self.dispatched,
        }
    }

    /// First load: the unfiltered first page.
    pub fn start(&mut self) -> PendingRequest {
        self.issue(None)
    }

    pub fn set_term(&mut self, term: impl Into<String>) -> Option<PendingRequest> {
        let term = term.into();
        self.edit(true, |draft| draft.term = term)
    }

    pub fn add_include(&mut self, condition: SearchCondition) -> Option<PendingRequest> {
        self.edit(false, |draft| draft.include.push(condition))
    }

    pub fn add_exclude(&mut self, condition: SearchCondition) -> Option<PendingRequest> {
        self.edit(false, |draft| draft.exclude.push(condition))
    }

    pub fn remove_include(&mut self, index: usize) -> Option<PendingRequest> {
        if index >= self.draft.include.len() {
            return None;
        }
        self.edit(false, |draft| {
            draft.include.remove(index);
        })
    }

    pub fn remove_exclude(&mut self, index: usize) -> Option<PendingRequest> {
        if index >= self.draft.exclude.len() {
            return None;
        }
        self.edit(false, |draft| {
            draft.exclude.remove(index);
        })
    }

    pub fn set_logic(&mut self, logic: Logic) -> Option<PendingRequest> {
        self.edit(false, |draft| draft.include_logic = logic)
    }

    pub fn set_configuration(&mut self, config: SearchConfiguration) -> Option<PendingRequest> {
        self.edit(false, |draft| *draft = config)
    }

    /// Sends the draft. Always issues a request, so it doubles as a retry.
    pub fn submit(&mut self) -> PendingRequest {
        self.committed = self.draft.clone();
        self.page = PageRequest::first(self.page.size());
        self.issue(None)
    }

    /// Drops every condition and the sort, back to the unfiltered first page.
    pub fn clear(&mut self) -> PendingRequest {
        self.draft = SearchConfiguration::default();
        self.committed = SearchConfiguration::default();
        self.sort = SortSpec::default();
        self.page = PageRequest::first(self.page.size());
        self.issue(None)
    }

    /// Re-reads the current page of the committed search from the backend.
    pub fn refresh(&mut self) -> PendingRequest {
        PendingRequest {
            fresh: true,
            ..self.issue(None)
        }
    }

    /// Jumps to a page, clamped to the known page count. Re-requests even when
    /// the page number doesn't change.
    pub fn set_page(&mut self, page: u32) -> PendingRequest {
        let last = self.result.total_pages().max(1);
        self.page = PageRequest::new(page.clamp(1, last), self.page.size());
        self.issue(None)
    }

    pub fn next_page(&mut self) -> Option<PendingRequest> {
        (self.page.page() < self.result.total_pages()).then(|| self.set_page(self.page.page() + 1))
    }

    pub fn previous_page(&mut self) -> Option<PendingRequest> {
        (self.page.page() > 1).then(|| self.set_page(self.page.page() - 1))
    }

    pub fn set_page_size(&mut self, size: PageSize) -> PendingRequest {
        self.page = PageRequest::first(size);
        self.issue(None)
    }

    pub fn set_sort(&mut self, sort: SortSpec) -> PendingRequest {
        self.sort = sort;
        self.page = PageRequest::first(self.page.size());
        self.issue(None)
    }

    pub fn toggle_sort(&mut self, field: Field) -> PendingRequest {
        self.set_sort(self.sort.toggled(field))
    }

    /// Records that a request left its quiet period and hit the backend.
    pub fn mark_dispatched(&mut self, token: RequestToken) {
        if self.in_flight == Some(token) {
            self.dispatched = true;
        }
    }

    /// Applies a response. Anything but the newest request is discarded.
    pub fn apply(&mut self, token: RequestToken, response: Result<Page, GatewayError>) -> Applied {
        if self.in_flight != Some(token) {
            debug!(
                request_id = token.get(),
                active = ?self.in_flight.map(RequestToken::get),
                "Discarding stale search response"
            );
            return Applied::Stale;
        }
        self.in_flight = None;
        self.dispatched = false;

        match response {
            Ok(page) => {
                self.result = SearchResult {
                    rows: page.rows,
                    total_count: page.total_count,
                    page: self.page.page(),
                    page_size: self.page.size(),
                    loading: false,
                    error: None,
                };
                self.phase = if self.trigger == TriggerMode::Manual && self.draft != self.committed {
                    Phase::Editing
                } else if self.committed.is_empty() {
                    Phase::Idle
                } else {
                    Phase::Settled
                };
                debug!(
                    request_id = token.get(),
                    rows = self.result.rows.len(),
                    total_count = self.result.total_count,
                    phase = ?self.phase,
                    "Search settled"
                );
            }
            Err(err) => {
                tracing::error!(
                    request_id = token.get(),
                    error = %err,
                    descriptor = %self.descriptor().summary(),
                    "Search failed"
                );
                self.result.loading = false;
                self.result.error = Some(err.to_string());
                self.phase = Phase::Failed;
            }
        }
        Applied::Applied
    }

    fn edit(
        &mut self,
        debounced: bool,
        mutate: impl FnOnce(&mut SearchConfiguration),
    ) -> Option<PendingRequest> {
        mutate(&mut self.draft);
        match self.trigger {
            TriggerMode::Manual => {
                if self.phase != Phase::Requesting {
                    self.phase = if self.draft == self.committed {
                        self.settled_phase()
                    } else {
                        Phase::Editing
                    };
                }
                None
            }
            TriggerMode::Automatic => {
                self.committed = self.draft.clone();
                self.page = PageRequest::first(self.page.size());
                let delay = (debounced && !self.debounce.is_zero()).then_some(self.debounce);
                Some(self.issue(delay))
            }
        }
    }

    fn settled_phase(&self) -> Phase {
        if self.result.error.is_some() {
            Phase::Failed
        } else if self.committed.is_empty() {
            Phase::Idle
        } else {
            Phase::Settled
        }
    }

    fn issue(&mut self, delay: Option<Duration>) -> PendingRequest {
        self.request_seq += 1;
        let token = RequestToken(self.request_seq);
        if let Some(previous) = self.in_flight.replace(token) {
            debug!(
                request_id = token.get(),
                superseded = previous.get(),
                "Superseding in-flight search"
            );
        }
        self.dispatched = false;
        self.phase = Phase::Requesting;
        self.result.loading = true;
        let descriptor = self.descriptor();
        debug!(
            request_id = token.get(),
            descriptor = %descriptor.summary(),
            delay_ms = delay.map(|d| d.as_millis()),
            "Issuing search"
        );
        PendingRequest {
            token,
            descriptor,
            delay,
            fresh: false,
        }
    }
}
