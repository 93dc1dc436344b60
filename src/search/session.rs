use std::sync::{
    Arc,
    atomic::{AtomicU64, Ordering},
};

use tokio::{
    sync::mpsc::{UnboundedReceiver, UnboundedSender, unbounded_channel},
    task::JoinHandle,
};

use super::coordinator::{Applied, PendingRequest, RequestToken, SearchCoordinator};
use crate::gateway::{Gateway, GatewayError, Page};

/// Progress of a spawned page read.
#[derive(Debug)]
pub enum SessionEvent {
    Dispatched(RequestToken),
    Finished(RequestToken, Result<Page, GatewayError>),
}

/// Runs the coordinator's requests on the tokio runtime.
///
/// Each request gets its own task. Issuing a new one aborts the previous task,
/// but correctness doesn't depend on that: results are still matched against
/// the coordinator's newest token.
pub struct SearchSession {
    gateway: Arc<dyn Gateway>,
    coordinator: SearchCoordinator,
    generation: Arc<AtomicU64>,
    tx: UnboundedSender<SessionEvent>,
    task: Option<JoinHandle<()>>,
}

impl SearchSession {
    pub fn new(
        gateway: Arc<dyn Gateway>,
        coordinator: SearchCoordinator,
    ) -> (Self, UnboundedReceiver<SessionEvent>) {
        let (tx, rx) = unbounded_channel();
        let session = Self {
            gateway,
            coordinator,
            generation: Arc::new(AtomicU64::new(0)),
            tx,
            task: None,
        };
        (session, rx)
    }

    pub fn coordinator(&self) -> &SearchCoordinator {
        &self.coordinator
    }

    pub fn gateway(&self) -> Arc<dyn Gateway> {
        self.gateway.clone()
    }

    /// Applies a coordinator mutation and runs whatever request it produces.
    pub fn update<R: Into<Option<PendingRequest>>>(
        &mut self,
        mutate: impl FnOnce(&mut SearchCoordinator) -> R,
    ) {
        if let Some(request) = mutate(&mut self.coordinator).into() {
            self.dispatch(request);
        }
    }

    /// Feeds a task event back into the coordinator. Returns `true` when the
    /// visible state changed.
    pub fn handle(&mut self, event: SessionEvent) -> bool {
        match event {
            SessionEvent::Dispatched(token) => {
                self.coordinator.mark_dispatched(token);
                true
            }
            SessionEvent::Finished(token, result) => {
                if self.coordinator.active_token() == Some(token) {
                    self.task = None;
                }
                self.coordinator.apply(token, result) == Applied::Applied
            }
        }
    }

    pub fn dispatch(&mut self, request: PendingRequest) {
        let PendingRequest {
            token,
            descriptor,
            delay,
            fresh,
        } = request;
        self.generation.store(token.get(), Ordering::SeqCst);
        if let Some(previous) = self.task.take() {
            previous.abort();
        }

        let gateway = self.gateway.clone();
        let generation = self.generation.clone();
        let tx = self.tx.clone();
        self.task = Some(tokio::spawn(async move {
            if let Some(delay) = delay {
                tokio::time::sleep(delay).await;
            }
            if generation.load(Ordering::SeqCst) != token.get() {
                tracing::trace!(request_id = token.get(), "Search superseded before dispatch");
                return;
            }
            let _ = tx.send(SessionEvent::Dispatched(token));
            tracing::trace!(
                request_id = token.get(),
                offset = descriptor.offset,
                limit = descriptor.limit,
                fresh,
                "Search dispatched"
            );
            let result = if fresh {
                gateway.fetch_fresh_page(&descriptor).await
            } else {
                gateway.fetch_page(&descriptor).await
            };
            let _ = tx.send(SessionEvent::Finished(token, result));
        }));
    }
}

impl Drop for SearchSession {
    fn drop(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}

#[cfg(test)]
mod tests {
    use std::{
        sync::{Mutex, atomic::AtomicUsize},
        time::Duration,
    };

    use async_trait::async_trait;

    use super::*;
    use crate::catalog::{DrugRecord, Field, RecordId};
    use crate::config::TriggerMode;
    use crate::gateway::PriceStats;
    use crate::query::{Filter, Literal, PageSize, QueryDescriptor, SortSpec};
    use crate::search::Phase;

    /// Answers each search with one row whose id is the term's length, after a
    /// latency picked per term.
    struct SlowGateway {
        latency: fn(&str) -> Duration,
        calls: AtomicUsize,
        fresh_calls: AtomicUsize,
        terms: Mutex<Vec<String>>,
    }

    impl SlowGateway {
        fn new(latency: fn(&str) -> Duration) -> Self {
            Self {
                latency,
                calls: AtomicUsize::new(0),
                fresh_calls: AtomicUsize::new(0),
                terms: Mutex::new(Vec::new()),
            }
        }
    }

    fn term_of(descriptor: &QueryDescriptor) -> String {
        descriptor
            .filters
            .iter()
            .find_map(|filter| match filter {
                Filter::AnyOf(clauses) => clauses.first().map(|c| match &c.value {
                    Literal::Text(text) => text.clone(),
                    Literal::Number(n) => n.to_string(),
                }),
                _ => None,
            })
            .unwrap_or_default()
    }

    #[async_trait]
    impl Gateway for SlowGateway {
        async fn fetch_page(&self, descriptor: &QueryDescriptor) -> Result<Page, GatewayError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let term = term_of(descriptor);
            self.terms.lock().unwrap().push(term.clone());
            tokio::time::sleep((self.latency)(&term)).await;
            Ok(Page {
                rows: vec![DrugRecord {
                    id: term.len() as RecordId,
                    drug_name: term,
                    ..Default::default()
                }],
                total_count: 1,
            })
        }

        async fn fetch_fresh_page(
            &self,
            descriptor: &QueryDescriptor,
        ) -> Result<Page, GatewayError> {
            self.fresh_calls.fetch_add(1, Ordering::SeqCst);
            self.fetch_page(descriptor).await
        }

        async fn fetch_distinct_values(&self, _field: Field, _limit: usize) -> Vec<String> {
            Vec::new()
        }

        async fn fetch_aggregate_stats(
            &self,
            _descriptor: &QueryDescriptor,
        ) -> Result<PriceStats, GatewayError> {
            Ok(PriceStats::default())
        }

        async fn fetch_by_ids(
            &self,
            _ids: &[RecordId],
            _sort: SortSpec,
        ) -> Result<Vec<DrugRecord>, GatewayError> {
            Ok(Vec::new())
        }

        async fn fetch_total_count(&self) -> Result<u64, GatewayError> {
            Ok(0)
        }
    }

    async fn settle(session: &mut SearchSession, rx: &mut UnboundedReceiver<SessionEvent>) {
        while session.coordinator().phase() == Phase::Requesting {
            let event = rx.recv().await.expect("session channel open");
            session.handle(event);
        }
    }

    #[tokio::test(start_paused = true)]
    async fn newest_search_wins_over_slower_older_one() {
        let gateway = Arc::new(SlowGateway::new(|term| match term {
            "slow" => Duration::from_millis(500),
            _ => Duration::from_millis(10),
        }));
        let coordinator =
            SearchCoordinator::new(TriggerMode::Manual, Duration::ZERO, PageSize::default());
        let (mut session, mut rx) = SearchSession::new(gateway.clone(), coordinator);

        session.update(|c| {
            c.set_term("slow");
            c.submit()
        });
        tokio::task::yield_now().await;
        session.update(|c| {
            c.set_term("quick");
            c.submit()
        });
        settle(&mut session, &mut rx).await;
        // Let the older request run to completion if it survived the abort.
        tokio::time::sleep(Duration::from_secs(1)).await;
        while let Ok(event) = rx.try_recv() {
            session.handle(event);
        }

        let result = session.coordinator().result();
        assert_eq!(result.rows.len(), 1);
        assert_eq!(result.rows[0].drug_name, "quick");
        assert_eq!(session.coordinator().phase(), Phase::Settled);
    }

    #[tokio::test(start_paused = true)]
    async fn debounced_typing_sends_only_the_last_term() {
        let gateway = Arc::new(SlowGateway::new(|_| Duration::from_millis(5)));
        let coordinator = SearchCoordinator::new(
            TriggerMode::Automatic,
            Duration::from_millis(300),
            PageSize::default(),
        );
        let (mut session, mut rx) = SearchSession::new(gateway.clone(), coordinator);

        for term in ["p", "pa", "par", "para"] {
            session.update(|c| c.set_term(term));
            tokio::time::sleep(Duration::from_millis(100)).await;
        }
        assert_eq!(gateway.calls.load(Ordering::SeqCst), 0);
        assert!(session.coordinator().status().pending);

        settle(&mut session, &mut rx).await;
        assert_eq!(gateway.calls.load(Ordering::SeqCst), 1);
        assert_eq!(*gateway.terms.lock().unwrap(), vec!["para".to_string()]);
        assert_eq!(session.coordinator().result().rows[0].id, 4);
    }

    #[tokio::test(start_paused = true)]
    async fn stale_result_delivered_late_is_not_applied() {
        let gateway = Arc::new(SlowGateway::new(|_| Duration::from_millis(1)));
        let coordinator =
            SearchCoordinator::new(TriggerMode::Manual, Duration::ZERO, PageSize::default());
        let (mut session, _rx) = SearchSession::new(gateway, coordinator);

        session.update(|c| {
            c.set_term("old");
            c.submit()
        });
        let old = session.coordinator().active_token().unwrap();
        session.update(|c| {
            c.set_term("new");
            c.submit()
        });
        let new = session.coordinator().active_token().unwrap();

        let late = |name: &str| {
            Ok(Page {
                rows: vec![DrugRecord {
                    drug_name: name.to_string(),
                    ..Default::default()
                }],
                total_count: 1,
            })
        };
        assert!(session.handle(SessionEvent::Finished(new, late("new"))));
        assert!(!session.handle(SessionEvent::Finished(old, late("old"))));
        assert_eq!(session.coordinator().result().rows[0].drug_name, "new");
    }

    #[tokio::test(start_paused = true)]
    async fn refresh_reads_past_the_cache() {
        let gateway = Arc::new(SlowGateway::new(|_| Duration::from_millis(1)));
        let coordinator =
            SearchCoordinator::new(TriggerMode::Manual, Duration::ZERO, PageSize::default());
        let (mut session, mut rx) = SearchSession::new(gateway.clone(), coordinator);

        session.update(|c| c.start());
        settle(&mut session, &mut rx).await;
        assert_eq!(gateway.fresh_calls.load(Ordering::SeqCst), 0);

        session.update(|c| c.refresh());
        settle(&mut session, &mut rx).await;
        assert_eq!(gateway.calls.load(Ordering::SeqCst), 2);
        assert_eq!(gateway.fresh_calls.load(Ordering::SeqCst), 1);
    }
}
