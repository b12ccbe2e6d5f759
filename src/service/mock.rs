use std::collections::{HashMap, VecDeque};
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use async_trait::async_trait;

use super::{SafetyService, ServiceError};
use crate::models::{CheckOutcome, CheckRequest, Suggestion};

const DEFAULT_LATENCY: Duration = Duration::from_millis(50);

/// One scripted reply: how long the "network" takes and what comes back.
#[derive(Debug, Clone)]
pub struct MockReply {
    pub latency: Duration,
    pub result: Result<CheckOutcome, ServiceError>,
}

struct MockState {
    latency: Duration,
    queued: VecDeque<MockReply>,
    by_name: HashMap<String, MockReply>,
    catalog: Vec<Suggestion>,
    suggest_failure: Option<ServiceError>,
    checks: Vec<CheckRequest>,
    suggest_queries: Vec<String>,
}

/// Scripted rules service for testing.
///
/// Check replies come from the FIFO queue first, then from the per-name
/// table (case-insensitive), and default to the no-match outcome.
/// Suggestions are catalog entries whose name starts with the query.
pub struct MockSafetyService {
    state: Mutex<MockState>,
}

impl Default for MockSafetyService {
    fn default() -> Self {
        Self::new()
    }
}

impl MockSafetyService {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(MockState {
                latency: DEFAULT_LATENCY,
                queued: VecDeque::new(),
                by_name: HashMap::new(),
                catalog: Vec::new(),
                suggest_failure: None,
                checks: Vec::new(),
                suggest_queries: Vec::new(),
            }),
        }
    }

    fn lock(&self) -> MutexGuard<'_, MockState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Latency used for replies that do not set their own.
    pub fn with_latency(self, latency: Duration) -> Self {
        self.lock().latency = latency;
        self
    }

    /// Reply for a medication name, every time it is checked.
    pub fn on_check(self, name: &str, result: Result<CheckOutcome, ServiceError>) -> Self {
        let latency = self.lock().latency;
        self.on_check_after(name, latency, result)
    }

    pub fn on_check_after(
        self,
        name: &str,
        latency: Duration,
        result: Result<CheckOutcome, ServiceError>,
    ) -> Self {
        self.lock()
            .by_name
            .insert(name.trim().to_lowercase(), MockReply { latency, result });
        self
    }

    /// Reply for the next check, whatever its name. Queued replies are used
    /// in order before the per-name table.
    pub fn queue_check(&self, latency: Duration, result: Result<CheckOutcome, ServiceError>) {
        self.lock().queued.push_back(MockReply { latency, result });
    }

    pub fn with_suggestion(self, suggestion: Suggestion) -> Self {
        self.lock().catalog.push(suggestion);
        self
    }

    pub fn fail_suggestions(self, error: ServiceError) -> Self {
        self.lock().suggest_failure = Some(error);
        self
    }

    /// Every check request received, in arrival order.
    pub fn checks(&self) -> Vec<CheckRequest> {
        self.lock().checks.clone()
    }

    pub fn check_count(&self) -> usize {
        self.lock().checks.len()
    }

    pub fn suggest_queries(&self) -> Vec<String> {
        self.lock().suggest_queries.clone()
    }
}

#[async_trait]
impl SafetyService for MockSafetyService {
    async fn check_medication(&self, request: &CheckRequest) -> Result<CheckOutcome, ServiceError> {
        let reply = {
            let mut state = self.lock();
            state.checks.push(request.clone());
            let key = request.medication_name.trim().to_lowercase();
            match state.queued.pop_front() {
                Some(reply) => reply,
                None => state.by_name.get(&key).cloned().unwrap_or(MockReply {
                    latency: state.latency,
                    result: Ok(CheckOutcome::no_match()),
                }),
            }
        };

        tokio::time::sleep(reply.latency).await;
        reply.result
    }

    async fn suggest(&self, query: &str) -> Result<Vec<Suggestion>, ServiceError> {
        let (latency, result) = {
            let mut state = self.lock();
            state.suggest_queries.push(query.to_string());
            let result = match &state.suggest_failure {
                Some(error) => Err(error.clone()),
                None => {
                    let prefix = query.trim().to_lowercase();
                    Ok(state
                        .catalog
                        .iter()
                        .filter(|s| s.name.to_lowercase().starts_with(&prefix))
                        .cloned()
                        .collect())
                }
            };
            (state.latency, result)
        };

        tokio::time::sleep(latency).await;
        result
    }
}
