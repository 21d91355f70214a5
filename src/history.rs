//! Retrieval state machine for the learning-history view.
//!
//! `HistorySession` is pure state: it hands out `FetchRequest` tickets and
//! consumes their completions, so the staleness and retry rules are testable
//! without any I/O. `load_history` is the async driver that actually fans the
//! two list fetches out onto blocking tasks.

use std::sync::Arc;

use tokio::task;

use crate::error::{BackendError, StoreError};
use crate::store::LearningStore;
use crate::types::{CourseBody, DetailedCourse, Roadmap};

/// Manual retries offered after a failed load. Once spent, the failure is
/// final for the session.
pub const MAX_RETRIES: u32 = 3;

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum LoadState {
    /// No authenticated identity yet.
    Idle,
    Loading,
    Loaded,
    Failed { message: String },
}

/// Both collections of a successful load.
#[derive(Clone, Debug, Default)]
pub struct HistoryData {
    pub roadmaps: Vec<Roadmap>,
    pub detailed_courses: Vec<DetailedCourse>,
}

/// Ticket for one fetch. The generation pins the completion to the identity
/// that requested it; a completion from an older generation is discarded.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FetchRequest {
    pub user_id: String,
    generation: u64,
}

/// Fire-and-forget navigation callbacks exposed to the view layer.
pub trait HistoryActions {
    fn continue_learning(&self, subject: &str, difficulty: &str, roadmap_id: &str);
    fn view_detailed_course(&self, course: &CourseBody);
}

pub struct HistorySession {
    user_id: Option<String>,
    generation: u64,
    state: LoadState,
    data: HistoryData,
    retry_count: u32,
}

impl HistorySession {
    pub fn new() -> Self {
        Self {
            user_id: None,
            generation: 0,
            state: LoadState::Idle,
            data: HistoryData::default(),
            retry_count: 0,
        }
    }

    pub fn state(&self) -> &LoadState {
        &self.state
    }

    /// The collections currently available for rendering. Retained across a
    /// retry so the view never regresses to a blank screen mid-flight.
    pub fn data(&self) -> &HistoryData {
        &self.data
    }

    pub fn user_id(&self) -> Option<&str> {
        self.user_id.as_deref()
    }

    pub fn retry_count(&self) -> u32 {
        self.retry_count
    }

    pub fn retries_remaining(&self) -> u32 {
        MAX_RETRIES - self.retry_count
    }

    pub fn can_retry(&self) -> bool {
        matches!(self.state, LoadState::Failed { .. })
            && self.retry_count < MAX_RETRIES
            && self.user_id.is_some()
    }

    /// Switch to a (possibly absent) identity. A change discards loaded data
    /// and the retry budget and invalidates in-flight fetches; setting the
    /// identity the session already has is a no-op.
    pub fn set_identity(&mut self, user_id: Option<String>) -> Option<FetchRequest> {
        if self.user_id == user_id {
            return None;
        }

        self.user_id = user_id;
        self.generation += 1;
        self.data = HistoryData::default();
        self.retry_count = 0;

        match &self.user_id {
            Some(user_id) => {
                self.state = LoadState::Loading;
                Some(FetchRequest {
                    user_id: user_id.clone(),
                    generation: self.generation,
                })
            }
            None => {
                self.state = LoadState::Idle;
                None
            }
        }
    }

    /// Start a fresh load for the current identity (view re-mounted). Keeps
    /// whatever is on screen and starts a new retry budget.
    pub fn reload(&mut self) -> Option<FetchRequest> {
        let user_id = self.user_id.clone()?;
        self.generation += 1;
        self.retry_count = 0;
        self.state = LoadState::Loading;
        Some(FetchRequest {
            user_id,
            generation: self.generation,
        })
    }

    /// Manual retry after a failure. `None` once the budget is spent.
    pub fn retry(&mut self) -> Option<FetchRequest> {
        if !self.can_retry() {
            return None;
        }
        let user_id = self.user_id.clone()?;
        self.retry_count += 1;
        self.generation += 1;
        self.state = LoadState::Loading;
        Some(FetchRequest {
            user_id,
            generation: self.generation,
        })
    }

    /// Commit the outcome of a fetch. Completions whose ticket is stale (an
    /// identity change or newer load superseded them) are dropped so a late
    /// response can never overwrite fresher state.
    pub fn complete(&mut self, request: &FetchRequest, result: Result<HistoryData, StoreError>) {
        if request.generation != self.generation {
            tracing::debug!(user_id = %request.user_id, "discarding stale fetch completion");
            return;
        }

        match result {
            Ok(data) => {
                tracing::debug!(
                    user_id = %request.user_id,
                    roadmaps = data.roadmaps.len(),
                    detailed_courses = data.detailed_courses.len(),
                    "history loaded"
                );
                self.data = data;
                self.retry_count = 0;
                self.state = LoadState::Loaded;
            }
            Err(err) => {
                tracing::error!(user_id = %request.user_id, error = %err, "history load failed");
                self.state = LoadState::Failed {
                    message: err.to_string(),
                };
            }
        }
    }

    /// Fire the continue-learning callback for a listed roadmap. Returns
    /// whether anything fired.
    pub fn open_roadmap<A: HistoryActions>(&self, roadmap_id: &str, actions: &A) -> bool {
        match self.data.roadmaps.iter().find(|r| r.id == roadmap_id) {
            Some(roadmap) => {
                actions.continue_learning(&roadmap.subject, &roadmap.difficulty, &roadmap.id);
                true
            }
            None => false,
        }
    }

    /// Fire the view callback for a listed detailed course.
    pub fn open_detailed_course<A: HistoryActions>(&self, course_id: &str, actions: &A) -> bool {
        match self.data.detailed_courses.iter().find(|c| c.id == course_id) {
            Some(course) => {
                actions.view_detailed_course(&course.course_data);
                true
            }
            None => false,
        }
    }
}

impl Default for HistorySession {
    fn default() -> Self {
        Self::new()
    }
}

/// Fetch both collections concurrently. Succeeds only when both legs do;
/// when both fail the roadmap leg's error wins, deterministically.
pub async fn load_history<S>(
    store: &Arc<S>,
    request: &FetchRequest,
) -> Result<HistoryData, StoreError>
where
    S: LearningStore + 'static,
{
    let roadmaps_task = task::spawn_blocking({
        let store = Arc::clone(store);
        let user_id = request.user_id.clone();
        move || store.list_roadmaps(&user_id)
    });
    let courses_task = task::spawn_blocking({
        let store = Arc::clone(store);
        let user_id = request.user_id.clone();
        move || store.list_detailed_courses(&user_id)
    });

    let (roadmaps, detailed_courses) = tokio::join!(roadmaps_task, courses_task);
    let roadmaps = flatten_join(roadmaps)?;
    let detailed_courses = flatten_join(detailed_courses)?;

    Ok(HistoryData {
        roadmaps,
        detailed_courses,
    })
}

fn flatten_join<T>(
    joined: Result<Result<T, StoreError>, task::JoinError>,
) -> Result<T, StoreError> {
    match joined {
        Ok(inner) => inner,
        Err(e) => Err(StoreError::Fetch(BackendError::Task(e.to_string()))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::BackendError;
    use crate::store::memory::MemoryStore;
    use crate::types::{Chapter, Roadmap, RoadmapBody};
    use std::sync::Mutex;

    fn roadmap(id: &str, user: &str, subject: &str, created_at: &str) -> Roadmap {
        Roadmap {
            id: id.to_string(),
            user_id: user.to_string(),
            subject: subject.to_string(),
            difficulty: "beginner".to_string(),
            roadmap_data: RoadmapBody {
                chapters: vec![Chapter {
                    id: "ch1".to_string(),
                    ..Chapter::default()
                }],
                extra: Default::default(),
            },
            created_at: created_at.to_string(),
            updated_at: created_at.to_string(),
        }
    }

    fn fetch_error() -> StoreError {
        StoreError::Fetch(BackendError::Network("connection refused".to_string()))
    }

    /// `list_detailed_courses` fails, the other leg succeeds.
    struct HalfBrokenStore;

    impl LearningStore for HalfBrokenStore {
        fn list_roadmaps(&self, _user_id: &str) -> Result<Vec<Roadmap>, StoreError> {
            Ok(Vec::new())
        }
        fn list_detailed_courses(
            &self,
            _user_id: &str,
        ) -> Result<Vec<DetailedCourse>, StoreError> {
            Err(fetch_error())
        }
        fn detailed_course_for_roadmap(
            &self,
            _roadmap_id: &str,
        ) -> Result<Option<DetailedCourse>, StoreError> {
            Ok(None)
        }
        fn save_roadmap(&self, _new: crate::types::NewRoadmap) -> Result<Roadmap, StoreError> {
            unimplemented!("not exercised")
        }
        fn save_detailed_course(
            &self,
            _new: crate::types::NewDetailedCourse,
        ) -> Result<DetailedCourse, StoreError> {
            unimplemented!("not exercised")
        }
        fn update_chapter_progress(
            &self,
            _roadmap_id: &str,
            _chapter_id: &str,
            _completed: bool,
        ) -> Result<(), StoreError> {
            unimplemented!("not exercised")
        }
        fn delete_roadmap(&self, _roadmap_id: &str) -> Result<(), StoreError> {
            unimplemented!("not exercised")
        }
    }

    #[tokio::test]
    async fn loads_both_collections_newest_first() {
        let store = Arc::new(MemoryStore::new());
        store.insert_roadmap(roadmap("jan", "u1", "Rust", "2024-01-01T00:00:00+00:00"));
        store.insert_roadmap(roadmap("feb", "u1", "Go", "2024-02-01T00:00:00+00:00"));

        let mut session = HistorySession::new();
        let request = session.set_identity(Some("u1".to_string())).unwrap();
        assert_eq!(*session.state(), LoadState::Loading);

        let result = load_history(&store, &request).await;
        session.complete(&request, result);

        assert_eq!(*session.state(), LoadState::Loaded);
        let ids: Vec<&str> = session.data().roadmaps.iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, ["feb", "jan"]);
    }

    #[tokio::test]
    async fn one_failed_leg_fails_the_whole_load() {
        let store = Arc::new(HalfBrokenStore);
        let mut session = HistorySession::new();
        let request = session.set_identity(Some("u1".to_string())).unwrap();

        let result = load_history(&store, &request).await;
        session.complete(&request, result);

        match session.state() {
            LoadState::Failed { message } => assert!(message.contains("connection refused")),
            other => panic!("expected Failed, got {other:?}"),
        }
    }

    #[test]
    fn retry_budget_is_spent_after_three_retries() {
        let mut session = HistorySession::new();
        let request = session.set_identity(Some("u1".to_string())).unwrap();
        session.complete(&request, Err(fetch_error()));

        for expected in 1..=MAX_RETRIES {
            assert!(session.can_retry());
            let request = session.retry().expect("retry within budget");
            assert_eq!(session.retry_count(), expected);
            session.complete(&request, Err(fetch_error()));
        }

        assert!(!session.can_retry());
        assert!(session.retry().is_none());
        assert_eq!(session.retry_count(), MAX_RETRIES);
        assert_eq!(session.retries_remaining(), 0);
    }

    #[test]
    fn successful_load_resets_the_retry_count() {
        let mut session = HistorySession::new();
        let request = session.set_identity(Some("u1".to_string())).unwrap();
        session.complete(&request, Err(fetch_error()));

        let request = session.retry().unwrap();
        assert_eq!(session.retry_count(), 1);
        session.complete(&request, Ok(HistoryData::default()));

        assert_eq!(session.retry_count(), 0);
        assert_eq!(*session.state(), LoadState::Loaded);
    }

    #[test]
    fn loaded_data_survives_a_failing_reload() {
        let mut session = HistorySession::new();
        let request = session.set_identity(Some("u1".to_string())).unwrap();
        session.complete(
            &request,
            Ok(HistoryData {
                roadmaps: vec![roadmap("r1", "u1", "Rust", "2024-01-01T00:00:00+00:00")],
                detailed_courses: Vec::new(),
            }),
        );

        let request = session.reload().unwrap();
        assert_eq!(*session.state(), LoadState::Loading);
        assert_eq!(session.data().roadmaps.len(), 1);

        session.complete(&request, Err(fetch_error()));
        assert!(matches!(session.state(), LoadState::Failed { .. }));
        // still renderable behind the error banner
        assert_eq!(session.data().roadmaps.len(), 1);
    }

    #[test]
    fn late_response_for_a_previous_identity_is_dropped() {
        let mut session = HistorySession::new();
        let u1_request = session.set_identity(Some("u1".to_string())).unwrap();
        let u2_request = session.set_identity(Some("u2".to_string())).unwrap();

        session.complete(
            &u1_request,
            Ok(HistoryData {
                roadmaps: vec![roadmap("r1", "u1", "Rust", "2024-01-01T00:00:00+00:00")],
                detailed_courses: Vec::new(),
            }),
        );
        assert_eq!(*session.state(), LoadState::Loading);
        assert!(session.data().roadmaps.is_empty());

        session.complete(
            &u2_request,
            Ok(HistoryData {
                roadmaps: vec![roadmap("r2", "u2", "Go", "2024-02-01T00:00:00+00:00")],
                detailed_courses: Vec::new(),
            }),
        );
        assert_eq!(*session.state(), LoadState::Loaded);
        assert_eq!(session.data().roadmaps[0].user_id, "u2");
    }

    #[test]
    fn logout_returns_to_idle_and_clears_data() {
        let mut session = HistorySession::new();
        let request = session.set_identity(Some("u1".to_string())).unwrap();
        session.complete(
            &request,
            Ok(HistoryData {
                roadmaps: vec![roadmap("r1", "u1", "Rust", "2024-01-01T00:00:00+00:00")],
                detailed_courses: Vec::new(),
            }),
        );

        assert!(session.set_identity(None).is_none());
        assert_eq!(*session.state(), LoadState::Idle);
        assert!(session.data().roadmaps.is_empty());

        // same identity again is a no-op
        session.set_identity(Some("u3".to_string()));
        assert!(session.set_identity(Some("u3".to_string())).is_none());
    }

    #[derive(Default)]
    struct RecordingActions {
        continued: Mutex<Vec<(String, String, String)>>,
        viewed: Mutex<Vec<String>>,
    }

    impl HistoryActions for RecordingActions {
        fn continue_learning(&self, subject: &str, difficulty: &str, roadmap_id: &str) {
            self.continued.lock().unwrap().push((
                subject.to_string(),
                difficulty.to_string(),
                roadmap_id.to_string(),
            ));
        }
        fn view_detailed_course(&self, course: &CourseBody) {
            self.viewed.lock().unwrap().push(course.title.clone());
        }
    }

    #[test]
    fn opening_a_roadmap_fires_the_callback() {
        let mut session = HistorySession::new();
        let request = session.set_identity(Some("u1".to_string())).unwrap();
        session.complete(
            &request,
            Ok(HistoryData {
                roadmaps: vec![roadmap("r1", "u1", "Rust", "2024-01-01T00:00:00+00:00")],
                detailed_courses: Vec::new(),
            }),
        );

        let actions = RecordingActions::default();
        assert!(session.open_roadmap("r1", &actions));
        assert!(!session.open_roadmap("missing", &actions));

        let fired = actions.continued.lock().unwrap();
        assert_eq!(fired.as_slice(), [(
            "Rust".to_string(),
            "beginner".to_string(),
            "r1".to_string()
        )]);
    }
}
