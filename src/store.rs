//! Data access layer for the two learning tables.
//!
//! Operations are blocking; the retrieval layer fans them out onto blocking
//! tasks (`history::load_history`). "Detailed course not found" is a sentinel
//! (`Ok(None)`), never an error.

use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::client::SupabaseClient;
use crate::error::{BackendError, StoreError, StoreResult};
use crate::types::{DetailedCourse, NewDetailedCourse, NewRoadmap, Roadmap, RoadmapBody};

const ROADMAPS: &str = "roadmaps";
const DETAILED_COURSES: &str = "detailed_courses";

/// The five history operations plus the two save flows that feed them.
pub trait LearningStore: Send + Sync {
    /// A user's roadmaps, newest `created_at` first. Empty when they have none.
    fn list_roadmaps(&self, user_id: &str) -> StoreResult<Vec<Roadmap>>;

    /// A user's detailed courses, newest first, each carrying the parent
    /// roadmap's `subject`/`difficulty` when the parent still exists.
    fn list_detailed_courses(&self, user_id: &str) -> StoreResult<Vec<DetailedCourse>>;

    /// The detailed course generated from a roadmap, or `None`.
    fn detailed_course_for_roadmap(&self, roadmap_id: &str)
    -> StoreResult<Option<DetailedCourse>>;

    fn save_roadmap(&self, new: NewRoadmap) -> StoreResult<Roadmap>;

    fn save_detailed_course(&self, new: NewDetailedCourse) -> StoreResult<DetailedCourse>;

    /// Flip one chapter's completion flag and write the whole body back with
    /// a refreshed `updated_at`. An unknown `chapter_id` writes the list back
    /// unchanged. The read-modify-write is not atomic: two concurrent updates
    /// to different chapters of the same roadmap race, and the last writer
    /// wins on the whole chapter array. Accepted limitation.
    fn update_chapter_progress(
        &self,
        roadmap_id: &str,
        chapter_id: &str,
        completed: bool,
    ) -> StoreResult<()>;

    /// Delete the dependent detailed course (missing is fine), then the
    /// roadmap. A failure of the second step after the first succeeded
    /// surfaces as `StoreError::OrphanedDelete`.
    fn delete_roadmap(&self, roadmap_id: &str) -> StoreResult<()>;
}

/// `LearningStore` over the Supabase REST API.
#[derive(Clone)]
pub struct SupabaseStore {
    client: SupabaseClient,
}

#[derive(Serialize)]
struct TimestampedInsert<T: Serialize> {
    #[serde(flatten)]
    row: T,
    created_at: String,
    updated_at: String,
}

#[derive(Deserialize)]
struct BodyRow {
    roadmap_data: RoadmapBody,
}

impl SupabaseStore {
    pub fn new(client: SupabaseClient) -> Self {
        Self { client }
    }
}

impl LearningStore for SupabaseStore {
    fn list_roadmaps(&self, user_id: &str) -> StoreResult<Vec<Roadmap>> {
        tracing::debug!(user_id, "listing roadmaps");
        let user_filter = format!("eq.{user_id}");
        self.client
            .get_rows(
                ROADMAPS,
                &[
                    ("select", "*"),
                    ("user_id", user_filter.as_str()),
                    ("order", "created_at.desc"),
                ],
            )
            .map_err(StoreError::Fetch)
    }

    fn list_detailed_courses(&self, user_id: &str) -> StoreResult<Vec<DetailedCourse>> {
        tracing::debug!(user_id, "listing detailed courses");
        let user_filter = format!("eq.{user_id}");
        self.client
            .get_rows(
                DETAILED_COURSES,
                &[
                    ("select", "*,roadmaps(subject,difficulty)"),
                    ("user_id", user_filter.as_str()),
                    ("order", "created_at.desc"),
                ],
            )
            .map_err(StoreError::Fetch)
    }

    fn detailed_course_for_roadmap(
        &self,
        roadmap_id: &str,
    ) -> StoreResult<Option<DetailedCourse>> {
        tracing::debug!(roadmap_id, "looking up detailed course");
        let roadmap_filter = format!("eq.{roadmap_id}");
        self.client
            .get_single(
                DETAILED_COURSES,
                &[("select", "*"), ("roadmap_id", roadmap_filter.as_str())],
            )
            .map_err(StoreError::Fetch)
    }

    fn save_roadmap(&self, new: NewRoadmap) -> StoreResult<Roadmap> {
        tracing::info!(user_id = %new.user_id, subject = %new.subject, "saving roadmap");
        let now = Utc::now().to_rfc3339();
        let insert = TimestampedInsert {
            row: new,
            created_at: now.clone(),
            updated_at: now,
        };
        self.client
            .insert(ROADMAPS, &insert)
            .map_err(StoreError::Write)
    }

    fn save_detailed_course(&self, new: NewDetailedCourse) -> StoreResult<DetailedCourse> {
        tracing::info!(
            user_id = %new.user_id,
            roadmap_id = %new.roadmap_id,
            "saving detailed course"
        );
        let now = Utc::now().to_rfc3339();
        let insert = TimestampedInsert {
            row: new,
            created_at: now.clone(),
            updated_at: now,
        };
        self.client
            .insert(DETAILED_COURSES, &insert)
            .map_err(StoreError::Write)
    }

    fn update_chapter_progress(
        &self,
        roadmap_id: &str,
        chapter_id: &str,
        completed: bool,
    ) -> StoreResult<()> {
        tracing::info!(roadmap_id, chapter_id, completed, "updating chapter progress");

        let id_filter = format!("eq.{roadmap_id}");
        let row: BodyRow = self
            .client
            .get_single(ROADMAPS, &[("select", "roadmap_data"), ("id", id_filter.as_str())])
            .map_err(StoreError::Write)?
            .ok_or_else(|| {
                StoreError::Write(BackendError::Api {
                    code: BackendError::NO_ROWS_CODE.to_string(),
                    message: format!("roadmap {roadmap_id} not found"),
                })
            })?;

        let mut body = row.roadmap_data;
        for chapter in body.chapters.iter_mut() {
            if chapter.id == chapter_id {
                chapter.completed = completed;
            }
        }

        let patch = serde_json::json!({
            "roadmap_data": body,
            "updated_at": Utc::now().to_rfc3339(),
        });
        self.client
            .update(ROADMAPS, &[("id", id_filter.as_str())], &patch)
            .map_err(StoreError::Write)
    }

    fn delete_roadmap(&self, roadmap_id: &str) -> StoreResult<()> {
        tracing::info!(roadmap_id, "deleting roadmap and dependent course");

        let roadmap_filter = format!("eq.{roadmap_id}");
        self.client
            .delete(DETAILED_COURSES, &[("roadmap_id", roadmap_filter.as_str())])
            .map_err(StoreError::Write)?;

        // The course is gone. If this second delete fails the caller must
        // escalate; there is no compensating transaction.
        self.client
            .delete(ROADMAPS, &[("id", roadmap_filter.as_str())])
            .map_err(|source| {
                tracing::error!(roadmap_id, error = %source, "roadmap delete failed after course delete");
                StoreError::OrphanedDelete {
                    roadmap_id: roadmap_id.to_string(),
                    source,
                }
            })
    }
}


#[cfg(test)]
mod tests {
    use super::memory::MemoryStore;
    use super::*;
    use crate::types::Chapter;

    fn roadmap_fixture(id: &str, user: &str, subject: &str, created_at: &str) -> Roadmap {
        let chapters = vec![
            Chapter {
                id: "ch1".to_string(),
                title: "Intro".to_string(),
                ..Chapter::default()
            },
            Chapter {
                id: "ch2".to_string(),
                title: "Core".to_string(),
                ..Chapter::default()
            },
        ];
        Roadmap {
            id: id.to_string(),
            user_id: user.to_string(),
            subject: subject.to_string(),
            difficulty: "beginner".to_string(),
            roadmap_data: RoadmapBody {
                chapters,
                extra: Default::default(),
            },
            created_at: created_at.to_string(),
            updated_at: created_at.to_string(),
        }
    }

    fn course_fixture(id: &str, user: &str, roadmap_id: &str, created_at: &str) -> DetailedCourse {
        DetailedCourse {
            id: id.to_string(),
            user_id: user.to_string(),
            roadmap_id: roadmap_id.to_string(),
            course_data: Default::default(),
            created_at: created_at.to_string(),
            updated_at: created_at.to_string(),
            parent: None,
        }
    }

    #[test]
    fn roadmaps_come_back_newest_first() {
        let store = MemoryStore::new();
        store.insert_roadmap(roadmap_fixture("r1", "u1", "Rust", "2024-01-01T00:00:00+00:00"));
        store.insert_roadmap(roadmap_fixture("r2", "u1", "Go", "2024-02-01T00:00:00+00:00"));

        let rows = store.list_roadmaps("u1").unwrap();
        assert_eq!(
            rows.iter().map(|r| r.id.as_str()).collect::<Vec<_>>(),
            ["r2", "r1"]
        );
        assert!(store.list_roadmaps("u2").unwrap().is_empty());
    }

    #[test]
    fn course_list_embeds_parent_when_present() {
        let store = MemoryStore::new();
        store.insert_roadmap(roadmap_fixture("r1", "u1", "Rust", "2024-01-01T00:00:00+00:00"));
        store.insert_course(course_fixture("dc1", "u1", "r1", "2024-01-02T00:00:00+00:00"));
        store.insert_course(course_fixture("dc2", "u1", "gone", "2024-01-03T00:00:00+00:00"));

        let rows = store.list_detailed_courses("u1").unwrap();
        assert_eq!(rows.len(), 2);
        // newest first; its parent roadmap was deleted
        assert_eq!(rows[0].id, "dc2");
        assert!(rows[0].parent.is_none());
        assert_eq!(rows[1].parent.as_ref().unwrap().subject, "Rust");
    }

    #[test]
    fn delete_cascades_to_the_detailed_course() {
        let store = MemoryStore::new();
        store.insert_roadmap(roadmap_fixture("r1", "u1", "Rust", "2024-01-01T00:00:00+00:00"));
        store.insert_course(course_fixture("dc1", "u1", "r1", "2024-01-02T00:00:00+00:00"));

        store.delete_roadmap("r1").unwrap();
        assert!(store.detailed_course_for_roadmap("r1").unwrap().is_none());
        assert!(store.list_roadmaps("u1").unwrap().is_empty());
    }

    #[test]
    fn progress_update_flips_only_the_matching_chapter() {
        let store = MemoryStore::new();
        store.insert_roadmap(roadmap_fixture("r1", "u1", "Rust", "2024-01-01T00:00:00+00:00"));

        store.update_chapter_progress("r1", "ch2", true).unwrap();

        let roadmap = store.roadmap("r1").unwrap();
        let chapters = &roadmap.roadmap_data.chapters;
        assert!(!chapters[0].completed);
        assert!(chapters[1].completed);
        assert!(roadmap.updated_at > roadmap.created_at);
    }

    #[test]
    fn unknown_chapter_is_a_no_op_write() {
        let store = MemoryStore::new();
        store.insert_roadmap(roadmap_fixture("r1", "u1", "Rust", "2024-01-01T00:00:00+00:00"));

        store.update_chapter_progress("r1", "nope", true).unwrap();

        let roadmap = store.roadmap("r1").unwrap();
        assert!(roadmap.roadmap_data.chapters.iter().all(|c| !c.completed));
    }

    #[test]
    fn progress_update_on_missing_roadmap_is_a_write_error() {
        let store = MemoryStore::new();
        let err = store.update_chapter_progress("r9", "ch1", true).unwrap_err();
        assert!(matches!(err, StoreError::Write(_)));
    }
}
