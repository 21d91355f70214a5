use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// A saved, multi-chapter learning plan. Row of the `roadmaps` table.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Roadmap {
    pub id: String,
    pub user_id: String,
    pub subject: String,
    pub difficulty: String,
    pub roadmap_data: RoadmapBody,
    pub created_at: String,
    pub updated_at: String,
}

/// Enhanced, lesson-level content generated from a roadmap. Row of the
/// `detailed_courses` table. `roadmap_id` is a weak reference: the parent
/// roadmap owns the cascade, not this record.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct DetailedCourse {
    pub id: String,
    pub user_id: String,
    pub roadmap_id: String,
    pub course_data: CourseBody,
    pub created_at: String,
    pub updated_at: String,
    /// Parent `subject`/`difficulty` embedded by the list query. Absent when
    /// the query did not ask for the join or the parent is gone.
    #[serde(rename = "roadmaps", default, skip_serializing_if = "Option::is_none")]
    pub parent: Option<ParentRoadmap>,
}

/// The joined columns PostgREST embeds under the parent table's name.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ParentRoadmap {
    pub subject: String,
    pub difficulty: String,
}

/// The `roadmap_data` JSON blob. Keys the web client wrote that we do not
/// model are kept in `extra` so a read-modify-write round trip preserves them.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct RoadmapBody {
    #[serde(default)]
    pub chapters: Vec<Chapter>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// One chapter of a roadmap. The blob keys are camelCase (written by the
/// original web client), and everything but `id` is optional in practice.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Chapter {
    pub id: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub estimated_time: String,
    #[serde(default)]
    pub difficulty: String,
    #[serde(default)]
    pub topics: Vec<String>,
    #[serde(default)]
    pub completed: bool,
    #[serde(default)]
    pub has_detailed_content: bool,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// The `course_data` JSON blob of a detailed course.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CourseBody {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub chapters: Vec<CourseChapter>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// A roadmap chapter enriched with lesson-level content.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CourseChapter {
    pub id: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub estimated_time: String,
    #[serde(default)]
    pub difficulty: String,
    #[serde(default)]
    pub topics: Vec<String>,
    #[serde(default)]
    pub completed: bool,
    #[serde(default)]
    pub has_detailed_content: bool,
    #[serde(default)]
    pub detailed_lessons: Vec<Lesson>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Lesson {
    pub id: String,
    pub title: String,
    pub content: String,
}

/// Insert payload for a new roadmap. Timestamps are set by the store.
#[derive(Clone, Debug, Serialize)]
pub struct NewRoadmap {
    pub user_id: String,
    pub subject: String,
    pub difficulty: String,
    pub roadmap_data: RoadmapBody,
}

/// Insert payload for a new detailed course.
#[derive(Clone, Debug, Serialize)]
pub struct NewDetailedCourse {
    pub user_id: String,
    pub roadmap_id: String,
    pub course_data: CourseBody,
}

impl CourseChapter {
    /// Lift a plain roadmap chapter into a course chapter, keeping its blob.
    pub fn from_chapter(chapter: Chapter, lessons: Vec<Lesson>) -> Self {
        Self {
            id: chapter.id,
            title: chapter.title,
            description: chapter.description,
            estimated_time: chapter.estimated_time,
            difficulty: chapter.difficulty,
            topics: chapter.topics,
            completed: chapter.completed,
            has_detailed_content: true,
            detailed_lessons: lessons,
            extra: chapter.extra,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn roadmap_body_preserves_unknown_keys() {
        let blob = json!({
            "chapters": [{ "id": "c1", "title": "Intro", "completed": true }],
            "generatedBy": "web-client",
            "revision": 3
        });
        let body: RoadmapBody = serde_json::from_value(blob).unwrap();
        assert_eq!(body.chapters.len(), 1);
        assert!(body.chapters[0].completed);

        let round = serde_json::to_value(&body).unwrap();
        assert_eq!(round["generatedBy"], "web-client");
        assert_eq!(round["revision"], 3);
        assert_eq!(round["chapters"][0]["id"], "c1");
    }

    #[test]
    fn detailed_course_parses_embedded_parent() {
        let row = json!({
            "id": "dc1",
            "user_id": "u1",
            "roadmap_id": "r1",
            "course_data": { "title": "Rust", "description": "", "chapters": [] },
            "created_at": "2024-02-01T00:00:00+00:00",
            "updated_at": "2024-02-01T00:00:00+00:00",
            "roadmaps": { "subject": "Rust", "difficulty": "beginner" }
        });
        let course: DetailedCourse = serde_json::from_value(row).unwrap();
        let parent = course.parent.expect("embedded parent");
        assert_eq!(parent.subject, "Rust");
    }

    #[test]
    fn missing_parent_is_tolerated() {
        let row = json!({
            "id": "dc1",
            "user_id": "u1",
            "roadmap_id": "r1",
            "course_data": {},
            "created_at": "2024-02-01T00:00:00+00:00",
            "updated_at": "2024-02-01T00:00:00+00:00"
        });
        let course: DetailedCourse = serde_json::from_value(row).unwrap();
        assert!(course.parent.is_none());
    }
}
