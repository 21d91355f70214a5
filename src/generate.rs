//! Simulated generation flows.
//!
//! Stand-ins for the real AI generation backend: a starter chapter plan and
//! a lesson-level detailed course, each behind an artificial delay. These are
//! plain futures; dropping one (the caller navigated away) abandons the
//! simulated call, nothing keeps running detached.

use std::time::Duration;

use tokio::time::sleep;
use ulid::Ulid;

use crate::types::{Chapter, CourseBody, CourseChapter, Lesson, Roadmap};

pub const CHAPTER_DELAY: Duration = Duration::from_secs(1);
pub const COURSE_DELAY: Duration = Duration::from_secs(3);

/// Produce the starter three-chapter plan for a fresh roadmap.
pub async fn generate_chapters(subject: &str) -> Vec<Chapter> {
    sleep(CHAPTER_DELAY).await;
    starter_chapters(subject)
}

/// Produce lesson-level content for every chapter of a roadmap.
pub async fn generate_detailed_course(roadmap: &Roadmap) -> CourseBody {
    sleep(COURSE_DELAY).await;

    let chapters = roadmap
        .roadmap_data
        .chapters
        .iter()
        .cloned()
        .map(|chapter| {
            let lessons = starter_lessons(&chapter.title);
            CourseChapter::from_chapter(chapter, lessons)
        })
        .collect();

    CourseBody {
        title: roadmap.subject.clone(),
        description: format!(
            "Lesson-level content generated from the {} roadmap",
            roadmap.subject
        ),
        chapters,
        extra: Default::default(),
    }
}

fn starter_chapters(subject: &str) -> Vec<Chapter> {
    let plan = [
        (
            format!("Introduction to {subject}"),
            "Get started with the fundamentals and core concepts",
            "2-3 hours",
            "Beginner",
            vec!["Overview", "History", "Key Concepts", "Getting Started"],
        ),
        (
            "Core Principles".to_string(),
            "Deep dive into the essential principles and methodologies",
            "4-5 hours",
            "Intermediate",
            vec!["Fundamental Laws", "Best Practices", "Common Patterns"],
        ),
        (
            "Practical Applications".to_string(),
            "Apply your knowledge through hands-on projects and examples",
            "6-8 hours",
            "Advanced",
            vec!["Real-world Projects", "Case Studies", "Problem Solving"],
        ),
    ];

    plan.into_iter()
        .map(|(title, description, estimated_time, difficulty, topics)| Chapter {
            id: Ulid::new().to_string(),
            title,
            description: description.to_string(),
            estimated_time: estimated_time.to_string(),
            difficulty: difficulty.to_string(),
            topics: topics.into_iter().map(str::to_string).collect(),
            completed: false,
            has_detailed_content: false,
            extra: Default::default(),
        })
        .collect()
}

fn starter_lessons(chapter_title: &str) -> Vec<Lesson> {
    vec![
        Lesson {
            id: Ulid::new().to_string(),
            title: format!("{chapter_title}: walkthrough"),
            content: format!("Guided walkthrough of {chapter_title}."),
        },
        Lesson {
            id: Ulid::new().to_string(),
            title: format!("{chapter_title}: exercises"),
            content: format!("Practice exercises covering {chapter_title}."),
        },
    ]
}
