//! CLI command handlers: wire the store, the retrieval state machine and the
//! derivation functions into text output.

use std::error::Error;
use std::sync::Arc;

use tokio::task;

use crate::cli::{
    BackendArguments, DeleteArguments, EnhanceArguments, HistoryArguments, ProgressArguments, Tab,
};
use crate::client::SupabaseClient;
use crate::error::StoreError;
use crate::generate::generate_detailed_course;
use crate::history::{
    HistoryActions, HistoryData, HistorySession, LoadState, MAX_RETRIES, load_history,
};
use crate::present::{Category, categorize, difficulty_band, format_date, progress_percent};
use crate::store::{LearningStore, SupabaseStore};
use crate::types::{CourseBody, NewDetailedCourse};

type CommandResult = Result<(), Box<dyn Error>>;

fn store_for(backend: &BackendArguments) -> Result<Arc<SupabaseStore>, Box<dyn Error>> {
    backend.validate()?;
    let client = SupabaseClient::new(backend.to_config());
    Ok(Arc::new(SupabaseStore::new(client)))
}

/// Prints the fire-and-forget navigation signals a UI would route on.
struct NavigationPrinter;

impl HistoryActions for NavigationPrinter {
    fn continue_learning(&self, subject: &str, difficulty: &str, roadmap_id: &str) {
        println!("-> continue learning: {subject} ({difficulty}), roadmap {roadmap_id}");
    }

    fn view_detailed_course(&self, course: &CourseBody) {
        println!("-> view detailed course: {}", course.title);
    }
}

pub async fn history(backend: &BackendArguments, args: &HistoryArguments) -> CommandResult {
    let store = store_for(backend)?;
    let mut session = HistorySession::new();

    let Some(mut request) = session.set_identity(Some(args.user.clone())) else {
        return Ok(());
    };

    loop {
        let result = load_history(&store, &request).await;
        session.complete(&request, result);
        if !matches!(session.state(), LoadState::Failed { .. }) {
            break;
        }
        match session.retry() {
            Some(next) => {
                tracing::warn!(
                    retry = session.retry_count(),
                    max_retries = MAX_RETRIES,
                    "history load failed, retrying"
                );
                request = next;
            }
            None => break,
        }
    }

    match session.state() {
        LoadState::Loaded => {
            match args.tab {
                Tab::Roadmaps => render_roadmaps(session.data()),
                Tab::Courses => render_courses(session.data()),
            }
            if let Some(roadmap_id) = &args.open {
                if !session.open_roadmap(roadmap_id, &NavigationPrinter) {
                    println!("roadmap {roadmap_id} is not in this history");
                }
            }
            Ok(())
        }
        LoadState::Failed { message } => {
            println!("Failed to load learning history: {message}");
            println!(
                "Retries used: {} of {}. No retries left.",
                session.retry_count(),
                MAX_RETRIES
            );
            Err(message.clone().into())
        }
        _ => Ok(()),
    }
}

fn render_roadmaps(data: &HistoryData) {
    if data.roadmaps.is_empty() {
        println!("No roadmaps yet.");
        return;
    }
    println!("Roadmaps ({}):", data.roadmaps.len());
    for roadmap in &data.roadmaps {
        let category = categorize(&roadmap.subject);
        let band = difficulty_band(&roadmap.difficulty);
        let percent = progress_percent(&roadmap.roadmap_data.chapters);
        println!(
            "  [{category}] {} | {band} | {percent}% complete | started {}",
            roadmap.subject,
            format_date(&roadmap.created_at)
        );
    }
}

fn render_courses(data: &HistoryData) {
    if data.detailed_courses.is_empty() {
        println!("No detailed courses yet.");
        return;
    }
    println!("Detailed courses ({}):", data.detailed_courses.len());
    for course in &data.detailed_courses {
        // the parent roadmap may have been deleted under the course
        let (category, band) = match &course.parent {
            Some(parent) => (categorize(&parent.subject), difficulty_band(&parent.difficulty)),
            None => (Category::General, difficulty_band("")),
        };
        let title = if course.course_data.title.is_empty() {
            course
                .parent
                .as_ref()
                .map(|p| p.subject.as_str())
                .unwrap_or("Untitled course")
        } else {
            &course.course_data.title
        };
        println!(
            "  [{category}] {title} | {band} | {} chapters | created {}",
            course.course_data.chapters.len(),
            format_date(&course.created_at)
        );
    }
}

pub async fn progress(backend: &BackendArguments, args: &ProgressArguments) -> CommandResult {
    let store = store_for(backend)?;

    let roadmap_id = args.roadmap.clone();
    let chapter_id = args.chapter.clone();
    let completed = args.completed;
    task::spawn_blocking(move || store.update_chapter_progress(&roadmap_id, &chapter_id, completed))
        .await??;

    println!(
        "Chapter {} of roadmap {} marked {}.",
        args.chapter,
        args.roadmap,
        if args.completed { "complete" } else { "incomplete" }
    );
    Ok(())
}

pub async fn enhance(backend: &BackendArguments, args: &EnhanceArguments) -> CommandResult {
    let store = store_for(backend)?;

    let existing = task::spawn_blocking({
        let store = Arc::clone(&store);
        let roadmap_id = args.roadmap.clone();
        move || store.detailed_course_for_roadmap(&roadmap_id)
    })
    .await??;
    if existing.is_some() {
        println!("Roadmap {} already has a detailed course.", args.roadmap);
        return Ok(());
    }

    let roadmaps = task::spawn_blocking({
        let store = Arc::clone(&store);
        let user_id = args.user.clone();
        move || store.list_roadmaps(&user_id)
    })
    .await??;
    let Some(roadmap) = roadmaps.into_iter().find(|r| r.id == args.roadmap) else {
        return Err(format!("roadmap {} not found for user {}", args.roadmap, args.user).into());
    };

    println!("Generating detailed course for {}...", roadmap.subject);
    let course_data = generate_detailed_course(&roadmap).await;

    let new = NewDetailedCourse {
        user_id: args.user.clone(),
        roadmap_id: roadmap.id.clone(),
        course_data,
    };
    let saved = task::spawn_blocking({
        let store = Arc::clone(&store);
        move || store.save_detailed_course(new)
    })
    .await??;

    println!(
        "Saved detailed course {} ({} chapters).",
        saved.id,
        saved.course_data.chapters.len()
    );
    Ok(())
}

pub async fn delete(backend: &BackendArguments, args: &DeleteArguments) -> CommandResult {
    let store = store_for(backend)?;

    let roadmap_id = args.roadmap.clone();
    let result = task::spawn_blocking(move || store.delete_roadmap(&roadmap_id)).await?;

    match result {
        Ok(()) => {
            println!(
                "Deleted roadmap {} and its detailed course (if any).",
                args.roadmap
            );
            Ok(())
        }
        Err(err @ StoreError::OrphanedDelete { .. }) => {
            // half-applied cascade: escalate, never swallow
            tracing::error!(error = %err, "delete left an orphaned state, manual reconciliation needed");
            Err(err.into())
        }
        Err(err) => Err(err.into()),
    }
}
