//! End-to-end build pipeline: topic → refine → search → curate → syllabus →
//! lessons → quizzes → reading list → manifest → QA.
//!
//! Stages run strictly in order, one outstanding call at a time. Per-item
//! failures degrade to documented fallbacks; only output-root creation and
//! required-artifact write failures propagate.

use std::path::PathBuf;

use serde_json::Value;
use tracing::{info, instrument, warn};

use courseforge_export::CourseDir;
use courseforge_license::{check, Allowlist, LicenseStatus};
use courseforge_model::{extract_json, TextGenerator};
use courseforge_search::{ContentSource, SearchHit};
use courseforge_shared::{CourseManifest, CuratedResource, LicenseTag, QaReport, Result};

use crate::{lesson, refiner, syllabus};

/// Largest notes excerpt included in a quiz prompt.
const MAX_QUIZ_NOTES_CHARS: usize = 3500;

// Stage progress fractions. Lessons span FRAC_SYLLABUS..FRAC_LESSONS_DONE
// and quizzes span FRAC_LESSONS_DONE..FRAC_QUIZZES_DONE.
const FRAC_RESET: f64 = 0.02;
const FRAC_REFINE: f64 = 0.05;
const FRAC_SEARCH: f64 = 0.10;
const FRAC_CURATE: f64 = 0.18;
const FRAC_SYLLABUS: f64 = 0.25;
const FRAC_LESSONS_DONE: f64 = 0.60;
const FRAC_QUIZZES_DONE: f64 = 0.90;
const FRAC_READING_LIST: f64 = 0.93;
const FRAC_MANIFEST: f64 = 0.97;

/// Configuration for one course build.
#[derive(Debug, Clone)]
pub struct BuildConfig {
    /// Raw course topic.
    pub topic: String,
    /// Number of weeks (≥ 1, enforced by the caller).
    pub weeks: u32,
    /// Lessons per week (≥ 1, enforced by the caller).
    pub lessons_per_week: u32,
    /// Advisory minimum curated-resource count; logged, never a hard gate.
    pub min_resources: u32,
    /// License tags this run accepts.
    pub allowlist: Allowlist,
    /// Output root directory, recreated each run.
    pub output_dir: PathBuf,
    /// Tool version recorded in the manifest.
    pub tool_version: String,
}

/// Result of a completed build.
#[derive(Debug)]
pub struct BuildResult {
    /// Always `"ok"` for a build that returns.
    pub status: String,
    /// Produced artifact roots (the output directory).
    pub artifacts: Vec<PathBuf>,
    /// The written manifest.
    pub manifest: CourseManifest,
    /// The written QA report.
    pub qa: QaReport,
}

/// Progress callback for reporting pipeline status.
///
/// Fractions are monotonically non-decreasing in `[0, 1]`; the final report
/// is exactly `1.0`.
pub trait ProgressReporter: Send + Sync {
    fn report(&self, message: &str, fraction: f64);
}

/// No-op progress reporter for headless/test usage.
pub struct SilentProgress;

impl ProgressReporter for SilentProgress {
    fn report(&self, _message: &str, _fraction: f64) {}
}

/// Run the full course build.
#[instrument(skip_all, fields(topic = %config.topic, weeks = config.weeks))]
pub async fn build_course(
    config: &BuildConfig,
    source: &dyn ContentSource,
    generator: &dyn TextGenerator,
    progress: &dyn ProgressReporter,
) -> Result<BuildResult> {
    let total_lessons = (config.weeks * config.lessons_per_week).max(1) as usize;
    let dir = CourseDir::new(config.output_dir.clone());

    info!(run_id = %dir.run_id(), topic = %config.topic, "starting course build");

    // --- Stage 1: Reset ---
    progress.report("Preparing output directory", FRAC_RESET);
    dir.reset()?;

    // --- Stage 2: Refine topic ---
    progress.report("Refining topic", FRAC_REFINE);
    let spec = refiner::refine_topic(
        generator,
        &config.topic,
        config.weeks,
        config.lessons_per_week,
    )
    .await;

    // --- Stage 3: Search ---
    progress.report("Searching for resources", FRAC_SEARCH);
    let max_results = 5usize.max(total_lessons + 3);
    let hits = source.search(&config.topic, max_results).await;
    info!(hits = hits.len(), "search complete");

    // --- Stage 4: Curate ---
    progress.report("Curating resources", FRAC_CURATE);
    let curated = curate(&config.topic, &hits, &config.allowlist);
    if curated.len() < config.min_resources as usize {
        warn!(
            curated = curated.len(),
            min_resources = config.min_resources,
            "fewer curated resources than requested"
        );
    }

    // --- Stage 5: Plan syllabus ---
    progress.report("Planning syllabus", FRAC_SYLLABUS);
    let plan = syllabus::plan_syllabus(
        &config.topic,
        config.weeks,
        config.lessons_per_week,
        &spec.subtopics,
        &curated,
    );
    let syllabus_json = dir.write_json("syllabus.json", &plan)?;
    let syllabus_markdown = syllabus::render_markdown(&plan);
    let syllabus_md = dir.write_text("syllabus.md", &syllabus_markdown)?;
    let syllabus_pdf =
        dir.render_document("syllabus.pdf", &syllabus_markdown, Some(&config.topic))?;

    // --- Stage 6: Author lessons ---
    let mut lesson_paths = Vec::new();
    let mut lesson_pdfs = Vec::new();
    let mut lesson_docs = Vec::new();
    let n = plan.lesson_count().max(1) as f64;

    for (i, (week, slot)) in plan.lessons().enumerate() {
        let fraction =
            FRAC_SYLLABUS + (FRAC_LESSONS_DONE - FRAC_SYLLABUS) * (i as f64 + 1.0) / n;
        progress.report(
            &format!("Authoring lesson {}/{}", i + 1, plan.lesson_count()),
            fraction,
        );

        let resource = &curated[(slot.lesson as usize - 1) % curated.len()];
        let markdown = lesson::author_lesson(source, slot, resource).await;

        let md_rel = format!("lessons/week_{}/lesson_{}.md", week.week, slot.lesson);
        let pdf_rel = format!("lessons/week_{}/lesson_{}.pdf", week.week, slot.lesson);
        lesson_paths.push(dir.write_text(&md_rel, &markdown)?);
        match dir.render_document(&pdf_rel, &markdown, Some(&slot.title)) {
            Ok(path) => lesson_pdfs.push(path),
            Err(e) => warn!(path = pdf_rel, error = %e, "lesson PDF render failed"),
        }
        lesson_docs.push(markdown);
    }

    // --- Stage 7: Quizzes ---
    let mut quiz_paths = Vec::new();
    let mut quiz_pdfs = Vec::new();

    for (i, (week, slot)) in plan.lessons().enumerate() {
        let fraction = FRAC_LESSONS_DONE
            + (FRAC_QUIZZES_DONE - FRAC_LESSONS_DONE) * (i as f64 + 1.0) / n;
        progress.report(
            &format!("Generating quiz {}/{}", i + 1, plan.lesson_count()),
            fraction,
        );

        let notes = truncate_chars(&lesson_docs[i], MAX_QUIZ_NOTES_CHARS);
        let quiz = generate_quiz(generator, &slot.title, &slot.objectives, notes).await;

        let json_rel = format!("quizzes/week_{}_lesson_{}.json", week.week, slot.lesson);
        let pdf_rel = format!("quizzes/week_{}_lesson_{}.pdf", week.week, slot.lesson);
        quiz_paths.push(dir.write_json(&json_rel, &quiz)?);
        match dir.render_quiz(&pdf_rel, &quiz, Some(&slot.title)) {
            Ok(path) => quiz_pdfs.push(path),
            Err(e) => warn!(path = pdf_rel, error = %e, "quiz PDF render failed"),
        }
    }

    // --- Stage 8: Reading list ---
    progress.report("Writing reading list", FRAC_READING_LIST);
    let reading_markdown = reading_list_markdown(&curated);
    let reading_list = dir.write_text("reading_list.md", &reading_markdown)?;
    let reading_list_pdf =
        dir.render_document("reading_list.pdf", &reading_markdown, Some("Reading List"))?;

    // --- Stage 9: Manifest ---
    progress.report("Writing manifest", FRAC_MANIFEST);
    let manifest = CourseManifest {
        topic: config.topic.clone(),
        weeks: config.weeks,
        lessons_per_week: config.lessons_per_week,
        lessons: lesson_paths,
        lesson_pdfs,
        quizzes: quiz_paths,
        quiz_pdfs,
        syllabus_md,
        syllabus_pdf,
        syllabus_json,
        reading_list,
        reading_list_pdf,
        licenses: config.allowlist.sorted_tags(),
        run_id: dir.run_id().clone(),
        generated_at: chrono::Utc::now(),
        tool_version: config.tool_version.clone(),
    };
    dir.write_json("course_manifest.json", &manifest)?;

    // --- Stage 10: QA ---
    let qa = qa_report(&curated, &config.allowlist);
    dir.write_json("qa_report.json", &qa)?;
    progress.report("Build complete", 1.0);

    info!(
        run_id = %dir.run_id(),
        lessons = manifest.lessons.len(),
        violations = qa.license_violations.len(),
        "course build complete"
    );

    Ok(BuildResult {
        status: "ok".to_string(),
        artifacts: vec![config.output_dir.clone()],
        manifest,
        qa,
    })
}

// ---------------------------------------------------------------------------
// Curation
// ---------------------------------------------------------------------------

/// Filter search hits through the license classifier against the allowlist.
///
/// Yields a single placeholder CC-BY-SA resource pointing at a canonical-URL
/// guess when nothing passes, so the build never halts for lack of sources.
fn curate(topic: &str, hits: &[SearchHit], allowlist: &Allowlist) -> Vec<CuratedResource> {
    let mut curated: Vec<CuratedResource> = hits
        .iter()
        .filter_map(|hit| {
            let result = check(&license_metadata(hit), allowlist);
            match result.status {
                LicenseStatus::Ok => Some(CuratedResource {
                    title: hit.title.clone(),
                    url: hit.url.clone(),
                    license: result.tag,
                    source: hit.source.clone(),
                }),
                LicenseStatus::Violation => {
                    warn!(title = %hit.title, tag = %result.tag, "resource rejected by allowlist");
                    None
                }
            }
        })
        .collect();

    if curated.is_empty() {
        warn!(topic, "no resources passed curation, synthesizing placeholder");
        curated.push(CuratedResource {
            title: topic.to_string(),
            url: courseforge_search::fallback_page_url(topic),
            license: LicenseTag::CcBySa,
            source: "wikipedia".to_string(),
        });
    }

    curated
}

/// License metadata string for a search hit. Providers with a known blanket
/// content license contribute it here.
fn license_metadata(hit: &SearchHit) -> String {
    match hit.source.as_str() {
        "wikipedia" => format!("{} CC BY-SA", hit.title),
        _ => hit.title.clone(),
    }
}

// ---------------------------------------------------------------------------
// Quiz generation
// ---------------------------------------------------------------------------

/// Request a quiz from the model and normalize whatever comes back.
///
/// An unparseable first response triggers one secondary direct call; if that
/// fails too, the normalizer's fallback quiz is used. Never fails.
async fn generate_quiz(
    generator: &dyn TextGenerator,
    title: &str,
    objectives: &[String],
    notes: &str,
) -> courseforge_quiz::Quiz {
    let parsed = match generator.generate(&quiz_prompt(title, objectives, notes)).await {
        Ok(text) => extract_json(&text),
        Err(e) => {
            warn!(title, error = %e, "quiz generation call failed");
            None
        }
    };

    let value = match parsed {
        Some(v) => v,
        None => {
            warn!(title, "quiz response unparseable, retrying with direct prompt");
            match generator.generate(&direct_quiz_prompt(title, objectives)).await {
                Ok(text) => extract_json(&text).unwrap_or(Value::Null),
                Err(_) => Value::Null,
            }
        }
    };

    courseforge_quiz::normalize(&value)
}

fn quiz_prompt(title: &str, objectives: &[String], notes: &str) -> String {
    format!(
        "Create exactly 5 multiple-choice items and 1 short-answer item for this lesson.\n\n\
         Title: {title}\n\
         Objectives: {objectives:?}\n\
         Notes: {notes}\n\n\
         Rules:\n\
         - For MCQs, choices must be plain text without letter prefixes.\n\
         - The field \"answer\" must be a 0-based integer index into \"choices\".\n\
         - Include a non-empty \"rationale\" for every MCQ.\n\
         - \"bloom\" must be one of: remember, understand, apply, analyze, evaluate, create.\n\
         - \"difficulty\" must be one of: easy, medium, hard.\n\
         - Return ONLY strict JSON.\n\n\
         Schema:\n\
         {{\"items\": [\n\
           {{\"type\":\"mcq\",\"question\":\"...\",\"choices\":[\"...\",\"...\",\"...\",\"...\"],\
           \"answer\":0,\"rationale\":\"...\",\"bloom\":\"understand\",\"difficulty\":\"medium\"}},\n\
           ... four more MCQs ...,\n\
           {{\"type\":\"short\",\"prompt\":\"...\"}}\n\
         ]}}"
    )
}

fn direct_quiz_prompt(title: &str, objectives: &[String]) -> String {
    format!(
        "Return ONLY a strict JSON object with an \"items\" array containing \
         exactly 5 MCQ items (fields: type=\"mcq\", question, choices[4], \
         answer, rationale, bloom, difficulty) and 1 short item (fields: \
         type=\"short\", prompt) for a lesson titled \"{title}\" with \
         objectives {objectives:?}."
    )
}

// ---------------------------------------------------------------------------
// Reading list & QA
// ---------------------------------------------------------------------------

fn reading_list_markdown(curated: &[CuratedResource]) -> String {
    let mut out = String::from("# Reading List\n");
    for resource in curated {
        out.push_str(&format!(
            "- {} — {} — {}\n",
            resource.title, resource.license, resource.url
        ));
    }
    out
}

/// Re-check every curated resource's title+license string post-hoc.
fn qa_report(curated: &[CuratedResource], allowlist: &Allowlist) -> QaReport {
    let license_violations = curated
        .iter()
        .filter(|r| {
            check(&format!("{} {}", r.title, r.license), allowlist).status
                == LicenseStatus::Violation
        })
        .cloned()
        .collect();

    QaReport { license_violations }
}

/// Char-boundary-safe prefix of at most `max` characters.
fn truncate_chars(s: &str, max: usize) -> &str {
    match s.char_indices().nth(max) {
        Some((idx, _)) => &s[..idx],
        None => s,
    }
}
