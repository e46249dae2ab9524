//! Deterministic syllabus planning.
//!
//! Lesson numbers are assigned 1..N in week-major, lesson-minor order. Base
//! titles come from the refined subtopic list when present (cycled modulo
//! its length), else from curated-resource titles (cycled modulo their
//! count). Objectives are three fixed templates parameterized by the base
//! title, so two runs over the same inputs produce identical syllabi.

use courseforge_shared::{CuratedResource, LessonSpec, Syllabus, Week};

/// Plan the full syllabus for a course run.
pub fn plan_syllabus(
    topic: &str,
    weeks: u32,
    lessons_per_week: u32,
    subtopics: &[String],
    curated: &[CuratedResource],
) -> Syllabus {
    let curated_titles: Vec<&str> = curated.iter().map(|r| r.title.as_str()).collect();
    let bases: Vec<&str> = if !subtopics.is_empty() {
        subtopics.iter().map(String::as_str).collect()
    } else if !curated_titles.is_empty() {
        curated_titles
    } else {
        vec![topic]
    };

    let mut k: u32 = 0;
    let weeks_list = (1..=weeks)
        .map(|week| {
            let lessons = (1..=lessons_per_week)
                .map(|_| {
                    k += 1;
                    let base = bases[(k as usize - 1) % bases.len()];
                    LessonSpec {
                        lesson: k,
                        title: format!("{topic}: {base}"),
                        objectives: objectives_for(base),
                    }
                })
                .collect();
            Week { week, lessons }
        })
        .collect();

    Syllabus {
        topic: topic.to_string(),
        weeks: weeks_list,
    }
}

/// The three template objectives for a lesson with the given base title.
fn objectives_for(base: &str) -> Vec<String> {
    vec![
        format!("State key ideas of {base}"),
        format!("Use terminology for {base}"),
        "Answer formative questions".to_string(),
    ]
}

/// Render the syllabus as a Markdown outline.
pub fn render_markdown(syllabus: &Syllabus) -> String {
    let mut out = format!("# {}\n", syllabus.topic);
    for week in &syllabus.weeks {
        out.push_str(&format!("\n## Week {}\n", week.week));
        for lesson in &week.lessons {
            out.push_str(&format!("- {}\n", lesson.title));
        }
    }
    out
}
