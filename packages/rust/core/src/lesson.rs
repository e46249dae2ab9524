//! Lesson authoring: one syllabus slot + one curated resource → a
//! fixed-structure Markdown document.
//!
//! Everything here is best-effort. A failed fetch degrades to the bare
//! resource title; missing usable sections degrade to a thirds split of the
//! cleaned full text. Authoring itself never fails.

use tracing::{debug, instrument, warn};

use courseforge_license::license_url;
use courseforge_search::{ContentSource, Section, SourceDocument};
use courseforge_shared::{CuratedResource, LessonSpec};
use courseforge_text as text;

/// Fixed ordered list of common section headers probed for core content.
const SECTION_PROBES: [&str; 10] = [
    "Overview",
    "Background",
    "History",
    "Mechanism",
    "Process",
    "Structure",
    "Function",
    "Applications",
    "Types",
    "Examples",
];

/// Sections shorter than this are too thin to serve as a content axis.
const MIN_SECTION_CHARS: usize = 200;

/// At most this many named content axes per lesson.
const MAX_AXES: usize = 3;

/// At most this many key-concept sentences per lesson.
const MAX_KEY_CONCEPTS: usize = 5;

/// Labels for the thirds fallback when no named section qualifies.
const THIRDS_LABELS: [&str; 3] = ["Foundations", "Practice", "Implications"];

/// One thematic subsection of core lesson content.
#[derive(Debug, Clone, PartialEq)]
pub struct Axis {
    pub heading: String,
    pub body: String,
}

/// Author the Markdown document for one lesson.
#[instrument(skip(source, lesson, resource), fields(lesson = lesson.lesson))]
pub async fn author_lesson(
    source: &dyn ContentSource,
    lesson: &LessonSpec,
    resource: &CuratedResource,
) -> String {
    let doc = match source.fetch(&resource.title).await {
        Ok(doc) => doc,
        Err(e) => {
            warn!(title = %resource.title, error = %e, "fetch failed, using bare title");
            bare_document(resource)
        }
    };

    let summary = {
        let s = text::clean(&text::dedupe_lines(&doc.summary));
        if s.is_empty() {
            resource.title.clone()
        } else {
            s
        }
    };

    let axes = content_axes(&doc);
    let concepts = key_concepts(&summary, &axes);
    debug!(axes = axes.len(), concepts = concepts.len(), "lesson content derived");

    render(lesson, resource, &summary, &axes, &concepts)
}

/// Stand-in document when the fetch fails: the title is all we have.
fn bare_document(resource: &CuratedResource) -> SourceDocument {
    SourceDocument {
        title: resource.title.clone(),
        url: resource.url.clone(),
        summary: resource.title.clone(),
        full_text: resource.title.clone(),
        sections: Vec::new(),
    }
}

/// Extract up to [`MAX_AXES`] content axes from a fetched document.
///
/// Probes the fixed header list in order, keeping sections that exceed the
/// minimum length. Falls back to a labeled thirds split of the cleaned full
/// text when no named section qualifies.
pub fn content_axes(doc: &SourceDocument) -> Vec<Axis> {
    let mut axes = Vec::new();

    for probe in SECTION_PROBES {
        if axes.len() == MAX_AXES {
            break;
        }
        if let Some(section) = probe_section(&doc.sections, probe) {
            let body = text::clean(&section.body);
            if body.len() >= MIN_SECTION_CHARS {
                axes.push(Axis {
                    heading: section.heading.clone(),
                    body,
                });
            }
        }
    }

    if axes.is_empty() {
        return thirds_fallback(&doc.full_text);
    }
    axes
}

/// Case-insensitive lookup of a section whose heading contains the probe.
fn probe_section<'a>(sections: &'a [Section], probe: &str) -> Option<&'a Section> {
    let probe = probe.to_lowercase();
    sections
        .iter()
        .find(|s| s.heading.to_lowercase().contains(&probe))
}

/// Split cleaned sentences into three roughly equal labeled buckets.
fn thirds_fallback(full_text: &str) -> Vec<Axis> {
    let sentences = text::segment_sentences(&text::clean(full_text));
    if sentences.is_empty() {
        return Vec::new();
    }

    let per_bucket = sentences.len().div_ceil(THIRDS_LABELS.len());
    sentences
        .chunks(per_bucket)
        .zip(THIRDS_LABELS)
        .map(|(bucket, label)| Axis {
            heading: label.to_string(),
            body: bucket.join(" "),
        })
        .collect()
}

/// Up to [`MAX_KEY_CONCEPTS`] leading sentences from the summary and axes,
/// first occurrence wins.
fn key_concepts(summary: &str, axes: &[Axis]) -> Vec<String> {
    let mut concepts: Vec<String> = Vec::new();

    let mut push = |sentence: Option<String>| {
        if let Some(s) = sentence {
            if concepts.len() < MAX_KEY_CONCEPTS && !s.is_empty() && !concepts.contains(&s) {
                concepts.push(s);
            }
        }
    };

    for sentence in text::segment_sentences(summary).into_iter().take(2) {
        push(Some(sentence));
    }
    for axis in axes {
        push(text::segment_sentences(&axis.body).into_iter().next());
    }

    concepts
}

/// Assemble the fixed-structure lesson document.
fn render(
    lesson: &LessonSpec,
    resource: &CuratedResource,
    summary: &str,
    axes: &[Axis],
    concepts: &[String],
) -> String {
    let mut md = format!("# {}\n\n## Objectives\n", lesson.title);
    for objective in &lesson.objectives {
        md.push_str(&format!("- {objective}\n"));
    }

    md.push_str(&format!("\n## Overview\n{summary}\n"));

    md.push_str("\n## Key Concepts\n");
    for concept in concepts {
        md.push_str(&format!("- {concept}\n"));
    }

    md.push_str("\n## Core Content\n");
    for axis in axes {
        md.push_str(&format!("\n### {}\n{}\n", axis.heading, axis.body));
    }

    md.push_str(
        "\n## Self-Check\n\
         1. Restate each objective of this lesson in your own words.\n\
         2. Define three key terms introduced above.\n\
         3. Give one real-world example that illustrates the core content.\n",
    );

    md.push_str(&format!(
        "\n## Attribution\n{} — {} — {} — License: {}\n",
        resource.title,
        resource.license,
        resource.url,
        license_url(resource.license)
    ));

    md
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use courseforge_search::SearchHit;
    use courseforge_shared::{CourseForgeError, LicenseTag, Result};

    struct FakeSource {
        doc: Option<SourceDocument>,
    }

    #[async_trait]
    impl ContentSource for FakeSource {
        async fn search(&self, _query: &str, _max_results: usize) -> Vec<SearchHit> {
            Vec::new()
        }

        async fn fetch(&self, title: &str) -> Result<SourceDocument> {
            self.doc
                .clone()
                .ok_or_else(|| CourseForgeError::Network(format!("no page for {title}")))
        }
    }

    fn lesson() -> LessonSpec {
        LessonSpec {
            lesson: 1,
            title: "Photosynthesis: Light reactions".to_string(),
            objectives: vec![
                "State key ideas of Light reactions".to_string(),
                "Use terminology for Light reactions".to_string(),
                "Answer formative questions".to_string(),
            ],
        }
    }

    fn resource() -> CuratedResource {
        CuratedResource {
            title: "Photosynthesis".to_string(),
            url: "https://en.wikipedia.org/wiki/Photosynthesis".to_string(),
            license: LicenseTag::CcBySa,
            source: "wikipedia".to_string(),
        }
    }

    fn long(sentence: &str) -> String {
        sentence.repeat(10)
    }

    #[test]
    fn axes_prefer_probed_sections_over_thirds() {
        let doc = SourceDocument {
            title: "T".into(),
            url: "u".into(),
            summary: "Summary.".into(),
            full_text: "irrelevant".into(),
            sections: vec![
                Section {
                    heading: "Etymology".into(),
                    body: long("Not in the probe list. "),
                },
                Section {
                    heading: "Overview".into(),
                    body: long("The overview body sentence. "),
                },
                Section {
                    heading: "History".into(),
                    body: "too short".into(),
                },
                Section {
                    heading: "Applications".into(),
                    body: long("Practical uses abound. "),
                },
            ],
        };

        let axes = content_axes(&doc);
        let headings: Vec<&str> = axes.iter().map(|a| a.heading.as_str()).collect();
        // Probe order wins; the short History section is skipped.
        assert_eq!(headings, vec!["Overview", "Applications"]);
    }

    #[test]
    fn axes_fall_back_to_labeled_thirds() {
        let doc = SourceDocument {
            title: "T".into(),
            url: "u".into(),
            summary: "S.".into(),
            full_text: "One. Two. Three. Four. Five. Six.".into(),
            sections: Vec::new(),
        };

        let axes = content_axes(&doc);
        let headings: Vec<&str> = axes.iter().map(|a| a.heading.as_str()).collect();
        assert_eq!(headings, vec!["Foundations", "Practice", "Implications"]);
        assert_eq!(axes[0].body, "One. Two.");
    }

    #[test]
    fn key_concepts_capped_at_five_and_deduped() {
        let axes: Vec<Axis> = (0..6)
            .map(|i| Axis {
                heading: format!("H{i}"),
                body: format!("Axis sentence {i}. More text."),
            })
            .collect();

        let concepts = key_concepts("Lead one. Lead two. Lead three.", &axes);
        assert_eq!(concepts.len(), 5);
        assert_eq!(concepts[0], "Lead one.");
        assert_eq!(concepts[2], "Axis sentence 0.");
    }

    #[tokio::test]
    async fn authored_lesson_has_fixed_structure() {
        let source = FakeSource {
            doc: Some(SourceDocument {
                title: "Photosynthesis".into(),
                url: "https://en.wikipedia.org/wiki/Photosynthesis".into(),
                summary: "Photosynthesis converts light into chemical energy. \
                          It sustains most life on Earth."
                    .into(),
                full_text: String::new(),
                sections: vec![Section {
                    heading: "Overview".into(),
                    body: long("Light-dependent reactions occur in thylakoids. "),
                }],
            }),
        };

        let md = author_lesson(&source, &lesson(), &resource()).await;
        for heading in [
            "# Photosynthesis: Light reactions",
            "## Objectives",
            "## Overview",
            "## Key Concepts",
            "## Core Content",
            "## Self-Check",
            "## Attribution",
        ] {
            assert!(md.contains(heading), "missing {heading}");
        }
        assert!(md.contains(
            "Photosynthesis — CC-BY-SA — https://en.wikipedia.org/wiki/Photosynthesis \
             — License: https://creativecommons.org/licenses/by-sa/4.0/"
        ));
    }

    #[tokio::test]
    async fn fetch_failure_degrades_to_bare_title() {
        let source = FakeSource { doc: None };
        let md = author_lesson(&source, &lesson(), &resource()).await;

        assert!(md.contains("## Overview\nPhotosynthesis\n"));
        assert!(md.contains("## Attribution"));
    }
}
