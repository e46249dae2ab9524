//! Course assembly core: topic refinement, syllabus planning, lesson
//! authoring, and the build orchestrator.

pub mod lesson;
pub mod pipeline;
pub mod refiner;
pub mod syllabus;
