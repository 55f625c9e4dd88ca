//! Course data model.

use serde::{Deserialize, Serialize};

/// One lesson of a course.
///
/// Serialized field names match the `lessons_json` payload stored on catalog
/// records.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Lesson {
    /// Positive lesson number, unique within its course
    pub lesson_number: u32,

    #[serde(rename = "lesson_title", default)]
    pub title: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lesson_link: Option<String>,
}

/// A course; its title is the identity used everywhere.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Course {
    pub title: String,

    #[serde(default)]
    pub course_link: Option<String>,

    #[serde(default)]
    pub instructor: Option<String>,

    /// Lessons in ascending lesson-number order
    #[serde(default)]
    pub lessons: Vec<Lesson>,
}

impl Course {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            course_link: None,
            instructor: None,
            lessons: Vec::new(),
        }
    }

    /// Lesson by number, if present.
    pub fn lesson(&self, lesson_number: u32) -> Option<&Lesson> {
        self.lessons
            .iter()
            .find(|lesson| lesson.lesson_number == lesson_number)
    }

    /// Sort lessons by number (numbers need not be contiguous).
    pub fn sort_lessons(&mut self) {
        self.lessons.sort_by_key(|lesson| lesson.lesson_number);
    }
}

/// One indexed passage of course text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CourseChunk {
    pub content: String,
    pub course_title: String,
    pub lesson_number: Option<u32>,

    /// Zero-based position, unique within the course
    pub chunk_index: usize,
}

impl CourseChunk {
    /// Backend id of this chunk (`<course>_<chunk_index>`).
    pub fn id(&self) -> String {
        format!("{}_{}", self.course_title.replace(' ', "_"), self.chunk_index)
    }
}
