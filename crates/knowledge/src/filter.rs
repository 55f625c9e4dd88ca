//! Structural filters over passage metadata.

use crate::vector_index::Metadata;
use serde_json::{json, Value};

/// Equality filter on content metadata.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Filter {
    /// `course_title == value`
    CourseTitle(String),

    /// `lesson_number == value`
    LessonNumber(u32),

    /// Every inner filter must hold
    And(Vec<Filter>),
}

impl Filter {
    /// Whether a metadata map satisfies this filter.
    pub fn matches(&self, metadata: &Metadata) -> bool {
        match self {
            Filter::CourseTitle(title) => {
                metadata.get("course_title").and_then(Value::as_str) == Some(title.as_str())
            }
            Filter::LessonNumber(number) => {
                metadata.get("lesson_number").and_then(Value::as_u64) == Some(u64::from(*number))
            }
            Filter::And(filters) => filters.iter().all(|f| f.matches(metadata)),
        }
    }

    /// JSON rendering in the `where` clause shape used by document stores.
    pub fn to_json(&self) -> Value {
        match self {
            Filter::CourseTitle(title) => json!({ "course_title": title }),
            Filter::LessonNumber(number) => json!({ "lesson_number": number }),
            Filter::And(filters) => {
                json!({ "$and": filters.iter().map(Filter::to_json).collect::<Vec<_>>() })
            }
        }
    }
}

/// Build the content filter for an already-resolved course title and an
/// optional lesson number.
pub fn build_filter(course_title: Option<&str>, lesson_number: Option<u32>) -> Option<Filter> {
    match (course_title, lesson_number) {
        (None, None) => None,
        (Some(title), None) => Some(Filter::CourseTitle(title.to_string())),
        (None, Some(number)) => Some(Filter::LessonNumber(number)),
        (Some(title), Some(number)) => Some(Filter::And(vec![
            Filter::CourseTitle(title.to_string()),
            Filter::LessonNumber(number),
        ])),
    }
}
