//! Course document parsing and chunking.
//!
//! Expected layout:
//!
//! ```text
//! Course Title: Building Agents
//! Course Link: https://example.com/agents
//! Course Instructor: Jane Doe
//!
//! Lesson 0: Introduction
//! Lesson Link: https://example.com/agents/0
//! Body text of the lesson...
//! ```

use crate::types::{Course, CourseChunk, Lesson};
use coursemate_core::{AppError, AppResult};
use std::fs;
use std::path::{Path, PathBuf};
use text_splitter::{ChunkConfig, TextSplitter};
use walkdir::WalkDir;

/// File extensions treated as course documents.
pub const COURSE_EXTENSIONS: &[&str] = &["txt", "md"];

/// Splits course documents into a [`Course`] and its passages.
#[derive(Debug, Clone, Copy)]
pub struct DocumentProcessor {
    chunk_size: usize,
    chunk_overlap: usize,
}

impl DocumentProcessor {
    /// Overlap is capped below the chunk size.
    pub fn new(chunk_size: usize, chunk_overlap: usize) -> Self {
        let chunk_size = chunk_size.max(1);
        Self {
            chunk_size,
            chunk_overlap: chunk_overlap.min(chunk_size - 1),
        }
    }

    /// Read and parse one course file. Untitled documents fall back to the
    /// file stem.
    pub fn process_course_document(&self, path: &Path) -> AppResult<(Course, Vec<CourseChunk>)> {
        let raw = fs::read_to_string(path)
            .map_err(|e| AppError::Other(format!("Failed to read {:?}: {}", path, e)))?;

        let fallback = path
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or("Untitled course");

        let (course, chunks) = self.parse_course_text(&raw, fallback)?;
        tracing::debug!(
            "Parsed {:?}: course '{}', {} lessons, {} chunks",
            path,
            course.title,
            course.lessons.len(),
            chunks.len()
        );
        Ok((course, chunks))
    }

    /// Parse course text already in memory.
    pub fn parse_course_text(
        &self,
        text: &str,
        fallback_title: &str,
    ) -> AppResult<(Course, Vec<CourseChunk>)> {
        let mut course = Course::new(fallback_title);
        let mut sections: Vec<(Option<u32>, String)> = Vec::new();
        let mut current: Option<u32> = None;
        let mut body = String::new();
        let mut expect_lesson_link = false;

        for line in text.lines() {
            let trimmed = line.trim();

            if let Some(title) = strip_label(trimmed, "Course Title:") {
                if !title.is_empty() {
                    course.title = title.to_string();
                }
                continue;
            }
            if let Some(link) = strip_label(trimmed, "Course Link:") {
                course.course_link = non_empty(link);
                continue;
            }
            if let Some(instructor) = strip_label(trimmed, "Course Instructor:") {
                course.instructor = non_empty(instructor);
                continue;
            }

            if let Some((number, title)) = parse_lesson_marker(trimmed) {
                flush_section(&mut sections, current, &mut body);
                current = Some(number);
                course.lessons.push(Lesson {
                    lesson_number: number,
                    title: title.to_string(),
                    lesson_link: None,
                });
                expect_lesson_link = true;
                continue;
            }

            if expect_lesson_link {
                if let Some(link) = strip_label(trimmed, "Lesson Link:") {
                    if let Some(lesson) = course.lessons.last_mut() {
                        lesson.lesson_link = non_empty(link);
                    }
                    expect_lesson_link = false;
                    continue;
                }
                if !trimmed.is_empty() {
                    expect_lesson_link = false;
                }
            }

            if !trimmed.is_empty() {
                body.push_str(trimmed);
                body.push('\n');
            }
        }
        flush_section(&mut sections, current, &mut body);
        course.sort_lessons();

        let mut chunks = Vec::new();
        for (lesson_number, section) in sections {
            for (i, piece) in self.chunk_text(&section)?.into_iter().enumerate() {
                let content = match (lesson_number, i) {
                    (Some(n), 0) => format!("Lesson {} content: {}", n, piece),
                    _ => piece,
                };
                chunks.push(CourseChunk {
                    content,
                    course_title: course.title.clone(),
                    lesson_number,
                    chunk_index: chunks.len(),
                });
            }
        }

        Ok((course, chunks))
    }

    /// Split whitespace-normalized text into chunks of at most `chunk_size`
    /// characters, preferring sentence and then word boundaries. Consecutive
    /// chunks share up to `chunk_overlap` characters.
    pub fn chunk_text(&self, text: &str) -> AppResult<Vec<String>> {
        let normalized = text.split_whitespace().collect::<Vec<_>>().join(" ");
        let config = ChunkConfig::new(self.chunk_size)
            .with_overlap(self.chunk_overlap)
            .map_err(|e| AppError::Config(format!("Invalid chunk settings: {}", e)))?;

        let splitter = TextSplitter::new(config);
        Ok(splitter.chunks(&normalized).map(str::to_string).collect())
    }
}

/// Course documents under `dir` (recursively), sorted by path.
pub fn find_course_files(dir: &Path) -> AppResult<Vec<PathBuf>> {
    if !dir.is_dir() {
        return Err(AppError::Other(format!("Folder {:?} does not exist", dir)));
    }

    let mut files: Vec<PathBuf> = WalkDir::new(dir)
        .follow_links(true)
        .into_iter()
        .filter_map(|entry| match entry {
            Ok(entry) => Some(entry),
            Err(e) => {
                tracing::warn!("Skipping unreadable entry: {}", e);
                None
            }
        })
        .filter(|entry| entry.file_type().is_file())
        .map(|entry| entry.into_path())
        .filter(|path| {
            path.extension()
                .and_then(|e| e.to_str())
                .map(|e| COURSE_EXTENSIONS.iter().any(|ext| e.eq_ignore_ascii_case(ext)))
                .unwrap_or(false)
        })
        .collect();

    files.sort();
    Ok(files)
}

fn strip_label<'a>(line: &'a str, label: &str) -> Option<&'a str> {
    line.strip_prefix(label).map(str::trim)
}

fn non_empty(value: &str) -> Option<String> {
    (!value.is_empty()).then(|| value.to_string())
}

/// `Lesson <n>: <title>` (case-insensitive keyword).
fn parse_lesson_marker(line: &str) -> Option<(u32, &str)> {
    let rest = line.get(..7)?.eq_ignore_ascii_case("lesson ").then(|| &line[7..])?;
    let (number, title) = rest.split_once(':')?;
    let number = number.trim().parse().ok()?;
    Some((number, title.trim()))
}

fn flush_section(sections: &mut Vec<(Option<u32>, String)>, lesson: Option<u32>, body: &mut String) {
    if !body.trim().is_empty() {
        sections.push((lesson, std::mem::take(body)));
    }
    body.clear();
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    const SAMPLE: &str = "Course Title: Python Basics
Course Link: https://example.com/python
Course Instructor: John Doe

Lesson 1: Introduction
Lesson Link: https://example.com/python/1
Python is a programming language. It is popular.

Lesson 2: Variables
Variables store data values.
";

    #[test]
    fn test_parse_course_header_and_lessons() {
        let processor = DocumentProcessor::new(800, 100);
        let (course, chunks) = processor.parse_course_text(SAMPLE, "fallback").unwrap();

        assert_eq!(course.title, "Python Basics");
        assert_eq!(course.course_link.as_deref(), Some("https://example.com/python"));
        assert_eq!(course.instructor.as_deref(), Some("John Doe"));
        assert_eq!(course.lessons.len(), 2);
        assert_eq!(
            course.lessons[0].lesson_link.as_deref(),
            Some("https://example.com/python/1")
        );
        assert!(course.lessons[1].lesson_link.is_none());

        assert_eq!(chunks.len(), 2);
        assert_eq!(chunks[0].lesson_number, Some(1));
        assert!(chunks[0]
            .content
            .starts_with("Lesson 1 content: Python is a programming language."));
        assert_eq!(chunks[1].chunk_index, 1);
        assert_eq!(chunks[1].course_title, "Python Basics");
    }

    #[test]
    fn test_untitled_document_uses_file_stem() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("course_notes.txt");
        std::fs::write(&path, "Just some notes. Nothing else.").unwrap();

        let (course, chunks) = DocumentProcessor::new(800, 100)
            .process_course_document(&path)
            .unwrap();

        assert_eq!(course.title, "course_notes");
        assert!(course.lessons.is_empty());
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].lesson_number, None);
    }

    #[test]
    fn test_chunk_text_respects_size() {
        let processor = DocumentProcessor::new(50, 25);
        let text = "First sentence here. Second sentence here. Third sentence here. Fourth one.";
        let chunks = processor.chunk_text(text).unwrap();

        assert!(chunks.len() > 1);
        assert!(chunks.iter().all(|c| c.chars().count() <= 50));
        assert!(chunks[0].starts_with("First sentence here."));
        assert!(chunks.last().unwrap().ends_with("Fourth one."));
    }

    #[test]
    fn test_overlap_never_reduces_chunk_count() {
        let text = "Ownership moves values. Borrowing lends them. Lifetimes bound borrows. \
                    Slices view ranges. Traits share behavior.";
        let plain = DocumentProcessor::new(40, 0).chunk_text(text).unwrap();
        let overlapping = DocumentProcessor::new(40, 20).chunk_text(text).unwrap();

        assert!(overlapping.len() >= plain.len());
        assert!(overlapping.iter().all(|c| c.chars().count() <= 40));
    }

    #[test]
    fn test_text_without_sentence_breaks_is_split() {
        let processor = DocumentProcessor::new(800, 100);
        let chunks = processor.chunk_text(&"word ".repeat(1000)).unwrap();

        assert!(chunks.len() > 1);
        assert!(chunks.iter().all(|c| c.chars().count() <= 800));
    }

    #[test]
    fn test_chunk_text_long_sentence_and_empty() {
        let processor = DocumentProcessor::new(10, 0);
        let chunks = processor
            .chunk_text("This single sentence is much longer than ten characters")
            .unwrap();
        assert!(chunks.len() > 1);
        assert!(chunks.iter().all(|c| c.chars().count() <= 10));

        assert!(processor.chunk_text("   ").unwrap().is_empty());
    }

    #[test]
    fn test_overlap_capped_below_size() {
        let processor = DocumentProcessor::new(20, 50);
        assert!(processor.chunk_text("Short lessons are easy to index.").is_ok());
    }

    #[test]
    fn test_find_course_files() {
        let temp = TempDir::new().unwrap();
        std::fs::create_dir(temp.path().join("nested")).unwrap();
        std::fs::write(temp.path().join("b.txt"), "x").unwrap();
        std::fs::write(temp.path().join("nested").join("a.MD"), "x").unwrap();
        std::fs::write(temp.path().join("image.png"), "x").unwrap();

        let files = find_course_files(temp.path()).unwrap();
        assert_eq!(files.len(), 2);
        assert!(files.iter().all(|f| f.extension().unwrap() != "png"));

        assert!(find_course_files(&temp.path().join("missing")).is_err());
    }

    #[test]
    fn test_lesson_marker() {
        assert_eq!(parse_lesson_marker("Lesson 3: Loops"), Some((3, "Loops")));
        assert_eq!(parse_lesson_marker("lesson 10:Testing"), Some((10, "Testing")));
        assert_eq!(parse_lesson_marker("Lesson three: Loops"), None);
        assert_eq!(parse_lesson_marker("Lessons learned"), None);
    }
}
