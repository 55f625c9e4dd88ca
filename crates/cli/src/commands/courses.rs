//! Course index management commands.

use clap::Args;
use coursemate_core::{config::AppConfig, AppResult};
use coursemate_knowledge::DocumentProcessor;
use coursemate_rag::{course_analytics, index_course_folder, open_store};
use std::path::PathBuf;
use std::time::Instant;

/// Index course documents from a folder
#[derive(Args, Debug)]
pub struct LearnCommand {
    /// Folder containing course documents (.txt, .md)
    pub dir: PathBuf,

    /// Drop the existing index before learning
    #[arg(long)]
    pub clear: bool,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

impl LearnCommand {
    pub async fn execute(&self, config: &AppConfig) -> AppResult<()> {
        tracing::info!("Executing learn command for {:?}", self.dir);

        let started = Instant::now();
        let store = open_store(config).await?;
        let processor = DocumentProcessor::new(config.rag.chunk_size, config.rag.chunk_overlap);

        let (courses, chunks) = index_course_folder(&processor, &store, &self.dir, self.clear).await?;
        let total = store.get_course_count().await?;
        let elapsed = started.elapsed().as_secs_f64();

        if self.json {
            let output = serde_json::json!({
                "coursesAdded": courses,
                "chunksAdded": chunks,
                "totalCourses": total,
                "durationSecs": elapsed,
            });
            println!("{}", serde_json::to_string_pretty(&output)?);
        } else {
            println!(
                "Added {} courses ({} chunks) in {:.2}s; {} courses indexed",
                courses, chunks, elapsed, total
            );
        }

        Ok(())
    }
}

/// List indexed courses
#[derive(Args, Debug)]
pub struct CoursesCommand {
    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

impl CoursesCommand {
    pub async fn execute(&self, config: &AppConfig) -> AppResult<()> {
        tracing::info!("Executing courses command");

        let store = open_store(config).await?;
        let analytics = course_analytics(&store).await?;

        if self.json {
            println!("{}", serde_json::to_string_pretty(&analytics)?);
        } else if analytics.total_courses == 0 {
            println!("No courses indexed. Use 'coursemate learn <dir>' to add some.");
        } else {
            println!("Courses: {}", analytics.total_courses);
            for title in &analytics.course_titles {
                println!("- {}", title);
            }
        }

        Ok(())
    }
}

/// Drop every indexed course
#[derive(Args, Debug)]
pub struct ClearCommand {}

impl ClearCommand {
    pub async fn execute(&self, config: &AppConfig) -> AppResult<()> {
        tracing::info!("Executing clear command");

        let store = open_store(config).await?;
        store.clear_all_data().await?;

        println!("Course index cleared");
        Ok(())
    }
}
