//! End-to-end queries through `RagSystem`.

use super::support::{seeded_store, tool_call, ScriptedClient, MCP_COURSE};
use crate::session::SqliteSessionStore;
use crate::system::RagSystem;
use crate::tools::Citation;
use coursemate_core::RagSettings;
use coursemate_knowledge::{create_provider, EmbeddingConfig, SqliteBackend, VectorStore};
use coursemate_llm::{ChatResponse, ContentBlock};
use serde_json::json;
use std::sync::Arc;
use tempfile::TempDir;

#[tokio::test]
async fn test_lesson_question_answered_with_one_citation() {
    let (_, store) = seeded_store().await;
    let client = Arc::new(ScriptedClient::new(vec![
        tool_call(
            "t1",
            "search_course_content",
            json!({"query": "what is covered", "course_name": "MCP", "lesson_number": 2}),
        ),
        ChatResponse::text_answer(
            "Lesson 2 of Introduction to MCP covers how servers expose tools and clients list them.",
        ),
    ]));
    let system = RagSystem::new(&RagSettings::default(), store, client.clone(), "test-model");

    let outcome = system
        .run_query("What is covered in lesson 2?", None)
        .await
        .unwrap();

    assert!(outcome.answer.contains("Introduction to MCP"));
    assert!(outcome.answer.contains("Lesson 2"));
    assert_eq!(
        outcome.citations,
        vec![Citation::new(
            "Introduction to MCP - Lesson 2",
            Some("https://learn.example.com/mcp/2".to_string())
        )]
    );

    // The query is sent verbatim and the evidence comes back as one tool result
    let requests = client.requests();
    assert_eq!(requests[0].messages[0].blocks(), vec![ContentBlock::Text {
        text: "What is covered in lesson 2?".to_string()
    }]);
    match requests[1].messages[2].blocks().as_slice() {
        [ContentBlock::ToolResult { content, is_error, .. }] => {
            assert!(!*is_error);
            assert!(content.starts_with("[Introduction to MCP - Lesson 2]\n"));
        }
        other => panic!("unexpected tool results: {:?}", other),
    }
}

#[tokio::test]
async fn test_lesson_filter_without_course() {
    let (_, store) = seeded_store().await;
    let client = Arc::new(ScriptedClient::new(vec![
        tool_call(
            "t1",
            "search_course_content",
            json!({"query": "servers and clients", "lesson_number": 2}),
        ),
        ChatResponse::text_answer("Lesson 2 explains servers and clients."),
    ]));
    let system = RagSystem::new(&RagSettings::default(), store, client.clone(), "test-model");

    let outcome = system
        .run_query("Which lesson explains servers?", None)
        .await
        .unwrap();

    assert_eq!(
        outcome.citations,
        vec![Citation::new(
            "Introduction to MCP - Lesson 2",
            Some("https://learn.example.com/mcp/2".to_string())
        )]
    );

    // Only the MCP course has a lesson 2, so exactly one block comes back
    let requests = client.requests();
    match requests[1].messages[2].blocks().as_slice() {
        [ContentBlock::ToolResult { content, .. }] => {
            assert!(content.starts_with("[Introduction to MCP - Lesson 2]\n"));
            assert_eq!(content.matches("[Introduction to MCP").count(), 1);
        }
        other => panic!("unexpected tool results: {:?}", other),
    }
}

#[tokio::test]
async fn test_blank_query_is_sent_verbatim() {
    let (_, store) = seeded_store().await;
    let client = Arc::new(ScriptedClient::new(vec![ChatResponse::text_answer(
        "What would you like to know about your courses?",
    )]));
    let system = RagSystem::new(&RagSettings::default(), store, client.clone(), "test-model");
    let session = system.sessions().create_session().await.unwrap();

    let outcome = system.run_query("", Some(&session)).await.unwrap();

    assert_eq!(outcome.answer, "What would you like to know about your courses?");
    assert!(outcome.citations.is_empty());
    assert_eq!(client.requests()[0].messages[0].blocks(), vec![ContentBlock::Text {
        text: String::new()
    }]);
}

#[tokio::test]
async fn test_outline_question_cites_the_course() {
    let (_, store) = seeded_store().await;
    let client = Arc::new(ScriptedClient::new(vec![
        tool_call("t1", "get_course_outline", json!({"course_name": "MCP"})),
        ChatResponse::text_answer("The MCP course has three lessons."),
    ]));
    let system = RagSystem::new(&RagSettings::default(), store, client, "test-model");

    let outcome = system.run_query("Outline the MCP course", None).await.unwrap();

    assert_eq!(
        outcome.citations,
        vec![Citation::new(MCP_COURSE, Some("https://learn.example.com/mcp".to_string()))]
    );
}

#[tokio::test]
async fn test_citations_do_not_leak_between_queries() {
    let (_, store) = seeded_store().await;
    let client = Arc::new(ScriptedClient::new(vec![
        tool_call("t1", "search_course_content", json!({"query": "ownership"})),
        ChatResponse::text_answer("Ownership moves values."),
        ChatResponse::text_answer("Hello!"),
    ]));
    let system = RagSystem::new(&RagSettings::default(), store, client, "test-model");

    let first = system.run_query("What is ownership?", None).await.unwrap();
    assert!(!first.citations.is_empty());

    let second = system.run_query("Hi there", None).await.unwrap();
    assert_eq!(second.answer, "Hello!");
    assert!(second.citations.is_empty());
}

#[tokio::test]
async fn test_session_history_reaches_the_model() {
    let (_, store) = seeded_store().await;
    let client = Arc::new(ScriptedClient::new(vec![
        ChatResponse::text_answer("MCP is the Model Context Protocol."),
        ChatResponse::text_answer("It has three lessons."),
    ]));
    let system = RagSystem::new(&RagSettings::default(), store, client.clone(), "test-model");
    let session = system.sessions().create_session().await.unwrap();

    system.run_query("What is MCP?", Some(&session)).await.unwrap();
    system.run_query("How long is it?", Some(&session)).await.unwrap();

    let requests = client.requests();
    let first_system = requests[0].system.as_deref().unwrap();
    assert!(!first_system.contains("Previous conversation:"));

    let second_system = requests[1].system.as_deref().unwrap();
    assert!(second_system.ends_with(
        "\n\nPrevious conversation:\nUser: What is MCP?\nAssistant: MCP is the Model Context Protocol."
    ));
}

#[tokio::test]
async fn test_session_history_survives_a_new_system() {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("sessions.sqlite");
    let (_, store) = seeded_store().await;

    let first_client = Arc::new(ScriptedClient::new(vec![ChatResponse::text_answer(
        "MCP is the Model Context Protocol.",
    )]));
    let first = RagSystem::new(&RagSettings::default(), store.clone(), first_client, "test-model")
        .with_session_store(Arc::new(SqliteSessionStore::open(&path, 2).unwrap()));
    first.run_query("What is MCP?", Some("abc")).await.unwrap();
    drop(first);

    let second_client = Arc::new(ScriptedClient::new(vec![ChatResponse::text_answer(
        "It has three lessons.",
    )]));
    let second = RagSystem::new(&RagSettings::default(), store, second_client.clone(), "test-model")
        .with_session_store(Arc::new(SqliteSessionStore::open(&path, 2).unwrap()));
    second.run_query("How long is it?", Some("abc")).await.unwrap();

    let requests = second_client.requests();
    let system_prompt = requests[0].system.as_deref().unwrap();
    assert!(system_prompt.ends_with(
        "\n\nPrevious conversation:\nUser: What is MCP?\nAssistant: MCP is the Model Context Protocol."
    ));
}

#[tokio::test]
async fn test_tool_definitions_in_registration_order() {
    let (_, store) = seeded_store().await;
    let client = Arc::new(ScriptedClient::new(vec![ChatResponse::text_answer("ok")]));
    let system = RagSystem::new(&RagSettings::default(), store, client, "test-model");

    let names: Vec<_> = system
        .get_tool_definitions()
        .into_iter()
        .map(|d| d.name)
        .collect();
    assert_eq!(names, vec!["search_course_content", "get_course_outline"]);
}

const PYTHON_DOC: &str = "Course Title: Python Basics
Course Link: https://example.com/python
Course Instructor: John Doe

Lesson 1: Introduction
Lesson Link: https://example.com/python/1
Python is a programming language. It reads like plain English.

Lesson 2: Variables
Variables store values. Names point at objects.
";

const SQL_DOC: &str = "Course Title: SQL Fundamentals

Lesson 1: Select
SELECT reads rows from a table.
";

#[tokio::test]
async fn test_add_course_folder_skips_known_courses() {
    let docs = TempDir::new().unwrap();
    std::fs::write(docs.path().join("python.txt"), PYTHON_DOC).unwrap();
    std::fs::write(docs.path().join("python_copy.md"), PYTHON_DOC).unwrap();
    std::fs::write(docs.path().join("sql.txt"), SQL_DOC).unwrap();
    std::fs::write(docs.path().join("notes.pdf"), "ignored").unwrap();

    let embedder = create_provider(&EmbeddingConfig::default()).await.unwrap();
    let backend = SqliteBackend::in_memory(embedder).unwrap();
    let store = VectorStore::new(Arc::new(backend), 5);
    let client = Arc::new(ScriptedClient::new(vec![ChatResponse::text_answer("ok")]));
    let system = RagSystem::new(&RagSettings::default(), store, client, "test-model");

    let (courses, chunks) = system.add_course_folder(docs.path(), false).await.unwrap();
    assert_eq!(courses, 2);
    assert_eq!(chunks, 3);

    let analytics = system.get_course_analytics().await.unwrap();
    assert_eq!(analytics.total_courses, 2);
    assert!(analytics.course_titles.contains(&"Python Basics".to_string()));
    assert!(analytics.course_titles.contains(&"SQL Fundamentals".to_string()));

    // Second pass adds nothing
    let (courses, chunks) = system.add_course_folder(docs.path(), false).await.unwrap();
    assert_eq!((courses, chunks), (0, 0));

    // Clearing first re-indexes everything
    let (courses, _) = system.add_course_folder(docs.path(), true).await.unwrap();
    assert_eq!(courses, 2);
    assert_eq!(system.store().get_course_count().await.unwrap(), 2);
}

#[tokio::test]
async fn test_add_course_document_reports_chunks() {
    let docs = TempDir::new().unwrap();
    let path = docs.path().join("sql.txt");
    std::fs::write(&path, SQL_DOC).unwrap();

    let embedder = create_provider(&EmbeddingConfig::default()).await.unwrap();
    let store = VectorStore::new(Arc::new(SqliteBackend::in_memory(embedder).unwrap()), 5);
    let client = Arc::new(ScriptedClient::new(vec![ChatResponse::text_answer("ok")]));
    let system = RagSystem::new(&RagSettings::default(), store, client, "test-model");

    let (course, chunks) = system.add_course_document(&path).await.unwrap();
    assert_eq!(course.title, "SQL Fundamentals");
    assert_eq!(chunks, 1);

    let results = system.store().search("SELECT rows", Some("SQL"), Some(1)).await;
    assert_eq!(results.error(), None);
    assert_eq!(results.len(), 1);
}

#[tokio::test]
async fn test_missing_folder_is_an_error() {
    let (_, store) = seeded_store().await;
    let client = Arc::new(ScriptedClient::new(vec![ChatResponse::text_answer("ok")]));
    let system = RagSystem::new(&RagSettings::default(), store, client, "test-model");

    let missing = TempDir::new().unwrap().path().join("nope");
    assert!(system.add_course_folder(&missing, false).await.is_err());
}
