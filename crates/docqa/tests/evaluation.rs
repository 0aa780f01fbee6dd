//! Batch evaluation against a research agent with scripted backends

mod common;

use std::sync::Arc;

use common::{embedded_index, BagOfWordsEmbedder, ScriptedLlm};
use docqa::evaluation::{pass_percentage, correctness_percentage};
use docqa::types::{ChatMessage, Role};
use docqa::{ChatEngine, ChatSession, Error, EvalDataset, Metric, ResearchAgent, ResponseEvaluator};

/// Replies with every user turn it has seen, so leaked history shows up in the answer
fn echoing_agent() -> (Arc<ResearchAgent>, Arc<ScriptedLlm>) {
    let llm = ScriptedLlm::new(|messages: &[ChatMessage]| {
        Ok(messages
            .iter()
            .filter(|m| m.role == Role::User)
            .map(|m| m.content.as_str())
            .collect::<Vec<_>>()
            .join(" / "))
    });
    let index = embedded_index("zoo.pdf", &["Lions live in prides.", "Penguins cannot fly."]);
    let agent = ResearchAgent::new(index, Arc::new(BagOfWordsEmbedder), llm.clone(), 1).unwrap();
    (Arc::new(agent), llm)
}

/// Judges YES unless the query or answer mentions penguins, scores correctness 4
fn judge() -> Arc<ScriptedLlm> {
    ScriptedLlm::new(|messages: &[ChatMessage]| {
        let prompt = &messages.last().unwrap().content;
        if messages[0].role == Role::System {
            return Ok("4\nClose to the reference.".into());
        }
        if prompt.contains("Penguins") || prompt.contains("penguins") {
            Ok("NO".into())
        } else {
            Ok("YES".into())
        }
    })
}

#[test]
fn aggregation_matches_reference_figures() {
    assert_eq!(pass_percentage(&[true, true, false, true]), Some(75.0));
    let correctness = correctness_percentage(&[4.0, 5.0, 3.0]).unwrap();
    assert!((correctness - 80.0).abs() < 1e-9);
}

#[tokio::test]
async fn session_memory_is_reset_between_questions() {
    let (agent, _) = echoing_agent();
    let session = ChatSession::new(agent);
    let dataset = EvalDataset::new(
        vec!["Where do lions live?".into(), "Can penguins fly?".into()],
        None,
    )
    .unwrap();

    let evaluator = ResponseEvaluator::new(judge(), false);
    let report = evaluator.evaluate(&dataset, &session).await.unwrap();

    let relevancy = report.results(Metric::Relevancy);
    assert_eq!(relevancy.len(), 2);
    assert_eq!(relevancy[1].response, "Can penguins fly?");
    assert!(!relevancy[1].response.contains("lions"));
    assert!(session.history().is_empty());
}

#[tokio::test]
async fn session_keeps_history_within_a_conversation() {
    let (agent, llm) = echoing_agent();
    let session = ChatSession::new(agent);

    session.chat("Where do lions live?").await.unwrap();
    let second = session.chat("And penguins?").await.unwrap();

    assert_eq!(second.text, "Where do lions live? / And penguins?");
    assert_eq!(session.history().len(), 4);
    assert_eq!(llm.call_count(), 2);

    session.reset();
    assert!(session.history().is_empty());
}

#[tokio::test]
async fn scores_every_configured_metric() {
    let (agent, _) = echoing_agent();
    let session = ChatSession::new(agent);
    let dataset = EvalDataset::new(
        vec![
            "Where do lions live?".into(),
            "Do lions hunt?".into(),
            "Can penguins fly?".into(),
            "Are lions big?".into(),
        ],
        Some(vec!["prides".into(), "yes".into(), "no".into(), "yes".into()]),
    )
    .unwrap();

    let evaluator = ResponseEvaluator::new(judge(), true).workers(2);
    let report = evaluator.evaluate(&dataset, &session).await.unwrap();

    assert_eq!(report.score(Metric::Relevancy), Some(75.0));
    assert_eq!(report.score(Metric::Correctness), Some(80.0));
    assert_eq!(report.correctness_rows().len(), 4);
    assert_eq!(report.correctness_rows()[2].ground_truth, "no");

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("correctness.csv");
    report.export_correctness_csv(&path).unwrap();
    let exported = std::fs::read_to_string(&path).unwrap();
    assert_eq!(exported.lines().count(), 5);
}

#[tokio::test]
async fn judge_failures_are_skipped() {
    let (agent, _) = echoing_agent();
    let flaky = ScriptedLlm::new(|messages: &[ChatMessage]| {
        if messages[0].content.contains("Penguins") || messages[0].content.contains("penguins") {
            Err(Error::llm("judge timed out"))
        } else {
            Ok("YES".into())
        }
    });
    let dataset = EvalDataset::new(
        vec!["Where do lions live?".into(), "Can penguins fly?".into()],
        None,
    )
    .unwrap();

    let report = ResponseEvaluator::new(flaky, false)
        .evaluate(&dataset, agent.as_ref())
        .await
        .unwrap();

    assert_eq!(report.results(Metric::Relevancy).len(), 1);
    assert_eq!(report.results(Metric::Faithfulness).len(), 1);
    assert_eq!(report.skipped, 2);
    assert_eq!(report.score(Metric::Relevancy), Some(100.0));
}

#[tokio::test]
async fn correctness_needs_ground_truth() {
    let (agent, _) = echoing_agent();
    let dataset = EvalDataset::new(vec!["Where do lions live?".into()], None).unwrap();

    let result = ResponseEvaluator::new(judge(), true)
        .evaluate(&dataset, agent.as_ref())
        .await;
    assert!(matches!(result, Err(Error::InvalidInput(_))));
}
