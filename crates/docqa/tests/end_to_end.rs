//! Ingest a PDF, persist the index, reload it and ask a question

mod common;

use std::sync::Arc;

use common::{write_pdf, BagOfWordsEmbedder, ScriptedLlm};
use docqa::{Error, RagConfig, ResearchAgent, Vectorizer};

const PAGES: [&str; 2] = [
    "Photosynthesis converts sunlight into chemical energy. Plants store that energy as sugar.",
    "The Eiffel Tower is located in Paris. The tower was completed in 1889.",
];

#[tokio::test]
async fn answer_cites_the_page_that_holds_it() {
    let dir = tempfile::tempdir().unwrap();
    let docs = dir.path().join("docs");
    std::fs::create_dir(&docs).unwrap();
    write_pdf(&docs.join("guide.pdf"), &PAGES);

    let index_dir = dir.path().join("index");
    let mut config = RagConfig::default();
    config.vector_index.path = Some(index_dir.clone());

    let llm = ScriptedLlm::citing();
    let vectorizer = Vectorizer::new(&config, Arc::new(BagOfWordsEmbedder), llm.clone())
        .show_progress(false);
    let index = vectorizer
        .build_vector_index(Some(docs.as_path()), None, Some(index_dir.as_path()))
        .await
        .unwrap();

    assert_eq!(index.len(), 2);
    assert!(index.chunks().iter().all(|c| !c.keywords.is_empty()));

    let agent = ResearchAgent::load_from_storage_with(&config, Arc::new(BagOfWordsEmbedder), llm, Some(1))
        .await
        .unwrap();
    let response = agent
        .chat("Where is the Eiffel Tower located?", None)
        .await
        .unwrap();

    assert_eq!(response.citations.len(), 1);
    assert_eq!(response.citations[0].page_number, Some(2));
    assert!(response.text.contains("guide.pdf, page 2"));
    assert!(!response.text.contains("page 1"));

    let referenced = response.referenced_citations();
    assert_eq!(referenced.len(), 1);
    assert_eq!(referenced[0].page_number, Some(2));
}

#[tokio::test]
async fn missing_index_path_is_a_config_error() {
    let llm = ScriptedLlm::citing();
    let result =
        ResearchAgent::load_from_storage_with(&RagConfig::default(), Arc::new(BagOfWordsEmbedder), llm.clone(), None)
            .await;

    assert!(matches!(result, Err(Error::Config(_))));
    assert_eq!(llm.call_count(), 0);
}

#[tokio::test]
async fn vectorizing_without_inputs_is_rejected() {
    let config = RagConfig::default();
    let vectorizer = Vectorizer::new(&config, Arc::new(BagOfWordsEmbedder), ScriptedLlm::citing());

    let result = vectorizer.build_vector_index(None, None, None).await;
    assert!(matches!(result, Err(Error::InvalidInput(_))));
}
