//! Indexer → 캐시 파일 → QueryService 통합 테스트

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use pdf_wizard::config::Credentials;
use pdf_wizard::extractor::digest_bytes;
use pdf_wizard::knowledge::cache;
use pdf_wizard::{
    EmbeddingProvider, Error, Generator, Indexer, QueryService, Result, Settings, VectorIndex,
};

const BOOK: &str = "Chapter 1. Linear algebra.\n\
Scalars, vectors, matrices and tensors are the basic objects of linear algebra.\n\
Chapter 2. Probability.\n\
A random variable is a variable that can take on different values randomly.\n\
Chapter 3. Numerical computation.\n\
Gradient descent moves in the direction of the negative gradient.\n";

/// 단어 해시 버킷으로 벡터를 만들고 호출 횟수를 세는 임베딩
struct CountingEmbedder {
    dimension: usize,
    calls: AtomicUsize,
}

impl CountingEmbedder {
    fn vector(&self, text: &str) -> Vec<f32> {
        let mut vector = vec![0.0f32; self.dimension];
        let lowered = text.to_lowercase();
        for word in lowered.split(|c: char| !c.is_alphanumeric()).filter(|w| !w.is_empty()) {
            let mut hasher = DefaultHasher::new();
            word.hash(&mut hasher);
            vector[(hasher.finish() % self.dimension as u64) as usize] += 1.0;
        }
        vector
    }
}

#[async_trait]
impl EmbeddingProvider for CountingEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.vector(text))
    }

    fn dimension(&self) -> usize {
        self.dimension
    }

    fn name(&self) -> &str {
        "counting"
    }
}

/// 프롬프트를 기록하는 생성기
#[derive(Default)]
struct EchoGenerator {
    prompts: Mutex<Vec<String>>,
}

#[async_trait]
impl Generator for EchoGenerator {
    async fn generate(&self, prompt: &str) -> Result<String> {
        self.prompts.lock().unwrap().push(prompt.to_string());
        Ok("Tensors generalize matrices.".to_string())
    }

    fn model_id(&self) -> &str {
        "echo"
    }
}

fn settings(dir: &Path) -> Settings {
    let mut settings = Settings::default();
    settings.document_path = dir.join("book.pdf");
    settings.cache_path = dir.join("knowledge_base.bin");
    settings.embedding.dimension = 256;
    settings.chunking.chunk_size = 100;
    settings.chunking.chunk_overlap = 20;
    settings.retrieval.top_k = 3;
    settings
}

fn embedder(settings: &Settings) -> Arc<CountingEmbedder> {
    Arc::new(CountingEmbedder {
        dimension: settings.embedding.dimension,
        calls: AtomicUsize::new(0),
    })
}

/// 문서 파일을 쓰고, 그 다이제스트로 만든 인덱스를 캐시에 저장
async fn prepare_cache(settings: &Settings) {
    let bytes = b"%PDF-1.4 stand-in bytes for the source document";
    std::fs::write(&settings.document_path, bytes).unwrap();

    let kb = Indexer::new(settings.clone(), embedder(settings))
        .unwrap()
        .index_text(BOOK, settings.document_path.clone(), digest_bytes(bytes))
        .await
        .unwrap();
    cache::save(&kb, &settings.cache_path).unwrap();
}

#[tokio::test]
async fn test_index_then_answer_from_cache() {
    let dir = tempfile::tempdir().unwrap();
    let settings = settings(dir.path());
    prepare_cache(&settings).await;

    let before = std::fs::read(&settings.cache_path).unwrap();

    // 캐시가 유효하면 임베딩 없이 로드
    let indexing_embedder = embedder(&settings);
    let outcome = Indexer::new(settings.clone(), indexing_embedder.clone())
        .unwrap()
        .build_or_load_index(&settings.document_path, &settings.cache_path)
        .await
        .unwrap();
    assert!(!outcome.was_built());
    assert_eq!(indexing_embedder.calls.load(Ordering::SeqCst), 0);
    assert_eq!(std::fs::read(&settings.cache_path).unwrap(), before);

    let kb = outcome.into_inner();
    assert!(kb.len() > 1);

    let generator = Arc::new(EchoGenerator::default());
    let query_embedder = embedder(&settings);
    let service =
        QueryService::new(kb, &settings, query_embedder.clone(), generator.clone()).unwrap();

    let question = "What are tensors?";
    let answer = service
        .answer(question, &CancellationToken::new())
        .await
        .unwrap();
    assert_eq!(answer.text, "Tensors generalize matrices.");
    assert_eq!(query_embedder.calls.load(Ordering::SeqCst), 1);

    let prompts = generator.prompts.lock().unwrap().clone();
    assert_eq!(prompts.len(), 1);
    assert!(prompts[0].ends_with("Question: What are tensors?\nHelpful Answer:"));

    let retrieved = service.retrieve(question).await.unwrap();
    assert_eq!(retrieved.len(), 3);
    for pair in retrieved.windows(2) {
        assert!(pair[0].distance <= pair[1].distance);
    }
    for result in &retrieved {
        assert!(prompts[0].contains(&result.chunk.text));
    }
}

#[tokio::test]
async fn test_cancelled_question_never_reaches_generator() {
    let dir = tempfile::tempdir().unwrap();
    let settings = settings(dir.path());
    prepare_cache(&settings).await;

    let kb = cache::load(&settings.cache_path).unwrap();
    let generator = Arc::new(EchoGenerator::default());
    let service = QueryService::new(kb, &settings, embedder(&settings), generator.clone()).unwrap();

    let token = CancellationToken::new();
    token.cancel();

    let result = service.answer("What is a random variable?", &token).await;
    assert!(matches!(result, Err(Error::Cancelled)));
    assert!(generator.prompts.lock().unwrap().is_empty());
}

#[test]
fn test_missing_credential_fails_before_any_query() {
    let result = Credentials::from_lookup(|_| None);
    assert!(matches!(result, Err(Error::MissingCredential("BAM_API_KEY"))));

    let result = Credentials::from_lookup(|key| match key {
        "BAM_API_KEY" => Some("   ".to_string()),
        _ => None,
    });
    assert!(matches!(result, Err(Error::MissingCredential(_))));
}
