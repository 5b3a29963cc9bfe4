//! 테스트용 가짜 구현

use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use sha2::{Digest, Sha256};
use tokio::sync::Notify;

use crate::config::Settings;
use crate::embedding::EmbeddingProvider;
use crate::error::{Error, Result};
use crate::generation::Generator;
use crate::indexer::Indexer;
use crate::knowledge::KnowledgeBase;
use crate::service::QueryService;

/// 단어와 문자 trigram을 해싱하는 결정적 임베딩
#[derive(Debug, Clone)]
pub(crate) struct HashingEmbedding {
    dimension: usize,
    normalize: bool,
}

impl HashingEmbedding {
    pub(crate) fn new(dimension: usize, normalize: bool) -> Self {
        Self {
            dimension,
            normalize,
        }
    }

    pub(crate) fn embed_text(&self, text: &str) -> Vec<f32> {
        let mut vector = vec![0.0f32; self.dimension];
        let lowered = text.to_lowercase();

        for word in lowered.split(|c: char| !c.is_alphanumeric()).filter(|w| !w.is_empty()) {
            self.accumulate(&mut vector, &format!("w:{word}"), 1.0);
            let marked: Vec<char> = format!("^{word}$").chars().collect();
            for tri in marked.windows(3) {
                self.accumulate(&mut vector, &format!("c:{}", tri.iter().collect::<String>()), 0.25);
            }
        }

        if self.normalize {
            let norm = vector.iter().map(|x| x * x).sum::<f32>().sqrt();
            if norm > 0.0 {
                vector.iter_mut().for_each(|x| *x /= norm);
            }
        }
        vector
    }

    fn accumulate(&self, vector: &mut [f32], feature: &str, weight: f32) {
        let hash = Sha256::digest(feature.as_bytes());
        let mut bucket = [0u8; 8];
        bucket.copy_from_slice(&hash[..8]);
        let index = (u64::from_le_bytes(bucket) % self.dimension as u64) as usize;
        let sign = if hash[8] & 1 == 0 { 1.0 } else { -1.0 };
        vector[index] += sign * weight;
    }
}

#[async_trait]
impl EmbeddingProvider for HashingEmbedding {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        Ok(self.embed_text(text))
    }

    fn dimension(&self) -> usize {
        self.dimension
    }

    fn name(&self) -> &str {
        "hashing"
    }
}

/// 페이지마다 한 줄씩 쓰인 PDF 바이트
pub(crate) fn pdf_fixture(pages: &[&str]) -> Vec<u8> {
    use lopdf::content::{Content, Operation};
    use lopdf::{dictionary, Document, Object, Stream};

    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();
    let font_id = doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => "Courier",
    });
    let resources_id = doc.add_object(dictionary! {
        "Font" => dictionary! {
            "F1" => font_id,
        },
    });

    let mut kids = Vec::new();
    for text in pages {
        let content = Content {
            operations: vec![
                Operation::new("BT", vec![]),
                Operation::new("Tf", vec!["F1".into(), Object::Integer(24)]),
                Operation::new("Td", vec![Object::Integer(100), Object::Integer(600)]),
                Operation::new("Tj", vec![Object::string_literal(*text)]),
                Operation::new("ET", vec![]),
            ],
        };
        let content_id = doc.add_object(Stream::new(dictionary! {}, content.encode().unwrap()));
        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "Contents" => content_id,
            "Resources" => resources_id,
            "MediaBox" => vec![
                Object::Integer(0),
                Object::Integer(0),
                Object::Integer(595),
                Object::Integer(842),
            ],
        });
        kids.push(Object::from(page_id));
    }

    let count = kids.len() as i64;
    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => kids,
            "Count" => Object::Integer(count),
        }),
    );
    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);

    let mut bytes = Vec::new();
    doc.save_to(&mut bytes).unwrap();
    bytes
}

/// 프롬프트를 기록하고 고정 답변(또는 고정 에러)을 돌려주는 생성기
pub(crate) struct RecordingGenerator {
    reply: std::result::Result<String, u16>,
    calls: AtomicUsize,
    last_prompt: Mutex<Option<String>>,
}

impl RecordingGenerator {
    pub(crate) fn replying(text: &str) -> Arc<Self> {
        Arc::new(Self {
            reply: Ok(text.to_string()),
            calls: AtomicUsize::new(0),
            last_prompt: Mutex::new(None),
        })
    }

    pub(crate) fn failing(status: u16) -> Arc<Self> {
        Arc::new(Self {
            reply: Err(status),
            calls: AtomicUsize::new(0),
            last_prompt: Mutex::new(None),
        })
    }

    pub(crate) fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub(crate) fn last_prompt(&self) -> Option<String> {
        self.last_prompt.lock().unwrap().clone()
    }
}

#[async_trait]
impl Generator for RecordingGenerator {
    async fn generate(&self, prompt: &str) -> Result<String> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        *self.last_prompt.lock().unwrap() = Some(prompt.to_string());
        match &self.reply {
            Ok(text) => Ok(text.clone()),
            Err(status) => Err(Error::Endpoint {
                status: *status,
                body: "upstream unavailable".to_string(),
            }),
        }
    }

    fn model_id(&self) -> &str {
        "recording"
    }
}

/// 호출되면 시작을 알리고 끝나지 않는 생성기
#[derive(Default)]
pub(crate) struct HangingGenerator {
    pub(crate) started: Notify,
}

#[async_trait]
impl Generator for HangingGenerator {
    async fn generate(&self, _prompt: &str) -> Result<String> {
        self.started.notify_one();
        std::future::pending::<Result<String>>().await
    }

    fn model_id(&self) -> &str {
        "hanging"
    }
}

pub(crate) fn sample_settings() -> Settings {
    let mut settings = Settings::default();
    settings.embedding.dimension = 128;
    settings.chunking.chunk_size = 120;
    settings.chunking.chunk_overlap = 20;
    settings.retrieval.top_k = 2;
    settings
}

pub(crate) async fn sample_knowledge_base(settings: &Settings) -> KnowledgeBase {
    let text = "Convolutional networks use shared weights across positions.\n\
                Recurrent networks process sequences one step at a time.\n\
                Monte Carlo methods estimate expectations by sampling.\n\
                Regularization reduces overfitting on the training set.\n";
    let embedder = Arc::new(HashingEmbedding::new(settings.embedding.dimension, false));
    Indexer::new(settings.clone(), embedder)
        .unwrap()
        .index_text(text, PathBuf::from("book.pdf"), "digest".to_string())
        .await
        .unwrap()
}

pub(crate) async fn sample_service(generator: Arc<dyn Generator>) -> QueryService {
    let settings = sample_settings();
    let kb = sample_knowledge_base(&settings).await;
    let embedder = Arc::new(HashingEmbedding::new(settings.embedding.dimension, false));
    QueryService::new(kb, &settings, embedder, generator).unwrap()
}
