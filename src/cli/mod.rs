//! CLI 모듈
//!
//! pdf-wizard CLI 명령어 정의 및 구현

use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use tokio_util::sync::CancellationToken;

use crate::config::{embedding_api_token, has_api_key, Credentials, Settings, API_KEY_ENV};
use crate::embedding::{create_embedder, EmbeddingProvider};
use crate::error::Error;
use crate::extractor::document_digest;
use crate::generation::BamGenerator;
use crate::indexer::{IndexOutcome, Indexer};
use crate::knowledge::{cache, KnowledgeBase, VectorIndex};
use crate::service::QueryService;

// ============================================================================
// CLI Definition
// ============================================================================

#[derive(Parser)]
#[command(name = "pdf-wizard")]
#[command(version, about = "PDF 한 권에 질문하는 RAG 도구", long_about = None)]
pub struct Cli {
    #[command(flatten)]
    pub global: GlobalArgs,

    #[command(subcommand)]
    pub command: Commands,
}

/// 모든 명령어 공통 옵션
#[derive(Args, Debug, Default)]
pub struct GlobalArgs {
    /// TOML 설정 파일
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// 원본 PDF 경로 (설정값 덮어쓰기)
    #[arg(long, global = true)]
    pub document: Option<PathBuf>,

    /// 인덱스 캐시 파일 경로 (설정값 덮어쓰기)
    #[arg(long, global = true)]
    pub cache: Option<PathBuf>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// 인덱스 생성 (캐시가 유효하면 건너뜀)
    Index {
        /// 캐시를 무시하고 다시 생성
        #[arg(long)]
        force: bool,
    },

    /// 웹 폼 서버 실행
    Serve {
        /// 바인드 주소 (예: 127.0.0.1:8501)
        #[arg(short, long)]
        bind: Option<SocketAddr>,
    },

    /// 터미널에서 한 번 질문
    Ask {
        /// 질문
        question: String,
    },

    /// 검색만 수행 (생성 없음)
    Search {
        /// 검색 쿼리
        query: String,

        /// 결과 개수 제한 (기본: retrieval.top_k)
        #[arg(short, long)]
        limit: Option<usize>,
    },

    /// 상태 확인
    Status,
}

// ============================================================================
// CLI Runner
// ============================================================================

/// CLI 명령어 실행
pub async fn run(cli: Cli) -> Result<()> {
    let settings = load_settings(&cli.global)?;

    match cli.command {
        Commands::Index { force } => cmd_index(settings, force).await,
        Commands::Serve { bind } => cmd_serve(settings, bind).await,
        Commands::Ask { question } => cmd_ask(settings, &question).await,
        Commands::Search { query, limit } => cmd_search(settings, &query, limit).await,
        Commands::Status => cmd_status(settings).await,
    }
}

/// 설정 파일 + CLI 덮어쓰기
pub fn load_settings(global: &GlobalArgs) -> Result<Settings> {
    let mut settings = Settings::load(global.config.as_deref()).context("설정 로드 실패")?;

    if let Some(ref document) = global.document {
        settings.document_path = document.clone();
    }
    if let Some(ref cache) = global.cache {
        settings.cache_path = cache.clone();
    }

    Ok(settings)
}

// ============================================================================
// Command Implementations
// ============================================================================

/// 인덱스 생성 명령어 (index)
async fn cmd_index(settings: Settings, force: bool) -> Result<()> {
    let document = settings.document_path.clone();
    let cache_path = settings.cache_path.clone();
    let indexer = indexer(settings, env_var)?;

    println!("[*] 문서: {}", document.display());

    let outcome = if force {
        println!("[*] 강제 재생성 중...");
        IndexOutcome::Built(
            indexer
                .rebuild(&document, &cache_path)
                .await
                .context("인덱스 생성 실패")?,
        )
    } else {
        indexer
            .build_or_load_index(&document, &cache_path)
            .await
            .context("인덱스 준비 실패")?
    };

    let kb = outcome.knowledge_base();
    if outcome.was_built() {
        println!("[OK] 인덱스 생성됨: {} 청크", kb.len());
    } else {
        println!("[OK] 기존 인덱스 사용: {} 청크", kb.len());
    }
    println!("     캐시: {}", cache_path.display());

    Ok(())
}

/// 웹 폼 서버 명령어 (serve)
async fn cmd_serve(settings: Settings, bind: Option<SocketAddr>) -> Result<()> {
    let bind = bind.unwrap_or(settings.server.bind);
    let service = query_service(settings, env_var).await?;

    crate::web::serve(Arc::new(service), bind).await
}

/// 단발 질문 명령어 (ask)
///
/// Ctrl-C를 누르면 진행 중인 요청을 취소합니다.
async fn cmd_ask(settings: Settings, question: &str) -> Result<()> {
    let service = query_service(settings, env_var).await?;

    let token = CancellationToken::new();
    let watcher = {
        let token = token.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                token.cancel();
            }
        })
    };

    println!("[*] 답변 대기 중... 🔎");
    let result = service.answer(question, &token).await;
    watcher.abort();

    match result {
        Ok(answer) => {
            println!("\nAnswer:\n{}", answer.text);
            Ok(())
        }
        Err(Error::Cancelled) => {
            println!("[!] 취소되었습니다");
            Ok(())
        }
        Err(e) => Err(e).context("답변 생성 실패"),
    }
}

/// 검색 명령어 (search)
async fn cmd_search(settings: Settings, query: &str, limit: Option<usize>) -> Result<()> {
    let limit = limit.unwrap_or(settings.retrieval.top_k);
    let (kb, embedder) = open_index(settings, env_var).await?;

    println!("[*] 검색 중: \"{}\"", query);

    let query_embedding = embedder.embed(query).await.context("쿼리 임베딩 실패")?;
    let results = kb.search(&query_embedding, limit);

    if results.is_empty() {
        println!("\n[!] 검색 결과가 없습니다.");
        return Ok(());
    }

    println!("\n[OK] 검색 결과 ({} 건):\n", results.len());

    for (i, result) in results.iter().enumerate() {
        println!(
            "{}. [chunk #{}] distance {:.4}",
            i + 1,
            result.chunk.index,
            result.distance
        );
        println!("   위치: {}..{}", result.chunk.start, result.chunk.end);
        println!("   내용: {}", preview(&result.chunk.text, 200));
        println!();
    }

    Ok(())
}

/// 상태 확인 명령어 (status)
async fn cmd_status(settings: Settings) -> Result<()> {
    println!("pdf-wizard v{}", env!("CARGO_PKG_VERSION"));
    println!();

    let document = &settings.document_path;
    match std::fs::metadata(document) {
        Ok(meta) => println!(
            "[OK] 문서: {} ({})",
            document.display(),
            format_size(meta.len())
        ),
        Err(_) => println!("[!] 문서 없음: {}", document.display()),
    }

    if has_api_key() {
        println!("[OK] API 키: 설정됨");
    } else {
        println!("[!] API 키: 미설정");
        println!("    설정: export {}=your-key", API_KEY_ENV);
    }

    let cache_path = &settings.cache_path;
    if !cache_path.exists() {
        println!("[!] 인덱스 없음: {}", cache_path.display());
        println!("    생성: pdf-wizard index");
        return Ok(());
    }

    match cache::load(cache_path) {
        Ok(kb) => print_index_status(&kb, cache_path, document),
        Err(e) => println!("[!] 인덱스 로드 실패: {}", e),
    }

    Ok(())
}

fn print_index_status(kb: &KnowledgeBase, cache_path: &Path, document: &Path) {
    let meta = kb.meta();
    let file_size = std::fs::metadata(cache_path)
        .map(|m| format_size(m.len()))
        .unwrap_or_else(|_| "?".to_string());

    println!("[OK] 인덱스: {} ({})", cache_path.display(), file_size);
    println!("     청크: {} 건 (텍스트 {} 문자)", kb.len(), kb.total_chars());
    println!(
        "     임베딩: {} (dim {}, normalized {})",
        meta.model_name, meta.dimension, meta.normalized
    );
    println!(
        "     청크 설정: size {}, overlap {}",
        meta.chunk_size, meta.chunk_overlap
    );
    println!("     생성 시각: {}", meta.created_at.format("%Y-%m-%d %H:%M:%S UTC"));

    match document_digest(document) {
        Ok(digest) if digest == meta.source_digest => println!("[OK] 인덱스가 문서와 일치합니다"),
        Ok(_) => println!("[!] 문서가 변경되었습니다 (다음 index 실행 시 재생성)"),
        Err(_) => {}
    }
}

// ============================================================================
// Helpers
// ============================================================================

/// 환경변수 조회 함수
type EnvLookup = fn(&str) -> Option<String>;

fn env_var(key: &str) -> Option<String> {
    std::env::var(key).ok()
}

fn embedder(settings: &Settings, lookup: EnvLookup) -> Result<Arc<dyn EmbeddingProvider>> {
    create_embedder(&settings.embedding, embedding_api_token(lookup))
        .context("임베딩 모델 초기화 실패")
}

fn indexer(settings: Settings, lookup: EnvLookup) -> Result<Indexer> {
    let embedder = embedder(&settings, lookup)?;
    Indexer::new(settings, embedder).context("인덱서 초기화 실패")
}

/// 인덱스 준비 (없으면 생성)
async fn open_index(
    settings: Settings,
    lookup: EnvLookup,
) -> Result<(KnowledgeBase, Arc<dyn EmbeddingProvider>)> {
    let embedder = embedder(&settings, lookup)?;
    let document = settings.document_path.clone();
    let cache_path = settings.cache_path.clone();

    let outcome = Indexer::new(settings, embedder.clone())
        .context("인덱서 초기화 실패")?
        .build_or_load_index(&document, &cache_path)
        .await
        .context("인덱스 준비 실패")?;

    Ok((outcome.into_inner(), embedder))
}

/// 질의 서비스 구성
///
/// 인증 정보를 가장 먼저 확인해, 없으면 문서나 인덱스를 건드리기 전에 실패합니다.
async fn query_service(settings: Settings, lookup: EnvLookup) -> Result<QueryService> {
    let credentials = Credentials::from_lookup(lookup).with_context(|| {
        format!(
            "API 키가 설정되지 않았습니다.\n\n\
             설정 방법:\n  \
             export {}=your-api-key",
            API_KEY_ENV
        )
    })?;

    let generator =
        BamGenerator::new(credentials, &settings.generation).context("생성 클라이언트 초기화 실패")?;

    let (kb, embedder) = open_index(settings.clone(), lookup).await?;

    QueryService::new(kb, &settings, embedder, Arc::new(generator)).context("질의 서비스 초기화 실패")
}

/// 검색 결과 미리보기: 공백 묶음을 한 칸으로 접고 글자 수 기준으로 자름
fn preview(text: &str, max_chars: usize) -> String {
    let collapsed = text.split_whitespace().collect::<Vec<_>>().join(" ");
    match collapsed.char_indices().nth(max_chars) {
        Some((cut, _)) => format!("{}...", &collapsed[..cut]),
        None => collapsed,
    }
}

/// 파일 크기 표시 (1024 단위)
fn format_size(size: u64) -> String {
    const UNITS: [&str; 3] = ["KB", "MB", "GB"];

    if size < 1024 {
        return format!("{size} B");
    }
    let mut value = size as f64 / 1024.0;
    let mut unit = 0;
    while value >= 1024.0 && unit + 1 < UNITS.len() {
        value /= 1024.0;
        unit += 1;
    }
    format!("{value:.2} {}", UNITS[unit])
}

// ============================================================================
// Tests
// ============================================================================
