//! CLI 모듈
//!
//! pdf-chat CLI 명령어 정의 및 구현

use std::io::Write;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use tokio::io::{AsyncBufReadExt, BufReader};

use crate::collector::FileCollector;
use crate::config::{AppConfig, EmbeddingBackend};
use crate::embedding::{create_embedder, has_api_key};
use crate::extractor::extract_documents;
use crate::knowledge::{
    character_chunker, AskOutcome, ChatTurn, ProcessReport, RetrievalSession, Role,
};

// ============================================================================
// CLI Definition
// ============================================================================

#[derive(Parser)]
#[command(name = "pdf-chat")]
#[command(version, about = "PDF 문서 대화형 검색 도구", long_about = None)]
pub struct Cli {
    #[command(flatten)]
    pub options: PipelineOptions,

    #[command(subcommand)]
    pub command: Commands,
}

/// 파이프라인 설정 덮어쓰기 (환경변수보다 우선)
#[derive(Args, Debug, Clone, Default)]
pub struct PipelineOptions {
    /// 청크 크기 (문자)
    #[arg(long, global = true)]
    pub chunk_size: Option<usize>,

    /// 청크 오버랩 (문자)
    #[arg(long, global = true)]
    pub chunk_overlap: Option<usize>,

    /// 청크 구분자 (\n, \t 이스케이프 지원)
    #[arg(long, global = true)]
    pub separator: Option<String>,

    /// 질문당 검색할 청크 수
    #[arg(long, global = true)]
    pub top_k: Option<usize>,

    /// 발췌 길이 (문자)
    #[arg(long, global = true)]
    pub excerpt_chars: Option<usize>,

    /// 최소 유사도 (-1.0 ~ 1.0)
    #[arg(long, global = true, allow_negative_numbers = true)]
    pub min_score: Option<f32>,

    /// 임베딩 백엔드 (auto, gemini, hash)
    #[arg(long, global = true)]
    pub embedder: Option<EmbeddingBackend>,

    /// 임베딩 차원
    #[arg(long, global = true)]
    pub dimension: Option<usize>,
}

impl PipelineOptions {
    /// 설정에 CLI 값 적용
    pub fn apply(&self, config: &mut AppConfig) {
        if let Some(v) = self.chunk_size {
            config.chunk.chunk_size = v;
        }
        if let Some(v) = self.chunk_overlap {
            config.chunk.chunk_overlap = v;
        }
        if let Some(ref v) = self.separator {
            config.chunk.separator = unescape_separator(v);
        }
        if let Some(v) = self.top_k {
            config.retrieval.top_k = v;
        }
        if let Some(v) = self.excerpt_chars {
            config.retrieval.excerpt_chars = v;
        }
        if let Some(v) = self.min_score {
            config.retrieval.min_score = Some(v);
        }
        if let Some(v) = self.embedder {
            config.embedding.backend = v;
        }
        if let Some(v) = self.dimension {
            config.embedding.dimension = Some(v);
        }
    }
}

#[derive(Subcommand)]
pub enum Commands {
    /// PDF를 처리한 뒤 대화형으로 질문
    Chat {
        /// PDF 파일 또는 폴더
        #[arg(required = true)]
        paths: Vec<PathBuf>,
    },

    /// PDF를 처리하고 질문에 한 번 답변
    Ask {
        /// PDF 파일 또는 폴더
        #[arg(required = true)]
        paths: Vec<PathBuf>,

        /// 질문 (여러 번 지정 가능)
        #[arg(short, long = "question", required = true)]
        questions: Vec<String>,
    },

    /// PDF 텍스트를 추출해 청크 목록 출력
    Chunk {
        /// PDF 파일 또는 폴더
        #[arg(required = true)]
        paths: Vec<PathBuf>,

        /// 출력할 청크 수 제한
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
    let config = load_config(&cli.options)?;

    match cli.command {
        Commands::Chat { paths } => cmd_chat(&config, &paths).await,
        Commands::Ask { paths, questions } => cmd_ask(&config, &paths, &questions).await,
        Commands::Chunk { paths, limit } => cmd_chunk(&config, &paths, limit).await,
        Commands::Status => cmd_status(&config),
    }
}

/// 기본값 → 환경변수 → CLI 순으로 설정 구성
fn load_config(options: &PipelineOptions) -> Result<AppConfig> {
    let mut config = AppConfig::from_env().context("환경변수 설정 읽기 실패")?;
    options.apply(&mut config);
    config.validate().context("잘못된 설정")?;
    tracing::debug!("Effective config: {:?}", config);
    Ok(config)
}

/// 설정으로 검색 세션 생성
fn build_session(config: &AppConfig) -> Result<RetrievalSession> {
    let embedder = create_embedder(&config.embedding).context("임베딩 프로바이더 생성 실패")?;
    let chunker = character_chunker(config.chunk.clone())?;
    Ok(RetrievalSession::new(
        embedder,
        chunker,
        config.retrieval.clone(),
    ))
}

/// 경로 수집 → 세션 처리
async fn process_paths(session: &mut RetrievalSession, paths: &[PathBuf]) -> Result<ProcessReport> {
    let documents = FileCollector::with_defaults().collect_documents(paths)?;
    println!("[*] {} 개 문서 처리 중...", documents.len());

    let report = session.process(documents).await?;

    println!("[OK] Extracted {} characters", report.characters);
    println!("[OK] Split into {} chunks", report.chunks);
    println!(
        "     문서 {}, 페이지 {}, 임베딩: {}",
        report.documents,
        report.pages,
        session.embedder_name()
    );
    Ok(report)
}

// ============================================================================
// Command Implementations
// ============================================================================

/// 대화 명령어 (chat)
///
/// 문서를 처리한 뒤 표준 입력에서 질문을 읽습니다.
/// `/`로 시작하는 줄은 세션 명령어입니다.
async fn cmd_chat(config: &AppConfig, paths: &[PathBuf]) -> Result<()> {
    let mut session = build_session(config)?;

    if let Err(e) = process_paths(&mut session, paths).await {
        println!("[!] 처리 실패: {:#}", e);
        println!("    /process <PDF>... 로 다시 시도하세요.");
    }

    println!();
    println!("질문을 입력하세요. 명령어: /clear /history /process <PDF>... /status /quit");
    println!("(공백이 있는 경로는 따옴표로: /process \"My Docs/report.pdf\")");

    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    loop {
        print!("> ");
        std::io::stdout().flush()?;

        let Some(line) = lines.next_line().await? else {
            break;
        };
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        if let Some(command) = line.strip_prefix('/') {
            match ReplCommand::parse(command) {
                ReplCommand::Quit => break,
                ReplCommand::Clear => {
                    session.clear_history();
                    println!("[OK] 대화 기록을 지웠습니다.");
                }
                ReplCommand::History => {
                    if session.history().is_empty() {
                        println!("[!] 대화 기록이 없습니다.");
                    }
                    print_turns(session.history());
                }
                ReplCommand::Process(new_paths) => {
                    if new_paths.is_empty() {
                        println!("[!] 사용법: /process <PDF>...");
                    } else if let Err(e) = process_paths(&mut session, &new_paths).await {
                        println!("[!] 처리 실패: {:#}", e);
                    }
                }
                ReplCommand::Status => print_session_status(&session),
                ReplCommand::Unknown(name) => println!("[!] 알 수 없는 명령어: /{}", name),
                ReplCommand::Malformed(args) => {
                    println!("[!] 따옴표가 닫히지 않았습니다: {}", args)
                }
            }
            continue;
        }

        let before = session.history().len();
        match session.ask(line).await {
            AskOutcome::NotReady => {
                println!("[!] 처리된 문서가 없습니다. /process <PDF>... 로 먼저 처리하세요.");
            }
            outcome => {
                if let AskOutcome::Failed { ref error, .. } = outcome {
                    eprintln!("[!] {}", error);
                }
                print_turns(&session.history()[before..]);
            }
        }
    }

    Ok(())
}

/// 단발 질문 명령어 (ask)
async fn cmd_ask(config: &AppConfig, paths: &[PathBuf], questions: &[String]) -> Result<()> {
    let mut session = build_session(config)?;
    process_paths(&mut session, paths)
        .await
        .context("문서 처리 실패")?;
    println!();

    for question in questions {
        if let AskOutcome::Failed { error, .. } = session.ask(question).await {
            eprintln!("[!] {}", error);
        }
    }

    print_turns(session.history());
    Ok(())
}

/// 청크 확인 명령어 (chunk)
///
/// 임베딩 없이 추출과 청킹 결과만 보여줍니다.
async fn cmd_chunk(config: &AppConfig, paths: &[PathBuf], limit: Option<usize>) -> Result<()> {
    let documents = FileCollector::with_defaults().collect_documents(paths)?;
    let extracted = extract_documents(documents).await?;
    println!("[OK] Extracted {} characters", extracted.char_count());

    let chunker = character_chunker(config.chunk.clone())?;
    let chunks = chunker.chunk(&extracted.text);
    println!(
        "[OK] Split into {} chunks (size: {}, overlap: {}, separator: {:?})",
        chunks.len(),
        config.chunk.chunk_size,
        config.chunk.chunk_overlap,
        config.chunk.separator
    );
    println!();

    let shown = limit.unwrap_or(chunks.len());
    for chunk in chunks.iter().take(shown) {
        println!(
            "  #{:<4} [{}..{}] {} chars",
            chunk.index,
            chunk.start,
            chunk.end,
            chunk.char_len()
        );
        println!("        {}", truncate_text(&chunk.content, 80));
    }

    if shown < chunks.len() {
        println!();
        println!("  ... {} 개 더 있음", chunks.len() - shown);
    }

    Ok(())
}

/// 상태 명령어 (status)
fn cmd_status(config: &AppConfig) -> Result<()> {
    println!("pdf-chat v{}", env!("CARGO_PKG_VERSION"));
    println!();

    // API 키 상태
    let key = has_api_key();
    if key {
        println!("[OK] API 키: 설정됨");
    } else {
        println!("[!] API 키: 미설정 (로컬 해시 임베딩 사용)");
        println!("    설정: export GEMINI_API_KEY=your-key");
    }

    let backend = config.embedding.resolve_backend(key);
    println!("[*] 임베딩 백엔드: {} ({})", backend, config.embedding.backend);
    if backend == EmbeddingBackend::Gemini && !key {
        println!("[!] Gemini 백엔드에는 API 키가 필요합니다");
    }

    println!();
    println!("[*] 설정:");
    println!("{}", serde_json::to_string_pretty(config)?);

    Ok(())
}

// ============================================================================
// REPL
// ============================================================================

/// 대화 중 `/` 명령어
#[derive(Debug, Clone, PartialEq)]
enum ReplCommand {
    Clear,
    History,
    Process(Vec<PathBuf>),
    Status,
    Quit,
    Unknown(String),
    /// 따옴표가 닫히지 않음
    Malformed(String),
}

impl ReplCommand {
    /// `/` 뒤의 문자열 파싱
    ///
    /// 인자는 셸 규칙으로 나눕니다. 공백이 든 경로는 따옴표로 감쌉니다.
    fn parse(input: &str) -> Self {
        let input = input.trim_start();
        let (name, rest) = input
            .split_once(char::is_whitespace)
            .unwrap_or((input, ""));

        match name.to_ascii_lowercase().as_str() {
            "clear" => Self::Clear,
            "history" => Self::History,
            "process" => match shlex::split(rest) {
                Some(args) => Self::Process(args.into_iter().map(PathBuf::from).collect()),
                None => Self::Malformed(rest.trim().to_string()),
            },
            "status" => Self::Status,
            "quit" | "exit" | "q" => Self::Quit,
            _ => Self::Unknown(name.to_string()),
        }
    }
}

fn print_session_status(session: &RetrievalSession) {
    match session.index() {
        Ok(index) => println!(
            "[OK] 인덱스: {} 청크 ({}차원, {})",
            index.len(),
            index.dimension(),
            session.embedder_name()
        ),
        Err(_) => println!("[!] 인덱스: 없음"),
    }
    let config = session.config();
    println!(
        "     top_k: {}, 발췌: {}자, 대화 기록: {} 턴",
        config.top_k,
        config.excerpt_chars,
        session.history().len()
    );
}

fn print_turns(turns: &[ChatTurn]) {
    for turn in turns {
        println!("{}", format_turn(turn));
        println!();
    }
}

fn format_turn(turn: &ChatTurn) -> String {
    let role = match turn.role {
        Role::User => "You",
        Role::Assistant => "Assistant",
    };
    format!(
        "[{}] {}:\n{}",
        turn.created_at.format("%H:%M:%S"),
        role,
        turn.content
    )
}

// ============================================================================
// Helper Functions
// ============================================================================

/// `\n`, `\t` 이스케이프를 실제 문자로
fn unescape_separator(raw: &str) -> String {
    raw.replace("\\n", "\n")
        .replace("\\t", "\t")
        .replace("\\r", "\r")
}

/// 텍스트 자르기 (UTF-8 안전)
fn truncate_text(text: &str, max_chars: usize) -> String {
    let cleaned = text.replace('\n', " ").replace('\r', "");
    let cleaned = cleaned.trim();

    if cleaned.chars().count() <= max_chars {
        cleaned.to_string()
    } else {
        let truncated: String = cleaned.chars().take(max_chars).collect();
        format!("{}...", truncated)
    }
}

// ============================================================================
// Tests
// ============================================================================
