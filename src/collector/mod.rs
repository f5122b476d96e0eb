//! 파일 수집 모듈
//!
//! CLI로 받은 경로(PDF 파일 또는 폴더)에서 업로드할 PDF 문서를 모읍니다.
//! 폴더는 .gitignore 패턴을 존중하며 재귀 탐색하고, `.pdf` 파일만 수집합니다.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use ignore::WalkBuilder;

use crate::extractor::Document;

/// 기본 최대 파일 크기 (50MB)
pub const DEFAULT_MAX_FILE_SIZE: u64 = 50 * 1024 * 1024;

// ============================================================================
// Collected File
// ============================================================================

/// 수집된 PDF 파일 정보
#[derive(Debug, Clone)]
pub struct CollectedFile {
    /// 파일 절대 경로
    pub path: PathBuf,
    /// 파일 크기 (바이트)
    pub size: u64,
}

impl CollectedFile {
    /// 표시용 이름 (파일명)
    pub fn display_name(&self) -> String {
        self.path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| self.path.display().to_string())
    }

    /// 파일을 읽어 업로드 문서로 변환
    pub fn read(&self) -> Result<Document> {
        let bytes = std::fs::read(&self.path)
            .with_context(|| format!("Failed to read file: {:?}", self.path))?;
        Ok(Document::new(self.display_name(), bytes))
    }
}

/// 확장자가 `.pdf`인지 (대소문자 무시)
pub fn is_pdf(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.eq_ignore_ascii_case("pdf"))
        .unwrap_or(false)
}

// ============================================================================
// File Collector
// ============================================================================

/// 파일 수집기 설정
#[derive(Debug, Clone)]
pub struct CollectorConfig {
    /// .gitignore 패턴 존중 여부
    pub respect_gitignore: bool,
    /// 숨김 파일 포함 여부
    pub include_hidden: bool,
    /// 최대 파일 크기 (바이트, 0이면 제한 없음)
    pub max_file_size: u64,
}

impl Default for CollectorConfig {
    fn default() -> Self {
        Self {
            respect_gitignore: true,
            include_hidden: false,
            max_file_size: DEFAULT_MAX_FILE_SIZE,
        }
    }
}

/// PDF 파일 수집기
pub struct FileCollector {
    config: CollectorConfig,
}

impl FileCollector {
    /// 새 수집기 생성
    pub fn new(config: CollectorConfig) -> Self {
        Self { config }
    }

    /// 기본 설정으로 수집기 생성
    pub fn with_defaults() -> Self {
        Self::new(CollectorConfig::default())
    }

    /// 여러 경로 수집 (인자 순서 → 폴더 내 탐색 순서)
    pub fn collect_paths(&self, paths: &[PathBuf]) -> Result<Vec<CollectedFile>> {
        let mut files = Vec::new();

        for path in paths {
            let abs_path = absolute(path)?;
            if abs_path.is_dir() {
                files.extend(self.collect_directory(&abs_path)?);
            } else {
                files.extend(self.collect_file(&abs_path)?);
            }
        }

        Ok(files)
    }

    /// 여러 경로를 읽어 업로드 문서 목록 생성
    pub fn collect_documents(&self, paths: &[PathBuf]) -> Result<Vec<Document>> {
        self.collect_paths(paths)?
            .iter()
            .map(CollectedFile::read)
            .collect()
    }

    /// 단일 파일 수집
    ///
    /// PDF가 아니면 에러, 크기 제한을 넘으면 경고 후 `None`입니다.
    pub fn collect_file(&self, path: &Path) -> Result<Option<CollectedFile>> {
        let abs_path = absolute(path)?;

        if !abs_path.exists() {
            anyhow::bail!("File not found: {:?}", abs_path);
        }

        if !abs_path.is_file() {
            anyhow::bail!("Not a file: {:?}", abs_path);
        }

        if !is_pdf(&abs_path) {
            anyhow::bail!("Not a PDF file: {:?}", abs_path);
        }

        let file = self.inspect(abs_path)?;
        Ok(self.should_include(&file).then_some(file))
    }

    /// 폴더 재귀 수집 (파일명 순)
    pub fn collect_directory(&self, path: &Path) -> Result<Vec<CollectedFile>> {
        let abs_path = absolute(path)?;

        if !abs_path.exists() {
            anyhow::bail!("Directory not found: {:?}", abs_path);
        }

        if !abs_path.is_dir() {
            anyhow::bail!("Not a directory: {:?}", abs_path);
        }

        let mut files = Vec::new();

        // ignore 크레이트로 .gitignore 지원
        let walker = WalkBuilder::new(&abs_path)
            .hidden(!self.config.include_hidden)
            .git_ignore(self.config.respect_gitignore)
            .git_global(self.config.respect_gitignore)
            .git_exclude(self.config.respect_gitignore)
            .sort_by_file_name(|a, b| a.cmp(b))
            .build();

        for entry in walker {
            let entry = match entry {
                Ok(e) => e,
                Err(e) => {
                    tracing::warn!("Failed to read entry: {}", e);
                    continue;
                }
            };

            // 파일만 처리
            if !entry.file_type().map(|ft| ft.is_file()).unwrap_or(false) {
                continue;
            }

            if !is_pdf(entry.path()) {
                continue;
            }

            match self.inspect(entry.path().to_path_buf()) {
                Ok(file) => {
                    if self.should_include(&file) {
                        files.push(file);
                    }
                }
                Err(e) => {
                    tracing::warn!("Failed to collect file: {:#}", e);
                }
            }
        }

        tracing::info!("Collected {} PDF files from {:?}", files.len(), abs_path);
        Ok(files)
    }

    fn inspect(&self, path: PathBuf) -> Result<CollectedFile> {
        let metadata = std::fs::metadata(&path)
            .with_context(|| format!("Failed to read metadata: {:?}", path))?;
        Ok(CollectedFile {
            path,
            size: metadata.len(),
        })
    }

    /// 파일 크기 제한 확인
    fn should_include(&self, file: &CollectedFile) -> bool {
        if self.config.max_file_size > 0 && file.size > self.config.max_file_size {
            tracing::warn!("Skipping large file: {:?} ({} bytes)", file.path, file.size);
            return false;
        }
        true
    }
}

fn absolute(path: &Path) -> Result<PathBuf> {
    if path.is_absolute() {
        Ok(path.to_path_buf())
    } else {
        Ok(std::env::current_dir()?.join(path))
    }
}

// ============================================================================
// Tests
// ============================================================================
