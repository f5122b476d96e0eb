//! 콘텐츠 추출 모듈
//!
//! 업로드된 PDF 문서 묶음에서 텍스트 하나를 만들어 냅니다.
//! 문서는 업로드 순서대로, 페이지는 파일 내 순서대로 이어 붙이며
//! 페이지/문서 경계에는 줄바꿈 하나를 넣습니다.

pub mod pdf;

use crate::error::{PipelineError, PipelineResult};

// ============================================================================
// Document
// ============================================================================

/// 업로드된 문서 (원본 바이트)
#[derive(Debug, Clone)]
pub struct Document {
    /// 표시용 이름 (파일명)
    pub name: String,
    /// PDF 원본 바이트
    pub bytes: Vec<u8>,
}

impl Document {
    pub fn new(name: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            name: name.into(),
            bytes,
        }
    }
}

/// 추출 결과
#[derive(Debug, Clone)]
pub struct ExtractedText {
    /// 이어 붙인 전체 텍스트
    pub text: String,
    /// 처리한 문서 수
    pub documents: usize,
    /// 처리한 페이지 수
    pub pages: usize,
}

impl ExtractedText {
    /// 추출된 문자 수 (코드 포인트)
    pub fn char_count(&self) -> usize {
        self.text.chars().count()
    }
}

// ============================================================================
// Extraction
// ============================================================================

/// 문서 묶음에서 텍스트 추출
///
/// 문서가 없으면 `NoDocuments`, 파싱 실패는 `Extraction`,
/// 결과 텍스트가 공백뿐이면 `ExtractionEmpty`입니다.
pub async fn extract_documents(documents: Vec<Document>) -> PipelineResult<ExtractedText> {
    if documents.is_empty() {
        return Err(PipelineError::NoDocuments);
    }

    // PDF 파싱은 CPU 바운드이므로 spawn_blocking 사용
    let result = tokio::task::spawn_blocking(move || extract_documents_blocking(&documents))
        .await
        .map_err(|e| PipelineError::Extraction {
            document: "<batch>".to_string(),
            message: format!("PDF extraction task failed: {}", e),
        })??;

    if result.text.trim().is_empty() {
        return Err(PipelineError::ExtractionEmpty);
    }

    tracing::info!(
        "Extracted {} characters from {} document(s), {} page(s)",
        result.char_count(),
        result.documents,
        result.pages
    );

    Ok(result)
}

/// 동기 추출 (문서 순서 → 페이지 순서)
fn extract_documents_blocking(documents: &[Document]) -> PipelineResult<ExtractedText> {
    let mut parts: Vec<String> = Vec::new();
    let mut pages = 0;

    for document in documents {
        let extracted = pdf::extract_pages_from_pdf(&document.name, &document.bytes).map_err(
            |e| PipelineError::Extraction {
                document: document.name.clone(),
                message: format!("{:#}", e),
            },
        )?;

        tracing::debug!("{}: {} page(s)", document.name, extracted.len());
        pages += extracted.len();
        parts.extend(
            extracted
                .into_iter()
                .map(|(_, text)| text)
                .filter(|text| !text.is_empty()),
        );
    }

    Ok(ExtractedText {
        text: parts.join("\n"),
        documents: documents.len(),
        pages,
    })
}

// ============================================================================
// Tests
// ============================================================================
