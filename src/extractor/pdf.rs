//! PDF 텍스트 추출 모듈
//!
//! pdf-extract 크레이트를 사용하여 PDF 바이트에서 텍스트를 추출합니다.

use anyhow::{Context, Result};

/// PDF 바이트에서 페이지별 텍스트 추출
///
/// (페이지 번호, 텍스트) 튜플 벡터를 반환합니다. 페이지 번호는 1부터 시작합니다.
/// 텍스트가 없는 PDF(스캔 문서 등)는 빈 1페이지를 돌려줍니다.
pub fn extract_pages_from_pdf(name: &str, bytes: &[u8]) -> Result<Vec<(usize, String)>> {
    let text = pdf_extract::extract_text_from_mem(bytes)
        .with_context(|| format!("Failed to extract text from PDF: {}", name))?;

    if text.trim().is_empty() {
        tracing::warn!(
            "No text extracted from PDF: {}. It might be a scanned document.",
            name
        );
        return Ok(vec![(1, String::new())]);
    }

    Ok(split_pdf_pages(&text)
        .into_iter()
        .enumerate()
        .map(|(i, text)| (i + 1, text))
        .collect())
}

/// PDF 텍스트를 페이지별로 분리
///
/// pdf-extract가 페이지 사이에 넣는 폼피드(\x0c)만 경계로 봅니다.
/// 본문 텍스트는 한 글자도 버리지 않습니다.
fn split_pdf_pages(text: &str) -> Vec<String> {
    text.split('\x0c')
        .map(|page| page.trim().to_string())
        .filter(|page| !page.is_empty())
        .collect()
}

// ============================================================================
// Tests
// ============================================================================
