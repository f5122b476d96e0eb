//! 검색 결과를 답변 텍스트로 조립

use super::vector::SearchHit;

/// 검색 결과가 없을 때의 답변
pub const NO_MATCH_RESPONSE: &str = "I couldn't find any relevant information in your documents.";

/// 질문 처리 중 에러가 났을 때의 답변
pub const APOLOGY_RESPONSE: &str = "Sorry, I encountered an error while processing your question.";

/// 답변 머리말
const RESPONSE_HEADER: &str = "Based on your documents, here's what I found:\n\n";

/// 발췌 뒤에 붙는 생략 표시
const TRUNCATION_MARKER: &str = "...";

/// 순위대로 발췌문을 이어 붙여 답변 생성
///
/// 각 발췌는 청크 앞부분 `excerpt_chars`자(코드 포인트)까지입니다.
pub fn format_response(hits: &[SearchHit], excerpt_chars: usize) -> String {
    if hits.is_empty() {
        return NO_MATCH_RESPONSE.to_string();
    }

    let parts: Vec<String> = hits
        .iter()
        .enumerate()
        .map(|(i, hit)| {
            format!(
                "**Excerpt {}:**\n{}{}",
                i + 1,
                excerpt(&hit.chunk.content, excerpt_chars),
                TRUNCATION_MARKER
            )
        })
        .collect();

    format!("{}{}", RESPONSE_HEADER, parts.join("\n\n"))
}

/// 앞에서부터 `max_chars`자 잘라내기 (UTF-8 안전)
fn excerpt(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((byte_idx, _)) => &text[..byte_idx],
        None => text,
    }
}
