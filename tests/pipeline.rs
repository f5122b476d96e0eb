//! 파이프라인 통합 테스트: PDF 바이트 → 추출 → 청킹 → 해시 임베딩 → 검색

use pdf_chat::embedding::HashEmbedding;
use pdf_chat::knowledge::{
    AskOutcome, CharacterChunker, ChunkConfig, RetrievalSession, Role, NO_MATCH_RESPONSE,
};
use pdf_chat::{extract_documents, Document, PipelineError, RetrievalConfig};

/// 페이지마다 주어진 텍스트(줄 단위)를 가진 최소 PDF
fn minimal_pdf(pages: &[&str]) -> Vec<u8> {
    let page_count = pages.len();
    let mut objects: Vec<String> = Vec::new();

    // 1: catalog, 2: pages, 3: font, 4..: (page, contents) 쌍
    let kids: Vec<String> = (0..page_count)
        .map(|i| format!("{} 0 R", 4 + i * 2))
        .collect();
    objects.push("<< /Type /Catalog /Pages 2 0 R >>".to_string());
    objects.push(format!(
        "<< /Type /Pages /Kids [{}] /Count {} >>",
        kids.join(" "),
        page_count
    ));
    objects.push("<< /Type /Font /Subtype /Type1 /BaseFont /Helvetica >>".to_string());

    for (i, text) in pages.iter().enumerate() {
        let contents_id = 5 + i * 2;
        objects.push(format!(
            "<< /Type /Page /Parent 2 0 R /MediaBox [0 0 612 792] /Contents {} 0 R /Resources << /Font << /F1 3 0 R >> >> >>",
            contents_id
        ));
        // 줄마다 Tj 하나, 다음 줄은 20pt 아래
        let stream = if text.is_empty() {
            String::new()
        } else {
            let lines: Vec<String> = text.lines().map(|line| format!("({}) Tj", line)).collect();
            format!("BT /F1 12 Tf 100 700 Td {} ET", lines.join(" 0 -20 Td "))
        };
        objects.push(format!(
            "<< /Length {} >> stream\n{}\nendstream",
            stream.len(),
            stream
        ));
    }

    let mut out = Vec::new();
    out.extend_from_slice(b"%PDF-1.4\n");
    let mut offsets = Vec::new();
    for (i, body) in objects.iter().enumerate() {
        offsets.push(out.len());
        out.extend_from_slice(format!("{} 0 obj {} endobj\n", i + 1, body).as_bytes());
    }

    let xref_start = out.len();
    out.extend_from_slice(format!("xref\n0 {}\n", objects.len() + 1).as_bytes());
    out.extend_from_slice(format!("{:010} 65535 f \n", 0).as_bytes());
    for offset in &offsets {
        out.extend_from_slice(format!("{:010} 00000 n \n", offset).as_bytes());
    }
    out.extend_from_slice(
        format!(
            "trailer << /Size {} /Root 1 0 R >>\nstartxref\n{}\n%%EOF\n",
            objects.len() + 1,
            xref_start
        )
        .as_bytes(),
    );
    out
}

fn session(config: RetrievalConfig) -> RetrievalSession {
    let chunker = CharacterChunker::new(ChunkConfig {
        chunk_size: 200,
        chunk_overlap: 20,
        separator: "\n".to_string(),
    })
    .expect("valid chunk config");
    RetrievalSession::new(
        Box::new(HashEmbedding::with_defaults()),
        Box::new(chunker),
        config,
    )
}

#[tokio::test]
async fn extracts_documents_in_upload_order() {
    let docs = vec![
        Document::new("first.pdf", minimal_pdf(&["alpha phrase"])),
        Document::new("second.pdf", minimal_pdf(&["omega phrase"])),
    ];
    let extracted = extract_documents(docs).await.expect("extract");

    assert_eq!(extracted.documents, 2);
    let alpha = extracted.text.find("alpha phrase").expect("alpha present");
    let omega = extracted.text.find("omega phrase").expect("omega present");
    assert!(alpha < omega);
}

#[tokio::test]
async fn divider_lines_survive_extraction() {
    let pdf = minimal_pdf(&["Quarterly results\n==== 2024 ====\nRevenue grew"]);
    let extracted = extract_documents(vec![Document::new("report.pdf", pdf)])
        .await
        .expect("extract");

    assert!(extracted.text.contains("Quarterly results"));
    assert!(extracted.text.contains("2024"));
    assert!(extracted.text.contains("Revenue grew"));
}

#[tokio::test]
async fn process_then_ask_returns_excerpt() {
    let mut session = session(RetrievalConfig::default());
    let pdf = minimal_pdf(&["solar panels convert sunlight", "wind turbines spin slowly"]);

    let report = session
        .process(vec![Document::new("energy.pdf", pdf)])
        .await
        .expect("process");
    assert_eq!(report.documents, 1);
    assert!(report.characters > 0);
    assert!(report.chunks >= 1);
    assert!(session.is_ready());

    let outcome = session.ask("how do solar panels work").await;
    match &outcome {
        AskOutcome::Answered { response, hits } => {
            assert!(!hits.is_empty());
            assert!(response.starts_with("Based on your documents, here's what I found:"));
            assert!(response.contains("solar panels"));
        }
        other => panic!("unexpected outcome: {:?}", other),
    }

    let history = session.history();
    assert_eq!(history.len(), 2);
    assert_eq!(history[0].role, Role::User);
    assert_eq!(history[1].role, Role::Assistant);
}

#[tokio::test]
async fn ask_without_documents_is_not_ready() {
    let mut session = session(RetrievalConfig::default());
    assert_eq!(session.ask("anything").await, AskOutcome::NotReady);
    assert!(session.history().is_empty());
}

#[tokio::test]
async fn empty_upload_is_rejected() {
    let mut session = session(RetrievalConfig::default());
    let result = session.process(vec![]).await;
    assert_eq!(result.err(), Some(PipelineError::NoDocuments));
    assert!(!session.is_ready());
}

#[tokio::test]
async fn unreadable_pdf_keeps_previous_index() {
    let mut session = session(RetrievalConfig::default());
    session
        .process(vec![Document::new("good.pdf", minimal_pdf(&["kept phrase"]))])
        .await
        .expect("process");
    session.ask("kept").await;
    let chunks = session.index().expect("index").len();

    let result = session
        .process(vec![Document::new("broken.pdf", b"not a pdf at all".to_vec())])
        .await;
    match result {
        Err(PipelineError::Extraction { document, .. }) => assert_eq!(document, "broken.pdf"),
        other => panic!("unexpected result: {:?}", other),
    }

    assert_eq!(session.index().expect("index").len(), chunks);
    assert_eq!(session.history().len(), 2);
}

#[tokio::test]
async fn textless_pdf_is_extraction_empty() {
    let mut session = session(RetrievalConfig::default());
    session
        .process(vec![Document::new("good.pdf", minimal_pdf(&["kept phrase"]))])
        .await
        .expect("process");

    let result = session
        .process(vec![Document::new("scan.pdf", minimal_pdf(&[""]))])
        .await;
    assert_eq!(result.err(), Some(PipelineError::ExtractionEmpty));
    assert!(session.is_ready());
}

#[tokio::test]
async fn strict_threshold_yields_no_match_message() {
    let mut session = session(RetrievalConfig {
        min_score: Some(1.0),
        ..Default::default()
    });
    session
        .process_text("photosynthesis happens in chloroplasts")
        .await
        .expect("process");

    let outcome = session.ask("stock market index funds").await;
    assert_eq!(outcome.response(), Some(NO_MATCH_RESPONSE));
}
