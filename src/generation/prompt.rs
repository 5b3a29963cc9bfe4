//! 프롬프트 구성
//!
//! 검색된 청크 전체를 컨텍스트로 한 번에 넣는 "stuff" 방식입니다.

use crate::knowledge::SearchResult;

const INSTRUCTIONS: &str = "Use the following pieces of context to answer the question at the end. \
If you don't know the answer, just say that you don't know, don't try to make up an answer.";

/// 질문 + 검색 결과로 프롬프트 생성
///
/// 청크는 검색 순서대로 빈 줄로 구분해 넣습니다.
pub fn build_prompt(question: &str, context: &[SearchResult]) -> String {
    let context_block = context
        .iter()
        .map(|result| result.chunk.text.as_str())
        .collect::<Vec<_>>()
        .join("\n\n");

    format!("{INSTRUCTIONS}\n\n{context_block}\n\nQuestion: {question}\nHelpful Answer:")
}
