//! Grounded answer generation
//!
//! Builds the grounded prompt (instruction + numbered source blocks +
//! conversation history + question), invokes the generation capability
//! once, and detects "don't know" answers. On a don't-know answer it
//! makes at most one web-assisted retry: search the raw question, rebuild
//! the prompt with web-labeled context, and generate again. The web
//! answer replaces the original only when it is substantive; every retry
//! failure is swallowed and the original answer stands.

use crate::error::Result;
use crate::providers::{Passage, TextGenerator, WebSearch};
use std::sync::Arc;

/// Maximum characters of a passage quoted into the prompt
const EXCERPT_LIMIT: usize = 500;

/// Number of web results fetched for the don't-know retry
const WEB_RETRY_RESULTS: usize = 3;

/// Minimum length for a web-assisted answer to replace the original
const MIN_WEB_ANSWER_CHARS: usize = 50;

/// Phrases marking an answer as "don't know" (checked lowercased)
const DONT_KNOW_PHRASES: [&str; 4] = ["don't know", "do not know", "cannot be found", "not contain"];

/// System instruction for grounded chat answers
const SYSTEM_INSTRUCTION: &str = "You are a helpful and knowledgeable assistant. Use ONLY the information provided in the Context (documents) and the Conversation history below to answer. Do NOT invent facts. If the answer cannot be found in the provided context, respond: 'I don't know'. Provide comprehensive, detailed, and thorough answers. Explain concepts clearly with examples when possible. Include relevant background information, step-by-step explanations, and practical insights from the provided sources. Always cite sources when possible (e.g., [Source 1]). For follow-up questions, use the conversation history to resolve references (for example, 'tell more' should refer to the previous topic and expand on it with additional details from the sources).";

/// A generated answer with its effective grounding passages
#[derive(Debug, Clone)]
pub struct GeneratedAnswer {
    /// Answer text
    pub answer: String,
    /// Passages the answer is grounded on; swapped to web passages when
    /// the web-assisted retry was accepted
    pub passages: Vec<Passage>,
    /// Whether the accepted answer came from the web-assisted retry
    pub web_assisted: bool,
}

/// Answer generator over the generation and web-search capabilities
pub struct AnswerGenerator {
    generator: Arc<dyn TextGenerator>,
    web: Arc<dyn WebSearch>,
}

impl AnswerGenerator {
    /// Create a new generator from its capabilities
    pub fn new(generator: Arc<dyn TextGenerator>, web: Arc<dyn WebSearch>) -> Self {
        Self { generator, web }
    }

    /// Produce a grounded answer for a question
    ///
    /// # Arguments
    ///
    /// * `question` - The raw user message
    /// * `history` - Formatted transcript, oldest to newest
    /// * `passages` - Retrieved grounding passages
    /// * `temperature` - Sampling temperature for the primary call
    /// * `max_tokens` - Length hint woven into the prompt
    ///
    /// # Errors
    ///
    /// Fails only when the primary generation call fails; the optional
    /// web-assisted retry swallows all of its own failures.
    ///
    /// Guarantee: exactly one primary generation call, at most one
    /// secondary call.
    pub async fn answer(
        &self,
        question: &str,
        history: &str,
        passages: Vec<Passage>,
        temperature: f32,
        max_tokens: u32,
    ) -> Result<GeneratedAnswer> {
        let prompt = build_prompt(question, history, &passages, max_tokens);
        let answer = self.generator.generate(&prompt, temperature).await?;

        if !looks_unknown(&answer) {
            return Ok(GeneratedAnswer {
                answer,
                passages,
                web_assisted: false,
            });
        }

        tracing::info!("Answer flagged as don't-know, attempting web-assisted retry");
        match self
            .web_retry(question, history, temperature)
            .await
        {
            Some((web_answer, web_passages)) => Ok(GeneratedAnswer {
                answer: web_answer,
                passages: web_passages,
                web_assisted: true,
            }),
            None => Ok(GeneratedAnswer {
                answer,
                passages,
                web_assisted: false,
            }),
        }
    }

    /// Web-assisted second pass; `None` keeps the original answer
    async fn web_retry(
        &self,
        question: &str,
        history: &str,
        temperature: f32,
    ) -> Option<(String, Vec<Passage>)> {
        // The raw question is searched, not the composed retrieval query
        let web_passages = match self.web.search(question, WEB_RETRY_RESULTS).await {
            Ok(results) if !results.is_empty() => results,
            Ok(_) => return None,
            Err(e) => {
                tracing::debug!("Web retry search failed: {}", e);
                return None;
            }
        };

        let prompt = build_web_prompt(question, history, &web_passages);
        let web_answer = match self.generator.generate(&prompt, temperature).await {
            Ok(answer) => answer,
            Err(e) => {
                tracing::debug!("Web retry generation failed: {}", e);
                return None;
            }
        };

        // Accept only a substantive answer that is not itself a don't-know
        if web_answer.chars().count() > MIN_WEB_ANSWER_CHARS
            && !web_answer.to_lowercase().contains("don't know")
        {
            Some((web_answer, web_passages))
        } else {
            None
        }
    }
}

/// Whether an answer reads as "I don't know"
///
/// A lowercase substring match against the known refusal phrases. This is
/// the compatibility contract for the retry trigger; no structured
/// confidence signal exists.
pub fn looks_unknown(answer: &str) -> bool {
    let lowered = answer.to_lowercase();
    DONT_KNOW_PHRASES.iter().any(|phrase| lowered.contains(phrase))
}

/// Build the primary grounded prompt
fn build_prompt(question: &str, history: &str, passages: &[Passage], max_tokens: u32) -> String {
    format!(
        "{}\n\nContext:\n{}\n\nConversation history:\n{}\n\nUser: {}\n\nPlease provide a detailed, comprehensive response (aim for {} tokens or more when appropriate). Include explanations, examples, and thorough coverage of the topic based on the available sources.\n\nAssistant:",
        SYSTEM_INSTRUCTION,
        source_blocks(passages, "Source"),
        history,
        question,
        max_tokens
    )
}

/// Build the web-assisted retry prompt
fn build_web_prompt(question: &str, history: &str, passages: &[Passage]) -> String {
    format!(
        "{}\n\nContext (from web search):\n{}\n\nConversation history:\n{}\n\nUser: {}\n\nPlease provide a detailed, comprehensive response based on the web search results above.\n\nAssistant:",
        SYSTEM_INSTRUCTION,
        source_blocks(passages, "Web Source"),
        history,
        question
    )
}

/// Numbered source blocks with truncated excerpts
fn source_blocks(passages: &[Passage], label: &str) -> String {
    passages
        .iter()
        .enumerate()
        .map(|(i, passage)| {
            format!(
                "[{} {}: {}]\n{}",
                label,
                i + 1,
                passage.source.as_deref().unwrap_or("unknown"),
                excerpt(&passage.content)
            )
        })
        .collect::<Vec<_>>()
        .join("\n\n")
}

/// First 500 characters of a passage, with ellipsis when truncated
fn excerpt(content: &str) -> String {
    if content.chars().count() > EXCERPT_LIMIT {
        let truncated: String = content.chars().take(EXCERPT_LIMIT).collect();
        format!("{}...", truncated)
    } else {
        content.to_string()
    }
}
