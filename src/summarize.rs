use std::fmt;
use crate::error::{AppError, Result};
use crate::llm::{ChatClient, Sampling};

/// Longest input, in characters, forwarded to the model for summarization.
pub const MAX_SUMMARY_INPUT_CHARS: usize = 12_000;

const SUMMARY_SAMPLING: Sampling = Sampling {
    max_tokens: Some(1000),
    temperature: Some(0.5),
};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Language {
    Ja,
    En,
}

impl Language {
    fn summary_instruction(self) -> &'static str {
        match self {
            Language::Ja => "以下の文章を内容を維持したまま、できるだけ詳しくわかりやすく要約してください。省略しすぎないようにしてください。",
            Language::En => "Please summarize the following text in English in as much detail as possible while keeping its content intact. Do not omit too much.",
        }
    }

    fn truncation_marker(self) -> &'static str {
        match self {
            Language::Ja => "...(テキストが長すぎるため、一部のみを要約しています)",
            Language::En => "...(Text is too long, only summarizing the first part)",
        }
    }

    fn truncation_note(self) -> &'static str {
        match self {
            Language::Ja => "\n\n(注: 元のテキストが長すぎるため、最初の部分のみを要約しています)",
            Language::En => "\n\n(Note: The original text was too long, only the first part was summarized)",
        }
    }

    fn translation_instruction(self) -> &'static str {
        match self {
            Language::Ja => "以下の文章を日本語に翻訳してください。",
            Language::En => "Please translate the following text into English.",
        }
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Language::Ja => "ja",
            Language::En => "en",
        })
    }
}

impl std::str::FromStr for Language {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim() {
            "ja" => Ok(Language::Ja),
            "en" => Ok(Language::En),
            other => Err(AppError::InvalidInput(format!(
                "targetLang must be 'ja' or 'en', got '{}'",
                other
            ))),
        }
    }
}

/// Text to send upstream, plus whether it was cut to fit the budget.
#[derive(Debug, PartialEq)]
pub struct PreparedInput {
    pub text: String,
    pub truncated: bool,
}

pub fn prepare_input(text: &str, lang: Language) -> PreparedInput {
    match text.char_indices().nth(MAX_SUMMARY_INPUT_CHARS) {
        Some((cut, _)) => {
            let marker = lang.truncation_marker();
            let mut result = String::with_capacity(cut + marker.len());
            result.push_str(&text[..cut]);
            result.push_str(marker);
            PreparedInput { text: result, truncated: true }
        }
        None => PreparedInput { text: text.to_string(), truncated: false },
    }
}

pub async fn summarize(llm: &ChatClient, text: &str, lang: Language) -> Result<String> {
    require_text(text)?;

    let input = prepare_input(text, lang);
    tracing::debug!(
        %lang,
        chars = text.chars().count(),
        truncated = input.truncated,
        "requesting summary"
    );

    let mut summary = llm
        .complete(lang.summary_instruction(), &input.text, SUMMARY_SAMPLING)
        .await
        .map_err(|e| AppError::SummarizationError(e.to_string()))?;

    if input.truncated {
        summary.push_str(lang.truncation_note());
    }

    Ok(summary)
}

/// Forwards the whole text; translation has no input budget.
pub async fn translate(llm: &ChatClient, text: &str, target: Language) -> Result<String> {
    require_text(text)?;
    tracing::debug!(%target, chars = text.chars().count(), "requesting translation");

    llm.complete(target.translation_instruction(), text, Sampling::default())
        .await
        .map_err(|e| AppError::TranslationError(e.to_string()))
}

pub fn require_text(text: &str) -> Result<()> {
    if text.trim().is_empty() {
        return Err(AppError::InvalidInput("text must not be empty".to_string()));
    }
    Ok(())
}
