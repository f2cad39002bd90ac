//! System-prompt construction and request content assembly.

use crate::ai::types::{Content, InlineData, Part};
use crate::models::{ActionType, LanguageCode, MediaType, Settings};
use crate::{Error, Result};

const LIST_FORMAT: &str = "Format:\n1. First point.\n2. Second point.\n3. Third point.";

/// Number of list items to request for a summary of `input_len` characters.
fn summary_item_count(input_len: usize) -> usize {
    (3 + input_len / 2000).min(10)
}

/// Build the system prompt for one request.
///
/// Custom actions use the stored per-slot prompt verbatim; summarize and
/// translate are phrased for the media kind and target language.
pub fn system_prompt(
    action: ActionType,
    media: MediaType,
    language: LanguageCode,
    input_len: usize,
    settings: &Settings,
) -> String {
    let language_name = language.display_name(&settings.user_language);

    match action {
        ActionType::Summarize => match media {
            MediaType::Image => format!(
                "Summarize the image as Markdown numbered list in {} and reply only with the list.\n{}",
                language_name, LIST_FORMAT
            ),
            MediaType::Text | MediaType::Captions => format!(
                "Summarize the entire text as up to {}-item Markdown numbered list in {} and reply only with the list.\n{}",
                summary_item_count(input_len),
                language_name,
                LIST_FORMAT
            ),
        },
        ActionType::Translate => match media {
            MediaType::Image => format!(
                "Translate the image into {} and reply only with the translated result.",
                language_name
            ),
            MediaType::Text | MediaType::Captions => format!(
                "Translate the entire text into {} and reply only with the translated result.",
                language_name
            ),
        },
        ActionType::NoTextCustom(slot) => settings.custom_prompts.no_text(slot).to_string(),
        ActionType::TextCustom(slot) => settings.custom_prompts.text(slot).to_string(),
    }
}

/// Assemble the user content for one request.
///
/// Text input is folded into a single text part after the system prompt;
/// image input becomes a text part plus an inline-data part carrying the
/// payload split out of its data URI.
pub fn build_api_content(system_prompt: &str, media: MediaType, input: &str) -> Result<Content> {
    let parts = if media == MediaType::Image {
        let (mime_type, data) = split_data_uri(input)?;
        vec![
            Part::Text {
                text: system_prompt.to_string(),
            },
            Part::InlineData {
                inline_data: InlineData {
                    mime_type: mime_type.to_string(),
                    data: data.to_string(),
                },
            },
        ]
    } else {
        vec![Part::Text {
            text: format!("{}\nText:\n{}", system_prompt, input),
        }]
    };

    Ok(Content {
        role: Some("user".to_string()),
        parts,
    })
}

/// Split a `data:<mime>;base64,<payload>` URI into its mime type and payload.
fn split_data_uri(uri: &str) -> Result<(&str, &str)> {
    let (info, data) = uri
        .split_once(',')
        .ok_or_else(|| Error::Invariant(format!("Malformed data URI: {:.32}", uri)))?;
    let mime_type = info
        .strip_prefix("data:")
        .and_then(|rest| rest.split(';').next())
        .filter(|mime| !mime.is_empty())
        .ok_or_else(|| Error::Invariant(format!("Malformed data URI: {:.32}", uri)))?;
    Ok((mime_type, data))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_summary_item_count_scales_with_length() {
        assert_eq!(summary_item_count(0), 3);
        assert_eq!(summary_item_count(1999), 3);
        assert_eq!(summary_item_count(2000), 4);
        assert_eq!(summary_item_count(13999), 9);
        assert_eq!(summary_item_count(100_000), 10);
    }

    #[test]
    fn test_summarize_prompt_names_language_and_item_count() {
        let settings = Settings::default();
        let prompt = system_prompt(
            ActionType::Summarize,
            MediaType::Text,
            LanguageCode::De,
            4500,
            &settings,
        );
        assert!(prompt.contains("up to 5-item"));
        assert!(prompt.contains("German"));
        assert!(prompt.contains("1. First point."));
    }

    #[test]
    fn test_captions_use_the_text_phrasing() {
        let settings = Settings::default();
        let text = system_prompt(
            ActionType::Translate,
            MediaType::Captions,
            LanguageCode::Ja,
            100,
            &settings,
        );
        assert!(text.contains("entire text"));
        assert!(text.contains("Japanese"));
    }

    #[test]
    fn test_image_prompts_are_phrased_for_the_image() {
        let settings = Settings::default();
        let prompt = system_prompt(
            ActionType::Summarize,
            MediaType::Image,
            LanguageCode::En,
            0,
            &settings,
        );
        assert!(prompt.contains("Summarize the image"));
    }

    #[test]
    fn test_custom_action_uses_stored_prompt() {
        let mut settings = Settings::default();
        settings.custom_prompts.text_two = "Explain this like a pirate.".to_string();
        let prompt = system_prompt(
            ActionType::TextCustom(crate::models::CustomSlot::Two),
            MediaType::Text,
            LanguageCode::En,
            50,
            &settings,
        );
        assert_eq!(prompt, "Explain this like a pirate.");
    }

    #[test]
    fn test_text_content_folds_prompt_and_input() {
        let content = build_api_content("Do the thing.", MediaType::Text, "payload").unwrap();
        assert_eq!(content.role.as_deref(), Some("user"));
        assert_eq!(content.parts.len(), 1);
        match &content.parts[0] {
            Part::Text { text } => assert_eq!(text, "Do the thing.\nText:\npayload"),
            other => panic!("unexpected part: {:?}", other),
        }
    }

    #[test]
    fn test_image_content_splits_data_uri() {
        let content = build_api_content(
            "Describe.",
            MediaType::Image,
            "data:image/jpeg;base64,AAAA",
        )
        .unwrap();
        assert_eq!(content.parts.len(), 2);
        match &content.parts[1] {
            Part::InlineData { inline_data } => {
                assert_eq!(inline_data.mime_type, "image/jpeg");
                assert_eq!(inline_data.data, "AAAA");
            }
            other => panic!("unexpected part: {:?}", other),
        }
    }

    #[test]
    fn test_malformed_data_uri_is_rejected() {
        let err = build_api_content("x", MediaType::Image, "not-a-data-uri").unwrap_err();
        assert!(matches!(err, Error::Invariant(_)));
    }
}
