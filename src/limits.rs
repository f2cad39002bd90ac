//! Per-model character budgets.
//!
//! Limits the number of characters handled in one request so the API's
//! token limits are not exceeded. Summarize and custom actions are bounded
//! by each model's input-token limit (reduced where the full window has
//! been observed to error server-side); translate is bounded by the
//! output-token limit, which is uniform across the family.

use crate::models::{ActionType, ModelId};

/// Character budget for one request against `model` performing `action`.
///
/// Both dimensions are closed enums, so the table is total by construction;
/// unknown model strings never reach this point.
pub fn character_limit(model: ModelId, action: ActionType) -> usize {
    match action {
        ActionType::Translate => 8192,
        ActionType::Summarize | ActionType::NoTextCustom(_) | ActionType::TextCustom(_) => {
            match model {
                ModelId::Gemini20Flash => 786_432,
                ModelId::Gemini15Pro => 1_500_000,
                ModelId::Gemini15Flash => 750_000,
                ModelId::Gemini15Flash8b => 750_000,
                ModelId::Gemini20FlashLite => 786_432,
                ModelId::Gemini20ProExp => 1_572_864,
                ModelId::Gemini20FlashExp => 786_432,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::CustomSlot;

    #[test]
    fn test_translate_budget_is_uniform() {
        for model in [
            ModelId::Gemini20Flash,
            ModelId::Gemini15Pro,
            ModelId::Gemini15Flash,
            ModelId::Gemini15Flash8b,
            ModelId::Gemini20FlashLite,
            ModelId::Gemini20ProExp,
            ModelId::Gemini20FlashExp,
        ] {
            assert_eq!(character_limit(model, ActionType::Translate), 8192);
        }
    }

    #[test]
    fn test_summarize_budgets_differ_per_family() {
        assert_eq!(
            character_limit(ModelId::Gemini20Flash, ActionType::Summarize),
            786_432
        );
        assert_eq!(
            character_limit(ModelId::Gemini15Pro, ActionType::Summarize),
            1_500_000
        );
        assert_eq!(
            character_limit(ModelId::Gemini20ProExp, ActionType::Summarize),
            1_572_864
        );
    }

    #[test]
    fn test_custom_actions_share_the_summarize_budget() {
        for slot in [CustomSlot::One, CustomSlot::Two] {
            assert_eq!(
                character_limit(ModelId::Gemini15Flash, ActionType::TextCustom(slot)),
                character_limit(ModelId::Gemini15Flash, ActionType::Summarize)
            );
            assert_eq!(
                character_limit(ModelId::Gemini15Flash, ActionType::NoTextCustom(slot)),
                character_limit(ModelId::Gemini15Flash, ActionType::Summarize)
            );
        }
    }
}
