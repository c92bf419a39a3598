use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{types::Json, FromRow};
use uuid::Uuid;

use crate::models::items::{ItemDraft, ItemList};

pub const DEFAULT_HOMEWORK: [(&str, &str); 3] = [
    (
        "Review yesterday's trades",
        "Go through every fill, note entries that broke the plan.",
    ),
    (
        "Check the economic calendar",
        "Mark data releases and central bank events for today.",
    ),
    (
        "Mark key levels",
        "Draw support and resistance on the instruments you watch.",
    ),
];

pub const DEFAULT_PLANS: [(&str, &str); 3] = [
    (
        "Entry criteria",
        "Only enter on a confirmed setup from the watchlist.",
    ),
    (
        "Stop-loss rule",
        "Place the stop before entering and never widen it.",
    ),
    (
        "Position sizing",
        "Risk no more than 1% of the account per trade.",
    ),
];

/// Selection state of one entry from the built-in principle catalogue.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PresetPrinciple {
    pub index: u32,
    #[serde(default)]
    pub is_selected: bool,
}

#[derive(Debug, Clone, Serialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct UserSettings {
    pub user_id: Uuid,
    pub preset_principles: Json<Vec<PresetPrinciple>>,
    pub custom_principles: Json<Vec<String>>,
    pub trading_homework: Json<ItemList>,
    pub trading_plans: Json<ItemList>,
    pub updated_at: DateTime<Utc>,
}

impl UserSettings {
    pub fn with_defaults(user_id: Uuid, now: DateTime<Utc>) -> Self {
        Self {
            user_id,
            preset_principles: Json(Vec::new()),
            custom_principles: Json(Vec::new()),
            trading_homework: Json(ItemList::from_defaults(&DEFAULT_HOMEWORK)),
            trading_plans: Json(ItemList::from_defaults(&DEFAULT_PLANS)),
            updated_at: now,
        }
    }

    /// Refills empty homework/plan lists with the defaults. Returns whether
    /// anything changed.
    pub fn backfill_defaults(&mut self) -> bool {
        let mut changed = false;
        if self.trading_homework.is_empty() {
            self.trading_homework = Json(ItemList::from_defaults(&DEFAULT_HOMEWORK));
            changed = true;
        }
        if self.trading_plans.is_empty() {
            self.trading_plans = Json(ItemList::from_defaults(&DEFAULT_PLANS));
            changed = true;
        }
        changed
    }

    pub fn apply(&mut self, update: UpdateSettingsRequest) {
        if let Some(presets) = update.preset_principles {
            self.preset_principles = Json(presets);
        }
        if let Some(custom) = update.custom_principles {
            self.custom_principles = Json(
                custom
                    .iter()
                    .map(|p| p.trim())
                    .filter(|p| !p.is_empty())
                    .map(str::to_string)
                    .collect(),
            );
        }
        if let Some(homework) = update.trading_homework {
            self.trading_homework = Json(ItemList::from_drafts(homework));
        }
        if let Some(plans) = update.trading_plans {
            self.trading_plans = Json(ItemList::from_drafts(plans));
        }
    }
}

/// PUT /api/settings. Omitted fields are left untouched.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateSettingsRequest {
    pub preset_principles: Option<Vec<PresetPrinciple>>,
    pub custom_principles: Option<Vec<String>>,
    pub trading_homework: Option<Vec<ItemDraft>>,
    pub trading_plans: Option<Vec<ItemDraft>>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_have_three_items_each() {
        let settings = UserSettings::with_defaults(Uuid::new_v4(), Utc::now());
        assert_eq!(settings.trading_homework.len(), 3);
        assert_eq!(settings.trading_plans.len(), 3);
        assert_eq!(settings.trading_homework.items()[0].title, DEFAULT_HOMEWORK[0].0);
        assert_eq!(settings.trading_plans.items()[2].title, DEFAULT_PLANS[2].0);
    }

    #[test]
    fn test_backfill_only_touches_empty_lists() {
        let mut settings = UserSettings::with_defaults(Uuid::new_v4(), Utc::now());
        settings.trading_plans = Json(ItemList::default());
        let homework_before = settings.trading_homework.clone();

        assert!(settings.backfill_defaults());
        assert_eq!(settings.trading_plans.len(), 3);
        assert_eq!(settings.trading_homework, homework_before);
        assert!(!settings.backfill_defaults());
    }

    #[test]
    fn test_apply_trims_custom_principles() {
        let mut settings = UserSettings::with_defaults(Uuid::new_v4(), Utc::now());
        settings.apply(UpdateSettingsRequest {
            custom_principles: Some(vec![
                "  Cut losses early ".into(),
                "   ".into(),
                "No revenge trades".into(),
            ]),
            ..Default::default()
        });

        assert_eq!(
            settings.custom_principles.0,
            vec!["Cut losses early".to_string(), "No revenge trades".to_string()]
        );
        assert_eq!(settings.trading_homework.len(), 3);
    }
}
