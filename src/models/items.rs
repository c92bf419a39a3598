//! Titled sub-items (trading plans, homework) kept inside a parent document.
//!
//! An [`ItemList`] is an ordered collection keyed by stable generated ids.
//! Lookup, update and removal go through explicit methods so that a missing
//! id is reported instead of silently ignored.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{AppError, AppResult};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TitledItem {
    pub id: Uuid,
    pub title: String,
    #[serde(default)]
    pub content: String,
}

/// Client-supplied item for whole-list writes. Items without an id get one.
#[derive(Debug, Clone, Deserialize)]
pub struct ItemDraft {
    pub id: Option<Uuid>,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub content: String,
}

#[derive(Debug, Deserialize)]
pub struct CreateItemRequest {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub content: String,
}

#[derive(Debug, Default, Deserialize)]
pub struct UpdateItemRequest {
    pub title: Option<String>,
    pub content: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(transparent)]
pub struct ItemList(Vec<TitledItem>);

impl ItemList {
    /// Builds a list from drafts, trimming titles and dropping the empty ones.
    /// Repeated ids are replaced so every id stays unique.
    pub fn from_drafts(drafts: Vec<ItemDraft>) -> Self {
        let mut items: Vec<TitledItem> = Vec::with_capacity(drafts.len());
        for draft in drafts {
            let title = draft.title.trim();
            if title.is_empty() {
                continue;
            }
            let id = match draft.id {
                Some(id) if !items.iter().any(|i| i.id == id) => id,
                _ => Uuid::new_v4(),
            };
            items.push(TitledItem {
                id,
                title: title.to_string(),
                content: draft.content,
            });
        }
        Self(items)
    }

    pub fn from_defaults(defaults: &[(&str, &str)]) -> Self {
        Self(
            defaults
                .iter()
                .map(|(title, content)| TitledItem {
                    id: Uuid::new_v4(),
                    title: (*title).to_string(),
                    content: (*content).to_string(),
                })
                .collect(),
        )
    }

    pub fn items(&self) -> &[TitledItem] {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn get(&self, id: Uuid) -> Option<&TitledItem> {
        self.0.iter().find(|i| i.id == id)
    }

    pub fn push(&mut self, title: &str, content: String) -> AppResult<&TitledItem> {
        let title = required_title(title)?;
        self.0.push(TitledItem {
            id: Uuid::new_v4(),
            title,
            content,
        });
        Ok(&self.0[self.0.len() - 1])
    }

    /// Applies a partial update. Nothing changes when the id is unknown or the
    /// new title is blank.
    pub fn update(&mut self, id: &str, patch: UpdateItemRequest) -> AppResult<&TitledItem> {
        let pos = self.position(id)?;
        let title = patch.title.as_deref().map(required_title).transpose()?;

        let item = &mut self.0[pos];
        if let Some(title) = title {
            item.title = title;
        }
        if let Some(content) = patch.content {
            item.content = content;
        }
        Ok(&self.0[pos])
    }

    pub fn remove(&mut self, id: &str) -> AppResult<TitledItem> {
        let pos = self.position(id)?;
        Ok(self.0.remove(pos))
    }

    /// Ids arrive as raw path segments; one that is not a UUID cannot name an
    /// item either.
    fn position(&self, id: &str) -> AppResult<usize> {
        Uuid::parse_str(id.trim())
            .ok()
            .and_then(|id| self.0.iter().position(|i| i.id == id))
            .ok_or_else(|| AppError::NotFound("Item not found".into()))
    }
}

fn required_title(title: &str) -> AppResult<String> {
    let title = title.trim();
    if title.is_empty() {
        return Err(AppError::Validation("Title cannot be empty".into()));
    }
    Ok(title.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn draft(id: Option<Uuid>, title: &str) -> ItemDraft {
        ItemDraft {
            id,
            title: title.to_string(),
            content: String::new(),
        }
    }

    #[test]
    fn test_from_drafts_trims_and_drops_blank_titles() {
        let list = ItemList::from_drafts(vec![
            draft(None, "  Breakout entry  "),
            draft(None, "   "),
            draft(None, ""),
            draft(None, "Stop below range"),
        ]);

        let titles: Vec<_> = list.items().iter().map(|i| i.title.as_str()).collect();
        assert_eq!(titles, vec!["Breakout entry", "Stop below range"]);
    }

    #[test]
    fn test_from_drafts_keeps_ids_and_replaces_duplicates() {
        let id = Uuid::new_v4();
        let list = ItemList::from_drafts(vec![draft(Some(id), "a"), draft(Some(id), "b")]);

        assert_eq!(list.items()[0].id, id);
        assert_ne!(list.items()[1].id, id);
    }

    #[test]
    fn test_update_unknown_id_is_not_found_and_leaves_list() {
        let mut list = ItemList::from_defaults(&[("one", "1")]);
        let before = list.clone();

        let err = list
            .update(
                &Uuid::new_v4().to_string(),
                UpdateItemRequest {
                    title: Some("changed".into()),
                    content: None,
                },
            )
            .unwrap_err();

        assert!(matches!(err, AppError::NotFound(_)));
        assert_eq!(list, before);
    }

    #[test]
    fn test_update_blank_title_is_rejected() {
        let mut list = ItemList::from_defaults(&[("one", "1")]);
        let id = list.items()[0].id;

        let err = list
            .update(
                &id.to_string(),
                UpdateItemRequest {
                    title: Some("  ".into()),
                    content: Some("new".into()),
                },
            )
            .unwrap_err();

        assert!(matches!(err, AppError::Validation(_)));
        assert_eq!(list.items()[0].content, "1");
    }

    #[test]
    fn test_update_and_remove() {
        let mut list = ItemList::from_defaults(&[("one", "1"), ("two", "2")]);
        let id = list.items()[1].id;

        let updated = list
            .update(
                &id.to_string(),
                UpdateItemRequest {
                    title: None,
                    content: Some("updated".into()),
                },
            )
            .unwrap();
        assert_eq!(updated.title, "two");
        assert_eq!(updated.content, "updated");

        let removed = list.remove(&id.to_string()).unwrap();
        assert_eq!(removed.id, id);
        assert_eq!(list.len(), 1);
        assert!(list.remove(&id.to_string()).is_err());
    }

    #[test]
    fn test_malformed_id_is_not_found() {
        let mut list = ItemList::from_defaults(&[("one", "1")]);
        let before = list.clone();

        assert!(matches!(list.remove("not-a-uuid"), Err(AppError::NotFound(_))));
        let err = list
            .update(
                "",
                UpdateItemRequest {
                    title: Some("changed".into()),
                    content: None,
                },
            )
            .unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
        assert_eq!(list, before);
    }
}
