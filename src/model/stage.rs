use serde::{Deserialize, Serialize};

/// Position of a post project in the creation sequence.
///
/// Variants are declared in sequence order, so the derived `Ord` follows it.
#[derive(
    Serialize, Deserialize, Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, strum::AsRefStr, strum::EnumString, strum::EnumIter, strum::Display,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum Stage {
    #[default]
    Draft,
    Research,
    Writing,
    Images,
    Customize,
    Confirm,
    Posted,
    Archived,
}

impl Stage {
    /// Whether listing content is frozen (confirmed or later).
    pub fn is_locked(&self) -> bool {
        *self >= Stage::Confirm
    }
}

/// Status of one post-history entry.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, Default, PartialEq, Eq, strum::AsRefStr, strum::EnumString, strum::Display)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum PostStatus {
    #[default]
    Scheduled,
    Posted,
    Failed,
    Cancelled,
}

#[cfg(test)]
mod tests {
    use std::str::FromStr;

    use strum::IntoEnumIterator;

    use super::*;

    #[test]
    fn test_stage_order_follows_sequence() {
        let stages: Vec<Stage> = Stage::iter().collect();
        let mut sorted = stages.clone();
        sorted.sort();
        assert_eq!(stages, sorted);
        assert_eq!(stages.first(), Some(&Stage::Draft));
        assert_eq!(stages.last(), Some(&Stage::Archived));
    }

    #[test]
    fn test_stage_string_forms() {
        assert_eq!(Stage::Customize.as_ref(), "customize");
        assert_eq!(Stage::from_str("confirm").unwrap(), Stage::Confirm);
        assert_eq!(serde_json::to_string(&Stage::Posted).unwrap(), "\"posted\"");
        assert!(Stage::from_str("published").is_err());
    }

    #[test]
    fn test_stage_lock() {
        assert!(!Stage::Customize.is_locked());
        assert!(Stage::Confirm.is_locked());
        assert!(Stage::Archived.is_locked());
    }
}
