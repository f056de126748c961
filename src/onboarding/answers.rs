//! Answer store — per-step categorical answers and the completion rule.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::AnswerError;

use super::state::WizardStep;

/// An answer category. Each category is owned by exactly one step.
///
/// The serde names are the option-group keys used by the host page and the
/// backend payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    // Profile builder
    Vibe,
    Weekend,
    #[serde(rename = "valeurs")]
    Values,
    #[serde(rename = "plaisir")]
    Pleasure,
    // Secrets
    LoveLanguage,
    IdealDate,
    Dealbreaker,
    HiddenTalent,
    GuiltyPleasure,
}

/// Profile builder schema, in display order.
pub const PROFILE_SCHEMA: [Category; 4] = [
    Category::Vibe,
    Category::Weekend,
    Category::Values,
    Category::Pleasure,
];

/// Secrets schema, in display order.
pub const SECRETS_SCHEMA: [Category; 5] = [
    Category::LoveLanguage,
    Category::IdealDate,
    Category::Dealbreaker,
    Category::HiddenTalent,
    Category::GuiltyPleasure,
];

impl Category {
    /// Wire key for this category.
    pub fn key(&self) -> &'static str {
        match self {
            Self::Vibe => "vibe",
            Self::Weekend => "weekend",
            Self::Values => "valeurs",
            Self::Pleasure => "plaisir",
            Self::LoveLanguage => "love_language",
            Self::IdealDate => "ideal_date",
            Self::Dealbreaker => "dealbreaker",
            Self::HiddenTalent => "hidden_talent",
            Self::GuiltyPleasure => "guilty_pleasure",
        }
    }

    /// Resolve an option-group key. Unknown keys yield `None`.
    pub fn from_key(key: &str) -> Option<Category> {
        PROFILE_SCHEMA
            .iter()
            .chain(SECRETS_SCHEMA.iter())
            .find(|c| c.key() == key)
            .copied()
    }

    /// The step whose schema declares this category.
    pub fn step(&self) -> WizardStep {
        if PROFILE_SCHEMA.contains(self) {
            WizardStep::BuildingProfile
        } else {
            WizardStep::AnsweringSecrets
        }
    }
}

impl std::fmt::Display for Category {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.key())
    }
}

/// Categories declared for a step. `Done` has none.
pub fn schema(step: WizardStep) -> &'static [Category] {
    match step {
        WizardStep::BuildingProfile => &PROFILE_SCHEMA,
        WizardStep::AnsweringSecrets => &SECRETS_SCHEMA,
        WizardStep::Done => &[],
    }
}

/// Answers for one step. Every schema key is always present; `None` means
/// unset.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnswerSet {
    step: WizardStep,
    entries: BTreeMap<Category, Option<String>>,
}

impl AnswerSet {
    /// Create an empty answer set covering `step`'s schema.
    pub fn empty(step: WizardStep) -> Self {
        Self {
            step,
            entries: schema(step).iter().map(|c| (*c, None)).collect(),
        }
    }

    pub fn step(&self) -> WizardStep {
        self.step
    }

    pub fn get(&self, category: Category) -> Option<&str> {
        self.entries.get(&category).and_then(|v| v.as_deref())
    }

    /// True iff every schema key holds a value.
    pub fn is_complete(&self) -> bool {
        self.entries.values().all(Option::is_some)
    }

    /// Number of schema keys that hold a value.
    pub fn answered(&self) -> usize {
        self.entries.values().filter(|v| v.is_some()).count()
    }

    /// Schema keys still unset, in schema order.
    pub fn missing(&self) -> Vec<Category> {
        schema(self.step)
            .iter()
            .filter(|c| self.get(**c).is_none())
            .copied()
            .collect()
    }

    /// Key → value pairs for the assigned categories, as sent to the backend.
    pub fn to_payload(&self) -> BTreeMap<&'static str, String> {
        self.entries
            .iter()
            .filter_map(|(c, v)| v.as_ref().map(|v| (c.key(), v.clone())))
            .collect()
    }

    fn set(&mut self, category: Category, value: String) -> Result<(), AnswerError> {
        match self.entries.get_mut(&category) {
            Some(slot) => {
                *slot = Some(value);
                Ok(())
            }
            None => Err(AnswerError::InvalidCategory {
                step: self.step,
                category: category.key().to_string(),
            }),
        }
    }
}

/// In-memory answers for both steps of a session.
#[derive(Debug, Clone)]
pub struct AnswerStore {
    profile: AnswerSet,
    secrets: AnswerSet,
}

impl Default for AnswerStore {
    fn default() -> Self {
        Self::new()
    }
}

impl AnswerStore {
    pub fn new() -> Self {
        Self {
            profile: AnswerSet::empty(WizardStep::BuildingProfile),
            secrets: AnswerSet::empty(WizardStep::AnsweringSecrets),
        }
    }

    /// Overwrite one category of `step`'s answers.
    ///
    /// Fails with `InvalidCategory` if the category belongs to another step,
    /// and with `EmptyValue` for blank values. Nothing is mutated on error.
    pub fn set_answer(
        &mut self,
        step: WizardStep,
        category: Category,
        value: impl Into<String>,
    ) -> Result<(), AnswerError> {
        if category.step() != step {
            return Err(AnswerError::InvalidCategory {
                step,
                category: category.key().to_string(),
            });
        }
        let value = value.into();
        if value.trim().is_empty() {
            return Err(AnswerError::EmptyValue {
                category: category.key().to_string(),
            });
        }
        match step {
            WizardStep::BuildingProfile => self.profile.set(category, value),
            WizardStep::AnsweringSecrets => self.secrets.set(category, value),
            WizardStep::Done => Err(AnswerError::InvalidCategory {
                step,
                category: category.key().to_string(),
            }),
        }
    }

    /// Whether every category of `step` has been answered.
    pub fn is_complete(&self, step: WizardStep) -> bool {
        match step {
            WizardStep::BuildingProfile => self.profile.is_complete(),
            WizardStep::AnsweringSecrets => self.secrets.is_complete(),
            WizardStep::Done => true,
        }
    }

    /// Copy of `step`'s answers for transmission.
    pub fn snapshot(&self, step: WizardStep) -> AnswerSet {
        match step {
            WizardStep::BuildingProfile => self.profile.clone(),
            WizardStep::AnsweringSecrets => self.secrets.clone(),
            WizardStep::Done => AnswerSet::empty(WizardStep::Done),
        }
    }
}
