use crate::error::{ProtocolError, Result};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Business category used as a node label in the town flow graph.
///
/// Variants are declared in lexical order so the derived `Ord` agrees
/// with ordering by [`Category::as_str`].
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, JsonSchema,
)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    Beauty,
    Coffee,
    Fitness,
    Food,
    Other,
    Retail,
    Services,
}

impl Category {
    pub const ALL: [Category; 7] = [
        Category::Beauty,
        Category::Coffee,
        Category::Fitness,
        Category::Food,
        Category::Other,
        Category::Retail,
        Category::Services,
    ];

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Category::Beauty => "beauty",
            Category::Coffee => "coffee",
            Category::Fitness => "fitness",
            Category::Food => "food",
            Category::Other => "other",
            Category::Retail => "retail",
            Category::Services => "services",
        }
    }

    /// Human-facing label used in chain copy ("Coffee → Fitness").
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Category::Beauty => "Beauty",
            Category::Coffee => "Coffee",
            Category::Fitness => "Fitness",
            Category::Food => "Food",
            Category::Other => "Other",
            Category::Retail => "Retail",
            Category::Services => "Services",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

impl FromStr for Category {
    type Err = ProtocolError;

    fn from_str(raw: &str) -> Result<Self> {
        let normalized = raw.trim().to_ascii_lowercase();
        let category = match normalized.as_str() {
            "beauty" | "salon" | "spa" => Category::Beauty,
            "coffee" | "cafe" | "café" => Category::Coffee,
            "fitness" | "gym" | "yoga" => Category::Fitness,
            "food" | "restaurant" | "bakery" => Category::Food,
            "other" => Category::Other,
            "retail" | "shop" | "boutique" => Category::Retail,
            "services" | "service" => Category::Services,
            _ => return Err(ProtocolError::UnknownCategory(raw.to_string())),
        };
        Ok(category)
    }
}
