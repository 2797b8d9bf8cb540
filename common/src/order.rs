use std::str::FromStr;

use crate::ValidationError;

/// Display order of the bins on the dashboard.
pub const DEFAULT_BIN_ORDER: [&str; 8] = [
    "Kitchen Area",
    "Cafeteria",
    "Production Line A",
    "Production Line B",
    "Office Area",
    "Packaging Area",
    "Quality Control",
    "Storage Room",
];

/// Where bins that are not part of the canonical order end up.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub enum UnmatchedPlacement {
    First,
    #[default]
    Last,
}

impl FromStr for UnmatchedPlacement {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "first" => Ok(Self::First),
            "last" => Ok(Self::Last),
            other => Err(ValidationError::Placement(other.to_owned())),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct OrderPolicy {
    pub canonical: Vec<String>,
    pub unmatched: UnmatchedPlacement,
}

impl Default for OrderPolicy {
    fn default() -> Self {
        Self {
            canonical: DEFAULT_BIN_ORDER.iter().map(|s| s.to_string()).collect(),
            unmatched: UnmatchedPlacement::default(),
        }
    }
}

impl OrderPolicy {
    /// Stable sort by position in the canonical list. Unmatched items keep their
    /// relative input order.
    pub fn sort_by_name<T, F>(&self, items: &mut [T], name: F)
    where
        F: Fn(&T) -> &str,
    {
        // (group, index): group decides whether unmatched items lead or trail
        items.sort_by_key(|item| {
            match self.canonical.iter().position(|c| c == name(item)) {
                Some(idx) => match self.unmatched {
                    UnmatchedPlacement::First => (1u8, idx),
                    UnmatchedPlacement::Last => (0u8, idx),
                },
                None => match self.unmatched {
                    UnmatchedPlacement::First => (0u8, 0),
                    UnmatchedPlacement::Last => (1u8, 0),
                },
            }
        });
    }
}
