use core::fmt;

/// Classification of a relation between two entities, mirroring the ER engine's
/// `IS_DISCLOSED` / `IS_AMBIGUOUS` / `MATCH_LEVEL` flags (spec §6).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, serde::Serialize, serde::Deserialize)]
pub enum MatchCategory {
    /// Disclosed relation.
    Dr,
    /// Ambiguous match.
    Am,
    /// Possible match (same real-world entity, low confidence).
    Pm,
    /// Possibly related (different entities, linked).
    Pr,
}

impl MatchCategory {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Dr => "DR",
            Self::Am => "AM",
            Self::Pm => "PM",
            Self::Pr => "PR",
        }
    }

    #[must_use]
    pub const fn description(self) -> &'static str {
        match self {
            Self::Dr => "DISCLOSED_RELATION",
            Self::Am => "AMBIGUOUS_MATCH",
            Self::Pm => "POSSIBLE_MATCH",
            Self::Pr => "POSSIBLY_RELATED",
        }
    }

    /// Maps the ER engine's raw relation flags to a [`MatchCategory`] (spec §6).
    #[must_use]
    pub const fn from_related_entity_flags(is_disclosed: bool, is_ambiguous: bool, match_level: i32) -> Self {
        if is_disclosed {
            Self::Dr
        } else if is_ambiguous {
            Self::Am
        } else if match_level == 2 {
            Self::Pm
        } else {
            Self::Pr
        }
    }
}

impl fmt::Display for MatchCategory {
    fn fmt(&self, fmt: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, derive_more::Display, derive_more::Error)]
#[display("{_0:?} is not a recognized match category")]
pub struct ParseMatchCategoryError(#[error(ignore)] String);

impl core::str::FromStr for MatchCategory {
    type Err = ParseMatchCategoryError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "DR" => Ok(Self::Dr),
            "AM" => Ok(Self::Am),
            "PM" => Ok(Self::Pm),
            "PR" => Ok(Self::Pr),
            other => Err(ParseMatchCategoryError(other.to_owned())),
        }
    }
}
