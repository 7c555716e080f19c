use std::fmt;

/// A banner reference as delivered by lifecycle events: either a numeric
/// database id or a slug.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum BannerIdentifier {
    /// `raw` keeps the text the id was parsed from (`"007"`, `"+42"`).
    Id { id: i64, raw: String },
    Slug(String),
}

impl BannerIdentifier {
    /// Numeric strings are ids, everything else is a slug.
    pub fn parse(raw: &str) -> Self {
        let trimmed = raw.trim();
        match trimmed.parse::<i64>() {
            Ok(id) => Self::Id {
                id,
                raw: trimmed.to_string(),
            },
            Err(_) => Self::Slug(trimmed.to_string()),
        }
    }

    pub fn id(&self) -> Option<i64> {
        match self {
            Self::Id { id, .. } => Some(*id),
            Self::Slug(_) => None,
        }
    }

    /// The identifier as it was given, used as a slug when an id no longer
    /// resolves to a record.
    pub fn raw(&self) -> String {
        match self {
            Self::Id { raw, .. } => raw.clone(),
            Self::Slug(slug) => slug.clone(),
        }
    }
}

impl fmt::Display for BannerIdentifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Id { id, .. } => write!(f, "#{id}"),
            Self::Slug(slug) => f.write_str(slug),
        }
    }
}

impl From<i64> for BannerIdentifier {
    fn from(id: i64) -> Self {
        Self::Id {
            id,
            raw: id.to_string(),
        }
    }
}

impl From<&str> for BannerIdentifier {
    fn from(raw: &str) -> Self {
        Self::parse(raw)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn numeric_strings_parse_as_ids() {
        assert_eq!(BannerIdentifier::parse("42"), BannerIdentifier::from(42));
        assert_eq!(BannerIdentifier::parse(" 7 "), BannerIdentifier::from(7));
    }

    #[test]
    fn other_strings_parse_as_slugs() {
        assert_eq!(
            BannerIdentifier::parse("summer-sale"),
            BannerIdentifier::Slug("summer-sale".to_string())
        );
        assert_eq!(
            BannerIdentifier::parse("42a"),
            BannerIdentifier::Slug("42a".to_string())
        );
    }

    #[test]
    fn raw_round_trips_the_given_form() {
        assert_eq!(BannerIdentifier::from(42).raw(), "42");
        assert_eq!(BannerIdentifier::parse("winter-sale").raw(), "winter-sale");
    }

    #[test]
    fn padded_and_signed_ids_keep_their_text() {
        let padded = BannerIdentifier::parse("007");
        assert_eq!(padded.id(), Some(7));
        assert_eq!(padded.raw(), "007");
        assert_eq!(padded.to_string(), "#7");

        let signed = BannerIdentifier::parse(" +42 ");
        assert_eq!(signed.id(), Some(42));
        assert_eq!(signed.raw(), "+42");
    }
}
