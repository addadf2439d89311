//! Enums of the schema.
//!
//! Each enum is stored as `TEXT` holding its SCREAMING_SNAKE_CASE value and
//! serializes to that same string.
//!
//! ```rust
//! use agora::enums::PublishStatus;
//!
//! let status: PublishStatus = "PUBLISHED".parse().unwrap();
//! assert_eq!(status, PublishStatus::Published);
//! assert_eq!(status.to_string(), "PUBLISHED");
//! assert_eq!(PublishStatus::default(), PublishStatus::Draft);
//! ```

use std::fmt;
use std::str::FromStr;

use agora_query::{FilterValue, FromColumn, RowError};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// A string that is not a value of the named enum.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("'{value}' is not a valid {name}")]
pub struct ParseEnumError {
    /// Enum name.
    pub name: &'static str,
    /// Rejected input.
    pub value: String,
}

macro_rules! schema_enum {
    (
        $(#[$meta:meta])*
        $name:ident default $default:ident {
            $($(#[$vmeta:meta])* $variant:ident => $value:literal),+ $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        pub enum $name {
            $(
                $(#[$vmeta])*
                #[serde(rename = $value)]
                $variant,
            )+
        }

        impl $name {
            /// Every value, in schema order.
            pub const fn variants() -> &'static [$name] {
                &[$($name::$variant),+]
            }

            /// The stored value.
            pub const fn as_str(&self) -> &'static str {
                match self {
                    $($name::$variant => $value),+
                }
            }
        }

        impl Default for $name {
            fn default() -> Self {
                $name::$default
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl FromStr for $name {
            type Err = ParseEnumError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $($value => Ok($name::$variant),)+
                    other => Err(ParseEnumError {
                        name: stringify!($name),
                        value: other.to_string(),
                    }),
                }
            }
        }

        impl From<$name> for FilterValue {
            fn from(value: $name) -> Self {
                FilterValue::String(value.as_str().to_string())
            }
        }

        impl FromColumn for $name {
            fn from_column(column: &str, value: &FilterValue) -> Result<Self, RowError> {
                let raw = String::from_column(column, value)?;
                raw.parse().map_err(|e: ParseEnumError| RowError::TypeConversion {
                    column: column.to_string(),
                    message: e.to_string(),
                })
            }
        }
    };
}

schema_enum! {
    /// What a content item is.
    ContentKind default Question {
        /// A question with answer options.
        Question => "QUESTION",
        /// A statement contributions respond to.
        Statement => "STATEMENT",
        /// An article.
        Article => "ARTICLE",
        /// A video.
        Video => "VIDEO",
    }
}

schema_enum! {
    /// Publication state of topics, items and contributions.
    PublishStatus default Draft {
        /// Not visible yet.
        Draft => "DRAFT",
        /// Visible.
        Published => "PUBLISHED",
        /// No longer listed.
        Archived => "ARCHIVED",
    }
}

schema_enum! {
    /// How a content item is restricted by region.
    RegionMode default All {
        /// Shown everywhere.
        All => "ALL",
        /// Shown only in the item's region.
        Include => "INCLUDE",
        /// Shown everywhere except the item's region.
        Exclude => "EXCLUDE",
    }
}

schema_enum! {
    /// Content and profile language.
    Locale default De {
        /// German.
        De => "DE",
        /// French.
        Fr => "FR",
        /// Italian.
        It => "IT",
        /// English.
        En => "EN",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_round_trip_through_str() {
        for kind in ContentKind::variants() {
            assert_eq!(kind.as_str().parse::<ContentKind>().unwrap(), *kind);
        }
    }

    #[test]
    fn test_defaults() {
        assert_eq!(PublishStatus::default(), PublishStatus::Draft);
        assert_eq!(RegionMode::default(), RegionMode::All);
        assert_eq!(Locale::default(), Locale::De);
    }

    #[test]
    fn test_parse_error() {
        let err = "de".parse::<Locale>().unwrap_err();
        assert_eq!(err.to_string(), "'de' is not a valid Locale");
    }

    #[test]
    fn test_serde_uses_stored_value() {
        assert_eq!(serde_json::to_string(&RegionMode::Exclude).unwrap(), "\"EXCLUDE\"");
        let status: PublishStatus = serde_json::from_str("\"ARCHIVED\"").unwrap();
        assert_eq!(status, PublishStatus::Archived);
    }

    #[test]
    fn test_filter_value_and_column() {
        assert_eq!(FilterValue::from(Locale::Fr), FilterValue::String("FR".into()));
        let locale = Locale::from_column("locale", &FilterValue::String("IT".into())).unwrap();
        assert_eq!(locale, Locale::It);
        assert!(Locale::from_column("locale", &FilterValue::String("XX".into())).is_err());
    }
}
