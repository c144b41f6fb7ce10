//! Profile name type.

use core::fmt;

use serde::{Deserialize, Serialize};

/// Errors that can occur when parsing a [`ProfileName`].
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum ProfileNameError {
    /// The input is empty or only whitespace.
    #[error("profile name cannot be empty")]
    Empty,
    /// The input is too long.
    #[error("profile name must be at most {max} characters")]
    TooLong {
        /// Maximum allowed length.
        max: usize,
    },
    /// The input contains a control character.
    #[error("profile name cannot contain control characters")]
    ControlCharacter,
}

/// The public name a reviewer signs their reviews with.
///
/// Profile names are what bearer tokens carry, so they are the lookup key
/// from an authenticated request to a [`User`](crate::User).
///
/// ## Constraints
///
/// - Surrounding whitespace is trimmed
/// - Length: 1-255 characters after trimming
/// - No control characters (newlines, tabs, NUL, ...)
///
/// ## Examples
///
/// ```
/// use review_desk_core::ProfileName;
///
/// assert!(ProfileName::parse("Natalia Corres").is_ok());
/// assert_eq!(ProfileName::parse("  dll pa ").unwrap().as_str(), "dll pa");
///
/// assert!(ProfileName::parse("").is_err());
/// assert!(ProfileName::parse("   ").is_err());
/// assert!(ProfileName::parse("line\nbreak").is_err());
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(try_from = "String", into = "String")]
pub struct ProfileName(String);

impl ProfileName {
    /// Maximum length of a profile name, in characters.
    pub const MAX_LENGTH: usize = 255;

    /// Parse a `ProfileName` from a string.
    ///
    /// # Errors
    ///
    /// Returns an error if the trimmed input is empty, longer than 255
    /// characters, or contains control characters.
    pub fn parse(s: &str) -> Result<Self, ProfileNameError> {
        let trimmed = s.trim();

        if trimmed.is_empty() {
            return Err(ProfileNameError::Empty);
        }

        if trimmed.chars().count() > Self::MAX_LENGTH {
            return Err(ProfileNameError::TooLong {
                max: Self::MAX_LENGTH,
            });
        }

        if trimmed.chars().any(char::is_control) {
            return Err(ProfileNameError::ControlCharacter);
        }

        Ok(Self(trimmed.to_owned()))
    }

    /// Returns the profile name as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Consumes the `ProfileName` and returns its inner string.
    #[must_use]
    pub fn into_inner(self) -> String {
        self.0
    }
}

impl fmt::Display for ProfileName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::str::FromStr for ProfileName {
    type Err = ProfileNameError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for ProfileName {
    type Error = ProfileNameError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<ProfileName> for String {
    fn from(name: ProfileName) -> Self {
        name.0
    }
}

impl AsRef<str> for ProfileName {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

// SQLx support (with postgres feature)
#[cfg(feature = "postgres")]
impl sqlx::Type<sqlx::Postgres> for ProfileName {
    fn type_info() -> sqlx::postgres::PgTypeInfo {
        <String as sqlx::Type<sqlx::Postgres>>::type_info()
    }

    fn compatible(ty: &sqlx::postgres::PgTypeInfo) -> bool {
        <String as sqlx::Type<sqlx::Postgres>>::compatible(ty)
    }
}

#[cfg(feature = "postgres")]
impl<'r> sqlx::Decode<'r, sqlx::Postgres> for ProfileName {
    fn decode(value: sqlx::postgres::PgValueRef<'r>) -> Result<Self, sqlx::error::BoxDynError> {
        let s = <String as sqlx::Decode<sqlx::Postgres>>::decode(value)?;
        // Database values are assumed valid
        Ok(Self(s))
    }
}

#[cfg(feature = "postgres")]
impl sqlx::Encode<'_, sqlx::Postgres> for ProfileName {
    fn encode_by_ref(
        &self,
        buf: &mut sqlx::postgres::PgArgumentBuffer,
    ) -> Result<sqlx::encode::IsNull, sqlx::error::BoxDynError> {
        <String as sqlx::Encode<sqlx::Postgres>>::encode_by_ref(&self.0, buf)
    }
}
