use serde::{
    Deserialize, Deserializer, Serialize,
    de::{Error, Unexpected},
};
use thiserror::Error;

/// Number of characters shown by [`Text::preview`].
pub const PREVIEW_LEN: usize = 15;

/// Body text of a post or comment.
///
/// Surrounding whitespace is stripped and the remainder must not be empty.
#[derive(Clone, Eq, PartialEq, Ord, PartialOrd, Debug, Default, Hash, Serialize)]
#[serde(transparent)]
pub struct Text(String);

#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Debug, Default, Hash, Error)]
#[error("This field is required.")]
pub struct InvalidTextError;

impl Text {
    pub fn new(text: &str) -> Result<Self, InvalidTextError> {
        let trimmed = text.trim();
        if trimmed.is_empty() {
            Err(InvalidTextError)
        } else {
            Ok(Self(trimmed.to_owned()))
        }
    }

    #[must_use]
    pub fn get(&self) -> &str {
        &self.0
    }

    #[must_use]
    pub fn preview(&self) -> &str {
        match self.0.char_indices().nth(PREVIEW_LEN) {
            Some((end, _)) => &self.0[..end],
            None => &self.0,
        }
    }
}

impl<'de> Deserialize<'de> for Text {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let inner = String::deserialize(deserializer)?;
        Text::new(&inner).map_err(|_| Error::invalid_value(Unexpected::Str(&inner), &"Text"))
    }
}
