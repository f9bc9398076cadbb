use std::fmt::{self, Display};

use crate::error::Error;


/// A migration name split into its ordering prefix and its description, e.g.
/// "20240110093000_create_users_table" has prefix "20240110093000" and description
/// "create_users_table".
#[derive(Debug, Clone, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct MigrationName {
    prefix: String,
    description: String,
    separator: char,
}
impl MigrationName {
    /// Parses a migration name. The prefix runs up to the first '_' or '-' and must be
    /// non-empty and ASCII alphanumeric; the description after the separator must be non-empty.
    pub fn parse(name: &str) -> Result<Self, Error> {
        let separator = name.find(|character: char| character == '_' || character == '-')
            .ok_or_else(|| Error::Configuration(format!(
                "migration name {:?} has no ordering prefix (expected <prefix>_<description>)",
                name
            )))?;
        let (prefix, rest) = name.split_at(separator);
        let separator_char = rest.chars().next().unwrap_or('_');
        let description = &rest[1..];
        if prefix.is_empty() || !prefix.chars().all(|character| character.is_ascii_alphanumeric()) {
            return Err(Error::Configuration(format!(
                "migration name {:?} has an invalid ordering prefix {:?}", name, prefix
            )));
        }
        if description.is_empty() {
            return Err(Error::Configuration(format!(
                "migration name {:?} has no description", name
            )));
        }
        Ok(MigrationName {
            prefix: prefix.to_owned(),
            description: description.to_owned(),
            separator: separator_char,
        })
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    pub fn description(&self) -> &str {
        &self.description
    }
}
impl Display for MigrationName {
    fn fmt(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
        write!(formatter, "{}{}{}", self.prefix, self.separator, self.description)
    }
}
