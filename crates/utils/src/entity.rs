use std::{fmt::Display, str::FromStr};

use serde::{Deserialize, Serialize};

/// Kind of recipient an entity token refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EntityKind {
    User,
    Role,
    Group,
}

impl EntityKind {
    /// Token prefix used on the wire, without the `_` separator.
    pub fn prefix(self) -> &'static str {
        match self {
            EntityKind::User => "user",
            EntityKind::Role => "role",
            EntityKind::Group => "group",
        }
    }
}

/// A recipient entity parsed from a token such as `user_42`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct EntityId {
    pub kind: EntityKind,
    pub id: i64,
}

impl EntityId {
    pub fn new(kind: EntityKind, id: i64) -> Self {
        Self { kind, id }
    }
}

impl Display for EntityId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}_{}", self.kind.prefix(), self.id)
    }
}

/// Errors that can occur while parsing an entity token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EntityIdError {
    /// The token has no `_` separator.
    MissingSeparator(String),
    /// The prefix is not `user`, `role` or `group`.
    UnknownKind(String),
    /// The part after the separator is not an integer.
    InvalidId(String),
}

impl Display for EntityIdError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EntityIdError::MissingSeparator(token) => {
                write!(f, "Entity token without separator: {token}")
            }
            EntityIdError::UnknownKind(kind) => write!(f, "Unknown entity kind: {kind}"),
            EntityIdError::InvalidId(id) => write!(f, "Invalid entity id: {id}"),
        }
    }
}

impl std::error::Error for EntityIdError {}

impl FromStr for EntityId {
    type Err = EntityIdError;

    /// Parses `user_*`, `role_*` and `group_*` tokens.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use quickmail_utils::{EntityId, EntityKind};
    ///
    /// let entity: EntityId = "role_3".parse().unwrap();
    /// assert_eq!(entity, EntityId::new(EntityKind::Role, 3));
    /// assert!("course_3".parse::<EntityId>().is_err());
    /// ```
    fn from_str(token: &str) -> Result<Self, Self::Err> {
        let (kind, id) = token
            .split_once('_')
            .ok_or_else(|| EntityIdError::MissingSeparator(token.to_string()))?;
        let kind = match kind {
            "user" => EntityKind::User,
            "role" => EntityKind::Role,
            "group" => EntityKind::Group,
            other => return Err(EntityIdError::UnknownKind(other.to_string())),
        };
        let id = id
            .parse::<i64>()
            .map_err(|_| EntityIdError::InvalidId(id.to_string()))?;
        Ok(Self { kind, id })
    }
}
