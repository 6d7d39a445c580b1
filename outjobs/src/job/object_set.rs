//! Board and assembly variant selection
//!
//! An [`ObjectSet`] selects the objects a job runs for. `All` and `Default`
//! are resolved against the live project every time a job runs, so boards
//! added after the job was configured are picked up automatically.

use std::collections::BTreeSet;

use uuid::Uuid;

use crate::core::JobError;
use crate::parser::{parse_uuid, SExp};
use crate::project::Identified;

use super::serialize::JobParseError;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ObjectSet<T: Ord> {
    /// Every object of the project, in project order.
    All,
    /// The first object of the project.
    Default,
    /// An explicit selection, possibly empty.
    Custom(BTreeSet<T>),
}

impl<T: Ord> ObjectSet<T> {
    pub fn only(item: T) -> Self {
        ObjectSet::Custom(BTreeSet::from([item]))
    }

    pub fn none() -> Self {
        ObjectSet::Custom(BTreeSet::new())
    }

    pub fn is_all(&self) -> bool {
        matches!(self, ObjectSet::All)
    }

    pub fn is_default(&self) -> bool {
        matches!(self, ObjectSet::Default)
    }
}

impl<T: Ord> FromIterator<T> for ObjectSet<T> {
    fn from_iter<I: IntoIterator<Item = T>>(iter: I) -> Self {
        ObjectSet::Custom(iter.into_iter().collect())
    }
}

impl ObjectSet<Uuid> {
    /// Resolves the set against `objects` (the project's collection, in
    /// project order).
    ///
    /// Custom members are returned in project order; a member which does not
    /// exist anymore fails with the error built by `not_found`.
    pub fn resolve<'a, T: Identified>(
        &self,
        objects: &'a [T],
        not_found: impl Fn(Uuid) -> JobError,
    ) -> crate::Result<Vec<&'a T>> {
        match self {
            ObjectSet::All => Ok(objects.iter().collect()),
            ObjectSet::Default => Ok(objects.first().into_iter().collect()),
            ObjectSet::Custom(uuids) => {
                let mut remaining = uuids.clone();
                let mut result = Vec::new();
                for object in objects {
                    if remaining.remove(&object.uuid()) {
                        result.push(object);
                    }
                }
                match remaining.into_iter().next() {
                    Some(missing) => Err(not_found(missing)),
                    None => Ok(result),
                }
            }
        }
    }
}

impl ObjectSet<Option<Uuid>> {
    /// Like [`ObjectSet::resolve`], but `None` stands for "the whole
    /// project". `All` only yields the `None` member if `include_null_in_all`
    /// is set, and it always comes first.
    pub fn resolve_optional<'a, T: Identified>(
        &self,
        objects: &'a [T],
        include_null_in_all: bool,
        not_found: impl Fn(Uuid) -> JobError,
    ) -> crate::Result<Vec<Option<&'a T>>> {
        match self {
            ObjectSet::All => {
                let mut result = Vec::with_capacity(objects.len() + 1);
                if include_null_in_all {
                    result.push(None);
                }
                result.extend(objects.iter().map(Some));
                Ok(result)
            }
            ObjectSet::Default => Ok(objects.first().map(Some).into_iter().collect()),
            ObjectSet::Custom(members) => {
                let mut result = Vec::new();
                if members.contains(&None) {
                    result.push(None);
                }
                let mut remaining: BTreeSet<Uuid> = members.iter().flatten().copied().collect();
                for object in objects {
                    if remaining.remove(&object.uuid()) {
                        result.push(Some(object));
                    }
                }
                match remaining.into_iter().next() {
                    Some(missing) => Err(not_found(missing)),
                    None => Ok(result),
                }
            }
        }
    }
}

/// Values which can be members of a serialized object set.
pub trait SetMember: Ord + Sized {
    fn to_token(&self) -> String;
    fn from_token(token: &str) -> Option<Self>;
}

impl SetMember for Uuid {
    fn to_token(&self) -> String {
        self.to_string()
    }

    fn from_token(token: &str) -> Option<Self> {
        parse_uuid(token)
    }
}

impl SetMember for Option<Uuid> {
    fn to_token(&self) -> String {
        match self {
            Some(uuid) => uuid.to_string(),
            None => "none".to_string(),
        }
    }

    fn from_token(token: &str) -> Option<Self> {
        match token {
            "none" => Some(None),
            _ => parse_uuid(token).map(Some),
        }
    }
}

impl<T: SetMember> ObjectSet<T> {
    /// Reads all `(<tag> <value>)` children of `node`.
    pub fn read(node: &SExp, tag: &str) -> Result<Self, JobParseError> {
        let children = node.children(tag);
        let tokens: Vec<&str> = children.iter().filter_map(|c| c.value(0)).collect();
        if tokens.len() != children.len() {
            return Err(JobParseError::InvalidValue {
                field: tag.to_string(),
                value: String::new(),
            });
        }
        match tokens.as_slice() {
            ["all"] => Ok(ObjectSet::All),
            ["default"] => Ok(ObjectSet::Default),
            _ => tokens
                .iter()
                .map(|token| {
                    T::from_token(token).ok_or_else(|| JobParseError::InvalidValue {
                        field: tag.to_string(),
                        value: token.to_string(),
                    })
                })
                .collect(),
        }
    }

    pub fn write(&self, node: &mut SExp, tag: &str) {
        match self {
            ObjectSet::All => node.push(SExp::list(tag).with(SExp::atom("all"))),
            ObjectSet::Default => node.push(SExp::list(tag).with(SExp::atom("default"))),
            ObjectSet::Custom(members) => {
                for member in members {
                    node.push(SExp::list(tag).with(SExp::atom(member.to_token())));
                }
            }
        }
    }
}
