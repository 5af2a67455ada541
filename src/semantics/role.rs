//! Canonical semantic roles.
//!
//! Syntactic dependency labels are normalised into a small set of roles so
//! that structurally different but equivalent constructions ("the dog chased
//! the cat" / "the cat was chased by the dog") produce the same relations.

use std::fmt;

use serde::{Deserialize, Serialize};

/// The role a dependent plays relative to its semantic head.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Role {
    /// Agent-like argument (active subject, passive by-phrase).
    Subject,
    /// Patient-like argument (active object, passive subject).
    Object,
    /// Recipient ("gave *us* permission", "gave permission *to us*").
    Dative,
    /// Adjectival, adverbial, numeric and compound modifiers.
    Modifier,
    /// Possessive determiner or noun.
    Possessor,
    /// Predicative complement of a copula.
    Attribute,
    /// Preposition attached to its governor.
    Preposition,
    /// Object of a preposition.
    PrepObject,
    /// Clausal complement or infinitival modifier.
    Clause,
}

impl Role {
    /// Roles a document relation may carry to satisfy a search-phrase
    /// relation carrying `self`.
    pub fn equivalents(self) -> &'static [Role] {
        match self {
            Role::Subject => &[Role::Subject],
            Role::Object => &[Role::Object],
            Role::Dative => &[Role::Dative],
            Role::Modifier => &[Role::Modifier],
            Role::Possessor => &[Role::Possessor],
            Role::Attribute => &[Role::Attribute, Role::Modifier],
            Role::Preposition => &[Role::Preposition],
            Role::PrepObject => &[Role::PrepObject],
            Role::Clause => &[Role::Clause],
        }
    }

    /// Whether a document relation with role `other` satisfies a phrase
    /// relation with role `self`.
    pub fn accepts(self, other: Role) -> bool {
        self.equivalents().contains(&other)
    }

    /// Whether the role links a predicate to one of its arguments.
    pub fn is_argument(self) -> bool {
        matches!(self, Role::Subject | Role::Object | Role::Dative)
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Role::Subject => "subject",
            Role::Object => "object",
            Role::Dative => "dative",
            Role::Modifier => "modifier",
            Role::Possessor => "possessor",
            Role::Attribute => "attribute",
            Role::Preposition => "preposition",
            Role::PrepObject => "prepositional object",
            Role::Clause => "clause",
        };
        f.write_str(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_equivalence_is_strict_for_arguments() {
        assert!(Role::Subject.accepts(Role::Subject));
        assert!(!Role::Subject.accepts(Role::Object));
        assert!(!Role::Object.accepts(Role::Subject));
        assert!(Role::Attribute.accepts(Role::Modifier));
        assert!(Role::Dative.is_argument());
        assert!(!Role::Modifier.is_argument());
    }
}
