//! Declarative table of structural alternations.
//!
//! Each [`AlternationRule`] pairs a trigger (the dependency label of a
//! child token plus a condition over the child and its head) with a
//! rewrite that adds semantic relations. The analyzer consults the table
//! phase by phase; the recursion in the matcher never sees syntax, only the
//! relations produced here. New alternations are added by appending rows.

use crate::parse::document::Document;
use crate::semantics::role::Role;

/// Order in which rewrites are applied. Later phases see the relations
/// produced by earlier ones.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub(crate) enum Phase {
    /// Plain relations and local alternations (passive, participles,
    /// nominalisations).
    Base,
    /// Relative clauses and predicative adjectives.
    Clause,
    /// Coordination and apposition.
    Distribution,
    /// Subject control into infinitival and gerund complements.
    Control,
}

pub(crate) const PHASES: [Phase; 4] = [
    Phase::Base,
    Phase::Clause,
    Phase::Distribution,
    Phase::Control,
];

/// Condition evaluated on a (child, head) pair.
#[derive(Debug)]
pub(crate) enum Condition {
    Always,
    ChildTag(&'static [&'static str]),
    ChildTagNot(&'static [&'static str]),
    ChildPos(&'static [&'static str]),
    ChildLemma(&'static [&'static str]),
    HeadPos(&'static [&'static str]),
    HeadTag(&'static [&'static str]),
    HeadDep(&'static [&'static str]),
    HeadLemma(&'static [&'static str]),
    HeadHasDep(&'static str),
    HeadHasPrep(&'static str),
    HeadLacksPrep(&'static str),
    All(&'static [Condition]),
}

impl Condition {
    pub(crate) fn holds(&self, document: &Document, child: usize, head: usize) -> bool {
        let child_token = document.token(child);
        let head_token = document.token(head);
        match self {
            Condition::Always => true,
            Condition::ChildTag(tags) => tags.contains(&child_token.tag.as_str()),
            Condition::ChildTagNot(tags) => !tags.contains(&child_token.tag.as_str()),
            Condition::ChildPos(pos) => pos.contains(&child_token.pos.as_str()),
            Condition::ChildLemma(lemmas) => lemmas.contains(&child_token.lower_lemma().as_str()),
            Condition::HeadPos(pos) => pos.contains(&head_token.pos.as_str()),
            Condition::HeadTag(tags) => tags.contains(&head_token.tag.as_str()),
            Condition::HeadDep(deps) => deps.contains(&head_token.dep.as_str()),
            Condition::HeadLemma(lemmas) => lemmas.contains(&head_token.lower_lemma().as_str()),
            Condition::HeadHasDep(dep) => document
                .children(head)
                .iter()
                .any(|&c| document.token(c).dep == *dep),
            Condition::HeadHasPrep(lemma) => has_prep(document, head, lemma),
            Condition::HeadLacksPrep(lemma) => !has_prep(document, head, lemma),
            Condition::All(conditions) => conditions.iter().all(|c| c.holds(document, child, head)),
        }
    }
}

fn has_prep(document: &Document, head: usize, lemma: &str) -> bool {
    document.children(head).iter().any(|&c| {
        let token = document.token(c);
        token.dep == "prep" && token.lower_lemma() == lemma
    })
}

/// What a rule adds to the semantic graph.
#[derive(Debug)]
pub(crate) enum Rewrite {
    /// head -role-> child.
    Role(Role),
    /// head -role-> grandchild reached through one of the `via` labels;
    /// the child itself is bypassed ("chased *by* the dog").
    Through {
        via: &'static [&'static str],
        role: Role,
    },
    /// child -role-> head: the head noun is an argument of a participle
    /// modifying it ("the dog *chasing* the cat").
    Inverted(Role),
    /// The head noun takes the place of the relativiser in the relative
    /// clause, or fills its missing subject/object.
    RelativeClause,
    /// Subjects of the copula head gain a relation to the predicative child
    /// ("the dog was *big*").
    Predicative(Role),
    /// The child (a conjunct or appositive) stands wherever its head stands
    /// as a dependent.
    Distribute,
    /// A coordinated verb without a subject shares its head verb's subject.
    SharedSubject,
    /// The controller of the head becomes the subject (or, for a passive
    /// complement, the object) of the child. Derived relations are uncertain.
    Control,
    /// The child is a gerund governed by a preposition. The subject of
    /// whatever the preposition attaches to, or of the copula behind a
    /// predicative adjective, controls it ("the cat was afraid of *being
    /// chased*"). Derived relations are uncertain.
    PrepositionalControl,
}

impl Rewrite {
    pub(crate) fn phase(&self) -> Phase {
        match self {
            Rewrite::Role(_) | Rewrite::Through { .. } | Rewrite::Inverted(_) => Phase::Base,
            Rewrite::RelativeClause | Rewrite::Predicative(_) => Phase::Clause,
            Rewrite::Distribute | Rewrite::SharedSubject => Phase::Distribution,
            Rewrite::Control | Rewrite::PrepositionalControl => Phase::Control,
        }
    }
}

/// One row of the alternation table.
#[derive(Debug)]
pub(crate) struct AlternationRule {
    pub name: &'static str,
    pub deps: &'static [&'static str],
    pub condition: Condition,
    pub rewrite: Rewrite,
}

impl AlternationRule {
    pub(crate) fn triggers(&self, document: &Document, child: usize) -> Option<usize> {
        let token = document.token(child);
        let head = token.head?;
        if self.deps.contains(&token.dep.as_str()) && self.condition.holds(document, child, head) {
            Some(head)
        } else {
            None
        }
    }
}

/// Copular verbs whose predicative adjective describes the subject.
pub(crate) const COPULAS: &[&str] = &["be", "become", "seem", "remain", "stay", "appear"];

pub(crate) static RULES: &[AlternationRule] = &[
    AlternationRule {
        name: "subject",
        deps: &["nsubj", "csubj"],
        condition: Condition::Always,
        rewrite: Rewrite::Role(Role::Subject),
    },
    AlternationRule {
        name: "object",
        deps: &["dobj", "obj"],
        condition: Condition::Always,
        rewrite: Rewrite::Role(Role::Object),
    },
    AlternationRule {
        name: "passive-subject",
        deps: &["nsubjpass", "csubjpass"],
        condition: Condition::Always,
        rewrite: Rewrite::Role(Role::Object),
    },
    AlternationRule {
        name: "passive-agent",
        deps: &["agent"],
        condition: Condition::Always,
        rewrite: Rewrite::Through {
            via: &["pobj"],
            role: Role::Subject,
        },
    },
    AlternationRule {
        name: "dative",
        deps: &["dative", "iobj"],
        condition: Condition::Always,
        rewrite: Rewrite::Role(Role::Dative),
    },
    AlternationRule {
        name: "dative-to",
        deps: &["prep"],
        condition: Condition::All(&[
            Condition::ChildLemma(&["to"]),
            Condition::HeadPos(&["VERB"]),
            Condition::HeadHasDep("dobj"),
        ]),
        rewrite: Rewrite::Through {
            via: &["pobj"],
            role: Role::Dative,
        },
    },
    AlternationRule {
        name: "modifier",
        deps: &["amod", "nummod", "advmod", "npadvmod", "nmod", "quantmod"],
        condition: Condition::Always,
        rewrite: Rewrite::Role(Role::Modifier),
    },
    AlternationRule {
        name: "compound",
        deps: &["compound"],
        condition: Condition::HeadLacksPrep("by"),
        rewrite: Rewrite::Role(Role::Modifier),
    },
    AlternationRule {
        name: "nominal-patient-compound",
        deps: &["compound"],
        condition: Condition::All(&[
            Condition::HeadPos(&["NOUN"]),
            Condition::HeadHasPrep("by"),
        ]),
        rewrite: Rewrite::Role(Role::Object),
    },
    AlternationRule {
        name: "possessor",
        deps: &["poss"],
        condition: Condition::Always,
        rewrite: Rewrite::Role(Role::Possessor),
    },
    AlternationRule {
        name: "attribute",
        deps: &["attr", "acomp", "oprd"],
        condition: Condition::Always,
        rewrite: Rewrite::Role(Role::Attribute),
    },
    AlternationRule {
        name: "preposition",
        deps: &["prep"],
        condition: Condition::Always,
        rewrite: Rewrite::Role(Role::Preposition),
    },
    AlternationRule {
        name: "prepositional-object",
        deps: &["pobj", "pcomp"],
        condition: Condition::Always,
        rewrite: Rewrite::Role(Role::PrepObject),
    },
    AlternationRule {
        name: "nominal-agent",
        deps: &["prep"],
        condition: Condition::All(&[
            Condition::ChildLemma(&["by"]),
            Condition::HeadPos(&["NOUN"]),
        ]),
        rewrite: Rewrite::Through {
            via: &["pobj"],
            role: Role::Subject,
        },
    },
    AlternationRule {
        name: "nominal-patient",
        deps: &["prep"],
        condition: Condition::All(&[
            Condition::ChildLemma(&["of"]),
            Condition::HeadPos(&["NOUN"]),
        ]),
        rewrite: Rewrite::Through {
            via: &["pobj"],
            role: Role::Object,
        },
    },
    AlternationRule {
        name: "clausal-complement",
        deps: &["xcomp", "ccomp", "advcl"],
        condition: Condition::Always,
        rewrite: Rewrite::Role(Role::Clause),
    },
    AlternationRule {
        name: "infinitival-modifier",
        deps: &["acl"],
        condition: Condition::ChildTagNot(&["VBG", "VBN"]),
        rewrite: Rewrite::Role(Role::Clause),
    },
    AlternationRule {
        name: "active-participle",
        deps: &["acl"],
        condition: Condition::ChildTag(&["VBG"]),
        rewrite: Rewrite::Inverted(Role::Subject),
    },
    AlternationRule {
        name: "passive-participle",
        deps: &["acl"],
        condition: Condition::ChildTag(&["VBN"]),
        rewrite: Rewrite::Inverted(Role::Object),
    },
    AlternationRule {
        name: "attributive-active-participle",
        deps: &["amod"],
        condition: Condition::ChildTag(&["VBG"]),
        rewrite: Rewrite::Inverted(Role::Subject),
    },
    AlternationRule {
        name: "attributive-passive-participle",
        deps: &["amod"],
        condition: Condition::All(&[Condition::ChildPos(&["VERB"]), Condition::ChildTag(&["VBN"])]),
        rewrite: Rewrite::Inverted(Role::Object),
    },
    AlternationRule {
        name: "attributive-participle-object",
        deps: &["compound", "npadvmod"],
        condition: Condition::All(&[Condition::HeadTag(&["VBG"]), Condition::HeadDep(&["amod"])]),
        rewrite: Rewrite::Role(Role::Object),
    },
    AlternationRule {
        name: "relative-clause",
        deps: &["relcl"],
        condition: Condition::Always,
        rewrite: Rewrite::RelativeClause,
    },
    AlternationRule {
        name: "predicative-adjective",
        deps: &["acomp", "attr"],
        condition: Condition::All(&[
            Condition::ChildPos(&["ADJ"]),
            Condition::HeadLemma(COPULAS),
        ]),
        rewrite: Rewrite::Predicative(Role::Modifier),
    },
    AlternationRule {
        name: "coordination",
        deps: &["conj"],
        condition: Condition::Always,
        rewrite: Rewrite::Distribute,
    },
    AlternationRule {
        name: "apposition",
        deps: &["appos"],
        condition: Condition::Always,
        rewrite: Rewrite::Distribute,
    },
    AlternationRule {
        name: "coordinated-verb-subject",
        deps: &["conj"],
        condition: Condition::All(&[Condition::ChildPos(&["VERB"]), Condition::HeadPos(&["VERB"])]),
        rewrite: Rewrite::SharedSubject,
    },
    AlternationRule {
        name: "control",
        deps: &["xcomp"],
        condition: Condition::Always,
        rewrite: Rewrite::Control,
    },
    AlternationRule {
        name: "prepositional-control",
        deps: &["pcomp"],
        condition: Condition::All(&[
            Condition::ChildPos(&["VERB"]),
            Condition::ChildTag(&["VBG", "VBN"]),
            Condition::HeadDep(&["prep"]),
        ]),
        rewrite: Rewrite::PrepositionalControl,
    },
];
