//! Semantic analysis of a document or search phrase.
//!
//! [`SemanticAnalyzer::analyze`] walks the alternation table over a
//! [`Document`] and produces a [`SemanticGraph`]: role-labelled relations
//! between tokens plus per-token lexical forms, negation and uncertainty
//! marks and entity spans. Everything the matcher and the topic scorer
//! need to know about syntax is in the graph.

use std::collections::{BTreeMap, VecDeque};

use crate::parse::document::Document;
use crate::parse::token::{TokenSpan, lexical_key};
use crate::semantics::alternation::{AlternationRule, PHASES, Phase, RULES, Rewrite};
use crate::semantics::role::Role;

/// Dependency labels of function words that never take part in a match.
const FUNCTION_DEPS: &[&str] = &[
    "det", "predet", "aux", "auxpass", "neg", "cc", "preconj", "prt", "case", "mark", "punct",
    "expl", "agent",
];

const MODALS: &[&str] = &["may", "might", "could", "would", "should"];
const CONDITIONAL_MARKERS: &[&str] = &["if", "whether"];
const REPORTING_VERBS: &[&str] = &[
    "say", "claim", "allege", "report", "believe", "think", "suggest", "suppose",
];
const RELATIVIZER_TAGS: &[&str] = &["WDT", "WP", "WP$"];
const RELATIVIZERS: &[&str] = &["who", "whom", "which", "that"];

/// What is being analysed.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum AnalysisMode {
    /// Registered or ad-hoc documents: all alternations apply.
    #[default]
    Document,
    /// Search phrases: no distribution over coordination, so a coordinated
    /// pattern keeps more than one root.
    SearchPhrase,
}

/// A role-labelled relation between two tokens.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SemanticEdge {
    pub head: usize,
    pub child: usize,
    pub role: Role,
    /// Derived by a rule that does not guarantee the relation holds
    /// (subject control).
    pub uncertain: bool,
    /// Name of the alternation rule that produced the relation.
    pub rule: &'static str,
}

/// Per-token results of the analysis.
#[derive(Clone, Debug, PartialEq)]
pub struct WordSemantics {
    pub negated: bool,
    pub uncertain: bool,
    /// Whether the token may be the target of a word match by itself.
    pub matchable: bool,
    /// Lower-cased lexical form: the lemma, the lemma plus verb particles
    /// ("take over"), or the text of a front-end multi-word unit.
    pub lexical_form: String,
    /// `lexical_key` of `lexical_form`.
    pub lexical_key: String,
    /// `lexical_key` of the surface text.
    pub text_key: String,
    /// Tokens covered by `lexical_form`.
    pub lexical_span: TokenSpan,
    /// The named entity the token belongs to.
    pub entity_span: Option<TokenSpan>,
    /// The entity as named at this token, extended left over contiguous
    /// compound and adjectival modifiers ("cybersecurity company Mandiant").
    pub entity_phrase_span: Option<TokenSpan>,
}

/// Semantic relations and word information of one analysed document.
#[derive(Clone, Debug)]
pub struct SemanticGraph {
    children: Vec<Vec<SemanticEdge>>,
    parents: Vec<Vec<SemanticEdge>>,
    words: Vec<WordSemantics>,
}

impl SemanticGraph {
    /// Number of tokens covered.
    pub fn len(&self) -> usize {
        self.words.len()
    }

    pub fn is_empty(&self) -> bool {
        self.words.is_empty()
    }

    /// Relations in which `head` is the head, ordered by child then role.
    pub fn children(&self, head: usize) -> &[SemanticEdge] {
        &self.children[head]
    }

    /// Relations in which `child` is the dependent.
    pub fn parents(&self, child: usize) -> &[SemanticEdge] {
        &self.parents[child]
    }

    pub fn word(&self, index: usize) -> &WordSemantics {
        &self.words[index]
    }

    pub fn is_negated(&self, index: usize) -> bool {
        self.words[index].negated
    }

    pub fn is_uncertain(&self, index: usize) -> bool {
        self.words[index].uncertain
    }

    pub fn is_matchable(&self, index: usize) -> bool {
        self.words[index].matchable
    }
}

#[derive(Clone, Copy, Debug)]
struct EdgeInfo {
    uncertain: bool,
    rule: &'static str,
}

/// Relations under construction, keyed (head, child, role).
#[derive(Default)]
struct GraphBuilder {
    edges: BTreeMap<(usize, usize, Role), EdgeInfo>,
}

impl GraphBuilder {
    fn add(&mut self, head: usize, child: usize, role: Role, uncertain: bool, rule: &'static str) {
        if head == child {
            return;
        }
        self.edges
            .entry((head, child, role))
            .and_modify(|info| info.uncertain &= uncertain)
            .or_insert(EdgeInfo { uncertain, rule });
    }

    fn edges_from(&self, head: usize) -> Vec<SemanticEdge> {
        self.edges
            .range((head, 0, Role::Subject)..=(head, usize::MAX, Role::Clause))
            .map(|(&(head, child, role), info)| to_edge(head, child, role, *info))
            .collect()
    }

    fn edges_to(&self, child: usize) -> Vec<SemanticEdge> {
        self.edges
            .iter()
            .filter(|((_, c, _), _)| *c == child)
            .map(|(&(head, child, role), info)| to_edge(head, child, role, *info))
            .collect()
    }

    fn has_role(&self, head: usize, role: Role) -> bool {
        self.edges_from(head).iter().any(|e| e.role == role)
    }

    fn dependents_with_role(&self, head: usize, role: Role) -> Vec<SemanticEdge> {
        self.edges_from(head)
            .into_iter()
            .filter(|e| e.role == role)
            .collect()
    }

    /// Move every relation pointing at `old` onto `new`.
    fn replace_child(&mut self, old: usize, new: usize, rule: &'static str) {
        let moved = self.edges_to(old);
        self.edges.retain(|(_, child, _), _| *child != old);
        for edge in moved {
            self.add(edge.head, new, edge.role, edge.uncertain, rule);
        }
    }

    fn apply(&mut self, document: &Document, rule: &AlternationRule, child: usize, head: usize) {
        match &rule.rewrite {
            Rewrite::Role(role) => self.add(head, child, *role, false, rule.name),
            Rewrite::Through { via, role } => {
                for &grandchild in document.children(child) {
                    if via.contains(&document.token(grandchild).dep.as_str()) {
                        self.add(head, grandchild, *role, false, rule.name);
                    }
                }
            }
            Rewrite::Inverted(role) => self.add(child, head, *role, false, rule.name),
            Rewrite::RelativeClause => self.relative_clause(document, child, head, rule.name),
            Rewrite::Predicative(role) => {
                for subject in self.dependents_with_role(head, Role::Subject) {
                    self.add(subject.child, child, *role, subject.uncertain, rule.name);
                }
            }
            Rewrite::Distribute => {
                for edge in self.edges_to(head) {
                    if edge.head != child {
                        self.add(edge.head, child, edge.role, edge.uncertain, rule.name);
                    }
                }
            }
            Rewrite::SharedSubject => {
                if !self.has_role(child, Role::Subject) {
                    for subject in self.dependents_with_role(head, Role::Subject) {
                        self.add(child, subject.child, Role::Subject, subject.uncertain, rule.name);
                    }
                }
            }
            Rewrite::Control => {
                let target = if is_passive(document, child) {
                    Role::Object
                } else {
                    Role::Subject
                };
                if self.has_role(child, target) {
                    return;
                }
                let mut controllers = self.dependents_with_role(head, Role::Object);
                if controllers.is_empty() {
                    controllers = self.dependents_with_role(head, Role::Subject);
                }
                for controller in controllers {
                    self.add(child, controller.child, target, true, rule.name);
                }
            }
            Rewrite::PrepositionalControl => {
                let target = if is_passive(document, child) {
                    Role::Object
                } else {
                    Role::Subject
                };
                if self.has_role(child, target) {
                    return;
                }
                let Some(governor) = document.token(head).head else {
                    return;
                };
                let mut controllers = self.dependents_with_role(governor, Role::Subject);
                let predicative = matches!(document.token(governor).dep.as_str(), "acomp" | "attr");
                if controllers.is_empty()
                    && predicative
                    && let Some(copula) = document.token(governor).head
                {
                    controllers = self.dependents_with_role(copula, Role::Subject);
                }
                for controller in controllers {
                    self.add(child, controller.child, target, true, rule.name);
                }
            }
        }
    }

    fn relative_clause(&mut self, document: &Document, verb: usize, noun: usize, rule: &'static str) {
        if let Some(relativizer) = find_relativizer(document, verb) {
            self.replace_child(relativizer, noun, rule);
            return;
        }
        if !is_passive(document, verb) && !self.has_role(verb, Role::Subject) {
            self.add(verb, noun, Role::Subject, false, rule);
        } else if !self.has_role(verb, Role::Object) {
            self.add(verb, noun, Role::Object, false, rule);
        }
    }

    fn finish(self, len: usize) -> (Vec<Vec<SemanticEdge>>, Vec<Vec<SemanticEdge>>) {
        let mut children = vec![Vec::new(); len];
        let mut parents = vec![Vec::new(); len];
        for (&(head, child, role), info) in &self.edges {
            let edge = to_edge(head, child, role, *info);
            children[head].push(edge);
            parents[child].push(edge);
        }
        (children, parents)
    }
}

fn to_edge(head: usize, child: usize, role: Role, info: EdgeInfo) -> SemanticEdge {
    SemanticEdge {
        head,
        child,
        role,
        uncertain: info.uncertain,
        rule: info.rule,
    }
}

/// Builds [`SemanticGraph`]s.
#[derive(Clone, Copy, Debug, Default)]
pub struct SemanticAnalyzer {
    mode: AnalysisMode,
}

impl SemanticAnalyzer {
    pub fn new(mode: AnalysisMode) -> Self {
        SemanticAnalyzer { mode }
    }

    pub fn mode(&self) -> AnalysisMode {
        self.mode
    }

    /// Analyse a document.
    pub fn analyze(&self, document: &Document) -> SemanticGraph {
        let order = top_down_order(document);
        let document_order: Vec<usize> = (0..document.len()).collect();
        let mut builder = GraphBuilder::default();

        for phase in PHASES {
            if phase == Phase::Distribution && self.mode == AnalysisMode::SearchPhrase {
                continue;
            }
            // Control chains ("wanted to try to go") resolve outermost first.
            let sequence = if phase == Phase::Control {
                &order
            } else {
                &document_order
            };
            for &child in sequence {
                for rule in RULES.iter().filter(|rule| rule.rewrite.phase() == phase) {
                    if let Some(head) = rule.triggers(document, child) {
                        builder.apply(document, rule, child, head);
                    }
                }
            }
        }

        let (negated, uncertain) = propagate_marks(document, &order);
        let words = (0..document.len())
            .map(|i| word_semantics(document, i, negated[i], uncertain[i]))
            .collect();
        let (children, parents) = builder.finish(document.len());

        SemanticGraph {
            children,
            parents,
            words,
        }
    }
}

/// Tokens ordered so that every head precedes its dependents.
fn top_down_order(document: &Document) -> Vec<usize> {
    let mut order = Vec::with_capacity(document.len());
    let mut queue: VecDeque<usize> = document
        .tokens()
        .iter()
        .filter(|t| t.head.is_none())
        .map(|t| t.index)
        .collect();
    while let Some(index) = queue.pop_front() {
        order.push(index);
        queue.extend(document.children(index).iter().copied());
    }
    order
}

fn propagate_marks(document: &Document, order: &[usize]) -> (Vec<bool>, Vec<bool>) {
    let mut negated = vec![false; document.len()];
    let mut uncertain = vec![false; document.len()];
    for &index in order {
        let token = document.token(index);
        let inherited = token.head.filter(|_| token.dep != "conj");
        negated[index] = is_negator_site(document, index) || inherited.is_some_and(|h| negated[h]);
        uncertain[index] =
            is_uncertainty_site(document, index) || inherited.is_some_and(|h| uncertain[h]);
    }
    (negated, uncertain)
}

fn is_negator_site(document: &Document, index: usize) -> bool {
    document.children(index).iter().any(|&c| {
        let child = document.token(c);
        match child.dep.as_str() {
            "neg" => true,
            "det" => child.lower_lemma() == "no",
            "advmod" => child.lower_lemma() == "never",
            _ => false,
        }
    })
}

fn is_uncertainty_site(document: &Document, index: usize) -> bool {
    let token = document.token(index);
    if token.dep == "ccomp"
        && let Some(head) = token.head
        && REPORTING_VERBS.contains(&document.token(head).lower_lemma().as_str())
    {
        return true;
    }
    document.children(index).iter().any(|&c| {
        let child = document.token(c);
        let lemma = child.lower_lemma();
        match child.dep.as_str() {
            "aux" => MODALS.contains(&lemma.as_str()),
            "mark" => CONDITIONAL_MARKERS.contains(&lemma.as_str()),
            _ => false,
        }
    })
}

fn is_passive(document: &Document, verb: usize) -> bool {
    document
        .children(verb)
        .iter()
        .any(|&c| document.token(c).dep == "auxpass")
}

fn is_relativizer(document: &Document, index: usize) -> bool {
    let token = document.token(index);
    RELATIVIZER_TAGS.contains(&token.tag.as_str())
        || (matches!(token.pos.as_str(), "PRON" | "DET")
            && RELATIVIZERS.contains(&token.lower_lemma().as_str()))
}

/// The relativiser of a relative clause: a direct dependent of the verb or
/// the object of one of its prepositions ("the town *into which* ...").
fn find_relativizer(document: &Document, verb: usize) -> Option<usize> {
    document.children(verb).iter().find_map(|&c| {
        if is_relativizer(document, c) {
            return Some(c);
        }
        if document.token(c).dep == "prep" {
            return document
                .children(c)
                .iter()
                .copied()
                .find(|&g| is_relativizer(document, g));
        }
        None
    })
}

fn word_semantics(document: &Document, index: usize, negated: bool, uncertain: bool) -> WordSemantics {
    let token = document.token(index);
    let (lexical_form, lexical_span) = lexical_form(document, index);
    let entity_span = entity_span(document, index);
    let entity_phrase_span = entity_span.map(|_| entity_phrase_span(document, index));
    WordSemantics {
        negated,
        uncertain,
        matchable: token.matchable && !FUNCTION_DEPS.contains(&token.dep.as_str()),
        lexical_key: lexical_key(&lexical_form),
        text_key: lexical_key(&token.text),
        lexical_form,
        lexical_span,
        entity_span,
        entity_phrase_span,
    }
}

fn lexical_form(document: &Document, index: usize) -> (String, TokenSpan) {
    let token = document.token(index);
    if let Some(span) = token.span
        && span.len() > 1
    {
        return (document.span_text(span).to_lowercase(), span);
    }

    let particles: Vec<usize> = document
        .children(index)
        .iter()
        .copied()
        .filter(|&c| document.token(c).dep == "prt")
        .collect();
    if particles.is_empty() {
        return (token.lower_lemma(), TokenSpan::single(index));
    }

    let mut form = token.lower_lemma();
    for &particle in &particles {
        form.push(' ');
        form.push_str(&document.token(particle).lower_lemma());
    }
    let contiguous = particles
        .iter()
        .enumerate()
        .all(|(offset, &p)| p == index + offset + 1);
    let span = if contiguous {
        TokenSpan::new(index, index + particles.len())
    } else {
        TokenSpan::single(index)
    };
    (form, span)
}

fn entity_span(document: &Document, index: usize) -> Option<TokenSpan> {
    let label = document.token(index).entity.as_deref()?;
    let sentence = document.sentence_of(index);
    let same_entity = |i: usize| {
        let token = document.token(i);
        !token.entity_begin && token.entity.as_deref() == Some(label)
    };

    let mut first = index;
    while first > sentence.start
        && !document.token(first).entity_begin
        && document.token(first - 1).entity.as_deref() == Some(label)
    {
        first -= 1;
    }
    let mut last = index;
    while last + 1 < sentence.end && same_entity(last + 1) {
        last += 1;
    }
    Some(TokenSpan::new(first, last))
}

/// The entity as it is named at its head: the head plus every contiguous
/// token to its left that belongs to the same entity or modifies it as a
/// compound or adjective ("cybersecurity company Mandiant", but "Royal Bank"
/// out of "Royal Bank of Scotland").
fn entity_phrase_span(document: &Document, index: usize) -> TokenSpan {
    let sentence = document.sentence_of(index);
    let label = document.token(index).entity.as_deref();
    let mut first = index;
    while first > sentence.start {
        let previous = document.token(first - 1);
        let same_entity = previous.entity.as_deref() == label && !document.token(first).entity_begin;
        let modifier = matches!(previous.dep.as_str(), "compound" | "amod");
        if (same_entity || modifier) && document.in_subtree(index, first - 1) {
            first -= 1;
        } else {
            break;
        }
    }
    TokenSpan::new(first, index)
}
