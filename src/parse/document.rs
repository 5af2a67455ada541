//! Documents: validated, document-wide views over parsed sentences and
//! their coreference chains.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::error::{Result, SleuthError};
use crate::parse::coreference::{CoreferenceChain, Mention, ParsedChain, ParsedMention};
use crate::parse::sentence::{ParsedSentence, Sentence, join_tokens};
use crate::parse::token::{Token, TokenSpan};

/// Everything the front end produces for one text.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ParsedText {
    /// Sentences in order.
    pub sentences: Vec<ParsedSentence>,

    /// Coreference chains over the whole text.
    pub coreference: Vec<ParsedChain>,
}

impl ParsedText {
    /// Create a parsed text without coreference information.
    pub fn new(sentences: Vec<ParsedSentence>) -> Self {
        ParsedText {
            sentences,
            coreference: Vec::new(),
        }
    }

    /// Add a coreference chain.
    pub fn with_chain(mut self, chain: ParsedChain) -> Self {
        self.coreference.push(chain);
        self
    }

    /// The full text, sentences joined by a space.
    pub fn display_text(&self) -> String {
        self.sentences
            .iter()
            .map(ParsedSentence::display_text)
            .collect::<Vec<_>>()
            .join(" ")
    }
}

/// Where a token sits in the coreference side table.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
struct MentionRef {
    chain: usize,
    mention: usize,
}

/// A validated parsed document with stable document-wide token positions.
///
/// Documents are immutable once built; the registry shares them behind
/// `Arc` so matches never observe partial mutation.
#[derive(Clone, Debug)]
pub struct Document {
    tokens: Vec<Token>,
    sentences: Vec<Sentence>,
    chains: Vec<CoreferenceChain>,
    children: Vec<Vec<usize>>,
    mention_heads: HashMap<usize, MentionRef>,
}

impl Document {
    /// Adopt a parsed text, rewriting sentence-local positions to
    /// document-wide ones and validating the tree structure.
    pub fn from_parsed(parsed: &ParsedText) -> Result<Self> {
        let mut tokens = Vec::new();
        let mut sentences = Vec::with_capacity(parsed.sentences.len());

        for (sentence_index, sentence) in parsed.sentences.iter().enumerate() {
            if sentence.tokens.is_empty() {
                return Err(SleuthError::invalid_input(format!(
                    "sentence {sentence_index} has no tokens"
                )));
            }
            validate_sentence(sentence_index, sentence)?;

            let start = tokens.len();
            for token in &sentence.tokens {
                let mut token = token.clone();
                token.index += start;
                token.head = token.head.map(|h| h + start);
                token.span = token.span.map(|s| s.offset(start));
                tokens.push(token);
            }
            sentences.push(Sentence {
                index: sentence_index,
                start,
                end: tokens.len(),
                text: sentence.display_text(),
            });
        }

        if tokens.is_empty() {
            return Err(SleuthError::invalid_input("document has no tokens"));
        }

        let mut children = vec![Vec::new(); tokens.len()];
        for token in &tokens {
            if let Some(head) = token.head {
                children[head].push(token.index);
            }
        }

        let mut document = Document {
            tokens,
            sentences,
            chains: Vec::new(),
            children,
            mention_heads: HashMap::new(),
        };
        document.adopt_chains(&parsed.coreference)?;
        Ok(document)
    }

    fn adopt_chains(&mut self, chains: &[ParsedChain]) -> Result<()> {
        for parsed_chain in chains {
            let id = self.chains.len();
            let mut mentions = Vec::with_capacity(parsed_chain.mentions.len());
            for parsed_mention in &parsed_chain.mentions {
                mentions.push(self.resolve_mention(parsed_mention)?);
            }
            if mentions.len() < 2 {
                continue;
            }
            let chain = CoreferenceChain::new(id, mentions);
            for (mention_index, mention) in chain.mentions.iter().enumerate() {
                let previous = self.mention_heads.insert(
                    mention.head,
                    MentionRef {
                        chain: id,
                        mention: mention_index,
                    },
                );
                if previous.is_some() {
                    return Err(SleuthError::invalid_input(format!(
                        "token {} heads mentions in more than one chain",
                        mention.head
                    )));
                }
            }
            self.chains.push(chain);
        }
        Ok(())
    }

    fn resolve_mention(&self, mention: &ParsedMention) -> Result<Mention> {
        let sentence = self.sentences.get(mention.sentence).ok_or_else(|| {
            SleuthError::invalid_input(format!(
                "mention refers to missing sentence {}",
                mention.sentence
            ))
        })?;
        if mention.first > mention.last || mention.last >= sentence.len() {
            return Err(SleuthError::invalid_input(format!(
                "mention {}-{} out of range in sentence {}",
                mention.first, mention.last, mention.sentence
            )));
        }
        let first = sentence.start + mention.first;
        let last = sentence.start + mention.last;
        let head = (first..=last)
            .find(|&i| match self.tokens[i].head {
                Some(h) => h < first || h > last,
                None => true,
            })
            .unwrap_or(first);
        Ok(Mention { first, last, head })
    }

    /// All tokens in document order.
    pub fn tokens(&self) -> &[Token] {
        &self.tokens
    }

    /// The token at a document-wide position.
    ///
    /// # Panics
    ///
    /// Panics if `index` is out of range; positions handed out by this
    /// document are always valid.
    pub fn token(&self, index: usize) -> &Token {
        &self.tokens[index]
    }

    /// Number of tokens.
    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    /// Whether the document has no tokens (never true for a built document).
    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }

    /// The sentences of the document.
    pub fn sentences(&self) -> &[Sentence] {
        &self.sentences
    }

    /// The sentence containing a token.
    pub fn sentence_of(&self, index: usize) -> &Sentence {
        let position = self
            .sentences
            .partition_point(|sentence| sentence.end <= index);
        &self.sentences[position]
    }

    /// Syntactic children of a token, in document order.
    pub fn children(&self, index: usize) -> &[usize] {
        &self.children[index]
    }

    /// The coreference chains of the document.
    pub fn chains(&self) -> &[CoreferenceChain] {
        &self.chains
    }

    /// The chain a token heads a mention in, if any.
    pub fn chain_of(&self, index: usize) -> Option<&CoreferenceChain> {
        self.mention_heads
            .get(&index)
            .map(|mention_ref| &self.chains[mention_ref.chain])
    }

    /// The mention a token heads, if any.
    pub fn mention_of(&self, index: usize) -> Option<&Mention> {
        self.mention_heads
            .get(&index)
            .map(|r| &self.chains[r.chain].mentions[r.mention])
    }

    /// Heads of the other mentions coreferent with the mention `index`
    /// heads. Empty if the token heads no mention.
    pub fn coreferent_heads(&self, index: usize) -> Vec<usize> {
        self.chain_of(index)
            .map(|chain| chain.other_heads(index).collect())
            .unwrap_or_default()
    }

    /// Whether `index` lies in the syntactic subtree rooted at `root`.
    pub fn in_subtree(&self, root: usize, index: usize) -> bool {
        let mut current = Some(index);
        let mut steps = 0;
        while let Some(i) = current {
            if i == root {
                return true;
            }
            steps += 1;
            if steps > self.tokens.len() {
                break;
            }
            current = self.tokens[i].head;
        }
        false
    }

    /// Number of tree edges between a token and the root of its sentence.
    pub fn depth(&self, index: usize) -> usize {
        let mut depth = 0;
        let mut current = self.tokens[index].head;
        while let Some(i) = current {
            depth += 1;
            current = self.tokens[i].head;
        }
        depth
    }

    /// Surface text of an inclusive token span.
    pub fn span_text(&self, span: TokenSpan) -> String {
        join_tokens(&self.tokens[span.first..=span.last])
    }

    /// Text of every sentence between the sentences of `first` and `last`.
    pub fn sentences_text(&self, first: usize, last: usize) -> String {
        let from = self.sentence_of(first).index;
        let to = self.sentence_of(last).index;
        self.sentences[from..=to]
            .iter()
            .map(|s| s.text.as_str())
            .collect::<Vec<_>>()
            .join(" ")
    }

    /// Rebuild the front-end view of this document (sentence-local
    /// positions), e.g. for serialization.
    pub fn to_parsed(&self) -> ParsedText {
        let sentences = self
            .sentences
            .iter()
            .map(|sentence| {
                let tokens = self.tokens[sentence.start..sentence.end]
                    .iter()
                    .map(|token| {
                        let mut token = token.clone();
                        token.index -= sentence.start;
                        token.head = token.head.map(|h| h - sentence.start);
                        token.span = token.span.map(|s| TokenSpan {
                            first: s.first - sentence.start,
                            last: s.last - sentence.start,
                        });
                        token
                    })
                    .collect();
                ParsedSentence {
                    text: Some(sentence.text.clone()),
                    tokens,
                }
            })
            .collect();

        let coreference = self
            .chains
            .iter()
            .map(|chain| ParsedChain {
                mentions: chain
                    .mentions
                    .iter()
                    .map(|m| {
                        let sentence = self.sentence_of(m.first);
                        ParsedMention::new(
                            sentence.index,
                            m.first - sentence.start,
                            m.last - sentence.start,
                        )
                    })
                    .collect(),
            })
            .collect();

        ParsedText {
            sentences,
            coreference,
        }
    }
}

fn validate_sentence(sentence_index: usize, sentence: &ParsedSentence) -> Result<()> {
    let len = sentence.tokens.len();
    for (i, token) in sentence.tokens.iter().enumerate() {
        if token.index != i {
            return Err(SleuthError::invalid_input(format!(
                "sentence {sentence_index}: token at position {i} has index {}",
                token.index
            )));
        }
        if let Some(head) = token.head
            && (head >= len || head == i)
        {
            return Err(SleuthError::invalid_input(format!(
                "sentence {sentence_index}: token {i} has invalid head {head}"
            )));
        }
        if let Some(span) = token.span
            && (span.last >= len || !span.contains(i))
        {
            return Err(SleuthError::invalid_input(format!(
                "sentence {sentence_index}: token {i} has invalid span"
            )));
        }
    }

    // Every head chain must reach a root within `len` steps.
    for start in 0..len {
        let mut current = sentence.tokens[start].head;
        let mut steps = 0;
        while let Some(head) = current {
            steps += 1;
            if steps > len {
                return Err(SleuthError::invalid_input(format!(
                    "sentence {sentence_index}: cyclic head structure at token {start}"
                )));
            }
            current = sentence.tokens[head].head;
        }
    }
    Ok(())
}
