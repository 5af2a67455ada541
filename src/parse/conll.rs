//! CoNLL-U reader.
//!
//! Any dependency parser that can emit CoNLL-U can feed the engine. Ten
//! tab-separated columns per token; the ones used are ID, FORM, LEMMA,
//! UPOS, XPOS, HEAD (0 = root), DEPREL and MISC. Recognised MISC keys:
//!
//! - `Ent=B-ORG` / `Ent=I-ORG`: entity label in IOB form
//! - `SpaceAfter=No`
//! - `Vec=0.1,0.2,...`: word embedding
//!
//! Comment lines:
//!
//! - `# text = ...`: sentence text
//! - `# coref = 1:3-4 2:1`: one coreference chain; each mention is a
//!   1-based sentence number and a 1-based inclusive token ID range
//!
//! ```
//! use sleuth::parse::conll;
//!
//! let parsed = conll::read_document(
//!     "# text = Dogs bark\n\
//!      1\tDogs\tdog\tNOUN\tNNS\t_\t2\tnsubj\t_\t_\n\
//!      2\tbark\tbark\tVERB\tVBP\t_\t0\tROOT\t_\t_\n",
//! )
//! .unwrap();
//! assert_eq!(parsed.sentences.len(), 1);
//! assert_eq!(parsed.sentences[0].tokens[0].head, Some(1));
//! ```

use crate::error::{Result, SleuthError};
use crate::parse::coreference::{ParsedChain, ParsedMention};
use crate::parse::document::ParsedText;
use crate::parse::sentence::ParsedSentence;
use crate::parse::token::Token;

/// Read a whole document (one or more sentences separated by blank lines).
/// `# newdoc` lines are ignored.
pub fn read_document(input: &str) -> Result<ParsedText> {
    Ok(read(input, false)?
        .pop()
        .map(|(_, parsed)| parsed)
        .unwrap_or_default())
}

/// Read a file holding several documents, each introduced by a
/// `# newdoc` line (optionally `# newdoc id = ...`). Returns each document
/// with its id. Sentences before the first `# newdoc` form a document
/// without an id.
pub fn read_documents(input: &str) -> Result<Vec<(Option<String>, ParsedText)>> {
    read(input, true)
}

fn read(input: &str, split: bool) -> Result<Vec<(Option<String>, ParsedText)>> {
    let mut documents = Vec::new();
    let mut id = None;
    let mut parsed = ParsedText::default();
    let mut current = ParsedSentence::default();

    for (line_number, raw_line) in input.lines().enumerate() {
        let line = raw_line.trim_end_matches('\r');
        let trimmed = line.trim();

        if trimmed.is_empty() {
            flush(&mut parsed, &mut current);
            continue;
        }

        if let Some(comment) = trimmed.strip_prefix('#') {
            let comment = comment.trim();
            if split && let Some(newdoc) = comment.strip_prefix("newdoc") {
                flush(&mut parsed, &mut current);
                if !parsed.sentences.is_empty() {
                    documents.push((id.take(), std::mem::take(&mut parsed)));
                }
                parsed = ParsedText::default();
                id = newdoc
                    .trim()
                    .strip_prefix("id =")
                    .map(|value| value.trim().to_string());
            } else if let Some(text) = comment.strip_prefix("text =") {
                current.text = Some(text.trim().to_string());
            } else if let Some(chain) = comment.strip_prefix("coref =") {
                parsed.coreference.push(read_chain(chain, line_number + 1)?);
            }
            continue;
        }

        let columns: Vec<&str> = line.split('\t').collect();
        if columns.len() != 10 {
            return Err(SleuthError::invalid_input(format!(
                "line {}: expected 10 tab-separated columns, found {}",
                line_number + 1,
                columns.len()
            )));
        }
        // Multi-word token ranges (1-2) and empty nodes (1.1) carry no tree.
        if columns[0].contains('-') || columns[0].contains('.') {
            continue;
        }
        current.tokens.push(read_token(&columns, current.tokens.len(), line_number + 1)?);
    }
    flush(&mut parsed, &mut current);
    if !split || !parsed.sentences.is_empty() {
        documents.push((id, parsed));
    }

    Ok(documents)
}

fn flush(parsed: &mut ParsedText, current: &mut ParsedSentence) {
    if !current.tokens.is_empty() {
        parsed.sentences.push(std::mem::take(current));
    } else {
        // A stray `# text` without tokens is dropped.
        current.text = None;
    }
}

fn read_token(columns: &[&str], position: usize, line: usize) -> Result<Token> {
    let id: usize = columns[0]
        .parse()
        .map_err(|_| SleuthError::invalid_input(format!("line {line}: bad token ID")))?;
    if id != position + 1 {
        return Err(SleuthError::invalid_input(format!(
            "line {line}: token ID {id} out of sequence"
        )));
    }

    let head: usize = columns[6]
        .parse()
        .map_err(|_| SleuthError::invalid_input(format!("line {line}: bad HEAD column")))?;
    let head = if head == 0 { None } else { Some(head - 1) };

    let lemma = match columns[2] {
        "_" => columns[1],
        lemma => lemma,
    };
    let mut token = Token::new(position, columns[1], lemma, columns[3])
        .with_tag(underscore_to_empty(columns[4]))
        .with_dependency(columns[7], head);

    for item in columns[9].split('|') {
        let Some((key, value)) = item.split_once('=') else {
            continue;
        };
        match key {
            "Ent" => {
                let (begin, label) = match value.split_once('-') {
                    Some(("B", label)) => (true, label),
                    Some(("I", label)) => (false, label),
                    _ => (false, value),
                };
                token = token.with_entity(label, begin);
            }
            "SpaceAfter" => token = token.with_whitespace(value != "No"),
            "Vec" => {
                let vector = value
                    .split(',')
                    .map(|v| v.trim().parse::<f32>())
                    .collect::<std::result::Result<Vec<_>, _>>()
                    .map_err(|_| {
                        SleuthError::invalid_input(format!("line {line}: bad Vec value"))
                    })?;
                token = token.with_vector(vector);
            }
            _ => {}
        }
    }

    Ok(token)
}

fn read_chain(declaration: &str, line: usize) -> Result<ParsedChain> {
    let mut mentions = Vec::new();
    for item in declaration.split_whitespace() {
        let bad = || SleuthError::invalid_input(format!("line {line}: bad mention '{item}'"));
        let (sentence, range) = item.split_once(':').ok_or_else(bad)?;
        let sentence: usize = sentence.parse().map_err(|_| bad())?;
        let (first, last) = match range.split_once('-') {
            Some((first, last)) => (
                first.parse::<usize>().map_err(|_| bad())?,
                last.parse::<usize>().map_err(|_| bad())?,
            ),
            None => {
                let single = range.parse::<usize>().map_err(|_| bad())?;
                (single, single)
            }
        };
        if sentence == 0 || first == 0 || last < first {
            return Err(bad());
        }
        mentions.push(ParsedMention::new(sentence - 1, first - 1, last - 1));
    }
    Ok(ParsedChain::new(mentions))
}

fn underscore_to_empty(value: &str) -> &str {
    if value == "_" { "" } else { value }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = "\
# coref = 1:3-4 2:1
# text = I met Richard Hudson.
1\tI\tI\tPRON\tPRP\t_\t2\tnsubj\t_\t_
2\tmet\tmeet\tVERB\tVBD\t_\t0\tROOT\t_\t_
3\tRichard\tRichard\tPROPN\tNNP\t_\t4\tcompound\t_\tEnt=B-PERSON
4\tHudson\tHudson\tPROPN\tNNP\t_\t2\tdobj\t_\tEnt=I-PERSON|SpaceAfter=No
5\t.\t.\tPUNCT\t.\t_\t2\tpunct\t_\t_

# text = He smiled
1\tHe\the\tPRON\tPRP\t_\t2\tnsubj\t_\tVec=0.5,0.25
2\tsmiled\tsmile\tVERB\tVBD\t_\t0\tROOT\t_\t_
";

    #[test]
    fn test_read_sentences_and_columns() {
        let parsed = read_document(SAMPLE).unwrap();
        assert_eq!(parsed.sentences.len(), 2);

        let first = &parsed.sentences[0];
        assert_eq!(first.text.as_deref(), Some("I met Richard Hudson."));
        assert_eq!(first.tokens[1].lemma, "meet");
        assert_eq!(first.tokens[1].head, None);
        assert_eq!(first.tokens[3].dep, "dobj");
        assert_eq!(first.tokens[3].head, Some(1));
        assert_eq!(first.tokens[2].entity.as_deref(), Some("PERSON"));
        assert!(first.tokens[2].entity_begin);
        assert!(!first.tokens[3].entity_begin);
        assert!(!first.tokens[3].whitespace);

        let second = &parsed.sentences[1];
        assert_eq!(second.tokens[0].vector, Some(vec![0.5, 0.25]));
    }

    #[test]
    fn test_read_coreference() {
        let parsed = read_document(SAMPLE).unwrap();
        assert_eq!(parsed.coreference.len(), 1);
        assert_eq!(
            parsed.coreference[0].mentions,
            vec![ParsedMention::new(0, 2, 3), ParsedMention::new(1, 0, 0)]
        );
    }

    #[test]
    fn test_rejects_malformed_lines() {
        assert!(read_document("1\tDogs\tdog\tNOUN\n").is_err());
        assert!(read_document("2\tDogs\tdog\tNOUN\tNNS\t_\t0\tROOT\t_\t_\n").is_err());
        assert!(read_document("# coref = 1:0-2\n").is_err());
    }

    #[test]
    fn test_read_documents() {
        let input = format!("# newdoc id = first\n{SAMPLE}\n# newdoc\n# text = Birds sing\n1\tBirds\tbird\tNOUN\tNNS\t_\t2\tnsubj\t_\t_\n2\tsing\tsing\tVERB\tVBP\t_\t0\tROOT\t_\t_\n");
        let documents = read_documents(&input).unwrap();
        assert_eq!(documents.len(), 2);
        assert_eq!(documents[0].0.as_deref(), Some("first"));
        assert_eq!(documents[0].1.sentences.len(), 2);
        assert_eq!(documents[0].1.coreference.len(), 1);
        assert_eq!(documents[1].0, None);
        assert!(documents[1].1.coreference.is_empty());

        // A single-document read ignores the markers.
        assert_eq!(read_document(&input).unwrap().sentences.len(), 3);
    }
}
