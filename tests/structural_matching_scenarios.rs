use std::collections::HashMap;

use sleuth::config::ManagerConfig;
use sleuth::error::Result;
use sleuth::manager::Manager;
use sleuth::matching::{DocumentMatch, MatchKind};
use sleuth::ontology::OntologyBuilder;
use sleuth::parse::ParsedText;
use sleuth::parse::conll::{read_document, read_documents};
use sleuth::phrase::SearchPhraseHandle;

const PATTERNS: &str = include_str!("fixtures/patterns.conllu");

/// Documents of `fixtures/big_dog.conllu` that the big-dog phrase matches,
/// with the expected (negated, uncertain) flags. Every other document in the
/// fixture must not match.
const BIG_DOG_MATCHES: &[(&str, bool, bool)] = &[
    ("positive-plain", false, false),
    ("positive-passive", false, false),
    ("positive-relative", false, false),
    ("positive-participle", false, false),
    ("positive-control", false, true),
    ("positive-coreference", false, false),
    ("positive-negated-modal", true, true),
    ("positive-relative-subject", false, false),
    ("positive-passive-control", false, true),
    ("positive-going-to", false, true),
    ("positive-predicative-gerund", false, true),
    ("positive-attributive-participle", false, false),
    ("positive-existential-relative", false, false),
    ("positive-nominalisation", false, false),
    ("positive-coordinated-pronoun", false, false),
    ("positive-coreferent-noun", false, true),
    ("positive-pronoun-chain", false, false),
    ("positive-pronoun-object", false, false),
    ("positive-pronoun-subject", false, false),
];

#[test]
fn big_dog_phrase_matches_alternations_but_not_swapped_roles() -> Result<()> {
    let (manager, handles) = build_manager()?;
    manager.register_documents(labelled(include_str!("fixtures/big_dog.conllu"))?)?;
    assert_eq!(manager.document_count(), 26);

    let matches = manager.match_documents(Some(&[handles["big-dog"]][..]), None)?;
    let counts = count_by_label(&matches);

    for label in manager.document_labels() {
        let expected = BIG_DOG_MATCHES.iter().find(|(l, _, _)| *l == label);
        assert_eq!(
            expected.is_some(),
            label.starts_with("positive"),
            "document {label} has no expectation"
        );
        assert_eq!(
            counts.get(label.as_str()).copied().unwrap_or(0),
            usize::from(expected.is_some()),
            "document {label}"
        );
    }

    for &(label, negated, uncertain) in BIG_DOG_MATCHES {
        let found = find(&matches, label);
        assert_eq!(found.negated, negated, "negation in {label}");
        assert_eq!(found.uncertain, uncertain, "uncertainty in {label}");
        let words: Vec<_> = found
            .word_matches
            .iter()
            .map(|w| w.search_phrase_word.as_str())
            .collect();
        assert_eq!(words, vec!["big", "dog", "chase", "cat"], "words in {label}");
    }

    let plain = find(&matches, "positive-plain");
    assert!(!plain.involves_coreference);
    assert_eq!(plain.index_within_document, 3);
    assert_eq!(plain.sentences_within_document, "A big dog chased a cat");
    assert_eq!(plain.overall_similarity_measure, 1.0);
    Ok(())
}

#[test]
fn predicative_adjective_subject_is_the_gerund_patient() -> Result<()> {
    let (manager, handles) = build_manager()?;
    manager.register_documents(labelled(include_str!("fixtures/big_dog.conllu"))?)?;

    let matches = manager.match_documents(
        Some(&[handles["big-dog"]][..]),
        Some(&["positive-predicative-gerund"][..]),
    )?;
    assert_eq!(matches.len(), 1);
    let found = &matches[0];
    assert_eq!(found.index_within_document, 6);
    assert_eq!(
        found.sentences_within_document,
        "The cat was afraid of being chased by the big dog"
    );
    let indexes: Vec<_> = found
        .word_matches
        .iter()
        .map(|w| w.document_token_index)
        .collect();
    assert_eq!(indexes, vec![9, 10, 6, 1]);
    Ok(())
}

#[test]
fn attributive_participle_takes_its_noun_as_subject() -> Result<()> {
    let (manager, handles) = build_manager()?;
    manager.register_documents(labelled(include_str!("fixtures/big_dog.conllu"))?)?;

    let matches = manager.match_documents(
        Some(&[handles["big-dog"]][..]),
        Some(&["positive-attributive-participle"][..]),
    )?;
    assert_eq!(matches.len(), 1);
    let found = &matches[0];
    assert!(!found.uncertain);
    assert_eq!(found.sentences_within_document, "I saw a cat-chasing big dog");
    let indexes: Vec<_> = found
        .word_matches
        .iter()
        .map(|w| w.document_token_index)
        .collect();
    assert_eq!(indexes, vec![6, 7, 5, 3]);
    Ok(())
}

#[test]
fn repeated_matching_is_stable() -> Result<()> {
    let (manager, _) = build_manager()?;
    manager.register_documents(labelled(include_str!("fixtures/big_dog.conllu"))?)?;
    manager.register_documents(labelled(include_str!("fixtures/acquisitions.conllu"))?)?;

    let first = manager.match_documents(None, None)?;
    let second = manager.match_documents(None, None)?;
    assert!(!first.is_empty());
    assert_eq!(first, second);
    Ok(())
}

#[test]
fn match_flags_reach_every_word() -> Result<()> {
    let (manager, _) = build_manager()?;
    manager.register_documents(labelled(include_str!("fixtures/big_dog.conllu"))?)?;
    let mut matches = manager.match_documents(None, None)?;
    matches.extend(manager.match_parsed_document(&read_document(include_str!(
        "fixtures/complex.conllu"
    ))?)?);

    assert!(matches.iter().any(|m| m.uncertain));
    assert!(matches.iter().any(|m| m.negated));
    for found in &matches {
        for word in &found.word_matches {
            assert_eq!(word.uncertain, found.uncertain, "{}", found.document_label);
            assert_eq!(word.negated, found.negated, "{}", found.document_label);
        }
    }
    Ok(())
}

#[test]
fn pronouns_stand_in_for_their_antecedents() -> Result<()> {
    let (manager, handles) = build_manager()?;
    manager.register_documents(labelled(include_str!("fixtures/big_dog.conllu"))?)?;

    let matches = manager.match_documents(
        Some(&[handles["big-dog"]][..]),
        Some(&["positive-coreference"][..]),
    )?;
    assert_eq!(matches.len(), 1);
    let found = &matches[0];
    assert!(found.involves_coreference);
    assert_eq!(found.index_within_document, 6);
    assert_eq!(
        found.sentences_within_document,
        "A dog appeared. It was chasing a cat. It was very big."
    );

    let words: Vec<_> = found
        .word_matches
        .iter()
        .map(|w| w.search_phrase_word.as_str())
        .collect();
    assert_eq!(words, vec!["big", "dog", "chase", "cat"]);

    // "big" is predicated of the second "It".
    let big = &found.word_matches[0];
    assert_eq!(big.document_token_index, 13);
    assert_eq!(big.match_kind, MatchKind::Direct);

    let dog = &found.word_matches[1];
    assert_eq!(dog.match_kind, MatchKind::Coreference);
    assert_eq!(dog.document_token_index, 1);
    assert_eq!(dog.structurally_matched_document_token_index, 4);
    assert!(dog.involves_coreference);
    assert!(!found.word_matches[2].involves_coreference);
    Ok(())
}

#[test]
fn coordinated_antecedents_yield_one_match_each() -> Result<()> {
    let (manager, _) = build_manager()?;
    let document = read_document(include_str!("fixtures/complex.conllu"))?;

    let matches = manager.match_parsed_document(&document)?;
    assert_eq!(matches.len(), 2);

    for found in &matches {
        assert_eq!(found.search_phrase_label, "An ENTITYPERSON goes into town");
        assert_eq!(found.search_phrase_text, "An ENTITYPERSON goes into town");
        assert_eq!(found.document_label, "");
        assert_eq!(found.index_within_document, 15);
        assert_eq!(
            found.sentences_within_document,
            "I met Richard Hudson and John Doe last week. They didn't want to go into town."
        );
        assert!(found.negated);
        assert!(found.uncertain);
        assert!(found.involves_coreference);
        assert_eq!(found.overall_similarity_measure, 1.0);
        assert_eq!(found.word_matches.len(), 4);

        let go = &found.word_matches[1];
        assert_eq!(go.search_phrase_token_index, 2);
        assert_eq!(go.search_phrase_word, "go");
        assert_eq!(go.document_token_index, 15);
        assert_eq!(go.match_kind, MatchKind::Direct);
        assert_eq!(go.explanation, "Matches GO directly.");
        assert!(!go.involves_coreference);

        let town = &found.word_matches[3];
        assert_eq!(town.document_token_index, 17);
        assert_eq!(town.document_phrase, "town");
    }

    let people: Vec<_> = matches
        .iter()
        .map(|m| {
            let person = &m.word_matches[0];
            assert_eq!(person.search_phrase_token_index, 1);
            assert_eq!(person.search_phrase_word, "ENTITYPERSON");
            assert_eq!(person.structurally_matched_document_token_index, 10);
            assert_eq!(person.match_kind, MatchKind::Entity);
            assert_eq!(person.explanation, "Has an entity label matching ENTITYPERSON.");
            assert!(person.involves_coreference);
            (
                person.document_token_index,
                person.first_document_token_index,
                person.last_document_token_index,
                person.document_phrase.as_str(),
                person.extracted_word.as_str(),
            )
        })
        .collect();
    assert_eq!(
        people,
        vec![
            (3, 2, 3, "Richard Hudson", "richard hudson"),
            (6, 5, 6, "John Doe", "john doe"),
        ]
    );
    Ok(())
}

#[test]
fn extracted_word_names_the_antecedent() -> Result<()> {
    let (manager, _) = build_manager()?;
    let document = read_document(include_str!("fixtures/astrazeneca.conllu"))?;

    let matches = manager.match_parsed_document(&document)?;
    assert_eq!(matches.len(), 1);
    let company = &matches[0].word_matches[0];
    assert_eq!(company.search_phrase_word, "company");
    assert_eq!(company.document_word, "company");
    assert_eq!(company.extracted_word, "astrazeneca");
    let something = &matches[0].word_matches[4];
    assert_eq!(something.search_phrase_word, "something");
    assert_eq!(something.document_word, "library");
    assert_eq!(something.match_kind, MatchKind::Entity);
    Ok(())
}

#[test]
fn entity_wildcards_match_named_entities() -> Result<()> {
    let (manager, handles) = build_manager()?;
    manager.register_document(
        &read_document(include_str!("fixtures/visit.conllu"))?,
        Some("visit"),
    )?;

    let matches = manager.match_documents(None, None)?;
    assert_eq!(matches.len(), 1);
    assert_eq!(matches[0].search_phrase_handle, handles["visits"]);
    assert_eq!(matches[0].word_matches[0].document_phrase, "Richard Hudson");
    assert_eq!(matches[0].word_matches[2].document_phrase, "Berlin");
    Ok(())
}

#[test]
fn takeovers_match_through_synonyms_and_nominalisations() -> Result<()> {
    let (manager, _) = build_manager()?;
    manager.register_documents(labelled(include_str!("fixtures/acquisitions.conllu"))?)?;

    let matches = manager.match_documents(None, None)?;
    assert_eq!(matches.len(), 4);

    let labels: Vec<_> = matches.iter().map(|m| m.document_label.as_str()).collect();
    assert_eq!(labels, vec!["1", "2", "3", "4"]);

    let buyers: Vec<_> = matches
        .iter()
        .map(|m| m.word_matches[0].document_phrase.as_str())
        .collect();
    assert_eq!(
        buyers,
        vec!["Royal Bank", "Chipmaker MaxLinear Inc", "Alphabet", "Kaseya"]
    );

    let targets: Vec<_> = matches
        .iter()
        .map(|m| m.word_matches[2].document_phrase.as_str())
        .collect();
    assert_eq!(
        targets,
        vec![
            "Brewin Dolphin",
            "Silicon Motion Technology Corp",
            "cybersecurity company Mandiant",
            "Datto"
        ]
    );

    let verbs: Vec<_> = matches.iter().map(|m| m.word_matches[1].match_kind).collect();
    assert_eq!(
        verbs,
        vec![
            MatchKind::Ontology,
            MatchKind::Ontology,
            MatchKind::Ontology,
            MatchKind::Direct
        ]
    );
    assert_eq!(
        matches[0].word_matches[1].explanation,
        "Is a synonym of TAKE OVER in the ontology."
    );
    assert!(matches[0].involves_coreference);
    assert!(matches[0].uncertain);
    assert!(!matches[2].involves_coreference);
    Ok(())
}

fn build_manager() -> Result<(Manager, HashMap<String, SearchPhraseHandle>)> {
    let ontology = OntologyBuilder::new()
        .synonyms(&["take over", "acquire", "buy", "purchase"])
        .build()?;
    let manager = Manager::with_ontology(ManagerConfig::default().with_worker_threads(2), ontology)?;

    let mut handles = HashMap::new();
    for (id, pattern) in read_documents(PATTERNS)? {
        let handle = manager.register_search_phrase(&pattern, None)?;
        handles.insert(id.unwrap_or_default(), handle);
    }
    Ok((manager, handles))
}

fn labelled(input: &str) -> Result<Vec<(ParsedText, Option<String>)>> {
    Ok(read_documents(input)?
        .into_iter()
        .map(|(id, parsed)| (parsed, id))
        .collect())
}

fn count_by_label(matches: &[DocumentMatch]) -> HashMap<&str, usize> {
    let mut counts = HashMap::new();
    for found in matches {
        *counts.entry(found.document_label.as_str()).or_insert(0) += 1;
    }
    counts
}

fn find<'a>(matches: &'a [DocumentMatch], label: &str) -> &'a DocumentMatch {
    matches
        .iter()
        .find(|m| m.document_label == label)
        .unwrap_or_else(|| panic!("no match in {label}"))
}
