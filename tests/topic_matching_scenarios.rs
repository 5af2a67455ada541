use sleuth::config::{ManagerConfig, TopicMatchConfig};
use sleuth::error::{Result, SleuthError};
use sleuth::manager::Manager;
use sleuth::matching::MatchKind;
use sleuth::parse::ParsedText;
use sleuth::parse::conll::{read_document, read_documents};

const REFERENCE: &str = include_str!("fixtures/topic_reference.conllu");

const UNRELATED: &str = "\
# text = Birds sing
1\tBirds\tbird\tNOUN\tNNS\t_\t2\tnsubj\t_\t_
2\tsing\tsing\tVERB\tVBP\t_\t0\tROOT\t_\t_
";

#[test]
fn documents_are_ranked_by_shared_structure() -> Result<()> {
    let manager = build_manager(TopicMatchConfig::default())?;
    let reference = read_document(REFERENCE)?;

    let matches = manager.topic_match_documents_against(&reference, None)?;
    let labels: Vec<_> = matches.iter().map(|m| m.document_label.as_str()).collect();
    assert_eq!(labels, vec!["1", "2", "3"]);

    assert!(matches.iter().all(|m| m.score > 0.0));
    assert!(matches[0].score > 2.0 * matches[1].score);
    assert!(matches[1].score > matches[2].score);
    Ok(())
}

#[test]
fn best_window_reports_its_contributing_words() -> Result<()> {
    let manager = build_manager(TopicMatchConfig::default())?;
    let reference = read_document(REFERENCE)?;

    let matches = manager.topic_match_documents_against(&reference, Some(&["1"][..]))?;
    assert_eq!(matches.len(), 1);
    let top = &matches[0];
    assert_eq!(top.sentence_index, 0);
    assert_eq!(top.start_token_index, 1);
    assert_eq!(top.end_token_index, 12);
    assert_eq!(
        top.sentences_text,
        "The dog was thinking about whether he wanted to chase the neighbourhood cat."
    );

    let positions: Vec<_> = top
        .word_infos
        .iter()
        .map(|i| i.document_token_index)
        .collect();
    assert!(positions.windows(2).all(|w| w[0] < w[1]));
    assert!(positions.contains(&1));
    assert!(positions.contains(&9));
    assert!(positions.contains(&12));

    let pronoun = top
        .word_infos
        .iter()
        .find(|i| i.document_token_index == 6)
        .expect("pronoun standing in for the dog");
    assert_eq!(pronoun.reference_word, "dog");
    assert_eq!(pronoun.match_kind, MatchKind::Coreference);
    assert!(pronoun.relation);
    Ok(())
}

#[test]
fn unrelated_documents_are_omitted() -> Result<()> {
    let manager = build_manager(TopicMatchConfig::default())?;
    manager.register_document(&read_document(UNRELATED)?, Some("birds"))?;
    assert_eq!(manager.document_count(), 4);

    let matches = manager.topic_match_documents_against(&read_document(REFERENCE)?, None)?;
    assert_eq!(matches.len(), 3);
    assert!(matches.iter().all(|m| m.document_label != "birds"));

    let none = manager
        .topic_match_documents_against(&read_document(REFERENCE)?, Some(&["birds"][..]))?;
    assert!(none.is_empty());
    Ok(())
}

#[test]
fn results_are_limited_and_filtered() -> Result<()> {
    let manager = build_manager(TopicMatchConfig::default().with_max_results(2))?;
    let reference = read_document(REFERENCE)?;

    let limited = manager.topic_match_documents_against(&reference, None)?;
    let labels: Vec<_> = limited.iter().map(|m| m.document_label.as_str()).collect();
    assert_eq!(labels, vec!["1", "2"]);

    let filtered = manager.topic_match_documents_against(&reference, Some(&["3", "2"][..]))?;
    let labels: Vec<_> = filtered.iter().map(|m| m.document_label.as_str()).collect();
    assert_eq!(labels, vec!["2", "3"]);

    assert!(matches!(
        manager.topic_match_documents_against(&reference, Some(&["missing"][..])),
        Err(SleuthError::UnknownDocument(_))
    ));
    Ok(())
}

#[test]
fn empty_registry_yields_no_topic_matches() -> Result<()> {
    let manager = Manager::new(ManagerConfig::default().with_worker_threads(1))?;
    let matches = manager.topic_match_documents_against(&read_document(REFERENCE)?, None)?;
    assert!(matches.is_empty());
    Ok(())
}

fn build_manager(topic: TopicMatchConfig) -> Result<Manager> {
    let manager = Manager::new(
        ManagerConfig::default()
            .with_worker_threads(2)
            .with_topic(topic),
    )?;
    let documents: Vec<(ParsedText, Option<String>)> =
        read_documents(include_str!("fixtures/topic_documents.conllu"))?
            .into_iter()
            .map(|(id, parsed)| (parsed, id))
            .collect();
    manager.register_documents(documents)?;
    Ok(manager)
}
