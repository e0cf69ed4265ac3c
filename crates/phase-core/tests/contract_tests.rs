//! Propiedades del contrato congelado de etapas.

use phase_core::stage::{self, StageKind, DECK_STAGE, STAGE_ORDER};

#[test]
fn partition_is_disjoint_union_of_order() {
    let primary = stage::primary_stages();
    let review = stage::review_stages();

    assert_eq!(primary.len() + review.len(), STAGE_ORDER.len());
    for id in STAGE_ORDER {
        assert!(primary.contains(&id) ^ review.contains(&id), "stage {id} must be in exactly one partition");
    }
    for id in review {
        assert!(id.ends_with('a'), "review stage {id} must end in `a`");
    }
}

#[test]
fn order_helpers_are_consistent() {
    assert_eq!(STAGE_ORDER.len(), 13);
    for (idx, id) in STAGE_ORDER.iter().enumerate() {
        assert!(stage::is_valid(id));
        assert_eq!(stage::stage_index(id), Some(idx));
    }
    assert!(!stage::is_valid("10"));
    assert!(!stage::is_valid(""));

    assert_eq!(stage::next_stage("2"), Some("2a"));
    assert_eq!(stage::next_stage("9"), None);
    assert_eq!(stage::prev_stage("2"), None);
    assert_eq!(stage::prev_stage("2a"), Some("2"));
}

#[test]
fn slices_are_inclusive() {
    let head = stage::slice_through("3").expect("valid stage");
    assert_eq!(head, &["2", "2a", "3"]);

    let middle = stage::slice_between("3a", "5").expect("valid range");
    assert_eq!(middle, &["3a", "4", "4a", "5"]);

    assert!(stage::slice_between("5", "3").is_none());
    assert!(stage::slice_through("nope").is_none());
}

#[test]
fn definitions_declare_artifacts() {
    for id in STAGE_ORDER {
        let def = stage::definition(id).expect("every ordered stage has a definition");
        assert_eq!(def.id, id);
        assert!(def.outputs.contains(&"output.json"));
        let expects_review = id.ends_with('a');
        assert_eq!(def.kind == StageKind::Review, expects_review);
    }
    let deck = stage::definition(DECK_STAGE).expect("deck stage");
    assert!(deck.outputs.contains(&"deck.pptx"));
}
