//! Cableado del registro integrado: cobertura completa y dependencias
//! estrictamente anteriores.

use phase_core::stage::{stage_index, STAGE_ORDER};
use phase_handlers::{default_registry, CONTEXT_NEEDS};

#[test]
fn every_stage_has_a_handler() {
    let registry = default_registry().expect("registry");
    assert_eq!(registry.len(), STAGE_ORDER.len());
    let all: Vec<&str> = STAGE_ORDER.to_vec();
    assert!(registry.missing_for(&all).is_empty());
}

#[test]
fn context_needs_point_strictly_backwards() {
    for (stage, needs) in CONTEXT_NEEDS {
        let idx = stage_index(stage).expect("known stage");
        for need in needs {
            let need_idx = stage_index(need).expect("known dependency");
            assert!(need_idx < idx, "stage {stage} depends on {need} which is not earlier");
        }
    }
}

#[test]
fn registry_exposes_the_declared_needs() {
    let registry = default_registry().expect("registry");
    assert_eq!(registry.context_needs("2"), Vec::<String>::new().as_slice());
    assert_eq!(registry.context_needs("6"), ["3", "4", "5"]);
    assert_eq!(registry.context_needs("8"), ["6", "7"]);
}
