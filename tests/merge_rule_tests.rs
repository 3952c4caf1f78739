//! Tests for the merge rules over two UTXO sets
//!
//! Fixture: three base UTXOs u0, u1, u2 and one extra `new_utxo`.
//!
//! | set | contents             |
//! |-----|----------------------|
//! | A   | u0, u2               |
//! | B   | u1, u2               |
//! | C   | u0, u1               |
//! | D   | u1                   |
//! | E   | (empty)              |
//! | F   | u0, u1, u2           |
//! | G   | new_utxo, u0, u1, u2 |
//! | H   | new_utxo             |

use ledger_utxo::*;

struct Fixture {
    sets: Vec<(&'static str, UtxoSet)>,
}

impl Fixture {
    fn new() -> Self {
        let base: Vec<String> = (0u8..3)
            .map(|i| {
                let owners = OutputOwners::new(vec![[0x10 + i; 20]], 0, 1);
                Utxo::new(0, [0x40 + i; 32], i as u32, [0x77; 32], Output::transfer(1_000u64 * (i as u64 + 1), owners))
                    .to_cb58()
                    .unwrap()
            })
            .collect();
        let new_utxo = Utxo::new(
            0,
            [0xee; 32],
            5,
            [0x77; 32],
            Output::transfer(5u64, OutputOwners::new(vec![[0xee; 20]], 0, 1)),
        )
        .to_cb58()
        .unwrap();

        let build = |items: Vec<&String>| {
            let mut set = UtxoSet::new();
            set.add_array(items.into_iter().cloned(), false).unwrap();
            set
        };

        let sets = vec![
            ("A", build(vec![&base[0], &base[2]])),
            ("B", build(vec![&base[1], &base[2]])),
            ("C", build(vec![&base[0], &base[1]])),
            ("D", build(vec![&base[1]])),
            ("E", build(vec![])),
            ("F", build(vec![&base[0], &base[1], &base[2]])),
            ("G", build(vec![&new_utxo, &base[0], &base[1], &base[2]])),
            ("H", build(vec![&new_utxo])),
        ];
        Fixture { sets }
    }

    fn get(&self, name: &str) -> &UtxoSet {
        &self.sets.iter().find(|(n, _)| *n == name).unwrap().1
    }

    /// Names of fixture sets equal to `result`
    fn matching(&self, result: &UtxoSet) -> Vec<&'static str> {
        self.sets
            .iter()
            .filter(|(_, set)| set == result)
            .map(|(name, _)| *name)
            .collect()
    }

    fn check(&self, other: &str, rule: &str, expected: &str) {
        let result = self.get("F").merge_by_rule(self.get(other), rule).unwrap();
        assert_eq!(
            self.matching(&result),
            vec![expected],
            "F.{}({}) should equal only {}",
            rule,
            other,
            expected
        );
    }
}

#[test]
fn test_unknown_rule() {
    let fx = Fixture::new();
    let result = fx.get("F").merge_by_rule(fx.get("A"), "ERROR");
    assert!(matches!(result, Err(UtxoError::InvalidRule(name)) if name == "ERROR"));
}

#[test]
fn test_intersection() {
    let fx = Fixture::new();
    fx.check("A", "intersection", "A");
    fx.check("F", "intersection", "F");
    fx.check("G", "intersection", "F");
    fx.check("H", "intersection", "E");
}

#[test]
fn test_difference_new() {
    let fx = Fixture::new();
    fx.check("A", "differenceNew", "E");
    fx.check("F", "differenceNew", "E");
    fx.check("G", "differenceNew", "H");
    fx.check("H", "differenceNew", "H");
}

#[test]
fn test_difference_self() {
    let fx = Fixture::new();
    fx.check("A", "differenceSelf", "D");
    fx.check("F", "differenceSelf", "E");
    fx.check("G", "differenceSelf", "E");
    fx.check("H", "differenceSelf", "F");
}

#[test]
fn test_sym_difference() {
    let fx = Fixture::new();
    fx.check("A", "symDifference", "D");
    fx.check("F", "symDifference", "E");
    fx.check("G", "symDifference", "H");
    fx.check("H", "symDifference", "G");
}

#[test]
fn test_union() {
    let fx = Fixture::new();
    fx.check("A", "union", "F");
    fx.check("F", "union", "F");
    fx.check("G", "union", "G");
    fx.check("H", "union", "G");
}

#[test]
fn test_union_minus_new() {
    let fx = Fixture::new();
    fx.check("A", "unionMinusNew", "D");
    fx.check("F", "unionMinusNew", "E");
    fx.check("G", "unionMinusNew", "E");
    fx.check("H", "unionMinusNew", "F");
}

#[test]
fn test_union_minus_self() {
    let fx = Fixture::new();
    fx.check("A", "unionMinusSelf", "E");
    fx.check("F", "unionMinusSelf", "E");
    fx.check("G", "unionMinusSelf", "H");
    fx.check("H", "unionMinusSelf", "H");
}

#[test]
fn test_aliases_agree_on_two_sets() {
    let fx = Fixture::new();
    for other in ["A", "B", "G", "H"] {
        let f = fx.get("F");
        let o = fx.get(other);
        assert_eq!(
            f.merge_with_rule(o, MergeRule::UnionMinusNew).unwrap(),
            f.merge_with_rule(o, MergeRule::DifferenceSelf).unwrap()
        );
        assert_eq!(
            f.merge_with_rule(o, MergeRule::UnionMinusSelf).unwrap(),
            f.merge_with_rule(o, MergeRule::DifferenceNew).unwrap()
        );
    }
}

#[test]
fn test_merge_never_mutates_inputs() {
    let fx = Fixture::new();
    let snapshot: Vec<UtxoSet> = fx.sets.iter().map(|(_, s)| s.clone()).collect();
    for rule in MergeRule::ALL {
        for (name, _) in &fx.sets {
            let merged = fx.get("F").merge_with_rule(fx.get(name), rule).unwrap();
            drop(merged);
        }
    }
    for ((_, set), before) in fx.sets.iter().zip(snapshot.iter()) {
        assert_eq!(set, before);
    }
}

#[test]
fn test_result_is_independent() {
    let fx = Fixture::new();
    let mut merged = fx.get("F").merge_by_rule(fx.get("H"), "union").unwrap();
    let first = merged.get_utxo_ids(None, true)[0].clone();
    merged.remove(UtxoRef::id(first)).unwrap();
    assert_eq!(merged.len(), 3);
    assert_eq!(fx.get("F").len(), 3);
    assert_eq!(fx.get("G").len(), 4);
}

#[test]
fn test_new_wins_on_collision() {
    let fx = Fixture::new();
    let base = fx.get("F").get_all_utxos(None);
    let replacement = Utxo::new(
        0,
        *base[0].tx_id().unwrap(),
        base[0].output_index(),
        [0x78; 32],
        Output::transfer(1u64, OutputOwners::new(vec![[0x01; 20]], 0, 1)),
    );
    let mut newer = UtxoSet::new();
    newer.add(replacement.clone(), false).unwrap();

    let id = replacement.utxo_id().unwrap();
    for rule in ["intersection", "union"] {
        let merged = fx.get("F").merge_by_rule(&newer, rule).unwrap();
        assert_eq!(merged.get_utxo(&id), Some(&replacement));
    }
    let union = fx.get("F").merge_by_rule(&newer, "union").unwrap();
    assert_eq!(union.len(), 3);
    assert_eq!(union.get_asset_ids(None).len(), 2);
}
