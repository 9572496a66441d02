//! Small graphs shared by the unit tests.

use super::memory::MemoryGraph;
use crate::models::{props, ConstraintDef, ConstraintKind, IndexDef, Properties, Value};

/// Six nodes over Person, Employee, Dog and City:
///
/// * Person(name) is unique, Person(age) and KNOWS(since) are indexed
/// * Dog(name) has an existence constraint, dogs have no natural key
/// * Alice knows Bob twice, so KNOWS has a duplicate (start, end, type) pair
pub fn social() -> MemoryGraph {
    let mut g = MemoryGraph::new();
    let alice = g.create_node(
        &["Person"],
        props([("name", Value::from("Alice")), ("age", Value::Integer(34))]),
    );
    let bob = g.create_node(
        &["Person"],
        props([
            ("name", Value::from("Bob")),
            ("age", Value::Integer(28)),
            ("tags", Value::from(vec!["x", "y"])),
        ]),
    );
    let carol = g.create_node(&["Person", "Employee"], props([("name", "Carol")]));
    let rex = g.create_node(&["Dog"], props([("name", "Rex")]));
    let fido = g.create_node(
        &["Dog"],
        props([("name", Value::from("Fido")), ("weight", Value::Float(12.5))]),
    );
    let paris = g.create_node(&["City"], props([("name", "Paris")]));

    let rels = [
        (alice, bob, "KNOWS", props([("since", 2010i64)])),
        (alice, bob, "KNOWS", props([("since", 2015i64)])),
        (bob, carol, "KNOWS", Properties::new()),
        (alice, rex, "OWNS", Properties::new()),
        (carol, fido, "OWNS", props([("since", 2020i64)])),
        (alice, paris, "LIVES_IN", Properties::new()),
        (bob, paris, "LIVES_IN", Properties::new()),
    ];
    for (start, end, rel_type, properties) in rels {
        g.create_relationship(start, end, rel_type, properties)
            .expect("fixture endpoints exist");
    }

    g.add_constraint(ConstraintDef::unique("Person", &["name"]));
    g.add_constraint(ConstraintDef::node(ConstraintKind::Existence, "Dog", &["name"]));
    g.add_index(IndexDef::node("Person", &["age"]));
    g.add_index(IndexDef::relationship("KNOWS", &["since"]));
    g
}

/// 100 Person nodes each living in one of 5 cities.
pub fn person_city() -> MemoryGraph {
    let mut g = MemoryGraph::new();
    let cities: Vec<_> = (0..5)
        .map(|i| g.create_node(&["City"], props([("name", format!("City {i}"))])))
        .collect();
    for i in 0..100i64 {
        let person = g.create_node(&["Person"], props([("id", i)]));
        g.create_relationship(person, cities[(i % 5) as usize], "LIVES_IN", Properties::new())
            .expect("fixture endpoints exist");
    }
    g
}

/// `n` unconstrained `Item` nodes chained by `NEXT` relationships.
pub fn chain(n: usize) -> MemoryGraph {
    let mut g = MemoryGraph::new();
    let ids: Vec<_> = (0..n as i64)
        .map(|i| g.create_node(&["Item"], props([("pos", i)])))
        .collect();
    for pair in ids.windows(2) {
        g.create_relationship(pair[0], pair[1], "NEXT", Properties::new())
            .expect("fixture endpoints exist");
    }
    g
}
