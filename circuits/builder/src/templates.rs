//! Ready-made circuit graphs offered by the template gallery.

use crate::graph::{AdvancedOperator, Graph, Node, Operator};

pub struct TemplateSpec {
    pub name: &'static str,
    pub title: &'static str,
    pub description: &'static str,
    build: fn() -> Graph,
}

impl TemplateSpec {
    pub fn graph(&self) -> Graph {
        (self.build)()
    }
}

pub const TEMPLATES: &[TemplateSpec] = &[
    TemplateSpec {
        name: "age-verification",
        title: "Age Verification",
        description: "Prove you are above a public minimum age without revealing your birth year",
        build: age_verification,
    },
    TemplateSpec {
        name: "balance-proof",
        title: "Balance Proof",
        description: "Prove sufficient balance without revealing the exact amount",
        build: balance_proof,
    },
    TemplateSpec {
        name: "range-verification",
        title: "Range Verification",
        description: "Prove a private value lies within 18..=65",
        build: range_verification,
    },
    TemplateSpec {
        name: "hash-commitment",
        title: "Hash Commitment",
        description: "Commit to a secret with a salted Poseidon hash",
        build: hash_commitment,
    },
    TemplateSpec {
        name: "merkle-membership",
        title: "Merkle Tree Membership",
        description: "Prove membership in a depth-20 tree without revealing which leaf",
        build: merkle_membership,
    },
    TemplateSpec {
        name: "hash-preimage",
        title: "Hash Preimage Proof",
        description: "Prove knowledge of X where hash(X, salt) equals a public value",
        build: hash_preimage,
    },
    TemplateSpec {
        name: "patience-proof",
        title: "Patience Privacy Proof",
        description: "Prove a waiting period elapsed without revealing the exact timing",
        build: patience_proof,
    },
];

pub fn find(name: &str) -> Option<&'static TemplateSpec> {
    TEMPLATES.iter().find(|template| template.name == name)
}

pub fn names() -> impl Iterator<Item = &'static str> {
    TEMPLATES.iter().map(|template| template.name)
}

fn age_verification() -> Graph {
    let mut graph = Graph::new();
    graph
        .push_node(Node::private_input("birth-year", "Birth Year"))
        .push_node(Node::public_input("current-year", "Current Year"))
        .push_node(Node::public_input("minimum-age", "Minimum Age"))
        .push_node(Node::operation("age", Operator::Subtract))
        .push_node(Node::operation("old-enough", Operator::Gt))
        .push_node(Node::boolean_output("is-adult", "Is Adult"))
        .connect("current-year", "age", "a")
        .connect("birth-year", "age", "b")
        .connect("age", "old-enough", "a")
        .connect("minimum-age", "old-enough", "b")
        .connect("old-enough", "is-adult", "in");
    graph
}

fn balance_proof() -> Graph {
    let mut graph = Graph::new();
    graph
        .push_node(Node::private_input("balance", "Your Balance"))
        .push_node(Node::public_input("minimum", "Required Minimum"))
        .push_node(Node::operation("covers", Operator::Gt))
        .push_node(Node::boolean_output("sufficient", "Has Sufficient Funds"))
        .connect("balance", "covers", "a")
        .connect("minimum", "covers", "b")
        .connect("covers", "sufficient", "in");
    graph
}

fn range_verification() -> Graph {
    let mut graph = Graph::new();
    graph
        .push_node(Node::private_input("value", "Private Value"))
        .push_node(Node::advanced(
            "bounds",
            AdvancedOperator::RangeCheck,
            &[("min", "18"), ("max", "65")],
        ))
        .push_node(Node::boolean_output("in-range", "In Range"))
        .connect("value", "bounds", "in")
        .connect("bounds", "in-range", "in");
    graph
}

fn hash_commitment() -> Graph {
    let mut graph = Graph::new();
    graph
        .push_node(Node::private_input("secret", "Secret Value"))
        .push_node(Node::private_input("salt", "Salt"))
        .push_node(Node::advanced(
            "digest",
            AdvancedOperator::Hash,
            &[("inputs", "2")],
        ))
        .push_node(Node::number_output("commitment", "Commitment"))
        .connect("secret", "digest", "in0")
        .connect("salt", "digest", "in1")
        .connect("digest", "commitment", "in");
    graph
}

fn merkle_membership() -> Graph {
    let mut graph = Graph::new();
    graph
        .push_node(Node::private_input("member", "Member ID"))
        .push_node(Node::public_input("root", "Merkle Root"))
        .push_node(Node::advanced(
            "inclusion",
            AdvancedOperator::MerkleProof,
            &[("depth", "20")],
        ))
        .push_node(Node::boolean_output("is-member", "Is Member"))
        .connect("member", "inclusion", "leaf")
        .connect("root", "inclusion", "root")
        .connect("inclusion", "is-member", "in");
    graph
}

fn hash_preimage() -> Graph {
    let mut graph = Graph::new();
    graph
        .push_node(Node::private_input("preimage", "Preimage (Secret)"))
        .push_node(Node::private_input("salt", "Salt"))
        .push_node(Node::public_input("expected", "Expected Hash"))
        .push_node(Node::advanced(
            "digest",
            AdvancedOperator::Hash,
            &[("inputs", "2")],
        ))
        .push_node(Node::operation("matches", Operator::Eq))
        .push_node(Node::boolean_output("is-valid", "Is Valid"))
        .connect("preimage", "digest", "in0")
        .connect("salt", "digest", "in1")
        .connect("digest", "matches", "a")
        .connect("expected", "matches", "b")
        .connect("matches", "is-valid", "in");
    graph
}

fn patience_proof() -> Graph {
    let mut graph = Graph::new();
    graph
        .push_node(Node::private_input("start", "Start Time"))
        .push_node(Node::private_input("end", "End Time"))
        .push_node(Node::private_input("secret", "Secret"))
        .push_node(Node::public_input("min-wait", "Min Wait Time"))
        .push_node(Node::operation("duration", Operator::Subtract))
        .push_node(Node::operation("waited", Operator::Gt))
        .push_node(Node::advanced(
            "digest",
            AdvancedOperator::Hash,
            &[("inputs", "2")],
        ))
        .push_node(Node::boolean_output("is-valid", "Is Valid"))
        .push_node(Node::number_output("commitment", "Commitment"))
        .connect("end", "duration", "a")
        .connect("start", "duration", "b")
        .connect("duration", "waited", "a")
        .connect("min-wait", "waited", "b")
        .connect("waited", "is-valid", "in")
        .connect("secret", "digest", "in0")
        .connect("start", "digest", "in1")
        .connect("digest", "commitment", "in");
    graph
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compile;
    use crate::emit::is_placeholder;

    #[test]
    fn every_template_compiles_cleanly() {
        for template in TEMPLATES {
            let output = compile(&template.graph());
            assert!(
                output.diagnostics.is_empty(),
                "{}: {:?}",
                template.name,
                output.diagnostics
            );
            assert!(!is_placeholder(&output.code), "{}", template.name);
            assert!(output.metrics.constraints > 0, "{}", template.name);
        }
    }

    #[test]
    fn names_are_unique_and_findable() {
        let mut seen: Vec<&str> = names().collect();
        seen.sort_unstable();
        seen.dedup();
        assert_eq!(seen.len(), TEMPLATES.len());
        assert_eq!(
            find("merkle-membership").map(|template| template.title),
            Some("Merkle Tree Membership")
        );
        assert!(find("quadratic-voting").is_none());
    }

    #[test]
    fn merkle_template_exposes_root_publicly() {
        let output = compile(&find("merkle-membership").unwrap().graph());
        assert!(output
            .code
            .contains("component main {public [merkleRoot]} = CustomCircuit();"));
        assert!(output.code.contains("signal input pathElements[20];"));
    }
}
