//! # Document Diffing
//!
//! The registry charges per row: persisting a document means submitting the
//! minimal set of rows to add and revoke, not re-uploading the whole thing.
//! [`DidDocument::compare`] computes that set.
//!
//! The comparison is a structural set difference over the four row
//! collections (`verificationMethod`, `assertionMethod`, `keyAgreement`,
//! `service`), plus a changed `controller` when the field differs. Order is
//! ignored: two documents holding the same rows in a different order diff
//! to nothing. A document containing duplicate identical rows collapses to
//! one diff row per distinct value; identical rows are indistinguishable,
//! so there is nothing meaningful to preserve by counting them.
//!
//! `compare` never fails. Absence is always expressed as an empty delta.

use serde::{Deserialize, Serialize};

use super::document::{DidDocument, Service, VerificationMethod};

/// One side of a diff: rows to add or rows to revoke.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentDelta {
    pub verification_method: Vec<VerificationMethod>,
    pub assertion_method: Vec<String>,
    pub key_agreement: Vec<String>,
    pub service: Vec<Service>,
}

impl DocumentDelta {
    /// True when no rows are present in any collection.
    pub fn is_empty(&self) -> bool {
        self.verification_method.is_empty()
            && self.assertion_method.is_empty()
            && self.key_agreement.is_empty()
            && self.service.is_empty()
    }

    /// Total number of rows across all collections.
    pub fn row_count(&self) -> usize {
        self.verification_method.len()
            + self.assertion_method.len()
            + self.key_agreement.len()
            + self.service.len()
    }
}

/// The difference between two documents: what to add, what to revoke, and
/// a controller change if any.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DocumentDiff {
    /// The desired controller, present only when it differs.
    pub controller: Option<String>,
    /// Rows present in the desired document but not the current one.
    pub add: DocumentDelta,
    /// Rows present in the current document but not the desired one.
    pub remove: DocumentDelta,
}

impl DocumentDiff {
    /// True when the two documents hold the same rows and controller.
    pub fn is_empty(&self) -> bool {
        self.controller.is_none() && self.add.is_empty() && self.remove.is_empty()
    }
}

impl DidDocument {
    /// Diff this document against a desired state.
    ///
    /// Rows present in `other` but missing here land in `add`; rows present
    /// here but missing in `other` land in `remove`. Symmetric by
    /// construction: `a.compare(b).add == b.compare(a).remove`.
    pub fn compare(&self, other: &DidDocument) -> DocumentDiff {
        DocumentDiff {
            controller: (self.controller != other.controller)
                .then(|| other.controller.clone()),
            add: delta(self, other),
            remove: delta(other, self),
        }
    }
}

/// The rows `desired` has that `base` lacks.
fn delta(base: &DidDocument, desired: &DidDocument) -> DocumentDelta {
    DocumentDelta {
        verification_method: missing_from(&base.verification_method, &desired.verification_method),
        assertion_method: missing_from(&base.assertion_method, &desired.assertion_method),
        key_agreement: missing_from(&base.key_agreement, &desired.key_agreement),
        service: missing_from(&base.service, &desired.service),
    }
}

/// Entries of `candidates` absent from `existing`, by structural equality,
/// duplicates collapsed.
fn missing_from<T: PartialEq + Clone>(existing: &[T], candidates: &[T]) -> Vec<T> {
    let mut out: Vec<T> = Vec::new();
    for candidate in candidates {
        if !existing.contains(candidate) && !out.contains(candidate) {
            out.push(candidate.clone());
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Network;
    use crate::identity::did::ControllerKey;
    use crate::identity::document::ContextEndpoints;
    use crate::keyring::Keyring;

    fn controller() -> ControllerKey {
        ControllerKey::from_seed("diff test seed")
    }

    fn endpoints() -> ContextEndpoints {
        ContextEndpoints {
            database: "https://db/".into(),
            messaging: "https://msg/".into(),
            storage: None,
            notification: None,
        }
    }

    fn doc_with_contexts(names: &[&str]) -> DidDocument {
        let key = controller();
        let did = key.did(Some(Network::Testnet));
        let mut doc = DidDocument::new(&did, &key.public_key_hex()).unwrap();
        for name in names {
            doc.add_context(
                Some(Network::Testnet),
                name,
                &Keyring::new(format!("keyring for {name}")),
                &key,
                &endpoints(),
            )
            .unwrap();
        }
        doc
    }

    #[test]
    fn identical_documents_diff_to_nothing() {
        let doc = doc_with_contexts(&["App A"]);
        assert!(doc.compare(&doc.clone()).is_empty());
    }

    #[test]
    fn reordered_rows_produce_no_churn() {
        // Unordered-but-identical arrays must not be reported as changes.
        let doc = doc_with_contexts(&["App A", "App B"]);
        let mut shuffled = doc.clone();
        shuffled.verification_method.reverse();
        shuffled.service.reverse();
        shuffled.assertion_method.reverse();
        shuffled.key_agreement.reverse();

        assert!(doc.compare(&shuffled).is_empty());
    }

    #[test]
    fn added_context_appears_as_add_only() {
        let base = doc_with_contexts(&["App A"]);
        let extended = {
            let mut doc = base.clone();
            doc.add_context(
                Some(Network::Testnet),
                "App B",
                &Keyring::new("keyring for App B"),
                &controller(),
                &endpoints(),
            )
            .unwrap();
            doc
        };

        let diff = base.compare(&extended);
        assert!(diff.remove.is_empty());
        assert!(diff.controller.is_none());
        // 2 verification methods, 2 assertion refs, 1 key agreement,
        // 2 services.
        assert_eq!(diff.add.verification_method.len(), 2);
        assert_eq!(diff.add.assertion_method.len(), 2);
        assert_eq!(diff.add.key_agreement.len(), 1);
        assert_eq!(diff.add.service.len(), 2);
    }

    #[test]
    fn removed_context_appears_as_remove_only() {
        let base = doc_with_contexts(&["App A", "App B"]);
        let mut trimmed = base.clone();
        assert!(trimmed.remove_context("App B", Some(Network::Testnet)));

        let diff = base.compare(&trimmed);
        assert!(diff.add.is_empty());
        assert_eq!(diff.remove.verification_method.len(), 2);
        assert_eq!(diff.remove.service.len(), 2);
    }

    #[test]
    fn diff_symmetry_law() {
        // d1.compare(d2).add == d2.compare(d1).remove and vice versa, for
        // documents differing in both directions at once.
        let d1 = doc_with_contexts(&["App A", "App B"]);
        let d2 = {
            let mut doc = doc_with_contexts(&["App A"]);
            doc.add_context(
                Some(Network::Testnet),
                "App C",
                &Keyring::new("keyring for App C"),
                &controller(),
                &endpoints(),
            )
            .unwrap();
            doc
        };

        let forward = d1.compare(&d2);
        let backward = d2.compare(&d1);
        assert_eq!(forward.add, backward.remove);
        assert_eq!(forward.remove, backward.add);
        assert!(!forward.is_empty());
    }

    #[test]
    fn controller_change_is_reported() {
        let base = doc_with_contexts(&[]);
        let mut reassigned = base.clone();
        reassigned.controller = "did:vda:testnet:0x0000000000000000000000000000000000000002".into();

        let diff = base.compare(&reassigned);
        assert_eq!(diff.controller.as_deref(), Some(reassigned.controller.as_str()));
        assert!(diff.add.is_empty());
        assert!(diff.remove.is_empty());

        // And not reported when identical.
        assert!(base.compare(&base.clone()).controller.is_none());
    }

    #[test]
    fn duplicate_rows_collapse_to_one_diff_entry() {
        let base = doc_with_contexts(&[]);
        let mut doubled = base.clone();
        doubled.assertion_method.push("ref-x".into());
        doubled.assertion_method.push("ref-x".into());

        let diff = base.compare(&doubled);
        assert_eq!(diff.add.assertion_method, vec!["ref-x".to_string()]);
    }

    #[test]
    fn compare_never_reports_metadata_fields() {
        // versionId/updated churn is not row churn.
        let base = doc_with_contexts(&["App A"]);
        let mut touched = base.clone();
        touched.version_id += 5;
        touched.updated = "2030-01-01T00:00:00Z".into();
        assert!(base.compare(&touched).is_empty());
    }
}
