//! Blob validation: structural checks and signature verification.

use std::collections::HashSet;

use crate::blob::Blob;
use crate::error::ValidationError;

/// Validate a blob's structure and signature.
pub fn validate_blob(blob: &Blob) -> Result<(), ValidationError> {
    validate_blob_structure(blob)?;
    blob.verify().map_err(ValidationError::from)
}

/// Validate a blob's structure without checking the signature.
///
/// This performs:
/// - Genesis timestamp is 0
/// - Changes declare dependencies, a depth of at least 1 and a matching op count
/// - Refs list each head once
/// - Comments target at least one version
/// - Capabilities do not delegate to their issuer
pub fn validate_blob_structure(blob: &Blob) -> Result<(), ValidationError> {
    match blob {
        Blob::Genesis(genesis) => {
            if genesis.header.ts != 0 {
                return Err(ValidationError::GenesisTimestamp(genesis.header.ts));
            }
        }
        Blob::Change(change) => {
            if change.deps.is_empty() {
                return Err(ValidationError::MissingDependencies);
            }
            if change.depth < 1 {
                return Err(ValidationError::InvalidDepth(change.depth));
            }
            if change.op_count != change.ops.len() as u64 {
                return Err(ValidationError::OpCountMismatch {
                    declared: change.op_count,
                    actual: change.ops.len(),
                });
            }
        }
        Blob::Ref(r) => {
            let mut seen = HashSet::with_capacity(r.heads.len());
            for head in &r.heads {
                if !seen.insert(head) {
                    return Err(ValidationError::DuplicateReference(*head));
                }
            }
        }
        Blob::Comment(comment) => {
            if comment.version.is_empty() {
                return Err(ValidationError::MissingVersion);
            }
        }
        Blob::Profile(profile) => {
            if profile.alias.is_some()
                && (profile.name.is_some() || profile.avatar.is_some() || profile.description.is_some())
            {
                return Err(ValidationError::StructuralError(
                    "alias profile carries other fields".into(),
                ));
            }
        }
        Blob::Capability(cap) => {
            if cap.delegate == cap.header.signer {
                return Err(ValidationError::SelfDelegation);
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::blob::{BlobHeader, DocumentChange, GenesisChange, Role};
    use crate::builder::{CapabilityBuilder, ChangeBuilder, CommentBuilder, GenesisBuilder, RefBuilder};
    use crate::crypto::Keypair;
    use crate::types::{Codec, ContentId};

    fn keypair() -> Keypair {
        Keypair::from_seed(&[3u8; 32])
    }

    fn cid(tag: &[u8]) -> ContentId {
        ContentId::compute(Codec::DagCbor, tag)
    }

    #[test]
    fn test_valid_genesis() {
        let blob = GenesisBuilder::new().sign(&keypair()).unwrap();
        validate_blob(&blob).unwrap();
    }

    #[test]
    fn test_genesis_timestamp_checked() {
        let blob = Blob::Genesis(GenesisChange {
            header: BlobHeader::unsigned(keypair().principal(), 42),
        })
        .sign(&keypair())
        .unwrap();
        assert!(matches!(
            validate_blob(&blob),
            Err(ValidationError::GenesisTimestamp(42))
        ));
    }

    #[test]
    fn test_change_rules() {
        let g = cid(b"g");
        let no_deps = ChangeBuilder::new(g, vec![], 1).sign(&keypair()).unwrap();
        assert!(matches!(
            validate_blob_structure(&no_deps),
            Err(ValidationError::MissingDependencies)
        ));

        let zero_depth = ChangeBuilder::new(g, vec![g], 0).sign(&keypair()).unwrap();
        assert!(matches!(
            validate_blob_structure(&zero_depth),
            Err(ValidationError::InvalidDepth(0))
        ));

        let miscounted = Blob::Change(DocumentChange {
            header: BlobHeader::unsigned(keypair().principal(), 1),
            genesis: g,
            deps: vec![g],
            depth: 1,
            ops: vec![],
            op_count: 2,
        });
        assert!(matches!(
            validate_blob_structure(&miscounted),
            Err(ValidationError::OpCountMismatch { declared: 2, actual: 0 })
        ));
    }

    #[test]
    fn test_duplicate_heads_rejected() {
        let blob = RefBuilder::new(cid(b"g"))
            .heads(vec![cid(b"h"), cid(b"h")])
            .sign(&keypair())
            .unwrap();
        assert!(matches!(
            validate_blob_structure(&blob),
            Err(ValidationError::DuplicateReference(_))
        ));
    }

    #[test]
    fn test_comment_needs_version() {
        let blob = CommentBuilder::new(keypair().principal(), "", vec![])
            .sign(&keypair())
            .unwrap();
        assert!(matches!(
            validate_blob_structure(&blob),
            Err(ValidationError::MissingVersion)
        ));
    }

    #[test]
    fn test_self_delegation_rejected() {
        let blob = CapabilityBuilder::new(keypair().principal(), Role::Agent)
            .sign(&keypair())
            .unwrap();
        assert!(matches!(
            validate_blob_structure(&blob),
            Err(ValidationError::SelfDelegation)
        ));
    }

    #[test]
    fn test_bad_signature_reported() {
        let blob = GenesisBuilder::new().sign(&keypair()).unwrap();
        let Blob::Genesis(mut g) = blob else {
            panic!("expected genesis")
        };
        g.header.sig.0[0] ^= 1;
        assert!(matches!(
            validate_blob(&Blob::Genesis(g)),
            Err(ValidationError::SignatureFailed)
        ));
    }
}
