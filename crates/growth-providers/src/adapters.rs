// crates/growth-providers/src/adapters.rs
// ============================================================================
// Module: IR Adapters
// Description: `growth-ir`'s `SegmentAdapter`/`FeatureAdapter` trait objects,
// backed by the profile cache.
// Purpose: Wire the evaluator's generic adapter seam to this crate's actual
// backend-sourced data, without the evaluator ever depending on this crate.
// Dependencies: crate::profile, growth-ir
// ============================================================================

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::sync::Arc;

use async_trait::async_trait;
use growth_ir::IrError;
use growth_ir::IrValue;
use growth_ir::context::FeatureAdapter;
use growth_ir::context::SegmentAdapter;
use time::OffsetDateTime;

use crate::profile::ProfileCache;

// ============================================================================
// SECTION: ProfileBackedSegments
// ============================================================================

/// Answers `Segment` nodes from the cached profile snapshot.
pub struct ProfileBackedSegments {
    cache: Arc<ProfileCache>,
}

impl ProfileBackedSegments {
    /// Wraps a shared [`ProfileCache`].
    #[must_use]
    pub fn new(cache: Arc<ProfileCache>) -> Self {
        Self { cache }
    }
}

#[async_trait]
impl SegmentAdapter for ProfileBackedSegments {
    async fn is_member(&self, segment_id: &str, within: Option<i64>) -> Result<bool, IrError> {
        let snapshot = self.cache.snapshot();
        let Some(membership) = snapshot.segments.get(segment_id) else {
            return Ok(false);
        };
        match (within, membership.since) {
            (Some(window_seconds), Some(since)) => {
                let now = OffsetDateTime::now_utc();
                Ok((now - since) <= time::Duration::seconds(window_seconds.max(0)))
            }
            (Some(_), None) => Ok(false),
            (None, _) => Ok(true),
        }
    }
}

// ============================================================================
// SECTION: ProfileBackedFeatures
// ============================================================================

/// Answers `Feature` nodes from the cached profile snapshot.
pub struct ProfileBackedFeatures {
    cache: Arc<ProfileCache>,
}

impl ProfileBackedFeatures {
    /// Wraps a shared [`ProfileCache`].
    #[must_use]
    pub fn new(cache: Arc<ProfileCache>) -> Self {
        Self { cache }
    }
}

#[async_trait]
impl FeatureAdapter for ProfileBackedFeatures {
    async fn value(&self, feature_id: &str) -> Result<Option<IrValue>, IrError> {
        let snapshot = self.cache.snapshot();
        Ok(snapshot.features.get(feature_id).map(|grant| match &grant.value {
            None | Some(IrValue::Null) => IrValue::Bool(true),
            Some(other) => other.clone(),
        }))
    }
}
