//! Tests for banner value types.

use super::*;
use chrono::{DateTime, TimeZone, Utc};
use rstest::{fixture, rstest};
use serde_json::json;

fn at(hour: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 4, 10, hour, 0, 0)
        .single()
        .expect("valid timestamp")
}

#[fixture]
fn banner() -> Banner {
    Banner {
        id: BannerId::new(7).expect("positive"),
        feature_id: FeatureId::new(2).expect("positive"),
        tag_ids: TagSet::from_raw([1, 4]).expect("tags"),
        content: BannerContent::new(json!({"title": "x"})),
        is_active: true,
        to_delete: false,
        current_revision: 3,
        row_version: 5,
        created_at: at(8),
        updated_at: at(9),
    }
}

#[rstest]
#[case(0)]
#[case(-5)]
fn ids_reject_non_positive_values(#[case] raw: i64) {
    let err = FeatureId::new(raw).expect_err("non-positive rejected");
    assert_eq!(
        err,
        BannerValidationError::NonPositiveId {
            kind: "feature",
            value: raw
        }
    );
}

#[rstest]
fn ids_deserialise_through_validation() {
    let ok: TagId = serde_json::from_value(json!(3)).expect("positive id");
    assert_eq!(ok.get(), 3);
    assert!(serde_json::from_value::<BannerId>(json!(0)).is_err());
}

#[rstest]
fn tag_set_deduplicates_and_orders() {
    let tags = TagSet::from_raw([5, 2, 5, 1]).expect("valid tags");
    assert_eq!(tags.to_raw(), vec![1, 2, 5]);
    assert_eq!(tags.len(), 3);
}

#[rstest]
fn tag_set_rejects_empty_input() {
    let err = TagSet::from_raw(Vec::new()).expect_err("empty rejected");
    assert_eq!(err, BannerValidationError::EmptyTagSet);
}

#[rstest]
fn tag_set_rejects_invalid_members() {
    assert!(TagSet::from_raw([1, 0]).is_err());
}

#[rstest]
#[case(&[1, 2], &[2, 3], true)]
#[case(&[1, 2], &[3, 4], false)]
fn tag_set_intersection(#[case] left: &[i64], #[case] right: &[i64], #[case] expected: bool) {
    let left = TagSet::from_raw(left.iter().copied()).expect("tags");
    let right = TagSet::from_raw(right.iter().copied()).expect("tags");
    assert_eq!(left.intersects(&right), expected);
}

#[rstest]
fn content_round_trips_through_json_text() {
    let content = BannerContent::new(json!({"title": "x", "nested": {"n": 1}}));
    let raw = content.to_json_string().expect("encodes");
    let decoded = BannerContent::from_json_str(&raw).expect("decodes");
    assert_eq!(decoded, content);
}

#[rstest]
fn empty_patch_still_advances_revision(banner: Banner) {
    let patch = BannerPatch::default();
    assert!(patch.is_empty());

    let next = banner.with_patch(patch, at(10)).expect("revision available");

    assert_eq!(next.current_revision, 4);
    assert_eq!(next.row_version, 6);
    assert_eq!(next.updated_at, at(10));
    assert_eq!(next.created_at, banner.created_at);
    assert_eq!(next.content, banner.content);
    assert_eq!(next.tag_ids, banner.tag_ids);
}

#[rstest]
fn patch_replaces_only_present_fields(banner: Banner) {
    let patch = BannerPatch {
        tag_ids: Some(TagSet::from_raw([9]).expect("tags")),
        is_active: Some(false),
        ..BannerPatch::default()
    };

    let next = banner.with_patch(patch, at(10)).expect("revision available");

    assert_eq!(next.tag_ids.to_raw(), vec![9]);
    assert!(!next.is_active);
    assert_eq!(next.feature_id, banner.feature_id);
    assert_eq!(next.content, banner.content);
}

#[rstest]
fn patch_rejects_revision_overflow(mut banner: Banner) {
    banner.current_revision = i32::MAX as u32;
    let err = banner
        .with_patch(BannerPatch::default(), at(10))
        .expect_err("overflow rejected");
    assert!(matches!(err, BannerValidationError::RevisionOverflow { .. }));
}

#[rstest]
fn snapshot_matches_live_row(banner: Banner) {
    let snapshot = banner.snapshot();
    assert!(snapshot.matches(&banner));
    assert_eq!(snapshot.revision, 3);
    assert_eq!(snapshot.created_at, banner.updated_at);
}

#[rstest]
fn restore_moves_pointer_back_to_target(banner: Banner) {
    let target = BannerVersion {
        banner_id: banner.id,
        revision: 1,
        feature_id: FeatureId::new(5).expect("positive"),
        tag_ids: TagSet::from_raw([2]).expect("tags"),
        content: BannerContent::new(json!({"title": "old"})),
        created_at: at(1),
    };

    let restored = banner.restored_from(&target, at(11));

    assert!(target.matches(&restored));
    assert_eq!(restored.current_revision, 1);
    assert_eq!(restored.row_version, 6);
    assert_eq!(restored.updated_at, at(11));
    assert!(restored.is_active);
}

#[rstest]
#[case(3, 0, Ok(DeleteSelector::Feature(FeatureId::new(3).expect("positive"))))]
#[case(0, 8, Ok(DeleteSelector::Tag(TagId::new(8).expect("positive"))))]
#[case(0, 0, Err(BannerValidationError::AmbiguousSelector))]
#[case(3, 8, Err(BannerValidationError::AmbiguousSelector))]
fn delete_selector_requires_exactly_one(
    #[case] feature: i64,
    #[case] tag: i64,
    #[case] expected: Result<DeleteSelector, BannerValidationError>,
) {
    assert_eq!(DeleteSelector::from_raw(feature, tag), expected);
}

#[rstest]
fn delete_selector_rejects_negative_ids() {
    assert!(matches!(
        DeleteSelector::from_raw(-1, 0),
        Err(BannerValidationError::NonPositiveId { .. })
    ));
}

#[rstest]
fn filter_treats_zero_limit_as_unbounded() {
    let filter = BannerFilter::default().with_limit(0).with_offset(4);
    assert_eq!(filter.limit, None);
    assert_eq!(filter.offset, 4);
    assert_eq!(BannerFilter::default().with_limit(2).limit, Some(2));
}
