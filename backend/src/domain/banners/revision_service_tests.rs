//! Tests for the banner revision service.

use std::sync::Arc;

use chrono::{DateTime, Local, TimeZone, Utc};
use mockable::Clock;
use rstest::{fixture, rstest};
use serde_json::json;

use super::*;
use crate::domain::ErrorCode;
use crate::domain::banners::{BannerContent, TagId};
use crate::domain::ports::{
    BannerRepositoryError, MockBannerRepository, MockReferenceDataRepository,
    ReferenceDataRepositoryError,
};

struct FixtureClock {
    utc_now: DateTime<Utc>,
}

impl Clock for FixtureClock {
    fn local(&self) -> DateTime<Local> {
        self.utc_now.with_timezone(&Local)
    }

    fn utc(&self) -> DateTime<Utc> {
        self.utc_now
    }
}

fn now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 4, 10, 12, 0, 0)
        .single()
        .expect("valid timestamp")
}

fn feature(id: i64) -> FeatureId {
    FeatureId::new(id).expect("positive feature")
}

fn tags(ids: &[i64]) -> TagSet {
    TagSet::from_raw(ids.iter().copied()).expect("valid tags")
}

fn banner_id() -> BannerId {
    BannerId::new(11).expect("positive banner")
}

#[fixture]
fn live_banner() -> Banner {
    let created = Utc
        .with_ymd_and_hms(2024, 4, 9, 8, 0, 0)
        .single()
        .expect("valid timestamp");
    Banner {
        id: banner_id(),
        feature_id: feature(2),
        tag_ids: tags(&[1]),
        content: BannerContent::new(json!({"title": "x"})),
        is_active: true,
        to_delete: false,
        current_revision: 2,
        row_version: 4,
        created_at: created,
        updated_at: created,
    }
}

fn new_banner() -> NewBanner {
    NewBanner {
        feature_id: feature(2),
        tag_ids: tags(&[1, 2]),
        content: BannerContent::new(json!({"title": "x"})),
        is_active: true,
    }
}

fn references_exist() -> MockReferenceDataRepository {
    let mut reference = MockReferenceDataRepository::new();
    reference.expect_feature_exists().returning(|_| Ok(true));
    reference.expect_tags_exist().returning(|_| Ok(true));
    reference
}

fn service(
    repo: MockBannerRepository,
    reference: MockReferenceDataRepository,
) -> BannerRevisionService<MockBannerRepository, MockReferenceDataRepository> {
    BannerRevisionService::new(
        Arc::new(repo),
        Arc::new(reference),
        Arc::new(FixtureClock { utc_now: now() }),
    )
}

#[rstest]
#[tokio::test]
async fn create_banner_returns_repository_id() {
    let mut repo = MockBannerRepository::new();
    repo.expect_create()
        .withf(|banner, created_at| *banner == new_banner() && *created_at == now())
        .times(1)
        .return_once(|_, _| Ok(BannerId::new(5).expect("positive")));

    let id = service(repo, references_exist())
        .create_banner(new_banner())
        .await
        .expect("create succeeds");

    assert_eq!(id.get(), 5);
}

#[rstest]
#[tokio::test]
async fn create_banner_rejects_unknown_feature_before_writing() {
    let mut reference = MockReferenceDataRepository::new();
    reference.expect_feature_exists().returning(|_| Ok(false));
    reference.expect_tags_exist().times(0);
    let mut repo = MockBannerRepository::new();
    repo.expect_create().times(0);

    let err = service(repo, reference)
        .create_banner(new_banner())
        .await
        .expect_err("unknown feature");

    assert_eq!(err.code(), ErrorCode::InvalidReference);
}

#[rstest]
#[tokio::test]
async fn create_banner_rejects_unknown_tags_before_writing() {
    let mut reference = MockReferenceDataRepository::new();
    reference.expect_feature_exists().returning(|_| Ok(true));
    reference.expect_tags_exist().returning(|_| Ok(false));
    let mut repo = MockBannerRepository::new();
    repo.expect_create().times(0);

    let err = service(repo, reference)
        .create_banner(new_banner())
        .await
        .expect_err("unknown tags");

    assert_eq!(err.code(), ErrorCode::InvalidReference);
}

#[rstest]
#[tokio::test]
async fn create_banner_maps_duplicate_claim_to_conflict() {
    let mut repo = MockBannerRepository::new();
    repo.expect_create()
        .return_once(|_, _| Err(BannerRepositoryError::duplicate_claim(2_i64)));

    let err = service(repo, references_exist())
        .create_banner(new_banner())
        .await
        .expect_err("duplicate claim");

    assert_eq!(err.code(), ErrorCode::Conflict);
}

#[rstest]
#[tokio::test]
async fn reference_outage_is_not_reported_as_missing() {
    let mut reference = MockReferenceDataRepository::new();
    reference
        .expect_feature_exists()
        .returning(|_| Err(ReferenceDataRepositoryError::connection("refused")));
    let mut repo = MockBannerRepository::new();
    repo.expect_create().times(0);

    let err = service(repo, reference)
        .create_banner(new_banner())
        .await
        .expect_err("outage");

    assert_eq!(err.code(), ErrorCode::StorageFailure);
}

#[rstest]
#[tokio::test]
async fn change_banner_commits_merged_state_against_read_revision(live_banner: Banner) {
    let base = live_banner.clone();
    let mut repo = MockBannerRepository::new();
    repo.expect_find_by_id()
        .return_once(move |_| Ok(Some(base)));
    repo.expect_commit_revision()
        .withf(move |commit| {
            commit.expected_revision == 2
                && commit.expected_row_version == 4
                && commit.banner.current_revision == 3
                && commit.banner.row_version == 5
                && commit.banner.content == BannerContent::new(json!({"title": "y"}))
                && commit.banner.tag_ids == live_banner.tag_ids
                && commit.banner.feature_id == live_banner.feature_id
                && commit.banner.updated_at == now()
                && commit.banner.created_at == live_banner.created_at
        })
        .times(1)
        .return_once(|_| Ok(()));
    let mut reference = MockReferenceDataRepository::new();
    reference.expect_feature_exists().times(0);
    reference.expect_tags_exist().times(0);

    let patch = BannerPatch {
        content: Some(BannerContent::new(json!({"title": "y"}))),
        ..BannerPatch::default()
    };
    service(repo, reference)
        .change_banner(banner_id(), patch)
        .await
        .expect("change succeeds");
}

#[rstest]
#[tokio::test]
async fn change_banner_validates_patched_references(live_banner: Banner) {
    let mut repo = MockBannerRepository::new();
    repo.expect_find_by_id()
        .return_once(move |_| Ok(Some(live_banner)));
    repo.expect_commit_revision().times(0);
    let mut reference = MockReferenceDataRepository::new();
    reference.expect_tags_exist().times(1).returning(|_| Ok(false));

    let patch = BannerPatch {
        tag_ids: Some(tags(&[42])),
        ..BannerPatch::default()
    };
    let err = service(repo, reference)
        .change_banner(banner_id(), patch)
        .await
        .expect_err("unknown tag");

    assert_eq!(err.code(), ErrorCode::InvalidReference);
}

#[rstest]
#[case::missing(None)]
#[case::tombstoned(Some(true))]
#[tokio::test]
async fn change_banner_requires_live_row(#[case] tombstone: Option<bool>, live_banner: Banner) {
    let found = tombstone.map(|to_delete| Banner {
        to_delete,
        ..live_banner
    });
    let mut repo = MockBannerRepository::new();
    repo.expect_find_by_id().return_once(move |_| Ok(found));
    repo.expect_commit_revision().times(0);

    let err = service(repo, references_exist())
        .change_banner(banner_id(), BannerPatch::default())
        .await
        .expect_err("not live");

    assert_eq!(err.code(), ErrorCode::NotFound);
}

#[rstest]
#[tokio::test]
async fn change_banner_surfaces_concurrent_edit_as_conflict(live_banner: Banner) {
    let mut repo = MockBannerRepository::new();
    repo.expect_find_by_id()
        .return_once(move |_| Ok(Some(live_banner)));
    repo.expect_commit_revision()
        .return_once(|_| Err(BannerRepositoryError::revision_mismatch(2_u32, 3_u32)));

    let err = service(repo, references_exist())
        .change_banner(banner_id(), BannerPatch::default())
        .await
        .expect_err("lost update prevented");

    assert_eq!(err.code(), ErrorCode::Conflict);
    assert!(err.details().is_some());
}

#[rstest]
#[case(true, None)]
#[case(false, Some(ErrorCode::NotFound))]
#[tokio::test]
async fn delete_banner_reports_unmatched_rows(
    #[case] marked: bool,
    #[case] expected: Option<ErrorCode>,
) {
    let mut repo = MockBannerRepository::new();
    repo.expect_mark_deleted()
        .withf(|id, at| *id == banner_id() && *at == now())
        .return_once(move |_, _| Ok(marked));

    let result = service(repo, references_exist())
        .delete_banner(banner_id())
        .await;

    assert_eq!(result.err().map(|err| err.code()), expected);
}

#[rstest]
#[tokio::test]
async fn delete_banners_validates_tag_selector() {
    let mut reference = MockReferenceDataRepository::new();
    reference
        .expect_tags_exist()
        .withf(|tags| tags.to_raw() == vec![8])
        .returning(|_| Ok(false));
    let mut repo = MockBannerRepository::new();
    repo.expect_mark_deleted_by().times(0);

    let selector = DeleteSelector::Tag(TagId::new(8).expect("positive"));
    let err = service(repo, reference)
        .delete_banners(selector)
        .await
        .expect_err("unknown tag");

    assert_eq!(err.code(), ErrorCode::InvalidReference);
}

#[rstest]
#[tokio::test]
async fn delete_banners_returns_marked_count() {
    let mut repo = MockBannerRepository::new();
    repo.expect_mark_deleted_by()
        .withf(|selector, _| *selector == DeleteSelector::Feature(feature(2)))
        .return_once(|_, _| Ok(3));

    let marked = service(repo, references_exist())
        .delete_banners(DeleteSelector::Feature(feature(2)))
        .await
        .expect("bulk delete succeeds");

    assert_eq!(marked, 3);
}

#[rstest]
#[tokio::test]
async fn list_versions_without_rows_is_not_found() {
    let mut repo = MockBannerRepository::new();
    repo.expect_versions().return_once(|_| Ok(Vec::new()));

    let err = service(repo, references_exist())
        .list_versions(banner_id())
        .await
        .expect_err("no versions");

    assert_eq!(err.code(), ErrorCode::NotFound);
}

#[rstest]
#[tokio::test]
async fn revert_banner_requires_stored_revision(live_banner: Banner) {
    let mut repo = MockBannerRepository::new();
    repo.expect_find_by_id()
        .return_once(move |_| Ok(Some(live_banner)));
    repo.expect_version().return_once(|_, _| Ok(None));
    repo.expect_revert().times(0);

    let err = service(repo, references_exist())
        .revert_banner(banner_id(), 7)
        .await
        .expect_err("missing revision");

    assert_eq!(err.code(), ErrorCode::NotFound);
}

#[rstest]
#[tokio::test]
async fn revert_banner_restores_snapshot_at_target_revision(live_banner: Banner) {
    let target = BannerVersion {
        banner_id: banner_id(),
        revision: 1,
        feature_id: feature(3),
        tag_ids: tags(&[4]),
        content: BannerContent::new(json!({"title": "first"})),
        created_at: live_banner.created_at,
    };
    let expected_target = target.clone();
    let mut repo = MockBannerRepository::new();
    repo.expect_find_by_id()
        .return_once(move |_| Ok(Some(live_banner)));
    repo.expect_version()
        .withf(|id, revision| *id == banner_id() && *revision == 1)
        .return_once(move |_, _| Ok(Some(target)));
    repo.expect_revert()
        .withf(move |commit| {
            commit.expected_revision == 2
                && commit.expected_row_version == 4
                && commit.banner.row_version == 5
                && expected_target.matches(&commit.banner)
                && commit.banner.updated_at == now()
        })
        .times(1)
        .return_once(|_| Ok(()));

    service(repo, references_exist())
        .revert_banner(banner_id(), 1)
        .await
        .expect("revert succeeds");
}
