//! Diesel table definitions for the PostgreSQL schema.
//!
//! These definitions must match the migrations under `backend/migrations`
//! exactly. `diesel print-schema` regenerates them from a live database.

diesel::table! {
    /// Feature reference data. Owned elsewhere; read-only here.
    features (id) {
        id -> Int8,
        name -> Nullable<Text>,
    }
}

diesel::table! {
    /// Tag reference data. Owned elsewhere; read-only here.
    tags (id) {
        id -> Int8,
        name -> Nullable<Text>,
    }
}

diesel::table! {
    /// Live banner rows. `current_revision` points into `banner_versions`.
    banners (id) {
        id -> Int8,
        feature_id -> Int8,
        content -> Jsonb,
        is_active -> Bool,
        /// Tombstone awaiting the retention sweeper.
        to_delete -> Bool,
        current_revision -> Int4,
        /// Write stamp for compare-and-swap; never rewound.
        row_version -> Int8,
        created_at -> Timestamptz,
        updated_at -> Timestamptz,
    }
}

diesel::table! {
    /// Tag links of the live revision.
    banner_tags (banner_id, tag_id) {
        banner_id -> Int8,
        tag_id -> Int8,
    }
}

diesel::table! {
    /// Append-only whole snapshots, one per (banner, revision).
    banner_versions (banner_id, revision) {
        banner_id -> Int8,
        revision -> Int4,
        feature_id -> Int8,
        tag_ids -> Array<Int8>,
        content -> Jsonb,
        created_at -> Timestamptz,
    }
}

diesel::joinable!(banners -> features (feature_id));
diesel::joinable!(banner_tags -> banners (banner_id));
diesel::joinable!(banner_tags -> tags (tag_id));
diesel::joinable!(banner_versions -> banners (banner_id));

diesel::allow_tables_to_appear_in_same_query!(
    features,
    tags,
    banners,
    banner_tags,
    banner_versions,
);
