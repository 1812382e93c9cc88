//! Candidate discovery: orientation-aware filtering, enrichment and the
//! multi-key ranking used by the browse endpoint.

use std::collections::HashSet;

use chrono::{NaiveDate, Utc};
use diesel::prelude::*;
use uuid::Uuid;

use amora_shared::clients::db::{get_conn, DbPool};
use amora_shared::errors::{AppError, AppResult, ErrorCode};

use crate::geo;
use crate::models::{
    Block, CandidateProfile, CandidateRow, Gender, Like, SexualPreference, ViewerProfile,
};
use crate::orientation::passes_orientation;
use crate::schema::{blocks, likes, locations, profiles, users};

/// Everything about the viewer that filtering and enrichment need, fetched
/// once per browse request.
#[derive(Debug, Clone)]
pub struct ViewerContext {
    pub gender: Gender,
    pub preference: Option<SexualPreference>,
    pub interests: Option<String>,
    pub location: Option<(f64, f64)>,
    /// Candidates the viewer already liked (flagged, not excluded).
    pub liked: HashSet<Uuid>,
    /// Candidates excluded outright: blocked in either direction, or an
    /// unliked pair in either direction.
    pub excluded: HashSet<Uuid>,
}

/// Filter and enrich raw candidate rows for one viewer.
pub fn enrich(viewer: &ViewerContext, rows: Vec<CandidateRow>, today: NaiveDate) -> Vec<CandidateProfile> {
    rows.into_iter()
        .filter_map(|row| {
            if viewer.excluded.contains(&row.user_id) {
                return None;
            }

            let candidate_gender = row.gender.parse::<Gender>().ok();
            let candidate_pref = row.sexual_preference.parse::<SexualPreference>().ok();
            let visible = match (viewer.preference, candidate_gender, candidate_pref) {
                // A viewer without a parseable preference sees everyone.
                (None, _, _) => true,
                (Some(_), Some(g), Some(p)) => {
                    passes_orientation(viewer.gender, viewer.preference, g, p)
                }
                _ => false,
            };
            if !visible {
                return None;
            }

            let distance_km = match (viewer.location, row.latitude, row.longitude) {
                (Some((lat, lon)), Some(cand_lat), Some(cand_lon)) => {
                    Some(geo::distance_km(lat, lon, cand_lat, cand_lon).round() as i64)
                }
                _ => None,
            };

            Some(CandidateProfile {
                id: row.user_id,
                username: row.username,
                distance_km,
                age: row.birthday.map(|b| geo::age(b, today)),
                common_tags: geo::tag_overlap(
                    viewer.interests.as_deref(),
                    row.interests.as_deref(),
                ),
                fame_rating: row.fame_rating,
                already_liked: viewer.liked.contains(&row.user_id),
            })
        })
        .collect()
}

/// Stable sort by (distance asc, common tags desc, fame rating desc).
/// Candidates without a known distance sort after every located candidate.
pub fn sort_candidates(candidates: &mut [CandidateProfile]) {
    candidates.sort_by_key(|c| {
        (
            c.distance_km.unwrap_or(i64::MAX),
            std::cmp::Reverse(c.common_tags),
            std::cmp::Reverse(c.fame_rating),
        )
    });
}

/// Fetch, filter, enrich and rank candidates for the viewer.
pub fn list_candidates(pool: &DbPool, viewer_id: Uuid) -> AppResult<Vec<CandidateProfile>> {
    let mut conn = get_conn(pool)?;

    let viewer: ViewerProfile = profiles::table
        .filter(profiles::user_id.eq(viewer_id))
        .select((
            profiles::gender,
            profiles::sexual_preference,
            profiles::interests,
        ))
        .first(&mut conn)
        .optional()?
        .ok_or_else(|| AppError::new(ErrorCode::ProfileNotFound, "profile not found"))?;

    let location: Option<(f64, f64)> = locations::table
        .filter(locations::user_id.eq(viewer_id))
        .select((locations::latitude, locations::longitude))
        .first(&mut conn)
        .optional()?;

    // Like pairs involving the viewer: remember who they liked, and exclude
    // any pair flagged unliked in either direction.
    let like_rows: Vec<Like> = likes::table
        .filter(likes::liker_id.eq(viewer_id).or(likes::liked_id.eq(viewer_id)))
        .load(&mut conn)?;

    let mut liked = HashSet::new();
    let mut excluded = HashSet::new();
    for row in like_rows {
        let other = if row.liker_id == viewer_id {
            row.liked_id
        } else {
            row.liker_id
        };
        if row.unliked {
            excluded.insert(other);
        } else if row.liker_id == viewer_id {
            liked.insert(other);
        }
    }

    // Blocks suppress in either direction.
    let block_rows: Vec<Block> = blocks::table
        .filter(blocks::blocker_id.eq(viewer_id).or(blocks::blocked_id.eq(viewer_id)))
        .load(&mut conn)?;
    for row in block_rows {
        excluded.insert(if row.blocker_id == viewer_id {
            row.blocked_id
        } else {
            row.blocker_id
        });
    }

    let rows: Vec<CandidateRow> = users::table
        .inner_join(profiles::table)
        .left_join(locations::table)
        .filter(users::id.ne(viewer_id))
        .select((
            users::id,
            users::username,
            profiles::gender,
            profiles::sexual_preference,
            profiles::birthday,
            profiles::interests,
            profiles::fame_rating,
            locations::latitude.nullable(),
            locations::longitude.nullable(),
        ))
        .load(&mut conn)?;

    let context = ViewerContext {
        gender: viewer.gender.parse().map_err(AppError::Validation)?,
        preference: viewer.sexual_preference.parse().ok(),
        interests: viewer.interests,
        location,
        liked,
        excluded,
    };

    let mut candidates = enrich(&context, rows, Utc::now().date_naive());
    sort_candidates(&mut candidates);

    tracing::debug!(viewer = %viewer_id, count = candidates.len(), "candidates ranked");
    Ok(candidates)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn viewer() -> ViewerContext {
        ViewerContext {
            gender: Gender::Male,
            preference: Some(SexualPreference::Heterosexual),
            interests: Some("hiking,jazz".into()),
            location: Some((48.8566, 2.3522)),
            liked: HashSet::new(),
            excluded: HashSet::new(),
        }
    }

    fn row(username: &str, gender: &str, pref: &str) -> CandidateRow {
        CandidateRow {
            user_id: Uuid::new_v4(),
            username: username.into(),
            gender: gender.into(),
            sexual_preference: pref.into(),
            birthday: NaiveDate::from_ymd_opt(1995, 3, 10),
            interests: Some("jazz".into()),
            fame_rating: 10,
            latitude: Some(48.85),
            longitude: Some(2.35),
        }
    }

    fn candidate(
        distance_km: Option<i64>,
        common_tags: usize,
        fame_rating: i32,
        username: &str,
    ) -> CandidateProfile {
        CandidateProfile {
            id: Uuid::new_v4(),
            username: username.into(),
            distance_km,
            age: Some(29),
            common_tags,
            fame_rating,
            already_liked: false,
        }
    }

    #[test]
    fn ranking_follows_distance_tags_fame() {
        // Distances [5, 5, 2] with tag overlaps [1, 3, 0]: the distance-2
        // entry leads, then the distance-5 pair ordered by overlap.
        let mut list = vec![
            candidate(Some(5), 1, 0, "a"),
            candidate(Some(5), 3, 0, "b"),
            candidate(Some(2), 0, 0, "c"),
        ];
        sort_candidates(&mut list);
        let order: Vec<&str> = list.iter().map(|c| c.username.as_str()).collect();
        assert_eq!(order, ["c", "b", "a"]);
    }

    #[test]
    fn equal_keys_keep_insertion_order() {
        let mut list = vec![
            candidate(Some(5), 2, 7, "first"),
            candidate(Some(5), 2, 7, "second"),
        ];
        sort_candidates(&mut list);
        assert_eq!(list[0].username, "first");
        assert_eq!(list[1].username, "second");
    }

    #[test]
    fn unknown_distance_sorts_last() {
        let mut list = vec![
            candidate(None, 9, 50, "unlocated"),
            candidate(Some(900), 0, 0, "far"),
        ];
        sort_candidates(&mut list);
        assert_eq!(list[0].username, "far");
        assert_eq!(list[1].username, "unlocated");
    }

    #[test]
    fn fame_breaks_tag_ties() {
        let mut list = vec![
            candidate(Some(3), 1, 4, "modest"),
            candidate(Some(3), 1, 40, "famous"),
        ];
        sort_candidates(&mut list);
        assert_eq!(list[0].username, "famous");
    }

    #[test]
    fn enrich_applies_orientation_filter() {
        let rows = vec![
            row("passes", "female", "bisexual"),
            row("wrong_gender", "male", "bisexual"),
            row("wrong_pref", "female", "homosexual"),
        ];
        let out = enrich(&viewer(), rows, NaiveDate::from_ymd_opt(2024, 7, 1).unwrap());
        let names: Vec<&str> = out.iter().map(|c| c.username.as_str()).collect();
        assert_eq!(names, ["passes"]);
    }

    #[test]
    fn enrich_excludes_blocked_and_flags_liked() {
        let blocked = row("blocked", "female", "heterosexual");
        let liked = row("liked", "female", "heterosexual");

        let mut ctx = viewer();
        ctx.excluded.insert(blocked.user_id);
        ctx.liked.insert(liked.user_id);

        let out = enrich(
            &ctx,
            vec![blocked, liked],
            NaiveDate::from_ymd_opt(2024, 7, 1).unwrap(),
        );
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].username, "liked");
        assert!(out[0].already_liked);
    }

    #[test]
    fn enrich_computes_distance_and_age() {
        let out = enrich(
            &viewer(),
            vec![row("near", "female", "heterosexual")],
            NaiveDate::from_ymd_opt(2024, 7, 1).unwrap(),
        );
        assert_eq!(out.len(), 1);
        // Same neighborhood: rounds to 0 or 1 km.
        assert!(out[0].distance_km.unwrap() <= 1);
        assert_eq!(out[0].age, Some(29));
        assert_eq!(out[0].common_tags, 1);
    }

    #[test]
    fn enrich_without_viewer_location_yields_unknown_distance() {
        let mut ctx = viewer();
        ctx.location = None;
        let out = enrich(
            &ctx,
            vec![row("anywhere", "female", "heterosexual")],
            NaiveDate::from_ymd_opt(2024, 7, 1).unwrap(),
        );
        assert_eq!(out[0].distance_km, None);
    }
}
