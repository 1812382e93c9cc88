//! Pure scoring helpers: great-circle distance, age, interest overlap.

use std::collections::HashSet;

use chrono::{Datelike, NaiveDate};

const EARTH_RADIUS_KM: f64 = 6371.0;

/// Haversine great-circle distance in kilometers. Callers round; this
/// function does not.
pub fn distance_km(lat1: f64, lon1: f64, lat2: f64, lon2: f64) -> f64 {
    let d_lat = (lat2 - lat1).to_radians();
    let d_lon = (lon2 - lon1).to_radians();

    let a = (d_lat / 2.0).sin().powi(2)
        + lat1.to_radians().cos() * lat2.to_radians().cos() * (d_lon / 2.0).sin().powi(2);
    let c = 2.0 * a.sqrt().atan2((1.0 - a).sqrt());

    EARTH_RADIUS_KM * c
}

/// Age in whole years, one less if the birthday has not occurred yet this
/// year.
pub fn age(birthday: NaiveDate, today: NaiveDate) -> i32 {
    let mut years = today.year() - birthday.year();
    if (today.month(), today.day()) < (birthday.month(), birthday.day()) {
        years -= 1;
    }
    years
}

/// Size of the case-insensitive, whitespace-trimmed intersection of two
/// comma-delimited tag lists. Absent or empty lists are empty sets.
pub fn tag_overlap(a: Option<&str>, b: Option<&str>) -> usize {
    let set_a = tag_set(a);
    let set_b = tag_set(b);
    set_a.intersection(&set_b).count()
}

fn tag_set(raw: Option<&str>) -> HashSet<String> {
    raw.unwrap_or_default()
        .split(',')
        .map(|tag| tag.trim().to_lowercase())
        .filter(|tag| !tag.is_empty())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    const PARIS: (f64, f64) = (48.8566, 2.3522);
    const LYON: (f64, f64) = (45.7640, 4.8357);

    #[test]
    fn distance_is_symmetric() {
        let ab = distance_km(PARIS.0, PARIS.1, LYON.0, LYON.1);
        let ba = distance_km(LYON.0, LYON.1, PARIS.0, PARIS.1);
        assert!((ab - ba).abs() < 1e-9);
    }

    #[test]
    fn distance_to_self_is_zero() {
        assert_eq!(distance_km(PARIS.0, PARIS.1, PARIS.0, PARIS.1), 0.0);
    }

    #[test]
    fn paris_lyon_is_plausible() {
        let km = distance_km(PARIS.0, PARIS.1, LYON.0, LYON.1);
        // Straight-line distance is just under 400 km.
        assert!((380.0..=405.0).contains(&km), "got {km}");
    }

    #[test]
    fn age_before_and_after_birthday() {
        let birthday = NaiveDate::from_ymd_opt(1990, 6, 15).unwrap();

        let day_before = NaiveDate::from_ymd_opt(2024, 6, 14).unwrap();
        assert_eq!(age(birthday, day_before), 33);

        let on_the_day = NaiveDate::from_ymd_opt(2024, 6, 15).unwrap();
        assert_eq!(age(birthday, on_the_day), 34);

        let day_after = NaiveDate::from_ymd_opt(2024, 6, 16).unwrap();
        assert_eq!(age(birthday, day_after), 34);
    }

    #[test]
    fn tag_overlap_trims_and_ignores_case() {
        assert_eq!(
            tag_overlap(Some("Hiking, cooking , Jazz"), Some("jazz,HIKING,cinema")),
            2
        );
    }

    #[test]
    fn tag_overlap_handles_missing_lists() {
        assert_eq!(tag_overlap(None, Some("jazz")), 0);
        assert_eq!(tag_overlap(Some(""), Some("jazz")), 0);
        assert_eq!(tag_overlap(None, None), 0);
    }
}
