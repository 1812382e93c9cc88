//! One-directional orientation filtering for candidate discovery.

use crate::models::{Gender, SexualPreference};

/// Whether a candidate is visible to a viewer with the given gender and
/// preference. A viewer with no parseable preference sees everyone; the
/// check is intentionally one-directional and does not re-evaluate the
/// viewer from the candidate's perspective.
pub fn passes_orientation(
    viewer_gender: Gender,
    viewer_pref: Option<SexualPreference>,
    candidate_gender: Gender,
    candidate_pref: SexualPreference,
) -> bool {
    use SexualPreference::{Bisexual, Heterosexual, Homosexual};

    match viewer_pref {
        Some(Heterosexual) => {
            candidate_gender == viewer_gender.opposite()
                && matches!(candidate_pref, Heterosexual | Bisexual)
        }
        Some(Homosexual) => {
            candidate_gender == viewer_gender && matches!(candidate_pref, Homosexual | Bisexual)
        }
        Some(Bisexual) => {
            (candidate_gender == viewer_gender && matches!(candidate_pref, Homosexual | Bisexual))
                || (candidate_gender == viewer_gender.opposite()
                    && matches!(candidate_pref, Heterosexual | Bisexual))
        }
        None => true,
    }
}
