use crate::models::ChatSession;

// -- Signal weights --
// Interests dominate; age, location and gender are coarse binary signals.
// No partial credit for near-misses.
const W_INTERESTS: f64 = 0.4;
const W_AGE: f64 = 0.2;
const W_LOCATION: f64 = 0.2;
const W_GENDER: f64 = 0.2;

/// Pairs scoring below this are never committed; the caller gets
/// "no match found" instead of a low-quality pairing.
pub const MIN_MATCH_SCORE: f64 = 0.3;

/// The scoring-relevant slice of a session.
#[derive(Debug, Clone, PartialEq)]
pub struct CandidateProfile {
    pub interests: Vec<String>,
    pub age_min: Option<i32>,
    pub age_max: Option<i32>,
    pub location: Option<String>,
    pub gender: Option<String>,
}

impl From<&ChatSession> for CandidateProfile {
    fn from(session: &ChatSession) -> Self {
        Self {
            interests: session.interests.clone(),
            age_min: session.age_min,
            age_max: session.age_max,
            location: session.location.clone(),
            gender: session.gender.clone(),
        }
    }
}

/// Interests present in both profiles, in `a`'s order.
pub fn shared_interests(a: &CandidateProfile, b: &CandidateProfile) -> Vec<String> {
    a.interests
        .iter()
        .filter(|interest| b.interests.contains(interest))
        .cloned()
        .collect()
}

/// Compatibility score in [0, 1].
///
/// Weighted sum: interest-overlap ratio (shared / larger set), binary
/// age-range intersection, binary location equality, binary gender equality.
/// Signals whose inputs are absent on either side contribute zero.
pub fn score(a: &CandidateProfile, b: &CandidateProfile) -> f64 {
    let mut total = 0.0;

    let denom = a.interests.len().max(b.interests.len());
    if denom > 0 {
        let shared = shared_interests(a, b).len();
        total += W_INTERESTS * (shared as f64 / denom as f64);
    }

    if let (Some(a_min), Some(a_max), Some(b_min), Some(b_max)) =
        (a.age_min, a.age_max, b.age_min, b.age_max)
    {
        if a_min <= b_max && b_min <= a_max {
            total += W_AGE;
        }
    }

    if let (Some(a_loc), Some(b_loc)) = (&a.location, &b.location) {
        if a_loc == b_loc {
            total += W_LOCATION;
        }
    }

    if let (Some(a_gender), Some(b_gender)) = (&a.gender, &b.gender) {
        if a_gender == b_gender {
            total += W_GENDER;
        }
    }

    total.clamp(0.0, 1.0)
}

/// Pick the best candidate at or above the commit threshold.
///
/// Returns the candidate's index and its score. Ties keep the earliest
/// candidate, so pool ordering (oldest waiting first) acts as the
/// tie-breaker.
pub fn select_best(current: &CandidateProfile, candidates: &[CandidateProfile]) -> Option<(usize, f64)> {
    let mut best: Option<(usize, f64)> = None;

    for (i, candidate) in candidates.iter().enumerate() {
        let s = score(current, candidate);
        if s < MIN_MATCH_SCORE {
            continue;
        }
        match best {
            None => best = Some((i, s)),
            Some((_, best_score)) if s > best_score => best = Some((i, s)),
            _ => {}
        }
    }

    best
}

#[cfg(test)]
mod tests {
    use super::*;

    fn profile(interests: &[&str]) -> CandidateProfile {
        CandidateProfile {
            interests: interests.iter().map(|s| s.to_string()).collect(),
            age_min: None,
            age_max: None,
            location: None,
            gender: None,
        }
    }

    fn full_profile(interests: &[&str], ages: (i32, i32), location: &str, gender: &str) -> CandidateProfile {
        CandidateProfile {
            interests: interests.iter().map(|s| s.to_string()).collect(),
            age_min: Some(ages.0),
            age_max: Some(ages.1),
            location: Some(location.into()),
            gender: Some(gender.into()),
        }
    }

    #[test]
    fn symmetric() {
        let a = full_profile(&["Music", "Gaming", "Art"], (18, 30), "Berlin", "f");
        let b = full_profile(&["Gaming", "Travel"], (25, 40), "Paris", "m");
        assert_eq!(score(&a, &b), score(&b, &a));
    }

    #[test]
    fn bounded_and_exact_on_full_overlap() {
        let a = full_profile(&["Music", "Gaming"], (20, 30), "Berlin", "f");
        let b = full_profile(&["Music", "Gaming"], (25, 35), "Berlin", "f");
        assert_eq!(score(&a, &b), 1.0);
    }

    #[test]
    fn disjoint_interests_contribute_nothing() {
        let a = profile(&["Music"]);
        let b = profile(&["Travel"]);
        assert_eq!(score(&a, &b), 0.0);
    }

    #[test]
    fn empty_interest_sets_do_not_divide_by_zero() {
        let a = profile(&[]);
        let b = profile(&[]);
        assert_eq!(score(&a, &b), 0.0);
    }

    #[test]
    fn overlap_ratio_uses_larger_set() {
        // 1 shared of max(2, 4) = 0.25 * 0.4 = 0.1
        let a = profile(&["Music", "Gaming"]);
        let b = profile(&["Gaming", "Art", "Travel", "Food"]);
        assert!((score(&a, &b) - 0.1).abs() < 1e-9);
    }

    #[test]
    fn single_shared_interest_stays_below_threshold() {
        // The worked example: one shared interest out of two on each side
        // scores 0.5 * 0.4 = 0.20, under the 0.3 commit threshold.
        let x = profile(&["Music", "Gaming"]);
        let y = profile(&["Gaming", "Art"]);
        let s = score(&x, &y);
        assert!((s - 0.2).abs() < 1e-9);
        assert!(select_best(&x, &[y]).is_none());
    }

    #[test]
    fn matching_location_pushes_over_threshold() {
        let mut x = profile(&["Music", "Gaming"]);
        let mut y = profile(&["Gaming", "Art"]);
        x.location = Some("Berlin".into());
        y.location = Some("Berlin".into());
        let s = score(&x, &y);
        assert!((s - 0.4).abs() < 1e-9);
        assert_eq!(select_best(&x, std::slice::from_ref(&y)), Some((0, s)));
    }

    #[test]
    fn age_overlap_is_binary() {
        let a = full_profile(&["Music"], (18, 25), "Berlin", "f");
        let touching = full_profile(&["Music"], (25, 40), "Paris", "m");
        let disjoint = full_profile(&["Music"], (26, 40), "Paris", "m");
        // Shared endpoint counts as overlap.
        assert!(score(&a, &touching) > score(&a, &disjoint));
    }

    #[test]
    fn missing_age_range_on_one_side_scores_zero_for_age() {
        let a = full_profile(&["Music"], (18, 25), "Berlin", "f");
        let mut b = full_profile(&["Music"], (18, 25), "Berlin", "f");
        b.age_min = None;
        b.age_max = None;
        assert!((score(&a, &b) - 0.8).abs() < 1e-9);
    }

    #[test]
    fn select_best_takes_the_maximum() {
        let current = full_profile(&["Music", "Gaming"], (20, 30), "Berlin", "f");
        let weak = profile(&["Music", "Gaming"]); // 0.4
        let strong = full_profile(&["Music", "Gaming"], (22, 28), "Berlin", "f"); // 1.0
        let picked = select_best(&current, &[weak, strong.clone()]).unwrap();
        assert_eq!(picked.0, 1);
        assert_eq!(picked.1, 1.0);
    }

    #[test]
    fn select_best_keeps_earliest_on_tie() {
        let current = profile(&["Music", "Gaming"]);
        let a = profile(&["Music", "Gaming"]);
        let b = profile(&["Music", "Gaming"]);
        assert_eq!(select_best(&current, &[a, b]).unwrap().0, 0);
    }
}
