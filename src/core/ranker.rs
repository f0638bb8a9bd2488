use std::cmp::Ordering;

use crate::core::filters::EligibleCandidate;
use crate::models::{MatchScore, MatchTier, RankedCandidate};

/// How many cleaners a booking is broadcast to
pub const BROADCAST_LIMIT: usize = 15;

/// Eligible cleaner with its score, before ranking
#[derive(Debug, Clone)]
pub struct ScoredCandidate {
    pub candidate: EligibleCandidate,
    pub score: MatchScore,
}

/// Order candidates best-first.
///
/// Score descending, then distance ascending, then cleaner id, so equal
/// scores rank the same way no matter what order the pool arrived in.
fn compare(a: &ScoredCandidate, b: &ScoredCandidate) -> Ordering {
    b.score
        .total
        .partial_cmp(&a.score.total)
        .unwrap_or(Ordering::Equal)
        .then_with(|| {
            a.candidate
                .distance_miles
                .partial_cmp(&b.candidate.distance_miles)
                .unwrap_or(Ordering::Equal)
        })
        .then_with(|| a.candidate.cleaner.id.cmp(&b.candidate.cleaner.id))
}

/// Sort, assign dense ranks 1..N and keep the top `limit` (all when `None`)
pub fn rank_candidates<F>(
    mut scored: Vec<ScoredCandidate>,
    limit: Option<usize>,
    tier_for: F,
) -> Vec<RankedCandidate>
where
    F: Fn(f64) -> MatchTier,
{
    scored.sort_by(compare);

    if let Some(limit) = limit {
        scored.truncate(limit);
    }

    scored
        .into_iter()
        .enumerate()
        .map(|(index, scored)| RankedCandidate {
            rank: index + 1,
            cleaner_id: scored.candidate.cleaner.id,
            user_id: scored.candidate.cleaner.user_id,
            distance_miles: scored.candidate.distance_miles,
            travel: scored.candidate.travel,
            match_tier: tier_for(scored.score.total),
            score: scored.score,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::distance::travel_from_air_miles;
    use crate::models::{
        AccountStatus, Availability, Cleaner, CleanerStats, Onboarding, ScoreBreakdown,
        TierThresholds, VerificationStatus,
    };

    fn scored(id: &str, total: f64, distance: f64) -> ScoredCandidate {
        ScoredCandidate {
            candidate: EligibleCandidate {
                cleaner: Cleaner {
                    id: id.to_string(),
                    user_id: format!("user_{}", id),
                    verification_status: VerificationStatus::Approved,
                    account_status: AccountStatus::Active,
                    onboarding: Onboarding::complete(),
                    base_location: None,
                    service_radius_miles: None,
                    availability: Availability::all_day(),
                    service_types: Default::default(),
                    specialties: vec![],
                    stats: CleanerStats::default(),
                    last_active_at: None,
                    upcoming_job_count: 0,
                    jobs: vec![],
                },
                distance_miles: distance,
                travel: travel_from_air_miles(distance),
            },
            score: MatchScore { total, breakdown: ScoreBreakdown::default() },
        }
    }

    fn tiers(total: f64) -> MatchTier {
        TierThresholds::default().tier_for(total)
    }

    #[test]
    fn test_ranks_by_score_descending() {
        let ranked = rank_candidates(
            vec![scored("a", 60.0, 1.0), scored("b", 90.0, 1.0), scored("c", 75.0, 1.0)],
            None,
            tiers,
        );

        let ids: Vec<_> = ranked.iter().map(|r| r.cleaner_id.as_str()).collect();
        assert_eq!(ids, vec!["b", "c", "a"]);
        assert_eq!(ranked.iter().map(|r| r.rank).collect::<Vec<_>>(), vec![1, 2, 3]);
        assert_eq!(ranked[0].match_tier, MatchTier::HighlyRecommended);
        assert_eq!(ranked[2].match_tier, MatchTier::StrongMatch);
    }

    #[test]
    fn test_ties_break_by_distance_then_id() {
        let ranked = rank_candidates(
            vec![scored("z", 80.0, 2.0), scored("y", 80.0, 5.0), scored("x", 80.0, 2.0)],
            None,
            tiers,
        );

        let ids: Vec<_> = ranked.iter().map(|r| r.cleaner_id.as_str()).collect();
        assert_eq!(ids, vec!["x", "z", "y"]);
    }

    #[test]
    fn test_truncates_to_limit() {
        let pool: Vec<_> = (0..20).map(|i| scored(&format!("c{:02}", i), i as f64, 1.0)).collect();
        let ranked = rank_candidates(pool, Some(BROADCAST_LIMIT), tiers);

        assert_eq!(ranked.len(), BROADCAST_LIMIT);
        assert_eq!(ranked[0].cleaner_id, "c19");
        assert_eq!(ranked[14].cleaner_id, "c05");
    }
}
