use rand::{Rng, RngCore};
use std::collections::HashSet;

use crate::model::{Ability, Difficulty, Question, QuestionId};
use crate::progression::Progress;

/// Number of leading pool members the random pick draws from.
pub const SELECTION_WINDOW: usize = 5;

//
// ─── EXCLUSIONS ───────────────────────────────────────────────────────────────
//

/// Question identifiers to avoid when picking the next question.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Exclusions {
    /// Used in the running session. Never picked again.
    pub session: HashSet<QuestionId>,
    /// Used in any earlier session. Picked only when nothing unseen remains.
    pub past: HashSet<QuestionId>,
}

impl Exclusions {
    #[must_use]
    pub fn new(past: HashSet<QuestionId>) -> Self {
        Self {
            session: HashSet::new(),
            past,
        }
    }
}

//
// ─── SELECTION RESULT ─────────────────────────────────────────────────────────
//

/// How the working pool related to the requested difficulty.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PoolMatch {
    Exact,
    Harder(Difficulty),
    Easier(Difficulty),
    AnyDifficulty,
    NearestAbility,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Selection<'a> {
    pub question: &'a Question,
    pub matched: PoolMatch,
    /// True when the pick came from questions seen in earlier sessions.
    pub repeated: bool,
}

//
// ─── POLICIES ─────────────────────────────────────────────────────────────────
//

/// Picks the next question for a session.
pub trait QuestionSelector: Send + Sync {
    fn select<'a>(
        &self,
        candidates: &'a [Question],
        exclusions: &Exclusions,
        progress: &Progress,
        rng: &mut dyn RngCore,
    ) -> Option<Selection<'a>>;
}

/// Exact-band selection with upward-then-downward fallback.
#[derive(Debug, Clone, Copy, Default)]
pub struct BandSelector;

impl QuestionSelector for BandSelector {
    fn select<'a>(
        &self,
        candidates: &'a [Question],
        exclusions: &Exclusions,
        progress: &Progress,
        rng: &mut dyn RngCore,
    ) -> Option<Selection<'a>> {
        select_next(
            candidates,
            &exclusions.session,
            progress.target(),
            &exclusions.past,
            rng,
        )
    }
}

/// Legacy selection ranking questions by distance to the continuous ability.
#[derive(Debug, Clone, Copy, Default)]
pub struct NearestAbilitySelector;

impl QuestionSelector for NearestAbilitySelector {
    fn select<'a>(
        &self,
        candidates: &'a [Question],
        exclusions: &Exclusions,
        progress: &Progress,
        rng: &mut dyn RngCore,
    ) -> Option<Selection<'a>> {
        nearest_ability(
            candidates,
            &exclusions.session,
            progress.ability(),
            &exclusions.past,
            rng,
        )
    }
}

//
// ─── ALGORITHMS ───────────────────────────────────────────────────────────────
//

/// Removes session-excluded questions, then prefers questions never seen before.
///
/// The unseen/seen choice is made over every difficulty at once. Returns the
/// chosen partition in candidate order plus whether it is the seen one.
fn preferred_partition<'a>(
    candidates: &'a [Question],
    session_excluded: &HashSet<QuestionId>,
    past_excluded: &HashSet<QuestionId>,
) -> Option<(Vec<&'a Question>, bool)> {
    let (unseen, seen): (Vec<&Question>, Vec<&Question>) = candidates
        .iter()
        .filter(|q| !session_excluded.contains(&q.id()))
        .partition(|q| !past_excluded.contains(&q.id()));

    if !unseen.is_empty() {
        Some((unseen, false))
    } else if !seen.is_empty() {
        Some((seen, true))
    } else {
        None
    }
}

fn of_difficulty<'a>(pool: &[&'a Question], difficulty: Difficulty) -> Vec<&'a Question> {
    pool.iter()
        .copied()
        .filter(|q| q.difficulty() == difficulty)
        .collect()
}

fn pick_leading<'a>(pool: &[&'a Question], rng: &mut dyn RngCore) -> Option<&'a Question> {
    let window = pool.len().min(SELECTION_WINDOW);
    if window == 0 {
        return None;
    }
    Some(pool[rng.random_range(0..window)])
}

/// Picks the next question for a target difficulty.
///
/// 1. Questions in `session_excluded` are never returned.
/// 2. Questions outside `past_excluded` are preferred over any repeat.
/// 3. Within that partition the exact `target` is used when present, else the
///    nearest harder label, else the nearest easier label, else anything.
/// 4. The pick is uniform among the first [`SELECTION_WINDOW`] pool members.
pub fn select_next<'a>(
    candidates: &'a [Question],
    session_excluded: &HashSet<QuestionId>,
    target: Difficulty,
    past_excluded: &HashSet<QuestionId>,
    rng: &mut dyn RngCore,
) -> Option<Selection<'a>> {
    let (partition, repeated) = preferred_partition(candidates, session_excluded, past_excluded)?;

    let mut working = of_difficulty(&partition, target);
    let mut matched = PoolMatch::Exact;

    if working.is_empty() {
        let fallback = target
            .harder()
            .map(|d| (d, PoolMatch::Harder(d)))
            .chain(target.easier().map(|d| (d, PoolMatch::Easier(d))))
            .map(|(d, m)| (of_difficulty(&partition, d), m))
            .find(|(pool, _)| !pool.is_empty());

        match fallback {
            Some((pool, m)) => {
                working = pool;
                matched = m;
            }
            None => {
                working = partition;
                matched = PoolMatch::AnyDifficulty;
            }
        }
    }

    pick_leading(&working, rng).map(|question| Selection {
        question,
        matched,
        repeated,
    })
}

/// Legacy policy: closest difficulty rank to `ability`, ties toward the easier label.
pub fn nearest_ability<'a>(
    candidates: &'a [Question],
    session_excluded: &HashSet<QuestionId>,
    ability: Ability,
    past_excluded: &HashSet<QuestionId>,
    rng: &mut dyn RngCore,
) -> Option<Selection<'a>> {
    let (mut pool, repeated) = preferred_partition(candidates, session_excluded, past_excluded)?;

    pool.sort_by(|a, b| {
        ability
            .distance_to(a.difficulty())
            .total_cmp(&ability.distance_to(b.difficulty()))
            .then_with(|| a.difficulty().rank().cmp(&b.difficulty().rank()))
    });

    pick_leading(&pool, rng).map(|question| Selection {
        question,
        matched: PoolMatch::NearestAbility,
        repeated,
    })
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::QuestionDraft;
    use rand::SeedableRng;
    use rand::rngs::StdRng;
    use std::collections::BTreeMap;

    fn question(id: u64, difficulty: Difficulty) -> Question {
        QuestionDraft {
            subject: "Science".into(),
            difficulty,
            prompt: format!("Question {id}"),
            options: BTreeMap::from([("A".into(), "one".into()), ("B".into(), "two".into())]),
            correct: "B".into(),
        }
        .validate(QuestionId::new(id))
        .unwrap()
    }

    fn ids(values: &[u64]) -> HashSet<QuestionId> {
        values.iter().copied().map(QuestionId::new).collect()
    }

    fn rng() -> StdRng {
        StdRng::seed_from_u64(42)
    }

    #[test]
    fn single_easy_question_is_returned() {
        let pool = vec![question(1, Difficulty::Easy)];
        let pick = select_next(&pool, &ids(&[]), Difficulty::Easy, &ids(&[]), &mut rng()).unwrap();
        assert_eq!(pick.question.id(), QuestionId::new(1));
        assert_eq!(pick.matched, PoolMatch::Exact);
        assert!(!pick.repeated);
    }

    #[test]
    fn empty_after_session_exclusion_returns_none() {
        let pool = vec![question(1, Difficulty::Easy), question(2, Difficulty::Hard)];
        let pick = select_next(&pool, &ids(&[1, 2]), Difficulty::Easy, &ids(&[]), &mut rng());
        assert!(pick.is_none());
        assert!(select_next(&[], &ids(&[]), Difficulty::Easy, &ids(&[]), &mut rng()).is_none());
    }

    #[test]
    fn missing_target_scans_upward_first() {
        let pool = vec![question(1, Difficulty::Medium), question(2, Difficulty::Medium)];
        let mut rng = rng();
        for _ in 0..20 {
            let pick = select_next(&pool, &ids(&[]), Difficulty::Easy, &ids(&[]), &mut rng).unwrap();
            assert_eq!(pick.question.difficulty(), Difficulty::Medium);
            assert_eq!(pick.matched, PoolMatch::Harder(Difficulty::Medium));
        }
    }

    #[test]
    fn upward_scan_prefers_nearest_harder_over_easier() {
        let pool = vec![
            question(1, Difficulty::Easy),
            question(2, Difficulty::Hard),
        ];
        let pick = select_next(&pool, &ids(&[]), Difficulty::Medium, &ids(&[]), &mut rng()).unwrap();
        assert_eq!(pick.question.id(), QuestionId::new(2));
        assert_eq!(pick.matched, PoolMatch::Harder(Difficulty::Hard));
    }

    #[test]
    fn downward_scan_takes_nearest_easier() {
        let pool = vec![question(1, Difficulty::Easy), question(2, Difficulty::Medium)];
        let pick = select_next(&pool, &ids(&[]), Difficulty::Hard, &ids(&[]), &mut rng()).unwrap();
        assert_eq!(pick.question.id(), QuestionId::new(2));
        assert_eq!(pick.matched, PoolMatch::Easier(Difficulty::Medium));
    }

    #[test]
    fn unseen_question_of_any_difficulty_beats_seen_exact_match() {
        let pool = vec![question(1, Difficulty::Easy), question(2, Difficulty::Hard)];
        let pick = select_next(&pool, &ids(&[]), Difficulty::Easy, &ids(&[1]), &mut rng()).unwrap();
        assert_eq!(pick.question.id(), QuestionId::new(2));
        assert_eq!(pick.matched, PoolMatch::Harder(Difficulty::Hard));
        assert!(!pick.repeated);
    }

    #[test]
    fn seen_questions_are_used_when_nothing_unseen_remains() {
        let pool = vec![question(1, Difficulty::Easy), question(2, Difficulty::Medium)];
        let pick = select_next(&pool, &ids(&[2]), Difficulty::Medium, &ids(&[1, 2]), &mut rng()).unwrap();
        assert_eq!(pick.question.id(), QuestionId::new(1));
        assert!(pick.repeated);
    }

    #[test]
    fn pick_stays_within_first_five_of_pool() {
        let pool: Vec<Question> = (1..=12).map(|id| question(id, Difficulty::Easy)).collect();
        let mut rng = rng();
        let mut seen = HashSet::new();
        for _ in 0..300 {
            let pick = select_next(&pool, &ids(&[]), Difficulty::Easy, &ids(&[]), &mut rng).unwrap();
            assert!(pick.question.id().value() <= 5);
            seen.insert(pick.question.id());
        }
        assert_eq!(seen.len(), 5);
    }

    #[test]
    fn session_exclusion_is_never_violated() {
        let pool: Vec<Question> = (1..=6)
            .map(|id| question(id, Difficulty::ORDER[(id % 3) as usize]))
            .collect();
        let excluded = ids(&[1, 2, 3, 4, 5]);
        let mut rng = rng();
        for target in Difficulty::ORDER {
            let pick = select_next(&pool, &excluded, target, &ids(&[6]), &mut rng).unwrap();
            assert_eq!(pick.question.id(), QuestionId::new(6));
        }
    }

    #[test]
    fn nearest_ability_breaks_ties_toward_easier() {
        let mut pool: Vec<Question> = (1..=5).map(|id| question(id, Difficulty::Hard)).collect();
        pool.extend((6..=10).map(|id| question(id, Difficulty::Easy)));
        let mut rng = rng();
        for _ in 0..50 {
            let pick = nearest_ability(&pool, &ids(&[]), Ability::new(2.0), &ids(&[]), &mut rng).unwrap();
            assert_eq!(pick.question.difficulty(), Difficulty::Easy);
            assert_eq!(pick.matched, PoolMatch::NearestAbility);
        }
    }

    #[test]
    fn nearest_ability_prefers_closest_band() {
        let mut pool: Vec<Question> = (1..=5).map(|id| question(id, Difficulty::Hard)).collect();
        pool.extend((6..=10).map(|id| question(id, Difficulty::Easy)));
        pool.push(question(11, Difficulty::Medium));
        let mut rng = rng();
        for _ in 0..50 {
            let pick = nearest_ability(&pool, &ids(&[]), Ability::new(1.0), &ids(&[]), &mut rng).unwrap();
            assert_eq!(pick.question.difficulty(), Difficulty::Easy);
        }
    }

    #[test]
    fn band_selector_uses_progress_target() {
        let pool = vec![question(1, Difficulty::Easy), question(2, Difficulty::Hard)];
        let progress = Progress::from_persisted(Ability::new(2.5), 0, 2);
        let pick = BandSelector
            .select(&pool, &Exclusions::default(), &progress, &mut rng())
            .unwrap();
        assert_eq!(pick.question.id(), QuestionId::new(2));
    }
}
