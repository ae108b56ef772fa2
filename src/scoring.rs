//! Pure, deterministic scoring functions. No side effects, no I/O, no
//! awareness of rooms, sessions, or time — everything here is a function
//! of the values passed in.
//!
//! Grounded on the auto-scoring semantics exercised in
//! `jaredblack-trivia-wizard-2`'s `Game::score_answer`/`add_answer` and its
//! `auto_scoring_test.rs` (duplicate-answer propagation, one-shot,
//! not-overwriting) and `team_name_case_test.rs` (case-insensitive team
//! lookups, unaffected by answer-content case handling).

use crate::types::{AnswerContent, GameSettings, Question, ScoreComponents};

/// Sum of the four independent score components.
pub fn total(components: &ScoreComponents) -> i64 {
    components.question_points
        + components.bonus_points
        + components.speed_bonus_points
        + components.override_points
}

/// Normalize answer content for the equality rule in §4.2:
/// - Standard: trimmed, case-sensitive string.
/// - MultipleChoice: the option label itself (identity).
/// - MultiAnswer: ordered list of trimmed strings.
fn normalized_key(content: &AnswerContent) -> NormalizedContent {
    match content {
        AnswerContent::Standard { answer_text } => {
            NormalizedContent::Single(answer_text.trim().to_string())
        }
        AnswerContent::MultipleChoice { selected } => {
            NormalizedContent::Single(selected.clone())
        }
        AnswerContent::MultiAnswer { answers } => {
            NormalizedContent::List(answers.iter().map(|a| a.trim().to_string()).collect())
        }
    }
}

#[derive(PartialEq, Eq)]
enum NormalizedContent {
    Single(String),
    List(Vec<String>),
}

/// Copy a correctness mark from `trigger_team`'s answer to every other
/// answer in the question with equal content under the §4.2 equality
/// rule. One-shot: does not touch bonus or override points, and does not
/// chase transitive equalities beyond the direct class.
///
/// No-op if `trigger_team` has no answer or no content.
pub fn propagate_correctness(question: &mut Question, trigger_team: &str) {
    let Some(trigger) = question.answer_for(trigger_team) else {
        return;
    };
    let Some(trigger_content) = trigger.content.as_ref() else {
        return;
    };
    let trigger_key = normalized_key(trigger_content);
    let new_points = trigger.score.question_points;

    for answer in question.answers.iter_mut() {
        if answer.team_name.eq_ignore_ascii_case(trigger_team) {
            continue;
        }
        let Some(content) = answer.content.as_ref() else {
            continue;
        };
        if normalized_key(content) == trigger_key {
            answer.score.question_points = new_points;
        }
    }
}

/// Recompute `speedBonusPoints` for every answer in the question per
/// §4.2(3). Takes the answers with `questionPoints > 0` in submission
/// order; the first `k = min(settings.speedBonusNumTeams, |correct|)`
/// get `floor(firstPlacePoints * (k - i + 1) / k)` for place `i` in
/// `1..=k`. Everyone else gets zero. Zeroes everything when either flag
/// is disabled.
pub fn distribute_speed_bonus(question: &mut Question, settings: &GameSettings) {
    if !question.speed_bonus_enabled || !settings.speed_bonus_enabled {
        for answer in question.answers.iter_mut() {
            answer.score.speed_bonus_points = 0;
        }
        return;
    }

    let correct_indices: Vec<usize> = question
        .answers
        .iter()
        .enumerate()
        .filter(|(_, a)| a.score.question_points > 0)
        .map(|(i, _)| i)
        .collect();

    let k = (settings.speed_bonus_num_teams as usize).min(correct_indices.len());
    let first_place = settings.speed_bonus_first_place_points;

    for answer in question.answers.iter_mut() {
        answer.score.speed_bonus_points = 0;
    }

    for (place, &idx) in correct_indices.iter().take(k).enumerate() {
        let i = (place + 1) as i64; // 1-indexed place
        let bonus = first_place * (k as i64 - i + 1) / k as i64;
        question.answers[idx].score.speed_bonus_points = bonus;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{McConfig, QuestionConfig, QuestionKind, TeamAnswer};

    fn standard_question() -> Question {
        Question {
            timer_duration: 30,
            question_points: 50,
            bonus_increment: 5,
            question_kind: QuestionKind::Standard,
            question_config: QuestionConfig::Standard,
            speed_bonus_enabled: false,
            answers: Vec::new(),
        }
    }

    fn answer(team: &str, text: &str) -> TeamAnswer {
        TeamAnswer {
            team_name: team.to_string(),
            score: ScoreComponents::default(),
            content: Some(AnswerContent::Standard {
                answer_text: text.to_string(),
            }),
        }
    }

    #[test]
    fn total_sums_all_four_components() {
        let c = ScoreComponents {
            question_points: 50,
            bonus_points: 10,
            speed_bonus_points: 8,
            override_points: -3,
        };
        assert_eq!(total(&c), 65);
    }

    #[test]
    fn propagate_correctness_copies_to_equal_content() {
        let mut q = standard_question();
        q.answers.push(answer("A", "Paris"));
        q.answers.push(answer("B", "Paris"));
        q.answers.push(answer("C", "Berlin"));

        q.answers[0].score.question_points = 50;
        propagate_correctness(&mut q, "A");

        assert_eq!(q.answer_for("B").unwrap().score.question_points, 50);
        assert_eq!(q.answer_for("C").unwrap().score.question_points, 0);
    }

    #[test]
    fn propagate_correctness_is_whitespace_insensitive_but_case_sensitive_for_standard() {
        let mut q = standard_question();
        q.answers.push(answer("A", "Steve"));
        q.answers.push(answer("B", "  Steve  "));
        q.answers.push(answer("C", "sTeVe"));

        q.answers[0].score.question_points = 50;
        propagate_correctness(&mut q, "A");

        // Whitespace is trimmed, so "  Steve  " matches "Steve".
        assert_eq!(q.answer_for("B").unwrap().score.question_points, 50);
        // Case is significant, so "sTeVe" does not match "Steve".
        assert_eq!(q.answer_for("C").unwrap().score.question_points, 0);
    }

    #[test]
    fn propagate_correctness_does_not_copy_bonus_or_override() {
        let mut q = standard_question();
        q.answers.push(answer("A", "Paris"));
        q.answers.push(answer("B", "Paris"));
        q.answers[0].score.question_points = 50;
        q.answers[0].score.bonus_points = 10;
        q.answers[1].score.override_points = 7;

        propagate_correctness(&mut q, "A");

        assert_eq!(q.answer_for("B").unwrap().score.bonus_points, 0);
        assert_eq!(q.answer_for("B").unwrap().score.override_points, 7);
    }

    #[test]
    fn propagate_correctness_is_idempotent() {
        let mut q = standard_question();
        q.answers.push(answer("A", "Paris"));
        q.answers.push(answer("B", "Paris"));
        q.answers[0].score.question_points = 50;

        propagate_correctness(&mut q, "A");
        let snapshot = q.clone();
        propagate_correctness(&mut q, "A");

        assert_eq!(q, snapshot);
    }

    #[test]
    fn propagate_correctness_multiple_choice_matches_on_label_identity() {
        let mut q = standard_question();
        q.question_kind = QuestionKind::MultipleChoice;
        q.question_config = QuestionConfig::MultipleChoice {
            config: McConfig { option_count: 4 },
        };
        q.answers.push(TeamAnswer {
            team_name: "T1".into(),
            score: ScoreComponents::default(),
            content: Some(AnswerContent::MultipleChoice {
                selected: "B".into(),
            }),
        });
        q.answers.push(TeamAnswer {
            team_name: "T2".into(),
            score: ScoreComponents::default(),
            content: Some(AnswerContent::MultipleChoice {
                selected: "B".into(),
            }),
        });
        q.answers.push(TeamAnswer {
            team_name: "T3".into(),
            score: ScoreComponents::default(),
            content: Some(AnswerContent::MultipleChoice {
                selected: "C".into(),
            }),
        });

        q.answers[0].score.question_points = 50;
        propagate_correctness(&mut q, "T1");

        assert_eq!(q.answer_for("T2").unwrap().score.question_points, 50);
        assert_eq!(q.answer_for("T3").unwrap().score.question_points, 0);
    }

    #[test]
    fn propagate_correctness_multi_answer_matches_whole_ordered_list() {
        let mut q = standard_question();
        q.question_kind = QuestionKind::MultiAnswer;
        q.question_config = QuestionConfig::MultiAnswer;
        let content = AnswerContent::MultiAnswer {
            answers: vec!["Paris".into(), "France".into()],
        };
        q.answers.push(TeamAnswer {
            team_name: "T1".into(),
            score: ScoreComponents::default(),
            content: Some(content.clone()),
        });
        q.answers.push(TeamAnswer {
            team_name: "T2".into(),
            score: ScoreComponents::default(),
            content: Some(AnswerContent::MultiAnswer {
                answers: vec![" Paris ".into(), "France".into()],
            }),
        });
        q.answers.push(TeamAnswer {
            team_name: "T3".into(),
            score: ScoreComponents::default(),
            content: Some(AnswerContent::MultiAnswer {
                answers: vec!["France".into(), "Paris".into()],
            }),
        });

        q.answers[0].score.question_points = 50;
        propagate_correctness(&mut q, "T1");

        assert_eq!(q.answer_for("T2").unwrap().score.question_points, 50);
        assert_eq!(
            q.answer_for("T3").unwrap().score.question_points,
            0,
            "order matters for MultiAnswer equality"
        );
    }

    #[test]
    fn propagate_correctness_does_not_overwrite_already_distinct_score() {
        // Grounded on `already_scored_answers_not_overwritten_by_auto_scoring`:
        // re-triggering propagation from one team must not clobber a peer's
        // independently-set score for a *different* content class.
        let mut q = standard_question();
        q.answers.push(answer("A", "Paris"));
        q.answers.push(answer("B", "Berlin"));
        q.answers[1].score.question_points = 50;
        q.answers[1].score.bonus_points = 15;

        q.answers[0].score.question_points = 50;
        propagate_correctness(&mut q, "A");

        assert_eq!(q.answer_for("B").unwrap().score.question_points, 50);
        assert_eq!(q.answer_for("B").unwrap().score.bonus_points, 15);
    }

    fn speed_settings(num_teams: u8, first_place: i64) -> GameSettings {
        GameSettings {
            speed_bonus_enabled: true,
            speed_bonus_num_teams: num_teams,
            speed_bonus_first_place_points: first_place,
            ..GameSettings::default()
        }
    }

    #[test]
    fn distribute_speed_bonus_scenario_s4() {
        let mut q = standard_question();
        q.speed_bonus_enabled = true;
        q.answers.push(answer("alpha", "x"));
        q.answers.push(answer("beta", "x"));
        q.answers.push(answer("gamma", "x"));
        for a in q.answers.iter_mut() {
            a.score.question_points = 50;
        }

        let settings = speed_settings(3, 12);
        distribute_speed_bonus(&mut q, &settings);

        assert_eq!(q.answer_for("alpha").unwrap().score.speed_bonus_points, 12);
        assert_eq!(q.answer_for("beta").unwrap().score.speed_bonus_points, 8);
        assert_eq!(q.answer_for("gamma").unwrap().score.speed_bonus_points, 4);

        // Marking alpha incorrect re-runs propagation and zeroes everyone.
        q.answers[0].score.question_points = 0;
        propagate_correctness(&mut q, "alpha");
        distribute_speed_bonus(&mut q, &settings);
        for a in &q.answers {
            assert_eq!(a.score.question_points, 0);
            assert_eq!(a.score.speed_bonus_points, 0);
        }
    }

    #[test]
    fn distribute_speed_bonus_beyond_kth_and_incorrect_are_zero() {
        let mut q = standard_question();
        q.speed_bonus_enabled = true;
        for name in ["a", "b", "c", "d"] {
            q.answers.push(answer(name, "right"));
        }
        q.answers[0].score.question_points = 50;
        q.answers[1].score.question_points = 50;
        q.answers[2].score.question_points = 50;
        // d left incorrect (0 points)

        let settings = speed_settings(2, 10);
        distribute_speed_bonus(&mut q, &settings);

        assert_eq!(q.answer_for("a").unwrap().score.speed_bonus_points, 10);
        assert_eq!(q.answer_for("b").unwrap().score.speed_bonus_points, 5);
        assert_eq!(q.answer_for("c").unwrap().score.speed_bonus_points, 0);
        assert_eq!(q.answer_for("d").unwrap().score.speed_bonus_points, 0);
    }

    #[test]
    fn distribute_speed_bonus_disabled_zeroes_everything() {
        let mut q = standard_question();
        q.speed_bonus_enabled = false;
        q.answers.push(answer("a", "right"));
        q.answers[0].score.question_points = 50;
        q.answers[0].score.speed_bonus_points = 99;

        let settings = speed_settings(3, 12);
        distribute_speed_bonus(&mut q, &settings);

        assert_eq!(q.answer_for("a").unwrap().score.speed_bonus_points, 0);
    }

    #[test]
    fn distribute_speed_bonus_game_setting_disabled_overrides_question_flag() {
        let mut q = standard_question();
        q.speed_bonus_enabled = true;
        q.answers.push(answer("a", "right"));
        q.answers[0].score.question_points = 50;

        let mut settings = speed_settings(3, 12);
        settings.speed_bonus_enabled = false;
        distribute_speed_bonus(&mut q, &settings);

        assert_eq!(q.answer_for("a").unwrap().score.speed_bonus_points, 0);
    }
}
