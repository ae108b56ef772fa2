//! The Room record (§3) and its invariant-preserving mutators (C3).
//!
//! Grounded on `congress/src/state/game.rs`'s `impl AppState` idiom
//! (state behind an owning struct, each mutator validating preconditions
//! before mutating) and, for the exact question/team/answer shape, on
//! `jaredblack-trivia-wizard-2`'s `Game` (`add_team`, `next_question`,
//! `prev_question`, `update_game_settings`, `update_question_settings`).
//! Unlike both, this `Room` has no awareness of connections or channels —
//! that lives one layer up in the room actor (§4.5) — it is touched only
//! from inside the owning actor, never shared or locked internally.

use std::collections::HashMap;

use chrono::{DateTime, Utc};

use crate::error::RoomError;
use crate::scoring;
use crate::types::{
    AnswerContent, Color, GameCode, GameSettings, Question, QuestionKind, Team, TeamAnswer,
};

#[derive(Debug, Clone)]
pub struct Room {
    pub game_code: GameCode,
    pub created_at: DateTime<Utc>,
    pub settings: GameSettings,
    /// 1-indexed: `questions[0]` is question 1.
    pub questions: Vec<Question>,
    pub current_question_number: usize,
    pub timer_running: bool,
    pub timer_seconds_remaining: u32,
    /// Keyed by lowercased team name for case-insensitive uniqueness (§3).
    pub teams: HashMap<String, Team>,
}

impl Room {
    pub fn new(game_code: GameCode) -> Self {
        let settings = GameSettings::default();
        let first_question = settings.new_question();
        Self {
            game_code,
            created_at: Utc::now(),
            timer_seconds_remaining: first_question.timer_duration,
            questions: vec![first_question],
            current_question_number: 1,
            timer_running: false,
            teams: HashMap::new(),
            settings,
        }
    }

    pub fn current_question(&self) -> &Question {
        &self.questions[self.current_question_number - 1]
    }

    pub fn current_question_mut(&mut self) -> &mut Question {
        &mut self.questions[self.current_question_number - 1]
    }

    pub fn find_team(&self, team_name: &str) -> Option<&Team> {
        self.teams.get(&team_name.to_ascii_lowercase())
    }

    fn find_team_mut(&mut self, team_name: &str) -> Option<&mut Team> {
        self.teams.get_mut(&team_name.to_ascii_lowercase())
    }

    /// Sum over every question answer plus the per-team override (§3 Team
    /// "aggregate score").
    pub fn team_total(&self, team_name: &str) -> i64 {
        let from_answers: i64 = self
            .questions
            .iter()
            .filter_map(|q| q.answer_for(team_name))
            .map(|a| scoring::total(&a.score))
            .sum();
        let override_points = self.find_team(team_name).map_or(0, |t| t.override_points);
        from_answers + override_points
    }

    // === Team lifecycle ===

    /// Create a new team, or re-associate an existing disconnected one
    /// (rejoin). Rejects name/color collisions with a still-connected
    /// team per invariant 1.
    pub fn create_team(
        &mut self,
        team_name: &str,
        team_members: Vec<String>,
        color: Color,
    ) -> Result<(), RoomError> {
        let key = team_name.to_ascii_lowercase();

        if let Some(existing) = self.teams.get(&key) {
            if existing.connected {
                return Err(RoomError::NameConflict(team_name.to_string()));
            }
            let existing = self.teams.get_mut(&key).unwrap();
            existing.connected = true;
            existing.team_members = team_members;
            existing.color = color;
            return Ok(());
        }

        if self
            .teams
            .values()
            .any(|t| t.color == color)
        {
            return Err(RoomError::ColorConflict(color.name));
        }

        self.teams.insert(
            key,
            Team {
                team_name: team_name.to_string(),
                team_members,
                color,
                override_points: 0,
                connected: true,
            },
        );
        Ok(())
    }

    /// Renaming a team once it has joined is disallowed (§4.3).
    pub fn rename_team(&mut self, _team_name: &str, _new_name: &str) -> Result<(), RoomError> {
        Err(RoomError::Unauthorized(
            "teams cannot be renamed after joining".to_string(),
        ))
    }

    pub fn remove_team(&mut self, team_name: &str) -> Result<(), RoomError> {
        let key = team_name.to_ascii_lowercase();
        self.teams
            .remove(&key)
            .map(|_| ())
            .ok_or_else(|| RoomError::GameNotFound(team_name.to_string()))
    }

    pub fn set_team_connected(&mut self, team_name: &str, connected: bool) {
        if let Some(team) = self.find_team_mut(team_name) {
            team.connected = connected;
        }
    }

    // === Answer submission ===

    fn content_matches_kind(content: &AnswerContent, kind: QuestionKind) -> bool {
        matches!(
            (content, kind),
            (AnswerContent::Standard { .. }, QuestionKind::Standard)
                | (AnswerContent::MultiAnswer { .. }, QuestionKind::MultiAnswer)
                | (AnswerContent::MultipleChoice { .. }, QuestionKind::MultipleChoice)
        )
    }

    /// Record an answer iff the timer is running, the team has no prior
    /// content for the current question, and the content matches the
    /// question's kind (§4.5 `submitAnswer`).
    pub fn record_answer(
        &mut self,
        team_name: &str,
        content: AnswerContent,
    ) -> Result<(), RoomError> {
        if !self.timer_running {
            return Err(RoomError::SubmissionClosed);
        }
        if self.find_team(team_name).is_none() {
            return Err(RoomError::GameNotFound(team_name.to_string()));
        }

        let question = self.current_question_mut();
        if question.answer_for(team_name).is_some() {
            return Err(RoomError::SubmissionClosed);
        }
        if !Self::content_matches_kind(&content, question.question_kind) {
            return Err(RoomError::MalformedMessage(
                "answer content does not match question kind".to_string(),
            ));
        }

        question.answers.push(TeamAnswer {
            team_name: team_name.to_string(),
            score: Default::default(),
            content: Some(content),
        });
        Ok(())
    }

    // === Scoring mutators ===

    /// Set the correctness mark on one team's answer for the given
    /// question, then propagate to every answer with equal content
    /// (§4.2) and recompute the speed bonus (invariant 6).
    pub fn set_correctness(
        &mut self,
        question_number: usize,
        team_name: &str,
        question_points: i64,
    ) -> Result<(), RoomError> {
        let question = self.question_mut(question_number)?;
        let answer = question
            .answer_for_mut(team_name)
            .ok_or_else(|| RoomError::GameNotFound(team_name.to_string()))?;
        answer.score.question_points = question_points;

        scoring::propagate_correctness(question, team_name);
        scoring::distribute_speed_bonus(question, &self.settings);
        Ok(())
    }

    pub fn adjust_bonus(
        &mut self,
        question_number: usize,
        team_name: &str,
        delta: i64,
    ) -> Result<(), RoomError> {
        let question = self.question_mut(question_number)?;
        let answer = question
            .answer_for_mut(team_name)
            .ok_or_else(|| RoomError::GameNotFound(team_name.to_string()))?;
        answer.score.bonus_points += delta;
        scoring::distribute_speed_bonus(question, &self.settings);
        Ok(())
    }

    /// Replace the team's override so that its aggregate total equals
    /// `target` exactly (§9 "auto-scoring edge cases").
    pub fn set_override(&mut self, team_name: &str, override_points: i64) -> Result<(), RoomError> {
        self.find_team_mut(team_name)
            .ok_or_else(|| RoomError::GameNotFound(team_name.to_string()))?
            .override_points = override_points;
        Ok(())
    }

    fn question_mut(&mut self, question_number: usize) -> Result<&mut Question, RoomError> {
        self.questions
            .get_mut(question_number.wrapping_sub(1))
            .ok_or_else(|| RoomError::GameNotFound(format!("question {question_number}")))
    }

    fn question(&self, question_number: usize) -> Result<&Question, RoomError> {
        self.questions
            .get(question_number.wrapping_sub(1))
            .ok_or_else(|| RoomError::GameNotFound(format!("question {question_number}")))
    }

    /// Current score components for one team's answer to one question.
    /// Used by the room actor to turn an incoming absolute `scoreAnswer`
    /// payload into the delta `adjust_bonus` expects (§9).
    pub fn answer_score(
        &self,
        question_number: usize,
        team_name: &str,
    ) -> Result<crate::types::ScoreComponents, RoomError> {
        Ok(self
            .question(question_number)?
            .answer_for(team_name)
            .ok_or_else(|| RoomError::GameNotFound(team_name.to_string()))?
            .score)
    }

    // === Question navigation ===

    pub fn advance_question(&mut self) {
        self.current_question_number += 1;
        if self.current_question_number > self.questions.len() {
            self.questions.push(self.settings.new_question());
        }
        self.timer_running = false;
        self.timer_seconds_remaining = self.current_question().timer_duration;
    }

    pub fn retreat_question(&mut self) -> Result<(), RoomError> {
        if self.current_question_number <= 1 {
            return Err(RoomError::GameNotFound("no previous question".to_string()));
        }
        self.current_question_number -= 1;
        self.timer_running = false;
        self.timer_seconds_remaining = self.current_question().timer_duration;
        Ok(())
    }

    // === Settings ===

    pub fn update_question_settings(
        &mut self,
        question_number: usize,
        timer_duration: u32,
        question_points: i64,
        bonus_increment: i64,
        question_kind: QuestionKind,
        question_config: crate::types::QuestionConfig,
        speed_bonus_enabled: bool,
    ) -> Result<(), RoomError> {
        let is_current = question_number == self.current_question_number;
        let question = self.question_mut(question_number)?;
        if question.has_answers() {
            return Err(RoomError::SettingsLocked);
        }
        question.timer_duration = timer_duration;
        question.question_points = question_points;
        question.bonus_increment = bonus_increment;
        question.question_kind = question_kind;
        question.question_config = question_config;
        question.speed_bonus_enabled = speed_bonus_enabled;

        if is_current && !self.timer_running {
            self.timer_seconds_remaining = timer_duration;
        }
        Ok(())
    }

    /// Update room-wide defaults. Existing questions are left untouched —
    /// only newly-appended questions pick up the new defaults (unlike
    /// `jaredblack-trivia-wizard-2::update_game_settings`, which also
    /// back-fills unanswered questions; the spec's §4.3 lists
    /// `updateGameSettings` and `updateQuestionSettings` as distinct
    /// operations with no back-fill requirement, so this keeps their
    /// effects separate).
    pub fn update_game_settings(&mut self, settings: GameSettings) {
        self.settings = settings;
    }

    // === Timer ===

    pub fn set_timer(&mut self, running: bool, seconds_remaining: u32) {
        self.timer_running = running;
        self.timer_seconds_remaining = seconds_remaining;
    }

    /// Called by the room actor when the timer's countdown reaches zero
    /// (§4.5 "On timer expiry the actor synthesizes an implicit empty
    /// submission for every still-open team that has drafted no
    /// answer"). Gives every connected team with no recorded content for
    /// the current question a null-content row, so the team's own view
    /// can show "you skipped this one" while the host-visible view (which
    /// filters to `content.is_some()`, see `protocol::GameStateSnapshot`)
    /// is unaffected.
    pub fn close_current_question_for_expiry(&mut self) {
        let connected_teams: Vec<String> = self
            .teams
            .values()
            .filter(|t| t.connected)
            .map(|t| t.team_name.clone())
            .collect();
        let question = self.current_question_mut();
        for team_name in connected_teams {
            if question.answer_for(&team_name).is_none() {
                question.answers.push(TeamAnswer {
                    team_name,
                    score: Default::default(),
                    content: None,
                });
            }
        }
    }
}
