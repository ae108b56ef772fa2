use serde::{Deserialize, Serialize};

/// Opaque ID types for type safety
pub type SessionId = String;
pub type GameCode = String;

/// The allowed alphabet for a game code: exactly 4 uppercase ASCII letters.
pub const GAME_CODE_CHARS: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ";
pub const GAME_CODE_LENGTH: usize = 4;

/// Validate and normalize a user-supplied game code: uppercased, exactly
/// 4 ASCII letters.
pub fn normalize_game_code(input: &str) -> Option<GameCode> {
    if input.chars().count() != GAME_CODE_LENGTH {
        return None;
    }
    if !input.chars().all(|c| c.is_ascii_alphabetic()) {
        return None;
    }
    Some(input.to_ascii_uppercase())
}

/// Generate a random 4-letter game code (used when the host does not
/// supply one). Uniqueness against live rooms is the directory's job.
pub fn random_game_code() -> GameCode {
    use rand::Rng;
    let mut rng = rand::rng();
    (0..GAME_CODE_LENGTH)
        .map(|_| GAME_CODE_CHARS[rng.random_range(0..GAME_CODE_CHARS.len())] as char)
        .collect()
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Color {
    pub hex_code: String,
    pub name: String,
}

/// The four independent, summed components of a team's score for one
/// question. `total()` in `crate::scoring` sums them.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "camelCase")]
pub struct ScoreComponents {
    pub question_points: i64,
    pub bonus_points: i64,
    pub speed_bonus_points: i64,
    pub override_points: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum AnswerContent {
    Standard { answer_text: String },
    MultiAnswer { answers: Vec<String> },
    MultipleChoice { selected: String },
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum QuestionKind {
    Standard,
    MultiAnswer,
    MultipleChoice,
}

/// Multiple-choice option count, bounded per §3 (2..8).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct McConfig {
    pub option_count: u8,
}

impl Default for McConfig {
    fn default() -> Self {
        Self { option_count: 4 }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum QuestionConfig {
    Standard,
    MultiAnswer,
    MultipleChoice { config: McConfig },
}

impl QuestionConfig {
    pub fn kind(&self) -> QuestionKind {
        match self {
            QuestionConfig::Standard => QuestionKind::Standard,
            QuestionConfig::MultiAnswer => QuestionKind::MultiAnswer,
            QuestionConfig::MultipleChoice { .. } => QuestionKind::MultipleChoice,
        }
    }
}

/// One team's answer (and score) for a single question.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct TeamAnswer {
    pub team_name: String,
    pub score: ScoreComponents,
    pub content: Option<AnswerContent>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Question {
    pub timer_duration: u32,
    pub question_points: i64,
    pub bonus_increment: i64,
    pub question_kind: QuestionKind,
    pub question_config: QuestionConfig,
    pub speed_bonus_enabled: bool,
    pub answers: Vec<TeamAnswer>,
}

impl Question {
    pub fn has_answers(&self) -> bool {
        !self.answers.is_empty()
    }

    pub fn answer_for(&self, team_name: &str) -> Option<&TeamAnswer> {
        self.answers
            .iter()
            .find(|a| a.team_name.eq_ignore_ascii_case(team_name))
    }

    pub fn answer_for_mut(&mut self, team_name: &str) -> Option<&mut TeamAnswer> {
        self.answers
            .iter_mut()
            .find(|a| a.team_name.eq_ignore_ascii_case(team_name))
    }

    /// View of this question restricted to one team: only that team's own
    /// answer content is visible.
    pub fn filter_for_team(&self, team_name: &str) -> Question {
        let answers = self
            .answers
            .iter()
            .filter(|a| a.team_name.eq_ignore_ascii_case(team_name))
            .cloned()
            .collect();
        Question {
            answers,
            ..self.clone()
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct GameSettings {
    pub default_timer_duration: u32,
    pub default_question_points: i64,
    pub default_bonus_increment: i64,
    pub default_question_kind: QuestionKind,
    pub default_mc_config: McConfig,
    pub speed_bonus_enabled: bool,
    pub speed_bonus_num_teams: u8,
    pub speed_bonus_first_place_points: i64,
}

impl Default for GameSettings {
    fn default() -> Self {
        Self {
            default_timer_duration: 30,
            default_question_points: 50,
            default_bonus_increment: 5,
            default_question_kind: QuestionKind::Standard,
            default_mc_config: McConfig::default(),
            speed_bonus_enabled: false,
            speed_bonus_num_teams: 3,
            speed_bonus_first_place_points: 10,
        }
    }
}

impl GameSettings {
    pub fn question_config(&self) -> QuestionConfig {
        match self.default_question_kind {
            QuestionKind::Standard => QuestionConfig::Standard,
            QuestionKind::MultiAnswer => QuestionConfig::MultiAnswer,
            QuestionKind::MultipleChoice => QuestionConfig::MultipleChoice {
                config: self.default_mc_config.clone(),
            },
        }
    }

    pub fn new_question(&self) -> Question {
        Question {
            timer_duration: self.default_timer_duration,
            question_points: self.default_question_points,
            bonus_increment: self.default_bonus_increment,
            question_kind: self.default_question_kind,
            question_config: self.question_config(),
            speed_bonus_enabled: self.speed_bonus_enabled,
            answers: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Team {
    pub team_name: String,
    pub team_members: Vec<String>,
    pub color: Color,
    pub override_points: i64,
    pub connected: bool,
}

/// Timer phase per §4.4. The room actor derives this from
/// `(timer_running, timer_seconds_remaining, current_question.timer_duration)`.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum TimerPhase {
    Idle,
    Running,
    Paused,
    Expired,
}
