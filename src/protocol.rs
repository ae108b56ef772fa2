//! The tagged protocol envelopes exchanged with every participant (C1).
//!
//! Outbound (server -> client) messages are internally tagged on a single
//! `type` field. Inbound (client -> server) messages are externally tagged
//! on the top-level key (`host`, `team`, or `watcher`); host actions carry
//! their own `type` tag, team actions are a single-key variant object.
//! This intentionally differs from the teacher's uniform `t`-tagged
//! `ClientMessage`/`ServerMessage` in `congress/src/protocol.rs` — the
//! big-enum-of-structs shape and the `From<&Team>`-style view conversions
//! are kept, the tagging discipline is not.

use serde::{Deserialize, Serialize};

use crate::types::{AnswerContent, Color, GameCode, GameSettings, Question, ScoreComponents, Team};

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct GameStateSnapshot {
    pub game_code: GameCode,
    pub current_question_number: usize,
    pub timer_running: bool,
    pub timer_seconds_remaining: u32,
    pub teams: Vec<Team>,
    pub questions: Vec<Question>,
    pub game_settings: GameSettings,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct TeamGameStateSnapshot {
    pub game_code: GameCode,
    pub current_question_number: usize,
    pub timer_running: bool,
    pub timer_seconds_remaining: u32,
    pub team: Team,
    pub team_score: i64,
    /// Every past question, filtered to this team's own answer content
    /// (§3 "the team-visible list covers every past question").
    pub questions: Vec<Question>,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ScoreboardEntry {
    pub team_name: String,
    pub color: Color,
    pub total: i64,
    pub connected: bool,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ScoreboardSnapshot {
    pub game_code: GameCode,
    pub teams: Vec<ScoreboardEntry>,
}

/// View conversions from the authoritative `Room` to each participant's
/// restricted snapshot (§4.5 "Broadcast policy"). Kept alongside the
/// wire types they produce, in the spirit of the teacher's
/// `From<&Team>`-style view conversions.
impl GameStateSnapshot {
    /// Host-visible snapshot: every question, with only the answers that
    /// carry content (§3 "the host-visible list contains only teams that
    /// submitted").
    pub fn from_room(room: &crate::room::state::Room) -> Self {
        let mut teams: Vec<Team> = room.teams.values().cloned().collect();
        teams.sort_by(|a, b| a.team_name.cmp(&b.team_name));
        let questions = room
            .questions
            .iter()
            .map(|q| {
                let mut q = q.clone();
                q.answers.retain(|a| a.content.is_some());
                q
            })
            .collect();
        GameStateSnapshot {
            game_code: room.game_code.clone(),
            current_question_number: room.current_question_number,
            timer_running: room.timer_running,
            timer_seconds_remaining: room.timer_seconds_remaining,
            teams,
            questions,
            game_settings: room.settings.clone(),
        }
    }
}

impl TeamGameStateSnapshot {
    /// Team-restricted snapshot: every question filtered down to that
    /// team's own answer content, which may be `None` for a question the
    /// team skipped (§3 "the team-visible list covers every past
    /// question and may hold a null content").
    pub fn from_room(room: &crate::room::state::Room, team_name: &str) -> Option<Self> {
        let team = room.find_team(team_name)?.clone();
        let questions = room
            .questions
            .iter()
            .map(|q| q.filter_for_team(team_name))
            .collect();
        Some(TeamGameStateSnapshot {
            game_code: room.game_code.clone(),
            current_question_number: room.current_question_number,
            timer_running: room.timer_running,
            timer_seconds_remaining: room.timer_seconds_remaining,
            team_score: room.team_total(team_name),
            team,
            questions,
        })
    }
}

impl ScoreboardSnapshot {
    /// Watcher-restricted snapshot: names, colors, totals, connected
    /// flags only (§4.5).
    pub fn from_room(room: &crate::room::state::Room) -> Self {
        let mut teams: Vec<ScoreboardEntry> = room
            .teams
            .values()
            .map(|t| ScoreboardEntry {
                team_name: t.team_name.clone(),
                color: t.color.clone(),
                total: room.team_total(&t.team_name),
                connected: t.connected,
            })
            .collect();
        teams.sort_by(|a, b| a.team_name.cmp(&b.team_name));
        ScoreboardSnapshot {
            game_code: room.game_code.clone(),
            teams,
        }
    }
}

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum ServerMessage {
    GameState {
        state: GameStateSnapshot,
    },
    TeamGameState {
        state: TeamGameStateSnapshot,
    },
    ScoreboardData {
        state: ScoreboardSnapshot,
    },
    TimerTick {
        seconds_remaining: u32,
    },
    JoinValidated,
    Error {
        message: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        state: Option<GameStateSnapshot>,
    },
}

impl ServerMessage {
    pub fn error(message: impl Into<String>) -> Self {
        ServerMessage::Error {
            message: message.into(),
            state: None,
        }
    }

    pub fn error_with_resync(message: impl Into<String>, state: GameStateSnapshot) -> Self {
        ServerMessage::Error {
            message: message.into(),
            state: Some(state),
        }
    }
}

/// Host-only commands. Tagged on `type`; payload fields mirror the room
/// state mutators in §4.3.
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum HostAction {
    CreateGame {
        #[serde(default)]
        game_code: Option<String>,
    },
    StartTimer,
    PauseTimer,
    ResetTimer,
    NextQuestion,
    PrevQuestion,
    ScoreAnswer {
        question_number: usize,
        team_name: String,
        score: ScoreComponents,
    },
    OverrideTeamScore {
        team_name: String,
        override_points: i64,
    },
    UpdateQuestionSettings {
        question_number: usize,
        timer_duration: u32,
        question_points: i64,
        bonus_increment: i64,
        question_kind: crate::types::QuestionKind,
        question_config: crate::types::QuestionConfig,
        speed_bonus_enabled: bool,
    },
    UpdateGameSettings {
        settings: GameSettings,
    },
}

/// Team-only commands. Each variant is a single-key object
/// (`{"submitAnswer": {...}}`), per §6.
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub enum TeamAction {
    ValidateJoin {
        game_code: String,
        team_name: String,
    },
    JoinGame {
        game_code: String,
        team_name: String,
        team_members: Vec<String>,
        color: Color,
    },
    SubmitAnswer {
        content: AnswerContent,
    },
}

/// Watcher-only commands. Tagged on `type`.
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum WatcherAction {
    Subscribe { game_code: String },
}

/// Top-level inbound envelope, externally tagged by the participant kind.
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(rename_all = "lowercase")]
pub enum ClientMessage {
    Host(HostAction),
    Team(TeamAction),
    Watcher(WatcherAction),
}

/// Decode a raw inbound frame. Fails with a human-readable reason on
/// unknown variants, missing required fields, or type mismatches — the
/// caller turns this into `RoomError::MalformedMessage`.
pub fn decode_client_message(raw: &str) -> Result<ClientMessage, String> {
    serde_json::from_str(raw).map_err(|e| e.to_string())
}

pub fn encode_server_message(msg: &ServerMessage) -> String {
    serde_json::to_string(msg).expect("ServerMessage serialization is infallible")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::QuestionKind;

    #[test]
    fn decodes_host_create_game() {
        let raw = r#"{"host":{"type":"createGame","gameCode":"ABCD"}}"#;
        let msg = decode_client_message(raw).unwrap();
        assert_eq!(
            msg,
            ClientMessage::Host(HostAction::CreateGame {
                game_code: Some("ABCD".to_string())
            })
        );
    }

    #[test]
    fn decodes_host_start_timer_without_payload() {
        let raw = r#"{"host":{"type":"startTimer"}}"#;
        let msg = decode_client_message(raw).unwrap();
        assert_eq!(msg, ClientMessage::Host(HostAction::StartTimer));
    }

    #[test]
    fn decodes_team_submit_answer_as_single_key_variant() {
        let raw = r#"{"team":{"submitAnswer":{"content":{"kind":"standard","answerText":"Paris"}}}}"#;
        let msg = decode_client_message(raw).unwrap();
        assert_eq!(
            msg,
            ClientMessage::Team(TeamAction::SubmitAnswer {
                content: AnswerContent::Standard {
                    answer_text: "Paris".to_string()
                }
            })
        );
    }

    #[test]
    fn decodes_watcher_subscribe() {
        let raw = r#"{"watcher":{"type":"subscribe","gameCode":"ABCD"}}"#;
        let msg = decode_client_message(raw).unwrap();
        assert_eq!(
            msg,
            ClientMessage::Watcher(WatcherAction::Subscribe {
                game_code: "ABCD".to_string()
            })
        );
    }

    #[test]
    fn rejects_unknown_top_level_key() {
        let raw = r#"{"referee":{"type":"startTimer"}}"#;
        assert!(decode_client_message(raw).is_err());
    }

    #[test]
    fn rejects_unknown_host_action_type() {
        let raw = r#"{"host":{"type":"doSomethingElse"}}"#;
        assert!(decode_client_message(raw).is_err());
    }

    #[test]
    fn server_message_is_tagged_by_type_field() {
        let msg = ServerMessage::TimerTick {
            seconds_remaining: 12,
        };
        let json = encode_server_message(&msg);
        assert!(json.contains("\"type\":\"timerTick\""));
        assert!(json.contains("\"secondsRemaining\":12"));
    }

    #[test]
    fn error_without_state_omits_state_field() {
        let msg = ServerMessage::error("boom");
        let json = encode_server_message(&msg);
        assert!(!json.contains("\"state\""));
    }

    #[test]
    fn update_question_settings_round_trips_multiple_choice_config() {
        let raw = r#"{"host":{"type":"updateQuestionSettings","questionNumber":1,
            "timerDuration":20,"questionPoints":40,"bonusIncrement":5,
            "questionKind":"multipleChoice",
            "questionConfig":{"kind":"multipleChoice","config":{"optionCount":4}},
            "speedBonusEnabled":false}}"#;
        let msg = decode_client_message(raw).unwrap();
        match msg {
            ClientMessage::Host(HostAction::UpdateQuestionSettings {
                question_kind, ..
            }) => assert_eq!(question_kind, QuestionKind::MultipleChoice),
            other => panic!("unexpected message: {other:?}"),
        }
    }

    #[test]
    fn host_snapshot_omits_unsubmitted_answers_team_snapshot_keeps_null_content() {
        use crate::room::state::Room;

        let mut room = Room::new("ABCD".to_string());
        room.create_team(
            "Alpha",
            vec!["A".into()],
            Color {
                hex_code: "#FFA500".into(),
                name: "Orange".into(),
            },
        )
        .unwrap();
        room.create_team(
            "Beta",
            vec!["B".into()],
            Color {
                hex_code: "#0000FF".into(),
                name: "Blue".into(),
            },
        )
        .unwrap();
        room.set_timer(true, 30);
        room.record_answer(
            "Alpha",
            AnswerContent::Standard {
                answer_text: "Paris".into(),
            },
        )
        .unwrap();

        let host_view = GameStateSnapshot::from_room(&room);
        assert_eq!(host_view.questions[0].answers.len(), 1);
        assert_eq!(host_view.questions[0].answers[0].team_name, "Alpha");

        let beta_view = TeamGameStateSnapshot::from_room(&room, "Beta").unwrap();
        assert_eq!(beta_view.questions[0].answers.len(), 0);
    }
}
