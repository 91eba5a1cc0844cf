//! Request bodies of in-game commands.
//!
//! `player_id` fields default to the seat of the requesting user; the host may
//! name any seat to drive the table from a shared screen.

use serde::Deserialize;
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use crate::{
    dao::models::ObjectiveStage, dto::validation::validate_not_blank, state::action::ActionKind,
};

/// Action named in `/games/{id}/actions/{kind}`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, ToSchema)]
#[serde(rename_all = "kebab-case")]
pub enum ActionPath {
    Tactical,
    Component,
    StrategyCard,
    Pass,
}

impl From<ActionPath> for ActionKind {
    fn from(path: ActionPath) -> Self {
        match path {
            ActionPath::Tactical => ActionKind::Tactical,
            ActionPath::Component => ActionKind::Component,
            ActionPath::StrategyCard => ActionKind::StrategyCard,
            ActionPath::Pass => ActionKind::Pass,
        }
    }
}

#[derive(Debug, Deserialize, ToSchema, Validate)]
pub struct PickCardRequest {
    #[serde(default)]
    pub player_id: Option<Uuid>,
    #[validate(range(min = 1, max = 99))]
    pub card: u8,
}

#[derive(Debug, Default, Deserialize, ToSchema, Validate)]
pub struct ActionRequest {
    #[serde(default)]
    pub player_id: Option<Uuid>,
}

#[derive(Debug, Deserialize, ToSchema, Validate)]
pub struct SpeakerRequest {
    /// New speaker; `null` clears the token.
    pub player_id: Option<Uuid>,
}

#[derive(Debug, Deserialize, ToSchema, Validate)]
pub struct CreateObjectiveRequest {
    #[validate(length(min = 1, max = 96), custom(function = "validate_not_blank"))]
    pub name: String,
    pub stage: ObjectiveStage,
    #[validate(range(min = 1, max = 5))]
    pub points: u32,
}

#[derive(Debug, Deserialize, ToSchema, Validate)]
pub struct ToggleObjectiveRequest {
    #[serde(default)]
    pub player_id: Option<Uuid>,
}

#[derive(Debug, Deserialize, ToSchema, Validate)]
pub struct MecatolRequest {
    /// New custodian; `null` returns the token to the board.
    pub player_id: Option<Uuid>,
}

#[derive(Debug, Deserialize, ToSchema, Validate)]
pub struct ScoreRequest {
    #[serde(default)]
    pub player_id: Option<Uuid>,
    #[validate(range(max = 99))]
    pub victory_points: u32,
}
