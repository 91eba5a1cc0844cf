use std::time::SystemTime;

use serde::{Deserialize, Serialize};
use serde_with::{TimestampMilliSeconds, serde_as};
use uuid::Uuid;

use crate::state::state_machine::GamePhase;

/// Canonical game row: identity, round/phase cursor and table-wide markers.
#[serde_as]
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct GameEntity {
    /// Primary key of the game.
    pub id: Uuid,
    /// Display name chosen by the host.
    pub name: String,
    /// Short code other players use to join the table.
    pub join_code: String,
    /// User that created the game and holds elevated privileges.
    pub host_user_id: Uuid,
    /// Current round, starting at 1.
    pub round: u32,
    /// Current phase inside the round.
    pub phase: GamePhase,
    /// When the current phase began.
    #[serde_as(as = "TimestampMilliSeconds<i64>")]
    pub phase_started_at: SystemTime,
    /// Player holding the speaker token.
    pub speaker_id: Option<Uuid>,
    /// Player holding the custodians token of Mecatol Rex.
    pub mecatol_owner: Option<Uuid>,
    /// Monotonic cursor into the active players list during the action phase.
    pub action_turn_index: u32,
    /// Victory points needed to win.
    pub victory_point_goal: u32,
    /// Creation timestamp for auditing/debugging.
    #[serde_as(as = "TimestampMilliSeconds<i64>")]
    pub created_at: SystemTime,
    /// Last time the game row was rewritten outside of undoable commands.
    #[serde_as(as = "TimestampMilliSeconds<i64>")]
    pub updated_at: SystemTime,
}

/// Player seated at a game.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PlayerEntity {
    pub game_id: Uuid,
    pub id: Uuid,
    /// Account the player acts with.
    pub user_id: Uuid,
    pub name: String,
    pub faction: String,
    pub color: String,
    /// Seat around the table (0-based), used for speaker-relative ordering.
    pub seat: u32,
    pub victory_points: u32,
}

/// Strategy card claimed by a player for a round.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SelectionEntity {
    pub game_id: Uuid,
    pub round: u32,
    pub player_id: Uuid,
    /// Strategy card number (initiative).
    pub card: u8,
    /// 1-based pick order inside the round.
    pub order: u8,
    /// Trade goods accrued on the card when it was picked.
    pub trade_goods: u32,
}

/// Per-round counters for a player during the action phase.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ActionStateEntity {
    pub game_id: Uuid,
    pub round: u32,
    pub player_id: Uuid,
    pub tactical_actions: u32,
    pub component_actions: u32,
    pub strategy_card_used: bool,
    pub passed: bool,
}

impl ActionStateEntity {
    /// Fresh counters for a player entering the action phase.
    pub fn fresh(game_id: Uuid, round: u32, player_id: Uuid) -> Self {
        Self {
            game_id,
            round,
            player_id,
            tactical_actions: 0,
            component_actions: 0,
            strategy_card_used: false,
            passed: false,
        }
    }
}

/// Scoring stage of an objective.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, utoipa::ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum ObjectiveStage {
    StageOne,
    StageTwo,
    Secret,
}

/// Objective revealed during the game and the players that scored it.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ObjectiveEntity {
    pub game_id: Uuid,
    pub id: Uuid,
    pub name: String,
    pub stage: ObjectiveStage,
    pub points: u32,
    pub scored_by: Vec<Uuid>,
}

/// Accumulated turn time of a player.
#[serde_as]
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TimerEntity {
    pub game_id: Uuid,
    pub player_id: Uuid,
    pub elapsed_ms: u64,
    #[serde_as(as = "Option<TimestampMilliSeconds<i64>>")]
    pub running_since: Option<SystemTime>,
}

/// Every row belonging to one game, as loaded from storage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GameRecord {
    pub game: GameEntity,
    pub players: Vec<PlayerEntity>,
    pub selections: Vec<SelectionEntity>,
    pub action_states: Vec<ActionStateEntity>,
    pub objectives: Vec<ObjectiveEntity>,
    pub timers: Vec<TimerEntity>,
}

/// A single row of any table, tagged with the table it belongs to.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "table", content = "row", rename_all = "snake_case")]
pub enum RowEntity {
    Game(GameEntity),
    Player(PlayerEntity),
    /// Strategy pick made during the running strategy phase; not persisted.
    DraftPick(SelectionEntity),
    Selection(SelectionEntity),
    ActionState(ActionStateEntity),
    Objective(ObjectiveEntity),
    Timer(TimerEntity),
}

impl RowEntity {
    /// Whether the row is written to the persistent store.
    pub fn is_persistent(&self) -> bool {
        !matches!(self, RowEntity::DraftPick(_))
    }

    /// Game the row belongs to.
    pub fn game_id(&self) -> Uuid {
        match self {
            RowEntity::Game(game) => game.id,
            RowEntity::Player(player) => player.game_id,
            RowEntity::DraftPick(selection) | RowEntity::Selection(selection) => {
                selection.game_id
            }
            RowEntity::ActionState(state) => state.game_id,
            RowEntity::Objective(objective) => objective.game_id,
            RowEntity::Timer(timer) => timer.game_id,
        }
    }
}

/// Kind of row-level change delivered on the realtime feed.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ChangeOp {
    Insert,
    Update,
    Delete,
}

/// Row-level insert/update/delete notification.
///
/// For deletions the row carries the last known contents so consumers can
/// derive its key.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ChangeEvent {
    pub op: ChangeOp,
    #[serde(flatten)]
    pub row: RowEntity,
}

impl ChangeEvent {
    pub fn insert(row: RowEntity) -> Self {
        Self {
            op: ChangeOp::Insert,
            row,
        }
    }

    pub fn update(row: RowEntity) -> Self {
        Self {
            op: ChangeOp::Update,
            row,
        }
    }

    pub fn delete(row: RowEntity) -> Self {
        Self {
            op: ChangeOp::Delete,
            row,
        }
    }
}

impl GameRecord {
    /// Insert events reproducing the whole record, used when creating a game.
    pub fn into_inserts(self) -> Vec<ChangeEvent> {
        let GameRecord {
            game,
            players,
            selections,
            action_states,
            objectives,
            timers,
        } = self;

        std::iter::once(RowEntity::Game(game))
            .chain(players.into_iter().map(RowEntity::Player))
            .chain(selections.into_iter().map(RowEntity::Selection))
            .chain(action_states.into_iter().map(RowEntity::ActionState))
            .chain(objectives.into_iter().map(RowEntity::Objective))
            .chain(timers.into_iter().map(RowEntity::Timer))
            .map(ChangeEvent::insert)
            .collect()
    }
}

/// Row key of a selection or action state, unique per game.
pub fn round_player_key(round: u32, player_id: Uuid) -> String {
    format!("{round}:{player_id}")
}
