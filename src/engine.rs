//! Session state management.
//!
//! Holds the current board position, the policy engine, the defensive
//! evaluator and the move selector for one agent process, and answers the
//! line protocol commands.

use std::io::{self, Write};

use log::{info, warn};

use crate::board::piece::Color;
use crate::board::state::BoardState;
use crate::board::threats::DiagonalThreats;
use crate::config::AgentConfig;
use crate::eval::defense::{DefenseSnapshot, DefensiveEvaluator};
use crate::eval::neural::{EngineError, ModelFetcher, ModelLoader, PolicyEngine};
use crate::protocol::parser::GoParams;
use crate::search::selector::{MoveSelector, SelectionSource};

/// Plies between two of our own `go` requests: ours, then the opponent's.
const PLIES_PER_TURN: u32 = 2;

/// Holds the mutable state of the agent between commands.
pub struct Session {
    config: AgentConfig,
    policy: PolicyEngine,
    defense: DefensiveEvaluator,
    selector: MoveSelector,
    position: Option<BoardState>,
    /// Ply number assumed by the next `go` that omits `movenumber`.
    next_move_number: u32,
}

impl Session {
    /// Creates a session with an unloaded policy engine.
    pub fn new(config: AgentConfig) -> Self {
        Self::with_policy(config, PolicyEngine::new())
    }

    /// Creates a session around an existing policy engine.
    pub fn with_policy(config: AgentConfig, policy: PolicyEngine) -> Self {
        let defense = DefensiveEvaluator::new(config.side, config.defense.clone());
        let selector = MoveSelector::new(&config.selector);
        Session {
            config,
            policy,
            defense,
            selector,
            position: None,
            next_move_number: 0,
        }
    }

    pub fn config(&self) -> &AgentConfig {
        &self.config
    }

    pub fn policy(&self) -> &PolicyEngine {
        &self.policy
    }

    pub fn defense(&self) -> &DefensiveEvaluator {
        &self.defense
    }

    pub fn position(&self) -> Option<&BoardState> {
        self.position.as_ref()
    }

    /// Resets position and defensive history for a new game. The loaded
    /// model is kept.
    pub fn new_game(&mut self) {
        self.position = None;
        self.next_move_number = 0;
        self.defense.reset();
    }

    /// Sets the current board from the host's JSON grid.
    /// Returns an error message on failure.
    pub fn set_position(&mut self, json: &str) -> Result<(), String> {
        match BoardState::from_json(json) {
            Ok(board) => {
                self.position = Some(board);
                Ok(())
            }
            Err(e) => Err(format!("failed to parse board: {}", e)),
        }
    }

    /// Applies a `setoption`. Unknown names and bad values are logged and
    /// ignored.
    pub fn set_option(&mut self, name: &str, value: Option<String>) {
        match name {
            "ManifestUrl" => self.config.inference.manifest_url = value,
            "ModelUrl" => self.config.inference.model_url = value,
            "EvalInterval" => match value.as_deref().map(str::parse::<u32>) {
                Some(Ok(n)) => {
                    self.config.defense.interval = n;
                    self.defense.config_mut().interval = n;
                }
                _ => warn!("invalid EvalInterval: {:?}", value),
            },
            "Side" => match value.as_deref().and_then(Color::from_name) {
                Some(side) => {
                    self.config.side = side;
                    self.defense.set_side(side);
                }
                None => warn!("invalid Side: {:?}", value),
            },
            "Exploration" => match value.as_deref().map(str::parse::<f64>) {
                Some(Ok(rate)) if (0.0..=1.0).contains(&rate) => {
                    self.config.selector.exploration_rate = rate;
                    self.selector.set_exploration_rate(rate);
                }
                _ => warn!("invalid Exploration: {:?}", value),
            },
            other => warn!("unknown option: {}", other),
        }
    }

    /// Handles the `isready` command.
    pub fn handle_isready<W: Write>(&self, out: &mut W) -> io::Result<()> {
        writeln!(out, "readyok")?;
        out.flush()
    }

    /// Handles the `load` command using HTTP and ONNX Runtime.
    pub async fn handle_load<W: Write>(&mut self, out: &mut W) -> io::Result<()> {
        let result = self.policy.initialize(&self.config.inference).await;
        self.report_load(result, out)
    }

    /// [`Session::handle_load`] with an explicit fetcher and loader.
    pub async fn handle_load_with<F: ModelFetcher, L: ModelLoader, W: Write>(
        &mut self,
        fetcher: &F,
        loader: &L,
        out: &mut W,
    ) -> io::Result<()> {
        let result = self
            .policy
            .initialize_with(&self.config.inference, fetcher, loader)
            .await;
        self.report_load(result, out)
    }

    fn report_load<W: Write>(
        &self,
        result: Result<(), EngineError>,
        out: &mut W,
    ) -> io::Result<()> {
        match result {
            Ok(()) => writeln!(out, "loadok {}", self.policy.model_url().unwrap_or("-"))?,
            Err(e) => writeln!(out, "loadfailed {}", e)?,
        }
        out.flush()
    }

    /// Handles the `go` command: optional defensive evaluation, then move
    /// selection.
    pub fn handle_go<W: Write>(&mut self, params: &GoParams, out: &mut W) -> io::Result<()> {
        let move_number = params.move_number.unwrap_or(self.next_move_number);
        self.next_move_number = move_number.saturating_add(PLIES_PER_TURN);

        if self.defense.is_due(move_number) {
            if let Some(snapshot) = self.evaluate(move_number) {
                writeln!(out, "info defense {}", snapshot_json(&snapshot))?;
            }
        }

        let empty;
        let board = match &self.position {
            Some(b) => b,
            None => {
                warn!("go: no position set, scoring an empty board");
                empty = BoardState::empty();
                &empty
            }
        };

        match self.selector.select(&self.policy, board, &params.moves) {
            Ok(selection) => {
                if let SelectionSource::Fallback(_) = selection.source {
                    info!("move {}: {}", move_number, selection.source);
                }
                writeln!(out, "bestmove {}", selection.descriptor)?;
            }
            Err(e) => {
                warn!("go: {}", e);
                writeln!(out, "bestmove none")?;
            }
        }
        out.flush()
    }

    /// Handles the `eval` command.
    pub fn handle_eval<W: Write>(
        &mut self,
        move_number: Option<u32>,
        out: &mut W,
    ) -> io::Result<()> {
        let move_number = move_number.unwrap_or(self.next_move_number);
        match self.evaluate(move_number) {
            Some(snapshot) => writeln!(out, "defense {}", snapshot_json(&snapshot))?,
            None => writeln!(out, "defense none")?,
        }
        out.flush()
    }

    /// Handles the `history` command.
    pub fn handle_history<W: Write>(&self, out: &mut W) -> io::Result<()> {
        let threshold = self.defense.config().trend_threshold;
        match self.defense.history().summary(threshold) {
            Some(summary) => match serde_json::to_string(&summary) {
                Ok(json) => writeln!(out, "history {}", json)?,
                Err(e) => {
                    warn!("history: {}", e);
                    writeln!(out, "history none")?;
                }
            },
            None => writeln!(out, "history none")?,
        }
        out.flush()
    }

    fn evaluate(&mut self, move_number: u32) -> Option<DefenseSnapshot> {
        let board = match &self.position {
            Some(b) => b,
            None => {
                warn!("eval: no position set");
                return None;
            }
        };
        let query = DiagonalThreats::new(board);
        Some(self.defense.evaluate(&query, move_number).clone())
    }
}

fn snapshot_json(snapshot: &DefenseSnapshot) -> String {
    serde_json::to_string(snapshot).unwrap_or_else(|e| {
        warn!("cannot serialize snapshot: {}", e);
        "{}".to_string()
    })
}
