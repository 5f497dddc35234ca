// Personal ranking editor: the in-memory ordered top 10 for one session.
//
// The list `order` holds at most MAX_SLOTS distinct player ids; index + 1 is
// the slot position written on save. Display records live in a side map so
// hydrated ids can be filled in from the catalog later.
//
// All list operations are synchronous and either apply fully or fail with no
// change. `save` is the only operation that touches the store.

use std::collections::{HashMap, HashSet};

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::error::RankingError;
use crate::model::{Player, PlayerId, RankingSlot, UserId, MAX_SLOTS};
use crate::session::Session;
use crate::store::{RankingStore, ReplaceError};

// ---------------------------------------------------------------------------
// Policy
// ---------------------------------------------------------------------------

/// Whether a save requires a complete list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LengthPolicy {
    /// Any list of 0 to 10 players can be saved.
    #[default]
    Permissive,
    /// Only a full list of 10 players can be saved.
    Strict,
}

/// What `add` does when the list is already full.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FullListPolicy {
    /// Hold the player as a candidate until the user picks a slot to overwrite.
    #[default]
    ReplaceWithPlacement,
    /// Reject the add; the user must remove someone first.
    AppendOnly,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct EditorPolicy {
    #[serde(default)]
    pub length: LengthPolicy,
    #[serde(default)]
    pub full_list: FullListPolicy,
}

// ---------------------------------------------------------------------------
// State
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
pub enum EditorState {
    Editing,
    /// An 11th player was chosen and is waiting for a slot.
    AwaitingPlacement { candidate: Player },
}

/// Result of a successful `add`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AddOutcome {
    /// Appended at this 1-based position.
    Appended { position: usize },
    /// The list was full; the player is now the pending candidate.
    AwaitingPlacement,
}

/// Result of a successful `assign`.
#[derive(Debug, Clone, PartialEq)]
pub struct Placement {
    pub position: usize,
    /// The player previously in that slot, now dropped from the list.
    pub displaced: Option<PlayerId>,
}

/// Everything the store needs to perform one save.
#[derive(Debug, Clone, PartialEq)]
pub struct SaveRequest {
    pub user_id: UserId,
    pub slots: Vec<RankingSlot>,
    /// List revision at the moment the save was issued.
    pub revision: u64,
}

/// How a completed save was reconciled with the in-memory list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SaveOutcome {
    /// The list was re-hydrated from the store.
    Synced,
    /// The list was edited while the save was running; the newer local list
    /// was kept and is not yet saved.
    KeptLocalEdits,
}

/// A ranked entry for display.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RankedEntry {
    pub position: usize,
    pub player_id: PlayerId,
    pub player: Option<Player>,
}

/// Read-only view of the editor for rendering.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct EditorSnapshot {
    pub entries: Vec<RankedEntry>,
    pub candidate: Option<Player>,
    pub saving: bool,
    /// True when the list differs from what was last loaded or saved.
    pub dirty: bool,
    pub signed_in_as: Option<String>,
    pub policy: EditorPolicy,
}

// ---------------------------------------------------------------------------
// RankingEditor
// ---------------------------------------------------------------------------

pub struct RankingEditor {
    session: Option<Session>,
    policy: EditorPolicy,
    order: Vec<PlayerId>,
    players: HashMap<PlayerId, Player>,
    state: EditorState,
    /// Bumped on every change to `order`.
    revision: u64,
    /// Revision that matches the store, if known.
    synced_revision: Option<u64>,
    saving: bool,
}

impl RankingEditor {
    /// Create an empty editor bound to `session` (or signed out).
    pub fn new(session: Option<Session>, policy: EditorPolicy) -> Self {
        RankingEditor {
            session,
            policy,
            order: Vec::new(),
            players: HashMap::new(),
            state: EditorState::Editing,
            revision: 0,
            synced_revision: None,
            saving: false,
        }
    }

    pub fn session(&self) -> Option<&Session> {
        self.session.as_ref()
    }

    pub fn policy(&self) -> EditorPolicy {
        self.policy
    }

    pub fn state(&self) -> &EditorState {
        &self.state
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    pub fn is_full(&self) -> bool {
        self.order.len() >= MAX_SLOTS
    }

    pub fn contains(&self, id: &PlayerId) -> bool {
        self.order.contains(id)
    }

    /// Ordered player ids; index + 1 is the slot position.
    pub fn player_ids(&self) -> &[PlayerId] {
        &self.order
    }

    pub fn revision(&self) -> u64 {
        self.revision
    }

    pub fn is_saving(&self) -> bool {
        self.saving
    }

    pub fn is_dirty(&self) -> bool {
        self.synced_revision != Some(self.revision)
    }

    /// Replace the list with the persisted slots, ordered by position.
    ///
    /// Rows without a player are dropped, and a player appearing twice keeps
    /// only its first (lowest) position.
    pub fn hydrate(&mut self, slots: &[RankingSlot]) {
        let mut sorted: Vec<&RankingSlot> = slots.iter().collect();
        sorted.sort_by_key(|s| s.position);

        let mut seen = HashSet::new();
        let mut order = Vec::with_capacity(MAX_SLOTS);
        for slot in sorted {
            let Some(id) = slot.player_id.as_ref() else {
                continue;
            };
            if !seen.insert(id.clone()) {
                warn!(player_id = %id, position = slot.position, "Duplicate player in stored ranking, keeping first");
                continue;
            }
            order.push(id.clone());
        }
        if order.len() > MAX_SLOTS {
            warn!(rows = order.len(), "Stored ranking exceeds {MAX_SLOTS} players, truncating");
            order.truncate(MAX_SLOTS);
        }

        let candidate_listed = matches!(
            &self.state,
            EditorState::AwaitingPlacement { candidate } if order.contains(&candidate.id)
        );
        if candidate_listed {
            self.state = EditorState::Editing;
        }

        debug!(players = order.len(), "Editor hydrated");
        self.order = order;
        self.prune_details();
        self.revision += 1;
        self.synced_revision = Some(self.revision);
    }

    /// Record display details for listed players, e.g. after hydrating bare
    /// ids. Players not in the list are ignored.
    pub fn remember(&mut self, players: impl IntoIterator<Item = Player>) {
        for p in players {
            if self.order.contains(&p.id) {
                self.players.insert(p.id.clone(), p);
            }
        }
    }

    /// Keep display details only for listed players and the pending candidate.
    fn prune_details(&mut self) {
        let candidate = match &self.state {
            EditorState::AwaitingPlacement { candidate } => Some(&candidate.id),
            EditorState::Editing => None,
        };
        let order = &self.order;
        self.players
            .retain(|id, _| order.contains(id) || candidate == Some(id));
    }

    /// Ids in the list that have no display record yet.
    pub fn missing_details(&self) -> Vec<PlayerId> {
        self.order
            .iter()
            .filter(|id| !self.players.contains_key(*id))
            .cloned()
            .collect()
    }

    /// Add a player to the end of the list, or hold it as the placement
    /// candidate when the list is full.
    ///
    /// Adding while another candidate is pending replaces that candidate.
    pub fn add(&mut self, player: Player) -> Result<AddOutcome, RankingError> {
        if self.contains(&player.id) {
            return Err(RankingError::DuplicatePlayer(player.id));
        }

        if !self.is_full() {
            self.order.push(player.id.clone());
            self.players.insert(player.id.clone(), player);
            self.revision += 1;
            return Ok(AddOutcome::Appended {
                position: self.order.len(),
            });
        }

        match self.policy.full_list {
            FullListPolicy::AppendOnly => Err(RankingError::ListFull),
            FullListPolicy::ReplaceWithPlacement => {
                debug!(player_id = %player.id, "List full, awaiting placement");
                self.players.insert(player.id.clone(), player.clone());
                self.state = EditorState::AwaitingPlacement { candidate: player };
                self.prune_details();
                Ok(AddOutcome::AwaitingPlacement)
            }
        }
    }

    /// Put the pending candidate into the 1-based `position`, overwriting
    /// its occupant. A position past the end of a shortened list appends.
    pub fn assign(&mut self, position: usize) -> Result<Placement, RankingError> {
        let EditorState::AwaitingPlacement { candidate } = &self.state else {
            return Err(RankingError::NoPendingCandidate);
        };
        if position == 0 || position > MAX_SLOTS {
            return Err(RankingError::PositionOutOfRange(position));
        }
        let candidate_id = candidate.id.clone();

        self.order.retain(|id| *id != candidate_id);
        let idx = position - 1;
        let (placed_at, displaced) = if idx < self.order.len() {
            let previous = std::mem::replace(&mut self.order[idx], candidate_id);
            (position, Some(previous))
        } else {
            self.order.push(candidate_id);
            (self.order.len(), None)
        };
        debug_assert!(self.order.len() <= MAX_SLOTS);

        self.state = EditorState::Editing;
        self.prune_details();
        self.revision += 1;
        Ok(Placement {
            position: placed_at,
            displaced,
        })
    }

    /// Discard the pending candidate. Returns it, or `None` if nothing was pending.
    pub fn cancel(&mut self) -> Option<Player> {
        match std::mem::replace(&mut self.state, EditorState::Editing) {
            EditorState::AwaitingPlacement { candidate } => {
                self.prune_details();
                Some(candidate)
            }
            EditorState::Editing => None,
        }
    }

    /// Remove a player if present. Returns whether anything changed.
    pub fn remove(&mut self, id: &PlayerId) -> bool {
        let before = self.order.len();
        self.order.retain(|p| p != id);
        let removed = self.order.len() != before;
        if removed {
            self.players.remove(id);
            self.revision += 1;
        }
        removed
    }

    /// Move the entry at `from` to `to`, shifting the entries in between.
    pub fn reorder(&mut self, from: usize, to: usize) -> Result<(), RankingError> {
        let len = self.order.len();
        if from >= len || to >= len {
            return Err(RankingError::IndexOutOfRange { from, to, len });
        }
        if from == to {
            return Ok(());
        }
        let id = self.order.remove(from);
        self.order.insert(to, id);
        self.revision += 1;
        Ok(())
    }

    /// Slots for the current list, `position = index + 1`.
    pub fn slots_for(&self, user_id: &UserId) -> Vec<RankingSlot> {
        self.order
            .iter()
            .enumerate()
            .map(|(i, id)| RankingSlot::new(user_id.clone(), (i + 1) as u8, id.clone()))
            .collect()
    }

    /// Validate preconditions and mark a save as in flight.
    pub fn begin_save(&mut self) -> Result<SaveRequest, RankingError> {
        let Some(session) = self.session.as_ref() else {
            return Err(RankingError::NotAuthenticated);
        };
        if self.saving {
            return Err(RankingError::SaveInProgress);
        }
        if self.policy.length == LengthPolicy::Strict && self.order.len() != MAX_SLOTS {
            return Err(RankingError::IncompleteList {
                len: self.order.len(),
            });
        }

        let user_id = session.user_id.clone();
        let slots = self.slots_for(&user_id);
        self.saving = true;
        Ok(SaveRequest {
            user_id,
            slots,
            revision: self.revision,
        })
    }

    /// Apply the result of a save started with `begin_save`.
    ///
    /// On failure the list is left exactly as it is.
    pub fn finish_save(
        &mut self,
        revision: u64,
        result: Result<Vec<RankingSlot>, RankingError>,
    ) -> Result<SaveOutcome, RankingError> {
        self.saving = false;
        let stored = result?;
        if revision == self.revision {
            self.hydrate(&stored);
            Ok(SaveOutcome::Synced)
        } else {
            info!(
                saved_revision = revision,
                current_revision = self.revision,
                "List edited during save, keeping local edits"
            );
            Ok(SaveOutcome::KeptLocalEdits)
        }
    }

    /// Save the whole list to `store` and reconcile with what it returns.
    pub async fn save(&mut self, store: &dyn RankingStore) -> Result<SaveOutcome, RankingError> {
        let request = self.begin_save()?;
        let result = execute_save(store, &request).await;
        self.finish_save(request.revision, result)
    }

    pub fn snapshot(&self) -> EditorSnapshot {
        let entries = self
            .order
            .iter()
            .enumerate()
            .map(|(i, id)| RankedEntry {
                position: i + 1,
                player_id: id.clone(),
                player: self.players.get(id).cloned(),
            })
            .collect();
        let candidate = match &self.state {
            EditorState::AwaitingPlacement { candidate } => Some(candidate.clone()),
            EditorState::Editing => None,
        };
        EditorSnapshot {
            entries,
            candidate,
            saving: self.saving,
            dirty: self.is_dirty(),
            signed_in_as: self.session.as_ref().map(|s| s.email.clone()),
            policy: self.policy,
        }
    }
}

/// Run the store side of a save: replace the user's rows, then read them back.
///
/// Runs without holding the editor so local edits can continue meanwhile.
pub async fn execute_save(
    store: &dyn RankingStore,
    request: &SaveRequest,
) -> Result<Vec<RankingSlot>, RankingError> {
    info!(user_id = %request.user_id, players = request.slots.len(), "Saving rankings");
    store
        .replace_all(&request.user_id, &request.slots)
        .await
        .map_err(|e| match e {
            ReplaceError::Unchanged(source) => RankingError::StoreUnavailable(source),
            ReplaceError::Cleared(source) => RankingError::PartialSave(source),
        })?;

    match store.read_all(&request.user_id).await {
        Ok(stored) => Ok(stored),
        Err(e) => {
            // The write went through; fall back to what was submitted.
            warn!(error = %e, "Saved rankings could not be re-read");
            Ok(request.slots.clone())
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::StoreError;
    use async_trait::async_trait;
    use std::sync::Mutex;

    fn player(id: &str) -> Player {
        Player {
            id: PlayerId::new(id),
            name: format!("Player {id}"),
            team: None,
            position: None,
            image_url: None,
        }
    }

    fn session() -> Session {
        Session::from_email("fan@example.com").unwrap()
    }

    fn editor_with(n: usize) -> RankingEditor {
        let mut ed = RankingEditor::new(Some(session()), EditorPolicy::default());
        for i in 1..=n {
            ed.add(player(&format!("p{i}"))).unwrap();
        }
        ed
    }

    fn ids(ed: &RankingEditor) -> Vec<&str> {
        ed.player_ids().iter().map(|p| p.as_str()).collect()
    }

    #[test]
    fn add_appends_until_full() {
        let mut ed = editor_with(0);
        assert_eq!(
            ed.add(player("a")).unwrap(),
            AddOutcome::Appended { position: 1 }
        );
        assert_eq!(
            ed.add(player("b")).unwrap(),
            AddOutcome::Appended { position: 2 }
        );
        assert_eq!(ids(&ed), ["a", "b"]);
        assert_eq!(ed.state(), &EditorState::Editing);
    }

    #[test]
    fn add_duplicate_is_rejected_without_change() {
        for n in [1, 5, 10] {
            let mut ed = editor_with(n);
            let before = ed.player_ids().to_vec();
            let revision = ed.revision();
            let err = ed.add(player("p1")).unwrap_err();
            assert!(matches!(err, RankingError::DuplicatePlayer(ref id) if id.as_str() == "p1"));
            assert_eq!(ed.player_ids(), before.as_slice());
            assert_eq!(ed.revision(), revision);
            assert_eq!(ed.state(), &EditorState::Editing);
        }
    }

    #[test]
    fn add_when_full_awaits_placement_and_assign_overwrites_slot() {
        let mut ed = editor_with(10);
        let before = ed.player_ids().to_vec();

        assert_eq!(ed.add(player("new")).unwrap(), AddOutcome::AwaitingPlacement);
        assert_eq!(ed.player_ids(), before.as_slice());
        assert!(matches!(ed.state(), EditorState::AwaitingPlacement { .. }));

        let placement = ed.assign(5).unwrap();
        assert_eq!(placement.position, 5);
        assert_eq!(placement.displaced, Some(PlayerId::new("p5")));
        assert_eq!(ed.player_ids()[4].as_str(), "new");
        assert!(!ed.contains(&PlayerId::new("p5")));
        assert_eq!(ed.len(), 10);
        assert_eq!(ed.state(), &EditorState::Editing);
    }

    #[test]
    fn append_only_policy_rejects_add_when_full() {
        let mut ed = RankingEditor::new(
            Some(session()),
            EditorPolicy {
                full_list: FullListPolicy::AppendOnly,
                ..EditorPolicy::default()
            },
        );
        for i in 1..=10 {
            ed.add(player(&format!("p{i}"))).unwrap();
        }
        assert!(matches!(ed.add(player("x")), Err(RankingError::ListFull)));
        assert_eq!(ed.state(), &EditorState::Editing);
    }

    #[test]
    fn assign_without_candidate_fails() {
        let mut ed = editor_with(3);
        assert!(matches!(ed.assign(1), Err(RankingError::NoPendingCandidate)));
    }

    #[test]
    fn assign_out_of_range_keeps_candidate_pending() {
        let mut ed = editor_with(10);
        ed.add(player("new")).unwrap();
        assert!(matches!(ed.assign(0), Err(RankingError::PositionOutOfRange(0))));
        assert!(matches!(ed.assign(11), Err(RankingError::PositionOutOfRange(11))));
        assert!(matches!(ed.state(), EditorState::AwaitingPlacement { .. }));
    }

    #[test]
    fn assign_past_end_of_shortened_list_appends() {
        let mut ed = editor_with(10);
        ed.add(player("new")).unwrap();
        ed.remove(&PlayerId::new("p10"));
        ed.remove(&PlayerId::new("p9"));
        let placement = ed.assign(10).unwrap();
        assert_eq!(placement.position, 9);
        assert_eq!(placement.displaced, None);
        assert_eq!(ids(&ed).last(), Some(&"new"));
    }

    #[test]
    fn cancel_discards_candidate_without_mutation() {
        let mut ed = editor_with(10);
        let before = ed.player_ids().to_vec();
        ed.add(player("new")).unwrap();
        let cancelled = ed.cancel().unwrap();
        assert_eq!(cancelled.id.as_str(), "new");
        assert_eq!(ed.player_ids(), before.as_slice());
        assert_eq!(ed.state(), &EditorState::Editing);
        assert_eq!(ed.cancel(), None);
    }

    #[test]
    fn add_while_pending_replaces_candidate() {
        let mut ed = editor_with(10);
        ed.add(player("first")).unwrap();
        ed.add(player("second")).unwrap();
        match ed.state() {
            EditorState::AwaitingPlacement { candidate } => assert_eq!(candidate.id.as_str(), "second"),
            other => panic!("expected AwaitingPlacement, got {other:?}"),
        }
    }

    #[test]
    fn no_sequence_of_add_and_assign_breaks_uniqueness_or_length() {
        let mut ed = editor_with(0);
        // Deterministic pseudo-random walk over a pool of 15 players.
        let mut seed: u32 = 7;
        for _ in 0..500 {
            seed = seed.wrapping_mul(1_103_515_245).wrapping_add(12_345);
            let pick = format!("p{}", (seed >> 16) % 15);
            let _ = ed.add(player(&pick));
            if matches!(ed.state(), EditorState::AwaitingPlacement { .. }) {
                let slot = ((seed >> 8) % 10 + 1) as usize;
                ed.assign(slot).unwrap();
            }
            let unique: HashSet<_> = ed.player_ids().iter().collect();
            assert_eq!(unique.len(), ed.len());
            assert!(ed.len() <= MAX_SLOTS);
        }
    }

    #[test]
    fn remove_is_idempotent() {
        let mut ed = editor_with(4);
        assert!(ed.remove(&PlayerId::new("p2")));
        let once = ed.player_ids().to_vec();
        assert!(!ed.remove(&PlayerId::new("p2")));
        assert_eq!(ed.player_ids(), once.as_slice());
        assert_eq!(ids(&ed), ["p1", "p3", "p4"]);
    }

    #[test]
    fn remove_unknown_is_noop() {
        let mut ed = editor_with(2);
        let revision = ed.revision();
        assert!(!ed.remove(&PlayerId::new("ghost")));
        assert_eq!(ed.revision(), revision);
    }

    #[test]
    fn reorder_moves_and_shifts() {
        let mut ed = editor_with(5);
        ed.reorder(0, 3).unwrap();
        assert_eq!(ids(&ed), ["p2", "p3", "p4", "p1", "p5"]);
        ed.reorder(4, 0).unwrap();
        assert_eq!(ids(&ed), ["p5", "p2", "p3", "p4", "p1"]);
    }

    #[test]
    fn reorder_is_a_permutation() {
        for from in 0..6 {
            for to in 0..6 {
                let mut ed = editor_with(6);
                let mut before: Vec<_> = ed.player_ids().to_vec();
                ed.reorder(from, to).unwrap();
                let mut after: Vec<_> = ed.player_ids().to_vec();
                before.sort();
                after.sort();
                assert_eq!(before, after, "reorder({from}, {to})");
            }
        }
    }

    #[test]
    fn reorder_same_index_is_noop() {
        let mut ed = editor_with(3);
        let revision = ed.revision();
        ed.reorder(1, 1).unwrap();
        assert_eq!(ids(&ed), ["p1", "p2", "p3"]);
        assert_eq!(ed.revision(), revision);
    }

    #[test]
    fn reorder_out_of_range_is_rejected() {
        let mut ed = editor_with(3);
        let err = ed.reorder(1, 3).unwrap_err();
        assert!(matches!(
            err,
            RankingError::IndexOutOfRange { from: 1, to: 3, len: 3 }
        ));
        assert_eq!(ids(&ed), ["p1", "p2", "p3"]);
        assert!(ed.reorder(0, 0).is_ok());
        assert!(editor_with(0).reorder(0, 0).is_err());
    }

    #[test]
    fn hydrate_sorts_drops_nulls_and_dedupes() {
        let user = UserId::new("u");
        let slots = vec![
            RankingSlot::new(user.clone(), 3, PlayerId::new("c")),
            RankingSlot {
                user_id: user.clone(),
                position: 2,
                player_id: None,
            },
            RankingSlot::new(user.clone(), 1, PlayerId::new("a")),
            RankingSlot::new(user.clone(), 4, PlayerId::new("a")),
            RankingSlot::new(user, 5, PlayerId::new("e")),
        ];
        let mut ed = editor_with(2);
        ed.hydrate(&slots);
        assert_eq!(ids(&ed), ["a", "c", "e"]);
        assert!(!ed.is_dirty());
    }

    #[test]
    fn hydrated_ids_report_missing_details() {
        let mut ed = RankingEditor::new(Some(session()), EditorPolicy::default());
        let user = UserId::new("u");
        ed.hydrate(&[
            RankingSlot::new(user.clone(), 1, PlayerId::new("a")),
            RankingSlot::new(user, 2, PlayerId::new("b")),
        ]);
        assert_eq!(ed.missing_details().len(), 2);
        ed.remember([player("a")]);
        assert_eq!(ed.missing_details(), vec![PlayerId::new("b")]);
        let snap = ed.snapshot();
        assert_eq!(snap.entries[0].player.as_ref().map(|p| p.name.as_str()), Some("Player a"));
        assert!(snap.entries[1].player.is_none());
    }

    #[test]
    fn begin_save_requires_session() {
        let mut ed = RankingEditor::new(None, EditorPolicy::default());
        ed.add(player("a")).unwrap();
        assert!(matches!(ed.begin_save(), Err(RankingError::NotAuthenticated)));
        assert!(!ed.is_saving());
    }

    #[test]
    fn strict_policy_requires_full_list() {
        let mut ed = RankingEditor::new(
            Some(session()),
            EditorPolicy {
                length: LengthPolicy::Strict,
                ..EditorPolicy::default()
            },
        );
        ed.add(player("a")).unwrap();
        assert!(matches!(
            ed.begin_save(),
            Err(RankingError::IncompleteList { len: 1 })
        ));
    }

    #[test]
    fn overlapping_save_is_rejected() {
        let mut ed = editor_with(3);
        let request = ed.begin_save().unwrap();
        assert_eq!(request.slots.len(), 3);
        assert_eq!(request.slots[2].position, 3);
        assert!(matches!(ed.begin_save(), Err(RankingError::SaveInProgress)));
        ed.finish_save(request.revision, Ok(request.slots.clone())).unwrap();
        assert!(ed.begin_save().is_ok());
    }

    #[test]
    fn failed_save_leaves_list_untouched() {
        let mut ed = editor_with(3);
        let before = ed.player_ids().to_vec();
        let request = ed.begin_save().unwrap();
        let err = ed
            .finish_save(
                request.revision,
                Err(RankingError::PartialSave(StoreError::Other("insert timed out".into()))),
            )
            .unwrap_err();
        assert!(matches!(err, RankingError::PartialSave(_)));
        assert_eq!(ed.player_ids(), before.as_slice());
        assert!(!ed.is_saving());
        assert!(ed.is_dirty());
    }

    #[test]
    fn edits_during_save_are_kept() {
        let mut ed = editor_with(3);
        let request = ed.begin_save().unwrap();
        ed.add(player("late")).unwrap();
        let outcome = ed
            .finish_save(request.revision, Ok(request.slots.clone()))
            .unwrap();
        assert_eq!(outcome, SaveOutcome::KeptLocalEdits);
        assert_eq!(ids(&ed), ["p1", "p2", "p3", "late"]);
        assert!(ed.is_dirty());
    }

    #[test]
    fn snapshot_reports_candidate_and_session() {
        let mut ed = editor_with(10);
        ed.add(player("new")).unwrap();
        let snap = ed.snapshot();
        assert_eq!(snap.entries.len(), 10);
        assert_eq!(snap.entries[9].position, 10);
        assert_eq!(snap.candidate.map(|p| p.id.0), Some("new".to_string()));
        assert_eq!(snap.signed_in_as.as_deref(), Some("fan@example.com"));
    }

    #[test]
    fn details_follow_the_list() {
        let mut ed = editor_with(10);
        ed.add(player("first")).unwrap();
        ed.add(player("second")).unwrap();
        assert!(!ed.players.contains_key(&PlayerId::new("first")));
        assert!(ed.players.contains_key(&PlayerId::new("second")));

        ed.assign(1).unwrap();
        assert!(!ed.players.contains_key(&PlayerId::new("p1")));
        assert_eq!(ed.players.len(), 10);

        ed.add(player("third")).unwrap();
        ed.cancel();
        assert!(ed.remove(&PlayerId::new("p2")));
        assert_eq!(ed.players.len(), 9);
        assert!(ed.missing_details().is_empty());

        let user = UserId::new("u");
        ed.hydrate(&[
            RankingSlot::new(user.clone(), 1, PlayerId::new("p3")),
            RankingSlot::new(user, 2, PlayerId::new("x")),
        ]);
        ed.remember([player("x"), player("unlisted")]);
        let mut kept: Vec<_> = ed.players.keys().map(|id| id.as_str()).collect();
        kept.sort_unstable();
        assert_eq!(kept, ["p3", "x"]);
    }

    /// Store that keeps rows in memory and relies on the default
    /// delete-then-insert `replace_all`.
    #[derive(Default)]
    struct MemoryStore {
        rows: Mutex<Vec<RankingSlot>>,
    }

    #[async_trait]
    impl RankingStore for MemoryStore {
        async fn read_all(&self, user_id: &UserId) -> Result<Vec<RankingSlot>, StoreError> {
            Ok(self
                .rows
                .lock()
                .unwrap()
                .iter()
                .filter(|r| &r.user_id == user_id)
                .cloned()
                .collect())
        }

        async fn delete_all(&self, user_id: &UserId) -> Result<(), StoreError> {
            self.rows.lock().unwrap().retain(|r| &r.user_id != user_id);
            Ok(())
        }

        async fn insert_many(&self, slots: &[RankingSlot]) -> Result<(), StoreError> {
            self.rows.lock().unwrap().extend_from_slice(slots);
            Ok(())
        }
    }

    #[tokio::test]
    async fn saved_list_of_every_length_reloads_identically() {
        let store = MemoryStore::default();
        let user = session().user_id;
        for n in (0..=MAX_SLOTS).chain([0]) {
            let mut ed = editor_with(n);
            assert_eq!(ed.save(&store).await.unwrap(), SaveOutcome::Synced, "n = {n}");

            let mut reloaded = RankingEditor::new(Some(session()), EditorPolicy::default());
            reloaded.hydrate(&store.read_all(&user).await.unwrap());
            assert_eq!(reloaded.player_ids(), ed.player_ids(), "n = {n}");
            assert!(!reloaded.is_dirty());
        }
    }
}
