//! Session lifecycle and the glue between the dataset and the match lists.
//!
//! The controller is driven from a single owner thread. Dataset and selection
//! notifications are passed in by the host as plain calls; list changes come
//! out as queued `ListEvent`s on the channels the presentation layer
//! subscribed to.

use std::collections::HashSet;
use std::fmt;
use std::sync::mpsc::Receiver;
use std::sync::Arc;

use conflation_core::{FeatureId, LayerId, Match, MatchKey, Role};

use crate::command::{ReconCommand, UndoLog};
use crate::config::{MatchSettings, MatchingConfig, ReconConfig};
use crate::error::ReconError;
use crate::events::{ListEvent, SubscriptionId};
use crate::host::{FeatureStore, MatchLayer, MergeOutcome, Merger, SelectionTarget};
use crate::ledger::{Ledger, SweepReport};
use crate::lists::MatchLists;
use crate::match_set::MatchSet;
use crate::matching::{JobPoll, MatchRequest, Matcher, MatchingJob, Progress};
use crate::unmatched::UnmatchedRegistry;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// No layers bound.
    Idle,
    /// A matching job is in flight.
    Matching,
    /// Lists are populated and dataset notifications are honoured.
    Active,
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Idle => "idle",
            Self::Matching => "matching",
            Self::Active => "active",
        };
        f.write_str(name)
    }
}

/// Result of checking on a matching job.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MatchingStatus {
    /// No job in flight.
    Idle,
    Pending,
    Cancelled,
    Failed(String),
    /// Results are live. `notices` are non-fatal problems to show the user.
    Installed { notices: Vec<String> },
}

/// Which row should be scrolled into view after a selection sync.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Focus {
    Match(usize),
    ReferenceOnly(usize),
    SubjectOnly(usize),
}

/// How an external selection maps onto the session lists. Match selection is
/// applied to the Match Set directly; unmatched rows are for the presentation
/// layer to highlight.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SelectionPlan {
    pub matches: Vec<MatchKey>,
    pub reference_only: Vec<usize>,
    pub subject_only: Vec<usize>,
    pub focus: Option<Focus>,
}

impl SelectionPlan {
    pub fn is_empty(&self) -> bool {
        self.matches.is_empty() && self.reference_only.is_empty() && self.subject_only.is_empty()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConflateReport {
    pub merged: usize,
    /// The user stopped the batch; later items were left alone.
    pub cancelled: bool,
    pub failures: Vec<String>,
}

pub struct Controller {
    config: ReconConfig,
    state: SessionState,
    settings: Option<MatchSettings>,
    lists: MatchLists,
    reference_ledger: Ledger,
    subject_ledger: Ledger,
    job: Option<MatchingJob>,
    layer: Option<Box<dyn MatchLayer>>,
    layer_attached: bool,
    /// Features we last pushed to the host selection; the echo of that push
    /// is swallowed once.
    pushed_selection: Option<HashSet<FeatureId>>,
}

impl Controller {
    pub fn new(config: ReconConfig) -> Self {
        Self {
            config,
            state: SessionState::Idle,
            settings: None,
            lists: MatchLists::new(),
            reference_ledger: Ledger::new(Role::Reference),
            subject_ledger: Ledger::new(Role::Subject),
            job: None,
            layer: None,
            layer_attached: false,
            pushed_selection: None,
        }
    }

    pub fn with_match_layer(mut self, layer: Box<dyn MatchLayer>) -> Self {
        self.layer = Some(layer);
        self
    }

    // -----------------------------------------------------------------------
    // Accessors
    // -----------------------------------------------------------------------

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn config(&self) -> &ReconConfig {
        &self.config
    }

    pub fn settings(&self) -> Option<&MatchSettings> {
        self.settings.as_ref()
    }

    pub fn lists(&self) -> &MatchLists {
        &self.lists
    }

    pub fn matches(&self) -> &MatchSet {
        &self.lists.matches
    }

    pub fn reference_only(&self) -> &UnmatchedRegistry {
        &self.lists.reference_only
    }

    pub fn subject_only(&self) -> &UnmatchedRegistry {
        &self.lists.subject_only
    }

    pub fn unmatched(&self, role: Role) -> &UnmatchedRegistry {
        self.lists.unmatched(role)
    }

    pub fn ledger(&self, role: Role) -> &Ledger {
        match role {
            Role::Reference => &self.reference_ledger,
            Role::Subject => &self.subject_ledger,
        }
    }

    pub fn is_layer_attached(&self) -> bool {
        self.layer_attached
    }

    pub fn subscribe_matches(&mut self) -> (SubscriptionId, Receiver<ListEvent>) {
        self.lists.matches.subscribe()
    }

    pub fn subscribe_unmatched(&mut self, role: Role) -> (SubscriptionId, Receiver<ListEvent>) {
        self.lists.unmatched_mut(role).subscribe()
    }

    fn matching_config(&self) -> MatchingConfig {
        self.settings
            .as_ref()
            .map(|s| s.matching.clone())
            .unwrap_or_else(|| self.config.matching.clone())
    }

    /// Roles `layer` plays in the current session. A layer can be both.
    fn roles_of(&self, layer: LayerId) -> Vec<Role> {
        let Some(settings) = &self.settings else {
            return Vec::new();
        };
        let mut roles = Vec::with_capacity(2);
        if settings.reference_layer == layer {
            roles.push(Role::Reference);
        }
        if settings.subject_layer == layer {
            roles.push(Role::Subject);
        }
        roles
    }

    fn require_active(&self, operation: &'static str) -> Result<(), ReconError> {
        if self.state == SessionState::Active {
            Ok(())
        } else {
            Err(ReconError::InvalidState {
                operation,
                state: self.state,
            })
        }
    }

    // -----------------------------------------------------------------------
    // Lifecycle
    // -----------------------------------------------------------------------

    /// Tear down any current session and start computing matches for
    /// `settings` in the background.
    pub fn start_matching(
        &mut self,
        settings: MatchSettings,
        matcher: Arc<dyn Matcher>,
    ) -> Result<(), ReconError> {
        self.teardown();

        let request = MatchRequest {
            reference: settings.reference_selection.clone(),
            subject: settings.subject_selection.clone(),
            config: settings.matching.clone(),
        };
        let job = MatchingJob::spawn(matcher, request)?;

        log::info!(
            "matching {} reference against {} subject features (layers {} / {})",
            settings.reference_selection.len(),
            settings.subject_selection.len(),
            settings.reference_layer,
            settings.subject_layer
        );
        self.settings = Some(settings);
        self.job = Some(job);
        self.state = SessionState::Matching;
        Ok(())
    }

    /// Non-blocking: install the result if the job has finished.
    pub fn poll_matching(&mut self) -> MatchingStatus {
        let Some(job) = self.job.as_mut() else {
            return MatchingStatus::Idle;
        };
        let outcome = job.poll();
        self.on_job_outcome(outcome)
    }

    /// Block until the job finishes, then install its result.
    pub fn wait_for_matching(&mut self) -> MatchingStatus {
        let Some(job) = self.job.as_mut() else {
            return MatchingStatus::Idle;
        };
        let outcome = job.wait();
        self.on_job_outcome(outcome)
    }

    /// Stop a running job. Nothing from it will be installed. Returns whether
    /// a job was running; calling again is harmless.
    pub fn cancel_matching(&mut self) -> bool {
        let Some(job) = self.job.take() else {
            return false;
        };
        job.cancel();
        self.settings = None;
        self.state = SessionState::Idle;
        log::info!("matching cancelled");
        true
    }

    pub fn matching_progress(&self) -> Option<Progress> {
        self.job.as_ref().and_then(|job| job.progress().cloned())
    }

    fn on_job_outcome(&mut self, outcome: JobPoll) -> MatchingStatus {
        match outcome {
            JobPoll::Pending => MatchingStatus::Pending,
            JobPoll::Cancelled => {
                self.job = None;
                self.settings = None;
                self.state = SessionState::Idle;
                log::info!("matching cancelled");
                MatchingStatus::Cancelled
            }
            JobPoll::Failed(msg) => {
                self.job = None;
                self.settings = None;
                self.state = SessionState::Idle;
                log::warn!("matching failed: {msg}");
                MatchingStatus::Failed(msg)
            }
            JobPoll::Done(computed) => {
                self.job = None;
                self.lists
                    .install(computed.matches, computed.reference_only, computed.subject_only);
                self.state = SessionState::Active;
                log::info!(
                    "session active: {} matches, {} reference-only, {} subject-only",
                    self.lists.matches.len(),
                    self.lists.reference_only.len(),
                    self.lists.subject_only.len()
                );
                let notices = self.attach_layer().into_iter().collect();
                MatchingStatus::Installed { notices }
            }
        }
    }

    /// Returns a notice if the layer could not be shown. The session is
    /// usable either way.
    fn attach_layer(&mut self) -> Option<String> {
        if !self.config.session.show_match_layer || self.layer_attached {
            return None;
        }
        let layer = self.layer.as_mut()?;
        match layer.attach() {
            Ok(()) => {
                self.layer_attached = true;
                None
            }
            Err(msg) => {
                log::warn!("could not add conflation layer: {msg}");
                Some(format!("Error adding conflation layer: {msg}"))
            }
        }
    }

    fn detach_layer(&mut self) {
        if !self.layer_attached {
            return;
        }
        if let Some(layer) = self.layer.as_mut() {
            layer.detach();
        }
        self.layer_attached = false;
    }

    /// Drop the job, list contents and ledgers. The visualization layer and
    /// list subscribers survive.
    fn teardown(&mut self) {
        if let Some(job) = self.job.take() {
            job.cancel();
        }
        self.lists.clear();
        self.reference_ledger.clear();
        self.subject_ledger.clear();
        self.pushed_selection = None;
        self.settings = None;
        self.state = SessionState::Idle;
    }

    /// The view was closed.
    pub fn close(&mut self) {
        if self.state != SessionState::Idle {
            log::info!("closing {} session", self.state);
        }
        self.teardown();
        self.detach_layer();
    }

    /// A layer was removed from the workspace. Ends the session if it was one
    /// of ours; returns whether it was.
    pub fn layer_removed(&mut self, layer: LayerId) -> bool {
        if self.roles_of(layer).is_empty() {
            return false;
        }
        log::info!("layer {layer} removed, ending session");
        self.teardown();
        self.detach_layer();
        true
    }

    // -----------------------------------------------------------------------
    // Dataset notifications
    // -----------------------------------------------------------------------

    /// Features were (re)added to `layer`. Returns how many session entries
    /// were restored.
    pub fn features_added(&mut self, layer: LayerId, features: &[FeatureId]) -> usize {
        if self.state != SessionState::Active {
            log::debug!("ignoring {} added features while {}", features.len(), self.state);
            return 0;
        }
        let mut restored = 0;
        for role in self.roles_of(layer) {
            for &feature in features {
                let (ledger, lists) = match role {
                    Role::Reference => (&mut self.reference_ledger, &mut self.lists),
                    Role::Subject => (&mut self.subject_ledger, &mut self.lists),
                };
                if ledger.feature_added(feature, lists) {
                    restored += 1;
                }
            }
        }
        restored
    }

    /// Features were removed from `layer`. Returns how many session entries
    /// were parked in the ledgers.
    pub fn features_removed(&mut self, layer: LayerId, features: &[FeatureId]) -> usize {
        if self.state != SessionState::Active {
            log::debug!("ignoring {} removed features while {}", features.len(), self.state);
            return 0;
        }
        let mut parked = 0;
        for role in self.roles_of(layer) {
            for &feature in features {
                let (ledger, lists) = match role {
                    Role::Reference => (&mut self.reference_ledger, &mut self.lists),
                    Role::Subject => (&mut self.subject_ledger, &mut self.lists),
                };
                if ledger.feature_removed(feature, lists) {
                    parked += 1;
                }
            }
        }
        parked
    }

    /// Something changed in `layer` without per-feature notifications (e.g.
    /// an undo/redo replay). Reconcile the ledgers against `store`.
    pub fn bulk_changed(&mut self, layer: LayerId, store: &dyn FeatureStore) -> SweepReport {
        if self.state != SessionState::Active {
            return SweepReport::default();
        }
        let purge_missing = self.config.session.purge_missing;
        let mut report = SweepReport::default();
        for role in self.roles_of(layer) {
            let (ledger, lists) = match role {
                Role::Reference => (&mut self.reference_ledger, &mut self.lists),
                Role::Subject => (&mut self.subject_ledger, &mut self.lists),
            };
            report = report.merge(ledger.sweep(store, purge_missing, lists));
        }
        if report.restored > 0 || report.purged > 0 {
            log::debug!(
                "bulk change on layer {layer}: {} restored, {} purged, {} still deleted",
                report.restored,
                report.purged,
                report.retained
            );
        }
        report
    }

    // -----------------------------------------------------------------------
    // Selection
    // -----------------------------------------------------------------------

    /// The host selection was replaced. Selects the matching rows and
    /// returns the plan for the presentation layer. An empty selection, an
    /// echo of our own `push_selection`, or an inactive session changes
    /// nothing.
    pub fn selection_changed(&mut self, features: &[FeatureId]) -> SelectionPlan {
        if let Some(pushed) = self.pushed_selection.take() {
            let incoming: HashSet<FeatureId> = features.iter().copied().collect();
            if incoming == pushed {
                log::debug!("swallowing echo of pushed selection");
                return SelectionPlan::default();
            }
        }
        if self.state != SessionState::Active || features.is_empty() {
            return SelectionPlan::default();
        }

        let mut plan = SelectionPlan::default();
        for &feature in features {
            let focus = self.locate(feature, &mut plan);
            if plan.focus.is_none() {
                plan.focus = focus;
            }
        }
        self.lists.matches.set_selected(plan.matches.iter().copied());
        plan
    }

    /// Find `feature` in the match list, then either unmatched list, and
    /// add the first hit to `plan`.
    fn locate(&self, feature: FeatureId, plan: &mut SelectionPlan) -> Option<Focus> {
        let matches = &self.lists.matches;
        let hit = matches
            .get_match_by_reference(feature)
            .or_else(|| matches.get_match_by_subject(feature));
        if let Some(m) = hit {
            let key = m.key();
            let index = matches.index_of(&key)?;
            if !plan.matches.contains(&key) {
                plan.matches.push(key);
            }
            return Some(Focus::Match(index));
        }
        if let Some(index) = self.lists.reference_only.index_of(feature) {
            plan.reference_only.push(index);
            return Some(Focus::ReferenceOnly(index));
        }
        if let Some(index) = self.lists.subject_only.index_of(feature) {
            plan.subject_only.push(index);
            return Some(Focus::SubjectOnly(index));
        }
        None
    }

    /// Select matches by key, as when the user clicks rows.
    pub fn select_matches(&mut self, keys: impl IntoIterator<Item = MatchKey>) -> bool {
        self.lists.matches.set_selected(keys)
    }

    /// Replace the host selection, remembering it so the notification the
    /// host sends back is not fed into `selection_changed` as a new request.
    pub fn push_selection(
        &mut self,
        target: &mut dyn SelectionTarget,
        reference: &[FeatureId],
        subject: &[FeatureId],
    ) {
        self.pushed_selection = Some(reference.iter().chain(subject).copied().collect());
        target.replace_selection(reference, subject);
    }

    // -----------------------------------------------------------------------
    // User operations
    // -----------------------------------------------------------------------

    /// Merge every selected match, one undo entry per merge. A cancelled
    /// merge stops the batch; a failed one is reported and skipped.
    pub fn conflate_selected_matches(
        &mut self,
        merger: &mut dyn Merger,
        history: &mut dyn UndoLog,
    ) -> Result<ConflateReport, ReconError> {
        self.require_active("conflate")?;

        let next = self.lists.matches.find_next_selection();
        let batch: Vec<Match> = self.lists.matches.selected().into_iter().cloned().collect();
        let config = self.matching_config();
        let mut report = ConflateReport::default();

        for matched in batch {
            match merger.merge(&matched, &config) {
                MergeOutcome::Merged => {
                    let command = ReconCommand::ConflateMatch { matched };
                    if command.execute(&mut self.lists) {
                        history.record(command);
                        report.merged += 1;
                    }
                }
                MergeOutcome::Cancelled => {
                    report.cancelled = true;
                    break;
                }
                MergeOutcome::Failed(msg) => {
                    log::warn!("cannot conflate {}: {msg}", matched.key());
                    report.failures.push(msg);
                }
            }
        }

        self.refocus(next);
        log::info!(
            "conflated {} matches ({} failed{})",
            report.merged,
            report.failures.len(),
            if report.cancelled { ", cancelled" } else { "" }
        );
        Ok(report)
    }

    /// Copy unmatched reference features into the subject layer as a single
    /// undoable step. Features not in the reference-only list are skipped.
    pub fn conflate_unmatched(
        &mut self,
        features: &[FeatureId],
        merger: &mut dyn Merger,
        history: &mut dyn UndoLog,
    ) -> Result<ConflateReport, ReconError> {
        self.require_active("conflate unmatched objects")?;

        let features: Vec<FeatureId> = features
            .iter()
            .copied()
            .filter(|f| self.lists.reference_only.contains(*f))
            .collect();
        let mut report = ConflateReport::default();
        if features.is_empty() {
            return Ok(report);
        }

        match merger.copy_to_subject(&features, &self.matching_config()) {
            MergeOutcome::Merged => {
                report.merged = features.len();
                let command = ReconCommand::ConflateUnmatched { features };
                command.execute(&mut self.lists);
                history.record(command);
            }
            MergeOutcome::Cancelled => report.cancelled = true,
            MergeOutcome::Failed(msg) => {
                log::warn!("cannot copy unmatched objects: {msg}");
                report.failures.push(msg);
            }
        }
        Ok(report)
    }

    /// Dismiss the selected matches. Returns how many were removed.
    pub fn remove_selected_matches(&mut self, history: &mut dyn UndoLog) -> Result<usize, ReconError> {
        self.require_active("remove matches")?;

        let matches: Vec<Match> = self.lists.matches.selected().into_iter().cloned().collect();
        if matches.is_empty() {
            return Ok(0);
        }
        let next = self.lists.matches.find_next_selection();
        let removed = matches.len();
        let command = ReconCommand::RemoveMatches { matches };
        command.execute(&mut self.lists);
        history.record(command);
        self.refocus(next);
        Ok(removed)
    }

    /// Dismiss unmatched features of `role`. Features not listed are skipped.
    pub fn remove_unmatched(
        &mut self,
        role: Role,
        features: &[FeatureId],
        history: &mut dyn UndoLog,
    ) -> Result<usize, ReconError> {
        self.require_active("remove unmatched objects")?;

        let registry = self.lists.unmatched(role);
        let features: Vec<FeatureId> = features
            .iter()
            .copied()
            .filter(|f| registry.contains(*f))
            .collect();
        if features.is_empty() {
            return Ok(0);
        }
        let removed = features.len();
        let command = ReconCommand::RemoveUnmatched { role, features };
        command.execute(&mut self.lists);
        history.record(command);
        Ok(removed)
    }

    /// Revert a command previously handed out by the undo log.
    pub fn apply_undo(&mut self, command: &ReconCommand) -> Result<(), ReconError> {
        self.require_active("undo")?;
        log::debug!("undo: {}", command.description());
        command.undo(&mut self.lists);
        Ok(())
    }

    /// Re-apply a command previously undone. Returns whether the lists
    /// changed.
    pub fn apply_redo(&mut self, command: &ReconCommand) -> Result<bool, ReconError> {
        self.require_active("redo")?;
        log::debug!("redo: {}", command.description());
        Ok(command.execute(&mut self.lists))
    }

    fn refocus(&mut self, next: Option<MatchKey>) {
        if !self.lists.matches.selected_keys().is_empty() {
            return;
        }
        if let Some(key) = next {
            self.lists.matches.set_selected([key]);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::history::History;
    use crate::matching::ProgressMonitor;

    struct Fixed(Vec<Match>);

    impl Matcher for Fixed {
        fn generate(&self, _: &MatchRequest, _: &ProgressMonitor) -> Result<Vec<Match>, String> {
            Ok(self.0.clone())
        }
    }

    #[derive(Default)]
    struct Recorder(Vec<(Vec<FeatureId>, Vec<FeatureId>)>);

    impl SelectionTarget for Recorder {
        fn replace_selection(&mut self, reference: &[FeatureId], subject: &[FeatureId]) {
            self.0.push((reference.to_vec(), subject.to_vec()));
        }
    }

    fn f(n: u64) -> FeatureId {
        FeatureId(n)
    }

    fn active() -> Controller {
        let mut controller = Controller::new(ReconConfig::default());
        let settings = MatchSettings {
            reference_layer: LayerId(1),
            subject_layer: LayerId(2),
            reference_selection: vec![f(1), f(2), f(3)],
            subject_selection: vec![f(11), f(12), f(13)],
            matching: MatchingConfig::default(),
        };
        let matcher = Arc::new(Fixed(vec![Match::new(f(1), f(11)), Match::new(f(2), f(12))]));
        controller.start_matching(settings, matcher).unwrap();
        assert_eq!(controller.state(), SessionState::Matching);
        assert_eq!(
            controller.wait_for_matching(),
            MatchingStatus::Installed { notices: vec![] }
        );
        controller
    }

    #[test]
    fn install_classifies_leftovers() {
        let controller = active();
        assert_eq!(controller.state(), SessionState::Active);
        assert_eq!(controller.matches().len(), 2);
        assert_eq!(controller.reference_only().to_vec(), vec![f(3)]);
        assert_eq!(controller.subject_only().to_vec(), vec![f(13)]);
    }

    #[test]
    fn selection_plan_focuses_first_hit() {
        let mut controller = active();
        let plan = controller.selection_changed(&[f(99), f(13), f(12)]);
        assert_eq!(plan.focus, Some(Focus::SubjectOnly(0)));
        assert_eq!(plan.subject_only, vec![0]);
        assert_eq!(plan.matches, vec![MatchKey::new(f(2), f(12))]);
        assert!(controller.matches().is_selected(&MatchKey::new(f(2), f(12))));
    }

    #[test]
    fn empty_selection_leaves_rows_alone() {
        let mut controller = active();
        controller.select_matches([MatchKey::new(f(1), f(11))]);
        assert!(controller.selection_changed(&[]).is_empty());
        assert_eq!(controller.matches().selected_keys().len(), 1);
    }

    #[test]
    fn pushed_selection_echo_is_swallowed_once() {
        let mut controller = active();
        let mut target = Recorder::default();
        controller.push_selection(&mut target, &[f(1)], &[f(11)]);
        assert_eq!(target.0, vec![(vec![f(1)], vec![f(11)])]);

        assert!(controller.selection_changed(&[f(11), f(1)]).is_empty());
        assert!(controller.matches().selected_keys().is_empty());

        let plan = controller.selection_changed(&[f(11), f(1)]);
        assert_eq!(plan.matches, vec![MatchKey::new(f(1), f(11))]);
    }

    #[test]
    fn operations_require_active_session() {
        let mut controller = Controller::new(ReconConfig::default());
        let mut history = History::new();
        let err = controller.remove_selected_matches(&mut history).unwrap_err();
        assert_eq!(err.to_string(), "cannot remove matches while session is idle");
    }

    #[test]
    fn notifications_ignored_when_idle() {
        let mut controller = Controller::new(ReconConfig::default());
        assert_eq!(controller.features_removed(LayerId(1), &[f(1)]), 0);
        assert!(controller.selection_changed(&[f(1)]).is_empty());
    }

    #[test]
    fn remove_selected_moves_focus_on() {
        let mut controller = active();
        let mut history = History::new();
        controller.select_matches([MatchKey::new(f(1), f(11))]);
        assert_eq!(controller.remove_selected_matches(&mut history).unwrap(), 1);
        assert_eq!(
            controller.matches().selected_keys(),
            vec![MatchKey::new(f(2), f(12))]
        );

        let command = history.undo().unwrap();
        controller.apply_undo(&command).unwrap();
        assert_eq!(controller.matches().len(), 2);
    }

    #[test]
    fn close_returns_to_idle() {
        let mut controller = active();
        controller.close();
        assert_eq!(controller.state(), SessionState::Idle);
        assert!(controller.matches().is_empty());
        assert!(controller.settings().is_none());
        assert!(!controller.cancel_matching());
    }
}
