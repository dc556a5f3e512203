//! `conflate replay`: drive a scripted session through the controller.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;

use conflation_core::{FeatureId, Match, MatchKey, Role};
use conflation_recon::matching::{MatchRequest, Matcher, ProgressMonitor};
use conflation_recon::{
    Controller, History, MatchSettings, MatchingStatus, ReconConfig, ReconError,
};

use crate::script::{Script, Step};
use crate::world::{ScriptedMerger, World};
use crate::CliError;

// ---------------------------------------------------------------------------
// Report
// ---------------------------------------------------------------------------

#[derive(Debug, Serialize)]
pub struct ReplayReport {
    pub run_at: DateTime<Utc>,
    pub script: String,
    pub state: String,
    pub steps: Vec<StepReport>,
    pub matches: Vec<MatchRow>,
    pub reference_only: Vec<FeatureId>,
    pub subject_only: Vec<FeatureId>,
    pub ledger: LedgerReport,
    pub history: Vec<String>,
    pub notices: Vec<String>,
    pub failures: Vec<String>,
}

#[derive(Debug, Serialize)]
pub struct StepReport {
    pub step: usize,
    pub op: &'static str,
    pub detail: String,
}

#[derive(Debug, Serialize)]
pub struct MatchRow {
    #[serde(flatten)]
    pub matched: Match,
    pub selected: bool,
}

#[derive(Debug, Serialize)]
pub struct LedgerReport {
    pub reference: Vec<FeatureId>,
    pub subject: Vec<FeatureId>,
}

// ---------------------------------------------------------------------------
// Scripted matcher
// ---------------------------------------------------------------------------

/// Proposes the script's candidates, restricted to the selected features.
struct ScriptedMatcher(Vec<Match>);

impl Matcher for ScriptedMatcher {
    fn generate(&self, request: &MatchRequest, progress: &ProgressMonitor) -> Result<Vec<Match>, String> {
        let total = self.0.len();
        let mut out = Vec::with_capacity(total);
        for (i, m) in self.0.iter().enumerate() {
            if progress.is_cancelled() {
                break;
            }
            if request.reference.contains(&m.reference) && request.subject.contains(&m.subject) {
                out.push(m.clone());
            }
            progress.report(i + 1, total, "scoring candidates");
        }
        Ok(out)
    }
}

fn runtime(err: ReconError) -> CliError {
    CliError::runtime(err.to_string())
}

// ---------------------------------------------------------------------------
// Runner
// ---------------------------------------------------------------------------

struct Session {
    controller: Controller,
    world: World,
    merger: ScriptedMerger,
    history: History,
    failures: Vec<String>,
}

pub fn run(script: &Script, config: ReconConfig, name: &str) -> Result<ReplayReport, CliError> {
    let settings = MatchSettings {
        reference_layer: script.layers.reference.id,
        subject_layer: script.layers.subject.id,
        reference_selection: script.layers.reference.selection(),
        subject_selection: script.layers.subject.selection(),
        matching: config.matching.clone(),
    };
    let history = History::with_limit(config.session.history_limit);

    let mut controller = Controller::new(config);
    controller
        .start_matching(settings, Arc::new(ScriptedMatcher(script.candidates.clone())))
        .map_err(runtime)?;
    let notices = match controller.wait_for_matching() {
        MatchingStatus::Installed { notices } => notices,
        MatchingStatus::Failed(msg) => {
            return Err(CliError::runtime(format!("matching failed: {msg}")));
        }
        other => {
            return Err(CliError::runtime(format!("matching did not complete: {other:?}")));
        }
    };

    let mut session = Session {
        controller,
        world: World::from_script(script),
        merger: ScriptedMerger::new(&script.merger),
        history,
        failures: Vec::new(),
    };

    let mut steps = Vec::with_capacity(script.steps.len());
    for (i, step) in script.steps.iter().enumerate() {
        let detail = session.apply(step)?;
        log::info!("step {} {}: {detail}", i + 1, step.name());
        steps.push(StepReport {
            step: i + 1,
            op: step.name(),
            detail,
        });
    }

    Ok(session.report(name, steps, notices))
}

impl Session {
    fn apply(&mut self, step: &Step) -> Result<String, CliError> {
        let controller = &mut self.controller;
        let detail = match step {
            Step::Delete { layer, features } => {
                let deleted = self.world.delete(*layer, features);
                let parked = controller.features_removed(*layer, &deleted);
                format!("deleted {}, parked {parked}", deleted.len())
            }
            Step::Undelete { layer, features } => {
                let restored = self.world.undelete(*layer, features);
                let back = controller.features_added(*layer, &restored);
                format!("undeleted {}, restored {back}", restored.len())
            }
            Step::BulkRestore { layer, features } => {
                self.world.undelete(*layer, features);
                let report = controller.bulk_changed(*layer, &self.world);
                format!(
                    "restored {}, purged {}, still deleted {}",
                    report.restored, report.purged, report.retained
                )
            }
            Step::Purge { layer, features } => {
                let purged = self.world.purge(*layer, features);
                let report = controller.bulk_changed(*layer, &self.world);
                format!(
                    "purged {} from dataset, dropped {} ledger entries",
                    purged.len(),
                    report.purged
                )
            }
            Step::Select { features } => {
                self.world.set_selection(features);
                let plan = controller.selection_changed(self.world.selection());
                format!(
                    "{} matches, {} reference-only, {} subject-only",
                    plan.matches.len(),
                    plan.reference_only.len(),
                    plan.subject_only.len()
                )
            }
            Step::SelectMatches { references } => {
                let keys: Vec<MatchKey> = references
                    .iter()
                    .filter_map(|r| controller.matches().get_match_by_reference(*r))
                    .map(Match::key)
                    .collect();
                controller.select_matches(keys.iter().copied());

                // Mirror the rows into the dataset selection; the dataset
                // then notifies us, and that echo must change nothing.
                let reference: Vec<FeatureId> = keys.iter().map(|k| k.reference).collect();
                let subject: Vec<FeatureId> = keys.iter().map(|k| k.subject).collect();
                controller.push_selection(&mut self.world, &reference, &subject);
                let echo = self.world.selection().to_vec();
                controller.selection_changed(&echo);

                format!("selected {} matches", controller.matches().selected_keys().len())
            }
            Step::Conflate => {
                let report = controller
                    .conflate_selected_matches(&mut self.merger, &mut self.history)
                    .map_err(runtime)?;
                let detail = format!(
                    "merged {}, failed {}{}",
                    report.merged,
                    report.failures.len(),
                    if report.cancelled { ", cancelled" } else { "" }
                );
                self.failures.extend(report.failures);
                detail
            }
            Step::ConflateUnmatched { features } => {
                let report = controller
                    .conflate_unmatched(features, &mut self.merger, &mut self.history)
                    .map_err(runtime)?;
                let detail = format!("copied {}, failed {}", report.merged, report.failures.len());
                self.failures.extend(report.failures);
                detail
            }
            Step::RemoveMatches => {
                let removed = controller
                    .remove_selected_matches(&mut self.history)
                    .map_err(runtime)?;
                format!("removed {removed}")
            }
            Step::RemoveUnmatched { role, features } => {
                let removed = controller
                    .remove_unmatched(*role, features, &mut self.history)
                    .map_err(runtime)?;
                format!("removed {removed} {role}-only")
            }
            Step::Undo => match self.history.undo() {
                Some(command) => {
                    controller.apply_undo(&command).map_err(runtime)?;
                    format!("undid {}", command.description())
                }
                None => "nothing to undo".to_string(),
            },
            Step::Redo => match self.history.redo() {
                Some(command) => {
                    controller.apply_redo(&command).map_err(runtime)?;
                    format!("redid {}", command.description())
                }
                None => "nothing to redo".to_string(),
            },
        };
        Ok(detail)
    }

    fn report(self, name: &str, steps: Vec<StepReport>, notices: Vec<String>) -> ReplayReport {
        let controller = &self.controller;
        let matches = controller
            .matches()
            .iter()
            .map(|m| MatchRow {
                matched: m.clone(),
                selected: controller.matches().is_selected(&m.key()),
            })
            .collect();

        ReplayReport {
            run_at: Utc::now(),
            script: name.to_string(),
            state: controller.state().to_string(),
            steps,
            matches,
            reference_only: controller.reference_only().to_vec(),
            subject_only: controller.subject_only().to_vec(),
            ledger: LedgerReport {
                reference: controller.ledger(Role::Reference).features().collect(),
                subject: controller.ledger(Role::Subject).features().collect(),
            },
            history: self.history.descriptions(),
            notices,
            failures: self.failures,
        }
    }
}

/// Human summary, written to stderr.
pub fn print_summary(report: &ReplayReport) {
    eprintln!(
        "replayed {} steps from {}: session {}",
        report.steps.len(),
        report.script,
        report.state
    );
    for step in &report.steps {
        eprintln!("  {:>3}. {:<18} {}", step.step, step.op, step.detail);
    }

    let selected = report.matches.iter().filter(|row| row.selected).count();
    eprintln!("matches: {} ({selected} selected)", report.matches.len());
    for row in &report.matches {
        let flag = if row.selected { " [selected]" } else { "" };
        let conflict = if row.matched.has_conflicts() { " !conflict" } else { "" };
        eprintln!("  {}{conflict}{flag}", row.matched.key());
    }
    eprintln!("reference-only: {}", join(&report.reference_only));
    eprintln!("subject-only:   {}", join(&report.subject_only));
    eprintln!(
        "ledger: {} reference, {} subject",
        report.ledger.reference.len(),
        report.ledger.subject.len()
    );
    eprintln!("undo entries: {}", report.history.len());
    for notice in &report.notices {
        eprintln!("notice: {notice}");
    }
    for failure in &report.failures {
        eprintln!("merge failed: {failure}");
    }
}

fn join(features: &[FeatureId]) -> String {
    if features.is_empty() {
        return "-".to_string();
    }
    features
        .iter()
        .map(FeatureId::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}
