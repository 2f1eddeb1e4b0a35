//! Scheduling orchestrator: exact solver first, heuristic fallback on
//! infeasibility or budget exhaustion.

use anyhow::bail;
use sched_core::{check, validate, SolveEnvelope, SolveOutcome, Solver};
use solver_exact::ExactSolver;
use solver_heur::HeurSolver;
use tracing::{info, warn};
use types::{ScheduleMethod, ScheduleResult};

pub use sched_core::ValidationError;
pub use types::{Instance, SolveParams};

pub struct ScheduleEngine {
    exact: ExactSolver,
    heur: HeurSolver,
}

impl ScheduleEngine {
    pub fn new() -> Self {
        Self {
            exact: ExactSolver::new(),
            heur: HeurSolver::new(),
        }
    }

    /// Computes a timetable for the envelope. Malformed input and internal
    /// invariant violations are fatal; infeasibility routes into the
    /// heuristic fallback.
    pub fn schedule(&self, env: &SolveEnvelope) -> anyhow::Result<ScheduleResult> {
        validate(&env.instance)?;

        match self.exact.solve(env)? {
            SolveOutcome::Solved { assignments, stats } => {
                info!(lessons = assignments.len(), "exact solver produced the timetable");
                self.audited(
                    env,
                    ScheduleResult {
                        method: ScheduleMethod::Exact,
                        assignments,
                        unallocated: Vec::new(),
                        stats,
                    },
                )
            }
            SolveOutcome::Infeasible { .. } => {
                warn!("exact solver proved infeasible, falling back");
                self.fall_back(env, "infeasible")
            }
            SolveOutcome::ResourceExhausted { .. } => {
                warn!("exact solver ran out of budget, falling back");
                self.fall_back(env, "resource-exhausted")
            }
            SolveOutcome::Partial { .. } => {
                bail!("exact solver returned a partial timetable")
            }
        }
    }

    fn fall_back(&self, env: &SolveEnvelope, reason: &str) -> anyhow::Result<ScheduleResult> {
        let (assignments, unallocated, mut stats) = match self.heur.solve(env)? {
            SolveOutcome::Solved { assignments, stats } => (assignments, Vec::new(), stats),
            SolveOutcome::Partial {
                assignments,
                unallocated,
                stats,
            } => (assignments, unallocated, stats),
            SolveOutcome::Infeasible { .. } | SolveOutcome::ResourceExhausted { .. } => {
                bail!("heuristic solver must not report infeasibility")
            }
        };
        stats["fallback_reason"] = serde_json::json!(reason);
        info!(
            lessons = assignments.len(),
            unallocated = unallocated.len(),
            reason,
            "heuristic fallback produced the timetable"
        );
        self.audited(
            env,
            ScheduleResult {
                method: ScheduleMethod::Heuristic,
                assignments,
                unallocated,
                stats,
            },
        )
    }

    fn audited(
        &self,
        env: &SolveEnvelope,
        result: ScheduleResult,
    ) -> anyhow::Result<ScheduleResult> {
        let problems = check::audit(&env.instance, &result.assignments);
        if !problems.is_empty() {
            bail!("internal invariant violation: {}", problems.join("; "));
        }
        Ok(result)
    }
}

impl Default for ScheduleEngine {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use types::{
        BlockedSlot, ClassGroup, ClassName, Group, Room, Segment, Subject, Teacher, TeacherGroup,
        Weekday, WEEKDAYS,
    };

    fn subject(name: &str, load: u32, classes: &[&str]) -> Subject {
        Subject {
            name: name.into(),
            weekly_load: load,
            kind: Default::default(),
            classes: classes.iter().map(|c| ClassName::from(*c)).collect(),
            group: Group::A,
            background_color: String::new(),
            font_color: String::new(),
        }
    }

    fn class(name: &str) -> ClassGroup {
        ClassGroup {
            name: name.into(),
            grade: "6".into(),
            shift: "morning".into(),
            group: Group::A,
            segment: Segment::EfII,
        }
    }

    fn teacher(name: &str, subjects: &[&str]) -> Teacher {
        Teacher {
            name: name.into(),
            subjects: subjects.iter().map(|s| (*s).into()).collect(),
            group: TeacherGroup::Both,
            available_days: WEEKDAYS.into_iter().collect(),
            blocked: Default::default(),
        }
    }

    fn room(name: &str) -> Room {
        Room {
            name: name.into(),
            capacity: 30,
            kind: Default::default(),
        }
    }

    fn envelope(inst: Instance) -> SolveEnvelope {
        SolveEnvelope {
            instance: inst,
            params: SolveParams::default(),
        }
    }

    #[test]
    fn feasible_instance_is_tagged_exact() {
        let env = envelope(Instance {
            subjects: vec![subject("math", 3, &["6A"])],
            teachers: vec![teacher("ana", &["math"])],
            classes: vec![class("6A")],
            rooms: vec![room("r1")],
        });
        let result = ScheduleEngine::new().schedule(&env).unwrap();
        assert_eq!(result.method, types::ScheduleMethod::Exact);
        assert_eq!(result.assignments.len(), 3);
        assert!(result.unallocated.is_empty());
    }

    #[test]
    fn infeasible_instance_falls_back_to_heuristic() {
        // Demand 10 lessons, teacher supply 7 open cells: the exact solver
        // proves infeasibility and the heuristic picks up the pieces.
        let mut t = teacher("ana", &["math"]);
        t.available_days = [Weekday::Mon, Weekday::Tue].into_iter().collect();
        for slot in [1u8, 2, 5] {
            t.blocked.insert(BlockedSlot {
                day: Weekday::Tue,
                slot,
            });
        }
        let env = envelope(Instance {
            subjects: vec![subject("math", 5, &["6A", "6B"])],
            teachers: vec![t],
            classes: vec![class("6A"), class("6B")],
            rooms: vec![room("r1"), room("r2")],
        });
        let result = ScheduleEngine::new().schedule(&env).unwrap();
        assert_eq!(result.method, types::ScheduleMethod::Heuristic);
        assert!(!result.unallocated.is_empty());
        assert!(result.assignments.len() <= 7);
        assert_eq!(result.assignments.len() + result.unallocated.len(), 10);
        assert_eq!(result.stats["fallback_reason"], "infeasible");
    }

    #[test]
    fn budget_exhaustion_falls_back_too() {
        let mut env = envelope(Instance {
            subjects: vec![subject("math", 3, &["6A"])],
            teachers: vec![teacher("ana", &["math"])],
            classes: vec![class("6A")],
            rooms: vec![room("r1")],
        });
        env.params.max_steps = 0;
        let result = ScheduleEngine::new().schedule(&env).unwrap();
        assert_eq!(result.method, types::ScheduleMethod::Heuristic);
        assert_eq!(result.stats["fallback_reason"], "resource-exhausted");
        assert_eq!(result.assignments.len(), 3);
    }

    #[test]
    fn malformed_input_is_fatal() {
        let env = envelope(Instance {
            subjects: vec![subject("math", 0, &["missing"])],
            teachers: vec![],
            classes: vec![],
            rooms: vec![],
        });
        let err = ScheduleEngine::new().schedule(&env).unwrap_err();
        assert!(err.to_string().contains("invalid instance"));
    }
}
