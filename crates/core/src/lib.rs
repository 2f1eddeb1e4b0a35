pub mod check;
pub mod demand;
pub mod resolver;

use thiserror::Error;

pub use types::{
    ClassGroup, Instance, LessonAssignment, Room, ScheduleMethod, ScheduleResult, SolveEnvelope,
    SolveParams, Subject, Teacher, UnmetDemand,
};

#[derive(Debug, Error)]
pub enum ValidationError {
    #[error("invalid instance: {0}")]
    Msg(String),
}

pub fn validate(inst: &Instance) -> Result<(), ValidationError> {
    let mut errors: Vec<String> = Vec::new();

    fn chk_unique<I: ToString>(name: &str, ids: impl Iterator<Item = I>, errors: &mut Vec<String>) {
        use std::collections::HashSet;
        let mut seen = HashSet::new();
        for id in ids {
            let s = id.to_string();
            if !seen.insert(s.clone()) {
                errors.push(format!("duplicate {name} name: {s}"));
            }
        }
    }
    chk_unique(
        "subject",
        inst.subjects.iter().map(|x| &x.name.0),
        &mut errors,
    );
    chk_unique(
        "teacher",
        inst.teachers.iter().map(|x| &x.name.0),
        &mut errors,
    );
    chk_unique("class", inst.classes.iter().map(|x| &x.name.0), &mut errors);
    chk_unique("room", inst.rooms.iter().map(|x| &x.name.0), &mut errors);

    use std::collections::HashSet;
    let classes: HashSet<_> = inst.classes.iter().map(|c| &c.name.0).collect();
    let subjects: HashSet<_> = inst.subjects.iter().map(|s| &s.name.0).collect();

    for s in &inst.subjects {
        if s.weekly_load == 0 {
            errors.push(format!("subject {} has weekly_load=0", s.name.0));
        }
        if s.classes.is_empty() {
            errors.push(format!("subject {} references no class", s.name.0));
        }
        for c in &s.classes {
            if !classes.contains(&c.0) {
                errors.push(format!(
                    "subject {} references missing class {}",
                    s.name.0, c.0
                ));
            }
        }
    }

    for t in &inst.teachers {
        for s in &t.subjects {
            if !subjects.contains(&s.0) {
                errors.push(format!(
                    "teacher {} references missing subject {}",
                    t.name.0, s.0
                ));
            }
        }
        for b in &t.blocked {
            if b.slot == 0 || b.slot > 7 {
                errors.push(format!(
                    "teacher {} has blocked slot {} outside any segment",
                    t.name.0, b.slot
                ));
            }
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(ValidationError::Msg(errors.join("; ")))
    }
}

/// Outcome of one solver run. Infeasible and ResourceExhausted are values,
/// not errors; only internal failures travel through `Err`.
#[derive(Clone, Debug)]
pub enum SolveOutcome {
    Solved {
        assignments: Vec<LessonAssignment>,
        stats: serde_json::Value,
    },
    Partial {
        assignments: Vec<LessonAssignment>,
        unallocated: Vec<UnmetDemand>,
        stats: serde_json::Value,
    },
    Infeasible {
        stats: serde_json::Value,
    },
    ResourceExhausted {
        stats: serde_json::Value,
    },
}

pub trait Solver: Send + Sync + 'static {
    fn solve(&self, env: &SolveEnvelope) -> anyhow::Result<SolveOutcome>;
}
