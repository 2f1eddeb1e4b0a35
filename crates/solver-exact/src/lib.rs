//! Exact timetable solver: backtracking search with forward checking.

use sched_core::demand::{demand_pairs, DemandPair};
use sched_core::resolver::CandidateResolver;
use sched_core::{SolveEnvelope, SolveOutcome, Solver};
use std::cmp::Reverse;
use std::collections::HashSet;
use std::time::Instant;
use tracing::{debug, info};
use types::{Instance, LessonAssignment, Weekday, WEEKDAYS};

pub struct ExactSolver;

impl ExactSolver {
    pub fn new() -> Self {
        Self
    }
}

impl Default for ExactSolver {
    fn default() -> Self {
        Self::new()
    }
}

impl Solver for ExactSolver {
    fn solve(&self, env: &SolveEnvelope) -> anyhow::Result<SolveOutcome> {
        let inst = &env.instance;
        info!(
            classes = inst.classes.len(),
            subjects = inst.subjects.len(),
            teachers = inst.teachers.len(),
            rooms = inst.rooms.len(),
            "exact solve started"
        );

        let resolver = CandidateResolver::new(inst);
        let mut vars = build_vars(inst, &resolver);

        // Most constrained first: decreasing weekly load, subjects kept
        // contiguous, then fewest (day, slot, teacher, room) combinations.
        vars.sort_by_key(|v| (Reverse(v.pair.load), v.pair.subject, v.combinations()));

        for v in &vars {
            if (v.cells.len() as u32) < v.pair.load {
                let class = &inst.classes[v.pair.class].name;
                let subject = &inst.subjects[v.pair.subject].name;
                debug!(%class, %subject, cells = v.cells.len(), load = v.pair.load,
                    "load unreachable from structural cells");
                return Ok(SolveOutcome::Infeasible {
                    stats: serde_json::json!({
                        "method": "backtracking",
                        "note": "load exceeds schedulable cells",
                        "class": class.0.clone(),
                        "subject": subject.0.clone(),
                    }),
                });
            }
        }

        let mut search = Search {
            inst,
            vars: &vars,
            occ: Occupancy::default(),
            chosen: Vec::new(),
            steps: 0,
            max_steps: env.params.max_steps,
            deadline: env.params.time_limit.map(|d| Instant::now() + d),
        };

        let units: u32 = vars.iter().map(|v| v.pair.load).sum();
        match search.descend(0) {
            Step::Found => {
                let assignments = search.extract();
                info!(steps = search.steps, lessons = assignments.len(), "exact solve succeeded");
                Ok(SolveOutcome::Solved {
                    assignments,
                    stats: serde_json::json!({
                        "method": "backtracking",
                        "steps": search.steps,
                        "pairs": vars.len(),
                        "units": units,
                    }),
                })
            }
            Step::Exhausted => {
                info!(steps = search.steps, "exact solve proved infeasible");
                Ok(SolveOutcome::Infeasible {
                    stats: serde_json::json!({
                        "method": "backtracking",
                        "steps": search.steps,
                        "note": "search space exhausted",
                    }),
                })
            }
            Step::OverBudget => {
                info!(steps = search.steps, "exact solve ran out of budget");
                Ok(SolveOutcome::ResourceExhausted {
                    stats: serde_json::json!({
                        "method": "backtracking",
                        "steps": search.steps,
                        "max_steps": env.params.max_steps,
                    }),
                })
            }
        }
    }
}

/// One structurally schedulable (day, slot) cell with its candidate lists.
struct Cell {
    day: Weekday,
    slot: u8,
    teachers: Vec<usize>,
    rooms: Vec<usize>,
}

/// Variable block for one in-scope (class, subject) pair.
struct PairVars {
    pair: DemandPair,
    cells: Vec<Cell>,
}

impl PairVars {
    fn combinations(&self) -> usize {
        self.cells
            .iter()
            .map(|c| c.teachers.len() * c.rooms.len())
            .sum()
    }
}

fn build_vars(inst: &Instance, resolver: &CandidateResolver<'_>) -> Vec<PairVars> {
    demand_pairs(inst)
        .into_iter()
        .map(|pair| {
            let class = &inst.classes[pair.class];
            let subject = &inst.subjects[pair.subject];
            let mut cells = Vec::new();
            for day in WEEKDAYS {
                for slot in class.segment.slots() {
                    if class.segment.is_break(slot) {
                        continue;
                    }
                    let teachers = resolver.eligible_teachers(class, subject, day, slot);
                    let rooms = resolver.eligible_rooms(class, day, slot);
                    if !teachers.is_empty() && !rooms.is_empty() {
                        cells.push(Cell {
                            day,
                            slot,
                            teachers,
                            rooms,
                        });
                    }
                }
            }
            PairVars { pair, cells }
        })
        .collect()
}

#[derive(Default)]
struct Occupancy {
    class: HashSet<(usize, Weekday, u8)>,
    teacher: HashSet<(usize, Weekday, u8)>,
    room: HashSet<(usize, Weekday, u8)>,
}

/// One committed lesson: (pair index into vars, cell index, teacher, room).
type Commit = (usize, usize, usize, usize);

enum Step {
    Found,
    Exhausted,
    OverBudget,
}

struct Search<'a> {
    inst: &'a Instance,
    vars: &'a [PairVars],
    occ: Occupancy,
    chosen: Vec<Commit>,
    steps: u64,
    max_steps: u64,
    deadline: Option<Instant>,
}

impl Search<'_> {
    fn descend(&mut self, p: usize) -> Step {
        if p == self.vars.len() {
            return Step::Found;
        }
        self.place(p, 0, 0)
    }

    /// Places the remaining lessons of pair `p`, scanning cells from `from`
    /// upward. Cell indices increase within a pair, which removes the
    /// permutation symmetry between a pair's identical lessons.
    fn place(&mut self, p: usize, placed: u32, from: usize) -> Step {
        let vars = self.vars;
        let v = &vars[p];
        if placed == v.pair.load {
            return self.descend(p + 1);
        }

        let needed = (v.pair.load - placed) as usize;
        if v.cells.len().saturating_sub(from) < needed {
            return Step::Exhausted;
        }

        for ci in from..v.cells.len() {
            self.steps += 1;
            if self.over_budget() {
                return Step::OverBudget;
            }

            let cell = &v.cells[ci];
            let key = (v.pair.class, cell.day, cell.slot);
            if self.occ.class.contains(&key) {
                continue;
            }

            for &t in &cell.teachers {
                if self.occ.teacher.contains(&(t, cell.day, cell.slot)) {
                    continue;
                }
                for &r in &cell.rooms {
                    if self.occ.room.contains(&(r, cell.day, cell.slot)) {
                        continue;
                    }

                    self.occ.class.insert(key);
                    self.occ.teacher.insert((t, cell.day, cell.slot));
                    self.occ.room.insert((r, cell.day, cell.slot));
                    self.chosen.push((p, ci, t, r));

                    match self.place(p, placed + 1, ci + 1) {
                        Step::Found => return Step::Found,
                        Step::OverBudget => return Step::OverBudget,
                        Step::Exhausted => {
                            self.chosen.pop();
                            self.occ.class.remove(&key);
                            self.occ.teacher.remove(&(t, cell.day, cell.slot));
                            self.occ.room.remove(&(r, cell.day, cell.slot));
                        }
                    }
                }
            }
        }

        Step::Exhausted
    }

    fn over_budget(&self) -> bool {
        if self.steps > self.max_steps {
            return true;
        }
        // Clock check amortized; the step counter alone bounds tight loops.
        if self.steps % 1024 == 0 {
            if let Some(deadline) = self.deadline {
                return Instant::now() >= deadline;
            }
        }
        false
    }

    fn extract(&self) -> Vec<LessonAssignment> {
        self.chosen
            .iter()
            .map(|&(p, ci, t, r)| {
                let v = &self.vars[p];
                let cell = &v.cells[ci];
                let class = &self.inst.classes[v.pair.class];
                LessonAssignment::new(
                    class,
                    cell.day,
                    cell.slot,
                    self.inst.subjects[v.pair.subject].name.clone(),
                    self.inst.teachers[t].name.clone(),
                    self.inst.rooms[r].name.clone(),
                )
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sched_core::check::audit;
    use types::{
        BlockedSlot, ClassGroup, ClassName, Group, Room, Segment, SolveParams, Subject, Teacher,
        TeacherGroup,
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

    fn class(name: &str, segment: Segment) -> ClassGroup {
        ClassGroup {
            name: name.into(),
            grade: "6".into(),
            shift: "morning".into(),
            group: Group::A,
            segment,
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

    fn solved(outcome: SolveOutcome) -> Vec<LessonAssignment> {
        match outcome {
            SolveOutcome::Solved { assignments, .. } => assignments,
            other => panic!("expected Solved, got {other:?}"),
        }
    }

    #[test]
    fn single_subject_fills_exact_load() {
        // 1 class on EF_II, load 3, one fully available teacher, one room.
        let env = envelope(Instance {
            subjects: vec![subject("math", 3, &["6A"])],
            teachers: vec![teacher("ana", &["math"])],
            classes: vec![class("6A", Segment::EfII)],
            rooms: vec![room("r1")],
        });
        let assignments = solved(ExactSolver::new().solve(&env).unwrap());

        assert_eq!(assignments.len(), 3);
        let mut slots: Vec<_> = assignments.iter().map(|a| (a.day, a.slot)).collect();
        slots.sort();
        slots.dedup();
        assert_eq!(slots.len(), 3);
        assert!(assignments.iter().all(|a| a.slot != 3));
        assert!(audit(&env.instance, &assignments).is_empty());
    }

    #[test]
    fn demand_above_teacher_supply_is_infeasible() {
        // Two classes need 5 lessons each; the only teacher has 7 open
        // (day, slot) cells for the whole week.
        let mut t = teacher("ana", &["math"]);
        t.available_days = [Weekday::Mon, Weekday::Tue].into_iter().collect();
        for slot in [1u8, 2, 5] {
            t.blocked.insert(BlockedSlot {
                day: Weekday::Tue,
                slot,
            });
        }
        // Mon: slots 1,2,4,5,6 open (5); Tue: slots 4,6 open (2).
        let env = envelope(Instance {
            subjects: vec![subject("math", 5, &["6A", "6B"])],
            teachers: vec![t],
            classes: vec![class("6A", Segment::EfII), class("6B", Segment::EfII)],
            rooms: vec![room("r1"), room("r2")],
        });
        assert!(matches!(
            ExactSolver::new().solve(&env).unwrap(),
            SolveOutcome::Infeasible { .. }
        ));
    }

    #[test]
    fn teacher_with_no_days_is_infeasible() {
        let mut t = teacher("ana", &["math"]);
        t.available_days.clear();
        let env = envelope(Instance {
            subjects: vec![subject("math", 2, &["6A"])],
            teachers: vec![t],
            classes: vec![class("6A", Segment::EfII)],
            rooms: vec![room("r1")],
        });
        assert!(matches!(
            ExactSolver::new().solve(&env).unwrap(),
            SolveOutcome::Infeasible { .. }
        ));
    }

    #[test]
    fn no_rooms_is_infeasible() {
        let env = envelope(Instance {
            subjects: vec![subject("math", 1, &["6A"])],
            teachers: vec![teacher("ana", &["math"])],
            classes: vec![class("6A", Segment::EfII)],
            rooms: vec![],
        });
        assert!(matches!(
            ExactSolver::new().solve(&env).unwrap(),
            SolveOutcome::Infeasible { .. }
        ));
    }

    #[test]
    fn empty_scope_solves_trivially() {
        let env = envelope(Instance {
            subjects: vec![],
            teachers: vec![],
            classes: vec![class("6A", Segment::EfII)],
            rooms: vec![],
        });
        assert!(solved(ExactSolver::new().solve(&env).unwrap()).is_empty());
    }

    #[test]
    fn step_budget_reports_resource_exhausted() {
        let mut env = envelope(Instance {
            subjects: vec![subject("math", 3, &["6A"])],
            teachers: vec![teacher("ana", &["math"])],
            classes: vec![class("6A", Segment::EfII)],
            rooms: vec![room("r1")],
        });
        env.params.max_steps = 0;
        assert!(matches!(
            ExactSolver::new().solve(&env).unwrap(),
            SolveOutcome::ResourceExhausted { .. }
        ));
    }

    #[test]
    fn expired_deadline_reports_resource_exhausted() {
        // 26 lessons cannot fit 25 room cells, but proving that takes far
        // more than 1024 probes, so the clock check fires first.
        let mut env = envelope(Instance {
            subjects: vec![subject("math", 13, &["6A", "6B"])],
            teachers: vec![teacher("ana", &["math"]), teacher("bia", &["math"])],
            classes: vec![class("6A", Segment::EfII), class("6B", Segment::EfII)],
            rooms: vec![room("r1")],
        });
        env.params.time_limit = Some(std::time::Duration::ZERO);
        assert!(matches!(
            ExactSolver::new().solve(&env).unwrap(),
            SolveOutcome::ResourceExhausted { .. }
        ));
    }

    #[test]
    fn shared_teacher_forces_disjoint_slots() {
        // One teacher, two classes, enough room capacity; the teacher must
        // never be in two places at once.
        let env = envelope(Instance {
            subjects: vec![subject("math", 4, &["6A", "6B"])],
            teachers: vec![teacher("ana", &["math"])],
            classes: vec![class("6A", Segment::EfII), class("6B", Segment::EfII)],
            rooms: vec![room("r1"), room("r2")],
        });
        let assignments = solved(ExactSolver::new().solve(&env).unwrap());
        assert_eq!(assignments.len(), 8);
        assert!(audit(&env.instance, &assignments).is_empty());
    }

    #[test]
    fn mixed_segments_respect_their_breaks() {
        let env = envelope(Instance {
            subjects: vec![
                subject("math", 5, &["6A", "1EM"]),
                subject("arts", 2, &["1EM"]),
            ],
            teachers: vec![teacher("ana", &["math"]), teacher("bia", &["arts"])],
            classes: vec![class("6A", Segment::EfII), class("1EM", Segment::Em)],
            rooms: vec![room("r1"), room("r2")],
        });
        let assignments = solved(ExactSolver::new().solve(&env).unwrap());
        assert_eq!(assignments.len(), 12);
        for a in &assignments {
            let seg = env.instance.class(&a.class).unwrap().segment;
            assert!(!seg.is_break(a.slot));
        }
        assert!(audit(&env.instance, &assignments).is_empty());
    }

    #[test]
    fn room_contention_is_respected() {
        // Two classes, two teachers, a single room: at most one lesson per
        // (day, slot) overall. 2*10=20 lessons fit in 25 open cells.
        let env = envelope(Instance {
            subjects: vec![subject("math", 10, &["6A", "6B"])],
            teachers: vec![teacher("ana", &["math"]), teacher("bia", &["math"])],
            classes: vec![class("6A", Segment::EfII), class("6B", Segment::EfII)],
            rooms: vec![room("r1")],
        });
        let assignments = solved(ExactSolver::new().solve(&env).unwrap());
        assert_eq!(assignments.len(), 20);
        assert!(audit(&env.instance, &assignments).is_empty());
    }
}
