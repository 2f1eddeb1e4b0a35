//! Randomized greedy fallback solver with a bounded retry budget per
//! demand unit. Lessons it cannot place are reported as unallocated.

use rand::seq::SliceRandom;
use rand::Rng;
use rand_chacha::rand_core::SeedableRng;
use rand_chacha::ChaCha8Rng;
use sched_core::demand::{demand_pairs, expand_units};
use sched_core::resolver::CandidateResolver;
use sched_core::{SolveEnvelope, SolveOutcome, Solver};
use std::collections::HashSet;
use tracing::{debug, info};
use types::{LessonAssignment, UnmetDemand, Weekday, WEEKDAYS};

pub struct HeurSolver;

impl HeurSolver {
    pub fn new() -> Self {
        Self
    }
}

impl Default for HeurSolver {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Default)]
struct Occupancy {
    class: HashSet<(usize, Weekday, u8)>,
    teacher: HashSet<(usize, Weekday, u8)>,
    room: HashSet<(usize, Weekday, u8)>,
}

impl Solver for HeurSolver {
    fn solve(&self, env: &SolveEnvelope) -> anyhow::Result<SolveOutcome> {
        let inst = &env.instance;
        let mut rng = ChaCha8Rng::seed_from_u64(env.params.seed);
        let resolver = CandidateResolver::new(inst);

        let pairs = demand_pairs(inst);
        let mut units = expand_units(&pairs);
        units.shuffle(&mut rng);
        info!(
            units = units.len(),
            seed = env.params.seed,
            retry_budget = env.params.retry_budget,
            "heuristic solve started"
        );

        let mut occ = Occupancy::default();
        let mut assignments: Vec<LessonAssignment> = Vec::new();
        let mut unallocated: Vec<UnmetDemand> = Vec::new();

        for &pi in &units {
            let pair = pairs[pi];
            let class = &inst.classes[pair.class];
            let subject = &inst.subjects[pair.subject];

            let mut committed = false;
            for _attempt in 0..env.params.retry_budget {
                let day = WEEKDAYS[rng.gen_range(0..WEEKDAYS.len())];
                let slots = class.segment.slots();
                let slot = rng.gen_range(*slots.start()..=*slots.end());
                if class.segment.is_break(slot) {
                    continue;
                }
                if occ.class.contains(&(pair.class, day, slot)) {
                    continue;
                }

                let teachers: Vec<usize> = resolver
                    .eligible_teachers(class, subject, day, slot)
                    .into_iter()
                    .filter(|&t| !occ.teacher.contains(&(t, day, slot)))
                    .collect();
                let Some(&t) = teachers.choose(&mut rng) else {
                    continue;
                };

                let rooms: Vec<usize> = resolver
                    .eligible_rooms(class, day, slot)
                    .into_iter()
                    .filter(|&r| !occ.room.contains(&(r, day, slot)))
                    .collect();
                let Some(&r) = rooms.choose(&mut rng) else {
                    continue;
                };

                occ.class.insert((pair.class, day, slot));
                occ.teacher.insert((t, day, slot));
                occ.room.insert((r, day, slot));
                assignments.push(LessonAssignment::new(
                    class,
                    day,
                    slot,
                    subject.name.clone(),
                    inst.teachers[t].name.clone(),
                    inst.rooms[r].name.clone(),
                ));
                committed = true;
                break;
            }

            if !committed {
                debug!(class = %class.name, subject = %subject.name, "demand unit unallocated");
                unallocated.push(UnmetDemand {
                    class: class.name.clone(),
                    subject: subject.name.clone(),
                });
            }
        }

        info!(
            placed = assignments.len(),
            unallocated = unallocated.len(),
            "heuristic solve finished"
        );
        let stats = serde_json::json!({
            "method": "randomized-greedy",
            "seed": env.params.seed,
            "retry_budget": env.params.retry_budget,
            "placed": assignments.len(),
            "unallocated": unallocated.len(),
        });
        if unallocated.is_empty() {
            Ok(SolveOutcome::Solved { assignments, stats })
        } else {
            Ok(SolveOutcome::Partial {
                assignments,
                unallocated,
                stats,
            })
        }
    }
}
