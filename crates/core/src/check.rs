use std::collections::HashSet;
use types::{Instance, LessonAssignment};

/// Audits a timetable against the hard invariants. A non-empty return is an
/// internal invariant violation and the run that produced it is fatal.
pub fn audit(inst: &Instance, assignments: &[LessonAssignment]) -> Vec<String> {
    let mut problems = Vec::new();

    let mut class_busy = HashSet::new();
    let mut teacher_busy = HashSet::new();
    let mut room_busy = HashSet::new();

    for a in assignments {
        if !class_busy.insert((&a.class.0, a.day, a.slot)) {
            problems.push(format!("class {} double-booked at {:?}/{}", a.class, a.day, a.slot));
        }
        if !teacher_busy.insert((&a.teacher.0, a.day, a.slot)) {
            problems.push(format!(
                "teacher {} double-booked at {:?}/{}",
                a.teacher, a.day, a.slot
            ));
        }
        if !room_busy.insert((&a.room.0, a.day, a.slot)) {
            problems.push(format!("room {} double-booked at {:?}/{}", a.room, a.day, a.slot));
        }

        let Some(class) = inst.class(&a.class) else {
            problems.push(format!("assignment references missing class {}", a.class));
            continue;
        };
        if !class.segment.slots().contains(&a.slot) {
            problems.push(format!("class {} assigned outside its slot range: {}", a.class, a.slot));
        }
        if class.segment.is_break(a.slot) {
            problems.push(format!("class {} assigned on its break slot {}", a.class, a.slot));
        }

        match inst.teachers.iter().find(|t| t.name == a.teacher) {
            None => problems.push(format!("assignment references missing teacher {}", a.teacher)),
            Some(t) => {
                if !t.teaches(&a.subject) {
                    problems.push(format!("teacher {} does not teach {}", a.teacher, a.subject));
                }
                if !t.group.matches(class.group) {
                    problems.push(format!(
                        "teacher {} group incompatible with class {}",
                        a.teacher, a.class
                    ));
                }
                if !t.is_free(a.day, a.slot) {
                    problems.push(format!(
                        "teacher {} unavailable at {:?}/{}",
                        a.teacher, a.day, a.slot
                    ));
                }
            }
        }

        if !inst.rooms.iter().any(|r| r.name == a.room) {
            problems.push(format!("assignment references missing room {}", a.room));
        }
    }

    problems
}
