use std::collections::HashMap;
use types::{ClassGroup, Instance, Subject, Weekday};

/// Computes, for a (class, subject, day, slot) tuple, the teachers and rooms
/// structurally eligible to fill it. Empty lists mark a structural gap,
/// excluded from the solvers' variable space rather than reported as an error.
pub struct CandidateResolver<'a> {
    inst: &'a Instance,
    teacher_idx: HashMap<&'a str, usize>,
    room_idx: HashMap<&'a str, usize>,
    class_idx: HashMap<&'a str, usize>,
}

impl<'a> CandidateResolver<'a> {
    pub fn new(inst: &'a Instance) -> Self {
        let teacher_idx = inst
            .teachers
            .iter()
            .enumerate()
            .map(|(i, t)| (t.name.0.as_str(), i))
            .collect();
        let room_idx = inst
            .rooms
            .iter()
            .enumerate()
            .map(|(i, r)| (r.name.0.as_str(), i))
            .collect();
        let class_idx = inst
            .classes
            .iter()
            .enumerate()
            .map(|(i, c)| (c.name.0.as_str(), i))
            .collect();
        Self {
            inst,
            teacher_idx,
            room_idx,
            class_idx,
        }
    }

    pub fn instance(&self) -> &'a Instance {
        self.inst
    }

    pub fn teacher_index(&self, name: &str) -> Option<usize> {
        self.teacher_idx.get(name).copied()
    }

    pub fn room_index(&self, name: &str) -> Option<usize> {
        self.room_idx.get(name).copied()
    }

    pub fn class_index(&self, name: &str) -> Option<usize> {
        self.class_idx.get(name).copied()
    }

    /// True when the slot exists for the class's segment and is not its break.
    pub fn slot_open(&self, class: &ClassGroup, slot: u8) -> bool {
        class.segment.slots().contains(&slot) && !class.segment.is_break(slot)
    }

    /// Teachers eligible for this exact tuple, in declaration order:
    /// teaches the subject, group tag compatible, day available, slot not
    /// blocked. Returns indices into the instance's teacher vector.
    pub fn eligible_teachers(
        &self,
        class: &ClassGroup,
        subject: &Subject,
        day: Weekday,
        slot: u8,
    ) -> Vec<usize> {
        if !self.slot_open(class, slot) {
            return Vec::new();
        }
        self.inst
            .teachers
            .iter()
            .enumerate()
            .filter(|(_, t)| {
                t.teaches(&subject.name) && t.group.matches(class.group) && t.is_free(day, slot)
            })
            .map(|(i, _)| i)
            .collect()
    }

    /// Rooms eligible for this tuple, in declaration order. The base model
    /// couples no room attribute to subjects: every declared room qualifies.
    pub fn eligible_rooms(&self, class: &ClassGroup, _day: Weekday, slot: u8) -> Vec<usize> {
        if !self.slot_open(class, slot) {
            return Vec::new();
        }
        (0..self.inst.rooms.len()).collect()
    }
}
