use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use std::time::Duration;
use uuid::Uuid;

macro_rules! name_newtype {
    ($name:ident) => {
        #[derive(Clone, Debug, Serialize, Deserialize, Eq, PartialEq, Ord, PartialOrd, Hash)]
        #[serde(transparent)]
        pub struct $name(pub String);

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                self.0.fmt(f)
            }
        }

        impl From<&str> for $name {
            fn from(s: &str) -> Self {
                Self(s.to_string())
            }
        }
    };
}
name_newtype!(SubjectName);
name_newtype!(TeacherName);
name_newtype!(ClassName);
name_newtype!(RoomName);

#[derive(Clone, Copy, Debug, Serialize, Deserialize, Eq, PartialEq, Ord, PartialOrd, Hash)]
#[serde(rename_all = "lowercase")]
pub enum Weekday {
    Mon,
    Tue,
    Wed,
    Thu,
    Fri,
}

pub const WEEKDAYS: [Weekday; 5] = [
    Weekday::Mon,
    Weekday::Tue,
    Weekday::Wed,
    Weekday::Thu,
    Weekday::Fri,
];

#[derive(Clone, Copy, Debug, Serialize, Deserialize, Eq, PartialEq, Hash, Default)]
#[serde(rename_all = "lowercase")]
pub enum Group {
    #[default]
    A,
    B,
}

#[derive(Clone, Copy, Debug, Serialize, Deserialize, Eq, PartialEq, Hash, Default)]
#[serde(rename_all = "lowercase")]
pub enum TeacherGroup {
    #[default]
    A,
    B,
    Both,
}

impl TeacherGroup {
    pub fn matches(self, group: Group) -> bool {
        match self {
            TeacherGroup::Both => true,
            TeacherGroup::A => group == Group::A,
            TeacherGroup::B => group == Group::B,
        }
    }
}

#[derive(Clone, Copy, Debug, Serialize, Deserialize, Eq, PartialEq, Hash, Default)]
#[serde(rename_all = "lowercase")]
pub enum SubjectKind {
    Heavy,
    #[default]
    Medium,
    Light,
    Practical,
}

#[derive(Clone, Copy, Debug, Serialize, Deserialize, Eq, PartialEq, Hash, Default)]
#[serde(rename_all = "lowercase")]
pub enum RoomKind {
    #[default]
    Normal,
    Laboratory,
    Auditorium,
}

/// Weekly slot calendar shape of a class. `EfII` runs 6 slots a day with
/// slot 3 reserved for the break; `Em` runs 7 slots with slot 4 reserved.
#[derive(Clone, Copy, Debug, Serialize, Deserialize, Eq, PartialEq, Hash)]
pub enum Segment {
    #[serde(rename = "EF_II")]
    EfII,
    #[serde(rename = "EM")]
    Em,
}

const EF_II_TIMES: [&str; 6] = [
    "07:50-08:40",
    "08:40-09:30",
    "09:30-09:50",
    "09:50-10:40",
    "10:40-11:30",
    "11:30-12:20",
];

const EM_TIMES: [&str; 7] = [
    "07:00-07:50",
    "07:50-08:40",
    "08:40-09:30",
    "09:30-09:50",
    "09:50-10:40",
    "10:40-11:30",
    "11:30-12:20",
];

impl Segment {
    pub fn slots(self) -> std::ops::RangeInclusive<u8> {
        match self {
            Segment::EfII => 1..=6,
            Segment::Em => 1..=7,
        }
    }

    pub fn break_slot(self) -> u8 {
        match self {
            Segment::EfII => 3,
            Segment::Em => 4,
        }
    }

    pub fn is_break(self, slot: u8) -> bool {
        slot == self.break_slot()
    }

    /// Display time-of-day range for a slot; carries no scheduling semantics.
    pub fn real_time(self, slot: u8) -> Option<&'static str> {
        let table: &[&str] = match self {
            Segment::EfII => &EF_II_TIMES,
            Segment::Em => &EM_TIMES,
        };
        table.get(slot.checked_sub(1)? as usize).copied()
    }
}

fn default_background() -> String {
    "#4A90E2".to_string()
}

fn default_font() -> String {
    "#FFFFFF".to_string()
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Subject {
    pub name: SubjectName,
    pub weekly_load: u32,
    #[serde(default)]
    pub kind: SubjectKind,
    pub classes: Vec<ClassName>,
    #[serde(default)]
    pub group: Group,
    #[serde(default = "default_background")]
    pub background_color: String,
    #[serde(default = "default_font")]
    pub font_color: String,
}

#[derive(Clone, Copy, Debug, Serialize, Deserialize, Eq, PartialEq, Hash)]
pub struct BlockedSlot {
    pub day: Weekday,
    pub slot: u8,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Teacher {
    pub name: TeacherName,
    pub subjects: Vec<SubjectName>,
    #[serde(default)]
    pub group: TeacherGroup,
    #[serde(default)]
    pub available_days: HashSet<Weekday>,
    #[serde(default)]
    pub blocked: HashSet<BlockedSlot>,
}

impl Teacher {
    pub fn teaches(&self, subject: &SubjectName) -> bool {
        self.subjects.contains(subject)
    }

    pub fn is_free(&self, day: Weekday, slot: u8) -> bool {
        self.available_days.contains(&day) && !self.blocked.contains(&BlockedSlot { day, slot })
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ClassGroup {
    pub name: ClassName,
    pub grade: String,
    #[serde(default)]
    pub shift: String,
    #[serde(default)]
    pub group: Group,
    pub segment: Segment,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Room {
    pub name: RoomName,
    pub capacity: u32,
    #[serde(default)]
    pub kind: RoomKind,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct LessonAssignment {
    pub id: Uuid,
    pub class: ClassName,
    pub day: Weekday,
    pub slot: u8,
    pub real_time: String,
    pub subject: SubjectName,
    pub teacher: TeacherName,
    pub room: RoomName,
    pub group: Group,
}

impl LessonAssignment {
    pub fn new(
        class: &ClassGroup,
        day: Weekday,
        slot: u8,
        subject: SubjectName,
        teacher: TeacherName,
        room: RoomName,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            class: class.name.clone(),
            day,
            slot,
            real_time: class
                .segment
                .real_time(slot)
                .unwrap_or_default()
                .to_string(),
            subject,
            teacher,
            room,
            group: class.group,
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize, Eq, PartialEq, Hash)]
pub struct UnmetDemand {
    pub class: ClassName,
    pub subject: SubjectName,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Instance {
    pub subjects: Vec<Subject>,
    pub teachers: Vec<Teacher>,
    pub classes: Vec<ClassGroup>,
    pub rooms: Vec<Room>,
}

impl Instance {
    pub fn class(&self, name: &ClassName) -> Option<&ClassGroup> {
        self.classes.iter().find(|c| &c.name == name)
    }

    pub fn subject(&self, name: &SubjectName) -> Option<&Subject> {
        self.subjects.iter().find(|s| &s.name == name)
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SolveParams {
    pub seed: u64,
    pub max_steps: u64,
    #[serde(default)]
    pub time_limit: Option<Duration>,
    pub retry_budget: u32,
}

impl Default for SolveParams {
    fn default() -> Self {
        Self {
            seed: 0,
            max_steps: 2_000_000,
            time_limit: None,
            retry_budget: 1000,
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SolveEnvelope {
    pub instance: Instance,
    #[serde(default)]
    pub params: SolveParams,
}

#[derive(Clone, Copy, Debug, Serialize, Deserialize, Eq, PartialEq)]
#[serde(rename_all = "lowercase")]
pub enum ScheduleMethod {
    Exact,
    Heuristic,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ScheduleResult {
    pub method: ScheduleMethod,
    pub assignments: Vec<LessonAssignment>,
    pub unallocated: Vec<UnmetDemand>,
    pub stats: serde_json::Value,
}
