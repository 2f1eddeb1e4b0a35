use types::Instance;

/// One in-scope (class, subject) pair and the weekly load owed to it.
/// Indices point into the instance's `classes` / `subjects` vectors.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct DemandPair {
    pub class: usize,
    pub subject: usize,
    pub load: u32,
}

/// A (class, subject) pair is in scope iff the class appears in the
/// subject's class list and both carry the same group tag.
pub fn demand_pairs(inst: &Instance) -> Vec<DemandPair> {
    let mut pairs = Vec::new();
    for (ci, class) in inst.classes.iter().enumerate() {
        for (si, subject) in inst.subjects.iter().enumerate() {
            if subject.classes.contains(&class.name) && subject.group == class.group {
                pairs.push(DemandPair {
                    class: ci,
                    subject: si,
                    load: subject.weekly_load,
                });
            }
        }
    }
    pairs
}

/// Flattens pairs into individual demand units (one per required lesson),
/// as indices back into `pairs`.
pub fn expand_units(pairs: &[DemandPair]) -> Vec<usize> {
    let mut units = Vec::new();
    for (pi, p) in pairs.iter().enumerate() {
        for _ in 0..p.load {
            units.push(pi);
        }
    }
    units
}
