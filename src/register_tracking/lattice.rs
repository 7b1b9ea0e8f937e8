use crate::{
    mono::{Lattice, LatticeElement},
    reil::is_temporary_register,
};
use std::{collections::BTreeSet, fmt, mem};

pub type Registers = BTreeSet<String>;

/// Taint state of the registers at one edge.
///
/// The working sets collect what the micro-instructions of the current native
/// instruction did. When the state leaves the native instruction they are
/// moved to the `native_*` sets, which are what the accessors report.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct RegisterSet {
    tainted: Registers,
    newly_tainted: Registers,
    untainted: Registers,
    read: Registers,
    updated: Registers,
    native_newly_tainted: Registers,
    native_untainted: Registers,
    native_read: Registers,
    native_updated: Registers,
}

impl RegisterSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed state: the register is tainted by the current instruction.
    pub fn new_tainted<S: Into<String>>(register: S) -> Self {
        let register = register.into();

        let mut state = Self::new();
        state.newly_tainted.insert(register.clone());
        state.tainted.insert(register);

        state
    }

    /// State with already tainted registers and no history.
    pub fn with_tainted<I, S>(registers: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            tainted: registers.into_iter().map(Into::into).collect(),
            ..Self::default()
        }
    }

    pub fn is_tainted(&self, register: &str) -> bool {
        self.tainted.contains(register)
    }

    pub fn is_any_tainted<I>(&self, registers: I) -> bool
    where
        I: IntoIterator,
        I::Item: AsRef<str>,
    {
        registers.into_iter().any(|r| self.is_tainted(r.as_ref()))
    }

    pub fn taint(&mut self, register: &str) {
        if self.is_tainted(register) || self.untainted.contains(register) {
            self.updated.insert(register.to_string());
        } else {
            self.newly_tainted.insert(register.to_string());
        }

        self.tainted.insert(register.to_string());
        self.untainted.remove(register);
    }

    pub fn taint_all<I>(&mut self, registers: I)
    where
        I: IntoIterator,
        I::Item: AsRef<str>,
    {
        registers.into_iter().for_each(|r| self.taint(r.as_ref()));
    }

    /// Untainting a register that is not tainted has no effect.
    pub fn untaint(&mut self, register: &str) {
        if self.tainted.remove(register) {
            self.untainted.insert(register.to_string());
        }
    }

    pub fn untaint_all<I>(&mut self, registers: I)
    where
        I: IntoIterator,
        I::Item: AsRef<str>,
    {
        registers.into_iter().for_each(|r| self.untaint(r.as_ref()));
    }

    pub fn add_read_register(&mut self, register: &str) {
        self.read.insert(register.to_string());
    }

    pub fn tainted_registers(&self) -> &Registers {
        &self.tainted
    }

    pub fn newly_tainted_registers(&self) -> &Registers {
        &self.native_newly_tainted
    }

    pub fn untainted_registers(&self) -> &Registers {
        &self.native_untainted
    }

    pub fn read_registers(&self) -> &Registers {
        &self.native_read
    }

    pub fn updated_registers(&self) -> &Registers {
        &self.native_updated
    }

    fn sets(&self) -> [&Registers; 9] {
        [
            &self.tainted,
            &self.newly_tainted,
            &self.untainted,
            &self.read,
            &self.updated,
            &self.native_newly_tainted,
            &self.native_untainted,
            &self.native_read,
            &self.native_updated,
        ]
    }

    fn sets_mut(&mut self) -> [&mut Registers; 9] {
        [
            &mut self.tainted,
            &mut self.newly_tainted,
            &mut self.untainted,
            &mut self.read,
            &mut self.updated,
            &mut self.native_newly_tainted,
            &mut self.native_untainted,
            &mut self.native_read,
            &mut self.native_updated,
        ]
    }
}

impl LatticeElement for RegisterSet {
    fn on_instruction_exit(&mut self) {
        for set in self.sets_mut().iter_mut().take(5) {
            set.retain(|r| !is_temporary_register(r));
        }

        self.native_newly_tainted = mem::take(&mut self.newly_tainted);
        self.native_untainted = mem::take(&mut self.untainted);
        self.native_read = mem::take(&mut self.read);
        self.native_updated = mem::take(&mut self.updated);
    }
}

fn format_registers(registers: &Registers) -> String {
    registers.iter().cloned().collect::<Vec<_>>().join(", ")
}

impl fmt::Display for RegisterSet {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        writeln!(f, "tainted: [{}]", format_registers(&self.tainted))?;
        writeln!(f, "newly tainted: [{}]", format_registers(&self.native_newly_tainted))?;
        writeln!(f, "untainted: [{}]", format_registers(&self.native_untainted))?;
        writeln!(f, "read: [{}]", format_registers(&self.native_read))?;
        write!(f, "updated: [{}]", format_registers(&self.native_updated))
    }
}

/// Powerset lattice over `RegisterSet`, ordered by inclusion of every
/// component set.
#[derive(Clone, Copy, Debug, Default)]
pub struct RegisterSetLattice;

impl Lattice for RegisterSetLattice {
    type Element = RegisterSet;

    fn is_smaller_equal(&self, lhs: &RegisterSet, rhs: &RegisterSet) -> bool {
        lhs.sets()
            .iter()
            .zip(rhs.sets().iter())
            .all(|(l, r)| l.is_subset(r))
    }

    fn combine(&self, elements: &[&RegisterSet]) -> RegisterSet {
        let mut joined = RegisterSet::new();

        for element in elements {
            for (target, source) in joined.sets_mut().iter_mut().zip(element.sets().iter()) {
                target.extend(source.iter().cloned());
            }
        }

        joined
    }

    fn minimal_element(&self) -> RegisterSet {
        RegisterSet::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn registers(names: &[&str]) -> Registers {
        names.iter().map(|n| n.to_string()).collect()
    }

    #[test]
    fn taint_distinguishes_new_from_updated_registers() {
        let mut state = RegisterSet::with_tainted(vec!["eax"]);

        state.taint("eax");
        state.taint("ebx");
        state.untaint("ecx");
        state.untaint("eax");
        state.taint("eax");
        state.on_instruction_exit();

        assert_eq!(state.tainted_registers(), &registers(&["eax", "ebx"]));
        assert_eq!(state.newly_tainted_registers(), &registers(&["ebx"]));
        assert_eq!(state.updated_registers(), &registers(&["eax"]));
        assert!(
            state.untainted_registers().is_empty(),
            "retainting removes the register from the untainted set"
        );
    }

    #[test]
    fn instruction_exit_drops_temporaries_and_resets_history() {
        let mut state = RegisterSet::new_tainted("eax");
        state.taint("t0");
        state.add_read_register("t1");
        state.add_read_register("eax");
        state.untaint("eax");

        state.on_instruction_exit();

        assert!(state.tainted_registers().is_empty(), "{}", state);
        assert_eq!(state.newly_tainted_registers(), &registers(&["eax"]));
        assert_eq!(state.read_registers(), &registers(&["eax"]));
        assert_eq!(state.untainted_registers(), &registers(&["eax"]));

        state.on_instruction_exit();

        assert!(
            state.newly_tainted_registers().is_empty(),
            "second exit moves the empty working sets"
        );
    }

    #[test]
    fn join_laws() {
        let lattice = RegisterSetLattice;

        let mut a = RegisterSet::new_tainted("eax");
        a.on_instruction_exit();
        let mut b = RegisterSet::with_tainted(vec!["ebx"]);
        b.add_read_register("ecx");
        let mut c = RegisterSet::with_tainted(vec!["ecx"]);
        c.untaint("ecx");
        let bottom = lattice.minimal_element();

        assert_eq!(lattice.combine(&[]), bottom);
        assert_eq!(lattice.combine(&[&a]), a);
        assert_eq!(lattice.combine(&[&a, &a]), a);
        assert_eq!(lattice.combine(&[&a, &b]), lattice.combine(&[&b, &a]));
        assert_eq!(
            lattice.combine(&[&lattice.combine(&[&a, &b]), &c]),
            lattice.combine(&[&a, &lattice.combine(&[&b, &c])])
        );

        let joined = lattice.combine(&[&a, &b]);

        assert!(lattice.is_smaller_equal(&a, &joined));
        assert!(lattice.is_smaller_equal(&b, &joined));
        assert!(lattice.is_smaller_equal(&bottom, &a));
        assert!(!lattice.is_smaller_equal(&joined, &a));
    }
}
