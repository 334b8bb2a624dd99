//! Definite assignment of registers, a "must" analysis with catch handlers.

use dwflow::dataflow::controlflow::{Branch, Guard, Instruction, NodeIndex};
use dwflow::dataflow::errors::TransferResult;
use dwflow::prelude::*;
use std::collections::BTreeSet;

#[derive(Debug, Clone, PartialEq, Eq)]
enum Instr {
    Store(u8),
    Invoke,
    Nop,
}

impl Instruction for Instr {
    fn can_throw(&self) -> bool {
        matches!(self, Self::Invoke)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Assigned {
    Unreached,
    Regs(BTreeSet<u8>),
}

impl Assigned {
    fn regs<const N: usize>(regs: [u8; N]) -> Self {
        Self::Regs(regs.into_iter().collect())
    }
}

impl AbstractState for Assigned {
    fn join(&self, other: &Self) -> Self {
        match (self, other) {
            (Self::Unreached, s) | (s, Self::Unreached) => s.clone(),
            (Self::Regs(r1), Self::Regs(r2)) => {
                Self::Regs(r1.intersection(r2).copied().collect())
            }
        }
    }
}

struct DefiniteAssignment;

impl TransferFunction<Cfg<Instr>> for DefiniteAssignment {
    type State = Assigned;

    fn apply(&self, instr: &Instr, state: Assigned) -> TransferResult<Assigned> {
        Ok(match (instr, state) {
            (Instr::Store(reg), Assigned::Regs(mut regs)) => {
                regs.insert(*reg);
                Assigned::Regs(regs)
            }
            (_, state) => state,
        })
    }

    fn initial_state(&self, _: NodeIndex, _: &Assigned) -> Assigned {
        Assigned::Regs(BTreeSet::new())
    }
}

// entry: store 0; invoke; store 1 --> exit
//    \--catch--> handler: store 2 --> exit
fn try_catch() -> (Cfg<Instr>, [NodeIndex; 3]) {
    let mut builder = CfgBuilder::new();
    let entry = builder.add_block(vec![Instr::Store(0), Instr::Invoke, Instr::Store(1)]);
    let handler = builder.add_block(vec![Instr::Store(2)]);
    let exit = builder.add_block(vec![Instr::Nop]);
    builder
        .add_edge(entry, exit, Branch::Sequence)
        .add_edge(entry, handler, Branch::Catch(Guard::Class("IOException".into())))
        .add_edge(handler, exit, Branch::Jmp);
    (builder.build().unwrap(), [entry, handler, exit])
}

#[test]
fn handler_sees_state_before_throw() {
    let (cfg, [entry, handler, exit]) = try_catch();
    let mut analysis = IntraproceduralDataflow::new(&cfg, &DefiniteAssignment, Assigned::Unreached);
    let res = analysis.run(cfg.entry_block()).unwrap();

    assert_eq!(res.exit_state(entry), Some(&Assigned::regs([0, 1])));
    assert_eq!(res.exit_state(handler), Some(&Assigned::regs([0, 2])));
    assert_eq!(res.exit_state(exit), Some(&Assigned::regs([0])));
    assert_eq!(
        analysis.compute_block_entry_state(handler),
        Assigned::regs([0])
    );
}

#[test]
fn states_before_each_instruction() {
    let (cfg, [entry, _, _]) = try_catch();
    let mut analysis = IntraproceduralDataflow::new(&cfg, &DefiniteAssignment, Assigned::Unreached);
    analysis.run(entry).unwrap();

    let mut before = Vec::new();
    analysis
        .visit_instruction_states(|block, instr, state| {
            if block == entry {
                before.push((instr.clone(), state.clone()));
            }
        })
        .unwrap();
    assert_eq!(
        before,
        vec![
            (Instr::Store(0), Assigned::regs([])),
            (Instr::Invoke, Assigned::regs([0])),
            (Instr::Store(1), Assigned::regs([0])),
        ]
    );
}

#[test]
fn dot_rendering_shows_catch_edges() {
    let (cfg, _) = try_catch();
    // Instr has no Display, render the block sizes instead
    let mut builder = CfgBuilder::new();
    for (_, block) in cfg.iter_blocks() {
        builder.add_block(vec![Summary(block.len(), block.can_throw())]);
    }
    for (src, dst, branch) in cfg.edges() {
        builder.add_edge(src, dst, branch.clone());
    }
    let dot = builder.build().unwrap().to_dot();
    assert!(dot.contains("<catch IOException>"));
    assert!(dot.contains("<jmp>"));
}

#[derive(Debug)]
struct Summary(usize, bool);

impl Instruction for Summary {
    fn can_throw(&self) -> bool {
        self.1
    }
}

impl std::fmt::Display for Summary {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(f, "{} instructions", self.0)
    }
}
