//! Toy parity domain over a tiny instruction set, shared by unit tests.

use crate::controlflow::{Branch, Cfg, CfgBuilder, Instruction};
use crate::errors::{TransferFailure, TransferResult};
use crate::lattice::AbstractState;
use crate::transfer::TransferFunction;
use petgraph::graph::NodeIndex;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Parity {
    Bottom,
    Odd,
    Even,
    Top,
}

impl AbstractState for Parity {
    fn join(&self, other: &Self) -> Self {
        match (self, other) {
            (Self::Bottom, s) | (s, Self::Bottom) => *s,
            (s1, s2) if s1 == s2 => *s1,
            _ => Self::Top,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Op {
    Nop,
    Set(Parity),
    Inc,
    Call,
    Fail,
}

impl fmt::Display for Op {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Self::Nop => write!(f, "nop"),
            Self::Set(parity) => write!(f, "set {parity:?}"),
            Self::Inc => write!(f, "inc"),
            Self::Call => write!(f, "call"),
            Self::Fail => write!(f, "fail"),
        }
    }
}

impl Instruction for Op {
    fn can_throw(&self) -> bool {
        matches!(self, Self::Call)
    }
}

pub struct ParityTransfer;

impl TransferFunction<Cfg<Op>> for ParityTransfer {
    type State = Parity;

    fn apply(&self, instr: &Op, state: Parity) -> TransferResult<Parity> {
        match instr {
            Op::Nop | Op::Call => Ok(state),
            Op::Set(parity) => Ok(*parity),
            Op::Inc => Ok(match state {
                Parity::Odd => Parity::Even,
                Parity::Even => Parity::Odd,
                other => other,
            }),
            Op::Fail => Err(TransferFailure::Unsupported(instr.to_string())),
        }
    }
}

/// entry -> (left: set odd | right: set even) -> merge
pub fn diamond() -> (Cfg<Op>, [NodeIndex; 4]) {
    let mut builder = CfgBuilder::new();
    let entry = builder.add_block(vec![Op::Nop]);
    let left = builder.add_block(vec![Op::Set(Parity::Odd)]);
    let right = builder.add_block(vec![Op::Set(Parity::Even)]);
    let merge = builder.add_block(vec![Op::Nop]);
    builder
        .add_edge(entry, left, Branch::IfTrue)
        .add_edge(entry, right, Branch::IfFalse)
        .add_edge(left, merge, Branch::Jmp)
        .add_edge(right, merge, Branch::Sequence);
    (builder.build().unwrap(), [entry, left, right, merge])
}

/// entry: set even -> header -> (body: inc -> header | exit)
pub fn counting_loop() -> (Cfg<Op>, [NodeIndex; 4]) {
    let mut builder = CfgBuilder::new();
    let entry = builder.add_block(vec![Op::Set(Parity::Even)]);
    let header = builder.add_block(vec![Op::Nop]);
    let body = builder.add_block(vec![Op::Inc]);
    let exit = builder.add_block(vec![Op::Nop]);
    builder
        .add_edge(entry, header, Branch::Sequence)
        .add_edge(header, body, Branch::IfTrue)
        .add_edge(header, exit, Branch::IfFalse)
        .add_edge(body, header, Branch::Jmp);
    (builder.build().unwrap(), [entry, header, body, exit])
}

/// set odd; inc; inc; inc, one instruction per block
pub fn straight_line() -> (Cfg<Op>, Vec<NodeIndex>) {
    let mut builder = CfgBuilder::new();
    let mut blocks = vec![builder.add_block(vec![Op::Set(Parity::Odd)])];
    for _ in 0..3 {
        let block = builder.add_block(vec![Op::Inc]);
        if let Some(previous) = blocks.last() {
            builder.add_edge(*previous, block, Branch::Sequence);
        }
        blocks.push(block);
    }
    (builder.build().unwrap(), blocks)
}

#[test]
fn straight_line_ends_even() {
    let (cfg, blocks) = straight_line();
    let res = crate::dataflow::forward(&cfg, &ParityTransfer, Parity::Bottom).unwrap();
    assert_eq!(res.exit_state(blocks[3]), Some(&Parity::Even));
}
