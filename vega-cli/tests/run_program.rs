//! End-to-end: build a tiny image with the assembler, run it through the
//! same driver `main.rs` uses, and check it reports success.

use vega_bytecode::{FunctionBuilder, ImageBuilder, Op};
use vega_cli::{run_image, BudgetOverrides};

#[test]
fn arithmetic_program_runs_to_completion() {
    // main() { print(2 + 3 * 4); } -- spec §8's literal arithmetic scenario.
    let mut b = ImageBuilder::new();
    let two = b.intern_int(2);
    let three = b.intern_int(3);
    let four = b.intern_int(4);
    let main = FunctionBuilder::new("main", 0, 0)
        .op(Op::PushConst(two))
        .op(Op::PushConst(three))
        .op(Op::PushConst(four))
        .op(Op::Mul)
        .op(Op::Add)
        .op(Op::Print)
        .op(Op::PushNull)
        .op(Op::Return);
    b.function(main);
    let image = b.build();

    let result = run_image(image, None, BudgetOverrides::default(), false);
    assert!(result.is_ok(), "{result:?}");
}

/// Assemble `fact`'s body: `if n <= 1 { return 1 } return n * fact(n - 1)`.
///
/// `JUMP_IF_NOT`'s offset is relative to the instruction pointer right
/// after the jump itself, so it is computed in a throwaway dry run first
/// (every opcode here has a fixed encoded length regardless of its
/// operand's value, so the dry run's byte offsets match the real build).
fn build_fact(one: u16, fact_name: u16) -> FunctionBuilder {
    let dry = FunctionBuilder::new("fact", 1, 1).op(Op::LoadLocal(0)).op(Op::PushConst(one)).op(Op::Le);
    let pos_after_cmp = dry.len();
    let dry = dry.op(Op::JumpIfNot(0));
    let pos_after_jump = dry.len();
    let dry = dry.op(Op::PushConst(one)).op(Op::Return);
    let else_start = dry.len();

    let jump_offset = i16::try_from(else_start as isize - pos_after_jump as isize).expect("offset fits in i16");
    let _ = pos_after_cmp;

    FunctionBuilder::new("fact", 1, 1)
        .op(Op::LoadLocal(0))
        .op(Op::PushConst(one))
        .op(Op::Le)
        .op(Op::JumpIfNot(jump_offset))
        .op(Op::PushConst(one))
        .op(Op::Return)
        .op(Op::LoadLocal(0)) // n, the multiplicand
        .op(Op::LoadGlobal(fact_name)) // callee, resolved via the function-table fallback
        .op(Op::LoadLocal(0))
        .op(Op::PushConst(one))
        .op(Op::Sub) // n - 1
        .op(Op::Call(1))
        .op(Op::Mul)
        .op(Op::Return)
}

#[test]
fn recursive_factorial_runs_to_completion() {
    let mut b = ImageBuilder::new();
    let one = b.intern_int(1);
    let fact_name = b.intern_str("fact");

    b.function(build_fact(one, fact_name));

    let five = b.intern_int(5);
    let main = FunctionBuilder::new("main", 0, 0)
        .op(Op::LoadGlobal(fact_name))
        .op(Op::PushConst(five))
        .op(Op::Call(1))
        .op(Op::Print)
        .op(Op::PushNull)
        .op(Op::Return);
    b.function(main);

    let image = b.build();
    let result = run_image(image, None, BudgetOverrides::default(), false);
    assert!(result.is_ok(), "{result:?}");
}
