//! Peephole optimiser: four passes run in a fixed order, each ported from
//! the corresponding `_remove_*`/`_optimise_using_multi_destination_assignments`
//! method in the reference implementation. Passes mutate `emit`/`dest` in
//! place rather than splicing the instruction list, so indices and later
//! passes keep seeing every instruction including ones that will be dropped.

use crate::instruction::{Emitted, Instruction};

/// Which optimiser passes to run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OptimiserSelection {
    All,
    Loads,
    ConsecNops,
    UnneededNops,
    MultidestAssignment,
    None,
}

/// Runs the passes selected by `selection`, in the fixed spec order:
/// redundant loads, consecutive nops, unneeded nops, multi-destination
/// assignment coalescing.
pub fn optimise(instructions: &mut [Emitted], selection: OptimiserSelection) {
    use OptimiserSelection::{All, ConsecNops, Loads, MultidestAssignment, None as NoOpt, UnneededNops};

    let do_all = selection == All;
    if do_all || selection == Loads {
        remove_redundant_loads(instructions);
    }
    if do_all || selection == ConsecNops {
        remove_consecutive_nops(instructions);
    }
    if do_all || selection == UnneededNops {
        remove_unneeded_nops(instructions);
    }
    if do_all || selection == MultidestAssignment {
        coalesce_multi_destination(instructions);
    }
    let _ = NoOpt;
}

fn is_generated_nop(emitted: &Emitted) -> bool {
    matches!(&emitted.instruction, Instruction::C(c) if c.is_nop()) && emitted.generated
}

/// Drops an A-instruction whose textual operand is identical to the last
/// emitted A-instruction's, since the register still holds that address.
/// A C-instruction that writes `A` invalidates the tracked value, since the
/// address in the register no longer matches what was last loaded.
pub fn remove_redundant_loads(instructions: &mut [Emitted]) {
    let mut last_a_operand: Option<String> = None;

    for emitted in instructions.iter_mut() {
        if !emitted.emit {
            continue;
        }
        match &emitted.instruction {
            Instruction::A(op) => {
                let text = op.to_string();
                if last_a_operand.as_deref() == Some(text.as_str()) {
                    emitted.emit = false;
                } else {
                    last_a_operand = Some(text);
                }
            }
            Instruction::C(c) => {
                if c.dest.a {
                    last_a_operand = None;
                }
            }
            Instruction::Label(_) => {}
        }
    }
}

/// Drops a generated nop immediately following another generated nop.
pub fn remove_consecutive_nops(instructions: &mut [Emitted]) {
    let mut last_was_generated_nop = false;

    for emitted in instructions.iter_mut() {
        if !emitted.emit {
            continue;
        }
        if is_generated_nop(emitted) {
            if last_was_generated_nop {
                emitted.emit = false;
                continue;
            }
            last_was_generated_nop = true;
        } else if !emitted.instruction.is_label() {
            last_was_generated_nop = false;
        }
    }
}

/// Drops a generated nop when the following instruction doesn't need the
/// memory-latency delay it was inserted for: an A-instruction never reads
/// `M`, and a C-instruction that touches neither `dest` nor `comp` with `M`
/// doesn't need it either.
pub fn remove_unneeded_nops(instructions: &mut [Emitted]) {
    let len = instructions.len();
    let mut last_nop_idx: Option<usize> = None;

    for i in 0..len {
        if !instructions[i].emit {
            continue;
        }

        if let Some(idx) = last_nop_idx {
            match &instructions[i].instruction {
                Instruction::A(_) => instructions[idx].emit = false,
                Instruction::C(c) => {
                    instructions[idx].emit = c.dest.m || c.comp.contains('M');
                }
                Instruction::Label(_) => {}
            }
        }

        if is_generated_nop(&instructions[i]) {
            last_nop_idx = Some(i);
        } else if !instructions[i].instruction.is_label() {
            last_nop_idx = None;
        }
    }
}

/// Coalesces `X=expr` followed by `Y=X` into `X,Y=expr`, when `Y` hasn't
/// been read since `X` was assigned. Reset by a jump (the other branch may
/// need the unmodified value) or by an already multi-destination instruction.
pub fn coalesce_multi_destination(instructions: &mut [Emitted]) {
    let len = instructions.len();
    let mut candidate_idx: Option<usize> = None;
    let mut read_vars: [bool; 4] = [false; 4]; // A D M W

    for i in 0..len {
        if !instructions[i].emit {
            continue;
        }
        let Instruction::C(_) = &instructions[i].instruction else {
            continue;
        };

        if let Some(c_idx) = candidate_idx {
            let mut can_optimise = true;
            let (new_dest_len, new_comp, new_jump_is_none) = {
                let Instruction::C(c) = &instructions[i].instruction else {
                    unreachable!()
                };
                (c.dest.len(), c.comp.clone(), c.jump.is_none())
            };
            let _ = new_jump_is_none;

            if new_dest_len != 1 {
                can_optimise = false;
            }
            if new_comp.len() != 1 {
                can_optimise = false;
            }

            let candidate_dest_str = {
                let Instruction::C(cand) = &instructions[c_idx].instruction else {
                    unreachable!()
                };
                cand.dest.to_string()
            };
            if new_comp != candidate_dest_str {
                can_optimise = false;
            }

            let new_dest_is_read = {
                let Instruction::C(c) = &instructions[i].instruction else {
                    unreachable!()
                };
                register_index(&c.dest).is_some_and(|idx| read_vars[idx])
            };
            if new_dest_is_read {
                can_optimise = false;
            }

            if can_optimise {
                let new_dest_char = {
                    let Instruction::C(c) = &instructions[i].instruction else {
                        unreachable!()
                    };
                    c.dest.to_string()
                };
                instructions[i].emit = false;
                if let Instruction::C(cand) = &mut instructions[c_idx].instruction {
                    merge_dest(&mut cand.dest, &new_dest_char);
                }
                candidate_idx = None;
                continue;
            }
        }

        let Instruction::C(c) = &instructions[i].instruction else {
            unreachable!()
        };

        if c.dest.len() == 1 {
            candidate_idx = Some(i);
            read_vars = [false; 4];
            continue;
        }

        for (idx, reg) in ['A', 'D', 'M', 'W'].iter().enumerate() {
            if c.comp.contains(*reg) {
                read_vars[idx] = true;
            }
        }

        if c.jump.is_some() {
            candidate_idx = None;
        }
        if c.dest.len() > 1 {
            candidate_idx = None;
        }
    }
}

fn register_index(dest: &crate::instruction::DestSet) -> Option<usize> {
    if dest.a {
        Some(0)
    } else if dest.d {
        Some(1)
    } else if dest.m {
        Some(2)
    } else if dest.w {
        Some(3)
    } else {
        None
    }
}

fn merge_dest(dest: &mut crate::instruction::DestSet, added: &str) {
    match added {
        "A" => dest.a = true,
        "D" => dest.d = true,
        "M" => dest.m = true,
        "W" => dest.w = true,
        _ => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::instruction::parse_line;

    fn build(lines: &[&str]) -> Vec<Emitted> {
        lines
            .iter()
            .map(|l| Emitted::new(parse_line(l).unwrap(), vec![(*l).to_string()]))
            .collect()
    }

    fn emitted_exprs(instructions: &[Emitted]) -> Vec<String> {
        instructions
            .iter()
            .filter(|e| e.emit)
            .map(Emitted::display_expression)
            .collect()
    }

    #[test]
    fn redundant_loads_are_removed() {
        let mut instructions = build(&["@5", "@5", "D=A"]);
        remove_redundant_loads(&mut instructions);
        assert_eq!(emitted_exprs(&instructions), vec!["@5", "D=A"]);
    }

    #[test]
    fn a_write_invalidates_tracked_load() {
        let mut instructions = build(&["@5", "M=A", "@5"]);
        remove_redundant_loads(&mut instructions);
        assert_eq!(emitted_exprs(&instructions), vec!["@5", "M=A", "@5"]);
    }

    #[test]
    fn consecutive_generated_nops_collapse_to_one() {
        let mut instructions = vec![Emitted::generated_nop(), Emitted::generated_nop()];
        remove_consecutive_nops(&mut instructions);
        assert_eq!(instructions.iter().filter(|e| e.emit).count(), 1);
    }

    #[test]
    fn unneeded_nop_before_a_instruction_is_dropped() {
        let mut instructions = vec![Emitted::generated_nop(), build(&["@5"]).remove(0)];
        remove_unneeded_nops(&mut instructions);
        assert!(!instructions[0].emit);
    }

    #[test]
    fn needed_nop_before_memory_read_is_kept() {
        let mut instructions = vec![Emitted::generated_nop(), build(&["D=M"]).remove(0)];
        remove_unneeded_nops(&mut instructions);
        assert!(instructions[0].emit);
    }

    #[test]
    fn multi_destination_coalesces() {
        let mut instructions = build(&["A=A+1", "D=A"]);
        coalesce_multi_destination(&mut instructions);
        assert_eq!(emitted_exprs(&instructions), vec!["AD=A+1"]);
    }

    #[test]
    fn multi_destination_resets_on_jump() {
        let mut instructions = build(&["A=A+1", "0;JMP", "D=A"]);
        coalesce_multi_destination(&mut instructions);
        assert_eq!(
            emitted_exprs(&instructions),
            vec!["A=A+1", "0;JMP", "D=A"]
        );
    }

    #[test]
    fn multi_destination_does_not_coalesce_if_dest_read_between() {
        let mut instructions = build(&["A=A+1", "D=D+A", "D=A"]);
        coalesce_multi_destination(&mut instructions);
        assert_eq!(
            emitted_exprs(&instructions),
            vec!["A=A+1", "D=D+A", "D=A"]
        );
    }
}
