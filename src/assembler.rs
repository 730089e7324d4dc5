//! Program Assembler
//!
//! Wraps a translated fragment into a runnable program: a `.decl` and
//! `.input` for every relation bound in the outer scope, then the fragment,
//! then one `.output` for the result relation.

use datalog_ast::{Command, Program};

use crate::translator::{Environment, TranslationResult, TranslationErrorKind};

/// Full program for `result`, with inputs taken from the relation bindings
/// of `env` (outermost first).
pub fn translation_result_to_full_program(
    result: &TranslationResult,
    env: &Environment,
) -> Result<Program, TranslationErrorKind> {
    let mut program = Program::new();
    for (_, relation) in env.relations() {
        program.push(relation.decl(env, Vec::new())?);
        program.push(Command::Input(relation.name.clone()));
    }
    program.push(Command::blank());
    program.append(result.program.clone());
    program.push(Command::blank());
    program.push(Command::Output(result.relation.name.clone()));
    Ok(program)
}
