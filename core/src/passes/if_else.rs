//! If/else branch normalization.
//!
//! Wraps non-block consequents and alternates in blocks, in both modes, so
//! the block pass can treat every branch uniformly.

use crate::ast::{Program, Stmt, StmtKind};
use crate::passes::walk::{self, Flow, Pass};
use anyhow::Result;

pub fn run(program: &mut Program) -> Result<()> {
    walk::walk_program(&mut IfElsePass, program)
}

struct IfElsePass;

impl Pass for IfElsePass {
    fn stmt(&mut self, stmt: &mut Stmt) -> Result<Flow> {
        if let StmtKind::If {
            consequent, alternate, ..
        } = &mut stmt.kind
        {
            ensure_block(consequent);
            if let Some(alt) = alternate {
                ensure_block(alt);
            }
        }
        Ok(Flow::Descend)
    }
}

fn ensure_block(stmt: &mut Box<Stmt>) {
    if !matches!(stmt.kind, StmtKind::Block(_)) {
        let inner = std::mem::replace(&mut **stmt, Stmt::new(StmtKind::Empty));
        **stmt = Stmt::new(StmtKind::Block(vec![inner]));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast;

    #[test]
    fn wraps_branches_in_blocks() {
        let mut program = ast::parse("if (a) b(); else if (c) d();").unwrap();
        run(&mut program).unwrap();
        assert_eq!(
            ast::gen_code(&program),
            "if(a){b();}else {if(c){d();}}"
        );
    }

    #[test]
    fn block_branches_untouched() {
        let mut program = ast::parse("if (a) { b(); }").unwrap();
        run(&mut program).unwrap();
        assert_eq!(ast::gen_code(&program), "if(a){b();}");
    }
}
