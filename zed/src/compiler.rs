//! Lowers a parsed [`Program`] into five independently decodable bytecode
//! strings, one per lifecycle event, in the fixed order `{init, file, rec,
//! rules, exit}`.
//!
//! The compiler walks each event's statement list with one
//! [`BytecodeWriter`] as its "current" emission context; nested function
//! bodies and record-range actions get their own context pushed and popped
//! so they come out as self-contained byte strings with no forward
//! references across event or function boundaries.

use zed_asm::{BuiltinId, BytecodeWriter, ComboOp, Global, Op, ScopeType};

use crate::ast::{Block, InfixOp, Node, NodeKind, PrefixOp, Program};
use crate::error::{CompileError, CompileErrorKind};

/// The five compiled event programs, in `{init, file, rec, rules, exit}` order.
pub struct CompiledProgram {
    pub init: Vec<u8>,
    pub file: Vec<u8>,
    pub rec: Vec<u8>,
    pub rules: Vec<u8>,
    pub exit: Vec<u8>,
}

impl CompiledProgram {
    /// Returns the five event byte strings as an array, in fixed order.
    pub fn as_array(&self) -> [&[u8]; 5] {
        [
            &self.init,
            &self.file,
            &self.rec,
            &self.rules,
            &self.exit,
        ]
    }
}

/// Compiles a parsed program into its five event bytecode strings.
pub fn compile_program(program: &Program) -> Result<CompiledProgram, CompileError> {
    let mut c = Compiler::new();
    Ok(CompiledProgram {
        init: c.compile_event(&program.inits)?,
        file: c.compile_event(&program.files)?,
        rec: c.compile_event(&program.recs)?,
        rules: c.compile_event(&program.rules)?,
        exit: c.compile_event(&program.exits)?,
    })
}

struct Compiler {
    contexts: Vec<BytecodeWriter>,
    loop_starts: Vec<usize>,
    jump_updates: Vec<Vec<usize>>,
}

fn overflow(offset: zed_asm::Offset, what: &'static str) -> CompileError {
    CompileError::new(offset, CompileErrorKind::BytecodeOverflow(what))
}

/// Casts a length-like `usize` to `u16`, reporting a `BytecodeOverflow` at
/// `offset` tagged `what` if it doesn't fit.
fn as_u16(n: usize, offset: zed_asm::Offset, what: &'static str) -> Result<u16, CompileError> {
    u16::try_from(n).map_err(|_| overflow(offset, what))
}

impl Compiler {
    fn new() -> Self {
        Self {
            contexts: Vec::new(),
            loop_starts: Vec::new(),
            jump_updates: Vec::new(),
        }
    }

    fn push_context(&mut self) {
        self.contexts.push(BytecodeWriter::new());
    }

    /// Pops the current emission context. Only valid while another context
    /// remains beneath it, except for the final pop that hands an event's
    /// bytes back to the caller.
    fn pop_context(&mut self) -> BytecodeWriter {
        self.contexts
            .pop()
            .expect("pop_context called with no active context")
    }

    fn cur(&mut self) -> &mut BytecodeWriter {
        self.contexts
            .last_mut()
            .expect("no active emission context")
    }

    fn compile_event(&mut self, block: &Block) -> Result<Vec<u8>, CompileError> {
        self.push_context();
        self.compile_block(block)?;
        Ok(self.pop_context().into_bytes())
    }

    fn compile_block(&mut self, block: &Block) -> Result<(), CompileError> {
        for node in block {
            self.compile_node(node)?;
        }
        Ok(())
    }

    fn compile_node(&mut self, node: &Node) -> Result<(), CompileError> {
        let off = node.offset;
        match &node.kind {
            NodeKind::StmtEnd => {
                self.cur().push_u8(Op::Pop.into());
            }
            NodeKind::Boolean(b) => {
                self.cur()
                    .push_u8((if *b { Op::BoolTrue } else { Op::BoolFalse }).into());
                self.cur().push_u16(off);
            }
            NodeKind::Nil => {
                self.cur().push_u8(Op::Nil.into());
                self.cur().push_u16(off);
            }
            NodeKind::Float(v) => {
                self.cur().push_u8(Op::Float.into());
                self.cur().push_f64(*v);
            }
            NodeKind::Int(v) => {
                self.cur().push_u8(Op::Int.into());
                self.cur().push_i64(*v);
            }
            NodeKind::Uint(v) => {
                self.cur().push_u8(Op::Uint.into());
                self.cur().push_u64(*v);
            }
            NodeKind::Str(segments) => self.compile_string(off, segments)?,
            NodeKind::Ident(name) => {
                self.cur().push_u8(Op::Load.into());
                self.cur().push_u16(off);
                self.cur().push_nul_terminated(name);
            }
            NodeKind::Global(g) => {
                self.cur().push_u8(Op::Global.into());
                self.cur().push_u8((*g).into());
            }
            NodeKind::Define { name, value } => {
                self.compile_node(value)?;
                self.cur().push_u8(Op::Define.into());
                self.cur().push_u16(off);
                self.cur().push_nul_terminated(name);
            }
            NodeKind::Assign {
                target,
                value,
                combo,
            } => self.compile_assign(off, target, value, *combo)?,
            NodeKind::Infix { left, right, op } => self.compile_infix(off, left, right, *op)?,
            NodeKind::Prefix { operand, op } => {
                self.compile_node(operand)?;
                let opcode = match op {
                    PrefixOp::Neg => Op::Neg,
                    PrefixOp::Not => Op::Not,
                };
                self.cur().push_u8(opcode.into());
                self.cur().push_u16(off);
            }
            NodeKind::List(elements) => {
                for el in elements.iter().rev() {
                    self.compile_node(el)?;
                }
                let len = as_u16(elements.len(), off, "list length")?;
                self.cur().push_u8(Op::List.into());
                self.cur().push_u16(len);
            }
            NodeKind::Map(entries) => {
                for (k, v) in entries {
                    self.compile_node(k)?;
                    self.compile_node(v)?;
                }
                let len = as_u16(entries.len(), off, "map length")?;
                self.cur().push_u8(Op::Map.into());
                self.cur().push_u16(off);
                self.cur().push_u16(len);
            }
            NodeKind::Range { from, to, inclusive } => {
                self.compile_node(from)?;
                self.compile_node(to)?;
                self.cur().push_u8(Op::Range.into());
                self.cur().push_u16(off);
                self.cur().push_u8(*inclusive as u8);
            }
            NodeKind::Subscript { container, index } => {
                self.compile_node(index)?;
                self.compile_node(container)?;
                self.cur().push_u8(Op::Subscript.into());
                self.cur().push_u16(off);
            }
            NodeKind::Conditional {
                cond,
                then_branch,
                else_branch,
            } => self.compile_conditional(cond, then_branch, else_branch)?,
            NodeKind::Loop { cond, body, is_do } => {
                self.compile_loop(off, cond, body, *is_do)?
            }
            NodeKind::LoopBreak => self.compile_break(off)?,
            NodeKind::LoopContinue => self.compile_continue(off)?,
            NodeKind::Func { name, params, body } => self.compile_func(off, name, params, body)?,
            NodeKind::FuncReturn(inner) => {
                self.compile_node(inner)?;
                self.cur().push_u8(Op::FuncReturn.into());
            }
            NodeKind::Call { callee, args } => self.compile_call(off, callee, args)?,
            NodeKind::RecRange {
                from,
                to,
                action,
                id,
                exclusive,
            } => self.compile_rec_range(*id, *exclusive, from.as_deref(), to.as_deref(), action)?,
            NodeKind::Redir {
                expr,
                target,
                clobber,
            } => self.compile_redir(off, expr, target, *clobber)?,
        }
        Ok(())
    }

    fn compile_string(
        &mut self,
        off: zed_asm::Offset,
        segments: &[crate::ast::StringSegment],
    ) -> Result<(), CompileError> {
        use crate::ast::StringSegment;

        for seg in segments.iter().rev() {
            match seg {
                StringSegment::Literal(bytes) => {
                    self.cur().push_u8(Op::Plain.into());
                    self.cur().push_nul_terminated(bytes);
                }
                StringSegment::Interpolation { expr, format } => {
                    self.cur().push_u8(Op::ScopeIn.into());
                    self.cur().push_u8(ScopeType::Block.into());
                    self.compile_block(expr)?;
                    self.cur().push_u8(Op::ScopeOut.into());
                    self.cur().push_u8(ScopeType::Block.into());
                    if let Some((spec, spec_off)) = format {
                        self.cur().push_u8(Op::Format.into());
                        self.cur().push_u16(*spec_off);
                        self.cur().push_nul_terminated(spec);
                    }
                }
            }
        }
        let len = as_u16(segments.len(), off, "string segment count")?;
        self.cur().push_u8(Op::String.into());
        self.cur().push_u16(len);
        Ok(())
    }

    fn compile_assign(
        &mut self,
        off: zed_asm::Offset,
        target: &Node,
        value: &Node,
        combo: ComboOp,
    ) -> Result<(), CompileError> {
        self.compile_node(value)?;
        match &target.kind {
            NodeKind::Ident(name) => {
                self.cur().push_u8(Op::Store.into());
                self.cur().push_u16(off);
                self.cur().push_u8(combo.into());
                self.cur().push_nul_terminated(name);
            }
            NodeKind::Global(g) => {
                if g.is_read_only() {
                    return Err(CompileError::new(
                        target.offset,
                        CompileErrorKind::ReadOnlyGlobal,
                    ));
                }
                self.cur().push_u8(Op::Gstore.into());
                self.cur().push_u16(off);
                self.cur().push_u8((*g).into());
            }
            NodeKind::Subscript { container, index } => {
                self.compile_node(index)?;
                self.compile_node(container)?;
                self.cur().push_u8(Op::Set.into());
                self.cur().push_u16(off);
                self.cur().push_u8(combo.into());
            }
            _ => {
                return Err(CompileError::new(
                    target.offset,
                    CompileErrorKind::UnsupportedNode("assignment target"),
                ))
            }
        }
        Ok(())
    }

    fn compile_infix(
        &mut self,
        off: zed_asm::Offset,
        left: &Node,
        right: &Node,
        op: InfixOp,
    ) -> Result<(), CompileError> {
        match op {
            InfixOp::And => {
                self.compile_node(left)?;
                self.cur().push_u8(Op::JumpFalse.into());
                let patch = self.cur().reserve_u16();
                self.compile_node(right)?;
                let target = as_u16(self.cur().len(), off, "jump target")?;
                self.cur().patch_u16(patch, target);
            }
            InfixOp::Or => {
                self.compile_node(left)?;
                self.cur().push_u8(Op::JumpTrue.into());
                let patch = self.cur().reserve_u16();
                self.compile_node(right)?;
                let target = as_u16(self.cur().len(), off, "jump target")?;
                self.cur().patch_u16(patch, target);
            }
            _ => {
                self.compile_node(left)?;
                self.compile_node(right)?;
                let opcode = match op {
                    InfixOp::Add => Op::Add,
                    InfixOp::Sub => Op::Sub,
                    InfixOp::Mul => Op::Mul,
                    InfixOp::Div => Op::Div,
                    InfixOp::Mod => Op::Mod,
                    InfixOp::Lt => Op::Lt,
                    InfixOp::Lte => Op::Lte,
                    InfixOp::Gt => Op::Gt,
                    InfixOp::Gte => Op::Gte,
                    InfixOp::Eq => Op::Eq,
                    InfixOp::Neq => Op::Neq,
                    InfixOp::Concat => Op::Concat,
                    InfixOp::Repeat => Op::Repeat,
                    InfixOp::And | InfixOp::Or => unreachable!("handled above"),
                };
                self.cur().push_u8(opcode.into());
                self.cur().push_u16(off);
            }
        }
        Ok(())
    }

    fn compile_conditional(
        &mut self,
        cond: &Node,
        then_branch: &Block,
        else_branch: &Block,
    ) -> Result<(), CompileError> {
        let cond_off = cond.offset;
        self.compile_node(cond)?;
        self.cur().push_u8(Op::JumpFalse.into());
        let p1 = self.cur().reserve_u16();

        self.cur().push_u8(Op::ScopeIn.into());
        self.cur().push_u8(ScopeType::Block.into());
        self.compile_block(then_branch)?;
        self.cur().push_u8(Op::ScopeOut.into());
        self.cur().push_u8(ScopeType::Block.into());

        self.cur().push_u8(Op::Jump.into());
        let p2 = self.cur().reserve_u16();

        let then_end = as_u16(self.cur().len(), cond_off, "jump target")?;
        self.cur().patch_u16(p1, then_end);

        self.cur().push_u8(Op::ScopeIn.into());
        self.cur().push_u8(ScopeType::Block.into());
        self.compile_block(else_branch)?;
        self.cur().push_u8(Op::ScopeOut.into());
        self.cur().push_u8(ScopeType::Block.into());

        let else_end = as_u16(self.cur().len(), cond_off, "jump target")?;
        self.cur().patch_u16(p2, else_end);
        Ok(())
    }

    fn compile_loop(
        &mut self,
        off: zed_asm::Offset,
        cond: &Node,
        body: &Block,
        is_do: bool,
    ) -> Result<(), CompileError> {
        let loop_start = as_u16(self.cur().len(), off, "loop start")?;
        self.loop_starts.push(loop_start as usize);
        self.jump_updates.push(Vec::new());

        if is_do {
            self.cur().push_u8(Op::ScopeIn.into());
            self.cur().push_u8(ScopeType::Loop.into());
            self.compile_block(body)?;
            self.cur().push_u8(Op::ScopeOut.into());
            self.cur().push_u8(ScopeType::Loop.into());

            self.compile_node(cond)?;
            self.cur().push_u8(Op::JumpTrue.into());
            self.cur().push_u16(loop_start);
        } else {
            self.compile_node(cond)?;
            self.cur().push_u8(Op::JumpFalse.into());
            let pexit = self.cur().reserve_u16();
            self.jump_updates
                .last_mut()
                .expect("loop jump-update set just pushed")
                .push(pexit);

            self.cur().push_u8(Op::ScopeIn.into());
            self.cur().push_u8(ScopeType::Loop.into());
            self.compile_block(body)?;
            self.cur().push_u8(Op::ScopeOut.into());
            self.cur().push_u8(ScopeType::Loop.into());

            self.cur().push_u8(Op::Jump.into());
            self.cur().push_u16(loop_start);
        }

        let after_loop = as_u16(self.cur().len(), off, "jump target")?;
        let pending = self
            .jump_updates
            .pop()
            .expect("loop jump-update set pushed above");
        for patch in pending {
            self.cur().patch_u16(patch, after_loop);
        }

        self.cur().push_u8(Op::Nil.into());
        self.cur().push_u16(off);

        self.loop_starts.pop();
        Ok(())
    }

    fn compile_break(&mut self, off: zed_asm::Offset) -> Result<(), CompileError> {
        if self.loop_starts.is_empty() {
            return Err(CompileError::new(off, CompileErrorKind::BreakOutsideLoop));
        }
        self.cur().push_u8(Op::ScopeOut.into());
        self.cur().push_u8(ScopeType::Loop.into());
        self.cur().push_u8(Op::Jump.into());
        let patch = self.cur().reserve_u16();
        self.jump_updates
            .last_mut()
            .expect("checked loop_starts non-empty above")
            .push(patch);
        Ok(())
    }

    fn compile_continue(&mut self, off: zed_asm::Offset) -> Result<(), CompileError> {
        let Some(&loop_start) = self.loop_starts.last() else {
            return Err(CompileError::new(off, CompileErrorKind::ContinueOutsideLoop));
        };
        self.cur().push_u8(Op::ScopeOut.into());
        self.cur().push_u8(ScopeType::Loop.into());
        self.cur().push_u8(Op::Jump.into());
        self.cur().push_u16(loop_start as u16);
        Ok(())
    }

    fn compile_func(
        &mut self,
        off: zed_asm::Offset,
        name: &[u8],
        params: &[Vec<u8>],
        body: &Block,
    ) -> Result<(), CompileError> {
        let hash = function_hash(name, params, body);

        self.push_context();
        self.compile_block(body)?;
        let body_bytes = self.pop_context().into_bytes();

        self.cur().push_u8(Op::Func.into());
        let skip_at = self.cur().reserve_u16();
        self.cur().push_u64(hash);
        self.cur().push_nul_terminated(name);

        let paramc = as_u16(params.len(), off, "function parameter count")?;
        self.cur().push_u16(paramc);
        for param in params {
            self.cur().push_nul_terminated(param);
        }

        let bodylen = as_u16(body_bytes.len(), off, "function body length")?;
        self.cur().push_u16(bodylen);
        self.cur().push_bytes(&body_bytes);

        let skip = as_u16(self.cur().len() - (skip_at + 2), off, "function skip field")?;
        self.cur().patch_u16(skip_at, skip);
        Ok(())
    }

    fn compile_call(
        &mut self,
        off: zed_asm::Offset,
        callee: &Node,
        args: &[Node],
    ) -> Result<(), CompileError> {
        if let Some(builtin) = builtin_callee(callee) {
            for arg in args.iter().rev() {
                self.compile_node(arg)?;
            }
            let argc: u8 = args
                .len()
                .try_into()
                .map_err(|_| overflow(off, "argument count"))?;
            self.cur().push_u8(Op::Builtin.into());
            self.cur().push_u8(builtin.into());
            self.cur().push_u16(off);
            self.cur().push_u8(argc);
            return Ok(());
        }

        for arg in args.iter().rev() {
            self.compile_node(arg)?;
        }
        self.compile_node(callee)?;
        let argc: u8 = args
            .len()
            .try_into()
            .map_err(|_| overflow(off, "argument count"))?;
        self.cur().push_u8(Op::Call.into());
        self.cur().push_u16(off);
        self.cur().push_u8(argc);
        Ok(())
    }

    fn compile_rec_range(
        &mut self,
        id: u8,
        exclusive: bool,
        from: Option<&Node>,
        to: Option<&Node>,
        action: &Block,
    ) -> Result<(), CompileError> {
        let action_bytes = if action.is_empty() {
            Vec::new()
        } else {
            self.push_context();
            self.compile_block(action)?;
            self.pop_context().into_bytes()
        };

        if let Some(to) = to {
            self.compile_node(to)?;
        }
        if let Some(from) = from {
            self.compile_node(from)?;
        }

        let action_off = to.or(from).map(|n| n.offset).unwrap_or(0);
        let actionlen = as_u16(action_bytes.len(), action_off, "record-range action length")?;

        self.cur().push_u8(Op::RecRange.into());
        self.cur().push_u8(id);
        self.cur().push_u8(exclusive as u8);
        self.cur().push_u16(actionlen);
        self.cur().push_bytes(&action_bytes);
        self.cur().push_u8(from.is_some() as u8);
        self.cur().push_u8(to.is_some() as u8);
        Ok(())
    }

    fn compile_redir(
        &mut self,
        off: zed_asm::Offset,
        expr: &Node,
        target: &Node,
        clobber: bool,
    ) -> Result<(), CompileError> {
        if let NodeKind::Call { callee, args } = &expr.kind {
            if builtin_callee(callee) == Some(BuiltinId::Print) {
                for arg in args.iter().rev() {
                    self.compile_node(arg)?;
                }
                let argc: u8 = args
                    .len()
                    .try_into()
                    .map_err(|_| overflow(off, "argument count"))?;
                self.cur().push_u8(Op::Sprint.into());
                self.cur().push_u16(expr.offset);
                self.cur().push_u8(argc);
                self.compile_node(target)?;
                self.cur().push_u8(Op::Redir.into());
                self.cur().push_u16(off);
                self.cur().push_u8(clobber as u8);
                return Ok(());
            }
        }

        self.compile_node(expr)?;
        self.compile_node(target)?;
        self.cur().push_u8(Op::Redir.into());
        self.cur().push_u16(off);
        self.cur().push_u8(clobber as u8);
        Ok(())
    }
}

/// Returns the builtin a call's callee resolves to, if any. Only a bare
/// identifier callee (not an expression that merely evaluates to a function)
/// can be special-cased this way.
fn builtin_callee(callee: &Node) -> Option<BuiltinId> {
    match &callee.kind {
        NodeKind::Ident(name) => {
            BuiltinId::from_name(std::str::from_utf8(name).ok()?)
        }
        _ => None,
    }
}

/// A Wyhash-style 64-bit digest over a canonical, address-free textual
/// rendering of a function literal's name, parameters, and body. Stable
/// across runs of the same source: the rendering is plain `Debug` output over
/// owned data with no pointers or non-deterministic iteration order.
fn function_hash(name: &[u8], params: &[Vec<u8>], body: &Block) -> u64 {
    let canonical = format!("{name:?}{params:?}{body:?}");
    wyhash64(canonical.as_bytes(), 0)
}

/// A small, self-contained Wyhash-style mixing hash. Any equally fast 64-bit
/// hash would do here (see the open question in the design notes); this one
/// avoids pulling in a dependency for a single internal cache key.
fn wyhash64(bytes: &[u8], seed: u64) -> u64 {
    const P0: u64 = 0xa0761d6478bd642f;
    const P1: u64 = 0xe7037ed1a0b428db;
    const P2: u64 = 0x8ebc6af09c88c6e3;

    fn mix(a: u64, b: u64) -> u64 {
        let r = (a as u128).wrapping_mul(b as u128);
        ((r >> 64) as u64) ^ (r as u64)
    }

    let mut seed = seed ^ P0;
    for chunk in bytes.chunks(8) {
        let mut buf = [0u8; 8];
        buf[..chunk.len()].copy_from_slice(chunk);
        let word = u64::from_le_bytes(buf);
        seed = mix(seed ^ word, P1);
    }
    mix(seed ^ bytes.len() as u64, P2)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::StringSegment;

    fn n(offset: u16, kind: NodeKind) -> Node {
        Node::new(offset, kind)
    }

    fn stmt(node: Node) -> Vec<Node> {
        vec![node, n(0, NodeKind::StmtEnd)]
    }

    #[test]
    fn compiles_true_literal_statement() {
        let program = Program {
            rules: stmt(n(0, NodeKind::Boolean(true))),
            ..Default::default()
        };
        let compiled = compile_program(&program).unwrap();
        assert_eq!(
            compiled.rules,
            vec![Op::BoolTrue.into(), 0, 0, Op::Pop.into()]
        );
    }

    #[test]
    fn compiles_int_addition() {
        let program = Program {
            rules: stmt(n(
                6,
                NodeKind::Infix {
                    left: Box::new(n(0, NodeKind::Int(1))),
                    right: Box::new(n(4, NodeKind::Int(2))),
                    op: InfixOp::Add,
                },
            )),
            ..Default::default()
        };
        let compiled = compile_program(&program).unwrap();
        let mut expect = vec![Op::Int.into()];
        expect.extend_from_slice(&1i64.to_ne_bytes());
        expect.push(Op::Int.into());
        expect.extend_from_slice(&2i64.to_ne_bytes());
        expect.push(Op::Add.into());
        expect.extend_from_slice(&6u16.to_ne_bytes());
        expect.push(Op::Pop.into());
        assert_eq!(compiled.rules, expect);
    }

    #[test]
    fn conditional_patches_both_branches() {
        let program = Program {
            rules: stmt(n(
                0,
                NodeKind::Conditional {
                    cond: Box::new(n(0, NodeKind::Ident(b"x".to_vec()))),
                    then_branch: vec![n(0, NodeKind::Int(1))],
                    else_branch: vec![n(0, NodeKind::Int(2))],
                },
            )),
            ..Default::default()
        };
        let compiled = compile_program(&program).unwrap();
        let mut r = zed_asm::Reader::new(&compiled.rules);
        assert_eq!(r.read_u8().unwrap(), Op::Load.into());
        r.read_u16().unwrap();
        r.read_nul_terminated().unwrap();
        assert_eq!(r.read_u8().unwrap(), Op::JumpFalse.into());
        let p1 = r.read_u16().unwrap();
        assert_eq!(r.read_u8().unwrap(), Op::ScopeIn.into());
        r.read_u8().unwrap();
        assert_eq!(r.read_u8().unwrap(), Op::Int.into());
        r.read_i64().unwrap();
        assert_eq!(r.read_u8().unwrap(), Op::ScopeOut.into());
        r.read_u8().unwrap();
        assert_eq!(r.read_u8().unwrap(), Op::Jump.into());
        let p2 = r.read_u16().unwrap();
        assert_eq!(p1 as usize, r.position());
        assert_eq!(r.read_u8().unwrap(), Op::ScopeIn.into());
        r.read_u8().unwrap();
        assert_eq!(r.read_u8().unwrap(), Op::Int.into());
        r.read_i64().unwrap();
        assert_eq!(r.read_u8().unwrap(), Op::ScopeOut.into());
        r.read_u8().unwrap();
        assert_eq!(p2 as usize, r.position());
        assert_eq!(r.read_u8().unwrap(), Op::Pop.into());
        assert!(r.is_empty());
    }

    #[test]
    fn break_outside_loop_is_a_compile_error() {
        let program = Program {
            rules: vec![n(3, NodeKind::LoopBreak)],
            ..Default::default()
        };
        let err = compile_program(&program).unwrap_err();
        assert_eq!(err.offset, 3);
        assert_eq!(err.kind, CompileErrorKind::BreakOutsideLoop);
    }

    #[test]
    fn continue_outside_loop_is_a_compile_error() {
        let program = Program {
            rules: vec![n(4, NodeKind::LoopContinue)],
            ..Default::default()
        };
        let err = compile_program(&program).unwrap_err();
        assert_eq!(err.offset, 4);
        assert_eq!(err.kind, CompileErrorKind::ContinueOutsideLoop);
    }

    #[test]
    fn assigning_read_only_global_is_a_compile_error() {
        let program = Program {
            rules: stmt(n(
                0,
                NodeKind::Assign {
                    target: Box::new(n(5, NodeKind::Global(Global::Rnum))),
                    value: Box::new(n(0, NodeKind::Int(5))),
                    combo: ComboOp::Assign,
                },
            )),
            ..Default::default()
        };
        let err = compile_program(&program).unwrap_err();
        assert_eq!(err.offset, 5);
        assert_eq!(err.kind, CompileErrorKind::ReadOnlyGlobal);
    }

    #[test]
    fn while_loop_break_jumps_are_patched_past_the_trailing_nil() {
        let program = Program {
            rules: stmt(n(
                0,
                NodeKind::Loop {
                    cond: Box::new(n(0, NodeKind::Ident(b"x".to_vec()))),
                    body: vec![n(2, NodeKind::LoopBreak)],
                    is_do: false,
                },
            )),
            ..Default::default()
        };
        let compiled = compile_program(&program).unwrap();
        let mut r = zed_asm::Reader::new(&compiled.rules);
        assert_eq!(r.read_u8().unwrap(), Op::Load.into());
        r.read_u16().unwrap();
        r.read_nul_terminated().unwrap();
        assert_eq!(r.read_u8().unwrap(), Op::JumpFalse.into());
        let pe = r.read_u16().unwrap();
        assert_eq!(r.read_u8().unwrap(), Op::ScopeIn.into());
        r.read_u8().unwrap();
        assert_eq!(r.read_u8().unwrap(), Op::ScopeOut.into());
        r.read_u8().unwrap();
        assert_eq!(r.read_u8().unwrap(), Op::Jump.into());
        let pbreak = r.read_u16().unwrap();
        assert_eq!(r.read_u8().unwrap(), Op::ScopeOut.into());
        r.read_u8().unwrap();
        assert_eq!(r.read_u8().unwrap(), Op::Jump.into());
        r.read_u16().unwrap();
        assert_eq!(pe as usize, r.position());
        assert_eq!(pbreak as usize, r.position());
        assert_eq!(r.read_u8().unwrap(), Op::Nil.into());
        r.read_u16().unwrap();
        assert_eq!(r.read_u8().unwrap(), Op::Pop.into());
        assert!(r.is_empty());
    }

    #[test]
    fn list_elements_compile_in_reverse_order() {
        let program = Program {
            rules: stmt(n(
                0,
                NodeKind::List(vec![
                    n(0, NodeKind::Int(1)),
                    n(0, NodeKind::Int(2)),
                    n(0, NodeKind::Int(3)),
                ]),
            )),
            ..Default::default()
        };
        let compiled = compile_program(&program).unwrap();
        let mut r = zed_asm::Reader::new(&compiled.rules);
        for expect in [3i64, 2, 1] {
            assert_eq!(r.read_u8().unwrap(), Op::Int.into());
            assert_eq!(r.read_i64().unwrap(), expect);
        }
        assert_eq!(r.read_u8().unwrap(), Op::List.into());
        assert_eq!(r.read_u16().unwrap(), 3);
        assert_eq!(r.read_u8().unwrap(), Op::Pop.into());
    }

    #[test]
    fn and_short_circuits_without_a_trailing_pop() {
        let program = Program {
            rules: stmt(n(
                0,
                NodeKind::Infix {
                    left: Box::new(n(0, NodeKind::Ident(b"a".to_vec()))),
                    right: Box::new(n(0, NodeKind::Ident(b"b".to_vec()))),
                    op: InfixOp::And,
                },
            )),
            ..Default::default()
        };
        let compiled = compile_program(&program).unwrap();
        let mut r = zed_asm::Reader::new(&compiled.rules);
        assert_eq!(r.read_u8().unwrap(), Op::Load.into());
        r.read_u16().unwrap();
        assert_eq!(r.read_nul_terminated().unwrap(), b"a");
        assert_eq!(r.read_u8().unwrap(), Op::JumpFalse.into());
        let pj = r.read_u16().unwrap();
        assert_eq!(r.read_u8().unwrap(), Op::Load.into());
        r.read_u16().unwrap();
        assert_eq!(r.read_nul_terminated().unwrap(), b"b");
        assert_eq!(pj as usize, r.position());
        assert_eq!(r.read_u8().unwrap(), Op::Pop.into());
    }

    #[test]
    fn string_segments_compile_in_reverse_with_scoped_interpolation() {
        let program = Program {
            rules: stmt(n(
                0,
                NodeKind::Str(vec![
                    StringSegment::Literal(b"a=".to_vec()),
                    StringSegment::Interpolation {
                        expr: vec![n(0, NodeKind::Ident(b"a".to_vec()))],
                        format: None,
                    },
                ]),
            )),
            ..Default::default()
        };
        let compiled = compile_program(&program).unwrap();
        let mut r = zed_asm::Reader::new(&compiled.rules);
        assert_eq!(r.read_u8().unwrap(), Op::ScopeIn.into());
        r.read_u8().unwrap();
        assert_eq!(r.read_u8().unwrap(), Op::Load.into());
        r.read_u16().unwrap();
        r.read_nul_terminated().unwrap();
        assert_eq!(r.read_u8().unwrap(), Op::ScopeOut.into());
        r.read_u8().unwrap();
        assert_eq!(r.read_u8().unwrap(), Op::Plain.into());
        assert_eq!(r.read_nul_terminated().unwrap(), b"a=");
        assert_eq!(r.read_u8().unwrap(), Op::String.into());
        assert_eq!(r.read_u16().unwrap(), 2);
    }

    #[test]
    fn function_hash_is_stable_across_identical_bodies() {
        let body = vec![n(0, NodeKind::Int(1))];
        let a = function_hash(b"f", &[b"x".to_vec()], &body);
        let b = function_hash(b"f", &[b"x".to_vec()], &body);
        assert_eq!(a, b);
        let c = function_hash(b"f", &[b"y".to_vec()], &body);
        assert_ne!(a, c);
    }
}
