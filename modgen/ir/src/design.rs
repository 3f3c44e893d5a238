//! The top-level IR container and its builder methods.
use crate::{
    Attr, Attributes, Block, ConstValue, ModuleOp, OpId, OpKind, Operation,
    Type, Value, ValueDef,
};
use linked_hash_map::LinkedHashMap;
use modgen_utils::{Error, Id, ModgenResult, NameGenerator, SourceLoc};
use smallvec::SmallVec;
use std::collections::HashSet;

/// Position at which new operations are appended: the end of the body of a
/// module.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct InsertionPoint {
    module: Id,
}

impl InsertionPoint {
    pub fn at_end_of(module: Id) -> Self {
        Self { module }
    }

    pub fn module(&self) -> Id {
        self.module
    }
}

/// A complete design: every module operation plus top-level metadata.
#[derive(Debug)]
pub struct Design {
    /// Name of the design.
    name: Id,
    /// Module operations, in creation order.
    modules: LinkedHashMap<Id, ModuleOp>,
    /// Top-level symbol metadata operations.
    metadata: Vec<Operation>,
    /// Module symbols defined in this design.
    namegen: NameGenerator,
    next_op: u32,
}

impl Design {
    pub fn new<S: Into<Id>>(name: S) -> Self {
        Self {
            name: name.into(),
            modules: LinkedHashMap::new(),
            metadata: vec![],
            namegen: NameGenerator::default(),
            next_op: 0,
        }
    }

    pub fn name(&self) -> Id {
        self.name
    }

    /// Returns a module symbol starting with `base` that is not yet defined.
    pub fn unique_symbol<S: Into<Id>>(&mut self, base: S) -> Id {
        self.namegen.uniquify(base)
    }

    /// Add a module operation. Its symbol must not already be defined.
    pub fn add_module(&mut self, op: ModuleOp) -> ModgenResult<Id> {
        let sym = op.sym();
        if self.modules.contains_key(&sym) {
            return Err(Error::ir(format!(
                "Symbol `{sym}' is already defined in design `{}'",
                self.name
            )));
        }
        self.namegen.add_names(HashSet::from([sym]));
        log::debug!("Adding module `{sym}' to design `{}'", self.name);
        self.modules.insert(sym, op);
        Ok(sym)
    }

    pub fn find_module<S: Into<Id>>(&self, sym: S) -> Option<&ModuleOp> {
        self.modules.get(&sym.into())
    }

    pub fn find_module_mut<S: Into<Id>>(
        &mut self,
        sym: S,
    ) -> Option<&mut ModuleOp> {
        self.modules.get_mut(&sym.into())
    }

    /// Iterate over module operations in creation order.
    pub fn modules(&self) -> impl Iterator<Item = &ModuleOp> {
        self.modules.values()
    }

    /// Top-level metadata operations.
    pub fn metadata(&self) -> &[Operation] {
        &self.metadata
    }

    fn fresh_id(&mut self) -> OpId {
        let id = OpId(self.next_op);
        self.next_op += 1;
        id
    }

    /// Create the entry block of a module and return its arguments, one per
    /// input port.
    pub fn add_entry_block(&mut self, sym: Id) -> ModgenResult<Vec<Value>> {
        let Some(op) = self.modules.get_mut(&sym) else {
            return Err(Error::ir(format!("Unknown module symbol `{sym}'")));
        };
        let ModuleOp::Hw(module) = op else {
            return Err(Error::ir(format!(
                "External module `{sym}' cannot have a body"
            )));
        };
        if module.body.is_some() {
            return Err(Error::ir(format!(
                "Module `{sym}' already has an entry block"
            )));
        }
        let args = module
            .inputs
            .iter()
            .enumerate()
            .map(|(idx, port)| Value::arg(sym, idx, port.ty.clone()))
            .collect::<Vec<_>>();
        module.body = Some(Block {
            args: args.clone(),
            ops: vec![],
        });
        Ok(args)
    }

    /// Drop the body of a module, so that a new entry block can be added.
    pub fn clear_body(&mut self, sym: Id) -> ModgenResult<()> {
        match self.modules.get_mut(&sym) {
            Some(ModuleOp::Hw(module)) => {
                module.body = None;
                Ok(())
            }
            Some(ModuleOp::Extern(_)) => Err(Error::ir(format!(
                "External module `{sym}' cannot have a body"
            ))),
            None => Err(Error::ir(format!("Unknown module symbol `{sym}'"))),
        }
    }

    fn block_mut(&mut self, ip: &InsertionPoint) -> ModgenResult<&mut Block> {
        let sym = ip.module();
        let block = self
            .modules
            .get_mut(&sym)
            .and_then(ModuleOp::body_mut)
            .ok_or_else(|| {
                Error::ir(format!("Module `{sym}' has no body to insert into"))
            })?;
        if block.is_terminated() {
            return Err(Error::ir(format!(
                "Body of module `{sym}' is already terminated"
            )));
        }
        Ok(block)
    }

    /// Append an operation at `ip` and return it.
    pub fn build_op(
        &mut self,
        ip: &InsertionPoint,
        kind: OpKind,
        operands: Vec<Value>,
        result_types: Vec<Type>,
        attributes: Attributes,
        loc: SourceLoc,
    ) -> ModgenResult<&Operation> {
        // Check the block first so failed builds do not consume ids.
        self.block_mut(ip)?;
        let id = self.fresh_id();
        let results = result_types
            .into_iter()
            .enumerate()
            .map(|(idx, ty)| Value::result(id, idx, ty))
            .collect::<SmallVec<_>>();
        let op = Operation {
            id,
            kind,
            operands,
            results,
            attributes,
            loc,
        };
        log::trace!("Building {} in `{}'", op.name(), ip.module());
        let block = self.block_mut(ip)?;
        block.ops.push(op);
        block
            .ops
            .last()
            .ok_or_else(|| Error::internal("operation vanished after push"))
    }

    /// Build a constant of type `ty`. Fails if the value does not fit.
    pub fn build_constant(
        &mut self,
        ip: &InsertionPoint,
        ty: &Type,
        value: ConstValue,
        loc: SourceLoc,
    ) -> ModgenResult<Value> {
        ty.check_const(&value)?;
        let op = self.build_op(
            ip,
            OpKind::Constant(value),
            vec![],
            vec![ty.clone()],
            Attributes::default(),
            loc,
        )?;
        Ok(op.results[0].clone())
    }

    /// Build an instance of `module`. The result types are taken from the
    /// target's outputs.
    pub fn build_instance(
        &mut self,
        ip: &InsertionPoint,
        module: Id,
        inst_name: Id,
        inputs: Vec<Value>,
        params: Option<Attr>,
        loc: SourceLoc,
    ) -> ModgenResult<&Operation> {
        if module == ip.module() {
            return Err(Error::ir(format!(
                "Module `{module}' cannot instantiate itself"
            )));
        }
        let Some(target) = self.find_module(module) else {
            return Err(Error::ir(format!("Unknown module symbol `{module}'")));
        };
        let result_types =
            target.outputs().iter().map(|p| p.ty.clone()).collect();
        let mut attributes = Attributes::default();
        attributes.insert("instanceName", Attr::Str(inst_name.to_string()));
        attributes.insert("moduleName", Attr::SymbolRef(module));
        attributes.insert("sym_name", Attr::Str(inst_name.to_string()));
        self.build_op(
            ip,
            OpKind::Instance {
                inst_name,
                module,
                params,
            },
            inputs,
            result_types,
            attributes,
            loc,
        )
    }

    /// Terminate the body at `ip` with the module outputs.
    pub fn build_output(
        &mut self,
        ip: &InsertionPoint,
        values: Vec<Value>,
        loc: SourceLoc,
    ) -> ModgenResult<&Operation> {
        self.build_op(
            ip,
            OpKind::Output,
            values,
            vec![],
            Attributes::default(),
            loc,
        )
    }

    /// Add a top-level metadata record for `symbol`.
    pub fn add_symbol_metadata(
        &mut self,
        symbol: Id,
        attributes: Attributes,
        loc: SourceLoc,
    ) -> OpId {
        let id = self.fresh_id();
        self.metadata.push(Operation {
            id,
            kind: OpKind::SymbolMetadata { symbol },
            operands: vec![],
            results: SmallVec::new(),
            attributes,
            loc,
        });
        id
    }

    pub fn find_op(&self, module: Id, op: OpId) -> Option<&Operation> {
        self.find_module(module)?.body()?.find_op(op)
    }

    pub fn find_op_mut(
        &mut self,
        module: Id,
        op: OpId,
    ) -> Option<&mut Operation> {
        self.find_module_mut(module)?.body_mut()?.find_op_mut(op)
    }

    /// Check that `value` is usable inside the body of `module`.
    fn verify_operand(
        &self,
        module: &ModuleOp,
        value: &Value,
    ) -> ModgenResult<()> {
        let defined = match value.def() {
            ValueDef::Arg { module: m, idx } => {
                *m == module.sym()
                    && module.inputs().get(*idx).map(|p| &p.ty)
                        == Some(value.ty())
            }
            ValueDef::Result { op, idx } => module
                .body()
                .and_then(|b| b.find_op(*op))
                .and_then(|op| op.result(*idx))
                .is_some_and(|r| r == value),
        };
        if defined {
            Ok(())
        } else {
            Err(Error::ir(format!(
                "Operand {:?} is not defined in module `{}'",
                value.def(),
                module.sym()
            )))
        }
    }

    /// Verify a single operation in the body of `module`.
    pub fn verify_op(&self, module: Id, op: OpId) -> ModgenResult<()> {
        let Some(parent) = self.find_module(module) else {
            return Err(Error::ir(format!("Unknown module symbol `{module}'")));
        };
        let Some(op) = parent.body().and_then(|b| b.find_op(op)) else {
            return Err(Error::ir(format!(
                "Operation {op} not found in module `{module}'"
            )));
        };
        for operand in &op.operands {
            self.verify_operand(parent, operand)
                .map_err(|e| e.with_pos(op))?;
        }
        match &op.kind {
            OpKind::Constant(val) => op.results[0].ty().check_const(val),
            OpKind::Instance {
                inst_name,
                module: target,
                params,
            } => {
                let Some(target_op) = self.find_module(*target) else {
                    return Err(Error::ir(format!(
                        "Instance `{inst_name}' refers to unknown module `{target}'"
                    )));
                };
                let expected = target_op.inputs();
                if expected.len() != op.operands.len() {
                    return Err(Error::ir(format!(
                        "Instance `{inst_name}' of `{target}' expects {} inputs, got {}",
                        expected.len(),
                        op.operands.len()
                    ))
                    .with_pos(op));
                }
                for (port, value) in expected.iter().zip(&op.operands) {
                    if &port.ty != value.ty() {
                        return Err(Error::ir(format!(
                            "Instance `{inst_name}': input `{}' expects type {}, got {}",
                            port.name,
                            port.ty,
                            value.ty()
                        ))
                        .with_pos(op));
                    }
                }
                for decl in target_op.params() {
                    let bound = params
                        .as_ref()
                        .and_then(Attr::as_dict)
                        .and_then(|d| d.iter().find(|(k, _)| *k == decl.name));
                    match bound {
                        Some((_, v)) if v.param_ty() == decl.ty => {}
                        Some((_, v)) => {
                            return Err(Error::ir(format!(
                                "Instance `{inst_name}': parameter `{}' expects {}, got {v}",
                                decl.name, decl.ty
                            ))
                            .with_pos(op));
                        }
                        None => {
                            return Err(Error::ir(format!(
                                "Instance `{inst_name}': missing parameter `{}'",
                                decl.name
                            ))
                            .with_pos(op));
                        }
                    }
                }
                Ok(())
            }
            OpKind::Output => {
                let expected = parent.outputs();
                if expected.len() != op.operands.len()
                    || expected
                        .iter()
                        .zip(&op.operands)
                        .any(|(p, v)| &p.ty != v.ty())
                {
                    return Err(Error::ir(format!(
                        "Output of module `{module}' does not match its output ports"
                    ))
                    .with_pos(op));
                }
                Ok(())
            }
            OpKind::SymbolMetadata { .. } | OpKind::Custom(_) => Ok(()),
        }
    }

    /// Verify a module: a real module must have a body that ends in exactly
    /// one terminator, and every operation in it must verify.
    pub fn verify_module(&self, sym: Id) -> ModgenResult<()> {
        let Some(module) = self.find_module(sym) else {
            return Err(Error::ir(format!("Unknown module symbol `{sym}'")));
        };
        let ModuleOp::Hw(hw) = module else {
            return Ok(());
        };
        let Some(body) = &hw.body else {
            return Err(Error::ir(format!("Module `{sym}' has no body"))
                .with_pos(module));
        };
        if !body.is_terminated() {
            return Err(Error::ir(format!(
                "Body of module `{sym}' is missing its terminator"
            ))
            .with_pos(module));
        }
        if body.ops[..body.ops.len() - 1]
            .iter()
            .any(Operation::is_terminator)
        {
            return Err(Error::ir(format!(
                "Terminator in the middle of module `{sym}'"
            ))
            .with_pos(module));
        }
        for op in &body.ops {
            self.verify_op(sym, op.id)?;
        }
        Ok(())
    }

    /// Verify every module in the design.
    pub fn verify(&self) -> ModgenResult<()> {
        for sym in self.modules.keys() {
            self.verify_module(*sym)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::{Design, InsertionPoint};
    use crate::{
        Attr, Attributes, ConstValue, HwModule, HwModuleExtern, ModuleOp,
        OpKind, ParamDecl, ParamTy, PortInfo, Type,
    };
    use modgen_utils::{Id, SourceLoc};

    fn passthrough(sym: &str) -> ModuleOp {
        ModuleOp::Hw(HwModule::new(
            Id::new(sym),
            vec![PortInfo::new("a", Type::bits(8))],
            vec![PortInfo::new("b", Type::bits(8))],
            Attributes::default(),
            SourceLoc::UNKNOWN,
        ))
    }

    #[test]
    fn duplicate_symbols_rejected() {
        let mut design = Design::new("top");
        design.add_module(passthrough("P")).unwrap();
        assert!(design.add_module(passthrough("P")).is_err());
        assert_eq!(design.unique_symbol("P"), "P_1");
        assert_eq!(design.unique_symbol("Q"), "Q");
    }

    #[test]
    fn body_roundtrip_verifies() {
        let mut design = Design::new("top");
        let sym = design.add_module(passthrough("P")).unwrap();
        let args = design.add_entry_block(sym).unwrap();
        assert!(design.add_entry_block(sym).is_err());
        let ip = InsertionPoint::at_end_of(sym);
        assert!(design.verify_module(sym).is_err());
        design
            .build_output(&ip, args.clone(), SourceLoc::UNKNOWN)
            .unwrap();
        design.verify().unwrap();
        // Nothing can be appended after the terminator.
        assert!(design.build_output(&ip, args, SourceLoc::UNKNOWN).is_err());

        design.clear_body(sym).unwrap();
        assert!(design.find_module(sym).unwrap().body().is_none());
        let args = design.add_entry_block(sym).unwrap();
        assert_eq!(args.len(), 1);
    }

    #[test]
    fn instance_verification() {
        let mut design = Design::new("top");
        let child = design.add_module(passthrough("Child")).unwrap();
        let parent = design.add_module(passthrough("Parent")).unwrap();
        let args = design.add_entry_block(parent).unwrap();
        let ip = InsertionPoint::at_end_of(parent);

        let bad = design
            .build_constant(
                &ip,
                &Type::bits(4),
                ConstValue::Int(3),
                SourceLoc::UNKNOWN,
            )
            .unwrap();
        let op = design
            .build_instance(
                &ip,
                child,
                Id::new("c"),
                vec![bad],
                None,
                SourceLoc::UNKNOWN,
            )
            .unwrap()
            .id;
        assert!(design.verify_op(parent, op).is_err());

        let good = design
            .build_instance(
                &ip,
                child,
                Id::new("c_1"),
                args,
                None,
                SourceLoc::UNKNOWN,
            )
            .unwrap();
        assert!(matches!(good.kind, OpKind::Instance { .. }));
        assert_eq!(good.results[0].ty(), &Type::bits(8));
        let good = good.id;
        design.verify_op(parent, good).unwrap();
    }

    #[test]
    fn extern_parameters_must_be_bound() {
        let mut design = Design::new("top");
        let ext = design
            .add_module(ModuleOp::Extern(HwModuleExtern::new(
                Id::new("Ext"),
                vec![PortInfo::new("a", Type::bits(8))],
                vec![],
                vec![ParamDecl::no_default(Id::new("W"), ParamTy::Integer)],
                Attributes::default(),
                SourceLoc::UNKNOWN,
            )))
            .unwrap();
        let parent = design.add_module(passthrough("Parent")).unwrap();
        let args = design.add_entry_block(parent).unwrap();
        let ip = InsertionPoint::at_end_of(parent);
        let unbound = design
            .build_instance(
                &ip,
                ext,
                Id::new("e"),
                args.clone(),
                None,
                SourceLoc::UNKNOWN,
            )
            .unwrap()
            .id;
        assert!(design.verify_op(parent, unbound).is_err());
        let params = Attr::dict([(Id::new("W"), Attr::Int(8))]).unwrap();
        let bound = design
            .build_instance(
                &ip,
                ext,
                Id::new("e_1"),
                args,
                Some(params),
                SourceLoc::UNKNOWN,
            )
            .unwrap()
            .id;
        design.verify_op(parent, bound).unwrap();
    }

    #[test]
    fn constants_must_fit() {
        let mut design = Design::new("top");
        let sym = design.add_module(passthrough("P")).unwrap();
        design.add_entry_block(sym).unwrap();
        let ip = InsertionPoint::at_end_of(sym);
        assert!(design
            .build_constant(
                &ip,
                &Type::uint(2),
                ConstValue::Int(4),
                SourceLoc::UNKNOWN
            )
            .is_err());
    }
}
