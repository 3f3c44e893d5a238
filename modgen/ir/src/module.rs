use crate::{Attributes, Block, ParamDecl, Type};
use modgen_utils::{GetName, Id, SourceLoc, WithPos};

/// A named, typed port in a module signature.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct PortInfo {
    pub name: Id,
    pub ty: Type,
}

impl PortInfo {
    pub fn new<S: Into<Id>>(name: S, ty: Type) -> Self {
        Self {
            name: name.into(),
            ty,
        }
    }
}

/// A module with a body. The body is created once, when the module is
/// generated.
#[derive(Clone, Debug, PartialEq)]
pub struct HwModule {
    pub sym: Id,
    pub inputs: Vec<PortInfo>,
    pub outputs: Vec<PortInfo>,
    pub attributes: Attributes,
    pub loc: SourceLoc,
    pub body: Option<Block>,
}

impl HwModule {
    pub fn new(
        sym: Id,
        inputs: Vec<PortInfo>,
        outputs: Vec<PortInfo>,
        attributes: Attributes,
        loc: SourceLoc,
    ) -> Self {
        Self {
            sym,
            inputs,
            outputs,
            attributes,
            loc,
            body: None,
        }
    }
}

/// A module whose implementation lives outside of the design.
#[derive(Clone, Debug, PartialEq)]
pub struct HwModuleExtern {
    pub sym: Id,
    pub inputs: Vec<PortInfo>,
    pub outputs: Vec<PortInfo>,
    pub params: Vec<ParamDecl>,
    pub attributes: Attributes,
    pub loc: SourceLoc,
}

impl HwModuleExtern {
    pub fn new(
        sym: Id,
        inputs: Vec<PortInfo>,
        outputs: Vec<PortInfo>,
        params: Vec<ParamDecl>,
        attributes: Attributes,
        loc: SourceLoc,
    ) -> Self {
        Self {
            sym,
            inputs,
            outputs,
            params,
            attributes,
            loc,
        }
    }
}

/// A top-level module operation.
#[derive(Clone, Debug, PartialEq)]
pub enum ModuleOp {
    Hw(HwModule),
    Extern(HwModuleExtern),
}

impl ModuleOp {
    pub fn sym(&self) -> Id {
        match self {
            ModuleOp::Hw(m) => m.sym,
            ModuleOp::Extern(m) => m.sym,
        }
    }

    pub fn inputs(&self) -> &[PortInfo] {
        match self {
            ModuleOp::Hw(m) => &m.inputs,
            ModuleOp::Extern(m) => &m.inputs,
        }
    }

    pub fn outputs(&self) -> &[PortInfo] {
        match self {
            ModuleOp::Hw(m) => &m.outputs,
            ModuleOp::Extern(m) => &m.outputs,
        }
    }

    /// Formal parameters. Real modules have none.
    pub fn params(&self) -> &[ParamDecl] {
        match self {
            ModuleOp::Hw(_) => &[],
            ModuleOp::Extern(m) => &m.params,
        }
    }

    pub fn attributes(&self) -> &Attributes {
        match self {
            ModuleOp::Hw(m) => &m.attributes,
            ModuleOp::Extern(m) => &m.attributes,
        }
    }

    pub fn attributes_mut(&mut self) -> &mut Attributes {
        match self {
            ModuleOp::Hw(m) => &mut m.attributes,
            ModuleOp::Extern(m) => &mut m.attributes,
        }
    }

    pub fn is_extern(&self) -> bool {
        matches!(self, ModuleOp::Extern(_))
    }

    pub fn body(&self) -> Option<&Block> {
        match self {
            ModuleOp::Hw(m) => m.body.as_ref(),
            ModuleOp::Extern(_) => None,
        }
    }

    pub fn body_mut(&mut self) -> Option<&mut Block> {
        match self {
            ModuleOp::Hw(m) => m.body.as_mut(),
            ModuleOp::Extern(_) => None,
        }
    }
}

impl GetName for ModuleOp {
    fn name(&self) -> Id {
        self.sym()
    }
}

impl WithPos for ModuleOp {
    fn copy_span(&self) -> SourceLoc {
        match self {
            ModuleOp::Hw(m) => m.loc,
            ModuleOp::Extern(m) => m.loc,
        }
    }
}
