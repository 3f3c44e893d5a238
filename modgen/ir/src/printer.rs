//! Formatter for the in-memory design. Produces MLIR-like text; printing
//! never mutates the design.
use crate::{
    Attributes, Design, ModuleOp, OpKind, Operation, PortInfo, ValueDef,
};
use itertools::Itertools;
use std::io;

/// Printer for the IR.
pub struct Printer;

impl Printer {
    /// Format attributes as `attributes {k = v, ...}`. Returns the empty string
    /// if `attrs` is empty.
    fn format_attributes(attrs: &Attributes) -> String {
        if attrs.is_empty() {
            "".to_string()
        } else {
            format!(
                " attributes {{{}}}",
                attrs
                    .iter()
                    .map(|(k, v)| format!("{k} = {v}"))
                    .join(", ")
            )
        }
    }

    /// Formats the signature `(in %a : i8, out b : i8)`.
    fn format_signature(inputs: &[PortInfo], outputs: &[PortInfo]) -> String {
        inputs
            .iter()
            .map(|p| format!("in %{} : {}", p.name, p.ty))
            .chain(outputs.iter().map(|p| format!("out {} : {}", p.name, p.ty)))
            .join(", ")
    }

    /// Name of a value as referenced inside the body of `module`.
    fn format_value(
        design: &Design,
        module: &ModuleOp,
        def: &ValueDef,
    ) -> String {
        match def {
            ValueDef::Arg { idx, .. } => match module.inputs().get(*idx) {
                Some(port) => format!("%{}", port.name),
                None => format!("%arg{idx}"),
            },
            ValueDef::Result { op, idx } => {
                let multi = design
                    .find_op(module.sym(), *op)
                    .is_some_and(|o| o.results.len() > 1);
                if multi {
                    format!("%{op}#{idx}")
                } else {
                    format!("%{op}")
                }
            }
        }
    }

    /// Prints out every module of the design followed by its metadata.
    pub fn write_design<F: io::Write>(
        design: &Design,
        f: &mut F,
    ) -> io::Result<()> {
        writeln!(f, "// design: {}", design.name())?;
        for module in design.modules() {
            Self::write_module(design, module, f)?;
        }
        for op in design.metadata() {
            Self::write_op(design, None, op, 0, f)?;
        }
        Ok(())
    }

    /// Formats and writes a single module operation.
    pub fn write_module<F: io::Write>(
        design: &Design,
        module: &ModuleOp,
        f: &mut F,
    ) -> io::Result<()> {
        let sig = Self::format_signature(module.inputs(), module.outputs());
        let attrs = Self::format_attributes(module.attributes());
        match module {
            ModuleOp::Extern(ext) => {
                let params = if ext.params.is_empty() {
                    "".to_string()
                } else {
                    format!(
                        "<{}>",
                        ext.params
                            .iter()
                            .map(|p| format!("{}: {}", p.name, p.ty))
                            .join(", ")
                    )
                };
                writeln!(
                    f,
                    "hw.module.extern @{}{params}({sig}){attrs}",
                    ext.sym
                )
            }
            ModuleOp::Hw(hw) => {
                write!(f, "hw.module @{}({sig}){attrs}", hw.sym)?;
                let Some(body) = &hw.body else {
                    return writeln!(f);
                };
                writeln!(f, " {{")?;
                for op in &body.ops {
                    Self::write_op(design, Some(module), op, 2, f)?;
                }
                writeln!(f, "}}")
            }
        }
    }

    /// Formats and writes an operation. `parent` is the module whose body
    /// holds the operation, if any.
    pub fn write_op<F: io::Write>(
        design: &Design,
        parent: Option<&ModuleOp>,
        op: &Operation,
        indent_level: usize,
        f: &mut F,
    ) -> io::Result<()> {
        write!(f, "{}", " ".repeat(indent_level))?;
        match op.results.len() {
            0 => (),
            1 => write!(f, "%{} = ", op.id)?,
            n => write!(f, "%{}:{n} = ", op.id)?,
        }
        let operand = |idx: usize| match parent {
            Some(m) => Self::format_value(design, m, op.operands[idx].def()),
            None => "%?".to_string(),
        };
        match &op.kind {
            OpKind::Constant(val) => {
                write!(f, "hw.constant {val} : {}", op.results[0].ty())?
            }
            OpKind::Instance {
                inst_name,
                module,
                params,
            } => {
                let target = design.find_module(*module);
                let inputs = (0..op.operands.len())
                    .map(|idx| {
                        let name = target
                            .and_then(|t| t.inputs().get(idx))
                            .map(|p| p.name.to_string())
                            .unwrap_or_else(|| idx.to_string());
                        format!(
                            "{name}: {} : {}",
                            operand(idx),
                            op.operands[idx].ty()
                        )
                    })
                    .join(", ");
                let outputs = target
                    .map(|t| {
                        t.outputs()
                            .iter()
                            .map(|p| format!("{}: {}", p.name, p.ty))
                            .join(", ")
                    })
                    .unwrap_or_default();
                let params = params
                    .as_ref()
                    .and_then(|p| p.as_dict())
                    .map(|d| {
                        format!(
                            "<{}>",
                            d.iter().map(|(k, v)| format!("{k}: {v}")).join(", ")
                        )
                    })
                    .unwrap_or_default();
                write!(
                    f,
                    "hw.instance {:?} @{module}{params}({inputs}) -> ({outputs})",
                    inst_name.as_str()
                )?
            }
            OpKind::Output => write!(
                f,
                "hw.output {}",
                (0..op.operands.len())
                    .map(|idx| format!(
                        "{} : {}",
                        operand(idx),
                        op.operands[idx].ty()
                    ))
                    .join(", ")
            )?,
            OpKind::SymbolMetadata { symbol } => {
                write!(f, "{} {{symbolRef = @{symbol}", op.name())?;
                for (k, v) in &op.attributes {
                    write!(f, ", {k} = {v}")?;
                }
                return writeln!(f, "}}");
            }
            OpKind::Custom(name) => write!(
                f,
                "{name}({})",
                (0..op.operands.len()).map(operand).join(", ")
            )?,
        }
        write!(f, "{}", Self::format_attributes(&op.attributes))?;
        writeln!(f, " {}", op.loc)
    }
}
