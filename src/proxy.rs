//! The port proxy handed to generators.
//!
//! A [`ProxyLayout`] is built once per declaration and maps every port name to
//! the accessor used for it. Each generator invocation gets a fresh
//! [`Ports`] value over that layout, backed by the arguments of the module's
//! entry block and one output slot per output port. Once the generator has
//! finished the proxy is torn down and every later use fails.
use crate::{ModuleSchema, PortValue, Signal, System};
use linked_hash_map::LinkedHashMap;
use modgen_ir::Value;
use modgen_utils::{Error, Id, ModgenResult};

/// Per-declaration accessor table: input name to its block argument,
/// output name to its slot.
#[derive(Debug)]
pub(crate) struct ProxyLayout {
    /// Index of the block argument and whether it is a clock.
    readers: LinkedHashMap<Id, (usize, bool)>,
    writers: LinkedHashMap<Id, usize>,
}

impl ProxyLayout {
    pub(crate) fn new(schema: &ModuleSchema) -> Self {
        let readers = schema
            .inputs
            .iter()
            .enumerate()
            .map(|(idx, port)| (port.name, (idx, schema.clocks.contains(&idx))))
            .collect();
        let writers = schema
            .outputs
            .iter()
            .enumerate()
            .map(|(idx, port)| (port.name, idx))
            .collect();
        Self { readers, writers }
    }

    pub(crate) fn reader(&self, name: Id) -> Option<(usize, bool)> {
        self.readers.get(&name).copied()
    }

    pub(crate) fn writer(&self, name: Id) -> Option<usize> {
        self.writers.get(&name).copied()
    }

    pub(crate) fn num_outputs(&self) -> usize {
        self.writers.len()
    }
}

struct PortsInner<'g> {
    sys: &'g System,
    module: crate::Module,
    args: Vec<Value>,
    outputs: Vec<Option<Value>>,
}

/// Access to the ports of the module being generated. Inputs are read as
/// signals; every output must be assigned before the generator returns. A
/// later assignment to the same output replaces the earlier one.
pub struct Ports<'g> {
    inner: Option<PortsInner<'g>>,
}

impl<'g> Ports<'g> {
    pub(crate) fn new(
        sys: &'g System,
        module: crate::Module,
        args: Vec<Value>,
    ) -> Self {
        let num_outputs = module.proxy().num_outputs();
        Self {
            inner: Some(PortsInner {
                sys,
                module,
                args,
                outputs: vec![None; num_outputs],
            }),
        }
    }

    fn inner(&self) -> ModgenResult<&PortsInner<'g>> {
        self.inner.as_ref().ok_or_else(|| {
            Error::released("Port proxy used after its generator returned")
        })
    }

    fn inner_mut(&mut self) -> ModgenResult<&mut PortsInner<'g>> {
        self.inner.as_mut().ok_or_else(|| {
            Error::released("Port proxy used after its generator returned")
        })
    }

    /// The system the module is being generated in.
    pub fn sys(&self) -> ModgenResult<&'g System> {
        Ok(self.inner()?.sys)
    }

    /// Name of the module being generated.
    pub fn module_name(&self) -> ModgenResult<Id> {
        Ok(self.inner()?.module.name())
    }

    /// Read an input port.
    pub fn input<S: Into<Id>>(&self, name: S) -> ModgenResult<Signal> {
        let name = name.into();
        let inner = self.inner()?;
        let layout = inner.module.proxy();
        if let Some((idx, clock)) = layout.reader(name) {
            let value = inner.args[idx].clone();
            Ok(if clock {
                Signal::clock(value)
            } else {
                Signal::new(value)
            })
        } else if layout.writer(name).is_some() {
            Err(Error::port_direction(
                name,
                "is an output and cannot be read in its own generator",
            ))
        } else {
            Err(Error::unknown_ports(inner.module.name(), vec![name]))
        }
    }

    /// Assign an output port. Signals must match the port type exactly; raw
    /// constants are converted to the port type.
    pub fn set<S, V>(&mut self, name: S, value: V) -> ModgenResult<()>
    where
        S: Into<Id>,
        V: Into<PortValue>,
    {
        let name = name.into();
        let inner = self.inner_mut()?;
        let layout = inner.module.proxy();
        let Some(idx) = layout.writer(name) else {
            return Err(if layout.reader(name).is_some() {
                Error::port_direction(name, "is an input and cannot be assigned")
            } else {
                Error::unknown_ports(inner.module.name(), vec![name])
            });
        };
        let ty = inner.module.schema().outputs[idx].ty.clone();
        let value = match value.into() {
            PortValue::Signal(sig) => {
                if sig.ty() != &ty {
                    return Err(Error::type_mismatch(name, ty, sig.ty()));
                }
                Value::from(sig)
            }
            PortValue::Const(c) => inner.sys.build_constant(&ty, c)?,
            PortValue::Disconnected => return Err(Error::disconnected(name)),
        };
        inner.outputs[idx] = Some(value);
        Ok(())
    }

    /// Assign several outputs by name. Unknown names are reported together
    /// before anything is assigned.
    pub fn set_all<I, S, V>(&mut self, values: I) -> ModgenResult<()>
    where
        I: IntoIterator<Item = (S, V)>,
        S: Into<Id>,
        V: Into<PortValue>,
    {
        let values = values
            .into_iter()
            .map(|(k, v)| (k.into(), v.into()))
            .collect::<Vec<(Id, PortValue)>>();
        let inner = self.inner()?;
        let unknown = values
            .iter()
            .filter(|(k, _)| inner.module.proxy().writer(*k).is_none())
            .map(|(k, _)| *k)
            .collect::<Vec<_>>();
        if !unknown.is_empty() {
            return Err(Error::unknown_ports(inner.module.name(), unknown));
        }
        for (name, value) in values {
            self.set(name, value)?;
        }
        Ok(())
    }

    /// Fails naming every output that has not been assigned.
    pub fn check_unconnected_outputs(&self) -> ModgenResult<()> {
        let inner = self.inner()?;
        let unset = inner
            .module
            .schema()
            .outputs
            .iter()
            .zip(&inner.outputs)
            .filter(|(_, v)| v.is_none())
            .map(|(p, _)| p.name)
            .collect::<Vec<_>>();
        if unset.is_empty() {
            Ok(())
        } else {
            Err(Error::unconnected_outputs(inner.module.name(), unset))
        }
    }

    /// The assigned outputs in port order.
    pub(crate) fn output_values(&self) -> ModgenResult<Vec<Value>> {
        self.check_unconnected_outputs()?;
        Ok(self.inner()?.outputs.iter().flatten().cloned().collect())
    }

    /// Tear down the proxy. Every later use fails.
    pub(crate) fn clear(&mut self) {
        self.inner = None;
    }

    pub fn is_cleared(&self) -> bool {
        self.inner.is_none()
    }
}

#[cfg(test)]
mod tests {
    use super::Ports;
    use crate::{ModuleDecl, System};
    use modgen_ir::Type;
    use modgen_utils::{ErrorKind, Id, SourceLoc};

    #[test]
    fn proxy_accessors_and_teardown() {
        let sys = System::new("t");
        let m = ModuleDecl::new("M")
            .input("a", Type::bits(8))
            .output("b", Type::bits(8))
            .output("c", Type::bits(2))
            .generator("g", |_| Ok(()))
            .build()
            .unwrap();
        let sym = sys.create_op(&m).unwrap();
        let args = sys.add_entry_block(sym).unwrap();
        let mut ports = Ports::new(&sys, m.clone(), args);
        let _scope = sys.enter_scope(sym, SourceLoc::UNKNOWN, None);

        let a = ports.input("a").unwrap();
        assert!(!a.is_clock());
        let err = ports.input("b").unwrap_err();
        assert!(matches!(err.kind(), ErrorKind::PortDirection { .. }));
        let err = ports.set("a", a.clone()).unwrap_err();
        assert!(matches!(err.kind(), ErrorKind::PortDirection { .. }));

        // Unknown names are reported before anything is assigned.
        let err = ports.set_all([("b", 1), ("x", 2), ("y", 3)]).unwrap_err();
        assert_eq!(err.ports(), vec![Id::new("x"), Id::new("y")]);
        let err = ports.check_unconnected_outputs().unwrap_err();
        assert_eq!(err.ports(), vec![Id::new("b"), Id::new("c")]);

        // Constants must fit the port type.
        assert!(ports.set("c", 4).is_err());
        ports.set("c", 3).unwrap();
        ports.set("b", a).unwrap();
        ports.check_unconnected_outputs().unwrap();
        assert_eq!(ports.output_values().unwrap().len(), 2);

        ports.clear();
        assert!(ports.is_cleared());
        let err = ports.input("a").unwrap_err();
        assert!(matches!(err.kind(), ErrorKind::Released(_)));
        assert!(ports.sys().is_err());
    }
}
