use modgen::ir::{Attr, ModuleOp, OpKind, ParamTy, Type};
use modgen::{
    AppId, Args, ErrorKind, Id, Metadata, ModParams, Module, ModuleCache,
    ModuleDecl, Param, ParamSignature, PortValue, System, SystemConf,
};
use std::cell::Cell;
use std::rc::Rc;

fn init_logger() {
    let _ = env_logger::builder().is_test(true).try_init();
}

fn passthrough(count: Rc<Cell<u32>>) -> Module {
    ModuleDecl::new("Passthrough")
        .input("a", Type::bits(8))
        .output("b", Type::bits(8))
        .generator("build", move |ports| {
            count.set(count.get() + 1);
            let a = ports.input("a")?;
            ports.set("b", a)
        })
        .build()
        .unwrap()
}

/// A top module whose generator runs `body` with the system and its single
/// 8-bit input `x`, and ties output `y` to zero.
fn top<F>(body: F) -> Module
where
    F: Fn(&System, modgen::Signal) -> modgen::ModgenResult<()> + 'static,
{
    ModuleDecl::new("Top")
        .input("x", Type::bits(8))
        .output("y", Type::bits(8))
        .generator("build", move |ports| {
            let x = ports.input("x")?;
            body(ports.sys()?, x)?;
            ports.set("y", 0)
        })
        .build()
        .unwrap()
}

fn body_ops(sys: &System, sym: &str) -> Vec<OpKind> {
    sys.design()
        .find_module(sym)
        .and_then(ModuleOp::body)
        .map(|b| b.ops.iter().map(|op| op.kind.clone()).collect())
        .unwrap_or_default()
}

fn instance_names(sys: &System, sym: &str) -> Vec<String> {
    body_ops(sys, sym)
        .into_iter()
        .filter_map(|k| match k {
            OpKind::Instance { inst_name, .. } => Some(inst_name.to_string()),
            _ => None,
        })
        .collect()
}

#[test]
fn two_instances_generate_once() {
    init_logger();
    let count = Rc::new(Cell::new(0));
    let inner = passthrough(Rc::clone(&count));
    let names = Rc::new(std::cell::RefCell::new(vec![]));
    let seen = Rc::clone(&names);
    let top = top(move |sys, x| {
        let i0 = inner.instantiate(sys, [("a", x.clone())], Some("p"), None)?;
        let i1 = inner.instantiate(sys, [("a", x)], Some("p"), None)?;
        seen.borrow_mut().push(i0.name());
        seen.borrow_mut().push(i1.name());
        Ok(())
    });

    let sys = System::new("design");
    sys.add_top(&top).unwrap();
    sys.generate().unwrap();

    assert_eq!(*names.borrow(), vec![Id::new("p"), Id::new("p_1")]);
    assert_eq!(instance_names(&sys, "Top"), vec!["p", "p_1"]);
    assert_eq!(count.get(), 1);
    sys.design().verify().unwrap();

    let mut out = vec![];
    sys.print(&mut out).unwrap();
    let text = String::from_utf8(out).unwrap();
    assert!(text.contains("hw.module @Passthrough("));
    assert!(text.contains("hw.instance \"p_1\" @Passthrough"));
}

#[test]
fn factories_memoize_modules() {
    let make = ModParams::new(
        "make",
        ParamSignature::new([Param::required("width")]),
        |args| {
            let width = args.int("width")? as u64;
            ModuleDecl::new("Make")
                .input("a", Type::bits(width))
                .generator("build", |_| Ok(()))
                .build()
        },
    )
    .unwrap();
    let cache = ModuleCache::new();
    let a = make.call(&cache, Args::new().arg(8)).unwrap();
    let b = make.call(&cache, Args::new().arg(8)).unwrap();
    let c = make.call(&cache, Args::new().arg(16)).unwrap();
    assert!(a.ptr_eq(&b));
    assert!(!a.ptr_eq(&c));
    assert_eq!(a.name(), "Make_width8");
    assert_eq!(c.name(), "Make_width16");
    assert_eq!(cache.len(), 2);

    // A separate cache does not share entries.
    let other = ModuleCache::new();
    let d = make.call(&other, Args::new().kwarg("width", 8)).unwrap();
    assert!(!a.ptr_eq(&d));
}

#[test]
fn factory_rejects_variadics() {
    let err = ModParams::new(
        "bad",
        ParamSignature::new([Param::required("w"), Param::var_keyword("rest")]),
        |_| ModuleDecl::new("Bad").build(),
    )
    .unwrap_err();
    assert!(matches!(err.kind(), ErrorKind::Declaration(_)));
    assert!(ModParams::new(
        "bad",
        ParamSignature::new([Param::var_positional("args")]),
        |_| ModuleDecl::new("Bad").build(),
    )
    .is_err());
}

#[test]
fn unconnected_outputs_are_named() {
    let one = ModuleDecl::new("One")
        .output("x", Type::bits(1))
        .output("y", Type::bits(1))
        .generator("build", |ports| ports.set("x", 1))
        .build()
        .unwrap();
    let sys = System::new("design");
    sys.add_top(&one).unwrap();
    let err = sys.generate().unwrap_err();
    assert!(matches!(err.kind(), ErrorKind::UnconnectedOutputs { .. }));
    assert_eq!(err.ports(), vec![Id::new("y")]);

    let none = ModuleDecl::new("None")
        .output("x", Type::bits(1))
        .output("y", Type::bits(1))
        .generator("build", |_| Ok(()))
        .build()
        .unwrap();
    let sys = System::new("design");
    sys.add_top(&none).unwrap();
    let err = sys.generate().unwrap_err();
    assert_eq!(err.ports(), vec![Id::new("x"), Id::new("y")]);
}

#[test]
fn missing_and_unknown_inputs_are_named() {
    let adder = ModuleDecl::new("Adder")
        .input("a", Type::bits(8))
        .input("b", Type::bits(8))
        .input("c", Type::bits(8))
        .generator("build", |_| Ok(()))
        .build()
        .unwrap();
    let results = Rc::new(std::cell::RefCell::new(vec![]));
    let out = Rc::clone(&results);
    let top = top(move |sys, x| {
        let missing = adder
            .instantiate(sys, [("b", x.clone())], None, None)
            .unwrap_err();
        let unknown = adder
            .instantiate(
                sys,
                [("a", x.clone()), ("b", x.clone()), ("c", x.clone()), ("d", x.clone())],
                None,
                None,
            )
            .unwrap_err();
        let duplicate = adder
            .instantiate(
                sys,
                [
                    ("a", x.clone()),
                    ("b", x.clone()),
                    ("a", x.clone()),
                    ("c", x),
                ],
                None,
                None,
            )
            .unwrap_err();
        out.borrow_mut().push(missing);
        out.borrow_mut().push(unknown);
        out.borrow_mut().push(duplicate);
        Ok(())
    });
    let sys = System::new("design");
    sys.add_top(&top).unwrap();
    sys.generate().unwrap();

    let results = results.borrow();
    assert!(matches!(results[0].kind(), ErrorKind::MissingInputs { .. }));
    assert_eq!(results[0].ports(), vec![Id::new("a"), Id::new("c")]);
    assert_eq!(
        results[0].message(),
        "Missing input signals for ports: a, c"
    );
    assert!(matches!(results[1].kind(), ErrorKind::UnknownPorts { .. }));
    assert_eq!(results[1].ports(), vec![Id::new("d")]);
    assert!(matches!(results[2].kind(), ErrorKind::DuplicateInputs { .. }));
    assert_eq!(results[2].ports(), vec![Id::new("a")]);
    assert!(results.iter().all(|e| e.is_port_error()));
    // None of the failed calls left anything behind.
    assert!(instance_names(&sys, "Top").is_empty());
}

#[test]
fn type_mismatch_fails_before_mutation() {
    let wide = ModuleDecl::new("Wide")
        .input("a", Type::bits(16))
        .input("b", Type::bits(4))
        .build()
        .unwrap();
    let counts = Rc::new(Cell::new((0, 0)));
    let out = Rc::clone(&counts);
    let top = top(move |sys, x| {
        let before = sys.design().find_module("Top").unwrap().body().unwrap().ops.len();
        let err = wide
            .instantiate(
                sys,
                [("a", PortValue::from(x)), ("b", PortValue::from(3))],
                None,
                None,
            )
            .unwrap_err();
        assert!(matches!(err.kind(), ErrorKind::TypeMismatch { .. }));
        assert_eq!(err.ports(), vec![Id::new("a")]);
        let after = sys.design().find_module("Top").unwrap().body().unwrap().ops.len();
        out.set((before, after));
        Ok(())
    });
    let sys = System::new("design");
    sys.add_top(&top).unwrap();
    sys.generate().unwrap();
    let (before, after) = counts.get();
    assert_eq!(before, after);
    // The failed binding did not even create the target's op.
    assert!(sys.design().find_module("Wide").is_none());
}

#[test]
fn output_type_mismatch() {
    let bad = ModuleDecl::new("Bad")
        .input("a", Type::bits(8))
        .output("b", Type::uint(8))
        .generator("build", |ports| {
            let a = ports.input("a")?;
            ports.set("b", a)
        })
        .build()
        .unwrap();
    let sys = System::new("design");
    sys.add_top(&bad).unwrap();
    let err = sys.generate().unwrap_err();
    assert!(matches!(err.kind(), ErrorKind::TypeMismatch { .. }));
    assert!(body_ops(&sys, "Bad").is_empty());
}

#[test]
fn disconnected_inputs_only_on_externs() {
    let ext = ModuleDecl::new("ExtMod")
        .input("a", Type::bits(8))
        .input("en", Type::bits(1))
        .output("z", Type::bits(8))
        .build()
        .unwrap();
    let real = ModuleDecl::new("Real")
        .input("a", Type::bits(8))
        .generator("build", |_| Ok(()))
        .build()
        .unwrap();
    let errors = Rc::new(std::cell::RefCell::new(vec![]));
    let out = Rc::clone(&errors);
    let top = top(move |sys, x| {
        let inst = ext.instantiate(
            sys,
            [("a", PortValue::from(x)), ("en", PortValue::Disconnected)],
            Some("ext"),
            None,
        )?;
        inst.output("z")?;
        let none: Option<modgen::Signal> = None;
        out.borrow_mut()
            .push(real.instantiate(sys, [("a", none)], None, None).unwrap_err());
        Ok(())
    });
    let sys = System::new("design");
    sys.add_top(&top).unwrap();
    sys.generate().unwrap();
    sys.design().verify().unwrap();

    assert!(matches!(errors.borrow()[0].kind(), ErrorKind::Disconnected { .. }));
    let zeros = body_ops(&sys, "Top")
        .into_iter()
        .filter(|k| matches!(k, OpKind::Constant(_)))
        .count();
    // One zero for `en` and one for the `y` output of the top module.
    assert_eq!(zeros, 2);
}

#[test]
fn extern_and_real_module_ops() {
    let make_ext = ModParams::new(
        "ext",
        ParamSignature::new([Param::required("WIDTH")]),
        |args| {
            let width = args.int("WIDTH")? as u64;
            ModuleDecl::new("ext_fifo")
                .input("d", Type::bits(width))
                .build()
        },
    )
    .unwrap();
    let cache = ModuleCache::new();
    let fifo = make_ext.call(&cache, Args::new().arg(8)).unwrap();
    // External modules keep their declared name.
    assert_eq!(fifo.name(), "ext_fifo");

    let top = top(move |sys, x| {
        fifo.instantiate(sys, [("d", x)], None, Some(AppId::with_index("fifo", 0)))?;
        Ok(())
    });
    let sys = System::new("design");
    sys.add_top(&top).unwrap();
    sys.generate().unwrap();
    sys.design().verify().unwrap();

    let design = sys.design();
    let ext = design.find_module("ext_fifo").unwrap();
    assert!(ext.is_extern());
    assert_eq!(ext.params()[0].name, "WIDTH");
    assert_eq!(ext.params()[0].ty, ParamTy::Integer);
    assert_eq!(
        ext.attributes().get("verilogName"),
        Some(&Attr::Str("ext_fifo".into()))
    );
    assert_eq!(
        ext.attributes().get("output_file"),
        Some(&Attr::OutputFile("external_modules.sv".into()))
    );

    let top = design.find_module("Top").unwrap();
    assert_eq!(
        top.attributes().get("output_file"),
        Some(&Attr::OutputFile("Top.sv".into()))
    );
    let inst = top
        .body()
        .unwrap()
        .ops
        .iter()
        .find(|op| matches!(op.kind, OpKind::Instance { .. }))
        .unwrap();
    assert_eq!(
        inst.attributes.get("appid"),
        Some(&Attr::AppId {
            name: Id::new("fifo"),
            index: Some(0)
        })
    );
    match &inst.kind {
        OpKind::Instance { params, .. } => {
            assert_eq!(
                params.as_ref().and_then(Attr::as_dict).map(|d| d.len()),
                Some(1)
            )
        }
        _ => unreachable!(),
    }
}

#[test]
fn parameterized_real_modules_record_parameters() {
    let make = ModParams::new(
        "make",
        ParamSignature::new([Param::required("width"), Param::optional("_tag", "x")]),
        |args| {
            let width = args.int("width")? as u64;
            ModuleDecl::new("Reg")
                .input("d", Type::bits(width))
                .generator("build", |_| Ok(()))
                .build()
        },
    )
    .unwrap();
    let cache = ModuleCache::new();
    let reg = make.call(&cache, Args::new().arg(4)).unwrap();
    let sys = System::new("design");
    let sym = sys.add_top(&reg).unwrap();
    assert_eq!(sym, "Reg_width4");
    let design = sys.design();
    let op = design.find_module(sym).unwrap();
    assert_eq!(
        op.attributes().get("modgen.parameters"),
        Some(&Attr::dict([(Id::new("width"), Attr::Int(4))]).unwrap())
    );
}

#[test]
fn module_name_override_and_symbol_collisions() {
    let a = ModuleDecl::new("A")
        .module_name("Shared")
        .generator("build", |_| Ok(()))
        .build()
        .unwrap();
    let b = ModuleDecl::new("B")
        .module_name("Shared")
        .generator("build", |_| Ok(()))
        .build()
        .unwrap();
    let sys = System::new("design");
    assert_eq!(sys.add_top(&a).unwrap(), "Shared");
    assert_eq!(sys.add_top(&b).unwrap(), "Shared_1");
    // Op creation is cached per declaration.
    assert_eq!(sys.add_top(&a).unwrap(), "Shared");
    sys.generate().unwrap();
    sys.design().verify().unwrap();
}

#[test]
fn generation_contract() {
    let returns = ModuleDecl::new("Returns")
        .input("a", Type::bits(1))
        .generator("build", |ports| ports.input("a"))
        .build()
        .unwrap();
    let sys = System::new("design");
    sys.add_top(&returns).unwrap();
    let err = sys.generate().unwrap_err();
    assert!(matches!(err.kind(), ErrorKind::Generator(_)));

    let twice = ModuleDecl::new("Twice")
        .generator("build", |_| Ok(()))
        .build()
        .unwrap();
    let sys = System::new("design");
    sys.generate_module(&twice).unwrap();
    let err = sys.generate_module(&twice).unwrap_err();
    assert!(matches!(err.kind(), ErrorKind::Generator(_)));

    let ext = ModuleDecl::new("NoGen").build().unwrap();
    let err = sys.generate_module(&ext).unwrap_err();
    assert!(matches!(err.kind(), ErrorKind::Generator(_)));
}

#[test]
fn failed_generation_unwinds_scope() {
    let failing = ModuleDecl::new("Failing")
        .input("a", Type::bits(1))
        .generator("build", |ports| {
            ports.sys()?.uniquify_symbol("tmp")?;
            ports.set("nope", 1)
        })
        .build()
        .unwrap();
    let sys = System::new("design");
    sys.add_top(&failing).unwrap();
    let err = sys.generate().unwrap_err();
    assert!(matches!(err.kind(), ErrorKind::UnknownPorts { .. }));
    assert_eq!(err.ports(), vec![Id::new("nope")]);
    // No block context survives the failed generator.
    let err = sys.uniquify_symbol("tmp").unwrap_err();
    assert!(matches!(err.kind(), ErrorKind::Internal(_)));
    assert_eq!(sys.clock(), None);
}

#[test]
fn failed_generation_can_be_retried() {
    init_logger();
    let inner = passthrough(Rc::new(Cell::new(0)));
    let attempts = Rc::new(Cell::new(0));
    let count = Rc::clone(&attempts);
    let flaky = ModuleDecl::new("Flaky")
        .input("a", Type::bits(8))
        .output("o", Type::bits(8))
        .generator("build", move |ports| {
            count.set(count.get() + 1);
            let a = ports.input("a")?;
            let sys = ports.sys()?;
            let inst = inner.instantiate(sys, [("a", a)], Some("p"), None)?;
            if count.get() > 1 {
                ports.set("o", inst.output("b")?)?;
            }
            Ok(())
        })
        .build()
        .unwrap();
    let sys = System::new("design");
    let err = sys.generate_module(&flaky).unwrap_err();
    assert!(matches!(err.kind(), ErrorKind::UnconnectedOutputs { .. }));
    assert_eq!(err.ports(), vec![Id::new("o")]);
    // The failed attempt is rolled back.
    assert!(!sys.is_generated(&flaky));
    assert!(sys.instances().is_empty());
    assert!(body_ops(&sys, "Flaky").is_empty());

    sys.generate_module(&flaky).unwrap();
    assert!(sys.is_generated(&flaky));
    assert_eq!(attempts.get(), 2);
    assert_eq!(instance_names(&sys, "Flaky"), vec!["p"]);
    assert_eq!(sys.instances().len(), 1);
    sys.generate().unwrap();
    sys.design().verify().unwrap();

    let err = sys.generate_module(&flaky).unwrap_err();
    assert!(matches!(err.kind(), ErrorKind::Generator(_)));
}

#[test]
fn import_collision_keeps_the_op() {
    let donor = System::new("donor");
    let decl = passthrough(Rc::new(Cell::new(0)));
    donor.add_top(&decl).unwrap();
    donor.generate().unwrap();
    let op = donor.design().find_module("Passthrough").unwrap().clone();

    let sys = System::new("design");
    let imported = sys.import_module(op).unwrap();
    let same_name = ModuleDecl::new("Passthrough").build().unwrap();
    sys.add_top(&same_name).unwrap();
    let err = sys.add_top(&imported).unwrap_err();
    assert!(matches!(err.kind(), ErrorKind::Ir(_)));
    assert_eq!(sys.symbol_of(&imported), None);

    // The op was not consumed by the failed attempt.
    let other = System::new("other");
    assert_eq!(other.add_top(&imported).unwrap(), "Passthrough");
    assert!(other.design().find_module("Passthrough").is_some());
    // Once added, it cannot be moved into yet another design.
    assert!(System::new("third").add_top(&imported).is_err());
}

#[test]
fn factory_keys_ignore_nested_dictionary_order() {
    let make = ModParams::new(
        "make",
        ParamSignature::new([Param::required("cfg")]),
        |_| ModuleDecl::new("Cfg").generator("build", |_| Ok(())).build(),
    )
    .unwrap();
    let cfg = |entries: [(&str, i64); 2]| {
        Attr::Dict(
            entries
                .into_iter()
                .map(|(k, v)| (Id::new(k), Attr::Int(v)))
                .collect(),
        )
    };
    let cache = ModuleCache::new();
    let a = make
        .call(&cache, Args::new().arg(cfg([("width", 8), ("depth", 4)])))
        .unwrap();
    let b = make
        .call(&cache, Args::new().arg(cfg([("depth", 4), ("width", 8)])))
        .unwrap();
    assert!(a.ptr_eq(&b));
    assert_eq!(cache.len(), 1);
}

#[test]
fn instantiation_requires_a_generator_scope() {
    let inner = passthrough(Rc::new(Cell::new(0)));
    let sys = System::new("design");
    let err = inner
        .instantiate(&sys, Vec::<(&str, PortValue)>::new(), None, None)
        .unwrap_err();
    assert!(matches!(err.kind(), ErrorKind::Internal(_)));
}

#[test]
fn instance_accessors() {
    let pair = ModuleDecl::new("Pair")
        .input("i", Type::bits(2))
        .output("lo", Type::bits(1))
        .output("hi", Type::bits(1))
        .generator("build", |ports| ports.set_all([("hi", 1), ("lo", 0)]))
        .build()
        .unwrap();
    let top = ModuleDecl::new("Top")
        .output("y", Type::bits(1))
        .generator("build", move |ports| {
            let sys = ports.sys()?;
            let inst = pair.instantiate(sys, [("i", 2)], None, None)?;
            let outs = inst.outputs()?;
            let names: Vec<_> = outs.keys().map(|k| k.as_str()).collect();
            assert_eq!(names, vec!["lo", "hi"]);
            let err = inst.output("i").unwrap_err();
            assert!(matches!(err.kind(), ErrorKind::InstanceInput { .. }));
            assert_eq!(err.message(), "Cannot access signal via instance input `i'");
            ports.set("y", inst.output("hi")?)
        })
        .build()
        .unwrap();
    let sys = System::new("design");
    sys.add_top(&top).unwrap();
    sys.generate().unwrap();
    sys.design().verify().unwrap();

    let instances = sys.instances();
    assert_eq!(instances.len(), 1);
    assert_eq!(instances[0].name(), "Pair");
    sys.clear_instances();
    assert!(sys.instances().is_empty());
    assert!(instances[0].is_cleared());
    let err = instances[0].output("hi").unwrap_err();
    assert!(matches!(err.kind(), ErrorKind::Released(_)));
}

#[test]
fn clocks_and_resets() {
    let clocked = ModuleDecl::new("Clocked")
        .clock("clk")
        .reset("rst")
        .generator("build", |ports| {
            let clk = ports.input("clk")?;
            assert!(clk.is_clock());
            assert!(!ports.input("rst")?.is_clock());
            assert_eq!(ports.sys()?.clock(), Some(clk));
            Ok(())
        })
        .build()
        .unwrap();
    let two = ModuleDecl::new("TwoClocks")
        .clock("a")
        .clock("b")
        .generator("build", |ports| {
            assert_eq!(ports.sys()?.clock(), None);
            Ok(())
        })
        .build()
        .unwrap();
    let sys = System::new("design");
    sys.add_top(&clocked).unwrap();
    sys.add_top(&two).unwrap();
    sys.generate().unwrap();
    assert_eq!(sys.clock(), None);
}

#[test]
fn nested_generation() {
    let count = Rc::new(Cell::new(0));
    let inner = passthrough(Rc::clone(&count));
    let top = top(move |sys, _| {
        sys.generate_module(&inner)?;
        // The outer scope is intact after the nested generator returns.
        assert_eq!(sys.uniquify_symbol("n")?, "n");
        Ok(())
    });
    let sys = System::new("design");
    sys.add_top(&top).unwrap();
    sys.generate().unwrap();
    assert_eq!(count.get(), 1);
    sys.design().verify().unwrap();
}

#[test]
fn metadata_defaults() {
    let m = ModuleDecl::new("Documented")
        .doc("Adds things.")
        .metadata(Metadata::new().version("0.1").misc("team", "hw"))
        .build()
        .unwrap();
    let sys = System::new("design");
    sys.add_top(&m).unwrap();
    let design = sys.design();
    let meta = &design.metadata()[0];
    assert!(matches!(meta.kind, OpKind::SymbolMetadata { symbol } if symbol == "Documented"));
    assert_eq!(
        meta.attributes.get("name"),
        Some(&Attr::Str("Documented".into()))
    );
    assert_eq!(
        meta.attributes.get("summary"),
        Some(&Attr::Str("Adds things.".into()))
    );
    assert_eq!(meta.attributes.get("version"), Some(&Attr::Str("0.1".into())));
    assert_eq!(meta.attributes.get("team"), Some(&Attr::Str("hw".into())));

    let quiet = System::with_conf(
        "design",
        SystemConf {
            emit_metadata: false,
            ..Default::default()
        },
    );
    quiet.add_top(&m).unwrap();
    assert!(quiet.design().metadata().is_empty());
}

#[test]
fn imported_modules() {
    let donor = System::new("donor");
    let adder = ModuleDecl::new("Imported")
        .input("a", Type::bits(8))
        .output("b", Type::bits(8))
        .generator("build", |ports| {
            let a = ports.input("a")?;
            ports.set("b", a)
        })
        .build()
        .unwrap();
    donor.add_top(&adder).unwrap();
    donor.generate().unwrap();
    let op = donor.design().find_module("Imported").unwrap().clone();

    let sys = System::new("design");
    let imported = sys.import_module(op.clone()).unwrap();
    assert!(imported.is_imported());
    assert!(!imported.has_generator());
    assert_eq!(imported.name(), "Imported");
    let top = top(move |sys, x| {
        let inst = imported.instantiate(sys, [("a", x)], None, None)?;
        inst.output("b")?;
        Ok(())
    });
    sys.add_top(&top).unwrap();
    sys.generate().unwrap();
    sys.design().verify().unwrap();
    assert_eq!(instance_names(&sys, "Top"), vec!["Imported"]);

    // The symbol is now taken.
    assert!(sys.import_module(op).is_err());
}

#[test]
fn module_print() {
    let inner = passthrough(Rc::new(Cell::new(0)));
    let mut out = vec![];
    inner.print(&mut out).unwrap();
    assert_eq!(
        String::from_utf8(out).unwrap(),
        "<modgen.Module: Passthrough inputs: [('a', i8)] outputs: [('b', i8)]>\n"
    );
    let names: Vec<_> = inner.inputs().iter().map(|p| p.name).collect();
    assert_eq!(names, vec![Id::new("a")]);
}

#[test]
fn declarations_are_distinct() {
    let a = passthrough(Rc::new(Cell::new(0)));
    let b = passthrough(Rc::new(Cell::new(0)));
    assert!(!a.ptr_eq(&b));
    assert_ne!(a.id(), b.id());
    assert!(a.ptr_eq(&a.clone()));
}
