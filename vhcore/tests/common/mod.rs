#![allow(dead_code)]

use std::sync::Arc;

use parking_lot::Mutex;
use vhcore::{prelude::*, reference::Fault};
use vhir::prelude::*;

/// Models shared by the integration tests.
pub fn arith_module() -> ReferenceModule {
    ReferenceModule::new()
        .with_function("add", |_, args| {
            let a = args[0].expect_int()?;
            let b = args[1].expect_int()?;
            Ok(Some(IntValue::new(a.ty(), a.bits().wrapping_add(b.bits())).into()))
        })
        .with_function("add_buggy", |_, args| {
            let a = args[0].expect_int()?;
            let b = args[1].expect_int()?;
            let sum = a.bits().wrapping_add(b.bits());
            let sum = if a.bits() == 17 { sum + 1 } else { sum };
            Ok(Some(IntValue::new(a.ty(), sum).into()))
        })
        .with_function("incr", |ctx, args| {
            let value = ctx.load_int(&args[0])?;
            ctx.store(&args[0], IntValue::new(value.ty(), value.bits() + 1))?;
            Ok(None)
        })
        .with_function("incr_twice", |ctx, args| {
            ctx.call("incr", args)?;
            ctx.call("incr", args)?;
            Ok(None)
        })
        .with_function("read", |ctx, args| Ok(Some(ctx.load(&args[0])?)))
        .with_function("clear", |ctx, args| {
            let value = ctx.load_int(&args[0])?;
            ctx.store(&args[0], IntValue::new(value.ty(), 0))?;
            Ok(None)
        })
        .with_function("square", |_, args| {
            // Off by five, callers only verify against its override.
            let x = args[0].expect_int()?;
            Ok(Some(IntValue::new(x.ty(), x.bits() * x.bits() + 5).into()))
        })
        .with_function("square_plus_one", |ctx, args| {
            let square = ctx
                .call("square", args)?
                .ok_or_else(|| Fault::Model("square returned nothing".to_string()))?
                .expect_int()?;
            Ok(Some(IntValue::new(square.ty(), square.bits() + 1).into()))
        })
}

pub fn load_arith() -> Module {
    let mut loader = ReferenceLoader::new();
    loader.register("arith.bc", arith_module());
    loader
        .load_module(std::path::Path::new("arith.bc"))
        .expect("arith.bc is registered")
}

pub type Captured = Arc<Mutex<Vec<LogMessage>>>;

pub fn dispatcher(config: ProcessConfig) -> (Dispatcher<ReferenceEngine>, Captured) {
    let sink: Captured = Arc::new(Mutex::new(Vec::new()));
    let inner = sink.clone();
    let journal = Journal::with_callback(
        LogLevel::Trace,
        Box::new(move |msg: &LogMessage| inner.lock().push(msg.clone())),
    );
    let dispatcher =
        Dispatcher::new(config, load_arith(), ReferenceEngine::new()).with_journal(journal);
    (dispatcher, sink)
}

/// `add(a, b)` returns `a + b` on `i8`.
pub fn add_spec() -> FunctionSpecification {
    let mut spec = SpecBuilder::new();
    let a = spec.fresh_symbolic("a", TypeDescriptor::I8).unwrap();
    let b = spec.fresh_symbolic("b", TypeDescriptor::I8).unwrap();
    spec.execute([SetupValue::from(&a), SetupValue::from(&b)])
        .unwrap();
    spec.returns(a.term() + b.term()).unwrap();
    spec.finish().unwrap()
}

/// `add(a, b)` returns `a + b + 1`, which never holds.
pub fn contradictory_add_spec() -> FunctionSpecification {
    let mut spec = SpecBuilder::new();
    let a = spec.fresh_symbolic("a", TypeDescriptor::I8).unwrap();
    let b = spec.fresh_symbolic("b", TypeDescriptor::I8).unwrap();
    spec.execute([SetupValue::from(&a), SetupValue::from(&b)])
        .unwrap();
    spec.returns(a.term() + b.term() + Term::int(IType::I8, 1))
        .unwrap();
    spec.finish().unwrap()
}

/// `incr(p)` with `*p = x < limit` leaves `*p = x + 1`.
pub fn incr_spec(limit: u64) -> FunctionSpecification {
    let mut spec = SpecBuilder::new();
    let (x, p) = spec.fresh_pointer("x", TypeDescriptor::I8, false).unwrap();
    spec.precondition(x.term().ult(Term::int(IType::I8, limit)))
        .unwrap();
    spec.execute([SetupValue::from(&p)]).unwrap();
    spec.bind_points_to(&p, (x.term() + Term::int(IType::I8, 1)).into())
        .unwrap();
    spec.finish().unwrap()
}

pub fn captured_messages(sink: &Captured) -> Vec<String> {
    sink.lock().iter().map(|msg| msg.message.clone()).collect()
}
